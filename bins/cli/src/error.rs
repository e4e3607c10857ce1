use index_provisioner_shared::{ErrorEnvelope, ErrorKind};
use std::fmt;

/// Process exit codes; `Failed` is reserved for reconcile passes that ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    Failed = 1,
    InvalidInput = 2,
    Io = 3,
    Internal = 4,
}

impl ExitCode {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Exit code for an error raised before a pass could start.
    #[must_use]
    pub const fn for_envelope(error: &ErrorEnvelope) -> Self {
        match error.kind {
            ErrorKind::Expected => Self::InvalidInput,
            ErrorKind::Unexpected => Self::Io,
            ErrorKind::Invariant => Self::Internal,
        }
    }
}

#[derive(Debug)]
pub enum CliError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Logging(String),
}

impl CliError {
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io(_) => ExitCode::Io,
            Self::Serialization(_) | Self::Logging(_) => ExitCode::Internal,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(formatter, "io error: {error}"),
            Self::Serialization(error) => write!(formatter, "serialization error: {error}"),
            Self::Logging(message) => write!(formatter, "failed to initialise logging: {message}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error)
    }
}
