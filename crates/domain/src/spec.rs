//! Declared target state for a remote index.

use index_provisioner_shared::{BoundedU32, ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Pod count accepted by the remote API for managed indexes.
pub type PodCount = BoundedU32<1, 2>;

/// Replica count accepted by the remote API for managed indexes.
pub type ReplicaCount = BoundedU32<1, 1>;

/// Distance metric used to compare vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance.
    #[serde(rename = "euclidean")]
    Euclidean,
    /// Cosine similarity.
    #[serde(rename = "cosine")]
    Cosine,
    /// Dot product.
    #[default]
    #[serde(rename = "dotproduct", alias = "dot-product", alias = "dot_product")]
    DotProduct,
}

impl DistanceMetric {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Cosine => "cosine",
            Self::DotProduct => "dotproduct",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Pod instance class (compute/storage family).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodInstanceClass {
    /// Storage-optimised pods.
    #[default]
    S1,
    /// Performance-optimised pods.
    P1,
    /// High-throughput pods.
    P2,
}

impl PodInstanceClass {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S1 => "s1",
            Self::P1 => "p1",
            Self::P2 => "p2",
        }
    }
}

/// Pod size class; sizes are ordered by magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodSizeClass {
    /// Single unit.
    #[default]
    X1,
    /// Double.
    X2,
    /// Quadruple.
    X4,
    /// Eightfold.
    X8,
}

impl PodSizeClass {
    /// Numeric size magnitude (`x4` => 4).
    #[must_use]
    pub const fn magnitude(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
        }
    }
}

/// Pod type string could not be parsed as `{instance}.x{size}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTypeError {
    /// Raw input.
    pub input: String,
}

impl fmt::Display for PodTypeError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "pod type `{}` is not of the form <instance>.x<size>",
            self.input
        )
    }
}

impl std::error::Error for PodTypeError {}

/// Composite `{instance}.x{size}` tier identifier.
///
/// Desired pod types are always built from a [`PodInstanceClass`] and a
/// [`PodSizeClass`]. Pod types reported by the remote API are parsed
/// leniently so unknown tiers still compare by instance and magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodType {
    instance: Box<str>,
    size: u32,
}

impl PodType {
    /// Fold an instance class and size class into a pod type.
    #[must_use]
    pub fn new(instance: PodInstanceClass, size: PodSizeClass) -> Self {
        Self {
            instance: instance.as_str().into(),
            size: size.magnitude(),
        }
    }

    /// Parse a pod type string such as `p1.x2`.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PodTypeError> {
        let raw = input.as_ref().trim();
        let invalid = || PodTypeError {
            input: raw.to_owned(),
        };
        let (instance, size) = raw.split_once('.').ok_or_else(invalid)?;
        if instance.is_empty() || !instance.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        let size = size
            .strip_prefix('x')
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|size| *size > 0)
            .ok_or_else(invalid)?;
        Ok(Self {
            instance: instance.to_ascii_lowercase().into_boxed_str(),
            size,
        })
    }

    /// Instance class token (e.g. `s1`).
    #[must_use]
    pub fn instance_class(&self) -> &str {
        &self.instance
    }

    /// Numeric size magnitude (e.g. `4` for `x4`).
    #[must_use]
    pub const fn size_magnitude(&self) -> u32 {
        self.size
    }
}

impl fmt::Display for PodType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.x{}", self.instance, self.size)
    }
}

impl FromStr for PodType {
    type Err = PodTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for PodType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PodType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// Whether, and how, a delete may destroy a remote index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalPolicy {
    /// Always delete.
    #[serde(alias = "DESTROY")]
    Destroy,
    /// Never delete.
    #[default]
    #[serde(alias = "RETAIN")]
    Retain,
    /// Delete only when the index holds no vectors.
    #[serde(alias = "RETAIN_ON_UPDATE_OR_DELETE")]
    RetainIfNonempty,
    /// Snapshot into a collection, then delete.
    #[serde(alias = "SNAPSHOT")]
    SnapshotThenDestroy,
}

impl RemovalPolicy {
    /// Canonical kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Destroy => "destroy",
            Self::Retain => "retain",
            Self::RetainIfNonempty => "retain-if-nonempty",
            Self::SnapshotThenDestroy => "snapshot-then-destroy",
        }
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "destroy" => Ok(Self::Destroy),
            "retain" => Ok(Self::Retain),
            "retain-if-nonempty" | "retain-on-update-or-delete" => Ok(Self::RetainIfNonempty),
            "snapshot-then-destroy" | "snapshot" => Ok(Self::SnapshotThenDestroy),
            other => Err(format!("unknown removal policy `{other}`")),
        }
    }
}

/// Metadata fields the remote index should make filterable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MetadataConfig {
    /// Allowlisted metadata field names.
    #[serde(alias = "indexed", alias = "field_names")]
    pub field_names: Vec<String>,
}

/// Semantic problems with a desired-state declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// Create requested without a vector dimension.
    MissingDimension {
        /// Resolved index name.
        index: String,
    },
    /// Two specs in one event resolve to the same remote name.
    DuplicateResolvedName {
        /// Colliding resolved name.
        index: String,
    },
    /// Specs in one event disagree on where the credential comes from.
    ConflictingCredentialSource {
        /// Field that disagrees (`apiKeySecretName` or `environment`).
        field: &'static str,
    },
    /// Neither the event nor the configuration names a credential source.
    MissingCredentialSource {
        /// Missing field (`apiKeySecretName` or `environment`).
        field: &'static str,
    },
    /// A create or update event declared no indexes.
    EmptyDeclaration {
        /// Event kind.
        event: &'static str,
    },
}

impl SpecError {
    /// Stable code for invalid desired-state declarations.
    pub fn error_code() -> ErrorCode {
        ErrorCode::new("reconcile", "invalid_spec")
    }
}

impl fmt::Display for SpecError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDimension { index } => {
                write!(formatter, "index `{index}` requires a dimension to be created")
            },
            Self::DuplicateResolvedName { index } => {
                write!(formatter, "more than one declared index resolves to `{index}`")
            },
            Self::ConflictingCredentialSource { field } => {
                write!(formatter, "declared indexes disagree on `{field}`")
            },
            Self::MissingCredentialSource { field } => {
                write!(formatter, "`{field}` is set neither on the event nor in config")
            },
            Self::EmptyDeclaration { event } => {
                write!(formatter, "{event} event declares no indexes")
            },
        }
    }
}

impl std::error::Error for SpecError {}

impl From<SpecError> for ErrorEnvelope {
    fn from(error: SpecError) -> Self {
        let envelope = Self::expected(SpecError::error_code(), error.to_string());
        match error {
            SpecError::MissingDimension { index } | SpecError::DuplicateResolvedName { index } => {
                envelope.with_metadata("index", index)
            },
            SpecError::ConflictingCredentialSource { field }
            | SpecError::MissingCredentialSource { field } => {
                envelope.with_metadata("field", field)
            },
            SpecError::EmptyDeclaration { event } => envelope.with_metadata("event", event),
        }
    }
}

/// Declared target state for one index.
///
/// Immutable value type: the pod type is derived on demand from the instance
/// and size classes and cannot be set on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DesiredIndexSpec {
    /// Logical name; the event identity is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Vector dimension, immutable after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<u32>,
    /// Distance metric.
    pub metric: DistanceMetric,
    /// Pod count.
    pub pods: PodCount,
    /// Replica count.
    pub replicas: ReplicaCount,
    /// Pod instance class.
    pub pod_instance_type: PodInstanceClass,
    /// Pod size class.
    pub pod_size: PodSizeClass,
    /// Optional metadata allowlist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_config: Option<MetadataConfig>,
    /// Collection to clone on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_collection: Option<String>,
    /// Removal policy; the configured default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_policy: Option<RemovalPolicy>,
    /// Secret holding the API key; the configured value applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_secret_name: Option<String>,
    /// Remote environment; the configured value applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl DesiredIndexSpec {
    /// Composite pod type derived from instance and size class.
    #[must_use]
    pub fn pod_type(&self) -> PodType {
        PodType::new(self.pod_instance_type, self.pod_size)
    }

    /// Logical name, falling back to `event_identity` when unset or blank.
    #[must_use]
    pub fn logical_name<'a>(&'a self, event_identity: &'a str) -> &'a str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(event_identity)
    }

    /// Effective removal policy given the configured default.
    #[must_use]
    pub fn removal_policy_or(&self, default: RemovalPolicy) -> RemovalPolicy {
        self.removal_policy.unwrap_or(default)
    }

    /// Dimension required for create, rejecting absent or zero values.
    pub fn dimension_for_create(&self, index: &str) -> Result<u32, SpecError> {
        match self.dimension {
            Some(dimension) if dimension > 0 => Ok(dimension),
            _ => Err(SpecError::MissingDimension {
                index: index.to_owned(),
            }),
        }
    }

    /// Copy with a different pod size; the pod type follows automatically.
    #[must_use]
    pub fn with_pod_size(&self, pod_size: PodSizeClass) -> Self {
        Self {
            pod_size,
            ..self.clone()
        }
    }
}
