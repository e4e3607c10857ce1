//! Helpers for carrying validated invariants in types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Out-of-range error for bounded numeric wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundsError<T> {
    /// Raw value provided.
    pub value: T,
    /// Inclusive minimum.
    pub min: T,
    /// Inclusive maximum.
    pub max: T,
}

impl<T: fmt::Display> fmt::Display for BoundsError<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "value {} is outside [{}, {}]",
            self.value, self.min, self.max
        )
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for BoundsError<T> {}

/// Bounded `u32` with const generic limits.
///
/// Serializes as a plain number; deserialization rejects out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoundedU32<const MIN: u32, const MAX: u32>(u32);

impl<const MIN: u32, const MAX: u32> BoundedU32<MIN, MAX> {
    /// Smallest accepted value.
    pub const MIN: Self = Self(MIN);

    /// Create a bounded value or return a bounds error.
    pub const fn try_new(value: u32) -> Result<Self, BoundsError<u32>> {
        if value < MIN || value > MAX {
            Err(BoundsError {
                value,
                min: MIN,
                max: MAX,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Return the wrapped value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl<const MIN: u32, const MAX: u32> Default for BoundedU32<MIN, MAX> {
    fn default() -> Self {
        Self::MIN
    }
}

impl<const MIN: u32, const MAX: u32> fmt::Display for BoundedU32<MIN, MAX> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl<const MIN: u32, const MAX: u32> Serialize for BoundedU32<MIN, MAX> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de, const MIN: u32, const MAX: u32> Deserialize<'de> for BoundedU32<MIN, MAX> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u32::deserialize(deserializer)?;
        Self::try_new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type PodCount = BoundedU32<1, 2>;

    #[test]
    fn bounded_u32_enforces_range() {
        assert!(PodCount::try_new(0).is_err());
        assert_eq!(PodCount::try_new(2).map(PodCount::get), Ok(2));
        assert_eq!(PodCount::default().get(), 1);
    }

    #[test]
    fn bounded_u32_round_trips_through_json() -> Result<(), Box<dyn std::error::Error>> {
        let value: PodCount = serde_json::from_str("2")?;
        assert_eq!(serde_json::to_string(&value)?, "2");

        let error = serde_json::from_str::<PodCount>("3").err();
        assert_eq!(
            error.map(|error| error.to_string()),
            Some("value 3 is outside [1, 2]".to_owned())
        );
        Ok(())
    }
}
