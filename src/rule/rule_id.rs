//! RuleId value object for platform-assigned rule identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Error returned when a rule identifier is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleIdError {
    #[error("Rule id cannot be empty")]
    Empty,

    #[error("Rule id '{id}' contains whitespace")]
    ContainsWhitespace { id: String },
}

/// An opaque identifier assigned to a rule by the identity platform.
///
/// The harness never interprets the contents; it only guarantees the value
/// is non-empty and free of whitespace, since ids are embedded in request
/// paths.
///
/// ```rust
/// use group_rule_harness::rule::RuleId;
///
/// let id = RuleId::new("0pr3f7zMZZHPgUoWO0g4").unwrap();
/// assert_eq!(id.as_str(), "0pr3f7zMZZHPgUoWO0g4");
/// assert!(RuleId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(String);

impl RuleId {
    /// Create a new RuleId with validation.
    pub fn new(value: impl Into<String>) -> Result<Self, RuleIdError> {
        let value = value.into();
        Self::validate_format(&value)?;
        Ok(Self(value))
    }

    /// Wrap a value the platform itself generated.
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn validate_format(value: &str) -> Result<(), RuleIdError> {
        if value.is_empty() {
            return Err(RuleIdError::Empty);
        }

        if value.chars().any(char::is_whitespace) {
            return Err(RuleIdError::ContainsWhitespace {
                id: value.to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for RuleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<String> for RuleId {
    type Error = RuleIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RuleId {
    type Error = RuleIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_whitespace() {
        assert_eq!(
            RuleId::new("0pr 1"),
            Err(RuleIdError::ContainsWhitespace {
                id: "0pr 1".to_string()
            })
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let id: RuleId = serde_json::from_str("\"0pr1\"").unwrap();
        assert_eq!(id.as_str(), "0pr1");

        let err = serde_json::from_str::<RuleId>("\"\"");
        assert!(err.is_err());
    }
}
