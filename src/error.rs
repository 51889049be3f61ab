//! Error types for the group rule harness.
//!
//! Each concern owns its own error enum (client, configuration, fixtures,
//! acceptance runs, sweeps). [`HarnessError`] wraps all of them for callers
//! that drive a complete scenario, and [`ErrorList`] collects several
//! independent failures into one value without dropping any of them.

use crate::acceptance::AcceptanceError;
use crate::client::ClientError;
use crate::config::ConfigurationError;
use crate::fixture::FixtureError;
use crate::sweep::SweepError;
use std::fmt;

/// Top-level error type for harness operations.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Harness configuration was missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A fixture could not be loaded
    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),

    /// A direct call against the identity platform failed
    #[error("Platform error: {0}")]
    Client(#[from] ClientError),

    /// An acceptance scenario failed
    #[error("Scenario failed: {0}")]
    Acceptance(#[from] AcceptanceError),

    /// A sweep could not clean up every rule
    #[error("Sweep failed: {0}")]
    Sweep(#[from] SweepError),
}

/// Result alias used by the scenario entry points.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// An ordered collection of independent errors.
///
/// Operations that keep going after a failure (such as a sweep) push every
/// failure here and turn the list into a single result at the end. Entries
/// keep their insertion order so reports read in the order calls were made.
///
/// ```rust
/// use group_rule_harness::error::ErrorList;
///
/// let mut errors: ErrorList<String> = ErrorList::new();
/// assert!(errors.clone().into_result().is_ok());
///
/// errors.push("first".to_string());
/// errors.push("second".to_string());
/// let condensed = errors.into_result().unwrap_err();
/// assert_eq!(condensed.len(), 2);
/// assert_eq!(condensed.to_string(), "2 errors occurred:\n\t* first\n\t* second");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorList<E> {
    errors: Vec<E>,
}

impl<E> ErrorList<E> {
    /// Create an empty error list.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Record another failure.
    pub fn push(&mut self, error: E) {
        self.errors.push(error);
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no failure has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the recorded failures in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.errors.iter()
    }

    /// Consume the list, returning the underlying failures.
    pub fn into_vec(self) -> Vec<E> {
        self.errors
    }

    /// Condense the list into a single result.
    ///
    /// Returns `Ok(())` when nothing was recorded, otherwise the whole list
    /// as the error value.
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl<E> Default for ErrorList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> From<Vec<E>> for ErrorList<E> {
    fn from(errors: Vec<E>) -> Self {
        Self { errors }
    }
}

impl<E> FromIterator<E> for ErrorList<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl<E> IntoIterator for ErrorList<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a ErrorList<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl<E: fmt::Display> fmt::Display for ErrorList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "no errors"),
            [single] => write!(f, "1 error occurred:\n\t* {}", single),
            errors => {
                write!(f, "{} errors occurred:", errors.len())?;
                for error in errors {
                    write!(f, "\n\t* {}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ErrorList<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_condenses_to_ok() {
        let errors: ErrorList<String> = ErrorList::new();
        assert!(errors.is_empty());
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn test_every_entry_is_preserved_in_order() {
        let errors: ErrorList<String> = vec!["a", "b", "c"]
            .into_iter()
            .map(String::from)
            .collect();

        let condensed = errors.into_result().unwrap_err();
        let collected: Vec<&str> = condensed.iter().map(String::as_str).collect();
        assert_eq!(collected, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_display_single_entry() {
        let mut errors = ErrorList::new();
        errors.push("boom");
        assert_eq!(errors.to_string(), "1 error occurred:\n\t* boom");
    }
}
