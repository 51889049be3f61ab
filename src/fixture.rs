//! Fixture loading and test resource naming.
//!
//! Fixtures are declared-configuration templates stored as
//! `<fixtures_dir>/<resource_type>/<name>`. Every occurrence of
//! [`FIXTURE_PLACEHOLDER`] is replaced with the run's discriminator, so the
//! same template yields globally unique names per run while staying
//! deterministic for a given discriminator.

use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Prefix every test-created resource name starts with.
pub const TEST_RESOURCE_PREFIX: &str = "testAcc";

/// Token in fixture templates replaced by the run discriminator.
pub const FIXTURE_PLACEHOLDER: &str = "replace_with_uuid";

/// Errors that can occur while loading fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Fixture not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read fixture {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Name of a test resource for the given discriminator.
///
/// ```rust
/// use group_rule_harness::fixture::build_resource_name;
///
/// assert_eq!(build_resource_name(42), "testAcc_42");
/// ```
pub fn build_resource_name(discriminator: u32) -> String {
    format!("{}_{}", TEST_RESOURCE_PREFIX, discriminator)
}

/// A random discriminator for a new run.
///
/// Kept within the positive `i32` range so names stay short and match what
/// other tooling generates.
pub fn random_discriminator() -> u32 {
    (Uuid::new_v4().as_u128() as u32) & (i32::MAX as u32)
}

/// Loads fixture templates for one resource type.
#[derive(Debug, Clone)]
pub struct FixtureManager {
    path: PathBuf,
}

impl FixtureManager {
    /// Manager for `<fixtures_dir>/<resource_type>`.
    pub fn new(fixtures_dir: impl AsRef<Path>, resource_type: &str) -> Self {
        Self {
            path: fixtures_dir.as_ref().join(resource_type),
        }
    }

    /// Directory fixtures are read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load `name` and substitute the discriminator.
    pub fn get_fixture(&self, name: &str, discriminator: u32) -> Result<String, FixtureError> {
        let path = self.path.join(name);
        let raw = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FixtureError::NotFound { path: path.clone() }
            } else {
                FixtureError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        debug!("Loaded fixture {} for discriminator {}", path.display(), discriminator);
        Ok(render_fixture(&raw, discriminator))
    }
}

/// Substitute the discriminator into a raw template.
pub fn render_fixture(template: &str, discriminator: u32) -> String {
    template.replace(FIXTURE_PLACEHOLDER, &discriminator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> FixtureManager {
        FixtureManager::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"), "okta_group_rule")
    }

    #[test]
    fn test_rendered_name_matches_builder() {
        let rendered = render_fixture("name = \"testAcc_replace_with_uuid\"", 42);
        assert_eq!(rendered, format!("name = \"{}\"", build_resource_name(42)));
    }

    #[test]
    fn test_fixture_loading_is_deterministic() {
        let mgr = manager();
        let first = mgr.get_fixture("basic.tf", 7).unwrap();
        let second = mgr.get_fixture("basic.tf", 7).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("testAcc_7"));
        assert!(!first.contains(FIXTURE_PLACEHOLDER));
    }

    #[test]
    fn test_missing_fixture() {
        let err = manager().get_fixture("nope.tf", 1).unwrap_err();
        assert!(matches!(err, FixtureError::NotFound { .. }));
    }

    #[test]
    fn test_random_discriminator_is_non_negative_i32() {
        for _ in 0..32 {
            assert!(random_discriminator() <= i32::MAX as u32);
        }
    }
}
