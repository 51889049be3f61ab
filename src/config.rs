//! Harness configuration.
//!
//! Configuration is read once per test process, usually from the
//! environment, and then handed to a [`TestContext`](crate::context::TestContext).
//! It is immutable once built.
//!
//! # Example Usage
//!
//! ```rust
//! use group_rule_harness::config::HarnessConfig;
//!
//! let config = HarnessConfig::builder("dev-123456")
//!     .with_api_token("00abc")
//!     .with_sweep_page_limit(50)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.base_url, "okta.com");
//! assert_eq!(config.org_url(), "https://dev-123456.okta.com");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable holding the organisation name.
pub const ENV_ORG_NAME: &str = "OKTA_ORG_NAME";
/// Environment variable holding the base domain.
pub const ENV_BASE_URL: &str = "OKTA_BASE_URL";
/// Environment variable holding the API token.
pub const ENV_API_TOKEN: &str = "OKTA_API_TOKEN";
/// Environment variable overriding the fixture directory.
pub const ENV_FIXTURES_DIR: &str = "GROUP_RULE_FIXTURES_DIR";
/// Environment variable overriding the sweep listing limit.
pub const ENV_SWEEP_LIMIT: &str = "GROUP_RULE_SWEEP_LIMIT";

/// Default base domain for organisations.
pub const DEFAULT_BASE_URL: &str = "okta.com";
/// Default number of rules fetched by the single sweep listing call.
pub const DEFAULT_SWEEP_PAGE_LIMIT: u32 = 300;

/// Errors that can occur while building or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required setting was not provided
    #[error("Missing required setting: {setting}")]
    Missing { setting: String },

    /// A setting was present but unusable
    #[error("Invalid value for {setting}: {message}")]
    Invalid { setting: String, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Settings shared by every scenario and sweep in a test process.
///
/// The API token is never serialized and is redacted from `Debug` output.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// Organisation (tenant) name on the identity platform
    pub org_name: String,
    /// Base domain the organisation lives under
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API token; required before any scenario runs
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
    /// Root directory holding `<resource_type>/<fixture>` templates
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: PathBuf,
    /// Record limit for the sweep's single listing call
    #[serde(default = "default_sweep_page_limit")]
    pub sweep_page_limit: u32,
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("org_name", &self.org_name)
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("fixtures_dir", &self.fixtures_dir)
            .field("sweep_page_limit", &self.sweep_page_limit)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn default_sweep_page_limit() -> u32 {
    DEFAULT_SWEEP_PAGE_LIMIT
}

impl HarnessConfig {
    /// Create a new builder for the given organisation.
    pub fn builder(org_name: impl Into<String>) -> HarnessConfigBuilder {
        HarnessConfigBuilder::new(org_name)
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let org_name = read(ENV_ORG_NAME).ok_or_else(|| ConfigurationError::Missing {
            setting: ENV_ORG_NAME.to_string(),
        })?;

        let mut builder = HarnessConfigBuilder::new(org_name);
        if let Some(base_url) = read(ENV_BASE_URL) {
            builder = builder.with_base_url(base_url);
        }
        if let Some(token) = read(ENV_API_TOKEN) {
            builder = builder.with_api_token(token);
        }
        if let Some(dir) = read(ENV_FIXTURES_DIR) {
            builder = builder.with_fixtures_dir(dir);
        }
        if let Some(limit) = read(ENV_SWEEP_LIMIT) {
            let parsed = limit
                .trim()
                .parse::<u32>()
                .map_err(|e| ConfigurationError::Invalid {
                    setting: ENV_SWEEP_LIMIT.to_string(),
                    message: e.to_string(),
                })?;
            builder = builder.with_sweep_page_limit(parsed);
        }

        builder.build()
    }

    /// Parse configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.org_name.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                setting: ENV_ORG_NAME.to_string(),
            });
        }

        if self.base_url.trim().is_empty() || self.base_url.contains("://") {
            return Err(ConfigurationError::Invalid {
                setting: ENV_BASE_URL.to_string(),
                message: format!("expected a bare domain, got '{}'", self.base_url),
            });
        }

        if self.sweep_page_limit == 0 {
            return Err(ConfigurationError::Invalid {
                setting: ENV_SWEEP_LIMIT.to_string(),
                message: "sweep page limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Check that everything a live scenario needs is present.
    ///
    /// Scenarios call this before applying their first step so that a
    /// missing credential fails fast instead of surfacing as an API error.
    pub fn pre_check(&self) -> Result<(), ConfigurationError> {
        self.validate()?;
        match self.api_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(()),
            _ => Err(ConfigurationError::Missing {
                setting: ENV_API_TOKEN.to_string(),
            }),
        }
    }

    /// Full URL of the organisation.
    pub fn org_url(&self) -> String {
        format!("https://{}.{}", self.org_name, self.base_url)
    }
}

/// Builder for [`HarnessConfig`].
#[derive(Debug, Clone)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// Start a builder with defaults for everything but the organisation.
    pub fn new(org_name: impl Into<String>) -> Self {
        Self {
            config: HarnessConfig {
                org_name: org_name.into(),
                base_url: default_base_url(),
                api_token: None,
                fixtures_dir: default_fixtures_dir(),
                sweep_page_limit: DEFAULT_SWEEP_PAGE_LIMIT,
            },
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Some(token.into());
        self
    }

    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.fixtures_dir = dir.into();
        self
    }

    pub fn with_sweep_page_limit(mut self, limit: u32) -> Self {
        self.config.sweep_page_limit = limit;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<HarnessConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_settings() {
        let config = HarnessConfig::from_lookup(lookup_from(&[
            (ENV_ORG_NAME, "dev-1"),
            (ENV_BASE_URL, "oktapreview.com"),
            (ENV_API_TOKEN, "token"),
            (ENV_FIXTURES_DIR, "/tmp/fixtures"),
            (ENV_SWEEP_LIMIT, "25"),
        ]))
        .unwrap();

        assert_eq!(config.org_name, "dev-1");
        assert_eq!(config.base_url, "oktapreview.com");
        assert_eq!(config.api_token.as_deref(), Some("token"));
        assert_eq!(config.fixtures_dir, PathBuf::from("/tmp/fixtures"));
        assert_eq!(config.sweep_page_limit, 25);
        assert!(config.pre_check().is_ok());
    }

    #[test]
    fn test_from_lookup_requires_org_name() {
        let err = HarnessConfig::from_lookup(lookup_from(&[(ENV_API_TOKEN, "t")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::Missing { setting } if setting == ENV_ORG_NAME));
    }

    #[test]
    fn test_invalid_sweep_limit() {
        let err = HarnessConfig::from_lookup(lookup_from(&[
            (ENV_ORG_NAME, "dev-1"),
            (ENV_SWEEP_LIMIT, "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { .. }));

        let err = HarnessConfig::builder("dev-1")
            .with_sweep_page_limit(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { .. }));
    }

    #[test]
    fn test_pre_check_requires_token() {
        let config = HarnessConfig::builder("dev-1").build().unwrap();
        let err = config.pre_check().unwrap_err();
        assert!(matches!(err, ConfigurationError::Missing { setting } if setting == ENV_API_TOKEN));
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let config = HarnessConfig::from_json(r#"{"org_name": "dev-9"}"#).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.sweep_page_limit, DEFAULT_SWEEP_PAGE_LIMIT);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_api_token_is_kept_out_of_output() {
        let config = HarnessConfig::builder("dev-1")
            .with_api_token("00secret-token")
            .build()
            .unwrap();

        let debug = format!("{:?}", config);
        assert!(!debug.contains("00secret-token"));
        assert!(debug.contains("<redacted>"));
        let builder = HarnessConfig::builder("dev-1").with_api_token("00secret-token");
        assert!(!format!("{:?}", builder).contains("00secret-token"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("00secret-token"));
        assert!(!json.contains("api_token"));

        let restored = HarnessConfig::from_json(&json).unwrap();
        assert_eq!(restored.org_name, "dev-1");
        assert!(restored.api_token.is_none());

        let with_token =
            HarnessConfig::from_json(r#"{"org_name": "dev-1", "api_token": "t"}"#).unwrap();
        assert_eq!(with_token.api_token.as_deref(), Some("t"));
    }

    #[test]
    fn test_base_url_must_be_bare_domain() {
        let err = HarnessConfig::builder("dev-1")
            .with_base_url("https://okta.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { .. }));
    }
}
