//! Lifecycle verification and sweeping for identity-platform group rules.
//!
//! A group rule assigns every user matching an expression into a set of
//! groups. This crate checks that such rules behave correctly through their
//! whole lifecycle when managed declaratively, and cleans up rules that
//! earlier runs left behind.
//!
//! # Core Components
//!
//! - [`acceptance`] - Step runner, checks and the local convergence driver
//! - [`scenarios`] - The group rule scenarios and their entry points
//! - [`sweep`] - Removal of leftover rules with aggregated failures
//! - [`probe`] - Direct existence checks where 404 means "absent"
//! - [`client::GroupRuleClient`] - The platform seam, with an in-memory implementation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use group_rule_harness::{HarnessConfig, TestContext};
//! use group_rule_harness::client::InMemoryGroupRuleClient;
//! use group_rule_harness::scenarios::run_group_rule_crud;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::from_env()?;
//! let ctx = TestContext::new(config, InMemoryGroupRuleClient::new());
//!
//! ctx.sweep().await?;
//! let report = run_group_rule_crud(&ctx).await?;
//! println!("{} checks passed", report.checks_passed);
//! # Ok(())
//! # }
//! ```

pub mod acceptance;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fixture;
pub mod probe;
pub mod rule;
pub mod scenarios;
pub mod sweep;

pub use client::{ClientError, GroupRuleClient, InMemoryGroupRuleClient};
pub use config::{ConfigurationError, HarnessConfig};
pub use context::{RunContext, TestContext};
pub use error::{ErrorList, HarnessError, HarnessResult};
pub use probe::{RuleLookup, group_rule_exists, lookup_rule};
pub use rule::{Rule, RuleDefinition, RuleExpression, RuleId, RuleStatus};
pub use sweep::{SweepError, SweepFailure, SweepReport, sweep_group_rules};
