//! Identity platform client abstraction.
//!
//! [`GroupRuleClient`] is the seam between the harness and the platform. The
//! harness only relies on the operations below; how they reach the platform
//! (HTTP, a recorded cassette, an in-process fake) is up to the implementor.
//!
//! # Key Design Decisions
//!
//! - **Status travels with the error**: every platform failure is a
//!   [`ClientError`] that keeps its HTTP status, so a 404 can be treated as
//!   an answer rather than a failure where that makes sense.
//! - **Activation is separate**: create and update never change a rule's
//!   status; `activate_rule` / `deactivate_rule` do.
//! - **Rules must be inactive** before they can be updated or deleted.
//!
//! # Example Usage
//!
//! ```rust
//! use group_rule_harness::client::{GroupRuleClient, InMemoryGroupRuleClient, ListParams};
//! use group_rule_harness::rule::{RuleDefinition, RuleExpression, RuleStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = InMemoryGroupRuleClient::new();
//! let group = client.create_group("testAcc_1").await?;
//!
//! let definition = RuleDefinition::new(
//!     "testAcc_1",
//!     RuleExpression::new("user.department == \"Eng\""),
//!     [group.id.clone()],
//! );
//! let rule = client.create_rule(&definition).await?;
//! assert_eq!(rule.status, RuleStatus::Inactive);
//!
//! client.activate_rule(&rule.id).await?;
//! let rules = client.list_rules(&ListParams::with_limit(10)).await?;
//! assert_eq!(rules.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod in_memory;

pub use error::ClientError;
pub use in_memory::{InMemoryGroupRuleClient, InMemoryPlatformStats, RecordedCall, RuleOperation};

use crate::rule::{Group, Rule, RuleDefinition, RuleId};
use std::future::Future;

/// Query parameters for listing rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Maximum number of records to return in one page
    pub limit: Option<u32>,
}

impl ListParams {
    pub fn with_limit(limit: u32) -> Self {
        Self { limit: Some(limit) }
    }
}

/// Operations the harness needs from the identity platform.
pub trait GroupRuleClient: Send + Sync {
    /// Fetch one page of rules.
    fn list_rules(
        &self,
        params: &ListParams,
    ) -> impl Future<Output = Result<Vec<Rule>, ClientError>> + Send;

    /// Fetch a single rule. A missing rule is a 404 [`ClientError::Api`].
    fn get_rule(&self, id: &RuleId) -> impl Future<Output = Result<Rule, ClientError>> + Send;

    /// Create a rule. The platform creates rules INACTIVE.
    fn create_rule(
        &self,
        definition: &RuleDefinition,
    ) -> impl Future<Output = Result<Rule, ClientError>> + Send;

    /// Replace a rule's definition. Fails while the rule is ACTIVE.
    fn update_rule(
        &self,
        id: &RuleId,
        definition: &RuleDefinition,
    ) -> impl Future<Output = Result<Rule, ClientError>> + Send;

    fn activate_rule(&self, id: &RuleId) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn deactivate_rule(&self, id: &RuleId)
    -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Permanently remove a rule. Fails while the rule is ACTIVE.
    fn delete_rule(&self, id: &RuleId) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn create_group(&self, name: &str) -> impl Future<Output = Result<Group, ClientError>> + Send;

    fn get_group(&self, id: &str) -> impl Future<Output = Result<Group, ClientError>> + Send;

    fn delete_group(&self, id: &str) -> impl Future<Output = Result<(), ClientError>> + Send;
}
