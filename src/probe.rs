//! Direct existence checks against the platform.
//!
//! The acceptance driver keeps its own view of what it created. The probe
//! bypasses that view and asks the platform itself, so a scenario can
//! confirm that a rule really exists (or really is gone).
//!
//! A 404 is an answer, not a failure: [`lookup_rule`] turns it into
//! [`RuleLookup::NotFound`] and [`group_rule_exists`] into `Ok(false)`.

use crate::client::{ClientError, GroupRuleClient};
use crate::rule::{Rule, RuleId};
use log::debug;

/// Outcome of looking a rule up by id.
#[derive(Debug)]
pub enum RuleLookup {
    /// The platform returned the rule
    Found(Rule),
    /// The platform answered 404
    NotFound,
    /// Any other failure
    Failed(ClientError),
}

impl RuleLookup {
    /// Classify a raw client result.
    pub fn from_result(result: Result<Rule, ClientError>) -> Self {
        match result {
            Ok(rule) => RuleLookup::Found(rule),
            Err(err) if err.is_not_found() => RuleLookup::NotFound,
            Err(err) => RuleLookup::Failed(err),
        }
    }

    /// Collapse the lookup into the existence contract: found is `true`,
    /// not-found is `false`, anything else is an error.
    pub fn into_exists(self) -> Result<bool, ClientError> {
        match self {
            RuleLookup::Found(_) => Ok(true),
            RuleLookup::NotFound => Ok(false),
            RuleLookup::Failed(err) => Err(err),
        }
    }

    pub fn rule(&self) -> Option<&Rule> {
        match self {
            RuleLookup::Found(rule) => Some(rule),
            _ => None,
        }
    }
}

/// Look a rule up directly on the platform.
pub async fn lookup_rule<C: GroupRuleClient>(client: &C, id: &RuleId) -> RuleLookup {
    let lookup = RuleLookup::from_result(client.get_rule(id).await);
    debug!(
        "Existence probe for group rule {}: {}",
        id,
        match &lookup {
            RuleLookup::Found(_) => "found",
            RuleLookup::NotFound => "not found",
            RuleLookup::Failed(_) => "failed",
        }
    );
    lookup
}

/// Whether a rule currently exists on the platform.
pub async fn group_rule_exists<C: GroupRuleClient>(
    client: &C,
    id: &RuleId,
) -> Result<bool, ClientError> {
    lookup_rule(client, id).await.into_exists()
}
