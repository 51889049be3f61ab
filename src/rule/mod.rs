//! Group rule model.
//!
//! A group rule assigns every user matching a boolean expression into one or
//! more groups. The types here mirror the platform's JSON representation:
//!
//! ```json
//! {
//!   "id": "0pr3f7zMZZHPgUoWO0g4",
//!   "type": "group_rule",
//!   "status": "ACTIVE",
//!   "name": "testAcc_42",
//!   "conditions": {
//!     "expression": {
//!       "type": "urn:okta:expression:1.0",
//!       "value": "String.startsWith(user.articulateId,\"auth0|\")"
//!     }
//!   },
//!   "actions": { "assignUserToGroups": { "groupIds": ["00g1"] } }
//! }
//! ```

pub mod rule_id;

pub use rule_id::{RuleId, RuleIdError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Expression language identifier used by every rule the harness manages.
pub const DEFAULT_EXPRESSION_TYPE: &str = "urn:okta:expression:1.0";

/// The `type` discriminator the platform stamps on group rules.
pub const GROUP_RULE_TYPE: &str = "group_rule";

/// Activation state of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleStatus {
    Active,
    Inactive,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Active => "ACTIVE",
            RuleStatus::Inactive => "INACTIVE",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RuleStatus::Active)
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown rule status '{0}', expected ACTIVE or INACTIVE")]
pub struct UnknownRuleStatus(pub String);

impl FromStr for RuleStatus {
    type Err = UnknownRuleStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(RuleStatus::Active),
            "INACTIVE" => Ok(RuleStatus::Inactive),
            other => Err(UnknownRuleStatus(other.to_string())),
        }
    }
}

/// The predicate a rule evaluates against user profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExpression {
    /// Expression language identifier
    #[serde(rename = "type")]
    pub expression_type: String,
    /// The expression itself
    pub value: String,
}

impl RuleExpression {
    /// Expression in the default expression language.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            expression_type: DEFAULT_EXPRESSION_TYPE.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConditions {
    pub expression: RuleExpression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignment {
    pub group_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleActions {
    pub assign_user_to_groups: GroupAssignment,
}

/// A group rule as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    #[serde(rename = "type", default = "default_rule_type")]
    pub rule_type: String,
    pub name: String,
    pub status: RuleStatus,
    pub conditions: RuleConditions,
    pub actions: RuleActions,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

fn default_rule_type() -> String {
    GROUP_RULE_TYPE.to_string()
}

impl Rule {
    pub fn expression(&self) -> &RuleExpression {
        &self.conditions.expression
    }

    /// Groups matching users are assigned into.
    pub fn group_ids(&self) -> &BTreeSet<String> {
        &self.actions.assign_user_to_groups.group_ids
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// The mutable portion of this rule, as a definition.
    pub fn definition(&self) -> RuleDefinition {
        RuleDefinition {
            name: self.name.clone(),
            expression: self.conditions.expression.clone(),
            group_ids: self.group_ids().clone(),
        }
    }
}

/// Body of a create or update call: everything a caller may set.
///
/// Status is deliberately absent; activation has dedicated calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    pub expression: RuleExpression,
    pub group_ids: BTreeSet<String>,
}

impl RuleDefinition {
    pub fn new(
        name: impl Into<String>,
        expression: RuleExpression,
        group_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            expression,
            group_ids: group_ids.into_iter().collect(),
        }
    }
}

/// A group a rule can target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}
