//! In-memory identity platform for group rules.
//!
//! This module provides a thread-safe, in-process implementation of
//! [`GroupRuleClient`] that enforces the same lifecycle rules as the real
//! platform. It's designed for testing the harness itself and for
//! exercising scenarios without network access.
//!
//! # Features
//!
//! * Rules are created INACTIVE and must be deactivated before update or delete
//! * Unknown ids answer with a 404 [`ClientError`]
//! * Listing honours the requested limit and returns rules in creation order
//! * Failures can be injected per operation and rule for error-path tests
//! * Every rule call and every group create or delete is recorded so tests
//!   can assert on call sequences
//!
//! # Example Usage
//!
//! ```rust
//! use group_rule_harness::client::{GroupRuleClient, InMemoryGroupRuleClient, RuleOperation};
//! use group_rule_harness::rule::{RuleDefinition, RuleExpression, RuleStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = InMemoryGroupRuleClient::new();
//! let rule = client
//!     .insert_rule(
//!         RuleDefinition::new("leftover", RuleExpression::new("true"), Vec::new()),
//!         RuleStatus::Active,
//!     )
//!     .await;
//!
//! // Deleting an active rule is refused
//! assert!(client.delete_rule(&rule.id).await.is_err());
//!
//! client.inject_failure(RuleOperation::Deactivate, Some(rule.id.clone())).await;
//! assert!(client.deactivate_rule(&rule.id).await.is_err());
//! # Ok(())
//! # }
//! ```

use crate::client::{ClientError, GroupRuleClient, ListParams};
use crate::rule::{
    GROUP_RULE_TYPE, Group, GroupAssignment, Rule, RuleActions, RuleConditions, RuleDefinition,
    RuleId, RuleStatus,
};
use chrono::Utc;
use log::{debug, trace};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Records returned by `list_rules` when no limit is given.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Platform operations, used for call recording and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleOperation {
    List,
    Get,
    Create,
    Update,
    Activate,
    Deactivate,
    Delete,
    CreateGroup,
    DeleteGroup,
}

/// One call made against the in-memory platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: RuleOperation,
    pub rule_id: Option<RuleId>,
    /// Set for group operations
    pub group_id: Option<String>,
}

/// Statistics about the current platform contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryPlatformStats {
    /// Number of rules, in any status
    pub rule_count: usize,
    /// Number of rules currently ACTIVE
    pub active_rules: usize,
    /// Number of groups
    pub group_count: usize,
}

#[derive(Default)]
struct PlatformData {
    // Keys embed a sequence number, so iteration follows creation order
    rules: BTreeMap<RuleId, Rule>,
    groups: BTreeMap<String, Group>,
    faults: HashSet<(RuleOperation, Option<RuleId>)>,
    calls: Vec<RecordedCall>,
    sequence: u64,
}

impl PlatformData {
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        let entropy = Uuid::new_v4().simple().to_string();
        format!("{}{:06}{}", prefix, self.sequence, &entropy[..11])
    }

    fn record(&mut self, operation: RuleOperation, rule_id: Option<&RuleId>) {
        trace!("In-memory platform call {:?} {:?}", operation, rule_id);
        self.calls.push(RecordedCall {
            operation,
            rule_id: rule_id.cloned(),
            group_id: None,
        });
    }

    /// Record a group call and fail it if `operation` was faulted globally.
    fn enter_group(&mut self, operation: RuleOperation, group_id: &str) -> Result<(), ClientError> {
        trace!("In-memory platform call {:?} group {}", operation, group_id);
        self.calls.push(RecordedCall {
            operation,
            rule_id: None,
            group_id: Some(group_id.to_string()),
        });

        if self.faults.contains(&(operation, None)) {
            return Err(ClientError::internal(format!(
                "Injected failure for {:?} on group {}",
                operation, group_id
            )));
        }

        Ok(())
    }

    /// Record the call and fail it if a matching fault was injected.
    fn enter(
        &mut self,
        operation: RuleOperation,
        rule_id: Option<&RuleId>,
    ) -> Result<(), ClientError> {
        self.record(operation, rule_id);

        let targeted = rule_id
            .map(|id| self.faults.contains(&(operation, Some(id.clone()))))
            .unwrap_or(false);
        if targeted || self.faults.contains(&(operation, None)) {
            return Err(ClientError::internal(format!(
                "Injected failure for {:?}{}",
                operation,
                rule_id.map(|id| format!(" on rule {}", id)).unwrap_or_default()
            )));
        }

        Ok(())
    }

    fn rule_mut(&mut self, id: &RuleId) -> Result<&mut Rule, ClientError> {
        self.rules
            .get_mut(id)
            .ok_or_else(|| ClientError::not_found("GroupRule", id.as_str()))
    }

    fn check_groups(&self, definition: &RuleDefinition) -> Result<(), ClientError> {
        if definition.name.trim().is_empty() {
            return Err(ClientError::bad_request(
                "Api validation failed: name: The field cannot be left blank",
            ));
        }

        for group_id in &definition.group_ids {
            if !self.groups.contains_key(group_id) {
                return Err(ClientError::bad_request(format!(
                    "Api validation failed: actions.assignUserToGroups.groupIds: group '{}' does not exist",
                    group_id
                )));
            }
        }

        Ok(())
    }
}

/// Thread-safe in-memory group rule platform.
///
/// Clones share the same underlying data, so a test can hand one clone to a
/// driver and keep another for inspection.
#[derive(Clone, Default)]
pub struct InMemoryGroupRuleClient {
    data: Arc<RwLock<PlatformData>>,
}

impl InMemoryGroupRuleClient {
    /// Create a new empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rule directly with the given status.
    ///
    /// Bypasses group validation and call recording; used to seed leftovers
    /// for sweep tests.
    pub async fn insert_rule(&self, definition: RuleDefinition, status: RuleStatus) -> Rule {
        let mut data = self.data.write().await;
        let id = RuleId::new_unchecked(data.next_id("0pr"));
        let now = Utc::now();
        let rule = build_rule(id.clone(), definition, status, now);
        data.rules.insert(id, rule.clone());
        rule
    }

    /// Make every future `operation` call fail, either for one rule or,
    /// with `None`, for all of them.
    pub async fn inject_failure(&self, operation: RuleOperation, rule_id: Option<RuleId>) {
        let mut data = self.data.write().await;
        data.faults.insert((operation, rule_id));
    }

    /// Remove every injected failure.
    pub async fn clear_failures(&self) {
        self.data.write().await.faults.clear();
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.data.read().await.calls.clone()
    }

    /// Calls of one kind, in order.
    pub async fn calls_for(&self, operation: RuleOperation) -> Vec<RecordedCall> {
        self.data
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.data.write().await.calls.clear();
    }

    /// Snapshot of all rules without recording a call.
    pub async fn rules(&self) -> Vec<Rule> {
        self.data.read().await.rules.values().cloned().collect()
    }

    pub async fn stats(&self) -> InMemoryPlatformStats {
        let data = self.data.read().await;
        InMemoryPlatformStats {
            rule_count: data.rules.len(),
            active_rules: data.rules.values().filter(|r| r.is_active()).count(),
            group_count: data.groups.len(),
        }
    }

    /// Clear all data, faults and recorded calls.
    pub async fn clear(&self) {
        let mut data = self.data.write().await;
        *data = PlatformData::default();
    }
}

fn build_rule(
    id: RuleId,
    definition: RuleDefinition,
    status: RuleStatus,
    now: chrono::DateTime<Utc>,
) -> Rule {
    Rule {
        id,
        rule_type: GROUP_RULE_TYPE.to_string(),
        name: definition.name,
        status,
        conditions: RuleConditions {
            expression: definition.expression,
        },
        actions: RuleActions {
            assign_user_to_groups: GroupAssignment {
                group_ids: definition.group_ids,
            },
        },
        created: now,
        last_updated: now,
    }
}

impl GroupRuleClient for InMemoryGroupRuleClient {
    async fn list_rules(&self, params: &ListParams) -> Result<Vec<Rule>, ClientError> {
        let mut data = self.data.write().await;
        data.enter(RuleOperation::List, None)?;

        let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT) as usize;
        let rules: Vec<Rule> = data.rules.values().take(limit).cloned().collect();
        debug!("Listed {} group rules (limit {})", rules.len(), limit);
        Ok(rules)
    }

    async fn get_rule(&self, id: &RuleId) -> Result<Rule, ClientError> {
        let mut data = self.data.write().await;
        data.enter(RuleOperation::Get, Some(id))?;
        data.rules
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("GroupRule", id.as_str()))
    }

    async fn create_rule(&self, definition: &RuleDefinition) -> Result<Rule, ClientError> {
        let mut data = self.data.write().await;
        data.enter(RuleOperation::Create, None)?;
        data.check_groups(definition)?;

        let id = RuleId::new_unchecked(data.next_id("0pr"));
        let rule = build_rule(id.clone(), definition.clone(), RuleStatus::Inactive, Utc::now());
        data.rules.insert(id.clone(), rule.clone());
        debug!("Created group rule {} ('{}')", id, rule.name);
        Ok(rule)
    }

    async fn update_rule(
        &self,
        id: &RuleId,
        definition: &RuleDefinition,
    ) -> Result<Rule, ClientError> {
        let mut data = self.data.write().await;
        data.enter(RuleOperation::Update, Some(id))?;
        data.check_groups(definition)?;

        let rule = data.rule_mut(id)?;
        if rule.is_active() {
            return Err(ClientError::bad_request(format!(
                "Api validation failed: rule {} must be INACTIVE before it can be updated",
                id
            )));
        }

        rule.name = definition.name.clone();
        rule.conditions.expression = definition.expression.clone();
        rule.actions.assign_user_to_groups.group_ids = definition.group_ids.clone();
        rule.last_updated = Utc::now();
        debug!("Updated group rule {}", id);
        Ok(rule.clone())
    }

    async fn activate_rule(&self, id: &RuleId) -> Result<(), ClientError> {
        let mut data = self.data.write().await;
        data.enter(RuleOperation::Activate, Some(id))?;
        let rule = data.rule_mut(id)?;
        rule.status = RuleStatus::Active;
        rule.last_updated = Utc::now();
        Ok(())
    }

    async fn deactivate_rule(&self, id: &RuleId) -> Result<(), ClientError> {
        let mut data = self.data.write().await;
        data.enter(RuleOperation::Deactivate, Some(id))?;
        let rule = data.rule_mut(id)?;
        rule.status = RuleStatus::Inactive;
        rule.last_updated = Utc::now();
        Ok(())
    }

    async fn delete_rule(&self, id: &RuleId) -> Result<(), ClientError> {
        let mut data = self.data.write().await;
        data.enter(RuleOperation::Delete, Some(id))?;

        if data.rule_mut(id)?.is_active() {
            return Err(ClientError::bad_request(format!(
                "Api validation failed: rule {} must be INACTIVE before it can be deleted",
                id
            )));
        }

        data.rules.remove(id);
        debug!("Deleted group rule {}", id);
        Ok(())
    }

    async fn create_group(&self, name: &str) -> Result<Group, ClientError> {
        let mut data = self.data.write().await;
        if name.trim().is_empty() {
            return Err(ClientError::bad_request(
                "Api validation failed: profile.name: The field cannot be left blank",
            ));
        }

        let group = Group {
            id: data.next_id("00g"),
            name: name.to_string(),
        };
        data.enter_group(RuleOperation::CreateGroup, &group.id)?;
        data.groups.insert(group.id.clone(), group.clone());
        debug!("Created group {} ('{}')", group.id, group.name);
        Ok(group)
    }

    async fn get_group(&self, id: &str) -> Result<Group, ClientError> {
        let data = self.data.read().await;
        data.groups
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("Group", id))
    }

    async fn delete_group(&self, id: &str) -> Result<(), ClientError> {
        let mut data = self.data.write().await;
        data.enter_group(RuleOperation::DeleteGroup, id)?;
        match data.groups.remove(id) {
            Some(_) => {
                debug!("Deleted group {}", id);
                Ok(())
            }
            None => Err(ClientError::not_found("Group", id)),
        }
    }
}
