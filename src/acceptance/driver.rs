//! Drivers that converge declared configurations onto the platform.
//!
//! [`Driver`] is the seam the acceptance runner talks to. [`LocalDriver`]
//! implements it directly on top of a [`GroupRuleClient`], managing two
//! resource types:
//!
//! * `okta_group`: `name`
//! * `okta_group_rule`: `name`, `status` (default `ACTIVE`),
//!   `expression_type` (default `urn:okta:expression:1.0`),
//!   `expression_value`, `group_assignments`
//!
//! Convergence follows the platform's rules: new rules are created INACTIVE
//! and activated afterwards; an ACTIVE rule is deactivated before its
//! definition is updated and reactivated afterwards; rules are deactivated
//! before they are deleted. Resources dropped from a configuration are
//! destroyed at the end of the apply. Nothing is retried.

use crate::acceptance::parser::{
    ConfigValue, DeclaredConfig, DeclaredResource, ParseError, interpolate, parse_config,
};
use crate::acceptance::state::{ResourceAddress, ResourceState, State};
use crate::client::{ClientError, GroupRuleClient};
use crate::probe::group_rule_exists;
use crate::rule::{
    DEFAULT_EXPRESSION_TYPE, Rule, RuleDefinition, RuleExpression, RuleId, RuleIdError, RuleStatus,
};
use log::{debug, info};
use std::future::Future;
use thiserror::Error;

/// Resource type for groups.
pub const GROUP_RESOURCE: &str = "okta_group";
/// Resource type for group rules.
pub const GROUP_RULE_RESOURCE: &str = "okta_group_rule";

/// Errors raised while converging or destroying resources.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] ParseError),

    #[error("Unsupported resource type '{resource_type}'")]
    UnsupportedResource { resource_type: String },

    #[error("{address}: missing required attribute '{attribute}'")]
    MissingAttribute {
        address: ResourceAddress,
        attribute: String,
    },

    #[error("{address}: invalid value for '{attribute}': {message}")]
    InvalidAttribute {
        address: ResourceAddress,
        attribute: String,
        message: String,
    },

    #[error("{address}: unresolved reference '{reference}'")]
    UnresolvedReference {
        address: ResourceAddress,
        reference: String,
    },

    #[error("{address}: {operation} failed: {source}")]
    Client {
        address: ResourceAddress,
        operation: String,
        #[source]
        source: ClientError,
    },
}

/// Why the platform could not be asked whether a resource exists.
#[derive(Debug, Error)]
pub enum ExistenceError {
    /// The id recorded in state is not a valid group rule id
    #[error("recorded id '{id}' is not a valid group rule id: {source}")]
    InvalidId {
        id: String,
        #[source]
        source: RuleIdError,
    },

    #[error("no existence check for resource type '{0}'")]
    UnsupportedResource(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ApplyError {
    fn client(address: &ResourceAddress, operation: &str, source: ClientError) -> Self {
        ApplyError::Client {
            address: address.clone(),
            operation: operation.to_string(),
            source,
        }
    }
}

/// An orchestration driver as seen by the acceptance runner.
pub trait Driver: Send {
    /// Converge the platform onto `config` and return the resulting state.
    ///
    /// Returns only once every resource has converged.
    fn apply(&mut self, config: &str) -> impl Future<Output = Result<State, ApplyError>> + Send;

    /// Destroy everything the driver manages, returning what was removed.
    fn destroy(&mut self) -> impl Future<Output = Result<Vec<ResourceAddress>, ApplyError>> + Send;

    /// Ask the platform directly whether a recorded resource still exists.
    fn resource_exists(
        &self,
        address: &ResourceAddress,
        resource: &ResourceState,
    ) -> impl Future<Output = Result<bool, ExistenceError>> + Send;
}

/// Desired state of one rule after interpolation and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DesiredRule {
    definition: RuleDefinition,
    status: RuleStatus,
}

/// A driver that talks to a [`GroupRuleClient`] directly.
pub struct LocalDriver<C> {
    client: C,
    state: State,
}

impl<C: GroupRuleClient> LocalDriver<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: State::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// State after the last apply or destroy.
    pub fn state(&self) -> &State {
        &self.state
    }

    async fn converge(&mut self, config: &DeclaredConfig) -> Result<(), ApplyError> {
        for resource in &config.resources {
            let resource_type = resource.address.resource_type();
            if resource_type != GROUP_RESOURCE && resource_type != GROUP_RULE_RESOURCE {
                return Err(ApplyError::UnsupportedResource {
                    resource_type: resource_type.to_string(),
                });
            }
        }

        // Groups first: rules reference their ids
        let mut replaced_groups = Vec::new();
        for resource in config.resources_of(GROUP_RESOURCE) {
            if let Some(old_id) = self.converge_group(resource).await? {
                replaced_groups.push((resource.address.clone(), old_id));
            }
        }

        for resource in config.resources_of(GROUP_RULE_RESOURCE) {
            let desired = self.desired_rule(resource)?;
            self.converge_rule(&resource.address, desired).await?;
        }

        for address in self.state.addresses_of(GROUP_RULE_RESOURCE) {
            if !config.contains(&address) {
                self.destroy_rule(&address).await?;
            }
        }

        for (address, old_id) in replaced_groups {
            self.delete_group(&address, &old_id).await?;
        }

        for address in self.state.addresses_of(GROUP_RESOURCE) {
            if !config.contains(&address) {
                self.destroy_group(&address).await?;
            }
        }

        Ok(())
    }

    /// Create the group if needed. Returns the id of a replaced group, which
    /// the caller deletes once nothing references it any more.
    async fn converge_group(
        &mut self,
        resource: &DeclaredResource,
    ) -> Result<Option<String>, ApplyError> {
        let address = &resource.address;
        let name = self.string_attribute(resource, "name")?.ok_or_else(|| {
            ApplyError::MissingAttribute {
                address: address.clone(),
                attribute: "name".to_string(),
            }
        })?;

        let previous = self.state.get(address).cloned();
        if let Some(existing) = &previous {
            if existing.attribute("name") == Some(name.as_str()) {
                return Ok(None);
            }
        }

        let group = self
            .client
            .create_group(&name)
            .await
            .map_err(|e| ApplyError::client(address, "create group", e))?;
        debug!("{}: created group {}", address, group.id);
        self.state.insert(
            address.clone(),
            ResourceState::new(group.id).with_attribute("name", group.name),
        );

        Ok(previous.map(|p| p.id().to_string()))
    }

    fn string_attribute(
        &self,
        resource: &DeclaredResource,
        key: &str,
    ) -> Result<Option<String>, ApplyError> {
        match resource.get(key) {
            None => Ok(None),
            Some(ConfigValue::String(raw)) => self.resolve(&resource.address, raw).map(Some),
            Some(ConfigValue::List(_)) => Err(ApplyError::InvalidAttribute {
                address: resource.address.clone(),
                attribute: key.to_string(),
                message: "expected a string, found a list".to_string(),
            }),
        }
    }

    fn list_attribute(
        &self,
        resource: &DeclaredResource,
        key: &str,
    ) -> Result<Vec<String>, ApplyError> {
        match resource.get(key) {
            None => Ok(Vec::new()),
            Some(ConfigValue::List(items)) => items
                .iter()
                .map(|raw| self.resolve(&resource.address, raw))
                .collect(),
            Some(ConfigValue::String(_)) => Err(ApplyError::InvalidAttribute {
                address: resource.address.clone(),
                attribute: key.to_string(),
                message: "expected a list, found a string".to_string(),
            }),
        }
    }

    fn resolve(&self, address: &ResourceAddress, raw: &str) -> Result<String, ApplyError> {
        interpolate(raw, |reference| self.state.resolve_reference(reference)).map_err(|reference| {
            ApplyError::UnresolvedReference {
                address: address.clone(),
                reference,
            }
        })
    }

    fn desired_rule(&self, resource: &DeclaredResource) -> Result<DesiredRule, ApplyError> {
        let address = &resource.address;
        let required = |key: &str, value: Option<String>| {
            value.ok_or_else(|| ApplyError::MissingAttribute {
                address: address.clone(),
                attribute: key.to_string(),
            })
        };

        let name = required("name", self.string_attribute(resource, "name")?)?;
        let expression_value = required(
            "expression_value",
            self.string_attribute(resource, "expression_value")?,
        )?;
        let expression_type = self
            .string_attribute(resource, "expression_type")?
            .unwrap_or_else(|| DEFAULT_EXPRESSION_TYPE.to_string());
        let status = match self.string_attribute(resource, "status")? {
            None => RuleStatus::Active,
            Some(raw) => raw.parse::<RuleStatus>().map_err(|e| {
                ApplyError::InvalidAttribute {
                    address: address.clone(),
                    attribute: "status".to_string(),
                    message: e.to_string(),
                }
            })?,
        };
        let group_ids = self.list_attribute(resource, "group_assignments")?;

        Ok(DesiredRule {
            definition: RuleDefinition {
                name,
                expression: RuleExpression {
                    expression_type,
                    value: expression_value,
                },
                group_ids: group_ids.into_iter().collect(),
            },
            status,
        })
    }

    async fn converge_rule(
        &mut self,
        address: &ResourceAddress,
        desired: DesiredRule,
    ) -> Result<(), ApplyError> {
        let recorded_id = self.state.get(address).map(|r| r.id().to_string());
        let current = match recorded_id {
            Some(id) => self.refresh_rule(address, &id).await?,
            None => None,
        };

        let id = match current {
            None => {
                let rule = self
                    .client
                    .create_rule(&desired.definition)
                    .await
                    .map_err(|e| ApplyError::client(address, "create rule", e))?;
                info!("{}: created group rule {}", address, rule.id);
                // Record before activating so a failed activation is still torn down
                self.record_rule(address, &rule);
                if desired.status.is_active() {
                    self.set_status(address, &rule.id, RuleStatus::Active).await?;
                }
                rule.id
            }
            Some(rule) => {
                if rule.definition() != desired.definition {
                    if rule.is_active() {
                        self.set_status(address, &rule.id, RuleStatus::Inactive).await?;
                    }
                    self.client
                        .update_rule(&rule.id, &desired.definition)
                        .await
                        .map_err(|e| ApplyError::client(address, "update rule", e))?;
                    info!("{}: updated group rule {}", address, rule.id);
                    if desired.status.is_active() {
                        self.set_status(address, &rule.id, RuleStatus::Active).await?;
                    }
                } else if rule.status != desired.status {
                    self.set_status(address, &rule.id, desired.status).await?;
                }
                rule.id
            }
        };

        let refreshed = self
            .client
            .get_rule(&id)
            .await
            .map_err(|e| ApplyError::client(address, "read rule", e))?;
        self.record_rule(address, &refreshed);
        Ok(())
    }

    /// Read the rule behind a state entry; `None` when it vanished remotely.
    async fn refresh_rule(
        &mut self,
        address: &ResourceAddress,
        id: &str,
    ) -> Result<Option<Rule>, ApplyError> {
        let Ok(rule_id) = RuleId::new(id) else {
            self.state.remove(address);
            return Ok(None);
        };

        match self.client.get_rule(&rule_id).await {
            Ok(rule) => Ok(Some(rule)),
            Err(e) if e.is_not_found() => {
                debug!("{}: rule {} is gone, it will be recreated", address, rule_id);
                self.state.remove(address);
                Ok(None)
            }
            Err(e) => Err(ApplyError::client(address, "read rule", e)),
        }
    }

    async fn set_status(
        &self,
        address: &ResourceAddress,
        id: &RuleId,
        status: RuleStatus,
    ) -> Result<(), ApplyError> {
        match status {
            RuleStatus::Active => self
                .client
                .activate_rule(id)
                .await
                .map_err(|e| ApplyError::client(address, "activate rule", e)),
            RuleStatus::Inactive => self
                .client
                .deactivate_rule(id)
                .await
                .map_err(|e| ApplyError::client(address, "deactivate rule", e)),
        }
    }

    fn record_rule(&mut self, address: &ResourceAddress, rule: &Rule) {
        let mut resource = ResourceState::new(rule.id.as_str())
            .with_attribute("name", rule.name.clone())
            .with_attribute("status", rule.status.as_str())
            .with_attribute("expression_type", rule.expression().expression_type.clone())
            .with_attribute("expression_value", rule.expression().value.clone());
        resource.set_list("group_assignments", rule.group_ids().iter().cloned());
        self.state.insert(address.clone(), resource);
    }

    async fn destroy_rule(&mut self, address: &ResourceAddress) -> Result<(), ApplyError> {
        let id = self.state_id(address);
        let Some(current) = self.refresh_rule(address, &id).await? else {
            return Ok(());
        };

        if current.is_active() {
            self.set_status(address, &current.id, RuleStatus::Inactive).await?;
        }
        match self.client.delete_rule(&current.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(ApplyError::client(address, "delete rule", e)),
        }

        info!("{}: destroyed group rule {}", address, current.id);
        self.state.remove(address);
        Ok(())
    }

    async fn destroy_group(&mut self, address: &ResourceAddress) -> Result<(), ApplyError> {
        let id = self.state_id(address);
        self.delete_group(address, &id).await?;
        self.state.remove(address);
        Ok(())
    }

    async fn delete_group(&self, address: &ResourceAddress, id: &str) -> Result<(), ApplyError> {
        match self.client.delete_group(id).await {
            Ok(()) => {
                debug!("{}: deleted group {}", address, id);
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ApplyError::client(address, "delete group", e)),
        }
    }

    fn state_id(&self, address: &ResourceAddress) -> String {
        self.state
            .get(address)
            .map(|r| r.id().to_string())
            .unwrap_or_default()
    }
}

impl<C: GroupRuleClient> Driver for LocalDriver<C> {
    async fn apply(&mut self, config: &str) -> Result<State, ApplyError> {
        let declared = parse_config(config)?;
        self.converge(&declared).await?;
        Ok(self.state.clone())
    }

    async fn destroy(&mut self) -> Result<Vec<ResourceAddress>, ApplyError> {
        let mut destroyed = Vec::new();

        for address in self.state.addresses_of(GROUP_RULE_RESOURCE) {
            self.destroy_rule(&address).await?;
            destroyed.push(address);
        }
        for address in self.state.addresses_of(GROUP_RESOURCE) {
            self.destroy_group(&address).await?;
            destroyed.push(address);
        }

        Ok(destroyed)
    }

    async fn resource_exists(
        &self,
        address: &ResourceAddress,
        resource: &ResourceState,
    ) -> Result<bool, ExistenceError> {
        match address.resource_type() {
            GROUP_RULE_RESOURCE => {
                let id = RuleId::new(resource.id()).map_err(|source| ExistenceError::InvalidId {
                    id: resource.id().to_string(),
                    source,
                })?;
                Ok(group_rule_exists(&self.client, &id).await?)
            }
            GROUP_RESOURCE => match self.client.get_group(resource.id()).await {
                Ok(_) => Ok(true),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(e.into()),
            },
            other => Err(ExistenceError::UnsupportedResource(other.to_string())),
        }
    }
}
