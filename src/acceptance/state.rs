//! Resource addresses and the driver's flattened attribute state.
//!
//! After each apply the driver records every resource it manages as a flat
//! map of attribute name to string value. Collections are flattened the way
//! infrastructure tools usually do it: `group_assignments.#` holds the count
//! and `group_assignments.0`, `group_assignments.1`, ... hold the elements.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned for a malformed `type.name` address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid resource address '{0}', expected <type>.<name>")]
pub struct InvalidAddress(pub String);

/// Address of a resource within a configuration: `<type>.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceAddress {
    resource_type: String,
    name: String,
}

impl ResourceAddress {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

impl FromStr for ResourceAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((resource_type, name))
                if !resource_type.is_empty() && !name.is_empty() && !name.contains('.') =>
            {
                Ok(Self::new(resource_type, name))
            }
            _ => Err(InvalidAddress(s.to_string())),
        }
    }
}

/// Recorded state of one managed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState {
    id: String,
    attributes: BTreeMap<String, String>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut attributes = BTreeMap::new();
        attributes.insert("id".to_string(), id.clone());
        Self { id, attributes }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Record a collection as `<key>.#` plus indexed entries.
    pub fn set_list<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefix = format!("{}.", key);
        self.attributes.retain(|k, _| !k.starts_with(&prefix));

        let mut count = 0;
        for (index, value) in values.into_iter().enumerate() {
            self.attributes.insert(format!("{}.{}", key, index), value.into());
            count += 1;
        }
        self.attributes.insert(format!("{}.#", key), count.to_string());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

/// Everything a driver currently manages, keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    resources: BTreeMap<ResourceAddress, ResourceState>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    pub fn insert(&mut self, address: ResourceAddress, resource: ResourceState) {
        self.resources.insert(address, resource);
    }

    pub fn remove(&mut self, address: &ResourceAddress) -> Option<ResourceState> {
        self.resources.remove(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceAddress, &ResourceState)> {
        self.resources.iter()
    }

    /// Addresses of one resource type.
    pub fn addresses_of(&self, resource_type: &str) -> Vec<ResourceAddress> {
        self.resources
            .keys()
            .filter(|address| address.resource_type() == resource_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resolve a `<type>.<name>.<attribute>` reference.
    pub fn resolve_reference(&self, reference: &str) -> Option<String> {
        let (address, attribute) = reference.rsplit_once('.')?;
        let address: ResourceAddress = address.parse().ok()?;
        self.get(&address)?.attribute(attribute).map(str::to_string)
    }
}
