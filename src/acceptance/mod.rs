//! Acceptance test runner.
//!
//! A [`TestCase`] is an ordered list of [`TestStep`]s. Each step hands a
//! declared configuration to a [`Driver`], waits for it to converge, then
//! evaluates the step's [`Check`]s against the resulting state. The first
//! failure stops the case. Whatever the outcome, the driver's resources are
//! destroyed afterwards; with `check_destroy` enabled every resource the case
//! ever created is then looked up on the platform and must be gone.
//!
//! # Example Usage
//!
//! ```rust
//! use group_rule_harness::acceptance::{
//!     Check, LocalDriver, ResourceAddress, TestCase, TestStep, run_test_case,
//! };
//! use group_rule_harness::client::InMemoryGroupRuleClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let address: ResourceAddress = "okta_group_rule.test".parse()?;
//! let case = TestCase::new("inactive_rule").with_step(TestStep::new(
//!     r#"resource "okta_group_rule" "test" {
//!          name             = "testAcc_1"
//!          status           = "INACTIVE"
//!          expression_value = "true"
//!        }"#,
//!     vec![
//!         Check::exists(&address),
//!         Check::attribute(&address, "status", "INACTIVE"),
//!     ],
//! ));
//!
//! let mut driver = LocalDriver::new(InMemoryGroupRuleClient::new());
//! let report = run_test_case(&mut driver, &case).await?;
//! assert_eq!(report.checks_passed, 2);
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod parser;
pub mod state;

pub use driver::{
    ApplyError, Driver, ExistenceError, GROUP_RESOURCE, GROUP_RULE_RESOURCE, LocalDriver,
};
pub use parser::{ConfigValue, DeclaredConfig, DeclaredResource, ParseError, parse_config};
pub use state::{InvalidAddress, ResourceAddress, ResourceState, State};

use crate::client::ClientError;
use crate::config::ConfigurationError;
use crate::error::ErrorList;
use crate::rule::RuleIdError;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use thiserror::Error;

/// An assertion evaluated after a step converges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// The recorded attribute equals `expected` exactly
    Attribute {
        address: ResourceAddress,
        attribute: String,
        expected: String,
    },
    /// The platform reports the resource as existing
    Exists { address: ResourceAddress },
}

impl Check {
    pub fn attribute(
        address: &ResourceAddress,
        attribute: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Check::Attribute {
            address: address.clone(),
            attribute: attribute.into(),
            expected: expected.into(),
        }
    }

    pub fn exists(address: &ResourceAddress) -> Self {
        Check::Exists {
            address: address.clone(),
        }
    }
}

/// One configuration plus the checks that must hold after applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestStep {
    pub config: String,
    pub checks: Vec<Check>,
}

impl TestStep {
    pub fn new(config: impl Into<String>, checks: Vec<Check>) -> Self {
        Self {
            config: config.into(),
            checks,
        }
    }
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub steps: Vec<TestStep>,
    /// Look up every created resource after teardown
    pub check_destroy: bool,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            check_destroy: true,
        }
    }

    pub fn with_step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_check_destroy(mut self, enabled: bool) -> Self {
        self.check_destroy = enabled;
        self
    }
}

/// Summary of a passing test case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    pub name: String,
    pub steps_applied: usize,
    pub checks_passed: usize,
    pub destroyed: Vec<ResourceAddress>,
}

/// Why a check did not hold.
#[derive(Debug, Error)]
pub enum CheckFailure {
    #[error("{address}: not found in state")]
    MissingResource { address: ResourceAddress },

    #[error("{address}: attribute '{attribute}' expected \"{expected}\", got \"{actual}\"")]
    AttributeMismatch {
        address: ResourceAddress,
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("{address}: attribute '{attribute}' expected \"{expected}\", but it is not set")]
    AttributeNotSet {
        address: ResourceAddress,
        attribute: String,
        expected: String,
    },

    #[error("{address}: resource (id: {id}) does not exist on the platform")]
    NotExists { address: ResourceAddress, id: String },

    #[error("{address}: existence check failed: {source}")]
    Lookup {
        address: ResourceAddress,
        #[source]
        source: ClientError,
    },

    #[error("{address}: recorded id '{id}' is not a valid group rule id: {source}")]
    InvalidRecordedId {
        address: ResourceAddress,
        id: String,
        #[source]
        source: RuleIdError,
    },

    #[error("{address}: no existence check for resource type '{resource_type}'")]
    UnsupportedResource {
        address: ResourceAddress,
        resource_type: String,
    },
}

impl CheckFailure {
    fn from_existence(address: &ResourceAddress, error: ExistenceError) -> Self {
        let address = address.clone();
        match error {
            ExistenceError::InvalidId { id, source } => CheckFailure::InvalidRecordedId {
                address,
                id,
                source,
            },
            ExistenceError::UnsupportedResource(resource_type) => {
                CheckFailure::UnsupportedResource {
                    address,
                    resource_type,
                }
            }
            ExistenceError::Client(source) => CheckFailure::Lookup { address, source },
        }
    }
}

/// Errors that fail a test case.
#[derive(Debug, Error)]
pub enum AcceptanceError {
    #[error("pre-check failed: {0}")]
    PreCheck(#[from] ConfigurationError),

    #[error("test case '{0}' has no steps")]
    NoSteps(String),

    #[error("step {step}: apply failed: {source}")]
    Apply {
        step: usize,
        #[source]
        source: ApplyError,
    },

    #[error("step {step}: check failed: {source}")]
    Check {
        step: usize,
        #[source]
        source: CheckFailure,
    },

    #[error("destroy failed: {0}")]
    Destroy(#[source] ApplyError),

    #[error("{address} (id: {id}) still exists after destroy")]
    DanglingResource { address: ResourceAddress, id: String },

    #[error("destroy check failed for {address}: {source}")]
    DestroyCheck {
        address: ResourceAddress,
        #[source]
        source: ExistenceError,
    },

    /// The case failed and also left resources behind
    #[error("{source}; resources left behind: {leaks}")]
    Leaked {
        #[source]
        source: Box<AcceptanceError>,
        leaks: ErrorList<AcceptanceError>,
    },
}

/// Run a test case to completion, always tearing down afterwards.
pub async fn run_test_case<D: Driver>(
    driver: &mut D,
    case: &TestCase,
) -> Result<TestReport, AcceptanceError> {
    if case.steps.is_empty() {
        return Err(AcceptanceError::NoSteps(case.name.clone()));
    }

    info!("Running test case '{}' ({} steps)", case.name, case.steps.len());
    let mut created = BTreeMap::new();
    let outcome = run_steps(driver, case, &mut created).await;
    let teardown = driver.destroy().await;

    let mut report = match (outcome, teardown) {
        (Err(err), Err(destroy_err)) => {
            warn!(
                "Test case '{}' failed and teardown also failed: {}",
                case.name, destroy_err
            );
            return Err(err);
        }
        (Err(err), Ok(_)) => {
            let leaks = verify_destroyed(driver, case, &created).await;
            if leaks.is_empty() {
                return Err(err);
            }
            return Err(AcceptanceError::Leaked {
                source: Box::new(err),
                leaks,
            });
        }
        (Ok(_), Err(destroy_err)) => return Err(AcceptanceError::Destroy(destroy_err)),
        (Ok(report), Ok(destroyed)) => TestReport { destroyed, ..report },
    };

    if let Some(leak) = verify_destroyed(driver, case, &created).await.into_iter().next() {
        return Err(leak);
    }

    report.name = case.name.clone();
    info!(
        "Test case '{}' passed: {} steps, {} checks",
        case.name, report.steps_applied, report.checks_passed
    );
    Ok(report)
}

/// Look up every resource the case created; anything still present is a leak.
async fn verify_destroyed<D: Driver>(
    driver: &D,
    case: &TestCase,
    created: &BTreeMap<ResourceAddress, ResourceState>,
) -> ErrorList<AcceptanceError> {
    let mut leaks = ErrorList::new();
    if !case.check_destroy {
        return leaks;
    }

    for (address, resource) in created {
        let leak = match driver.resource_exists(address, resource).await {
            Ok(false) => continue,
            Ok(true) => AcceptanceError::DanglingResource {
                address: address.clone(),
                id: resource.id().to_string(),
            },
            Err(source) => AcceptanceError::DestroyCheck {
                address: address.clone(),
                source,
            },
        };
        warn!("Test case '{}': {}", case.name, leak);
        leaks.push(leak);
    }

    leaks
}

async fn run_steps<D: Driver>(
    driver: &mut D,
    case: &TestCase,
    created: &mut BTreeMap<ResourceAddress, ResourceState>,
) -> Result<TestReport, AcceptanceError> {
    let mut report = TestReport::default();

    for (index, step) in case.steps.iter().enumerate() {
        let step_number = index + 1;
        debug!("'{}' step {}: applying", case.name, step_number);

        let state = driver
            .apply(&step.config)
            .await
            .map_err(|source| AcceptanceError::Apply {
                step: step_number,
                source,
            })?;
        report.steps_applied += 1;

        for (address, resource) in state.iter() {
            created.insert(address.clone(), resource.clone());
        }

        for check in &step.checks {
            evaluate_check(driver, &state, check)
                .await
                .map_err(|source| AcceptanceError::Check {
                    step: step_number,
                    source,
                })?;
            report.checks_passed += 1;
        }
    }

    Ok(report)
}

/// Evaluate one check against the state returned by the last apply.
pub async fn evaluate_check<D: Driver>(
    driver: &D,
    state: &State,
    check: &Check,
) -> Result<(), CheckFailure> {
    match check {
        Check::Attribute {
            address,
            attribute,
            expected,
        } => {
            let resource = state.get(address).ok_or_else(|| CheckFailure::MissingResource {
                address: address.clone(),
            })?;
            match resource.attribute(attribute) {
                Some(actual) if actual == expected.as_str() => Ok(()),
                Some(actual) => Err(CheckFailure::AttributeMismatch {
                    address: address.clone(),
                    attribute: attribute.clone(),
                    expected: expected.clone(),
                    actual: actual.to_string(),
                }),
                None => Err(CheckFailure::AttributeNotSet {
                    address: address.clone(),
                    attribute: attribute.clone(),
                    expected: expected.clone(),
                }),
            }
        }
        Check::Exists { address } => {
            let resource = state.get(address).ok_or_else(|| CheckFailure::MissingResource {
                address: address.clone(),
            })?;
            let exists = driver
                .resource_exists(address, resource)
                .await
                .map_err(|e| CheckFailure::from_existence(address, e))?;
            if exists {
                Ok(())
            } else {
                Err(CheckFailure::NotExists {
                    address: address.clone(),
                    id: resource.id().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryGroupRuleClient, RuleOperation};

    const RULE: &str = r#"
        resource "okta_group_rule" "test" {
          name             = "testAcc_5"
          expression_value = "true"
        }
    "#;

    fn address() -> ResourceAddress {
        ResourceAddress::new(GROUP_RULE_RESOURCE, "test")
    }

    #[tokio::test]
    async fn test_passing_case_tears_down() {
        let client = InMemoryGroupRuleClient::new();
        let mut driver = LocalDriver::new(client.clone());
        let case = TestCase::new("pass").with_step(TestStep::new(
            RULE,
            vec![
                Check::attribute(&address(), "name", "testAcc_5"),
                Check::attribute(&address(), "status", "ACTIVE"),
                Check::exists(&address()),
            ],
        ));

        let report = run_test_case(&mut driver, &case).await.unwrap();
        assert_eq!(report.name, "pass");
        assert_eq!(report.steps_applied, 1);
        assert_eq!(report.checks_passed, 3);
        assert_eq!(report.destroyed, vec![address()]);
        assert_eq!(client.stats().await.rule_count, 0);
    }

    #[tokio::test]
    async fn test_mismatch_reports_expected_and_actual() {
        let client = InMemoryGroupRuleClient::new();
        let mut driver = LocalDriver::new(client.clone());
        let case = TestCase::new("mismatch").with_step(TestStep::new(
            RULE,
            vec![Check::attribute(&address(), "status", "INACTIVE")],
        ));

        let err = run_test_case(&mut driver, &case).await.unwrap_err();
        match err {
            AcceptanceError::Check {
                step: 1,
                source:
                    CheckFailure::AttributeMismatch {
                        expected, actual, ..
                    },
            } => {
                assert_eq!(expected, "INACTIVE");
                assert_eq!(actual, "ACTIVE");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.stats().await.rule_count, 0);
    }

    #[tokio::test]
    async fn test_failed_step_halts_later_steps() {
        let client = InMemoryGroupRuleClient::new();
        client.inject_failure(RuleOperation::Create, None).await;
        let mut driver = LocalDriver::new(client.clone());
        let case = TestCase::new("halt")
            .with_step(TestStep::new(RULE, vec![]))
            .with_step(TestStep::new(RULE, vec![]));

        let err = run_test_case(&mut driver, &case).await.unwrap_err();
        assert!(matches!(err, AcceptanceError::Apply { step: 1, .. }));
        assert_eq!(client.calls_for(RuleOperation::Create).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unset_attribute_and_missing_resource() {
        let mut driver = LocalDriver::new(InMemoryGroupRuleClient::new());
        let case = TestCase::new("unset").with_step(TestStep::new(
            RULE,
            vec![Check::attribute(&address(), "description", "x")],
        ));
        let err = run_test_case(&mut driver, &case).await.unwrap_err();
        assert!(matches!(
            err,
            AcceptanceError::Check {
                source: CheckFailure::AttributeNotSet { .. },
                ..
            }
        ));

        let other = ResourceAddress::new(GROUP_RULE_RESOURCE, "other");
        let case = TestCase::new("missing")
            .with_step(TestStep::new(RULE, vec![Check::exists(&other)]));
        let err = run_test_case(&mut driver, &case).await.unwrap_err();
        assert!(matches!(
            err,
            AcceptanceError::Check {
                source: CheckFailure::MissingResource { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_destroy_failure_fails_passing_case() {
        let client = InMemoryGroupRuleClient::new();
        client.inject_failure(RuleOperation::Delete, None).await;
        let mut driver = LocalDriver::new(client.clone());
        let case = TestCase::new("leaky").with_step(TestStep::new(RULE, vec![]));

        let err = run_test_case(&mut driver, &case).await.unwrap_err();
        assert!(matches!(err, AcceptanceError::Destroy(_)));
    }

    #[tokio::test]
    async fn test_malformed_recorded_id_fails_the_check() {
        let client = InMemoryGroupRuleClient::new();
        let driver = LocalDriver::new(client.clone());
        let mut state = State::new();
        state.insert(address(), ResourceState::new(""));

        let err = evaluate_check(&driver, &state, &Check::exists(&address()))
            .await
            .unwrap_err();
        match err {
            CheckFailure::InvalidRecordedId { id, source, .. } => {
                assert_eq!(id, "");
                assert_eq!(source, RuleIdError::Empty);
            }
            other => panic!("unexpected failure: {other}"),
        }
        assert!(client.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_case_is_rejected() {
        let mut driver = LocalDriver::new(InMemoryGroupRuleClient::new());
        let err = run_test_case(&mut driver, &TestCase::new("empty")).await.unwrap_err();
        assert!(matches!(err, AcceptanceError::NoSteps(name) if name == "empty"));
    }
}
