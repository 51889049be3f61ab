//! Explicit test and run contexts.
//!
//! A [`TestContext`] holds what every scenario and sweep in a test process
//! shares: the configuration and the platform client. It is built once and
//! passed to each entry point; nothing is kept in process-wide globals.
//!
//! A [`RunContext`] is per scenario invocation: the random discriminator
//! that makes resource names unique and the address checks are made against.

use crate::acceptance::{
    AcceptanceError, LocalDriver, ResourceAddress, TestCase, TestReport, run_test_case,
};
use crate::client::GroupRuleClient;
use crate::config::{ConfigurationError, HarnessConfig};
use crate::error::HarnessResult;
use crate::fixture::{FixtureManager, build_resource_name, random_discriminator};
use crate::sweep::{SweepError, SweepReport, sweep_group_rules_with_limit};

/// Shared configuration and client for a test process.
#[derive(Clone)]
pub struct TestContext<C> {
    config: HarnessConfig,
    client: C,
}

impl<C: GroupRuleClient + Clone> TestContext<C> {
    pub fn new(config: HarnessConfig, client: C) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fail fast when credentials are missing.
    pub fn pre_check(&self) -> Result<(), ConfigurationError> {
        self.config.pre_check()
    }

    /// Fixture loader for one resource type.
    pub fn fixtures(&self, resource_type: &str) -> FixtureManager {
        FixtureManager::new(&self.config.fixtures_dir, resource_type)
    }

    /// A fresh driver with empty state.
    pub fn driver(&self) -> LocalDriver<C> {
        LocalDriver::new(self.client.clone())
    }

    /// Pre-check, then run the case on a fresh driver.
    pub async fn run(&self, case: &TestCase) -> HarnessResult<TestReport> {
        self.pre_check().map_err(AcceptanceError::PreCheck)?;
        let mut driver = self.driver();
        Ok(run_test_case(&mut driver, case).await?)
    }

    /// Sweep all group rules using the configured page limit.
    pub async fn sweep(&self) -> Result<SweepReport, SweepError> {
        sweep_group_rules_with_limit(&self.client, self.config.sweep_page_limit).await
    }
}

/// Correlation data for one scenario invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub discriminator: u32,
    pub resource_address: ResourceAddress,
}

impl RunContext {
    pub fn new(discriminator: u32, resource_address: ResourceAddress) -> Self {
        Self {
            discriminator,
            resource_address,
        }
    }

    /// A run with a random discriminator.
    pub fn random(resource_address: ResourceAddress) -> Self {
        Self::new(random_discriminator(), resource_address)
    }

    /// Name the fixtures give the resource under test in this run.
    pub fn resource_name(&self) -> String {
        build_resource_name(self.discriminator)
    }
}
