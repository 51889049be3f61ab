//! Shared helpers for the integration tests.

#![allow(dead_code)]

use group_rule_harness::client::InMemoryGroupRuleClient;
use group_rule_harness::rule::{Rule, RuleDefinition, RuleExpression, RuleStatus};
use group_rule_harness::{HarnessConfig, TestContext};

pub const TEST_ORG: &str = "dev-000000";
pub const TEST_TOKEN: &str = "00test-token";

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fixtures_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures")
}

pub fn test_config() -> HarnessConfig {
    HarnessConfig::builder(TEST_ORG)
        .with_api_token(TEST_TOKEN)
        .with_fixtures_dir(fixtures_dir())
        .build()
        .expect("test config is valid")
}

/// A context over a fresh in-memory platform.
pub fn test_context() -> TestContext<InMemoryGroupRuleClient> {
    init_logging();
    TestContext::new(test_config(), InMemoryGroupRuleClient::new())
}

/// A context whose configuration has no API token.
pub fn context_without_token() -> TestContext<InMemoryGroupRuleClient> {
    init_logging();
    let config = HarnessConfig::builder(TEST_ORG)
        .with_fixtures_dir(fixtures_dir())
        .build()
        .expect("test config is valid");
    TestContext::new(config, InMemoryGroupRuleClient::new())
}

/// Seed `count` leftover rules, alternating ACTIVE and INACTIVE.
pub async fn seed_leftover_rules(client: &InMemoryGroupRuleClient, count: usize) -> Vec<Rule> {
    let mut rules = Vec::with_capacity(count);
    for n in 0..count {
        let status = if n % 2 == 0 {
            RuleStatus::Active
        } else {
            RuleStatus::Inactive
        };
        let definition = RuleDefinition::new(
            format!("testAcc_{n}"),
            RuleExpression::new("user.department == \"Engineering\""),
            Vec::new(),
        );
        rules.push(client.insert_rule(definition, status).await);
    }
    rules
}
