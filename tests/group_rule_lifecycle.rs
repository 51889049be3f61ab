//! End-to-end runs of the group rule scenarios against the in-memory platform.

mod common;

use group_rule_harness::acceptance::{
    AcceptanceError, ApplyError, Check, CheckFailure, Driver, ExistenceError, LocalDriver,
    ResourceAddress, ResourceState, State, TestCase, TestStep, run_test_case,
};
use group_rule_harness::client::{InMemoryGroupRuleClient, RuleOperation};
use group_rule_harness::fixture::FixtureManager;
use group_rule_harness::scenarios::{
    BASIC_FIXTURE, DEACTIVATED_FIXTURE, UPDATED_FIXTURE, group_rule_address, group_rule_crud,
    group_rule_issue_162, run_group_rule_crud, run_group_rule_crud_with, run_group_rule_issue_162,
    run_group_rule_issue_162_with,
};
use group_rule_harness::{HarnessError, RunContext};

use common::{context_without_token, fixtures_dir, seed_leftover_rules, test_context};

#[tokio::test]
async fn test_crud_scenario_passes_and_cleans_up() {
    let ctx = test_context();
    let run = RunContext::new(42, group_rule_address());

    let report = run_group_rule_crud_with(&ctx, &run).await.unwrap();

    assert_eq!(report.name, "group_rule_crud");
    assert_eq!(report.steps_applied, 4);
    assert_eq!(report.checks_passed, 10);
    assert!(report.destroyed.contains(&group_rule_address()));

    let stats = ctx.client().stats().await;
    assert_eq!(stats.rule_count, 0);
    assert_eq!(stats.group_count, 0);
}

#[tokio::test]
async fn test_crud_scenario_walks_the_rule_lifecycle() {
    let ctx = test_context();
    let run = RunContext::new(42, group_rule_address());

    run_group_rule_crud_with(&ctx, &run).await.unwrap();

    let client = ctx.client();
    assert_eq!(client.calls_for(RuleOperation::Create).await.len(), 1);
    // expression change and group change each need an update
    assert_eq!(client.calls_for(RuleOperation::Update).await.len(), 2);
    assert_eq!(client.calls_for(RuleOperation::Delete).await.len(), 1);

    // initial activation plus one reactivation after each update
    assert_eq!(client.calls_for(RuleOperation::Activate).await.len(), 3);
    // one before each update, one for the final INACTIVE step
    assert_eq!(client.calls_for(RuleOperation::Deactivate).await.len(), 3);
}

#[tokio::test]
async fn test_crud_scenario_with_random_discriminator() {
    let ctx = test_context();
    let report = run_group_rule_crud(&ctx).await.unwrap();
    assert_eq!(report.steps_applied, 4);
}

#[tokio::test]
async fn test_deactivated_step_records_inactive_status() {
    let fixtures = FixtureManager::new(fixtures_dir(), "okta_group_rule");
    let run = RunContext::new(42, group_rule_address());
    let case = group_rule_crud(&fixtures, &run).unwrap();
    let mut driver = LocalDriver::new(InMemoryGroupRuleClient::new());

    let mut last = None;
    for step in &case.steps {
        last = Some(driver.apply(&step.config).await.unwrap());
    }
    let state = last.unwrap();

    let rule = state.get(&group_rule_address()).unwrap();
    assert_eq!(rule.attribute("name"), Some("testAcc_42"));
    assert_eq!(rule.attribute("status"), Some("INACTIVE"));
    assert_eq!(rule.attribute("group_assignments.#"), Some("2"));

    driver.destroy().await.unwrap();
    assert!(driver.client().rules().await.is_empty());
}

/// Apply `prior` fixtures, then the deactivated one, returning the final rule
/// status and the Activate/Deactivate calls made by the last apply.
async fn deactivate_after(prior: &[&str]) -> (Option<String>, usize, usize) {
    let fixtures = FixtureManager::new(fixtures_dir(), "okta_group_rule");
    let client = InMemoryGroupRuleClient::new();
    let mut driver = LocalDriver::new(client.clone());

    for name in prior {
        driver.apply(&fixtures.get_fixture(name, 42).unwrap()).await.unwrap();
    }
    client.clear_calls().await;

    let config = fixtures.get_fixture(DEACTIVATED_FIXTURE, 42).unwrap();
    let state = driver.apply(&config).await.unwrap();
    let status = state
        .get(&group_rule_address())
        .and_then(|rule| rule.attribute("status"))
        .map(str::to_string);
    let activations = client.calls_for(RuleOperation::Activate).await.len();
    let deactivations = client.calls_for(RuleOperation::Deactivate).await.len();

    driver.destroy().await.unwrap();
    assert!(client.rules().await.is_empty());
    (status, activations, deactivations)
}

#[tokio::test]
async fn test_deactivated_fixture_is_inactive_from_any_prior_step() {
    common::init_logging();

    // Created directly: stays INACTIVE, never activated
    let (status, activations, deactivations) = deactivate_after(&[]).await;
    assert_eq!(status.as_deref(), Some("INACTIVE"));
    assert_eq!(activations, 0);
    assert_eq!(deactivations, 0);

    for prior in [BASIC_FIXTURE, UPDATED_FIXTURE] {
        let (status, activations, deactivations) = deactivate_after(&[prior]).await;
        assert_eq!(status.as_deref(), Some("INACTIVE"), "after {prior}");
        assert_eq!(activations, 0, "after {prior}");
        assert_eq!(deactivations, 1, "after {prior}");
    }
}

#[tokio::test]
async fn test_issue_162_scenario_passes() {
    let ctx = test_context();
    let run = RunContext::new(162, group_rule_address());

    let report = run_group_rule_issue_162_with(&ctx, &run).await.unwrap();
    assert_eq!(report.checks_passed, 3);
    assert_eq!(ctx.client().stats().await.rule_count, 0);

    run_group_rule_issue_162(&ctx).await.unwrap();
}

#[tokio::test]
async fn test_pre_check_rejects_missing_token() {
    let ctx = context_without_token();

    let err = run_group_rule_crud(&ctx).await.unwrap_err();

    assert!(matches!(err, HarnessError::Acceptance(AcceptanceError::PreCheck(_))));
    assert!(ctx.client().calls().await.is_empty());
}

#[tokio::test]
async fn test_failed_step_still_tears_down() {
    let ctx = test_context();
    let run = RunContext::new(7, group_rule_address());
    ctx.client().inject_failure(RuleOperation::Update, None).await;

    let err = run_group_rule_crud_with(&ctx, &run).await.unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Acceptance(AcceptanceError::Apply { step: 2, .. })
    ));
    assert_eq!(ctx.client().stats().await.rule_count, 0);
}

#[tokio::test]
async fn test_sweep_then_scenario() {
    let ctx = test_context();
    seed_leftover_rules(ctx.client(), 5).await;

    let swept = ctx.sweep().await.unwrap();
    assert_eq!(swept.deleted.len(), 5);
    assert_eq!(swept.deactivated.len(), 3);

    run_group_rule_crud(&ctx).await.unwrap();
}

/// Applies normally but leaves everything behind on destroy.
struct LeakyDriver {
    inner: LocalDriver<InMemoryGroupRuleClient>,
}

impl Driver for LeakyDriver {
    async fn apply(&mut self, config: &str) -> Result<State, ApplyError> {
        self.inner.apply(config).await
    }

    async fn destroy(&mut self) -> Result<Vec<ResourceAddress>, ApplyError> {
        Ok(Vec::new())
    }

    async fn resource_exists(
        &self,
        address: &ResourceAddress,
        resource: &ResourceState,
    ) -> Result<bool, ExistenceError> {
        self.inner.resource_exists(address, resource).await
    }
}

#[tokio::test]
async fn test_destroy_check_reports_dangling_rule() {
    common::init_logging();
    let fixtures = FixtureManager::new(fixtures_dir(), "okta_group_rule");
    let case = group_rule_issue_162(&fixtures, &RunContext::new(3, group_rule_address())).unwrap();
    let mut driver = LeakyDriver {
        inner: LocalDriver::new(InMemoryGroupRuleClient::new()),
    };

    let err = run_test_case(&mut driver, &case).await.unwrap_err();

    match err {
        AcceptanceError::DanglingResource { address, .. } => {
            assert_eq!(address.resource_type(), "okta_group")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_case_still_reports_leftovers() {
    common::init_logging();
    let fixtures = FixtureManager::new(fixtures_dir(), "okta_group_rule");
    let run = RunContext::new(4, group_rule_address());
    let mut case = group_rule_issue_162(&fixtures, &run).unwrap();
    case.steps[0]
        .checks
        .push(Check::attribute(&group_rule_address(), "status", "INACTIVE"));
    let mut driver = LeakyDriver {
        inner: LocalDriver::new(InMemoryGroupRuleClient::new()),
    };

    let err = run_test_case(&mut driver, &case).await.unwrap_err();

    match err {
        AcceptanceError::Leaked { source, leaks } => {
            assert!(matches!(
                *source,
                AcceptanceError::Check {
                    step: 1,
                    source: CheckFailure::AttributeMismatch { .. },
                }
            ));
            let leaked: Vec<_> = leaks
                .iter()
                .map(|leak| match leak {
                    AcceptanceError::DanglingResource { address, .. } => address.to_string(),
                    other => panic!("unexpected leak: {other}"),
                })
                .collect();
            assert_eq!(leaked, vec!["okta_group.test", "okta_group_rule.test"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_case_without_leftovers_keeps_its_error() {
    let ctx = test_context();
    let fixtures = ctx.fixtures("okta_group_rule");
    let run = RunContext::new(5, group_rule_address());
    let mut case = group_rule_issue_162(&fixtures, &run).unwrap();
    case.steps[0]
        .checks
        .push(Check::attribute(&group_rule_address(), "name", "someone_else"));

    let err = ctx.run(&case).await.unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Acceptance(AcceptanceError::Check { step: 1, .. })
    ));
}

#[tokio::test]
async fn test_destroy_check_can_be_disabled() {
    let case = TestCase::new("leaky")
        .with_step(TestStep::new(
            r#"resource "okta_group_rule" "test" {
                 name             = "testAcc_1"
                 expression_value = "true"
               }"#,
            Vec::new(),
        ))
        .with_check_destroy(false);
    let mut driver = LeakyDriver {
        inner: LocalDriver::new(InMemoryGroupRuleClient::new()),
    };

    let report = run_test_case(&mut driver, &case).await.unwrap();
    assert!(report.destroyed.is_empty());
}
