//! Group rule acceptance scenarios.
//!
//! Two scenarios are defined:
//!
//! * [`group_rule_crud`] walks one rule through create, expression update,
//!   group target update and deactivation, checking the recorded attributes
//!   after each step.
//! * [`group_rule_issue_162`] guards the regression reported as issue 162:
//!   a freshly created rule must be reported as existing by a direct
//!   platform lookup, and come up ACTIVE when no status is declared.
//!
//! The `run_*` functions are the entry points test binaries call.

use crate::acceptance::{
    Check, GROUP_RULE_RESOURCE, ResourceAddress, TestCase, TestReport, TestStep,
};
use crate::client::GroupRuleClient;
use crate::context::{RunContext, TestContext};
use crate::error::HarnessResult;
use crate::fixture::{FixtureError, FixtureManager};
use crate::rule::{DEFAULT_EXPRESSION_TYPE, RuleStatus};

/// Name of the rule resource inside every fixture.
pub const TEST_RESOURCE_NAME: &str = "test";

/// Expression declared by `basic.tf`.
pub const BASIC_EXPRESSION_VALUE: &str = "String.startsWith(user.articulateId,\"auth0|\")";

pub const BASIC_FIXTURE: &str = "basic.tf";
pub const UPDATED_FIXTURE: &str = "basic_updated.tf";
pub const GROUP_UPDATE_FIXTURE: &str = "basic_group_update.tf";
pub const DEACTIVATED_FIXTURE: &str = "basic_deactivated.tf";
pub const ISSUE_162_FIXTURE: &str = "test_issue_162.tf";

/// Address of the rule under test: `okta_group_rule.test`.
pub fn group_rule_address() -> ResourceAddress {
    ResourceAddress::new(GROUP_RULE_RESOURCE, TEST_RESOURCE_NAME)
}

/// Create → update expression → update groups → deactivate.
pub fn group_rule_crud(
    fixtures: &FixtureManager,
    run: &RunContext,
) -> Result<TestCase, FixtureError> {
    let address = &run.resource_address;
    let name = run.resource_name();
    let name_and_status = |status: RuleStatus| {
        vec![
            Check::attribute(address, "name", name.clone()),
            Check::attribute(address, "status", status.as_str()),
        ]
    };

    let mut created = name_and_status(RuleStatus::Active);
    created.push(Check::attribute(address, "expression_type", DEFAULT_EXPRESSION_TYPE));
    created.push(Check::attribute(address, "expression_value", BASIC_EXPRESSION_VALUE));

    Ok(TestCase::new("group_rule_crud")
        .with_step(TestStep::new(
            fixtures.get_fixture(BASIC_FIXTURE, run.discriminator)?,
            created,
        ))
        .with_step(TestStep::new(
            fixtures.get_fixture(UPDATED_FIXTURE, run.discriminator)?,
            name_and_status(RuleStatus::Active),
        ))
        .with_step(TestStep::new(
            fixtures.get_fixture(GROUP_UPDATE_FIXTURE, run.discriminator)?,
            name_and_status(RuleStatus::Active),
        ))
        .with_step(TestStep::new(
            fixtures.get_fixture(DEACTIVATED_FIXTURE, run.discriminator)?,
            name_and_status(RuleStatus::Inactive),
        )))
}

/// Regression for issue 162: the rule exists right after creation.
pub fn group_rule_issue_162(
    fixtures: &FixtureManager,
    run: &RunContext,
) -> Result<TestCase, FixtureError> {
    let address = &run.resource_address;

    Ok(TestCase::new("group_rule_issue_162").with_step(TestStep::new(
        fixtures.get_fixture(ISSUE_162_FIXTURE, run.discriminator)?,
        vec![
            Check::exists(address),
            Check::attribute(address, "name", run.resource_name()),
            Check::attribute(address, "status", RuleStatus::Active.as_str()),
        ],
    )))
}

/// Run the CRUD scenario with a random discriminator.
pub async fn run_group_rule_crud<C: GroupRuleClient + Clone>(
    ctx: &TestContext<C>,
) -> HarnessResult<TestReport> {
    let run = RunContext::random(group_rule_address());
    run_group_rule_crud_with(ctx, &run).await
}

/// Run the CRUD scenario for a given run context.
pub async fn run_group_rule_crud_with<C: GroupRuleClient + Clone>(
    ctx: &TestContext<C>,
    run: &RunContext,
) -> HarnessResult<TestReport> {
    let case = group_rule_crud(&ctx.fixtures(GROUP_RULE_RESOURCE), run)?;
    ctx.run(&case).await
}

/// Run the issue 162 regression with a random discriminator.
pub async fn run_group_rule_issue_162<C: GroupRuleClient + Clone>(
    ctx: &TestContext<C>,
) -> HarnessResult<TestReport> {
    let run = RunContext::random(group_rule_address());
    run_group_rule_issue_162_with(ctx, &run).await
}

/// Run the issue 162 regression for a given run context.
pub async fn run_group_rule_issue_162_with<C: GroupRuleClient + Clone>(
    ctx: &TestContext<C>,
    run: &RunContext,
) -> HarnessResult<TestReport> {
    let case = group_rule_issue_162(&ctx.fixtures(GROUP_RULE_RESOURCE), run)?;
    ctx.run(&case).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> FixtureManager {
        FixtureManager::new(
            concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"),
            GROUP_RULE_RESOURCE,
        )
    }

    #[test]
    fn test_crud_case_shape() {
        let run = RunContext::new(42, group_rule_address());
        let case = group_rule_crud(&fixtures(), &run).unwrap();

        assert_eq!(case.steps.len(), 4);
        assert_eq!(case.steps[0].checks.len(), 4);
        assert!(case.steps[0].config.contains("testAcc_42"));
        assert_eq!(
            case.steps[3].checks[1],
            Check::attribute(&group_rule_address(), "status", "INACTIVE")
        );
    }

    #[test]
    fn test_issue_162_case_checks_existence_first() {
        let run = RunContext::new(7, group_rule_address());
        let case = group_rule_issue_162(&fixtures(), &run).unwrap();

        assert_eq!(case.steps.len(), 1);
        assert_eq!(case.steps[0].checks[0], Check::exists(&group_rule_address()));
    }
}
