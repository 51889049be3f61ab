//! Sweeper for leftover group rules.
//!
//! A sweep removes every group rule visible to one listing call. It is meant
//! to run before (or after) a test campaign in an org dedicated to testing;
//! nothing here checks that the org is disposable.
//!
//! For each listed rule:
//!
//! 1. ACTIVE rules are deactivated first. If that fails the failure is
//!    recorded and the rule is left alone, since deleting an active rule is
//!    rejected by the platform anyway.
//! 2. The rule is deleted; a failure is recorded.
//!
//! Failures never stop the sweep. They are collected in an [`ErrorList`] so
//! the caller sees every rule that could not be removed.
//!
//! Only one page is fetched. A page that comes back full is reported as
//! possibly truncated; run the sweep again to continue.

use crate::client::{ClientError, GroupRuleClient, ListParams};
use crate::config::DEFAULT_SWEEP_PAGE_LIMIT;
use crate::error::ErrorList;
use crate::rule::RuleId;
use log::{info, warn};
use std::fmt;
use thiserror::Error;

/// Which step of the teardown failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOperation {
    Deactivate,
    Delete,
}

impl fmt::Display for SweepOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepOperation::Deactivate => write!(f, "deactivate"),
            SweepOperation::Delete => write!(f, "delete"),
        }
    }
}

/// A single rule the sweep could not remove.
#[derive(Debug, Error)]
#[error("failed to {operation} group rule {rule_id}: {source}")]
pub struct SweepFailure {
    pub rule_id: RuleId,
    pub operation: SweepOperation,
    #[source]
    pub source: ClientError,
}

/// Errors returned by [`sweep_group_rules`].
#[derive(Debug, Error)]
pub enum SweepError {
    /// The rules could not be listed, nothing was attempted
    #[error("failed to list group rules: {0}")]
    Listing(#[source] ClientError),

    /// Some rules could not be deactivated or deleted
    #[error("{failures}")]
    Incomplete {
        failures: ErrorList<SweepFailure>,
        report: SweepReport,
    },
}

impl SweepError {
    /// Individual failures, empty for a listing failure.
    pub fn failures(&self) -> Option<&ErrorList<SweepFailure>> {
        match self {
            SweepError::Listing(_) => None,
            SweepError::Incomplete { failures, .. } => Some(failures),
        }
    }
}

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of rules returned by the listing call
    pub listed: usize,
    /// Rules that were ACTIVE and got deactivated
    pub deactivated: Vec<RuleId>,
    /// Rules that were deleted
    pub deleted: Vec<RuleId>,
    /// The listing returned a full page, so more rules may remain
    pub possibly_truncated: bool,
}

/// Remove every group rule with the default page limit.
pub async fn sweep_group_rules<C: GroupRuleClient>(client: &C) -> Result<SweepReport, SweepError> {
    sweep_group_rules_with_limit(client, DEFAULT_SWEEP_PAGE_LIMIT).await
}

/// Remove every group rule returned by one listing call of `limit` records.
pub async fn sweep_group_rules_with_limit<C: GroupRuleClient>(
    client: &C,
    limit: u32,
) -> Result<SweepReport, SweepError> {
    let rules = client
        .list_rules(&ListParams::with_limit(limit))
        .await
        .map_err(SweepError::Listing)?;

    let mut report = SweepReport {
        listed: rules.len(),
        possibly_truncated: limit > 0 && rules.len() >= limit as usize,
        ..SweepReport::default()
    };
    if report.possibly_truncated {
        warn!(
            "Group rule listing returned a full page of {} records; some rules may remain after this sweep",
            limit
        );
    }

    let mut failures = ErrorList::new();

    for rule in rules {
        if rule.is_active() {
            if let Err(source) = client.deactivate_rule(&rule.id).await {
                warn!("Failed to deactivate group rule {}: {}", rule.id, source);
                failures.push(SweepFailure {
                    rule_id: rule.id,
                    operation: SweepOperation::Deactivate,
                    source,
                });
                continue;
            }
            report.deactivated.push(rule.id.clone());
        }

        match client.delete_rule(&rule.id).await {
            Ok(()) => report.deleted.push(rule.id),
            Err(source) => {
                warn!("Failed to delete group rule {}: {}", rule.id, source);
                failures.push(SweepFailure {
                    rule_id: rule.id,
                    operation: SweepOperation::Delete,
                    source,
                });
            }
        }
    }

    info!(
        "Swept group rules: {} listed, {} deactivated, {} deleted, {} failed",
        report.listed,
        report.deactivated.len(),
        report.deleted.len(),
        failures.len()
    );

    match failures.into_result() {
        Ok(()) => Ok(report),
        Err(failures) => Err(SweepError::Incomplete { failures, report }),
    }
}
