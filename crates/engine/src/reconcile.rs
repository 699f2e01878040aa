//! The reconcile run: exemption-vs-removal over every open issue.
//!
//! Every issue returned by the open listing is reconciled, labeled or not,
//! and every issue is closed at the end of its processing whether or not any
//! action was taken. Assignees are independent failure domains: one failed
//! removal never blocks the remaining assignees.

use tracing::{error, info, instrument, warn};

use policy::{
    exemption_validated, requests_exemption, ComplianceError, IssueFilter, IssueState, Platform,
    ReconcileOutcome, TrackingIssue,
};

use crate::RunConfig;

/// Counters from one reconcile run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Open issues processed (and closed).
    pub issues_processed: usize,
    /// Issues ending in a validated exemption.
    pub exemptions_granted: usize,
    /// Members removed from the organization.
    pub members_removed: usize,
    /// Per-issue or per-assignee failures the run continued past.
    pub failures: usize,
}

/// Reconciles every open issue in the tracking repository.
///
/// A failure of the listing itself aborts the run; everything after that is
/// caught at the issue or assignee it occurred on.
#[instrument(skip(platform, config), fields(org = %config.org, repo = %config.repo))]
pub async fn run_reconcile(
    platform: &dyn Platform,
    config: &RunConfig,
) -> Result<ReconcileReport, ComplianceError> {
    info!("retrieving open issues");
    let issues = platform
        .list_issues(&config.org, &config.repo, &IssueFilter::open())
        .await
        .map_err(|source| ComplianceError::IssueListUnavailable { source })?;

    let mut report = ReconcileReport::default();
    for issue in &issues {
        process_issue(platform, config, issue, &mut report).await;
        report.issues_processed += 1;
    }
    Ok(report)
}

/// Reconciles one issue and always attempts to close it afterwards.
async fn process_issue(
    platform: &dyn Platform,
    config: &RunConfig,
    issue: &TrackingIssue,
    report: &mut ReconcileReport,
) {
    let outcome = decide(platform, config, issue, report).await;

    match outcome {
        Some(ReconcileOutcome::ExemptionGranted) => {
            info!(issue = %issue.number, "exemption granted");
            report.exemptions_granted += 1;
            if let Err(err) = platform
                .add_comment(
                    &config.org,
                    &config.repo,
                    issue.number,
                    "An exemption has been granted.",
                )
                .await
            {
                error!(issue = %issue.number, error = %err, "failed to post exemption comment");
                report.failures += 1;
            }
        }
        Some(ReconcileOutcome::Remove) => {
            remove_assignees(platform, config, issue, report).await;
        }
        // Decision failed; skip action but still close below.
        None => {}
    }

    info!(issue = %issue.number, "closing issue");
    if let Err(err) = platform
        .set_issue_state(&config.org, &config.repo, issue.number, IssueState::Closed)
        .await
    {
        error!(issue = %issue.number, error = %err, "failed to close issue");
        report.failures += 1;
    }
}

/// Determines the outcome for one issue, replaying the event history only
/// when the exemption-request label is present.
///
/// Returns `None` if the history could not be retrieved: with the grant
/// unverifiable, neither removal nor announcement is sound, so the issue is
/// closed without action.
async fn decide(
    platform: &dyn Platform,
    config: &RunConfig,
    issue: &TrackingIssue,
    report: &mut ReconcileReport,
) -> Option<ReconcileOutcome> {
    if !requests_exemption(issue, &config.labels) {
        return Some(ReconcileOutcome::Remove);
    }

    info!(issue = %issue.number, "retrieving event history for exemption validation");
    match platform
        .list_issue_events(&config.org, &config.repo, issue.number)
        .await
    {
        Ok(events) => {
            if exemption_validated(&events, &config.labels) {
                Some(ReconcileOutcome::ExemptionGranted)
            } else {
                // Label present but never legitimately granted.
                warn!(issue = %issue.number, "exemption label was not granted by an administrator");
                Some(ReconcileOutcome::Remove)
            }
        }
        Err(err) => {
            error!(issue = %issue.number, error = %err, "failed to retrieve issue events");
            report.failures += 1;
            None
        }
    }
}

/// Removes each non-administrator assignee, one failure domain per assignee.
async fn remove_assignees(
    platform: &dyn Platform,
    config: &RunConfig,
    issue: &TrackingIssue,
    report: &mut ReconcileReport,
) {
    for assignee in &issue.assignees {
        if assignee.is_admin {
            info!(issue = %issue.number, user = %assignee.login, "assignee is an administrator, not removing");
            continue;
        }
        info!(issue = %issue.number, user = %assignee.login, "removing user from organization");
        if let Err(err) = platform
            .remove_org_member(&config.org, &assignee.login)
            .await
        {
            error!(issue = %issue.number, user = %assignee.login, error = %err, "failed to remove user");
            report.failures += 1;
            continue;
        }
        report.members_removed += 1;

        let notice = format!(
            "{} has been removed from the {} organization.",
            assignee.login, config.org
        );
        if let Err(err) = platform
            .add_comment(&config.org, &config.repo, issue.number, &notice)
            .await
        {
            error!(issue = %issue.number, user = %assignee.login, error = %err, "failed to post removal notice");
            report.failures += 1;
        }
    }
}
