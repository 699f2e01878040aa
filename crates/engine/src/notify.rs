//! The notify/audit run: from platform facts to tracking issues.
//!
//! [`collect_violations`] performs the two mandatory upstream reads (audit
//! log, membership) and reduces them to the violation set — this is the whole
//! of audit mode. [`run_notify`] then walks the violations in lexicographic
//! order and reconciles each user's tracking issue, one independent failure
//! domain per user.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};

use policy::{
    filter_violations, issue_action, non_compliant_logins, ComplianceError, IssueAction,
    IssueFilter, IssueState, Login, Platform, PlatformError, Violation,
};

use crate::template::render_message;
use crate::RunConfig;

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Result of the evaluation phase shared by audit and notify modes.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    /// Violating logins, in membership encounter order (not yet sorted).
    pub violations: Vec<Violation>,

    /// Logins of platform administrators, who are never escalated.
    pub admins: HashSet<Login>,
}

/// Retrieves the audit log and membership list, then computes violations.
///
/// Both reads are mandatory: a failure of either aborts the run with a
/// [`ComplianceError`].
#[instrument(skip(platform, config), fields(org = %config.org))]
pub async fn collect_violations(
    platform: &dyn Platform,
    config: &RunConfig,
    now: DateTime<Utc>,
) -> Result<AuditOutcome, ComplianceError> {
    let since = now - Duration::days(config.policy.lookback_days);

    info!(%since, "retrieving audit log");
    let additions = platform
        .list_membership_additions(&config.org, since)
        .await
        .map_err(|source| ComplianceError::AuditLogUnavailable { source })?;

    info!("retrieving organization members");
    let members = platform
        .list_members(&config.org)
        .await
        .map_err(|source| ComplianceError::MembershipUnavailable { source })?;

    let recently_added: HashSet<Login> =
        additions.into_iter().map(|entry| entry.login).collect();
    let non_compliant = non_compliant_logins(&members);
    let violations = filter_violations(
        &recently_added,
        &non_compliant,
        &config.policy.bot_suffix,
    );
    let admins = members
        .into_iter()
        .filter(|m| m.is_admin)
        .map(|m| m.login)
        .collect();

    info!(count = violations.len(), "found violations");
    Ok(AuditOutcome { violations, admins })
}

// ---------------------------------------------------------------------------
// Notify
// ---------------------------------------------------------------------------

/// Counters from one notify run, for the operator's summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Number of violations found by the evaluation phase.
    pub violations: usize,
    /// Fresh tracking issues created.
    pub issues_created: usize,
    /// Stale tracking issues closed before re-creation.
    pub issues_closed: usize,
    /// Users skipped (administrators, recognized bots, fresh issues).
    pub skipped: usize,
    /// Users whose processing failed; the run continued past them.
    pub failures: usize,
}

/// Runs the full notify mode: evaluation followed by per-user issue
/// lifecycle, violations processed in lexicographic login order.
#[instrument(skip(platform, config), fields(org = %config.org, repo = %config.repo))]
pub async fn run_notify(
    platform: &dyn Platform,
    config: &RunConfig,
    now: DateTime<Utc>,
) -> Result<NotifyReport, ComplianceError> {
    let AuditOutcome {
        mut violations,
        admins,
    } = collect_violations(platform, config, now).await?;
    violations.sort();

    let mut report = NotifyReport {
        violations: violations.len(),
        ..NotifyReport::default()
    };

    for violation in &violations {
        let login = violation.login();
        if admins.contains(login) {
            debug!(user = %login, "skipping platform administrator");
            report.skipped += 1;
            continue;
        }
        // Independent per-user failure domain: log and move on.
        match process_user(platform, config, now, login).await {
            Ok(outcome) => match outcome {
                UserOutcome::Created { closed_stale } => {
                    report.issues_created += 1;
                    if closed_stale {
                        report.issues_closed += 1;
                    }
                }
                UserOutcome::Skipped => report.skipped += 1,
            },
            Err(err) => {
                error!(user = %login, error = %err, "failed to reconcile tracking issue");
                report.failures += 1;
            }
        }
    }

    Ok(report)
}

enum UserOutcome {
    Created { closed_stale: bool },
    Skipped,
}

/// Finds or creates the tracking issue for one violating user.
async fn process_user(
    platform: &dyn Platform,
    config: &RunConfig,
    now: DateTime<Utc>,
    login: &Login,
) -> Result<UserOutcome, PlatformError> {
    debug!(user = %login, "searching for existing tracking issue");
    let filter = IssueFilter::assigned_with_label(login.clone(), config.labels.marker.clone());
    let existing = platform
        .list_issues(&config.org, &config.repo, &filter)
        .await?;

    match issue_action(&existing, now, &config.labels, &config.policy) {
        IssueAction::SkipBot => {
            info!(user = %login, "bot account, skipping");
            Ok(UserOutcome::Skipped)
        }
        IssueAction::SkipFresh => {
            info!(user = %login, "existing issue not yet stale");
            Ok(UserOutcome::Skipped)
        }
        IssueAction::Create => {
            create_tracking_issue(platform, config, login).await?;
            Ok(UserOutcome::Created {
                closed_stale: false,
            })
        }
        IssueAction::CloseThenCreate(stale) => {
            warn!(user = %login, issue = %stale, "closing stale tracking issue");
            platform
                .set_issue_state(&config.org, &config.repo, stale, IssueState::Closed)
                .await?;
            create_tracking_issue(platform, config, login).await?;
            Ok(UserOutcome::Created { closed_stale: true })
        }
    }
}

async fn create_tracking_issue(
    platform: &dyn Platform,
    config: &RunConfig,
    login: &Login,
) -> Result<(), PlatformError> {
    info!(user = %login, "opening tracking issue");
    let title = format!("Compliance: Unverified Email Address -- {login}");
    let body = render_message(&config.message_template, &config.org, &config.repo, login);
    platform
        .create_issue(
            &config.org,
            &config.repo,
            &title,
            &body,
            std::slice::from_ref(login),
            std::slice::from_ref(&config.labels.marker),
        )
        .await?;
    Ok(())
}
