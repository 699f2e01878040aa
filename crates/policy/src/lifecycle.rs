//! Tracking-issue lifecycle decision.
//!
//! Given the existing tracking issues for one violating user (newest first)
//! and the current instant, decide whether a fresh issue is needed, whether a
//! stale one must be closed first, or whether nothing should happen. The
//! engine performs the resulting platform writes; this module only decides.

use chrono::{DateTime, Duration, Utc};

use crate::config::{Labels, PolicyConfig, StaleIssuePolicy};
use crate::identifiers::IssueNumber;
use crate::types::TrackingIssue;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Outcome of evaluating one user's existing tracking issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueAction {
    /// No tracking issue exists (or the newest is stale under
    /// [`StaleIssuePolicy::CreateOnly`]): create a fresh one.
    Create,

    /// The newest issue is stale and must be closed before a fresh one is
    /// created ([`StaleIssuePolicy::CloseThenCreate`]).
    CloseThenCreate(IssueNumber),

    /// The newest issue carries the bot-account label: the user is a
    /// recognized automation identity, take no action.
    SkipBot,

    /// The newest issue is still fresh: take no action. Running the
    /// lifecycle twice in succession therefore never opens a second issue.
    SkipFresh,
}

/// Decides what to do about a user's tracking issues.
///
/// `existing` must be sorted by creation time descending, as returned by the
/// platform listing; only the most recent issue drives the decision. An issue
/// aged exactly at the staleness threshold is NOT yet stale: the comparison
/// is strictly greater-than, to the millisecond.
pub fn issue_action(
    existing: &[TrackingIssue],
    now: DateTime<Utc>,
    labels: &Labels,
    config: &PolicyConfig,
) -> IssueAction {
    let Some(most_recent) = existing.first() else {
        return IssueAction::Create;
    };

    if most_recent.has_label(&labels.bot_account) {
        return IssueAction::SkipBot;
    }

    let age = now.signed_duration_since(most_recent.created_at);
    if age > Duration::days(config.staleness_days) {
        return match config.stale_issue_policy {
            StaleIssuePolicy::CreateOnly => IssueAction::Create,
            StaleIssuePolicy::CloseThenCreate => IssueAction::CloseThenCreate(most_recent.number),
        };
    }

    IssueAction::SkipFresh
}
