//! Exemption-vs-removal reconciliation decision.
//!
//! An open tracking issue is reconciled by answering two questions: did the
//! user request an exemption, and if so, did an administrator actually grant
//! it? A grant is only valid when the issue's event history contains a
//! label-add event for the grant label performed by an administrator —
//! anyone can attach a label, so the history, not the label set, is
//! authoritative.

use crate::config::Labels;
use crate::types::{IssueEvent, TrackingIssue};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What the reconciliation engine should do with one issue.
///
/// Either way the issue is closed afterwards; the outcome only decides
/// whether its non-administrator assignees are removed from the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A validated exemption exists: announce the grant, remove nobody.
    ExemptionGranted,

    /// No exemption, or an exemption label that was never legitimately
    /// granted: remove every non-administrator assignee.
    Remove,
}

// ---------------------------------------------------------------------------
// Decision steps
// ---------------------------------------------------------------------------

/// Returns `true` if the issue carries the exemption-request label.
///
/// Only then is the event history worth replaying; issues without the label
/// go straight to removal.
pub fn requests_exemption(issue: &TrackingIssue, labels: &Labels) -> bool {
    issue.has_label(&labels.exemption_request)
}

/// Returns `true` if the event history shows the exemption-grant label being
/// added by a platform administrator.
pub fn exemption_validated(events: &[IssueEvent], labels: &Labels) -> bool {
    events
        .iter()
        .any(|event| event.added_label(&labels.exemption_grant) && event.actor_is_admin)
}

/// Combined decision over an issue's labels and event history.
pub fn reconcile_outcome(
    issue: &TrackingIssue,
    events: &[IssueEvent],
    labels: &Labels,
) -> ReconcileOutcome {
    if requests_exemption(issue, labels) && exemption_validated(events, labels) {
        ReconcileOutcome::ExemptionGranted
    } else {
        ReconcileOutcome::Remove
    }
}
