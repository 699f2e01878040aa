//! Entity types mirrored from the platform.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! the facts the decision functions operate on: membership records, audit-log
//! entries, tracking issues, and issue timeline events. They are produced by
//! the `github` adapter's boundary mapping and are never mutated by policy
//! code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{IssueNumber, Login};

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// An organization member together with the facts the compliance policy
/// needs about them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The member's account login.
    pub login: Login,

    /// Whether the member is a platform administrator.
    ///
    /// Administrators are never escalated: the lifecycle manager skips them
    /// and the reconciliation engine never removes them.
    pub is_admin: bool,

    /// Number of organization-verified domain email addresses on the account.
    pub verified_email_count: u32,
}

impl Member {
    /// Returns `true` if the member has no verified domain email address.
    pub fn is_non_compliant(&self) -> bool {
        self.verified_email_count == 0
    }
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

/// A membership-addition event from the organization audit log.
///
/// Only events inside the configured lookback window are ever fetched; the
/// entry's presence is what grants the member their grace period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Login of the account that was added to the organization.
    pub login: Login,

    /// When the addition occurred.
    pub occurred_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tracking issues
// ---------------------------------------------------------------------------

/// Open/closed state of a tracking issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// The issue is open and pending reconciliation.
    Open,
    /// The issue has been resolved or superseded.
    Closed,
}

/// A compliance tracking issue as it exists on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingIssue {
    /// Platform-assigned issue number.
    pub number: IssueNumber,

    /// Creation timestamp; staleness is measured from this instant.
    pub created_at: DateTime<Utc>,

    /// Label names currently on the issue.
    pub labels: Vec<String>,

    /// Assigned members, in platform order.
    pub assignees: Vec<Member>,

    /// Current open/closed state.
    pub state: IssueState,
}

impl TrackingIssue {
    /// Returns `true` if the issue carries the given label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

// ---------------------------------------------------------------------------
// Issue timeline
// ---------------------------------------------------------------------------

/// Event kind string for label-addition events on the issue timeline.
pub const EVENT_LABELED: &str = "labeled";

/// A single event from an issue's timeline.
///
/// Only `labeled` events matter to the reconciliation decision; the rest are
/// carried through so the decision function, not the adapter, owns the
/// filtering rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    /// Platform event kind (e.g. `"labeled"`, `"assigned"`, `"closed"`).
    pub kind: String,

    /// Label name, present only on label-related events.
    pub label: Option<String>,

    /// Whether the actor who produced the event is a platform administrator.
    pub actor_is_admin: bool,
}

impl IssueEvent {
    /// Returns `true` if this event added the named label.
    pub fn added_label(&self, label: &str) -> bool {
        self.kind == EVENT_LABELED && self.label.as_deref() == Some(label)
    }
}
