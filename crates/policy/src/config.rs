//! Policy configuration: label names, window thresholds, and the
//! stale-issue supersession behavior.
//!
//! The compliance policy itself is fixed; only these thresholds and names
//! vary between deployments.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// The label names the policy recognizes on tracking issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    /// Marker identifying an issue as a compliance tracking issue.
    pub marker: String,

    /// Label whose presence on an issue indicates an exemption was requested.
    pub exemption_request: String,

    /// Label whose addition by an administrator validates the exemption.
    ///
    /// Defaults to the same name as [`Labels::exemption_request`]: the stock
    /// workflow uses one label for both, but the two roles are distinct and
    /// separately configurable.
    pub exemption_grant: String,

    /// Label marking the assignee as a recognized automation identity.
    pub bot_account: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            marker: "compliance-unverified-email".into(),
            exemption_request: "request-granted".into(),
            exemption_grant: "request-granted".into(),
            bot_account: "bot-account".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stale-issue supersession
// ---------------------------------------------------------------------------

/// What to do with a stale tracking issue when a fresh one is created.
///
/// Upstream call sites of the original workflow disagreed on this point;
/// rather than silently picking one behavior, both are supported behind this
/// flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaleIssuePolicy {
    /// Create the fresh issue and leave the stale one as-is.
    #[default]
    CreateOnly,

    /// Close the stale issue first, then create the fresh one.
    CloseThenCreate,
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Window thresholds and naming conventions for one run.
///
/// The lookback window and the staleness window are independent durations:
/// the first grants newly added members a grace period, the second bounds how
/// long a tracking issue stays authoritative before it is superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Days of audit-log history that exempt a newly added member.
    pub lookback_days: i64,

    /// Days after which an existing tracking issue is considered stale.
    pub staleness_days: i64,

    /// Login suffix identifying bot accounts excluded from enforcement.
    pub bot_suffix: String,

    /// Behavior when a stale issue is superseded.
    pub stale_issue_policy: StaleIssuePolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            staleness_days: 60,
            bot_suffix: "-bot".into(),
            stale_issue_policy: StaleIssuePolicy::default(),
        }
    }
}
