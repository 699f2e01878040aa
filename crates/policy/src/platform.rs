//! The `Platform` port trait.
//!
//! Everything the compliance bot needs from the hosting platform, expressed
//! as abstract contracts over the entity types in [`crate::types`].
//! Pagination, authentication, rate-limit retry, and wire formats are the
//! adapter's concern: callers always see complete sequences of typed
//! entities.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::PlatformError;
use crate::identifiers::{IssueNumber, Login, OrgName, RepoName};
use crate::types::{AuditEntry, IssueEvent, IssueState, Member, TrackingIssue};

// ---------------------------------------------------------------------------
// Issue listing filter
// ---------------------------------------------------------------------------

/// State filter for issue listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateFilter {
    /// Only open issues.
    #[default]
    Open,
    /// Only closed issues.
    Closed,
    /// Issues in any state.
    All,
}

/// Filter for [`Platform::list_issues`].
///
/// Listings are always sorted by creation time descending, which the
/// lifecycle decision relies on.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    /// Restrict to issues assigned to this login.
    pub assignee: Option<Login>,

    /// Restrict to issues carrying all of these labels.
    pub labels: Vec<String>,

    /// Restrict by open/closed state.
    pub state: StateFilter,
}

impl IssueFilter {
    /// Filter matching every issue in the repository, open state only.
    pub fn open() -> Self {
        Self::default()
    }

    /// Filter matching issues in any state assigned to `login` carrying
    /// `label` — the lifecycle manager's lookup.
    pub fn assigned_with_label(login: Login, label: impl Into<String>) -> Self {
        Self {
            assignee: Some(login),
            labels: vec![label.into()],
            state: StateFilter::All,
        }
    }
}

// ---------------------------------------------------------------------------
// Port trait
// ---------------------------------------------------------------------------

/// Abstract platform operations consumed by the compliance engine.
///
/// Implementations must retry transparently on rate-limit and
/// abuse-detection responses (bounded retries) before surfacing a
/// [`PlatformError`].
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lists every organization member with their verified-domain-email
    /// count. Paginated internally; returns the complete membership.
    async fn list_members(&self, org: &OrgName) -> Result<Vec<Member>, PlatformError>;

    /// Lists membership-addition audit events since `since`.
    async fn list_membership_additions(
        &self,
        org: &OrgName,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, PlatformError>;

    /// Lists issues in the tracking repository matching `filter`, sorted by
    /// creation time descending.
    async fn list_issues(
        &self,
        org: &OrgName,
        repo: &RepoName,
        filter: &IssueFilter,
    ) -> Result<Vec<TrackingIssue>, PlatformError>;

    /// Creates an issue and returns it as the platform recorded it.
    async fn create_issue(
        &self,
        org: &OrgName,
        repo: &RepoName,
        title: &str,
        body: &str,
        assignees: &[Login],
        labels: &[String],
    ) -> Result<TrackingIssue, PlatformError>;

    /// Sets an issue's open/closed state.
    async fn set_issue_state(
        &self,
        org: &OrgName,
        repo: &RepoName,
        number: IssueNumber,
        state: IssueState,
    ) -> Result<(), PlatformError>;

    /// Posts a comment on an issue.
    async fn add_comment(
        &self,
        org: &OrgName,
        repo: &RepoName,
        number: IssueNumber,
        body: &str,
    ) -> Result<(), PlatformError>;

    /// Lists the full event history of an issue.
    async fn list_issue_events(
        &self,
        org: &OrgName,
        repo: &RepoName,
        number: IssueNumber,
    ) -> Result<Vec<IssueEvent>, PlatformError>;

    /// Removes a member from the organization.
    async fn remove_org_member(&self, org: &OrgName, login: &Login)
        -> Result<(), PlatformError>;
}
