//! Wire-format structs and boundary mapping.
//!
//! Each endpoint's payload gets its own serde struct; conversion into the
//! typed [`policy`] entities fails fast with a [`PlatformError::Decode`]
//! when a required field is missing or malformed. Nothing downstream of this
//! module ever sees raw JSON.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use policy::{
    AuditEntry, IssueEvent, IssueNumber, IssueState, Login, Member, PlatformError, TrackingIssue,
};

fn decode_err(context: &str, message: impl Into<String>) -> PlatformError {
    PlatformError::Decode {
        context: context.to_string(),
        message: message.into(),
    }
}

fn login_field(context: &str, raw: String) -> Result<Login, PlatformError> {
    Login::new(raw).ok_or_else(|| decode_err(context, "empty `login` field"))
}

// ---------------------------------------------------------------------------
// GraphQL envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Members query
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct MembersData {
    pub organization: OrganizationNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationNode {
    #[serde(rename = "membersWithRole")]
    pub members_with_role: MembersConnection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MembersConnection {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    pub edges: Vec<MemberEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageInfo {
    #[serde(rename = "endCursor")]
    pub end_cursor: Option<String>,
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MemberEdge {
    pub role: String,
    pub node: MemberNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MemberNode {
    pub login: String,
    #[serde(rename = "organizationVerifiedDomainEmails")]
    pub verified_emails: Vec<String>,
}

impl MemberEdge {
    pub fn into_member(self) -> Result<Member, PlatformError> {
        Ok(Member {
            login: login_field("members page", self.node.login)?,
            is_admin: self.role == "ADMIN",
            verified_email_count: self.node.verified_emails.len() as u32,
        })
    }
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RestAuditEntry {
    /// Login of the account acted on by the `org.add_member` event.
    pub user: String,
    /// Event time in milliseconds since the epoch.
    pub created_at: i64,
}

impl RestAuditEntry {
    pub fn into_entry(self) -> Result<AuditEntry, PlatformError> {
        let occurred_at = millis_to_utc("audit log entry", self.created_at)?;
        Ok(AuditEntry {
            login: login_field("audit log entry", self.user)?,
            occurred_at,
        })
    }
}

fn millis_to_utc(context: &str, millis: i64) -> Result<DateTime<Utc>, PlatformError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| decode_err(context, format!("timestamp {millis} out of range")))
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RestIssue {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<RestLabel>,
    #[serde(default)]
    pub assignees: Vec<RestAssignee>,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestAssignee {
    pub login: String,
    #[serde(default)]
    pub site_admin: bool,
}

impl RestIssue {
    pub fn into_issue(self) -> Result<TrackingIssue, PlatformError> {
        let state = match self.state.as_str() {
            "open" => IssueState::Open,
            "closed" => IssueState::Closed,
            other => return Err(decode_err("issue", format!("unknown state `{other}`"))),
        };
        let assignees = self
            .assignees
            .into_iter()
            .map(|assignee| {
                // The issues API does not expose verified-email counts;
                // reconciliation reads only login and admin status.
                Ok(Member {
                    login: login_field("issue assignee", assignee.login)?,
                    is_admin: assignee.site_admin,
                    verified_email_count: 0,
                })
            })
            .collect::<Result<Vec<_>, PlatformError>>()?;
        Ok(TrackingIssue {
            number: IssueNumber::new(self.number),
            created_at: self.created_at,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            assignees,
            state,
        })
    }
}

// ---------------------------------------------------------------------------
// Issue events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RestIssueEvent {
    pub event: String,
    pub label: Option<RestLabel>,
    pub actor: Option<RestActor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestActor {
    #[serde(default)]
    pub site_admin: bool,
}

impl RestIssueEvent {
    pub fn into_event(self) -> IssueEvent {
        IssueEvent {
            kind: self.event,
            label: self.label.map(|l| l.name),
            actor_is_admin: self.actor.map(|a| a.site_admin).unwrap_or(false),
        }
    }
}
