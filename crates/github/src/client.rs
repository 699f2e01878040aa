//! The `reqwest`-backed GitHub client.
//!
//! One client instance serves a whole run. Members come from the GraphQL
//! API (the verified-domain-email field has no REST equivalent); everything
//! else is REST. Every request goes through [`GithubClient::execute`], which
//! owns the bounded throttle-retry loop.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use policy::{
    AuditEntry, IssueEvent, IssueFilter, IssueNumber, IssueState, Login, Member, OrgName,
    Platform, PlatformError, RepoName, StateFilter, TrackingIssue,
};

use crate::retry::RetryConfig;
use crate::wire::{GraphQlResponse, MembersData, RestAuditEntry, RestIssue, RestIssueEvent};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: u32 = 100;

const MEMBERS_QUERY: &str = r#"query($org: String!, $page: String) {
  organization(login: $org) {
    membersWithRole(first: 100, after: $page) {
      pageInfo {
        endCursor
        hasNextPage
      }
      edges {
        role
        node {
          login
          organizationVerifiedDomainEmails(login: $org)
        }
      }
    }
  }
}"#;

/// GitHub implementation of the [`Platform`] port.
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    retry: RetryConfig,
    base_url: String,
}

impl GithubClient {
    /// Creates a client against api.github.com with the given retry
    /// configuration.
    pub fn new(token: impl Into<String>, retry: RetryConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("org-email-compliance/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| PlatformError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            token: token.into(),
            retry,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at a different API base URL (GitHub Enterprise
    /// Server, or a stub server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Sends a request, retrying throttle responses within the configured
    /// budgets. Non-throttle failures surface immediately.
    async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<Response, PlatformError> {
        let mut rate_budget = self.retry.max_rate_limit_retries;
        let mut abuse_budget = self.retry.max_abuse_retries;
        loop {
            let attempt = builder
                .try_clone()
                .ok_or_else(|| PlatformError::Transport("request is not retryable".into()))?;
            let response = attempt
                .send()
                .await
                .map_err(|err| PlatformError::Transport(err.to_string()))?;

            let Some(throttle) = throttle_error(&response) else {
                if response.status().is_success() {
                    return Ok(response);
                }
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                return Err(PlatformError::Api { status, message });
            };

            let budget = match throttle {
                PlatformError::RateLimited { .. } => &mut rate_budget,
                _ => &mut abuse_budget,
            };
            if *budget == 0 {
                return Err(throttle);
            }
            *budget -= 1;

            let delay = self.retry.delay_for(&throttle);
            warn!(error = %throttle, delay_ms = delay.as_millis() as u64, "throttled, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    /// Follows `Link: rel="next"` headers until the listing is exhausted.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        first: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<Vec<T>, PlatformError> {
        let mut results = Vec::new();
        let mut pending = Some(first);
        while let Some(builder) = pending.take() {
            let response = self.execute(builder).await?;
            let next = next_page_url(response.headers());
            let page: Vec<T> = decode(response, context).await?;
            results.extend(page);
            pending = next.map(|url| self.request(Method::GET, &url));
        }
        Ok(results)
    }

    fn repo_url(&self, org: &OrgName, repo: &RepoName, tail: &str) -> String {
        format!("{}/repos/{}/{}{}", self.base_url, org, repo, tail)
    }
}

async fn decode<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, PlatformError> {
    response.json::<T>().await.map_err(|err| PlatformError::Decode {
        context: context.to_string(),
        message: err.to_string(),
    })
}

#[async_trait]
impl Platform for GithubClient {
    async fn list_members(&self, org: &OrgName) -> Result<Vec<Member>, PlatformError> {
        debug!(%org, "retrieving organization members");
        let url = format!("{}/graphql", self.base_url);
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let body = json!({
                "query": MEMBERS_QUERY,
                "variables": {"org": org.as_str(), "page": cursor.as_deref()},
            });
            let response = self.execute(self.request(Method::POST, &url).json(&body)).await?;
            let envelope: GraphQlResponse<MembersData> = decode(response, "members page").await?;
            if let Some(error) = envelope.errors.first() {
                return Err(PlatformError::Api {
                    status: 200,
                    message: error.message.clone(),
                });
            }
            let data = envelope.data.ok_or_else(|| PlatformError::Decode {
                context: "members page".to_string(),
                message: "response has neither `data` nor `errors`".to_string(),
            })?;

            let connection = data.organization.members_with_role;
            for edge in connection.edges {
                members.push(edge.into_member()?);
            }
            if !connection.page_info.has_next_page {
                break;
            }
            // A next page with no cursor would re-request the first page forever.
            cursor = match connection.page_info.end_cursor {
                Some(next) => Some(next),
                None => {
                    return Err(PlatformError::Decode {
                        context: "members page".to_string(),
                        message: "next page requested but `endCursor` is null".to_string(),
                    })
                }
            };
        }
        Ok(members)
    }

    async fn list_membership_additions(
        &self,
        org: &OrgName,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, PlatformError> {
        debug!(%org, %since, "retrieving audit log");
        let phrase = format!(
            "action:org.add_member created:>={}",
            since.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let url = format!("{}/orgs/{}/audit-log", self.base_url, org);
        let per_page = PAGE_SIZE.to_string();
        let first = self.request(Method::GET, &url).query(&[
            ("phrase", phrase.as_str()),
            ("include", "web"),
            ("per_page", per_page.as_str()),
        ]);
        let entries: Vec<RestAuditEntry> = self.get_paginated(first, "audit log").await?;
        entries.into_iter().map(RestAuditEntry::into_entry).collect()
    }

    async fn list_issues(
        &self,
        org: &OrgName,
        repo: &RepoName,
        filter: &IssueFilter,
    ) -> Result<Vec<TrackingIssue>, PlatformError> {
        debug!(%org, %repo, "retrieving issues");
        let state = match filter.state {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        };
        let mut params = vec![
            ("state".to_string(), state.to_string()),
            ("sort".to_string(), "created".to_string()),
            ("direction".to_string(), "desc".to_string()),
            ("per_page".to_string(), PAGE_SIZE.to_string()),
        ];
        if let Some(assignee) = &filter.assignee {
            params.push(("assignee".to_string(), assignee.to_string()));
        }
        if !filter.labels.is_empty() {
            params.push(("labels".to_string(), filter.labels.join(",")));
        }

        let url = self.repo_url(org, repo, "/issues");
        let first = self.request(Method::GET, &url).query(&params);
        let issues: Vec<RestIssue> = self.get_paginated(first, "issues").await?;
        issues.into_iter().map(RestIssue::into_issue).collect()
    }

    async fn create_issue(
        &self,
        org: &OrgName,
        repo: &RepoName,
        title: &str,
        body: &str,
        assignees: &[Login],
        labels: &[String],
    ) -> Result<TrackingIssue, PlatformError> {
        debug!(%org, %repo, title, "creating issue");
        let url = self.repo_url(org, repo, "/issues");
        let payload = json!({
            "title": title,
            "body": body,
            "assignees": assignees.iter().map(Login::as_str).collect::<Vec<_>>(),
            "labels": labels,
        });
        let response = self.execute(self.request(Method::POST, &url).json(&payload)).await?;
        let issue: RestIssue = decode(response, "created issue").await?;
        issue.into_issue()
    }

    async fn set_issue_state(
        &self,
        org: &OrgName,
        repo: &RepoName,
        number: IssueNumber,
        state: IssueState,
    ) -> Result<(), PlatformError> {
        debug!(%org, %repo, %number, ?state, "updating issue state");
        let url = self.repo_url(org, repo, &format!("/issues/{number}"));
        let state = match state {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        };
        self.execute(self.request(Method::PATCH, &url).json(&json!({"state": state})))
            .await?;
        Ok(())
    }

    async fn add_comment(
        &self,
        org: &OrgName,
        repo: &RepoName,
        number: IssueNumber,
        body: &str,
    ) -> Result<(), PlatformError> {
        debug!(%org, %repo, %number, "commenting on issue");
        let url = self.repo_url(org, repo, &format!("/issues/{number}/comments"));
        self.execute(self.request(Method::POST, &url).json(&json!({"body": body})))
            .await?;
        Ok(())
    }

    async fn list_issue_events(
        &self,
        org: &OrgName,
        repo: &RepoName,
        number: IssueNumber,
    ) -> Result<Vec<IssueEvent>, PlatformError> {
        debug!(%org, %repo, %number, "retrieving issue events");
        let url = self.repo_url(org, repo, &format!("/issues/{number}/events"));
        let first = self
            .request(Method::GET, &url)
            .query(&[("per_page", PAGE_SIZE.to_string())]);
        let events: Vec<RestIssueEvent> = self.get_paginated(first, "issue events").await?;
        Ok(events.into_iter().map(RestIssueEvent::into_event).collect())
    }

    async fn remove_org_member(
        &self,
        org: &OrgName,
        login: &Login,
    ) -> Result<(), PlatformError> {
        debug!(%org, user = %login, "removing organization member");
        let url = format!("{}/orgs/{}/members/{}", self.base_url, org, login);
        self.execute(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Throttle classification and pagination helpers
// ---------------------------------------------------------------------------

fn throttle_error(response: &Response) -> Option<PlatformError> {
    let status = response.status();
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok());
    classify_throttle(status.as_u16(), remaining, retry_after)
}

/// Maps a throttle-looking response onto the error taxonomy.
///
/// 429 and 403-with-exhausted-quota are the primary rate limit; a 403
/// carrying only `retry-after` is abuse detection (secondary limit). Any
/// other 403 is an ordinary API error.
fn classify_throttle(
    status: u16,
    ratelimit_remaining: Option<&str>,
    retry_after: Option<Duration>,
) -> Option<PlatformError> {
    match status {
        429 => Some(PlatformError::RateLimited { retry_after }),
        403 if ratelimit_remaining == Some("0") => {
            Some(PlatformError::RateLimited { retry_after })
        }
        403 if retry_after.is_some() => Some(PlatformError::AbuseDetected { retry_after }),
        _ => None,
    }
}

fn next_page_url(headers: &header::HeaderMap) -> Option<String> {
    let link = headers.get(header::LINK)?.to_str().ok()?;
    parse_next_link(link)
}

/// Extracts the `rel="next"` target from a `Link` header value.
fn parse_next_link(link: &str) -> Option<String> {
    for part in link.split(',') {
        let mut sections = part.trim().split(';');
        let url = sections
            .next()
            .map(|url| url.trim().trim_start_matches('<').trim_end_matches('>'))?;
        if sections.any(|param| param.trim() == r#"rel="next""#) {
            return Some(url.to_string());
        }
    }
    None
}
