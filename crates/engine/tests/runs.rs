//! End-to-end runs against an in-memory platform fake.
//!
//! The fake records every mutating operation in order, which lets these
//! tests assert not just outcomes but sequencing (stale issue closed before
//! the fresh one is created, violations processed in sorted order).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use engine::{collect_violations, run_notify, run_reconcile, RunConfig};
use policy::{
    AuditEntry, IssueEvent, IssueFilter, IssueNumber, IssueState, Labels, Login, Member, OrgName,
    Platform, PlatformError, PolicyConfig, RepoName, StaleIssuePolicy, StateFilter, TrackingIssue,
};

// ---------------------------------------------------------------------------
// Fake platform
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeState {
    members: Vec<Member>,
    additions: Vec<AuditEntry>,
    issues: Vec<TrackingIssue>,
    events: HashMap<u64, Vec<IssueEvent>>,
    comments: Vec<(u64, String)>,
    removed: Vec<Login>,
    ops: Vec<String>,
    next_number: u64,
    fail_removals_for: HashSet<String>,
    fail_events_for: HashSet<u64>,
    fail_create_for: HashSet<String>,
    fail_lookup_for: HashSet<String>,
    fail_audit_log: bool,
    fail_issue_list: bool,
}

struct FakePlatform {
    state: Mutex<FakeState>,
    now: DateTime<Utc>,
}

impl FakePlatform {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_number: 1,
                ..FakeState::default()
            }),
            now,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn ops(&self) -> Vec<String> {
        self.with(|s| s.ops.clone())
    }
}

fn transient(message: &str) -> PlatformError {
    PlatformError::Transport(message.into())
}

#[async_trait]
impl Platform for FakePlatform {
    async fn list_members(&self, _org: &OrgName) -> Result<Vec<Member>, PlatformError> {
        Ok(self.with(|s| s.members.clone()))
    }

    async fn list_membership_additions(
        &self,
        _org: &OrgName,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, PlatformError> {
        self.with(|s| {
            if s.fail_audit_log {
                return Err(transient("audit log unavailable"));
            }
            Ok(s.additions
                .iter()
                .filter(|entry| entry.occurred_at >= since)
                .cloned()
                .collect())
        })
    }

    async fn list_issues(
        &self,
        _org: &OrgName,
        _repo: &RepoName,
        filter: &IssueFilter,
    ) -> Result<Vec<TrackingIssue>, PlatformError> {
        self.with(|s| {
            if s.fail_issue_list {
                return Err(transient("issue list unavailable"));
            }
            if let Some(login) = &filter.assignee {
                if s.fail_lookup_for.contains(login.as_str()) {
                    return Err(transient("issue lookup failed"));
                }
            }
            let mut matched: Vec<TrackingIssue> = s
                .issues
                .iter()
                .filter(|issue| match filter.state {
                    StateFilter::Open => issue.state == IssueState::Open,
                    StateFilter::Closed => issue.state == IssueState::Closed,
                    StateFilter::All => true,
                })
                .filter(|issue| match &filter.assignee {
                    Some(login) => issue.assignees.iter().any(|a| &a.login == login),
                    None => true,
                })
                .filter(|issue| filter.labels.iter().all(|l| issue.has_label(l)))
                .cloned()
                .collect();
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(matched)
        })
    }

    async fn create_issue(
        &self,
        _org: &OrgName,
        _repo: &RepoName,
        title: &str,
        body: &str,
        assignees: &[Login],
        labels: &[String],
    ) -> Result<TrackingIssue, PlatformError> {
        let created_at = self.now;
        self.with(|s| {
            if assignees
                .iter()
                .any(|login| s.fail_create_for.contains(login.as_str()))
            {
                return Err(transient("issue creation failed"));
            }
            let number = s.next_number;
            s.next_number += 1;
            let issue = TrackingIssue {
                number: IssueNumber::new(number),
                created_at,
                labels: labels.to_vec(),
                assignees: assignees
                    .iter()
                    .map(|login| Member {
                        login: login.clone(),
                        is_admin: false,
                        verified_email_count: 0,
                    })
                    .collect(),
                state: IssueState::Open,
            };
            s.issues.push(issue.clone());
            s.ops.push(format!("create:{title}:{body}"));
            Ok(issue)
        })
    }

    async fn set_issue_state(
        &self,
        _org: &OrgName,
        _repo: &RepoName,
        number: IssueNumber,
        state: IssueState,
    ) -> Result<(), PlatformError> {
        self.with(|s| {
            if let Some(issue) = s.issues.iter_mut().find(|i| i.number == number) {
                issue.state = state;
            }
            s.ops.push(format!("state:{number}:{state:?}"));
            Ok(())
        })
    }

    async fn add_comment(
        &self,
        _org: &OrgName,
        _repo: &RepoName,
        number: IssueNumber,
        body: &str,
    ) -> Result<(), PlatformError> {
        self.with(|s| {
            s.comments.push((number.as_u64(), body.to_string()));
            s.ops.push(format!("comment:{number}"));
            Ok(())
        })
    }

    async fn list_issue_events(
        &self,
        _org: &OrgName,
        _repo: &RepoName,
        number: IssueNumber,
    ) -> Result<Vec<IssueEvent>, PlatformError> {
        self.with(|s| {
            if s.fail_events_for.contains(&number.as_u64()) {
                return Err(transient("events unavailable"));
            }
            Ok(s.events.get(&number.as_u64()).cloned().unwrap_or_default())
        })
    }

    async fn remove_org_member(
        &self,
        _org: &OrgName,
        login: &Login,
    ) -> Result<(), PlatformError> {
        self.with(|s| {
            if s.fail_removals_for.contains(login.as_str()) {
                return Err(transient("removal failed"));
            }
            s.removed.push(login.clone());
            s.ops.push(format!("remove:{login}"));
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn login(value: &str) -> Login {
    Login::new(value).unwrap()
}

fn member(name: &str, verified: u32) -> Member {
    Member {
        login: login(name),
        is_admin: false,
        verified_email_count: verified,
    }
}

fn admin(name: &str) -> Member {
    Member {
        login: login(name),
        is_admin: true,
        verified_email_count: 0,
    }
}

fn config() -> RunConfig {
    RunConfig {
        org: OrgName::new("acme").unwrap(),
        repo: RepoName::new("compliance").unwrap(),
        labels: Labels::default(),
        policy: PolicyConfig::default(),
        message_template: "{{ user }}: please verify your email for {{ org }}.".into(),
    }
}

fn tracking_issue(
    number: u64,
    created_at: DateTime<Utc>,
    labels: Vec<&str>,
    assignees: Vec<Member>,
) -> TrackingIssue {
    TrackingIssue {
        number: IssueNumber::new(number),
        created_at,
        labels: labels.into_iter().map(String::from).collect(),
        assignees,
        state: IssueState::Open,
    }
}

// ---------------------------------------------------------------------------
// Notify / audit mode
// ---------------------------------------------------------------------------

// Scenario: alice has 0 verified emails and joined long before the lookback
// window; she gets a fresh tracking issue with a rendered body.
#[tokio::test]
async fn violation_gets_a_new_tracking_issue() {
    let platform = FakePlatform::new(now());
    platform.with(|s| s.members = vec![member("alice", 0), member("frank", 3)]);

    let report = run_notify(&platform, &config(), now()).await.unwrap();

    assert_eq!(report.violations, 1);
    assert_eq!(report.issues_created, 1);
    let issues = platform.with(|s| s.issues.clone());
    assert_eq!(issues.len(), 1);
    assert!(issues[0].has_label("compliance-unverified-email"));
    assert_eq!(issues[0].assignees[0].login, login("alice"));
    let ops = platform.ops();
    assert_eq!(
        ops[0],
        "create:Compliance: Unverified Email Address -- alice:alice: please verify your email for acme."
    );
}

// Scenario: bob joined 5 days ago with a 30-day lookback window; he is
// exempt regardless of compliance status.
#[tokio::test]
async fn recently_added_member_is_exempt() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.members = vec![member("bob", 0)];
        s.additions = vec![AuditEntry {
            login: login("bob"),
            occurred_at: now() - Duration::days(5),
        }];
    });

    let report = run_notify(&platform, &config(), now()).await.unwrap();

    assert_eq!(report.violations, 0);
    assert_eq!(report.issues_created, 0);
    assert!(platform.with(|s| s.issues.is_empty()));
}

// Scenario: carol already has a 10-day-old tracking issue against a 60-day
// staleness threshold; nothing new is created, and a second run is a no-op.
#[tokio::test]
async fn fresh_existing_issue_makes_notify_idempotent() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.members = vec![member("carol", 0)];
        s.issues = vec![tracking_issue(
            1,
            now() - Duration::days(10),
            vec!["compliance-unverified-email"],
            vec![member("carol", 0)],
        )];
        s.next_number = 2;
    });

    let first = run_notify(&platform, &config(), now()).await.unwrap();
    let second = run_notify(&platform, &config(), now()).await.unwrap();

    assert_eq!(first.issues_created, 0);
    assert_eq!(first.skipped, 1);
    assert_eq!(second.issues_created, 0);
    assert_eq!(platform.with(|s| s.issues.len()), 1);
}

#[tokio::test]
async fn stale_issue_is_superseded_without_closing_by_default() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.members = vec![member("alice", 0)];
        s.issues = vec![tracking_issue(
            1,
            now() - Duration::days(61),
            vec!["compliance-unverified-email"],
            vec![member("alice", 0)],
        )];
        s.next_number = 2;
    });

    let report = run_notify(&platform, &config(), now()).await.unwrap();

    assert_eq!(report.issues_created, 1);
    assert_eq!(report.issues_closed, 0);
    // The stale issue is left open under the default policy.
    let open = platform.with(|s| {
        s.issues
            .iter()
            .filter(|i| i.state == IssueState::Open)
            .count()
    });
    assert_eq!(open, 2);
}

#[tokio::test]
async fn close_then_create_closes_the_stale_issue_first() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.members = vec![member("alice", 0)];
        s.issues = vec![tracking_issue(
            7,
            now() - Duration::days(90),
            vec!["compliance-unverified-email"],
            vec![member("alice", 0)],
        )];
        s.next_number = 8;
    });
    let mut config = config();
    config.policy.stale_issue_policy = StaleIssuePolicy::CloseThenCreate;

    let report = run_notify(&platform, &config, now()).await.unwrap();

    assert_eq!(report.issues_created, 1);
    assert_eq!(report.issues_closed, 1);
    let ops = platform.ops();
    assert_eq!(ops[0], "state:7:Closed");
    assert!(ops[1].starts_with("create:"));
}

#[tokio::test]
async fn bot_labeled_issue_skips_the_user() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.members = vec![member("automation", 0)];
        s.issues = vec![tracking_issue(
            1,
            now() - Duration::days(200),
            vec!["compliance-unverified-email", "bot-account"],
            vec![member("automation", 0)],
        )];
        s.next_number = 2;
    });

    let report = run_notify(&platform, &config(), now()).await.unwrap();

    assert_eq!(report.issues_created, 0);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn bot_suffixed_logins_never_become_violations() {
    let platform = FakePlatform::new(now());
    platform.with(|s| s.members = vec![member("deploy-bot", 0), member("alice", 0)]);

    let report = run_notify(&platform, &config(), now()).await.unwrap();

    assert_eq!(report.violations, 1);
    assert_eq!(platform.with(|s| s.issues.len()), 1);
}

#[tokio::test]
async fn administrators_are_never_escalated() {
    let platform = FakePlatform::new(now());
    platform.with(|s| s.members = vec![admin("root")]);

    let report = run_notify(&platform, &config(), now()).await.unwrap();

    assert_eq!(report.violations, 1);
    assert_eq!(report.issues_created, 0);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn violations_are_processed_in_sorted_order() {
    let platform = FakePlatform::new(now());
    platform.with(|s| s.members = vec![member("zeta", 0), member("alpha", 0)]);

    run_notify(&platform, &config(), now()).await.unwrap();

    let ops = platform.ops();
    assert!(ops[0].contains("alpha"));
    assert!(ops[1].contains("zeta"));
}

#[tokio::test]
async fn per_user_failures_do_not_abort_the_remaining_violations() {
    // alpha's creation and mira's issue lookup both fail; zeta is processed
    // regardless and gets a tracking issue.
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.members = vec![member("alpha", 0), member("mira", 0), member("zeta", 0)];
        s.fail_create_for.insert("alpha".into());
        s.fail_lookup_for.insert("mira".into());
    });

    let report = run_notify(&platform, &config(), now()).await.unwrap();

    assert_eq!(report.violations, 3);
    assert_eq!(report.failures, 2);
    assert_eq!(report.issues_created, 1);
    let issues = platform.with(|s| s.issues.clone());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].assignees[0].login, login("zeta"));
}

#[tokio::test]
async fn audit_mode_reports_without_writing() {
    let platform = FakePlatform::new(now());
    platform.with(|s| s.members = vec![member("alice", 0), member("bob", 0)]);

    let outcome = collect_violations(&platform, &config(), now())
        .await
        .unwrap();

    assert_eq!(outcome.violations.len(), 2);
    assert!(platform.ops().is_empty());
}

#[tokio::test]
async fn audit_log_failure_aborts_the_run() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.members = vec![member("alice", 0)];
        s.fail_audit_log = true;
    });

    let result = run_notify(&platform, &config(), now()).await;

    assert!(matches!(
        result,
        Err(policy::ComplianceError::AuditLogUnavailable { .. })
    ));
    assert!(platform.with(|s| s.issues.is_empty()));
}

// ---------------------------------------------------------------------------
// Reconcile mode
// ---------------------------------------------------------------------------

// Scenario: an administrator added the grant label; the exemption holds, a
// comment announces it, nobody is removed, the issue is closed.
#[tokio::test]
async fn validated_exemption_is_announced_and_nobody_removed() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.issues = vec![tracking_issue(
            3,
            now() - Duration::days(70),
            vec!["compliance-unverified-email", "request-granted"],
            vec![member("carol", 0)],
        )];
        s.events.insert(
            3,
            vec![IssueEvent {
                kind: "labeled".into(),
                label: Some("request-granted".into()),
                actor_is_admin: true,
            }],
        );
    });

    let report = run_reconcile(&platform, &config()).await.unwrap();

    assert_eq!(report.exemptions_granted, 1);
    assert_eq!(report.members_removed, 0);
    let comments = platform.with(|s| s.comments.clone());
    assert_eq!(comments, vec![(3, "An exemption has been granted.".into())]);
    assert_eq!(
        platform.with(|s| s.issues[0].state),
        IssueState::Closed
    );
}

// Scenario: no exemption label at all; the single non-admin assignee is
// removed, a notice is posted, the issue is closed.
#[tokio::test]
async fn unlabeled_issue_removes_non_admin_assignees() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.issues = vec![tracking_issue(
            5,
            now() - Duration::days(70),
            vec!["compliance-unverified-email"],
            vec![member("dave", 0)],
        )];
    });

    let report = run_reconcile(&platform, &config()).await.unwrap();

    assert_eq!(report.members_removed, 1);
    assert_eq!(platform.with(|s| s.removed.clone()), vec![login("dave")]);
    let comments = platform.with(|s| s.comments.clone());
    assert_eq!(
        comments,
        vec![(
            5,
            "dave has been removed from the acme organization.".into()
        )]
    );
    assert_eq!(platform.with(|s| s.issues[0].state), IssueState::Closed);
}

#[tokio::test]
async fn unvalidated_exemption_falls_through_to_removal() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.issues = vec![tracking_issue(
            4,
            now() - Duration::days(70),
            vec!["request-granted"],
            vec![member("eve", 0)],
        )];
        // The label exists but was added by a non-administrator.
        s.events.insert(
            4,
            vec![IssueEvent {
                kind: "labeled".into(),
                label: Some("request-granted".into()),
                actor_is_admin: false,
            }],
        );
    });

    let report = run_reconcile(&platform, &config()).await.unwrap();

    assert_eq!(report.exemptions_granted, 0);
    assert_eq!(report.members_removed, 1);
    assert_eq!(platform.with(|s| s.removed.clone()), vec![login("eve")]);
}

#[tokio::test]
async fn admin_assignees_are_not_removed() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.issues = vec![tracking_issue(
            6,
            now() - Duration::days(70),
            vec![],
            vec![admin("root"), member("dave", 0)],
        )];
    });

    let report = run_reconcile(&platform, &config()).await.unwrap();

    assert_eq!(report.members_removed, 1);
    assert_eq!(platform.with(|s| s.removed.clone()), vec![login("dave")]);
}

#[tokio::test]
async fn failed_removal_does_not_block_remaining_assignees() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.issues = vec![tracking_issue(
            8,
            now() - Duration::days(70),
            vec![],
            vec![member("flaky", 0), member("dave", 0)],
        )];
        s.fail_removals_for.insert("flaky".into());
    });

    let report = run_reconcile(&platform, &config()).await.unwrap();

    assert_eq!(report.failures, 1);
    assert_eq!(report.members_removed, 1);
    assert_eq!(platform.with(|s| s.removed.clone()), vec![login("dave")]);
    assert_eq!(platform.with(|s| s.issues[0].state), IssueState::Closed);
}

#[tokio::test]
async fn event_history_failure_still_closes_the_issue_without_removal() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.issues = vec![tracking_issue(
            9,
            now() - Duration::days(70),
            vec!["request-granted"],
            vec![member("grace", 0)],
        )];
        s.fail_events_for.insert(9);
    });

    let report = run_reconcile(&platform, &config()).await.unwrap();

    assert_eq!(report.failures, 1);
    assert_eq!(report.members_removed, 0);
    assert!(platform.with(|s| s.removed.is_empty()));
    assert_eq!(platform.with(|s| s.issues[0].state), IssueState::Closed);
}

#[tokio::test]
async fn issue_list_failure_aborts_reconcile() {
    let platform = FakePlatform::new(now());
    platform.with(|s| s.fail_issue_list = true);

    let result = run_reconcile(&platform, &config()).await;

    assert!(matches!(
        result,
        Err(policy::ComplianceError::IssueListUnavailable { .. })
    ));
}

#[tokio::test]
async fn every_open_issue_is_reconciled_and_closed() {
    let platform = FakePlatform::new(now());
    platform.with(|s| {
        s.issues = vec![
            tracking_issue(1, now() - Duration::days(70), vec![], vec![]),
            tracking_issue(2, now() - Duration::days(10), vec!["unrelated"], vec![]),
        ];
    });

    let report = run_reconcile(&platform, &config()).await.unwrap();

    assert_eq!(report.issues_processed, 2);
    let all_closed = platform.with(|s| s.issues.iter().all(|i| i.state == IssueState::Closed));
    assert!(all_closed);
}
