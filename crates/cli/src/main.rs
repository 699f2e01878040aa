//! Compliance bot entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse arguments** — mode, organization, repository, window thresholds,
//!    message template, and the API token (flag or `GITHUB_TOKEN`).
//! 2. **Wire observability** — configure `tracing-subscriber` with an env
//!    filter (`RUST_LOG`, default `info`). All `tracing` events emitted by
//!    every crate in the workspace flow through this layer.
//! 3. **Construct infrastructure** — build the [`github::GithubClient`] with
//!    its retry configuration and hand it to the engine as the platform port.
//! 4. **Dispatch the mode** — audit reports the violation count and stops;
//!    notify additionally reconciles per-user tracking issues; reconcile
//!    processes every open issue.
//!
//! Exit codes: `0` on success (including audit mode after reporting counts),
//! `1` when mandatory upstream data could not be retrieved or the
//! configuration is invalid.

use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use engine::{collect_violations, run_notify, run_reconcile, RunConfig};
use github::{GithubClient, RetryConfig};
use policy::{ComplianceError, Labels, OrgName, PolicyConfig, RepoName, StaleIssuePolicy};

const DEFAULT_MESSAGE: &str = "@{{ user }}: the {{ org }} organization requires every member to \
have a verified domain email address. Please add one to your account, or request an exemption \
on this issue. Unresolved issues are reconciled after the grace period.";

/// Which compliance run to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Report violations and open/reconcile per-user tracking issues.
    Notify,
    /// Report the violation count only; no writes.
    Audit,
    /// Process every open tracking issue: exemption or removal, then close.
    Reconcile,
}

#[derive(Debug, Parser)]
#[command(name = "org-compliance")]
#[command(version)]
#[command(about = "Audits organization members for verified domain emails", long_about = None)]
struct Args {
    /// Action to perform.
    #[arg(long, value_enum)]
    mode: Mode,

    /// Organization to audit.
    #[arg(long)]
    org: String,

    /// Repository (name only) that hosts the tracking issues.
    #[arg(long)]
    repo: String,

    /// Audit-log lookback window in days; members added within it are exempt.
    #[arg(long, default_value_t = 30)]
    days: i64,

    /// Days after which an existing tracking issue is superseded.
    #[arg(long, default_value_t = 60)]
    staleness_days: i64,

    /// Issue body template; supports {{ org }}, {{ repo }} and {{ user }}.
    #[arg(long, default_value = DEFAULT_MESSAGE)]
    message: String,

    /// Close a stale tracking issue before creating its replacement.
    #[arg(long)]
    close_stale_issues: bool,

    /// API token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,
}

fn config_error(message: &str) -> ComplianceError {
    ComplianceError::Configuration {
        message: message.to_string(),
    }
}

impl Args {
    fn run_config(&self) -> Result<RunConfig, ComplianceError> {
        if self.days <= 0 || self.staleness_days <= 0 {
            return Err(config_error("--days and --staleness-days must be positive"));
        }
        Ok(RunConfig {
            org: OrgName::new(&self.org).ok_or_else(|| config_error("--org must not be empty"))?,
            repo: RepoName::new(&self.repo)
                .ok_or_else(|| config_error("--repo must not be empty"))?,
            labels: Labels::default(),
            policy: PolicyConfig {
                lookback_days: self.days,
                staleness_days: self.staleness_days,
                stale_issue_policy: if self.close_stale_issues {
                    StaleIssuePolicy::CloseThenCreate
                } else {
                    StaleIssuePolicy::CreateOnly
                },
                ..PolicyConfig::default()
            },
            message_template: self.message.clone(),
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(Args::parse()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    debug!(mode = ?args.mode, "starting run");
    let config = args.run_config()?;
    let client = GithubClient::new(args.token, RetryConfig::default())?;
    let now = Utc::now();

    match args.mode {
        Mode::Audit => {
            let outcome = collect_violations(&client, &config, now).await?;
            println!("Found {} violations", outcome.violations.len());
        }
        Mode::Notify => {
            let report = run_notify(&client, &config, now).await?;
            println!(
                "Found {} violations: {} issues created, {} closed, {} skipped, {} failures",
                report.violations,
                report.issues_created,
                report.issues_closed,
                report.skipped,
                report.failures
            );
        }
        Mode::Reconcile => {
            let report = run_reconcile(&client, &config).await?;
            println!(
                "Reconciled {} issues: {} exemptions granted, {} members removed, {} failures",
                report.issues_processed,
                report.exemptions_granted,
                report.members_removed,
                report.failures
            );
        }
    }
    Ok(())
}
