//! Compliance run orchestration.
//!
//! This crate sequences the two runs the bot supports: the notify/audit run
//! (audit log → membership → violations → per-user issue lifecycle) and the
//! reconcile run (open issues → exemption-vs-removal → close). It drives the
//! [`policy::Platform`] port and owns the per-entity failure domains: a
//! failure acting on one user or issue is logged and never aborts the rest
//! of the run.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Runs sequence calls between the pure decisions
//! in the [`policy`] crate and the platform port. They contain no policy
//! rules of their own.

pub mod notify;
pub mod reconcile;
pub mod template;

pub use notify::{collect_violations, run_notify, AuditOutcome, NotifyReport};
pub use reconcile::{run_reconcile, ReconcileReport};
pub use template::render_message;

use policy::{Labels, OrgName, PolicyConfig, RepoName};

/// Everything one run needs to know: where to act and under which policy.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Organization being audited.
    pub org: OrgName,

    /// Repository hosting the tracking issues.
    pub repo: RepoName,

    /// Label names the policy recognizes.
    pub labels: Labels,

    /// Window thresholds and naming conventions.
    pub policy: PolicyConfig,

    /// Issue body template; supports `{{ org }}`, `{{ repo }}`, `{{ user }}`.
    pub message_template: String,
}
