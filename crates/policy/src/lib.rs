//! Compliance policy domain for the organization email-compliance bot.
//!
//! This crate contains every domain concept, newtype identifier, entity type,
//! pure decision function, and cross-cutting error type used throughout the
//! bot. Infrastructure crates implement the [`Platform`] port defined here;
//! they never add policy rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* facts are needed and *what* action follows from them; the
//! `github` adapter defines *how* to supply the facts, and the `engine` crate
//! sequences the two.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype domain identifiers (`Login`, `OrgName`, etc.) |
//! | [`types`] | Entities mirrored from the platform (`Member`, `TrackingIssue`, etc.) |
//! | [`config`] | Label names, window thresholds, stale-issue policy |
//! | [`evaluate`] | Compliance Evaluator and Audit-Window Filter |
//! | [`lifecycle`] | Tracking-issue lifecycle decision |
//! | [`reconcile`] | Exemption-vs-removal reconciliation decision |
//! | [`platform`] | The `Platform` port trait and issue listing filter |
//! | [`errors`] | Platform and run error types with retry classification |

pub mod config;
pub mod errors;
pub mod evaluate;
pub mod identifiers;
pub mod lifecycle;
pub mod platform;
pub mod reconcile;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{Labels, PolicyConfig, StaleIssuePolicy};
pub use errors::{ComplianceError, PlatformError, RetryPolicy};
pub use evaluate::{filter_violations, non_compliant_logins, Violation};
pub use identifiers::{IssueNumber, Login, OrgName, RepoName};
pub use lifecycle::{issue_action, IssueAction};
pub use platform::{IssueFilter, Platform, StateFilter};
pub use reconcile::{exemption_validated, reconcile_outcome, requests_exemption, ReconcileOutcome};
pub use types::{AuditEntry, IssueEvent, IssueState, Member, TrackingIssue};
