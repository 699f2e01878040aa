//! Compliance Evaluator and Audit-Window Filter.
//!
//! The evaluator reduces the full membership list to the logins without a
//! verified domain email. The filter then removes recently added members
//! (still inside their lookback grace window) and bot accounts, leaving the
//! set of violations the lifecycle manager acts on.
//!
//! Both functions are pure: all platform reads happen in the engine before
//! they are called.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::identifiers::Login;
use crate::types::Member;

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// A login that is non-compliant, outside its grace window, and not a bot
/// account.
///
/// Only [`filter_violations`] produces these; downstream code can therefore
/// rely on every `Violation` having passed the full policy filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Violation(Login);

impl Violation {
    /// Returns the violating login.
    pub fn login(&self) -> &Login {
        &self.0
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Compliance Evaluator
// ---------------------------------------------------------------------------

/// Returns the logins of members without any verified domain email, in
/// first-seen order.
pub fn non_compliant_logins(members: &[Member]) -> Vec<Login> {
    members
        .iter()
        .filter(|m| m.is_non_compliant())
        .map(|m| m.login.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Audit-Window Filter
// ---------------------------------------------------------------------------

/// Reduces the non-compliant set to actual violations.
///
/// A login is a violation iff it was **not** added to the organization within
/// the lookback window (`recently_added`) and does not end with the bot
/// account suffix. Output follows `non_compliant` iteration order; the caller
/// sorts before issue creation for determinism.
pub fn filter_violations(
    recently_added: &HashSet<Login>,
    non_compliant: &[Login],
    bot_suffix: &str,
) -> Vec<Violation> {
    non_compliant
        .iter()
        .filter(|login| !recently_added.contains(*login) && !login.as_str().ends_with(bot_suffix))
        .map(|login| Violation(login.clone()))
        .collect()
}
