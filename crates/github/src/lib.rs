//! GitHub infrastructure adapter.
//!
//! Implements the [`policy::Platform`] port over the GitHub REST and GraphQL
//! APIs using `reqwest`: cursor/Link-header pagination, boundary mapping of
//! dynamic API responses into the typed entities (failing fast on missing
//! required fields), and bounded retry on rate-limit and abuse-detection
//! responses.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain policy rules.
//! All GitHub API details (rate limiting, pagination, authentication) are
//! handled here; the [`policy`] and `engine` crates never see them.

mod client;
mod retry;
mod wire;

pub use client::GithubClient;
pub use retry::{JitterSource, NoJitter, RandomJitter, RetryConfig};
