//! Error and retry-policy types for the compliance domain.
//!
//! [`ComplianceError`] covers conditions that abort a whole run. Per-entity
//! failures stay [`PlatformError`]s: they are logged at the user or issue
//! they occurred on and the run continues.
//!
//! [`RetryPolicy`] is a cross-cutting concern: the platform adapter classifies
//! its own errors so the retry layer can decide whether to re-issue a request
//! without the policy code ever seeing a rate limit.

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by [`PlatformError::retry_policy`] so the client's bounded retry
/// loop can honor the platform's `retry-after` signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying
    /// (derived from `Retry-After` or rate-limit reset response headers).
    /// `None` means the caller applies its own back-off schedule.
    Retryable { after: Option<Duration> },

    /// The operation must not be retried; the failure surfaces to the caller.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Platform errors
// ---------------------------------------------------------------------------

/// Failure of a single platform operation.
///
/// Produced by the `github` adapter; rate-limit and abuse-detection variants
/// are consumed by its own retry loop and only surface after the bounded
/// retry budget is exhausted.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform rejected the request because the primary rate limit
    /// quota is exhausted.
    #[error("rate limit exhausted (retry after {retry_after:?})")]
    RateLimited {
        /// Server-suggested delay before retrying, if one was given.
        retry_after: Option<Duration>,
    },

    /// The platform's abuse-detection (secondary rate limit) machinery
    /// rejected the request.
    #[error("abuse detection triggered (retry after {retry_after:?})")]
    AbuseDetected {
        /// Server-suggested delay before retrying, if one was given.
        retry_after: Option<Duration>,
    },

    /// The platform returned a non-success status outside the rate-limit
    /// taxonomy.
    #[error("platform returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// A response was received but could not be mapped into the typed
    /// entities — a required field was missing or malformed.
    #[error("failed to decode {context}: {message}")]
    Decode {
        /// What was being decoded (endpoint or entity name).
        context: String,
        /// Underlying decode failure.
        message: String,
    },

    /// The request never produced a response (connection, TLS, DNS).
    #[error("transport failure: {0}")]
    Transport(String),
}

impl PlatformError {
    /// Classifies this error for the bounded retry loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::RateLimited { retry_after } | Self::AbuseDetected { retry_after } => {
                RetryPolicy::Retryable {
                    after: *retry_after,
                }
            }
            Self::Api { .. } | Self::Decode { .. } | Self::Transport(_) => {
                RetryPolicy::NonRetryable
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a whole compliance run.
///
/// Distinct from per-entity [`PlatformError`]s: failing to retrieve the
/// audit log, the membership list, or the issue listing leaves the run with
/// nothing sound to act on, so it terminates with a non-zero exit.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// The organization audit log could not be retrieved.
    #[error("failed to retrieve audit log: {source}")]
    AuditLogUnavailable {
        /// The platform failure that caused this.
        #[source]
        source: PlatformError,
    },

    /// The organization membership list could not be retrieved.
    #[error("failed to retrieve organization members: {source}")]
    MembershipUnavailable {
        /// The platform failure that caused this.
        #[source]
        source: PlatformError,
    },

    /// The repository issue listing could not be retrieved.
    #[error("failed to retrieve issues: {source}")]
    IssueListUnavailable {
        /// The platform failure that caused this.
        #[source]
        source: PlatformError,
    },

    /// The run configuration is invalid.
    ///
    /// Produced at startup; a run never starts with an invalid configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}
