//! Newtype domain identifiers.
//!
//! Every external name that has an identity is represented as a distinct
//! newtype wrapping a primitive. This prevents accidentally interchanging —
//! for example — an [`OrgName`] with a [`RepoName`] even though both are
//! `String` under the hood.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — GitHub-integer-backed
// ---------------------------------------------------------------------------

/// Identifies a tracking issue by the number assigned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueNumber(u64);

impl IssueNumber {
    /// Creates an issue number from a raw integer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// An account login as assigned by the platform.
    ///
    /// Used for both human members and automation identities; the bot-suffix
    /// convention in [`crate::evaluate::filter_violations`] tells them apart.
    Login
}

string_id! {
    /// The login of the organization being audited.
    OrgName
}

string_id! {
    /// The name of the repository that hosts compliance tracking issues
    /// (repository name only, not `owner/repo`).
    RepoName
}
