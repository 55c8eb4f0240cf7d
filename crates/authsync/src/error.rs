//! Error types for reconciliation.
//!
//! None of these are recovered from locally. A fault aborts the scheme being
//! processed and is handed to the caller, who decides whether to run the
//! whole pass again.

use crate::scheme::Scheme;
use crate::types::SchemeReport;
use crate::provider::ProviderState;
use std::collections::BTreeMap;
use std::fmt;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The server does not expose what the desired state asks for.
    Configuration,
    /// The server's payloads no longer match the records we know.
    Drift,
    /// The server rejected a request or could not be reached.
    Remote,
    /// The caller stopped the pass.
    Cancelled,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration not supported by server",
            Self::Drift => "Unexpected payload from server",
            Self::Remote => "Remote request failed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => {
                "Install the IIS feature for this scheme or remove its block from the manifest"
            }
            Self::Drift => "The IIS Administration API version may not be supported",
            Self::Remote => "Check the server response and run apply again",
            Self::Cancelled => "Run apply again to finish the remaining schemes",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while reconciling one scheme.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The authentication root has no link for the scheme.
    #[error("{scheme} authentication is not exposed by authentication root {root}")]
    LinkNotFound {
        /// Scheme that was requested.
        scheme: Scheme,
        /// Id of the authentication root that was searched.
        root: String,
    },

    /// A payload did not match the expected record.
    #[error("could not decode {resource}: {message}")]
    Decode {
        /// What was being decoded, e.g. "basic authentication".
        resource: String,
        /// Decoder message.
        message: String,
    },

    /// A merged record could not be serialized for the PATCH body.
    #[error("could not encode {resource}: {message}")]
    Encode {
        /// What was being encoded.
        resource: String,
        /// Encoder message.
        message: String,
    },

    /// A remote call failed.
    #[error(transparent)]
    Remote(#[from] iisapi::Error),

    /// A desired attribute has the wrong type.
    #[error("{scheme}.{key} must be {expected}")]
    InvalidAttribute {
        /// Scheme whose block holds the attribute.
        scheme: Scheme,
        /// Attribute key.
        key: String,
        /// Human readable expected type.
        expected: &'static str,
    },

    /// Reconciliation was cancelled before this scheme finished.
    #[error("reconciliation cancelled before {scheme} authentication was applied")]
    Cancelled {
        /// Scheme that was not applied.
        scheme: Scheme,
    },
}

impl Error {
    /// Create a decode error.
    pub fn decode(resource: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    /// Create an encode error.
    pub fn encode(resource: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Encode {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LinkNotFound { .. } | Self::InvalidAttribute { .. } => {
                ErrorCategory::Configuration
            }
            Self::Decode { .. } | Self::Encode { .. } => ErrorCategory::Drift,
            Self::Remote(_) => ErrorCategory::Remote,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Whether running the pass again might succeed without changing anything.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(err) => err.is_retryable(),
            Self::Cancelled { .. } => true,
            _ => false,
        }
    }
}

/// A reconciliation pass that stopped at a failing scheme.
///
/// Schemes applied before the failure stay applied; their post-update state
/// is carried here so the caller can record it.
#[derive(Debug, thiserror::Error)]
#[error("{scheme} authentication: {source}")]
pub struct PartialFailure {
    /// Post-update state of every scheme committed before the failure.
    pub applied: BTreeMap<Scheme, ProviderState>,
    /// Phase reached by every scheme that was looked at.
    pub report: Vec<SchemeReport>,
    /// Scheme that failed.
    pub scheme: Scheme,
    /// Why it failed.
    #[source]
    pub source: Error,
}

impl PartialFailure {
    /// Whether anything was committed before the failure.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.applied.is_empty()
    }
}
