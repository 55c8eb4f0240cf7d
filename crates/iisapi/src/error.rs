//! Error types for IIS Administration API operations.
//!
//! Every failed request is surfaced with enough context (method, address,
//! status, body) to diagnose it without re-running the request. Errors are
//! categorized so callers can decide whether a whole pass is worth retrying.

use crate::transport::Method;
use std::fmt;

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors for retry decisions and user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, TLS or timeout problems (transient).
    Network,
    /// The server rejected the access key.
    Unauthorized,
    /// The addressed resource does not exist.
    NotFound,
    /// The server answered with a payload we could not understand.
    Format,
    /// Any other non-success status.
    Server,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Unauthorized => "Access key rejected",
            Self::NotFound => "Resource not found",
            Self::Format => "Unexpected response format",
            Self::Server => "Server rejected the request",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the IIS Administration service is reachable and try again",
            Self::Unauthorized => "Generate a new access token in the IIS Administration portal",
            Self::NotFound => "Verify the application id and that the feature is installed",
            Self::Format => "The server API version may not be supported",
            Self::Server => "Check the response body for the server's explanation",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the IIS Administration API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a status outside the 2xx range.
    #[error("{method} {address} returned HTTP {status}: {body}")]
    RemoteFault {
        /// HTTP method of the failed request.
        method: Method,
        /// Address the request was sent to.
        address: String,
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The request never produced a response.
    #[error("{method} {address} failed: {message}")]
    Transport {
        /// HTTP method of the failed request.
        method: Method,
        /// Address the request was sent to.
        address: String,
        /// Error message from the HTTP stack.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("invalid response from {address}: {message}")]
    Decode {
        /// Address the body came from.
        address: String,
        /// Decoder message.
        message: String,
    },

    /// A request body could not be encoded.
    #[error("could not encode request body: {0}")]
    Encode(String),

    /// A resource lacks a hypermedia link the caller needs.
    #[error("{resource} has no '{rel}' link")]
    MissingLink {
        /// Description of the resource, e.g. "application abc".
        resource: String,
        /// Link relation that was expected.
        rel: String,
    },

    /// Invalid connection settings.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a remote fault from a response.
    pub fn remote(
        method: Method,
        address: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::RemoteFault {
            method,
            address: address.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a decode error for a body fetched from `address`.
    pub fn decode(address: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            address: address.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status of a remote fault, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteFault { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error category for retry decisions.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RemoteFault { status, .. } => match status {
                401 | 403 => ErrorCategory::Unauthorized,
                404 => ErrorCategory::NotFound,
                502..=504 => ErrorCategory::Network,
                _ => ErrorCategory::Server,
            },
            Self::Transport { .. } => ErrorCategory::Network,
            Self::Decode { .. } | Self::Encode(_) => ErrorCategory::Format,
            Self::MissingLink { .. } => ErrorCategory::NotFound,
            Self::Config(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
