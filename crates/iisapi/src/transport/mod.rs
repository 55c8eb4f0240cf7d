//! Transport trait and implementations for reaching the API.
//!
//! The [`Transport`] trait moves raw bodies to and from an address; it knows
//! nothing about the records involved. [`http::HttpTransport`] talks to a real
//! server, [`MockTransport`] keeps everything in memory.
//!
//! # Testing
//!
//! Use [`MockTransport`] for testing without network access:
//!
//! ```
//! use iisapi::transport::{Method, MockTransport, Transport};
//!
//! let mock = MockTransport::new();
//! mock.on(Method::Get, "/api/webserver/authentication/a1", 200, r#"{"id":"a1"}"#);
//!
//! let body = mock.get("/api/webserver/authentication/a1").unwrap();
//! assert_eq!(body, br#"{"id":"a1"}"#.to_vec());
//! assert_eq!(mock.request_count(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// HTTP methods used against the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read a resource.
    Get,
    /// Create a resource.
    Post,
    /// Partially update a resource.
    Patch,
    /// Remove a resource.
    Delete,
}

impl Method {
    /// Upper-case method name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moves request and response bodies between this process and the API.
///
/// Implementations must return [`Error::RemoteFault`] for any response whose
/// status is outside the 2xx range, carrying the body verbatim. They must not
/// retry on their own.
pub trait Transport: Send + Sync {
    /// Send a request and return the response body.
    fn send(&self, method: Method, address: &str, body: Option<&[u8]>) -> Result<Vec<u8>>;

    /// `GET address`.
    fn get(&self, address: &str) -> Result<Vec<u8>> {
        self.send(Method::Get, address, None)
    }

    /// `POST address` with a JSON body.
    fn post(&self, address: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.send(Method::Post, address, Some(body))
    }

    /// `PATCH address` with a JSON body.
    fn patch(&self, address: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.send(Method::Patch, address, Some(body))
    }

    /// `DELETE address`.
    fn delete(&self, address: &str) -> Result<()> {
        self.send(Method::Delete, address, None).map(|_| ())
    }
}

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Method used.
    pub method: Method,
    /// Address requested.
    pub address: String,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    /// Request body parsed as JSON, if there is one.
    #[must_use]
    pub fn json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

#[derive(Debug, Clone)]
struct CannedResponse {
    status: u16,
    body: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<(Method, String), CannedResponse>,
    requests: Vec<RecordedRequest>,
}

/// In-memory transport for tests.
///
/// Responses are registered per `(method, address)`. A `PATCH` without a
/// registered response behaves like a cooperative server: the request body is
/// stored as the new `GET` response for that address and echoed back.
/// Unregistered requests answer `404`.
///
/// Clones share state, so a test can hand one clone to a client and inspect
/// the recorded requests through another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a canned response.
    pub fn on(&self, method: Method, address: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.state().routes.insert(
            (method, address.to_string()),
            CannedResponse {
                status,
                body: body.into(),
            },
        );
    }

    /// Register a `200` JSON response.
    pub fn on_json(&self, method: Method, address: &str, body: &serde_json::Value) {
        self.on(method, address, 200, body.to_string());
    }

    /// All requests seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// Number of requests seen so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Requests made with a given method.
    #[must_use]
    pub fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Forget recorded requests, keeping routes.
    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }
}

impl Transport for MockTransport {
    fn send(&self, method: Method, address: &str, body: Option<&[u8]>) -> Result<Vec<u8>> {
        let mut state = self.state();
        state.requests.push(RecordedRequest {
            method,
            address: address.to_string(),
            body: body.map(<[u8]>::to_vec),
        });

        if let Some(canned) = state.routes.get(&(method, address.to_string())).cloned() {
            if (200..300).contains(&canned.status) {
                return Ok(canned.body);
            }
            return Err(Error::remote(
                method,
                address,
                canned.status,
                String::from_utf8_lossy(&canned.body),
            ));
        }

        if method == Method::Patch
            && let Some(body) = body
        {
            state.routes.insert(
                (Method::Get, address.to_string()),
                CannedResponse {
                    status: 200,
                    body: body.to_vec(),
                },
            );
            return Ok(body.to_vec());
        }

        Err(Error::remote(method, address, 404, "Not Found"))
    }
}
