//! # iisapi
//!
//! Blocking client for the Microsoft IIS Administration REST API.
//!
//! This crate provides:
//! - A [`Transport`] abstraction over GET/POST/PATCH/DELETE with a real HTTP
//!   implementation and an in-memory mock for tests
//! - A [`Client`] with typed JSON helpers
//! - Records shared across resources (applications, HAL links)
//!
//! Any response outside the 2xx range becomes [`Error::RemoteFault`] with the
//! method, address, status and body of the failed request. Nothing is retried.
//!
//! ## Example
//!
//! ```no_run
//! use iisapi::{Client, ConnectionSettings};
//!
//! let settings = ConnectionSettings::new("https://iis.example.com:55539", "token");
//! let client = Client::new(&settings).expect("invalid settings");
//!
//! let app = client.read_application("ZcKP8Tn0").expect("request failed");
//! println!("{} -> {}", app.location, app.physical_path);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod transport;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use transport::{Method, MockTransport, RecordedRequest, Transport};
pub use types::{Application, ApplicationReference, ConnectionSettings, Links, ResourceReference};

use serde::Serialize;
use serde::de::DeserializeOwned;
use transport::http::HttpTransport;

/// Address of the web applications collection.
pub const WEBAPPS_PATH: &str = "/api/webserver/webapps";

/// High-level client for the IIS Administration API.
pub struct Client {
    transport: Box<dyn Transport>,
}

impl Client {
    /// Create a client talking HTTP to the configured host.
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        Ok(Self {
            transport: Box::new(HttpTransport::new(settings)?),
        })
    }

    /// Create a client with a custom transport (useful for testing).
    #[must_use]
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    // =========================================================================
    // Raw Operations
    // =========================================================================

    /// `GET address`, returning the raw body.
    pub fn get(&self, address: &str) -> Result<Vec<u8>> {
        self.transport.get(address)
    }

    /// `PATCH address` with an already encoded body, returning the raw body.
    pub fn patch(&self, address: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.transport.patch(address, body)
    }

    /// `DELETE address`.
    pub fn delete(&self, address: &str) -> Result<()> {
        self.transport.delete(address)
    }

    // =========================================================================
    // Typed Operations
    // =========================================================================

    /// `GET address` and decode the JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, address: &str) -> Result<T> {
        let body = self.get(address)?;
        serde_json::from_slice(&body).map_err(|e| Error::decode(address, e))
    }

    /// `PATCH address` with a JSON record and decode the JSON response.
    pub fn patch_json<B: Serialize, T: DeserializeOwned>(&self, address: &str, record: &B) -> Result<T> {
        let body = serde_json::to_vec(record)?;
        let response = self.patch(address, &body)?;
        serde_json::from_slice(&response).map_err(|e| Error::decode(address, e))
    }

    /// `POST address` with a JSON record and decode the JSON response.
    pub fn post_json<B: Serialize, T: DeserializeOwned>(&self, address: &str, record: &B) -> Result<T> {
        let body = serde_json::to_vec(record)?;
        let response = self.transport.post(address, &body)?;
        serde_json::from_slice(&response).map_err(|e| Error::decode(address, e))
    }

    // =========================================================================
    // Applications
    // =========================================================================

    /// Read a web application by id.
    pub fn read_application(&self, id: &str) -> Result<Application> {
        self.get_json(&format!("{WEBAPPS_PATH}/{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        id: String,
        enabled: bool,
    }

    fn client_with(mock: &MockTransport) -> Client {
        Client::with_transport(Box::new(mock.clone()))
    }

    #[test]
    fn test_client_creation_validates_settings() {
        assert!(Client::new(&ConnectionSettings::new("https://iis.example.com", "k")).is_ok());
        assert!(Client::new(&ConnectionSettings::new("", "k")).is_err());
    }

    #[test]
    fn test_get_json() {
        let mock = MockTransport::new();
        mock.on_json(Method::Get, "/r/1", &json!({"id": "1", "enabled": true}));
        let client = client_with(&mock);

        let record: Record = client.get_json("/r/1").unwrap();
        assert_eq!(
            record,
            Record {
                id: "1".to_string(),
                enabled: true
            }
        );
    }

    #[test]
    fn test_get_json_decode_error() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/r/1", 200, "<html>");
        let client = client_with(&mock);

        let err = client.get_json::<Record>("/r/1").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_patch_json_sends_full_record() {
        let mock = MockTransport::new();
        let client = client_with(&mock);
        let record = Record {
            id: "1".to_string(),
            enabled: false,
        };

        let echoed: Record = client.patch_json("/r/1", &record).unwrap();
        assert_eq!(echoed, record);

        let patches = mock.requests_with(Method::Patch);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].json(), Some(json!({"id": "1", "enabled": false})));
    }

    #[test]
    fn test_post_json() {
        let mock = MockTransport::new();
        mock.on_json(Method::Post, "/r", &json!({"id": "new", "enabled": true}));
        let client = client_with(&mock);

        let created: Record = client
            .post_json("/r", &json!({"enabled": true}))
            .unwrap();
        assert_eq!(created.id, "new");
    }

    #[test]
    fn test_remote_fault_propagates() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/api/webserver/webapps/nope", 404, r#"{"title":"Not found"}"#);
        let client = client_with(&mock);

        let err = client.read_application("nope").unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_read_application() {
        let mock = MockTransport::new();
        mock.on_json(
            Method::Get,
            "/api/webserver/webapps/app1",
            &json!({
                "id": "app1",
                "path": "/shop",
                "_links": {"authentication": {"href": "/api/webserver/authentication/auth1"}}
            }),
        );
        let client = client_with(&mock);

        let app = client.read_application("app1").unwrap();
        assert_eq!(app.path, "/shop");
        assert_eq!(
            app.link("authentication").unwrap(),
            "/api/webserver/authentication/auth1"
        );
    }

    #[test]
    fn test_delete() {
        let mock = MockTransport::new();
        mock.on(Method::Delete, "/r/1", 204, "");
        let client = client_with(&mock);
        assert!(client.delete("/r/1").is_ok());
    }
}
