//! Core types for the IIS Administration API.
//!
//! This module contains connection settings and the remote records that are
//! not specific to a single authentication scheme: hypermedia links and the
//! web application that owns an authentication configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default timeout for a single request, end to end.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the API lives and how to authenticate against it.
///
/// # Example
///
/// ```
/// use iisapi::ConnectionSettings;
/// use std::time::Duration;
///
/// let settings = ConnectionSettings::new("https://iis.example.com:55539", "token")
///     .insecure(true)
///     .timeout(Duration::from_secs(10));
///
/// assert!(settings.insecure);
/// assert_eq!(settings.timeout, Duration::from_secs(10));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Base URL of the API, e.g. `https://iis.example.com:55539`.
    pub host: String,
    /// Access token created in the IIS Administration portal.
    pub access_key: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Global timeout per request.
    pub timeout: Duration,
}

impl ConnectionSettings {
    /// Create settings with the default timeout and TLS verification on.
    #[must_use]
    pub fn new(host: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            access_key: access_key.into(),
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Enable or disable TLS certificate verification skipping.
    #[must_use]
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that the settings can produce a working transport.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if !self.host.starts_with("http://") && !self.host.starts_with("https://") {
            return Err(Error::Config(format!(
                "host must start with http:// or https:// (got '{}')",
                self.host
            )));
        }
        if self.access_key.trim().is_empty() {
            return Err(Error::Config("access key must not be empty".to_string()));
        }
        Ok(())
    }
}

// The access key must never end up in logs.
impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("access_key", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A HAL link: an address handed out by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    /// Opaque address of the linked resource.
    pub href: String,
}

impl ResourceReference {
    /// Create a link to `href`.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

/// The `_links` object of a HAL resource, keyed by relation name.
pub type Links = BTreeMap<String, ResourceReference>;

/// Summary of a related resource embedded in an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationReference {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Opaque id.
    #[serde(default)]
    pub id: String,
    /// Run state, e.g. "started".
    #[serde(default)]
    pub status: String,
}

/// A web application (`/api/webserver/webapps/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Opaque id.
    pub id: String,
    /// Virtual path below the website, e.g. `/shop`.
    #[serde(default)]
    pub path: String,
    /// Website name plus path.
    #[serde(default)]
    pub location: String,
    /// Directory served by the application.
    #[serde(default)]
    pub physical_path: String,
    /// Comma separated protocols, e.g. "http".
    #[serde(default)]
    pub enabled_protocols: String,
    /// Owning website.
    #[serde(default)]
    pub website: ApplicationReference,
    /// Application pool the application runs in.
    #[serde(default)]
    pub application_pool: ApplicationReference,
    /// Hypermedia links to sub-resources.
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl Application {
    /// Look up a link by relation name.
    pub fn link(&self, rel: &str) -> Result<&str> {
        self.links
            .get(rel)
            .map(|r| r.href.as_str())
            .ok_or_else(|| Error::MissingLink {
                resource: format!("application {}", self.id),
                rel: rel.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_settings_defaults() {
        let settings = ConnectionSettings::new("https://iis.example.com", "k");
        assert!(!settings.insecure);
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_connection_settings_validation() {
        assert!(ConnectionSettings::new("", "k").validate().is_err());
        assert!(ConnectionSettings::new("iis.example.com", "k").validate().is_err());
        assert!(
            ConnectionSettings::new("https://iis.example.com", " ")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_connection_settings_debug_redacts_key() {
        let settings = ConnectionSettings::new("https://iis.example.com", "super-secret");
        let debug = format!("{settings:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_application_deserialize() {
        let json = r#"{
            "name": "shop",
            "path": "/shop",
            "id": "ZcKP8Tn0",
            "location": "Default Web Site/shop",
            "physical_path": "C:\\inetpub\\shop",
            "enabled_protocols": "http",
            "website": {"name": "Default Web Site", "id": "c3Bc", "status": "started"},
            "application_pool": {"name": "shop", "id": "aBc", "status": "started"},
            "_links": {
                "authentication": {"href": "/api/webserver/authentication/ZcKP8Tn0"},
                "webserver": {"href": "/api/webserver"}
            }
        }"#;

        let app: Application = serde_json::from_str(json).unwrap();
        assert_eq!(app.id, "ZcKP8Tn0");
        assert_eq!(app.website.name, "Default Web Site");
        assert_eq!(
            app.link("authentication").unwrap(),
            "/api/webserver/authentication/ZcKP8Tn0"
        );
    }

    #[test]
    fn test_application_missing_link() {
        let app: Application = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        let err = app.link("authentication").unwrap_err();
        assert!(matches!(err, Error::MissingLink { .. }));
    }
}
