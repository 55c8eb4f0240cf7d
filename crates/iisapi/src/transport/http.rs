//! Blocking HTTP transport.
//!
//! Every request carries the bearer token and asks for HAL JSON. Non-2xx
//! responses are read like any other response so their body can be reported
//! verbatim in [`Error::RemoteFault`].

use crate::error::{Error, Result};
use crate::transport::{Method, Transport};
use crate::types::ConnectionSettings;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

/// Media type requested from the API.
pub const HAL_JSON: &str = "application/hal+json";

/// Maximum response size (API records are small; anything bigger is wrong).
const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

/// Transport backed by a `ureq` agent.
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
    authorization: String,
}

impl HttpTransport {
    /// Create a transport from connection settings.
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        settings.validate()?;

        let mut config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(settings.timeout));
        if settings.insecure {
            log::warn!("TLS certificate verification is disabled for {}", settings.host);
            config = config.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }

        Ok(Self {
            agent: Agent::new_with_config(config.build()),
            base_url: settings.host.trim_end_matches('/').to_string(),
            authorization: format!("Bearer {}", settings.access_key),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an address (link href or absolute path) to a full URL.
    ///
    /// Absolute URLs are passed through untouched.
    #[must_use]
    pub fn url(&self, address: &str) -> String {
        if address.starts_with("http://") || address.starts_with("https://") {
            return address.to_string();
        }
        if address.starts_with('/') {
            format!("{}{}", self.base_url, address)
        } else {
            format!("{}/{}", self.base_url, address)
        }
    }

    fn without_body(&self, request: RequestBuilder<WithoutBody>) -> RequestBuilder<WithoutBody> {
        request
            .header("Accept", HAL_JSON)
            .header("Authorization", self.authorization.as_str())
    }

    fn with_body(&self, request: RequestBuilder<WithBody>) -> RequestBuilder<WithBody> {
        request
            .header("Accept", HAL_JSON)
            .header("Content-Type", "application/json")
            .header("Authorization", self.authorization.as_str())
    }
}

impl Transport for HttpTransport {
    fn send(&self, method: Method, address: &str, body: Option<&[u8]>) -> Result<Vec<u8>> {
        let url = self.url(address);
        log::debug!("{method} {url}");

        let payload = body.unwrap_or_default();
        let response = match method {
            Method::Get => self.without_body(self.agent.get(url.as_str())).call(),
            Method::Delete => self.without_body(self.agent.delete(url.as_str())).call(),
            Method::Post => self.with_body(self.agent.post(url.as_str())).send(payload),
            Method::Patch => self.with_body(self.agent.patch(url.as_str())).send(payload),
        };

        let mut response = response.map_err(|e| Error::Transport {
            method,
            address: address.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| Error::Transport {
                method,
                address: address.to_string(),
                message: e.to_string(),
            })?;

        log::trace!("{method} {url} -> {status} ({} bytes)", bytes.len());

        if !(200..300).contains(&status) {
            return Err(Error::remote(
                method,
                address,
                status,
                String::from_utf8_lossy(&bytes),
            ));
        }

        Ok(bytes)
    }
}
