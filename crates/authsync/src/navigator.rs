//! Hypermedia navigation from an authentication root to scheme records.
//!
//! Only the root address is constructed. Every scheme record is reached
//! through the link the root hands out, so the server is free to move them.

use crate::error::{Error, Result};
use crate::provider::ProviderState;
use crate::scheme::Scheme;
use iisapi::{Client, Links};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Address of the authentication collection.
pub const AUTHENTICATION_PATH: &str = "/api/webserver/authentication";

/// One application's authentication configuration: an id plus one link per
/// exposed scheme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticationRoot {
    /// Opaque id of the configuration.
    pub id: String,
    /// Links keyed by relation name.
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl AuthenticationRoot {
    /// Decode a root payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::decode("authentication root", e))
    }

    /// Address of a scheme's record, if the server exposes it.
    #[must_use]
    pub fn link(&self, scheme: Scheme) -> Option<&str> {
        self.links.get(scheme.link_rel()).map(|r| r.href.as_str())
    }

    /// Schemes the server exposes for this root.
    pub fn schemes(&self) -> impl Iterator<Item = Scheme> + '_ {
        Scheme::all()
            .iter()
            .copied()
            .filter(|scheme| self.link(*scheme).is_some())
    }
}

/// Resolves scheme records from an [`AuthenticationRoot`].
pub struct Navigator<'a> {
    client: &'a Client,
}

impl<'a> Navigator<'a> {
    /// Create a navigator over a client.
    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetch the authentication root with the given id.
    pub fn root(&self, id: &str) -> Result<AuthenticationRoot> {
        let body = self.client.get(&format!("{AUTHENTICATION_PATH}/{id}"))?;
        AuthenticationRoot::decode(&body)
    }

    /// Fetch the authentication root linked from a web application.
    pub fn root_for_application(&self, application_id: &str) -> Result<AuthenticationRoot> {
        let application = self.client.read_application(application_id)?;
        let address = application.link("authentication")?;
        log::debug!("application {application_id} -> {address}");
        let body = self.client.get(address)?;
        AuthenticationRoot::decode(&body)
    }

    /// Address of a scheme's record.
    ///
    /// Fails with [`Error::LinkNotFound`] without touching the network when
    /// the root has no link for the scheme.
    pub fn resolve<'r>(&self, root: &'r AuthenticationRoot, scheme: Scheme) -> Result<&'r str> {
        root.link(scheme).ok_or_else(|| Error::LinkNotFound {
            scheme,
            root: root.id.clone(),
        })
    }

    /// Fetch the current record of a scheme.
    pub fn fetch(&self, root: &AuthenticationRoot, scheme: Scheme) -> Result<ProviderState> {
        let address = self.resolve(root, scheme)?;
        let body = self.client.get(address)?;
        ProviderState::decode(scheme, &body)
    }

    /// Fetch every scheme the root exposes. Missing links are skipped.
    pub fn fetch_all(&self, root: &AuthenticationRoot) -> Result<BTreeMap<Scheme, ProviderState>> {
        root.schemes()
            .map(|scheme| Ok((scheme, self.fetch(root, scheme)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iisapi::{Method, MockTransport};
    use serde_json::json;

    fn root_json() -> serde_json::Value {
        json!({
            "id": "auth1",
            "_links": {
                "anonymous": {"href": "/api/webserver/authentication/anonymous-authentication/an1"},
                "basic": {"href": "/api/webserver/authentication/basic-authentication/ba1"}
            }
        })
    }

    fn setup() -> (MockTransport, Client) {
        let mock = MockTransport::new();
        let client = Client::with_transport(Box::new(mock.clone()));
        (mock, client)
    }

    #[test]
    fn test_root_decode_and_links() {
        let root = AuthenticationRoot::decode(root_json().to_string().as_bytes()).unwrap();
        assert_eq!(root.id, "auth1");
        assert_eq!(
            root.link(Scheme::Basic),
            Some("/api/webserver/authentication/basic-authentication/ba1")
        );
        assert_eq!(root.link(Scheme::Windows), None);
        assert_eq!(
            root.schemes().collect::<Vec<_>>(),
            vec![Scheme::Anonymous, Scheme::Basic]
        );
    }

    #[test]
    fn test_root_decode_error() {
        let err = AuthenticationRoot::decode(b"[]").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_resolve_missing_link_makes_no_request() {
        let (mock, client) = setup();
        let root = AuthenticationRoot::decode(root_json().to_string().as_bytes()).unwrap();

        let err = Navigator::new(&client)
            .resolve(&root, Scheme::Digest)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LinkNotFound {
                scheme: Scheme::Digest,
                ..
            }
        ));

        let err = Navigator::new(&client)
            .fetch(&root, Scheme::Digest)
            .unwrap_err();
        assert!(matches!(err, Error::LinkNotFound { .. }));
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_root_by_id() {
        let (mock, client) = setup();
        mock.on_json(Method::Get, "/api/webserver/authentication/auth1", &root_json());

        let root = Navigator::new(&client).root("auth1").unwrap();
        assert_eq!(root.id, "auth1");
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_root_for_application_follows_link() {
        let (mock, client) = setup();
        mock.on_json(
            Method::Get,
            "/api/webserver/webapps/app1",
            &json!({
                "id": "app1",
                "_links": {"authentication": {"href": "/api/webserver/authentication/auth1"}}
            }),
        );
        mock.on_json(Method::Get, "/api/webserver/authentication/auth1", &root_json());

        let root = Navigator::new(&client).root_for_application("app1").unwrap();
        assert_eq!(root.id, "auth1");
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn test_root_for_application_without_link() {
        let (mock, client) = setup();
        mock.on_json(Method::Get, "/api/webserver/webapps/app1", &json!({"id": "app1"}));

        let err = Navigator::new(&client).root_for_application("app1").unwrap_err();
        assert!(matches!(
            err,
            Error::Remote(iisapi::Error::MissingLink { .. })
        ));
    }

    #[test]
    fn test_fetch_uses_link_address() {
        let (mock, client) = setup();
        mock.on_json(
            Method::Get,
            "/api/webserver/authentication/basic-authentication/ba1",
            &json!({"id": "ba1", "enabled": true, "default_logon_domain": "", "realm": "x"}),
        );
        let root = AuthenticationRoot::decode(root_json().to_string().as_bytes()).unwrap();

        let state = Navigator::new(&client).fetch(&root, Scheme::Basic).unwrap();
        assert_eq!(state.id(), "ba1");
        assert_eq!(
            mock.requests()[0].address,
            "/api/webserver/authentication/basic-authentication/ba1"
        );
    }

    #[test]
    fn test_fetch_all_skips_unexposed_schemes() {
        let (mock, client) = setup();
        mock.on_json(
            Method::Get,
            "/api/webserver/authentication/anonymous-authentication/an1",
            &json!({"id": "an1", "enabled": true, "user": "IUSR"}),
        );
        mock.on_json(
            Method::Get,
            "/api/webserver/authentication/basic-authentication/ba1",
            &json!({"id": "ba1", "enabled": false}),
        );
        let root = AuthenticationRoot::decode(root_json().to_string().as_bytes()).unwrap();

        let all = Navigator::new(&client).fetch_all(&root).unwrap();
        assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec![Scheme::Anonymous, Scheme::Basic]);
        assert_eq!(mock.request_count(), 2);
    }
}
