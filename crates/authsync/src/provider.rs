//! Authentication provider records and their flat attribute mappings.
//!
//! Each scheme has a record mirroring the server's payload. Members the
//! record does not model are kept in `extra` and written back untouched, so a
//! PATCH never drops a field the server expects. HAL members (`_links`,
//! `_embedded`) are dropped on decode; they are read-only.
//!
//! The flat attribute mapping is what desired state is compared against:
//!
//! | scheme    | keys                                       |
//! |-----------|--------------------------------------------|
//! | anonymous | `enabled`, `user`                          |
//! | basic     | `enabled`, `default_domain`, `realm`       |
//! | digest    | `enabled`, `realm`                         |
//! | windows   | `enabled`, `providers` (+ `available`)     |

use crate::error::{Error, Result};
use crate::scheme::Scheme;
use crate::types::{AttributeValue, Attributes};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Capability shared by every provider record.
pub trait Provider: Sized + Clone + PartialEq + Serialize + DeserializeOwned {
    /// Scheme this record belongs to.
    const SCHEME: Scheme;

    /// Attribute keys that can be set from desired state.
    const KEYS: &'static [&'static str];

    /// Attribute keys reported by [`Provider::to_attributes`] but never written.
    const READ_ONLY: &'static [&'static str] = &[];

    /// Remote identity; preserved verbatim on update.
    fn id(&self) -> &str;

    /// Whether the scheme is turned on.
    fn enabled(&self) -> bool;

    /// Flat view of the record.
    fn to_attributes(&self) -> Attributes;

    /// A copy of `self` with every key present in `desired` overlaid.
    ///
    /// Keys absent from `desired` keep their current value. Unknown keys are
    /// logged and ignored; a value of the wrong type is an error.
    fn apply_attributes(&self, desired: &Attributes) -> Result<Self>;

    /// Decode a server payload, dropping HAL members.
    fn decode(bytes: &[u8]) -> Result<Self> {
        let resource = format!("{} authentication", Self::SCHEME);
        let mut value: Value =
            serde_json::from_slice(bytes).map_err(|e| Error::decode(&resource, e))?;
        if let Some(object) = value.as_object_mut() {
            object.retain(|key, _| !key.starts_with('_'));
        }
        serde_json::from_value(value).map_err(|e| Error::decode(&resource, e))
    }

    /// Encode the full record for a PATCH.
    fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::encode(format!("{} authentication", Self::SCHEME), e))
    }
}

/// Reads a missing or `null` string member as empty.
fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Attribute readers
// =============================================================================

fn warn_unknown_keys<P: Provider>(desired: &Attributes) {
    for key in desired.keys() {
        if P::READ_ONLY.contains(&key.as_str()) {
            log::warn!("{}.{key} is read-only, ignoring", P::SCHEME);
        } else if !P::KEYS.contains(&key.as_str()) {
            log::warn!("{}.{key} is not a known attribute, ignoring", P::SCHEME);
        }
    }
}

fn read_bool(scheme: Scheme, desired: &Attributes, key: &str) -> Result<Option<bool>> {
    desired
        .get(key)
        .map(|value| {
            value.as_bool().ok_or_else(|| Error::InvalidAttribute {
                scheme,
                key: key.to_string(),
                expected: "a boolean",
            })
        })
        .transpose()
}

fn read_text(scheme: Scheme, desired: &Attributes, key: &str) -> Result<Option<String>> {
    desired
        .get(key)
        .map(|value| {
            value
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidAttribute {
                    scheme,
                    key: key.to_string(),
                    expected: "a string",
                })
        })
        .transpose()
}

fn read_list(scheme: Scheme, desired: &Attributes, key: &str) -> Result<Option<Vec<String>>> {
    desired
        .get(key)
        .map(|value| {
            value
                .as_list()
                .map(<[String]>::to_vec)
                .ok_or_else(|| Error::InvalidAttribute {
                    scheme,
                    key: key.to_string(),
                    expected: "a list of strings",
                })
        })
        .transpose()
}

// =============================================================================
// Anonymous
// =============================================================================

/// Anonymous authentication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousAuthentication {
    /// Remote identity.
    pub id: String,
    /// Whether anonymous access is allowed.
    pub enabled: bool,
    /// Account anonymous requests run as; empty means the pool identity.
    #[serde(default, deserialize_with = "nullable_string")]
    pub user: String,
    /// Members not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Provider for AnonymousAuthentication {
    const SCHEME: Scheme = Scheme::Anonymous;
    const KEYS: &'static [&'static str] = &["enabled", "user"];

    fn id(&self) -> &str {
        &self.id
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::from([
            ("enabled".to_string(), self.enabled.into()),
            ("user".to_string(), self.user.clone().into()),
        ])
    }

    fn apply_attributes(&self, desired: &Attributes) -> Result<Self> {
        warn_unknown_keys::<Self>(desired);
        let mut next = self.clone();
        if let Some(enabled) = read_bool(Self::SCHEME, desired, "enabled")? {
            next.enabled = enabled;
        }
        if let Some(user) = read_text(Self::SCHEME, desired, "user")? {
            next.user = user;
        }
        Ok(next)
    }
}

// =============================================================================
// Basic
// =============================================================================

/// Basic authentication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicAuthentication {
    /// Remote identity.
    pub id: String,
    /// Whether basic authentication is allowed.
    pub enabled: bool,
    /// Domain used when the user name carries none.
    #[serde(default, deserialize_with = "nullable_string")]
    pub default_logon_domain: String,
    /// Realm sent in the challenge.
    #[serde(default, deserialize_with = "nullable_string")]
    pub realm: String,
    /// Members not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Provider for BasicAuthentication {
    const SCHEME: Scheme = Scheme::Basic;
    const KEYS: &'static [&'static str] = &["enabled", "default_domain", "realm"];

    fn id(&self) -> &str {
        &self.id
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::from([
            ("enabled".to_string(), self.enabled.into()),
            (
                "default_domain".to_string(),
                self.default_logon_domain.clone().into(),
            ),
            ("realm".to_string(), self.realm.clone().into()),
        ])
    }

    fn apply_attributes(&self, desired: &Attributes) -> Result<Self> {
        warn_unknown_keys::<Self>(desired);
        let mut next = self.clone();
        if let Some(enabled) = read_bool(Self::SCHEME, desired, "enabled")? {
            next.enabled = enabled;
        }
        if let Some(domain) = read_text(Self::SCHEME, desired, "default_domain")? {
            next.default_logon_domain = domain;
        }
        if let Some(realm) = read_text(Self::SCHEME, desired, "realm")? {
            next.realm = realm;
        }
        Ok(next)
    }
}

// =============================================================================
// Digest
// =============================================================================

/// Digest authentication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestAuthentication {
    /// Remote identity.
    pub id: String,
    /// Whether digest authentication is allowed.
    pub enabled: bool,
    /// Realm sent in the challenge.
    #[serde(default, deserialize_with = "nullable_string")]
    pub realm: String,
    /// Members not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Provider for DigestAuthentication {
    const SCHEME: Scheme = Scheme::Digest;
    const KEYS: &'static [&'static str] = &["enabled", "realm"];

    fn id(&self) -> &str {
        &self.id
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::from([
            ("enabled".to_string(), self.enabled.into()),
            ("realm".to_string(), self.realm.clone().into()),
        ])
    }

    fn apply_attributes(&self, desired: &Attributes) -> Result<Self> {
        warn_unknown_keys::<Self>(desired);
        let mut next = self.clone();
        if let Some(enabled) = read_bool(Self::SCHEME, desired, "enabled")? {
            next.enabled = enabled;
        }
        if let Some(realm) = read_text(Self::SCHEME, desired, "realm")? {
            next.realm = realm;
        }
        Ok(next)
    }
}

// =============================================================================
// Windows
// =============================================================================

/// One negotiation package under Windows authentication (Negotiate, NTLM).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowsProvider {
    /// Package name as the server spells it.
    pub name: String,
    /// Whether the package is offered.
    pub enabled: bool,
    /// Members not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WindowsProvider {
    /// Create a sub-provider.
    #[must_use]
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
            extra: Map::new(),
        }
    }
}

/// Windows authentication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowsAuthentication {
    /// Remote identity.
    pub id: String,
    /// Whether Windows authentication is allowed.
    pub enabled: bool,
    /// Sub-providers, in server order.
    #[serde(default)]
    pub providers: Vec<WindowsProvider>,
    /// Members not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WindowsAuthentication {
    /// Names of the enabled sub-providers, in server order.
    #[must_use]
    pub fn enabled_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.clone())
            .collect()
    }
}

impl Provider for WindowsAuthentication {
    const SCHEME: Scheme = Scheme::Windows;
    const KEYS: &'static [&'static str] = &["enabled", "providers"];
    const READ_ONLY: &'static [&'static str] = &["available"];

    fn id(&self) -> &str {
        &self.id
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn to_attributes(&self) -> Attributes {
        let available: Vec<String> = self.providers.iter().map(|p| p.name.clone()).collect();
        Attributes::from([
            ("enabled".to_string(), self.enabled.into()),
            ("providers".to_string(), self.enabled_providers().into()),
            ("available".to_string(), AttributeValue::List(available)),
        ])
    }

    /// `providers` replaces membership: a sub-provider is enabled exactly when
    /// its name matches (ignoring ASCII case) an entry in the desired list.
    fn apply_attributes(&self, desired: &Attributes) -> Result<Self> {
        warn_unknown_keys::<Self>(desired);
        let mut next = self.clone();
        if let Some(enabled) = read_bool(Self::SCHEME, desired, "enabled")? {
            next.enabled = enabled;
        }
        if let Some(wanted) = read_list(Self::SCHEME, desired, "providers")? {
            for name in &wanted {
                if !next.providers.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
                    log::warn!("windows provider '{name}' is not installed on the server, ignoring");
                }
            }
            for provider in &mut next.providers {
                provider.enabled = wanted.iter().any(|w| w.eq_ignore_ascii_case(&provider.name));
            }
        }
        Ok(next)
    }
}

// =============================================================================
// Tagged union
// =============================================================================

/// Current settings of one scheme, whatever the scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderState {
    /// Anonymous authentication.
    Anonymous(AnonymousAuthentication),
    /// Basic authentication.
    Basic(BasicAuthentication),
    /// Digest authentication.
    Digest(DigestAuthentication),
    /// Windows authentication.
    Windows(WindowsAuthentication),
}

impl ProviderState {
    /// Decode a payload as the record for `scheme`.
    pub fn decode(scheme: Scheme, bytes: &[u8]) -> Result<Self> {
        Ok(match scheme {
            Scheme::Anonymous => Self::Anonymous(AnonymousAuthentication::decode(bytes)?),
            Scheme::Basic => Self::Basic(BasicAuthentication::decode(bytes)?),
            Scheme::Digest => Self::Digest(DigestAuthentication::decode(bytes)?),
            Scheme::Windows => Self::Windows(WindowsAuthentication::decode(bytes)?),
        })
    }

    /// Scheme of the record.
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Anonymous(_) => Scheme::Anonymous,
            Self::Basic(_) => Scheme::Basic,
            Self::Digest(_) => Scheme::Digest,
            Self::Windows(_) => Scheme::Windows,
        }
    }

    /// Remote identity.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Anonymous(p) => p.id(),
            Self::Basic(p) => p.id(),
            Self::Digest(p) => p.id(),
            Self::Windows(p) => p.id(),
        }
    }

    /// Whether the scheme is turned on.
    #[must_use]
    pub fn enabled(&self) -> bool {
        match self {
            Self::Anonymous(p) => p.enabled(),
            Self::Basic(p) => p.enabled(),
            Self::Digest(p) => p.enabled(),
            Self::Windows(p) => p.enabled(),
        }
    }

    /// Flat view of the record.
    #[must_use]
    pub fn to_attributes(&self) -> Attributes {
        match self {
            Self::Anonymous(p) => p.to_attributes(),
            Self::Basic(p) => p.to_attributes(),
            Self::Digest(p) => p.to_attributes(),
            Self::Windows(p) => p.to_attributes(),
        }
    }

    /// Overlay desired attributes; see [`Provider::apply_attributes`].
    pub fn apply_attributes(&self, desired: &Attributes) -> Result<Self> {
        Ok(match self {
            Self::Anonymous(p) => Self::Anonymous(p.apply_attributes(desired)?),
            Self::Basic(p) => Self::Basic(p.apply_attributes(desired)?),
            Self::Digest(p) => Self::Digest(p.apply_attributes(desired)?),
            Self::Windows(p) => Self::Windows(p.apply_attributes(desired)?),
        })
    }

    /// Encode the full record for a PATCH.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Anonymous(p) => p.encode(),
            Self::Basic(p) => p.encode(),
            Self::Digest(p) => p.encode(),
            Self::Windows(p) => p.encode(),
        }
    }

    /// Keys whose value differs between `self` and `other`.
    #[must_use]
    pub fn changed_keys(&self, other: &Self) -> Vec<String> {
        let before = self.to_attributes();
        let after = other.to_attributes();
        after
            .iter()
            .filter(|(key, value)| before.get(*key) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn basic() -> BasicAuthentication {
        BasicAuthentication::decode(
            json!({
                "id": "b1",
                "enabled": false,
                "default_logon_domain": "CONTOSO",
                "realm": "",
                "metadata": {"is_local": true, "is_locked": false},
                "_links": {"self": {"href": "/x"}}
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap()
    }

    fn windows() -> WindowsAuthentication {
        WindowsAuthentication {
            id: "w1".to_string(),
            enabled: true,
            providers: vec![
                WindowsProvider::new("A", true),
                WindowsProvider::new("B", false),
                WindowsProvider::new("C", true),
            ],
            extra: Map::new(),
        }
    }

    #[test]
    fn test_decode_drops_hal_members_and_keeps_extras() {
        let record = basic();
        assert_eq!(record.id, "b1");
        assert!(!record.extra.contains_key("_links"));
        assert_eq!(record.extra["metadata"], json!({"is_local": true, "is_locked": false}));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = DigestAuthentication::decode(b"{\"enabled\": true}").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.to_string().contains("digest authentication"));

        let err = DigestAuthentication::decode(b"not json").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_encode_carries_id_and_extras() {
        let record = basic();
        let encoded: Value = serde_json::from_slice(&record.encode().unwrap()).unwrap();
        assert_eq!(encoded["id"], "b1");
        assert_eq!(encoded["default_logon_domain"], "CONTOSO");
        assert_eq!(encoded["metadata"]["is_local"], true);
        assert!(encoded.get("_links").is_none());
    }

    #[test]
    fn test_basic_attributes_use_default_domain_key() {
        let attributes = basic().to_attributes();
        assert_eq!(attributes["default_domain"], AttributeValue::from("CONTOSO"));
        assert_eq!(attributes["enabled"], AttributeValue::from(false));
        assert_eq!(attributes.len(), 3);
    }

    #[test]
    fn test_apply_preserves_unnamed_fields() {
        let current = basic();
        let merged = current
            .apply_attributes(&attrs(&[("realm", "Corp".into())]))
            .unwrap();

        assert_eq!(merged.realm, "Corp");
        assert_eq!(merged.id, current.id);
        assert_eq!(merged.enabled, current.enabled);
        assert_eq!(merged.default_logon_domain, current.default_logon_domain);
        assert_eq!(merged.extra, current.extra);
    }

    #[test]
    fn test_apply_enabled_keeps_digest_realm_and_extras() {
        let current = DigestAuthentication::decode(
            json!({"id": "d1", "enabled": false, "realm": "Corp", "metadata": {"is_local": true}})
                .to_string()
                .as_bytes(),
        )
        .unwrap();
        let merged = current
            .apply_attributes(&attrs(&[("enabled", true.into())]))
            .unwrap();

        assert!(merged.enabled);
        assert_eq!(merged.id, "d1");
        assert_eq!(merged.realm, "Corp");
        assert_eq!(merged.extra, current.extra);
    }

    #[test]
    fn test_apply_enabled_keeps_anonymous_user() {
        let current = AnonymousAuthentication::decode(
            json!({"id": "a1", "enabled": true, "user": "IUSR", "password": ""})
                .to_string()
                .as_bytes(),
        )
        .unwrap();
        let merged = current
            .apply_attributes(&attrs(&[("enabled", false.into())]))
            .unwrap();

        assert!(!merged.enabled);
        assert_eq!(merged.user, "IUSR");
        assert_eq!(merged.extra["password"], "");
    }

    #[test]
    fn test_decode_null_strings_as_empty() {
        let anonymous =
            AnonymousAuthentication::decode(br#"{"id": "a1", "enabled": true, "user": null}"#)
                .unwrap();
        assert_eq!(anonymous.user, "");

        let basic = BasicAuthentication::decode(
            br#"{"id": "b1", "enabled": false, "default_logon_domain": null, "realm": null}"#,
        )
        .unwrap();
        assert_eq!(basic.default_logon_domain, "");
        assert_eq!(basic.realm, "");

        let digest = DigestAuthentication::decode(br#"{"id": "d1", "enabled": true}"#).unwrap();
        assert_eq!(digest.realm, "");
    }

    #[test]
    fn test_apply_empty_block_is_identity() {
        let current = windows();
        assert_eq!(current.apply_attributes(&Attributes::new()).unwrap(), current);
    }

    #[test]
    fn test_apply_rejects_wrong_type() {
        let err = basic()
            .apply_attributes(&attrs(&[("enabled", "yes".into())]))
            .unwrap_err();
        match err {
            Error::InvalidAttribute {
                scheme,
                key,
                expected,
            } => {
                assert_eq!(scheme, Scheme::Basic);
                assert_eq!(key, "enabled");
                assert_eq!(expected, "a boolean");
            }
            other => panic!("Expected InvalidAttribute, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_ignores_unknown_keys() {
        let current = basic();
        let merged = current
            .apply_attributes(&attrs(&[("colour", "blue".into())]))
            .unwrap();
        assert_eq!(merged, current);
    }

    #[test]
    fn test_windows_membership_replaces() {
        let merged = windows()
            .apply_attributes(&attrs(&[("providers", vec!["b"].into())]))
            .unwrap();

        let flags: Vec<(&str, bool)> = merged
            .providers
            .iter()
            .map(|p| (p.name.as_str(), p.enabled))
            .collect();
        assert_eq!(flags, vec![("A", false), ("B", true), ("C", false)]);
        assert!(merged.enabled);
    }

    #[test]
    fn test_windows_empty_list_disables_all() {
        let merged = windows()
            .apply_attributes(&attrs(&[("providers", AttributeValue::List(Vec::new()))]))
            .unwrap();
        assert!(merged.providers.iter().all(|p| !p.enabled));
    }

    #[test]
    fn test_windows_without_providers_key_keeps_sub_providers() {
        let current = windows();
        let merged = current
            .apply_attributes(&attrs(&[("enabled", false.into())]))
            .unwrap();
        assert!(!merged.enabled);
        assert_eq!(merged.providers, current.providers);
    }

    #[test]
    fn test_windows_attributes_are_lossless() {
        let attributes = windows().to_attributes();
        assert_eq!(attributes["providers"], AttributeValue::from(vec!["A", "C"]));
        assert_eq!(attributes["available"], AttributeValue::from(vec!["A", "B", "C"]));
    }

    #[test]
    fn test_windows_available_is_read_only() {
        let current = windows();
        let merged = current
            .apply_attributes(&attrs(&[("available", vec!["Z"].into())]))
            .unwrap();
        assert_eq!(merged, current);
    }

    #[test]
    fn test_provider_state_dispatch() {
        let payload = json!({"id": "a1", "enabled": true, "user": "IUSR"}).to_string();
        let state = ProviderState::decode(Scheme::Anonymous, payload.as_bytes()).unwrap();
        assert_eq!(state.scheme(), Scheme::Anonymous);
        assert_eq!(state.id(), "a1");
        assert!(state.enabled());

        let merged = state
            .apply_attributes(&attrs(&[("user", "".into())]))
            .unwrap();
        assert_eq!(state.changed_keys(&merged), vec!["user".to_string()]);
        assert!(state.changed_keys(&state).is_empty());
    }

    #[test]
    fn test_provider_state_encode_is_the_bare_record() {
        let state = ProviderState::Digest(DigestAuthentication {
            id: "d1".to_string(),
            enabled: true,
            realm: "Corp".to_string(),
            extra: Map::new(),
        });
        let encoded: Value = serde_json::from_slice(&state.encode().unwrap()).unwrap();
        assert_eq!(encoded, json!({"id": "d1", "enabled": true, "realm": "Corp"}));
    }
}
