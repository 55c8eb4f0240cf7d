//! Connection settings and the desired-state manifest.

use anyhow::{Context, Result, bail};
use authsync::{Attributes, DesiredSpec, Scheme};
use iisapi::ConnectionSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Manifest file looked up in the working directory by default
pub const DEFAULT_MANIFEST: &str = "iis.toml";

// ============================================================================
// Settings
// ============================================================================

/// Contents of `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the IIS Administration API
    #[serde(default)]
    pub host: Option<String>,

    /// Access token
    #[serde(default)]
    pub access_key: Option<String>,

    /// Skip TLS certificate verification (the API ships a self-signed cert)
    #[serde(default)]
    pub insecure: bool,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    iisapi::types::DEFAULT_TIMEOUT.as_secs()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: None,
            access_key: None,
            insecure: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load `config.toml` from the config directory
    pub fn load() -> Result<Self> {
        Self::load_from(&crate::paths::config_dir()?.join("config.toml"))
    }

    /// Load settings from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Build connection settings, letting flags/env win over the file
    pub fn connection(
        &self,
        host: Option<&str>,
        access_key: Option<&str>,
    ) -> Result<ConnectionSettings> {
        let Some(host) = host.or(self.host.as_deref()) else {
            bail!("No IIS host configured. Pass --host, set IIS_HOST or add `host` to config.toml");
        };
        let Some(access_key) = access_key.or(self.access_key.as_deref()) else {
            bail!(
                "No access key configured. Pass --access-key, set IIS_ACCESS_KEY or add `access_key` to config.toml"
            );
        };

        let settings = ConnectionSettings::new(host, access_key)
            .insecure(self.insecure)
            .timeout(Duration::from_secs(self.timeout_secs));
        settings.validate()?;
        Ok(settings)
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Desired authentication settings for a set of applications
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Manifest {
    /// One entry per application
    #[serde(default)]
    pub authentication: Vec<AuthenticationEntry>,
}

/// Desired authentication settings of one application
///
/// ```toml
/// [[authentication]]
/// application = "ZcKP8Tn0"
///
/// [authentication.basic]
/// enabled = true
/// realm = "Corp"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthenticationEntry {
    /// Web application id
    pub application: String,

    /// One table per scheme
    #[serde(flatten)]
    pub blocks: BTreeMap<String, Attributes>,
}

impl AuthenticationEntry {
    /// The entry's blocks as a desired spec
    ///
    /// Scheme names are case-insensitive, so `basic` and `Basic` in one entry
    /// are the same block declared twice.
    pub fn desired(&self) -> Result<DesiredSpec> {
        let mut desired = DesiredSpec::new();
        for (name, block) in &self.blocks {
            let scheme: Scheme = name
                .parse()
                .with_context(|| format!("In entry for application {}", self.application))?;
            if desired.contains(scheme) {
                bail!(
                    "Scheme {scheme} is declared more than once in entry for application {}",
                    self.application
                );
            }
            desired.set(scheme, block.clone());
        }
        Ok(desired)
    }
}

impl Manifest {
    /// Load and validate a manifest
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        log::debug!(
            "Loaded {} application(s) from {}",
            manifest.authentication.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.authentication {
            if entry.application.trim().is_empty() {
                bail!("Entry with an empty application id");
            }
            if !seen.insert(entry.application.as_str()) {
                bail!("Application {} is declared more than once", entry.application);
            }
            entry.desired()?;
        }
        Ok(())
    }

    /// Entries, optionally narrowed to one application
    pub fn entries(&self, application: Option<&str>) -> Result<Vec<&AuthenticationEntry>> {
        let entries: Vec<_> = self
            .authentication
            .iter()
            .filter(|e| application.is_none_or(|id| e.application == id))
            .collect();
        if let Some(id) = application
            && entries.is_empty()
        {
            bail!("Application {id} is not in the manifest");
        }
        Ok(entries)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use authsync::AttributeValue;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[[authentication]]
application = "app1"

[authentication.basic]
enabled = true
realm = "Corp"

[authentication.windows]
providers = ["Negotiate", "NTLM"]

[[authentication]]
application = "app2"

[authentication.anonymous]
"#;

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn test_settings_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "host = \"https://iis.example.com:55539\"\naccess_key = \"k\"\ninsecure = true\ntimeout_secs = 5\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        let connection = settings.connection(None, None).unwrap();
        assert_eq!(connection.host, "https://iis.example.com:55539");
        assert!(connection.insecure);
        assert_eq!(connection.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_settings_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_flags_override_file() {
        let settings = Settings {
            host: Some("https://file.example.com".to_string()),
            access_key: Some("file-key".to_string()),
            ..Settings::default()
        };
        let connection = settings
            .connection(Some("https://flag.example.com"), None)
            .unwrap();
        assert_eq!(connection.host, "https://flag.example.com");
        assert_eq!(connection.access_key, "file-key");
    }

    #[test]
    fn test_connection_requires_host_and_key() {
        let settings = Settings::default();
        let err = settings.connection(None, Some("k")).unwrap_err();
        assert!(err.to_string().contains("No IIS host"));

        let err = settings
            .connection(Some("https://iis.example.com"), None)
            .unwrap_err();
        assert!(err.to_string().contains("No access key"));

        assert!(settings.connection(Some("iis.example.com"), Some("k")).is_err());
    }

    #[test]
    fn test_manifest_parse() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.authentication.len(), 2);

        let app1 = manifest.authentication[0].desired().unwrap();
        assert_eq!(
            app1.get(Scheme::Basic).unwrap()["realm"],
            AttributeValue::from("Corp")
        );
        assert_eq!(
            app1.get(Scheme::Windows).unwrap()["providers"],
            AttributeValue::from(vec!["Negotiate", "NTLM"])
        );
        assert!(!app1.contains(Scheme::Digest));

        // An empty table still declares the scheme.
        let app2 = manifest.authentication[1].desired().unwrap();
        assert!(app2.get(Scheme::Anonymous).is_some_and(Attributes::is_empty));
    }

    #[test]
    fn test_manifest_rejects_unknown_scheme() {
        let err = Manifest::parse(
            "[[authentication]]\napplication = \"app1\"\n[authentication.kerberos]\nenabled = true\n",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("kerberos"));
    }

    #[test]
    fn test_manifest_rejects_duplicate_application() {
        let err = Manifest::parse(
            "[[authentication]]\napplication = \"app1\"\n[[authentication]]\napplication = \"app1\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_manifest_rejects_case_variant_duplicate_scheme() {
        let err = Manifest::parse(
            "[[authentication]]\napplication = \"app1\"\n[authentication.Basic]\nrealm = \"A\"\n[authentication.basic]\nrealm = \"B\"\n",
        )
        .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("basic is declared more than once"));
        assert!(message.contains("app1"));
    }

    #[test]
    fn test_manifest_entries_filter() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.entries(None).unwrap().len(), 2);
        assert_eq!(manifest.entries(Some("app2")).unwrap()[0].application, "app2");
        assert!(manifest.entries(Some("nope")).is_err());
    }

    #[test]
    fn test_manifest_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(Manifest::load(&dir.path().join(DEFAULT_MANIFEST)).is_err());
    }
}
