//! Change-tracking state.
//!
//! Remembers, per application, the desired block last applied for each scheme
//! and what the server reported back. The next `apply` diffs the manifest
//! against this record to decide which schemes to reconcile.

use anyhow::{Context, Result};
use authsync::{Attributes, ChangeSet, DesiredSpec, ProviderState, Scheme};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Everything iisctl remembers between runs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IisctlState {
    /// Per application id
    #[serde(default)]
    pub applications: BTreeMap<String, ApplicationState>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

/// What was last applied to one application
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ApplicationState {
    /// Authentication root id resolved from the application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_id: Option<String>,

    /// Desired block last applied, keyed by scheme name
    #[serde(default)]
    pub desired: BTreeMap<String, Attributes>,

    /// Attributes the server reported after the last apply, keyed by scheme name
    #[serde(default)]
    pub observed: BTreeMap<String, Attributes>,

    /// Last time any scheme was applied successfully
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_applied: Option<DateTime<Utc>>,

    /// Error of the last failed apply, cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ApplicationState {
    /// The recorded desired blocks as a desired spec.
    ///
    /// Entries for unknown schemes (hand edits) are ignored.
    pub fn desired_spec(&self) -> DesiredSpec {
        self.desired
            .iter()
            .filter_map(|(name, block)| match name.parse::<Scheme>() {
                Ok(scheme) => Some((scheme, block.clone())),
                Err(e) => {
                    log::warn!("Ignoring recorded block: {e}");
                    None
                }
            })
            .collect()
    }
}

// ============================================================================
// IisctlState Implementation
// ============================================================================

impl IisctlState {
    /// Default state file path
    pub fn state_file() -> Result<PathBuf> {
        Ok(crate::paths::state_dir()?.join("state.toml"))
    }

    /// Load state from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::state_file()?)
    }

    /// Load state from disk, or return default if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to the default location
    pub fn save(&mut self) -> Result<()> {
        self.save_to(&Self::state_file()?)
    }

    /// Stamp and write state to disk
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    // ========================================================================
    // Change Tracking
    // ========================================================================

    /// Recorded state of an application
    pub fn application(&self, id: &str) -> Option<&ApplicationState> {
        self.applications.get(id)
    }

    /// Get or create application state
    pub fn application_mut(&mut self, id: &str) -> &mut ApplicationState {
        self.applications.entry(id.to_string()).or_default()
    }

    /// Schemes of `desired` that differ from what was last applied
    pub fn changes(&self, id: &str, desired: &DesiredSpec) -> ChangeSet {
        let previous = self.application(id).map(ApplicationState::desired_spec);
        ChangeSet::between(previous.as_ref(), desired)
    }

    /// Remember the authentication root of an application
    pub fn record_root(&mut self, id: &str, root_id: &str) {
        self.application_mut(id).root_id = Some(root_id.to_string());
    }

    /// Remember that a scheme's block went through successfully
    pub fn record_applied(
        &mut self,
        id: &str,
        scheme: Scheme,
        block: &Attributes,
        observed: &ProviderState,
    ) {
        let app = self.application_mut(id);
        app.desired.insert(scheme.to_string(), block.clone());
        app.observed
            .insert(scheme.to_string(), observed.to_attributes());
        app.last_applied = Some(Utc::now());
    }

    /// Stop tracking schemes the manifest no longer declares
    ///
    /// Declaring the block again later counts as a change.
    pub fn prune_undeclared(&mut self, id: &str, desired: &DesiredSpec) {
        if let Some(app) = self.applications.get_mut(id) {
            let before = app.desired.len();
            app.desired.retain(|name, _| {
                name.parse::<Scheme>()
                    .is_ok_and(|scheme| desired.contains(scheme))
            });
            app.observed.retain(|name, _| {
                name.parse::<Scheme>()
                    .is_ok_and(|scheme| desired.contains(scheme))
            });
            if app.desired.len() < before {
                log::info!("Stopped tracking {} scheme(s) for {id}", before - app.desired.len());
            }
        }
    }

    /// Record an apply error, or clear it with `None`
    pub fn record_error(&mut self, id: &str, error: Option<String>) {
        self.application_mut(id).last_error = error;
    }

    /// Forget an application entirely
    pub fn forget(&mut self, id: &str) -> bool {
        self.applications.remove(id).is_some()
    }
}

impl Default for IisctlState {
    fn default() -> Self {
        Self {
            applications: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
