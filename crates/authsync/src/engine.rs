//! Reconciliation engine.
//!
//! For each scheme, in [`Scheme::ALL`] order:
//!
//! 1. No desired block: `Skipped`, nothing is sent.
//! 2. Not in the change set: `Unchanged`, nothing is sent.
//! 3. Resolve the link, GET the current record (`Fetched`).
//! 4. Overlay the desired block (`Merged`). If that changes nothing the
//!    scheme stops here.
//! 5. PATCH the complete merged record to the same link and keep the server's
//!    answer as the observed state (`Applied`).
//!
//! The first failure stops the pass. Schemes applied before it stay applied
//! and are handed back in the [`PartialFailure`].

use crate::context::{CancelToken, NoObserver, ReconcileObserver};
use crate::error::{Error, PartialFailure, Result};
use crate::navigator::{AuthenticationRoot, Navigator};
use crate::provider::ProviderState;
use crate::scheme::Scheme;
use crate::types::{Attributes, DesiredSpec, SchemePhase, SchemeReport};
use crate::diff::ChangeSet;
use iisapi::Client;
use std::collections::BTreeMap;

/// Outcome of a pass that finished every scheme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Observed state of every scheme that was fetched.
    pub states: BTreeMap<Scheme, ProviderState>,
    /// Final phase of every scheme.
    pub report: Vec<SchemeReport>,
}

impl Reconciled {
    /// Number of schemes written to the server.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.report.iter().filter(|r| r.phase.wrote()).count()
    }
}

/// What applying a scheme would do, without doing it.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemePlan {
    /// The scheme.
    pub scheme: Scheme,
    /// State fetched from the server.
    pub current: ProviderState,
    /// State that would be sent.
    pub merged: ProviderState,
    /// Attribute keys that would change.
    pub changed_keys: Vec<String>,
}

impl SchemePlan {
    /// Whether applying would write anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.current != self.merged
    }
}

/// Reconciles desired authentication settings against one server.
pub struct Reconciler<'a> {
    client: &'a Client,
    cancel: CancelToken,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over a client.
    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            cancel: CancelToken::new(),
        }
    }

    /// Builder-style: stop the pass when `token` is cancelled.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Reconcile every scheme in `changed` that has a block in `desired`.
    pub fn reconcile(
        &self,
        root: &AuthenticationRoot,
        desired: &DesiredSpec,
        changed: &ChangeSet,
    ) -> std::result::Result<Reconciled, PartialFailure> {
        self.reconcile_with(root, desired, changed, &mut NoObserver)
    }

    /// Like [`Reconciler::reconcile`], reporting progress to `observer`.
    pub fn reconcile_with(
        &self,
        root: &AuthenticationRoot,
        desired: &DesiredSpec,
        changed: &ChangeSet,
        observer: &mut dyn ReconcileObserver,
    ) -> std::result::Result<Reconciled, PartialFailure> {
        let navigator = Navigator::new(self.client);
        let mut result = Reconciled::default();

        for &scheme in Scheme::all() {
            let Some(block) = desired.get(scheme) else {
                log::debug!("{scheme}: no desired block, skipping");
                result.report.push(SchemeReport::new(scheme, SchemePhase::Skipped));
                continue;
            };
            if !changed.contains(scheme) {
                log::info!("{scheme}: no change recorded, leaving as is");
                result.report.push(SchemeReport::new(scheme, SchemePhase::Unchanged));
                continue;
            }

            observer.on_scheme_start(scheme);
            let mut report = SchemeReport::new(scheme, SchemePhase::Unchanged);
            match self.reconcile_scheme(&navigator, root, scheme, block, &mut report) {
                Ok(state) => {
                    observer.on_scheme_complete(&report, Some(&state));
                    result.states.insert(scheme, state);
                    result.report.push(report);
                }
                Err(source) => {
                    log::debug!("{scheme}: failed in phase {:?}: {source}", report.phase);
                    observer.on_scheme_failed(scheme, &source);
                    result.report.push(report);
                    return Err(PartialFailure {
                        applied: result.states,
                        report: result.report,
                        scheme,
                        source,
                    });
                }
            }
        }

        Ok(result)
    }

    /// Run one scheme through fetch, merge and update.
    ///
    /// `report` tracks the phase reached, including on failure.
    pub fn reconcile_scheme(
        &self,
        navigator: &Navigator<'_>,
        root: &AuthenticationRoot,
        scheme: Scheme,
        block: &Attributes,
        report: &mut SchemeReport,
    ) -> Result<ProviderState> {
        self.check_cancelled(scheme)?;
        let address = navigator.resolve(root, scheme)?;

        let current = ProviderState::decode(scheme, &self.client.get(address)?)?;
        report.phase = SchemePhase::Fetched;
        log::debug!("{scheme}: fetched {address}");

        let merged = current.apply_attributes(block)?;
        report.phase = SchemePhase::Merged;
        report.changed_keys = current.changed_keys(&merged);

        if merged == current {
            log::debug!("{scheme}: already in sync");
            return Ok(current);
        }

        self.check_cancelled(scheme)?;
        log::debug!("{scheme}: updating {}", report.changed_keys.join(", "));
        let response = self.client.patch(address, &merged.encode()?)?;
        let observed = if response.is_empty() {
            // Some servers answer 204; read back what landed.
            ProviderState::decode(scheme, &self.client.get(address)?)?
        } else {
            ProviderState::decode(scheme, &response)?
        };
        report.phase = SchemePhase::Applied;

        if observed != merged {
            log::warn!("{scheme}: server stored a different value than requested");
        }
        Ok(observed)
    }

    /// Fetch and merge every changed scheme without writing anything.
    pub fn plan(
        &self,
        root: &AuthenticationRoot,
        desired: &DesiredSpec,
        changed: &ChangeSet,
    ) -> Result<Vec<SchemePlan>> {
        let navigator = Navigator::new(self.client);
        let mut plans = Vec::new();

        for (scheme, block) in desired.iter() {
            if !changed.contains(scheme) {
                continue;
            }
            self.check_cancelled(scheme)?;
            let current = navigator.fetch(root, scheme)?;
            let merged = current.apply_attributes(block)?;
            plans.push(SchemePlan {
                scheme,
                changed_keys: current.changed_keys(&merged),
                current,
                merged,
            });
        }

        Ok(plans)
    }

    fn check_cancelled(&self, scheme: Scheme) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled { scheme });
        }
        Ok(())
    }
}
