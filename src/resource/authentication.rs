//! Authentication resource lifecycle (create, read, update, delete).
//!
//! Wires manifest entries and recorded state into the reconciler and folds
//! the results back into [`IisctlState`].

use crate::state::IisctlState;
use authsync::{
    AuthenticationRoot, ChangeSet, DesiredSpec, Navigator, PartialFailure,
    ProviderState, ReconcileObserver, Reconciled, Reconciler, Scheme, SchemePlan,
};
use iisapi::Client;
use std::collections::BTreeMap;

/// Result of a create or update
#[derive(Debug)]
pub struct ApplyOutcome {
    /// Authentication root the schemes hang off
    pub root_id: String,
    /// Reconciliation result; a failure still carries what was committed
    pub result: Result<Reconciled, PartialFailure>,
}

impl ApplyOutcome {
    /// Schemes that went through (applied or already in sync) with their
    /// observed state
    pub fn committed(&self) -> &BTreeMap<Scheme, ProviderState> {
        match &self.result {
            Ok(done) => &done.states,
            Err(failure) => &failure.applied,
        }
    }
}

/// Current remote settings of one authentication root
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticationStatus {
    /// Root id
    pub root_id: String,
    /// Every scheme; `None` when the server exposes no link for it
    pub schemes: BTreeMap<Scheme, Option<ProviderState>>,
}

/// The authentication settings of web applications on one server
pub struct AuthenticationResource<'a> {
    client: &'a Client,
}

impl<'a> AuthenticationResource<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// First apply for an application: resolve its root, reconcile every
    /// declared scheme.
    pub fn create(
        &self,
        application_id: &str,
        desired: &DesiredSpec,
        observer: &mut dyn ReconcileObserver,
    ) -> authsync::Result<ApplyOutcome> {
        let root = Navigator::new(self.client).root_for_application(application_id)?;
        log::debug!("Application {application_id} has authentication root {}", root.id);
        Ok(self.reconcile(root, desired, &ChangeSet::all_declared(desired), observer))
    }

    /// Read every scheme of a root. Schemes without a link are absent.
    pub fn read(&self, root_id: &str) -> authsync::Result<AuthenticationStatus> {
        let navigator = Navigator::new(self.client);
        let root = navigator.root(root_id)?;
        self.read_root(&navigator, &root)
    }

    /// Read every scheme of an application's root
    pub fn read_application(&self, application_id: &str) -> authsync::Result<AuthenticationStatus> {
        let navigator = Navigator::new(self.client);
        let root = navigator.root_for_application(application_id)?;
        self.read_root(&navigator, &root)
    }

    fn read_root(
        &self,
        navigator: &Navigator<'_>,
        root: &AuthenticationRoot,
    ) -> authsync::Result<AuthenticationStatus> {
        let mut fetched = navigator.fetch_all(root)?;
        let schemes = Scheme::all()
            .iter()
            .map(|scheme| (*scheme, fetched.remove(scheme)))
            .collect();
        Ok(AuthenticationStatus {
            root_id: root.id.clone(),
            schemes,
        })
    }

    /// Later applies: re-fetch the root and reconcile the changed schemes
    pub fn update(
        &self,
        root_id: &str,
        desired: &DesiredSpec,
        changed: &ChangeSet,
        observer: &mut dyn ReconcileObserver,
    ) -> authsync::Result<ApplyOutcome> {
        let root = Navigator::new(self.client).root(root_id)?;
        Ok(self.reconcile(root, desired, changed, observer))
    }

    /// What an apply would send, without sending it
    pub fn plan(
        &self,
        application_id: &str,
        root_id: Option<&str>,
        desired: &DesiredSpec,
        changed: &ChangeSet,
    ) -> authsync::Result<Vec<SchemePlan>> {
        let navigator = Navigator::new(self.client);
        let root = match root_id {
            Some(id) => navigator.root(id)?,
            None => navigator.root_for_application(application_id)?,
        };
        Reconciler::new(self.client).plan(&root, desired, changed)
    }

    /// Authentication cannot be removed from an application; forgetting the
    /// record is all there is to do.
    pub fn delete(state: &mut IisctlState, application_id: &str) -> bool {
        state.forget(application_id)
    }

    fn reconcile(
        &self,
        root: AuthenticationRoot,
        desired: &DesiredSpec,
        changed: &ChangeSet,
        observer: &mut dyn ReconcileObserver,
    ) -> ApplyOutcome {
        let result = Reconciler::new(self.client).reconcile_with(&root, desired, changed, observer);
        ApplyOutcome {
            root_id: root.id,
            result,
        }
    }
}

/// Fold an apply outcome into the change-tracking record
pub fn record_outcome(
    state: &mut IisctlState,
    application_id: &str,
    desired: &DesiredSpec,
    outcome: &ApplyOutcome,
) {
    state.record_root(application_id, &outcome.root_id);
    for (scheme, observed) in outcome.committed() {
        if let Some(block) = desired.get(*scheme) {
            state.record_applied(application_id, *scheme, block, observed);
        }
    }
    let error = outcome.result.as_ref().err().map(ToString::to_string);
    state.record_error(application_id, error);
}
