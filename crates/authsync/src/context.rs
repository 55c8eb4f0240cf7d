//! Observer and cancellation hooks for a reconciliation pass.
//!
//! These let a front end follow progress and stop a pass without the engine
//! depending on any terminal or signal handling code.

use crate::error::Error;
use crate::provider::ProviderState;
use crate::scheme::Scheme;
use crate::types::SchemeReport;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress callback for reconciliation.
pub trait ReconcileObserver {
    /// Called before a changed scheme is fetched.
    fn on_scheme_start(&mut self, scheme: Scheme);

    /// Called when a scheme reached its final phase.
    fn on_scheme_complete(&mut self, report: &SchemeReport, state: Option<&ProviderState>);

    /// Called when a scheme failed. No further scheme is processed.
    fn on_scheme_failed(&mut self, scheme: Scheme, error: &Error);
}

/// No-op observer.
pub struct NoObserver;

impl ReconcileObserver for NoObserver {
    fn on_scheme_start(&mut self, _scheme: Scheme) {}
    fn on_scheme_complete(&mut self, _report: &SchemeReport, _state: Option<&ProviderState>) {}
    fn on_scheme_failed(&mut self, _scheme: Scheme, _error: &Error) {}
}

/// Shared flag that stops a pass before its next remote call.
///
/// A call already in flight runs to completion or to the transport timeout;
/// whatever it committed stays committed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
