//! Remote resources managed by iisctl
//!
//! Each resource maps a manifest entry onto the server and reports what it
//! found back. Authentication is the only resource with reconciliation logic.

pub mod authentication;

pub use authentication::{AuthenticationResource, record_outcome};
