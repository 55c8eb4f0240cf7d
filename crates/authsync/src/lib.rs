//! # authsync
//!
//! Reconciles declared IIS authentication settings against a live server.
//!
//! Each scheme (anonymous, basic, digest, windows) lives at its own address,
//! discovered through the links of an application's authentication root.
//! Desired state names only the schemes and fields the caller cares about;
//! everything else on the server is left as it is.
//!
//! ## Example
//!
//! ```no_run
//! use authsync::{Attributes, ChangeSet, DesiredSpec, Navigator, Reconciler, Scheme};
//! use iisapi::{Client, ConnectionSettings};
//!
//! let client = Client::new(&ConnectionSettings::new("https://iis.example.com:55539", "token"))
//!     .expect("invalid settings");
//! let root = Navigator::new(&client).root_for_application("ZcKP8Tn0").expect("no root");
//!
//! let desired = DesiredSpec::new().with(
//!     Scheme::Basic,
//!     Attributes::from([("realm".to_string(), "Corp".into())]),
//! );
//! let changed = ChangeSet::between(None, &desired);
//!
//! match Reconciler::new(&client).reconcile(&root, &desired, &changed) {
//!     Ok(done) => println!("{} scheme(s) updated", done.applied_count()),
//!     Err(failure) => eprintln!("stopped at {}: {}", failure.scheme, failure.source),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod diff;
pub mod engine;
pub mod error;
pub mod navigator;
pub mod provider;
pub mod scheme;
pub mod types;

pub use context::{CancelToken, NoObserver, ReconcileObserver};
pub use diff::ChangeSet;
pub use engine::{Reconciled, Reconciler, SchemePlan};
pub use error::{Error, ErrorCategory, PartialFailure, Result};
pub use navigator::{AUTHENTICATION_PATH, AuthenticationRoot, Navigator};
pub use provider::{
    AnonymousAuthentication, BasicAuthentication, DigestAuthentication, Provider, ProviderState,
    WindowsAuthentication, WindowsProvider,
};
pub use scheme::{Scheme, UnknownScheme};
pub use types::{AttributeValue, Attributes, DesiredSpec, SchemePhase, SchemeReport};
