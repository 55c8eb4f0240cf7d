//! Change tracking between two desired specs.
//!
//! A scheme is changed when its block in the new desired spec differs from
//! the block last applied. A scheme without a block in the new spec is never
//! changed, whatever was applied before: dropping a block means "stop
//! managing", not "reset".

use crate::scheme::Scheme;
use crate::types::DesiredSpec;
use std::collections::BTreeSet;

/// Set of schemes to reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    schemes: BTreeSet<Scheme>,
}

impl ChangeSet {
    /// An empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schemes whose block differs between `previous` and `desired`.
    ///
    /// With no previous spec every declared block counts as changed.
    #[must_use]
    pub fn between(previous: Option<&DesiredSpec>, desired: &DesiredSpec) -> Self {
        desired
            .iter()
            .filter(|(scheme, block)| previous.and_then(|p| p.get(*scheme)) != Some(*block))
            .map(|(scheme, _)| scheme)
            .collect()
    }

    /// Every scheme declared in `desired`, regardless of history.
    #[must_use]
    pub fn all_declared(desired: &DesiredSpec) -> Self {
        desired.schemes().collect()
    }

    /// A change set holding exactly `schemes`.
    #[must_use]
    pub fn from_schemes(schemes: &[Scheme]) -> Self {
        schemes.iter().copied().collect()
    }

    /// Mark a scheme changed.
    pub fn insert(&mut self, scheme: Scheme) {
        self.schemes.insert(scheme);
    }

    /// Whether a scheme is marked changed.
    #[must_use]
    pub fn contains(&self, scheme: Scheme) -> bool {
        self.schemes.contains(&scheme)
    }

    /// Whether nothing is marked changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    /// Number of changed schemes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    /// Changed schemes, in reconciliation order.
    pub fn iter(&self) -> impl Iterator<Item = Scheme> + '_ {
        self.schemes.iter().copied()
    }
}

impl FromIterator<Scheme> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Scheme>>(iter: I) -> Self {
        Self {
            schemes: iter.into_iter().collect(),
        }
    }
}
