//! Desired state and reconciliation report types.

use crate::scheme::Scheme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single attribute value in a flat attribute mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Flags such as `enabled`.
    Bool(bool),
    /// Names, realms, domains.
    Text(String),
    /// Ordered names, e.g. enabled Windows sub-providers.
    List(Vec<String>),
}

impl AttributeValue {
    /// Human readable type name, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "a boolean",
            Self::Text(_) => "a string",
            Self::List(_) => "a list of strings",
        }
    }

    /// The boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The string, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The list, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "\"{s}\""),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

/// Flat attribute mapping for one scheme.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Desired configuration: one optional attribute block per scheme.
///
/// Only schemes with a block are ever considered for update. A scheme without
/// a block is left alone on the server, whatever its current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredSpec {
    blocks: BTreeMap<Scheme, Attributes>,
}

impl DesiredSpec {
    /// Create an empty desired spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: add or replace a block.
    #[must_use]
    pub fn with(mut self, scheme: Scheme, attributes: Attributes) -> Self {
        self.blocks.insert(scheme, attributes);
        self
    }

    /// Add or replace a block.
    pub fn set(&mut self, scheme: Scheme, attributes: Attributes) {
        self.blocks.insert(scheme, attributes);
    }

    /// Remove a block, returning it.
    pub fn remove(&mut self, scheme: Scheme) -> Option<Attributes> {
        self.blocks.remove(&scheme)
    }

    /// The block for a scheme, if declared.
    #[must_use]
    pub fn get(&self, scheme: Scheme) -> Option<&Attributes> {
        self.blocks.get(&scheme)
    }

    /// Whether a block is declared for a scheme.
    #[must_use]
    pub fn contains(&self, scheme: Scheme) -> bool {
        self.blocks.contains_key(&scheme)
    }

    /// Declared schemes, in reconciliation order.
    pub fn schemes(&self) -> impl Iterator<Item = Scheme> + '_ {
        self.blocks.keys().copied()
    }

    /// Declared blocks, in reconciliation order.
    pub fn iter(&self) -> impl Iterator<Item = (Scheme, &Attributes)> {
        self.blocks.iter().map(|(s, a)| (*s, a))
    }

    /// Whether no block is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of declared blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

impl FromIterator<(Scheme, Attributes)> for DesiredSpec {
    fn from_iter<I: IntoIterator<Item = (Scheme, Attributes)>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

/// How far a scheme got in one reconciliation pass.
///
/// `Unchanged` is where every scheme starts. A scheme without a desired block
/// goes straight to `Skipped`; one with a block moves through `Fetched` and
/// `Merged` to `Applied`. A merge that changes nothing stops at `Merged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemePhase {
    /// Not looked at (no change recorded for the scheme).
    Unchanged,
    /// No desired block; nothing was sent.
    Skipped,
    /// Current state read from the server.
    Fetched,
    /// Desired attributes overlaid on the current state.
    Merged,
    /// Merged record written and the server's answer decoded.
    Applied,
}

impl SchemePhase {
    /// Whether the server was written to.
    #[must_use]
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl fmt::Display for SchemePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::Fetched => "fetched",
            Self::Merged => "in sync",
            Self::Applied => "applied",
        };
        f.write_str(s)
    }
}

/// Final phase of one scheme plus a short message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeReport {
    /// The scheme.
    pub scheme: Scheme,
    /// Last phase reached.
    pub phase: SchemePhase,
    /// Attribute keys whose value differed from the fetched state.
    pub changed_keys: Vec<String>,
}

impl SchemeReport {
    /// Create a report with no changed keys.
    #[must_use]
    pub fn new(scheme: Scheme, phase: SchemePhase) -> Self {
        Self {
            scheme,
            phase,
            changed_keys: Vec::new(),
        }
    }
}
