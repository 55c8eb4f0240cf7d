//! Authentication scheme identifiers.
//!
//! One closed set shared by the capability model, the navigator and the
//! manifest format. The identifier doubles as the link relation name in the
//! authentication root and as the block name in desired state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An authentication mechanism the web server can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Anonymous access, optionally impersonating a fixed user.
    Anonymous,
    /// HTTP basic authentication.
    Basic,
    /// HTTP digest authentication.
    Digest,
    /// Integrated Windows authentication (Negotiate, NTLM).
    Windows,
}

impl Scheme {
    /// Every scheme, in reconciliation order.
    pub const ALL: [Scheme; 4] = [
        Scheme::Anonymous,
        Scheme::Basic,
        Scheme::Digest,
        Scheme::Windows,
    ];

    /// Lowercase identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Basic => "basic",
            Self::Digest => "digest",
            Self::Windows => "windows",
        }
    }

    /// Name of the link relation pointing at this scheme's sub-resource.
    #[must_use]
    pub fn link_rel(&self) -> &'static str {
        self.as_str()
    }

    /// Get all schemes.
    #[must_use]
    pub fn all() -> &'static [Scheme] {
        &Self::ALL
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when parsing an unknown scheme name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown authentication scheme '{0}' (expected anonymous, basic, digest or windows)")]
pub struct UnknownScheme(pub String);

impl FromStr for Scheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|scheme| scheme.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownScheme(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_round_trips_through_str() {
        for scheme in Scheme::all() {
            assert_eq!(scheme.as_str().parse::<Scheme>().unwrap(), *scheme);
        }
    }

    #[test]
    fn test_scheme_parse_is_case_insensitive() {
        assert_eq!("Windows".parse::<Scheme>().unwrap(), Scheme::Windows);
        assert_eq!(" BASIC ".parse::<Scheme>().unwrap(), Scheme::Basic);
    }

    #[test]
    fn test_scheme_parse_unknown() {
        let err = "kerberos".parse::<Scheme>().unwrap_err();
        assert!(err.to_string().contains("kerberos"));
    }

    #[test]
    fn test_scheme_order() {
        let mut shuffled = vec![Scheme::Windows, Scheme::Anonymous, Scheme::Digest, Scheme::Basic];
        shuffled.sort();
        assert_eq!(shuffled, Scheme::ALL.to_vec());
    }

    #[test]
    fn test_scheme_display_honours_width() {
        assert_eq!(format!("{:<8}|", Scheme::Basic), "basic   |");
    }

    #[test]
    fn test_scheme_serde_lowercase() {
        let json = serde_json::to_string(&Scheme::Digest).unwrap();
        assert_eq!(json, "\"digest\"");
        let back: Scheme = serde_json::from_str("\"anonymous\"").unwrap();
        assert_eq!(back, Scheme::Anonymous);
    }
}
