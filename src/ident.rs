//! Package identity parsing and cache keys
//!
//! A package is addressed as `name` or `name#version`, where the version is
//! an unsigned integer and its absence means "latest". The canonical string
//! form doubles as the content-addressed cache key input.

use crate::error::{LoadstoneError, LoadstoneResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Number of hex chars kept from the identity hash
const KEY_HASH_LEN: usize = 12;

/// Identity of a publishable content package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdent {
    /// Package name, e.g. `acme.game`
    pub name: String,

    /// Pinned version; `None` means latest
    pub version: Option<u64>,
}

impl PackageIdent {
    /// Create an identity addressing the latest published version
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Create an identity pinned to a specific version
    pub fn with_version(name: impl Into<String>, version: u64) -> Self {
        Self {
            name: name.into(),
            version: Some(version),
        }
    }

    /// Canonical string form: `name` or `name#version`
    pub fn canonical(&self) -> String {
        match self.version {
            Some(v) => format!("{}#{}", self.name, v),
            None => self.name.clone(),
        }
    }

    /// Directory name this identity caches under: `<name>-<hash12>`
    ///
    /// The hash covers the canonical form, so `acme.game` and
    /// `acme.game#5` never alias each other.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("{}-{}", self.name, &digest[..KEY_HASH_LEN])
    }
}

impl fmt::Display for PackageIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl FromStr for PackageIdent {
    type Err = LoadstoneError;

    fn from_str(s: &str) -> LoadstoneResult<Self> {
        let s = s.trim();

        let (name, version) = match s.split_once('#') {
            Some((name, version_str)) => {
                if version_str.contains('#') {
                    return Err(invalid(s, "at most one '#' separator allowed"));
                }
                let version: u64 = version_str
                    .parse()
                    .map_err(|_| invalid(s, "version must be an unsigned integer"))?;
                (name, Some(version))
            }
            None => (s, None),
        };

        if name.is_empty() {
            return Err(invalid(s, "empty package name"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid(
                s,
                "name may only contain alphanumerics, '.', '_' and '-'",
            ));
        }

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

fn invalid(ident: &str, reason: &str) -> LoadstoneError {
    LoadstoneError::InvalidIdent {
        ident: ident.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_only() {
        let ident: PackageIdent = "acme.game".parse().unwrap();
        assert_eq!(ident.name, "acme.game");
        assert_eq!(ident.version, None);
    }

    #[test]
    fn parse_versioned() {
        let ident: PackageIdent = "acme.game#5".parse().unwrap();
        assert_eq!(ident.name, "acme.game");
        assert_eq!(ident.version, Some(5));
    }

    #[test]
    fn parse_trims_whitespace() {
        let ident: PackageIdent = "  acme.game#5  ".parse().unwrap();
        assert_eq!(ident.version, Some(5));
    }

    #[test]
    fn parse_empty_name_rejected() {
        assert!("".parse::<PackageIdent>().is_err());
        assert!("#5".parse::<PackageIdent>().is_err());
    }

    #[test]
    fn parse_bad_version_rejected() {
        let result = "acme.game#latest".parse::<PackageIdent>();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unsigned integer"));
    }

    #[test]
    fn parse_negative_version_rejected() {
        assert!("acme.game#-1".parse::<PackageIdent>().is_err());
    }

    #[test]
    fn parse_double_hash_rejected() {
        assert!("acme.game#5#6".parse::<PackageIdent>().is_err());
    }

    #[test]
    fn parse_invalid_chars_rejected() {
        assert!("acme game".parse::<PackageIdent>().is_err());
        assert!("acme/game".parse::<PackageIdent>().is_err());
    }

    #[test]
    fn canonical_roundtrip() {
        for raw in ["acme.game", "acme.game#5", "fish.sauna#76972"] {
            let ident: PackageIdent = raw.parse().unwrap();
            assert_eq!(ident.canonical(), raw);
            assert_eq!(ident.to_string(), raw);
        }
    }

    #[test]
    fn equality_by_name_and_version() {
        let latest = PackageIdent::new("acme.game");
        let pinned = PackageIdent::with_version("acme.game", 5);
        assert_ne!(latest, pinned);
        assert_eq!(pinned, PackageIdent::with_version("acme.game", 5));
    }

    #[test]
    fn cache_key_is_stable_and_version_scoped() {
        let a = PackageIdent::with_version("acme.game", 5);
        let b = PackageIdent::with_version("acme.game", 6);
        let latest = PackageIdent::new("acme.game");

        assert_eq!(a.cache_key(), a.cache_key());
        assert_ne!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), latest.cache_key());
        assert!(a.cache_key().starts_with("acme.game-"));
    }
}
