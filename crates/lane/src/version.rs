//! Type-and-version strings reported by messaging contracts.
//!
//! Wire shape is exactly `"<ContractName> <major>.<minor>.<patch>"`. Parsing is strict so that
//! [TypeAndVersion] renders back to the exact input.

use crate::error::LaneError;
use std::fmt;
use std::str::FromStr;

/// Semantic version `major.minor.patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProtocolVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn parse_component(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // "01" would not render back to itself.
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

impl FromStr for ProtocolVersion {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err("version must have three dot-separated components");
        };
        Ok(Self {
            major: parse_component(major).ok_or("major is not a non-negative integer")?,
            minor: parse_component(minor).ok_or("minor is not a non-negative integer")?,
            patch: parse_component(patch).ok_or("patch is not a non-negative integer")?,
        })
    }
}

/// Parsed `typeAndVersion()` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAndVersion {
    pub contract_type: String,
    pub version: ProtocolVersion,
}

impl TypeAndVersion {
    pub fn parse(raw: &str) -> Result<Self, LaneError> {
        let err = |reason| LaneError::VersionParse {
            raw: raw.to_string(),
            reason,
        };
        let (name, version) = raw
            .split_once(' ')
            .ok_or_else(|| err("expected \"<Name> X.Y.Z\""))?;
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(err("contract name must be a single non-empty token"));
        }
        let version = version.parse::<ProtocolVersion>().map_err(err)?;
        Ok(Self {
            contract_type: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for TypeAndVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.contract_type, self.version)
    }
}
