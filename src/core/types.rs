/*!
 * Core Types
 * Identity types shared by every permission check
 */

use super::errors::{PolicyError, PolicyResult};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one module instance: symbolic name plus version
///
/// Equality is exact across both fields. No normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectIdentity {
    pub name: String,
    pub version: Version,
}

impl SubjectIdentity {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Build an identity from a textual version
    pub fn parse(name: impl Into<String>, version: &str) -> PolicyResult<Self> {
        let version =
            Version::parse(version).map_err(|_| PolicyError::InvalidVersion(version.to_string()))?;
        Ok(Self::new(name, version))
    }
}

impl fmt::Display for SubjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A privilege being checked: kind, target and actions
///
/// Cache identity requires all three to match exactly; one request never
/// subsumes another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrivilegeRequest {
    pub kind: String,
    pub target: String,
    pub actions: String,
}

impl PrivilegeRequest {
    pub fn new(
        kind: impl Into<String>,
        target: impl Into<String>,
        actions: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            actions: actions.into(),
        }
    }

    /// File permission request
    pub fn file(target: impl Into<String>, actions: impl Into<String>) -> Self {
        Self::new("file", target, actions)
    }

    /// Socket permission request
    pub fn socket(target: impl Into<String>, actions: impl Into<String>) -> Self {
        Self::new("socket", target, actions)
    }

    /// Service permission request
    pub fn service(target: impl Into<String>, actions: impl Into<String>) -> Self {
        Self::new("service", target, actions)
    }
}

impl fmt::Display for PrivilegeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} \"{}\" \"{}\")", self.kind, self.target, self.actions)
    }
}
