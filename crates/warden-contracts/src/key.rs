//! Permission key codec.
//!
//! A permission key is the canonical `tenant.unit.capability` string used to
//! store grants. This module is the only place that knows the key shape:
//! every other crate builds and reads keys through [`PermissionKey`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{WardenError, WardenResult};

/// Separator between key segments.
pub const SEPARATOR: char = '.';

/// Reserved grant key that grants every capability when mapped to `true`.
pub const WILDCARD: &str = "*";

/// A decoded (tenant, unit, capability) triple.
///
/// Constructed only through [`PermissionKey::new`] or [`PermissionKey::decode`],
/// so every value satisfies the round-trip law
/// `decode(encode(t, u, c)) == (t, u, c)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey {
    tenant: String,
    unit: String,
    capability: String,
}

impl PermissionKey {
    /// Build a key from its three segments.
    ///
    /// Returns `InvalidSegment` if any segment is empty or contains the
    /// separator.
    pub fn new(
        tenant: impl Into<String>,
        unit: impl Into<String>,
        capability: impl Into<String>,
    ) -> WardenResult<Self> {
        let tenant = tenant.into();
        let unit = unit.into();
        let capability = capability.into();
        validate_segment(&tenant)?;
        validate_segment(&unit)?;
        validate_segment(&capability)?;
        Ok(Self {
            tenant,
            unit,
            capability,
        })
    }

    /// Build a key from segments that were validated elsewhere (catalog
    /// construction).
    pub(crate) fn from_validated(tenant: &str, unit: &str, capability: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            unit: unit.to_string(),
            capability: capability.to_string(),
        }
    }

    /// Encode a triple straight to its canonical string.
    pub fn encode(tenant: &str, unit: &str, capability: &str) -> WardenResult<String> {
        Self::new(tenant, unit, capability).map(|k| k.to_string())
    }

    /// Decode a canonical key string.
    ///
    /// Exactly three non-empty segments are required. Keys with extra
    /// segments are rejected rather than matched on their first three
    /// positions.
    pub fn decode(key: &str) -> WardenResult<Self> {
        let segments: Vec<&str> = key.split(SEPARATOR).collect();
        if segments.len() != 3 {
            return Err(WardenError::MalformedKey {
                key: key.to_string(),
                reason: format!("expected 3 segments, found {}", segments.len()),
            });
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(WardenError::MalformedKey {
                key: key.to_string(),
                reason: "empty segment".to_string(),
            });
        }
        Ok(Self {
            tenant: segments[0].to_string(),
            unit: segments[1].to_string(),
            capability: segments[2].to_string(),
        })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Return the same tenant and unit with a different capability segment.
    ///
    /// Used to build the legacy-alias form of a key.
    pub fn with_capability(&self, capability: &str) -> WardenResult<Self> {
        Self::new(self.tenant.as_str(), self.unit.as_str(), capability)
    }

    /// Split back into owned segments.
    pub fn into_parts(self) -> (String, String, String) {
        (self.tenant, self.unit, self.capability)
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.tenant, self.unit, self.capability
        )
    }
}

impl FromStr for PermissionKey {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = WardenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

impl From<PermissionKey> for String {
    fn from(key: PermissionKey) -> Self {
        key.to_string()
    }
}

/// Check that `segment` can appear in a permission key.
pub fn validate_segment(segment: &str) -> WardenResult<()> {
    if segment.is_empty() {
        return Err(WardenError::InvalidSegment {
            segment: segment.to_string(),
            reason: "segment is empty".to_string(),
        });
    }
    if segment.contains(SEPARATOR) {
        return Err(WardenError::InvalidSegment {
            segment: segment.to_string(),
            reason: format!("segment contains the separator '{SEPARATOR}'"),
        });
    }
    Ok(())
}
