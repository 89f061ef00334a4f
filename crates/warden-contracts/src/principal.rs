//! Principal identity and role types.
//!
//! WARDEN does not authenticate anyone. The session provider hands over an
//! already-identified principal; the engine only reads its role and grants.

use serde::{Deserialize, Serialize};

use crate::grant::GrantStore;

/// Stable identifier for a principal (usually a user name or account id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A role tag, e.g. "admin" or "user".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    /// The role tag that bypasses grant checks and may mutate grants.
    pub const ADMIN: &'static str = "admin";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    pub fn user() -> Self {
        Self("user".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which tenants and units a principal's role was scoped to when it was
/// provisioned. Informational only; decisions are made from grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningScope {
    #[serde(default)]
    pub tenants: Vec<String>,
    #[serde(default)]
    pub units: Vec<String>,
}

/// A principal as seen by the decision and mutation engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
    #[serde(default)]
    pub grants: GrantStore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ProvisioningScope>,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role, grants: GrantStore) -> Self {
        Self {
            id: PrincipalId::new(id),
            role,
            grants,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: ProvisioningScope) -> Self {
        self.scope = Some(scope);
        self
    }
}
