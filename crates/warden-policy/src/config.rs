//! Portal configuration schema.
//!
//! A `PortalConfig` is deserialized from TOML and holds the engine settings
//! plus the ordered catalog definition. Catalog entries are arrays of tables
//! rather than keyed tables so that a key authored twice survives parsing and
//! can be reported by the verifier.
//!
//! Example:
//! ```toml
//! [engine]
//! admin_role = "admin"
//! tenant_visibility = "granted"
//!
//! [[tenants]]
//! key = "north"
//! name = "North Factory"
//!
//! [[tenants.units]]
//! key = "hr"
//! name = "Human Resources"
//!
//! [[tenants.units.capabilities]]
//! key = "single"
//! name = "Single Salary Slip"
//! legacy_alias = "salary_single"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use warden_contracts::{
    catalog::{Catalog, Tenant},
    error::{WardenError, WardenResult},
    principal::Role,
};

/// Which tenants a non-admin principal sees in navigation.
///
/// ```toml
/// tenant_visibility = "granted"
/// tenant_visibility = "all"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TenantVisibility {
    /// Only tenants in which at least one capability resolves to granted.
    #[default]
    Granted,
    /// Every catalog tenant, regardless of grants.
    All,
}

/// Decision engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Role tag that bypasses grant checks.
    #[serde(default = "default_admin_role")]
    pub admin_role: String,

    #[serde(default)]
    pub tenant_visibility: TenantVisibility,
}

fn default_admin_role() -> String {
    Role::ADMIN.to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            admin_role: default_admin_role(),
            tenant_visibility: TenantVisibility::default(),
        }
    }
}

impl EngineSettings {
    pub fn admin_role(&self) -> Role {
        Role::new(self.admin_role.as_str())
    }
}

/// The top-level structure deserialized from a portal TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    /// Catalog definition in display order.
    #[serde(default)]
    pub tenants: Vec<Tenant>,
}

impl PortalConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `WardenError::ConfigError` if the TOML is malformed, does not
    /// match the expected schema, or sets an empty admin role.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let config: PortalConfig = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse portal TOML: {}", e),
        })?;
        if config.engine.admin_role.trim().is_empty() {
            return Err(WardenError::ConfigError {
                reason: "engine.admin_role must not be empty".to_string(),
            });
        }
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read portal config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build the immutable catalog from the configured tenants.
    ///
    /// Key segments are validated here; an empty or dotted key surfaces as
    /// `InvalidSegment`.
    pub fn catalog(&self) -> WardenResult<Catalog> {
        Catalog::new(self.tenants.clone())
    }
}
