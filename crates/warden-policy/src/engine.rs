//! Catalog-backed access decision engine.
//!
//! `CatalogAccessEngine` implements the `AccessPolicy` trait from
//! warden-core and the aggregate queries the tree editor and navigation use.
//!
//! Decision algorithm, in order:
//!
//! 1. Role override: a principal holding the admin role is granted.
//! 2. Wildcard: a grant store with `"*" = true` is granted.
//! 3. The target must form a valid key and name a live catalog leaf
//!    (canonical key or legacy alias). Otherwise → `Denied`.
//! 4. Flat encoding: the canonical key, then the alias key. The first entry
//!    found decides, including an explicit `false`.
//! 5. Legacy nested encoding, canonical then alias.
//! 6. Nothing found → `Denied` (deny-by-default).
//!
//! Matching is always on the full (tenant, unit, capability) triple; a grant
//! in one tenant never satisfies a check in another.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use warden_contracts::{
    catalog::{Catalog, CatalogLeaf, Tenant, Unit},
    decision::{
        AccessDecision, CapabilityNode, DenyReason, GrantSource, GrantState, TenantNode, UnitNode,
    },
    error::WardenResult,
    grant::GrantStore,
    key::PermissionKey,
    principal::Principal,
};
use warden_core::traits::AccessPolicy;

use crate::config::{EngineSettings, PortalConfig, TenantVisibility};

/// The WARDEN decision engine.
///
/// Holds the catalog behind an `Arc`; clones are cheap and the engine can be
/// shared across threads without locking. No method mutates any state.
///
/// ```rust,ignore
/// use warden_policy::CatalogAccessEngine;
///
/// let engine = CatalogAccessEngine::from_file(Path::new("config/portal.toml"))?;
/// if engine.is_granted(&principal, "north", "hr", "single") { /* ... */ }
/// ```
#[derive(Debug, Clone)]
pub struct CatalogAccessEngine {
    catalog: Arc<Catalog>,
    settings: EngineSettings,
}

impl CatalogAccessEngine {
    /// Build an engine with default settings.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the catalog and engine from a parsed configuration.
    pub fn from_config(config: &PortalConfig) -> WardenResult<Self> {
        let catalog = config.catalog()?;
        Ok(Self::new(Arc::new(catalog)).with_settings(config.engine.clone()))
    }

    /// Parse `s` as portal TOML and build an engine from it.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        Self::from_config(&PortalConfig::from_toml_str(s)?)
    }

    /// Read and parse a portal TOML file and build an engine from it.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        Self::from_config(&PortalConfig::from_file(path)?)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn is_admin(&self, principal: &Principal) -> bool {
        principal.role.as_str() == self.settings.admin_role
    }

    /// True iff every capability under the unit resolves to granted.
    ///
    /// A unit with no capabilities, or one missing from the catalog, is
    /// never fully granted.
    pub fn is_unit_fully_granted(&self, principal: &Principal, tenant: &str, unit: &str) -> bool {
        let Some(u) = self.catalog.unit(tenant, unit) else {
            return false;
        };
        !u.capabilities.is_empty()
            && u
                .capabilities
                .iter()
                .all(|c| self.is_granted(principal, tenant, unit, &c.key))
    }

    /// True iff the tenant has at least one unit and every unit is fully
    /// granted.
    pub fn is_tenant_fully_granted(&self, principal: &Principal, tenant: &str) -> bool {
        let Some(t) = self.catalog.tenant(tenant) else {
            return false;
        };
        !t.units.is_empty()
            && t
                .units
                .iter()
                .all(|u| self.is_unit_fully_granted(principal, tenant, &u.key))
    }

    /// Tri-state of a unit: `Full`, `Partial` or `None`.
    pub fn unit_state(&self, principal: &Principal, tenant: &str, unit: &str) -> GrantState {
        match self.catalog.tenant(tenant).and_then(|t| t.unit(unit).map(|u| (t, u))) {
            Some((t, u)) => self.unit_node(principal, t, u).state,
            None => GrantState::None,
        }
    }

    /// Tri-state of a tenant, aggregated from its units.
    pub fn tenant_state(&self, principal: &Principal, tenant: &str) -> GrantState {
        match self.catalog.tenant(tenant) {
            Some(t) => self.tenant_node(principal, t).state,
            None => GrantState::None,
        }
    }

    /// Tenants the principal can navigate to.
    ///
    /// Admins see every tenant. Other principals see every tenant under
    /// `TenantVisibility::All`, otherwise only tenants containing at least
    /// one granted capability.
    pub fn accessible_tenants(&self, principal: &Principal) -> BTreeSet<String> {
        let show_all =
            self.is_admin(principal) || self.settings.tenant_visibility == TenantVisibility::All;

        self.catalog
            .tenants()
            .iter()
            .filter(|t| show_all || self.any_granted_in_tenant(principal, t))
            .map(|t| t.key.clone())
            .collect()
    }

    /// Units of `tenant` containing at least one granted capability.
    ///
    /// Admins see every unit of the tenant.
    pub fn accessible_units(&self, principal: &Principal, tenant: &str) -> BTreeSet<String> {
        let Some(t) = self.catalog.tenant(tenant) else {
            return BTreeSet::new();
        };
        let admin = self.is_admin(principal);
        t.units
            .iter()
            .filter(|u| {
                admin
                    || u.capabilities
                        .iter()
                        .any(|c| self.is_granted(principal, &t.key, &u.key, &c.key))
            })
            .map(|u| u.key.clone())
            .collect()
    }

    /// Resolve the whole catalog for one principal.
    ///
    /// Produces the tenant → unit → capability tree with a decision on every
    /// leaf and a tri-state on every inner node, in catalog order.
    pub fn grant_tree(&self, principal: &Principal) -> Vec<TenantNode> {
        self.catalog
            .tenants()
            .iter()
            .map(|t| self.tenant_node(principal, t))
            .collect()
    }

    fn tenant_node(&self, principal: &Principal, tenant: &Tenant) -> TenantNode {
        let units: Vec<UnitNode> = tenant
            .units
            .iter()
            .map(|u| self.unit_node(principal, tenant, u))
            .collect();
        TenantNode {
            key: tenant.key.clone(),
            name: tenant.name.clone(),
            state: GrantState::aggregate(units.iter().map(|u| u.state)),
            units,
        }
    }

    fn unit_node(&self, principal: &Principal, tenant: &Tenant, unit: &Unit) -> UnitNode {
        let capabilities: Vec<CapabilityNode> = unit
            .capabilities
            .iter()
            .map(|c| CapabilityNode {
                key: c.key.clone(),
                name: c.name.clone(),
                decision: self.decide(principal, &tenant.key, &unit.key, &c.key),
            })
            .collect();
        UnitNode {
            key: unit.key.clone(),
            name: unit.name.clone(),
            state: GrantState::aggregate(
                capabilities
                    .iter()
                    .map(|c| GrantState::from_granted(c.decision.is_granted())),
            ),
            capabilities,
        }
    }

    fn any_granted_in_tenant(&self, principal: &Principal, tenant: &Tenant) -> bool {
        tenant.units.iter().any(|u| {
            u.capabilities
                .iter()
                .any(|c| self.is_granted(principal, &tenant.key, &u.key, &c.key))
        })
    }
}

/// Look up a resolved leaf in both grant encodings.
///
/// Flat beats legacy, and the canonical key beats the alias key within each
/// encoding. Returns `None` if no entry exists anywhere.
fn lookup(grants: &GrantStore, leaf: &CatalogLeaf<'_>) -> Option<(bool, GrantSource)> {
    let canonical = leaf.key();
    let alias = leaf.alias_key();

    let flat = grants.flat_value(&canonical.to_string()).or_else(|| {
        alias
            .as_ref()
            .and_then(|a| grants.flat_value(&a.to_string()))
    });
    if let Some(value) = flat {
        return Some((value, GrantSource::FlatGrant));
    }

    let legacy = grants
        .legacy_value(canonical.tenant(), canonical.unit(), canonical.capability())
        .or_else(|| {
            alias
                .as_ref()
                .and_then(|a| grants.legacy_value(a.tenant(), a.unit(), a.capability()))
        });
    legacy.map(|value| (value, GrantSource::LegacyGrant))
}

impl AccessPolicy for CatalogAccessEngine {
    fn decide(&self, principal: &Principal, tenant: &str, unit: &str, capability: &str) -> AccessDecision {
        if self.is_admin(principal) {
            return AccessDecision::granted(GrantSource::RoleOverride);
        }
        if principal.grants.has_wildcard() {
            return AccessDecision::granted(GrantSource::Wildcard);
        }

        if let Err(e) = PermissionKey::new(tenant, unit, capability) {
            debug!(
                principal = %principal.id,
                tenant,
                unit,
                capability,
                error = %e,
                "access denied: target cannot form a permission key"
            );
            return AccessDecision::denied(DenyReason::InvalidTarget);
        }

        let Some(leaf) = self.catalog.resolve(tenant, unit, capability) else {
            debug!(
                principal = %principal.id,
                tenant,
                unit,
                capability,
                "access denied: no catalog leaf"
            );
            return AccessDecision::denied(DenyReason::LeafNotFound);
        };

        match lookup(&principal.grants, &leaf) {
            Some((true, source)) => AccessDecision::granted(source),
            Some((false, _)) => AccessDecision::denied(DenyReason::ExplicitlyRevoked),
            None => AccessDecision::denied(DenyReason::NoGrant),
        }
    }
}
