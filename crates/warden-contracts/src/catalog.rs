//! The capability catalog: tenant → unit → capability.
//!
//! The catalog is constructed once from configuration and never mutated.
//! It is passed explicitly to the decision engine, the mutation engine and
//! the verifier; share it behind an `Arc` when several readers need it.
//!
//! Definitions are kept as ordered lists so that display order is preserved
//! and authoring mistakes (duplicate keys) survive loading long enough for
//! the verifier to report them. Lookups resolve duplicates first-wins.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{WardenError, WardenResult};
use crate::key::{validate_segment, PermissionKey};

/// A service or action nested under a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub key: String,
    pub name: String,
    /// Key used for this capability by older catalogs. Grants stored under
    /// the alias resolve to this capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_alias: Option<String>,
}

impl Capability {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            legacy_alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.legacy_alias = Some(alias.into());
        self
    }
}

/// A department nested under a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl Unit {
    pub fn new(key: impl Into<String>, name: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            capabilities,
        }
    }

    /// First capability whose canonical key equals `key`.
    pub fn capability(&self, key: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.key == key)
    }
}

/// A top-level organizational scope, e.g. a factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl Tenant {
    pub fn new(key: impl Into<String>, name: impl Into<String>, units: Vec<Unit>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            units,
        }
    }

    /// First unit whose key equals `key`.
    pub fn unit(&self, key: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.key == key)
    }
}

/// One resolved catalog leaf with its ancestors.
#[derive(Debug, Clone, Copy)]
pub struct CatalogLeaf<'a> {
    pub tenant: &'a Tenant,
    pub unit: &'a Unit,
    pub capability: &'a Capability,
    /// True when the lookup matched the capability's legacy alias.
    pub via_alias: bool,
}

impl CatalogLeaf<'_> {
    /// The canonical key of this leaf.
    pub fn key(&self) -> PermissionKey {
        // Segments were validated when the catalog was built.
        PermissionKey::from_validated(&self.tenant.key, &self.unit.key, &self.capability.key)
    }

    /// The legacy-alias key of this leaf, if the capability has one.
    pub fn alias_key(&self) -> Option<PermissionKey> {
        let alias = self.capability.legacy_alias.as_deref()?;
        self.key().with_capability(alias).ok()
    }

    /// Human-readable `Tenant / Unit / Capability` label.
    pub fn label(&self) -> String {
        format!(
            "{} / {} / {}",
            self.tenant.name, self.unit.name, self.capability.name
        )
    }
}

/// What kind of authoring error a [`CatalogDuplicate`] describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    Tenant,
    Unit,
    Capability,
    /// A legacy alias equals another capability's key or alias in the same unit.
    AliasCollision,
}

/// A key that appears more than once under the same parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDuplicate {
    pub path: String,
    pub kind: DuplicateKind,
}

type LeafPos = (usize, usize, usize);

/// The immutable capability tree.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tenants: Vec<Tenant>,
    leaf_index: HashMap<String, LeafPos>,
    alias_index: HashMap<String, LeafPos>,
}

impl Catalog {
    /// Build a catalog, validating every key and alias as a key segment.
    ///
    /// Duplicate keys are accepted and reported by [`Catalog::duplicates`].
    /// The first definition wins: a tenant or unit that repeats an earlier
    /// key under the same parent is still validated but never indexed, so
    /// nothing beneath it resolves.
    pub fn new(tenants: Vec<Tenant>) -> WardenResult<Self> {
        let mut leaf_index = HashMap::new();
        let mut alias_index = HashMap::new();
        let mut live_tenants = HashSet::new();

        for (ti, tenant) in tenants.iter().enumerate() {
            validate_segment(&tenant.key)?;
            let tenant_live = live_tenants.insert(tenant.key.clone());
            let mut live_units = HashSet::new();

            for (ui, unit) in tenant.units.iter().enumerate() {
                validate_segment(&unit.key)?;
                let live = live_units.insert(unit.key.clone()) && tenant_live;

                for (ci, cap) in unit.capabilities.iter().enumerate() {
                    let key = PermissionKey::new(
                        tenant.key.as_str(),
                        unit.key.as_str(),
                        cap.key.as_str(),
                    )?;
                    let alias_key = match &cap.legacy_alias {
                        Some(alias) => Some(key.with_capability(alias).map_err(|e| match e {
                            WardenError::InvalidSegment { segment, reason } => {
                                WardenError::InvalidSegment {
                                    segment,
                                    reason: format!("legacy alias of '{key}': {reason}"),
                                }
                            }
                            other => other,
                        })?),
                        None => None,
                    };
                    if !live {
                        continue;
                    }

                    leaf_index.entry(key.to_string()).or_insert((ti, ui, ci));
                    if let Some(alias_key) = alias_key {
                        alias_index.entry(alias_key.to_string()).or_insert((ti, ui, ci));
                    }
                }
            }
        }

        Ok(Self {
            tenants,
            leaf_index,
            alias_index,
        })
    }

    pub fn tenants(&self) -> &[Tenant] {
        &self.tenants
    }

    pub fn tenant(&self, tenant: &str) -> Option<&Tenant> {
        self.tenants.iter().find(|t| t.key == tenant)
    }

    pub fn unit(&self, tenant: &str, unit: &str) -> Option<&Unit> {
        self.tenant(tenant)?.unit(unit)
    }

    /// Resolve a capability key, or its legacy alias, to a catalog leaf.
    ///
    /// Canonical keys take precedence over aliases.
    pub fn resolve(&self, tenant: &str, unit: &str, capability: &str) -> Option<CatalogLeaf<'_>> {
        let key = PermissionKey::encode(tenant, unit, capability).ok()?;
        self.resolve_encoded(&key)
    }

    /// Resolve an already-encoded key string.
    pub fn resolve_encoded(&self, key: &str) -> Option<CatalogLeaf<'_>> {
        if let Some(pos) = self.leaf_index.get(key) {
            return Some(self.leaf_at(*pos, false));
        }
        self.alias_index.get(key).map(|pos| self.leaf_at(*pos, true))
    }

    /// True if the triple names a live leaf by canonical key or alias.
    pub fn contains(&self, tenant: &str, unit: &str, capability: &str) -> bool {
        self.resolve(tenant, unit, capability).is_some()
    }

    /// Every live leaf in declaration order.
    ///
    /// Leaves shadowed by an earlier definition of the same key, or sitting
    /// under a shadowed tenant or unit, are skipped.
    pub fn leaves(&self) -> impl Iterator<Item = CatalogLeaf<'_>> + '_ {
        self.tenants.iter().enumerate().flat_map(move |(ti, tenant)| {
            tenant.units.iter().enumerate().flat_map(move |(ui, unit)| {
                unit.capabilities
                    .iter()
                    .enumerate()
                    .filter_map(move |(ci, capability)| {
                        let leaf = CatalogLeaf {
                            tenant,
                            unit,
                            capability,
                            via_alias: false,
                        };
                        let live = self.leaf_index.get(&leaf.key().to_string()) == Some(&(ti, ui, ci));
                        live.then_some(leaf)
                    })
            })
        })
    }

    /// Canonical keys of every capability under a unit, or `None` if the
    /// unit is not in the catalog.
    pub fn unit_keys(&self, tenant: &str, unit: &str) -> Option<Vec<PermissionKey>> {
        let t = self.tenant(tenant)?;
        let u = t.unit(unit)?;
        Some(
            u.capabilities
                .iter()
                .map(|c| PermissionKey::from_validated(&t.key, &u.key, &c.key))
                .collect(),
        )
    }

    /// Canonical keys of every capability under every unit of a tenant, or
    /// `None` if the tenant is not in the catalog.
    pub fn tenant_keys(&self, tenant: &str) -> Option<Vec<PermissionKey>> {
        let t = self.tenant(tenant)?;
        Some(
            t.units
                .iter()
                .flat_map(|u| {
                    u.capabilities
                        .iter()
                        .map(move |c| PermissionKey::from_validated(&t.key, &u.key, &c.key))
                })
                .collect(),
        )
    }

    /// Number of live leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Report every key defined more than once under the same parent.
    pub fn duplicates(&self) -> Vec<CatalogDuplicate> {
        let mut found = Vec::new();

        let mut seen_tenants: Vec<&str> = Vec::new();
        for tenant in &self.tenants {
            if seen_tenants.contains(&tenant.key.as_str()) {
                found.push(CatalogDuplicate {
                    path: tenant.key.clone(),
                    kind: DuplicateKind::Tenant,
                });
            }
            seen_tenants.push(&tenant.key);

            let mut seen_units: Vec<&str> = Vec::new();
            for unit in &tenant.units {
                let unit_path = format!("{}.{}", tenant.key, unit.key);
                if seen_units.contains(&unit.key.as_str()) {
                    found.push(CatalogDuplicate {
                        path: unit_path.clone(),
                        kind: DuplicateKind::Unit,
                    });
                }
                seen_units.push(&unit.key);

                let mut seen_caps: Vec<&str> = Vec::new();
                for cap in &unit.capabilities {
                    if seen_caps.contains(&cap.key.as_str()) {
                        found.push(CatalogDuplicate {
                            path: format!("{unit_path}.{}", cap.key),
                            kind: DuplicateKind::Capability,
                        });
                    }
                    seen_caps.push(&cap.key);
                }

                let mut seen_aliases: Vec<&str> = Vec::new();
                for cap in &unit.capabilities {
                    let Some(alias) = cap.legacy_alias.as_deref() else {
                        continue;
                    };
                    let collides_with_key = unit
                        .capabilities
                        .iter()
                        .any(|other| other.key == alias && !std::ptr::eq(other, cap));
                    if collides_with_key || seen_aliases.contains(&alias) {
                        found.push(CatalogDuplicate {
                            path: format!("{unit_path}.{alias}"),
                            kind: DuplicateKind::AliasCollision,
                        });
                    }
                    seen_aliases.push(alias);
                }
            }
        }

        found
    }

    fn leaf_at(&self, (ti, ui, ci): LeafPos, via_alias: bool) -> CatalogLeaf<'_> {
        let tenant = &self.tenants[ti];
        let unit = &tenant.units[ui];
        CatalogLeaf {
            tenant,
            unit,
            capability: &unit.capabilities[ci],
            via_alias,
        }
    }
}
