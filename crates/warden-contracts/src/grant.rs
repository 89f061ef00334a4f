//! Grant store: one principal's record of granted permission keys.
//!
//! The canonical encoding is a flat map of permission key → bool. Older
//! sessions carry the same information as nested maps keyed tenant, then
//! unit, then capability. Both are readable; only the flat map is written.
//! A missing key means "not granted".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::catalog::Catalog;
use crate::error::{WardenError, WardenResult};
use crate::key::{PermissionKey, WILDCARD};

/// Legacy nested encoding: tenant → unit → capability → granted.
pub type LegacyGrants = BTreeMap<String, BTreeMap<String, BTreeMap<String, bool>>>;

/// A principal's grants in flat and, optionally, legacy nested form.
///
/// Flat keys are kept as plain strings so that orphaned or malformed
/// entries received from the session provider are preserved for the
/// verifier instead of being dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantStore {
    #[serde(default)]
    flat: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    legacy: Option<LegacyGrants>,
}

impl GrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a flat store from `(key, granted)` pairs.
    pub fn from_flat<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, bool)>,
    {
        Self {
            flat: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            legacy: None,
        }
    }

    /// Build a store that holds only the legacy nested encoding.
    pub fn from_legacy(legacy: LegacyGrants) -> Self {
        Self {
            flat: BTreeMap::new(),
            legacy: Some(legacy),
        }
    }

    /// Attach a legacy nested encoding alongside the flat entries.
    pub fn with_legacy(mut self, legacy: LegacyGrants) -> Self {
        self.legacy = Some(legacy);
        self
    }

    /// Parse a grant document as supplied by the session provider.
    ///
    /// Top-level boolean entries are flat keys; top-level object entries are
    /// legacy tenant maps (`{"north": {"hr": {"single": true}}}`). A document
    /// may mix both.
    pub fn from_json(document: &Value) -> WardenResult<Self> {
        let Some(entries) = document.as_object() else {
            return Err(WardenError::InvalidGrantDocument {
                reason: "grant document must be a JSON object".to_string(),
            });
        };

        let mut store = Self::new();
        for (key, value) in entries {
            match value {
                Value::Bool(granted) => {
                    store.flat.insert(key.clone(), *granted);
                }
                Value::Object(units) => {
                    let mut unit_map = BTreeMap::new();
                    for (unit, caps) in units {
                        let Some(caps) = caps.as_object() else {
                            return Err(WardenError::InvalidGrantDocument {
                                reason: format!("'{key}.{unit}' must map capabilities to booleans"),
                            });
                        };
                        let mut cap_map = BTreeMap::new();
                        for (cap, granted) in caps {
                            let Some(granted) = granted.as_bool() else {
                                return Err(WardenError::InvalidGrantDocument {
                                    reason: format!("'{key}.{unit}.{cap}' is not a boolean"),
                                });
                            };
                            cap_map.insert(cap.clone(), granted);
                        }
                        unit_map.insert(unit.clone(), cap_map);
                    }
                    store
                        .legacy
                        .get_or_insert_with(BTreeMap::new)
                        .insert(key.clone(), unit_map);
                }
                other => {
                    return Err(WardenError::InvalidGrantDocument {
                        reason: format!("entry '{key}' has unsupported value {other}"),
                    });
                }
            }
        }
        Ok(store)
    }

    /// The flat value stored under `key`, if any.
    pub fn flat_value(&self, key: &str) -> Option<bool> {
        self.flat.get(key).copied()
    }

    /// The legacy nested value for a triple, if every level is present.
    pub fn legacy_value(&self, tenant: &str, unit: &str, capability: &str) -> Option<bool> {
        self.legacy
            .as_ref()?
            .get(tenant)?
            .get(unit)?
            .get(capability)
            .copied()
    }

    /// True if the reserved wildcard key is present and set.
    pub fn has_wildcard(&self) -> bool {
        self.flat.get(WILDCARD).copied().unwrap_or(false)
    }

    /// Write one grant in the canonical flat encoding.
    ///
    /// `false` is stored explicitly so that a revocation shadows any
    /// legacy nested grant for the same key.
    pub fn set(&mut self, key: &PermissionKey, granted: bool) {
        self.flat.insert(key.to_string(), granted);
    }

    pub fn remove(&mut self, key: &str) -> Option<bool> {
        self.flat.remove(key)
    }

    pub fn flat_entries(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flat.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Flattened view of the legacy nested entries as `(tenant, unit, capability, granted)`.
    pub fn legacy_entries(&self) -> impl Iterator<Item = (&str, &str, &str, bool)> {
        self.legacy.iter().flat_map(|tenants| {
            tenants.iter().flat_map(|(t, units)| {
                units.iter().flat_map(move |(u, caps)| {
                    caps.iter()
                        .map(move |(c, granted)| (t.as_str(), u.as_str(), c.as_str(), *granted))
                })
            })
        })
    }

    pub fn has_legacy(&self) -> bool {
        self.legacy.as_ref().is_some_and(|l| !l.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty() && !self.has_legacy()
    }

    /// Rewrite legacy-alias keys to canonical keys and fold the legacy
    /// encoding into the flat map.
    ///
    /// Precedence matches the decision engine: every flat entry beats every
    /// nested one, and within one encoding the canonical key beats its
    /// alias. The losing values are listed in the report.
    pub fn normalize(&mut self, catalog: &Catalog) -> NormalizationReport {
        let mut report = NormalizationReport::default();

        // Flat aliases are settled before any nested value can claim the
        // canonical key.
        let alias_keys: Vec<(String, String)> = self
            .flat
            .keys()
            .filter_map(|k| {
                let leaf = catalog.resolve_encoded(k)?;
                leaf.via_alias.then(|| (k.clone(), leaf.key().to_string()))
            })
            .collect();
        for (alias, canonical) in alias_keys {
            let Some(granted) = self.flat.remove(&alias) else {
                continue;
            };
            keep_first(&mut self.flat, &canonical, granted, &mut report.conflicts);
            report.rewritten_aliases.push((alias, canonical));
        }

        if let Some(legacy) = self.legacy.take() {
            let mut nested: BTreeMap<String, bool> = BTreeMap::new();
            let mut nested_aliases: Vec<(String, String, bool)> = Vec::new();

            for (tenant, units) in legacy {
                for (unit, caps) in units {
                    for (cap, granted) in caps {
                        let key = match PermissionKey::new(tenant.as_str(), unit.as_str(), cap.as_str()) {
                            Ok(key) => key.to_string(),
                            Err(e) => {
                                warn!(tenant = %tenant, unit = %unit, capability = %cap, error = %e, "dropping unencodable legacy grant");
                                report.rejected.push(format!("{tenant}/{unit}/{cap}"));
                                continue;
                            }
                        };
                        match catalog.resolve_encoded(&key) {
                            Some(leaf) if leaf.via_alias => {
                                nested_aliases.push((key, leaf.key().to_string(), granted));
                            }
                            _ => {
                                nested.insert(key, granted);
                            }
                        }
                    }
                }
            }

            for (alias, canonical, granted) in nested_aliases {
                keep_first(&mut nested, &canonical, granted, &mut report.conflicts);
                report.rewritten_aliases.push((alias, canonical));
            }

            for (key, granted) in nested {
                if keep_first(&mut self.flat, &key, granted, &mut report.conflicts) {
                    report.migrated += 1;
                }
            }
        }

        for conflict in &report.conflicts {
            warn!(
                key = %conflict.key,
                kept = conflict.kept,
                discarded = conflict.discarded,
                "grant encodings disagree; keeping the higher-precedence value"
            );
        }

        report
    }
}

/// Insert `granted` under `key` unless a value is already there.
///
/// Returns true if the value was inserted; a disagreeing existing value is
/// kept and recorded as a conflict.
fn keep_first(
    map: &mut BTreeMap<String, bool>,
    key: &str,
    granted: bool,
    conflicts: &mut Vec<GrantConflict>,
) -> bool {
    match map.get(key) {
        Some(&kept) => {
            if kept != granted {
                conflicts.push(GrantConflict {
                    key: key.to_string(),
                    kept,
                    discarded: granted,
                });
            }
            false
        }
        None => {
            map.insert(key.to_string(), granted);
            true
        }
    }
}

/// Two encodings disagreed about one key during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantConflict {
    pub key: String,
    pub kept: bool,
    pub discarded: bool,
}

/// What [`GrantStore::normalize`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Legacy entries copied into the flat map.
    pub migrated: usize,
    pub conflicts: Vec<GrantConflict>,
    /// `(alias key, canonical key)` pairs that were rewritten.
    pub rewritten_aliases: Vec<(String, String)>,
    /// Legacy entries whose segments cannot form a key.
    pub rejected: Vec<String>,
}

impl NormalizationReport {
    pub fn is_noop(&self) -> bool {
        self.migrated == 0
            && self.conflicts.is_empty()
            && self.rewritten_aliases.is_empty()
            && self.rejected.is_empty()
    }
}
