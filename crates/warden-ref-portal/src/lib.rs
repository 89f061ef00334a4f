//! # warden-ref-portal
//!
//! Operations-portal reference runtime for the WARDEN authorization engine.
//!
//! Ships a factory → department → service catalog, a set of representative
//! principals covering every grant encoding, and three runnable scenarios:
//!
//! 1. **Batch Toggle**: atomic and sequential unit/tenant mutations, the
//!    non-admin rejection path, and a partial batch leaving a mixed state.
//! 2. **Legacy Migration**: nested and alias-keyed grants resolving exactly
//!    like their canonical flat equivalents, before and after normalization.
//! 3. **Catalog Drift**: the consistency verifier flagging orphan grants,
//!    malformed keys and duplicated catalog definitions.
//!
//! All principals and grants are fictional.

pub mod fixtures;
pub mod scenarios;
pub mod session;

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use warden_contracts::decision::GrantState;
    use warden_core::traits::AccessPolicy;

    use crate::fixtures::{admin, drifted, engine, flat_clerk, legacy_clerk, outsider, principal, PORTAL_TOML};

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reference_catalog_loads() {
        let engine = engine().unwrap();
        assert_eq!(engine.catalog().tenants().len(), 3);
        assert_eq!(engine.catalog().leaf_count(), 12);
        assert!(engine.catalog().duplicates().is_empty());
        assert!(PORTAL_TOML.contains("legacy_alias"));
    }

    #[test]
    fn test_accessible_tenants_per_principal() {
        let engine = engine().unwrap();
        assert_eq!(engine.accessible_tenants(&admin()), set(&["head_office", "north", "south"]));
        assert_eq!(engine.accessible_tenants(&flat_clerk()), set(&["north"]));
        assert_eq!(engine.accessible_tenants(&legacy_clerk()), set(&["north", "south"]));
        assert_eq!(engine.accessible_tenants(&outsider()), set(&["head_office", "north"]));
    }

    #[test]
    fn test_outsider_has_nothing_in_south() {
        let engine = engine().unwrap();
        let carol = outsider();
        for unit in engine.catalog().tenant("south").unwrap().units.iter() {
            for cap in &unit.capabilities {
                assert!(!engine.is_granted(&carol, "south", &unit.key, &cap.key));
            }
        }
        assert_eq!(engine.tenant_state(&carol, "south"), GrantState::None);
        assert!(engine.accessible_units(&carol, "south").is_empty());
    }

    #[test]
    fn test_empty_department_never_full() {
        let engine = engine().unwrap();
        assert!(!engine.is_unit_fully_granted(&admin(), "south", "quality"));
        assert_eq!(engine.unit_state(&admin(), "south", "quality"), GrantState::None);
        assert!(
            !engine.is_tenant_fully_granted(&admin(), "south"),
            "an empty department keeps its factory from being full"
        );
        assert!(engine.is_tenant_fully_granted(&admin(), "north"));
    }

    #[test]
    fn test_mixed_encoding_fixtures_hold_both_encodings() {
        let bob = legacy_clerk();
        assert_eq!(bob.grants.flat_value("south.stores.issue"), Some(false));
        assert_eq!(bob.grants.legacy_value("north", "hr", "salary_single"), Some(true));
        assert_eq!(bob.grants.legacy_entries().count(), 4);

        let dave = drifted();
        assert_eq!(dave.grants.flat_entries().count(), 3);
        assert_eq!(dave.grants.flat_value("north.stores"), Some(true));
        assert_eq!(dave.grants.legacy_value("south", "canteen", "menu"), Some(true));
    }

    #[test]
    fn test_legacy_clerk_decisions_follow_both_encodings() {
        let engine = engine().unwrap();
        let bob = legacy_clerk();
        assert!(engine.is_granted(&bob, "south", "hr", "single"));
        assert!(engine.is_granted(&bob, "north", "hr", "single"), "alias grant");
        assert!(!engine.is_granted(&bob, "south", "stores", "issue"), "flat revocation wins");
    }

    #[test]
    fn test_fixture_lookup() {
        for id in ["root", "alice", "bob", "carol", "dave"] {
            assert_eq!(principal(id).map(|p| p.id.0), Some(id.to_string()));
        }
        assert!(principal("mallory").is_none());
    }
}
