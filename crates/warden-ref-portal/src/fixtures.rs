//! Reference catalog and representative principals.
//!
//! All principals and grants here are fictional. They stand in for what a
//! session provider would hand the engine after sign-in:
//!
//! | Principal | Role  | Grants                                                |
//! |-----------|-------|-------------------------------------------------------|
//! | root      | admin | none (role override)                                  |
//! | alice     | user  | small flat set in north, one explicit revocation      |
//! | bob       | user  | legacy nested document, one alias, one flat override  |
//! | carol     | user  | north production and head office; nothing in south    |
//! | dave      | user  | drifted: orphan, malformed and orphan legacy entries  |

use warden_contracts::{
    error::WardenResult,
    grant::{GrantStore, LegacyGrants},
    principal::{Principal, ProvisioningScope, Role},
};
use warden_policy::CatalogAccessEngine;
use warden_verify::ExpectationTable;

/// Embedded reference portal configuration.
pub const PORTAL_TOML: &str = include_str!("../config/portal.toml");

/// Build the decision engine over the reference catalog.
pub fn engine() -> WardenResult<CatalogAccessEngine> {
    CatalogAccessEngine::from_toml_str(PORTAL_TOML)
}

pub fn admin() -> Principal {
    Principal::new("root", Role::admin(), GrantStore::new())
}

/// A principal holding a small explicit flat grant set.
pub fn flat_clerk() -> Principal {
    Principal::new(
        "alice",
        Role::user(),
        GrantStore::from_flat([
            ("north.hr.single", true),
            ("north.hr.batch", true),
            ("north.hr.reports", false),
            ("north.stores.issue", true),
        ]),
    )
    .with_scope(ProvisioningScope {
        tenants: vec!["north".to_string()],
        units: vec!["hr".to_string(), "stores".to_string()],
    })
}

/// A principal whose grants still use the legacy nested encoding.
///
/// `north.hr.salary_single` is the pre-rename key of `north.hr.single`, and
/// the flat `false` for `south.stores.issue` shadows the nested `true`.
pub fn legacy_clerk() -> Principal {
    let grants = GrantStore::from_flat([("south.stores.issue", false)]).with_legacy(legacy([
        ("south", "hr", "single", true),
        ("south", "hr", "batch", true),
        ("south", "stores", "issue", true),
        ("north", "hr", "salary_single", true),
    ]));
    Principal::new("bob", Role::user(), grants)
}

/// A principal with grants elsewhere but none under the south tenant.
pub fn outsider() -> Principal {
    Principal::new(
        "carol",
        Role::user(),
        GrantStore::from_flat([
            ("north.production.plan", true),
            ("north.production.dispatch", true),
            ("head_office.finance.ledger", true),
        ]),
    )
}

/// A principal whose grants drifted from the catalog.
///
/// `north.hr.overtime` was retired from the catalog, `north.stores` was
/// written by a backend that skipped key validation, and the legacy canteen
/// department no longer exists.
pub fn drifted() -> Principal {
    let grants = GrantStore::from_flat([
        ("north.hr.single", true),
        ("north.hr.overtime", true),
        ("north.stores", true),
    ])
    .with_legacy(legacy([("south", "canteen", "menu", true)]));
    Principal::new("dave", Role::user(), grants)
}

/// Nest `(tenant, unit, capability, granted)` rows into the legacy encoding.
fn legacy<const N: usize>(rows: [(&str, &str, &str, bool); N]) -> LegacyGrants {
    let mut nested = LegacyGrants::new();
    for (tenant, unit, capability, granted) in rows {
        nested
            .entry(tenant.to_string())
            .or_default()
            .entry(unit.to_string())
            .or_default()
            .insert(capability.to_string(), granted);
    }
    nested
}

/// The four principals every verifier run covers.
pub fn representatives() -> Vec<Principal> {
    vec![admin(), flat_clerk(), legacy_clerk(), outsider()]
}

/// Look up any fixture principal by id.
pub fn principal(id: &str) -> Option<Principal> {
    match id {
        "root" => Some(admin()),
        "alice" => Some(flat_clerk()),
        "bob" => Some(legacy_clerk()),
        "carol" => Some(outsider()),
        "dave" => Some(drifted()),
        _ => None,
    }
}

/// Expected decisions for the representative principals.
pub fn expectations() -> ExpectationTable {
    ExpectationTable::new()
        .expect_default("root", true)
        .expect_default("alice", false)
        .expect("alice", "north.hr.single", true)
        .expect("alice", "north.hr.batch", true)
        .expect("alice", "north.stores.issue", true)
        .expect_default("bob", false)
        .expect("bob", "north.hr.single", true)
        .expect("bob", "south.hr.single", true)
        .expect("bob", "south.hr.batch", true)
        .expect_default("carol", false)
        .expect("carol", "north.production.plan", true)
        .expect("carol", "north.production.dispatch", true)
        .expect("carol", "head_office.finance.ledger", true)
}

/// Expectations for the drifted principal, including one for the retired
/// overtime capability.
pub fn drift_expectations() -> ExpectationTable {
    ExpectationTable::new()
        .expect_default("dave", false)
        .expect("dave", "north.hr.single", true)
        .expect("dave", "north.hr.overtime", true)
}
