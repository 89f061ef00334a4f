//! Scenario 2: Legacy Migration
//!
//! bob's grants arrive from the session provider in the legacy nested
//! encoding, with one capability stored under its pre-rename alias and one
//! flat revocation that shadows a nested grant.
//!
//!   1. Decide every leaf with the mixed encoding (provenance shown)
//!   2. Normalize into the canonical flat encoding
//!   3. Decide every leaf again: every decision must be unchanged
//!   4. Re-run the verifier: the legacy alias warning is gone

use warden_contracts::{
    decision::AccessDecision,
    error::WardenResult,
    principal::Principal,
    verify::FindingKind,
};
use warden_core::traits::AccessPolicy;
use warden_policy::CatalogAccessEngine;
use warden_verify::{ConsistencyVerifier, ExpectationTable};

use crate::fixtures::{engine, expectations, legacy_clerk};

/// Decide every catalog leaf for `principal`, in catalog order.
fn decide_all(engine: &CatalogAccessEngine, principal: &Principal) -> Vec<(String, AccessDecision)> {
    engine
        .catalog()
        .leaves()
        .map(|leaf| {
            let decision = engine.decide(
                principal,
                &leaf.tenant.key,
                &leaf.unit.key,
                &leaf.capability.key,
            );
            (leaf.key().to_string(), decision)
        })
        .collect()
}

fn alias_findings(engine: &CatalogAccessEngine, principal: &Principal, table: &ExpectationTable) -> usize {
    ConsistencyVerifier::new(engine, engine.catalog())
        .run(std::slice::from_ref(principal), table)
        .findings_of(FindingKind::LegacyAlias)
        .count()
}

/// Run Scenario 2: Legacy Migration.
pub fn run_scenario() -> WardenResult<()> {
    println!("=== Scenario 2: Legacy Migration ===");
    println!();

    let engine = engine()?;
    let table = expectations();
    let mut bob = legacy_clerk();

    // ── Step 1: mixed encoding ────────────────────────────────────────────────

    println!("  Grants held by bob (mixed legacy/flat encoding):");
    let before = decide_all(&engine, &bob);
    for (key, decision) in before.iter().filter(|(_, d)| d.is_granted()) {
        println!("    {key:<28} {decision}");
    }
    println!(
        "  Legacy alias warnings before: {}",
        alias_findings(&engine, &bob, &table)
    );
    println!();

    // ── Step 2: normalize ─────────────────────────────────────────────────────

    let report = bob.grants.normalize(engine.catalog());
    println!("  Normalization:");
    println!("    migrated from nested form: {}", report.migrated);
    for (alias, canonical) in &report.rewritten_aliases {
        println!("    alias rewritten:           {alias} -> {canonical}");
    }
    for conflict in &report.conflicts {
        println!(
            "    conflict on {}: kept {}, discarded {}",
            conflict.key, conflict.kept, conflict.discarded
        );
    }
    println!();

    // ── Step 3: compare decisions ─────────────────────────────────────────────

    let after = decide_all(&engine, &bob);
    let changed: Vec<&str> = before
        .iter()
        .zip(after.iter())
        .filter(|((_, b), (_, a))| b.is_granted() != a.is_granted())
        .map(|((key, _), _)| key.as_str())
        .collect();
    if changed.is_empty() {
        println!("  Decisions unchanged across all {} leaves: PASS", after.len());
    } else {
        println!("  Decisions changed for: {}", changed.join(", "));
    }

    // ── Step 4: verifier ──────────────────────────────────────────────────────

    println!(
        "  Legacy alias warnings after:  {}",
        alias_findings(&engine, &bob, &table)
    );
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_contracts::decision::GrantSource;

    #[test]
    fn test_scenario_runs() {
        run_scenario().unwrap();
    }

    #[test]
    fn test_legacy_decisions_before_normalization() {
        let engine = engine().unwrap();
        let bob = legacy_clerk();

        assert_eq!(
            engine.decide(&bob, "south", "hr", "single"),
            AccessDecision::granted(GrantSource::LegacyGrant)
        );
        assert!(engine.is_granted(&bob, "north", "hr", "single"), "alias in nested form");
        assert!(
            !engine.is_granted(&bob, "south", "stores", "issue"),
            "flat revocation shadows the nested grant"
        );
    }

    #[test]
    fn test_normalization_preserves_every_decision() {
        let engine = engine().unwrap();
        let mut bob = legacy_clerk();
        let before = decide_all(&engine, &bob);

        let report = bob.grants.normalize(engine.catalog());

        assert_eq!(report.migrated, 3);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].key, "south.stores.issue");
        assert!(!report.conflicts[0].kept);
        assert_eq!(
            report.rewritten_aliases,
            vec![("north.hr.salary_single".to_string(), "north.hr.single".to_string())]
        );
        assert!(!bob.grants.has_legacy());

        let after = decide_all(&engine, &bob);
        for ((key, b), (_, a)) in before.iter().zip(after.iter()) {
            assert_eq!(b.is_granted(), a.is_granted(), "decision changed for {key}");
        }
        assert_eq!(
            engine.decide(&bob, "south", "hr", "single"),
            AccessDecision::granted(GrantSource::FlatGrant)
        );
    }

    #[test]
    fn test_alias_warning_cleared_by_normalization() {
        let engine = engine().unwrap();
        let table = expectations();
        let mut bob = legacy_clerk();

        assert_eq!(alias_findings(&engine, &bob, &table), 1);
        bob.grants.normalize(engine.catalog());
        assert_eq!(alias_findings(&engine, &bob, &table), 0);

        let second = bob.grants.normalize(engine.catalog());
        assert!(second.is_noop(), "normalization is idempotent");
    }
}
