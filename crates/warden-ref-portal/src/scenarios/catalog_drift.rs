//! Scenario 3: Catalog Drift
//!
//! Runs the consistency verifier the way an operator would after a catalog
//! release.
//!
//!   1. Representative principals against the expectation table → clean
//!   2. A principal whose grants drifted from the catalog → orphan,
//!      malformed and orphan-legacy findings, plus one failing expectation
//!      for a retired capability that now denies
//!   3. A catalog edit that defines a tenant twice → duplicate finding

use warden_contracts::{
    error::WardenResult,
    verify::ConsistencyReport,
};
use warden_policy::CatalogAccessEngine;
use warden_verify::ConsistencyVerifier;

use crate::fixtures::{drift_expectations, drifted, engine, expectations, representatives, PORTAL_TOML};

/// A catalog edit that pasted the head office block a second time.
const DUPLICATED_TENANT: &str = r#"
[[tenants]]
key = "head_office"
name = "Head Office (copy)"

  [[tenants.units]]
  key = "finance"
  name = "Finance"
"#;

fn print_report(report: &ConsistencyReport) {
    println!(
        "    checks: {} passed, {} failed, {} unchecked",
        report.passed(),
        report.failed(),
        report.unchecked()
    );
    for check in report.failures() {
        println!(
            "    FAIL {} {}: expected {}, got {}",
            check.principal,
            check.key,
            check.expected.map_or("-".to_string(), |e| e.to_string()),
            check.decision
        );
    }
    for finding in &report.findings {
        println!(
            "    WARN [{:?}] {}: {}",
            finding.kind,
            finding.principal.as_deref().unwrap_or("catalog"),
            finding.message
        );
    }
}

/// Engine over the reference catalog with the head office defined twice.
pub fn duplicated_engine() -> WardenResult<CatalogAccessEngine> {
    CatalogAccessEngine::from_toml_str(&format!("{}\n{}", PORTAL_TOML, DUPLICATED_TENANT))
}

/// Run Scenario 3: Catalog Drift.
pub fn run_scenario() -> WardenResult<()> {
    println!("=== Scenario 3: Catalog Drift ===");
    println!();

    let engine = engine()?;

    // ── Step 1: representative principals ─────────────────────────────────────

    println!("  Representative principals (root, alice, bob, carol):");
    let report = ConsistencyVerifier::new(&engine, engine.catalog()).run(&representatives(), &expectations());
    print_report(&report);
    println!("    result: {}", if report.is_clean() { "CLEAN" } else { "FAILED" });
    println!();

    // ── Step 2: drifted principal ─────────────────────────────────────────────

    println!("  Drifted principal (dave):");
    let report = ConsistencyVerifier::new(&engine, engine.catalog()).run(&[drifted()], &drift_expectations());
    print_report(&report);
    println!();

    // ── Step 3: duplicated catalog definition ─────────────────────────────────

    println!("  Catalog with a duplicated tenant:");
    let duplicated = duplicated_engine()?;
    let report = ConsistencyVerifier::new(&duplicated, duplicated.catalog()).run(&[], &Default::default());
    print_report(&report);
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_contracts::{
        decision::{AccessDecision, DenyReason},
        verify::{CheckStatus, FindingKind},
    };
    use warden_core::traits::AccessPolicy;

    #[test]
    fn test_scenario_runs() {
        run_scenario().unwrap();
    }

    #[test]
    fn test_representatives_are_clean() {
        let engine = engine().unwrap();
        let report = ConsistencyVerifier::new(&engine, engine.catalog()).run(&representatives(), &expectations());

        assert!(report.is_clean(), "failures: {:?}", report.failures().collect::<Vec<_>>());
        assert_eq!(report.checks.len(), 4 * 12);
        assert_eq!(report.unchecked(), 0);
        assert_eq!(report.findings_of(FindingKind::OrphanGrant).count(), 0);
        assert_eq!(report.findings_of(FindingKind::LegacyAlias).count(), 1, "bob's salary_single");
    }

    #[test]
    fn test_drift_is_reported_and_fails_closed() {
        let engine = engine().unwrap();
        let dave = drifted();
        let report = ConsistencyVerifier::new(&engine, engine.catalog()).run(std::slice::from_ref(&dave), &drift_expectations());

        let kinds = |kind| report.findings_of(kind).map(|f| f.key.clone()).collect::<Vec<_>>();
        assert_eq!(kinds(FindingKind::OrphanGrant), vec!["north.hr.overtime"]);
        assert_eq!(kinds(FindingKind::MalformedKey), vec!["north.stores"]);
        assert_eq!(kinds(FindingKind::OrphanLegacyGrant), vec!["south.canteen.menu"]);
        assert_eq!(kinds(FindingKind::ExpectationOutsideCatalog), vec!["north.hr.overtime"]);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, "north.hr.overtime");
        assert!(!failures[0].in_catalog);
        assert_eq!(failures[0].status, CheckStatus::Fail);

        assert_eq!(
            engine.decide(&dave, "north", "hr", "overtime"),
            AccessDecision::denied(DenyReason::LeafNotFound)
        );
        assert!(engine.is_granted(&dave, "north", "hr", "single"));
    }

    #[test]
    fn test_duplicate_tenant_reported() {
        let engine = duplicated_engine().unwrap();
        let report = ConsistencyVerifier::new(&engine, engine.catalog()).run(&[], &Default::default());

        let dups: Vec<_> = report.findings_of(FindingKind::DuplicateCatalogKey).collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].key, "head_office");
        assert!(report.checks.is_empty());
    }
}
