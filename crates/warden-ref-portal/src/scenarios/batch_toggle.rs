//! Scenario 1: Batch Toggle
//!
//! An administrator edits alice's grants the way the tree editor does: by
//! toggling whole departments and factories.
//!
//!   1. Atomic unit grant on north/stores (in-memory writer, batch capable)
//!   2. A non-admin attempts the same edit → Unauthorized
//!   3. Sequential tenant revocation through a session writer with one
//!      locked key → PartialBatchFailure, north left in a mixed state
//!   4. Journal integrity verified at the end

use std::sync::Arc;

use warden_audit::InMemoryJournal;
use warden_contracts::{
    decision::GrantState,
    error::{WardenError, WardenResult},
    mutation::Consistency,
};
use warden_core::GrantMutator;

use crate::{
    fixtures::{admin, engine, flat_clerk, outsider},
    session::SessionGrantWriter,
};

/// Key held open by another session during the tenant revocation.
const LOCKED_KEY: &str = "north.stores.issue";

/// Run Scenario 1: Batch Toggle.
pub fn run_scenario() -> WardenResult<()> {
    println!("=== Scenario 1: Batch Toggle ===");
    println!();

    let engine = engine()?;
    let journal = InMemoryJournal::new("portal-batch-toggle");
    let mutator = GrantMutator::new(Arc::clone(engine.catalog()))
        .with_admin_role(engine.settings().admin_role())
        .with_journal(Box::new(journal.clone()));

    let root = admin();
    let mut alice = flat_clerk();

    // ── Step 1: atomic unit grant ─────────────────────────────────────────────

    println!("  north/stores for alice before: {}", engine.unit_state(&alice, "north", "stores"));
    let outcome = mutator.set_unit(&root, &mut alice, "north", "stores", true, Consistency::Atomic)?;
    println!(
        "  set_unit(north/stores, grant) applied {:?}: {}",
        outcome.applied_as,
        outcome.keys.join(", ")
    );
    println!("  north/stores for alice after:  {}", engine.unit_state(&alice, "north", "stores"));
    println!();

    // ── Step 2: non-admin attempt ─────────────────────────────────────────────

    let carol = outsider();
    match mutator.set_unit(&carol, &mut alice, "north", "hr", false, Consistency::Atomic) {
        Err(WardenError::Unauthorized { principal, role, .. }) => {
            println!("  carol ({role}) tried to revoke north/hr: REJECTED for {principal}");
        }
        Err(e) => return Err(e),
        Ok(_) => println!("  carol's edit was accepted (unexpected)"),
    }
    println!();

    // ── Step 3: sequential tenant revocation with a locked key ───────────────

    let mut session = SessionGrantWriter::new(alice).lock(LOCKED_KEY);
    match mutator.set_tenant(&root, &mut session, "north", false, Consistency::BestAvailable) {
        Err(WardenError::PartialBatchFailure {
            applied,
            failed_key,
            total,
            ..
        }) => {
            println!("  set_tenant(north, revoke) via session store stopped at {failed_key}");
            println!("  applied {} of {total}: {}", applied.len(), applied.join(", "));
        }
        Err(e) => return Err(e),
        Ok(outcome) => println!("  set_tenant applied {} key(s)", outcome.keys.len()),
    }
    let alice = session.into_principal();
    let state = engine.tenant_state(&alice, "north");
    println!("  north for alice after partial revoke: {state}");
    if state == GrantState::Partial {
        println!("  (mixed grant state: the sequential tier cannot roll back)");
    }
    println!();

    // ── Step 4: journal ───────────────────────────────────────────────────────

    let export = journal.export();
    println!(
        "  Mutation journal integrity: {} ({} entr{} in chain)",
        if journal.verify_integrity() { "VERIFIED" } else { "FAILED" },
        export.entries.len(),
        if export.entries.len() == 1 { "y" } else { "ies" }
    );
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_contracts::mutation::MutationStatus;
    use warden_core::traits::AccessPolicy;

    fn setup() -> (warden_policy::CatalogAccessEngine, GrantMutator, InMemoryJournal) {
        let engine = engine().unwrap();
        let journal = InMemoryJournal::new("test");
        let mutator = GrantMutator::new(Arc::clone(engine.catalog())).with_journal(Box::new(journal.clone()));
        (engine, mutator, journal)
    }

    #[test]
    fn test_scenario_runs() {
        run_scenario().unwrap();
    }

    #[test]
    fn test_atomic_unit_grant_fills_the_unit() {
        let (engine, mutator, journal) = setup();
        let mut alice = flat_clerk();
        assert_eq!(engine.unit_state(&alice, "north", "stores"), GrantState::Partial);

        let outcome = mutator
            .set_unit(&admin(), &mut alice, "north", "stores", true, Consistency::Atomic)
            .unwrap();

        assert_eq!(outcome.applied_as, Consistency::Atomic);
        assert_eq!(outcome.keys, vec!["north.stores.issue", "north.stores.receive"]);
        assert!(engine.is_unit_fully_granted(&alice, "north", "stores"));
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn test_session_writer_falls_back_to_sequential() {
        let (engine, mutator, _journal) = setup();
        let mut session = SessionGrantWriter::new(outsider());

        let outcome = mutator
            .set_unit(&admin(), &mut session, "south", "hr", true, Consistency::BestAvailable)
            .unwrap();
        assert_eq!(outcome.applied_as, Consistency::Sequential);
        assert_eq!(session.requests(), 2);
        assert!(engine.is_unit_fully_granted(session.principal(), "south", "hr"));

        let err = mutator
            .set_unit(&admin(), &mut session, "south", "hr", false, Consistency::Atomic)
            .unwrap_err();
        assert!(matches!(err, WardenError::BatchUnsupported { .. }));
        assert!(engine.is_unit_fully_granted(session.principal(), "south", "hr"));
    }

    #[test]
    fn test_locked_key_leaves_tenant_mixed() {
        let (engine, mutator, journal) = setup();
        let mut session = SessionGrantWriter::new(flat_clerk()).lock(LOCKED_KEY);

        let err = mutator
            .set_tenant(&admin(), &mut session, "north", false, Consistency::Sequential)
            .unwrap_err();
        match err {
            WardenError::PartialBatchFailure {
                applied,
                failed_key,
                total,
                ..
            } => {
                assert_eq!(failed_key, LOCKED_KEY);
                assert_eq!(total, 7);
                assert_eq!(applied, vec!["north.hr.single", "north.hr.batch", "north.hr.reports"]);
            }
            other => panic!("expected PartialBatchFailure, got {:?}", other),
        }

        let alice = session.into_principal();
        assert!(!engine.is_granted(&alice, "north", "hr", "single"));
        assert!(engine.is_granted(&alice, "north", "stores", "issue"));
        assert_eq!(engine.tenant_state(&alice, "north"), GrantState::Partial);

        let entries = journal.export().entries;
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0].record.status, MutationStatus::Partial { .. }));
        assert!(journal.verify_integrity());
    }

    #[test]
    fn test_non_admin_cannot_toggle() {
        let (_engine, mutator, journal) = setup();
        let mut alice = flat_clerk();
        let before = alice.clone();

        let err = mutator
            .set_unit(&outsider(), &mut alice, "north", "hr", false, Consistency::Atomic)
            .unwrap_err();
        assert!(matches!(err, WardenError::Unauthorized { .. }));
        assert_eq!(alice, before);
        assert!(journal.is_empty());
    }
}
