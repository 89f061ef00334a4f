//! # warden-audit
//!
//! Append-only, SHA-256 hash-chained journal of grant mutations.
//!
//! ## Overview
//!
//! Every mutation the `GrantMutator` accepts, complete or partial, is wrapped
//! in a `JournalEntry` that links to the previous entry through its hash.
//! Editing a stored record, reordering entries, or dropping one breaks the
//! chain and is detected by `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_audit::InMemoryJournal;
//! use warden_core::GrantMutator;
//!
//! let journal = InMemoryJournal::new("portal-north");
//! let mutator = GrantMutator::new(catalog).with_journal(Box::new(journal.clone()));
//! mutator.set_unit(&admin, &mut clerk, "north", "hr", true, Consistency::Atomic)?;
//!
//! assert!(journal.verify_integrity());
//! let export = journal.export();
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use event::{JournalEntry, JournalExport};
pub use memory::InMemoryJournal;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use warden_contracts::{
        catalog::{Capability, Catalog, Tenant, Unit},
        grant::GrantStore,
        mutation::{Consistency, MutationId, MutationRecord, MutationScope, MutationStatus},
        principal::{Principal, Role},
    };
    use warden_core::{traits::MutationJournal, GrantMutator};

    use super::{verify_chain, InMemoryJournal, JournalEntry};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_record(subject: &str, key: &str) -> MutationRecord {
        let mut parts = key.split('.');
        let (t, u, c) = (
            parts.next().unwrap().to_string(),
            parts.next().unwrap().to_string(),
            parts.next().unwrap().to_string(),
        );
        MutationRecord {
            id: MutationId::new(),
            actor: "root".to_string(),
            subject: subject.to_string(),
            scope: MutationScope::Capability {
                tenant: t,
                unit: u,
                capability: c,
            },
            granted: true,
            applied_as: Consistency::Atomic,
            applied: vec![key.to_string()],
            status: MutationStatus::Complete,
            timestamp: Utc::now(),
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![Tenant::new(
                "north",
                "North Factory",
                vec![Unit::new(
                    "hr",
                    "Human Resources",
                    vec![
                        Capability::new("single", "Single Slip"),
                        Capability::new("batch", "Batch Slips"),
                    ],
                )],
            )])
            .unwrap(),
        )
    }

    fn admin() -> Principal {
        Principal::new("root", Role::admin(), GrantStore::new())
    }

    fn clerk(id: &str) -> Principal {
        Principal::new(id, Role::user(), GrantStore::new())
    }

    // ── Chain ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_hash_chain_integrity() {
        let journal = InMemoryJournal::new("portal-integrity");
        journal.append(&make_record("alice", "north.hr.single")).unwrap();
        journal.append(&make_record("alice", "north.hr.batch")).unwrap();
        journal.append(&make_record("bob", "north.hr.single")).unwrap();

        assert_eq!(journal.len(), 3);
        assert!(journal.verify_integrity());
    }

    #[test]
    fn test_tamper_detection() {
        let journal = InMemoryJournal::new("portal-tamper");
        journal.append(&make_record("alice", "north.hr.single")).unwrap();
        journal.append(&make_record("alice", "north.hr.batch")).unwrap();

        {
            let mut state = journal.state.lock().unwrap();
            // Flip a revocation into a grant after the fact.
            state.entries[0].record.granted = false;
        }

        assert!(!journal.verify_integrity());
    }

    #[test]
    fn test_dropped_entry_breaks_chain() {
        let journal = InMemoryJournal::new("portal-drop");
        journal.append(&make_record("alice", "north.hr.single")).unwrap();
        journal.append(&make_record("alice", "north.hr.batch")).unwrap();
        journal.append(&make_record("alice", "north.hr.single")).unwrap();

        let mut entries = journal.export().entries;
        entries.remove(1);
        assert!(!verify_chain(&entries));
    }

    #[test]
    fn test_genesis_and_sequence() {
        let journal = InMemoryJournal::new("portal-seq");
        journal.append(&make_record("alice", "north.hr.single")).unwrap();
        journal.append(&make_record("alice", "north.hr.batch")).unwrap();

        let export = journal.export();
        assert_eq!(export.entries[0].prev_hash, JournalEntry::GENESIS_HASH);
        assert_eq!(export.entries[1].prev_hash, export.entries[0].this_hash);
        for (idx, entry) in export.entries.iter().enumerate() {
            assert_eq!(entry.sequence, idx as u64);
        }
        assert_eq!(export.head_hash, export.entries[1].this_hash);
    }

    #[test]
    fn test_verify_empty() {
        let journal = InMemoryJournal::new("portal-empty");
        assert!(journal.is_empty());
        assert!(journal.verify_integrity());
        assert!(verify_chain(&[]));
        assert_eq!(journal.export().head_hash, "");
    }

    #[test]
    fn test_same_record_different_journal_hashes_differ() {
        let record = make_record("alice", "north.hr.single");
        let a = super::hash_entry("portal-a", 0, &record, JournalEntry::GENESIS_HASH).unwrap();
        let b = super::hash_entry("portal-b", 0, &record, JournalEntry::GENESIS_HASH).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    // ── Mutator integration ───────────────────────────────────────────────────

    #[test]
    fn test_mutator_journals_every_accepted_mutation() {
        let journal = InMemoryJournal::new("portal-north");
        let mutator = GrantMutator::new(catalog()).with_journal(Box::new(journal.clone()));

        let root = admin();
        let mut alice = clerk("alice");
        let mut bob = clerk("bob");

        mutator
            .set_unit(&root, &mut alice, "north", "hr", true, Consistency::Atomic)
            .unwrap();
        mutator
            .set_capability(&root, &mut bob, "north", "hr", "single", true)
            .unwrap();
        mutator
            .set_capability(&root, &mut alice, "north", "hr", "batch", false)
            .unwrap();

        assert_eq!(journal.len(), 3);
        assert!(journal.verify_integrity());

        let alice_entries = journal.entries_for("alice");
        assert_eq!(alice_entries.len(), 2);
        assert_eq!(
            alice_entries[0].record.applied,
            vec!["north.hr.single".to_string(), "north.hr.batch".to_string()]
        );
        assert!(!alice_entries[1].record.granted);
    }

    #[test]
    fn test_rejected_mutation_is_not_journaled() {
        let journal = InMemoryJournal::new("portal-north");
        let mutator = GrantMutator::new(catalog()).with_journal(Box::new(journal.clone()));

        let intruder = clerk("mallory");
        let mut alice = clerk("alice");

        assert!(mutator
            .set_tenant(&intruder, &mut alice, "north", true, Consistency::Sequential)
            .is_err());
        assert!(mutator
            .set_capability(&admin(), &mut alice, "north", "hr", "missing", true)
            .is_err());

        assert!(journal.is_empty());
    }
}
