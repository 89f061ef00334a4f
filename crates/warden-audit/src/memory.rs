//! In-memory implementation of `MutationJournal`.
//!
//! Entries live in a `Vec` behind `Arc<Mutex<_>>`, so clones of the journal
//! share one chain. The mutation engine holds one clone and an operator tool
//! can hold another to export or verify it.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use warden_contracts::{
    error::{WardenError, WardenResult},
    mutation::MutationRecord,
};
use warden_core::traits::MutationJournal;

use crate::{
    chain::{hash_entry, verify_chain},
    event::{JournalEntry, JournalExport},
};

pub(crate) struct JournalState {
    pub(crate) entries: Vec<JournalEntry>,
    pub(crate) head_hash: String,
}

/// An append-only, hash-chained journal of grant mutations.
#[derive(Clone)]
pub struct InMemoryJournal {
    journal_id: String,
    pub(crate) state: Arc<Mutex<JournalState>>,
}

impl InMemoryJournal {
    pub fn new(journal_id: impl Into<String>) -> Self {
        Self {
            journal_id: journal_id.into(),
            state: Arc::new(Mutex::new(JournalState {
                entries: Vec::new(),
                head_hash: JournalEntry::GENESIS_HASH.to_string(),
            })),
        }
    }

    /// Snapshot every entry written so far.
    pub fn export(&self) -> JournalExport {
        let state = self.state.lock().expect("journal state lock poisoned");
        JournalExport {
            journal_id: self.journal_id.clone(),
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            head_hash: state
                .entries
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
        }
    }

    /// Entries whose record changed the grants of `subject`.
    pub fn entries_for(&self, subject: &str) -> Vec<JournalEntry> {
        let state = self.state.lock().expect("journal state lock poisoned");
        state
            .entries
            .iter()
            .filter(|e| e.record.subject == subject)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("journal state lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-check the whole chain.
    pub fn verify_integrity(&self) -> bool {
        let state = self.state.lock().expect("journal state lock poisoned");
        verify_chain(&state.entries)
    }
}

impl MutationJournal for InMemoryJournal {
    fn append(&self, record: &MutationRecord) -> WardenResult<()> {
        let mut state = self.state.lock().map_err(|e| WardenError::JournalWriteFailed {
            reason: format!("journal state lock poisoned: {}", e),
        })?;

        let sequence = state.entries.len() as u64;
        let prev_hash = state.head_hash.clone();
        let this_hash = hash_entry(&self.journal_id, sequence, record, &prev_hash)?;

        debug!(
            journal_id = %self.journal_id,
            sequence,
            mutation_id = %record.id.0,
            "mutation journaled"
        );

        state.entries.push(JournalEntry {
            sequence,
            journal_id: self.journal_id.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.head_hash = this_hash;

        Ok(())
    }
}
