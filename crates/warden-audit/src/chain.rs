//! Hash-chain primitives for the mutation journal.
//!
//! Hash input layout (bytes, in order):
//!   1. journal_id as UTF-8
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 (64 hex chars)
//!   4. serde_json encoding of the record

use sha2::{Digest, Sha256};

use warden_contracts::{
    error::{WardenError, WardenResult},
    mutation::MutationRecord,
};

use crate::event::JournalEntry;

/// Compute the lowercase hex SHA-256 hash of one journal entry.
pub fn hash_entry(
    journal_id: &str,
    sequence: u64,
    record: &MutationRecord,
    prev_hash: &str,
) -> WardenResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| WardenError::JournalWriteFailed {
        reason: format!("mutation record is not serializable: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(journal_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify prev-hash linkage, hash correctness, and sequence continuity.
///
/// An empty chain is valid.
pub fn verify_chain(entries: &[JournalEntry]) -> bool {
    let mut expected_prev = JournalEntry::GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }

        match hash_entry(&entry.journal_id, entry.sequence, &entry.record, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }

        expected_prev = entry.this_hash.clone();
    }

    true
}
