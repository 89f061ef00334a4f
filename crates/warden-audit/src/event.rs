//! Journal entry and export types.
//!
//! `JournalEntry` wraps one `MutationRecord` with its position in the chain
//! and the SHA-256 hashes that link it to the previous entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_contracts::mutation::MutationRecord;

/// A single link in the mutation hash chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    /// Name of the journal this entry belongs to (e.g. a portal instance).
    pub journal_id: String,

    pub record: MutationRecord,

    /// Hex SHA-256 of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Hex SHA-256 over (journal_id, sequence, prev_hash, record JSON).
    pub this_hash: String,
}

impl JournalEntry {
    /// The `prev_hash` of the first entry in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A snapshot of a journal, suitable for shipping to long-term storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalExport {
    pub journal_id: String,
    pub entries: Vec<JournalEntry>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last entry; empty when the journal is empty.
    pub head_hash: String,
}
