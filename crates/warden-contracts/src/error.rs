//! Error taxonomy for the WARDEN authorization engine.
//!
//! Decision paths never surface these to callers: a malformed key or a
//! missing catalog leaf degrades to a denial. Mutation paths return them
//! explicitly, and `Unauthorized` / `PartialBatchFailure` are never swallowed.

use thiserror::Error;

use crate::mutation::MutationOutcome;

/// The unified error type for WARDEN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WardenError {
    /// A tenant, unit, or capability key cannot be used as a key segment.
    #[error("invalid key segment '{segment}': {reason}")]
    InvalidSegment { segment: String, reason: String },

    /// A permission key does not decode to exactly three segments.
    #[error("malformed permission key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    /// The (tenant, unit, capability) target has no matching catalog entry.
    #[error("no catalog entry for '{path}'")]
    CatalogLeafNotFound { path: String },

    /// A grant mutation was attempted by a principal without the admin role.
    #[error("principal '{principal}' with role '{role}' may not perform '{operation}'")]
    Unauthorized {
        principal: String,
        role: String,
        operation: String,
    },

    /// A sequential batch stopped partway through.
    ///
    /// Keys in `applied` are already written and stay written; the scope is
    /// left in a mixed grant state until the caller retries or reverts.
    #[error(
        "batch stopped at '{failed_key}' after {} of {total} keys were applied: {reason}",
        applied.len()
    )]
    PartialBatchFailure {
        applied: Vec<String>,
        failed_key: String,
        total: usize,
        reason: String,
    },

    /// The atomic tier was requested on a writer that cannot apply batches.
    #[error("grant writer '{writer}' does not support atomic batches")]
    BatchUnsupported { writer: String },

    /// A grant backend rejected a single-key write.
    #[error("write of '{key}' failed: {reason}")]
    WriteFailed { key: String, reason: String },

    /// The mutation journal could not record an applied mutation.
    #[error("journal write failed: {reason}")]
    JournalWriteFailed { reason: String },

    /// Every key of a mutation was written but the journal rejected its
    /// record.
    ///
    /// The grants in `outcome` are in effect; retrying the mutation is not
    /// needed, only re-journaling it.
    #[error(
        "mutation {} applied to {} key(s) but was not journaled: {reason}",
        outcome.id.0,
        outcome.keys.len()
    )]
    AppliedNotJournaled {
        outcome: Box<MutationOutcome>,
        reason: String,
    },

    /// A grant document supplied by the session provider has an unusable shape.
    #[error("invalid grant document: {reason}")]
    InvalidGrantDocument { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

/// Convenience alias used throughout the WARDEN crates.
pub type WardenResult<T> = Result<T, WardenError>;
