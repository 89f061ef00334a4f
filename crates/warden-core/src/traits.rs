//! Core trait definitions for WARDEN.
//!
//! These three traits are the seams between the engine and its collaborators:
//!
//! - `AccessPolicy`: answers access checks (read path, never mutates)
//! - `GrantWriter`: the grant backend a mutation writes into
//! - `MutationJournal`: records every accepted mutation
//!
//! The mutation engine and the verifier are written against these traits,
//! so hosting applications can swap the session backend or journal without
//! touching the engine.

use warden_contracts::{
    decision::AccessDecision,
    error::WardenResult,
    key::PermissionKey,
    mutation::{GrantChange, MutationRecord},
    principal::Principal,
};

/// The read path: decides whether a principal may use a capability.
///
/// Implementations must be pure and infallible. Anything that would be an
/// error (malformed segments, unknown leaves) is reported as a denial so that
/// authorization always fails closed.
pub trait AccessPolicy: Send + Sync {
    /// Decide a single (tenant, unit, capability) check.
    fn decide(&self, principal: &Principal, tenant: &str, unit: &str, capability: &str) -> AccessDecision;

    /// Shorthand for `decide(..).is_granted()`.
    fn is_granted(&self, principal: &Principal, tenant: &str, unit: &str, capability: &str) -> bool {
        self.decide(principal, tenant, unit, capability).is_granted()
    }
}

/// A grant backend the mutation engine writes into.
///
/// Backends that cannot apply several keys as one unit keep the default
/// `supports_batch() == false`; the engine then only offers them the
/// sequential tier.
pub trait GrantWriter {
    /// Identifier of the principal whose grants this writer updates.
    fn subject(&self) -> &str;

    /// Write one key. Each call is independently observable.
    fn write(&mut self, key: &PermissionKey, granted: bool) -> WardenResult<()>;

    /// True if `write_batch` applies all changes or none of them.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Apply every change as one all-or-nothing operation.
    ///
    /// Only called when `supports_batch()` returns true.
    fn write_batch(&mut self, changes: &[GrantChange]) -> WardenResult<()> {
        let _ = changes;
        Err(warden_contracts::error::WardenError::BatchUnsupported {
            writer: self.subject().to_string(),
        })
    }
}

/// Append-only record of accepted grant mutations.
pub trait MutationJournal: Send + Sync {
    /// Append one record. Records are never modified once written.
    fn append(&self, record: &MutationRecord) -> WardenResult<()>;
}

/// The in-memory grant store of a principal is a batch-capable writer:
/// a batch is staged on a copy and swapped in only when every key applied.
impl GrantWriter for Principal {
    fn subject(&self) -> &str {
        &self.id.0
    }

    fn write(&mut self, key: &PermissionKey, granted: bool) -> WardenResult<()> {
        self.grants.set(key, granted);
        Ok(())
    }

    fn supports_batch(&self) -> bool {
        true
    }

    fn write_batch(&mut self, changes: &[GrantChange]) -> WardenResult<()> {
        let mut staged = self.grants.clone();
        for change in changes {
            staged.set(&change.key, change.granted);
        }
        self.grants = staged;
        Ok(())
    }
}
