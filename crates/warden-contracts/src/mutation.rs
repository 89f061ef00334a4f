//! Grant mutation types shared by the mutation engine and the journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::PermissionKey;

/// Unique identifier for one applied mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationId(pub uuid::Uuid);

impl MutationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

/// What part of the catalog a mutation targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum MutationScope {
    Capability {
        tenant: String,
        unit: String,
        capability: String,
    },
    Unit {
        tenant: String,
        unit: String,
    },
    Tenant {
        tenant: String,
    },
}

impl std::fmt::Display for MutationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capability {
                tenant,
                unit,
                capability,
            } => write!(f, "capability {tenant}/{unit}/{capability}"),
            Self::Unit { tenant, unit } => write!(f, "unit {tenant}/{unit}"),
            Self::Tenant { tenant } => write!(f, "tenant {tenant}"),
        }
    }
}

/// Consistency tier for multi-key mutations.
///
/// `Atomic` applies every key as one all-or-nothing batch. `Sequential`
/// applies keys one at a time; each write is observable on its own and a
/// failure partway leaves the scope in a mixed grant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Atomic,
    Sequential,
    /// Atomic when the writer supports batches, otherwise sequential.
    /// Outcomes always report the tier that was actually used.
    BestAvailable,
}

/// A single key write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantChange {
    pub key: PermissionKey,
    pub granted: bool,
}

/// The result of an accepted mutation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub id: MutationId,
    pub scope: MutationScope,
    pub granted: bool,
    /// `Atomic` or `Sequential`; never `BestAvailable`.
    pub applied_as: Consistency,
    pub keys: Vec<String>,
}

/// Whether a journaled mutation completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MutationStatus {
    Complete,
    /// A sequential batch stopped at `failed_key`.
    Partial { failed_key: String, reason: String },
}

/// Journal entry for one mutation, complete or partial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub id: MutationId,
    /// The admin principal that requested the change.
    pub actor: String,
    /// The principal whose grants changed.
    pub subject: String,
    pub scope: MutationScope,
    pub granted: bool,
    pub applied_as: Consistency,
    /// Keys that were written, in order.
    pub applied: Vec<String>,
    pub status: MutationStatus,
    pub timestamp: DateTime<Utc>,
}
