//! Access decision and aggregate grant-state types.
//!
//! The decision engine produces an `AccessDecision` for every check. It is
//! deny-by-default: anything that is not positively granted is `Denied`.

use serde::{Deserialize, Serialize};

/// Why a check was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    /// The principal's role bypasses grant checks.
    RoleOverride,
    /// The grant store holds the reserved wildcard key.
    Wildcard,
    /// A flat grant store entry, canonical or legacy-alias key.
    FlatGrant,
    /// The legacy nested encoding.
    LegacyGrant,
}

/// Why a check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Neither encoding holds an entry for the key.
    NoGrant,
    /// An entry exists and is `false`.
    ExplicitlyRevoked,
    /// The target is not a live catalog leaf.
    LeafNotFound,
    /// The target segments cannot form a permission key.
    InvalidTarget,
}

/// The outcome of one access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccessDecision {
    Granted { source: GrantSource },
    Denied { reason: DenyReason },
}

impl AccessDecision {
    pub fn granted(source: GrantSource) -> Self {
        Self::Granted { source }
    }

    pub fn denied(reason: DenyReason) -> Self {
        Self::Denied { reason }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

impl std::fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted { source } => write!(f, "granted ({source:?})"),
            Self::Denied { reason } => write!(f, "denied ({reason:?})"),
        }
    }
}

/// Aggregate state of a unit or tenant, for tri-state checkboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
    /// Every capability below is granted. Never true for an empty scope.
    Full,
    /// Some but not all capabilities below are granted.
    Partial,
    /// Nothing below is granted, or the scope is empty.
    None,
}

impl GrantState {
    /// Combine child states into a parent state.
    ///
    /// An empty iterator yields `None`: an empty scope is never complete.
    pub fn aggregate(states: impl IntoIterator<Item = GrantState>) -> GrantState {
        let mut any = false;
        let mut all_full = true;
        let mut any_granted = false;
        for state in states {
            any = true;
            match state {
                GrantState::Full => any_granted = true,
                GrantState::Partial => {
                    any_granted = true;
                    all_full = false;
                }
                GrantState::None => all_full = false,
            }
        }
        match (any, all_full, any_granted) {
            (false, _, _) => GrantState::None,
            (true, true, _) => GrantState::Full,
            (true, false, true) => GrantState::Partial,
            (true, false, false) => GrantState::None,
        }
    }

    pub fn from_granted(granted: bool) -> GrantState {
        if granted {
            GrantState::Full
        } else {
            GrantState::None
        }
    }
}

impl std::fmt::Display for GrantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::None => "none",
        })
    }
}

/// One capability in a [`TenantNode`] tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityNode {
    pub key: String,
    pub name: String,
    pub decision: AccessDecision,
}

/// One unit in a [`TenantNode`] tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitNode {
    pub key: String,
    pub name: String,
    pub state: GrantState,
    pub capabilities: Vec<CapabilityNode>,
}

/// A tenant with the resolved state of everything under it, as consumed by
/// a tree editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantNode {
    pub key: String,
    pub name: String,
    pub state: GrantState,
    pub units: Vec<UnitNode>,
}
