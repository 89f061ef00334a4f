//! Consistency report types produced by the verifier harness.
//!
//! The verifier never fails: every problem it finds becomes a record in a
//! `ConsistencyReport`.

use serde::{Deserialize, Serialize};

use crate::decision::AccessDecision;

/// Pass/fail status of one leaf check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    /// No expectation was recorded for this principal and leaf.
    Unchecked,
}

/// The decision for one (principal, leaf) pair compared with the
/// expectation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCheck {
    pub principal: String,
    pub key: String,
    pub in_catalog: bool,
    pub decision: AccessDecision,
    pub expected: Option<bool>,
    pub status: CheckStatus,
}

/// Kind of data-integrity warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A flat grant key decodes but names no live catalog leaf.
    OrphanGrant,
    /// A legacy nested grant names no live catalog leaf.
    OrphanLegacyGrant,
    /// A flat grant key does not decode to three segments.
    MalformedKey,
    /// A grant is stored under a capability's legacy alias.
    LegacyAlias,
    /// The catalog defines a key twice under the same parent.
    DuplicateCatalogKey,
    /// The expectation table references a leaf that is not in the catalog.
    ExpectationOutsideCatalog,
}

/// One warning raised by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// `None` for catalog-level findings.
    pub principal: Option<String>,
    pub key: String,
    pub kind: FindingKind,
    pub message: String,
}

/// Everything one verifier run observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub checks: Vec<LeafCheck>,
    pub findings: Vec<Finding>,
}

impl ConsistencyReport {
    pub fn passed(&self) -> usize {
        self.count(CheckStatus::Pass)
    }

    pub fn failed(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn unchecked(&self) -> usize {
        self.count(CheckStatus::Unchecked)
    }

    /// True when no leaf check failed. Findings are warnings and do not
    /// affect this.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &LeafCheck> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }

    pub fn findings_of(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}
