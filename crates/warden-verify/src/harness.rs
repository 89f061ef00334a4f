//! The consistency verifier harness.
//!
//! `ConsistencyVerifier` cross-checks a decision engine against the catalog
//! for a set of representative principals. It runs three passes:
//!
//! 1. **Catalog**: every key defined twice under one parent, and every alias
//!    colliding with a sibling key, becomes a `DuplicateCatalogKey` finding.
//! 2. **Forward**: for each principal, every live leaf is decided through the
//!    `AccessPolicy` and compared with the expectation table. Expectations
//!    naming leaves outside the catalog are decided too and flagged.
//! 3. **Reverse**: every key in each principal's grant store, flat and
//!    legacy nested, must resolve to a live leaf. Keys that do not are
//!    reported as orphans or malformed keys; keys stored under a legacy
//!    alias are reported as `LegacyAlias`.
//!
//! The verifier never fails. Every problem is a record in the report.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use warden_contracts::{
    catalog::{Catalog, DuplicateKind},
    decision::{AccessDecision, DenyReason},
    key::{PermissionKey, WILDCARD},
    principal::Principal,
    verify::{CheckStatus, ConsistencyReport, Finding, FindingKind, LeafCheck},
};
use warden_core::traits::AccessPolicy;

use crate::expectations::ExpectationTable;

/// Offline harness comparing decisions with expectations.
pub struct ConsistencyVerifier<'a> {
    policy: &'a dyn AccessPolicy,
    catalog: &'a Catalog,
}

impl<'a> ConsistencyVerifier<'a> {
    /// `catalog` should be the same catalog `policy` decides against.
    pub fn new(policy: &'a dyn AccessPolicy, catalog: &'a Catalog) -> Self {
        Self { policy, catalog }
    }

    /// Run every pass for `principals` and collect the report.
    pub fn run(&self, principals: &[Principal], expectations: &ExpectationTable) -> ConsistencyReport {
        let mut report = ConsistencyReport::default();

        self.check_catalog(&mut report);
        for principal in principals {
            self.forward_pass(principal, expectations, &mut report);
            self.reverse_pass(principal, &mut report);
        }

        let known: HashSet<&str> = principals.iter().map(|p| p.id.0.as_str()).collect();
        for name in expectations.principals().filter(|n| !known.contains(n)) {
            warn!(principal = name, "expectations recorded for a principal that was not verified");
        }

        info!(
            principals = principals.len(),
            leaves = self.catalog.leaf_count(),
            passed = report.passed(),
            failed = report.failed(),
            unchecked = report.unchecked(),
            findings = report.findings.len(),
            "consistency verification finished"
        );
        report
    }

    // ── Passes ────────────────────────────────────────────────────────────────

    fn check_catalog(&self, report: &mut ConsistencyReport) {
        for duplicate in self.catalog.duplicates() {
            let message = match duplicate.kind {
                DuplicateKind::AliasCollision => format!(
                    "legacy alias '{}' collides with another key in the same unit",
                    duplicate.path
                ),
                ref kind => format!(
                    "{:?} key '{}' is defined more than once; only the first definition is used",
                    kind, duplicate.path
                ),
            };
            push_finding(report, None, duplicate.path, FindingKind::DuplicateCatalogKey, message);
        }
    }

    fn forward_pass(
        &self,
        principal: &Principal,
        expectations: &ExpectationTable,
        report: &mut ConsistencyReport,
    ) {
        let name = principal.id.0.as_str();
        let mut seen: HashSet<String> = HashSet::new();

        for leaf in self.catalog.leaves() {
            let key = leaf.key().to_string();
            seen.insert(key.clone());
            let decision = self.policy.decide(
                principal,
                &leaf.tenant.key,
                &leaf.unit.key,
                &leaf.capability.key,
            );
            let expected = expectations.expected(name, &key);
            report.checks.push(check(name, key, true, decision, expected));
        }

        for (key, expected) in expectations.explicit_keys(name) {
            if seen.contains(key) || self.catalog.resolve_encoded(key).is_some() {
                continue;
            }
            let decision = match PermissionKey::decode(key) {
                Ok(k) => self.policy.decide(principal, k.tenant(), k.unit(), k.capability()),
                Err(_) => AccessDecision::denied(DenyReason::InvalidTarget),
            };
            push_finding(
                report,
                Some(name),
                key.to_string(),
                FindingKind::ExpectationOutsideCatalog,
                format!("expectation references '{key}', which is not a catalog leaf"),
            );
            report
                .checks
                .push(check(name, key.to_string(), false, decision, Some(expected)));
        }
    }

    fn reverse_pass(&self, principal: &Principal, report: &mut ConsistencyReport) {
        let name = principal.id.0.as_str();

        for (key, _) in principal.grants.flat_entries() {
            if key == WILDCARD {
                continue;
            }
            let decoded = match PermissionKey::decode(key) {
                Ok(k) => k,
                Err(e) => {
                    push_finding(
                        report,
                        Some(name),
                        key.to_string(),
                        FindingKind::MalformedKey,
                        e.to_string(),
                    );
                    continue;
                }
            };
            match self
                .catalog
                .resolve(decoded.tenant(), decoded.unit(), decoded.capability())
            {
                None => push_finding(
                    report,
                    Some(name),
                    key.to_string(),
                    FindingKind::OrphanGrant,
                    format!("grant '{key}' does not name a catalog leaf"),
                ),
                Some(leaf) if leaf.via_alias => push_finding(
                    report,
                    Some(name),
                    key.to_string(),
                    FindingKind::LegacyAlias,
                    format!("grant '{key}' uses a legacy alias of '{}'", leaf.key()),
                ),
                Some(_) => {}
            }
        }

        for (tenant, unit, capability, _) in principal.grants.legacy_entries() {
            let path = format!("{tenant}.{unit}.{capability}");
            match self.catalog.resolve(tenant, unit, capability) {
                None => push_finding(
                    report,
                    Some(name),
                    path.clone(),
                    FindingKind::OrphanLegacyGrant,
                    format!("legacy grant '{path}' does not name a catalog leaf"),
                ),
                Some(leaf) if leaf.via_alias => push_finding(
                    report,
                    Some(name),
                    path.clone(),
                    FindingKind::LegacyAlias,
                    format!("legacy grant '{path}' uses a legacy alias of '{}'", leaf.key()),
                ),
                Some(_) => {}
            }
        }
    }
}

fn check(
    principal: &str,
    key: String,
    in_catalog: bool,
    decision: AccessDecision,
    expected: Option<bool>,
) -> LeafCheck {
    let status = match expected {
        None => CheckStatus::Unchecked,
        Some(want) if want == decision.is_granted() => CheckStatus::Pass,
        Some(want) => {
            warn!(
                principal,
                key = %key,
                expected = want,
                decision = %decision,
                "decision does not match expectation"
            );
            CheckStatus::Fail
        }
    };
    debug!(principal, key = %key, ?status, "leaf checked");
    LeafCheck {
        principal: principal.to_string(),
        key,
        in_catalog,
        decision,
        expected,
        status,
    }
}

fn push_finding(
    report: &mut ConsistencyReport,
    principal: Option<&str>,
    key: String,
    kind: FindingKind,
    message: String,
) {
    warn!(principal = principal.unwrap_or("-"), key = %key, ?kind, %message, "consistency finding");
    report.findings.push(Finding {
        principal: principal.map(str::to_string),
        key,
        kind,
        message,
    });
}
