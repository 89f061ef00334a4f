//! The batch mutation engine.
//!
//! `GrantMutator` applies admin-initiated grant changes to a principal's
//! grants. Every mutation runs the same pipeline:
//!
//!   Authorize → Resolve keys from the catalog → Choose tier → Write → Journal
//!
//! Unit and tenant mutations come in two consistency tiers. The atomic tier
//! hands the whole key list to `GrantWriter::write_batch`, so either every
//! key changes or none does. The sequential tier writes one key at a time;
//! if a write fails, the keys already written stay written and the caller
//! receives `PartialBatchFailure` listing them. Callers that use the
//! sequential tier must be prepared for a unit or tenant to be left in a
//! mixed grant state.
//!
//! The engine does not serialize concurrent mutations of one principal.
//! Callers keep at most one mutation in flight per principal.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use warden_contracts::{
    catalog::Catalog,
    error::{WardenError, WardenResult},
    key::PermissionKey,
    mutation::{
        Consistency, GrantChange, MutationId, MutationOutcome, MutationRecord, MutationScope,
        MutationStatus,
    },
    principal::{Principal, Role},
};

use crate::traits::{GrantWriter, MutationJournal};

/// Applies capability, unit and tenant grant changes.
///
/// Construct one mutator per catalog and share it; it holds no per-principal
/// state.
pub struct GrantMutator {
    catalog: Arc<Catalog>,
    journal: Option<Box<dyn MutationJournal>>,
    admin_role: Role,
}

impl GrantMutator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            journal: None,
            admin_role: Role::admin(),
        }
    }

    /// Record every accepted mutation in `journal`.
    pub fn with_journal(mut self, journal: Box<dyn MutationJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Use a role tag other than `"admin"` as the mutation-capable role.
    pub fn with_admin_role(mut self, role: Role) -> Self {
        self.admin_role = role;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Set a single capability.
    ///
    /// A legacy alias is accepted and written under the canonical key.
    /// Returns `CatalogLeafNotFound` for capabilities not in the catalog so
    /// that mutations never create orphan grants.
    pub fn set_capability(
        &self,
        actor: &Principal,
        writer: &mut dyn GrantWriter,
        tenant: &str,
        unit: &str,
        capability: &str,
        granted: bool,
    ) -> WardenResult<MutationOutcome> {
        self.authorize(actor, "set_capability")?;

        let leaf = self.catalog.resolve(tenant, unit, capability).ok_or_else(|| {
            WardenError::CatalogLeafNotFound {
                path: format!("{tenant}.{unit}.{capability}"),
            }
        })?;
        let key = leaf.key();
        let scope = MutationScope::Capability {
            tenant: tenant.to_string(),
            unit: unit.to_string(),
            capability: leaf.capability.key.clone(),
        };

        self.apply(actor, writer, scope, vec![key], granted, Consistency::BestAvailable)
    }

    /// Set every capability under a unit.
    pub fn set_unit(
        &self,
        actor: &Principal,
        writer: &mut dyn GrantWriter,
        tenant: &str,
        unit: &str,
        granted: bool,
        consistency: Consistency,
    ) -> WardenResult<MutationOutcome> {
        self.authorize(actor, "set_unit")?;

        let keys = self.catalog.unit_keys(tenant, unit).ok_or_else(|| {
            WardenError::CatalogLeafNotFound {
                path: format!("{tenant}.{unit}"),
            }
        })?;
        let scope = MutationScope::Unit {
            tenant: tenant.to_string(),
            unit: unit.to_string(),
        };
        self.apply(actor, writer, scope, keys, granted, consistency)
    }

    /// Set every capability under every unit of a tenant.
    pub fn set_tenant(
        &self,
        actor: &Principal,
        writer: &mut dyn GrantWriter,
        tenant: &str,
        granted: bool,
        consistency: Consistency,
    ) -> WardenResult<MutationOutcome> {
        self.authorize(actor, "set_tenant")?;

        let keys = self.catalog.tenant_keys(tenant).ok_or_else(|| {
            WardenError::CatalogLeafNotFound {
                path: tenant.to_string(),
            }
        })?;
        let scope = MutationScope::Tenant {
            tenant: tenant.to_string(),
        };
        self.apply(actor, writer, scope, keys, granted, consistency)
    }

    fn authorize(&self, actor: &Principal, operation: &str) -> WardenResult<()> {
        if actor.role == self.admin_role {
            return Ok(());
        }
        warn!(
            principal = %actor.id,
            role = %actor.role,
            operation,
            "grant mutation rejected: actor is not an admin"
        );
        Err(WardenError::Unauthorized {
            principal: actor.id.0.clone(),
            role: actor.role.0.clone(),
            operation: operation.to_string(),
        })
    }

    fn apply(
        &self,
        actor: &Principal,
        writer: &mut dyn GrantWriter,
        scope: MutationScope,
        keys: Vec<PermissionKey>,
        granted: bool,
        consistency: Consistency,
    ) -> WardenResult<MutationOutcome> {
        let tier = match consistency {
            Consistency::Atomic if !writer.supports_batch() => {
                return Err(WardenError::BatchUnsupported {
                    writer: writer.subject().to_string(),
                });
            }
            Consistency::Atomic => Consistency::Atomic,
            Consistency::Sequential => Consistency::Sequential,
            Consistency::BestAvailable if writer.supports_batch() => Consistency::Atomic,
            Consistency::BestAvailable => Consistency::Sequential,
        };

        if keys.is_empty() {
            warn!(scope = %scope, "mutation scope has no capabilities; nothing to write");
        }

        debug!(
            actor = %actor.id,
            subject = writer.subject(),
            scope = %scope,
            granted,
            tier = ?tier,
            key_count = keys.len(),
            "applying grant mutation"
        );

        let id = MutationId::new();
        let mut applied: Vec<String> = Vec::with_capacity(keys.len());

        match tier {
            Consistency::Atomic => {
                let changes: Vec<GrantChange> = keys
                    .iter()
                    .map(|key| GrantChange {
                        key: key.clone(),
                        granted,
                    })
                    .collect();
                // Nothing was written if the batch failed, so there is
                // nothing to journal.
                writer.write_batch(&changes)?;
                applied.extend(keys.iter().map(|k| k.to_string()));
            }
            _ => {
                for key in &keys {
                    if let Err(e) = writer.write(key, granted) {
                        // A lone key cannot leave a mixed state.
                        if keys.len() == 1 {
                            return Err(e);
                        }
                        let failed_key = key.to_string();
                        let reason = e.to_string();
                        warn!(
                            scope = %scope,
                            failed_key = %failed_key,
                            applied = applied.len(),
                            total = keys.len(),
                            reason = %reason,
                            "sequential batch stopped partway; scope is in a mixed grant state"
                        );
                        let record = self.record(
                            &id,
                            actor,
                            writer.subject(),
                            &scope,
                            granted,
                            tier,
                            &applied,
                            MutationStatus::Partial {
                                failed_key: failed_key.clone(),
                                reason: reason.clone(),
                            },
                        );
                        if let Err(journal_err) = self.journal(&record) {
                            warn!(error = %journal_err, "partial batch could not be journaled");
                        }
                        return Err(WardenError::PartialBatchFailure {
                            applied,
                            failed_key,
                            total: keys.len(),
                            reason,
                        });
                    }
                    applied.push(key.to_string());
                }
            }
        }

        let record = self.record(
            &id,
            actor,
            writer.subject(),
            &scope,
            granted,
            tier,
            &applied,
            MutationStatus::Complete,
        );
        let outcome = MutationOutcome {
            id,
            scope,
            granted,
            applied_as: tier,
            keys: applied,
        };

        if let Err(e) = self.journal(&record) {
            warn!(
                mutation_id = %outcome.id.0,
                subject = writer.subject(),
                scope = %outcome.scope,
                key_count = outcome.keys.len(),
                error = %e,
                "grant mutation applied but could not be journaled"
            );
            return Err(WardenError::AppliedNotJournaled {
                outcome: Box::new(outcome),
                reason: e.to_string(),
            });
        }

        info!(
            mutation_id = %outcome.id.0,
            actor = %actor.id,
            subject = writer.subject(),
            scope = %outcome.scope,
            granted,
            tier = ?tier,
            key_count = outcome.keys.len(),
            "grant mutation applied"
        );

        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        id: &MutationId,
        actor: &Principal,
        subject: &str,
        scope: &MutationScope,
        granted: bool,
        tier: Consistency,
        applied: &[String],
        status: MutationStatus,
    ) -> MutationRecord {
        MutationRecord {
            id: id.clone(),
            actor: actor.id.0.clone(),
            subject: subject.to_string(),
            scope: scope.clone(),
            granted,
            applied_as: tier,
            applied: applied.to_vec(),
            status,
            timestamp: Utc::now(),
        }
    }

    fn journal(&self, record: &MutationRecord) -> WardenResult<()> {
        match &self.journal {
            Some(journal) => journal.append(record),
            None => Ok(()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use warden_contracts::{
        catalog::{Capability, Catalog, Tenant, Unit},
        error::{WardenError, WardenResult},
        grant::GrantStore,
        key::PermissionKey,
        mutation::{Consistency, MutationRecord, MutationScope, MutationStatus},
        principal::{Principal, Role},
    };

    use crate::traits::{GrantWriter, MutationJournal};

    use super::GrantMutator;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![Tenant::new(
                "north",
                "North Factory",
                vec![
                    Unit::new(
                        "hr",
                        "Human Resources",
                        vec![
                            Capability::new("single", "Single Salary Slip").with_alias("salary_single"),
                            Capability::new("batch", "Batch Salary Slips"),
                            Capability::new("reports", "Reports"),
                        ],
                    ),
                    Unit::new("stores", "Stores", vec![Capability::new("issue", "Issue Material")]),
                    Unit::new("empty", "Empty Department", vec![]),
                ],
            )])
            .unwrap(),
        )
    }

    fn admin() -> Principal {
        Principal::new("root", Role::admin(), GrantStore::new())
    }

    fn clerk() -> Principal {
        Principal::new(
            "clerk",
            Role::user(),
            GrantStore::from_flat([("north.hr.single", true)]),
        )
    }

    /// A sequential-only backend that fails on a chosen key.
    struct FlakyWriter {
        subject: String,
        written: Vec<(String, bool)>,
        fail_on: Option<String>,
    }

    impl FlakyWriter {
        fn new(fail_on: Option<&str>) -> Self {
            Self {
                subject: "remote-session".to_string(),
                written: Vec::new(),
                fail_on: fail_on.map(str::to_string),
            }
        }
    }

    impl GrantWriter for FlakyWriter {
        fn subject(&self) -> &str {
            &self.subject
        }

        fn write(&mut self, key: &PermissionKey, granted: bool) -> WardenResult<()> {
            if self.fail_on.as_deref() == Some(key.to_string().as_str()) {
                return Err(WardenError::WriteFailed {
                    key: key.to_string(),
                    reason: "backend offline".to_string(),
                });
            }
            self.written.push((key.to_string(), granted));
            Ok(())
        }
    }

    /// A journal that keeps every record for later inspection.
    #[derive(Clone, Default)]
    struct MockJournal {
        records: Arc<Mutex<Vec<MutationRecord>>>,
    }

    impl MutationJournal for MockJournal {
        fn append(&self, record: &MutationRecord) -> WardenResult<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// A journal whose storage is unavailable.
    struct RejectingJournal;

    impl MutationJournal for RejectingJournal {
        fn append(&self, _record: &MutationRecord) -> WardenResult<()> {
            Err(WardenError::JournalWriteFailed {
                reason: "journal storage offline".to_string(),
            })
        }
    }

    // ── Authorization ────────────────────────────────────────────────────────

    #[test]
    fn non_admin_mutation_is_unauthorized() {
        let mutator = GrantMutator::new(catalog());
        let actor = clerk();
        let mut subject = clerk();

        let result = mutator.set_unit(&actor, &mut subject, "north", "hr", true, Consistency::Atomic);

        match result {
            Err(WardenError::Unauthorized { principal, operation, .. }) => {
                assert_eq!(principal, "clerk");
                assert_eq!(operation, "set_unit");
            }
            other => panic!("expected Unauthorized, got {:?}", other),
        }
        assert_eq!(subject.grants, clerk().grants, "grants must be untouched");
    }

    #[test]
    fn custom_admin_role_is_honoured() {
        let mutator = GrantMutator::new(catalog()).with_admin_role(Role::new("superuser"));
        let mut subject = clerk();

        assert!(mutator
            .set_capability(&admin(), &mut subject, "north", "hr", "batch", true)
            .is_err());

        let superuser = Principal::new("ops", Role::new("superuser"), GrantStore::new());
        assert!(mutator
            .set_capability(&superuser, &mut subject, "north", "hr", "batch", true)
            .is_ok());
    }

    // ── Single capability ────────────────────────────────────────────────────

    #[test]
    fn set_capability_writes_canonical_key_for_alias() {
        let mutator = GrantMutator::new(catalog());
        let mut subject = clerk();

        let outcome = mutator
            .set_capability(&admin(), &mut subject, "north", "hr", "salary_single", false)
            .unwrap();

        assert_eq!(outcome.keys, vec!["north.hr.single"]);
        assert_eq!(subject.grants.flat_value("north.hr.single"), Some(false));
        assert_eq!(subject.grants.flat_value("north.hr.salary_single"), None);
    }

    #[test]
    fn single_key_write_failure_is_not_partial() {
        let mutator = GrantMutator::new(catalog());
        let mut writer = FlakyWriter::new(Some("north.stores.issue"));

        match mutator.set_capability(&admin(), &mut writer, "north", "stores", "issue", true) {
            Err(WardenError::WriteFailed { key, .. }) => assert_eq!(key, "north.stores.issue"),
            other => panic!("expected WriteFailed, got {:?}", other),
        }
    }

    #[test]
    fn set_capability_outside_catalog_is_rejected() {
        let mutator = GrantMutator::new(catalog());
        let mut subject = clerk();

        match mutator.set_capability(&admin(), &mut subject, "north", "hr", "payroll", true) {
            Err(WardenError::CatalogLeafNotFound { path }) => assert_eq!(path, "north.hr.payroll"),
            other => panic!("expected CatalogLeafNotFound, got {:?}", other),
        }
    }

    // ── Unit and tenant batches ──────────────────────────────────────────────

    #[test]
    fn atomic_unit_batch_writes_every_capability() {
        let journal = MockJournal::default();
        let mutator = GrantMutator::new(catalog()).with_journal(Box::new(journal.clone()));
        let mut subject = clerk();

        let outcome = mutator
            .set_unit(&admin(), &mut subject, "north", "hr", true, Consistency::Atomic)
            .unwrap();

        assert_eq!(outcome.applied_as, Consistency::Atomic);
        assert_eq!(outcome.keys.len(), 3);
        for cap in ["single", "batch", "reports"] {
            assert_eq!(subject.grants.flat_value(&format!("north.hr.{cap}")), Some(true));
        }

        let records = journal.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].actor, "root");
        assert_eq!(records[0].subject, "clerk");
        assert_eq!(records[0].status, MutationStatus::Complete);
    }

    #[test]
    fn tenant_batch_covers_every_unit() {
        let mutator = GrantMutator::new(catalog());
        let mut subject = clerk();

        let outcome = mutator
            .set_tenant(&admin(), &mut subject, "north", false, Consistency::BestAvailable)
            .unwrap();

        assert_eq!(outcome.applied_as, Consistency::Atomic);
        assert_eq!(outcome.scope, MutationScope::Tenant { tenant: "north".to_string() });
        assert_eq!(outcome.keys.len(), 4);
        assert!(subject.grants.flat_entries().all(|(_, granted)| !granted));
    }

    #[test]
    fn atomic_tier_requires_batch_support() {
        let mutator = GrantMutator::new(catalog());
        let mut writer = FlakyWriter::new(None);

        match mutator.set_unit(&admin(), &mut writer, "north", "hr", true, Consistency::Atomic) {
            Err(WardenError::BatchUnsupported { writer: name }) => assert_eq!(name, "remote-session"),
            other => panic!("expected BatchUnsupported, got {:?}", other),
        }
        assert!(writer.written.is_empty());
    }

    #[test]
    fn best_available_falls_back_to_sequential() {
        let mutator = GrantMutator::new(catalog());
        let mut writer = FlakyWriter::new(None);

        let outcome = mutator
            .set_unit(&admin(), &mut writer, "north", "hr", true, Consistency::BestAvailable)
            .unwrap();

        assert_eq!(outcome.applied_as, Consistency::Sequential);
        assert_eq!(writer.written.len(), 3);
    }

    #[test]
    fn sequential_failure_reports_applied_keys() {
        let journal = MockJournal::default();
        let mutator = GrantMutator::new(catalog()).with_journal(Box::new(journal.clone()));
        let mut writer = FlakyWriter::new(Some("north.hr.batch"));

        let result = mutator.set_unit(&admin(), &mut writer, "north", "hr", true, Consistency::Sequential);

        match result {
            Err(WardenError::PartialBatchFailure { applied, failed_key, total, .. }) => {
                assert_eq!(applied, vec!["north.hr.single"]);
                assert_eq!(failed_key, "north.hr.batch");
                assert_eq!(total, 3);
            }
            other => panic!("expected PartialBatchFailure, got {:?}", other),
        }
        // The first key stays written: the unit is now in a mixed state.
        assert_eq!(writer.written, vec![("north.hr.single".to_string(), true)]);

        let records = journal.records.lock().unwrap();
        assert_eq!(records.len(), 1, "partial batches must be journaled");
        assert!(matches!(records[0].status, MutationStatus::Partial { .. }));
    }

    #[test]
    fn unknown_unit_and_empty_unit() {
        let mutator = GrantMutator::new(catalog());
        let mut subject = clerk();

        assert!(matches!(
            mutator.set_unit(&admin(), &mut subject, "north", "finance", true, Consistency::Atomic),
            Err(WardenError::CatalogLeafNotFound { .. })
        ));

        let outcome = mutator
            .set_unit(&admin(), &mut subject, "north", "empty", true, Consistency::Atomic)
            .unwrap();
        assert!(outcome.keys.is_empty());
    }

    // ── Journal failures ─────────────────────────────────────────────────────

    #[test]
    fn journal_failure_reports_the_applied_outcome() {
        let mutator = GrantMutator::new(catalog()).with_journal(Box::new(RejectingJournal));
        let mut subject = clerk();

        let err = mutator
            .set_unit(&admin(), &mut subject, "north", "hr", true, Consistency::Atomic)
            .unwrap_err();

        match err {
            WardenError::AppliedNotJournaled { outcome, reason } => {
                assert_eq!(outcome.applied_as, Consistency::Atomic);
                assert!(outcome.granted);
                assert_eq!(
                    outcome.keys,
                    vec!["north.hr.single", "north.hr.batch", "north.hr.reports"]
                );
                // The reported keys are exactly what the writer now holds.
                for key in &outcome.keys {
                    assert_eq!(subject.grants.flat_value(key), Some(true), "{key} not applied");
                }
                assert!(reason.contains("journal storage offline"));
            }
            other => panic!("expected AppliedNotJournaled, got {:?}", other),
        }
    }

    #[test]
    fn journal_failure_on_single_capability_is_not_a_write_failure() {
        let mutator = GrantMutator::new(catalog()).with_journal(Box::new(RejectingJournal));
        let mut subject = clerk();

        let err = mutator
            .set_capability(&admin(), &mut subject, "north", "hr", "batch", true)
            .unwrap_err();

        assert!(matches!(err, WardenError::AppliedNotJournaled { .. }), "got {:?}", err);
        assert!(err.to_string().contains("applied to 1 key(s)"));
        assert_eq!(subject.grants.flat_value("north.hr.batch"), Some(true));
    }
}
