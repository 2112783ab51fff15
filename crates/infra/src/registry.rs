//! Case Registry: the single authoritative copy of every case.
//!
//! Every mutation runs the same pipeline under the case's own lock:
//!
//! ```text
//! lock case
//!   ↓
//! 1. Decide events (pure `handle`, includes the expected-version check)
//!   ↓
//! 2. Apply to a working copy
//!   ↓
//! 3. Append audit entries (expected sequence = case's audit count)
//!   ↓
//! 4. Swap the working copy in
//!   ↓
//! unlock, then publish envelopes (best-effort)
//! ```
//!
//! A failure in 1–3 leaves the case untouched. Publication happens strictly
//! after the commit and its failure is logged, never surfaced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use shipline_case::{
    AGGREGATE_TYPE, Action, Actor, AssignCompany, Buyer, CaseCommand, CaseEvent, CaseId,
    CompanyRef, DocumentKind, DocumentRecord, Evidence, ExportCase, ReassignCompany,
    RecordDocument, RegisterCase, Stage, TransitionCase, Vehicle,
};
use shipline_core::{Aggregate, AggregateId, AggregateRoot, DomainError, EntryId, ExpectedVersion};
use shipline_directory::{Company, CompanyDirectory, CompanyId, ServiceKind};
use shipline_events::{Event, EventBus, EventEnvelope};

use crate::audit_log::{AuditEntry, AuditLog, AuditLogError, Replayed, UncommittedEntry, replay};
use crate::error::{RegistryError, RegistryResult};
use crate::query::CaseFilter;

type CaseHandle = Arc<Mutex<ExportCase>>;

#[derive(Debug, Default)]
struct CaseIndex {
    by_id: HashMap<CaseId, CaseHandle>,
    /// Creation order.
    in_order: Vec<CaseHandle>,
}

/// Input for `create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCase {
    pub vehicle: Vehicle,
    pub buyer: Buyer,
    #[serde(default)]
    pub registration_reference: Option<String>,
}

/// Result of an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub case: ExportCase,
    pub entry: AuditEntry,
}

/// Result of a document record call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    /// `false` when the kind was already present (no-op).
    pub recorded: bool,
    pub document: DocumentRecord,
}

/// Cached case position vs. the audit fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub case_id: CaseId,
    pub cached: Replayed,
    pub replayed: Replayed,
    pub consistent: bool,
}

struct Committed {
    case: ExportCase,
    events: Vec<CaseEvent>,
    entries: Vec<AuditEntry>,
}

/// Owns every case and serializes mutation per case.
///
/// Generic over the audit log, the company directory and the event bus so
/// tests run on in-memory implementations.
pub struct CaseRegistry<L, D, B> {
    cases: RwLock<CaseIndex>,
    audit: L,
    directory: D,
    bus: B,
}

impl<L, D, B> CaseRegistry<L, D, B> {
    pub fn new(audit: L, directory: D, bus: B) -> Self {
        Self {
            cases: RwLock::new(CaseIndex::default()),
            audit,
            directory,
            bus,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn audit_log(&self) -> &L {
        &self.audit
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<L, D, B> CaseRegistry<L, D, B>
where
    L: AuditLog,
    D: CompanyDirectory,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Register a new case at `Registered`, version 0.
    pub fn create(&self, new_case: NewCase) -> RegistryResult<ExportCase> {
        let case_id = CaseId::new(AggregateId::new());
        let mut case = ExportCase::empty(case_id);

        let events = case.handle(&CaseCommand::RegisterCase(RegisterCase {
            case_id,
            vehicle: new_case.vehicle,
            buyer: new_case.buyer,
            registration_reference: new_case.registration_reference,
            occurred_at: Utc::now(),
        }))?;
        for event in &events {
            case.apply(event);
        }

        {
            let mut index = self
                .cases
                .write()
                .map_err(|_| RegistryError::Poisoned("case index".to_string()))?;
            let handle = Arc::new(Mutex::new(case.clone()));
            index.by_id.insert(case_id, handle.clone());
            index.in_order.push(handle);
        }

        info!(
            case_id = %case_id,
            vin = %case.vehicle().vin,
            buyer_country = %case.buyer().country,
            "case registered"
        );

        self.publish(&case, &events);
        Ok(case)
    }

    /// Current snapshot. Observes every transition that returned before the call.
    pub fn get(&self, case_id: CaseId) -> RegistryResult<ExportCase> {
        let handle = self.handle(case_id)?;
        let case = handle
            .lock()
            .map_err(|_| RegistryError::Poisoned(format!("case {case_id}")))?;
        Ok(case.clone())
    }

    /// Matching cases in creation order.
    ///
    /// Takes a snapshot of the case handles; cases are read lazily as the
    /// listing is iterated. Call again to restart.
    pub fn list(&self, filter: &CaseFilter) -> RegistryResult<CaseListing> {
        let index = self
            .cases
            .read()
            .map_err(|_| RegistryError::Poisoned("case index".to_string()))?;

        Ok(CaseListing {
            handles: index.in_order.clone().into_iter(),
            filter: filter.clone(),
        })
    }

    /// Run the Transition Engine on a case.
    pub fn transition(
        &self,
        case_id: CaseId,
        actor: Actor,
        action: Action,
        evidence: Evidence,
        expected: ExpectedVersion,
    ) -> RegistryResult<TransitionOutcome> {
        let action_name = action.name();
        let command = |occurred_at: DateTime<Utc>| {
            CaseCommand::Transition(TransitionCase {
                case_id,
                entry_id: EntryId::new(),
                actor,
                action,
                evidence,
                expected_version: expected,
                occurred_at,
            })
        };

        let committed = self.execute(case_id, command).inspect_err(|err| {
            debug!(
                case_id = %case_id,
                action = action_name,
                role = %actor.role,
                error = %err,
                "transition rejected"
            );
        })?;
        let entry = single_entry(committed.entries)?;

        info!(
            case_id = %case_id,
            from = %entry.from_stage,
            to = %entry.to_stage,
            version = entry.case_version,
            decision = %entry.decision,
            role = %entry.actor_role,
            "transition committed"
        );

        Ok(TransitionOutcome {
            case: committed.case,
            entry,
        })
    }

    /// Observer-only forced stage change.
    pub fn admin_override(
        &self,
        case_id: CaseId,
        actor: Actor,
        target: Stage,
        note: impl Into<String>,
        expected: ExpectedVersion,
    ) -> RegistryResult<TransitionOutcome> {
        let outcome = self.transition(
            case_id,
            actor,
            Action::AdminOverride {
                target,
                note: note.into(),
            },
            Evidence::none(),
            expected,
        )?;

        warn!(
            case_id = %case_id,
            from = %outcome.entry.from_stage,
            to = %outcome.entry.to_stage,
            "stage forced by admin override"
        );
        Ok(outcome)
    }

    /// Record a document against the case's current stage. Idempotent per kind.
    pub fn record_document(
        &self,
        case_id: CaseId,
        actor: Actor,
        kind: DocumentKind,
        reference: impl Into<String>,
    ) -> RegistryResult<RecordOutcome> {
        let reference = reference.into();
        let command = |occurred_at: DateTime<Utc>| {
            CaseCommand::RecordDocument(RecordDocument {
                case_id,
                actor,
                kind,
                reference,
                occurred_at,
            })
        };

        let committed = self.execute(case_id, command)?;
        let recorded = !committed.events.is_empty();
        let document = committed
            .case
            .documents()
            .get(kind)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("document {kind}")))?;

        if recorded {
            info!(case_id = %case_id, kind = %kind, stage = %document.stage, "document recorded");
        } else {
            debug!(case_id = %case_id, kind = %kind, "document already present");
        }

        Ok(RecordOutcome { recorded, document })
    }

    pub fn has_document(&self, case_id: CaseId, kind: DocumentKind) -> RegistryResult<bool> {
        Ok(self.get(case_id)?.has_document(kind))
    }

    /// Bind a company to an empty slot.
    pub fn assign(
        &self,
        case_id: CaseId,
        actor: Actor,
        slot: ServiceKind,
        company_id: CompanyId,
    ) -> RegistryResult<AuditEntry> {
        self.handle(case_id)?;
        let company = self.company(company_id)?;

        let committed = self.execute(case_id, |occurred_at| {
            CaseCommand::AssignCompany(AssignCompany {
                case_id,
                entry_id: EntryId::new(),
                actor,
                slot,
                company: CompanyRef::from(&company),
                occurred_at,
            })
        })?;
        let entry = single_entry(committed.entries)?;

        info!(case_id = %case_id, slot = %slot, company_id = %company_id, "company assigned");
        Ok(entry)
    }

    /// Rebind an occupied slot; always audited with its reason.
    pub fn reassign(
        &self,
        case_id: CaseId,
        actor: Actor,
        slot: ServiceKind,
        company_id: CompanyId,
        reason: impl Into<String>,
    ) -> RegistryResult<AuditEntry> {
        self.handle(case_id)?;
        let company = self.company(company_id)?;

        let reason = reason.into();
        let committed = self.execute(case_id, |occurred_at| {
            CaseCommand::ReassignCompany(ReassignCompany {
                case_id,
                entry_id: EntryId::new(),
                actor,
                slot,
                company: CompanyRef::from(&company),
                reason,
                occurred_at,
            })
        })?;
        let entry = single_entry(committed.entries)?;

        info!(
            case_id = %case_id,
            slot = %slot,
            company_id = %company_id,
            previous = ?entry.assignment.and_then(|a| a.previous),
            "company reassigned"
        );
        Ok(entry)
    }

    pub fn assigned_company(&self, case_id: CaseId, slot: ServiceKind) -> RegistryResult<Option<Company>> {
        match self.get(case_id)?.assigned(slot) {
            Some(company_id) => Ok(Some(self.company(company_id)?)),
            None => Ok(None),
        }
    }

    /// Full audit history of a case, ordered by timestamp then sequence.
    pub fn audit(&self, case_id: CaseId) -> RegistryResult<Vec<AuditEntry>> {
        self.handle(case_id)?;
        Ok(self.audit.list_for(case_id)?)
    }

    /// Compare the cached stage/version with a fold over the audit log.
    pub fn verify(&self, case_id: CaseId) -> RegistryResult<Verification> {
        let case = self.get(case_id)?;
        let entries = self.audit.list_for(case_id)?;

        let cached = Replayed {
            stage: case.stage(),
            version: case.version(),
        };
        let replayed = replay(&entries);
        let consistent = cached == replayed;

        if !consistent {
            warn!(
                case_id = %case_id,
                cached_stage = %cached.stage,
                cached_version = cached.version,
                replayed_stage = %replayed.stage,
                replayed_version = replayed.version,
                "case diverges from its audit log"
            );
        }

        Ok(Verification {
            case_id,
            cached,
            replayed,
            consistent,
        })
    }

    fn handle(&self, case_id: CaseId) -> RegistryResult<CaseHandle> {
        let index = self
            .cases
            .read()
            .map_err(|_| RegistryError::Poisoned("case index".to_string()))?;

        index
            .by_id
            .get(&case_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("case {case_id}")).into())
    }

    fn company(&self, company_id: CompanyId) -> RegistryResult<Company> {
        self.directory
            .get(company_id)
            .ok_or_else(|| DomainError::not_found(format!("company {company_id}")).into())
    }

    /// The command is built under the case lock so its timestamp follows
    /// commit order; it never precedes the case's last committed change.
    fn execute<F>(&self, case_id: CaseId, build: F) -> RegistryResult<Committed>
    where
        F: FnOnce(DateTime<Utc>) -> CaseCommand,
    {
        let handle = self.handle(case_id)?;
        let mut current = handle
            .lock()
            .map_err(|_| RegistryError::Poisoned(format!("case {case_id}")))?;

        let command = build(Utc::now().max(current.updated_at()));

        // 1) Decide (no mutation)
        let decided = current.handle(&command)?;
        if decided.is_empty() {
            return Ok(Committed {
                case: current.clone(),
                events: vec![],
                entries: vec![],
            });
        }

        // 2) Apply to a working copy
        let mut next = current.clone();
        let mut uncommitted = Vec::new();
        for event in &decided {
            if let Some(entry) = UncommittedEntry::from_event(event, next.stage(), next.version()) {
                uncommitted.push(entry);
            }
            next.apply(event);
        }

        // 3) Audit append (the commit point)
        let entries = self
            .audit
            .append(uncommitted, ExpectedVersion::Exact(current.audit_sequence()))?;

        // 4) Swap in
        *current = next.clone();
        drop(current);

        self.publish(&next, &decided);

        Ok(Committed {
            case: next,
            events: decided,
            entries,
        })
    }

    fn publish(&self, case: &ExportCase, events: &[CaseEvent]) {
        let case_id = case.id_typed();

        for event in events {
            let envelope =
                match EventEnvelope::from_typed(case_id.0, AGGREGATE_TYPE, case.version(), event) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        warn!(case_id = %case_id, event_type = event.event_type(), error = %err, "failed to encode case event");
                        continue;
                    }
                };

            if let Err(err) = self.bus.publish(envelope) {
                warn!(
                    case_id = %case_id,
                    event_type = event.event_type(),
                    error = ?err,
                    "event publication failed; commit stands"
                );
            }
        }
    }
}

fn single_entry(entries: Vec<AuditEntry>) -> RegistryResult<AuditEntry> {
    entries.into_iter().next().ok_or_else(|| {
        AuditLogError::InvalidAppend("command committed without an audit entry".to_string()).into()
    })
}

/// Lazy, finite listing over a snapshot of case handles.
pub struct CaseListing {
    handles: std::vec::IntoIter<CaseHandle>,
    filter: CaseFilter,
}

impl Iterator for CaseListing {
    type Item = RegistryResult<ExportCase>;

    fn next(&mut self) -> Option<Self::Item> {
        for handle in self.handles.by_ref() {
            let case = match handle.lock() {
                Ok(case) => case,
                Err(poisoned) => {
                    let case_id = poisoned.get_ref().id_typed();
                    warn!(case_id = %case_id, "case lock poisoned during listing");
                    return Some(Err(RegistryError::Poisoned(format!("case {case_id}"))));
                }
            };
            if self.filter.matches(&case) {
                return Some(Ok(case.clone()));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipline_core::ActorRole;
    use shipline_directory::{InMemoryCompanyDirectory, NewCompany};
    use shipline_events::InMemoryEventBus;

    use crate::audit_log::InMemoryAuditLog;

    type TestRegistry =
        CaseRegistry<InMemoryAuditLog, InMemoryCompanyDirectory, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

    fn registry() -> TestRegistry {
        CaseRegistry::new(
            InMemoryAuditLog::new(),
            InMemoryCompanyDirectory::new(),
            Arc::new(InMemoryEventBus::new()),
        )
    }

    fn new_case(country: &str) -> NewCase {
        NewCase {
            vehicle: Vehicle::new("KMHD141GPMA123456"),
            buyer: Buyer {
                name: "Al Noor Motors".to_string(),
                country: country.to_string(),
                agreed_price: 1_250_000,
                currency: "USD".to_string(),
            },
            registration_reference: None,
        }
    }

    fn exporter() -> Actor {
        Actor::new(ActorRole::Exporter)
    }

    #[test]
    fn unknown_case_is_not_found() {
        let registry = registry();
        let err = registry.get(CaseId::new(AggregateId::new())).unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));
    }

    #[test]
    fn get_reads_its_own_writes() {
        let registry = registry();
        let case = registry.create(new_case("Jordan")).unwrap();

        registry
            .transition(
                case.id_typed(),
                exporter(),
                Action::Advance,
                Evidence::none().with_document(DocumentKind::CancellationCertificate, "doc://cc"),
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let after = registry.get(case.id_typed()).unwrap();
        assert_eq!(after.stage(), Stage::Cancelled);
        assert_eq!(after.version(), 1);
    }

    #[test]
    fn rejected_transition_writes_no_audit_entry() {
        let registry = registry();
        let case = registry.create(new_case("Jordan")).unwrap();

        let err = registry
            .transition(case.id_typed(), exporter(), Action::Advance, Evidence::none(), ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::MissingDocuments(_))));
        assert!(registry.audit(case.id_typed()).unwrap().is_empty());
    }

    #[test]
    fn list_filters_and_keeps_creation_order() {
        let registry = registry();
        let first = registry.create(new_case("Jordan")).unwrap();
        registry.create(new_case("Chile")).unwrap();
        let third = registry.create(new_case("jordan")).unwrap();

        let filter = CaseFilter {
            buyer_country: Some("JORDAN".to_string()),
            ..CaseFilter::default()
        };
        let ids: Vec<CaseId> = registry
            .list(&filter)
            .unwrap()
            .map(|c| c.unwrap().id_typed())
            .collect();
        assert_eq!(ids, vec![first.id_typed(), third.id_typed()]);

        // Restartable: a second call sees the same cases.
        assert_eq!(registry.list(&filter).unwrap().count(), 2);
    }

    #[test]
    fn assign_requires_existing_company() {
        let registry = registry();
        let case = registry.create(new_case("Jordan")).unwrap();

        let err = registry
            .assign(case.id_typed(), exporter(), ServiceKind::Customs, CompanyId::new(AggregateId::new()))
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));
    }

    #[test]
    fn assigned_company_resolves_directory_record() {
        let registry = registry();
        let case = registry.create(new_case("Jordan")).unwrap();
        let broker = registry
            .directory()
            .register(NewCompany::new("Incheon Customs", ServiceKind::Customs))
            .unwrap();

        assert_eq!(registry.assigned_company(case.id_typed(), ServiceKind::Customs).unwrap(), None);

        let entry = registry
            .assign(case.id_typed(), exporter(), ServiceKind::Customs, broker.id)
            .unwrap();
        assert_eq!(entry.sequence, 1);

        let resolved = registry
            .assigned_company(case.id_typed(), ServiceKind::Customs)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.name, "Incheon Customs");

        let by_company = CaseFilter {
            assigned_company: Some(broker.id),
            ..CaseFilter::default()
        };
        assert_eq!(registry.list(&by_company).unwrap().count(), 1);
    }

    #[test]
    fn listing_surfaces_poisoned_case() {
        let registry = registry();
        let poisoned = registry.create(new_case("Jordan")).unwrap();
        let healthy = registry.create(new_case("Jordan")).unwrap();

        let handle = registry.handle(poisoned.id_typed()).unwrap();
        let _ = std::thread::spawn(move || {
            let _guard = handle.lock().unwrap();
            panic!("worker died holding the case lock");
        })
        .join();

        let items: Vec<RegistryResult<ExportCase>> = registry.list(&CaseFilter::default()).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Err(RegistryError::Poisoned(_))));
        assert_eq!(items[1].as_ref().unwrap().id_typed(), healthy.id_typed());
    }

    #[test]
    fn audit_timestamps_follow_commit_sequence() {
        let registry = registry();
        let case = registry.create(new_case("Jordan")).unwrap();
        let id = case.id_typed();
        let broker = registry
            .directory()
            .register(NewCompany::new("Incheon Customs", ServiceKind::Customs))
            .unwrap();

        registry.assign(id, exporter(), ServiceKind::Customs, broker.id).unwrap();
        for target in [Stage::Shoring, Stage::Shipped, Stage::CustomsReview, Stage::Shoring] {
            registry
                .admin_override(id, Actor::new(ActorRole::Observer), target, "fix", ExpectedVersion::Any)
                .unwrap();
        }

        let entries = registry.audit(id).unwrap();
        let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(entries[0].timestamp >= case.updated_at());
        assert!(registry.verify(id).unwrap().consistent);
    }

    #[test]
    fn record_document_reports_first_record() {
        let registry = registry();
        let case = registry.create(new_case("Jordan")).unwrap();

        let first = registry
            .record_document(case.id_typed(), exporter(), DocumentKind::Invoice, "inv-1")
            .unwrap();
        let second = registry
            .record_document(case.id_typed(), exporter(), DocumentKind::Invoice, "inv-2")
            .unwrap();

        assert!(first.recorded);
        assert!(!second.recorded);
        assert_eq!(second.document.reference, "inv-1");
        assert!(registry.has_document(case.id_typed(), DocumentKind::Invoice).unwrap());
    }
}
