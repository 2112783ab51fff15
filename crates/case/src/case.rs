use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use shipline_core::{
    ActorRole, Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, EntryId,
    ExpectedVersion,
};
use shipline_directory::{CompanyId, ServiceKind};
use shipline_events::Event;

use crate::action::{Action, Actor, Decision, Evidence};
use crate::assignments::{AssignmentChange, Assignments, CompanyRef, check_assign, check_reassign};
use crate::buyer::Buyer;
use crate::documents::{DocumentKind, DocumentRecord, DocumentTracker};
use crate::stage::Stage;
use crate::vehicle::Vehicle;

pub const AGGREGATE_TYPE: &str = "export_case";

/// Export case identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub AggregateId);

impl CaseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CaseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for CaseId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Aggregate root: ExportCase.
///
/// `version` counts accepted stage transitions only; documents and
/// assignments change the case without moving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportCase {
    id: CaseId,
    vehicle: Vehicle,
    buyer: Buyer,
    stage: Stage,
    version: u64,
    assignments: Assignments,
    documents: DocumentTracker,
    history: Vec<EntryId>,
    audit_sequence: u64,
    created: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ExportCase {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CaseId) -> Self {
        Self {
            id,
            vehicle: Vehicle::default(),
            buyer: Buyer::default(),
            stage: Stage::Registered,
            version: 0,
            assignments: Assignments::default(),
            documents: DocumentTracker::default(),
            history: Vec::new(),
            audit_sequence: 0,
            created: false,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }

    pub fn id_typed(&self) -> CaseId {
        self.id
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn buyer(&self) -> &Buyer {
        &self.buyer
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn assigned(&self, slot: ServiceKind) -> Option<CompanyId> {
        self.assignments.get(slot)
    }

    pub fn documents(&self) -> &DocumentTracker {
        &self.documents
    }

    pub fn has_document(&self, kind: DocumentKind) -> bool {
        self.documents.has(kind)
    }

    /// Audit entry ids of accepted transitions, oldest first.
    pub fn history(&self) -> &[EntryId] {
        &self.history
    }

    /// Number of audit entries written for this case, side-channel entries included.
    pub fn audit_sequence(&self) -> u64 {
        self.audit_sequence
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl AggregateRoot for ExportCase {
    type Id = CaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterCase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCase {
    pub case_id: CaseId,
    pub vehicle: Vehicle,
    pub buyer: Buyer,
    /// Where the registration document lives; defaults to `vin:<VIN>`.
    pub registration_reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: TransitionCase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCase {
    pub case_id: CaseId,
    /// Id of the audit entry this transition will produce.
    pub entry_id: EntryId,
    pub actor: Actor,
    pub action: Action,
    pub evidence: Evidence,
    pub expected_version: ExpectedVersion,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordDocument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDocument {
    pub case_id: CaseId,
    pub actor: Actor,
    pub kind: DocumentKind,
    pub reference: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignCompany.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignCompany {
    pub case_id: CaseId,
    pub entry_id: EntryId,
    pub actor: Actor,
    pub slot: ServiceKind,
    pub company: CompanyRef,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReassignCompany.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignCompany {
    pub case_id: CaseId,
    pub entry_id: EntryId,
    pub actor: Actor,
    pub slot: ServiceKind,
    pub company: CompanyRef,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseCommand {
    RegisterCase(RegisterCase),
    Transition(TransitionCase),
    RecordDocument(RecordDocument),
    AssignCompany(AssignCompany),
    ReassignCompany(ReassignCompany),
}

/// Event: CaseRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRegistered {
    pub case_id: CaseId,
    pub vehicle: Vehicle,
    pub buyer: Buyer,
    pub registration: DocumentRecord,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CaseTransitioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTransitioned {
    pub case_id: CaseId,
    pub entry_id: EntryId,
    pub from: Stage,
    pub to: Stage,
    pub actor_role: ActorRole,
    pub decision: Decision,
    pub note: Option<String>,
    /// Documents merged by this transition.
    pub documents: Vec<DocumentRecord>,
    /// Case version after the transition.
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecorded {
    pub case_id: CaseId,
    pub actor_role: ActorRole,
    pub document: DocumentRecord,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CompanyAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyAssigned {
    pub case_id: CaseId,
    pub entry_id: EntryId,
    pub actor_role: ActorRole,
    pub change: AssignmentChange,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CompanyReassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyReassigned {
    pub case_id: CaseId,
    pub entry_id: EntryId,
    pub actor_role: ActorRole,
    pub change: AssignmentChange,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseEvent {
    CaseRegistered(CaseRegistered),
    CaseTransitioned(CaseTransitioned),
    DocumentRecorded(DocumentRecorded),
    CompanyAssigned(CompanyAssigned),
    CompanyReassigned(CompanyReassigned),
}

impl CaseEvent {
    pub fn case_id(&self) -> CaseId {
        match self {
            CaseEvent::CaseRegistered(e) => e.case_id,
            CaseEvent::CaseTransitioned(e) => e.case_id,
            CaseEvent::DocumentRecorded(e) => e.case_id,
            CaseEvent::CompanyAssigned(e) => e.case_id,
            CaseEvent::CompanyReassigned(e) => e.case_id,
        }
    }

    /// Does this event produce an audit entry?
    pub fn is_audited(&self) -> bool {
        matches!(
            self,
            CaseEvent::CaseTransitioned(_)
                | CaseEvent::CompanyAssigned(_)
                | CaseEvent::CompanyReassigned(_)
        )
    }
}

impl Event for CaseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CaseEvent::CaseRegistered(_) => "case.registered",
            CaseEvent::CaseTransitioned(_) => "case.transitioned",
            CaseEvent::DocumentRecorded(_) => "case.document_recorded",
            CaseEvent::CompanyAssigned(_) => "case.company_assigned",
            CaseEvent::CompanyReassigned(_) => "case.company_reassigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CaseEvent::CaseRegistered(e) => e.occurred_at,
            CaseEvent::CaseTransitioned(e) => e.occurred_at,
            CaseEvent::DocumentRecorded(e) => e.occurred_at,
            CaseEvent::CompanyAssigned(e) => e.occurred_at,
            CaseEvent::CompanyReassigned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ExportCase {
    type Command = CaseCommand;
    type Event = CaseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CaseEvent::CaseRegistered(e) => {
                self.id = e.case_id;
                self.vehicle = e.vehicle.clone();
                self.buyer = e.buyer.clone();
                self.stage = Stage::Registered;
                self.version = 0;
                self.documents = DocumentTracker::default();
                self.documents.record(e.registration.clone());
                self.created = true;
                self.created_at = e.occurred_at;
            }
            CaseEvent::CaseTransitioned(e) => {
                for doc in &e.documents {
                    self.documents.record(doc.clone());
                }
                self.stage = e.to;
                self.version = e.version;
                self.history.push(e.entry_id);
                self.audit_sequence += 1;
            }
            CaseEvent::DocumentRecorded(e) => {
                self.documents.record(e.document.clone());
            }
            CaseEvent::CompanyAssigned(e) => {
                self.assignments.bind(e.change.slot, e.change.company_id);
                self.audit_sequence += 1;
            }
            CaseEvent::CompanyReassigned(e) => {
                self.assignments.bind(e.change.slot, e.change.company_id);
                self.audit_sequence += 1;
            }
        }

        self.updated_at = event.occurred_at();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CaseCommand::RegisterCase(cmd) => self.handle_register(cmd),
            CaseCommand::Transition(cmd) => self.handle_transition(cmd),
            CaseCommand::RecordDocument(cmd) => self.handle_record_document(cmd),
            CaseCommand::AssignCompany(cmd) => self.handle_assign(cmd),
            CaseCommand::ReassignCompany(cmd) => self.handle_reassign(cmd),
        }
    }
}

fn non_blank(text: &str, what: &str) -> DomainResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DomainError::validation(format!("{what} cannot be empty")));
    }
    Ok(text.to_string())
}

fn optional_note(evidence: &Evidence) -> Option<String> {
    evidence
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

impl ExportCase {
    fn ensure_created(&self) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found(format!("case {}", self.id)));
        }
        Ok(())
    }

    fn ensure_case_id(&self, case_id: CaseId) -> DomainResult<()> {
        if self.id != case_id {
            return Err(DomainError::validation("case_id mismatch"));
        }
        Ok(())
    }

    fn ensure_not_delivered(&self) -> DomainResult<()> {
        if self.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "case is {} and can no longer change",
                self.stage
            )));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterCase) -> DomainResult<Vec<CaseEvent>> {
        if self.created {
            return Err(DomainError::invalid_transition("case is already registered"));
        }

        let vehicle = cmd.vehicle.clone().normalized(cmd.occurred_at.year())?;
        let buyer = cmd.buyer.clone().normalized()?;

        let reference = match &cmd.registration_reference {
            Some(r) => non_blank(r, "registration reference")?,
            None => format!("vin:{}", vehicle.vin),
        };

        Ok(vec![CaseEvent::CaseRegistered(CaseRegistered {
            case_id: cmd.case_id,
            vehicle,
            buyer,
            registration: DocumentRecord {
                kind: DocumentKind::Registration,
                stage: Stage::Registered,
                reference,
                recorded_at: cmd.occurred_at,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transition(&self, cmd: &TransitionCase) -> DomainResult<Vec<CaseEvent>> {
        self.ensure_created()?;
        self.ensure_case_id(cmd.case_id)?;
        cmd.expected_version.check(self.version)?;

        match &cmd.action {
            Action::AdminOverride { target, note } => self.decide_override(cmd, *target, note),
            action => self.decide_gated(cmd, action),
        }
    }

    /// Advance / reject / request modification, in the order:
    /// legal from here → role → documents → slot.
    fn decide_gated(&self, cmd: &TransitionCase, action: &Action) -> DomainResult<Vec<CaseEvent>> {
        let spec = self.stage.spec();

        let (target, reason) = match action {
            Action::Advance => {
                let target = spec.advance_to.ok_or_else(|| {
                    DomainError::invalid_transition(format!("no stage follows {}", self.stage))
                })?;
                (target, None)
            }
            Action::Reject { reason: text } | Action::RequestModification { notes: text } => {
                let target = spec.review_to.ok_or_else(|| {
                    DomainError::invalid_transition(format!(
                        "{} is not possible from {}",
                        action.name(),
                        self.stage
                    ))
                })?;
                (target, Some(text.as_str()))
            }
            Action::AdminOverride { .. } => {
                return Err(DomainError::invalid_transition("override takes a separate path"));
            }
        };

        let role = cmd.actor.role;
        if role == ActorRole::Observer {
            return Err(DomainError::unauthorized(
                "observers can only change a case through an admin override",
            ));
        }
        let required = target.spec().actor;
        if role != required {
            return Err(DomainError::unauthorized(format!(
                "{role} cannot move a case into {target}; {required} owns that step"
            )));
        }

        let note = match reason {
            Some(text) => Some(non_blank(text, "reason")?),
            None => optional_note(&cmd.evidence),
        };

        let mut documents = self.incoming_documents(cmd, target)?;
        if reason.is_some() && !self.documents.has(DocumentKind::RejectionReason) {
            documents.push(DocumentRecord {
                kind: DocumentKind::RejectionReason,
                stage: target,
                reference: format!("audit:{}", cmd.entry_id),
                recorded_at: cmd.occurred_at,
            });
        }

        let incoming: BTreeSet<DocumentKind> = documents.iter().map(|d| d.kind).collect();
        let missing = self.documents.missing_for(target, &incoming);
        if !missing.is_empty() {
            return Err(DomainError::missing_documents(
                missing.iter().map(DocumentKind::as_str),
            ));
        }

        if let Some(slot) = target.spec().slot {
            let bound = self
                .assignments
                .get(slot)
                .ok_or_else(|| DomainError::SlotUnassigned(slot.to_string()))?;
            if let Some(company) = cmd.actor.company_id {
                if company != bound {
                    return Err(DomainError::unauthorized(format!(
                        "company {company} is not the {slot} company on this case"
                    )));
                }
            }
        }

        Ok(vec![self.transitioned(cmd, target, action.decision(), note, documents)])
    }

    fn decide_override(
        &self,
        cmd: &TransitionCase,
        target: Stage,
        note: &str,
    ) -> DomainResult<Vec<CaseEvent>> {
        if cmd.actor.role != ActorRole::Observer {
            return Err(DomainError::unauthorized("only observers may override a stage"));
        }
        let note = non_blank(note, "override note")?;
        if target == self.stage {
            return Err(DomainError::invalid_transition(format!(
                "case is already in {target}"
            )));
        }

        let documents = self.incoming_documents(cmd, target)?;
        Ok(vec![self.transitioned(cmd, target, Decision::Force, Some(note), documents)])
    }

    /// Evidence documents not yet tracked, first occurrence per kind.
    fn incoming_documents(
        &self,
        cmd: &TransitionCase,
        target: Stage,
    ) -> DomainResult<Vec<DocumentRecord>> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();

        for doc in &cmd.evidence.new_documents {
            let reference = non_blank(&doc.reference, "document reference")?;
            if self.documents.has(doc.kind) || !seen.insert(doc.kind) {
                continue;
            }
            out.push(DocumentRecord {
                kind: doc.kind,
                stage: target,
                reference,
                recorded_at: cmd.occurred_at,
            });
        }

        Ok(out)
    }

    fn transitioned(
        &self,
        cmd: &TransitionCase,
        to: Stage,
        decision: Decision,
        note: Option<String>,
        documents: Vec<DocumentRecord>,
    ) -> CaseEvent {
        CaseEvent::CaseTransitioned(CaseTransitioned {
            case_id: cmd.case_id,
            entry_id: cmd.entry_id,
            from: self.stage,
            to,
            actor_role: cmd.actor.role,
            decision,
            note,
            documents,
            version: self.version + 1,
            occurred_at: cmd.occurred_at,
        })
    }

    fn handle_record_document(&self, cmd: &RecordDocument) -> DomainResult<Vec<CaseEvent>> {
        self.ensure_created()?;
        self.ensure_case_id(cmd.case_id)?;

        if cmd.actor.role == ActorRole::Observer {
            return Err(DomainError::unauthorized("observers cannot record documents"));
        }
        let reference = non_blank(&cmd.reference, "document reference")?;

        if self.documents.has(cmd.kind) {
            return Ok(vec![]);
        }

        Ok(vec![CaseEvent::DocumentRecorded(DocumentRecorded {
            case_id: cmd.case_id,
            actor_role: cmd.actor.role,
            document: DocumentRecord {
                kind: cmd.kind,
                stage: self.stage,
                reference,
                recorded_at: cmd.occurred_at,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn ensure_may_assign(&self, actor: &Actor) -> DomainResult<()> {
        if !matches!(actor.role, ActorRole::Exporter | ActorRole::Observer) {
            return Err(DomainError::unauthorized(format!(
                "{} cannot assign companies",
                actor.role
            )));
        }
        Ok(())
    }

    fn handle_assign(&self, cmd: &AssignCompany) -> DomainResult<Vec<CaseEvent>> {
        self.ensure_created()?;
        self.ensure_case_id(cmd.case_id)?;
        self.ensure_may_assign(&cmd.actor)?;
        self.ensure_not_delivered()?;

        let change = check_assign(&self.assignments, cmd.slot, &cmd.company)?;

        Ok(vec![CaseEvent::CompanyAssigned(CompanyAssigned {
            case_id: cmd.case_id,
            entry_id: cmd.entry_id,
            actor_role: cmd.actor.role,
            change,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reassign(&self, cmd: &ReassignCompany) -> DomainResult<Vec<CaseEvent>> {
        self.ensure_created()?;
        self.ensure_case_id(cmd.case_id)?;
        self.ensure_may_assign(&cmd.actor)?;
        self.ensure_not_delivered()?;

        let change = check_reassign(&self.assignments, cmd.slot, &cmd.company, &cmd.reason)?;

        Ok(vec![CaseEvent::CompanyReassigned(CompanyReassigned {
            case_id: cmd.case_id,
            entry_id: cmd.entry_id,
            actor_role: cmd.actor.role,
            change,
            reason: cmd.reason.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
