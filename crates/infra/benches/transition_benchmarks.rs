use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use shipline_case::{
    Action, Actor, Buyer, CaseCommand, CaseId, DocumentKind, Evidence, ExportCase, RegisterCase, Stage, TransitionCase,
    Vehicle,
};
use shipline_core::{ActorRole, Aggregate, AggregateId, EntryId, ExpectedVersion};
use shipline_directory::{CompanyDirectory, CompanyFilter, InMemoryCompanyDirectory, NewCompany, ServiceKind};
use shipline_events::{EventEnvelope, InMemoryEventBus};
use shipline_infra::{CaseFilter, CaseRegistry, InMemoryAuditLog, NewCase, Pagination, replay};

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Registry = CaseRegistry<InMemoryAuditLog, InMemoryCompanyDirectory, Bus>;

const LIFECYCLE: [(ActorRole, Option<DocumentKind>); 6] = [
    (ActorRole::Exporter, Some(DocumentKind::CancellationCertificate)),
    (ActorRole::Customs, Some(DocumentKind::ExportDeclaration)),
    (ActorRole::Customs, Some(DocumentKind::ApprovalCertificate)),
    (ActorRole::Shoring, Some(DocumentKind::PackingList)),
    (ActorRole::Shipping, Some(DocumentKind::BillOfLading)),
    (ActorRole::Buyer, None),
];

fn buyer(country: &str) -> Buyer {
    Buyer {
        name: "Bench Motors".to_string(),
        country: country.to_string(),
        agreed_price: 900_000,
        currency: "USD".to_string(),
    }
}

fn evidence(kind: Option<DocumentKind>) -> Evidence {
    kind.map(|k| Evidence::none().with_document(k, "doc://bench"))
        .unwrap_or_default()
}

fn setup_registry() -> Registry {
    let directory = InMemoryCompanyDirectory::new();
    for (name, service) in [
        ("Bench Customs", ServiceKind::Customs),
        ("Bench Shoring", ServiceKind::Shoring),
        ("Bench Shipping", ServiceKind::Shipping),
    ] {
        directory.register(NewCompany::new(name, service)).unwrap();
    }
    CaseRegistry::new(InMemoryAuditLog::new(), directory, Arc::new(InMemoryEventBus::new()))
}

/// Create a case with every slot bound.
fn ready_case(registry: &Registry, country: &str) -> CaseId {
    let case_id = registry
        .create(NewCase {
            vehicle: Vehicle::new("KMHBENCH0000001"),
            buyer: buyer(country),
            registration_reference: None,
        })
        .unwrap()
        .id_typed();

    let exporter = Actor::new(ActorRole::Exporter);
    let companies = registry.directory().list(&CompanyFilter::default());
    for slot in ServiceKind::ALL {
        let company = companies.iter().find(|c| c.service == slot).unwrap();
        registry.assign(case_id, exporter, slot, company.id).unwrap();
    }
    case_id
}

fn run_lifecycle(registry: &Registry, case_id: CaseId) {
    for (role, kind) in LIFECYCLE {
        registry
            .transition(case_id, Actor::new(role), Action::Advance, evidence(kind), ExpectedVersion::Any)
            .unwrap();
    }
}

fn bench_decision_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("decision_latency");
    group.sample_size(1000);

    // Pure handle/apply, no registry.
    group.bench_function("handle_and_apply_advance", |b| {
        let case_id = CaseId::new(AggregateId::new());
        let mut registered = ExportCase::empty(case_id);
        let events = registered
            .handle(&CaseCommand::RegisterCase(RegisterCase {
                case_id,
                vehicle: Vehicle::new("KMHBENCH0000001"),
                buyer: buyer("Jordan"),
                registration_reference: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for event in &events {
            registered.apply(event);
        }

        b.iter(|| {
            let mut case = registered.clone();
            let events = case
                .handle(&CaseCommand::Transition(TransitionCase {
                    case_id,
                    entry_id: EntryId::new(),
                    actor: Actor::new(ActorRole::Exporter),
                    action: Action::Advance,
                    evidence: evidence(Some(DocumentKind::CancellationCertificate)),
                    expected_version: ExpectedVersion::Exact(0),
                    occurred_at: Utc::now(),
                }))
                .unwrap();
            for event in &events {
                case.apply(event);
            }
            black_box(case.stage())
        });
    });

    group.bench_function("registry_full_lifecycle", |b| {
        let registry = setup_registry();
        b.iter(|| {
            let case_id = ready_case(&registry, "Jordan");
            run_lifecycle(&registry, case_id);
            black_box(case_id)
        });
    });

    group.finish();
}

fn bench_audit_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("audit_replay");

    for rounds in [1usize, 10, 100].iter() {
        // Each round: advance to CustomsReview, reject, force back to Cancelled.
        let registry = setup_registry();
        let case_id = ready_case(&registry, "Jordan");
        registry
            .transition(
                case_id,
                Actor::new(ActorRole::Exporter),
                Action::Advance,
                evidence(Some(DocumentKind::CancellationCertificate)),
                ExpectedVersion::Any,
            )
            .unwrap();
        for _ in 0..*rounds {
            registry
                .transition(
                    case_id,
                    Actor::new(ActorRole::Customs),
                    Action::Advance,
                    evidence(Some(DocumentKind::ExportDeclaration)),
                    ExpectedVersion::Any,
                )
                .unwrap();
            registry
                .transition(
                    case_id,
                    Actor::new(ActorRole::Customs),
                    Action::Reject {
                        reason: "incomplete".to_string(),
                    },
                    Evidence::none(),
                    ExpectedVersion::Any,
                )
                .unwrap();
            registry
                .admin_override(
                    case_id,
                    Actor::new(ActorRole::Observer),
                    Stage::Cancelled,
                    "retry",
                    ExpectedVersion::Any,
                )
                .unwrap();
        }

        let entries = registry.audit(case_id).unwrap();
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries.len()), &entries, |b, entries| {
            b.iter(|| black_box(replay(entries)));
        });
    }

    group.finish();
}

fn bench_filtered_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_listing");

    for case_count in [100usize, 1000].iter() {
        let registry = setup_registry();
        for i in 0..*case_count {
            let country = if i % 4 == 0 { "Jordan" } else { "Chile" };
            ready_case(&registry, country);
        }

        let filter = CaseFilter {
            buyer_country: Some("jordan".to_string()),
            ..CaseFilter::default()
        };
        group.throughput(Throughput::Elements(*case_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case_count), &filter, |b, filter| {
            b.iter(|| {
                let page = Pagination::default().paginate(registry.list(filter).unwrap().map(Result::unwrap));
                black_box(page.total)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decision_latency,
    bench_audit_replay,
    bench_filtered_listing
);
criterion_main!(benches);
