use std::{convert::Infallible, io, sync::Arc, thread, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use shipline_case::CaseId;
use shipline_directory::InMemoryCompanyDirectory;
use shipline_events::{EventBus, EventEnvelope, InMemoryEventBus};
use shipline_infra::{CaseRegistry, InMemoryAuditLog};

use crate::config::ApiConfig;

pub type CaseBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

pub type Registry = CaseRegistry<Arc<InMemoryAuditLog>, Arc<InMemoryCompanyDirectory>, CaseBus>;

/// Realtime message broadcast via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub case_id: CaseId,
    pub topic: String,
    pub version: u64,
    pub payload: JsonValue,
}

#[derive(Clone)]
pub struct AppServices {
    registry: Arc<Registry>,
    bus: CaseBus,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

/// In-memory wiring: audit log + directory + bus, plus the bus → SSE bridge.
pub fn build_services(config: &ApiConfig) -> io::Result<AppServices> {
    let bus: CaseBus = Arc::new(InMemoryEventBus::new());
    let registry = Arc::new(CaseRegistry::new(
        Arc::new(InMemoryAuditLog::new()),
        Arc::new(InMemoryCompanyDirectory::new()),
        bus.clone(),
    ));

    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(config.notify_buffer);

    // Background subscriber: bus -> SSE broadcast (lossy; no backpressure on commits).
    {
        let sub = bus.subscribe();
        let realtime_tx = realtime_tx.clone();
        thread::Builder::new()
            .name("sse-bridge".to_string())
            .spawn(move || {
                while let Ok(envelope) = sub.recv() {
                    let _ = realtime_tx.send(RealtimeMessage {
                        case_id: CaseId::new(envelope.aggregate_id()),
                        topic: envelope.event_type().to_string(),
                        version: envelope.aggregate_version(),
                        payload: envelope.into_payload(),
                    });
                }
            })?;
    }

    Ok(AppServices {
        registry,
        bus,
        realtime_tx,
    })
}

impl AppServices {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn bus(&self) -> CaseBus {
        self.bus.clone()
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }
}

/// Build an SSE stream of committed case events (used by `/stream`).
pub fn case_sse_stream(
    services: Arc<AppServices>,
    case_id: Option<CaseId>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if case_id.is_none_or(|id| id == m.case_id) => {
            let data = serde_json::to_string(&m).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
