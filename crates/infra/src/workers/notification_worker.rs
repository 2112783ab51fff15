use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use shipline_events::{EventBus, EventEnvelope, Subscription};

use crate::notifications::NotificationService;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Forwards committed case events to a [`NotificationService`].
///
/// - Subscribes to the event bus at spawn time
/// - Delivery failures are logged and dropped (fire-and-forget)
/// - Supports graceful shutdown
#[derive(Debug)]
pub struct NotificationWorker;

impl NotificationWorker {
    pub fn spawn<B, S>(name: &'static str, bus: B, service: S) -> io::Result<WorkerHandle>
    where
        B: EventBus<EventEnvelope<JsonValue>> + Send + Sync + 'static,
        S: NotificationService + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &service))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<S>(
    name: &'static str,
    sub: Subscription<EventEnvelope<JsonValue>>,
    shutdown_rx: mpsc::Receiver<()>,
    service: &S,
) where
    S: NotificationService,
{
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                if let Err(err) = service.notify_envelope(&envelope) {
                    warn!(
                        worker = name,
                        case_id = %envelope.aggregate_id(),
                        event_type = envelope.event_type(),
                        error = %err,
                        "notification delivery failed"
                    );
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker = name, "notification worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use shipline_case::CaseId;
    use shipline_core::AggregateId;
    use shipline_events::InMemoryEventBus;

    use crate::notifications::NotifyError;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(CaseId, String)>>,
    }

    impl NotificationService for Recorder {
        fn notify(&self, case_id: CaseId, event: &str, _payload: &JsonValue) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push((case_id, event.to_string()));
            if event == "case.fail" {
                return Err(NotifyError::Delivery("smtp down".to_string()));
            }
            Ok(())
        }
    }

    fn envelope(case: AggregateId, event_type: &str) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            uuid::Uuid::now_v7(),
            case,
            "export_case",
            1,
            event_type,
            chrono::Utc::now(),
            JsonValue::Null,
        )
    }

    fn wait_for(recorder: &Recorder, count: usize) {
        for _ in 0..100 {
            if recorder.seen.lock().unwrap().len() >= count {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn forwards_envelopes_and_survives_delivery_failures() {
        let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
        let recorder = Arc::new(Recorder::default());
        let handle = NotificationWorker::spawn("notify-test", bus.clone(), recorder.clone()).unwrap();

        let case = AggregateId::new();
        bus.publish(envelope(case, "case.fail")).unwrap();
        bus.publish(envelope(case, "case.transitioned")).unwrap();
        wait_for(&recorder, 2);
        handle.shutdown();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (CaseId::new(case), "case.fail".to_string()),
                (CaseId::new(case), "case.transitioned".to_string()),
            ]
        );
    }
}
