//! Notification Dispatcher boundary.
//!
//! Delivery (mail, push, partner webhooks) is an external collaborator; the
//! core only hands it `(case_id, event, payload)` after a commit.

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use shipline_case::CaseId;
use shipline_events::EventEnvelope;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Accepts notifications about committed case events.
pub trait NotificationService: Send + Sync {
    fn notify(&self, case_id: CaseId, event: &str, payload: &JsonValue) -> Result<(), NotifyError>;

    /// Convenience for bus consumers.
    fn notify_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), NotifyError> {
        self.notify(
            CaseId::new(envelope.aggregate_id()),
            envelope.event_type(),
            envelope.payload(),
        )
    }
}

impl<S> NotificationService for std::sync::Arc<S>
where
    S: NotificationService + ?Sized,
{
    fn notify(&self, case_id: CaseId, event: &str, payload: &JsonValue) -> Result<(), NotifyError> {
        (**self).notify(case_id, event, payload)
    }
}

/// Writes every notification to the log. The default when no delivery
/// channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl NotificationService for LoggingNotifier {
    fn notify(&self, case_id: CaseId, event: &str, payload: &JsonValue) -> Result<(), NotifyError> {
        let to = payload
            .get("CaseTransitioned")
            .and_then(|t| t.get("to"))
            .and_then(JsonValue::as_str);

        info!(case_id = %case_id, event, to, "notification");
        Ok(())
    }
}
