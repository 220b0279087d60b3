use std::panic::{AssertUnwindSafe, catch_unwind};

use super::handlers::{EventHandler, HandlerRegistry};
use crate::error::Error;
use crate::logging::{TRACE_LOG_MAX_BYTES, safe_truncate};
use crate::protocol::server_events::{Envelope, EventType, ServerEvent};

/// Route one inbound text message to its handler. Never fails: malformed input
/// is logged and dropped so the receive loop keeps going.
pub(super) fn dispatch_message(handlers: &HandlerRegistry, raw: &str) {
    tracing::trace!("received event: {}", safe_truncate(raw, TRACE_LOG_MAX_BYTES));

    let envelope = match Envelope::parse(raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(
                error = %err,
                raw_data = %safe_truncate(raw, TRACE_LOG_MAX_BYTES),
                "bad_event_json"
            );
            return;
        }
    };

    let event_type = EventType::from_tag(&envelope.event_type).unwrap_or_else(|| {
        tracing::info!(event_type = %envelope.event_type, "unknown_event");
        EventType::Unknown
    });
    let Some(handler) = handlers.get(event_type) else {
        return;
    };

    match ServerEvent::decode(event_type, raw) {
        Ok(event) => invoke(&handler, event),
        Err(source) => {
            let err = Error::Event {
                event_type: envelope.event_type,
                raw: Some(raw.to_owned()),
                source,
            };
            tracing::warn!(error = %err, "event_decode_failed");
        }
    }
}

fn invoke(handler: &EventHandler, event: ServerEvent) {
    let event_type = event.event_type();
    if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
        tracing::error!(%event_type, "event handler panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(registry: &HandlerRegistry, event_type: EventType) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        registry.set(
            event_type,
            Arc::new(move |_: ServerEvent| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        count
    }

    #[test]
    fn malformed_and_unknown_messages_are_dropped() {
        let registry = HandlerRegistry::default();
        let deltas = counting(&registry, EventType::ResponseTextDelta);

        dispatch_message(&registry, "not json");
        dispatch_message(&registry, r#"{"no_type":true}"#);
        dispatch_message(&registry, r#"{"type":"vendor.extension"}"#);
        dispatch_message(&registry, r#"{"type":"response.text.delta","delta":7}"#);
        assert_eq!(deltas.load(Ordering::SeqCst), 0);

        dispatch_message(&registry, r#"{"type":"response.text.delta","delta":"ok"}"#);
        assert_eq!(deltas.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_handler_receives_unrecognised_tags() {
        let registry = HandlerRegistry::default();
        let unknown = counting(&registry, EventType::Unknown);
        dispatch_message(&registry, r#"{"type":"vendor.extension"}"#);
        dispatch_message(&registry, r#"{"type":"session.created"}"#);
        assert_eq!(unknown.load(Ordering::SeqCst), 1);
    }

    fn explode(_: ServerEvent) {
        panic!("handler bug");
    }

    #[test]
    fn panicking_handler_does_not_poison_dispatch() {
        let registry = HandlerRegistry::default();
        registry.set(EventType::Error, Arc::new(explode));
        dispatch_message(&registry, r#"{"type":"error","error":{"message":"x"}}"#);
        let errors = counting(&registry, EventType::Error);
        dispatch_message(&registry, r#"{"type":"error","error":{"message":"y"}}"#);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
