use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Client;
use crate::protocol::server_events::{
    ConversationItemCreated, ConversationItemDeleted, ConversationItemTruncated, ErrorEvent,
    EventType, FunctionCallArgumentsDelta, FunctionCallArgumentsDone, InputAudioBufferCleared,
    InputAudioBufferCommitted, RateLimitsUpdated, ResponseAudioDone, ResponseAudioTranscriptDone,
    ResponseContentPart, ResponseCreated, ResponseDelta, ResponseDone, ResponseOutputItem,
    ResponseTextDone, ServerEvent, SessionCreated, SessionUpdated, SpeechStarted, SpeechStopped,
    TranscriptionCompleted, TranscriptionFailed,
};

/// Callback invoked on the receive task for each matching event.
pub type EventHandler = Arc<dyn Fn(ServerEvent) + Send + Sync>;

/// At most one handler per event type; registering again replaces it.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    slots: RwLock<HashMap<EventType, EventHandler>>,
}

impl HandlerRegistry {
    pub(crate) fn set(&self, event_type: EventType, handler: EventHandler) {
        self.slots.write().insert(event_type, handler);
    }

    pub(crate) fn remove(&self, event_type: EventType) -> bool {
        self.slots.write().remove(&event_type).is_some()
    }

    /// The handler is cloned out so it runs without the lock held.
    pub(crate) fn get(&self, event_type: EventType) -> Option<EventHandler> {
        self.slots.read().get(&event_type).cloned()
    }
}

impl Client {
    /// Register `handler` for `event_type`, replacing any previous one.
    ///
    /// Handlers run inline on the receive task, in arrival order. A slow handler
    /// delays every later event.
    pub fn register_handler<F>(&self, event_type: EventType, handler: F)
    where
        F: Fn(ServerEvent) + Send + Sync + 'static,
    {
        self.shared.handlers.set(event_type, Arc::new(handler));
    }

    /// Remove the handler for `event_type`. Returns whether one was registered.
    pub fn remove_handler(&self, event_type: EventType) -> bool {
        self.shared.handlers.remove(event_type)
    }

    /// Receive events whose tag is not in [`EventType::ALL`].
    pub fn on_unknown<F>(&self, handler: F)
    where
        F: Fn(String, serde_json::Value) + Send + Sync + 'static,
    {
        self.register_handler(EventType::Unknown, move |event| {
            if let ServerEvent::Unknown {
                event_type,
                payload,
            } = event
            {
                handler(event_type, payload);
            }
        });
    }
}

macro_rules! typed_handlers {
    ($($method:ident => $variant:ident($payload:ty),)+) => {
        impl Client {
            $(
                #[doc = concat!("Register a handler for `", stringify!($variant), "` events.")]
                pub fn $method<F>(&self, handler: F)
                where
                    F: Fn($payload) + Send + Sync + 'static,
                {
                    self.register_handler(EventType::$variant, move |event| {
                        if let ServerEvent::$variant(payload) = event {
                            handler(payload);
                        }
                    });
                }
            )+
        }
    };
}

typed_handlers! {
    on_error => Error(ErrorEvent),
    on_session_created => SessionCreated(SessionCreated),
    on_session_updated => SessionUpdated(SessionUpdated),
    on_rate_limits_updated => RateLimitsUpdated(RateLimitsUpdated),
    on_response_created => ResponseCreated(ResponseCreated),
    on_response_done => ResponseDone(ResponseDone),
    on_response_output_item_added => ResponseOutputItemAdded(ResponseOutputItem),
    on_response_output_item_done => ResponseOutputItemDone(ResponseOutputItem),
    on_response_content_part_added => ResponseContentPartAdded(ResponseContentPart),
    on_response_content_part_done => ResponseContentPartDone(ResponseContentPart),
    on_response_text_delta => ResponseTextDelta(ResponseDelta),
    on_response_text_done => ResponseTextDone(ResponseTextDone),
    on_response_audio_delta => ResponseAudioDelta(ResponseDelta),
    on_response_audio_done => ResponseAudioDone(ResponseAudioDone),
    on_response_audio_transcript_delta => ResponseAudioTranscriptDelta(ResponseDelta),
    on_response_audio_transcript_done => ResponseAudioTranscriptDone(ResponseAudioTranscriptDone),
    on_function_call_arguments_delta => ResponseFunctionCallArgumentsDelta(FunctionCallArgumentsDelta),
    on_function_call_arguments_done => ResponseFunctionCallArgumentsDone(FunctionCallArgumentsDone),
    on_speech_started => InputAudioBufferSpeechStarted(SpeechStarted),
    on_speech_stopped => InputAudioBufferSpeechStopped(SpeechStopped),
    on_input_audio_buffer_committed => InputAudioBufferCommitted(InputAudioBufferCommitted),
    on_input_audio_buffer_cleared => InputAudioBufferCleared(InputAudioBufferCleared),
    on_conversation_item_created => ConversationItemCreated(ConversationItemCreated),
    on_transcription_completed => ConversationItemInputAudioTranscriptionCompleted(TranscriptionCompleted),
    on_transcription_failed => ConversationItemInputAudioTranscriptionFailed(TranscriptionFailed),
    on_conversation_item_truncated => ConversationItemTruncated(ConversationItemTruncated),
    on_conversation_item_deleted => ConversationItemDeleted(ConversationItemDeleted),
}
