use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::models::{ContentPart, ConversationItem, ResponseInfo, SessionInfo};
use crate::error::ServerError;

/// Minimal view of an inbound message: just enough to route it.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,
}

impl Envelope {
    /// # Errors
    /// Returns an error if `raw` is not a JSON object with a string `type` field.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ErrorEvent {
    pub event_id: String,
    pub error: ServerError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionCreated {
    pub event_id: String,
    pub session: SessionInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionUpdated {
    pub event_id: String,
    pub session: SessionInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimit {
    pub name: String,
    pub limit: u32,
    pub remaining: u32,
    pub reset_seconds: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitsUpdated {
    pub event_id: String,
    pub rate_limits: Vec<RateLimit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResponseCreated {
    pub event_id: String,
    pub response: ResponseInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResponseDone {
    pub event_id: String,
    pub response: ResponseInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResponseOutputItem {
    pub event_id: String,
    pub response_id: String,
    pub output_index: u32,
    pub item: ConversationItem,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResponseContentPart {
    pub event_id: String,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    pub part: ContentPart,
}

/// Incremental chunk of a streamed text, audio or transcript output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResponseDelta {
    pub event_id: String,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    pub delta: String,
}

impl ResponseDelta {
    /// Key identifying the stream this chunk belongs to: its response id.
    #[must_use]
    pub fn stream_key(&self) -> &str {
        &self.response_id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResponseTextDone {
    pub event_id: String,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    pub text: String,
}

impl ResponseTextDone {
    #[must_use]
    pub fn stream_key(&self) -> &str {
        &self.response_id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResponseAudioDone {
    pub event_id: String,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
}

impl ResponseAudioDone {
    #[must_use]
    pub fn stream_key(&self) -> &str {
        &self.response_id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResponseAudioTranscriptDone {
    pub event_id: String,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    pub transcript: String,
}

impl ResponseAudioTranscriptDone {
    #[must_use]
    pub fn stream_key(&self) -> &str {
        &self.response_id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FunctionCallArgumentsDelta {
    pub event_id: String,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub call_id: String,
    pub delta: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FunctionCallArgumentsDone {
    pub event_id: String,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub call_id: String,
    pub name: Option<String>,
    pub arguments: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpeechStarted {
    pub event_id: String,
    pub audio_start_ms: u64,
    pub item_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpeechStopped {
    pub event_id: String,
    pub audio_end_ms: u64,
    pub item_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputAudioBufferCommitted {
    pub event_id: String,
    pub previous_item_id: Option<String>,
    pub item_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputAudioBufferCleared {
    pub event_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConversationItemCreated {
    pub event_id: String,
    pub previous_item_id: Option<String>,
    pub item: ConversationItem,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TranscriptionCompleted {
    pub event_id: String,
    pub item_id: String,
    pub content_index: u32,
    pub transcript: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TranscriptionFailed {
    pub event_id: String,
    pub item_id: String,
    pub content_index: u32,
    pub error: ServerError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConversationItemTruncated {
    pub event_id: String,
    pub item_id: String,
    pub content_index: u32,
    pub audio_end_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConversationItemDeleted {
    pub event_id: String,
    pub item_id: String,
}

macro_rules! event_catalog {
    ($($variant:ident($payload:ty) => $tag:literal,)+) => {
        /// Routing key of a server event, one per wire tag.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventType {
            $($variant,)+
            /// Any tag this crate does not recognise.
            Unknown,
        }

        impl EventType {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            #[must_use]
            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some(Self::$variant),)+
                    _ => None,
                }
            }

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                    Self::Unknown => "unknown",
                }
            }
        }

        #[derive(Debug, Clone, PartialEq)]
        pub enum ServerEvent {
            $($variant($payload),)+
            /// An event with an unrecognised tag, kept as raw JSON.
            Unknown { event_type: String, payload: Value },
        }

        impl ServerEvent {
            #[must_use]
            pub const fn event_type(&self) -> EventType {
                match self {
                    $(Self::$variant(_) => EventType::$variant,)+
                    Self::Unknown { .. } => EventType::Unknown,
                }
            }

            #[must_use]
            pub fn event_id(&self) -> Option<&str> {
                match self {
                    $(Self::$variant(payload) => Some(payload.event_id.as_str()),)+
                    Self::Unknown { payload, .. } => {
                        payload.get("event_id").and_then(Value::as_str)
                    }
                }
            }

            /// Decode the payload of a message already routed to `event_type`.
            ///
            /// # Errors
            /// Returns an error if `raw` does not match the payload shape of `event_type`.
            pub fn decode(event_type: EventType, raw: &str) -> serde_json::Result<Self> {
                match event_type {
                    $(EventType::$variant => serde_json::from_str(raw).map(Self::$variant),)+
                    EventType::Unknown => {
                        let payload: Value = serde_json::from_str(raw)?;
                        let event_type = payload
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_owned();
                        Ok(Self::Unknown { event_type, payload })
                    }
                }
            }
        }
    };
}

event_catalog! {
    Error(ErrorEvent) => "error",
    SessionCreated(SessionCreated) => "session.created",
    SessionUpdated(SessionUpdated) => "session.updated",
    RateLimitsUpdated(RateLimitsUpdated) => "rate_limits.updated",
    ResponseCreated(ResponseCreated) => "response.created",
    ResponseDone(ResponseDone) => "response.done",
    ResponseOutputItemAdded(ResponseOutputItem) => "response.output_item.added",
    ResponseOutputItemDone(ResponseOutputItem) => "response.output_item.done",
    ResponseContentPartAdded(ResponseContentPart) => "response.content_part.added",
    ResponseContentPartDone(ResponseContentPart) => "response.content_part.done",
    ResponseTextDelta(ResponseDelta) => "response.text.delta",
    ResponseTextDone(ResponseTextDone) => "response.text.done",
    ResponseAudioDelta(ResponseDelta) => "response.audio.delta",
    ResponseAudioDone(ResponseAudioDone) => "response.audio.done",
    ResponseAudioTranscriptDelta(ResponseDelta) => "response.audio_transcript.delta",
    ResponseAudioTranscriptDone(ResponseAudioTranscriptDone) => "response.audio_transcript.done",
    ResponseFunctionCallArgumentsDelta(FunctionCallArgumentsDelta) => "response.function_call_arguments.delta",
    ResponseFunctionCallArgumentsDone(FunctionCallArgumentsDone) => "response.function_call_arguments.done",
    InputAudioBufferSpeechStarted(SpeechStarted) => "input_audio_buffer.speech_started",
    InputAudioBufferSpeechStopped(SpeechStopped) => "input_audio_buffer.speech_stopped",
    InputAudioBufferCommitted(InputAudioBufferCommitted) => "input_audio_buffer.committed",
    InputAudioBufferCleared(InputAudioBufferCleared) => "input_audio_buffer.cleared",
    ConversationItemCreated(ConversationItemCreated) => "conversation.item.created",
    ConversationItemInputAudioTranscriptionCompleted(TranscriptionCompleted) => "conversation.item.input_audio_transcription.completed",
    ConversationItemInputAudioTranscriptionFailed(TranscriptionFailed) => "conversation.item.input_audio_transcription.failed",
    ConversationItemTruncated(ConversationItemTruncated) => "conversation.item.truncated",
    ConversationItemDeleted(ConversationItemDeleted) => "conversation.item.deleted",
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServerEvent {
    /// Route and decode a complete inbound message. Unrecognised tags become
    /// [`ServerEvent::Unknown`].
    ///
    /// # Errors
    /// Returns an error if the message has no `type` or its payload is malformed.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let envelope = Envelope::parse(raw)?;
        let event_type = EventType::from_tag(&envelope.event_type).unwrap_or(EventType::Unknown);
        Self::decode(event_type, raw)
    }
}
