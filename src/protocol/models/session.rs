use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Eagerness, Tool, TurnDetectionType};

/// Session settings sent with `session.update`.
///
/// Every field is optional; an absent field is omitted from the payload so the
/// service keeps its current value.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    #[must_use]
    pub fn with_input_audio_format(mut self, format: impl Into<String>) -> Self {
        self.input_audio_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_output_audio_format(mut self, format: impl Into<String>) -> Self {
        self.output_audio_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_transcription(mut self, transcription: InputAudioTranscription) -> Self {
        self.input_audio_transcription = Some(transcription);
        self
    }

    #[must_use]
    pub fn with_turn_detection(mut self, turn_detection: TurnDetection) -> Self {
        self.turn_detection = Some(turn_detection);
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct InputAudioTranscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl InputAudioTranscription {
    #[must_use]
    pub fn model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }
}

/// Voice-activity configuration. Which parameters apply depends on `kind`:
/// `server_vad` reads the threshold and timings, `semantic_vad` reads eagerness.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_response: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_response: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eagerness: Option<String>,
}

impl TurnDetection {
    #[must_use]
    pub fn server_vad() -> Self {
        Self {
            kind: TurnDetectionType::ServerVad.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn semantic_vad() -> Self {
        Self {
            kind: TurnDetectionType::SemanticVad.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[must_use]
    pub const fn with_prefix_padding_ms(mut self, ms: i32) -> Self {
        self.prefix_padding_ms = Some(ms);
        self
    }

    #[must_use]
    pub const fn with_silence_duration_ms(mut self, ms: i32) -> Self {
        self.silence_duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub const fn with_create_response(mut self, enabled: bool) -> Self {
        self.create_response = Some(enabled);
        self
    }

    #[must_use]
    pub const fn with_interrupt_response(mut self, enabled: bool) -> Self {
        self.interrupt_response = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_eagerness(mut self, eagerness: Eagerness) -> Self {
        self.eagerness = Some(eagerness.into());
        self
    }
}

/// Session state echoed back by `session.created` and `session.updated`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SessionInfo {
    pub id: String,
    pub object: Option<String>,
    pub model: String,
    pub modalities: Vec<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub input_audio_format: Option<String>,
    pub output_audio_format: Option<String>,
    pub input_audio_transcription: Option<InputAudioTranscription>,
    pub turn_detection: Option<TurnDetection>,
    /// Tool definitions as echoed by the service, left untyped.
    pub tools: Vec<Value>,
    pub temperature: Option<f64>,
    pub expires_at: Option<i64>,
}
