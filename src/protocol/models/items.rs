use serde::{Deserialize, Serialize};

use super::{ItemStatus, Role};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    Message,
    FunctionCall,
    FunctionCallOutput,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    InputText,
    InputAudio,
    Text,
    Audio,
    ItemReference,
    #[serde(other)]
    Unknown,
}

/// One content part of a message item.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64-encoded audio bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ContentPart {
    #[must_use]
    pub fn input_text(text: impl Into<String>) -> Self {
        Self {
            kind: ContentType::InputText,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn input_audio(audio_b64: impl Into<String>) -> Self {
        Self {
            kind: ContentType::InputAudio,
            audio: Some(audio_b64.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ContentType::Text,
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// A conversation item: a message, a function call, or a function call's result.
///
/// Fields that only make sense for one item type are left `None` for the others;
/// the service, not the client, enforces that pairing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConversationItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ConversationItem {
    #[must_use]
    pub fn message(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            kind: ItemType::Message,
            role: Some(role),
            content,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::message(Role::User, vec![ContentPart::input_text(text)])
    }

    #[must_use]
    pub fn system_text(text: impl Into<String>) -> Self {
        Self::message(Role::System, vec![ContentPart::input_text(text)])
    }

    #[must_use]
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::message(Role::Assistant, vec![ContentPart::text(text)])
    }

    #[must_use]
    pub fn user_audio(audio_b64: impl Into<String>) -> Self {
        Self::message(Role::User, vec![ContentPart::input_audio(audio_b64)])
    }

    #[must_use]
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            kind: ItemType::FunctionCallOutput,
            call_id: Some(call_id.into()),
            output: Some(output.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Concatenated text and transcripts of every content part.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| part.text.as_deref().or(part.transcript.as_deref()))
            .collect()
    }
}
