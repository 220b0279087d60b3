//! Client-side checks run before a command reaches the wire.
//!
//! Each validator reports the first offending field as a [`ConfigError`]; a
//! rejected command is never transmitted.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ConfigError;
use crate::protocol::client_events::ClientEvent;
use crate::protocol::models::{
    AudioFormat, ConversationItem, Eagerness, ItemType, Modality, ResponseOptions, SessionConfig,
    TurnDetection, TurnDetectionType, Voice,
};

pub const MAX_INSTRUCTIONS_CHARS: usize = 10_000;
pub const MAX_PROMPT_CHARS: usize = 10_000;
pub const MAX_CONVERSATION_ID_CHARS: usize = 100;
/// Largest PCM16 payload accepted by a single append.
pub const MAX_APPEND_BYTES: usize = 1024 * 1024;

fn one_of(field: &'static str, value: &str, allowed: &[&str]) -> ConfigError {
    ConfigError::new(field, format!("must be one of: {}", allowed.join(", "))).with_value(value)
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ConfigError> {
    let chars = value.chars().count();
    if chars > max {
        return Err(ConfigError::new(
            field,
            format!("too long ({chars} characters), maximum is {max}"),
        ));
    }
    Ok(())
}

/// # Errors
/// Returns the first field of `session` outside its accepted values.
pub fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if let Some(voice) = session.voice.as_deref() {
        if Voice::parse(voice).is_none() {
            return Err(one_of("voice", voice, &Voice::names()));
        }
    }
    if let Some(format) = session.input_audio_format.as_deref() {
        if AudioFormat::parse(format).is_none() {
            return Err(one_of("input_audio_format", format, &AudioFormat::names()));
        }
    }
    if let Some(format) = session.output_audio_format.as_deref() {
        if AudioFormat::parse(format).is_none() {
            return Err(one_of("output_audio_format", format, &AudioFormat::names()));
        }
    }
    if let Some(turn_detection) = &session.turn_detection {
        validate_turn_detection(turn_detection)?;
    }
    if let Some(instructions) = session.instructions.as_deref() {
        check_length("instructions", instructions, MAX_INSTRUCTIONS_CHARS)?;
    }
    Ok(())
}

/// # Errors
/// Returns an error if the detection type is unknown or a parameter for that type
/// is out of range.
pub fn validate_turn_detection(turn_detection: &TurnDetection) -> Result<(), ConfigError> {
    if turn_detection.kind.is_empty() {
        return Err(ConfigError::new("turn_detection.type", "cannot be empty"));
    }
    match TurnDetectionType::parse(&turn_detection.kind) {
        Some(TurnDetectionType::ServerVad) => {
            if let Some(threshold) = turn_detection.threshold {
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(ConfigError::new(
                        "turn_detection.threshold",
                        "must be between 0.0 and 1.0",
                    )
                    .with_value(threshold));
                }
            }
            if let Some(ms) = turn_detection.prefix_padding_ms.filter(|ms| *ms < 0) {
                return Err(ConfigError::new(
                    "turn_detection.prefix_padding_ms",
                    "must be non-negative",
                )
                .with_value(ms));
            }
            if let Some(ms) = turn_detection.silence_duration_ms.filter(|ms| *ms < 0) {
                return Err(ConfigError::new(
                    "turn_detection.silence_duration_ms",
                    "must be non-negative",
                )
                .with_value(ms));
            }
        }
        Some(TurnDetectionType::SemanticVad) => {
            // An empty eagerness counts as unset.
            if let Some(eagerness) = turn_detection
                .eagerness
                .as_deref()
                .filter(|eagerness| !eagerness.is_empty())
            {
                if Eagerness::parse(eagerness).is_none() {
                    return Err(one_of(
                        "turn_detection.eagerness",
                        eagerness,
                        &Eagerness::names(),
                    ));
                }
            }
        }
        None => {
            return Err(one_of(
                "turn_detection.type",
                &turn_detection.kind,
                &TurnDetectionType::names(),
            ));
        }
    }
    Ok(())
}

/// # Errors
/// Returns the first option of `options` outside its accepted values.
pub fn validate_response_options(options: &ResponseOptions) -> Result<(), ConfigError> {
    for modality in options.modalities.iter().flatten() {
        if Modality::parse(modality).is_none() {
            return Err(one_of("modalities", modality, &Modality::names()));
        }
    }
    if let Some(temperature) = options.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::new("temperature", "must be between 0.0 and 2.0")
                .with_value(temperature));
        }
    }
    if let Some(prompt) = options.prompt.as_deref() {
        check_length("prompt", prompt, MAX_PROMPT_CHARS)?;
    }
    if let Some(instructions) = options.instructions.as_deref() {
        check_length("instructions", instructions, MAX_INSTRUCTIONS_CHARS)?;
    }
    if let Some(conversation) = options.conversation.as_deref() {
        check_length("conversation", conversation, MAX_CONVERSATION_ID_CHARS)?;
    }
    Ok(())
}

/// Validate a PCM16 payload for `input_audio_buffer.append`. Empty input is valid
/// and is sent as nothing.
///
/// # Errors
/// Returns an error if the length is odd or exceeds [`MAX_APPEND_BYTES`].
pub fn validate_pcm16(pcm: &[u8]) -> Result<(), ConfigError> {
    if pcm.len() > MAX_APPEND_BYTES {
        return Err(ConfigError::new(
            "audio",
            format!(
                "PCM data too large ({} bytes), maximum is {MAX_APPEND_BYTES} bytes",
                pcm.len()
            ),
        ));
    }
    if pcm.len() % 2 != 0 {
        return Err(
            ConfigError::new("audio", "PCM16 data must contain an even number of bytes")
                .with_value(pcm.len()),
        );
    }
    Ok(())
}

/// # Errors
/// Returns an error if `value` is empty or whitespace.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::new(field, "cannot be empty"));
    }
    Ok(())
}

/// # Errors
/// Returns an error if a field required by the item's type is missing.
pub fn validate_item(item: &ConversationItem) -> Result<(), ConfigError> {
    match item.kind {
        ItemType::Message => {
            if item.role.is_none() {
                return Err(ConfigError::new("item.role", "is required for message items"));
            }
        }
        ItemType::FunctionCall => {
            validate_identifier("item.call_id", item.call_id.as_deref().unwrap_or_default())?;
            validate_identifier("item.name", item.name.as_deref().unwrap_or_default())?;
        }
        ItemType::FunctionCallOutput => {
            validate_identifier("item.call_id", item.call_id.as_deref().unwrap_or_default())?;
        }
        ItemType::Unknown => {
            return Err(ConfigError::new(
                "item.type",
                "must be one of: message, function_call, function_call_output",
            ));
        }
    }
    Ok(())
}

/// # Errors
/// Returns an error if the item id is empty or the offset is negative.
pub fn validate_truncate(item_id: &str, audio_end_ms: i64) -> Result<(), ConfigError> {
    validate_identifier("item_id", item_id)?;
    if audio_end_ms < 0 {
        return Err(
            ConfigError::new("audio_end_ms", "must be non-negative").with_value(audio_end_ms),
        );
    }
    Ok(())
}

/// Validate any outbound command with the rule for its type.
///
/// # Errors
/// Returns the first violation found in `event`.
pub fn validate_client_event(event: &ClientEvent) -> Result<(), ConfigError> {
    match event {
        ClientEvent::SessionUpdate { session, .. } => validate_session(session),
        ClientEvent::InputAudioBufferAppend { audio, .. } => {
            let pcm = STANDARD
                .decode(audio)
                .map_err(|err| ConfigError::new("audio", format!("must be valid base64: {err}")))?;
            validate_pcm16(&pcm)
        }
        ClientEvent::ConversationItemCreate {
            previous_item_id,
            item,
            ..
        } => {
            if let Some(previous) = previous_item_id.as_deref() {
                validate_identifier("previous_item_id", previous)?;
            }
            validate_item(item)
        }
        ClientEvent::ConversationItemTruncate {
            item_id,
            audio_end_ms,
            ..
        } => validate_truncate(item_id, *audio_end_ms),
        ClientEvent::ConversationItemDelete { item_id, .. } => {
            validate_identifier("item_id", item_id)
        }
        ClientEvent::ResponseCreate { response, .. } => validate_response_options(response),
        ClientEvent::InputAudioBufferCommit { .. }
        | ClientEvent::InputAudioBufferClear { .. }
        | ClientEvent::ResponseCancel { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_limits_count_characters() {
        let accented = "é".repeat(MAX_INSTRUCTIONS_CHARS);
        assert!(check_length("instructions", &accented, MAX_INSTRUCTIONS_CHARS).is_ok());
        let err = check_length("instructions", &format!("{accented}x"), MAX_INSTRUCTIONS_CHARS)
            .unwrap_err();
        assert!(err.message.contains("10001 characters"));
    }
}
