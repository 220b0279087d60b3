use azure_rt_rs::protocol::models::{
    AudioFormat, ConversationItem, Eagerness, ItemType, Modality, ResponseOptions, SessionConfig,
    TurnDetection, Voice,
};
use azure_rt_rs::validate::{
    MAX_APPEND_BYTES, MAX_CONVERSATION_ID_CHARS, MAX_INSTRUCTIONS_CHARS, validate_client_event,
    validate_item, validate_pcm16, validate_response_options, validate_session, validate_truncate,
    validate_turn_detection,
};
use azure_rt_rs::{ClientEvent, ConfigError};

fn field(result: Result<(), ConfigError>) -> &'static str {
    result.expect_err("expected a validation error").field
}

// =============================================================================
// Session
// =============================================================================

#[test]
fn every_documented_voice_is_accepted() {
    for voice in Voice::ALL {
        assert!(validate_session(&SessionConfig::new().with_voice(*voice)).is_ok());
    }
}

#[test]
fn unknown_voice_is_rejected() {
    let err = validate_session(&SessionConfig::new().with_voice("robot")).unwrap_err();
    assert_eq!(err.field, "voice");
    assert_eq!(err.value.as_deref(), Some("robot"));
    assert!(err.message.contains("alloy"));
}

#[test]
fn audio_formats_are_checked_both_ways() {
    for format in AudioFormat::ALL {
        let session = SessionConfig::new()
            .with_input_audio_format(*format)
            .with_output_audio_format(*format);
        assert!(validate_session(&session).is_ok());
    }
    assert_eq!(
        field(validate_session(&SessionConfig::new().with_input_audio_format("mp3"))),
        "input_audio_format"
    );
    assert_eq!(
        field(validate_session(&SessionConfig::new().with_output_audio_format("wav"))),
        "output_audio_format"
    );
}

#[test]
fn instructions_length_is_bounded() {
    let at_limit = "a".repeat(MAX_INSTRUCTIONS_CHARS);
    assert!(validate_session(&SessionConfig::new().with_instructions(at_limit.clone())).is_ok());
    let over = format!("{at_limit}a");
    assert_eq!(
        field(validate_session(&SessionConfig::new().with_instructions(over))),
        "instructions"
    );
}

// =============================================================================
// Turn detection
// =============================================================================

#[test]
fn server_vad_threshold_must_be_a_probability() {
    let err =
        validate_turn_detection(&TurnDetection::server_vad().with_threshold(1.5)).unwrap_err();
    assert_eq!(err.field, "turn_detection.threshold");
    assert!(err.to_string().contains("between 0.0 and 1.0"));

    for threshold in [0.0, 0.5, 1.0] {
        let detection = TurnDetection::server_vad().with_threshold(threshold);
        assert!(validate_turn_detection(&detection).is_ok());
    }
    assert!(validate_turn_detection(&TurnDetection::server_vad().with_threshold(-0.1)).is_err());
}

#[test]
fn server_vad_durations_must_be_non_negative() {
    assert_eq!(
        field(validate_turn_detection(
            &TurnDetection::server_vad().with_prefix_padding_ms(-1)
        )),
        "turn_detection.prefix_padding_ms"
    );
    assert_eq!(
        field(validate_turn_detection(
            &TurnDetection::server_vad().with_silence_duration_ms(-1)
        )),
        "turn_detection.silence_duration_ms"
    );
    let ok = TurnDetection::server_vad()
        .with_prefix_padding_ms(0)
        .with_silence_duration_ms(500);
    assert!(validate_turn_detection(&ok).is_ok());
}

#[test]
fn semantic_vad_checks_eagerness() {
    for eagerness in Eagerness::ALL {
        let detection = TurnDetection::semantic_vad().with_eagerness(*eagerness);
        assert!(validate_turn_detection(&detection).is_ok());
    }
    let mut bad = TurnDetection::semantic_vad();
    bad.eagerness = Some("frantic".to_string());
    assert_eq!(field(validate_turn_detection(&bad)), "turn_detection.eagerness");
}

#[test]
fn empty_eagerness_counts_as_unset() {
    let mut detection = TurnDetection::semantic_vad();
    detection.eagerness = Some(String::new());
    assert!(validate_turn_detection(&detection).is_ok());
}

#[test]
fn unknown_turn_detection_type_is_rejected() {
    let mut detection = TurnDetection::server_vad();
    detection.kind = "client_vad".to_string();
    assert_eq!(field(validate_turn_detection(&detection)), "turn_detection.type");
    detection.kind = String::new();
    assert_eq!(field(validate_turn_detection(&detection)), "turn_detection.type");
}

#[test]
fn session_validation_reaches_turn_detection() {
    let session =
        SessionConfig::new().with_turn_detection(TurnDetection::server_vad().with_threshold(2.0));
    assert_eq!(field(validate_session(&session)), "turn_detection.threshold");
}

// =============================================================================
// Response options
// =============================================================================

#[test]
fn response_modalities_and_temperature() {
    let ok = ResponseOptions::new()
        .with_modalities(&[Modality::Text, Modality::Audio])
        .with_temperature(0.8);
    assert!(validate_response_options(&ok).is_ok());

    let mut bad = ResponseOptions::new();
    bad.modalities = Some(vec!["video".to_string()]);
    assert_eq!(field(validate_response_options(&bad)), "modalities");

    for temperature in [-0.1, 2.1] {
        let options = ResponseOptions::new().with_temperature(temperature);
        assert_eq!(field(validate_response_options(&options)), "temperature");
    }
}

#[test]
fn response_text_fields_are_bounded() {
    let long = "x".repeat(MAX_INSTRUCTIONS_CHARS + 1);
    assert_eq!(
        field(validate_response_options(&ResponseOptions::new().with_prompt(long.clone()))),
        "prompt"
    );
    assert_eq!(
        field(validate_response_options(&ResponseOptions::new().with_instructions(long))),
        "instructions"
    );
    let conversation = "c".repeat(MAX_CONVERSATION_ID_CHARS + 1);
    assert_eq!(
        field(validate_response_options(&ResponseOptions::new().with_conversation(conversation))),
        "conversation"
    );
    assert!(validate_response_options(&ResponseOptions::new().with_conversation("none")).is_ok());
}

// =============================================================================
// Audio payloads
// =============================================================================

#[test]
fn pcm16_alignment_and_size() {
    assert!(validate_pcm16(&[]).is_ok());
    assert!(validate_pcm16(&[0, 0]).is_ok());
    assert!(
        validate_pcm16(&[0, 0, 0])
            .unwrap_err()
            .to_string()
            .contains("even number of bytes")
    );
    assert!(validate_pcm16(&vec![0; MAX_APPEND_BYTES]).is_ok());
    assert!(
        validate_pcm16(&vec![0; MAX_APPEND_BYTES + 2])
            .unwrap_err()
            .to_string()
            .contains("too large")
    );
}

#[test]
fn exactly_one_mebibyte_plus_one_is_too_large() {
    let err = validate_pcm16(&vec![0; MAX_APPEND_BYTES + 1]).unwrap_err();
    assert_eq!(err.field, "audio");
    assert!(err.to_string().contains("too large"), "{err}");
}

#[test]
fn raw_append_must_be_base64() {
    let event = ClientEvent::InputAudioBufferAppend {
        event_id: None,
        audio: "not base64!".to_string(),
    };
    assert_eq!(field(validate_client_event(&event)), "audio");

    let odd = ClientEvent::InputAudioBufferAppend {
        event_id: None,
        audio: "AAAA".to_string(),
    };
    assert!(
        validate_client_event(&odd)
            .unwrap_err()
            .message
            .contains("even number of bytes")
    );
}

// =============================================================================
// Conversation items
// =============================================================================

#[test]
fn message_items_need_a_role() {
    assert!(validate_item(&ConversationItem::user_text("hi")).is_ok());
    let mut item = ConversationItem::user_text("hi");
    item.role = None;
    assert_eq!(field(validate_item(&item)), "item.role");
}

#[test]
fn function_call_output_needs_call_id() {
    assert!(validate_item(&ConversationItem::function_call_output("call_1", "{}")).is_ok());
    let item = ConversationItem::function_call_output(" ", "{}");
    assert_eq!(field(validate_item(&item)), "item.call_id");
}

#[test]
fn function_call_needs_name() {
    let mut item = ConversationItem::function_call_output("call_1", "{}");
    item.kind = ItemType::FunctionCall;
    assert_eq!(field(validate_item(&item)), "item.name");
}

#[test]
fn truncate_and_delete_identifiers() {
    assert!(validate_truncate("item_1", 0).is_ok());
    assert_eq!(field(validate_truncate("", 10)), "item_id");
    assert_eq!(field(validate_truncate("item_1", -5)), "audio_end_ms");

    let delete = ClientEvent::ConversationItemDelete {
        event_id: None,
        item_id: String::new(),
    };
    assert_eq!(field(validate_client_event(&delete)), "item_id");

    let create = ClientEvent::ConversationItemCreate {
        event_id: None,
        previous_item_id: Some(String::new()),
        item: Box::new(ConversationItem::user_text("hi")),
    };
    assert_eq!(field(validate_client_event(&create)), "previous_item_id");
}

#[test]
fn fixed_payload_commands_always_pass() {
    for event in [
        ClientEvent::InputAudioBufferCommit { event_id: None },
        ClientEvent::InputAudioBufferClear { event_id: None },
        ClientEvent::ResponseCancel { event_id: None },
    ] {
        assert!(validate_client_event(&event).is_ok());
    }
}
