//! Reassembly of streamed response deltas.
//!
//! Assemblers are plain values owned by the caller; share one across handlers
//! behind a mutex.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::protocol::server_events::{
    ResponseAudioDone, ResponseAudioTranscriptDone, ResponseDelta, ResponseTextDone,
};

#[derive(Debug, Default)]
struct Streams<B> {
    buffers: HashMap<String, B>,
}

impl<B: Default> Streams<B> {
    fn buffer(&mut self, key: &str) -> &mut B {
        self.buffers.entry(key.to_owned()).or_default()
    }

    fn take(&mut self, key: &str) -> B {
        self.buffers.remove(key).unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.buffers.len()
    }
}

/// Accumulates text deltas per stream. The typed adapters key streams by
/// response id, so every item and content part of a response lands in one buffer.
#[derive(Debug, Default)]
pub struct TextAssembler {
    streams: Streams<String>,
}

impl TextAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_delta(&mut self, key: &str, delta: &str) {
        self.streams.buffer(key).push_str(delta);
    }

    /// Finish a stream. A non-empty `final_text` wins over the accumulated
    /// deltas; the stream's buffer is released either way.
    pub fn on_done(&mut self, key: &str, final_text: Option<&str>) -> String {
        let accumulated = self.streams.take(key);
        match final_text {
            Some(text) if !text.is_empty() => text.to_owned(),
            _ => accumulated,
        }
    }

    /// Feed a `response.text.delta` or `response.audio_transcript.delta` event.
    pub fn on_text_delta(&mut self, event: &ResponseDelta) {
        self.on_delta(event.stream_key(), &event.delta);
    }

    pub fn on_text_done(&mut self, event: &ResponseTextDone) -> String {
        self.on_done(event.stream_key(), Some(&event.text))
    }

    pub fn on_transcript_done(&mut self, event: &ResponseAudioTranscriptDone) -> String {
        self.on_done(event.stream_key(), Some(&event.transcript))
    }

    /// Streams started but not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.streams.len()
    }
}

/// Accumulates base64 audio deltas per stream as raw bytes.
#[derive(Debug, Default)]
pub struct AudioAssembler {
    streams: Streams<Vec<u8>>,
}

impl AudioAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and append one chunk. A chunk that fails to decode leaves the
    /// buffer untouched.
    ///
    /// # Errors
    /// Returns an error if `delta_b64` is not valid base64.
    pub fn on_delta(&mut self, key: &str, delta_b64: &str) -> Result<(), base64::DecodeError> {
        let bytes = STANDARD.decode(delta_b64)?;
        self.streams.buffer(key).extend_from_slice(&bytes);
        Ok(())
    }

    /// Finish a stream, returning its bytes and releasing the buffer.
    pub fn on_done(&mut self, key: &str) -> Vec<u8> {
        self.streams.take(key)
    }

    /// Feed a `response.audio.delta` event.
    ///
    /// # Errors
    /// Returns an error if the delta is not valid base64.
    pub fn on_audio_delta(&mut self, event: &ResponseDelta) -> Result<(), base64::DecodeError> {
        self.on_delta(event.stream_key(), &event.delta)
    }

    pub fn on_audio_done(&mut self, event: &ResponseAudioDone) -> Vec<u8> {
        self.on_done(event.stream_key())
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.streams.len()
    }
}
