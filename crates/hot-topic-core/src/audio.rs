//! Canonical audio payload.
//!
//! Synthesizers and the event stream have historically carried audio in three
//! shapes: a Node-style readable stream snapshot (`_readableState.buffer[].data`),
//! a flat byte array (`{"data": [...]}` or a bare array), and a base64 string.
//! [`AudioPayload`] accepts all of them on the way in and always serializes as
//! base64, so application code only ever sees bytes.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HotTopicError, Result};

/// Synthesized speech bytes for one topic result.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioPayload {
    bytes: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AudioShape {
    Base64(String),
    Flat(Vec<u8>),
    Nested {
        #[serde(rename = "_readableState")]
        readable_state: ReadableState,
    },
    Buffer {
        data: Vec<u8>,
    },
}

#[derive(Deserialize)]
struct ReadableState {
    #[serde(default)]
    buffer: Vec<BufferChunk>,
}

#[derive(Deserialize)]
struct BufferChunk {
    data: Vec<u8>,
}

impl AudioShape {
    fn into_payload(self) -> Result<AudioPayload> {
        match self {
            AudioShape::Base64(s) => AudioPayload::from_base64(&s),
            AudioShape::Flat(data) | AudioShape::Buffer { data } => AudioPayload::from_bytes(data),
            AudioShape::Nested { readable_state } => {
                let bytes: Vec<u8> = readable_state
                    .buffer
                    .into_iter()
                    .flat_map(|chunk| chunk.data)
                    .collect();
                AudioPayload::from_bytes(bytes)
            }
        }
    }
}

impl AudioPayload {
    /// Wrap raw bytes. Empty audio is rejected.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(HotTopicError::Audio("audio payload is empty".into()));
        }
        Ok(Self { bytes })
    }

    /// Decode a base64 string, optionally prefixed with a `data:<mime>;base64,` header.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let trimmed = encoded.trim();
        let body = match trimmed.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => trimmed,
        };
        let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(&compact)
            .or_else(|_| STANDARD_NO_PAD.decode(&compact))
            .map_err(|e| HotTopicError::Audio(format!("invalid base64 audio: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// Normalize any accepted JSON representation.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let shape = AudioShape::deserialize(value).map_err(|_| {
            HotTopicError::Audio(format!("unrecognized audio payload shape: {}", shape_hint(value)))
        })?;
        shape.into_payload()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// MIME type sniffed from the leading magic bytes.
    pub fn mime_type(&self) -> &'static str {
        let b = self.bytes.as_slice();
        if b.len() >= 12 && &b[..4] == b"RIFF" && &b[8..12] == b"WAVE" {
            "audio/wav"
        } else if b.starts_with(b"ID3") || (b.len() >= 2 && b[0] == 0xFF && b[1] & 0xE0 == 0xE0) {
            "audio/mpeg"
        } else if b.starts_with(b"OggS") {
            "audio/ogg"
        } else {
            "application/octet-stream"
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type() {
            "audio/wav" => "wav",
            "audio/mpeg" => "mp3",
            "audio/ogg" => "ogg",
            _ => "bin",
        }
    }

    /// `data:` URL an `<audio>` element can play directly.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }
}

fn shape_hint(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioPayload")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type())
            .finish()
    }
}

impl Serialize for AudioPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for AudioPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let shape = AudioShape::deserialize(deserializer)?;
        shape.into_payload().map_err(serde::de::Error::custom)
    }
}
