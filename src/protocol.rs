//! Wire types shared with the plant pot backend
//!
//! The backend keys conversations by integer row id and marks a reply as
//! still-finalizing with the `"..."` placeholder; [`REPLY_PENDING`] is the
//! single source of truth for that sentinel on the client side.

use serde::Deserialize;

use crate::audio::WavBlob;

/// Placeholder reply text the backend returns before finalization completes
pub const REPLY_PENDING: &str = "...";

/// Why the device is contacting the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Operator held the wake button and spoke a query
    WakeWord,
    /// Operator typed a query
    Text,
    /// Manual low-moisture alert, no audio or text payload
    LowMoistureAlert,
}

impl EventKind {
    /// Wire value for the `event` query parameter
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WakeWord => "wake_word",
            Self::Text => "text",
            Self::LowMoistureAlert => "low_moisture_alert",
        }
    }
}

/// Environment snapshot sent with every query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Temperature in degrees Celsius
    pub temperature: f32,
    /// Soil moisture in percent
    pub moisture: f32,
    /// Ambient light in percent
    pub light: f32,
}

/// Query payload accompanying the sensor snapshot
#[derive(Debug, Clone)]
pub enum QueryInput {
    /// Captured utterance, already in canonical WAV form
    Audio(WavBlob),
    /// Typed query text
    Text(String),
}

/// One outbound query: who, what, and under which conditions
#[derive(Debug, Clone)]
pub struct QueryEnvelope {
    /// Device identifier the backend files everything under
    pub device_id: String,
    /// Environment snapshot at the moment of the query
    pub sensors: SensorSnapshot,
    /// Event tag
    pub event: EventKind,
    /// Audio or text payload; `None` for sensor-only alerts
    pub input: Option<QueryInput>,
}

impl QueryEnvelope {
    /// Envelope for a captured voice query
    #[must_use]
    pub fn voice(device_id: impl Into<String>, sensors: SensorSnapshot, audio: WavBlob) -> Self {
        Self {
            device_id: device_id.into(),
            sensors,
            event: EventKind::WakeWord,
            input: Some(QueryInput::Audio(audio)),
        }
    }

    /// Envelope for a typed query
    #[must_use]
    pub fn text(device_id: impl Into<String>, sensors: SensorSnapshot, query: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            sensors,
            event: EventKind::Text,
            input: Some(QueryInput::Text(query.into())),
        }
    }

    /// Envelope for a manual low-moisture alert
    #[must_use]
    pub fn alert(device_id: impl Into<String>, sensors: SensorSnapshot) -> Self {
        Self {
            device_id: device_id.into(),
            sensors,
            event: EventKind::LowMoistureAlert,
            input: None,
        }
    }
}

/// Display hints attached to a reply
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayHints {
    /// Mood tag driving the avatar (e.g. "thirsty", "happy", "neutral")
    pub mood: String,

    /// Reply priority ("low", "medium", "high")
    #[serde(default)]
    pub priority: Option<String>,
}

/// Initial backend response to an ingest call
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyEnvelope {
    /// Conversation id correlating this reply with its history record
    pub id: i64,

    /// Recognized user text, absent when recognition is still running
    #[serde(default)]
    pub user_query: Option<String>,

    /// Provisional reply text; may equal [`REPLY_PENDING`]
    pub reply_text: String,

    /// Locator for the primary spoken reply
    pub audio_url: String,

    /// Display hints
    pub display: DisplayHints,

    /// Locator for a secondary notification clip, if the backend queued one
    #[serde(default)]
    pub notification_audio_url: Option<String>,
}

/// Snapshot of a server-held conversation history entry
///
/// The client never owns these; it only reads them while reconciling the
/// transcript. The reply is final once `reply_text` differs from
/// [`REPLY_PENDING`].
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRecord {
    /// Conversation id
    pub id: i64,

    /// Recognized user text
    #[serde(default)]
    pub user_query: Option<String>,

    /// Reply text, possibly still the placeholder
    pub reply_text: String,

    /// Mood tag recorded with the reply
    #[serde(default)]
    pub mood: Option<String>,
}

impl ConversationRecord {
    /// Whether the reply text has been finalized server-side
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.reply_text != REPLY_PENDING
    }
}
