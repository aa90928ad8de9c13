//! Interaction orchestration
//!
//! Drives one query/response/reconciliation cycle: submit the envelope,
//! render the provisional transcript, play the spoken reply, then poll the
//! conversation history until the reply text is finalized or the retry
//! budget runs out. Backend reply generation is asynchronous relative to the
//! initial response, so the transcript tolerates being temporarily stale and
//! is reconciled without ever blocking playback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::audio::Player;
use crate::backend::Backend;
use crate::config::Config;
use crate::protocol::{ConversationRecord, EventKind, QueryEnvelope, REPLY_PENDING, ReplyEnvelope};

/// Observable simulator status, mirrored to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Idle, ready for the next query
    Ready,
    /// Recording from the microphone
    Listening,
    /// Utterance captured, submission in flight
    Analyzing,
    /// Text query submitted, waiting for the reply
    Thinking,
    /// Reply audio playing
    Speaking,
    /// Capture session ended with no audio
    NoAudio,
    /// Species update acknowledged
    SpeciesUpdated,
    /// The current cycle failed; message is operator-facing
    Error(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Listening => write!(f, "Listening..."),
            Self::Analyzing => write!(f, "Analyzing..."),
            Self::Thinking => write!(f, "Thinking..."),
            Self::Speaking => write!(f, "Speaking..."),
            Self::NoAudio => write!(f, "No audio captured"),
            Self::SpeciesUpdated => write!(f, "Species updated"),
            Self::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Who a transcript entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// Recognized (or still-recognizing) operator speech
    User,
    /// The plant's reply
    Plant,
}

/// One transcript line, tagged to its conversation
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    /// Conversation this entry belongs to
    pub conversation_id: i64,
    /// Entry owner
    pub speaker: Speaker,
    /// Displayed text; plant entries may be provisional until reconciled
    pub text: String,
    /// When the entry was appended
    pub at: DateTime<Utc>,
}

/// Transcript reconciliation state machine
///
/// One value lives per cycle; the orchestrator drives it with history
/// snapshots. The budget and termination are explicit so they can be tested
/// without timers or I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Still polling; `attempts_left` polls remain including the next one
    PendingFinalization {
        /// Remaining poll attempts
        attempts_left: u8,
    },
    /// Finalized text located and applied
    Resolved,
    /// Budget exhausted; provisional text stays
    Abandoned,
}

impl Reconciliation {
    /// Start a cycle with `budget` polls
    #[must_use]
    pub const fn new(budget: u8) -> Self {
        if budget == 0 {
            Self::Abandoned
        } else {
            Self::PendingFinalization { attempts_left: budget }
        }
    }

    /// Whether another poll should be issued
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::PendingFinalization { .. })
    }

    /// Feed one history snapshot's matching record into the machine
    ///
    /// Returns the next state and, on resolution, the finalized reply text.
    #[must_use]
    pub fn observe(self, record: Option<&ConversationRecord>) -> (Self, Option<String>) {
        match self {
            Self::PendingFinalization { attempts_left } => {
                if let Some(record) = record
                    && record.is_final()
                {
                    return (Self::Resolved, Some(record.reply_text.clone()));
                }
                let remaining = attempts_left.saturating_sub(1);
                if remaining == 0 {
                    (Self::Abandoned, None)
                } else {
                    (Self::PendingFinalization { attempts_left: remaining }, None)
                }
            }
            terminal => (terminal, None),
        }
    }
}

/// Runs query/response cycles against a backend and a player
///
/// One cycle at a time: `run_query` completes (resolved or abandoned) before
/// the caller hands it the next envelope, so polling loops for different
/// conversations never overlap.
pub struct Orchestrator<B, P> {
    backend: B,
    player: Arc<P>,
    device_id: String,
    finalize_attempts: u8,
    finalize_backoff: Duration,
    notification_delay: Duration,
    status: Status,
    mood: String,
    transcript: Vec<TranscriptEntry>,
}

impl<B: Backend, P: Player + 'static> Orchestrator<B, P> {
    /// Create an orchestrator with the cycle parameters from `config`
    pub fn new(backend: B, player: P, config: &Config) -> Self {
        Self {
            backend,
            player: Arc::new(player),
            device_id: config.device_id.clone(),
            finalize_attempts: config.finalize_attempts,
            finalize_backoff: Duration::from_millis(config.finalize_backoff_ms),
            notification_delay: Duration::from_millis(config.notification_delay_ms),
            status: Status::Ready,
            mood: "neutral".to_string(),
            transcript: Vec::new(),
        }
    }

    /// Current observable status
    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    /// Override the observable status (capture-layer transitions)
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Mood tag from the most recent reply
    #[must_use]
    pub fn mood(&self) -> &str {
        &self.mood
    }

    /// Full transcript in append order
    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Run one full query/response/reconciliation cycle
    ///
    /// Transport failures end the cycle with [`Status::Error`]; each user
    /// action is independently retriable, so nothing is retried here.
    pub async fn run_query(&mut self, query: QueryEnvelope) {
        self.status = if query.event == EventKind::Text {
            Status::Thinking
        } else {
            Status::Analyzing
        };

        let reply = match self.backend.submit(&query).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "query submission failed");
                self.status = Status::Error(e.to_string());
                return;
            }
        };

        self.on_reply(query.event, reply).await;
    }

    /// Update the configured species; status-indicator only
    pub async fn update_species(&mut self, species: &str) {
        match self.backend.update_species(&self.device_id, species).await {
            Ok(()) => self.status = Status::SpeciesUpdated,
            Err(e) => {
                tracing::warn!(error = %e, "species update failed");
                self.status = Status::Error(e.to_string());
            }
        }
    }

    /// Render the provisional transcript and play the reply audio
    async fn on_reply(&mut self, event: EventKind, reply: ReplyEnvelope) {
        let conversation_id = reply.id;
        self.mood = reply.display.mood.clone();
        self.status = Status::Speaking;

        self.push_entry(
            conversation_id,
            Speaker::User,
            reply.user_query.clone().unwrap_or_else(|| REPLY_PENDING.to_string()),
        );
        self.push_entry(conversation_id, Speaker::Plant, reply.reply_text.clone());

        // A manual alert already is the notification; don't play it twice.
        let notification = reply
            .notification_audio_url
            .clone()
            .filter(|_| event != EventKind::LowMoistureAlert);

        if let Some(notification) = notification {
            // The delay keeps the notification clear of the start of primary
            // speech; ordering past that point is best-effort. The clip is
            // independent of the cycle, so it must not hold up transcript
            // reconciliation once the primary reply ends.
            let player = Arc::clone(&self.player);
            let delay = self.notification_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = player.play(&notification).await {
                    tracing::warn!(error = %e, "notification playback failed");
                }
            });
        }

        if let Err(e) = self.player.play(&reply.audio_url).await {
            // Reconciliation still runs; the transcript matters more than the
            // missed audio.
            tracing::warn!(error = %e, "reply playback failed");
        }

        self.on_playback_ended(conversation_id).await;
    }

    /// Reconcile the provisional transcript entry with the server's record
    async fn on_playback_ended(&mut self, conversation_id: i64) {
        self.status = Status::Ready;

        let mut state = Reconciliation::new(self.finalize_attempts);
        while state.is_pending() {
            let records = match self.backend.history(&self.device_id).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(error = %e, "history poll failed");
                    self.status = Status::Error(e.to_string());
                    return;
                }
            };

            let record = records.iter().find(|r| r.id == conversation_id);
            let (next, finalized) = state.observe(record);
            state = next;

            if let Some(text) = finalized {
                self.replace_reply_text(conversation_id, &text);
            } else if state.is_pending() {
                tokio::time::sleep(self.finalize_backoff).await;
            }
        }

        if state == Reconciliation::Abandoned {
            tracing::debug!(conversation_id, "finalization budget exhausted, provisional text kept");
        }
    }

    fn push_entry(&mut self, conversation_id: i64, speaker: Speaker, text: String) {
        self.transcript.push(TranscriptEntry { conversation_id, speaker, text, at: Utc::now() });
    }

    fn replace_reply_text(&mut self, conversation_id: i64, text: &str) {
        if let Some(entry) = self
            .transcript
            .iter_mut()
            .rev()
            .find(|e| e.conversation_id == conversation_id && e.speaker == Speaker::Plant)
        {
            tracing::debug!(conversation_id, "transcript reconciled with finalized reply");
            text.clone_into(&mut entry.text);
        }
    }
}
