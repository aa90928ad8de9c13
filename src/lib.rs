//! Pot Simulator - voice-activated smart plant pot device simulator
//!
//! This library provides the client-side core of the simulator:
//! - Audio pipeline: capture, frame accumulation, resampling, WAV encoding
//! - Backend transport: query submission, history polling, species updates
//! - Interaction orchestration: transcript, playback, reply reconciliation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Operator                          │
//! │        microphone  │  typed queries  │  alerts        │
//! └──────────────────────┬───────────────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────────────┐
//! │                  Pot Simulator                        │
//! │   Capture → Resample → WAV  │  Orchestrator  │  CLI   │
//! └──────────────────────┬───────────────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────────────┐
//! │              Plant Pot Backend                        │
//! │   STT  │  Dialogue  │  TTS  │  Conversation history   │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod protocol;

pub use audio::{
    AudioPlayback, CANONICAL_SAMPLE_RATE, CaptureSession, FrameAccumulator, Player, SpeakerPlayer,
    WavBlob, encode_wav, resample,
};
pub use backend::{Backend, HttpBackend};
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, Reconciliation, Speaker, Status, TranscriptEntry};
pub use protocol::{
    ConversationRecord, DisplayHints, EventKind, QueryEnvelope, QueryInput, REPLY_PENDING,
    ReplyEnvelope, SensorSnapshot,
};
