//! Audio pipeline
//!
//! Capture at the device's native rate, accumulate frames in arrival order,
//! resample to the canonical backend rate, and encode as mono 16-bit PCM WAV.
//! Playback resolves reply locators and drives the default output device.

mod accumulator;
mod capture;
mod playback;
mod resample;
mod wav;

pub use accumulator::FrameAccumulator;
pub use capture::CaptureSession;
pub use playback::{AudioPlayback, Player, SpeakerPlayer};
pub use resample::resample;
pub use wav::{WavBlob, encode_wav};

/// Sample rate the backend expects regardless of capture hardware (16 kHz)
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;
