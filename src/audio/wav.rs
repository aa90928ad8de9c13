//! WAV container encoding for backend submission

use std::io::Cursor;

use crate::{Error, Result};

/// Encoded utterance: 44-byte header plus little-endian 16-bit PCM payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavBlob {
    bytes: Vec<u8>,
}

impl WavBlob {
    /// MIME type tag sent alongside the payload
    pub const MIME_TYPE: &'static str = "audio/wav";

    /// Container bytes, header included
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the container bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total container size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the container holds zero bytes (never true for encoded output)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode mono f32 samples as 16-bit PCM WAV at `sample_rate`
///
/// Each sample is clamped to [-1.0, 1.0] and scaled asymmetrically: negative
/// samples by 32768, non-negative by 32767. Downstream consumers assume this
/// exact convention; do not switch to symmetric scaling.
///
/// # Errors
///
/// Returns error if the container writer fails, which cannot happen for an
/// in-memory cursor in practice; encoding is total for any finite input
/// including the empty sequence.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<WavBlob> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(pcm16(sample))
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(WavBlob { bytes: cursor.into_inner() })
}

/// Convert one f32 sample to i16 with the asymmetric scaling convention
#[allow(clippy::cast_possible_truncation)]
fn pcm16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    let scaled = if s < 0.0 { s * 32_768.0 } else { s * 32_767.0 };
    scaled as i16
}
