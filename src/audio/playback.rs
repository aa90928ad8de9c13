//! Reply playback on the default output device

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use url::Url;

use crate::{Error, Result};

/// Plays a reply audio reference and returns once playback has ended
///
/// The core never interprets the locator's contents, only its play/ended
/// lifecycle.
#[async_trait]
pub trait Player: Send + Sync {
    /// Resolve `locator`, play it to completion
    ///
    /// # Errors
    ///
    /// Returns error if the clip cannot be fetched, decoded, or played.
    async fn play(&self, locator: &str) -> Result<()>;
}

/// [`Player`] that fetches clips from the backend and drives the speakers
pub struct SpeakerPlayer {
    client: reqwest::Client,
    base_url: Url,
}

impl SpeakerPlayer {
    /// Create a player resolving relative locators against `base_url`
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl Player for SpeakerPlayer {
    async fn play(&self, locator: &str) -> Result<()> {
        let url = self
            .base_url
            .join(locator)
            .map_err(|e| Error::Audio(format!("bad audio locator {locator}: {e}")))?;

        tracing::debug!(%url, "fetching reply audio");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!("audio fetch failed with {status}")));
        }

        let bytes = response.bytes().await?;
        let (samples, sample_rate) = decode_wav(&bytes)?;

        tokio::task::spawn_blocking(move || {
            let playback = AudioPlayback::new()?;
            playback.play_blocking(&samples, sample_rate)
        })
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

/// Speaker output on the default device
pub struct AudioPlayback {
    device: cpal::Device,
}

impl AudioPlayback {
    /// Create a playback instance
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if no output device is available.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Device("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self { device })
    }

    /// Play mono samples at `sample_rate`, blocking until playback ends
    ///
    /// Prefers a mono output config at the clip's rate, falling back to
    /// stereo with the sample duplicated across channels.
    ///
    /// # Errors
    ///
    /// Returns error if no output config supports the rate or the stream
    /// fails.
    pub fn play_blocking(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let supported = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::Device(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .or_else(|| {
                self.device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(sample_rate)
                        && c.max_sample_rate() >= SampleRate(sample_rate)
                })
            })
            .ok_or_else(|| {
                Error::Device(format!("no output config supports {sample_rate} Hz"))
            })?;

        let config: StreamConfig = supported.with_sample_rate(SampleRate(sample_rate)).config();
        let channels = usize::from(config.channels);

        let samples: Arc<Vec<f32>> = Arc::new(samples.to_vec());
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let cb_samples = Arc::clone(&samples);
        let cb_position = Arc::clone(&position);
        let cb_finished = Arc::clone(&finished);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let pos = cb_position.load(Ordering::Relaxed);
                        let sample = if pos < cb_samples.len() {
                            cb_position.store(pos + 1, Ordering::Relaxed);
                            cb_samples[pos]
                        } else {
                            cb_finished.store(true, Ordering::Relaxed);
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;

        stream.play().map_err(|e| Error::Device(e.to_string()))?;

        // Poll for completion, bounded by the clip duration plus headroom.
        let duration_ms = (samples.len() as u64 * 1000) / u64::from(sample_rate);
        let timeout = std::time::Duration::from_millis(duration_ms + 500);
        let start = std::time::Instant::now();

        while !finished.load(Ordering::Relaxed) {
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        // Let the device drain the last buffer.
        std::thread::sleep(std::time::Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = samples.len(), "playback complete");

        Ok(())
    }
}

/// Decode WAV bytes to mono f32 samples and the declared rate
fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();

    let raw: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32_768.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
        (format, bits) => {
            return Err(Error::Audio(format!(
                "unsupported WAV format: {bits}-bit {format:?}"
            )));
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let mono = if channels == 1 {
        raw
    } else {
        #[allow(clippy::cast_precision_loss)]
        raw.chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_wav;

    #[test]
    fn decode_recovers_encoded_rate_and_length() {
        let samples = vec![0.0_f32, 0.25, -0.25, 0.5];
        let blob = encode_wav(&samples, 16_000).unwrap();

        let (decoded, rate) = decode_wav(blob.as_bytes()).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(decoded.len(), samples.len());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_wav(&[0u8; 16]).is_err());
    }
}
