//! Microphone capture session

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use super::{CANONICAL_SAMPLE_RATE, FrameAccumulator, WavBlob, encode_wav, resample};
use crate::{Error, Result};

/// One recording session on the default input device
///
/// The idle state is the absence of a session value: `start` acquires the
/// device and begins collecting frames, `stop` consumes the session and
/// yields the encoded utterance. Ownership makes "start while recording"
/// unrepresentable; the only action on a live session is `stop`.
pub struct CaptureSession {
    stream: Stream,
    frames: Arc<Mutex<FrameAccumulator>>,
    native_rate: u32,
}

impl CaptureSession {
    /// Acquire the default input device at its native config and start recording
    ///
    /// Capture runs at the hardware's native rate and channel count; frames
    /// are downmixed to mono on arrival and resampled at `stop`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if no input device exists or the stream
    /// cannot be opened (e.g. permission denied).
    pub fn start() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device available".to_string()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| Error::Device(e.to_string()))?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let native_rate = config.sample_rate.0;
        let channels = usize::from(config.channels.max(1));

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            native_rate,
            channels,
            ?format,
            "capture session starting"
        );

        let frames = Arc::new(Mutex::new(FrameAccumulator::new()));
        let err_fn = |err| tracing::error!(error = %err, "audio capture error");

        let stream = match format {
            SampleFormat::F32 => {
                let frames = Arc::clone(&frames);
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        push_frame(&frames, data, channels, |s| s);
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::I16 => {
                let frames = Arc::clone(&frames);
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        push_frame(&frames, data, channels, |s| f32::from(s) / 32_768.0);
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::U16 => {
                let frames = Arc::clone(&frames);
                device.build_input_stream(
                    &config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        push_frame(&frames, data, channels, |s| {
                            (f32::from(s) - 32_768.0) / 32_768.0
                        });
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(Error::Device(format!("unsupported sample format: {other:?}")));
            }
        }
        .map_err(|e| Error::Device(e.to_string()))?;

        stream.play().map_err(|e| Error::Device(e.to_string()))?;

        Ok(Self { stream, frames, native_rate })
    }

    /// Native sample rate the hardware is delivering
    #[must_use]
    pub const fn native_rate(&self) -> u32 {
        self.native_rate
    }

    /// Samples collected so far
    #[must_use]
    pub fn captured_samples(&self) -> usize {
        self.frames.lock().map(|acc| acc.len()).unwrap_or_default()
    }

    /// Stop recording and encode the utterance at the canonical rate
    ///
    /// Disconnects the stream and releases the device before touching the
    /// samples, finalizes the accumulator, resamples only when the native
    /// rate differs from 16 kHz, and encodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCapture`] if no frames arrived; callers must
    /// abort the pipeline without a backend call in that case.
    pub fn stop(self) -> Result<WavBlob> {
        drop(self.stream);

        let samples = self
            .frames
            .lock()
            .map(|mut acc| std::mem::take(&mut *acc).finalize())
            .unwrap_or_default();

        if samples.is_empty() {
            return Err(Error::EmptyCapture);
        }

        tracing::debug!(
            samples = samples.len(),
            native_rate = self.native_rate,
            "capture session finalized"
        );

        let canonical = if self.native_rate == CANONICAL_SAMPLE_RATE {
            samples
        } else {
            resample(samples, self.native_rate, CANONICAL_SAMPLE_RATE)
        };

        encode_wav(&canonical, CANONICAL_SAMPLE_RATE)
    }
}

/// Downmix one callback buffer to mono and append it in arrival order
fn push_frame<T: Copy>(
    frames: &Mutex<FrameAccumulator>,
    data: &[T],
    channels: usize,
    convert: impl Fn(T) -> f32,
) {
    let Ok(mut acc) = frames.lock() else {
        return;
    };

    #[allow(clippy::cast_precision_loss)]
    let mono: Vec<f32> = data
        .chunks(channels.max(1))
        .map(|frame| frame.iter().map(|&s| convert(s)).sum::<f32>() / frame.len() as f32)
        .collect();

    acc.append(&mono);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_frame_downmixes_stereo() {
        let frames = Mutex::new(FrameAccumulator::new());
        push_frame(&frames, &[0.2_f32, 0.4, -0.6, -0.2], 2, |s| s);

        let collected = frames.into_inner().unwrap().finalize();
        assert_eq!(collected.len(), 2);
        assert!((collected[0] - 0.3).abs() < 1e-6);
        assert!((collected[1] + 0.4).abs() < 1e-6);
    }

    #[test]
    fn push_frame_converts_i16() {
        let frames = Mutex::new(FrameAccumulator::new());
        push_frame(&frames, &[16_384_i16, -32_768], 1, |s| f32::from(s) / 32_768.0);

        let collected = frames.into_inner().unwrap().finalize();
        assert_eq!(collected, vec![0.5, -1.0]);
    }
}
