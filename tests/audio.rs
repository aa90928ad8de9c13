//! Audio pipeline integration tests
//!
//! Exercises the accumulate/resample/encode path without audio hardware.

use std::io::Cursor;

use pot_simulator::{CANONICAL_SAMPLE_RATE, FrameAccumulator, encode_wav, resample};

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (CANONICAL_SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / CANONICAL_SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[test]
fn accumulator_concatenates_frames_in_order() {
    let frames: Vec<Vec<f32>> = (0..4)
        .map(|n| (0..100).map(|i| (n * 100 + i) as f32 / 1000.0).collect())
        .collect();

    let mut acc = FrameAccumulator::new();
    for frame in &frames {
        acc.append(frame);
    }

    let flat = acc.finalize();
    let expected: Vec<f32> = frames.into_iter().flatten().collect();
    assert_eq!(flat.len(), 400);
    assert_eq!(flat, expected);
}

#[test]
fn resample_is_identity_for_matching_rates() {
    let samples = generate_sine_samples(440.0, 0.25, 0.5);
    let out = resample(samples.clone(), 44_100, 44_100);
    assert_eq!(out, samples);
}

#[test]
fn resample_length_follows_rate_ratio() {
    for (len, from, to) in [
        (12_288_usize, 44_100_u32, 16_000_u32),
        (48_000, 48_000, 16_000),
        (1_000, 8_000, 16_000),
        (441, 44_100, 16_000),
    ] {
        let out = resample(vec![0.1; len], from, to);
        let expected = (len as f64 * f64::from(to) / f64::from(from)).round() as usize;
        assert_eq!(out.len(), expected, "len={len} from={from} to={to}");
    }
}

#[test]
fn resample_preserves_amplitude_bounds() {
    let samples = generate_sine_samples(1_000.0, 0.5, 1.0);
    let out = resample(samples, 48_000, 16_000);
    assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn wav_payload_and_length_fields_are_exact() {
    for n in [0_usize, 1, 5, 4_096] {
        let samples = vec![0.25_f32; n];
        let blob = encode_wav(&samples, CANONICAL_SAMPLE_RATE).unwrap();
        let bytes = blob.as_bytes();

        assert_eq!(bytes.len(), 44 + 2 * n, "container size for n={n}");
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(read_u32_le(bytes, 4), 36 + 2 * n as u32, "file length field");
        assert_eq!(read_u32_le(bytes, 40), 2 * n as u32, "data length field");
    }
}

#[test]
fn wav_header_declares_mono_16bit_pcm() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let blob = encode_wav(&samples, CANONICAL_SAMPLE_RATE).unwrap();
    let bytes = blob.as_bytes();

    assert_eq!(read_u32_le(bytes, 16), 16, "fmt chunk length");
    assert_eq!(read_u16_le(bytes, 20), 1, "PCM format tag");
    assert_eq!(read_u16_le(bytes, 22), 1, "channel count");
    assert_eq!(read_u32_le(bytes, 24), CANONICAL_SAMPLE_RATE, "sample rate");
    assert_eq!(read_u32_le(bytes, 28), CANONICAL_SAMPLE_RATE * 2, "byte rate");
    assert_eq!(read_u16_le(bytes, 32), 2, "block align");
    assert_eq!(read_u16_le(bytes, 34), 16, "bits per sample");
}

#[test]
fn wav_roundtrip_recovers_spec() {
    let samples = vec![0.0_f32, 0.5, -0.5, 1.0, -1.0, 0.25];
    let blob = encode_wav(&samples, CANONICAL_SAMPLE_RATE).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(blob.into_bytes())).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, CANONICAL_SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded.len(), samples.len());
    // Asymmetric scaling: negative x32768, non-negative x32767.
    assert_eq!(decoded, vec![0, 16_383, -16_384, 32_767, -32_768, 8_191]);
}

#[test]
fn three_frames_at_native_rate_encode_to_canonical() {
    // Three hardware buffers of 4096 samples at 44.1 kHz, stopped, encoded
    // at 16 kHz.
    let mut acc = FrameAccumulator::new();
    for n in 0..3_usize {
        let frame: Vec<f32> = (0..4_096_usize)
            .map(|i| {
                let t = (n * 4_096 + i) as f32 / 44_100.0;
                0.4 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect();
        acc.append(&frame);
    }

    let utterance = acc.finalize();
    assert_eq!(utterance.len(), 12_288);

    let canonical = resample(utterance, 44_100, CANONICAL_SAMPLE_RATE);
    let expected_len = (12_288.0_f64 * 16_000.0 / 44_100.0).round() as usize;
    assert_eq!(canonical.len(), expected_len);
    assert_eq!(canonical.len(), 4_459);

    let blob = encode_wav(&canonical, CANONICAL_SAMPLE_RATE).unwrap();
    let bytes = blob.as_bytes();
    assert_eq!(read_u32_le(bytes, 24), 16_000, "declared sample rate");
    assert_eq!(read_u32_le(bytes, 40) / 2, 4_459, "declared sample count");
}
