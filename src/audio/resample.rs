//! Sample-rate conversion to the canonical backend rate

/// Convert `samples` from `from_rate` to `to_rate` by linear interpolation
///
/// Identity when the rates already match (the input is returned unchanged, no
/// copy), when either rate is zero, or when the input is empty. Otherwise the
/// output length is `round(len * to_rate / from_rate)`; position `i` maps back
/// to `i * from_rate / to_rate` in the input, interpolating between the two
/// neighboring samples and holding the last sample past the end. Interpolated
/// values are clamped to [-1.0, 1.0]. Deterministic for a given input.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples;
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let output_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx].mul_add(1.0 - frac, samples[idx + 1] * frac)
        } else {
            samples.last().copied().unwrap_or(0.0)
        };

        output.push(sample.clamp(-1.0, 1.0));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_rates_are_identity() {
        let input = vec![0.1, -0.2, 0.3];
        assert_eq!(resample(input.clone(), 44_100, 44_100), input);
    }

    #[test]
    fn zero_rate_guard() {
        let input = vec![0.5; 10];
        assert_eq!(resample(input.clone(), 0, 16_000), input);
        assert_eq!(resample(input.clone(), 16_000, 0), input);
    }

    #[test]
    fn output_length_rounds() {
        let input = vec![0.0; 12_288];
        let out = resample(input, 44_100, 16_000);
        // round(12288 * 16000 / 44100) = 4459
        assert_eq!(out.len(), 4459);
    }

    #[test]
    fn upsampling_doubles_length() {
        let input = vec![0.0, 1.0, 0.0, -1.0];
        let out = resample(input, 8_000, 16_000);
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn output_stays_in_range() {
        let input = vec![1.0, -1.0, 1.0, -1.0, 1.0];
        let out = resample(input, 48_000, 16_000);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn deterministic() {
        let input: Vec<f32> = (0..2000).map(|i| (f64::from(i) * 0.01).sin() as f32).collect();
        let a = resample(input.clone(), 44_100, 16_000);
        let b = resample(input, 44_100, 16_000);
        assert_eq!(a, b);
    }
}
