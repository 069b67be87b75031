use serde::{Deserialize, Serialize};

use crate::{FftResources, Result};

/// Magnitude sums below this are treated as an empty spectrum.
const SPECTRUM_EPSILON: f32 = 1e-9;

/// Per-frame perceptual features.
///
/// The same shape carries both the instantaneous measurement of one frame and
/// the smoothed state kept across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// Root-mean-square amplitude.
    pub volume: f32,
    /// Fraction of adjacent sample pairs with strictly opposite sign.
    pub zero_crossing_rate: f32,
    /// Magnitude-weighted mean frequency in Hz.
    pub centroid_hz: f32,
    /// Frequency in Hz below which `rolloff_percentile` of the magnitude lies.
    pub rolloff_hz: f32,
}

impl SpectralFeatures {
    /// Replaces non-finite fields with zero.
    pub fn sanitized(self) -> Self {
        fn finite(value: f32) -> f32 {
            if value.is_finite() {
                value
            } else {
                0.0
            }
        }

        Self {
            volume: finite(self.volume),
            zero_crossing_rate: finite(self.zero_crossing_rate),
            centroid_hz: finite(self.centroid_hz),
            rolloff_hz: finite(self.rolloff_hz),
        }
    }
}

/// Measures one frame. `samples` must match the resource set's frame length;
/// the set's scratch buffers are overwritten, `samples` is only read.
pub fn analyze_frame(
    samples: &[f32],
    resources: &mut FftResources,
    rolloff_percentile: f32,
) -> Result<SpectralFeatures> {
    resources.magnitude_spectrum(samples)?;

    let magnitude_sum: f32 = resources.magnitudes().iter().sum();
    let weighted_sum: f32 = resources.frequency_weighted().iter().sum();
    let centroid_hz = if magnitude_sum < SPECTRUM_EPSILON {
        0.0
    } else {
        weighted_sum / magnitude_sum
    };

    Ok(SpectralFeatures {
        volume: compute_rms(samples),
        zero_crossing_rate: zero_crossing_rate(samples),
        centroid_hz,
        rolloff_hz: spectral_rolloff(
            resources.magnitudes(),
            resources.frequency_axis(),
            rolloff_percentile,
        ),
    })
}

pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings = samples
        .windows(2)
        .filter(|pair| pair[0] * pair[1] < 0.0)
        .count();
    crossings as f32 / samples.len() as f32
}

/// Smallest frequency at which the cumulative magnitude reaches `percentile`
/// of the total. Zero for an empty spectrum, the top bin if the threshold is
/// never reached.
pub fn spectral_rolloff(magnitudes: &[f32], frequency_axis: &[f32], percentile: f32) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total < SPECTRUM_EPSILON {
        return 0.0;
    }

    let threshold = total * percentile;
    let mut cumulative = 0.0f32;
    for (magnitude, frequency) in magnitudes.iter().zip(frequency_axis) {
        cumulative += *magnitude;
        if cumulative >= threshold {
            return *frequency;
        }
    }

    frequency_axis.last().copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::FftSlot;

    fn sine(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * frequency * n as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn analyze(samples: &[f32], sample_rate: u32) -> SpectralFeatures {
        let mut slot = FftSlot::new();
        let (resources, _) = slot.ensure(samples.len(), sample_rate).unwrap();
        analyze_frame(samples, resources, 0.85).unwrap()
    }

    #[test]
    fn silence_yields_zero_features() {
        let features = analyze(&[0.0; 1024], 48_000);
        assert_eq!(features, SpectralFeatures::default());
    }

    #[test]
    fn rms_of_constant_and_empty_input() {
        assert_eq!(compute_rms(&[]), 0.0);
        assert!((compute_rms(&[0.5; 64]) - 0.5).abs() < 1e-6);
        assert!((compute_rms(&[1.0, -1.0, 1.0, -1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_crossings_need_strict_sign_change() {
        assert_eq!(zero_crossing_rate(&[1.0]), 0.0);
        assert_eq!(zero_crossing_rate(&[1.0, -1.0, 1.0, -1.0]), 0.75);
        // Touching zero is not a crossing.
        assert_eq!(zero_crossing_rate(&[1.0, 0.0, -1.0, 0.0]), 0.0);
    }

    #[test]
    fn centroid_tracks_pure_tone() {
        let features = analyze(&sine(1_500.0, 0.5, 48_000, 1024), 48_000);
        assert!(
            (features.centroid_hz - 1_500.0).abs() < 100.0,
            "centroid {}",
            features.centroid_hz
        );
        assert!((features.volume - 0.5 / 2f32.sqrt()).abs() < 0.01);
    }

    #[test]
    fn flat_spectrum_rolls_off_near_85_percent_of_nyquist() {
        // A centred impulse survives the window untouched and has a flat spectrum.
        let mut impulse = vec![0.0; 1024];
        impulse[512] = 1.0;
        let features = analyze(&impulse, 48_000);

        let nyquist = 24_000.0;
        assert!(
            (features.rolloff_hz - 0.85 * nyquist).abs() < 100.0,
            "rolloff {}",
            features.rolloff_hz
        );
    }

    #[test]
    fn white_noise_rolls_off_near_85_percent_of_nyquist() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<f32> = (0..4096).map(|_| rng.random_range(-0.5..0.5)).collect();
        let features = analyze(&noise, 48_000);

        let nyquist = 24_000.0;
        assert!(
            (features.rolloff_hz - 0.85 * nyquist).abs() < 0.05 * nyquist,
            "rolloff {}",
            features.rolloff_hz
        );
        assert!(features.zero_crossing_rate > 0.3);
    }

    #[test]
    fn rolloff_falls_back_to_top_bin() {
        let magnitudes = [1.0, 1.0, 1.0, 1.0];
        let axis = [0.0, 10.0, 20.0, 30.0];
        assert_eq!(spectral_rolloff(&magnitudes, &axis, 0.5), 10.0);
        assert_eq!(spectral_rolloff(&magnitudes, &axis, 2.0), 30.0);
        assert_eq!(spectral_rolloff(&[0.0; 4], &axis, 0.85), 0.0);
    }

    #[test]
    fn sanitize_clears_non_finite_fields() {
        let features = SpectralFeatures {
            volume: f32::NAN,
            zero_crossing_rate: 0.2,
            centroid_hz: f32::INFINITY,
            rolloff_hz: 900.0,
        }
        .sanitized();

        assert_eq!(features.volume, 0.0);
        assert_eq!(features.zero_crossing_rate, 0.2);
        assert_eq!(features.centroid_hz, 0.0);
        assert_eq!(features.rolloff_hz, 900.0);
    }
}
