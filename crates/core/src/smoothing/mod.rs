use crate::{
    config::{DEFAULT_FEATURE_SMOOTHING, DEFAULT_VOLUME_SMOOTHING},
    SpectralFeatures,
};

/// Exponential moving average over each feature stream.
///
/// Volume and the spectral features use independent factors. State starts at
/// zero and only [`TemporalSmoother::reset`] clears it; format changes in the
/// input stream leave it untouched.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    volume_factor: f32,
    feature_factor: f32,
    state: SpectralFeatures,
}

impl TemporalSmoother {
    /// Factors are clamped to `[0, 1]`; NaN falls back to the default factor.
    pub fn new(volume_factor: f32, feature_factor: f32) -> Self {
        Self {
            volume_factor: clamp_factor(volume_factor, DEFAULT_VOLUME_SMOOTHING),
            feature_factor: clamp_factor(feature_factor, DEFAULT_FEATURE_SMOOTHING),
            state: SpectralFeatures::default(),
        }
    }

    pub fn volume_factor(&self) -> f32 {
        self.volume_factor
    }

    pub fn feature_factor(&self) -> f32 {
        self.feature_factor
    }

    /// Current smoothed values.
    pub fn state(&self) -> &SpectralFeatures {
        &self.state
    }

    /// Folds one raw measurement into the state and returns the new state.
    pub fn smooth(&mut self, raw: &SpectralFeatures) -> SpectralFeatures {
        let volume = self.volume_factor;
        let feature = self.feature_factor;

        self.state = SpectralFeatures {
            volume: ema(raw.volume, self.state.volume, volume),
            zero_crossing_rate: ema(raw.zero_crossing_rate, self.state.zero_crossing_rate, feature),
            centroid_hz: ema(raw.centroid_hz, self.state.centroid_hz, feature),
            rolloff_hz: ema(raw.rolloff_hz, self.state.rolloff_hz, feature),
        };
        self.state
    }

    pub fn reset(&mut self) {
        self.state = SpectralFeatures::default();
    }
}

#[inline]
fn ema(current: f32, previous: f32, factor: f32) -> f32 {
    current * factor + previous * (1.0 - factor)
}

fn clamp_factor(factor: f32, fallback: f32) -> f32 {
    if factor.is_nan() {
        fallback
    } else {
        factor.clamp(0.0, 1.0)
    }
}
