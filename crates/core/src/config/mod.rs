use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AnimationConfig, Result};

pub const DEFAULT_VOLUME_SMOOTHING: f32 = 0.25;
pub const DEFAULT_FEATURE_SMOOTHING: f32 = 0.35;
pub const DEFAULT_SILENCE_VOLUME_THRESHOLD: f32 = 0.003;
pub const DEFAULT_NOISE_ROLLOFF_THRESHOLD: f32 = 5_000.0;
pub const DEFAULT_NOISE_ZERO_CROSSING_THRESHOLD: f32 = 0.12;
pub const DEFAULT_ROUNDED_CENTROID_UPPER_BOUND: f32 = 800.0;
pub const DEFAULT_BRIGHT_CENTROID_LOWER_BOUND: f32 = 2_500.0;
pub const DEFAULT_ROLLOFF_PERCENTILE: f32 = 0.85;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analyzer: AnalyzerConfig,
    pub animation: AnimationConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Parses a JSON document. Missing sections and fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Tuning knobs for feature smoothing and morph classification.
///
/// Thresholds are accepted as given. Only the smoothing factors are
/// sanitised, and only when the smoother is built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// EMA factor applied to the volume stream.
    pub volume_smoothing: f32,
    /// EMA factor applied to zero-crossing rate, centroid and rolloff.
    pub feature_smoothing: f32,
    /// Below this smoothed RMS the mouth is closed (`MBP`).
    pub silence_volume_threshold: f32,
    /// Rolloff in Hz above which the fricative overlay kicks in.
    pub noise_rolloff_threshold: f32,
    /// Zero-crossing rate above which the fricative overlay kicks in.
    pub noise_zero_crossing_threshold: f32,
    /// Centroids below this (Hz) select the rounded vowel shapes.
    pub rounded_centroid_upper_bound: f32,
    /// Centroids at or above this (Hz) select the bright vowel shapes.
    pub bright_centroid_lower_bound: f32,
    /// Fraction of spectral magnitude that defines the rolloff frequency.
    pub rolloff_percentile: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            volume_smoothing: DEFAULT_VOLUME_SMOOTHING,
            feature_smoothing: DEFAULT_FEATURE_SMOOTHING,
            silence_volume_threshold: DEFAULT_SILENCE_VOLUME_THRESHOLD,
            noise_rolloff_threshold: DEFAULT_NOISE_ROLLOFF_THRESHOLD,
            noise_zero_crossing_threshold: DEFAULT_NOISE_ZERO_CROSSING_THRESHOLD,
            rounded_centroid_upper_bound: DEFAULT_ROUNDED_CENTROID_UPPER_BOUND,
            bright_centroid_lower_bound: DEFAULT_BRIGHT_CENTROID_LOWER_BOUND,
            rolloff_percentile: DEFAULT_ROLLOFF_PERCENTILE,
        }
    }
}

/// Settings for the audio intake used by the command line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub frame_length: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            frame_length: 1024,
        }
    }
}
