//! Core library for Mouthsync.
//!
//! Turns live PCM frames into weights for nine mouth-shape morphs without any
//! speech model. Each frame is measured (loudness, zero-crossing rate,
//! spectral centroid and rolloff), the measurements are smoothed over time,
//! and a fixed rule table maps them to morph weights.
//!
//! [`LipsyncAnalyzer`] is the single-owner entry point. [`AudioEngine`] wraps
//! it for capture callbacks that feed from one thread while a renderer reads
//! from another, and [`MorphAnimator`] eases the weights on a display clock.

pub mod analysis;
pub mod analyzer;
pub mod animation;
pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod meter;
pub mod morph;
pub mod smoothing;

pub use analysis::{analyze_frame, SpectralFeatures};
pub use analyzer::LipsyncAnalyzer;
pub use animation::{AnimationConfig, MorphAnimator, MorphBindings, MorphTargetUpdate};
pub use audio::{AudioEngine, MorphHandle};
pub use config::{AnalyzerConfig, AppConfig, AudioConfig};
pub use error::{MouthsyncError, Result};
pub use fft::{FftResources, FftSlot, ResourceChange};
pub use meter::LevelMeter;
pub use morph::{classify, Morph, MorphWeights};
pub use smoothing::TemporalSmoother;
