use std::fmt;

use tracing::{debug, warn};

use crate::{
    analysis::analyze_frame, morph::classify, AnalyzerConfig, FftResources, FftSlot,
    MorphWeights, MouthsyncError, ResourceChange, Result, SpectralFeatures, TemporalSmoother,
};

/// Coarse reason a frame was skipped, used to avoid repeating warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    EmptyFrame,
    FrameLength(usize),
    Analysis,
}

impl From<&MouthsyncError> for SkipReason {
    fn from(err: &MouthsyncError) -> Self {
        match err {
            MouthsyncError::EmptyFrame => SkipReason::EmptyFrame,
            MouthsyncError::InvalidFrameLength(len) => SkipReason::FrameLength(*len),
            _ => SkipReason::Analysis,
        }
    }
}

/// Turns a stream of mono PCM frames into morph weights.
///
/// Owns the FFT resources and the smoothing state. Calls must be serialised
/// by the caller; see [`crate::AudioEngine`] for a shared wrapper.
pub struct LipsyncAnalyzer {
    config: AnalyzerConfig,
    fft: FftSlot,
    smoother: TemporalSmoother,
    last_skip: Option<SkipReason>,
    rebuilds: u64,
    retunes: u64,
}

impl LipsyncAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let smoother = TemporalSmoother::new(config.volume_smoothing, config.feature_smoothing);
        Self {
            config,
            fft: FftSlot::new(),
            smoother,
            last_skip: None,
            rebuilds: 0,
            retunes: 0,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Smoothed features after the last processed frame.
    pub fn smoothed(&self) -> &SpectralFeatures {
        self.smoother.state()
    }

    /// The resource set used for the last processed frame, if any.
    pub fn resources(&self) -> Option<&FftResources> {
        self.fft.resources()
    }

    /// Number of times a resource set has been built.
    pub fn resource_rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Number of sample-rate-only updates applied to an existing set.
    pub fn resource_retunes(&self) -> u64 {
        self.retunes
    }

    /// Clears the smoothing state. Resources are kept.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.last_skip = None;
    }

    /// Processes one frame, returning `None` when the frame has to be skipped.
    ///
    /// A skipped frame leaves every piece of state untouched. Repeated skips for
    /// the same reason are only logged once.
    pub fn process_frame(&mut self, samples: &[f32], sample_rate: u32) -> Option<MorphWeights> {
        match self.try_process_frame(samples, sample_rate) {
            Ok(weights) => {
                self.last_skip = None;
                Some(weights)
            }
            Err(err) => {
                let reason = SkipReason::from(&err);
                if self.last_skip != Some(reason) {
                    if reason == SkipReason::EmptyFrame {
                        debug!("skipping empty frame");
                    } else {
                        warn!(error = %err, "skipping frame");
                    }
                    self.last_skip = Some(reason);
                }
                None
            }
        }
    }

    /// Same as [`LipsyncAnalyzer::process_frame`] but reports why a frame was
    /// skipped.
    pub fn try_process_frame(&mut self, samples: &[f32], sample_rate: u32) -> Result<MorphWeights> {
        if samples.is_empty() {
            return Err(MouthsyncError::EmptyFrame);
        }

        let (resources, change) = self.fft.ensure(samples.len(), sample_rate)?;
        match change {
            ResourceChange::Rebuilt => {
                self.rebuilds += 1;
                debug!(
                    frame_length = resources.frame_length(),
                    sample_rate, "built fft resources"
                );
            }
            ResourceChange::Retuned => {
                self.retunes += 1;
                debug!(sample_rate, "retuned fft frequency axis");
            }
            ResourceChange::Reused => {}
        }

        let raw = analyze_frame(samples, resources, self.config.rolloff_percentile)?.sanitized();
        let smoothed = self.smoother.smooth(&raw);
        Ok(classify(&smoothed, &self.config))
    }
}

impl Default for LipsyncAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl fmt::Debug for LipsyncAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LipsyncAnalyzer")
            .field("config", &self.config)
            .field("resources", &self.fft.resources())
            .field("smoothed", self.smoother.state())
            .field("rebuilds", &self.rebuilds)
            .field("retunes", &self.retunes)
            .finish()
    }
}
