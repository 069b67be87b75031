use crate::analysis::compute_rms;

/// Floor reported by [`LevelMeter::level_dbfs`] for silent input.
pub const MIN_LEVEL_DBFS: f32 = -120.0;

/// Plain RMS level observer for metering, independent of the morph pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelMeter {
    level: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and returns the RMS of `samples`.
    pub fn observe(&mut self, samples: &[f32]) -> f32 {
        let level = compute_rms(samples);
        self.level = if level.is_finite() { level } else { 0.0 };
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn level_dbfs(&self) -> f32 {
        if self.level <= 0.0 {
            return MIN_LEVEL_DBFS;
        }
        (20.0 * self.level.log10()).max(MIN_LEVEL_DBFS)
    }
}
