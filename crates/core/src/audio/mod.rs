use std::sync::{Arc, Mutex, MutexGuard};

use crate::{AnalyzerConfig, LipsyncAnalyzer, MorphWeights, MouthsyncError, Result};

/// Shared intake that a capture callback feeds frame by frame.
///
/// The analyzer itself has no locking; this wrapper is the one place where
/// access is serialised, so the render side can read results from another
/// thread through a [`MorphHandle`].
#[derive(Debug)]
pub struct AudioEngine {
    shared: Arc<Mutex<Intake>>,
    latest: Arc<Mutex<Option<MorphWeights>>>,
}

#[derive(Debug)]
struct Intake {
    analyzer: LipsyncAnalyzer,
    channel: Vec<f32>,
}

impl AudioEngine {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Intake {
                analyzer: LipsyncAnalyzer::new(config),
                channel: Vec::new(),
            })),
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns a cloneable reader for the most recent weights.
    pub fn handle(&self) -> MorphHandle {
        MorphHandle {
            latest: self.latest.clone(),
        }
    }

    /// Feeds a single-channel frame. Returns `Ok(None)` when the frame was
    /// skipped by the analyzer.
    pub fn push_mono(&self, samples: &[f32], sample_rate: u32) -> Result<Option<MorphWeights>> {
        let weights = {
            let mut intake = self.lock_intake()?;
            intake.analyzer.process_frame(samples, sample_rate)
        };
        self.publish(weights)
    }

    /// Feeds an interleaved frame; only the first channel is analysed.
    pub fn push_interleaved(
        &self,
        samples: &[f32],
        channels: u16,
        sample_rate: u32,
    ) -> Result<Option<MorphWeights>> {
        if channels == 0 {
            return Err(MouthsyncError::InvalidChannelCount(channels));
        }
        if channels == 1 {
            return self.push_mono(samples, sample_rate);
        }

        let weights = {
            let mut intake = self.lock_intake()?;
            let Intake { analyzer, channel } = &mut *intake;
            channel.clear();
            channel.extend(samples.iter().step_by(channels as usize));
            analyzer.process_frame(channel.as_slice(), sample_rate)
        };
        self.publish(weights)
    }

    /// Runs `f` against the analyzer while holding the intake lock.
    pub fn with_analyzer<T>(&self, f: impl FnOnce(&mut LipsyncAnalyzer) -> T) -> Result<T> {
        let mut intake = self.lock_intake()?;
        Ok(f(&mut intake.analyzer))
    }

    fn publish(&self, weights: Option<MorphWeights>) -> Result<Option<MorphWeights>> {
        if let Some(weights) = weights {
            let mut latest = self
                .latest
                .lock()
                .map_err(|_| MouthsyncError::msg("morph output has been poisoned"))?;
            *latest = Some(weights);
        }
        Ok(weights)
    }

    fn lock_intake(&self) -> Result<MutexGuard<'_, Intake>> {
        self.shared
            .lock()
            .map_err(|_| MouthsyncError::msg("analysis pipeline has been poisoned"))
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

/// Read side of [`AudioEngine`], usable from the animation thread.
#[derive(Clone)]
pub struct MorphHandle {
    latest: Arc<Mutex<Option<MorphWeights>>>,
}

impl MorphHandle {
    /// Weights from the last frame that produced output, if any.
    pub fn latest(&self) -> Result<Option<MorphWeights>> {
        let latest = self
            .latest
            .lock()
            .map_err(|_| MouthsyncError::msg("morph output has been poisoned"))?;
        Ok(*latest)
    }
}

impl std::fmt::Debug for MorphHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MorphHandle").finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::Morph;

    #[test]
    fn analyses_first_channel_only() {
        let audio = AudioEngine::default();

        // Left channel silent, right channel loud.
        let frame: Vec<f32> = (0..960)
            .map(|i| if i % 2 == 0 { 0.0 } else { 0.9 })
            .collect();
        let weights = audio.push_interleaved(&frame, 2, 48_000).unwrap().unwrap();

        assert_eq!(weights, MorphWeights::closed());
        let frame_length = audio
            .with_analyzer(|analyzer| analyzer.resources().map(|r| r.frame_length()))
            .unwrap();
        assert_eq!(frame_length, Some(480));
    }

    #[test]
    fn zero_channels_is_malformed() {
        let audio = AudioEngine::default();
        let err = audio.push_interleaved(&[0.0; 16], 0, 48_000).unwrap_err();
        assert!(matches!(err, MouthsyncError::InvalidChannelCount(0)));
    }

    #[test]
    fn skipped_frames_keep_previous_output() {
        let audio = AudioEngine::default();
        let handle = audio.handle();
        assert!(handle.latest().unwrap().is_none());

        audio.push_mono(&[0.0; 480], 48_000).unwrap();
        assert!(audio.push_mono(&[0.0; 479], 48_000).unwrap().is_none());

        let latest = handle.latest().unwrap().unwrap();
        assert_eq!(latest.get(Morph::Mbp), 1.0);
    }

    #[test]
    fn handle_reads_from_another_thread() {
        let audio = AudioEngine::default();
        let handle = audio.handle();
        audio.push_mono(&[0.4; 512], 44_100).unwrap();

        let latest = thread::spawn(move || handle.latest().unwrap())
            .join()
            .unwrap();
        assert!(latest.is_some());
    }
}
