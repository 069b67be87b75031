use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{MouthsyncError, Result};

/// How [`FftSlot::ensure`] satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceChange {
    /// The existing set already matched frame length and sample rate.
    Reused,
    /// Same frame length, new sample rate: only the frequency axis moved.
    Retuned,
    /// A fresh set was built and swapped in.
    Rebuilt,
}

/// Buffers and transform plan bound to one `(frame_length, sample_rate)` pair.
///
/// Every buffer is sized once at construction so that per-frame work never
/// allocates. The frame length is fixed for the lifetime of the set; a new
/// length means a new set.
pub struct FftResources {
    frame_length: usize,
    half_length: usize,
    sample_rate: u32,
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    frequency_axis: Vec<f32>,
    windowed: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    magnitudes: Vec<f32>,
    weighted: Vec<f32>,
}

impl FftResources {
    /// Builds a resource set. Fails for zero or odd frame lengths, which cannot
    /// be packed into interleaved complex pairs.
    pub fn new(
        planner: &mut RealFftPlanner<f32>,
        frame_length: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if frame_length == 0 || frame_length % 2 != 0 {
            return Err(MouthsyncError::InvalidFrameLength(frame_length));
        }

        let half_length = frame_length / 2;
        let plan = planner.plan_fft_forward(frame_length);
        let windowed = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        let mut resources = Self {
            frame_length,
            half_length,
            sample_rate,
            plan,
            window: hann_window(frame_length),
            frequency_axis: vec![0.0; half_length],
            windowed,
            spectrum,
            scratch,
            magnitudes: vec![0.0; half_length],
            weighted: vec![0.0; half_length],
        };
        resources.fill_frequency_axis();
        Ok(resources)
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn half_length(&self) -> usize {
        self.half_length
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Centre frequency in Hz of each one-sided spectrum bin.
    pub fn frequency_axis(&self) -> &[f32] {
        &self.frequency_axis
    }

    /// Magnitude spectrum produced by the last call to
    /// [`FftResources::magnitude_spectrum`].
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Switches the set to a new sample rate without touching buffer sizes.
    pub(crate) fn retune(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.fill_frequency_axis();
    }

    /// Windows `samples`, runs the forward transform and stores the one-sided
    /// magnitude spectrum (`half_length` bins, Nyquist dropped).
    pub fn magnitude_spectrum(&mut self, samples: &[f32]) -> Result<&[f32]> {
        if samples.len() != self.frame_length {
            return Err(MouthsyncError::FrameMismatch {
                expected: self.frame_length,
                actual: samples.len(),
            });
        }

        for ((slot, sample), coefficient) in self
            .windowed
            .iter_mut()
            .zip(samples)
            .zip(self.window.iter())
        {
            *slot = sample * coefficient;
        }

        self.plan
            .process_with_scratch(&mut self.windowed, &mut self.spectrum, &mut self.scratch)?;

        for (magnitude, bin) in self.magnitudes.iter_mut().zip(self.spectrum.iter()) {
            *magnitude = bin.norm();
        }

        Ok(&self.magnitudes)
    }

    /// Fills the scratch buffer with `frequency[k] * magnitude[k]`.
    pub fn frequency_weighted(&mut self) -> &[f32] {
        for ((slot, magnitude), frequency) in self
            .weighted
            .iter_mut()
            .zip(self.magnitudes.iter())
            .zip(self.frequency_axis.iter())
        {
            *slot = magnitude * frequency;
        }
        &self.weighted
    }

    fn fill_frequency_axis(&mut self) {
        let bin_hz = self.sample_rate as f32 / self.frame_length as f32;
        for (index, frequency) in self.frequency_axis.iter_mut().enumerate() {
            *frequency = index as f32 * bin_hz;
        }
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("frame_length", &self.frame_length)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Owner of the current resource set and the planner that builds it.
///
/// A frame-length change builds a complete new set before replacing the old
/// one, so readers never see a half-sized set. If construction fails the
/// previous set stays in place.
pub struct FftSlot {
    planner: RealFftPlanner<f32>,
    resources: Option<FftResources>,
}

impl FftSlot {
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
            resources: None,
        }
    }

    /// Returns a resource set valid for the requested parameters, building or
    /// retuning one when needed.
    pub fn ensure(
        &mut self,
        frame_length: usize,
        sample_rate: u32,
    ) -> Result<(&mut FftResources, ResourceChange)> {
        let rebuild = self
            .resources
            .as_ref()
            .map(|resources| resources.frame_length != frame_length)
            .unwrap_or(true);

        if rebuild {
            let fresh = FftResources::new(&mut self.planner, frame_length, sample_rate)?;
            self.resources = Some(fresh);
        }

        let Some(resources) = self.resources.as_mut() else {
            return Err(MouthsyncError::InvalidFrameLength(frame_length));
        };

        let change = if rebuild {
            ResourceChange::Rebuilt
        } else if resources.sample_rate != sample_rate {
            resources.retune(sample_rate);
            ResourceChange::Retuned
        } else {
            ResourceChange::Reused
        };

        Ok((resources, change))
    }

    pub fn resources(&self) -> Option<&FftResources> {
        self.resources.as_ref()
    }
}

impl Default for FftSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FftSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftSlot")
            .field("resources", &self.resources)
            .finish()
    }
}

/// Periodic Hann window without amplitude normalisation.
fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|index| 0.5 - 0.5 * ((2.0 * PI * index as f32) / len as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_odd_lengths() {
        let mut slot = FftSlot::new();
        assert!(matches!(
            slot.ensure(0, 48_000),
            Err(MouthsyncError::InvalidFrameLength(0))
        ));
        assert!(matches!(
            slot.ensure(481, 48_000),
            Err(MouthsyncError::InvalidFrameLength(481))
        ));
        assert!(slot.resources().is_none());
    }

    #[test]
    fn failed_rebuild_keeps_previous_set() {
        let mut slot = FftSlot::new();
        slot.ensure(480, 48_000).unwrap();
        assert!(slot.ensure(17, 48_000).is_err());
        assert_eq!(slot.resources().unwrap().frame_length(), 480);
    }

    #[test]
    fn builds_axis_and_buffers() {
        let mut slot = FftSlot::new();
        let (resources, change) = slot.ensure(1024, 48_000).unwrap();

        assert_eq!(change, ResourceChange::Rebuilt);
        assert_eq!(resources.half_length(), 512);
        assert_eq!(resources.window().len(), 1024);
        assert_eq!(resources.magnitudes().len(), 512);
        assert_eq!(resources.frequency_axis().len(), 512);
        assert_eq!(resources.frequency_axis()[0], 0.0);
        assert!((resources.frequency_axis()[1] - 46.875).abs() < 1e-4);
        assert!((resources.frequency_axis()[511] - 511.0 * 46.875).abs() < 1e-2);
    }

    #[test]
    fn repeated_ensure_reuses_buffers() {
        let mut slot = FftSlot::new();
        let first = {
            let (resources, _) = slot.ensure(480, 48_000).unwrap();
            resources.magnitudes().as_ptr()
        };
        let (resources, change) = slot.ensure(480, 48_000).unwrap();

        assert_eq!(change, ResourceChange::Reused);
        assert_eq!(resources.magnitudes().as_ptr(), first);
    }

    #[test]
    fn sample_rate_change_retunes_in_place() {
        let mut slot = FftSlot::new();
        let (before_ptr, before_axis) = {
            let (resources, _) = slot.ensure(480, 48_000).unwrap();
            (resources.magnitudes().as_ptr(), resources.frequency_axis()[10])
        };

        let (resources, change) = slot.ensure(480, 16_000).unwrap();
        assert_eq!(change, ResourceChange::Retuned);
        assert_eq!(resources.sample_rate(), 16_000);
        assert_eq!(resources.magnitudes().as_ptr(), before_ptr);
        assert!((resources.frequency_axis()[10] - before_axis / 3.0).abs() < 1e-3);
    }

    #[test]
    fn frame_length_change_rebuilds() {
        let mut slot = FftSlot::new();
        slot.ensure(480, 48_000).unwrap();

        let (resources, change) = slot.ensure(1024, 48_000).unwrap();
        assert_eq!(change, ResourceChange::Rebuilt);
        assert_eq!(resources.frame_length(), 1024);

        let spectrum = resources.magnitude_spectrum(&[0.25; 1024]).unwrap();
        assert_eq!(spectrum.len(), 512);
    }

    #[test]
    fn mismatched_slice_is_rejected() {
        let mut slot = FftSlot::new();
        let (resources, _) = slot.ensure(480, 48_000).unwrap();
        let err = resources.magnitude_spectrum(&[0.0; 512]).unwrap_err();
        assert!(matches!(
            err,
            MouthsyncError::FrameMismatch {
                expected: 480,
                actual: 512
            }
        ));
    }

    #[test]
    fn hann_window_is_periodic() {
        let window = hann_window(8);
        assert!(window[0].abs() < 1e-6);
        assert!((window[4] - 1.0).abs() < 1e-6);
        assert!((window[1] - window[7]).abs() < 1e-6);
    }
}
