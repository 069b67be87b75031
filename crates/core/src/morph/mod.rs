use std::{fmt, str::FromStr};

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::{AnalyzerConfig, MouthsyncError, SpectralFeatures};

/// Closed set of mouth shapes driven by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Morph {
    #[serde(rename = "AI")]
    Ai,
    E,
    U,
    #[serde(rename = "FV")]
    Fv,
    #[serde(rename = "MBP")]
    Mbp,
    ShCh,
    O,
    L,
    #[serde(rename = "WQ")]
    Wq,
}

impl Morph {
    pub const COUNT: usize = 9;

    pub const ALL: [Morph; Morph::COUNT] = [
        Morph::Ai,
        Morph::E,
        Morph::U,
        Morph::Fv,
        Morph::Mbp,
        Morph::ShCh,
        Morph::O,
        Morph::L,
        Morph::Wq,
    ];

    /// Name of the morph target as it appears on a rigged mesh.
    pub fn name(self) -> &'static str {
        match self {
            Morph::Ai => "AI",
            Morph::E => "E",
            Morph::U => "U",
            Morph::Fv => "FV",
            Morph::Mbp => "MBP",
            Morph::ShCh => "ShCh",
            Morph::O => "O",
            Morph::L => "L",
            Morph::Wq => "WQ",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Morph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Morph {
    type Err = MouthsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Morph::ALL
            .into_iter()
            .find(|morph| morph.name() == s)
            .ok_or_else(|| MouthsyncError::msg(format!("unknown morph `{s}`")))
    }
}

/// A weight for every morph. Always complete, never sparse.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MorphWeights {
    weights: [f32; Morph::COUNT],
}

impl MorphWeights {
    /// All weights at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed mouth: `MBP` fully on, everything else off.
    pub fn closed() -> Self {
        let mut weights = Self::new();
        weights.set(Morph::Mbp, 1.0);
        weights
    }

    pub fn get(&self, morph: Morph) -> f32 {
        self.weights[morph.index()]
    }

    pub fn set(&mut self, morph: Morph, weight: f32) {
        self.weights[morph.index()] = weight;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Morph, f32)> + '_ {
        Morph::ALL.into_iter().map(move |morph| (morph, self.get(morph)))
    }

    pub fn sum(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// Morph with the largest weight; ties go to the first in [`Morph::ALL`].
    pub fn dominant(&self) -> Morph {
        let mut best = Morph::ALL[0];
        for (morph, weight) in self.iter() {
            if weight > self.get(best) {
                best = morph;
            }
        }
        best
    }

    /// Scales every weight down so the total is 1 when it exceeds 1. Totals of
    /// 1 or less are left alone: a soft articulation stays soft.
    pub fn normalize(&mut self) {
        let sum = self.sum();
        if sum > 1.0 {
            for weight in &mut self.weights {
                *weight /= sum;
            }
        }
    }
}

impl Serialize for MorphWeights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Morph::COUNT))?;
        for (morph, weight) in self.iter() {
            map.serialize_entry(morph.name(), &weight)?;
        }
        map.end()
    }
}

/// Maps smoothed features to morph weights.
///
/// Silence short-circuits to a closed mouth. Otherwise a fricative overlay and
/// exactly one vowel band may both contribute before normalisation.
pub fn classify(features: &SpectralFeatures, config: &AnalyzerConfig) -> MorphWeights {
    let volume = features.volume;
    if volume < config.silence_volume_threshold {
        return MorphWeights::closed();
    }

    let mut weights = MorphWeights::new();

    if features.rolloff_hz > config.noise_rolloff_threshold
        || features.zero_crossing_rate > config.noise_zero_crossing_threshold
    {
        weights.set(Morph::Fv, scaled(volume, 6.0));
        weights.set(Morph::ShCh, scaled(volume, 4.0));
    }

    let centroid = features.centroid_hz;
    if centroid < config.rounded_centroid_upper_bound {
        let u = scaled(volume, 3.0);
        weights.set(Morph::U, u);
        weights.set(Morph::O, 0.7 * u);
        weights.set(Morph::Wq, 0.4 * u);
    } else if centroid < config.bright_centroid_lower_bound {
        weights.set(Morph::Ai, scaled(volume, 4.0));
    } else {
        let e = scaled(volume, 5.0);
        weights.set(Morph::E, e);
        weights.set(Morph::L, 0.2 * e);
    }

    weights.normalize();
    weights
}

#[inline]
fn scaled(volume: f32, gain: f32) -> f32 {
    (volume * gain).clamp(0.0, 1.0)
}
