use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Morph, MorphWeights};

/// Rates, in 1/s, that shape how the animated weights follow the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Approach rate while a weight rises toward its target.
    pub attack: f32,
    /// Approach rate while a weight falls toward its target.
    pub release: f32,
    /// Decay applied to targets between submissions.
    pub target_decay: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            attack: 30.0,
            release: 12.0,
            target_decay: 8.0,
        }
    }
}

/// Names of the mesh morph targets each morph drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphBindings {
    targets: BTreeMap<Morph, String>,
}

impl MorphBindings {
    /// Binds nothing.
    pub fn empty() -> Self {
        Self {
            targets: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, morph: Morph, target: impl Into<String>) {
        self.targets.insert(morph, target.into());
    }

    pub fn unbind(&mut self, morph: Morph) {
        self.targets.remove(&morph);
    }

    pub fn target(&self, morph: Morph) -> Option<&str> {
        self.targets.get(&morph).map(String::as_str)
    }
}

impl Default for MorphBindings {
    /// Every morph bound to a target of the same name.
    fn default() -> Self {
        let mut bindings = Self::empty();
        for morph in Morph::ALL {
            bindings.bind(morph, morph.name());
        }
        bindings
    }
}

/// Value to write into one mesh morph target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphTargetUpdate {
    pub target: String,
    pub value: f32,
}

/// Eases displayed morph weights toward the latest analyzer output on a
/// display-rate clock, closing the mouth when output stops arriving.
#[derive(Debug, Clone)]
pub struct MorphAnimator {
    config: AnimationConfig,
    bindings: MorphBindings,
    targets: MorphWeights,
    current: MorphWeights,
}

impl MorphAnimator {
    pub fn new(config: AnimationConfig) -> Self {
        Self::with_bindings(config, MorphBindings::default())
    }

    pub fn with_bindings(config: AnimationConfig, bindings: MorphBindings) -> Self {
        Self {
            config,
            bindings,
            targets: MorphWeights::new(),
            current: MorphWeights::new(),
        }
    }

    pub fn bindings(&self) -> &MorphBindings {
        &self.bindings
    }

    /// Weights currently displayed.
    pub fn current(&self) -> &MorphWeights {
        &self.current
    }

    pub fn targets(&self) -> &MorphWeights {
        &self.targets
    }

    /// Replaces the targets with fresh analyzer output.
    pub fn submit(&mut self, weights: &MorphWeights) {
        self.targets = *weights;
    }

    /// Advances the animation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> &MorphWeights {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let attack = approach(self.config.attack, dt);
        let release = approach(self.config.release, dt);
        let decay = (-self.config.target_decay.max(0.0) * dt).exp();

        for morph in Morph::ALL {
            let target = self.targets.get(morph);
            let current = self.current.get(morph);
            let step = if target > current { attack } else { release };
            let next = current + (target - current) * step;
            self.current.set(morph, next.clamp(0.0, 1.0));
            self.targets.set(morph, target * decay);
        }

        &self.current
    }

    /// Current values for every bound morph target.
    pub fn updates(&self) -> Vec<MorphTargetUpdate> {
        self.current
            .iter()
            .filter_map(|(morph, value)| {
                self.bindings.target(morph).map(|target| MorphTargetUpdate {
                    target: target.to_string(),
                    value,
                })
            })
            .collect()
    }
}

impl Default for MorphAnimator {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

/// Fraction of the remaining distance covered in `dt` at `rate`.
fn approach(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate.max(0.0) * dt).exp()
}
