//! Pairing of light bars that plausibly bound the same plate.

use nalgebra::distance;

use crate::config::{ConfigError, PairerConfig};
use crate::detection::light_bar::LightBar;

/// Two light bars judged to belong to one plate, `left` no further right
/// than `right` in the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmorPair {
    pub left: LightBar,
    pub right: LightBar,
}

impl ArmorPair {
    /// Builds a pair ordered by center x. Equal x keeps argument order.
    pub fn ordered(a: LightBar, b: LightBar) -> Self {
        if b.center.x < a.center.x {
            Self { left: b, right: a }
        } else {
            Self { left: a, right: b }
        }
    }

    pub fn center_distance(&self) -> f32 {
        distance(&self.left.center, &self.right.center)
    }

    pub fn angle_diff(&self) -> f32 {
        (self.left.angle - self.right.angle).abs()
    }
}

/// Enumerates every unordered pair once and keeps those passing the angle
/// and distance gates.
///
/// A bar may appear in several pairs; no deduplication is done here.
#[derive(Debug, Clone)]
pub struct LightBarPairer {
    config: PairerConfig,
}

impl LightBarPairer {
    pub fn new(config: PairerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PairerConfig {
        &self.config
    }

    /// Whether two bars satisfy both gates (all comparisons exclusive).
    pub fn accepts(&self, a: &LightBar, b: &LightBar) -> bool {
        let angle_diff = (a.angle - b.angle).abs();
        let dist = distance(&a.center, &b.center);
        angle_diff < self.config.max_angle_diff_deg
            && dist > self.config.min_distance
            && dist < self.config.max_distance
    }

    /// Pairs in enumeration order: `(0, 1), (0, 2), ..., (1, 2), ...`.
    pub fn pair(&self, bars: &[LightBar]) -> Vec<ArmorPair> {
        let mut pairs = Vec::new();
        for (i, a) in bars.iter().enumerate() {
            for b in &bars[i + 1..] {
                if self.accepts(a, b) {
                    pairs.push(ArmorPair::ordered(*a, *b));
                }
            }
        }
        pairs
    }
}

impl Default for LightBarPairer {
    fn default() -> Self {
        Self {
            config: PairerConfig::default(),
        }
    }
}
