//! Detector configuration: thresholds, camera parameters and the physical
//! plate model, loadable from YAML.
//!
//! Every section has `Default` values calibrated for the reference camera and
//! a 200 mm x 100 mm plate. Sections validate themselves; components call
//! `validate()` in their constructors so a bad value never reaches per-frame
//! processing.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration value that violates a component invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("IOU threshold must lie in [0, 1], got {0}")]
    IouThresholdOutOfRange(f64),
    #[error("light-bar distance window ({min}, {max}) must satisfy 0 <= min < max")]
    InvalidDistanceWindow { min: f32, max: f32 },
    #[error("light-bar angle tolerance must be positive, got {0} deg")]
    InvalidAngleTolerance(f32),
    #[error("light-bar aspect ratio must be at least 1, got {0}")]
    InvalidAspectRatio(f32),
    #[error("morphology kernel size must be positive and odd, got {0}")]
    InvalidKernelSize(i32),
    #[error("adaptive threshold block size must be odd and >= 3, got {0}")]
    InvalidBlockSize(i32),
    #[error("plate size must be positive, got {width} x {height} m")]
    InvalidPlateSize { width: f64, height: f64 },
    #[error("camera intrinsic matrix is not a valid pinhole matrix")]
    InvalidIntrinsics,
}

/// Camera intrinsics (row-major 3x3) and OpenCV distortion `[k1, k2, p1, p2, k3]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub matrix: [f64; 9],
    pub distortion: [f64; 5],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            matrix: [
                928.130989, 0.0, 377.572945, //
                0.0, 930.138391, 283.892859, //
                0.0, 0.0, 1.0,
            ],
            distortion: [
                -0.254433647,
                0.569431382,
                0.00365405229,
                -0.00109433818,
                -1.33846840,
            ],
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.matrix;
        let finite = m.iter().chain(self.distortion.iter()).all(|v| v.is_finite());
        if !finite || m[0] <= 0.0 || m[4] <= 0.0 || m[6] != 0.0 || m[7] != 0.0 || m[8] != 1.0 {
            return Err(ConfigError::InvalidIntrinsics);
        }
        Ok(())
    }
}

/// Physical plate size in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlateConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            width: 0.2,
            height: 0.1,
        }
    }
}

impl PlateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ConfigError::InvalidPlateSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// How the intensity image is turned into a binary mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Binarization {
    /// Gaussian-weighted local mean over a `block_size` window, minus `c`.
    Adaptive { block_size: i32, c: f64 },
    /// Global cutoff.
    Fixed { threshold: f64 },
}

impl Default for Binarization {
    fn default() -> Self {
        Self::Adaptive {
            block_size: 11,
            c: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    pub binarization: Binarization,
    /// Side of the square structuring element used for closing and opening.
    pub kernel_size: i32,
    /// Contours with a smaller area (square pixels) are noise.
    pub min_contour_area: f64,
    /// Minimum long-side / short-side ratio of a light bar (exclusive).
    pub min_aspect_ratio: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binarization: Binarization::default(),
            kernel_size: 3,
            min_contour_area: 100.0,
            min_aspect_ratio: 2.0,
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kernel_size <= 0 || self.kernel_size % 2 == 0 {
            return Err(ConfigError::InvalidKernelSize(self.kernel_size));
        }
        if let Binarization::Adaptive { block_size, .. } = self.binarization {
            if block_size < 3 || block_size % 2 == 0 {
                return Err(ConfigError::InvalidBlockSize(block_size));
            }
        }
        if !(self.min_aspect_ratio >= 1.0) {
            return Err(ConfigError::InvalidAspectRatio(self.min_aspect_ratio));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PairerConfig {
    /// Maximum orientation difference between paired bars (exclusive).
    pub max_angle_diff_deg: f32,
    /// Center distance window in pixels, both bounds exclusive.
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for PairerConfig {
    fn default() -> Self {
        Self {
            max_angle_diff_deg: 15.0,
            min_distance: 20.0,
            max_distance: 200.0,
        }
    }
}

impl PairerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_angle_diff_deg > 0.0) {
            return Err(ConfigError::InvalidAngleTolerance(self.max_angle_diff_deg));
        }
        if !(self.min_distance >= 0.0 && self.min_distance < self.max_distance) {
            return Err(ConfigError::InvalidDistanceWindow {
                min: self.min_distance,
                max: self.max_distance,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// A detection must exceed this IOU to continue a track.
    pub iou_threshold: f64,
    /// Tracks are dropped once `misses` exceeds this.
    pub max_misses: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            max_misses: 5,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(ConfigError::IouThresholdOutOfRange(self.iou_threshold));
        }
        Ok(())
    }
}

/// PnP solver flavor, mapped onto `calib3d::SOLVEPNP_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnpMethod {
    #[default]
    Iterative,
    Ippe,
    Sqpnp,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoseConfig {
    pub method: PnpMethod,
}

/// Full detector configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    pub camera: CameraConfig,
    pub plate: PlateConfig,
    pub extractor: ExtractorConfig,
    pub pairer: PairerConfig,
    pub tracker: TrackerConfig,
    pub pose: PoseConfig,
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;
        self.plate.validate()?;
        self.extractor.validate()?;
        self.pairer.validate()?;
        self.tracker.validate()?;
        Ok(())
    }

    /// Parse and validate a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse detector config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse detector config {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid detector config {:?}", path))?;
        Ok(config)
    }
}
