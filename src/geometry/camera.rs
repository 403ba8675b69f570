//! Pinhole camera with OpenCV radial/tangential distortion.

use anyhow::Result;
use nalgebra::{Matrix3, Point2, Vector3};
use opencv::core::Mat;
use opencv::prelude::*;

use crate::config::{CameraConfig, ConfigError};

/// Fixed camera intrinsics, immutable for the lifetime of a detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    pub k: Matrix3<f64>,
    /// `[k1, k2, p1, p2, k3]`
    pub distortion: [f64; 5],
}

impl CameraModel {
    pub fn new(k: Matrix3<f64>, distortion: [f64; 5]) -> Self {
        Self { k, distortion }
    }

    /// Ideal pinhole camera without distortion.
    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self::new(
            Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0),
            [0.0; 5],
        )
    }

    pub fn from_config(config: &CameraConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            Matrix3::from_row_slice(&config.matrix),
            config.distortion,
        ))
    }

    pub fn fx(&self) -> f64 {
        self.k[(0, 0)]
    }

    pub fn fy(&self) -> f64 {
        self.k[(1, 1)]
    }

    pub fn cx(&self) -> f64 {
        self.k[(0, 2)]
    }

    pub fn cy(&self) -> f64 {
        self.k[(1, 2)]
    }

    /// Project a camera-frame point, ignoring distortion.
    /// `None` for points at or behind the image plane.
    pub fn project_undistorted(&self, p: &Vector3<f64>) -> Option<Point2<f64>> {
        if p.z <= 0.0 {
            return None;
        }
        Some(Point2::new(
            self.fx() * p.x / p.z + self.cx(),
            self.fy() * p.y / p.z + self.cy(),
        ))
    }

    /// Intrinsic matrix as a 3x3 `CV_64F` Mat.
    pub fn camera_matrix(&self) -> Result<Mat> {
        let k = &self.k;
        let mat = Mat::from_slice_2d(&[
            [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
            [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
            [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
        ])?;
        Ok(mat)
    }

    /// Distortion coefficients as a 5x1 `CV_64F` Mat.
    pub fn dist_coeffs(&self) -> Result<Mat> {
        let mat = Mat::from_slice(self.distortion.as_slice())?.try_clone()?;
        Ok(mat.reshape(1, 5)?.try_clone()?)
    }
}

impl Default for CameraModel {
    fn default() -> Self {
        let config = CameraConfig::default();
        Self::new(Matrix3::from_row_slice(&config.matrix), config.distortion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_row_major() {
        let camera = CameraModel::from_config(&CameraConfig::default()).unwrap();
        assert_eq!(camera.fx(), 928.130989);
        assert_eq!(camera.fy(), 930.138391);
        assert_eq!(camera.cx(), 377.572945);
        assert_eq!(camera.cy(), 283.892859);
    }

    #[test]
    fn test_project_undistorted() {
        let camera = CameraModel::pinhole(800.0, 800.0, 320.0, 240.0);
        let p = camera.project_undistorted(&Vector3::new(0.1, -0.05, 2.0)).unwrap();
        assert!((p.x - 360.0).abs() < 1e-9);
        assert!((p.y - 220.0).abs() < 1e-9);
        assert!(camera.project_undistorted(&Vector3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn test_camera_matrix_mat() {
        let camera = CameraModel::pinhole(800.0, 810.0, 320.0, 240.0);
        let k = camera.camera_matrix().unwrap();
        assert_eq!(k.rows(), 3);
        assert_eq!(k.cols(), 3);
        assert_eq!(*k.at_2d::<f64>(1, 1).unwrap(), 810.0);
        assert_eq!(*k.at_2d::<f64>(0, 2).unwrap(), 320.0);

        let d = camera.dist_coeffs().unwrap();
        assert_eq!(d.rows(), 5);
        assert_eq!(d.cols(), 1);
    }
}
