//! Plate pose from four image corners (Perspective-n-Point) using OpenCV.

use std::fmt;

use anyhow::{Result, bail};
use nalgebra::{Point2, Rotation3, Vector3};
use opencv::calib3d;
use opencv::core::{Mat, Point2f, Point3d, Vector};
use opencv::prelude::*;
use tracing::warn;

use crate::config::{ConfigError, PlateConfig, PnpMethod, PoseConfig};
use crate::detection::ArmorCorners;
use crate::geometry::CameraModel;

/// Physical plate, centered at the origin in its own z = 0 plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateModel {
    pub width: f64,
    pub height: f64,
}

impl PlateModel {
    pub fn from_config(config: &PlateConfig) -> Result<Self, ConfigError> {
        let plate = Self {
            width: config.width,
            height: config.height,
        };
        plate.validate()?;
        Ok(plate)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ConfigError::InvalidPlateSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Model corners in the same winding as `ArmorCorners`:
    /// left-top, right-top, right-bottom, left-bottom (y down).
    pub fn object_points(&self) -> [Vector3<f64>; 4] {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        [
            Vector3::new(-hw, -hh, 0.0),
            Vector3::new(hw, -hh, 0.0),
            Vector3::new(hw, hh, 0.0),
            Vector3::new(-hw, hh, 0.0),
        ]
    }
}

impl Default for PlateModel {
    fn default() -> Self {
        let config = PlateConfig::default();
        Self {
            width: config.width,
            height: config.height,
        }
    }
}

/// Plate pose in camera coordinates: Rodrigues rotation vector and
/// translation in meters (T_cam_plate).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
}

impl Pose {
    pub fn rotation_matrix(&self) -> Rotation3<f64> {
        Rotation3::new(self.rotation)
    }

    /// Range from the camera center to the plate center.
    pub fn distance(&self) -> f64 {
        self.translation.norm()
    }

    /// Plate-frame point expressed in the camera frame.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation_matrix() * p + self.translation
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (t, r) = (&self.translation, &self.rotation);
        write!(
            f,
            "Pos:({:.2},{:.2},{:.2})m Rot:({:.2},{:.2},{:.2})",
            t.x, t.y, t.z, r.x, r.y, r.z
        )
    }
}

fn solve_flags(method: PnpMethod) -> i32 {
    match method {
        PnpMethod::Iterative => calib3d::SOLVEPNP_ITERATIVE,
        PnpMethod::Ippe => calib3d::SOLVEPNP_IPPE,
        PnpMethod::Sqpnp => calib3d::SOLVEPNP_SQPNP,
    }
}

fn vec3_to_mat(v: &Vector3<f64>) -> Result<Mat> {
    let mat = Mat::from_slice([v.x, v.y, v.z].as_slice())?.try_clone()?;
    Ok(mat.reshape(1, 3)?.try_clone()?)
}

fn mat_to_vec3(mat: &Mat) -> Result<Vector3<f64>> {
    Ok(Vector3::new(
        *mat.at::<f64>(0)?,
        *mat.at::<f64>(1)?,
        *mat.at::<f64>(2)?,
    ))
}

fn to_point3d(points: &[Vector3<f64>]) -> Vector<Point3d> {
    points.iter().map(|p| Point3d::new(p.x, p.y, p.z)).collect()
}

/// Stateless pose solver bound to one camera and one plate model.
pub struct PoseEstimator {
    camera: CameraModel,
    plate: PlateModel,
    method: PnpMethod,
    camera_matrix: Mat,
    dist_coeffs: Mat,
}

impl PoseEstimator {
    pub fn new(camera: CameraModel, plate: PlateModel, config: &PoseConfig) -> Result<Self> {
        plate.validate()?;
        Ok(Self {
            camera_matrix: camera.camera_matrix()?,
            dist_coeffs: camera.dist_coeffs()?,
            camera,
            plate,
            method: config.method,
        })
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn plate(&self) -> &PlateModel {
        &self.plate
    }

    /// Pose of the plate whose ordered image corners are given.
    ///
    /// `None` when the solver throws, reports failure, or returns a
    /// non-finite result; this is expected for edge-on views and is logged,
    /// never fatal.
    pub fn estimate(&self, corners: &ArmorCorners) -> Option<Pose> {
        if corners.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return None;
        }
        match self.solve(corners) {
            Ok(Some(pose)) => Some(pose),
            Ok(None) => {
                warn!(method = ?self.method, "solvePnP did not converge");
                None
            }
            Err(e) => {
                warn!(error = %e, "Pose estimation error");
                None
            }
        }
    }

    /// Raw solver call; `Ok(None)` when OpenCV reports no solution.
    pub fn solve(&self, corners: &ArmorCorners) -> Result<Option<Pose>> {
        let obj_points = to_point3d(&self.plate.object_points());
        let img_points: Vector<Point2f> = corners.iter().map(|p| Point2f::new(p.x, p.y)).collect();

        let mut rvec = Mat::default();
        let mut tvec = Mat::default();
        let solved = calib3d::solve_pnp(
            &obj_points,
            &img_points,
            &self.camera_matrix,
            &self.dist_coeffs,
            &mut rvec,
            &mut tvec,
            false,
            solve_flags(self.method),
        )?;
        if !solved {
            return Ok(None);
        }

        let pose = Pose {
            rotation: mat_to_vec3(&rvec)?,
            translation: mat_to_vec3(&tvec)?,
        };
        let finite = pose.rotation.iter().chain(pose.translation.iter()).all(|v| v.is_finite());
        Ok(finite.then_some(pose))
    }

    /// Project plate-frame points through the full (distorted) camera model.
    pub fn project(&self, pose: &Pose, points: &[Vector3<f64>]) -> Result<Vec<Point2<f32>>> {
        let obj_points = to_point3d(points);
        let rvec = vec3_to_mat(&pose.rotation)?;
        let tvec = vec3_to_mat(&pose.translation)?;
        let mut image_points = Vector::<Point2f>::new();
        calib3d::project_points_def(
            &obj_points,
            &rvec,
            &tvec,
            &self.camera_matrix,
            &self.dist_coeffs,
            &mut image_points,
        )?;
        Ok(image_points.iter().map(|p| Point2::new(p.x, p.y)).collect())
    }

    /// Image positions of the plate origin and the tips of its X, Y and Z
    /// axes (`length` meters long), for overlay rendering.
    pub fn project_axes(&self, pose: &Pose, length: f64) -> Result<[Point2<f32>; 4]> {
        let axes = [
            Vector3::zeros(),
            Vector3::new(length, 0.0, 0.0),
            Vector3::new(0.0, length, 0.0),
            Vector3::new(0.0, 0.0, length),
        ];
        match self.project(pose, &axes)?.as_slice() {
            &[origin, x, y, z] => Ok([origin, x, y, z]),
            other => bail!("projectPoints returned {} points, expected 4", other.len()),
        }
    }

    /// RMS distance in pixels between the observed corners and the plate
    /// model reprojected with `pose`.
    pub fn reprojection_error(&self, pose: &Pose, corners: &ArmorCorners) -> Result<f64> {
        let projected = self.project(pose, &self.plate.object_points())?;
        let sum_sq: f64 = projected
            .iter()
            .zip(corners.iter())
            .map(|(p, c)| {
                let dx = (p.x - c.x) as f64;
                let dy = (p.y - c.y) as f64;
                dx * dx + dy * dy
            })
            .sum();
        Ok((sum_sq / corners.len() as f64).sqrt())
    }
}
