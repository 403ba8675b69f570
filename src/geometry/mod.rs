//! Geometry utilities: bounding boxes and IOU, camera model, PnP solving.

pub mod bbox;
pub mod camera;
pub mod pnp;

pub use bbox::BoundingBox;
pub use camera::CameraModel;
pub use pnp::{PlateModel, Pose, PoseEstimator};
