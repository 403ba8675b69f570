//! Box prediction used when matching tracks against new detections.

use crate::geometry::BoundingBox;
use crate::tracking::track::TrackedArmor;

/// Predicts where a track's box should be in the current frame.
///
/// The prediction only feeds IOU matching; a track's stored box is always
/// the last observed one.
pub trait MotionPredictor {
    fn predict(&self, track: &TrackedArmor) -> BoundingBox;
}

/// No motion model: a track is matched at its last observed box.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPredictor;

impl MotionPredictor for StaticPredictor {
    fn predict(&self, track: &TrackedArmor) -> BoundingBox {
        track.bbox
    }
}

/// Constant velocity model.
///
/// Extrapolates the last observed center displacement over the frames
/// elapsed since the last match (`misses + 1`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantVelocityPredictor;

impl MotionPredictor for ConstantVelocityPredictor {
    fn predict(&self, track: &TrackedArmor) -> BoundingBox {
        let frames = (track.misses + 1) as f64;
        track
            .bbox
            .translated(track.velocity.x * frames, track.velocity.y * frames)
    }
}

impl<F> MotionPredictor for F
where
    F: Fn(&TrackedArmor) -> BoundingBox,
{
    fn predict(&self, track: &TrackedArmor) -> BoundingBox {
        self(track)
    }
}
