//! Track identity and per-track lifecycle counters.

use nalgebra::Vector2;

use crate::detection::{ArmorCorners, Detection};
use crate::geometry::BoundingBox;
use crate::tracking::state::TrackStatus;

/// Persistent identifier of a tracked plate.
///
/// TrackIds are assigned sequentially by one `ArmorTracker` and never reused
/// within its lifetime (until `clear()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub u64);

impl TrackId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID{}", self.0)
    }
}

/// A plate hypothesis persisted across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedArmor {
    pub id: TrackId,
    /// Last observed box; unchanged while coasting.
    pub bbox: BoundingBox,
    pub corners: ArmorCorners,
    /// Number of `update()` calls survived since creation.
    pub age: u32,
    /// Successful matches, including the creating detection.
    pub hits: u32,
    /// Consecutive unmatched updates.
    pub misses: u32,
    /// Box-center displacement in pixels per frame, measured between the
    /// last two matches.
    pub velocity: Vector2<f64>,
}

impl TrackedArmor {
    pub fn new(id: TrackId, detection: &Detection) -> Self {
        Self {
            id,
            bbox: detection.bbox,
            corners: detection.corners,
            age: 0,
            hits: 1,
            misses: 0,
            velocity: Vector2::zeros(),
        }
    }

    /// Continue the track with a matched detection.
    pub(crate) fn mark_hit(&mut self, detection: &Detection) {
        let frames = (self.misses + 1) as f64;
        self.velocity = (detection.bbox.center() - self.bbox.center()) / frames;
        self.bbox = detection.bbox;
        self.corners = detection.corners;
        self.hits += 1;
        self.misses = 0;
        self.age += 1;
    }

    /// Coast on the last known position.
    pub(crate) fn mark_missed(&mut self) {
        self.misses += 1;
        self.age += 1;
    }

    pub fn status(&self) -> TrackStatus {
        if self.misses == 0 {
            TrackStatus::Tracked
        } else {
            TrackStatus::Coasting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn detection(x: i32, y: i32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x, y, 50, 100),
            corners: [Point2::new(x as f32, y as f32); 4],
        }
    }

    #[test]
    fn test_new_track_counters() {
        let track = TrackedArmor::new(TrackId::new(3), &detection(100, 100));
        assert_eq!(track.age, 0);
        assert_eq!(track.hits, 1);
        assert_eq!(track.misses, 0);
        assert_eq!(track.status(), TrackStatus::Tracked);
    }

    #[test]
    fn test_hit_resets_misses_and_updates_velocity() {
        let mut track = TrackedArmor::new(TrackId::new(0), &detection(100, 100));
        track.mark_missed();
        assert_eq!(track.status(), TrackStatus::Coasting);
        track.mark_hit(&detection(104, 98));
        assert_eq!(track.misses, 0);
        assert_eq!(track.hits, 2);
        assert_eq!(track.age, 2);
        // One coasted frame: the displacement spans two frames.
        assert_eq!(track.velocity, Vector2::new(2.0, -1.0));
        assert_eq!(track.bbox, BoundingBox::new(104, 98, 50, 100));
    }

    #[test]
    fn test_track_id_display() {
        assert_eq!(TrackId::new(7).to_string(), "ID7");
    }
}
