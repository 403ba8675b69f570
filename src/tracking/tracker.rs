//! Greedy IOU tracker: reconciles per-frame detections with persisted tracks.
//!
//! Matching is a single greedy pass with track priority:
//! - tracks are visited in ascending id order (creation order);
//! - each takes the unmatched detection with the highest IOU strictly above
//!   the threshold, the lowest detection index winning exact ties;
//! - unmatched tracks coast, and are dropped once `misses > max_misses`;
//! - leftover detections become new tracks, in detection order.

use tracing::debug;

use crate::config::{ConfigError, TrackerConfig};
use crate::detection::Detection;
use crate::tracking::motion_model::{MotionPredictor, StaticPredictor};
use crate::tracking::track::{TrackId, TrackedArmor};

/// Owns the track set and the id counter of one camera stream.
///
/// `update()` is the only mutation besides `clear()`; the tracker is a
/// single-writer object and needs external synchronization to be shared.
pub struct ArmorTracker<P = StaticPredictor> {
    tracks: Vec<TrackedArmor>,
    next_id: u64,
    config: TrackerConfig,
    predictor: P,
}

impl ArmorTracker<StaticPredictor> {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        Self::with_predictor(config, StaticPredictor)
    }
}

impl<P: MotionPredictor> ArmorTracker<P> {
    pub fn with_predictor(config: TrackerConfig, predictor: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tracks: Vec::new(),
            next_id: 0,
            config,
            predictor,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Current tracks in ascending id order.
    pub fn tracks(&self) -> &[TrackedArmor] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Feed one frame's detections and return the surviving plus newly
    /// created tracks.
    pub fn update(&mut self, detections: &[Detection]) -> &[TrackedArmor] {
        let mut detection_matched = vec![false; detections.len()];

        for track in &mut self.tracks {
            let predicted = self.predictor.predict(track);
            let mut best_iou = self.config.iou_threshold;
            let mut best_idx = None;

            for (j, detection) in detections.iter().enumerate() {
                if detection_matched[j] {
                    continue;
                }
                if let Some(iou) = predicted.iou(&detection.bbox) {
                    if iou > best_iou {
                        best_iou = iou;
                        best_idx = Some(j);
                    }
                }
            }

            match best_idx {
                Some(j) => {
                    track.mark_hit(&detections[j]);
                    detection_matched[j] = true;
                }
                None => track.mark_missed(),
            }
        }

        let max_misses = self.config.max_misses;
        self.tracks.retain(|track| {
            let keep = track.misses <= max_misses;
            if !keep {
                debug!(id = %track.id, age = track.age, hits = track.hits, "Track retired");
            }
            keep
        });

        for (detection, _) in detections
            .iter()
            .zip(&detection_matched)
            .filter(|(_, matched)| !**matched)
        {
            let id = TrackId::new(self.next_id);
            self.next_id += 1;
            debug!(id = %id, bbox = ?detection.bbox, "Track created");
            self.tracks.push(TrackedArmor::new(id, detection));
        }

        &self.tracks
    }

    /// Drop every track and restart ids at 0.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.next_id = 0;
    }
}

impl Default for ArmorTracker<StaticPredictor> {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 0,
            config: TrackerConfig::default(),
            predictor: StaticPredictor,
        }
    }
}
