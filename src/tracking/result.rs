//! Per-frame results and diagnostics.
//!
//! These types describe what happened during processing of a single frame:
//! - the tracked targets, each with its pose if PnP succeeded
//! - candidate counts at every pipeline stage
//! - timing information for profiling

use crate::geometry::Pose;
use crate::tracking::state::TrackStatus;
use crate::tracking::track::TrackedArmor;

/// Summary of a single processed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_index: u64,
    /// Every live track after this frame's update, in ascending id order.
    pub targets: Vec<TargetReport>,
    pub metrics: FrameMetrics,
    pub timing: TimingStats,
}

impl FrameReport {
    /// Targets matched in this frame.
    pub fn tracked(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets
            .iter()
            .filter(|t| t.status == TrackStatus::Tracked)
    }
}

/// One track as reported to renderers and logs.
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub track: TrackedArmor,
    /// `None` when PnP failed for the track's corners.
    pub pose: Option<Pose>,
    pub status: TrackStatus,
}

/// Candidate counts for the pipeline stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameMetrics {
    pub light_bars: usize,
    pub pairs: usize,
    pub detections: usize,
    /// Pairs whose corners could not be resolved.
    pub rejected_pairs: usize,
    pub tracks: usize,
    pub poses_solved: usize,
}

/// Timing breakdown for a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    pub total_ms: f64,
    pub extract_ms: f64,
    pub pair_ms: f64,
    pub track_ms: f64,
    pub pose_ms: f64,
}
