//! End-to-end per-frame pipeline: light bars, pairs, detections, tracks, poses.

use std::time::Instant;

use anyhow::Result;
use opencv::core::Mat;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::detection::{Detection, LightBarExtractor, LightBarPairer, resolve_detection};
use crate::geometry::{CameraModel, PlateModel, PoseEstimator};
use crate::tracking::{
    ArmorTracker, FrameMetrics, FrameReport, MotionPredictor, StaticPredictor, TargetReport,
    TimingStats,
};

/// Owns every stage for one camera stream.
///
/// Not shareable across streams: each stream needs its own detector so that
/// track ids stay consistent.
pub struct ArmorDetector<P = StaticPredictor> {
    extractor: LightBarExtractor,
    pairer: LightBarPairer,
    tracker: ArmorTracker<P>,
    estimator: PoseEstimator,
    frames_processed: u64,
}

impl ArmorDetector<StaticPredictor> {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        Self::with_predictor(config, StaticPredictor)
    }
}

impl<P: MotionPredictor> ArmorDetector<P> {
    pub fn with_predictor(config: &DetectorConfig, predictor: P) -> Result<Self> {
        config.validate()?;
        let camera = CameraModel::from_config(&config.camera)?;
        let plate = PlateModel::from_config(&config.plate)?;

        Ok(Self {
            extractor: LightBarExtractor::new(config.extractor.clone())?,
            pairer: LightBarPairer::new(config.pairer.clone())?,
            tracker: ArmorTracker::with_predictor(config.tracker.clone(), predictor)?,
            estimator: PoseEstimator::new(camera, plate, &config.pose)?,
            frames_processed: 0,
        })
    }

    pub fn tracker(&self) -> &ArmorTracker<P> {
        &self.tracker
    }

    pub fn estimator(&self) -> &PoseEstimator {
        &self.estimator
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Drop all tracks; ids restart at 0. Frame numbering continues.
    pub fn reset(&mut self) {
        self.tracker.clear();
    }

    /// Run one frame through the pipeline.
    ///
    /// An empty `Mat` counts as a frame without detections, so existing
    /// tracks still age.
    pub fn process_frame(&mut self, frame: &Mat) -> Result<FrameReport> {
        let t_start = Instant::now();

        let bars = self.extractor.extract(frame)?;
        let t_extract = Instant::now();

        let pairs = self.pairer.pair(&bars);
        let detections: Vec<Detection> = pairs.iter().filter_map(resolve_detection).collect();
        let t_pair = Instant::now();

        let tracks = self.tracker.update(&detections).to_vec();
        let t_track = Instant::now();

        let targets: Vec<TargetReport> = tracks
            .into_iter()
            .map(|track| TargetReport {
                pose: self.estimator.estimate(&track.corners),
                status: track.status(),
                track,
            })
            .collect();
        let t_pose = Instant::now();

        let metrics = FrameMetrics {
            light_bars: bars.len(),
            pairs: pairs.len(),
            detections: detections.len(),
            rejected_pairs: pairs.len() - detections.len(),
            tracks: targets.len(),
            poses_solved: targets.iter().filter(|t| t.pose.is_some()).count(),
        };
        let timing = TimingStats {
            total_ms: elapsed_ms(t_start, t_pose),
            extract_ms: elapsed_ms(t_start, t_extract),
            pair_ms: elapsed_ms(t_extract, t_pair),
            track_ms: elapsed_ms(t_pair, t_track),
            pose_ms: elapsed_ms(t_track, t_pose),
        };

        let frame_index = self.frames_processed;
        self.frames_processed += 1;

        debug!(
            frame = frame_index,
            bars = metrics.light_bars,
            pairs = metrics.pairs,
            detections = metrics.detections,
            rejected = metrics.rejected_pairs,
            tracks = metrics.tracks,
            poses = metrics.poses_solved,
            total_ms = timing.total_ms,
            "Frame processed"
        );

        Ok(FrameReport {
            frame_index,
            targets,
            metrics,
            timing,
        })
    }
}

fn elapsed_ms(from: Instant, to: Instant) -> f64 {
    to.duration_since(from).as_secs_f64() * 1000.0
}
