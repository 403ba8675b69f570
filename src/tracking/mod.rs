//! Multi-target tracking: persistent ids for plates across frames.
//!
//! - Track identity and lifecycle counters
//! - Greedy IOU association with track priority
//! - Optional motion prediction for the matching step
//! - Per-frame reports consumed by the binary and the stream worker

pub mod motion_model;
pub mod result;
pub mod state;
pub mod track;
pub mod tracker;

pub use motion_model::{ConstantVelocityPredictor, MotionPredictor, StaticPredictor};
pub use result::{FrameMetrics, FrameReport, TargetReport, TimingStats};
pub use state::TrackStatus;
pub use track::{TrackId, TrackedArmor};
pub use tracker::ArmorTracker;
