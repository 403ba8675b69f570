//! Pipeline orchestration and thread management.
//!
//! `ArmorDetector` runs the per-frame pipeline in the calling thread.
//! `StreamWorker` moves one detector onto its own thread, with shared state
//! and inter-thread messaging types alongside.

mod detector;
pub mod messages;
pub mod shared_state;
mod worker;

pub use detector::ArmorDetector;
pub use messages::WorkerMsg;
pub use shared_state::SharedReports;
pub use worker::StreamWorker;
