//! State shared between a `StreamWorker` thread and its owner.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::tracking::FrameReport;

/// Latest-result snapshot plus control flags.
pub struct SharedReports {
    /// Most recent report. Written by the worker, read by any observer.
    pub latest: RwLock<Option<FrameReport>>,

    /// Frames the worker failed to process.
    pub failed_frames: AtomicU64,

    /// Request the worker to finish and exit.
    pub shutdown_requested: AtomicBool,
}

impl SharedReports {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish(&self, report: FrameReport) {
        *self.latest.write() = Some(report);
    }

    /// Clone of the latest report, if any frame was processed.
    pub fn latest(&self) -> Option<FrameReport> {
        self.latest.read().clone()
    }

    pub fn record_failure(&self) {
        self.failed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_frames(&self) -> u64 {
        self.failed_frames.load(Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

impl Default for SharedReports {
    fn default() -> Self {
        Self {
            latest: RwLock::new(None),
            failed_frames: AtomicU64::new(0),
            shutdown_requested: AtomicBool::new(false),
        }
    }
}
