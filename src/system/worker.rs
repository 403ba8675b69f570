//! Stream worker: one thread that exclusively owns one `ArmorDetector`.
//!
//! Frames go in over a bounded channel (the producer blocks when the worker
//! falls behind). Reports come back over a second bounded channel and are
//! also published as a latest-result snapshot in `SharedReports`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use opencv::core::Mat;
use tracing::{debug, error, info, warn};

use crate::config::DetectorConfig;
use crate::tracking::FrameReport;

use super::detector::ArmorDetector;
use super::messages::WorkerMsg;
use super::shared_state::SharedReports;

/// Capacity of the frame channel (producer -> worker).
const FRAME_CHANNEL_CAPACITY: usize = 4;

/// Capacity of the report channel (worker -> owner). When full, reports are
/// only available through the latest snapshot.
const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Poll interval for shutdown checks while idle.
const RECV_TIMEOUT: Duration = Duration::from_millis(50);

pub struct StreamWorker {
    name: String,
    shared: Arc<SharedReports>,
    frame_sender: Option<Sender<WorkerMsg>>,
    report_receiver: Receiver<FrameReport>,
    handle: Option<JoinHandle<()>>,
}

impl StreamWorker {
    /// Spawn a worker thread for one camera stream.
    ///
    /// The detector is built on the worker thread; construction errors are
    /// returned here.
    pub fn spawn(name: impl Into<String>, config: DetectorConfig) -> Result<Self> {
        let name = name.into();
        let shared = SharedReports::new();
        let (frame_sender, frame_receiver) = bounded::<WorkerMsg>(FRAME_CHANNEL_CAPACITY);
        let (report_sender, report_receiver) = bounded::<FrameReport>(REPORT_CHANNEL_CAPACITY);
        let (ready_sender, ready_receiver) = bounded::<Result<()>>(1);

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let detector = match ArmorDetector::new(&config) {
                    Ok(detector) => {
                        let _ = ready_sender.send(Ok(()));
                        detector
                    }
                    Err(e) => {
                        let _ = ready_sender.send(Err(e));
                        return;
                    }
                };
                run(detector, frame_receiver, report_sender, thread_shared);
            })
            .with_context(|| format!("Failed to spawn worker thread {}", name))?;

        let ready = ready_receiver
            .recv()
            .map_err(|_| anyhow!("Worker {} exited during startup", name));
        if let Err(e) = ready.and_then(|r| r) {
            let _ = handle.join();
            return Err(e.context(format!("Failed to start worker {}", name)));
        }

        info!(worker = %name, "Stream worker started");
        Ok(Self {
            name,
            shared,
            frame_sender: Some(frame_sender),
            report_receiver,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared(&self) -> &Arc<SharedReports> {
        &self.shared
    }

    /// Queue a frame, blocking while the frame channel is full.
    pub fn submit(&self, frame: Mat) -> Result<()> {
        self.send(WorkerMsg::Frame(frame))
    }

    /// Queue a frame without blocking. Returns `false` when the worker is
    /// busy and the frame was dropped.
    pub fn try_submit(&self, frame: Mat) -> Result<bool> {
        let sender = self.sender()?;
        match sender.try_send(WorkerMsg::Frame(frame)) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Disconnected(_)) => Err(anyhow!("Worker {} has stopped", self.name)),
        }
    }

    /// Ask the worker to drop all tracks before its next frame.
    pub fn reset(&self) -> Result<()> {
        self.send(WorkerMsg::Reset)
    }

    pub fn try_recv(&self) -> Option<FrameReport> {
        self.report_receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<FrameReport> {
        self.report_receiver.recv_timeout(timeout).ok()
    }

    /// Latest report, regardless of what was drained from the report channel.
    pub fn latest(&self) -> Option<FrameReport> {
        self.shared.latest()
    }

    /// Stop the worker and wait for its thread. Frames still queued are
    /// discarded.
    pub fn shutdown(&mut self) {
        self.shared.request_shutdown();
        // Disconnecting wakes a worker blocked on recv.
        self.frame_sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(worker = %self.name, "Worker thread panicked");
            }
            info!(worker = %self.name, "Stream worker stopped");
        }
    }

    fn sender(&self) -> Result<&Sender<WorkerMsg>> {
        self.frame_sender
            .as_ref()
            .ok_or_else(|| anyhow!("Worker {} is shut down", self.name))
    }

    fn send(&self, msg: WorkerMsg) -> Result<()> {
        self.sender()?
            .send(msg)
            .map_err(|_| anyhow!("Worker {} has stopped", self.name))
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    mut detector: ArmorDetector,
    frame_receiver: Receiver<WorkerMsg>,
    report_sender: Sender<FrameReport>,
    shared: Arc<SharedReports>,
) {
    loop {
        if shared.is_shutdown_requested() {
            break;
        }

        match frame_receiver.recv_timeout(RECV_TIMEOUT) {
            Ok(WorkerMsg::Frame(frame)) => match detector.process_frame(&frame) {
                Ok(report) => {
                    shared.publish(report.clone());
                    if let Err(TrySendError::Full(report)) = report_sender.try_send(report) {
                        debug!(frame = report.frame_index, "Report channel full, report dropped");
                    }
                }
                Err(e) => {
                    shared.record_failure();
                    warn!(error = %e, "Frame processing failed");
                }
            },
            Ok(WorkerMsg::Reset) => {
                detector.reset();
                debug!("Tracks reset");
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Frame channel closed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::detector::tests::{armor_frame, fixed_threshold_config};
    use crate::tracking::TrackId;

    const WAIT: Duration = Duration::from_secs(10);

    #[test]
    fn test_worker_round_trip() {
        let mut worker = StreamWorker::spawn("cam0", fixed_threshold_config()).unwrap();
        worker.submit(armor_frame(0)).unwrap();
        worker.submit(armor_frame(3)).unwrap();

        let first = worker.recv_timeout(WAIT).unwrap();
        let second = worker.recv_timeout(WAIT).unwrap();
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert_eq!(second.targets.len(), 1);
        assert_eq!(second.targets[0].track.id, TrackId::new(0));
        assert_eq!(second.targets[0].track.hits, 2);
        assert_eq!(worker.latest().unwrap().frame_index, 1);

        worker.shutdown();
        assert!(worker.submit(armor_frame(0)).is_err());
    }

    #[test]
    fn test_worker_reset() {
        let worker = StreamWorker::spawn("cam1", fixed_threshold_config()).unwrap();
        worker.submit(armor_frame(0)).unwrap();
        worker.submit(armor_frame(200)).unwrap();
        worker.reset().unwrap();
        worker.submit(armor_frame(200)).unwrap();

        let reports: Vec<FrameReport> = (0..3).map(|_| worker.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(reports[1].targets.len(), 2);
        assert_eq!(reports[2].targets.len(), 1);
        assert_eq!(reports[2].targets[0].track.id, TrackId::new(0));
    }

    #[test]
    fn test_workers_are_independent() {
        let a = StreamWorker::spawn("a", fixed_threshold_config()).unwrap();
        let b = StreamWorker::spawn("b", fixed_threshold_config()).unwrap();
        a.submit(armor_frame(0)).unwrap();
        a.submit(armor_frame(200)).unwrap();
        b.submit(armor_frame(200)).unwrap();

        a.recv_timeout(WAIT).unwrap();
        let a_report = a.recv_timeout(WAIT).unwrap();
        let b_report = b.recv_timeout(WAIT).unwrap();
        assert_eq!(a_report.targets.last().unwrap().track.id, TrackId::new(1));
        assert_eq!(b_report.targets[0].track.id, TrackId::new(0));
    }

    #[test]
    fn test_failed_frame_is_counted_not_reported() {
        let worker = StreamWorker::spawn("cam2", fixed_threshold_config()).unwrap();
        // Two-channel input cannot be converted to gray.
        let bad = Mat::new_rows_cols_with_default(
            48,
            64,
            opencv::core::CV_8UC2,
            opencv::core::Scalar::all(0.0),
        )
        .unwrap();
        worker.submit(bad).unwrap();
        worker.submit(armor_frame(0)).unwrap();

        let report = worker.recv_timeout(WAIT).unwrap();
        assert_eq!(report.frame_index, 0);
        assert_eq!(worker.shared().failed_frames(), 1);
        assert!(worker.try_recv().is_none());
    }

    #[test]
    fn test_spawn_rejects_invalid_config() {
        let mut config = fixed_threshold_config();
        config.pairer.min_distance = 500.0;
        assert!(StreamWorker::spawn("bad", config).is_err());
    }
}
