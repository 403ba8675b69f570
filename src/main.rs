use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rust_armor_tracker::config::DetectorConfig;
use rust_armor_tracker::io::FrameSource;
use rust_armor_tracker::system::StreamWorker;
use rust_armor_tracker::tracking::{FrameReport, TrackStatus};

const REPORT_WAIT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let source_arg = args.next().unwrap_or_else(|| "0".to_string());
    let config = match args.next() {
        Some(path) => DetectorConfig::from_yaml_file(&path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => {
            info!("No config file given, using defaults");
            DetectorConfig::default()
        }
    };

    let mut source = FrameSource::open(&source_arg)?;
    let mut worker = StreamWorker::spawn("armor-stream", config)?;

    let mut submitted = 0u64;
    let mut received = 0u64;
    while let Some(frame) = source.next_frame()? {
        worker.submit(frame)?;
        submitted += 1;
        while let Some(report) = worker.try_recv() {
            log_report(&report);
            received += 1;
        }
    }

    // Drain what is still in flight.
    while received + worker.shared().failed_frames() < submitted {
        match worker.recv_timeout(REPORT_WAIT) {
            Some(report) => {
                log_report(&report);
                received += 1;
            }
            None => {
                warn!(submitted, received, "Timed out waiting for remaining reports");
                break;
            }
        }
    }

    let failed = worker.shared().failed_frames();
    worker.shutdown();
    info!(frames = submitted, failed, "Done");
    Ok(())
}

fn log_report(report: &FrameReport) {
    info!(
        frame = report.frame_index,
        bars = report.metrics.light_bars,
        detections = report.metrics.detections,
        tracks = report.metrics.tracks,
        total_ms = report.timing.total_ms,
        "Frame"
    );
    for target in &report.targets {
        if target.status != TrackStatus::Tracked {
            continue;
        }
        match &target.pose {
            Some(pose) => info!("{} {} dist={:.2}m", target.track.id, pose, pose.distance()),
            None => info!("{} pose unavailable", target.track.id),
        }
    }
}
