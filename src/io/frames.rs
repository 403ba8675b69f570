use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgcodecs, imgcodecs::IMREAD_COLOR, videoio};
use tracing::{info, warn};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];

/// Where frames come from: a video file or device, or a directory of images.
pub enum FrameSource {
    Video { capture: videoio::VideoCapture },
    Images { paths: Vec<PathBuf>, next: usize },
}

impl FrameSource {
    /// A numeric argument opens that camera. Otherwise a directory is read as
    /// an image sequence and anything else as a video file.
    pub fn open(source: &str) -> Result<Self> {
        if let Ok(index) = source.parse::<i32>() {
            return Self::camera(index);
        }
        let path = Path::new(source);
        if path.is_dir() {
            Self::image_dir(path)
        } else {
            Self::video_file(path)
        }
    }

    pub fn camera(index: i32) -> Result<Self> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open camera {}", index))?;
        if !capture.is_opened()? {
            bail!("Camera {} is not available", index);
        }
        info!(camera = index, "Opened camera");
        Ok(Self::Video { capture })
    }

    pub fn video_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .to_str()
            .with_context(|| format!("Non UTF-8 path {:?}", path))?;
        let capture = videoio::VideoCapture::from_file(name, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video {}", path.display()))?;
        if !capture.is_opened()? {
            bail!("Cannot read video {}", path.display());
        }
        info!(path = %path.display(), "Opened video");
        Ok(Self::Video { capture })
    }

    /// Images in `dir` with a known extension, sorted by file name.
    pub fn image_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in
            fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            if is_image(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            bail!("No images found in {}", dir.display());
        }
        paths.sort();
        info!(dir = %dir.display(), images = paths.len(), "Opened image directory");
        Ok(Self::Images { paths, next: 0 })
    }

    /// Next BGR frame, `None` once the source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Mat>> {
        match self {
            Self::Video { capture } => {
                let mut frame = Mat::default();
                if !capture.read(&mut frame)? || frame.empty() {
                    return Ok(None);
                }
                Ok(Some(frame))
            }
            Self::Images { paths, next } => {
                while let Some(path) = paths.get(*next) {
                    *next += 1;
                    let name = path
                        .to_str()
                        .with_context(|| format!("Non UTF-8 path {:?}", path))?;
                    let frame = imgcodecs::imread(name, IMREAD_COLOR)
                        .with_context(|| format!("Failed to read image {}", path.display()))?;
                    if frame.empty() {
                        warn!(path = %path.display(), "Skipping unreadable image");
                        continue;
                    }
                    return Ok(Some(frame));
                }
                Ok(None)
            }
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
