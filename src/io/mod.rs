//! Frame input: video files, camera devices and image directories.

pub mod frames;

pub use frames::FrameSource;
