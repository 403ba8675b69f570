//! Per-frame plate detection: light bars, pairing, and corner resolution.
//!
//! Everything here is stateless. A frame flows through
//! `LightBarExtractor` -> `LightBarPairer` -> `resolve_detection` and comes
//! out as a list of `Detection`s for the tracker.

pub mod corners;
pub mod light_bar;
pub mod pairing;

pub use corners::{ArmorCorners, Detection, resolve_corners, resolve_detection};
pub use light_bar::{LightBar, LightBarExtractor};
pub use pairing::{ArmorPair, LightBarPairer};
