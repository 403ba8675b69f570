//! Per-track status as seen by downstream consumers.

/// Whether a track was observed in the latest frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    /// Matched to a detection in the latest `update()` (or just created).
    Tracked,
    /// Unmatched; the box is the last observed one.
    Coasting,
}
