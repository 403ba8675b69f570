//! Inter-thread message types.

use opencv::core::Mat;

/// Message sent from the producer to a `StreamWorker`.
pub enum WorkerMsg {
    /// Next camera frame, processed in submission order.
    Frame(Mat),
    /// Drop all tracks before the next frame (e.g. after a camera switch).
    Reset,
}
