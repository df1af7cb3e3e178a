//! Hook for reporting vote progress without coupling the classifier to a sink.

use splatsplit_data::CameraModel;
use tracing::debug;

/// What one camera contributed to a frame's tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraVoteStats {
    /// Points with positive depth whose mask cell is in bounds.
    pub in_view: usize,
    /// Votes this camera cast.
    pub votes: usize,
    /// Highest tally after this camera.
    pub max_tally: u32,
    /// Points at or above the threshold after this camera.
    pub at_threshold: usize,
}

/// Final split of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionCounts {
    pub static_count: usize,
    pub dynamic_count: usize,
}

impl PartitionCounts {
    pub fn total(&self) -> usize {
        self.static_count + self.dynamic_count
    }
}

/// Receives classification progress. Implementations must be cheap; they run
/// on the worker threads.
pub trait VoteObserver: Send + Sync {
    fn camera_voted(&self, frame: usize, camera: &CameraModel, stats: &CameraVoteStats);

    fn frame_classified(&self, frame: usize, counts: &PartitionCounts);
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl VoteObserver for TracingObserver {
    fn camera_voted(&self, frame: usize, camera: &CameraModel, stats: &CameraVoteStats) {
        debug!(
            frame,
            camera = %camera.mask_folder(),
            in_view = stats.in_view,
            votes = stats.votes,
            max_tally = stats.max_tally,
            at_threshold = stats.at_threshold,
            "camera voted"
        );
    }

    fn frame_classified(&self, frame: usize, counts: &PartitionCounts) {
        debug!(
            frame,
            static_count = counts.static_count,
            dynamic_count = counts.dynamic_count,
            "frame classified"
        );
    }
}
