//! Multi-view vote classification

pub mod classifier;
pub mod observer;

pub use classifier::{
    Classification, ClassifyError, DEFAULT_VOTE_THRESHOLD, VoteClassifier, cast_votes, mask_cell,
};
pub use observer::{CameraVoteStats, PartitionCounts, TracingObserver, VoteObserver};
