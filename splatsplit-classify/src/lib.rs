//! Splatsplit Classification Crate
//!
//! Splits per-frame splat clouds into static and dynamic subsets by projecting
//! every splat into a set of calibrated cameras and counting how many of their
//! motion masks mark it as moving.
//!
//! ## Modules
//!
//! - [`ingest`]: Per-frame splat files and per-camera occupancy masks
//! - [`geometry`]: World-to-pixel projection
//! - [`voting`]: The multi-view vote classifier and its observer hook
//! - [`pipeline`]: Batch driver that builds the static master and writes every frame

pub mod geometry;
pub mod ingest;
pub mod pipeline;
pub mod voting;

pub use geometry::{Projection, Projector};
pub use ingest::{DirectoryMasks, FrameFiles, MaskError, MaskImage, MaskSource, MemoryMasks};
pub use pipeline::{
    FrameOutcome, FrameReport, MissingMaskPolicy, Pipeline, PipelineConfig, PipelineError,
    RunSummary, SkipReason,
};
pub use voting::{
    CameraVoteStats, Classification, ClassifyError, DEFAULT_VOTE_THRESHOLD, PartitionCounts,
    TracingObserver, VoteClassifier, VoteObserver,
};
