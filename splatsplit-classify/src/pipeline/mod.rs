//! Batch pipeline: build the static master from frame 0, then split every
//! later frame against it.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;

pub use config::{MissingMaskPolicy, PipelineConfig};
pub use error::PipelineError;
pub use orchestrator::{FrameOutcome, FrameReport, Pipeline, RunSummary, SkipReason};
pub use output::OutputDir;
