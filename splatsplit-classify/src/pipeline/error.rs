use splatsplit_data::{CalibrationError, PlyError};
use std::path::PathBuf;

use crate::ingest::MaskError;
use crate::voting::ClassifyError;

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Ply(#[from] PlyError),
    #[error("Frame {frame}: {source}")]
    Mask {
        frame: usize,
        #[source]
        source: MaskError,
    },
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("Reference frame 0 not found at {0}")]
    MissingReferenceFrame(PathBuf),
    #[error("Failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    pub(crate) fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Persist {
            path: path.into(),
            source,
        }
    }
}
