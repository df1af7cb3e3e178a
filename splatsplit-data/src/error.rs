//! Error types for calibration ingestion.

use crate::camera::CameraValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading COLMAP models or camera configuration files.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record {record} in {path}: {reason}")]
    MalformedRecord {
        path: PathBuf,
        record: usize,
        reason: String,
    },

    #[error("Unsupported camera model '{model}' in {path}")]
    UnsupportedCameraModel { path: PathBuf, model: String },

    #[error("Image '{image}' references unknown camera id {camera_id}")]
    UnknownCamera { image: String, camera_id: u32 },

    #[error("Invalid camera '{name}': {source}")]
    InvalidCamera {
        name: String,
        #[source]
        source: CameraValidationError,
    },

    #[error("Camera config JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CalibrationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CalibrationError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(
        path: impl Into<PathBuf>,
        record: usize,
        reason: impl Into<String>,
    ) -> Self {
        CalibrationError::MalformedRecord {
            path: path.into(),
            record,
            reason: reason.into(),
        }
    }
}
