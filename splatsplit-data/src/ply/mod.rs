//! Binary little-endian PLY codec for splat point clouds.
//!
//! The record layout is fixed: every file carries exactly the fields in
//! [`SPLAT_FIELDS`], all `float`, in that order.

mod header;
mod loader;
mod writer;

use std::path::PathBuf;

pub use header::{PlyHeader, SPLAT_FIELDS};
pub use loader::{load_point_set, read_point_set};
pub use writer::{save_point_set, write_point_set};

/// Errors raised while reading or writing splat PLY files.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed PLY header in {path}: {reason}")]
    MalformedHeader { path: PathBuf, reason: String },
    #[error("Truncated PLY body in {path}: expected {expected} bytes, found {found}")]
    TruncatedFile {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
}

impl PlyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlyError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn header(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PlyError::MalformedHeader {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
