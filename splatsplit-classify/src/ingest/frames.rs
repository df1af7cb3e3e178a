//! Per-frame splat files on disk

use splatsplit_data::ply::{self, PlyError};
use splatsplit_data::PointSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Frame files named `<dir>/<prefix><frame:05>.ply`.
#[derive(Debug, Clone)]
pub struct FrameFiles {
    dir: PathBuf,
    prefix: String,
}

impl FrameFiles {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, frame: usize) -> PathBuf {
        self.dir.join(format!("{}{:05}.ply", self.prefix, frame))
    }

    /// Load a frame's splats. A missing file is `Ok(None)`; anything else that
    /// goes wrong while reading is an error.
    pub fn load(&self, frame: usize) -> Result<Option<PointSet>, PlyError> {
        let path = self.path(frame);
        if !path.is_file() {
            debug!("Frame file not found: {}", path.display());
            return Ok(None);
        }
        ply::load_point_set(&path).map(Some)
    }
}
