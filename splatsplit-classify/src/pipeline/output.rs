//! Output directory layout and staged writes.
//!
//! Files are written to a temporary file in the output directory and renamed
//! into place once complete, so readers never see a partial PLY. A frame's
//! dynamic and final files are both staged before either is renamed.

use crate::pipeline::error::PipelineError;
use splatsplit_data::PointSet;
use splatsplit_data::ply::write_point_set;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub const STATIC_MASTER_FILE: &str = "Static_Master.ply";

#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
}

impl OutputDir {
    /// Use `dir`, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| PipelineError::persist(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn static_master_path(&self) -> PathBuf {
        self.dir.join(STATIC_MASTER_FILE)
    }

    pub fn dynamic_path(&self, frame: usize) -> PathBuf {
        self.dir.join(format!("Dynamic_{:05}.ply", frame))
    }

    pub fn final_path(&self, frame: usize) -> PathBuf {
        self.dir.join(format!("Final_{:05}.ply", frame))
    }

    fn stage(&self, points: &PointSet, target: &Path) -> Result<NamedTempFile, PipelineError> {
        let mut temp =
            NamedTempFile::new_in(&self.dir).map_err(|e| PipelineError::persist(target, e))?;
        let mut writer = BufWriter::new(temp.as_file_mut());
        write_point_set(&mut writer, points)
            .and_then(|_| writer.flush())
            .map_err(|e| PipelineError::persist(target, e))?;
        drop(writer);
        Ok(temp)
    }

    fn commit(temp: NamedTempFile, target: &Path) -> Result<(), PipelineError> {
        temp.persist(target)
            .map_err(|e| PipelineError::persist(target, e.error))?;
        debug!("Wrote {}", target.display());
        Ok(())
    }

    pub fn write_static_master(&self, points: &PointSet) -> Result<PathBuf, PipelineError> {
        let target = self.static_master_path();
        let staged = self.stage(points, &target)?;
        Self::commit(staged, &target)?;
        Ok(target)
    }

    /// Write `Dynamic_<frame>` and `Final_<frame>` as a pair.
    pub fn write_frame(
        &self,
        frame: usize,
        dynamic: &PointSet,
        combined: &PointSet,
    ) -> Result<(), PipelineError> {
        let dynamic_target = self.dynamic_path(frame);
        let final_target = self.final_path(frame);
        let dynamic_staged = self.stage(dynamic, &dynamic_target)?;
        let final_staged = self.stage(combined, &final_target)?;
        Self::commit(dynamic_staged, &dynamic_target)?;
        Self::commit(final_staged, &final_target)
    }
}
