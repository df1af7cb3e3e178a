//! Batch parameters for a pipeline run.

use crate::pipeline::error::PipelineError;
use crate::voting::DEFAULT_VOTE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// What to do when a frame after the reference frame lacks a mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMaskPolicy {
    /// Stop the run.
    #[default]
    Abort,
    /// Record a skip for that frame and keep going.
    SkipFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `<frame_prefix><frame:05>.ply`.
    pub ply_dir: PathBuf,
    /// Directory holding `<mask_folder>/<frame:06>.png`.
    pub masks_dir: PathBuf,
    /// Camera configuration JSON.
    pub camera_config: PathBuf,
    pub output_dir: PathBuf,
    /// Frames `0..frame_count` are processed.
    pub frame_count: usize,
    pub threshold: u32,
    /// Worker threads; `None` uses the available parallelism.
    pub jobs: Option<usize>,
    pub frame_prefix: String,
    pub missing_masks: MissingMaskPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ply_dir: PathBuf::new(),
            masks_dir: PathBuf::new(),
            camera_config: PathBuf::new(),
            output_dir: PathBuf::new(),
            frame_count: 0,
            threshold: DEFAULT_VOTE_THRESHOLD,
            jobs: None,
            frame_prefix: "time_".to_string(),
            missing_masks: MissingMaskPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::InvalidConfig(format!("cannot open {}: {}", path.display(), e))
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            PipelineError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.frame_count == 0 {
            return Err(PipelineError::InvalidConfig(
                "frame_count must be at least 1".to_string(),
            ));
        }
        if self.threshold == 0 {
            return Err(PipelineError::InvalidConfig(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
