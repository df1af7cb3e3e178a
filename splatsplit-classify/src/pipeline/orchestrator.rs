//! Two-phase frame driver.
//!
//! Frame 0 is classified once. Its static cut becomes the static master and
//! its dynamic cut is written as frame 0's output. Frames `1..frame_count`
//! are then classified in parallel, each written as its own dynamic cut and
//! that cut appended to the static master.

use crate::ingest::{DirectoryMasks, FrameFiles, MaskError, MaskSource, load_frame_masks};
use crate::pipeline::config::{MissingMaskPolicy, PipelineConfig};
use crate::pipeline::error::PipelineError;
use crate::pipeline::output::OutputDir;
use crate::voting::{Classification, VoteClassifier, VoteObserver};
use rayon::prelude::*;
use splatsplit_data::{CameraModel, PointSet, load_cameras};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Counts for one written frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: usize,
    /// Splats this frame's own classification called static.
    pub static_count: usize,
    pub dynamic_count: usize,
    /// Splats in `Final_<frame>`: the static master plus this frame's dynamic cut.
    pub final_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingFrameFile(PathBuf),
    MissingMasks(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingFrameFile(path) => {
                write!(f, "frame file not found: {}", path.display())
            }
            SkipReason::MissingMasks(reason) => write!(f, "masks unavailable: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Written(FrameReport),
    Skipped { frame: usize, reason: SkipReason },
}

impl FrameOutcome {
    pub fn frame(&self) -> usize {
        match self {
            FrameOutcome::Written(report) => report.frame,
            FrameOutcome::Skipped { frame, .. } => *frame,
        }
    }
}

/// Result of a full run. `frames` is ordered by frame index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub static_master_path: PathBuf,
    pub static_master_count: usize,
    pub frames: Vec<FrameOutcome>,
}

impl RunSummary {
    pub fn written(&self) -> impl Iterator<Item = &FrameReport> {
        self.frames.iter().filter_map(|outcome| match outcome {
            FrameOutcome::Written(report) => Some(report),
            FrameOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (usize, &SkipReason)> {
        self.frames.iter().filter_map(|outcome| match outcome {
            FrameOutcome::Skipped { frame, reason } => Some((*frame, reason)),
            FrameOutcome::Written(_) => None,
        })
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    cameras: Arc<[CameraModel]>,
    masks: Arc<dyn MaskSource>,
    frames: FrameFiles,
    classifier: VoteClassifier,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("cameras", &self.cameras.len())
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline over already-loaded cameras and an arbitrary mask source.
    pub fn new(
        config: PipelineConfig,
        cameras: Vec<CameraModel>,
        masks: Arc<dyn MaskSource>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if cameras.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one camera is required".to_string(),
            ));
        }
        Ok(Self {
            frames: FrameFiles::new(&config.ply_dir, &config.frame_prefix),
            classifier: VoteClassifier::new(config.threshold),
            cameras: cameras.into(),
            masks,
            config,
        })
    }

    /// Load cameras from `config.camera_config` and masks from `config.masks_dir`.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let cameras = load_cameras(&config.camera_config)?;
        let masks = Arc::new(DirectoryMasks::new(&config.masks_dir));
        Self::new(config, cameras, masks)
    }

    pub fn with_observer(mut self, observer: Arc<dyn VoteObserver>) -> Self {
        self.classifier = self.classifier.with_observer(observer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cameras(&self) -> &[CameraModel] {
        &self.cameras
    }

    #[tracing::instrument(skip_all, fields(frames = self.config.frame_count))]
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let output = OutputDir::create(&self.config.output_dir)?;
        info!(
            "Splitting {} frames with {} cameras, threshold {}",
            self.config.frame_count,
            self.cameras.len(),
            self.classifier.threshold()
        );

        let (static_master, reference) = self.process_reference(&output)?;
        let static_master_path = output.write_static_master(&static_master)?;
        info!(
            "Static master: {} splats -> {}",
            static_master.len(),
            static_master_path.display()
        );

        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|index| format!("splatsplit-{}", index));
        if let Some(jobs) = self.config.jobs {
            builder = builder.num_threads(jobs);
        }
        let pool = builder.build()?;

        let rest: Vec<FrameOutcome> = pool.install(|| {
            (1..self.config.frame_count)
                .into_par_iter()
                .map(|frame| self.process_frame(frame, &static_master, &output))
                .collect::<Result<Vec<_>, _>>()
        })?;

        let mut frames = Vec::with_capacity(self.config.frame_count);
        frames.push(FrameOutcome::Written(reference));
        frames.extend(rest);

        let summary = RunSummary {
            static_master_path,
            static_master_count: static_master.len(),
            frames,
        };
        info!(
            "Done: {} frames written, {} skipped",
            summary.written().count(),
            summary.skipped().count()
        );
        Ok(summary)
    }

    /// Classify frame 0 once and write its outputs. Returns the static master.
    fn process_reference(
        &self,
        output: &OutputDir,
    ) -> Result<(PointSet, FrameReport), PipelineError> {
        let points = self
            .frames
            .load(0)?
            .ok_or_else(|| PipelineError::MissingReferenceFrame(self.frames.path(0)))?;
        let masks = load_frame_masks(&*self.masks, 0, &self.cameras)
            .map_err(|source| PipelineError::Mask { frame: 0, source })?;
        let classification =
            self.classifier
                .classify(0, &points.positions(), &self.cameras, &masks)?;

        let static_master = classification.static_points(&points);
        let report = self.write_frame(0, &points, &classification, &static_master, output)?;
        Ok((static_master, report))
    }

    fn process_frame(
        &self,
        frame: usize,
        static_master: &PointSet,
        output: &OutputDir,
    ) -> Result<FrameOutcome, PipelineError> {
        let Some(points) = self.frames.load(frame)? else {
            let path = self.frames.path(frame);
            warn!("Skipping frame {}: {} not found", frame, path.display());
            return Ok(FrameOutcome::Skipped {
                frame,
                reason: SkipReason::MissingFrameFile(path),
            });
        };

        let masks = match load_frame_masks(&*self.masks, frame, &self.cameras) {
            Ok(masks) => masks,
            Err(err @ MaskError::MaskNotFound { .. })
                if self.config.missing_masks == MissingMaskPolicy::SkipFrame =>
            {
                warn!("Skipping frame {}: {}", frame, err);
                return Ok(FrameOutcome::Skipped {
                    frame,
                    reason: SkipReason::MissingMasks(err.to_string()),
                });
            }
            Err(source) => return Err(PipelineError::Mask { frame, source }),
        };

        let classification =
            self.classifier
                .classify(frame, &points.positions(), &self.cameras, &masks)?;
        let report = self.write_frame(frame, &points, &classification, static_master, output)?;
        Ok(FrameOutcome::Written(report))
    }

    fn write_frame(
        &self,
        frame: usize,
        points: &PointSet,
        classification: &Classification,
        static_master: &PointSet,
        output: &OutputDir,
    ) -> Result<FrameReport, PipelineError> {
        let dynamic = classification.dynamic_points(points);
        let combined = static_master.concat(&dynamic);
        output.write_frame(frame, &dynamic, &combined)?;

        let counts = classification.counts();
        info!(
            "Frame {}: {} static, {} dynamic, {} in final",
            frame,
            counts.static_count,
            counts.dynamic_count,
            combined.len()
        );
        Ok(FrameReport {
            frame,
            static_count: counts.static_count,
            dynamic_count: counts.dynamic_count,
            final_count: combined.len(),
        })
    }
}
