//! Subcommand implementations and logging setup.

use splatsplit_classify::{MissingMaskPolicy, Pipeline, PipelineConfig, PipelineError};
use splatsplit_data::{
    BuildOptions, CalibrationError, PoseConvention, build_camera_config, read_sparse_model,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
}

pub fn init_logging(config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level)),
        )
        .with_target(false)
        .init();
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub struct ConfigRequest {
    pub sparse: PathBuf,
    pub output: PathBuf,
    pub masks: Option<PathBuf>,
    pub allow: Vec<String>,
    pub convention: PoseConvention,
}

pub fn run_config(request: ConfigRequest) -> Result<(), AppError> {
    let model = read_sparse_model(&request.sparse)?;
    let options = BuildOptions {
        masks_root: request.masks,
        allowed_folders: (!request.allow.is_empty())
            .then(|| request.allow.into_iter().collect()),
        convention: request.convention,
    };
    let config = build_camera_config(&model, &options)?;
    if config.cameras.is_empty() {
        warn!("No cameras matched; writing an empty configuration");
    }
    config.save(&request.output)?;
    println!(
        "Wrote {} cameras ({}) to {}",
        config.cameras.len(),
        request.convention,
        request.output.display()
    );
    Ok(())
}

/// Command-line values that replace fields of the loaded pipeline config.
#[derive(Debug, Default)]
pub struct SplitOverrides {
    pub config: Option<PathBuf>,
    pub ply_dir: Option<PathBuf>,
    pub masks_dir: Option<PathBuf>,
    pub camera_config: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub frame_count: Option<usize>,
    pub threshold: Option<u32>,
    pub jobs: Option<usize>,
    pub frame_prefix: Option<String>,
    pub skip_missing_masks: bool,
}

impl SplitOverrides {
    /// Start from the config file (or defaults) and apply every set flag.
    pub fn resolve(self) -> Result<PipelineConfig, PipelineError> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading pipeline config from {}", path.display());
                PipelineConfig::load(path)?
            }
            None => PipelineConfig::default(),
        };

        if let Some(dir) = self.ply_dir {
            config.ply_dir = dir;
        }
        if let Some(dir) = self.masks_dir {
            config.masks_dir = dir;
        }
        if let Some(path) = self.camera_config {
            config.camera_config = path;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(count) = self.frame_count {
            config.frame_count = count;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if let Some(prefix) = self.frame_prefix {
            config.frame_prefix = prefix;
        }
        if self.skip_missing_masks {
            config.missing_masks = MissingMaskPolicy::SkipFrame;
        }
        Ok(config)
    }
}

pub fn run_split(overrides: SplitOverrides) -> Result<(), AppError> {
    let config = overrides.resolve()?;
    let summary = Pipeline::from_config(config)?.run()?;

    for (frame, reason) in summary.skipped() {
        warn!("Frame {} skipped: {}", frame, reason);
    }
    println!(
        "Static master: {} splats; {} frames written, {} skipped",
        summary.static_master_count,
        summary.written().count(),
        summary.skipped().count()
    );
    Ok(())
}
