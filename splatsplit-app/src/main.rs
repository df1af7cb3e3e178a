//! Splatsplit Application
//!
//! Two subcommands:
//! - `config`: turn a COLMAP sparse model into a camera configuration file
//! - `split`: run the static/dynamic split over a range of frames

mod app;

use clap::{Parser, Subcommand, ValueEnum};
use splatsplit_data::PoseConvention;
use std::path::PathBuf;

/// Splatsplit - multi-view static/dynamic splat classification
#[derive(Parser, Debug)]
#[command(name = "splatsplit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a camera configuration from a COLMAP sparse model
    Config(ConfigArgs),
    /// Split per-frame splat files into static and dynamic sets
    Split(SplitArgs),
}

#[derive(clap::Args, Debug)]
struct ConfigArgs {
    /// Directory containing cameras.{bin,txt} and images.{bin,txt}
    #[arg(long)]
    sparse: PathBuf,

    /// Output camera configuration JSON
    #[arg(short, long)]
    output: PathBuf,

    /// Masks root; missing per-camera folders are reported
    #[arg(long)]
    masks: Option<PathBuf>,

    /// Keep only these mask folders (repeatable)
    #[arg(long)]
    allow: Vec<String>,

    /// Pose convention written to the file
    #[arg(long, value_enum, default_value_t = ConventionArg::WorldToCamera)]
    convention: ConventionArg,
}

#[derive(clap::Args, Debug)]
struct SplitArgs {
    /// Pipeline config JSON; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of per-frame PLY files
    #[arg(long)]
    ply_dir: Option<PathBuf>,

    /// Root directory of per-camera mask folders
    #[arg(long)]
    masks_dir: Option<PathBuf>,

    /// Camera configuration JSON
    #[arg(long)]
    camera_config: Option<PathBuf>,

    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of frames, starting at 0
    #[arg(short, long)]
    frames: Option<usize>,

    /// Votes needed to call a splat dynamic
    #[arg(short, long)]
    threshold: Option<u32>,

    /// Worker threads
    #[arg(short, long)]
    jobs: Option<usize>,

    /// File name prefix of the input frames
    #[arg(long)]
    frame_prefix: Option<String>,

    /// Skip frames with missing masks instead of aborting
    #[arg(long)]
    skip_missing_masks: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ConventionArg {
    WorldToCamera,
    CameraToWorld,
}

impl From<ConventionArg> for PoseConvention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::WorldToCamera => PoseConvention::WorldToCamera,
            ConventionArg::CameraToWorld => PoseConvention::CameraToWorld,
        }
    }
}

fn main() {
    let args = Args::parse();

    app::init_logging(&app::LoggingConfig {
        level: args.log_level.clone(),
    });

    let result = match args.command {
        Command::Config(config) => app::run_config(app::ConfigRequest {
            sparse: config.sparse,
            output: config.output,
            masks: config.masks,
            allow: config.allow,
            convention: config.convention.into(),
        }),
        Command::Split(split) => app::run_split(app::SplitOverrides {
            config: split.config,
            ply_dir: split.ply_dir,
            masks_dir: split.masks_dir,
            camera_config: split.camera_config,
            output_dir: split.output_dir,
            frame_count: split.frames,
            threshold: split.threshold,
            jobs: split.jobs,
            frame_prefix: split.frame_prefix,
            skip_missing_masks: split.skip_missing_masks,
        }),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_split_flags() {
        let args = Args::try_parse_from([
            "splatsplit",
            "split",
            "--ply-dir",
            "ply",
            "--frames",
            "30",
            "-t",
            "3",
            "--skip-missing-masks",
        ])
        .unwrap();
        match args.command {
            Command::Split(split) => {
                assert_eq!(split.ply_dir, Some(PathBuf::from("ply")));
                assert_eq!(split.frames, Some(30));
                assert_eq!(split.threshold, Some(3));
                assert!(split.skip_missing_masks);
                assert!(split.config.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_parse_config_flags() {
        let args = Args::try_parse_from([
            "splatsplit",
            "--log-level",
            "debug",
            "config",
            "--sparse",
            "sparse/0",
            "-o",
            "cameras.json",
            "--allow",
            "001001",
            "--allow",
            "002001",
            "--convention",
            "camera-to-world",
        ])
        .unwrap();
        assert_eq!(args.log_level, "debug");
        match args.command {
            Command::Config(config) => {
                assert_eq!(config.allow, ["001001", "002001"]);
                assert_eq!(
                    PoseConvention::from(config.convention),
                    PoseConvention::CameraToWorld
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
