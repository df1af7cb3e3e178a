//! Splatsplit Data Crate
//!
//! Data loading and file formats for splat point clouds and calibrated cameras.
//! This crate knows nothing about masks or classification; it parses, validates,
//! and writes the inputs and outputs of the pipeline.

pub mod camera;
pub mod camera_config;
pub mod colmap;
pub mod error;
pub mod ply;
pub mod types;

pub use camera::{CameraModel, CameraValidationError, Intrinsics, Pose, PoseConvention};
pub use camera_config::{BuildOptions, CameraConfig, CameraEntry, build_camera_config, load_cameras};
pub use colmap::{CameraModelKind, SparseModel, read_sparse_model};
pub use error::CalibrationError;
pub use ply::{PlyError, load_point_set, save_point_set};
pub use types::{PointSet, Splat};
