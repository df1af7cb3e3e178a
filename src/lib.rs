//! Splatsplit
//!
//! Per-frame static/dynamic classification of Gaussian splat clouds from
//! calibrated multi-view motion masks.
//!
//! - [`data`]: splat clouds, PLY files, COLMAP models and camera configuration
//! - [`classify`]: mask ingestion, projection, voting and the batch pipeline

pub use splatsplit_classify as classify;
pub use splatsplit_data as data;
