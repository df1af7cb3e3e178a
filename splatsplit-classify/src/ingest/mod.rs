//! Inputs consumed per frame
//!
//! - Splat files, one per frame
//! - Occupancy masks, one per camera per frame

pub mod frames;
pub mod mask;

pub use frames::FrameFiles;
pub use mask::{DirectoryMasks, MaskError, MaskImage, MaskSource, MemoryMasks, load_frame_masks};
