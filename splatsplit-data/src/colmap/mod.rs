//! COLMAP sparse model ingestion.
//!
//! Reads `cameras` and `images` records in either the text or the binary
//! encoding. Both produce the same [`SparseModel`].

mod binary;
mod text;

use crate::camera::{Intrinsics, Pose, PoseConvention, rotation_from_wxyz};
use crate::error::CalibrationError;
use glam::DVec3;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub use binary::{read_cameras_binary, read_images_binary};
pub use text::{read_cameras_text, read_images_text};

/// Intrinsic parameterizations understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraModelKind {
    /// `f, cx, cy`
    SimplePinhole,
    /// `fx, fy, cx, cy`
    Pinhole,
    /// `f, cx, cy, k`
    SimpleRadial,
    /// `f, cx, cy, k1, k2`
    Radial,
}

impl CameraModelKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SIMPLE_PINHOLE" => Some(Self::SimplePinhole),
            "PINHOLE" => Some(Self::Pinhole),
            "SIMPLE_RADIAL" => Some(Self::SimpleRadial),
            "RADIAL" => Some(Self::Radial),
            _ => None,
        }
    }

    /// Map a COLMAP binary model id.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::SimplePinhole),
            1 => Some(Self::Pinhole),
            2 => Some(Self::SimpleRadial),
            3 => Some(Self::Radial),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SimplePinhole => "SIMPLE_PINHOLE",
            Self::Pinhole => "PINHOLE",
            Self::SimpleRadial => "SIMPLE_RADIAL",
            Self::Radial => "RADIAL",
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Self::SimplePinhole => 0,
            Self::Pinhole => 1,
            Self::SimpleRadial => 2,
            Self::Radial => 3,
        }
    }

    pub fn param_count(&self) -> usize {
        match self {
            Self::SimplePinhole => 3,
            Self::Pinhole => 4,
            Self::SimpleRadial => 4,
            Self::Radial => 5,
        }
    }

    /// Pinhole intrinsics from `params`; distortion terms are dropped.
    ///
    /// `params` must hold at least [`Self::param_count`] values.
    pub fn intrinsics(&self, params: &[f64]) -> Intrinsics {
        match self {
            Self::Pinhole => Intrinsics::new(params[0], params[1], params[2], params[3]),
            Self::SimplePinhole | Self::SimpleRadial | Self::Radial => {
                Intrinsics::new(params[0], params[0], params[1], params[2])
            }
        }
    }
}

/// One `cameras` record.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    pub camera_id: u32,
    pub kind: CameraModelKind,
    pub width: u32,
    pub height: u32,
    pub params: Vec<f64>,
}

impl ColmapCamera {
    pub fn intrinsics(&self) -> Intrinsics {
        self.kind.intrinsics(&self.params)
    }
}

/// One registered image from an `images` record.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    pub image_id: u32,
    /// Scalar-first quaternion `(qw, qx, qy, qz)`.
    pub qvec: [f64; 4],
    pub tvec: [f64; 3],
    pub camera_id: u32,
    pub name: String,
}

impl ColmapImage {
    /// COLMAP stores world-to-camera poses.
    pub fn pose(&self) -> Pose {
        Pose::new(
            rotation_from_wxyz(self.qvec),
            DVec3::from_array(self.tvec),
            PoseConvention::WorldToCamera,
        )
    }
}

/// Cameras and images of one reconstruction.
#[derive(Debug, Clone, Default)]
pub struct SparseModel {
    /// Directory the model was read from.
    pub source: PathBuf,
    pub cameras: BTreeMap<u32, ColmapCamera>,
    pub images: BTreeMap<u32, ColmapImage>,
}

/// Read a sparse model directory, preferring the binary files when present.
#[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn read_sparse_model(dir: impl AsRef<Path>) -> Result<SparseModel, CalibrationError> {
    let dir = dir.as_ref();
    let cameras_bin = dir.join("cameras.bin");
    let images_bin = dir.join("images.bin");

    let (cameras, images) = if cameras_bin.is_file() && images_bin.is_file() {
        info!("Reading binary COLMAP model");
        (
            read_cameras_binary(&cameras_bin)?,
            read_images_binary(&images_bin)?,
        )
    } else {
        info!("Reading text COLMAP model");
        (
            read_cameras_text(dir.join("cameras.txt"))?,
            read_images_text(dir.join("images.txt"))?,
        )
    };

    info!("Sparse model: {} cameras, {} images", cameras.len(), images.len());
    Ok(SparseModel {
        source: dir.to_path_buf(),
        cameras,
        images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_models_share_focal() {
        let k = CameraModelKind::SimpleRadial.intrinsics(&[800.0, 320.0, 240.0, 0.01]);
        assert_eq!(k, Intrinsics::new(800.0, 800.0, 320.0, 240.0));
    }

    #[test]
    fn test_pinhole_uses_independent_focals() {
        let k = CameraModelKind::Pinhole.intrinsics(&[800.0, 810.0, 320.0, 240.0]);
        assert_eq!(k, Intrinsics::new(800.0, 810.0, 320.0, 240.0));
    }

    #[test]
    fn test_name_and_id_agree() {
        for kind in [
            CameraModelKind::SimplePinhole,
            CameraModelKind::Pinhole,
            CameraModelKind::SimpleRadial,
            CameraModelKind::Radial,
        ] {
            assert_eq!(CameraModelKind::from_name(kind.name()), Some(kind));
            assert_eq!(CameraModelKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(CameraModelKind::from_name("OPENCV"), None);
        assert_eq!(CameraModelKind::from_id(4), None);
    }

    #[test]
    fn test_image_pose_is_world_to_camera() {
        let image = ColmapImage {
            image_id: 1,
            qvec: [1.0, 0.0, 0.0, 0.0],
            tvec: [0.0, 0.0, 4.0],
            camera_id: 1,
            name: "001001.png".into(),
        };
        let pose = image.pose();
        assert_eq!(pose.convention, PoseConvention::WorldToCamera);
        assert_eq!(pose.transform_point(DVec3::ZERO), DVec3::new(0.0, 0.0, 4.0));
    }
}
