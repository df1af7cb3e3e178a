//! Calibrated camera model with an explicit pose convention.
//!
//! Every rotation/translation pair is tagged with the direction of the rigid
//! transform it encodes. Code that needs world-to-camera coordinates goes
//! through [`Pose::to_world_to_camera`] and never inverts a pose by hand.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// Direction of a stored rigid transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseConvention {
    /// `p_cam = R * p_world + T` (COLMAP's native convention).
    WorldToCamera,
    /// `p_world = R * p_cam + T`.
    CameraToWorld,
}

impl std::fmt::Display for PoseConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoseConvention::WorldToCamera => f.write_str("world_to_camera"),
            PoseConvention::CameraToWorld => f.write_str("camera_to_world"),
        }
    }
}

/// A rigid transform tagged with its convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: DMat3,
    pub translation: DVec3,
    pub convention: PoseConvention,
}

impl Pose {
    pub fn new(rotation: DMat3, translation: DVec3, convention: PoseConvention) -> Self {
        Self {
            rotation,
            translation,
            convention,
        }
    }

    pub fn identity(convention: PoseConvention) -> Self {
        Self::new(DMat3::IDENTITY, DVec3::ZERO, convention)
    }

    /// The same transform expressed in the opposite direction.
    ///
    /// `R' = Rᵀ`, `T' = -Rᵀ·T`, convention flipped.
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.transpose();
        let translation = -(rotation * self.translation);
        let convention = match self.convention {
            PoseConvention::WorldToCamera => PoseConvention::CameraToWorld,
            PoseConvention::CameraToWorld => PoseConvention::WorldToCamera,
        };
        Pose::new(rotation, translation, convention)
    }

    /// Resolve to world-to-camera, inverting only when stored camera-to-world.
    pub fn to_world_to_camera(&self) -> Pose {
        match self.convention {
            PoseConvention::WorldToCamera => *self,
            PoseConvention::CameraToWorld => self.inverse(),
        }
    }

    /// Resolve to camera-to-world, inverting only when stored world-to-camera.
    pub fn to_camera_to_world(&self) -> Pose {
        match self.convention {
            PoseConvention::CameraToWorld => *self,
            PoseConvention::WorldToCamera => self.inverse(),
        }
    }

    /// Express this pose in `convention`.
    pub fn in_convention(&self, convention: PoseConvention) -> Pose {
        match convention {
            PoseConvention::WorldToCamera => self.to_world_to_camera(),
            PoseConvention::CameraToWorld => self.to_camera_to_world(),
        }
    }

    /// Apply the transform as stored: `R·p + T`.
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.rotation * p + self.translation
    }
}

/// Rotation matrix from a unit quaternion given scalar-first `(w, x, y, z)`.
pub fn rotation_from_wxyz(q: [f64; 4]) -> DMat3 {
    let [w, x, y, z] = q;
    mat3_from_rows([
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ],
        [
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ],
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ])
}

/// Build a matrix from row-major nested arrays (the on-disk layout).
pub fn mat3_from_rows(rows: [[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(&rows).transpose()
}

/// Row-major nested arrays from a matrix.
pub fn mat3_to_rows(m: &DMat3) -> [[f64; 3]; 3] {
    m.transpose().to_cols_array_2d()
}

/// Pinhole intrinsics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`
    pub fn matrix(&self) -> DMat3 {
        mat3_from_rows([
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ])
    }
}

/// Reasons a camera fails validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CameraValidationError {
    #[error("rotation is not orthonormal (max |R·Rᵀ - I| = {0:.3e})")]
    RotationNotOrthonormal(f64),
    #[error("intrinsic matrix is not upper-triangular")]
    IntrinsicsNotUpperTriangular,
    #[error("focal lengths must be positive (fx = {fx}, fy = {fy})")]
    NonPositiveFocal { fx: f64, fy: f64 },
    #[error("intrinsic K[2][2] must be positive, got {0}")]
    NonPositiveScale(f64),
    #[error("image size must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
}

const ORTHONORMAL_TOLERANCE: f64 = 1e-4;

/// A fully calibrated camera, immutable once built.
///
/// Fields are only reachable through accessors so a validated camera cannot
/// be edited into an invalid one.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    index: usize,
    image_name: String,
    mask_folder: String,
    width: u32,
    height: u32,
    intrinsics: DMat3,
    pose: Pose,
}

impl CameraModel {
    /// Build and validate a camera.
    pub fn new(
        index: usize,
        image_name: impl Into<String>,
        mask_folder: impl Into<String>,
        (width, height): (u32, u32),
        intrinsics: DMat3,
        pose: Pose,
    ) -> Result<Self, CameraValidationError> {
        let camera = Self {
            index,
            image_name: image_name.into(),
            mask_folder: mask_folder.into(),
            width,
            height,
            intrinsics,
            pose,
        };
        camera.validate()?;
        Ok(camera)
    }

    pub fn validate(&self) -> Result<(), CameraValidationError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraValidationError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }

        let k = mat3_to_rows(&self.intrinsics);
        if k[1][0] != 0.0 || k[2][0] != 0.0 || k[2][1] != 0.0 {
            return Err(CameraValidationError::IntrinsicsNotUpperTriangular);
        }
        if !(k[0][0] > 0.0 && k[1][1] > 0.0) {
            return Err(CameraValidationError::NonPositiveFocal {
                fx: k[0][0],
                fy: k[1][1],
            });
        }
        if !(k[2][2] > 0.0) {
            return Err(CameraValidationError::NonPositiveScale(k[2][2]));
        }

        let r = self.pose.rotation;
        let residual = (r * r.transpose() - DMat3::IDENTITY).to_cols_array();
        // NaN entries fail the comparison, so they are rejected too
        if !residual.iter().all(|v| v.abs() < ORTHONORMAL_TOLERANCE) {
            let deviation = residual.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
            return Err(CameraValidationError::RotationNotOrthonormal(deviation));
        }
        Ok(())
    }

    /// The same camera at a different position in its camera set.
    pub fn with_index(self, index: usize) -> Self {
        Self { index, ..self }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Key of the directory holding this camera's per-frame masks.
    pub fn mask_folder(&self) -> &str {
        &self.mask_folder
    }

    /// Native resolution at which the calibration was computed.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn intrinsics(&self) -> &DMat3 {
        &self.intrinsics
    }

    /// The pose as stored, in its own convention.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// The single place a camera's pose is resolved for projection.
    pub fn world_to_camera(&self) -> Pose {
        self.pose.to_world_to_camera()
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;

    fn quat_matches_glam(q: [f64; 4]) -> bool {
        let glam_rot = DMat3::from_quat(DQuat::from_xyzw(q[1], q[2], q[3], q[0]));
        rotation_from_wxyz(q).abs_diff_eq(glam_rot, 1e-12)
    }

    fn rotation_about_y(angle: f64) -> DMat3 {
        DMat3::from_rotation_y(angle)
    }

    #[test]
    fn test_identity_quaternion() {
        assert_eq!(rotation_from_wxyz([1.0, 0.0, 0.0, 0.0]), DMat3::IDENTITY);
    }

    #[test]
    fn test_quaternion_formula_matches_glam() {
        let half = (0.3f64).to_radians();
        let norm = (0.2f64 * 0.2 + 0.5 * 0.5 + 0.8 * 0.8).sqrt();
        let q = [
            half.cos(),
            half.sin() * 0.2 / norm,
            half.sin() * 0.5 / norm,
            half.sin() * 0.8 / norm,
        ];
        assert!(quat_matches_glam(q));
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let r = rotation_from_wxyz([s, 0.0, 0.0, s]);
        let rotated = r * DVec3::X;
        assert!(rotated.abs_diff_eq(DVec3::Y, 1e-12));
    }

    #[test]
    fn test_rows_are_not_transposed() {
        let m = mat3_from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        // first row dotted with x
        assert_eq!((m * DVec3::X).x, 1.0);
        assert_eq!((m * DVec3::Y).x, 2.0);
        assert_eq!(mat3_to_rows(&m)[1], [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_inverse_round_trips_point() {
        let pose = Pose::new(
            rotation_about_y(0.7),
            DVec3::new(1.0, -2.0, 3.0),
            PoseConvention::CameraToWorld,
        );
        let p = DVec3::new(0.3, 0.4, 5.0);
        let there = pose.transform_point(p);
        let back = pose.inverse().transform_point(there);
        assert!(back.abs_diff_eq(p, 1e-12));
        assert_eq!(pose.inverse().convention, PoseConvention::WorldToCamera);
    }

    #[test]
    fn test_world_to_camera_is_noop_for_w2c() {
        let pose = Pose::new(
            rotation_about_y(0.2),
            DVec3::new(0.0, 1.0, 0.0),
            PoseConvention::WorldToCamera,
        );
        assert_eq!(pose.to_world_to_camera(), pose);
        assert_eq!(
            pose.to_camera_to_world().to_world_to_camera().translation,
            pose.translation
        );
    }

    #[test]
    fn test_c2w_camera_center_maps_to_origin() {
        // Camera at (0, 0, -5) looking down +Z in world.
        let pose = Pose::new(
            DMat3::IDENTITY,
            DVec3::new(0.0, 0.0, -5.0),
            PoseConvention::CameraToWorld,
        );
        let w2c = pose.to_world_to_camera();
        assert!(w2c.transform_point(DVec3::new(0.0, 0.0, -5.0)).abs_diff_eq(DVec3::ZERO, 1e-12));
        assert_eq!(w2c.transform_point(DVec3::ZERO).z, 5.0);
    }

    #[test]
    fn test_validate_rejects_bad_rotation() {
        let pose = Pose::new(
            DMat3::from_diagonal(DVec3::new(1.0, 2.0, 1.0)),
            DVec3::ZERO,
            PoseConvention::WorldToCamera,
        );
        let err = CameraModel::new(
            0,
            "a.png",
            "a",
            (640, 480),
            Intrinsics::new(500.0, 500.0, 320.0, 240.0).matrix(),
            pose,
        )
        .unwrap_err();
        assert!(matches!(err, CameraValidationError::RotationNotOrthonormal(_)));
    }

    #[test]
    fn test_validate_rejects_lower_triangular_intrinsics() {
        let k = mat3_from_rows([[500.0, 0.0, 320.0], [1.0, 500.0, 240.0], [0.0, 0.0, 1.0]]);
        let err = CameraModel::new(
            0,
            "a.png",
            "a",
            (640, 480),
            k,
            Pose::identity(PoseConvention::WorldToCamera),
        )
        .unwrap_err();
        assert_eq!(err, CameraValidationError::IntrinsicsNotUpperTriangular);
    }

    #[test]
    fn test_validate_rejects_negative_focal() {
        let err = CameraModel::new(
            0,
            "a.png",
            "a",
            (640, 480),
            Intrinsics::new(-1.0, 500.0, 320.0, 240.0).matrix(),
            Pose::identity(PoseConvention::WorldToCamera),
        )
        .unwrap_err();
        assert!(matches!(err, CameraValidationError::NonPositiveFocal { .. }));
    }

    #[test]
    fn test_reindexing_keeps_calibration() {
        let camera = CameraModel::new(
            3,
            "cam/a.png",
            "cam/a",
            (640, 480),
            Intrinsics::new(500.0, 500.0, 320.0, 240.0).matrix(),
            Pose::new(rotation_about_y(0.4), DVec3::X, PoseConvention::CameraToWorld),
        )
        .unwrap();
        let moved = camera.clone().with_index(0);
        assert_eq!(moved.index(), 0);
        assert_eq!(moved.mask_folder(), "cam/a");
        assert_eq!(moved.pose(), camera.pose());
        assert_eq!(moved.intrinsics(), camera.intrinsics());
        assert!(moved.validate().is_ok());
    }

    #[test]
    fn test_convention_serde_names() {
        let json = serde_json::to_string(&PoseConvention::CameraToWorld).unwrap();
        assert_eq!(json, "\"camera_to_world\"");
        assert_eq!(PoseConvention::WorldToCamera.to_string(), "world_to_camera");
    }
}
