//! World-to-pixel projection through a calibrated pinhole camera.
//!
//! The projector is a pure transform. It reports every point's pixel and
//! depth, including points behind the camera; deciding which of those count
//! is up to the caller.

use glam::{DMat3, DVec2, DVec3, Vec3};
use splatsplit_data::{CameraModel, Pose};

/// Pixel coordinates and camera-space depths, one per input point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// `(u, v)` in the camera's native pixel grid. Meaningless when the
    /// matching depth is not positive.
    pub pixels: Vec<DVec2>,
    pub depths: Vec<f64>,
}

impl Projection {
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

/// Projects world points into one camera.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    intrinsics: DMat3,
    world_to_camera: Pose,
}

impl Projector {
    pub fn new(camera: &CameraModel) -> Self {
        Self {
            intrinsics: *camera.intrinsics(),
            world_to_camera: camera.world_to_camera(),
        }
    }

    /// Camera-space position of a world point.
    pub fn to_camera(&self, world: DVec3) -> DVec3 {
        self.world_to_camera.transform_point(world)
    }

    /// Pixel and depth of a single world point.
    pub fn project_point(&self, world: DVec3) -> (DVec2, f64) {
        let cam = self.to_camera(world);
        let img = self.intrinsics * cam;
        (DVec2::new(img.x / img.z, img.y / img.z), cam.z)
    }

    pub fn project(&self, points: &[Vec3]) -> Projection {
        let (pixels, depths) = points
            .iter()
            .map(|p| self.project_point(p.as_dvec3()))
            .unzip();
        Projection { pixels, depths }
    }
}
