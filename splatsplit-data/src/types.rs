//! Core data types for splat point clouds.
//!
//! A [`Splat`] is stored exactly as it appears in a PLY body record, so a
//! slice of splats can be viewed as raw `f32` words without copying.

use glam::Vec3;

/// Number of `f32` words in one splat record.
pub const SPLAT_FLOATS: usize = 17;

/// Size in bytes of one splat record in the PLY body.
pub const SPLAT_STRIDE: usize = SPLAT_FLOATS * std::mem::size_of::<f32>();

/// One Gaussian splat, laid out in PLY field order.
///
/// Only `position` drives classification. Everything else is payload that is
/// carried through untouched.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq, Default)]
pub struct Splat {
    /// Center in world space (`x`, `y`, `z`).
    pub position: [f32; 3],
    /// `nx`, `ny`, `nz`.
    pub normal: [f32; 3],
    /// Zeroth-order SH color coefficients (`f_dc_0..2`).
    pub f_dc: [f32; 3],
    /// Opacity logit.
    pub opacity: f32,
    /// Log-scale per axis (`scale_0..2`).
    pub scale: [f32; 3],
    /// Rotation quaternion as stored (`rot_0..3`), not normalized here.
    pub rotation: [f32; 4],
}

impl Splat {
    /// Create a splat at `position` with zeroed payload and identity rotation.
    pub fn at(position: Vec3) -> Self {
        Self {
            position: position.to_array(),
            rotation: [1.0, 0.0, 0.0, 0.0],
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// An ordered set of splats loaded from one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    splats: Vec<Splat>,
}

impl PointSet {
    pub fn new(splats: Vec<Splat>) -> Self {
        Self { splats }
    }

    pub fn len(&self) -> usize {
        self.splats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splats.is_empty()
    }

    pub fn splats(&self) -> &[Splat] {
        &self.splats
    }

    pub fn into_splats(self) -> Vec<Splat> {
        self.splats
    }

    /// World-space centers, in set order.
    pub fn positions(&self) -> Vec<Vec3> {
        self.splats.iter().map(Splat::position).collect()
    }

    /// Keep the splats whose entry in `mask` is `true`, preserving order.
    ///
    /// # Panics
    ///
    /// Panics if `mask` is not the same length as the set.
    pub fn select(&self, mask: &[bool]) -> PointSet {
        assert_eq!(
            mask.len(),
            self.splats.len(),
            "selection mask length must match point count"
        );
        let splats = self
            .splats
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(splat, _)| *splat)
            .collect();
        PointSet { splats }
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &PointSet) -> PointSet {
        let mut splats = Vec::with_capacity(self.len() + other.len());
        splats.extend_from_slice(&self.splats);
        splats.extend_from_slice(&other.splats);
        PointSet { splats }
    }
}

impl From<Vec<Splat>> for PointSet {
    fn from(splats: Vec<Splat>) -> Self {
        Self::new(splats)
    }
}

impl FromIterator<Splat> for PointSet {
    fn from_iter<I: IntoIterator<Item = Splat>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
