//! Static/dynamic classification by multi-view mask voting.
//!
//! Every camera projects every point and looks up the cell of its own mask
//! that the point lands in. Projected pixels are always rescaled from the
//! camera's calibration resolution into the mask's resolution before lookup;
//! when the two match the scale is 1. A point whose tally reaches the
//! threshold is dynamic, everything else is static.

use crate::geometry::Projector;
use crate::ingest::MaskImage;
use crate::voting::observer::{CameraVoteStats, PartitionCounts, TracingObserver, VoteObserver};
use glam::{DVec2, Vec3};
use splatsplit_data::{CameraModel, PointSet};
use std::sync::Arc;

/// Votes needed to call a point dynamic unless configured otherwise.
pub const DEFAULT_VOTE_THRESHOLD: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Got {masks} masks for {cameras} cameras")]
    CameraMaskMismatch { cameras: usize, masks: usize },
}

/// Per-point outcome for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub tally: Vec<u32>,
    pub dynamic_mask: Vec<bool>,
    pub static_mask: Vec<bool>,
}

impl Classification {
    fn from_tally(tally: Vec<u32>, threshold: u32) -> Self {
        let dynamic_mask: Vec<bool> = tally.iter().map(|t| *t >= threshold).collect();
        let static_mask = dynamic_mask.iter().map(|d| !d).collect();
        Self {
            tally,
            dynamic_mask,
            static_mask,
        }
    }

    pub fn len(&self) -> usize {
        self.tally.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    pub fn counts(&self) -> PartitionCounts {
        let dynamic_count = self.dynamic_mask.iter().filter(|d| **d).count();
        PartitionCounts {
            static_count: self.len() - dynamic_count,
            dynamic_count,
        }
    }

    /// Splats classified static, in input order.
    pub fn static_points(&self, points: &PointSet) -> PointSet {
        points.select(&self.static_mask)
    }

    /// Splats classified dynamic, in input order.
    pub fn dynamic_points(&self, points: &PointSet) -> PointSet {
        points.select(&self.dynamic_mask)
    }
}

/// Map a native-resolution pixel to a `(row, col)` cell of `mask`.
///
/// Returns `None` for non-finite pixels and for cells outside the mask.
pub fn mask_cell(pixel: DVec2, camera: &CameraModel, mask: &MaskImage) -> Option<(u32, u32)> {
    // u * (mask_w / cam_w), multiplied first so exact ratios stay exact
    let u = (pixel.x * mask.width() as f64 / camera.width() as f64).floor();
    let v = (pixel.y * mask.height() as f64 / camera.height() as f64).floor();
    if !u.is_finite() || !v.is_finite() {
        return None;
    }
    if u < 0.0 || v < 0.0 || u >= mask.width() as f64 || v >= mask.height() as f64 {
        return None;
    }
    Some((v as u32, u as u32))
}

/// Add one camera's votes to `tally`.
///
/// Returns `(in_view, votes)`: how many points landed inside the mask in
/// front of the camera, and how many of those hit an occupied cell.
///
/// # Panics
///
/// Panics if `tally` and `points` differ in length.
pub fn cast_votes(
    camera: &CameraModel,
    mask: &MaskImage,
    points: &[Vec3],
    tally: &mut [u32],
) -> (usize, usize) {
    assert_eq!(points.len(), tally.len(), "tally length must match point count");
    let projection = Projector::new(camera).project(points);

    let mut in_view = 0;
    let mut votes = 0;
    for ((pixel, depth), count) in projection
        .pixels
        .iter()
        .zip(&projection.depths)
        .zip(tally.iter_mut())
    {
        if !(*depth > 0.0) {
            continue;
        }
        let Some((row, col)) = mask_cell(*pixel, camera, mask) else {
            continue;
        };
        in_view += 1;
        if mask.is_occupied(row, col) {
            *count += 1;
            votes += 1;
        }
    }
    (in_view, votes)
}

/// Classifies frames against a fixed threshold.
#[derive(Clone)]
pub struct VoteClassifier {
    threshold: u32,
    observer: Arc<dyn VoteObserver>,
}

impl std::fmt::Debug for VoteClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteClassifier")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl Default for VoteClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_VOTE_THRESHOLD)
    }
}

impl VoteClassifier {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn VoteObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Classify `points` for `frame`. `masks[i]` belongs to `cameras[i]`.
    pub fn classify(
        &self,
        frame: usize,
        points: &[Vec3],
        cameras: &[CameraModel],
        masks: &[MaskImage],
    ) -> Result<Classification, ClassifyError> {
        if cameras.len() != masks.len() {
            return Err(ClassifyError::CameraMaskMismatch {
                cameras: cameras.len(),
                masks: masks.len(),
            });
        }

        let mut tally = vec![0u32; points.len()];
        for (camera, mask) in cameras.iter().zip(masks) {
            let (in_view, votes) = cast_votes(camera, mask, points, &mut tally);
            let stats = CameraVoteStats {
                in_view,
                votes,
                max_tally: tally.iter().copied().max().unwrap_or(0),
                at_threshold: tally.iter().filter(|t| **t >= self.threshold).count(),
            };
            self.observer.camera_voted(frame, camera, &stats);
        }

        let classification = Classification::from_tally(tally, self.threshold);
        self.observer
            .frame_classified(frame, &classification.counts());
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DMat3, DVec3};
    use splatsplit_data::{Intrinsics, Pose, PoseConvention};
    use std::sync::Mutex;

    fn camera(index: usize, size: (u32, u32), k: Intrinsics, pose: Pose) -> CameraModel {
        CameraModel::new(index, format!("{index}.png"), format!("{index:06}"), size, k.matrix(), pose)
            .unwrap()
    }

    /// A 4x4 camera whose pixel grid matches a 4x4 mask one-to-one.
    fn small_camera(index: usize) -> CameraModel {
        camera(
            index,
            (4, 4),
            Intrinsics::new(1.0, 1.0, 0.0, 0.0),
            Pose::identity(PoseConvention::WorldToCamera),
        )
    }

    /// World point that `small_camera` projects to `(u, v)` at depth 1.
    fn at_pixel(u: f32, v: f32) -> Vec3 {
        Vec3::new(u, v, 1.0)
    }

    #[test]
    fn test_single_cell_vote() {
        let cam = small_camera(0);
        let mask = MaskImage::from_fn(4, 4, |row, col| u8::from(row == 2 && col == 1));
        let points = [at_pixel(1.5, 2.5), at_pixel(2.5, 1.5)];
        let mut tally = vec![0; 2];

        let (in_view, votes) = cast_votes(&cam, &mask, &points, &mut tally);
        assert_eq!(tally, [1, 0]);
        assert_eq!((in_view, votes), (2, 1));
    }

    #[test]
    fn test_resolution_scaling_hits_mask_center() {
        let cam = camera(
            0,
            (3840, 2160),
            Intrinsics::new(1000.0, 1000.0, 1920.0, 1080.0),
            Pose::identity(PoseConvention::WorldToCamera),
        );
        let mask = MaskImage::filled(640, 384, 0);
        let (pixel, depth) = Projector::new(&cam).project_point(DVec3::new(0.0, 0.0, 5.0));
        assert_eq!(pixel, DVec2::new(1920.0, 1080.0));
        assert_eq!(depth, 5.0);
        assert_eq!(mask_cell(pixel, &cam, &mask), Some((192, 320)));

        // Only the center cell is set: without scaling the point would miss.
        let mask = MaskImage::from_fn(640, 384, |row, col| u8::from(row == 192 && col == 320));
        let mut tally = vec![0];
        cast_votes(&cam, &mask, &[Vec3::new(0.0, 0.0, 5.0)], &mut tally);
        assert_eq!(tally, [1]);
    }

    #[test]
    fn test_out_of_bounds_cells() {
        let cam = small_camera(0);
        let mask = MaskImage::filled(4, 4, 1);
        assert_eq!(mask_cell(DVec2::new(-0.01, 1.0), &cam, &mask), None);
        assert_eq!(mask_cell(DVec2::new(1.0, 4.0), &cam, &mask), None);
        assert_eq!(mask_cell(DVec2::new(3.99, 3.99), &cam, &mask), Some((3, 3)));
        assert_eq!(mask_cell(DVec2::new(f64::NAN, 0.0), &cam, &mask), None);
    }

    #[test]
    fn test_points_behind_camera_never_vote() {
        let cam = small_camera(0);
        let mask = MaskImage::filled(4, 4, 255);
        // (-1, -1, -1) projects to (1, 1), in bounds, but sits behind the camera.
        let points = [Vec3::new(-1.0, -1.0, -1.0), Vec3::ZERO, at_pixel(1.0, 1.0)];
        let mut tally = vec![0; 3];
        let (in_view, _) = cast_votes(&cam, &mask, &points, &mut tally);
        assert_eq!(tally, [0, 0, 1]);
        assert_eq!(in_view, 1);
    }

    #[test]
    fn test_static_and_dynamic_are_complements() {
        let cams = [small_camera(0), small_camera(1)];
        let masks = [
            MaskImage::from_fn(4, 4, |_, col| u8::from(col < 2)),
            MaskImage::from_fn(4, 4, |row, _| u8::from(row < 2)),
        ];
        let points: Vec<Vec3> = (0..4)
            .flat_map(|v| (0..4).map(move |u| at_pixel(u as f32 + 0.5, v as f32 + 0.5)))
            .collect();

        let result = VoteClassifier::new(2).classify(0, &points, &cams, &masks).unwrap();
        for i in 0..points.len() {
            assert_ne!(result.static_mask[i], result.dynamic_mask[i]);
        }
        let counts = result.counts();
        assert_eq!(counts.dynamic_count, 4);
        assert_eq!(counts.total(), 16);
    }

    #[test]
    fn test_camera_order_does_not_matter() {
        let far = camera(
            1,
            (8, 8),
            Intrinsics::new(2.0, 2.0, 4.0, 4.0),
            Pose::new(DMat3::IDENTITY, DVec3::new(0.0, 0.0, 1.0), PoseConvention::WorldToCamera),
        );
        let cams = [small_camera(0), far];
        let masks = [
            MaskImage::from_fn(4, 4, |row, col| u8::from((row + col) % 2 == 0)),
            MaskImage::from_fn(8, 8, |row, _| u8::from(row >= 4)),
        ];
        let points: Vec<Vec3> = (0..20)
            .map(|i| Vec3::new((i % 5) as f32 * 0.7, (i / 5) as f32 * 0.9, 1.0 + (i % 3) as f32))
            .collect();

        let classifier = VoteClassifier::new(1);
        let forward = classifier.classify(0, &points, &cams, &masks).unwrap();
        let reversed_cams = [cams[1].clone(), cams[0].clone()];
        let reversed_masks = [masks[1].clone(), masks[0].clone()];
        let backward = classifier
            .classify(0, &points, &reversed_cams, &reversed_masks)
            .unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_single_camera_all_ones_threshold_one() {
        let cams = [small_camera(0)];
        let masks = [MaskImage::filled(4, 4, 1)];
        let points = [at_pixel(0.5, 0.5), at_pixel(2.0, 3.0), at_pixel(3.5, 1.0)];

        let result = VoteClassifier::new(1).classify(0, &points, &cams, &masks).unwrap();
        assert_eq!(result.dynamic_mask, [true, true, true]);
        assert_eq!(result.static_mask, [false, false, false]);
    }

    #[test]
    fn test_one_vote_below_threshold_stays_static() {
        let cams = [small_camera(0), small_camera(1)];
        let masks = [MaskImage::filled(4, 4, 1), MaskImage::filled(4, 4, 0)];
        let points = [at_pixel(1.0, 1.0)];

        let result = VoteClassifier::default().classify(0, &points, &cams, &masks).unwrap();
        assert_eq!(result.tally, [1]);
        assert_eq!(result.static_mask, [true]);
        assert_eq!(result.dynamic_mask, [false]);
    }

    #[test]
    fn test_mask_count_mismatch() {
        let err = VoteClassifier::default()
            .classify(0, &[Vec3::ZERO], &[small_camera(0)], &[])
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::CameraMaskMismatch { cameras: 1, masks: 0 }
        ));
    }

    #[test]
    fn test_split_preserves_order() {
        let cams = [small_camera(0)];
        let masks = [MaskImage::from_fn(4, 4, |_, col| u8::from(col == 0))];
        let points: PointSet = [at_pixel(0.5, 0.5), at_pixel(2.5, 0.5), at_pixel(0.5, 3.5)]
            .into_iter()
            .map(splatsplit_data::Splat::at)
            .collect();

        let result = VoteClassifier::new(1)
            .classify(0, &points.positions(), &cams, &masks)
            .unwrap();
        let dynamic = result.dynamic_points(&points);
        let stat = result.static_points(&points);
        assert_eq!(dynamic.positions(), [at_pixel(0.5, 0.5), at_pixel(0.5, 3.5)]);
        assert_eq!(stat.positions(), [at_pixel(2.5, 0.5)]);
    }

    #[derive(Default)]
    struct Recorder {
        cameras: Mutex<Vec<(usize, String, CameraVoteStats)>>,
        frames: Mutex<Vec<(usize, PartitionCounts)>>,
    }

    impl VoteObserver for Recorder {
        fn camera_voted(&self, frame: usize, camera: &CameraModel, stats: &CameraVoteStats) {
            self.cameras
                .lock()
                .unwrap()
                .push((frame, camera.mask_folder().to_string(), *stats));
        }

        fn frame_classified(&self, frame: usize, counts: &PartitionCounts) {
            self.frames.lock().unwrap().push((frame, *counts));
        }
    }

    #[test]
    fn test_observer_sees_every_camera() {
        let recorder = Arc::new(Recorder::default());
        let classifier = VoteClassifier::new(2).with_observer(recorder.clone());
        let cams = [small_camera(0), small_camera(1)];
        let masks = [MaskImage::filled(4, 4, 1), MaskImage::filled(4, 4, 1)];

        classifier
            .classify(7, &[at_pixel(1.0, 1.0), at_pixel(9.0, 9.0)], &cams, &masks)
            .unwrap();

        let cameras = recorder.cameras.lock().unwrap();
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0].1, "000000");
        assert_eq!(cameras[0].2.votes, 1);
        assert_eq!(cameras[0].2.at_threshold, 0);
        assert_eq!(cameras[1].2.max_tally, 2);
        assert_eq!(cameras[1].2.at_threshold, 1);

        let frames = recorder.frames.lock().unwrap();
        assert_eq!(
            *frames,
            [(
                7,
                PartitionCounts {
                    static_count: 1,
                    dynamic_count: 1
                }
            )]
        );
    }
}
