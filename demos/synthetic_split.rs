//! Synthetic end-to-end split
//!
//! Builds a small scene on disk: a static ground grid and a blob that moves in
//! a circle above it, seen by four cameras. Masks are rendered at half the
//! camera resolution by projecting the blob. The full pipeline then splits
//! every frame and the resulting file counts are reported.
//!
//! Usage:
//!   cargo run --example synthetic_split -- [output_dir]

use glam::{DMat3, DVec3, Vec3};
use image::{GrayImage, Luma};
use splatsplit_classify::{DirectoryMasks, FrameOutcome, Pipeline, PipelineConfig, Projector};
use splatsplit_data::{
    CameraConfig, CameraEntry, CameraModel, Intrinsics, PointSet, Pose, PoseConvention, Splat,
    save_point_set,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const FRAMES: usize = 8;
const CAMERA_SIZE: (u32, u32) = (640, 480);
const MASK_SIZE: (u32, u32) = (320, 240);

fn cameras() -> Result<Vec<CameraModel>, Box<dyn Error>> {
    let intrinsics = Intrinsics::new(500.0, 500.0, 320.0, 240.0).matrix();
    (0..4)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::FRAC_PI_2 + 0.3;
            // Camera +z points from its center toward the origin.
            let rotation = DMat3::from_rotation_y(angle);
            let center = rotation * DVec3::new(0.0, -1.0, -6.0);
            let pose = Pose::new(rotation, center, PoseConvention::CameraToWorld);
            let folder = format!("{:03}001", i + 1);
            CameraModel::new(
                i,
                format!("{folder}.png"),
                folder,
                CAMERA_SIZE,
                intrinsics,
                pose,
            )
            .map_err(Into::into)
        })
        .collect()
}

fn ground() -> Vec<Splat> {
    let mut splats = Vec::new();
    for ix in -10..=10 {
        for iz in -10..=10 {
            let mut splat = Splat::at(Vec3::new(ix as f32 * 0.2, 1.0, iz as f32 * 0.2));
            splat.f_dc = [0.2, 0.5, 0.2];
            splat.opacity = 2.0;
            splats.push(splat);
        }
    }
    splats
}

fn blob(frame: usize) -> Vec<Splat> {
    let t = frame as f32 / FRAMES as f32 * std::f32::consts::TAU;
    let center = Vec3::new(t.cos(), -0.5, t.sin());
    let mut splats = Vec::new();
    for i in 0..27 {
        let offset = Vec3::new((i % 3) as f32, ((i / 3) % 3) as f32, (i / 9) as f32) - Vec3::ONE;
        let mut splat = Splat::at(center + offset * 0.1);
        splat.f_dc = [0.9, 0.1, 0.1];
        splat.opacity = 3.0;
        splats.push(splat);
    }
    splats
}

/// Mark a small square around every blob splat's projection.
fn render_mask(camera: &CameraModel, points: &[Splat]) -> GrayImage {
    let (mw, mh) = MASK_SIZE;
    let mut mask = GrayImage::new(mw, mh);
    let projector = Projector::new(camera);
    for splat in points {
        let (pixel, depth) = projector.project_point(splat.position().as_dvec3());
        if depth <= 0.0 {
            continue;
        }
        let u = (pixel.x * mw as f64 / camera.width() as f64).floor() as i64;
        let v = (pixel.y * mh as f64 / camera.height() as f64).floor() as i64;
        for dv in -3..=3 {
            for du in -3..=3 {
                let (x, y) = (u + du, v + dv);
                if x >= 0 && y >= 0 && x < mw as i64 && y < mh as i64 {
                    mask.put_pixel(x as u32, y as u32, Luma([255]));
                }
            }
        }
    }
    mask
}

fn build_scene(root: &Path, cameras: &[CameraModel]) -> Result<PipelineConfig, Box<dyn Error>> {
    let ply_dir = root.join("ply");
    let masks_dir = root.join("masks");
    std::fs::create_dir_all(&ply_dir)?;

    for frame in 0..FRAMES {
        // Frame 3 is left out to show skip handling.
        if frame == 3 {
            continue;
        }
        let moving = blob(frame);
        let points: PointSet = ground().into_iter().chain(moving.iter().copied()).collect();
        save_point_set(ply_dir.join(format!("time_{:05}.ply", frame)), &points)?;

        for camera in cameras {
            let dir = masks_dir.join(camera.mask_folder());
            std::fs::create_dir_all(&dir)?;
            render_mask(camera, &moving).save(dir.join(format!("{:06}.png", frame)))?;
        }
    }

    let camera_config = root.join("cameras.json");
    CameraConfig {
        cameras: cameras.iter().map(CameraEntry::from_model).collect(),
    }
    .save(&camera_config)?;

    Ok(PipelineConfig {
        ply_dir,
        masks_dir,
        camera_config,
        output_dir: root.join("out"),
        frame_count: FRAMES,
        ..Default::default()
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Keep the temp dir alive for the whole run when no output dir is given.
    let temp = tempfile::tempdir()?;
    let root: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| temp.path().to_path_buf());
    info!("Building synthetic scene in {}", root.display());

    let cameras = cameras()?;
    let config = build_scene(&root, &cameras)?;
    let masks = Arc::new(DirectoryMasks::new(&config.masks_dir));
    let summary = Pipeline::new(config, cameras, masks)?.run()?;

    info!(
        "Static master: {} splats at {}",
        summary.static_master_count,
        summary.static_master_path.display()
    );
    for outcome in &summary.frames {
        match outcome {
            FrameOutcome::Written(report) => info!(
                "frame {}: {} static, {} dynamic, final {}",
                report.frame, report.static_count, report.dynamic_count, report.final_count
            ),
            FrameOutcome::Skipped { frame, reason } => info!("frame {}: skipped ({})", frame, reason),
        }
    }
    Ok(())
}
