//! Camera configuration file: the normalized per-camera records consumed by
//! the classifier.
//!
//! Matrices are stored row-major. Every entry states the convention of its
//! `R`/`T` pair, so a file can never be read with the wrong direction.

use crate::camera::{CameraModel, Pose, PoseConvention, mat3_from_rows, mat3_to_rows};
use crate::colmap::SparseModel;
use crate::error::CalibrationError;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One camera record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEntry {
    pub cam_index: usize,
    pub image_name: String,
    pub mask_folder: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "K")]
    pub k: [[f64; 3]; 3],
    #[serde(rename = "R")]
    pub r: [[f64; 3]; 3],
    #[serde(rename = "T")]
    pub t: [f64; 3],
    pub convention: PoseConvention,
}

impl CameraEntry {
    pub fn from_model(camera: &CameraModel) -> Self {
        let pose = camera.pose();
        Self {
            cam_index: camera.index(),
            image_name: camera.image_name().to_string(),
            mask_folder: camera.mask_folder().to_string(),
            width: camera.width(),
            height: camera.height(),
            k: mat3_to_rows(camera.intrinsics()),
            r: mat3_to_rows(&pose.rotation),
            t: pose.translation.to_array(),
            convention: pose.convention,
        }
    }

    /// Build and validate the camera this entry describes.
    pub fn to_model(&self) -> Result<CameraModel, CalibrationError> {
        let pose = Pose::new(
            mat3_from_rows(self.r),
            DVec3::from_array(self.t),
            self.convention,
        );
        CameraModel::new(
            self.cam_index,
            self.image_name.clone(),
            self.mask_folder.clone(),
            (self.width, self.height),
            mat3_from_rows(self.k),
            pose,
        )
        .map_err(|source| CalibrationError::InvalidCamera {
            name: self.image_name.clone(),
            source,
        })
    }
}

/// The whole configuration file: `{"cameras": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub cameras: Vec<CameraEntry>,
}

impl CameraConfig {
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CalibrationError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| CalibrationError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CalibrationError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CalibrationError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| {
            CalibrationError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| CalibrationError::io(path, e))
    }

    /// Validated camera models, in file order.
    pub fn camera_models(&self) -> Result<Vec<CameraModel>, CalibrationError> {
        self.cameras.iter().map(CameraEntry::to_model).collect()
    }
}

/// Load and validate every camera in a configuration file.
pub fn load_cameras(path: impl AsRef<Path>) -> Result<Vec<CameraModel>, CalibrationError> {
    let cameras = CameraConfig::load(path)?.camera_models()?;
    info!("Loaded {} cameras", cameras.len());
    Ok(cameras)
}

/// Options for [`build_camera_config`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// When set, warn about mask folders missing under this directory.
    pub masks_root: Option<PathBuf>,
    /// When set, only images whose mask folder is listed are kept.
    pub allowed_folders: Option<BTreeSet<String>>,
    /// Convention written to the file.
    pub convention: PoseConvention,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            masks_root: None,
            allowed_folders: None,
            convention: PoseConvention::WorldToCamera,
        }
    }
}

/// Turn a sparse model into a camera configuration, one entry per image,
/// sorted by mask folder.
#[tracing::instrument(skip_all, fields(source = %model.source.display()))]
pub fn build_camera_config(
    model: &SparseModel,
    options: &BuildOptions,
) -> Result<CameraConfig, CalibrationError> {
    let mut cameras = Vec::with_capacity(model.images.len());
    let mut claimed: HashMap<String, &str> = HashMap::new();

    for image in model.images.values() {
        let colmap_camera =
            model
                .cameras
                .get(&image.camera_id)
                .ok_or_else(|| CalibrationError::UnknownCamera {
                    image: image.name.clone(),
                    camera_id: image.camera_id,
                })?;

        // Directory components stay in the key so `left/0001.png` and
        // `right/0001.png` map to distinct folders.
        let mask_folder = Path::new(&image.name)
            .with_extension("")
            .to_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                CalibrationError::malformed(
                    &model.source,
                    image.image_id as usize,
                    format!("cannot derive mask folder from image name '{}'", image.name),
                )
            })?;

        if let Some(allowed) = &options.allowed_folders {
            if !allowed.contains(&mask_folder) {
                info!("Skipping unused view: {}", image.name);
                continue;
            }
        }

        if let Some(previous) = claimed.insert(mask_folder.clone(), image.name.as_str()) {
            return Err(CalibrationError::malformed(
                &model.source,
                image.image_id as usize,
                format!(
                    "images '{}' and '{}' both map to mask folder '{}'",
                    previous, image.name, mask_folder
                ),
            ));
        }

        if let Some(root) = &options.masks_root {
            let folder = root.join(&mask_folder);
            if !folder.is_dir() {
                warn!("Mask folder not found: {}", folder.display());
            }
        }

        let camera = CameraModel::new(
            0,
            image.name.clone(),
            mask_folder,
            (colmap_camera.width, colmap_camera.height),
            colmap_camera.intrinsics().matrix(),
            image.pose().in_convention(options.convention),
        )
        .map_err(|source| CalibrationError::InvalidCamera {
            name: image.name.clone(),
            source,
        })?;
        cameras.push(camera);
    }

    cameras.sort_by(|a, b| a.mask_folder().cmp(b.mask_folder()));

    let cameras = cameras
        .into_iter()
        .enumerate()
        .map(|(index, camera)| {
            let camera = camera.with_index(index);
            info!(
                "cam_index={:2} mask_folder='{}' image='{}'",
                index,
                camera.mask_folder(),
                camera.image_name()
            );
            CameraEntry::from_model(&camera)
        })
        .collect();

    Ok(CameraConfig { cameras })
}
