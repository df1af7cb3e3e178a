//! Per-camera, per-frame occupancy masks

use image::{DynamicImage, GrayImage, ImageBuffer, Pixel};
use splatsplit_data::CameraModel;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single-channel occupancy grid, row-major.
///
/// Any nonzero cell is evidence of motion at that pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl MaskImage {
    /// Wrap raw row-major samples. Returns `None` if `data` does not hold
    /// exactly `width * height` values.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// A mask with every cell set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `f(row, col)` for every cell.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample at `row` (height axis) and `col` (width axis).
    ///
    /// # Panics
    ///
    /// Panics if the cell is out of bounds.
    pub fn get(&self, row: u32, col: u32) -> u8 {
        assert!(row < self.height && col < self.width, "mask cell out of bounds");
        self.data[row as usize * self.width as usize + col as usize]
    }

    pub fn is_occupied(&self, row: u32, col: u32) -> bool {
        self.get(row, col) != 0
    }

    pub fn occupied_count(&self) -> usize {
        self.data.iter().filter(|v| **v != 0).count()
    }

    /// Collapse a decoded image to one channel.
    ///
    /// 8-bit layouts keep their first channel as-is. Wider layouts map a
    /// nonzero first channel to 255, since scaling down to 8 bits would
    /// round small samples to zero.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::from_gray(gray),
            DynamicImage::ImageLuma16(buf) => Self::from_wide(&buf),
            DynamicImage::ImageLumaA16(buf) => Self::from_wide(&buf),
            DynamicImage::ImageRgb16(buf) => Self::from_wide(&buf),
            DynamicImage::ImageRgba16(buf) => Self::from_wide(&buf),
            DynamicImage::ImageRgb32F(buf) => Self::from_wide(&buf),
            DynamicImage::ImageRgba32F(buf) => Self::from_wide(&buf),
            other => {
                let rgba = other.to_rgba8();
                let (width, height) = rgba.dimensions();
                let data = rgba.pixels().map(|p| p.0[0]).collect();
                Self {
                    width,
                    height,
                    data,
                }
            }
        }
    }

    fn from_wide<P>(buf: &ImageBuffer<P, Vec<P::Subpixel>>) -> Self
    where
        P: Pixel,
        P::Subpixel: Default + PartialEq,
    {
        let (width, height) = buf.dimensions();
        let zero = P::Subpixel::default();
        let data = buf
            .pixels()
            .map(|p| if p.channels()[0] != zero { u8::MAX } else { 0 })
            .collect();
        Self {
            width,
            height,
            data,
        }
    }
}

/// Errors raised while loading masks.
#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error("Mask not found for camera '{camera}' frame {frame}: {location}")]
    MaskNotFound {
        camera: String,
        frame: usize,
        location: String,
    },
    #[error("Failed to decode mask {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Source of occupancy masks keyed by frame and camera.
pub trait MaskSource: Send + Sync {
    /// Load the mask for `camera` at `frame`.
    fn load(&self, frame: usize, camera: &CameraModel) -> Result<MaskImage, MaskError>;
}

/// Masks stored as `<root>/<mask_folder>/<frame:06>.png`.
#[derive(Debug, Clone)]
pub struct DirectoryMasks {
    root: PathBuf,
}

impl DirectoryMasks {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, frame: usize, camera: &CameraModel) -> PathBuf {
        self.root
            .join(camera.mask_folder())
            .join(format!("{:06}.png", frame))
    }
}

impl MaskSource for DirectoryMasks {
    fn load(&self, frame: usize, camera: &CameraModel) -> Result<MaskImage, MaskError> {
        let path = self.path_for(frame, camera);
        if !path.is_file() {
            return Err(MaskError::MaskNotFound {
                camera: camera.mask_folder().to_string(),
                frame,
                location: path.display().to_string(),
            });
        }
        let image = image::open(&path).map_err(|source| MaskError::Decode {
            path: path.clone(),
            source,
        })?;
        let mask = MaskImage::from_dynamic(image);
        debug!(
            "Loaded mask {} ({}x{}, {} occupied)",
            path.display(),
            mask.width(),
            mask.height(),
            mask.occupied_count()
        );
        Ok(mask)
    }
}

/// Masks held in memory, keyed by mask folder and frame.
#[derive(Debug, Clone, Default)]
pub struct MemoryMasks {
    masks: HashMap<(String, usize), MaskImage>,
}

impl MemoryMasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mask_folder: impl Into<String>, frame: usize, mask: MaskImage) {
        self.masks.insert((mask_folder.into(), frame), mask);
    }

    pub fn with(mut self, mask_folder: impl Into<String>, frame: usize, mask: MaskImage) -> Self {
        self.insert(mask_folder, frame, mask);
        self
    }
}

impl MaskSource for MemoryMasks {
    fn load(&self, frame: usize, camera: &CameraModel) -> Result<MaskImage, MaskError> {
        self.masks
            .get(&(camera.mask_folder().to_string(), frame))
            .cloned()
            .ok_or_else(|| MaskError::MaskNotFound {
                camera: camera.mask_folder().to_string(),
                frame,
                location: "memory".to_string(),
            })
    }
}

/// Load one mask per camera for `frame`, in camera order.
///
/// Fails on the first missing mask; a partial set would bias the vote.
pub fn load_frame_masks(
    source: &dyn MaskSource,
    frame: usize,
    cameras: &[CameraModel],
) -> Result<Vec<MaskImage>, MaskError> {
    cameras
        .iter()
        .map(|camera| source.load(frame, camera))
        .collect()
}
