//! COLMAP binary model readers (`cameras.bin`, `images.bin`).
//!
//! All integers and floats are little-endian. Image names are NUL-terminated.

use crate::colmap::{CameraModelKind, ColmapCamera, ColmapImage};
use crate::error::CalibrationError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Bytes per 2D observation: `f64 x`, `f64 y`, `i64 point3D_id`.
const POINT2D_BYTES: u64 = 24;

fn record_error(path: &Path, record: usize, err: io::Error) -> CalibrationError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        CalibrationError::malformed(path, record, "unexpected end of file")
    } else {
        CalibrationError::io(path, err)
    }
}

fn open(path: &Path) -> Result<BufReader<File>, CalibrationError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| CalibrationError::io(path, e))
}

/// Read `cameras.bin`.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_cameras_binary(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<u32, ColmapCamera>, CalibrationError> {
    let path = path.as_ref();
    read_cameras_from(&mut open(path)?, path)
}

pub(crate) fn read_cameras_from<R: Read>(
    reader: &mut R,
    path: &Path,
) -> Result<BTreeMap<u32, ColmapCamera>, CalibrationError> {
    let count = reader
        .read_u64::<LittleEndian>()
        .map_err(|e| record_error(path, 0, e))?;
    let mut cameras = BTreeMap::new();

    for record in 1..=count as usize {
        let err = |e| record_error(path, record, e);

        let camera_id = reader.read_u32::<LittleEndian>().map_err(err)?;
        let model_id = reader.read_i32::<LittleEndian>().map_err(err)?;
        let kind = CameraModelKind::from_id(model_id).ok_or_else(|| {
            CalibrationError::UnsupportedCameraModel {
                path: path.to_path_buf(),
                model: format!("model id {}", model_id),
            }
        })?;
        let width = reader.read_u64::<LittleEndian>().map_err(err)?;
        let height = reader.read_u64::<LittleEndian>().map_err(err)?;
        let (width, height) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(CalibrationError::malformed(
                    path,
                    record,
                    format!("image size {}x{} out of range", width, height),
                ));
            }
        };

        let mut params = vec![0.0; kind.param_count()];
        reader
            .read_f64_into::<LittleEndian>(&mut params)
            .map_err(err)?;

        cameras.insert(
            camera_id,
            ColmapCamera {
                camera_id,
                kind,
                width,
                height,
                params,
            },
        );
    }

    debug!("Read {} cameras", cameras.len());
    Ok(cameras)
}

/// Read `images.bin`, skipping the per-image 2D observations.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_images_binary(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<u32, ColmapImage>, CalibrationError> {
    let path = path.as_ref();
    read_images_from(&mut open(path)?, path)
}

pub(crate) fn read_images_from<R: BufRead>(
    reader: &mut R,
    path: &Path,
) -> Result<BTreeMap<u32, ColmapImage>, CalibrationError> {
    let count = reader
        .read_u64::<LittleEndian>()
        .map_err(|e| record_error(path, 0, e))?;
    let mut images = BTreeMap::new();

    for record in 1..=count as usize {
        let err = |e| record_error(path, record, e);

        let image_id = reader.read_u32::<LittleEndian>().map_err(err)?;
        let mut qvec = [0.0; 4];
        reader.read_f64_into::<LittleEndian>(&mut qvec).map_err(err)?;
        let mut tvec = [0.0; 3];
        reader.read_f64_into::<LittleEndian>(&mut tvec).map_err(err)?;
        let camera_id = reader.read_u32::<LittleEndian>().map_err(err)?;

        let mut raw_name = Vec::new();
        reader.read_until(0, &mut raw_name).map_err(err)?;
        if raw_name.pop() != Some(0) {
            return Err(CalibrationError::malformed(
                path,
                record,
                "unterminated image name",
            ));
        }
        let name = String::from_utf8(raw_name).map_err(|_| {
            CalibrationError::malformed(path, record, "image name is not UTF-8")
        })?;

        let num_points = reader.read_u64::<LittleEndian>().map_err(err)?;
        let skip = num_points.checked_mul(POINT2D_BYTES).ok_or_else(|| {
            CalibrationError::malformed(path, record, "observation count overflows")
        })?;
        let skipped = io::copy(&mut reader.by_ref().take(skip), &mut io::sink()).map_err(err)?;
        if skipped != skip {
            return Err(CalibrationError::malformed(
                path,
                record,
                "unexpected end of file in observations",
            ));
        }

        images.insert(
            image_id,
            ColmapImage {
                image_id,
                qvec,
                tvec,
                camera_id,
                name,
            },
        );
    }

    debug!("Read {} images", images.len());
    Ok(images)
}
