//! COLMAP text model readers (`cameras.txt`, `images.txt`).

use crate::colmap::{CameraModelKind, ColmapCamera, ColmapImage};
use crate::error::CalibrationError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

fn open_lines(path: &Path) -> Result<impl Iterator<Item = (usize, std::io::Result<String>)>, CalibrationError> {
    let file = File::open(path).map_err(|e| CalibrationError::io(path, e))?;
    Ok(BufReader::new(file).lines().enumerate().map(|(i, l)| (i + 1, l)))
}

fn parse_token<T: FromStr>(
    path: &Path,
    line_no: usize,
    what: &str,
    token: Option<&str>,
) -> Result<T, CalibrationError> {
    let token =
        token.ok_or_else(|| CalibrationError::malformed(path, line_no, format!("missing {}", what)))?;
    token.parse::<T>().map_err(|_| {
        CalibrationError::malformed(path, line_no, format!("cannot parse {} from '{}'", what, token))
    })
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Read `cameras.txt`: `CAMERA_ID MODEL WIDTH HEIGHT PARAMS...` per line.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_cameras_text(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<u32, ColmapCamera>, CalibrationError> {
    let path = path.as_ref();
    let mut cameras = BTreeMap::new();

    for (line_no, line) in open_lines(path)? {
        let line = line.map_err(|e| CalibrationError::io(path, e))?;
        if is_skippable(&line) {
            continue;
        }
        let mut tokens = line.split_whitespace();

        let camera_id: u32 = parse_token(path, line_no, "camera id", tokens.next())?;
        let model = tokens
            .next()
            .ok_or_else(|| CalibrationError::malformed(path, line_no, "missing model name"))?;
        let kind = CameraModelKind::from_name(model).ok_or_else(|| {
            CalibrationError::UnsupportedCameraModel {
                path: path.to_path_buf(),
                model: model.to_string(),
            }
        })?;
        let width: u32 = parse_token(path, line_no, "width", tokens.next())?;
        let height: u32 = parse_token(path, line_no, "height", tokens.next())?;
        let params = tokens
            .map(|t| parse_token::<f64>(path, line_no, "parameter", Some(t)))
            .collect::<Result<Vec<_>, _>>()?;

        if params.len() != kind.param_count() {
            return Err(CalibrationError::malformed(
                path,
                line_no,
                format!(
                    "{} expects {} parameters, found {}",
                    kind.name(),
                    kind.param_count(),
                    params.len()
                ),
            ));
        }

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

/// Read `images.txt`.
///
/// Each image spans two lines: `IMAGE_ID QW QX QY QZ TX TY TZ CAMERA_ID NAME`
/// followed by its 2D point observations, which may be an empty line.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_images_text(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<u32, ColmapImage>, CalibrationError> {
    let path = path.as_ref();
    let mut images = BTreeMap::new();
    let mut lines = open_lines(path)?;

    while let Some((line_no, line)) = lines.next() {
        let line = line.map_err(|e| CalibrationError::io(path, e))?;
        if is_skippable(&line) {
            continue;
        }

        let (tokens, name) = split_image_line(&line);
        if tokens.len() < 9 || name.is_empty() {
            let found = tokens.len() + usize::from(!name.is_empty());
            return Err(CalibrationError::malformed(
                path,
                line_no,
                format!("expected at least 10 fields, found {}", found),
            ));
        }

        let image_id: u32 = parse_token(path, line_no, "image id", Some(tokens[0]))?;
        let mut qvec = [0.0; 4];
        for (i, slot) in qvec.iter_mut().enumerate() {
            *slot = parse_token(path, line_no, "quaternion", Some(tokens[1 + i]))?;
        }
        let mut tvec = [0.0; 3];
        for (i, slot) in tvec.iter_mut().enumerate() {
            *slot = parse_token(path, line_no, "translation", Some(tokens[5 + i]))?;
        }
        let camera_id: u32 = parse_token(path, line_no, "camera id", Some(tokens[8]))?;
        let name = name.to_string();

        // observations line
        if let Some((_, points)) = lines.next() {
            points.map_err(|e| CalibrationError::io(path, e))?;
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

/// The nine leading fields of an image line, and the remainder verbatim as
/// the image name, so runs of whitespace inside the name survive.
fn split_image_line(line: &str) -> (Vec<&str>, &str) {
    let mut tokens = Vec::with_capacity(9);
    let mut rest = line.trim_start();
    while tokens.len() < 9 && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        tokens.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (tokens, rest.trim_end_matches('\r'))
}
