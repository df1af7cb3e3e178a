//! PLY file loading functions

use crate::ply::{PlyError, PlyHeader};
use crate::types::{PointSet, SPLAT_FLOATS, SPLAT_STRIDE, Splat};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Upper bound on the body buffer reserved from the header's declared count.
/// Larger bodies grow as they are read, so a bogus count cannot force a huge
/// allocation before truncation is detected.
const MAX_BODY_RESERVE: usize = 64 * 1024 * 1024;

/// Load a splat point set from a binary PLY file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_point_set(path: impl AsRef<Path>) -> Result<PointSet, PlyError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PlyError::io(path, e))?;
    let points = read_point_set(BufReader::new(file), path)?;
    debug!("Loaded {} splats", points.len());
    Ok(points)
}

/// Decode a splat point set from any buffered reader.
///
/// `path` is only used to label errors.
pub fn read_point_set<R: BufRead>(mut reader: R, path: &Path) -> Result<PointSet, PlyError> {
    let header = PlyHeader::read(&mut reader, path)?;

    let expected = header
        .vertex_count
        .checked_mul(SPLAT_STRIDE)
        .ok_or_else(|| PlyError::header(path, "vertex count overflows body size"))?;

    let mut body = Vec::with_capacity(expected.min(MAX_BODY_RESERVE));
    reader
        .take(expected as u64)
        .read_to_end(&mut body)
        .map_err(|e| PlyError::io(path, e))?;

    if body.len() < expected {
        return Err(PlyError::TruncatedFile {
            path: path.to_path_buf(),
            expected,
            found: body.len(),
        });
    }

    let mut words = vec![0f32; header.vertex_count * SPLAT_FLOATS];
    LittleEndian::read_f32_into(&body, &mut words);
    let splats: Vec<Splat> = bytemuck::cast_slice(&words).to_vec();

    Ok(PointSet::new(splats))
}
