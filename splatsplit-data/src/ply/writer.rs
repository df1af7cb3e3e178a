//! PLY file writing functions

use crate::ply::{PlyError, PlyHeader};
use crate::types::PointSet;
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Write `points` to a new PLY file at `path`, replacing any existing file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), count = points.len()))]
pub fn save_point_set(path: impl AsRef<Path>, points: &PointSet) -> Result<(), PlyError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| PlyError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_point_set(&mut writer, points).map_err(|e| PlyError::io(path, e))?;
    writer.flush().map_err(|e| PlyError::io(path, e))?;
    debug!("Saved {} splats", points.len());
    Ok(())
}

/// Encode `points` as header plus packed little-endian body.
pub fn write_point_set<W: Write>(writer: &mut W, points: &PointSet) -> std::io::Result<()> {
    writer.write_all(PlyHeader::new(points.len()).render().as_bytes())?;

    let words: &[f32] = bytemuck::cast_slice(points.splats());
    let mut body = vec![0u8; words.len() * std::mem::size_of::<f32>()];
    LittleEndian::write_f32_into(words, &mut body);
    writer.write_all(&body)
}
