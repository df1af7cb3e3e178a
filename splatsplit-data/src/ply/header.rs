//! PLY header parsing and rendering.

use crate::ply::PlyError;
use std::io::BufRead;
use std::path::Path;

/// Property names of a splat record, in wire order.
pub const SPLAT_FIELDS: [&str; 17] = [
    "x", "y", "z", "nx", "ny", "nz", "f_dc_0", "f_dc_1", "f_dc_2", "opacity", "scale_0",
    "scale_1", "scale_2", "rot_0", "rot_1", "rot_2", "rot_3",
];

const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Parsed splat PLY header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlyHeader {
    /// Number of vertex records in the body.
    pub vertex_count: usize,
}

impl PlyHeader {
    pub fn new(vertex_count: usize) -> Self {
        Self { vertex_count }
    }

    /// Read the header from `reader`, leaving it positioned at the first body byte.
    pub fn read<R: BufRead>(reader: &mut R, path: &Path) -> Result<Self, PlyError> {
        let mut consumed = 0usize;
        let mut line_no = 0usize;
        let mut vertex_count = None;
        let mut properties: Vec<String> = Vec::with_capacity(SPLAT_FIELDS.len());
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let n = reader
                .read_until(b'\n', &mut raw)
                .map_err(|e| PlyError::io(path, e))?;
            if n == 0 {
                return Err(PlyError::header(path, "missing end_header"));
            }
            consumed += n;
            if consumed > MAX_HEADER_BYTES {
                return Err(PlyError::header(
                    path,
                    format!("missing end_header within {} bytes", MAX_HEADER_BYTES),
                ));
            }
            line_no += 1;

            let line = std::str::from_utf8(&raw)
                .map_err(|_| PlyError::header(path, format!("line {} is not ASCII", line_no)))?
                .trim();

            if line_no == 1 {
                if line != "ply" {
                    return Err(PlyError::header(path, "missing 'ply' magic"));
                }
                continue;
            }

            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("end_header") => break,
                Some("comment") | Some("obj_info") | None => {}
                Some("format") => {
                    let format = tokens.next().unwrap_or_default();
                    let version = tokens.next().unwrap_or_default();
                    if format != "binary_little_endian" || version != "1.0" {
                        return Err(PlyError::header(
                            path,
                            format!("unsupported format '{} {}'", format, version),
                        ));
                    }
                }
                Some("element") => {
                    let name = tokens.next().unwrap_or_default();
                    if name != "vertex" {
                        return Err(PlyError::header(
                            path,
                            format!("unexpected element '{}'", name),
                        ));
                    }
                    let count = tokens
                        .next()
                        .and_then(|c| c.parse::<usize>().ok())
                        .ok_or_else(|| {
                            PlyError::header(path, format!("bad vertex count on line {}", line_no))
                        })?;
                    vertex_count = Some(count);
                }
                Some("property") => {
                    let ty = tokens.next().unwrap_or_default();
                    let name = tokens.next().unwrap_or_default();
                    if ty != "float" && ty != "float32" {
                        return Err(PlyError::header(
                            path,
                            format!("property '{}' has type '{}', expected float", name, ty),
                        ));
                    }
                    properties.push(name.to_string());
                }
                Some(other) => {
                    return Err(PlyError::header(
                        path,
                        format!("unknown keyword '{}' on line {}", other, line_no),
                    ));
                }
            }
        }

        let vertex_count =
            vertex_count.ok_or_else(|| PlyError::header(path, "no 'element vertex' line"))?;

        if properties.iter().map(String::as_str).ne(SPLAT_FIELDS.iter().copied()) {
            return Err(PlyError::header(
                path,
                format!(
                    "property list [{}] does not match [{}]",
                    properties.join(", "),
                    SPLAT_FIELDS.join(", ")
                ),
            ));
        }

        Ok(Self { vertex_count })
    }

    /// Render the ASCII header, terminator line included.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(400);
        out.push_str("ply\n");
        out.push_str("format binary_little_endian 1.0\n");
        out.push_str(&format!("element vertex {}\n", self.vertex_count));
        for field in SPLAT_FIELDS {
            out.push_str("property float ");
            out.push_str(field);
            out.push('\n');
        }
        out.push_str("end_header\n");
        out
    }
}
