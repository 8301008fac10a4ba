use std::collections::HashMap;

use glam::Vec3;

use crate::error::ObjError;
use crate::model::MeshData;

/// Parses a Wavefront OBJ document into a single interleaved mesh.
///
/// Only `v`, `vn` and `f` records are read; polygons are fan-triangulated
/// and missing normals are computed from face winding.
pub fn parse_obj(data: &str) -> Result<MeshData, ObjError> {
    let mut reader = ObjReader::default();
    for (line_no, line) in data.lines().enumerate() {
        reader.read_line(line_no + 1, line)?;
    }
    reader.finish()
}

#[derive(Debug, Default)]
struct ObjReader {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    triangles: Vec<[Corner; 3]>,
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    position: i64,
    normal: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: usize,
    normal: Option<usize>,
}

impl ObjReader {
    fn read_line(&mut self, line: usize, text: &str) -> Result<(), ObjError> {
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            return Ok(());
        }
        let mut parts = text.split_whitespace();
        match parts.next() {
            Some("v") => self.positions.push(parse_vec3(line, parts)?),
            Some("vn") => self.normals.push(parse_vec3(line, parts)?),
            Some("f") => {
                let polygon = parts
                    .map(|corner| parse_corner(line, corner))
                    .collect::<Result<Vec<_>, _>>()?;
                if polygon.len() < 3 {
                    return Err(syntax(line, "faces must reference at least 3 vertices"));
                }
                for i in 1..polygon.len() - 1 {
                    self.triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<MeshData, ObjError> {
        if self.positions.is_empty() {
            return Err(ObjError::NoVertices);
        }

        let mut lookup: HashMap<VertexKey, u32> = HashMap::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::with_capacity(self.triangles.len() * 3);
        let mut missing_normals = false;

        for corner in self.triangles.iter().flatten() {
            let key = VertexKey {
                position: resolve_index(corner.position, self.positions.len())?,
                normal: corner
                    .normal
                    .map(|index| resolve_index(index, self.normals.len()))
                    .transpose()?,
            };
            let next = (vertices.len() / MeshData::FLOATS_PER_VERTEX) as u32;
            let index = *lookup.entry(key).or_insert_with(|| {
                let position = self.positions[key.position];
                let normal = key.normal.map_or(Vec3::ZERO, |i| self.normals[i]);
                missing_normals |= key.normal.is_none();
                vertices.extend_from_slice(&position.to_array());
                vertices.extend_from_slice(&normal.to_array());
                next
            });
            indices.push(index);
        }

        if missing_normals {
            compute_normals(&mut vertices, &indices);
        }
        Ok(MeshData::new(vertices, indices))
    }
}

fn syntax(line: usize, message: impl Into<String>) -> ObjError {
    ObjError::Syntax {
        line,
        message: message.into(),
    }
}

fn parse_vec3<'a>(line: usize, parts: impl Iterator<Item = &'a str>) -> Result<Vec3, ObjError> {
    let mut values = [0.0_f32; 3];
    let mut parts = parts;
    for value in &mut values {
        let part = parts
            .next()
            .ok_or_else(|| syntax(line, "missing vector component"))?;
        *value = part
            .parse()
            .map_err(|_| syntax(line, format!("invalid number {part:?}")))?;
    }
    Ok(Vec3::from_array(values))
}

fn parse_corner(line: usize, corner: &str) -> Result<Corner, ObjError> {
    let mut segments = corner.split('/');
    let position = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| syntax(line, "missing vertex index"))?
        .parse::<i64>()
        .map_err(|_| syntax(line, format!("invalid vertex index in {corner:?}")))?;
    // Texture coordinates are skipped.
    let _ = segments.next();
    let normal = match segments.next() {
        Some(s) if !s.is_empty() => Some(
            s.parse::<i64>()
                .map_err(|_| syntax(line, format!("invalid normal index in {corner:?}")))?,
        ),
        _ => None,
    };
    Ok(Corner { position, normal })
}

/// Converts a 1-based (or negative, relative) OBJ index to a 0-based one.
fn resolve_index(index: i64, len: usize) -> Result<usize, ObjError> {
    let resolved = match index {
        i if i > 0 => usize::try_from(i - 1).ok().filter(|&i| i < len),
        i if i < 0 => i
            .checked_neg()
            .and_then(|back| usize::try_from(back).ok())
            .and_then(|back| len.checked_sub(back)),
        _ => None,
    };
    resolved.ok_or(ObjError::IndexOutOfRange {
        index,
        available: len,
    })
}

fn compute_normals(vertices: &mut [f32], indices: &[u32]) {
    let stride = MeshData::FLOATS_PER_VERTEX;
    let position = |vertices: &[f32], i: usize| Vec3::from_slice(&vertices[i * stride..i * stride + 3]);
    let mut accum = vec![Vec3::ZERO; vertices.len() / stride];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let (p0, p1, p2) = (position(vertices, a), position(vertices, b), position(vertices, c));
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[a] += normal;
            accum[b] += normal;
            accum[c] += normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let slot = &mut vertices[i * stride + 3..i * stride + 6];
        if slot.iter().all(|&v| v == 0.0) {
            slot.copy_from_slice(&normal.normalize_or_zero().to_array());
        }
    }
}
