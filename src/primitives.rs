use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use glam::Vec3;

use crate::model::{MeshData, ModelNode, ModelTemplate, Transform};

/// Axis-aligned cube centred on the origin with per-face normals.
pub fn cube(size: f32) -> MeshData {
    let h = size * 0.5;
    // (normal, tangent u, tangent v) for each face; u × v == normal.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];

    let mut vertices = Vec::with_capacity(faces.len() * 4 * MeshData::FLOATS_PER_VERTEX);
    let mut indices = Vec::with_capacity(faces.len() * 6);
    for (face, (normal, u, v)) in faces.into_iter().enumerate() {
        let center = normal * h;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let corner = center + u * (su * h) + v * (sv * h);
            vertices.extend_from_slice(&corner.to_array());
            vertices.extend_from_slice(&normal.to_array());
        }
        let base = (face * 4) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    MeshData::new(vertices, indices)
}

/// UV sphere with `segments` slices around Y and `rings` stacks pole to pole.
pub fn sphere(radius: f32, segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut vertices = Vec::new();
    for ring in 0..=rings {
        let polar = ring as f32 / rings as f32 * PI;
        for segment in 0..=segments {
            let azimuth = segment as f32 / segments as f32 * TAU;
            let normal = Vec3::new(
                -azimuth.cos() * polar.sin(),
                polar.cos(),
                azimuth.sin() * polar.sin(),
            );
            vertices.extend_from_slice(&(normal * radius).to_array());
            vertices.extend_from_slice(&normal.to_array());
        }
    }

    let row = segments + 1;
    let mut indices = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * row + segment + 1;
            let b = ring * row + segment;
            let c = (ring + 1) * row + segment;
            let d = (ring + 1) * row + segment + 1;
            if ring != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if ring != rings - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    MeshData::new(vertices, indices)
}

/// The spinning cube and sphere used by the "simple" scene.
pub fn primitive_scene(scale: f32) -> ModelTemplate {
    let mut cube_node = ModelNode::new("cube", Arc::new(cube(1.0)));
    cube_node.color = Vec3::new(0.0, 1.0, 0.0);
    cube_node.spin = Vec3::new(0.01, 0.01, 0.0);

    let mut sphere_node = ModelNode::new("sphere", Arc::new(sphere(1.0, 32, 32)));
    sphere_node.color = Vec3::new(1.0, 0.0, 0.0);
    sphere_node.spin = Vec3::new(0.0, 0.01, 0.0);
    sphere_node.transform.position = Vec3::new(0.0, 0.0, -1.0);

    ModelTemplate::new(
        "primitives",
        Transform::default().with_scale(Vec3::splat(scale)),
        vec![cube_node, sphere_node],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_outward_normals() {
        let mesh = cube(2.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        for chunk in mesh.vertices.chunks_exact(6) {
            let position = Vec3::new(chunk[0], chunk[1], chunk[2]);
            let normal = Vec3::new(chunk[3], chunk[4], chunk[5]);
            assert!(position.dot(normal) > 0.0);
            assert!(position.abs().max_element() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn cube_winding_matches_normals() {
        let mesh = cube(1.0);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.position(i as usize));
            let face_normal = (b - a).cross(c - a);
            let stored = Vec3::from_slice(&mesh.vertices[tri[0] as usize * 6 + 3..][..3]);
            assert!(face_normal.dot(stored) > 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = sphere(2.5, 16, 8);
        assert_eq!(mesh.vertex_count(), 17 * 9);
        for i in 0..mesh.vertex_count() {
            assert!((mesh.position(i).length() - 2.5).abs() < 1e-4);
        }
        let max_index = *mesh.indices.iter().max().unwrap() as usize;
        assert!(max_index < mesh.vertex_count());
    }

    #[test]
    fn primitive_scene_has_two_spinning_nodes() {
        let template = primitive_scene(1.0);
        assert_eq!(template.nodes().len(), 2);
        assert!(template.nodes().iter().all(|node| node.spin != Vec3::ZERO));
    }
}
