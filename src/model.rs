use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Process-unique identifier for a piece of geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

impl MeshId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Immutable GPU-ready geometry.
///
/// Vertices are interleaved as `position.xyz` followed by `normal.xyz`.
#[derive(Debug, PartialEq)]
pub struct MeshData {
    id: MeshId,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub const FLOATS_PER_VERTEX: usize = 6;

    pub fn new(vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            id: MeshId::next(),
            vertices,
            indices,
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / Self::FLOATS_PER_VERTEX
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, vertex: usize) -> Vec3 {
        let start = vertex * Self::FLOATS_PER_VERTEX;
        Vec3::from_slice(&self.vertices[start..start + 3])
    }
}

/// Position, rotation and scale of an object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// One drawable part of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub mesh: Arc<MeshData>,
    pub transform: Transform,
    pub color: Vec3,
    /// Euler rotation (radians, XYZ) added to the node every frame.
    pub spin: Vec3,
}

impl ModelNode {
    pub fn new(name: impl Into<String>, mesh: Arc<MeshData>) -> Self {
        Self {
            name: name.into(),
            mesh,
            transform: Transform::default(),
            color: Vec3::splat(0.8),
            spin: Vec3::ZERO,
        }
    }
}

/// A successfully loaded model. Read-only; produce clones with
/// [`ModelTemplate::instantiate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTemplate {
    name: String,
    root: Transform,
    nodes: Vec<ModelNode>,
}

impl ModelTemplate {
    pub fn new(name: impl Into<String>, root: Transform, nodes: Vec<ModelNode>) -> Self {
        Self {
            name: name.into(),
            root,
            nodes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> Transform {
        self.root
    }

    pub fn nodes(&self) -> &[ModelNode] {
        &self.nodes
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(|node| node.mesh.triangle_count()).sum()
    }

    /// Deep-copies the node graph into an independent instance placed at
    /// `position`. Geometry is immutable and therefore shared.
    pub fn instantiate(&self, index: usize, position: Vec3) -> ModelInstance {
        ModelInstance {
            index,
            root: Transform {
                position,
                ..self.root
            },
            nodes: self.nodes.clone(),
        }
    }
}

/// An independently transformable clone of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub index: usize,
    pub root: Transform,
    pub nodes: Vec<ModelNode>,
}

impl ModelInstance {
    pub fn position(&self) -> Vec3 {
        self.root.position
    }

    /// World matrices for every node of the instance.
    pub fn node_matrices(&self) -> impl Iterator<Item = (&ModelNode, Mat4)> + '_ {
        let root = self.root.matrix();
        self.nodes
            .iter()
            .map(move |node| (node, root * node.transform.matrix()))
    }

    pub fn advance_animation(&mut self) {
        for node in &mut self.nodes {
            if node.spin != Vec3::ZERO {
                let delta =
                    Quat::from_euler(glam::EulerRot::XYZ, node.spin.x, node.spin.y, node.spin.z);
                node.transform.rotation = (node.transform.rotation * delta).normalize();
            }
        }
    }
}
