pub mod gpu;
pub mod summary;

use glam::{Mat4, Vec3};

use crate::camera::{CameraPose, Projection};
use crate::config::LightConfig;

pub use gpu::GpuRenderer;
pub use summary::{FrameSummary, SummaryRenderer};

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

impl CameraParams {
    pub fn from_pose(pose: &CameraPose, projection: &Projection, aspect: f32) -> Self {
        Self {
            view_proj: pose.view_projection(projection, aspect),
            position: pose.position,
        }
    }
}

/// Lighting state consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub ambient: f32,
}

impl From<&LightConfig> for LightParams {
    fn from(light: &LightConfig) -> Self {
        Self {
            position: light.position,
            color: light.color,
            ambient: light.ambient.max(0.0),
        }
    }
}
