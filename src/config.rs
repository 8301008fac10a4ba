//! Scene presets and JSON configuration overlays.
//!
//! Every scene starts from a [`ScenePreset`]. A JSON document may override
//! any subset of the preset's fields; fields the document leaves out keep
//! their preset values.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::camera::{
    AxisConvention, AzimuthSense, CameraBounds, CameraConfig, CameraState, KeyBindings, PhiMode,
    Projection,
};
use crate::layout::{LayoutConfig, LayoutPolicy};

/// Point light plus a flat ambient term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    pub position: Vec3,
    pub color: Vec3,
    pub ambient: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: Vec3::splat(50.0),
            color: Vec3::ONE,
            ambient: 0.25,
        }
    }
}

/// Complete description of one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub layout: LayoutConfig,
    /// Uniform scale applied to the loaded model's root.
    pub model_scale: f32,
    pub projection: Projection,
    pub light: LightConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ScenePreset::Orbit.config()
    }
}

impl ViewerConfig {
    /// Checks the invariants the camera and layout rely on.
    pub fn validate(&self) -> Result<()> {
        let bounds = &self.camera.bounds;
        ensure!(
            bounds.min_radius > 0.0,
            "camera.bounds.min_radius must be positive (got {})",
            bounds.min_radius
        );
        ensure!(
            bounds.min_radius <= bounds.max_radius,
            "camera.bounds.min_radius ({}) exceeds max_radius ({})",
            bounds.min_radius,
            bounds.max_radius
        );
        ensure!(
            bounds.zoom_step >= 0.0 && bounds.rotation_step >= 0.0,
            "camera step sizes cannot be negative"
        );
        if let PhiMode::Clamp { epsilon } = self.camera.phi_mode {
            ensure!(
                (0.0..FRAC_PI_2).contains(&epsilon),
                "phi clamp epsilon must lie in [0, π/2) (got {epsilon})"
            );
        }
        ensure!(
            self.layout.spacing > 0.0,
            "layout.spacing must be positive (got {})",
            self.layout.spacing
        );
        ensure!(
            self.layout.framing_ratio > 0.0,
            "layout.framing_ratio must be positive (got {})",
            self.layout.framing_ratio
        );
        ensure!(
            self.layout.initial_count <= self.layout.max_instances,
            "layout.initial_count ({}) exceeds max_instances ({})",
            self.layout.initial_count,
            self.layout.max_instances
        );
        ensure!(
            self.model_scale > 0.0,
            "model_scale must be positive (got {})",
            self.model_scale
        );
        let projection = &self.projection;
        ensure!(
            projection.fov_degrees > 0.0 && projection.fov_degrees < 180.0,
            "projection.fov_degrees must lie in (0, 180)"
        );
        ensure!(
            projection.near > 0.0 && projection.far > projection.near,
            "projection planes must satisfy 0 < near < far"
        );
        Ok(())
    }

    /// Overlays a JSON document on `base`. Objects are merged key by key;
    /// any other value replaces the base value outright.
    pub fn with_overlay(base: &ViewerConfig, overlay: Value) -> Result<ViewerConfig> {
        let mut merged =
            serde_json::to_value(base).context("failed to serialise base configuration")?;
        merge_json(&mut merged, overlay);
        let config: ViewerConfig =
            serde_json::from_value(merged).context("invalid configuration overlay")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` as JSON and overlays it on `preset`.
    pub fn load(preset: ScenePreset, path: &Path) -> Result<ViewerConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let overlay: Value = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Self::with_overlay(&preset.config(), overlay)
            .with_context(|| format!("invalid config {}", path.display()))
    }
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// The built-in scenes selectable from the command line or with F1–F4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenePreset {
    /// Spinning cube and sphere, free orbit around the Z axis.
    Simple,
    /// Single model, Y-up orbit with clamped poles.
    Orbit,
    /// Clones along a line.
    Analyser,
    /// Clones on a square grid with automatic framing.
    Gallery,
}

impl ScenePreset {
    pub const ALL: [ScenePreset; 4] = [
        ScenePreset::Simple,
        ScenePreset::Orbit,
        ScenePreset::Analyser,
        ScenePreset::Gallery,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenePreset::Simple => "simple",
            ScenePreset::Orbit => "orbit",
            ScenePreset::Analyser => "analyser",
            ScenePreset::Gallery => "gallery",
        }
    }

    pub fn config(self) -> ViewerConfig {
        let clamped = PhiMode::Clamp { epsilon: 0.01 };
        let far_camera = CameraState::from_offset(Vec3::splat(30.0), AxisConvention::YUp);
        let far_light = LightConfig {
            position: Vec3::splat(50.0),
            color: Vec3::ONE,
            ambient: 0.35,
        };

        match self {
            ScenePreset::Simple => ViewerConfig {
                camera: CameraConfig {
                    initial: CameraState::new(5.0, 0.0, PI / 3.0),
                    look_at: Vec3::ZERO,
                    bounds: bounds(2.0, 10.0, 0.1),
                    phi_mode: PhiMode::Wrap,
                    axis: AxisConvention::ZUp,
                    azimuth: AzimuthSense::LeftIncreases,
                    bindings: KeyBindings::default(),
                },
                layout: layout(LayoutPolicy::Linear, 15.0),
                model_scale: 1.0,
                projection: Projection {
                    near: 0.1,
                    ..Projection::default()
                },
                light: LightConfig {
                    position: Vec3::splat(5.0),
                    color: Vec3::ONE,
                    ambient: 0.25,
                },
            },
            ScenePreset::Orbit => ViewerConfig {
                camera: CameraConfig {
                    initial: CameraState::new(30.0, 0.0, PI / 2.0),
                    look_at: Vec3::ZERO,
                    bounds: bounds(10.0, 50.0, 0.5),
                    phi_mode: clamped,
                    axis: AxisConvention::YUp,
                    azimuth: AzimuthSense::LeftDecreases,
                    bindings: KeyBindings::default(),
                },
                layout: layout(LayoutPolicy::Linear, 15.0),
                model_scale: 1.0,
                projection: Projection::default(),
                light: LightConfig {
                    position: Vec3::splat(7.0),
                    ..LightConfig::default()
                },
            },
            ScenePreset::Analyser => ViewerConfig {
                camera: CameraConfig {
                    initial: far_camera,
                    look_at: Vec3::ZERO,
                    bounds: bounds(10.0, 1000.0, 0.5),
                    phi_mode: clamped,
                    axis: AxisConvention::YUp,
                    azimuth: AzimuthSense::LeftDecreases,
                    bindings: KeyBindings::default(),
                },
                layout: layout(LayoutPolicy::Linear, 15.0),
                model_scale: 10.0,
                projection: Projection::default(),
                light: far_light,
            },
            ScenePreset::Gallery => ViewerConfig {
                camera: CameraConfig {
                    initial: far_camera,
                    look_at: Vec3::ZERO,
                    bounds: bounds(10.0, 1000.0, 0.5),
                    phi_mode: clamped,
                    axis: AxisConvention::YUp,
                    azimuth: AzimuthSense::LeftDecreases,
                    bindings: KeyBindings::default(),
                },
                layout: layout(LayoutPolicy::Grid, 40.0),
                model_scale: 10.0,
                projection: Projection::default(),
                light: far_light,
            },
        }
    }
}

impl fmt::Display for ScenePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn bounds(min_radius: f32, max_radius: f32, zoom_step: f32) -> CameraBounds {
    CameraBounds {
        min_radius,
        max_radius,
        zoom_step,
        rotation_step: 0.05,
    }
}

fn layout(policy: LayoutPolicy, spacing: f32) -> LayoutConfig {
    LayoutConfig {
        policy,
        spacing,
        ..LayoutConfig::default()
    }
}
