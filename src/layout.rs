use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::InvalidCount;
use crate::input::validate_count;
use crate::model::{ModelInstance, ModelTemplate};

/// Arrangement used when placing clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPolicy {
    /// Clones along +X at `index * spacing`.
    Linear,
    /// Clones on a `ceil(√n) × ceil(√n)` lattice in the XZ plane.
    Grid,
}

/// Layout parameters for one scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub policy: LayoutPolicy,
    pub spacing: f32,
    /// Count applied as soon as the model is loaded.
    pub initial_count: usize,
    /// Largest count the layout accepts from the count control.
    pub max_instances: usize,
    /// Camera distance as a multiple of the grid's side length.
    pub framing_ratio: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            policy: LayoutPolicy::Linear,
            spacing: 15.0,
            initial_count: 1,
            max_instances: 10_000,
            framing_ratio: 0.8,
        }
    }
}

/// Axis-aligned span covered by a layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingExtent {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingExtent {
    pub const EMPTY: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        self.min + self.size() * 0.5
    }

    pub fn is_empty(&self) -> bool {
        self.size() == Vec3::ZERO
    }
}

/// Suggested camera distance and target for the current layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramingHint {
    pub distance: f32,
    pub look_at: Vec3,
}

/// Outcome of [`InstanceLayoutManager::apply`].
#[derive(Debug, Clone, Copy)]
pub struct LayoutResult<'a> {
    pub instances: &'a [ModelInstance],
    pub extent: BoundingExtent,
}

/// Owns the clones of a template and rebuilds them when the count changes.
#[derive(Debug)]
pub struct InstanceLayoutManager {
    template: ModelTemplate,
    config: LayoutConfig,
    instances: Vec<ModelInstance>,
    extent: BoundingExtent,
}

impl InstanceLayoutManager {
    pub fn new(template: ModelTemplate, config: LayoutConfig) -> Self {
        Self {
            template,
            config,
            instances: Vec::new(),
            extent: BoundingExtent::EMPTY,
        }
    }

    pub fn template(&self) -> &ModelTemplate {
        &self.template
    }

    pub fn policy(&self) -> LayoutPolicy {
        self.config.policy
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn instances(&self) -> &[ModelInstance] {
        &self.instances
    }

    pub fn extent(&self) -> BoundingExtent {
        self.extent
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Discards every placed clone and lays out `count` fresh ones.
    pub fn apply(&mut self, count: usize) -> LayoutResult<'_> {
        self.clear();
        let spacing = self.config.spacing;

        match self.config.policy {
            LayoutPolicy::Linear => {
                self.instances.extend(
                    (0..count).map(|i| {
                        self.template
                            .instantiate(i, Vec3::new(i as f32 * spacing, 0.0, 0.0))
                    }),
                );
                if count > 0 {
                    self.extent = BoundingExtent {
                        min: Vec3::ZERO,
                        max: Vec3::new(count as f32 * spacing, 0.0, 0.0),
                    };
                }
            }
            LayoutPolicy::Grid => {
                let size = grid_size(count);
                self.instances.extend((0..count).map(|i| {
                    let (row, col) = (i / size, i % size);
                    self.template.instantiate(
                        i,
                        Vec3::new(col as f32 * spacing, 0.0, row as f32 * spacing),
                    )
                }));
                if count > 0 {
                    let side = size as f32 * spacing;
                    self.extent = BoundingExtent {
                        min: Vec3::ZERO,
                        max: Vec3::new(side, 0.0, side),
                    };
                }
            }
        }

        debug!(
            "laid out {count} instance(s) ({:?}), extent {:?}",
            self.config.policy,
            self.extent.size()
        );
        LayoutResult {
            instances: &self.instances,
            extent: self.extent,
        }
    }

    /// Validating entry point for raw numeric input. Invalid values leave the
    /// current layout untouched.
    pub fn apply_raw(&mut self, raw: f64) -> Result<LayoutResult<'_>, InvalidCount> {
        let count = validate_count(raw, self.config.max_instances)?;
        Ok(self.apply(count))
    }

    /// Camera framing that keeps the whole grid in view: a distance of
    /// `framing_ratio` times the extent diagonal, looking at its center.
    /// Linear layouts leave the camera alone and get `None`, as does an
    /// empty layout.
    pub fn suggest_camera_framing(&self, extent: &BoundingExtent) -> Option<FramingHint> {
        if self.config.policy != LayoutPolicy::Grid || extent.is_empty() {
            return None;
        }
        let size = extent.size();
        Some(FramingHint {
            distance: size.length() * self.config.framing_ratio,
            look_at: extent.center(),
        })
    }

    pub fn advance_animation(&mut self) {
        for instance in &mut self.instances {
            instance.advance_animation();
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.extent = BoundingExtent::EMPTY;
    }
}

/// Side length of the smallest square lattice holding `count` cells.
pub fn grid_size(count: usize) -> usize {
    let mut size = (count as f64).sqrt().ceil() as usize;
    while size * size < count {
        size += 1;
    }
    while size > 0 && (size - 1) * (size - 1) >= count {
        size -= 1;
    }
    size
}
