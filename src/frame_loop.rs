use log::{debug, warn};

use crate::camera::{CameraConfig, CameraPose, CameraRig};
use crate::error::RenderError;
use crate::input::{validate_count, KeyInputState};
use crate::layout::{InstanceLayoutManager, LayoutConfig};
use crate::model::{ModelInstance, ModelTemplate};

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub pose: CameraPose,
    pub instances: &'a [ModelInstance],
    pub frame_index: u64,
}

/// Backend that turns a [`RenderFrame`] into pixels (or text).
pub trait RenderService {
    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<(), RenderError>;

    /// Drops any per-scene GPU resources. Called when a scene stops.
    fn release_resources(&mut self) {}
}

/// Per-frame driver for a loaded scene: camera input, relayout, animation
/// and rendering, in that order.
#[derive(Debug)]
pub struct FrameLoop {
    rig: CameraRig,
    layout: InstanceLayoutManager,
    applied_count: usize,
    frame_index: u64,
    running: bool,
}

impl FrameLoop {
    /// Builds the loop and lays out the configured initial count.
    pub fn new(template: ModelTemplate, camera: &CameraConfig, layout: LayoutConfig) -> Self {
        let initial = layout.initial_count.min(layout.max_instances);
        let mut frame_loop = Self {
            rig: CameraRig::new(camera),
            layout: InstanceLayoutManager::new(template, layout),
            applied_count: 0,
            frame_index: 0,
            running: true,
        };
        frame_loop.relayout(initial);
        frame_loop
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn layout(&self) -> &InstanceLayoutManager {
        &self.layout
    }

    pub fn applied_count(&self) -> usize {
        self.applied_count
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advances the scene by one frame and hands it to `renderer`.
    ///
    /// `requested` is the count currently shown by the count control; the
    /// layout is only rebuilt when it differs from the applied one.
    pub fn tick(
        &mut self,
        keys: &KeyInputState,
        requested: Option<usize>,
        renderer: &mut dyn RenderService,
    ) -> Result<(), RenderError> {
        if !self.running {
            return Ok(());
        }

        self.rig.apply_input(keys);

        if let Some(count) = requested.filter(|&count| count != self.applied_count) {
            match validate_count(count as f64, self.layout.config().max_instances) {
                Ok(count) => self.relayout(count),
                Err(err) => warn!("ignoring instance count: {err}"),
            }
        }

        self.layout.advance_animation();

        let frame = RenderFrame {
            pose: self.rig.current_pose(),
            instances: self.layout.instances(),
            frame_index: self.frame_index,
        };
        self.frame_index += 1;
        renderer.render(&frame)
    }

    /// Stops ticking and releases every placed instance.
    pub fn stop(&mut self) {
        self.running = false;
        self.layout.clear();
        self.applied_count = 0;
    }

    fn relayout(&mut self, count: usize) {
        let extent = self.layout.apply(count).extent;
        if let Some(hint) = self.layout.suggest_camera_framing(&extent) {
            debug!(
                "framing {count} instance(s): distance {:.2} around {:?}",
                hint.distance, hint.look_at
            );
            self.rig.apply_framing(hint);
        }
        self.applied_count = count;
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use glam::Vec3;

    use super::*;
    use crate::camera::{AxisConvention, AzimuthSense, CameraBounds, CameraState, KeyBindings, PhiMode};
    use crate::layout::LayoutPolicy;
    use crate::primitives::primitive_scene;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<(CameraPose, Vec<Vec3>, u64)>,
        fail_next: Option<RenderError>,
    }

    impl RenderService for Recorder {
        fn render(&mut self, frame: &RenderFrame<'_>) -> Result<(), RenderError> {
            if let Some(err) = self.fail_next.take() {
                return Err(err);
            }
            let positions = frame.instances.iter().map(|i| i.position()).collect();
            self.frames.push((frame.pose, positions, frame.frame_index));
            Ok(())
        }
    }

    fn camera() -> CameraConfig {
        CameraConfig {
            initial: CameraState::new(30.0, 0.0, PI / 4.0),
            look_at: Vec3::ZERO,
            bounds: CameraBounds {
                min_radius: 10.0,
                max_radius: 1000.0,
                zoom_step: 0.5,
                rotation_step: 0.05,
            },
            phi_mode: PhiMode::Clamp { epsilon: 0.01 },
            axis: AxisConvention::YUp,
            azimuth: AzimuthSense::LeftDecreases,
            bindings: KeyBindings::default(),
        }
    }

    fn layout(policy: LayoutPolicy) -> LayoutConfig {
        LayoutConfig {
            policy,
            spacing: 40.0,
            max_instances: 50,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn initial_count_is_laid_out_on_construction() {
        let frame_loop = FrameLoop::new(primitive_scene(1.0), &camera(), layout(LayoutPolicy::Linear));
        assert_eq!(frame_loop.applied_count(), 1);
        assert_eq!(frame_loop.layout().len(), 1);
    }

    #[test]
    fn tick_renders_current_pose_and_instances() {
        let mut frame_loop =
            FrameLoop::new(primitive_scene(1.0), &camera(), layout(LayoutPolicy::Linear));
        let mut recorder = Recorder::default();
        let mut keys = KeyInputState::new();
        keys.set_held("q", true);

        frame_loop.tick(&keys, Some(3), &mut recorder).unwrap();
        frame_loop.tick(&keys, Some(3), &mut recorder).unwrap();

        assert_eq!(recorder.frames.len(), 2);
        let (pose, positions, index) = &recorder.frames[1];
        assert_eq!(*index, 1);
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[2], Vec3::new(80.0, 0.0, 0.0));
        assert!((pose.position.length() - 29.0).abs() < 1e-4);
    }

    #[test]
    fn grid_relayout_reframes_camera() {
        let mut frame_loop =
            FrameLoop::new(primitive_scene(1.0), &camera(), layout(LayoutPolicy::Grid));
        let mut recorder = Recorder::default();
        let keys = KeyInputState::new();

        frame_loop.tick(&keys, Some(1), &mut recorder).unwrap();
        let one = frame_loop.rig().state().radius;
        frame_loop.tick(&keys, Some(4), &mut recorder).unwrap();
        let four = frame_loop.rig().state().radius;

        assert!(four > one);
        assert_eq!(frame_loop.rig().look_at(), Vec3::new(40.0, 0.0, 40.0));
        assert_eq!(recorder.frames[1].1.len(), 4);
    }

    #[test]
    fn linear_relayout_keeps_camera() {
        let mut frame_loop =
            FrameLoop::new(primitive_scene(1.0), &camera(), layout(LayoutPolicy::Linear));
        let before = frame_loop.rig().state();
        frame_loop
            .tick(&KeyInputState::new(), Some(6), &mut Recorder::default())
            .unwrap();
        assert_eq!(frame_loop.rig().state(), before);
        assert_eq!(frame_loop.rig().look_at(), Vec3::ZERO);
    }

    #[test]
    fn oversized_requests_are_ignored() {
        let mut frame_loop =
            FrameLoop::new(primitive_scene(1.0), &camera(), layout(LayoutPolicy::Grid));
        frame_loop
            .tick(&KeyInputState::new(), Some(51), &mut Recorder::default())
            .unwrap();
        assert_eq!(frame_loop.applied_count(), 1);
    }

    #[test]
    fn request_at_the_limit_is_applied_and_one_past_it_keeps_the_layout() {
        let mut frame_loop =
            FrameLoop::new(primitive_scene(1.0), &camera(), layout(LayoutPolicy::Linear));
        let mut recorder = Recorder::default();
        let keys = KeyInputState::new();

        frame_loop.tick(&keys, Some(50), &mut recorder).unwrap();
        assert_eq!(frame_loop.applied_count(), 50);

        frame_loop.tick(&keys, Some(51), &mut recorder).unwrap();
        assert_eq!(frame_loop.applied_count(), 50);
        assert_eq!(recorder.frames.len(), 2);
        assert_eq!(recorder.frames[1].1.len(), 50);
    }

    #[test]
    fn render_errors_propagate() {
        let mut frame_loop =
            FrameLoop::new(primitive_scene(1.0), &camera(), layout(LayoutPolicy::Linear));
        let mut recorder = Recorder {
            fail_next: Some(RenderError::SurfaceLost),
            ..Recorder::default()
        };
        let keys = KeyInputState::new();
        assert_eq!(
            frame_loop.tick(&keys, None, &mut recorder),
            Err(RenderError::SurfaceLost)
        );
        assert!(frame_loop.tick(&keys, None, &mut recorder).is_ok());
    }

    #[test]
    fn stopped_loop_renders_nothing() {
        let mut frame_loop =
            FrameLoop::new(primitive_scene(1.0), &camera(), layout(LayoutPolicy::Linear));
        let mut recorder = Recorder::default();
        frame_loop.stop();
        frame_loop
            .tick(&KeyInputState::new(), Some(2), &mut recorder)
            .unwrap();
        assert!(recorder.frames.is_empty());
        assert!(frame_loop.layout().is_empty());
        assert!(!frame_loop.is_running());
    }
}
