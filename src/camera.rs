//! Orbit camera driven by spherical coordinates and held keys.
//!
//! The rig keeps `(radius, theta, phi)` around a look-at point and converts
//! them to a world-space eye position once per frame. Every mutation goes
//! through clamping or wrapping so the state can never leave its legal
//! domain, whatever keys are held.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::input::KeyInputState;
use crate::layout::FramingHint;

/// Which world axis the polar angle is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisConvention {
    /// `y = r·cosφ`; the orbit scenes.
    YUp,
    /// `z = r·cosφ`, `y = r·sinφ·sinθ`; the simple primitives scene.
    ZUp,
}

/// How the polar angle behaves at the poles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum PhiMode {
    /// Free orbit: `phi` wraps modulo 2π and may pass over the poles.
    Wrap,
    /// `phi` stays within `[epsilon, π − epsilon]`.
    Clamp { epsilon: f32 },
}

/// Direction `theta` moves when the "left" binding is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AzimuthSense {
    LeftDecreases,
    LeftIncreases,
}

/// Spherical camera coordinates around the look-at point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl CameraState {
    pub const fn new(radius: f32, theta: f32, phi: f32) -> Self {
        Self { radius, theta, phi }
    }

    /// Recovers spherical coordinates from an eye offset relative to the
    /// look-at point. `theta` is returned in `[0, 2π)` and `phi` in `[0, π]`.
    pub fn from_offset(offset: Vec3, axis: AxisConvention) -> Self {
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return Self::new(0.0, 0.0, 0.0);
        }
        let (vertical, plane_x, plane_y) = match axis {
            AxisConvention::YUp => (offset.y, offset.x, offset.z),
            AxisConvention::ZUp => (offset.z, offset.x, offset.y),
        };
        let phi = (vertical / radius).clamp(-1.0, 1.0).acos();
        let theta = wrap_angle(plane_y.atan2(plane_x));
        Self::new(radius, theta, phi)
    }

    /// Eye offset from the look-at point.
    pub fn to_offset(&self, axis: AxisConvention) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let r = self.radius;
        match axis {
            AxisConvention::YUp => Vec3::new(
                r * sin_phi * cos_theta,
                r * cos_phi,
                r * sin_phi * sin_theta,
            ),
            AxisConvention::ZUp => Vec3::new(
                r * sin_phi * cos_theta,
                r * sin_phi * sin_theta,
                r * cos_phi,
            ),
        }
    }
}

/// Static limits and step sizes of a rig.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraBounds {
    pub min_radius: f32,
    pub max_radius: f32,
    /// Radius change per tick while a zoom key is held.
    pub zoom_step: f32,
    /// Angle change (radians) per tick while a rotation key is held.
    pub rotation_step: f32,
}

/// Logical key names bound to each camera action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub zoom_in: Vec<String>,
    pub zoom_out: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        fn names(keys: &[&str]) -> Vec<String> {
            keys.iter().map(|key| key.to_string()).collect()
        }
        Self {
            zoom_in: names(&["q"]),
            zoom_out: names(&["e"]),
            left: names(&["arrowleft", "a"]),
            right: names(&["arrowright", "d"]),
            up: names(&["arrowup", "w"]),
            down: names(&["arrowdown", "s"]),
        }
    }
}

/// Everything needed to build a [`CameraRig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub initial: CameraState,
    pub look_at: Vec3,
    pub bounds: CameraBounds,
    pub phi_mode: PhiMode,
    pub axis: AxisConvention,
    pub azimuth: AzimuthSense,
    #[serde(default)]
    pub bindings: KeyBindings,
}

/// Perspective parameters shared by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            aspect.max(0.01),
            self.near,
            self.far,
        )
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}

/// World-space camera placement for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
}

impl CameraPose {
    pub fn view_matrix(&self) -> Mat4 {
        let forward = (self.look_at - self.position).normalize_or_zero();
        // Looking straight along the up vector makes look_at degenerate.
        let up = if forward.cross(self.up).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            self.up
        };
        Mat4::look_at_rh(self.position, self.look_at, up)
    }

    pub fn view_projection(&self, projection: &Projection, aspect: f32) -> Mat4 {
        projection.matrix(aspect) * self.view_matrix()
    }
}

/// Keyboard-driven orbit camera.
#[derive(Debug, Clone)]
pub struct CameraRig {
    state: CameraState,
    look_at: Vec3,
    bounds: CameraBounds,
    phi_mode: PhiMode,
    axis: AxisConvention,
    azimuth: AzimuthSense,
    bindings: KeyBindings,
}

impl CameraRig {
    pub fn new(config: &CameraConfig) -> Self {
        let mut rig = Self {
            state: config.initial,
            look_at: config.look_at,
            bounds: config.bounds,
            phi_mode: config.phi_mode,
            axis: config.axis,
            azimuth: config.azimuth,
            bindings: config.bindings.clone(),
        };
        rig.state.radius = rig.clamp_radius(rig.state.radius);
        rig.state.theta = wrap_angle(rig.state.theta);
        rig.state.phi = rig.constrain_phi(rig.state.phi);
        rig
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn bounds(&self) -> CameraBounds {
        self.bounds
    }

    pub fn axis(&self) -> AxisConvention {
        self.axis
    }

    pub fn phi_mode(&self) -> PhiMode {
        self.phi_mode
    }

    /// Applies one tick worth of held-key deltas.
    pub fn apply_input(&mut self, keys: &KeyInputState) {
        let step = self.bounds.rotation_step;

        if keys.any_held(&self.bindings.zoom_in) {
            self.zoom_by(-self.bounds.zoom_step);
        }
        if keys.any_held(&self.bindings.zoom_out) {
            self.zoom_by(self.bounds.zoom_step);
        }

        let left_delta = match self.azimuth {
            AzimuthSense::LeftDecreases => -step,
            AzimuthSense::LeftIncreases => step,
        };
        if keys.any_held(&self.bindings.left) {
            self.rotate_azimuth(left_delta);
        }
        if keys.any_held(&self.bindings.right) {
            self.rotate_azimuth(-left_delta);
        }

        if keys.any_held(&self.bindings.up) {
            self.rotate_polar(step);
        }
        if keys.any_held(&self.bindings.down) {
            self.rotate_polar(-step);
        }
    }

    pub fn zoom_by(&mut self, delta: f32) {
        self.state.radius = self.clamp_radius(self.state.radius + delta);
    }

    pub fn rotate_azimuth(&mut self, delta: f32) {
        self.state.theta = wrap_angle(self.state.theta + delta);
    }

    pub fn rotate_polar(&mut self, delta: f32) {
        self.state.phi = self.constrain_phi(self.state.phi + delta);
    }

    /// Re-targets the rig on a layout's framing hint.
    pub fn apply_framing(&mut self, hint: FramingHint) {
        self.look_at = hint.look_at;
        self.state.radius = self.clamp_radius(hint.distance);
    }

    /// Eye position and target for the current state. Pure.
    pub fn current_pose(&self) -> CameraPose {
        CameraPose {
            position: self.look_at + self.state.to_offset(self.axis),
            look_at: self.look_at,
            up: Vec3::Y,
        }
    }

    fn clamp_radius(&self, radius: f32) -> f32 {
        radius
            .max(self.bounds.min_radius)
            .min(self.bounds.max_radius)
    }

    fn constrain_phi(&self, phi: f32) -> f32 {
        match self.phi_mode {
            PhiMode::Wrap => wrap_angle(phi),
            PhiMode::Clamp { epsilon } => phi.max(epsilon).min(PI - epsilon),
        }
    }
}

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 0.01;

    fn orbit_config() -> CameraConfig {
        CameraConfig {
            initial: CameraState::new(30.0, 0.0, PI / 2.0),
            look_at: Vec3::ZERO,
            bounds: CameraBounds {
                min_radius: 10.0,
                max_radius: 50.0,
                zoom_step: 0.5,
                rotation_step: 0.05,
            },
            phi_mode: PhiMode::Clamp { epsilon: EPS },
            axis: AxisConvention::YUp,
            azimuth: AzimuthSense::LeftDecreases,
            bindings: KeyBindings::default(),
        }
    }

    fn simple_config() -> CameraConfig {
        CameraConfig {
            initial: CameraState::new(5.0, 0.0, PI / 3.0),
            bounds: CameraBounds {
                min_radius: 2.0,
                max_radius: 10.0,
                zoom_step: 0.1,
                rotation_step: 0.05,
            },
            phi_mode: PhiMode::Wrap,
            axis: AxisConvention::ZUp,
            azimuth: AzimuthSense::LeftIncreases,
            ..orbit_config()
        }
    }

    fn hold(key: &str) -> KeyInputState {
        let mut keys = KeyInputState::new();
        keys.set_held(key, true);
        keys
    }

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn pose_uses_y_up_convention() {
        let rig = CameraRig::new(&orbit_config());
        let pose = rig.current_pose();
        assert_vec_close(pose.position, Vec3::new(30.0, 0.0, 0.0));
        assert_eq!(pose.look_at, Vec3::ZERO);
    }

    #[test]
    fn pose_uses_z_up_convention() {
        let mut config = simple_config();
        config.initial = CameraState::new(5.0, PI / 2.0, PI / 2.0);
        let rig = CameraRig::new(&config);
        assert_vec_close(rig.current_pose().position, Vec3::new(0.0, 5.0, 0.0));

        let state = CameraState::new(5.0, 0.0, 0.0);
        assert_vec_close(state.to_offset(AxisConvention::ZUp), Vec3::new(0.0, 0.0, 5.0));
        assert_vec_close(state.to_offset(AxisConvention::YUp), Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn pose_is_deterministic_and_independent_of_input() {
        let rig = CameraRig::new(&orbit_config());
        assert_eq!(rig.current_pose(), rig.current_pose());
    }

    #[test]
    fn spherical_round_trip() {
        for axis in [AxisConvention::YUp, AxisConvention::ZUp] {
            for radius in [0.5_f32, 5.0, 42.0] {
                for theta in [0.0_f32, 0.7, 2.0, 3.5, 6.0] {
                    for phi in [0.05_f32, 0.8, PI / 2.0, 2.5, 3.1] {
                        let state = CameraState::new(radius, theta, phi);
                        let back = CameraState::from_offset(state.to_offset(axis), axis);
                        assert!((back.radius - radius).abs() < 1e-3 * radius.max(1.0));
                        assert!((back.theta - theta).abs() < 1e-3, "{axis:?} {theta} {back:?}");
                        assert!((back.phi - phi).abs() < 1e-3, "{axis:?} {phi} {back:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn zoom_never_leaves_bounds() {
        let mut rig = CameraRig::new(&orbit_config());
        let keys = hold("q");
        for _ in 0..200 {
            rig.apply_input(&keys);
            assert!(rig.state().radius >= 10.0);
        }
        assert_eq!(rig.state().radius, 10.0);

        let keys = hold("E");
        for _ in 0..200 {
            rig.apply_input(&keys);
            assert!(rig.state().radius <= 50.0);
        }
        assert_eq!(rig.state().radius, 50.0);
    }

    #[test]
    fn wrap_mode_keeps_angles_in_range() {
        let mut rig = CameraRig::new(&simple_config());
        let mut keys = KeyInputState::new();
        keys.set_held("w", true);
        keys.set_held("arrowright", true);
        for _ in 0..1000 {
            rig.apply_input(&keys);
            let state = rig.state();
            assert!((0.0..TAU).contains(&state.theta), "{state:?}");
            assert!((0.0..TAU).contains(&state.phi), "{state:?}");
        }
        keys.clear();
        keys.set_held("s", true);
        keys.set_held("a", true);
        for _ in 0..1000 {
            rig.apply_input(&keys);
            let state = rig.state();
            assert!((0.0..TAU).contains(&state.theta), "{state:?}");
            assert!((0.0..TAU).contains(&state.phi), "{state:?}");
        }
    }

    #[test]
    fn clamp_mode_keeps_phi_off_the_poles() {
        let mut rig = CameraRig::new(&orbit_config());
        let keys = hold("arrowup");
        for _ in 0..200 {
            rig.apply_input(&keys);
            let phi = rig.state().phi;
            assert!(phi >= EPS && phi <= PI - EPS);
        }
        assert!((rig.state().phi - (PI - EPS)).abs() < 1e-6);

        let keys = hold("arrowdown");
        for _ in 0..200 {
            rig.apply_input(&keys);
            let phi = rig.state().phi;
            assert!(phi >= EPS && phi <= PI - EPS);
        }
        assert!((rig.state().phi - EPS).abs() < 1e-6);
    }

    #[test]
    fn azimuth_sense_is_configurable() {
        let mut orbit = CameraRig::new(&orbit_config());
        orbit.apply_input(&hold("a"));
        assert!((orbit.state().theta - (TAU - 0.05)).abs() < 1e-5);

        let mut simple = CameraRig::new(&simple_config());
        simple.apply_input(&hold("arrowleft"));
        assert!((simple.state().theta - 0.05).abs() < 1e-5);
        simple.apply_input(&hold("d"));
        assert!(simple.state().theta.abs() < 1e-5);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut rig = CameraRig::new(&orbit_config());
        let before = rig.state();
        rig.apply_input(&hold("z"));
        rig.apply_input(&hold("enter"));
        assert_eq!(rig.state(), before);
    }

    #[test]
    fn initial_state_is_normalised() {
        let mut config = orbit_config();
        config.initial = CameraState::new(500.0, -0.5, 0.0);
        let rig = CameraRig::new(&config);
        assert_eq!(rig.state().radius, 50.0);
        assert!((rig.state().theta - (TAU - 0.5)).abs() < 1e-5);
        assert_eq!(rig.state().phi, EPS);
    }

    #[test]
    fn framing_retargets_and_clamps() {
        let mut rig = CameraRig::new(&orbit_config());
        rig.apply_framing(FramingHint {
            distance: 64.0,
            look_at: Vec3::new(40.0, 0.0, 40.0),
        });
        assert_eq!(rig.state().radius, 50.0);
        assert_eq!(rig.look_at(), Vec3::new(40.0, 0.0, 40.0));
        let pose = rig.current_pose();
        assert_vec_close(pose.position, Vec3::new(90.0, 0.0, 40.0));
    }

    #[test]
    fn view_matrix_is_finite_at_the_pole() {
        let pose = CameraPose {
            position: Vec3::new(0.0, 5.0, 0.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
        };
        let view = pose.view_matrix();
        assert!(view.to_cols_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn wrap_angle_handles_negatives() {
        assert!((wrap_angle(-0.05) - (TAU - 0.05)).abs() < 1e-5);
        assert_eq!(wrap_angle(TAU), 0.0);
        assert!(wrap_angle(-1e-9) < TAU);
    }
}
