use std::fmt::Write as _;

use glam::Vec3;
use log::trace;

use crate::camera::{CameraPose, CameraState};
use crate::error::RenderError;
use crate::frame_loop::{RenderFrame, RenderService};

/// What the last rendered frame contained.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    pub frame_index: u64,
    pub pose: CameraPose,
    pub positions: Vec<Vec3>,
}

/// Headless render service that records frames instead of drawing them.
#[derive(Debug, Default)]
pub struct SummaryRenderer {
    frames_rendered: u64,
    last: Option<FrameSummary>,
}

impl SummaryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn last_frame(&self) -> Option<&FrameSummary> {
        self.last.as_ref()
    }

    /// Human-readable description of the last frame and the camera state
    /// that produced it.
    pub fn report(&self, camera: CameraState) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Camera: radius={:.2} theta={:.2} phi={:.2}",
            camera.radius, camera.theta, camera.phi
        );
        let Some(last) = &self.last else {
            out.push_str("No frames rendered\n");
            return out;
        };
        let _ = writeln!(
            out,
            "Camera position={} look_at={}",
            fmt_vec(last.pose.position),
            fmt_vec(last.pose.look_at)
        );
        let _ = writeln!(out, "Instances: {}", last.positions.len());
        for (index, position) in last.positions.iter().enumerate() {
            let _ = writeln!(out, " - #{index} pos={}", fmt_vec(*position));
        }
        let _ = writeln!(out, "Rendered {} frame(s)", self.frames_rendered);
        out
    }
}

impl RenderService for SummaryRenderer {
    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<(), RenderError> {
        trace!(
            "frame {}: {} instance(s), eye {:?}",
            frame.frame_index,
            frame.instances.len(),
            frame.pose.position
        );
        self.frames_rendered += 1;
        self.last = Some(FrameSummary {
            frame_index: frame.frame_index,
            pose: frame.pose,
            positions: frame.instances.iter().map(|i| i.position()).collect(),
        });
        Ok(())
    }

    fn release_resources(&mut self) {
        self.last = None;
    }
}

fn fmt_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}
