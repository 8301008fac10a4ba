use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{error, info, trace, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::config::{ScenePreset, ViewerConfig};
use crate::error::{RenderError, ViewerError};
use crate::input::{CountField, KeyInputState};
use crate::layout::LayoutPolicy;
use crate::loader::ModelSource;
use crate::render::GpuRenderer;
use crate::viewer::{TickStatus, Viewer};

/// Raised when no window or GPU surface can be created. The binary falls
/// back to headless mode on this error.
#[derive(Debug)]
pub struct WindowInitError {
    message: String,
}

impl WindowInitError {
    pub fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    pub fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

/// Maps a winit logical key to the lowercase `KeyboardEvent.key` name the
/// camera bindings use.
pub fn key_name(key: &Key) -> Option<String> {
    let name = match key {
        Key::Character(text) => return Some(text.to_lowercase()),
        Key::Named(NamedKey::ArrowLeft) => "arrowleft",
        Key::Named(NamedKey::ArrowRight) => "arrowright",
        Key::Named(NamedKey::ArrowUp) => "arrowup",
        Key::Named(NamedKey::ArrowDown) => "arrowdown",
        Key::Named(NamedKey::Backspace) => "backspace",
        Key::Named(NamedKey::Enter) => "enter",
        Key::Named(NamedKey::Escape) => "escape",
        Key::Named(NamedKey::Space) => " ",
        Key::Named(NamedKey::Shift) => "shift",
        Key::Named(NamedKey::Control) => "control",
        Key::Named(NamedKey::F1) => "f1",
        Key::Named(NamedKey::F2) => "f2",
        Key::Named(NamedKey::F3) => "f3",
        Key::Named(NamedKey::F4) => "f4",
        _ => return None,
    };
    Some(name.to_string())
}

/// Preset selected by a function key, if any.
pub fn scene_for_key(name: &str) -> Option<ScenePreset> {
    match name {
        "f1" => Some(ScenePreset::Simple),
        "f2" => Some(ScenePreset::Orbit),
        "f3" => Some(ScenePreset::Analyser),
        "f4" => Some(ScenePreset::Gallery),
        _ => None,
    }
}

/// What the window host needs to (re)build a scene.
#[derive(Debug, Clone)]
pub struct SceneOptions {
    pub preset: ScenePreset,
    pub source: ModelSource,
    /// Overrides the preset's layout policy when set.
    pub policy: Option<LayoutPolicy>,
    pub config_path: Option<PathBuf>,
    pub initial_count: Option<String>,
}

impl SceneOptions {
    pub fn viewer_config(&self) -> Result<ViewerConfig> {
        match &self.config_path {
            Some(path) => ViewerConfig::load(self.preset, path),
            None => Ok(self.preset.config()),
        }
    }

    pub fn policy_for(&self, config: &ViewerConfig) -> LayoutPolicy {
        self.policy.unwrap_or(config.layout.policy)
    }
}

/// Interactive winit host around a [`Viewer`].
pub struct ViewerApp {
    options: SceneOptions,
    viewer: Viewer,
    keys: KeyInputState,
    count: CountField,
    renderer: Option<GpuRenderer>,
    init_error: Option<WindowInitError>,
    last_error: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(options: SceneOptions) -> Result<Self> {
        let config = options.viewer_config()?;
        let count = count_field(&config, options.initial_count.as_deref());
        let mut viewer = Viewer::new(config);
        let policy = options.policy_for(viewer.config());
        viewer.start(options.source.clone(), policy);
        Ok(Self {
            options,
            viewer,
            keys: KeyInputState::new(),
            count,
            renderer: None,
            init_error: None,
            last_error: None,
        })
    }

    /// Consumes the host and reports how the event loop ended.
    pub fn finish(self) -> Result<()> {
        if let Some(err) = self.init_error {
            return Err(err.into());
        }
        match self.last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn switch_scene(&mut self, preset: ScenePreset) -> Result<()> {
        if preset == self.options.preset {
            return Ok(());
        }
        info!("switching to {preset} scene");
        self.options.preset = preset;
        self.options.initial_count = None;

        let config = self.options.viewer_config()?;
        self.count = count_field(&config, None);
        let policy = self.options.policy_for(&config);
        let source = self.options.source.clone();
        match self.renderer.as_mut() {
            Some(renderer) => {
                renderer.set_scene(config.projection, &config.light);
                self.viewer.switch_scene(config, source, policy, renderer);
            }
            None => {
                self.viewer = Viewer::new(config);
                self.viewer.start(source, policy);
            }
        }
        self.update_title();
        Ok(())
    }

    fn handle_key(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(name) = key_name(&event.logical_key) else {
            return Ok(());
        };
        let pressed = event.state == ElementState::Pressed;
        self.keys.set_held(&name, pressed);
        if !pressed {
            return Ok(());
        }

        if name == "escape" {
            event_loop.exit();
            return Ok(());
        }
        if let Some(preset) = scene_for_key(&name) {
            return self.switch_scene(preset);
        }

        let edit = if name == "backspace" {
            self.count.backspace()
        } else {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => self.count.push(ch),
                _ => None,
            }
        };
        match edit {
            Some(Ok(count)) => info!("requested {count} instance(s)"),
            Some(Err(err)) => warn!("ignoring instance count: {err}"),
            None => return Ok(()),
        }
        self.update_title();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        match self
            .viewer
            .tick(&self.keys, self.count.requested(), renderer)
        {
            Ok(TickStatus::Rendered) => {}
            Ok(status) => trace!("nothing drawn ({status:?})"),
            Err(ViewerError::Render(RenderError::SurfaceLost)) => renderer.reconfigure(),
            Err(ViewerError::Render(RenderError::Timeout)) => {
                info!("Surface timeout; retrying next frame");
            }
            Err(ViewerError::Render(RenderError::OutOfMemory)) => {
                event_loop.exit();
                return Err(anyhow!("GPU is out of memory"));
            }
            Err(ViewerError::Render(err)) => warn!("frame dropped: {err}"),
            // Already logged; the window stays up so another scene can be
            // picked with the function keys.
            Err(ViewerError::Load { .. }) => {}
        }
        Ok(())
    }

    fn update_title(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.window().set_title(&format!(
                "orbit-viewer | {} | count: {}",
                self.options.preset,
                self.count.text()
            ));
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.last_error = Some(err);
        event_loop.exit();
    }
}

fn count_field(config: &ViewerConfig, text: Option<&str>) -> CountField {
    let max = config.layout.max_instances;
    match text {
        Some(text) => CountField::with_text(max, text),
        None => CountField::with_text(max, &config.layout.initial_count.to_string()),
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);

        let attrs = Window::default_attributes()
            .with_title("orbit-viewer")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.init_error = Some(WindowInitError::from_error("window", err));
                event_loop.exit();
                return;
            }
        };

        let config = self.viewer.config();
        match block_on(GpuRenderer::new(window, config.projection, &config.light)) {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                self.update_title();
            }
            Err(err) => {
                self.init_error = Some(WindowInitError::from_error("renderer", format!("{err:#}")));
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if window_id != renderer.window_id() {
            return;
        }

        let result = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => {
                renderer.resize(size);
                Ok(())
            }
            WindowEvent::Focused(false) => {
                self.keys.clear();
                Ok(())
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event, event_loop),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => Ok(()),
        };
        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(frame_loop) = self.viewer.frame_loop() {
            info!(
                "rendered {} frame(s) with {} instance(s)",
                frame_loop.frame_index(),
                frame_loop.applied_count()
            );
        }
        match self.renderer.as_mut() {
            Some(renderer) => self.viewer.shutdown(renderer),
            None => self.viewer.stop(),
        }
    }
}
