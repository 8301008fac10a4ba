//! Host-facing facade tying the loader to the frame loop.
//!
//! A host calls [`Viewer::start`] once per scene and then [`Viewer::tick`]
//! every display refresh. The viewer stays in `Loading` until the model
//! arrives, then builds a [`FrameLoop`] and drives it. A failed load moves
//! it to `Failed`; the error is returned from exactly one tick and the
//! frame loop is never entered.

use std::mem;
use std::sync::Arc;

use log::{error, info};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::frame_loop::{FrameLoop, RenderService};
use crate::input::KeyInputState;
use crate::layout::{LayoutConfig, LayoutPolicy};
use crate::loader::{spawn_load, DefaultLoader, LoadResult, ModelLoader, ModelSource, PendingLoad};

/// Coarse lifecycle state reported by [`Viewer::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerStatus {
    Idle,
    Loading,
    Running,
    Failed,
}

/// What a single [`Viewer::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Nothing has been started, or the scene was stopped.
    Idle,
    /// Still waiting for the model.
    Loading,
    /// A frame was handed to the renderer.
    Rendered,
    /// The load failed earlier; nothing is drawn.
    Failed,
}

enum ViewerState {
    Idle,
    Loading {
        source: ModelSource,
        policy: LayoutPolicy,
        pending: PendingLoad,
    },
    Running(FrameLoop),
    Failed,
}

pub struct Viewer {
    config: ViewerConfig,
    /// Custom loader; `None` builds a [`DefaultLoader`] from the current
    /// config on every start.
    loader: Option<Arc<dyn ModelLoader>>,
    state: ViewerState,
}

impl Viewer {
    /// Creates a viewer that loads models with [`DefaultLoader`], scaled by
    /// `config.model_scale`.
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            loader: None,
            state: ViewerState::Idle,
        }
    }

    pub fn with_loader(config: ViewerConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            config,
            loader: Some(loader),
            state: ViewerState::Idle,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn status(&self) -> ViewerStatus {
        match self.state {
            ViewerState::Idle => ViewerStatus::Idle,
            ViewerState::Loading { .. } => ViewerStatus::Loading,
            ViewerState::Running(_) => ViewerStatus::Running,
            ViewerState::Failed => ViewerStatus::Failed,
        }
    }

    pub fn frame_loop(&self) -> Option<&FrameLoop> {
        match &self.state {
            ViewerState::Running(frame_loop) => Some(frame_loop),
            _ => None,
        }
    }

    /// Discards the current scene and begins loading `source` in the
    /// background.
    pub fn start(&mut self, source: impl Into<ModelSource>, policy: LayoutPolicy) {
        self.stop();
        let source = source.into();
        info!("loading {source} with {policy:?} layout");
        let loader: Arc<dyn ModelLoader> = match &self.loader {
            Some(loader) => Arc::clone(loader),
            None => Arc::new(DefaultLoader::new(self.config.model_scale)),
        };
        let pending = spawn_load(loader, source.clone());
        self.state = ViewerState::Loading {
            source,
            policy,
            pending,
        };
    }

    /// Polls the load and, once running, advances the scene by one frame.
    pub fn tick(
        &mut self,
        keys: &KeyInputState,
        requested: Option<usize>,
        renderer: &mut dyn RenderService,
    ) -> Result<TickStatus, ViewerError> {
        self.poll_load()?;
        match &mut self.state {
            ViewerState::Idle => Ok(TickStatus::Idle),
            ViewerState::Loading { .. } => Ok(TickStatus::Loading),
            ViewerState::Failed => Ok(TickStatus::Failed),
            ViewerState::Running(frame_loop) => {
                frame_loop.tick(keys, requested, renderer)?;
                Ok(TickStatus::Rendered)
            }
        }
    }

    /// Blocks until a pending load has resolved. Does nothing in any other
    /// state.
    pub fn wait_for_load(&mut self) -> Result<(), ViewerError> {
        match mem::replace(&mut self.state, ViewerState::Idle) {
            ViewerState::Loading {
                source,
                policy,
                pending,
            } => {
                let result = pending.wait();
                self.finish_load(source, policy, result)
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    /// Halts the frame loop and drops the instances and any pending load.
    /// A loader still running in the background has its result discarded.
    pub fn stop(&mut self) {
        match mem::replace(&mut self.state, ViewerState::Idle) {
            ViewerState::Running(mut frame_loop) => {
                frame_loop.stop();
                info!("scene stopped after {} frame(s)", frame_loop.frame_index());
            }
            ViewerState::Loading { source, .. } => {
                info!("abandoned load of {source}");
            }
            ViewerState::Idle | ViewerState::Failed => {}
        }
    }

    /// Stops the scene and lets `renderer` drop what it cached for it.
    pub fn shutdown(&mut self, renderer: &mut dyn RenderService) {
        self.stop();
        renderer.release_resources();
    }

    /// Tears down the current scene, adopts `config` and starts loading
    /// `source` under it.
    pub fn switch_scene(
        &mut self,
        config: ViewerConfig,
        source: impl Into<ModelSource>,
        policy: LayoutPolicy,
        renderer: &mut dyn RenderService,
    ) {
        self.shutdown(renderer);
        self.config = config;
        self.start(source, policy);
    }

    fn poll_load(&mut self) -> Result<(), ViewerError> {
        let result = match &mut self.state {
            ViewerState::Loading { pending, .. } => pending.try_take(),
            _ => None,
        };
        let Some(result) = result else {
            return Ok(());
        };
        match mem::replace(&mut self.state, ViewerState::Idle) {
            ViewerState::Loading { source, policy, .. } => self.finish_load(source, policy, result),
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    fn finish_load(
        &mut self,
        source: ModelSource,
        policy: LayoutPolicy,
        result: LoadResult,
    ) -> Result<(), ViewerError> {
        match result {
            Ok(template) => {
                let layout = LayoutConfig {
                    policy,
                    ..self.config.layout
                };
                info!("starting scene for {source}");
                self.state = ViewerState::Running(FrameLoop::new(
                    template,
                    &self.config.camera,
                    layout,
                ));
                Ok(())
            }
            Err(err) => {
                error!("failed to load model {source}: {err}");
                self.state = ViewerState::Failed;
                Err(ViewerError::Load {
                    source_name: source.to_string(),
                    error: err,
                })
            }
        }
    }
}
