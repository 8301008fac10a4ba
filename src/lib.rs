//! Keyboard-driven orbit viewer.
//!
//! A [`Viewer`] loads a model in the background, clones it into a line or a
//! grid with [`InstanceLayoutManager`], and moves a spherical [`CameraRig`]
//! around it from held keys. Rendering goes through the [`RenderService`]
//! trait so the whole pipeline runs headless in tests; [`render::GpuRenderer`]
//! and the winit host in [`app`] provide the interactive window.

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod input;
pub mod layout;
pub mod loader;
pub mod model;
pub mod obj;
pub mod primitives;
pub mod render;
pub mod viewer;

pub use app::{SceneOptions, ViewerApp, WindowInitError};
pub use camera::{
    AxisConvention, AzimuthSense, CameraBounds, CameraConfig, CameraPose, CameraRig, CameraState,
    KeyBindings, PhiMode, Projection,
};
pub use config::{LightConfig, ScenePreset, ViewerConfig};
pub use error::{InvalidCount, LoadError, ObjError, RenderError, ViewerError};
pub use frame_loop::{FrameLoop, RenderFrame, RenderService};
pub use input::{parse_requested_count, validate_count, CountField, KeyInputState};
pub use layout::{
    BoundingExtent, FramingHint, InstanceLayoutManager, LayoutConfig, LayoutPolicy, LayoutResult,
};
pub use loader::{
    pending_load, spawn_load, DefaultLoader, LoadCompleter, LoadResult, ModelLoader, ModelSource,
    PendingLoad,
};
pub use model::{MeshData, MeshId, ModelInstance, ModelNode, ModelTemplate, Transform};
pub use obj::parse_obj;
pub use render::{GpuRenderer, SummaryRenderer};
pub use viewer::{TickStatus, Viewer, ViewerStatus};
