//! Model loading as a single-shot background operation.
//!
//! A load is started with [`spawn_load`], which returns a [`PendingLoad`]. The
//! loader thread owns the matching [`LoadCompleter`] and hands back exactly one
//! [`LoadResult`]; the receiving side can poll it once per frame or block on it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use glam::Vec3;
use log::{debug, info};
use parking_lot::{Condvar, Mutex};

use crate::error::LoadError;
use crate::model::{ModelNode, ModelTemplate, Transform};
use crate::obj::parse_obj;
use crate::primitives::primitive_scene;

pub type LoadResult = Result<ModelTemplate, LoadError>;

/// Where a model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    File(PathBuf),
    /// The built-in cube and sphere.
    Primitives,
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::File(path) => write!(f, "{}", path.display()),
            ModelSource::Primitives => f.write_str("<primitives>"),
        }
    }
}

impl From<PathBuf> for ModelSource {
    fn from(path: PathBuf) -> Self {
        ModelSource::File(path)
    }
}

impl From<&Path> for ModelSource {
    fn from(path: &Path) -> Self {
        ModelSource::File(path.to_path_buf())
    }
}

impl From<&str> for ModelSource {
    fn from(path: &str) -> Self {
        ModelSource::File(PathBuf::from(path))
    }
}

/// Turns a [`ModelSource`] into a template. Called off the render thread.
pub trait ModelLoader: Send + Sync {
    fn load(&self, source: &ModelSource) -> LoadResult;
}

/// Loads `.obj` files from disk and the built-in primitives.
#[derive(Debug, Clone, Copy)]
pub struct DefaultLoader {
    scale: f32,
}

impl DefaultLoader {
    pub fn new(scale: f32) -> Self {
        Self { scale }
    }

    fn load_file(&self, path: &Path) -> LoadResult {
        let is_obj = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"));
        if !is_obj {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mesh = parse_obj(&contents).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        if mesh.indices.is_empty() {
            return Err(LoadError::Empty { name });
        }
        let node = ModelNode::new(name.clone(), Arc::new(mesh));
        Ok(ModelTemplate::new(name, self.root(), vec![node]))
    }

    fn root(&self) -> Transform {
        Transform::default().with_scale(Vec3::splat(self.scale))
    }
}

impl Default for DefaultLoader {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ModelLoader for DefaultLoader {
    fn load(&self, source: &ModelSource) -> LoadResult {
        match source {
            ModelSource::File(path) => self.load_file(path),
            ModelSource::Primitives => Ok(primitive_scene(self.scale)),
        }
    }
}

struct LoadSlot {
    result: Mutex<Option<LoadResult>>,
    ready: Condvar,
}

/// Producer half of a pending load. Completing consumes it; dropping it
/// without completing resolves the load to [`LoadError::Aborted`].
pub struct LoadCompleter {
    slot: Option<Arc<LoadSlot>>,
}

impl LoadCompleter {
    pub fn complete(mut self, result: LoadResult) {
        if let Some(slot) = self.slot.take() {
            fill(&slot, result);
        }
    }
}

impl Drop for LoadCompleter {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            fill(&slot, Err(LoadError::Aborted));
        }
    }
}

fn fill(slot: &LoadSlot, result: LoadResult) {
    *slot.result.lock() = Some(result);
    slot.ready.notify_all();
}

/// Consumer half of a pending load. Yields its result exactly once.
pub struct PendingLoad {
    slot: Arc<LoadSlot>,
    taken: bool,
}

impl PendingLoad {
    /// Returns the result if it has arrived and was not taken yet.
    pub fn try_take(&mut self) -> Option<LoadResult> {
        if self.taken {
            return None;
        }
        let result = self.slot.result.lock().take();
        self.taken = result.is_some();
        result
    }

    /// Blocks until the loader has finished. A result already taken with
    /// [`PendingLoad::try_take`] is not delivered again.
    pub fn wait(self) -> LoadResult {
        if self.taken {
            return Err(LoadError::Aborted);
        }
        let mut guard = self.slot.result.lock();
        loop {
            if let Some(result) = guard.take() {
                return result;
            }
            self.slot.ready.wait(&mut guard);
        }
    }

    pub fn is_taken(&self) -> bool {
        self.taken
    }
}

impl fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingLoad")
            .field("taken", &self.taken)
            .finish()
    }
}

/// Creates a connected completer / pending pair.
pub fn pending_load() -> (LoadCompleter, PendingLoad) {
    let slot = Arc::new(LoadSlot {
        result: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        LoadCompleter {
            slot: Some(Arc::clone(&slot)),
        },
        PendingLoad { slot, taken: false },
    )
}

/// Runs `loader` for `source` on a background thread.
pub fn spawn_load(loader: Arc<dyn ModelLoader>, source: ModelSource) -> PendingLoad {
    let (completer, pending) = pending_load();
    let spawned = thread::Builder::new()
        .name("model-loader".into())
        .spawn(move || {
            debug!("loading {source}");
            let result = loader.load(&source);
            if let Ok(template) = &result {
                info!(
                    "loaded {} ({} node(s), {} triangles)",
                    template.name(),
                    template.nodes().len(),
                    template.triangle_count()
                );
            }
            completer.complete(result);
        });
    // A failed spawn drops the closure, and with it the completer, which
    // resolves the load as aborted.
    if let Err(err) = spawned {
        log::error!("failed to spawn model loader thread: {err}");
    }
    pending
}
