use std::path::PathBuf;

use thiserror::Error;

/// Reasons a model could not be turned into a template.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ObjError,
    },
    #[error("unsupported model format for {path} (expected .obj)")]
    UnsupportedFormat { path: PathBuf },
    #[error("model {name} does not contain any geometry")]
    Empty { name: String },
    #[error("model loader exited without producing a result")]
    Aborted,
}

/// Syntax problems found while reading an OBJ document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObjError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("face references vertex {index} but only {available} are defined")]
    IndexOutOfRange { index: i64, available: usize },
    #[error("document does not define any vertices")]
    NoVertices,
}

/// A requested instance count that cannot be laid out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidCount {
    #[error("{0:?} is not a number")]
    NotANumber(String),
    #[error("instance count cannot be negative (got {0})")]
    Negative(f64),
    #[error("instance count {requested} exceeds the limit of {max}")]
    TooLarge { requested: f64, max: usize },
}

/// Failures reported by a render service for a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("render surface was lost or is outdated")]
    SurfaceLost,
    #[error("GPU is out of memory")]
    OutOfMemory,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Errors surfaced to the host driving a [`crate::Viewer`].
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to load model {source_name}: {error}")]
    Load {
        source_name: String,
        #[source]
        error: LoadError,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}
