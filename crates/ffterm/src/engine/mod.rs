//! Processing engine contract.
//!
//! The shell never talks to a media engine directly. It goes through the
//! [`Engine`] trait, which covers the engine's lifecycle, a single
//! suspending `run` call that streams log lines, and the primitives of the
//! engine's private virtual filesystem.
//!
//! [`MemoryEngine`] is an in-memory implementation with a scriptable run
//! behaviour.

mod memory;

pub use memory::{MemoryEngine, MemoryFs};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Control message an engine logs when a run ends.
pub const END_OF_RUN_MARKER: &str = "FFMPEG_END";

/// Errors reported by an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine has not been loaded yet
    #[error("engine not loaded")]
    NotLoaded,
    /// Loading the engine failed
    #[error("engine failed to load: {0}")]
    LoadFailed(String),
    /// A run failed
    #[error("run failed: {0}")]
    Run(String),
    /// File or directory not found in the engine filesystem
    #[error("no such file or directory: {0}")]
    NotFound(String),
    /// Name is not a valid entry of the engine filesystem
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A file operation was given a directory
    #[error("is a directory: {0}")]
    IsDirectory(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A log line emitted by the engine while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Log channel, e.g. `"fferr"` or `"ffout"`
    pub kind: String,
    /// The message text
    pub message: String,
}

impl LogLine {
    /// Create a log line.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// One item of a run's event stream.
#[derive(Debug)]
pub enum RunEvent {
    /// A log line produced while running
    Log(LogLine),
    /// The run completed; no further events follow
    Exited(Result<(), EngineError>),
}

/// The event stream of a single run.
pub type RunEvents<'a> = BoxStream<'a, RunEvent>;

/// Lifecycle of the engine as seen by the shell.
///
/// `Ready` and `LoadFailed` are terminal for a given load attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineState {
    /// `load` has not been called
    #[default]
    Unloaded,
    /// `load` is in progress
    Loading,
    /// The engine loaded successfully
    Ready,
    /// The engine failed to load
    LoadFailed,
}

impl EngineState {
    /// Returns true once the engine can accept runs.
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Ready)
    }
}

/// A processing engine with a private virtual filesystem.
///
/// Filesystem names are entries of the engine's root directory; the shell
/// only ever stages and collects root-level files.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Load the engine. Suspends until the engine is usable or has failed.
    async fn load(&self) -> Result<(), EngineError>;

    /// Run the engine with a command-line style argument vector.
    ///
    /// The returned stream yields log lines as they are produced and ends
    /// with [`RunEvent::Exited`]. A stream that ends without an `Exited`
    /// event is treated as a successful run.
    fn run(&self, args: Vec<String>) -> RunEvents<'_>;

    /// Write a file into the engine filesystem, replacing any existing one.
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Read a file from the engine filesystem.
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// List the entry names of a directory in the engine filesystem.
    async fn list_directory(&self, path: &str) -> Result<Vec<String>, EngineError>;
}

#[async_trait]
impl<E: Engine + ?Sized> Engine for std::sync::Arc<E> {
    async fn load(&self) -> Result<(), EngineError> {
        (**self).load().await
    }

    fn run(&self, args: Vec<String>) -> RunEvents<'_> {
        (**self).run(args)
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        (**self).write_file(name, data).await
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        (**self).read_file(name).await
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<String>, EngineError> {
        (**self).list_directory(path).await
    }
}
