//! In-memory engine with a scriptable run behaviour.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::{StreamExt, stream};

use super::{END_OF_RUN_MARKER, Engine, EngineError, LogLine, RunEvent, RunEvents};

/// Entries present in the root of a freshly initialized engine filesystem.
const ROOT_DIRECTORIES: &[&str] = &[".", "..", "tmp", "home", "dev", "proc"];

type Runner = dyn Fn(&[String], &mut MemoryFs) -> Result<Vec<LogLine>, EngineError> + Send + Sync;

/// Root directory of a [`MemoryEngine`].
///
/// Files keep their creation order, which is also their listing order.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: Vec<(String, Vec<u8>)>,
}

impl MemoryFs {
    /// Write a file, replacing the contents of an existing one.
    pub fn write(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        let name = name.into();
        let data = data.into();
        match self.files.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, contents)) => *contents = data,
            None => self.files.push((name, data)),
        }
    }

    /// Read a file's contents.
    pub fn read(&self, name: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, data)| data.as_slice())
    }

    /// Remove a file, returning its contents.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let index = self.files.iter().position(|(existing, _)| existing == name)?;
        Some(self.files.remove(index).1)
    }

    /// Returns true if a file with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.read(name).is_some()
    }

    /// File names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Default)]
struct State {
    loaded: bool,
    load_attempts: usize,
    fs: MemoryFs,
    runs: Vec<Vec<String>>,
}

/// An engine whose filesystem lives in memory.
///
/// The root directory lists `.`, `..`, `tmp`, `home`, `dev` and `proc`
/// followed by every file, mirroring an emscripten filesystem. What a run
/// does is decided by the runner closure; without one, runs succeed and
/// touch nothing.
///
/// # Example
///
/// ```rust,ignore
/// let engine = MemoryEngine::new().with_runner(|args, fs| {
///     if let Some(output) = args.last() {
///         fs.write(output.clone(), b"converted".to_vec());
///     }
///     Ok(vec![LogLine::new("fferr", "done")])
/// });
/// ```
pub struct MemoryEngine {
    state: Mutex<State>,
    runner: Option<Arc<Runner>>,
    load_failure: Option<String>,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("has_runner", &self.runner.is_some())
            .field("load_failure", &self.load_failure)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Create an engine with an empty filesystem and a no-op runner.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            runner: None,
            load_failure: None,
        }
    }

    /// Set the closure invoked for each run.
    ///
    /// It receives the argument vector and the filesystem, and returns the
    /// log lines to emit or the error the run fails with.
    pub fn with_runner<F>(mut self, runner: F) -> Self
    where
        F: Fn(&[String], &mut MemoryFs) -> Result<Vec<LogLine>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.runner = Some(Arc::new(runner));
        self
    }

    /// Make every `load` call fail with this message.
    pub fn with_load_failure(mut self, message: impl Into<String>) -> Self {
        self.load_failure = Some(message.into());
        self
    }

    /// Seed the filesystem with a file.
    pub fn with_file(self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.lock().fs.write(name, data);
        self
    }

    /// Argument vectors of every run so far, in order.
    pub fn runs(&self) -> Vec<Vec<String>> {
        self.lock().runs.clone()
    }

    /// Contents of a file in the engine filesystem.
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().fs.read(name).map(<[u8]>::to_vec)
    }

    /// Number of times `load` has been called.
    pub fn load_attempts(&self) -> usize {
        self.lock().load_attempts
    }

    /// Returns true once `load` has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_now(&self, args: Vec<String>) -> Vec<RunEvent> {
        let mut state = self.lock();
        if !state.loaded {
            return vec![RunEvent::Exited(Err(EngineError::NotLoaded))];
        }
        state.runs.push(args.clone());

        let outcome = match &self.runner {
            Some(runner) => runner(&args, &mut state.fs),
            None => Ok(Vec::new()),
        };

        match outcome {
            Ok(logs) => {
                let mut events: Vec<RunEvent> = logs.into_iter().map(RunEvent::Log).collect();
                events.push(RunEvent::Log(LogLine::new("info", END_OF_RUN_MARKER)));
                events.push(RunEvent::Exited(Ok(())));
                events
            }
            Err(e) => vec![RunEvent::Exited(Err(e))],
        }
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn load(&self) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.load_attempts += 1;
        if let Some(message) = &self.load_failure {
            return Err(EngineError::LoadFailed(message.clone()));
        }
        state.loaded = true;
        Ok(())
    }

    fn run(&self, args: Vec<String>) -> RunEvents<'_> {
        stream::once(async move { self.run_now(args) })
            .flat_map(stream::iter)
            .boxed()
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        let mut state = self.lock();
        if !state.loaded {
            return Err(EngineError::NotLoaded);
        }
        if ROOT_DIRECTORIES.contains(&name) || name.contains('/') {
            return Err(EngineError::InvalidPath(name.to_string()));
        }
        state.fs.write(name, data);
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let state = self.lock();
        if !state.loaded {
            return Err(EngineError::NotLoaded);
        }
        let entry = name.trim_start_matches('/');
        if ROOT_DIRECTORIES.contains(&entry) {
            return Err(EngineError::IsDirectory(name.to_string()));
        }
        state
            .fs
            .read(entry)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<String>, EngineError> {
        let state = self.lock();
        if !state.loaded {
            return Err(EngineError::NotLoaded);
        }
        match path {
            "/" | "" | "." => Ok(ROOT_DIRECTORIES
                .iter()
                .copied()
                .chain(state.fs.names())
                .map(str::to_string)
                .collect()),
            "/tmp" | "/home" | "/dev" | "/proc" => Ok(vec![".".to_string(), "..".to_string()]),
            other => Err(EngineError::NotFound(other.to_string())),
        }
    }
}
