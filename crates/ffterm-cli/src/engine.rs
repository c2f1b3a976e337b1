//! Engine backed by the host `ffmpeg` binary.
//!
//! A sandbox directory plays the part of the engine's virtual filesystem:
//! staged inputs are written into it, `ffmpeg` runs with it as working
//! directory and whatever it leaves behind is listed back to the shell.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use ffterm::{END_OF_RUN_MARKER, Engine, EngineError, LogLine, RunEvent, RunEvents};

/// Directories created in the sandbox root on load.
const SANDBOX_DIRECTORIES: &[&str] = &["tmp", "home", "dev", "proc"];

/// Arguments placed before the user's arguments on every run. The sandbox
/// has no terminal to answer ffmpeg's overwrite question.
const DEFAULT_HOST_ARGS: &[&str] = &["-nostdin", "-y"];

const EVENT_BUFFER: usize = 64;

/// Runs a host program inside a sandbox directory.
pub struct ProcessEngine {
    root: PathBuf,
    program: String,
    host_args: Vec<String>,
    loaded: AtomicBool,
    // Removed on drop when the sandbox is temporary.
    _tempdir: Option<TempDir>,
}

impl std::fmt::Debug for ProcessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEngine")
            .field("root", &self.root)
            .field("program", &self.program)
            .field("loaded", &self.loaded.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ProcessEngine {
    /// Use a fresh temporary sandbox, removed when the engine is dropped.
    pub fn temporary() -> io::Result<Self> {
        let tempdir = tempfile::Builder::new().prefix("ffterm-").tempdir()?;
        let mut engine = Self::in_dir(tempdir.path());
        engine._tempdir = Some(tempdir);
        Ok(engine)
    }

    /// Use an existing directory as the sandbox. It is created on load.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            program: "ffmpeg".to_string(),
            host_args: DEFAULT_HOST_ARGS.iter().map(|s| s.to_string()).collect(),
            loaded: AtomicBool::new(false),
            _tempdir: None,
        }
    }

    /// Run a different program than `ffmpeg`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Replace the arguments placed before every run's arguments.
    pub fn with_host_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.host_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The sandbox directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        if self.loaded.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }

    /// Map a root-level entry name to its sandbox path.
    fn entry_path(&self, name: &str) -> Result<PathBuf, EngineError> {
        let name = name.strip_prefix('/').unwrap_or(name);
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(entry)), None) if !name.contains(['/', '\\']) => {
                Ok(self.root.join(entry))
            }
            _ => Err(EngineError::InvalidPath(name.to_string())),
        }
    }

    async fn prepare_root(&self) -> io::Result<()> {
        for dir in SANDBOX_DIRECTORIES {
            tokio::fs::create_dir_all(self.root.join(dir)).await?;
        }
        Ok(())
    }

    fn spawn(&self, args: &[String]) -> io::Result<Child> {
        Command::new(&self.program)
            .args(&self.host_args)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}

fn not_found(name: &str, e: io::Error) -> EngineError {
    if e.kind() == io::ErrorKind::NotFound {
        EngineError::NotFound(name.to_string())
    } else {
        EngineError::Io(e)
    }
}

async fn forward_lines<R>(reader: Option<R>, kind: &'static str, tx: mpsc::Sender<RunEvent>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(RunEvent::Log(LogLine::new(kind, line))).await.is_err() {
            break;
        }
    }
}

async fn drive(mut child: Child, program: String, tx: mpsc::Sender<RunEvent>) {
    let stdout = forward_lines(child.stdout.take(), "ffout", tx.clone());
    let stderr = forward_lines(child.stderr.take(), "fferr", tx.clone());
    tokio::join!(stdout, stderr);

    let result = match child.wait().await {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(EngineError::Run(format!("{program} exited with {status}"))),
        Err(e) => Err(EngineError::Io(e)),
    };
    tracing::debug!(ok = result.is_ok(), "process exited");

    let end = RunEvent::Log(LogLine::new("info", END_OF_RUN_MARKER));
    if tx.send(end).await.is_ok() {
        let _ = tx.send(RunEvent::Exited(result)).await;
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    async fn load(&self) -> Result<(), EngineError> {
        self.prepare_root().await?;

        let status = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| EngineError::LoadFailed(format!("cannot run {}: {e}", self.program)))?;
        if !status.success() {
            return Err(EngineError::LoadFailed(format!(
                "{} -version exited with {status}",
                self.program
            )));
        }

        tracing::info!(root = %self.root.display(), program = %self.program, "engine loaded");
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    fn run(&self, args: Vec<String>) -> RunEvents<'_> {
        if let Err(e) = self.ensure_loaded() {
            return stream::iter([RunEvent::Exited(Err(e))]).boxed();
        }

        let child = match self.spawn(&args) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(error = %e, program = %self.program, "failed to spawn");
                return stream::iter([RunEvent::Exited(Err(EngineError::Io(e)))]).boxed();
            }
        };

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(drive(child, self.program.clone(), tx));
        ReceiverStream::new(rx).boxed()
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        let path = self.entry_path(name)?;
        if path.is_dir() {
            return Err(EngineError::InvalidPath(name.to_string()));
        }
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.ensure_loaded()?;
        let path = self.entry_path(name)?;
        if path.is_dir() {
            return Err(EngineError::IsDirectory(name.to_string()));
        }
        tokio::fs::read(path).await.map_err(|e| not_found(name, e))
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<String>, EngineError> {
        self.ensure_loaded()?;
        let dir = match path {
            "/" | "" | "." => self.root.clone(),
            other => self.entry_path(other)?,
        };

        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| not_found(path, e))?;
        let mut names = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let mut entries = vec![".".to_string(), "..".to_string()];
        entries.extend(names);
        Ok(entries)
    }
}
