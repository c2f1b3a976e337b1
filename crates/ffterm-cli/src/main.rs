//! ffterm - interactive ffmpeg shell
//!
//! Usage:
//!   ffterm --input clip.mov              Stage clip.mov, write outputs to .
//!   ffterm -i a.mp4 -i b.wav --out-dir out
//!
//! Each line read from stdin is run as a shell command. Files the engine
//! generates while processing a staged input are written to the output
//! directory.

mod engine;
mod surface;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ffterm::{GeneratedFile, GeneratedFilesHandler, Shell, ShellConfig, StagedFile};

use crate::engine::ProcessEngine;
use crate::surface::StdioSurface;

/// ffterm - run ffmpeg commands against staged input files
#[derive(Parser, Debug)]
#[command(name = "ffterm")]
#[command(about = "Interactive shell that runs ffmpeg against staged input files")]
struct Args {
    /// Host file to stage, available to commands under its file name
    #[arg(short, long = "input", value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// Directory that receives generated files
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Sandbox directory used as the engine filesystem (temporary if unset)
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Shell configuration file (JSON)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,
}

/// Writes every generated file into a host directory.
#[derive(Debug)]
struct OutputDir {
    dir: PathBuf,
}

#[async_trait]
impl GeneratedFilesHandler for OutputDir {
    async fn on_generated_files(&self, files: &[GeneratedFile]) {
        for file in files {
            let target = self.dir.join(&file.name);
            match tokio::fs::write(&target, &file.data).await {
                Ok(()) => tracing::info!(
                    path = %target.display(),
                    mime_type = %file.mime_type,
                    bytes = file.data.len(),
                    "wrote generated file"
                ),
                Err(e) => tracing::warn!(
                    path = %target.display(),
                    error = %e,
                    "cannot write generated file"
                ),
            }
        }
    }
}

fn staged_input(path: &Path) -> anyhow::Result<StagedFile> {
    let Some(name) = path.file_name() else {
        bail!("{} has no file name", path.display());
    };
    if !path.is_file() {
        bail!("{} is not a file", path.display());
    }
    Ok(StagedFile::from_path(name.to_string_lossy(), path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ShellConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ShellConfig::default(),
    };

    let engine = match &args.workdir {
        Some(dir) => ProcessEngine::in_dir(dir),
        None => ProcessEngine::temporary().context("creating sandbox directory")?,
    }
    .with_program(&args.ffmpeg);
    tracing::debug!(root = %engine.root().display(), "sandbox ready");

    let staged = args
        .inputs
        .iter()
        .map(PathBuf::as_path)
        .map(staged_input)
        .collect::<anyhow::Result<Vec<_>>>()?;

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let mut shell = Shell::builder()
        .config(config)
        .engine(engine)
        .staged_files(staged)
        .on_generated_files(OutputDir {
            dir: args.out_dir.clone(),
        })
        .build();
    shell.mount(StdioSurface::new());

    if !shell.setup().await {
        tracing::warn!(
            program = %args.ffmpeg,
            "engine failed to load; ffmpeg commands are unavailable"
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        shell.submit(&line).await?;
    }

    shell.dispose();
    Ok(())
}
