//! Synchronization between staged files and the engine filesystem.
//!
//! Before a run, at most one staged file referenced by the command line is
//! written into the engine. After the run, the engine's root directory is
//! compared against a baseline ignore set (housekeeping entries plus every
//! staged name); whatever remains is reported as generated output.
//!
//! The comparison is a baseline snapshot, not a before/after diff. Any
//! root-level entry the engine creates that is neither housekeeping nor a
//! staged name is reported as output, including entries left over from
//! earlier runs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{Engine, EngineError};
use crate::files::{GeneratedFile, StagedFile};

/// Root entries of a freshly initialized engine filesystem.
pub const HOUSEKEEPING_ENTRIES: &[&str] = &[".", "..", "tmp", "home", "dev", "proc"];

/// Directory listed when collecting outputs.
pub const ROOT_DIRECTORY: &str = "/";

/// Errors raised while staging inputs or collecting outputs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading a staged file's source failed
    #[error("cannot read {name}: {source}")]
    Materialize {
        /// Staged file name
        name: String,
        /// Underlying IO error
        source: std::io::Error,
    },
    /// Writing a staged file into the engine failed
    #[error("cannot stage {name}: {source}")]
    Stage {
        /// Staged file name
        name: String,
        /// Engine error
        source: EngineError,
    },
    /// Listing the engine's root directory failed
    #[error("cannot list engine filesystem: {0}")]
    List(#[source] EngineError),
    /// Reading a generated entry failed
    #[error("cannot read generated file {name}: {source}")]
    Collect {
        /// Entry name
        name: String,
        /// Engine error
        source: EngineError,
    },
}

/// How the command line is searched for staged file names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingPolicy {
    /// A whitespace-delimited token must equal the file name
    #[default]
    ArgumentToken,
    /// The file name may appear anywhere in the line
    Substring,
}

impl StagingPolicy {
    /// Returns true if `line` references the staged file `name`.
    pub fn references(&self, line: &str, name: &str) -> bool {
        match self {
            StagingPolicy::ArgumentToken => references_by_token(line, name),
            StagingPolicy::Substring => references_by_substring(line, name),
        }
    }
}

/// Exact argument matching: some token of the line equals `name`.
pub fn references_by_token(line: &str, name: &str) -> bool {
    !name.is_empty() && line.split_whitespace().any(|token| token == name)
}

/// Whole-line containment.
///
/// Matches whenever `name` occurs inside the line, including inside another
/// token: `in.mp4` is found in `-i old_in.mp4` and in `dir/in.mp4.bak`.
pub fn references_by_substring(line: &str, name: &str) -> bool {
    !name.is_empty() && line.contains(name)
}

/// The first staged file referenced by `line`, in staged-file order.
pub fn find_referenced<'a>(
    line: &str,
    files: &'a [StagedFile],
    policy: StagingPolicy,
) -> Option<&'a StagedFile> {
    files.iter().find(|file| policy.references(line, &file.name))
}

/// Write the first staged file referenced by `line` into the engine.
///
/// At most one file is staged per call. Returns the staged file, or `None`
/// when the line references none.
pub async fn stage_if_referenced<'a>(
    engine: &dyn Engine,
    line: &str,
    files: &'a [StagedFile],
    policy: StagingPolicy,
) -> Result<Option<&'a StagedFile>, SyncError> {
    let Some(file) = find_referenced(line, files, policy) else {
        return Ok(None);
    };

    let bytes = file
        .data
        .materialize()
        .await
        .map_err(|source| SyncError::Materialize {
            name: file.name.clone(),
            source,
        })?;

    engine
        .write_file(&file.name, &bytes)
        .await
        .map_err(|source| SyncError::Stage {
            name: file.name.clone(),
            source,
        })?;

    tracing::debug!(name = %file.name, bytes = bytes.len(), "staged input file");
    Ok(Some(file))
}

/// Union of the housekeeping entries and every staged file name.
///
/// Recomputed before each collection since the staged set can change
/// between runs.
pub fn build_ignore_set<S: AsRef<str>>(
    housekeeping: &[S],
    files: &[StagedFile],
) -> HashSet<String> {
    housekeeping
        .iter()
        .map(|entry| entry.as_ref().to_string())
        .chain(files.iter().map(|file| file.name.clone()))
        .collect()
}

/// List the engine's root directory and read every entry not in `ignore`.
///
/// Entries keep the engine's listing order. Directories are skipped.
pub async fn diff_and_collect(
    engine: &dyn Engine,
    ignore: &HashSet<String>,
) -> Result<Vec<GeneratedFile>, SyncError> {
    let entries = engine
        .list_directory(ROOT_DIRECTORY)
        .await
        .map_err(SyncError::List)?;

    let mut generated = Vec::new();
    for name in entries.into_iter().filter(|name| !ignore.contains(name)) {
        let data = match engine.read_file(&name).await {
            Ok(data) => data,
            Err(EngineError::IsDirectory(_)) => {
                tracing::debug!(%name, "skipping directory");
                continue;
            }
            Err(source) => return Err(SyncError::Collect { name, source }),
        };
        generated.push(GeneratedFile::new(name, data));
    }

    tracing::debug!(count = generated.len(), "collected generated files");
    Ok(generated)
}
