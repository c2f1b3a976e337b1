//! Files exchanged between the caller and the engine filesystem.

use std::path::PathBuf;
use std::sync::Arc;

use crate::mime::mime_type_for_name;

/// Where a staged file's bytes come from.
#[derive(Debug, Clone)]
pub enum StagedData {
    /// Bytes already in memory
    Bytes(Arc<[u8]>),
    /// A file on the host filesystem, read when the file is staged
    Path(PathBuf),
}

impl StagedData {
    /// Produce the bytes to write into the engine.
    pub async fn materialize(&self) -> std::io::Result<Vec<u8>> {
        match self {
            StagedData::Bytes(bytes) => Ok(bytes.to_vec()),
            StagedData::Path(path) => tokio::fs::read(path).await,
        }
    }
}

/// An input file made available to the engine under a fixed name.
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// Name inside the engine filesystem
    pub name: String,
    /// Byte source
    pub data: StagedData,
    /// Content type as reported by the caller
    pub mime_type: String,
}

impl StagedFile {
    /// Stage in-memory bytes. The content type is inferred from the name.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        Self {
            mime_type: mime_type_for_name(&name).to_string(),
            data: StagedData::Bytes(data.into()),
            name,
        }
    }

    /// Stage a host file under `name`. The content type is inferred from the name.
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            mime_type: mime_type_for_name(&name).to_string(),
            data: StagedData::Path(path.into()),
            name,
        }
    }

    /// Override the content type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// A file discovered in the engine filesystem after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Entry name in the engine's root directory
    pub name: String,
    /// File contents
    pub data: Vec<u8>,
    /// Content type inferred from the name's extension
    pub mime_type: String,
}

impl GeneratedFile {
    /// Package bytes read from the engine, inferring the content type.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            mime_type: mime_type_for_name(&name).to_string(),
            data,
            name,
        }
    }
}
