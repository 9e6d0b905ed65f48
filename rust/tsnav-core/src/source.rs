//! Byte sources that resolve logical paths (`map/europe/sec+0000+0000.base`) to buffers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::trace;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("i/o error reading {path}: {source}")]
    Io { path: String, source: std::io::Error },
}

pub trait FileSource: Send + Sync {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError>;

    /// Logical paths of files directly inside `dir` ending in `extension`, sorted.
    fn list(&self, dir: &str, extension: &str) -> Vec<String>;
}

fn normalise(path: &str) -> String {
    path.trim_start_matches('/').replace('\\', "/")
}

fn join(dir: &str, name: &str) -> String {
    let dir = normalise(dir);
    if dir.is_empty() { name.to_string() } else { format!("{}/{}", dir.trim_end_matches('/'), name) }
}

/// Files under a directory on disk.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }
    pub fn root(&self) -> &Path { &self.root }
}

impl FileSource for DirectorySource {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let full = self.root.join(normalise(path));
        std::fs::read(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(path.to_string()),
            _ => SourceError::Io { path: path.to_string(), source: e },
        })
    }

    fn list(&self, dir: &str, extension: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.root.join(normalise(dir))) else { return Vec::new() };
        let mut out: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| name.ends_with(extension))
            .map(|name| join(dir, &name))
            .collect();
        out.sort();
        out
    }
}

/// In-memory files, mostly for tests and embedding.
#[derive(Default)]
pub struct MemorySource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(normalise(path), bytes);
    }

    pub fn with(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl FileSource for MemorySource {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.files.get(&normalise(path)).cloned().ok_or_else(|| SourceError::NotFound(path.to_string()))
    }

    fn list(&self, dir: &str, extension: &str) -> Vec<String> {
        let prefix = join(dir, "");
        self.files
            .keys()
            .filter(|k| k.starts_with(&prefix) && !k[prefix.len()..].contains('/') && k.ends_with(extension))
            .cloned()
            .collect()
    }
}

/// Layers sources; a source added later shadows earlier ones.
#[derive(Default)]
pub struct OverlaySource {
    layers: Vec<Box<dyn FileSource>>,
}

impl OverlaySource {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, layer: Box<dyn FileSource>) {
        self.layers.push(layer);
    }

    pub fn with(mut self, layer: impl FileSource + 'static) -> Self {
        self.push(Box::new(layer));
        self
    }

    pub fn len(&self) -> usize { self.layers.len() }
    pub fn is_empty(&self) -> bool { self.layers.is_empty() }
}

impl FileSource for OverlaySource {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        for (depth, layer) in self.layers.iter().enumerate().rev() {
            match layer.read_file(path) {
                Ok(bytes) => {
                    trace!(path, layer = depth, "resolved");
                    return Ok(bytes);
                }
                Err(SourceError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(SourceError::NotFound(path.to_string()))
    }

    fn list(&self, dir: &str, extension: &str) -> Vec<String> {
        let merged: BTreeSet<String> = self.layers.iter().flat_map(|l| l.list(dir, extension)).collect();
        merged.into_iter().collect()
    }
}
