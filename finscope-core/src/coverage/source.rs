//! Directory listing and file reading used by the coverage scan.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    pub is_file: bool,
    pub is_dir: bool,
}

impl SourceEntry {
    pub fn file(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_file: true,
            is_dir: false,
        }
    }

    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_file: false,
            is_dir: true,
        }
    }
}

/// Access to component sources.
///
/// Both operations return [`Error::Io`](crate::Error::Io) when the path is
/// inaccessible.
pub trait SourceProvider: Send + Sync {
    /// List the direct children of `path`.
    fn list_files(&self, path: &Path) -> Result<Vec<SourceEntry>>;

    /// Read `path` as text.
    fn read_file(&self, path: &Path) -> Result<String>;
}

/// [`SourceProvider`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceProvider;

impl FsSourceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl SourceProvider for FsSourceProvider {
    fn list_files(&self, path: &Path) -> Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            entries.push(SourceEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_file: file_type.is_file(),
                is_dir: file_type.is_dir(),
            });
        }
        // read_dir order is platform dependent
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        // Invalid UTF-8 is left for the complexity scan to judge
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Recursively collect every file below `root`, sorted by path.
pub fn walk_files(provider: &dyn SourceProvider, root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in provider.list_files(&dir)? {
            let path = dir.join(&entry.name);
            if entry.is_dir {
                pending.push(path);
            } else if entry.is_file {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
