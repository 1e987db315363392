// Source provider boundary

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::IndexError;

/// Supplies a checked-out tree to index. Acquisition failures are fatal and
/// surface before any extraction starts.
pub trait SourceProvider {
    fn acquire(&self) -> Result<SourceTree, IndexError>;

    /// Label for logs
    fn describe(&self) -> String;
}

/// An acquired tree. Ephemeral trees are deleted when released or dropped.
#[derive(Debug)]
pub enum SourceTree {
    /// A directory owned by someone else, left untouched
    Borrowed(PathBuf),
    /// A temporary checkout owned by the run
    Ephemeral(TempDir),
}

impl SourceTree {
    /// New empty ephemeral tree for a provider to populate
    pub fn ephemeral() -> Result<Self, IndexError> {
        let dir = tempfile::Builder::new().prefix("codeindex-src-").tempdir()?;
        Ok(SourceTree::Ephemeral(dir))
    }

    pub fn root(&self) -> &Path {
        match self {
            SourceTree::Borrowed(path) => path,
            SourceTree::Ephemeral(dir) => dir.path(),
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, SourceTree::Ephemeral(_))
    }

    /// Delete an ephemeral tree now, reporting failures instead of ignoring them
    pub fn release(self) -> Result<(), IndexError> {
        match self {
            SourceTree::Borrowed(_) => Ok(()),
            SourceTree::Ephemeral(dir) => {
                let path = dir.path().to_path_buf();
                dir.close()?;
                tracing::debug!("Released source tree {}", path.display());
                Ok(())
            }
        }
    }
}

/// A directory already on local disk
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    path: PathBuf,
}

impl LocalDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceProvider for LocalDirectory {
    fn acquire(&self) -> Result<SourceTree, IndexError> {
        let metadata = std::fs::metadata(&self.path).map_err(|source| IndexError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(IndexError::NotADirectory(self.path.clone()));
        }
        Ok(SourceTree::Borrowed(self.path.clone()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Copies a local directory into an ephemeral tree, standing in for a
/// provider that fetches remote checkouts
#[derive(Debug, Clone)]
pub struct SnapshotDirectory {
    path: PathBuf,
}

impl SnapshotDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceProvider for SnapshotDirectory {
    fn acquire(&self) -> Result<SourceTree, IndexError> {
        let source = LocalDirectory::new(&self.path).acquire()?;
        let tree = SourceTree::ephemeral()?;

        for entry in walkdir::WalkDir::new(source.root()).follow_links(false) {
            let entry = entry.map_err(|e| IndexError::SourceUnavailable {
                path: self.path.clone(),
                source: e.into(),
            })?;
            let Ok(relative) = entry.path().strip_prefix(source.root()) else {
                continue;
            };
            let target = tree.root().join(relative);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                std::fs::copy(entry.path(), &target)?;
            }
        }

        Ok(tree)
    }

    fn describe(&self) -> String {
        format!("snapshot of {}", self.path.display())
    }
}
