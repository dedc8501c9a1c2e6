//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path di output.
//! La radice sorgente viene sostituita dalla radice di destinazione,
//! le sottodirectory intermedie restano invariate.

use crate::error::AudioTreeError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maps paths under the source root onto the destination root
#[derive(Debug, Clone)]
pub struct PathMapper {
    source_root: PathBuf,
    destination_root: PathBuf,
}

impl PathMapper {
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// True when `directory` lies inside a destination nested in the source tree.
    /// Such directories hold pipeline output and must not be walked again.
    pub fn is_nested_output(&self, directory: &Path) -> bool {
        self.destination_root != self.source_root
            && self.destination_root.starts_with(&self.source_root)
            && directory.starts_with(&self.destination_root)
    }

    /// Path of `path` relative to the source root
    pub fn relative<'a>(&self, path: &'a Path) -> Result<&'a Path> {
        path.strip_prefix(&self.source_root)
            .map_err(|_| AudioTreeError::OutsideSourceRoot(path.to_path_buf()).into())
    }

    /// Mirrored location of a directory (or any path) under the destination root
    pub fn mirror_dir(&self, directory: &Path) -> Result<PathBuf> {
        Ok(self.destination_root.join(self.relative(directory)?))
    }

    /// Mirrored location of a file, same file name
    pub fn mirror(&self, path: &Path) -> Result<PathBuf> {
        self.mirror_dir(path)
    }

    /// Mirrored location of a file with its trailing extension replaced
    pub fn mirror_with_extension(&self, path: &Path, extension: &str) -> Result<PathBuf> {
        let resolved = self.mirror(path)?.with_extension(extension);
        debug!("Resolved output path: {} -> {}", path.display(), resolved.display());
        Ok(resolved)
    }
}
