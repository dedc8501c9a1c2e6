//! # Pipeline Module
//!
//! Le due trasformazioni batch, separate in sottomoduli:
//! - `converter`: Conversione ricorsiva di formato con worker paralleli
//! - `renamer`: Rename/spostamento ricorsivo basato sui tag
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod converter;
pub mod path_resolver;
pub mod renamer;

pub use converter::Converter;
pub use path_resolver::PathMapper;
pub use renamer::Renamer;

use crate::error::AudioTreeError;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Resolve the source root: it must exist and be a directory
pub(crate) fn resolve_source(source: &Path) -> Result<PathBuf> {
    if !source.is_dir() {
        return Err(AudioTreeError::InvalidArguments(format!(
            "Cannot find source directory: {}",
            source.display()
        ))
        .into());
    }
    Ok(source.canonicalize()?)
}
