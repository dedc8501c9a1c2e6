//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery dei brani.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva (pre-order) delle directory sorgente con `walkdir`
//! - Partizione dei file di ogni directory: formato richiesto vs. tutto il resto
//! - Copia byte-per-byte dei file "misc" (copertine, cue, log)
//! - Spostamento dei file con fallback copia + rimozione tra filesystem diversi
//! - Formattazione human-readable delle dimensioni
//!
//! ## Politiche:
//! - Confronto dell'estensione case-insensitive (`.FLAC` == `.flac`)
//! - Nessun filtro per file nascosti o symlink: un symlink a file è un file,
//!   i symlink a directory non vengono seguiti
//! - Ordine dei file all'interno di una directory: quello nativo del filesystem
//!
//! ## Esempio:
//! ```ignore
//! for batch in DirectoryWalker::new(&source, "flac") {
//!     let batch = batch?;
//!     println!("{}: {} flac, {} misc", batch.directory.display(), batch.matches.len(), batch.misc.len());
//! }
//! ```

use crate::error::AudioTreeError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file found by the walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path relative to the walked root
    pub relative: PathBuf,
    /// Lowercase extension, empty when the file has none
    pub extension: String,
}

impl FileEntry {
    fn new(root: &Path, path: PathBuf) -> Self {
        let relative = path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            path,
            relative,
            extension,
        }
    }

    /// File name as a lossy string, for log messages
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}

/// The files of one directory, split by extension
#[derive(Debug, Clone)]
pub struct DirectoryBatch {
    pub directory: PathBuf,
    pub matches: Vec<FileEntry>,
    pub misc: Vec<FileEntry>,
}

impl DirectoryBatch {
    /// True when the directory holds at least one file
    pub fn has_files(&self) -> bool {
        !self.matches.is_empty() || !self.misc.is_empty()
    }
}

/// Lazy pre-order walk yielding one `DirectoryBatch` per directory
pub struct DirectoryWalker {
    root: PathBuf,
    extension: String,
    inner: walkdir::IntoIter,
}

impl DirectoryWalker {
    pub fn new(root: &Path, extension: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            extension: extension.trim_start_matches('.').to_lowercase(),
            inner: WalkDir::new(root).into_iter(),
        }
    }

    fn read_batch(&self, directory: &Path) -> Result<DirectoryBatch> {
        let mut matches = Vec::new();
        let mut misc = Vec::new();

        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            if path.is_dir() {
                continue;
            }

            let is_match = has_extension(&path, &self.extension);
            let file = FileEntry::new(&self.root, path);
            if is_match {
                matches.push(file);
            } else {
                misc.push(file);
            }
        }

        Ok(DirectoryBatch {
            directory: directory.to_path_buf(),
            matches,
            misc,
        })
    }
}

impl Iterator for DirectoryWalker {
    type Item = Result<DirectoryBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(AudioTreeError::Walk(e).into())),
            };

            if entry.file_type().is_dir() {
                return Some(self.read_batch(entry.path()));
            }
        }
    }
}

/// Case-insensitive check of the `.<extension>` suffix of the file name
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .map(|name| {
            name.to_string_lossy()
                .to_lowercase()
                .ends_with(&format!(".{}", extension.to_lowercase()))
        })
        .unwrap_or(false)
}

/// Manages single-file operations
pub struct FileManager;

impl FileManager {
    /// Copy a file byte for byte, returning the number of bytes written.
    /// Copying a file onto itself is a no-op.
    pub async fn copy_file(from: &Path, to: &Path) -> Result<u64> {
        if from == to {
            return Ok(0);
        }
        Ok(tokio::fs::copy(from, to).await?)
    }

    /// Move a file, falling back to copy + remove when a plain rename fails
    /// (e.g. across mount points)
    pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
        if from == to {
            return Ok(());
        }

        if tokio::fs::rename(from, to).await.is_ok() {
            return Ok(());
        }

        let fallback = async {
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        };

        fallback.await.map_err(|source| {
            AudioTreeError::MoveFailed {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"data").unwrap();
    }

    fn names(entries: &[FileEntry]) -> Vec<String> {
        let mut names: Vec<String> = entries.iter().map(FileEntry::display_name).collect();
        names.sort();
        names
    }

    #[test]
    fn test_has_extension_is_case_insensitive() {
        assert!(has_extension(Path::new("/a/song.flac"), "flac"));
        assert!(has_extension(Path::new("/a/SONG.FLAC"), "flac"));
        assert!(has_extension(Path::new("/a/song.Flac"), "FLAC"));
        assert!(!has_extension(Path::new("/a/song.flac.bak"), "flac"));
        assert!(!has_extension(Path::new("/a/flac"), "flac"));
    }

    #[test]
    fn test_walker_partitions_each_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("rock/album/01.flac"));
        touch(&root.join("rock/album/02.FLAC"));
        touch(&root.join("rock/album/cover.jpg"));
        touch(&root.join("notes.txt"));
        fs::create_dir_all(root.join("empty")).unwrap();

        let batches: Vec<DirectoryBatch> = DirectoryWalker::new(root, "flac")
            .collect::<Result<_>>()
            .unwrap();

        // root, empty, rock, rock/album
        assert_eq!(batches.len(), 4);
        assert_eq!(batches[0].directory, root);
        assert_eq!(names(&batches[0].misc), vec!["notes.txt"]);
        assert!(batches[0].matches.is_empty());

        let album = batches
            .iter()
            .find(|b| b.directory == root.join("rock/album"))
            .unwrap();
        assert_eq!(names(&album.matches), vec!["01.flac", "02.FLAC"]);
        assert_eq!(names(&album.misc), vec!["cover.jpg"]);
        assert!(album
            .matches
            .iter()
            .all(|f| f.extension == "flac" && f.relative.starts_with("rock/album")));

        let empty = batches
            .iter()
            .find(|b| b.directory == root.join("empty"))
            .unwrap();
        assert!(!empty.has_files());
    }

    #[test]
    fn test_walker_is_pre_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("a/b/c/song.flac"));

        let dirs: Vec<PathBuf> = DirectoryWalker::new(root, "flac")
            .map(|b| b.unwrap().directory)
            .collect();
        assert_eq!(
            dirs,
            vec![
                root.to_path_buf(),
                root.join("a"),
                root.join("a/b"),
                root.join("a/b/c")
            ]
        );
    }

    #[tokio::test]
    async fn test_copy_file_keeps_bytes() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("cover.jpg");
        let to = temp.path().join("copy.jpg");
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fs::write(&from, &bytes).unwrap();

        let written = FileManager::copy_file(&from, &to).await.unwrap();
        assert_eq!(written, 4096);
        assert_eq!(fs::read(&to).unwrap(), bytes);

        // Same path: nothing happens, content survives
        FileManager::copy_file(&from, &from).await.unwrap();
        assert_eq!(fs::read(&from).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_move_file() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("in.flac");
        let to = temp.path().join("out.flac");
        fs::write(&from, b"audio").unwrap();

        FileManager::move_file(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"audio");
    }

    #[tokio::test]
    async fn test_move_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let err = FileManager::move_file(&temp.path().join("nope"), &temp.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AudioTreeError>(),
            Some(AudioTreeError::MoveFailed { .. })
        ));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
