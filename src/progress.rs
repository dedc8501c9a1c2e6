//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche delle pipeline.
//!
//! ## Componenti principali:
//! - `ProgressManager`: spinner con `indicatif` (nascosto se disabilitato)
//! - `ConversionStats`: directory visitate, file convertiti/saltati/copiati
//! - `RenameStats`: file rinominati e file ignorati
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] 42 files | ✅ 101_title-of-first-song.flac
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a pipeline run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a spinner, or a hidden bar when `visible` is false
    pub fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} files | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Count one file and show a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Counters of a conversion run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    pub directories: usize,
    pub files_converted: usize,
    pub files_skipped: usize,
    pub files_copied: usize,
    pub bytes_copied: u64,
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Directories: {} | Converted: {} | Skipped: {} | Copied: {} ({})",
            self.directories,
            self.files_converted,
            self.files_skipped,
            self.files_copied,
            FileManager::format_size(self.bytes_copied)
        )
    }
}

/// Counters of a rename run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameStats {
    pub directories: usize,
    pub files_renamed: usize,
    pub files_ignored: usize,
}

impl RenameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Directories: {} | Renamed: {} | Ignored: {}",
            self.directories, self.files_renamed, self.files_ignored
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_counts() {
        let progress = ProgressManager::new(false);
        progress.update("a");
        progress.update("b");
        assert_eq!(progress.position(), 2);
        progress.finish("done");
    }

    #[test]
    fn test_summaries() {
        let stats = ConversionStats {
            directories: 2,
            files_converted: 10,
            files_skipped: 1,
            files_copied: 1,
            bytes_copied: 2048,
        };
        assert_eq!(
            stats.format_summary(),
            "Directories: 2 | Converted: 10 | Skipped: 1 | Copied: 1 (2.00 KB)"
        );

        let rename = RenameStats {
            directories: 1,
            files_renamed: 3,
            files_ignored: 2,
        };
        assert_eq!(
            rename.format_summary(),
            "Directories: 1 | Renamed: 3 | Ignored: 2"
        );
    }
}
