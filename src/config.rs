//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` passata esplicitamente alle pipeline
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `source_format`: Formato dei file da elaborare (default: flac)
//! - `target_format`: Formato di output della conversione (default: ogg)
//! - `ogg_quality`: Qualità oggenc (-1..10, default: 5)
//! - `mp3_vbr_quality`: Qualità VBR di lame (0..9, default: 3)
//! - `workers`: Numero di worker paralleli (default: numero di CPU)
//! - `exit_check`: Come verificare il successo dell'encoder (default: strict)
//! - `skip_existing`: Salta i file già convertiti (default: false)
//! - `rename_layout`: Struttura delle directory nel rename (default: mirror)
//! - `collision_policy`: Comportamento se la destinazione esiste (default: overwrite)
//! - `show_progress`: Mostra la progress bar (default: true)
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     target_format: AudioFormat::Mp3,
//!     workers: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Audio container formats known to the pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Flac,
    Ogg,
    Mp3,
    Wav,
}

impl AudioFormat {
    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How the success of an external encoder is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExitCheck {
    /// Every stage must exit with status 0 and the output file must exist
    Strict,
    /// Only the presence of the output file counts (truncated output passes)
    OutputOnly,
}

/// Where renamed files are placed under the destination root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RenameLayout {
    /// Keep the relative directory of the source file
    Mirror,
    /// `<genre>/<artist>/<date>_<album>`
    ByMetadata,
}

/// What the renamer does when the computed destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Last write wins
    Overwrite,
    /// Abort with a collision error
    Fail,
}

/// Configuration shared by the converter and the renamer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Format of the files the pipelines work on
    pub source_format: AudioFormat,
    /// Output format of the conversion
    pub target_format: AudioFormat,
    /// oggenc `--quality` value
    pub ogg_quality: i8,
    /// lame `-V` value
    pub mp3_vbr_quality: u8,
    /// Number of parallel encoder workers
    pub workers: usize,
    /// Encoder success policy
    pub exit_check: ExitCheck,
    /// Leave conversion outputs that already exist untouched
    pub skip_existing: bool,
    /// Destination layout for renamed files
    pub rename_layout: RenameLayout,
    /// Renamer behaviour on an existing destination
    pub collision_policy: CollisionPolicy,
    /// Draw a progress spinner on stderr
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_format: AudioFormat::Flac,
            target_format: AudioFormat::Ogg,
            ogg_quality: 5,
            mp3_vbr_quality: 3,
            workers: num_cpus::get(),
            exit_check: ExitCheck::Strict,
            skip_existing: false,
            rename_layout: RenameLayout::Mirror,
            collision_policy: CollisionPolicy::Overwrite,
            show_progress: true,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(-1..=10).contains(&self.ogg_quality) {
            return Err(anyhow::anyhow!("Ogg quality must be between -1 and 10"));
        }

        if self.mp3_vbr_quality > 9 {
            return Err(anyhow::anyhow!("MP3 VBR quality must be between 0 and 9"));
        }

        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        Ok(())
    }

    /// Validate the parameters that only matter for conversion
    pub fn validate_conversion(&self) -> Result<()> {
        self.validate()?;

        if self.source_format == self.target_format {
            return Err(anyhow::anyhow!(
                "Source and target format are both '{}'",
                self.source_format
            ));
        }

        Ok(())
    }

    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("audiotree").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
