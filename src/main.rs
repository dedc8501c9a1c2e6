//! # Audiotree - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (`RUST_LOG` supportato)
//! - Caricamento della configurazione (file JSON + override da CLI)
//! - Avvio della pipeline richiesta (`convert` o `rename`)
//!
//! ## Esempio di utilizzo:
//! ```bash
//! audiotree convert ./music/flac ./music/ogg --to ogg --workers 8
//! audiotree rename ./incoming ./library --layout by-metadata
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use audiotree::{
    AudioFormat, CollisionPolicy, Config, Converter, ExitCheck, LoftyTags, RenameLayout, Renamer,
};

#[derive(Parser)]
#[command(name = "audiotree")]
#[command(about = "Convert or rename whole trees of audio files")]
struct Cli {
    /// JSON configuration file (default: <config dir>/audiotree/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not draw the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Directories {
    /// Source directory, walked recursively
    source: PathBuf,

    /// Destination directory (may be the same as the source)
    destination: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every file of one format into another, copying tags and other files
    Convert {
        #[command(flatten)]
        dirs: Directories,

        /// Input format
        #[arg(long, value_enum)]
        from: Option<AudioFormat>,

        /// Output format (ogg or mp3)
        #[arg(long, value_enum)]
        to: Option<AudioFormat>,

        /// Number of parallel encoders (default: number of CPUs)
        #[arg(short, long)]
        workers: Option<usize>,

        /// oggenc quality (-1..10)
        #[arg(long, allow_negative_numbers = true)]
        ogg_quality: Option<i8>,

        /// lame VBR quality (0..9)
        #[arg(long)]
        mp3_vbr: Option<u8>,

        /// Leave outputs that already exist untouched
        #[arg(long)]
        skip_existing: bool,

        /// Trust the output file alone, ignoring encoder exit codes
        #[arg(long)]
        lenient_exit: bool,
    },

    /// Rename and move files according to their tags
    Rename {
        #[command(flatten)]
        dirs: Directories,

        /// Format of the files to rename
        #[arg(long, value_enum)]
        format: Option<AudioFormat>,

        /// Destination layout
        #[arg(long, value_enum)]
        layout: Option<RenameLayout>,

        /// What to do when the destination file already exists
        #[arg(long, value_enum)]
        on_collision: Option<CollisionPolicy>,
    },
}

async fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!(
                    "Config file does not exist: {}",
                    path.display()
                ));
            }
            Config::from_file(path).await
        }
        None => match Config::default_path() {
            Some(path) => Config::from_file(&path).await,
            None => Ok(Config::default()),
        },
    }
}

/// `RUST_LOG` directives when set and valid, otherwise INFO (DEBUG with `--verbose`)
fn log_filter(rust_log: Option<String>, verbose: bool) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok(), cli.verbose))
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = load_config(cli.config.as_ref()).await?;
    if cli.no_progress {
        config.show_progress = false;
    }

    match cli.command {
        Command::Convert {
            dirs,
            from,
            to,
            workers,
            ogg_quality,
            mp3_vbr,
            skip_existing,
            lenient_exit,
        } => {
            if let Some(from) = from {
                config.source_format = from;
            }
            if let Some(to) = to {
                config.target_format = to;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(quality) = ogg_quality {
                config.ogg_quality = quality;
            }
            if let Some(vbr) = mp3_vbr {
                config.mp3_vbr_quality = vbr;
            }
            config.skip_existing |= skip_existing;
            if lenient_exit {
                config.exit_check = ExitCheck::OutputOnly;
            }

            let converter = Converter::new(config, Arc::new(LoftyTags::new()))?;
            converter.check_dependencies().await?;
            let stats = converter.run(&dirs.source, &dirs.destination).await?;
            info!("Done: {}", stats.format_summary());
        }
        Command::Rename {
            dirs,
            format,
            layout,
            on_collision,
        } => {
            if let Some(format) = format {
                config.source_format = format;
            }
            if let Some(layout) = layout {
                config.rename_layout = layout;
            }
            if let Some(policy) = on_collision {
                config.collision_policy = policy;
            }

            let renamer = Renamer::new(config, Arc::new(LoftyTags::new()))?;
            let stats = renamer.run(&dirs.source, &dirs.destination).await?;
            info!("Done: {}", stats.format_summary());
        }
    }

    Ok(())
}
