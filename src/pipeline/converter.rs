//! # Converter Pipeline
//!
//! Orchestratore della conversione ricorsiva di formato.
//!
//! ## Flusso per ogni directory (in ordine pre-order):
//! 1. Se contiene almeno un file, crea la directory speculare nella destinazione
//! 2. I file nel formato sorgente vengono distribuiti sul pool di worker:
//!    path mapping → encoder esterno → copia dei tag
//! 3. Attende il completamento di tutti i file della directory (barriera)
//! 4. Gli altri file (copertine, log, cue) vengono copiati in sequenza,
//!    per non saturare il disco mentre gli encoder usano la CPU
//!
//! ## Gestione concorrenza:
//! - Un unico semaforo per tutta l'esecuzione (default: numero di CPU)
//! - Ogni task tiene il permesso per encoding + copia tag
//!
//! ## Error handling:
//! - Il primo errore interrompe tutto; i task ancora in corso della directory
//!   vengono cancellati (e i processi encoder terminati)
//! - Nessun rollback dei file già scritti

use crate::{
    config::Config,
    encoder::Encoder,
    error::AudioTreeError,
    file_manager::{DirectoryBatch, DirectoryWalker, FileEntry, FileManager},
    pipeline::{path_resolver::PathMapper, resolve_source},
    platform::PlatformCommands,
    progress::{ConversionStats, ProgressManager},
    tags::TagAdapter,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Recursive format converter
pub struct Converter {
    config: Config,
    encoder: Arc<Encoder>,
    tags: Arc<dyn TagAdapter>,
    semaphore: Arc<Semaphore>,
}

impl Converter {
    /// Create a converter with the encoder selected from `config`
    pub fn new(config: Config, tags: Arc<dyn TagAdapter>) -> Result<Self> {
        config.validate_conversion()?;
        let encoder = Encoder::from_config(&config)?;
        Ok(Self::with_encoder(config, encoder, tags))
    }

    /// Create a converter around an explicit encoder
    pub fn with_encoder(config: Config, encoder: Encoder, tags: Arc<dyn TagAdapter>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
        Self {
            config,
            encoder: Arc::new(encoder),
            tags,
            semaphore,
        }
    }

    /// Fail early when an encoder program is not installed
    pub async fn check_dependencies(&self) -> Result<()> {
        let platform = PlatformCommands::instance();
        for program in self.encoder.descriptor().programs() {
            if !platform.is_command_available(program).await {
                return Err(AudioTreeError::MissingDependency(format!(
                    "{} is required for {} -> {} conversion",
                    program, self.config.source_format, self.config.target_format
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Convert every file under `source` into the mirrored tree under `destination`
    pub async fn run(&self, source: &Path, destination: &Path) -> Result<ConversionStats> {
        let source_root = resolve_source(source)?;
        if !destination.exists() {
            tokio::fs::create_dir_all(destination).await?;
            info!("Created output directory: {}", destination.display());
        }
        let destination_root = destination.canonicalize()?;

        info!(
            "Converting {} -> {} ({} -> {}, {} workers)",
            source_root.display(),
            destination_root.display(),
            self.config.source_format,
            self.config.target_format,
            self.config.workers
        );

        let mapper = PathMapper::new(source_root, destination_root);
        let progress = ProgressManager::new(self.config.show_progress);
        let mut stats = ConversionStats::new();

        let walker = DirectoryWalker::new(mapper.source_root(), self.config.source_format.extension());
        for batch in walker {
            let batch = batch?;
            if mapper.is_nested_output(&batch.directory) {
                debug!("Skipping output directory: {}", batch.directory.display());
                continue;
            }
            self.process_directory(&mapper, &batch, &progress, &mut stats)
                .await?;
        }

        progress.finish(&stats.format_summary());
        info!("=== Conversion Complete ===");
        info!("{}", stats.format_summary());

        Ok(stats)
    }

    async fn process_directory(
        &self,
        mapper: &PathMapper,
        batch: &DirectoryBatch,
        progress: &ProgressManager,
        stats: &mut ConversionStats,
    ) -> Result<()> {
        info!("Parsing '{}'", batch.directory.display());
        stats.directories += 1;

        if !batch.has_files() {
            return Ok(());
        }

        let target_dir = mapper.mirror_dir(&batch.directory)?;
        tokio::fs::create_dir_all(&target_dir).await?;

        if !batch.matches.is_empty() {
            self.convert_files(mapper, &batch.matches, progress, stats)
                .await?;
        }

        if !batch.misc.is_empty() {
            self.copy_files(mapper, &batch.misc, progress, stats).await?;
        }

        Ok(())
    }

    /// Encode all files of one directory in parallel and wait for every one
    async fn convert_files(
        &self,
        mapper: &PathMapper,
        files: &[FileEntry],
        progress: &ProgressManager,
        stats: &mut ConversionStats,
    ) -> Result<()> {
        let extension = self.config.target_format.extension();
        let mut tasks: JoinSet<Result<PathBuf>> = JoinSet::new();

        for file in files {
            let output = mapper.mirror_with_extension(&file.path, extension)?;

            if self.config.skip_existing && output.exists() {
                debug!("Output exists, skipping: {}", output.display());
                stats.files_skipped += 1;
                progress.update(&format!("⏩ {}: skipped", file.display_name()));
                continue;
            }

            // Finished tasks are reaped while waiting, so a failure stops the spawning
            let permit = loop {
                tokio::select! {
                    biased;
                    Some(joined) = tasks.join_next() => {
                        Self::record_converted(joined??, stats);
                    }
                    permit = self.semaphore.clone().acquire_owned() => break permit?,
                }
            };

            let encoder = self.encoder.clone();
            let tags = self.tags.clone();
            let progress = progress.clone();
            let input = file.path.clone();
            let name = file.display_name();

            tasks.spawn(async move {
                let _permit = permit;

                encoder.encode(&input, &output).await?;

                let (source, dest) = (input.clone(), output.clone());
                tokio::task::spawn_blocking(move || tags.copy_all_fields(&source, &dest))
                    .await??;

                progress.update(&format!("✅ {}", name));
                Ok(output)
            });
        }

        // Dropping the set on error aborts the remaining tasks
        while let Some(joined) = tasks.join_next().await {
            Self::record_converted(joined??, stats);
        }

        Ok(())
    }

    fn record_converted(output: PathBuf, stats: &mut ConversionStats) {
        debug!("Converted: {}", output.display());
        stats.files_converted += 1;
    }

    /// Byte-for-byte copy of every other file, one at a time
    async fn copy_files(
        &self,
        mapper: &PathMapper,
        files: &[FileEntry],
        progress: &ProgressManager,
        stats: &mut ConversionStats,
    ) -> Result<()> {
        for file in files {
            let output = mapper.mirror(&file.path)?;
            let bytes = FileManager::copy_file(&file.path, &output).await?;
            debug!("Copied {} ({})", output.display(), FileManager::format_size(bytes));

            stats.files_copied += 1;
            stats.bytes_copied += bytes;
            progress.update(&format!("📄 {}", file.display_name()));
        }
        Ok(())
    }
}
