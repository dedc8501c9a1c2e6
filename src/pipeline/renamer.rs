//! # Renamer Pipeline
//!
//! Rinomina e sposta i file del formato richiesto in base ai loro tag.
//!
//! ## Flusso per ogni file:
//! 1. Legge i tag: album, artist, date, genre, title, tracknumber sono
//!    obbligatori, discnumber è opzionale
//! 2. Trasforma il primo valore di ogni campo in slug
//! 3. Nome file: `[disc]` + `track` (zero-padded a 2) + `_` + `title` + `.ext`
//! 4. Directory: speculare alla sorgente, oppure `genre/artist/date_album`
//! 5. Sposta il file (rename, con fallback copia + rimozione)
//!
//! ## Collisioni:
//! - `overwrite`: l'ultimo file scritto vince (comportamento storico)
//! - `fail`: errore `Collision` se la destinazione esiste già
//!
//! Gli altri file (copertine, etc.) vengono ignorati e restano dove sono.

use crate::{
    config::{CollisionPolicy, Config, RenameLayout},
    error::AudioTreeError,
    file_manager::{DirectoryWalker, FileEntry, FileManager},
    pipeline::{path_resolver::PathMapper, resolve_source},
    progress::{ProgressManager, RenameStats},
    slug::{slugify, zero_pad},
    tags::{MetadataRecord, TagAdapter, TagField},
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Slugged tag values a new file name is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFields {
    pub album: String,
    pub artist: String,
    pub date: String,
    pub disc: Option<String>,
    pub genre: String,
    pub title: String,
    pub track: String,
}

impl RenameFields {
    /// Validate and slug the fields of `record`; `path` is only used in errors
    pub fn from_record(record: &MetadataRecord, path: &Path) -> Result<Self> {
        let required = |field: TagField| -> Result<String> {
            record.first(field).map(slugify).ok_or_else(|| {
                AudioTreeError::MissingMetadata {
                    path: path.to_path_buf(),
                    field: field.name(),
                }
                .into()
            })
        };

        let album = required(TagField::Album)?;
        let artist = required(TagField::Artist)?;
        let date = required(TagField::Date)?;
        let disc = record.first(TagField::DiscNumber).map(slugify);
        let genre = required(TagField::Genre)?;
        let title = required(TagField::Title)?;
        let track = required(TagField::TrackNumber)?;

        Ok(Self {
            album,
            artist,
            date,
            disc,
            genre,
            title,
            track,
        })
    }

    /// `[disc]NN_title.ext`, the disc prefix is not separated
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "{}{}_{}.{}",
            self.disc.as_deref().unwrap_or_default(),
            zero_pad(&self.track, 2),
            self.title,
            extension
        )
    }

    /// `genre/artist/date_album`
    pub fn metadata_dir(&self) -> PathBuf {
        PathBuf::from(&self.genre)
            .join(&self.artist)
            .join(format!("{}_{}", self.date, self.album))
    }
}

/// Recursive tag-based renamer
pub struct Renamer {
    config: Config,
    tags: Arc<dyn TagAdapter>,
}

impl Renamer {
    pub fn new(config: Config, tags: Arc<dyn TagAdapter>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tags })
    }

    /// Rename every matching file under `source` into `destination`
    pub async fn run(&self, source: &Path, destination: &Path) -> Result<RenameStats> {
        let source_root = resolve_source(source)?;
        if !destination.is_dir() {
            return Err(AudioTreeError::InvalidArguments(format!(
                "Cannot find destination directory: {}",
                destination.display()
            ))
            .into());
        }
        let destination_root = destination.canonicalize()?;

        info!(
            "Renaming {} files {} -> {} (layout: {:?}, collisions: {:?})",
            self.config.source_format,
            source_root.display(),
            destination_root.display(),
            self.config.rename_layout,
            self.config.collision_policy
        );

        let mapper = PathMapper::new(source_root, destination_root);
        let progress = ProgressManager::new(self.config.show_progress);
        let mut stats = RenameStats::new();

        for batch in DirectoryWalker::new(mapper.source_root(), self.config.source_format.extension()) {
            let batch = batch?;
            // files already moved into a nested destination are not renamed twice
            if mapper.is_nested_output(&batch.directory) {
                debug!("Skipping output directory: {}", batch.directory.display());
                continue;
            }
            info!("Parsing '{}'", batch.directory.display());
            stats.directories += 1;
            stats.files_ignored += batch.misc.len();

            for file in &batch.matches {
                let target = self.rename_file(&mapper, file).await?;
                debug!("Moved {} -> {}", file.path.display(), target.display());
                stats.files_renamed += 1;
                progress.update(&format!("✅ {}", file.display_name()));
            }
        }

        progress.finish(&stats.format_summary());
        info!("=== Rename Complete ===");
        info!("{}", stats.format_summary());

        Ok(stats)
    }

    async fn rename_file(&self, mapper: &PathMapper, file: &FileEntry) -> Result<PathBuf> {
        let tags = self.tags.clone();
        let path = file.path.clone();
        let record = tokio::task::spawn_blocking(move || tags.read_record(&path)).await??;

        let fields = RenameFields::from_record(&record, &file.path)?;
        let target = self.target_path(mapper, file, &fields)?;

        if target != file.path && tokio::fs::try_exists(&target).await.unwrap_or(false) {
            match self.config.collision_policy {
                CollisionPolicy::Fail => {
                    return Err(AudioTreeError::Collision(target).into());
                }
                CollisionPolicy::Overwrite => {
                    warn!("Overwriting existing file: {}", target.display());
                }
            }
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| AudioTreeError::MoveFailed {
                    from: file.path.clone(),
                    to: target.clone(),
                    source,
                })?;
        }

        FileManager::move_file(&file.path, &target).await?;
        Ok(target)
    }

    fn target_path(
        &self,
        mapper: &PathMapper,
        file: &FileEntry,
        fields: &RenameFields,
    ) -> Result<PathBuf> {
        let directory = match self.config.rename_layout {
            RenameLayout::Mirror => {
                let parent = file.path.parent().unwrap_or(mapper.source_root());
                mapper.mirror_dir(parent)?
            }
            RenameLayout::ByMetadata => mapper.destination_root().join(fields.metadata_dir()),
        };

        Ok(directory.join(fields.file_name(self.config.source_format.extension())))
    }
}
