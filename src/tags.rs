//! # Tag Adapter Module
//!
//! Questo modulo incapsula la lettura e la copia dei tag audio.
//!
//! ## Responsabilità:
//! - Definisce il trait `TagAdapter` usato da converter e renamer
//! - Implementazione `LoftyTags` basata sulla libreria `lofty`
//! - `MetadataRecord`: i sette campi usati per il rename (album, artist, date,
//!   discnumber, genre, title, tracknumber), ognuno con tutti i suoi valori
//!
//! ## Operazioni:
//! - `read_record()` / `read_field()`: lettura dei campi dal tag primario
//! - `copy_all_fields()`: copia ogni campo testuale dal file sorgente al file
//!   di destinazione, sovrascrivendo i campi con lo stesso nome
//!
//! ## Errori:
//! - `UnsupportedContainer` se `lofty` non riconosce il formato del file o
//!   non riesce a leggerlo (l'errore di `lofty` resta come `source`)
//! - `Tag` per tutti gli altri errori di parsing/scrittura
//!
//! Il file sorgente non viene mai modificato.

use crate::error::AudioTreeError;
use anyhow::Result;
use lofty::error::LoftyError;
use lofty::{ItemKey, ItemValue, ParseOptions, Probe, Tag, TagExt, TaggedFile, TaggedFileExt};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// The tag fields the pipelines know by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagField {
    Album,
    Artist,
    Date,
    DiscNumber,
    Genre,
    Title,
    TrackNumber,
}

impl TagField {
    pub const ALL: [TagField; 7] = [
        TagField::Album,
        TagField::Artist,
        TagField::Date,
        TagField::DiscNumber,
        TagField::Genre,
        TagField::Title,
        TagField::TrackNumber,
    ];

    /// Human-readable alias, as used in vorbis comments
    pub fn name(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Date => "date",
            Self::DiscNumber => "discnumber",
            Self::Genre => "genre",
            Self::Title => "title",
            Self::TrackNumber => "tracknumber",
        }
    }

    /// The generic lofty key behind the alias
    pub fn item_key(&self) -> ItemKey {
        match self {
            Self::Album => ItemKey::AlbumTitle,
            Self::Artist => ItemKey::TrackArtist,
            Self::Date => ItemKey::RecordingDate,
            Self::DiscNumber => ItemKey::DiscNumber,
            Self::Genre => ItemKey::Genre,
            Self::Title => ItemKey::TrackTitle,
            Self::TrackNumber => ItemKey::TrackNumber,
        }
    }
}

impl fmt::Display for TagField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values of the known fields of one file. Absent fields have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    fields: BTreeMap<TagField, Vec<String>>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests
    pub fn with(mut self, field: TagField, value: impl Into<String>) -> Self {
        self.fields.entry(field).or_default().push(value.into());
        self
    }

    pub fn insert(&mut self, field: TagField, values: Vec<String>) {
        if values.is_empty() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, values);
        }
    }

    /// All values of a field
    pub fn get(&self, field: TagField) -> Option<&[String]> {
        self.fields.get(&field).map(Vec::as_slice)
    }

    /// First value of a field, `None` when absent or empty
    pub fn first(&self, field: TagField) -> Option<&str> {
        self.get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn fields(&self) -> impl Iterator<Item = TagField> + '_ {
        self.fields.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn from_tag(tag: &Tag) -> Self {
        let mut record = Self::new();
        for field in TagField::ALL {
            let values = tag
                .get_strings(&field.item_key())
                .map(str::to_owned)
                .collect();
            record.insert(field, values);
        }
        record
    }
}

fn unsupported(path: &Path, source: Option<LoftyError>) -> AudioTreeError {
    AudioTreeError::UnsupportedContainer {
        path: path.to_path_buf(),
        source,
    }
}

/// Tag access used by the pipelines
pub trait TagAdapter: Send + Sync {
    /// Read the known fields of a file. A file without tags gives an empty record.
    fn read_record(&self, path: &Path) -> Result<MetadataRecord>;

    /// Copy every field from `source` onto `dest` and persist `dest`
    fn copy_all_fields(&self, source: &Path, dest: &Path) -> Result<()>;

    /// All values stored under one field, `None` when absent
    fn read_field(&self, path: &Path, field: TagField) -> Result<Option<Vec<String>>> {
        Ok(self.read_record(path)?.get(field).map(<[String]>::to_vec))
    }
}

/// `TagAdapter` backed by lofty
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTags;

impl LoftyTags {
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path) -> Result<TaggedFile> {
        let probe = Probe::open(path)
            .map_err(AudioTreeError::from)?
            .guess_file_type()?;

        if probe.file_type().is_none() {
            return Err(unsupported(path, None).into());
        }

        let tagged_file = probe
            .options(ParseOptions::new().read_properties(false))
            .read()
            .map_err(|e| unsupported(path, Some(e)))?;

        Ok(tagged_file)
    }

    fn main_tag(tagged_file: &TaggedFile) -> Option<&Tag> {
        tagged_file
            .primary_tag()
            .or_else(|| tagged_file.tags().first())
    }
}

impl TagAdapter for LoftyTags {
    fn read_record(&self, path: &Path) -> Result<MetadataRecord> {
        let tagged_file = Self::open(path)?;
        Ok(Self::main_tag(&tagged_file)
            .map(MetadataRecord::from_tag)
            .unwrap_or_default())
    }

    fn copy_all_fields(&self, source: &Path, dest: &Path) -> Result<()> {
        let source_file = Self::open(source)?;
        let mut dest_file = Self::open(dest)?;

        let Some(source_tag) = Self::main_tag(&source_file) else {
            debug!("No tags to copy from {}", source.display());
            return Ok(());
        };

        let tag_type = dest_file.primary_tag_type();
        if dest_file.tag(tag_type).is_none() {
            dest_file.insert_tag(Tag::new(tag_type));
        }
        let dest_tag = dest_file
            .tag_mut(tag_type)
            .ok_or_else(|| unsupported(dest, None))?;

        // Replace each key once, then push every value in source order
        let mut replaced: Vec<ItemKey> = Vec::new();
        let mut copied = 0usize;
        for item in source_tag.items() {
            if matches!(item.value(), ItemValue::Binary(_)) {
                continue;
            }
            if !replaced.contains(item.key()) {
                dest_tag.remove_key(item.key());
                replaced.push(item.key().clone());
            }
            if dest_tag.push(item.clone()) {
                copied += 1;
            }
        }

        dest_tag
            .save_to_path(dest)
            .map_err(AudioTreeError::from)?;

        debug!(
            "Copied {} tag items {} -> {}",
            copied,
            source.display(),
            dest.display()
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory adapter: records live in a map keyed by path
    #[derive(Default)]
    pub struct MemoryTags {
        records: Mutex<HashMap<PathBuf, MetadataRecord>>,
    }

    impl MemoryTags {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, path: &Path, record: MetadataRecord) {
            self.records
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), record);
        }

        pub fn get(&self, path: &Path) -> Option<MetadataRecord> {
            self.records.lock().unwrap().get(path).cloned()
        }
    }

    impl TagAdapter for MemoryTags {
        fn read_record(&self, path: &Path) -> Result<MetadataRecord> {
            if !path.exists() {
                return Err(unsupported(path, None).into());
            }
            Ok(self.get(path).unwrap_or_default())
        }

        fn copy_all_fields(&self, source: &Path, dest: &Path) -> Result<()> {
            let record = self.read_record(source)?;
            if !dest.exists() {
                return Err(unsupported(dest, None).into());
            }
            let mut records = self.records.lock().unwrap();
            let target = records.entry(dest.to_path_buf()).or_default();
            for field in record.fields() {
                target.insert(field, record.get(field).unwrap_or_default().to_vec());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryTags;
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Smallest FLAC lofty accepts: the marker plus a single STREAMINFO block
    /// (44.1 kHz, stereo, 16 bit, no frames)
    fn write_empty_flac(path: &Path) {
        let mut bytes = b"fLaC".to_vec();
        bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
        bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]); // block sizes
        bytes.extend_from_slice(&[0x00; 6]); // frame sizes
        bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x00; 16]); // md5
        fs::write(path, bytes).unwrap();
    }

    fn read_without_properties(path: &Path) -> TaggedFile {
        Probe::open(path)
            .unwrap()
            .options(ParseOptions::new().read_properties(false))
            .read()
            .unwrap()
    }

    fn write_tags(path: &Path, items: &[(ItemKey, &str)]) {
        let mut tagged_file = read_without_properties(path);
        let tag_type = tagged_file.primary_tag_type();
        tagged_file.insert_tag(Tag::new(tag_type));
        let tag = tagged_file.tag_mut(tag_type).unwrap();
        for (key, value) in items {
            tag.push(lofty::TagItem::new(
                key.clone(),
                ItemValue::Text(value.to_string()),
            ));
        }
        tag.save_to_path(path).unwrap();
    }

    #[test]
    fn test_record_first_value() {
        let record = MetadataRecord::new()
            .with(TagField::Artist, "First")
            .with(TagField::Artist, "Second")
            .with(TagField::Title, "");

        assert_eq!(record.first(TagField::Artist), Some("First"));
        assert_eq!(record.get(TagField::Artist).unwrap().len(), 2);
        assert_eq!(record.first(TagField::Title), None);
        assert_eq!(record.first(TagField::Album), None);
    }

    #[test]
    fn test_field_names() {
        let names: Vec<&str> = TagField::ALL.iter().map(TagField::name).collect();
        assert_eq!(
            names,
            vec!["album", "artist", "date", "discnumber", "genre", "title", "tracknumber"]
        );
    }

    #[test]
    fn test_unknown_container_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "just some text, not audio").unwrap();

        let err = LoftyTags::new().read_record(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AudioTreeError>(),
            Some(AudioTreeError::UnsupportedContainer { .. })
        ));
    }

    #[test]
    fn test_corrupt_flac_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.flac");
        fs::write(&path, "definitely not a flac stream").unwrap();

        let err = LoftyTags::new().read_record(&path).unwrap_err();
        match err.downcast_ref::<AudioTreeError>() {
            Some(AudioTreeError::UnsupportedContainer { path: reported, source }) => {
                assert_eq!(reported, &path);
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_untagged_flac_reads_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blank.flac");
        write_empty_flac(&path);

        let tags = LoftyTags::new();
        assert!(tags.read_record(&path).unwrap().is_empty());
        assert_eq!(tags.read_field(&path, TagField::Title).unwrap(), None);
    }

    #[test]
    fn test_copy_all_fields_round_trip() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.flac");
        let dest = temp.path().join("dest.flac");
        write_empty_flac(&source);
        write_empty_flac(&dest);
        write_tags(
            &source,
            &[
                (ItemKey::TrackTitle, "Title of First Song"),
                (ItemKey::TrackArtist, "Artist One"),
                (ItemKey::TrackArtist, "Artist Two"),
                (ItemKey::AlbumTitle, "Album"),
                (ItemKey::TrackNumber, "1"),
                (ItemKey::DiscNumber, "1"),
                (ItemKey::Comment, "ripped"),
            ],
        );
        write_tags(&dest, &[(ItemKey::TrackTitle, "stale title")]);
        let before = fs::read(&source).unwrap();

        let tags = LoftyTags::new();
        tags.copy_all_fields(&source, &dest).unwrap();

        let source_record = tags.read_record(&source).unwrap();
        let dest_record = tags.read_record(&dest).unwrap();
        assert_eq!(dest_record, source_record);
        assert_eq!(
            tags.read_field(&dest, TagField::Artist).unwrap(),
            Some(vec!["Artist One".to_string(), "Artist Two".to_string()])
        );
        assert_eq!(
            tags.read_field(&dest, TagField::Title).unwrap(),
            Some(vec!["Title of First Song".to_string()])
        );

        // Fields outside the known set are copied as well
        let dest_file = read_without_properties(&dest);
        let comment = dest_file
            .primary_tag()
            .and_then(|tag| tag.get_string(&ItemKey::Comment));
        assert_eq!(comment, Some("ripped"));

        assert_eq!(fs::read(&source).unwrap(), before);
    }

    #[test]
    fn test_memory_tags_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.flac");
        let dest = temp.path().join("a.ogg");
        fs::write(&source, b"a").unwrap();
        fs::write(&dest, b"b").unwrap();

        let tags = MemoryTags::new();
        tags.set(&source, MetadataRecord::new().with(TagField::Title, "Song"));
        tags.copy_all_fields(&source, &dest).unwrap();
        assert_eq!(tags.get(&dest), tags.get(&source));
    }
}
