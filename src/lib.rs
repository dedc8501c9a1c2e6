//! # Audiotree Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `file_manager`: Discovery delle directory e operazioni sui file
//! - `encoder`: Invocazione degli encoder esterni (oggenc, lame, flac)
//! - `tags`: Lettura e copia dei tag con `lofty`
//! - `slug`: Nomi file sicuri a partire dai tag
//! - `pipeline`: Converter e renamer
//! - `platform`: Verifica dei tool esterni
//! - `progress`: Progress tracking e statistiche
//!
//! ## Utilizzo:
//! ```ignore
//! use audiotree::{Config, Converter, LoftyTags};
//! use std::sync::Arc;
//!
//! let converter = Converter::new(Config::default(), Arc::new(LoftyTags::new()))?;
//! converter.run(&source, &destination).await?;
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod file_manager;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod slug;
pub mod tags;

pub use config::{AudioFormat, CollisionPolicy, Config, ExitCheck, RenameLayout};
pub use encoder::{Encoder, EncoderDescriptor};
pub use error::AudioTreeError;
pub use pipeline::{Converter, PathMapper, Renamer};
pub use tags::{LoftyTags, MetadataRecord, TagAdapter, TagField};
