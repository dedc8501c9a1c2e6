//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `AudioTreeError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `InvalidArguments`: Directory sorgente/destinazione non valide
//! - `EncodeFailed`: L'encoder esterno non ha prodotto il file di output
//! - `UnsupportedContainer`: La libreria dei tag non riconosce o non riesce a leggere il file
//! - `MissingMetadata`: Campo obbligatorio assente durante il rename
//! - `MoveFailed`: Errore del filesystem durante lo spostamento
//! - `Collision`: Il file di destinazione esiste già (policy `fail`)
//! - `MissingDependency`: Tool esterno mancante (oggenc, lame, flac)
//!
//! ## Propagazione:
//! Nessun errore viene gestito o ritentato nelle pipeline: il primo errore
//! interrompe l'intera esecuzione. Le pipeline restituiscono `anyhow::Result`,
//! il tipo originale si recupera con `downcast_ref::<AudioTreeError>()`.
//!
//! ## Esempio:
//! ```ignore
//! if !output.exists() {
//!     return Err(AudioTreeError::EncodeFailed { output, reason: "no output file".into() }.into());
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for tree conversion and renaming
#[derive(thiserror::Error, Debug)]
pub enum AudioTreeError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Encoder failed for {}: {reason}", output.display())]
    EncodeFailed { output: PathBuf, reason: String },

    #[error("Unsupported tag container: {}", path.display())]
    UnsupportedContainer {
        path: PathBuf,
        #[source]
        source: Option<lofty::error::LoftyError>,
    },

    #[error("No '{field}' metadata provided in {}", path.display())]
    MissingMetadata { path: PathBuf, field: &'static str },

    #[error("Failed to move {} to {}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination already exists: {}", .0.display())]
    Collision(PathBuf),

    #[error("Path {} is not inside the source directory", .0.display())]
    OutsideSourceRoot(PathBuf),

    #[error("Unsupported target format: {0}")]
    UnsupportedTarget(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
