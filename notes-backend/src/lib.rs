pub mod auth;
pub mod config;
pub mod controllers;
pub mod error;
pub mod notes;

use std::path::Path;
use std::sync::Arc;

use auth::TokenStore;
use config::{Config, StorageBackend};
use error::NoteResult;
use notes::backup::BackupRotation;
use notes::{MarkdownNoteStore, NoteStore, SqliteNoteStore, TimestampGenerator};

pub struct AppState {
    pub store: Arc<dyn NoteStore>,
    pub config: Config,
    pub tokens: Arc<TokenStore>,
}

/// Open the backend selected by `NOTES_BACKEND`
pub fn build_store(config: &Config) -> NoteResult<Arc<dyn NoteStore>> {
    let timestamps = Arc::new(TimestampGenerator::new(config.utc_offset));

    let store: Arc<dyn NoteStore> = match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteNoteStore::open(
            Path::new(&config.database_url),
            Some(config.notes_file()),
            timestamps,
        )?),
        StorageBackend::Markdown => Arc::new(MarkdownNoteStore::open(
            config.notes_file(),
            BackupRotation::new(config.backups_dir(), config.max_backups),
            timestamps,
        )?),
    };

    log::info!("[NOTES] Using {} backend", store.backend_name());
    Ok(store)
}
