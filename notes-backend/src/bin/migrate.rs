//! One-time import of an existing `notes.md` into the SQLite store.
//!
//! Usage: `migrate [path-to-notes.md]` (defaults to the configured notes file)

use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use notes_backend::config::Config;
use notes_backend::notes::{codec, file_ops, NoteStore, SqliteNoteStore, TimestampGenerator};
use notes_types::ImportCandidate;

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.notes_file());

    match run(&config, &source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Migration failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, source: &Path) -> Result<(), String> {
    if !source.exists() {
        log::info!("{} not found, nothing to migrate", source.display());
        return Ok(());
    }

    let content = file_ops::read_document(source)
        .map_err(|e| format!("cannot read {}: {}", source.display(), e))?;

    // Oldest first so creation order matches the document
    let mut notes = codec::decode(&content);
    notes.reverse();
    log::info!("Found {} notes in {}", notes.len(), source.display());

    // The mirror is written over the source file, so it stays off here
    let store = SqliteNoteStore::open(
        Path::new(&config.database_url),
        None,
        Arc::new(TimestampGenerator::new(config.utc_offset)),
    )
    .map_err(|e| format!("cannot open database {}: {}", config.database_url, e))?;

    let candidates: Vec<ImportCandidate> = notes
        .into_iter()
        .map(|note| ImportCandidate {
            question: note.question,
            answer: note.answer,
            tags: Some(note.tags),
            timestamp: Some(note.timestamp),
        })
        .collect();

    let report = store
        .import_batch(&candidates)
        .map_err(|e| format!("import aborted: {}", e))?;

    for error in &report.errors {
        log::warn!("{}", error);
    }
    log::info!(
        "Migration complete: {} migrated, {} failed",
        report.imported_count(),
        report.errors.len()
    );
    Ok(())
}
