//! File operations for the notes document and its backups

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::codec;

/// Write the whole document (creates parent directories as needed)
pub fn write_document(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

/// Read the document, returning an empty string if it does not exist yet
pub fn read_document(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Create the document with just the header if it is missing
pub fn ensure_document(path: &Path) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_document(path, &codec::document_header())?;
    Ok(true)
}

/// Backup files (`notes_*.md`) in `dir`, newest first by modification time
pub fn list_backups(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !(name.starts_with("notes_") && name.ends_with(".md")) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        backups.push((modified, entry.path()));
    }

    backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(backups.into_iter().map(|(_, path)| path).collect())
}
