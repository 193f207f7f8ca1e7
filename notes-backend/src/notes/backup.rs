//! Rotating snapshots of the notes document, taken before destructive edits.
//! Best-effort: failures are logged and never block the mutation.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use super::file_ops;

pub struct BackupRotation {
    dir: PathBuf,
    max_backups: usize,
}

impl BackupRotation {
    pub fn new(dir: PathBuf, max_backups: usize) -> Self {
        Self { dir, max_backups }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the backup directory and prune old copies.
    /// Returns the backup path, or `None` if the snapshot failed.
    pub fn snapshot(&self, source: &Path) -> Option<PathBuf> {
        match self.try_snapshot(source) {
            Ok(path) => {
                log::debug!("[BACKUP] Saved {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::error!("[BACKUP] Failed to back up {}: {}", source.display(), e);
                None
            }
        }
    }

    fn try_snapshot(&self, source: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stamp = Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
            .replace([':', '.'], "-");

        let mut target = self.dir.join(format!("notes_{}.md", stamp));
        let mut n = 1;
        while target.exists() {
            target = self.dir.join(format!("notes_{}-{}.md", stamp, n));
            n += 1;
        }

        fs::copy(source, &target)?;
        self.prune();
        Ok(target)
    }

    /// Keep the newest `max_backups` files
    fn prune(&self) {
        let backups = match file_ops::list_backups(&self.dir) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("[BACKUP] Could not list backups for pruning: {}", e);
                return;
            }
        };

        for stale in backups.iter().skip(self.max_backups) {
            if let Err(e) = fs::remove_file(stale) {
                log::warn!("[BACKUP] Could not remove {}: {}", stale.display(), e);
            }
        }
    }
}
