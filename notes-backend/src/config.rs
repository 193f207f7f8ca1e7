use chrono::FixedOffset;
use std::env;
use std::path::PathBuf;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
    /// `sqlite` (relational store + markdown mirror) or `markdown` (file only)
    pub const NOTES_BACKEND: &str = "NOTES_BACKEND";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const NOTES_DIR: &str = "NOTES_DIR";
    pub const MAX_BACKUPS: &str = "MAX_BACKUPS";
    /// "production" requires an admin token for every mutation
    pub const APP_ENV: &str = "APP_ENV";
    pub const ADMIN_PASSWORD: &str = "ADMIN_PASSWORD";
    /// Offset note timestamps are rendered in, e.g. "+08:00"
    pub const UTC_OFFSET: &str = "NOTES_UTC_OFFSET";
    pub const FRONTEND_DIST: &str = "FRONTEND_DIST";
    pub const WRITE_PORT_TO_FILE: &str = "WRITE_PORT_TO_FILE";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 3001;
    pub const BIND_ADDRESS: &str = "0.0.0.0";
    pub const DATABASE_URL: &str = "./.db/notes.db";
    pub const NOTES_DIR: &str = "./notes";
    pub const NOTES_FILE: &str = "notes.md";
    pub const BACKUPS_DIR: &str = "backups";
    pub const MAX_BACKUPS: usize = 10;
    pub const UTC_OFFSET: &str = "+08:00";
    pub const PORT_FILE: &str = ".backend-port";
}

/// Which Note Store implementation the process runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Markdown,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" | "database" => Some(StorageBackend::Sqlite),
            "markdown" | "md" | "file" => Some(StorageBackend::Markdown),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub backend: StorageBackend,
    pub database_url: String,
    pub notes_dir: PathBuf,
    pub max_backups: usize,
    pub is_production: bool,
    pub admin_password: Option<String>,
    pub utc_offset: FixedOffset,
    pub frontend_dist: Option<String>,
    pub write_port_to_file: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let port = match env::var(env_vars::PORT) {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| format!("{} must be a valid port number, got {:?}", env_vars::PORT, v))?,
            Err(_) => defaults::PORT,
        };

        let backend = match env::var(env_vars::NOTES_BACKEND) {
            Ok(v) => StorageBackend::parse(&v).ok_or_else(|| {
                format!("{} must be 'sqlite' or 'markdown', got {:?}", env_vars::NOTES_BACKEND, v)
            })?,
            Err(_) => StorageBackend::Sqlite,
        };

        let max_backups = match env::var(env_vars::MAX_BACKUPS) {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| format!("{} must be a number, got {:?}", env_vars::MAX_BACKUPS, v))?,
            Err(_) => defaults::MAX_BACKUPS,
        };

        let offset_raw =
            env::var(env_vars::UTC_OFFSET).unwrap_or_else(|_| defaults::UTC_OFFSET.to_string());
        let utc_offset = parse_utc_offset(&offset_raw)
            .ok_or_else(|| format!("{} must look like +08:00, got {:?}", env_vars::UTC_OFFSET, offset_raw))?;

        let is_production = env::var(env_vars::APP_ENV)
            .map(|v| v.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            port,
            bind_address: env::var(env_vars::BIND_ADDRESS)
                .unwrap_or_else(|_| defaults::BIND_ADDRESS.to_string()),
            backend,
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            notes_dir: PathBuf::from(
                env::var(env_vars::NOTES_DIR).unwrap_or_else(|_| defaults::NOTES_DIR.to_string()),
            ),
            max_backups,
            is_production,
            admin_password: env::var(env_vars::ADMIN_PASSWORD)
                .ok()
                .filter(|p| !p.is_empty()),
            utc_offset,
            frontend_dist: env::var(env_vars::FRONTEND_DIST)
                .ok()
                .filter(|p| !p.trim().is_empty()),
            write_port_to_file: env::var(env_vars::WRITE_PORT_TO_FILE).is_ok(),
        })
    }

    /// Auth is only enforced in production; local use stays password-free
    pub fn require_auth(&self) -> bool {
        self.is_production
    }

    /// The markdown document (file store, or mirror of the relational store)
    pub fn notes_file(&self) -> PathBuf {
        self.notes_dir.join(defaults::NOTES_FILE)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.notes_dir.join(defaults::BACKUPS_DIR)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: defaults::PORT,
            bind_address: defaults::BIND_ADDRESS.to_string(),
            backend: StorageBackend::Sqlite,
            database_url: defaults::DATABASE_URL.to_string(),
            notes_dir: PathBuf::from(defaults::NOTES_DIR),
            max_backups: defaults::MAX_BACKUPS,
            is_production: false,
            admin_password: None,
            utc_offset: FixedOffset::east_opt(8 * 3600).expect("+08:00 is a valid offset"),
            frontend_dist: None,
            write_port_to_file: false,
        }
    }
}

/// Parse "+08:00", "-05:30", "+0800" or "Z" into a fixed offset
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.chars().next()? {
        '+' => (1, &s[1..]),
        '-' => (-1, &s[1..]),
        _ => return None,
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
