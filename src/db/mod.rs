// Database module

pub mod migrations;
pub mod profiles;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::config::StoreConfig;
use crate::constants::BUSY_TIMEOUT_MS;
use crate::error::{ProfileError, Result};

/// Opens a ready-to-use connection to the profile store.
///
/// Every call must return a migrated connection. The repository opens one
/// per operation and drops it before the operation returns.
pub trait StoreProvider: Send + Sync {
    fn open(&self) -> Result<Connection>;
}

/// Profile store backed by a SQLite file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.database_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreProvider for FileStore {
    fn open(&self) -> Result<Connection> {
        open_db(&self.path)
    }
}

/// Open or create the store at the given path and bring its schema up to date
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ProfileError::unavailable(parent, e))?;
    }

    let conn = Connection::open(db_path).map_err(|e| ProfileError::unavailable(db_path, e))?;

    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
