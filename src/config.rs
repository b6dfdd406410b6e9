// Store location resolution
// Precedence: explicit path > ANDROMPD_DATA_DIR > platform data dir.

use std::path::{Path, PathBuf};

use crate::constants::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, DATABASE_NAME, DATA_DIR_ENV};
use crate::error::{ProfileError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub database_name: String,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database_name: DATABASE_NAME.to_string(),
        }
    }

    /// Resolve the data directory for this process.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::new(dir));
        }

        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            log::debug!("Using profile data dir from {}", DATA_DIR_ENV);
            return Ok(Self::new(PathBuf::from(dir)));
        }

        let dirs = directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .ok_or_else(|| {
                ProfileError::unavailable(
                    DATABASE_NAME,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "could not determine a data directory for this platform",
                    ),
                )
            })?;
        Ok(Self::new(dirs.data_dir()))
    }

    /// Full path of the database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_name)
    }
}
