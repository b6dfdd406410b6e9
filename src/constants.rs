// AndroMPD profile store constants

/// Logical name of the backing store, also used as the file name.
pub const DATABASE_NAME: &str = "andrompd_database";

/// Current schema version (PRAGMA user_version).
pub const DATABASE_VERSION: u32 = 3;

/// Default MPD port
pub const DEFAULT_PORT: u16 = 6600;

// Paths
pub const DATA_DIR_ENV: &str = "ANDROMPD_DATA_DIR";
pub const APP_QUALIFIER: &str = "org";
pub const APP_ORGANIZATION: &str = "andrompd";
pub const APP_NAME: &str = "andrompd";

// SQLite
pub const BUSY_TIMEOUT_MS: u32 = 5000;
