// Profile store migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.

use rusqlite::Connection;

use crate::constants::DATABASE_VERSION;
use crate::error::{ProfileError, Result};

/// Table definition for a fresh store, already at the current version.
const CREATE_SERVER_PROFILES: &str = r#"
    CREATE TABLE IF NOT EXISTS andrompd_mpd_server_profiles (
        profile_name text,
        autoconnect integer,
        server_hostname text,
        server_password text,
        server_port integer,
        date integer PRIMARY KEY,
        streaming_port integer,
        streaming_enabled integer,
        http_cover_regex text,
        http_cover_enabled integer
    );
"#;

struct Migration {
    /// Schema version after this step
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Upgrade steps for stores created by older builds, in ascending order.
const MIGRATIONS: &[Migration] = &[
    // streaming_port holds the stream URL. The name is kept for compatibility.
    Migration {
        version: 2,
        description: "streaming columns",
        sql: r#"
        ALTER TABLE andrompd_mpd_server_profiles ADD COLUMN streaming_port integer;
        ALTER TABLE andrompd_mpd_server_profiles ADD COLUMN streaming_enabled integer;
        "#,
    },
    Migration {
        version: 3,
        description: "http cover columns",
        sql: r#"
        ALTER TABLE andrompd_mpd_server_profiles ADD COLUMN http_cover_regex text;
        ALTER TABLE andrompd_mpd_server_profiles ADD COLUMN http_cover_enabled integer;
        "#,
    },
];

/// Get current schema version from database
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Column names of the profile table in declaration order
pub fn column_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(andrompd_mpd_server_profiles)")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Create or upgrade the profile table.
///
/// Steps at or below the stored version are skipped, so this is a no-op on a
/// store that is already current.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = schema_version(conn)?;

    // Refuse to open a store written by a newer build
    if current_version > DATABASE_VERSION {
        return Err(ProfileError::SchemaTooNew {
            found: current_version,
            supported: DATABASE_VERSION,
        });
    }

    if current_version == DATABASE_VERSION {
        return Ok(());
    }

    if current_version == 0 {
        apply_step(conn, DATABASE_VERSION, CREATE_SERVER_PROFILES)?;
        log::info!("Created profile store at schema version {}", DATABASE_VERSION);
        return Ok(());
    }

    log::info!(
        "Upgrading profile store from version {} to {}",
        current_version,
        DATABASE_VERSION
    );

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        apply_step(conn, migration.version, migration.sql)?;
        log::info!("Applied migration {} ({})", migration.version, migration.description);
    }

    Ok(())
}

/// Run one step and bump user_version in the same transaction
fn apply_step(conn: &Connection, version: u32, sql: &str) -> Result<()> {
    let step = || -> rusqlite::Result<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()
    };

    step().map_err(|source| {
        log::error!("Migration to version {} failed: {}", version, source);
        ProfileError::Migration { version, source }
    })
}

/// Version 1 layout, as shipped before streaming and cover settings existed.
#[cfg(test)]
pub(crate) const CREATE_V1_SERVER_PROFILES: &str = r#"
    CREATE TABLE andrompd_mpd_server_profiles (
        profile_name text,
        autoconnect integer,
        server_hostname text,
        server_password text,
        server_port integer,
        date integer PRIMARY KEY
    );
    PRAGMA user_version = 1;
"#;
