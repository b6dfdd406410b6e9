// Server profile queries
// Rows written by older schema versions can hold NULL in any column added
// later; every reader below maps NULL to the field's empty value.

use rusqlite::types::ValueRef;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};

use crate::constants::DEFAULT_PORT;
use crate::error::{ProfileError, Result};
use crate::profile::ProfileRecord;

const SELECT_PROFILES: &str = "SELECT profile_name, autoconnect, server_hostname, server_password, server_port,
            date, streaming_port, streaming_enabled, http_cover_regex, http_cover_enabled
     FROM andrompd_mpd_server_profiles";

fn profile_from_row(row: &Row) -> rusqlite::Result<ProfileRecord> {
    let port = match row.get::<_, Option<i64>>(4)? {
        None => DEFAULT_PORT,
        Some(port) => u16::try_from(port).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(4, port))?,
    };

    Ok(ProfileRecord::with_creation_date(text_column(row, 0)?, flag_column(row, 1)?, row.get(5)?)
        .with_hostname(text_column(row, 2)?)
        .with_password(text_column(row, 3)?)
        .with_port(port)
        .with_streaming(flag_column(row, 7)?, text_column(row, 6)?)
        .with_http_cover(flag_column(row, 9)?, text_column(row, 8)?))
}

/// Read a text field. streaming_port has integer affinity, so a purely
/// numeric value comes back as an integer and is turned back into text.
fn text_column(row: &Row, idx: usize) -> rusqlite::Result<String> {
    let value = match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    };
    Ok(value)
}

fn flag_column(row: &Row, idx: usize) -> rusqlite::Result<bool> {
    Ok(row.get::<_, Option<i64>>(idx)? == Some(1))
}

/// All profiles ordered by name
pub fn list_profiles(conn: &Connection) -> Result<Vec<ProfileRecord>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY profile_name, date", SELECT_PROFILES))?;
    let profiles = stmt
        .query_map([], profile_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(profiles)
}

pub fn get_profile(conn: &Connection, creation_date: i64) -> Result<Option<ProfileRecord>> {
    let profile = conn
        .query_row(
            &format!("{} WHERE date = ?1", SELECT_PROFILES),
            params![creation_date],
            profile_from_row,
        )
        .optional()?;
    Ok(profile)
}

/// The profile flagged for automatic connection, if any.
/// Newest wins should a store ever hold more than one.
pub fn get_auto_connect_profile(conn: &Connection) -> Result<Option<ProfileRecord>> {
    let profile = conn
        .query_row(
            &format!("{} WHERE autoconnect = 1 ORDER BY date DESC LIMIT 1", SELECT_PROFILES),
            [],
            profile_from_row,
        )
        .optional()?;
    Ok(profile)
}

pub fn count_auto_connect(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM andrompd_mpd_server_profiles WHERE autoconnect = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Unset the auto-connect flag on every row. Returns rows changed.
pub fn clear_auto_connect(conn: &Connection) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE andrompd_mpd_server_profiles SET autoconnect = 0 WHERE autoconnect = 1",
        [],
    )?;
    Ok(changed)
}

/// Insert a new row. An existing row with the same creation date is a
/// conflict, never overwritten.
pub fn insert_profile(conn: &Connection, profile: &ProfileRecord) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO andrompd_mpd_server_profiles
            (profile_name, autoconnect, server_hostname, server_password, server_port, date,
             streaming_port, streaming_enabled, http_cover_regex, http_cover_enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            profile.name(),
            profile.auto_connect() as i32,
            profile.hostname(),
            profile.password(),
            profile.port(),
            profile.creation_date(),
            profile.streaming_url(),
            profile.streaming_enabled() as i32,
            profile.http_cover_regex(),
            profile.http_cover_enabled() as i32,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            Err(ProfileError::KeyConflict(profile.creation_date()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete by creation date. Returns false when no row matched.
pub fn delete_profile(conn: &Connection, creation_date: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM andrompd_mpd_server_profiles WHERE date = ?1",
        params![creation_date],
    )?;
    Ok(deleted > 0)
}
