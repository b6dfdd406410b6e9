// AndroMPD - server profile store
//
// Persists MPD connection profiles in a versioned SQLite table and keeps at
// most one of them flagged for automatic connection.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod events;
pub mod profile;
pub mod repository;

pub use config::StoreConfig;
pub use db::{FileStore, StoreProvider};
pub use error::{ProfileError, Result};
pub use events::{ProfileEvent, ProfileEvents, Subscription};
pub use profile::{ProfileRecord, SectionTitle};
pub use repository::ProfileRepository;
