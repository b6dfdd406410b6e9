// Profile repository
// Every public operation holds the repository lock for its whole duration and
// opens its own connection, which is dropped before the lock is released.

#[cfg(test)]
mod tests;

use std::sync::{Mutex, MutexGuard};

use crate::config::StoreConfig;
use crate::db::profiles;
use crate::db::{FileStore, StoreProvider};
use crate::error::Result;
use crate::events::{ProfileEvent, ProfileEvents, Subscription};
use crate::profile::ProfileRecord;

/// Durable set of server profiles with at most one auto-connect profile.
///
/// Construct once at startup and pass it to whoever needs it. Profiles are
/// never updated in place: to change one, delete it and add a replacement.
pub struct ProfileRepository {
    provider: Box<dyn StoreProvider>,
    lock: Mutex<()>,
    events: ProfileEvents,
}

impl ProfileRepository {
    pub fn new(provider: impl StoreProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            lock: Mutex::new(()),
            events: ProfileEvents::new(),
        }
    }

    /// Repository over the on-disk store described by `config`
    pub fn open(config: &StoreConfig) -> Self {
        Self::new(FileStore::from_config(config))
    }

    // The guarded state lives in SQLite, so a poisoned lock is safe to reuse.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All stored profiles sorted by name
    pub fn list(&self) -> Result<Vec<ProfileRecord>> {
        let _guard = self.guard();
        let conn = self.provider.open()?;
        profiles::list_profiles(&conn)
    }

    /// The profile to connect to on startup, if one is flagged
    pub fn auto_connect(&self) -> Result<Option<ProfileRecord>> {
        let _guard = self.guard();
        let conn = self.provider.open()?;
        profiles::get_auto_connect_profile(&conn)
    }

    pub fn get(&self, creation_date: i64) -> Result<Option<ProfileRecord>> {
        let _guard = self.guard();
        let conn = self.provider.open()?;
        profiles::get_profile(&conn, creation_date)
    }

    /// Store a new profile.
    ///
    /// If it is flagged for auto-connect, the flag is first cleared on every
    /// stored profile. Both steps share one transaction, so a key conflict
    /// leaves the existing flags untouched.
    pub fn add(&self, profile: &ProfileRecord) -> Result<()> {
        let _guard = self.guard();
        let mut conn = self.provider.open()?;

        let tx = conn.transaction()?;
        if profile.auto_connect() {
            let cleared = profiles::clear_auto_connect(&tx)?;
            if cleared > 0 {
                log::debug!("Cleared auto-connect on {} profile(s)", cleared);
            }
        }
        profiles::insert_profile(&tx, profile)?;
        tx.commit()?;
        drop(conn);

        log::info!("Added profile {:?} ({})", profile.name(), profile.creation_date());
        self.events.publish(ProfileEvent::Changed);
        Ok(())
    }

    /// Remove a profile. Removing one that is not stored is not an error.
    pub fn delete(&self, profile: &ProfileRecord) -> Result<()> {
        self.delete_by_date(profile.creation_date()).map(|_| ())
    }

    /// Remove the profile with this creation date. Returns whether a row existed.
    pub fn delete_by_date(&self, creation_date: i64) -> Result<bool> {
        let _guard = self.guard();
        let conn = self.provider.open()?;
        let deleted = profiles::delete_profile(&conn, creation_date)?;
        drop(conn);

        if deleted {
            log::info!("Deleted profile {}", creation_date);
        } else {
            log::debug!("No profile {} to delete", creation_date);
        }
        self.events.publish(ProfileEvent::Changed);
        Ok(deleted)
    }

    /// Re-store `profile` as the auto-connect profile.
    ///
    /// This is delete + add of the same record in one transaction: the
    /// creation date is kept and every other profile loses the flag.
    pub fn make_auto_connect(&self, profile: &ProfileRecord) -> Result<ProfileRecord> {
        let promoted = profile.clone().with_auto_connect(true);

        let _guard = self.guard();
        let mut conn = self.provider.open()?;

        let tx = conn.transaction()?;
        profiles::delete_profile(&tx, promoted.creation_date())?;
        profiles::clear_auto_connect(&tx)?;
        profiles::insert_profile(&tx, &promoted)?;
        tx.commit()?;
        drop(conn);

        log::info!("Profile {:?} ({}) is now auto-connect", promoted.name(), promoted.creation_date());
        self.events.publish(ProfileEvent::Changed);
        Ok(promoted)
    }

    /// Receive a `Changed` signal after every add, delete or promotion
    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn events(&self) -> &ProfileEvents {
        &self.events
    }
}
