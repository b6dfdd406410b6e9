use super::*;
use crate::db::migrations;
use crate::error::ProfileError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Repository over a fresh on-disk store. Keep the TempDir alive.
fn setup_repo() -> (TempDir, ProfileRepository) {
    let dir = TempDir::new().unwrap();
    let repo = ProfileRepository::open(&StoreConfig::new(dir.path()));
    (dir, repo)
}

fn auto_connect_count(repo: &ProfileRepository) -> usize {
    repo.list().unwrap().iter().filter(|p| p.auto_connect()).count()
}

// ---------------------------------------------------------------
// A second auto-connect profile takes the flag
// ---------------------------------------------------------------
#[test]
fn test_second_auto_connect_profile_wins() {
    let (_dir, repo) = setup_repo();
    let p1 = ProfileRecord::with_creation_date("Living Room", true, 1000);
    let p2 = ProfileRecord::with_creation_date("Bedroom", true, 2000);

    repo.add(&p1).unwrap();
    repo.add(&p2).unwrap();

    assert_eq!(repo.auto_connect().unwrap(), Some(p2));
    let stored_p1 = repo.get(1000).unwrap().unwrap();
    assert!(!stored_p1.auto_connect());
    assert_eq!(auto_connect_count(&repo), 1);
}

// ---------------------------------------------------------------
// Empty store
// ---------------------------------------------------------------
#[test]
fn test_empty_store() {
    let (_dir, repo) = setup_repo();
    assert_eq!(repo.auto_connect().unwrap(), None);
    assert!(repo.list().unwrap().is_empty());
}

// ---------------------------------------------------------------
// Delete, then delete again
// ---------------------------------------------------------------
#[test]
fn test_delete_twice_is_noop() {
    let (_dir, repo) = setup_repo();
    let p1 = ProfileRecord::with_creation_date("Living Room", false, 1000);

    repo.add(&p1).unwrap();
    repo.delete(&p1).unwrap();
    assert!(repo.list().unwrap().is_empty());

    repo.delete(&p1).unwrap();
    assert!(!repo.delete_by_date(1000).unwrap());
    assert!(repo.list().unwrap().is_empty());
}

// ---------------------------------------------------------------
// Legacy version 1 row survives the upgrade
// ---------------------------------------------------------------
#[test]
fn test_legacy_v1_row_reads_after_migration() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::new(dir.path());
    {
        let conn = Connection::open(config.database_path()).unwrap();
        conn.execute_batch(migrations::CREATE_V1_SERVER_PROFILES).unwrap();
        conn.execute(
            "INSERT INTO andrompd_mpd_server_profiles VALUES ('Old Server', 1, 'mpd.lan', 'pw', 6600, 500)",
            [],
        )
        .unwrap();
    }

    let repo = ProfileRepository::open(&config);
    let profiles = repo.list().unwrap();

    assert_eq!(profiles.len(), 1);
    let legacy = &profiles[0];
    assert_eq!(legacy.name(), "Old Server");
    assert_eq!(legacy.hostname(), "mpd.lan");
    assert_eq!(legacy.creation_date(), 500);
    assert!(legacy.auto_connect());
    assert!(!legacy.http_cover_enabled());
    assert_eq!(legacy.http_cover_regex(), "");
    assert!(!legacy.streaming_enabled());
    assert_eq!(legacy.streaming_url(), "");

    let conn = Connection::open(config.database_path()).unwrap();
    assert_eq!(migrations::schema_version(&conn).unwrap(), 3);
}

#[test]
fn test_key_conflict_keeps_existing_auto_connect() {
    let (_dir, repo) = setup_repo();
    let original = ProfileRecord::with_creation_date("Original", true, 1000);
    repo.add(&original).unwrap();

    let clash = ProfileRecord::with_creation_date("Clash", true, 1000);
    let err = repo.add(&clash).unwrap_err();
    assert!(matches!(err, ProfileError::KeyConflict(1000)));

    // The flag clear was rolled back with the failed insert
    assert_eq!(repo.auto_connect().unwrap(), Some(original));
}

#[test]
fn test_non_auto_connect_add_keeps_flag() {
    let (_dir, repo) = setup_repo();
    let auto = ProfileRecord::with_creation_date("Auto", true, 1);
    repo.add(&auto).unwrap();
    repo.add(&ProfileRecord::with_creation_date("Manual", false, 2)).unwrap();

    assert_eq!(repo.auto_connect().unwrap(), Some(auto));
}

#[test]
fn test_make_auto_connect_keeps_identity() {
    let (_dir, repo) = setup_repo();
    let first = ProfileRecord::with_creation_date("First", true, 1).with_hostname("a");
    let second = ProfileRecord::with_creation_date("Second", false, 2).with_hostname("b");
    repo.add(&first).unwrap();
    repo.add(&second).unwrap();

    let promoted = repo.make_auto_connect(&second).unwrap();

    assert_eq!(promoted.creation_date(), 2);
    assert_eq!(promoted.hostname(), "b");
    assert_eq!(repo.auto_connect().unwrap(), Some(promoted));
    assert_eq!(repo.list().unwrap().len(), 2);
    assert_eq!(auto_connect_count(&repo), 1);
}

#[test]
fn test_subscribers_notified_per_mutation() {
    let (_dir, repo) = setup_repo();
    let subscription = repo.subscribe();
    let profile = ProfileRecord::with_creation_date("Kitchen", false, 10);

    repo.add(&profile).unwrap();
    assert_eq!(subscription.drain(), vec![ProfileEvent::Changed]);

    repo.delete(&profile).unwrap();
    assert_eq!(subscription.drain(), vec![ProfileEvent::Changed]);

    // Deleting a missing profile still signals
    repo.delete(&profile).unwrap();
    assert_eq!(subscription.drain(), vec![ProfileEvent::Changed]);

    repo.list().unwrap();
    repo.auto_connect().unwrap();
    assert!(subscription.drain().is_empty());
}

#[test]
fn test_make_auto_connect_signals_once() {
    let (_dir, repo) = setup_repo();
    let profile = ProfileRecord::with_creation_date("Office", false, 20);
    repo.add(&profile).unwrap();

    let subscription = repo.subscribe();
    repo.make_auto_connect(&profile).unwrap();

    assert_eq!(subscription.drain(), vec![ProfileEvent::Changed]);
    assert_eq!(subscription.try_recv(), None);
}

#[test]
fn test_slow_subscriber_holds_one_signal() {
    let (_dir, repo) = setup_repo();
    let subscription = repo.subscribe();

    for date in 0..25 {
        repo.add(&ProfileRecord::with_creation_date("P", date % 2 == 0, date)).unwrap();
    }

    assert_eq!(subscription.receiver().len(), 1);
    assert_eq!(subscription.drain(), vec![ProfileEvent::Changed]);
    assert_eq!(repo.events().subscriber_count(), 1);
}

#[test]
fn test_failed_add_does_not_notify() {
    let (_dir, repo) = setup_repo();
    repo.add(&ProfileRecord::with_creation_date("A", false, 1)).unwrap();

    let subscription = repo.subscribe();
    assert!(repo.add(&ProfileRecord::with_creation_date("B", false, 1)).is_err());
    assert!(subscription.drain().is_empty());
}

#[test]
fn test_unsubscribed_handle_gets_nothing() {
    let (_dir, repo) = setup_repo();
    let subscription = repo.subscribe();
    subscription.unsubscribe();

    repo.add(&ProfileRecord::with_creation_date("A", false, 1)).unwrap();
    assert_eq!(repo.events().subscriber_count(), 0);
}

#[test]
fn test_profiles_persist_across_repositories() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::new(dir.path());
    let profile = ProfileRecord::with_creation_date("Den", true, 77)
        .with_password("secret")
        .with_streaming(true, "http://den:8000")
        .with_http_cover(true, "http://den/%d");

    ProfileRepository::open(&config).add(&profile).unwrap();

    let reopened = ProfileRepository::open(&config);
    assert_eq!(reopened.list().unwrap(), vec![profile]);
}

#[test]
fn test_storage_unavailable_propagates() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();

    let repo = ProfileRepository::open(&StoreConfig::new(blocker.join("nested")));
    assert!(matches!(repo.list(), Err(ProfileError::StorageUnavailable { .. })));
    assert!(matches!(
        repo.add(&ProfileRecord::with_creation_date("A", false, 1)),
        Err(ProfileError::StorageUnavailable { .. })
    ));
}

// ---------------------------------------------------------------
// Random add/delete sequences against an in-memory model
// ---------------------------------------------------------------
#[test]
fn test_random_sequences_match_model() {
    let names = ["Attic", "Bedroom", "Cellar", "Den", "Kitchen", "Living Room"];

    for seed in 0..8u64 {
        let (_dir, repo) = setup_repo();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut model: BTreeMap<i64, ProfileRecord> = BTreeMap::new();

        for step in 0..40i64 {
            if !model.is_empty() && rng.gen_bool(0.3) {
                let keys: Vec<i64> = model.keys().copied().collect();
                let key = keys[rng.gen_range(0..keys.len())];
                let removed = model.remove(&key).unwrap();
                repo.delete(&removed).unwrap();
            } else {
                let name = names[rng.gen_range(0..names.len())];
                let profile = ProfileRecord::with_creation_date(name, rng.gen_bool(0.4), 1000 + step);
                if profile.auto_connect() {
                    for stored in model.values_mut() {
                        *stored = stored.clone().with_auto_connect(false);
                    }
                }
                repo.add(&profile).unwrap();
                model.insert(profile.creation_date(), profile);
            }

            assert!(auto_connect_count(&repo) <= 1, "seed {} step {}", seed, step);
        }

        let mut expected: Vec<ProfileRecord> = model.into_values().collect();
        expected.sort_by(|a, b| a.name().cmp(b.name()).then(a.creation_date().cmp(&b.creation_date())));
        assert_eq!(repo.list().unwrap(), expected, "seed {}", seed);
    }
}

// ---------------------------------------------------------------
// Concurrent writers keep the auto-connect invariant
// ---------------------------------------------------------------
#[test]
fn test_concurrent_auto_connect_adds() {
    let (_dir, repo) = setup_repo();
    let repo = Arc::new(repo);
    let subscription = repo.subscribe();

    let handles: Vec<_> = (0..4i64)
        .map(|worker| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                for i in 0..10i64 {
                    let date = worker * 100 + i;
                    let profile = ProfileRecord::with_creation_date(format!("w{}-{}", worker, i), true, date);
                    repo.add(&profile).unwrap();
                    assert!(repo.auto_connect().unwrap().is_some());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(repo.list().unwrap().len(), 40);
    assert_eq!(auto_connect_count(&repo), 1);
    // Undrained signals coalesce into one
    assert_eq!(subscription.drain(), vec![ProfileEvent::Changed]);
}
