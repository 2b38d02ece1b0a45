//! Backup and restore of the trail data directory, including progress made
//! after the snapshot.

mod common;

use common::origin_zone;
use tempfile::TempDir;

use wildtales::storage::backup::{BackupManager, BackupType, RetentionPolicy};
use wildtales::storage::PoiStore;

#[test]
fn snapshot_preserves_zone_progress() {
    let root = TempDir::new().unwrap();
    let data_dir = root.path().join("data");
    let store = PoiStore::open(&data_dir).unwrap();

    let mut pois = origin_zone();
    pois[0].visited = true;
    pois[0].visited_at = Some(chrono::Utc::now());
    store.save("origin", &pois).unwrap();

    let mut manager = BackupManager::new(
        data_dir.clone(),
        root.path().join("backups"),
        RetentionPolicy::default(),
    )
    .unwrap();
    let meta = manager
        .create_backup(Some("after-first-walk".into()), BackupType::Manual)
        .unwrap();
    assert!(manager.verify_backup(&meta.id).unwrap());

    // Progress resets after the snapshot...
    store.reset_zone("origin").unwrap();
    assert!(!store.load("origin").unwrap()[0].visited);

    // ...and comes back from the archive.
    let restore_dir = root.path().join("restored");
    manager.restore_backup(&meta.id, &restore_dir).unwrap();

    let restored_store = PoiStore::open(restore_dir.join("data")).unwrap();
    let restored = restored_store.load("origin").unwrap();
    assert!(restored[0].visited);
    assert!(restored[0].visited_at.is_some());
}

#[test]
fn index_survives_manager_reopen() {
    let root = TempDir::new().unwrap();
    let data_dir = root.path().join("data");
    PoiStore::open(&data_dir).unwrap().save("origin", &origin_zone()).unwrap();

    let backup_dir = root.path().join("backups");
    let id = {
        let mut manager =
            BackupManager::new(data_dir.clone(), backup_dir.clone(), RetentionPolicy::default())
                .unwrap();
        manager
            .create_backup(None, BackupType::Manual)
            .unwrap()
            .id
    };

    let manager =
        BackupManager::new(data_dir, backup_dir, RetentionPolicy::default()).unwrap();
    let listed = manager.list_backups();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
}
