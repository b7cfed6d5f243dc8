use std::collections::BTreeMap;

use sharesweep::eraser::{EraseError, Eraser};
use sharesweep::logbook::LogBook;
use sharesweep::migrate::{self, FolderMapping};
use sharesweep::restructure::{self, Rename, RestructurePlan};
use sharesweep::store::memory::{Fault, MemoryStore, Operation};
use sharesweep::RemoteStore;
use tempfile::TempDir;

#[test]
fn migrate_then_erase_source() {
    let store = MemoryStore::new()
        .with_file("/old/Docs/A/x.txt")
        .with_file("/old/Docs/B/y.txt")
        .with_folder("/new");

    let mut names = BTreeMap::new();
    names.insert("A".to_string(), "Alpha".to_string());
    let summary =
        migrate::copy_subfolders(&store, "/old/Docs", "/new", &FolderMapping::new(names)).unwrap();

    assert!(summary.is_clean());
    assert_eq!(summary.copied.len(), 2);
    assert!(store.contains_file("/new/Alpha/x.txt"));
    assert!(store.contains_file("/new/B/y.txt"));

    let report = Eraser::new(&store).erase("/old/Docs").unwrap();

    assert!(report.fully_deleted);
    assert!(store.list_subfolders("/old/Docs").unwrap_err().is_not_found());
    assert!(store.contains_folder("/old"));
    assert!(store.contains_file("/new/Alpha/x.txt"));
}

#[test]
fn locked_file_keeps_its_branch_until_released() {
    let store = MemoryStore::new()
        .with_file("/t/a/locked.txt")
        .with_file("/t/a/ok.txt")
        .with_file("/t/b/f.txt");
    store.inject(Operation::DeleteFile, "/t/a/locked.txt", Fault::PermissionDenied);

    let err = Eraser::new(&store).erase("/t").unwrap_err();
    match err {
        EraseError::Incomplete { path, report } => {
            assert_eq!(path, "/t");
            assert!(!report.fully_deleted);
            assert_eq!(report.warnings.len(), 1);
            assert_eq!(report.warnings[0].path, "/t/a/locked.txt");
            assert_eq!(report.stuck_folders, vec!["/t/a", "/t"]);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!store.contains_folder("/t/b"));
    assert!(!store.contains_file("/t/a/ok.txt"));
    assert!(store.contains_file("/t/a/locked.txt"));

    store.clear_faults();
    let report = Eraser::new(&store).erase("/t").unwrap();
    assert!(report.fully_deleted);
    assert_eq!(report.deleted_files, vec!["/t/a/locked.txt"]);
    assert!(!store.contains_folder("/t"));
}

#[test]
fn restructure_changes_are_logged() {
    let dir = TempDir::new().unwrap();
    let book = LogBook::new(dir.path().join("sheet.csv"));
    let store = MemoryStore::new()
        .with_folder("/ops/S1/Folder_01")
        .with_folder("/ops/S2");

    let plan = RestructurePlan {
        root: "/ops".to_string(),
        rename: Some(Rename {
            from: "Folder_01".to_string(),
            to: "Folder_1".to_string(),
        }),
        create: vec!["Folder_1".to_string(), "Folder_2".to_string()],
    };
    let summary = restructure::restructure(&store, &plan).unwrap();

    assert_eq!(summary.units, 2);
    assert_eq!(summary.changes.len(), 4);
    assert!(summary.failures.is_empty());
    for unit in ["/ops/S1", "/ops/S2"] {
        let mut folders = store.list_subfolders(unit).unwrap();
        folders.sort();
        assert_eq!(folders, vec!["Folder_1", "Folder_2"]);
    }

    book.append_block(store.list_subfolders("/ops").unwrap()).unwrap();
    assert_eq!(book.last_block().unwrap(), vec!["S1", "S2"]);
}
