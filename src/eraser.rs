//! Bottom-up recursive folder removal.
//!
//! The store only offers "list children" and "delete one object", and folders
//! can only be deleted once empty. [`Eraser::erase`] therefore walks down the
//! first remaining subfolder until it reaches a leaf, empties and removes the
//! leaf, steps back up one level and repeats until the target itself is gone.
//!
//! The walk keeps an explicit stack of path segments below the target; the
//! current folder is always `target` joined with that stack. Every step lists
//! the store afresh, so a run that stopped half-way can simply be started again.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::path;
use crate::store::RemoteStore;

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// A file that could not be removed. The run carries on without it.
#[derive(Debug)]
pub struct FileWarning {
    pub path: String,
    pub error: StoreError,
}

/// Outcome of an erase run.
#[derive(Debug, Default)]
pub struct EraseReport {
    /// Set once the target is gone, either removed by this run or already absent.
    pub fully_deleted: bool,
    pub deleted_files: Vec<String>,
    pub deleted_folders: Vec<String>,
    pub warnings: Vec<FileWarning>,
    /// Folders left behind because something beneath them could not be removed.
    pub stuck_folders: Vec<String>,
}

impl EraseReport {
    pub fn total_deleted(&self) -> usize {
        self.deleted_files.len() + self.deleted_folders.len()
    }
}

#[derive(Debug, Error)]
pub enum EraseError {
    #[error("failed to list {path}: {source}")]
    List {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete folder {path}: {source}")]
    DeleteFolder {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("{parent} lists a child named {name:?}, which would leave the target")]
    InvalidName { parent: String, name: String },

    #[error("{path} is nested deeper than {max_depth} levels below the target")]
    TooDeep { path: String, max_depth: usize },

    #[error(
        "{path} could not be removed: {} file(s) and {} folder(s) remain",
        .report.warnings.len(),
        .report.stuck_folders.len()
    )]
    Incomplete { path: String, report: Box<EraseReport> },
}

/// Progress notifications emitted while erasing.
#[derive(Debug, Clone, Copy)]
pub enum EraseEvent<'a> {
    Descended(&'a str),
    FileDeleted(&'a str),
    FileSkipped { path: &'a str, error: &'a StoreError },
    FolderDeleted(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    File,
    Folder,
}

/// One deletion that [`Eraser::erase`] would issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    pub kind: ObjectKind,
    pub path: String,
}

pub struct Eraser<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    max_depth: usize,
    observer: Option<Box<dyn FnMut(EraseEvent<'_>) + 'a>>,
}

impl<'a, S: RemoteStore + ?Sized> Eraser<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
            observer: None,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn on_event(mut self, observer: impl FnMut(EraseEvent<'_>) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn emit(&mut self, event: EraseEvent<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }

    /// Delete `target` and everything beneath it.
    ///
    /// Succeeds only when `target` no longer exists. A target that is already
    /// absent counts as erased.
    pub fn erase(&mut self, target: &str) -> Result<EraseReport, EraseError> {
        let target = path::normalize(target);
        let mut segments: Vec<String> = Vec::new();
        let mut stuck: HashSet<String> = HashSet::new();
        let mut vanished: HashSet<String> = HashSet::new();
        let mut report = EraseReport::default();

        info!(target = %target, store = %self.store.describe(), "erasing folder tree");

        loop {
            let current = path::join_segments(&target, &segments);

            let subfolders = match self.store.list_subfolders(&current) {
                Ok(subfolders) => subfolders,
                Err(e) if e.is_not_found() => {
                    debug!(path = %current, "folder already gone");
                    if segments.pop().is_none() {
                        report.fully_deleted = true;
                        return Ok(report);
                    }
                    vanished.insert(current);
                    continue;
                }
                Err(source) => return Err(EraseError::List { path: current, source }),
            };

            let mut next = None;
            let mut blocked = false;
            for name in &subfolders {
                validate_child(&current, name)?;
                let child = path::compose(&current, name);
                if vanished.contains(&child) {
                    // Listed by its parent but not found when opened.
                    return Err(EraseError::List {
                        source: StoreError::NotFound(child.clone()),
                        path: child,
                    });
                }
                if stuck.contains(&child) {
                    blocked = true;
                } else if next.is_none() {
                    next = Some(name.clone());
                }
            }

            if let Some(name) = next {
                if segments.len() >= self.max_depth {
                    return Err(EraseError::TooDeep {
                        path: path::compose(&current, &name),
                        max_depth: self.max_depth,
                    });
                }
                segments.push(name);
                let descended = path::join_segments(&target, &segments);
                debug!(path = %descended, "descending");
                self.emit(EraseEvent::Descended(&descended));
                continue;
            }

            // Leaf, or only stuck children remain: empty it and try to remove it.
            let skipped_before = report.warnings.len();
            self.delete_files(&current, &mut report)?;
            blocked |= report.warnings.len() > skipped_before;

            match self.store.delete_folder(&current) {
                Ok(()) => {
                    info!(path = %current, "deleted folder");
                    self.emit(EraseEvent::FolderDeleted(&current));
                    report.deleted_folders.push(current.clone());
                }
                Err(e) if e.is_not_found() => {
                    debug!(path = %current, "folder vanished before delete");
                    vanished.insert(current.clone());
                }
                Err(e) if e.is_non_empty() && blocked => {
                    warn!(path = %current, "folder left in place, something beneath it could not be deleted");
                    stuck.insert(current.clone());
                    report.stuck_folders.push(current.clone());
                }
                Err(source) => return Err(EraseError::DeleteFolder { path: current, source }),
            }

            if segments.pop().is_none() {
                if stuck.contains(&target) {
                    return Err(EraseError::Incomplete {
                        path: target,
                        report: Box::new(report),
                    });
                }
                info!(
                    target = %target,
                    files = report.deleted_files.len(),
                    folders = report.deleted_folders.len(),
                    "folder tree erased"
                );
                report.fully_deleted = true;
                return Ok(report);
            }
        }
    }

    /// Delete every file directly inside `folder`, best-effort.
    fn delete_files(&mut self, folder: &str, report: &mut EraseReport) -> Result<(), EraseError> {
        let files = match self.store.list_files(folder) {
            Ok(files) => files,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(source) => {
                return Err(EraseError::List {
                    path: folder.to_string(),
                    source,
                })
            }
        };

        for name in files {
            validate_child(folder, &name)?;
            let file = path::compose(folder, &name);
            match self.store.delete_file(&file) {
                Ok(()) => {
                    debug!(path = %file, "deleted file");
                    self.emit(EraseEvent::FileDeleted(&file));
                    report.deleted_files.push(file);
                }
                Err(e) if e.is_not_found() => {
                    debug!(path = %file, "file vanished before delete");
                }
                Err(error) => {
                    warn!(path = %file, error = %error, "skipping file that could not be deleted");
                    self.emit(EraseEvent::FileSkipped {
                        path: &file,
                        error: &error,
                    });
                    report.warnings.push(FileWarning { path: file, error });
                }
            }
        }
        Ok(())
    }

    /// List, without deleting anything, the deletions `erase` would issue in order.
    pub fn plan(&self, target: &str) -> Result<Vec<PlannedDeletion>, EraseError> {
        let target = path::normalize(target);
        let mut planned = Vec::new();
        let mut frames = match self.open_frame(&target)? {
            Some(frame) => vec![frame],
            None => return Ok(planned),
        };

        while let Some(frame) = frames.last_mut() {
            if let Some(child) = frame.pending.pop_front() {
                let child_path = path::compose(&frame.path, &child);
                if frames.len() > self.max_depth {
                    return Err(EraseError::TooDeep {
                        path: child_path,
                        max_depth: self.max_depth,
                    });
                }
                if let Some(child_frame) = self.open_frame(&child_path)? {
                    frames.push(child_frame);
                }
                continue;
            }

            if let Some(done) = frames.pop() {
                planned.extend(done.files.iter().map(|name| PlannedDeletion {
                    kind: ObjectKind::File,
                    path: path::compose(&done.path, name),
                }));
                planned.push(PlannedDeletion {
                    kind: ObjectKind::Folder,
                    path: done.path,
                });
            }
        }
        Ok(planned)
    }

    fn open_frame(&self, folder: &str) -> Result<Option<Frame>, EraseError> {
        let list_error = |source| EraseError::List {
            path: folder.to_string(),
            source,
        };
        let subfolders = match self.store.list_subfolders(folder) {
            Ok(subfolders) => subfolders,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(list_error(e)),
        };
        let files = self.store.list_files(folder).map_err(list_error)?;
        for name in subfolders.iter().chain(files.iter()) {
            validate_child(folder, name)?;
        }

        Ok(Some(Frame {
            path: folder.to_string(),
            pending: subfolders.into(),
            files,
        }))
    }
}

struct Frame {
    path: String,
    pending: VecDeque<String>,
    files: Vec<String>,
}

fn validate_child(parent: &str, name: &str) -> Result<(), EraseError> {
    path::validate_name(name).map_err(|_| EraseError::InvalidName {
        parent: parent.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{Fault, JournalEntry, MemoryStore, Operation};

    fn deleted(store: &MemoryStore) -> Vec<String> {
        store
            .journal()
            .into_iter()
            .filter_map(|entry| match entry {
                JournalEntry::DeletedFile(p) | JournalEntry::DeletedFolder(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn deletes_depth_three_tree_bottom_up() {
        let store = MemoryStore::new()
            .with_file("/root/a/b/f1")
            .with_file("/root/a/b/f2");

        let report = Eraser::new(&store).erase("/root").unwrap();

        assert!(report.fully_deleted);
        assert_eq!(
            deleted(&store),
            vec!["/root/a/b/f1", "/root/a/b/f2", "/root/a/b", "/root/a", "/root"]
        );
        assert!(store.list_subfolders("/root").unwrap_err().is_not_found());
        assert!(store.list_files("/root").unwrap_err().is_not_found());
    }

    #[test]
    fn files_only_folder_goes_in_one_pass() {
        let store = MemoryStore::new()
            .with_file("/docs/x")
            .with_file("/docs/y")
            .with_file("/docs/z");

        let report = Eraser::new(&store).erase("/docs").unwrap();

        assert_eq!(report.deleted_files.len(), 3);
        assert_eq!(deleted(&store), vec!["/docs/x", "/docs/y", "/docs/z", "/docs"]);
    }

    #[test]
    fn empty_target_needs_single_folder_delete() {
        let store = MemoryStore::new().with_folder("/lib/empty");

        let report = Eraser::new(&store).erase("/lib/empty").unwrap();

        assert!(report.deleted_files.is_empty());
        assert_eq!(store.journal(), vec![JournalEntry::DeletedFolder("/lib/empty".into())]);
        assert!(store.contains_folder("/lib"));
    }

    #[test]
    fn siblings_are_visited_in_listing_order() {
        let store = MemoryStore::new()
            .with_file("/t/a/1")
            .with_file("/t/b/2")
            .with_file("/t/top");

        Eraser::new(&store).erase("/t").unwrap();

        assert_eq!(
            deleted(&store),
            vec!["/t/a/1", "/t/a", "/t/b/2", "/t/b", "/t/top", "/t"]
        );
    }

    #[test]
    fn missing_target_counts_as_erased() {
        let store = MemoryStore::new().with_folder("/lib");
        let report = Eraser::new(&store).erase("/lib/gone").unwrap();
        assert!(report.fully_deleted);
        assert_eq!(report.total_deleted(), 0);
    }

    #[test]
    fn stuck_file_blocks_only_its_ancestors() {
        let store = MemoryStore::new()
            .with_file("/t/a/locked")
            .with_file("/t/a/free")
            .with_file("/t/b/other");
        store.inject(Operation::DeleteFile, "/t/a/locked", Fault::PermissionDenied);

        let err = Eraser::new(&store).erase("/t").unwrap_err();

        let (path, report) = match err {
            EraseError::Incomplete { path, report } => (path, report),
            other => panic!("expected an incomplete erase, got {other:?}"),
        };
        assert_eq!(path, "/t");
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, "/t/a/locked");
        assert_eq!(report.stuck_folders, vec!["/t/a", "/t"]);
        assert!(!store.contains_file("/t/a/free"));
        assert!(!store.contains_folder("/t/b"));
        assert!(store.contains_file("/t/a/locked"));
        assert!(store.delete_folder("/t/a").unwrap_err().is_non_empty());

        store.clear_faults();
        let report = Eraser::new(&store).erase("/t").unwrap();
        assert!(report.fully_deleted);
        assert!(!store.contains_folder("/t"));
    }

    #[test]
    fn fatal_failure_then_rerun_finishes_the_job() {
        let store = MemoryStore::new()
            .with_file("/t/a/1")
            .with_file("/t/b/c/2")
            .with_file("/t/b/3");
        store.inject_once(Operation::DeleteFolder, "/t/b/c", Fault::Transient);

        let err = Eraser::new(&store).erase("/t").unwrap_err();
        assert!(matches!(err, EraseError::DeleteFolder { ref path, .. } if path == "/t/b/c"));
        assert!(!store.contains_folder("/t/a"));
        assert!(store.contains_folder("/t/b/c"));

        let report = Eraser::new(&store).erase("/t").unwrap();
        assert!(report.fully_deleted);
        assert!(!store.contains_folder("/t"));
        assert!(store.list_subfolders("/t").unwrap_err().is_not_found());
    }

    #[test]
    fn permission_denied_on_folder_delete_is_fatal() {
        let store = MemoryStore::new().with_file("/t/a/1");
        store.inject(Operation::DeleteFolder, "/t/a", Fault::PermissionDenied);

        let err = Eraser::new(&store).erase("/t").unwrap_err();
        assert!(matches!(
            err,
            EraseError::DeleteFolder { source: StoreError::PermissionDenied(_), .. }
        ));
    }

    #[test]
    fn list_failure_aborts() {
        let store = MemoryStore::new().with_file("/t/a/1");
        store.inject(Operation::ListSubfolders, "/t/a", Fault::Transient);

        let err = Eraser::new(&store).erase("/t").unwrap_err();
        assert!(matches!(err, EraseError::List { ref path, .. } if path == "/t/a"));
        assert!(store.contains_file("/t/a/1"));
    }

    #[test]
    fn depth_guard_stops_runaway_trees() {
        let store = MemoryStore::new().with_folder("/t/1/2/3/4");
        let err = Eraser::new(&store).max_depth(2).erase("/t").unwrap_err();
        assert!(matches!(err, EraseError::TooDeep { max_depth: 2, .. }));
    }

    #[test]
    fn observer_sees_every_step() {
        let store = MemoryStore::new().with_file("/t/a/1");
        let mut events = Vec::new();

        Eraser::new(&store)
            .on_event(|event| {
                events.push(match event {
                    EraseEvent::Descended(p) => format!("descend {}", p),
                    EraseEvent::FileDeleted(p) => format!("file {}", p),
                    EraseEvent::FileSkipped { path, .. } => format!("skip {}", path),
                    EraseEvent::FolderDeleted(p) => format!("folder {}", p),
                });
            })
            .erase("/t")
            .unwrap();

        assert_eq!(
            events,
            vec!["descend /t/a", "file /t/a/1", "folder /t/a", "folder /t"]
        );
    }

    #[test]
    fn plan_matches_erase_order() {
        let build = || {
            MemoryStore::new()
                .with_file("/t/a/x/1")
                .with_file("/t/a/2")
                .with_folder("/t/b")
                .with_file("/t/3")
        };

        let planned: Vec<String> = Eraser::new(&build())
            .plan("/t")
            .unwrap()
            .into_iter()
            .map(|p| p.path)
            .collect();

        let store = build();
        Eraser::new(&store).erase("/t").unwrap();
        assert_eq!(planned, deleted(&store));
    }

    #[test]
    fn folder_listed_but_not_found_is_fatal() {
        let store = MemoryStore::new().with_folder("/t/a");
        store.inject(Operation::ListSubfolders, "/t/a", Fault::NotFound);
        let mut descents = 0;

        let err = Eraser::new(&store)
            .on_event(|event| {
                if let EraseEvent::Descended(_) = event {
                    descents += 1;
                }
            })
            .erase("/t")
            .unwrap_err();

        assert!(matches!(
            err,
            EraseError::List { ref path, source: StoreError::NotFound(_) } if path == "/t/a"
        ));
        assert_eq!(descents, 1);
        assert!(store.contains_folder("/t/a"));
    }

    #[test]
    fn file_vanishing_mid_run_counts_as_done() {
        let store = MemoryStore::new().with_file("/t/a/1").with_file("/t/a/2");

        let report = Eraser::new(&store)
            .on_event(|event| {
                if let EraseEvent::FileDeleted("/t/a/1") = event {
                    store.delete_file("/t/a/2").unwrap();
                }
            })
            .erase("/t")
            .unwrap();

        assert!(report.fully_deleted);
        assert_eq!(report.deleted_files, vec!["/t/a/1"]);
        assert!(report.warnings.is_empty());
        assert!(!store.contains_folder("/t"));
    }

    #[test]
    fn folder_vanishing_mid_run_counts_as_done() {
        let store = MemoryStore::new().with_folder("/t/a/b");

        let report = Eraser::new(&store)
            .on_event(|event| {
                if let EraseEvent::Descended("/t/a/b") = event {
                    store.delete_folder("/t/a/b").unwrap();
                }
            })
            .erase("/t")
            .unwrap();

        assert!(report.fully_deleted);
        assert_eq!(report.deleted_folders, vec!["/t/a", "/t"]);
        assert!(!store.contains_folder("/t"));
    }

    #[test]
    fn non_empty_folder_with_nothing_stuck_is_fatal() {
        let store = MemoryStore::new().with_file("/t/a/1");
        // The store claims the file is gone but keeps it.
        store.inject(Operation::DeleteFile, "/t/a/1", Fault::NotFound);

        let err = Eraser::new(&store).erase("/t").unwrap_err();

        assert!(matches!(
            err,
            EraseError::DeleteFolder { ref path, source: StoreError::NonEmptyDirectory(_) }
                if path == "/t/a"
        ));
        assert!(store.contains_file("/t/a/1"));
    }

    /// Lists one fixed child under `/t` and nothing anywhere else.
    struct OneChild(&'static str);

    impl RemoteStore for OneChild {
        fn list_subfolders(&self, path: &str) -> Result<Vec<String>, StoreError> {
            match path {
                "/t" => Ok(vec![self.0.to_string()]),
                _ => Ok(Vec::new()),
            }
        }
        fn list_files(&self, _: &str) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
        fn delete_file(&self, path: &str) -> Result<(), StoreError> {
            panic!("unexpected delete of {path}")
        }
        fn delete_folder(&self, path: &str) -> Result<(), StoreError> {
            panic!("unexpected delete of {path}")
        }
        fn folder_exists(&self, _: &str) -> Result<bool, StoreError> {
            Ok(true)
        }
        fn create_folder(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn rename_folder(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn copy_folder(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn copy_file(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn describe(&self) -> String {
            "one child".to_string()
        }
    }

    #[test]
    fn bad_child_names_abort_before_any_delete() {
        for bad in ["..", "a/b", "", "."] {
            let store = OneChild(bad);

            let err = Eraser::new(&store).erase("/t").unwrap_err();
            assert!(
                matches!(err, EraseError::InvalidName { ref parent, ref name } if parent == "/t" && name == bad),
                "{bad:?} gave {err:?}"
            );
            assert!(matches!(
                Eraser::new(&store).plan("/t"),
                Err(EraseError::InvalidName { .. })
            ));
        }
    }

    #[test]
    fn plan_does_not_touch_store() {
        let store = MemoryStore::new().with_file("/t/a/1");
        let planned = Eraser::new(&store).plan("/t").unwrap();
        assert_eq!(planned.len(), 3);
        assert_eq!(planned[0].kind, ObjectKind::File);
        assert!(store.journal().is_empty());
        assert!(store.contains_file("/t/a/1"));
    }
}
