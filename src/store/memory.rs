//! In-memory store used by the test-suite and for rehearsing operations.
//!
//! Listing order is insertion order. Every successful mutation is appended
//! to a journal, and faults can be injected per operation and path.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use crate::error::StoreError;
use crate::path;
use crate::store::RemoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListSubfolders,
    ListFiles,
    DeleteFile,
    DeleteFolder,
    CreateFolder,
    RenameFolder,
    CopyFolder,
    CopyFile,
}

/// Failure to raise instead of performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    NotFound,
    PermissionDenied,
    Transient,
}

impl Fault {
    fn to_error(self, path: &str) -> StoreError {
        match self {
            Fault::NotFound => StoreError::NotFound(path.to_string()),
            Fault::PermissionDenied => StoreError::PermissionDenied(path.to_string()),
            Fault::Transient => StoreError::TransientNetwork(format!("simulated timeout on {}", path)),
        }
    }
}

/// A successful mutation, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    DeletedFile(String),
    DeletedFolder(String),
    CreatedFolder(String),
    Renamed { from: String, to: String },
    CopiedFolder { from: String, to: String },
    CopiedFile { from: String, to: String },
}

#[derive(Debug, Clone, Default)]
struct Folder {
    folders: Vec<String>,
    files: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Injected {
    fault: Fault,
    once: bool,
}

#[derive(Debug, Default)]
struct Inner {
    folders: BTreeMap<String, Folder>,
    faults: HashMap<(Operation, String), Injected>,
    journal: Vec<JournalEntry>,
}

impl Inner {
    fn check(&mut self, operation: Operation, target: &str) -> Result<(), StoreError> {
        let key = (operation, target.to_string());
        match self.faults.get(&key).copied() {
            Some(injected) => {
                if injected.once {
                    self.faults.remove(&key);
                }
                Err(injected.fault.to_error(target))
            }
            None => Ok(()),
        }
    }

    fn folder(&self, target: &str) -> Result<&Folder, StoreError> {
        self.folders
            .get(target)
            .ok_or_else(|| StoreError::NotFound(target.to_string()))
    }

    fn folder_mut(&mut self, target: &str) -> Result<&mut Folder, StoreError> {
        self.folders
            .get_mut(target)
            .ok_or_else(|| StoreError::NotFound(target.to_string()))
    }

    fn ensure_folder(&mut self, target: &str) {
        if self.folders.contains_key(target) {
            return;
        }
        let parent = path::parent(target);
        if !parent.is_empty() && parent != target {
            self.ensure_folder(&parent);
            if let Some(entry) = self.folders.get_mut(&parent) {
                entry.folders.push(path::name(target).to_string());
            }
        }
        self.folders.insert(target.to_string(), Folder::default());
    }

    fn subtree(&self, root: &str) -> Vec<(String, Folder)> {
        self.folders
            .iter()
            .filter(|(key, _)| path::is_within(key, root))
            .map(|(key, folder)| (key.clone(), folder.clone()))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RefCell<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a folder and any missing ancestors.
    pub fn with_folder(self, folder: &str) -> Self {
        self.inner.borrow_mut().ensure_folder(&path::normalize(folder));
        self
    }

    /// Create a file, creating its parent folders as needed.
    pub fn with_file(self, file: &str) -> Self {
        let file = path::normalize(file);
        {
            let mut inner = self.inner.borrow_mut();
            let parent = path::parent(&file);
            inner.ensure_folder(&parent);
            if let Some(folder) = inner.folders.get_mut(&parent) {
                folder.files.push(path::name(&file).to_string());
            }
        }
        self
    }

    /// Fail every `operation` on `target` until [`clear_faults`](Self::clear_faults).
    pub fn inject(&self, operation: Operation, target: &str, fault: Fault) {
        self.inner
            .borrow_mut()
            .faults
            .insert((operation, target.to_string()), Injected { fault, once: false });
    }

    /// Fail the next `operation` on `target` only.
    pub fn inject_once(&self, operation: Operation, target: &str, fault: Fault) {
        self.inner
            .borrow_mut()
            .faults
            .insert((operation, target.to_string()), Injected { fault, once: true });
    }

    pub fn clear_faults(&self) {
        self.inner.borrow_mut().faults.clear();
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.inner.borrow().journal.clone()
    }

    pub fn contains_folder(&self, folder: &str) -> bool {
        self.inner.borrow().folders.contains_key(folder)
    }

    pub fn contains_file(&self, file: &str) -> bool {
        let parent = path::parent(file);
        let name = path::name(file);
        self.inner
            .borrow()
            .folders
            .get(&parent)
            .map_or(false, |folder| folder.files.iter().any(|f| f == name))
    }
}

impl RemoteStore for MemoryStore {
    fn list_subfolders(&self, target: &str) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::ListSubfolders, target)?;
        Ok(inner.folder(target)?.folders.clone())
    }

    fn list_files(&self, target: &str) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::ListFiles, target)?;
        Ok(inner.folder(target)?.files.clone())
    }

    fn delete_file(&self, target: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::DeleteFile, target)?;
        let name = path::name(target).to_string();
        let folder = inner.folder_mut(&path::parent(target))?;
        let idx = folder
            .files
            .iter()
            .position(|f| *f == name)
            .ok_or_else(|| StoreError::NotFound(target.to_string()))?;
        folder.files.remove(idx);
        inner.journal.push(JournalEntry::DeletedFile(target.to_string()));
        Ok(())
    }

    fn delete_folder(&self, target: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::DeleteFolder, target)?;
        let folder = inner.folder(target)?;
        if !folder.folders.is_empty() || !folder.files.is_empty() {
            return Err(StoreError::NonEmptyDirectory(target.to_string()));
        }
        inner.folders.remove(target);
        let name = path::name(target).to_string();
        if let Some(parent) = inner.folders.get_mut(&path::parent(target)) {
            parent.folders.retain(|f| *f != name);
        }
        inner.journal.push(JournalEntry::DeletedFolder(target.to_string()));
        Ok(())
    }

    fn folder_exists(&self, target: &str) -> Result<bool, StoreError> {
        Ok(self.contains_folder(target))
    }

    fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError> {
        path::validate_name(name)?;
        let created = path::compose(parent, name);
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::CreateFolder, &created)?;
        inner.folder(parent)?;
        if inner.folders.contains_key(&created) {
            return Err(StoreError::Backend(format!("{} already exists", created)));
        }
        inner.ensure_folder(&created);
        inner.journal.push(JournalEntry::CreatedFolder(created));
        Ok(())
    }

    fn rename_folder(&self, target: &str, new_name: &str) -> Result<(), StoreError> {
        path::validate_name(new_name)?;
        let parent = path::parent(target);
        let renamed = path::compose(&parent, new_name);
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::RenameFolder, target)?;
        inner.folder(target)?;
        if inner.folders.contains_key(&renamed) {
            return Err(StoreError::Backend(format!("{} already exists", renamed)));
        }

        for (key, folder) in inner.subtree(target) {
            inner.folders.remove(&key);
            let moved = format!("{}{}", renamed, &key[target.len()..]);
            inner.folders.insert(moved, folder);
        }
        let old_name = path::name(target).to_string();
        if let Some(entry) = inner.folders.get_mut(&parent) {
            for child in entry.folders.iter_mut().filter(|f| **f == old_name) {
                *child = new_name.to_string();
            }
        }
        inner.journal.push(JournalEntry::Renamed {
            from: target.to_string(),
            to: renamed,
        });
        Ok(())
    }

    fn copy_folder(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::CopyFolder, from)?;
        inner.folder(from)?;
        inner.folder(&path::parent(to))?;
        if inner.folders.contains_key(to) {
            return Err(StoreError::Backend(format!("{} already exists", to)));
        }

        for (key, folder) in inner.subtree(from) {
            let copied = format!("{}{}", to, &key[from.len()..]);
            inner.folders.insert(copied, folder);
        }
        let name = path::name(to).to_string();
        if let Some(parent) = inner.folders.get_mut(&path::parent(to)) {
            parent.folders.push(name);
        }
        inner.journal.push(JournalEntry::CopiedFolder {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }

    fn copy_file(&self, from: &str, to_dir: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::CopyFile, from)?;
        let name = path::name(from).to_string();
        if !inner.folder(&path::parent(from))?.files.contains(&name) {
            return Err(StoreError::NotFound(from.to_string()));
        }
        let destination = inner.folder_mut(to_dir)?;
        if !destination.files.contains(&name) {
            destination.files.push(name.clone());
        }
        inner.journal.push(JournalEntry::CopiedFile {
            from: from.to_string(),
            to: path::compose(to_dir, &name),
        });
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
