//! Copying folders and files between locations of the same store.
//!
//! Folder copies go through a [`FolderMapping`] so that well-known source
//! folders land under their new names in the destination structure.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::StoreError;
use crate::path;
use crate::store::RemoteStore;

/// Static source-name -> destination-name lookup.
#[derive(Debug, Clone, Default)]
pub struct FolderMapping {
    names: BTreeMap<String, String>,
}

impl FolderMapping {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn maps(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Where a folder called `name` goes below `destination_root`.
    ///
    /// Unmapped folders keep their own name.
    pub fn destination_for(&self, name: &str, destination_root: &str) -> String {
        let target = self.names.get(name).map_or(name, String::as_str);
        path::compose(destination_root, target)
    }
}

/// A copy that did not go through.
#[derive(Debug)]
pub struct CopyFailure {
    pub from: String,
    pub to: String,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub struct CopySummary {
    pub copied: Vec<(String, String)>,
    pub failures: Vec<CopyFailure>,
}

impl CopySummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, from: String, to: String, result: Result<(), StoreError>) {
        match result {
            Ok(()) => {
                info!(from = %from, to = %to, "copied");
                self.copied.push((from, to));
            }
            Err(error) => {
                warn!(from = %from, to = %to, error = %error, "copy failed");
                self.failures.push(CopyFailure { from, to, error });
            }
        }
    }
}

/// Copy every immediate subfolder of `source_dir` below `destination_root`,
/// renaming through `mapping`. One failed folder does not stop the others.
pub fn copy_subfolders<S: RemoteStore + ?Sized>(
    store: &S,
    source_dir: &str,
    destination_root: &str,
    mapping: &FolderMapping,
) -> Result<CopySummary, StoreError> {
    let mut summary = CopySummary::default();
    for name in store.list_subfolders(source_dir)? {
        path::validate_name(&name)?;
        let from = path::compose(source_dir, &name);
        let to = mapping.destination_for(&name, destination_root);
        let result = store.copy_folder(&from, &to);
        summary.record(from, to, result);
    }
    Ok(summary)
}

/// Copy every immediate file of `source_dir` into `destination_dir`.
pub fn copy_files<S: RemoteStore + ?Sized>(
    store: &S,
    source_dir: &str,
    destination_dir: &str,
) -> Result<CopySummary, StoreError> {
    let mut summary = CopySummary::default();
    copy_loose_files(store, source_dir, destination_dir, &mut summary)?;
    Ok(summary)
}

/// Copy `source_dir` itself into `destination_dir`, keeping its name.
pub fn copy_folder_into<S: RemoteStore + ?Sized>(
    store: &S,
    source_dir: &str,
    destination_dir: &str,
) -> Result<CopySummary, StoreError> {
    let source = path::normalize(source_dir);
    let name = path::name(&source).to_string();
    path::validate_name(&name)?;

    let mut summary = CopySummary::default();
    let to = path::compose(destination_dir, &name);
    let result = store.copy_folder(&source, &to);
    summary.record(source, to, result);
    Ok(summary)
}

/// Merge `source_dir` into an existing destination structure.
///
/// Loose files of `source_dir` land directly in `destination_root`. A mapped
/// subfolder is merged into `destination_root/<mapped>`, which is created when
/// missing: its files and child folders are copied in one by one, next to
/// whatever the destination already holds. Unmapped subfolders are copied
/// whole to `destination_root/<name>`.
///
/// Child folders that already exist at the destination are reported as
/// failures, never overwritten.
pub fn structure_copy<S: RemoteStore + ?Sized>(
    store: &S,
    source_dir: &str,
    destination_root: &str,
    mapping: &FolderMapping,
) -> Result<CopySummary, StoreError> {
    let mut summary = CopySummary::default();
    copy_loose_files(store, source_dir, destination_root, &mut summary)?;

    for name in store.list_subfolders(source_dir)? {
        path::validate_name(&name)?;
        let from = path::compose(source_dir, &name);
        let to = mapping.destination_for(&name, destination_root);

        if !mapping.maps(&name) {
            let result = store.copy_folder(&from, &to);
            summary.record(from, to, result);
            continue;
        }
        if let Err(error) = merge_into(store, &from, &to, &mut summary) {
            warn!(from = %from, to = %to, error = %error, "merge failed");
            summary.failures.push(CopyFailure { from, to, error });
        }
    }
    Ok(summary)
}

fn merge_into<S: RemoteStore + ?Sized>(
    store: &S,
    from: &str,
    to: &str,
    summary: &mut CopySummary,
) -> Result<(), StoreError> {
    if !store.folder_exists(to)? {
        store.create_folder(&path::parent(to), path::name(to))?;
        info!(path = %to, "created merge destination");
    }
    copy_loose_files(store, from, to, summary)?;

    for child in store.list_subfolders(from)? {
        path::validate_name(&child)?;
        let child_from = path::compose(from, &child);
        let child_to = path::compose(to, &child);
        let result = store.copy_folder(&child_from, &child_to);
        summary.record(child_from, child_to, result);
    }
    Ok(())
}

fn copy_loose_files<S: RemoteStore + ?Sized>(
    store: &S,
    source_dir: &str,
    destination_dir: &str,
    summary: &mut CopySummary,
) -> Result<(), StoreError> {
    for name in store.list_files(source_dir)? {
        path::validate_name(&name)?;
        let from = path::compose(source_dir, &name);
        let to = path::compose(destination_dir, &name);
        let result = store.copy_file(&from, destination_dir);
        summary.record(from, to, result);
    }
    Ok(())
}
