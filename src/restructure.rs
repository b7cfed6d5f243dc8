//! Bulk restructuring of sibling folders.
//!
//! Each immediate subfolder of the root is a "unit" (a store, a department,
//! a project...). A plan renames one well-known subfolder inside every unit
//! and makes sure a set of standard subfolders exists in each.

use tracing::{info, warn};

use crate::error::StoreError;
use crate::path;
use crate::store::RemoteStore;

#[derive(Debug, Clone)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct RestructurePlan {
    pub root: String,
    pub rename: Option<Rename>,
    pub create: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Renamed { from: String, to: String },
    Created(String),
    /// The rename target already exists in the unit.
    SkippedRename(String),
}

#[derive(Debug)]
pub struct ChangeFailure {
    pub path: String,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub struct RestructureSummary {
    pub units: usize,
    pub changes: Vec<Change>,
    pub failures: Vec<ChangeFailure>,
}

pub fn restructure<S: RemoteStore + ?Sized>(
    store: &S,
    plan: &RestructurePlan,
) -> Result<RestructureSummary, StoreError> {
    if let Some(rename) = &plan.rename {
        path::validate_name(&rename.from)?;
        path::validate_name(&rename.to)?;
    }
    for name in &plan.create {
        path::validate_name(name)?;
    }

    let mut summary = RestructureSummary::default();
    let units = store.list_subfolders(&plan.root)?;
    summary.units = units.len();

    for unit in units {
        let unit_path = path::compose(&plan.root, &unit);
        let existing = match store.list_subfolders(&unit_path) {
            Ok(existing) => existing,
            Err(error) => {
                warn!(unit = %unit_path, error = %error, "cannot list unit, skipping");
                summary.failures.push(ChangeFailure { path: unit_path, error });
                continue;
            }
        };

        if let Some(rename) = &plan.rename {
            if existing.contains(&rename.from) {
                let from = path::compose(&unit_path, &rename.from);
                if existing.contains(&rename.to) {
                    summary.changes.push(Change::SkippedRename(from));
                } else {
                    match store.rename_folder(&from, &rename.to) {
                        Ok(()) => {
                            let to = path::compose(&unit_path, &rename.to);
                            info!(from = %from, to = %to, "renamed folder");
                            summary.changes.push(Change::Renamed { from, to });
                        }
                        Err(error) => summary.failures.push(ChangeFailure { path: from, error }),
                    }
                }
            }
        }

        for name in &plan.create {
            let renamed_into = plan.rename.as_ref().map_or(false, |r| r.to == *name && existing.contains(&r.from));
            if existing.contains(name) || renamed_into {
                continue;
            }
            let created = path::compose(&unit_path, name);
            match store.create_folder(&unit_path, name) {
                Ok(()) => {
                    info!(path = %created, "created folder");
                    summary.changes.push(Change::Created(created));
                }
                Err(error) => summary.failures.push(ChangeFailure { path: created, error }),
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{Fault, MemoryStore, Operation};

    fn plan() -> RestructurePlan {
        RestructurePlan {
            root: "/site".into(),
            rename: Some(Rename {
                from: "Folder_01".into(),
                to: "Folder_1".into(),
            }),
            create: vec!["Folder_1".into(), "Folder_2".into(), "Folder_3".into()],
        }
    }

    #[test]
    fn renames_and_creates_in_every_unit() {
        let store = MemoryStore::new()
            .with_file("/site/store-a/Folder_01/inventory.xlsx")
            .with_folder("/site/store-b/Folder_2");

        let summary = restructure(&store, &plan()).unwrap();

        assert_eq!(summary.units, 2);
        assert!(summary.failures.is_empty());
        assert!(store.contains_file("/site/store-a/Folder_1/inventory.xlsx"));
        assert!(!store.contains_folder("/site/store-a/Folder_01"));
        for folder in ["Folder_1", "Folder_2", "Folder_3"] {
            assert!(store.contains_folder(&format!("/site/store-a/{}", folder)));
            assert!(store.contains_folder(&format!("/site/store-b/{}", folder)));
        }
        assert!(summary.changes.contains(&Change::Renamed {
            from: "/site/store-a/Folder_01".into(),
            to: "/site/store-a/Folder_1".into(),
        }));
    }

    #[test]
    fn rename_is_skipped_when_target_exists() {
        let store = MemoryStore::new()
            .with_folder("/site/u/Folder_01")
            .with_folder("/site/u/Folder_1");

        let summary = restructure(&store, &plan()).unwrap();

        assert!(summary
            .changes
            .contains(&Change::SkippedRename("/site/u/Folder_01".into())));
        assert!(store.contains_folder("/site/u/Folder_01"));
    }

    #[test]
    fn failures_are_collected_per_unit() {
        let store = MemoryStore::new()
            .with_folder("/site/a")
            .with_folder("/site/b");
        store.inject(Operation::ListSubfolders, "/site/a", Fault::PermissionDenied);

        let summary = restructure(&store, &plan()).unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].path, "/site/a");
        assert!(store.contains_folder("/site/b/Folder_3"));
    }

    #[test]
    fn rejects_names_with_separators() {
        let store = MemoryStore::new().with_folder("/site");
        let mut bad = plan();
        bad.create.push("../escape".into());
        assert!(matches!(
            restructure(&store, &bad),
            Err(StoreError::InvalidPath(_))
        ));
    }
}
