//! Backends for the hierarchical document store.

pub mod local;
pub mod memory;
pub mod sharepoint;

use anyhow::{Context, Result};

use crate::config::Backend;
use crate::error::StoreError;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use sharepoint::SharePointStore;

/// The primitives every tool in this crate is built on.
///
/// Paths are slash-delimited store paths (see [`crate::path`]). Listings
/// return bare child names, not full paths.
pub trait RemoteStore {
    /// Immediate child folders of `path`, any order.
    fn list_subfolders(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Immediate child files of `path`.
    fn list_files(&self, path: &str) -> Result<Vec<String>, StoreError>;

    fn delete_file(&self, path: &str) -> Result<(), StoreError>;

    /// Remove an empty folder. Fails with [`StoreError::NonEmptyDirectory`]
    /// while the folder still has children.
    fn delete_folder(&self, path: &str) -> Result<(), StoreError>;

    fn folder_exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Create `parent/name`.
    fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError>;

    /// Rename the folder at `path`, keeping it under the same parent.
    fn rename_folder(&self, path: &str, new_name: &str) -> Result<(), StoreError>;

    /// Copy a whole folder so that it lives at exactly `to`.
    fn copy_folder(&self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Copy one file into the folder `to_dir`, keeping its name.
    fn copy_file(&self, from: &str, to_dir: &str) -> Result<(), StoreError>;

    /// Human-readable description used in banners and logs.
    fn describe(&self) -> String;
}

impl<S: RemoteStore + ?Sized> RemoteStore for Box<S> {
    fn list_subfolders(&self, path: &str) -> Result<Vec<String>, StoreError> {
        (**self).list_subfolders(path)
    }

    fn list_files(&self, path: &str) -> Result<Vec<String>, StoreError> {
        (**self).list_files(path)
    }

    fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        (**self).delete_file(path)
    }

    fn delete_folder(&self, path: &str) -> Result<(), StoreError> {
        (**self).delete_folder(path)
    }

    fn folder_exists(&self, path: &str) -> Result<bool, StoreError> {
        (**self).folder_exists(path)
    }

    fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError> {
        (**self).create_folder(parent, name)
    }

    fn rename_folder(&self, path: &str, new_name: &str) -> Result<(), StoreError> {
        (**self).rename_folder(path, new_name)
    }

    fn copy_folder(&self, from: &str, to: &str) -> Result<(), StoreError> {
        (**self).copy_folder(from, to)
    }

    fn copy_file(&self, from: &str, to_dir: &str) -> Result<(), StoreError> {
        (**self).copy_file(from, to_dir)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Build the backend selected in the configuration.
pub fn open(backend: &Backend) -> Result<Box<dyn RemoteStore>> {
    match backend {
        Backend::Local(settings) => {
            let store = LocalStore::new(&settings.root)
                .with_context(|| format!("Failed to open local root {}", settings.root.display()))?;
            Ok(Box::new(store))
        }
        Backend::SharePoint(settings) => {
            let store = SharePointStore::from_settings(settings)
                .context("Failed to create SharePoint client")?;
            Ok(Box::new(store))
        }
    }
}
