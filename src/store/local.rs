use std::fs;
use std::path::{Component, Path, PathBuf};

use fs_extra::dir::CopyOptions;
use path_slash::PathBufExt;
use tracing::debug;

use crate::error::StoreError;
use crate::path;
use crate::store::RemoteStore;

/// A folder tree on the local disk, addressed with store paths relative to `root`.
///
/// Symbolic links are never followed: a link to a directory is listed as a file
/// and removed as one.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: &Path) -> Result<Self, StoreError> {
        let display = root.display().to_string();
        let root = root
            .canonicalize()
            .map_err(|e| StoreError::from_io(&display, e))?;
        if !root.is_dir() {
            return Err(StoreError::InvalidPath(display));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the disk, refusing anything that climbs out of `root`.
    fn resolve(&self, store_path: &str) -> Result<PathBuf, StoreError> {
        let relative = PathBuf::from_slash(store_path.trim_start_matches(path::SEPARATOR));
        let escapes = relative.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(StoreError::InvalidPath(store_path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn entries(&self, store_path: &str, want_dirs: bool) -> Result<Vec<String>, StoreError> {
        let dir = self.resolve(store_path)?;
        let read = fs::read_dir(&dir).map_err(|e| StoreError::from_io(store_path, e))?;

        let mut names = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| StoreError::from_io(store_path, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StoreError::from_io(store_path, e))?;
            if file_type.is_dir() == want_dirs {
                let name = entry.file_name().into_string().map_err(|raw| {
                    StoreError::InvalidPath(path::compose(store_path, &raw.to_string_lossy()))
                })?;
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

impl RemoteStore for LocalStore {
    fn list_subfolders(&self, store_path: &str) -> Result<Vec<String>, StoreError> {
        self.entries(store_path, true)
    }

    fn list_files(&self, store_path: &str) -> Result<Vec<String>, StoreError> {
        self.entries(store_path, false)
    }

    fn delete_file(&self, store_path: &str) -> Result<(), StoreError> {
        let file = self.resolve(store_path)?;
        fs::remove_file(&file).map_err(|e| StoreError::from_io(store_path, e))?;
        debug!(path = store_path, "removed local file");
        Ok(())
    }

    fn delete_folder(&self, store_path: &str) -> Result<(), StoreError> {
        let dir = self.resolve(store_path)?;
        let mut children = fs::read_dir(&dir).map_err(|e| StoreError::from_io(store_path, e))?;
        if children.next().is_some() {
            return Err(StoreError::NonEmptyDirectory(store_path.to_string()));
        }
        fs::remove_dir(&dir).map_err(|e| StoreError::from_io(store_path, e))?;
        debug!(path = store_path, "removed local folder");
        Ok(())
    }

    fn folder_exists(&self, store_path: &str) -> Result<bool, StoreError> {
        Ok(self.resolve(store_path)?.is_dir())
    }

    fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError> {
        path::validate_name(name)?;
        let created = path::compose(parent, name);
        let dir = self.resolve(&created)?;
        fs::create_dir(&dir).map_err(|e| StoreError::from_io(&created, e))
    }

    fn rename_folder(&self, store_path: &str, new_name: &str) -> Result<(), StoreError> {
        path::validate_name(new_name)?;
        let from = self.resolve(store_path)?;
        let renamed = path::compose(&path::parent(store_path), new_name);
        let to = self.resolve(&renamed)?;
        if to.exists() {
            return Err(StoreError::Backend(format!("{} already exists", renamed)));
        }
        fs::rename(&from, &to).map_err(|e| StoreError::from_io(store_path, e))
    }

    fn copy_folder(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let source = self.resolve(from)?;
        let destination = self.resolve(to)?;
        if !source.is_dir() {
            return Err(StoreError::NotFound(from.to_string()));
        }
        if destination.exists() {
            return Err(StoreError::Backend(format!("{} already exists", to)));
        }
        fs::create_dir_all(&destination).map_err(|e| StoreError::from_io(to, e))?;

        let mut options = CopyOptions::new();
        options.content_only = true;
        fs_extra::dir::copy(&source, &destination, &options)
            .map_err(|e| StoreError::Backend(format!("copy {} -> {}: {}", from, to, e)))?;
        Ok(())
    }

    fn copy_file(&self, from: &str, to_dir: &str) -> Result<(), StoreError> {
        let source = self.resolve(from)?;
        let destination = self.resolve(&path::compose(to_dir, path::name(from)))?;
        fs::copy(&source, &destination).map_err(|e| StoreError::from_io(from, e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("local folder {}", self.root().display())
    }
}
