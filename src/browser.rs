//! Menu-driven navigation over a store.
//!
//! The browser holds the folder the operator started in, the folder currently
//! shown and its subfolder names. The menu always starts with the fixed
//! actions, followed by one entry per subfolder.

use thiserror::Error;

use crate::error::StoreError;
use crate::path;
use crate::store::RemoteStore;

/// Fixed actions, in menu order. Subfolders follow at `FIXED_ACTIONS.len()`.
pub const FIXED_ACTIONS: &[&str] = &[
    "Exit",
    "Back",
    "Store listing",
    "Copy folder",
    "Copy files",
    "Structure copy",
    "Erase folder",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Exit,
    Back,
    Store,
    /// Copy the current folder itself into a destination.
    CopyFolder,
    CopyFiles,
    /// Merge the current folder into a destination structure through the mapping.
    StructureCopy,
    Erase,
    /// Open the subfolder at this position of the listing.
    Open(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MenuError {
    #[error("{0:?} is not a number")]
    NotANumber(String),

    #[error("option {choice} does not exist (0-{max})")]
    OutOfRange { choice: usize, max: usize },
}

impl MenuAction {
    pub fn from_index(index: usize, entries: usize) -> Result<Self, MenuError> {
        let action = match index {
            0 => MenuAction::Exit,
            1 => MenuAction::Back,
            2 => MenuAction::Store,
            3 => MenuAction::CopyFolder,
            4 => MenuAction::CopyFiles,
            5 => MenuAction::StructureCopy,
            6 => MenuAction::Erase,
            n if n - FIXED_ACTIONS.len() < entries => MenuAction::Open(n - FIXED_ACTIONS.len()),
            n => {
                return Err(MenuError::OutOfRange {
                    choice: n,
                    max: FIXED_ACTIONS.len() + entries - 1,
                })
            }
        };
        Ok(action)
    }
}

/// Parse a typed menu number.
pub fn parse_choice(input: &str, entries: usize) -> Result<MenuAction, MenuError> {
    let trimmed = input.trim();
    let index: usize = trimmed
        .parse()
        .map_err(|_| MenuError::NotANumber(trimmed.to_string()))?;
    MenuAction::from_index(index, entries)
}

/// Where the browser ended up after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved,
    Exit,
}

pub struct Browser<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    start: String,
    current: String,
    entries: Vec<String>,
}

impl<'a, S: RemoteStore + ?Sized> Browser<'a, S> {
    /// Open the browser at `start`, which must be an existing folder.
    pub fn open(store: &'a S, start: &str) -> Result<Self, StoreError> {
        let start = path::normalize(start);
        if !store.folder_exists(&start)? {
            return Err(StoreError::NotFound(start));
        }
        let entries = store.list_subfolders(&start)?;
        Ok(Self {
            store,
            current: start.clone(),
            start,
            entries,
        })
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn at_start(&self) -> bool {
        self.current == self.start
    }

    /// Menu lines, `[index] label`.
    pub fn options(&self) -> Vec<String> {
        FIXED_ACTIONS
            .iter()
            .map(|label| label.to_string())
            .chain(self.entries.iter().cloned())
            .enumerate()
            .map(|(i, label)| format!("[{}] {}", i, label))
            .collect()
    }

    pub fn refresh(&mut self) -> Result<(), StoreError> {
        self.entries = self.store.list_subfolders(&self.current)?;
        Ok(())
    }

    pub fn enter(&mut self, index: usize) -> Result<(), StoreError> {
        let name = self
            .entries
            .get(index)
            .ok_or_else(|| StoreError::NotFound(format!("menu entry {}", index)))?;
        path::validate_name(name)?;
        self.current = path::compose(&self.current, name);
        self.refresh()
    }

    /// Move to the parent folder. Going back from the start folder exits.
    pub fn back(&mut self) -> Result<Navigation, StoreError> {
        if self.at_start() {
            return Ok(Navigation::Exit);
        }
        self.current = path::parent(&self.current);
        self.refresh()?;
        Ok(Navigation::Moved)
    }

    /// Called after the current folder was erased.
    ///
    /// Steps to the parent, or exits when the start folder itself is gone.
    pub fn current_removed(&mut self) -> Result<Navigation, StoreError> {
        if self.at_start() {
            return Ok(Navigation::Exit);
        }
        self.back()
    }
}
