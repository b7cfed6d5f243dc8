//! Sharesweep - bulk folder operations for SharePoint document libraries

pub mod browser;
pub mod cli;
pub mod config;
pub mod eraser;
pub mod error;
pub mod logbook;
pub mod migrate;
pub mod path;
pub mod restructure;
pub mod store;

// Re-exports for easy access
pub use browser::{Browser, MenuAction, MenuError, Navigation};
pub use cli::{Cli, Commands};
pub use config::{Backend, Config, LocalSettings, SharePointSettings};
pub use eraser::{EraseError, EraseEvent, EraseReport, Eraser, FileWarning, ObjectKind, PlannedDeletion};
pub use error::StoreError;
pub use logbook::{LogBook, LogBookError};
pub use migrate::{CopySummary, FolderMapping};
pub use restructure::{Rename, RestructurePlan, RestructureSummary};
pub use store::{LocalStore, MemoryStore, RemoteStore, SharePointStore};

pub mod colors {
    use colored::Color;

    pub const SUCCESS: Color = Color::TrueColor { r: 77, g: 255, b: 157 };
    pub const HEADER: Color = Color::TrueColor { r: 157, g: 77, b: 255 };
    pub const PATH: Color = Color::TrueColor { r: 77, g: 195, b: 255 };
    pub const WARNING: Color = Color::TrueColor { r: 255, g: 217, b: 61 };
    pub const DANGER: Color = Color::TrueColor { r: 255, g: 107, b: 157 };
}

/// Current version of Sharesweep
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
