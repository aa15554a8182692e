//! Core module - app catalog, lifecycle state machines and profile execution

pub mod app;
pub mod argument;
pub mod catalog;
pub mod defaults;
pub mod download_map;
pub mod events;
mod migration;
mod process;
pub mod profile;
mod runner;
pub mod settings;

pub use app::{App, AppBase, AppKind, AppStatus, FailureStage};
pub use argument::{ArgValue, Argument, Configuration};
pub use catalog::AppCatalog;
pub use download_map::{DownloadMap, Platform};
pub use events::{AppEvent, EventBus};
pub use profile::{Profile, ProfileEntry, ProfileState};
pub use settings::Settings;

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}
