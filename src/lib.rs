//! dartmate - lifecycle orchestration for companion apps
//!
//! A catalog of four app variants (downloadable, installable, local, open)
//! moves through download, install, configure, run and close. Profiles
//! compose apps into named selections started together; a versioned
//! migration sequence upgrades persisted state on every load.

pub mod core;
pub mod error;
pub mod logging;
pub mod net;

pub use crate::core::{
    App, AppBase, AppCatalog, AppEvent, AppKind, AppStatus, Argument, Configuration,
    DownloadMap, EventBus, Platform, Profile, ProfileEntry, ProfileState, Settings,
};
pub use crate::error::{Error, Result};
pub use crate::net::Downloader;

pub const APP_NAME: &str = "dartmate";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
