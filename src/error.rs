//! Crate-wide error type and result alias

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("http error: {0}")]
    Http(String),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A persisted file exists but could not be parsed. Carries the offending
    /// file so the caller can offer delete-and-reseed recovery.
    #[error("configuration file {file}: {message}")]
    Configuration { file: PathBuf, message: String },
    #[error("app '{0}' is defined in more than one catalog")]
    DuplicateApp(String),
    /// A profile references an app the catalog does not know. Fatal: the
    /// migration sequence should have cleaned this up.
    #[error("profile '{profile}' references unknown app '{app}'")]
    Linking { profile: String, app: String },
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
    /// Required arguments without a value. Not a failure state, the gate
    /// that blocks `run` until the configuration surface resolves it.
    #[error("configuration incomplete for '{app}': missing {missing:?}")]
    ConfigurationIncomplete { app: String, missing: Vec<String> },
    #[error("'{app}' {stage} failed: {reason}")]
    Lifecycle {
        app: String,
        stage: &'static str,
        reason: String,
    },
    #[error("'{app}': {action} is not valid while {status}")]
    InvalidTransition {
        app: String,
        action: &'static str,
        status: String,
    },
    #[error("{0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
