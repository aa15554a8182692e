//! Settings - data directory layout and configuration file locations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the catalog files and downloaded artifacts live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Custom data directory; platform default when unset
    pub data_directory: Option<PathBuf>,
    /// Custom download directory; `<data>/downloads` when unset
    pub download_directory: Option<PathBuf>,
}

impl Settings {
    pub fn with_data_directory(path: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: Some(path.into()),
            download_directory: None,
        }
    }

    /// Get the data directory, using the platform default if not set
    pub fn get_data_directory(&self) -> PathBuf {
        self.data_directory.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("dartmate")
        })
    }

    /// Get the directory downloaded artifacts are stored under, one
    /// subdirectory per app
    pub fn get_downloads_directory(&self) -> PathBuf {
        self.download_directory
            .clone()
            .unwrap_or_else(|| self.get_data_directory().join("downloads"))
    }

    pub fn apps_downloadable_file(&self) -> PathBuf {
        self.get_data_directory().join("apps-downloadable.json")
    }

    pub fn apps_installable_file(&self) -> PathBuf {
        self.get_data_directory().join("apps-installable.json")
    }

    pub fn apps_local_file(&self) -> PathBuf {
        self.get_data_directory().join("apps-local.json")
    }

    pub fn apps_open_file(&self) -> PathBuf {
        self.get_data_directory().join("apps-open.json")
    }

    pub fn profiles_file(&self) -> PathBuf {
        self.get_data_directory().join("profiles.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_data_directory_drives_file_locations() {
        let settings = Settings::with_data_directory("/tmp/dartmate-test");
        assert_eq!(
            settings.profiles_file(),
            PathBuf::from("/tmp/dartmate-test/profiles.json")
        );
        assert_eq!(
            settings.get_downloads_directory(),
            PathBuf::from("/tmp/dartmate-test/downloads")
        );
    }

    #[test]
    fn download_directory_override_wins() {
        let mut settings = Settings::with_data_directory("/tmp/dartmate-test");
        settings.download_directory = Some(PathBuf::from("/tmp/elsewhere"));
        assert_eq!(
            settings.get_downloads_directory(),
            PathBuf::from("/tmp/elsewhere")
        );
    }
}
