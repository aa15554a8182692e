//! AppCatalog - loads, seeds, migrates and persists the app collections and
//! profiles.
//!
//! Four collection files plus `profiles.json` live in the data directory. A
//! missing file is seeded from the built-in defaults; a present-but-corrupt
//! file is a configuration error naming the file, never silently discarded.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use super::app::{
    App, AppBase, AppKind, DownloadableSpec, InstallableSpec, LocalSpec, OpenSpec,
};
use super::defaults;
use super::download_map::Platform;
use super::events::{AppEvent, EventBus};
use super::migration;
use super::profile::Profile;
use super::settings::Settings;
use crate::error::{Error, Result};
use crate::net::Downloader;

/// Stored form of one app in a collection file. The file an entry comes from
/// decides its variant; base and variant fields share one flat JSON object.
#[derive(Serialize, Deserialize)]
struct StoredApp<K> {
    #[serde(flatten)]
    base: AppBase,
    #[serde(flatten)]
    spec: K,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(Error::Configuration {
            file: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// The combined catalog of managed apps and the profiles composed from them.
/// Owns the event bus every app publishes into.
#[derive(Debug)]
pub struct AppCatalog {
    settings: Settings,
    events: EventBus,
    downloader: Downloader,
    pub(crate) apps: Vec<App>,
    pub(crate) profiles: Vec<Profile>,
}

impl AppCatalog {
    /// Load the catalog for the running platform: read or seed the five
    /// files, run the migration sequence, persist the result and link every
    /// profile reference.
    pub fn load(settings: Settings) -> Result<Self> {
        Self::load_for(settings, Platform::current())
    }

    pub(crate) fn load_for(settings: Settings, platform: Platform) -> Result<Self> {
        fs::create_dir_all(settings.get_data_directory())?;
        let events = EventBus::default();
        let downloads = settings.get_downloads_directory();

        let mut apps: Vec<App> = Vec::new();
        let add = |apps: &mut Vec<App>, base: AppBase, kind: AppKind| -> Result<()> {
            if apps.iter().any(|a| a.name() == base.name) {
                return Err(Error::DuplicateApp(base.name));
            }
            apps.push(App::new(base, kind, events.clone(), &downloads));
            Ok(())
        };

        let downloadable = match read_json::<Vec<StoredApp<DownloadableSpec>>>(
            &settings.apps_downloadable_file(),
        )? {
            Some(stored) => stored
                .into_iter()
                .map(|s| (s.base, AppKind::Downloadable(s.spec)))
                .collect(),
            None => {
                info!("seeding downloadable apps");
                defaults::downloadable_apps(platform)
            }
        };
        for (base, kind) in downloadable {
            add(&mut apps, base, kind)?;
        }

        let installable = match read_json::<Vec<StoredApp<InstallableSpec>>>(
            &settings.apps_installable_file(),
        )? {
            Some(stored) => stored
                .into_iter()
                .map(|s| (s.base, AppKind::Installable(s.spec)))
                .collect(),
            None => {
                info!("seeding installable apps");
                defaults::installable_apps(platform)
            }
        };
        for (base, kind) in installable {
            add(&mut apps, base, kind)?;
        }

        let local =
            match read_json::<Vec<StoredApp<LocalSpec>>>(&settings.apps_local_file())? {
                Some(stored) => stored
                    .into_iter()
                    .map(|s| (s.base, AppKind::Local(s.spec)))
                    .collect(),
                None => {
                    info!("seeding local apps");
                    defaults::local_apps()
                }
            };
        for (base, kind) in local {
            add(&mut apps, base, kind)?;
        }

        let open = match read_json::<Vec<StoredApp<OpenSpec>>>(&settings.apps_open_file())? {
            Some(stored) => stored
                .into_iter()
                .map(|s| (s.base, AppKind::Open(s.spec)))
                .collect(),
            None => {
                info!("seeding open apps");
                defaults::open_apps()
            }
        };
        for (base, kind) in open {
            add(&mut apps, base, kind)?;
        }

        let profiles = match read_json::<Vec<Profile>>(&settings.profiles_file())? {
            Some(profiles) => profiles,
            None => {
                info!("seeding default profiles");
                defaults::default_profiles(&apps)
            }
        };

        let mut catalog = Self {
            settings,
            events,
            downloader: Downloader::new(),
            apps,
            profiles,
        };
        migration::run(&mut catalog);
        catalog.store()?;
        catalog.link_profiles()?;
        info!(
            "catalog loaded: {} apps, {} profiles",
            catalog.apps.len(),
            catalog.profiles.len()
        );
        Ok(catalog)
    }

    /// Every profile reference must resolve against the combined catalog.
    /// An unresolved name after migration is fatal.
    fn link_profiles(&self) -> Result<()> {
        for profile in &self.profiles {
            for entry in &profile.apps {
                if !self.has_app(&entry.app) {
                    return Err(Error::Linking {
                        profile: profile.name.clone(),
                        app: entry.app.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Persist all five files, omitting default-valued fields
    pub fn store(&self) -> Result<()> {
        self.store_apps()?;
        self.store_profiles()
    }

    pub fn store_apps(&self) -> Result<()> {
        let mut downloadable = Vec::new();
        let mut installable = Vec::new();
        let mut local = Vec::new();
        let mut open = Vec::new();
        for app in &self.apps {
            let base = app.base.clone();
            match &app.kind {
                AppKind::Downloadable(spec) => downloadable.push(StoredApp {
                    base,
                    spec: spec.clone(),
                }),
                AppKind::Installable(spec) => installable.push(StoredApp {
                    base,
                    spec: spec.clone(),
                }),
                AppKind::Local(spec) => local.push(StoredApp {
                    base,
                    spec: spec.clone(),
                }),
                AppKind::Open(spec) => open.push(StoredApp {
                    base,
                    spec: spec.clone(),
                }),
            }
        }
        write_json(&self.settings.apps_downloadable_file(), &downloadable)?;
        write_json(&self.settings.apps_installable_file(), &installable)?;
        write_json(&self.settings.apps_local_file(), &local)?;
        write_json(&self.settings.apps_open_file(), &open)?;
        Ok(())
    }

    pub fn store_profiles(&self) -> Result<()> {
        write_json(&self.settings.profiles_file(), &self.profiles)
    }

    /// Operator recovery: remove a configuration file so the next load
    /// reseeds that collection.
    pub fn delete_configuration_file(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    pub fn apps(&self) -> &[App] {
        &self.apps
    }

    pub fn has_app(&self, name: &str) -> bool {
        self.apps.iter().any(|a| a.name() == name)
    }

    pub fn app(&self, name: &str) -> Option<&App> {
        self.apps.iter().find(|a| a.name() == name)
    }

    pub fn app_mut(&mut self, name: &str) -> Option<&mut App> {
        self.apps.iter_mut().find(|a| a.name() == name)
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn profile_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.name == name)
    }

    pub(crate) fn add_app(&mut self, base: AppBase, kind: AppKind) {
        if !self.has_app(&base.name) {
            let downloads = self.settings.get_downloads_directory();
            self.apps
                .push(App::new(base, kind, self.events.clone(), &downloads));
        }
    }

    pub(crate) fn remove_app(&mut self, name: &str) {
        self.apps.retain(|a| a.name() != name);
        for profile in &mut self.profiles {
            profile.remove_app(name);
        }
    }

    /// Fetch an app's artifact through the catalog's shared client
    pub async fn download_app(&mut self, name: &str) -> Result<()> {
        let downloader = self.downloader.clone();
        let app = self
            .app_mut(name)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown app '{name}'")))?;
        app.download(&downloader).await
    }

    pub async fn install_app(&mut self, name: &str) -> Result<()> {
        let app = self
            .app_mut(name)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown app '{name}'")))?;
        app.install().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings_in(dir: &Path) -> Settings {
        Settings::with_data_directory(dir)
    }

    #[test]
    fn missing_files_are_seeded_and_persisted() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let catalog = AppCatalog::load_for(settings.clone(), Platform::LINUX_X64).unwrap();

        assert!(settings.apps_downloadable_file().exists());
        assert!(settings.apps_installable_file().exists());
        assert!(settings.apps_local_file().exists());
        assert!(settings.apps_open_file().exists());
        assert!(settings.profiles_file().exists());

        assert!(catalog.has_app("autodarts-caller"));
        assert!(catalog.has_app("custom"));
        assert!(catalog.has_app("autodarts.io"));
        assert!(catalog.profile("autodarts-caller").is_some());
    }

    #[test]
    fn reload_round_trips_the_seeded_state() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let first = AppCatalog::load_for(settings.clone(), Platform::LINUX_X64).unwrap();
        let second = AppCatalog::load_for(settings, Platform::LINUX_X64).unwrap();

        let names =
            |c: &AppCatalog| c.apps().iter().map(|a| a.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
        assert_eq!(first.profiles(), second.profiles());
    }

    #[test]
    fn corrupt_file_error_names_the_file() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::create_dir_all(settings.get_data_directory()).unwrap();
        fs::write(settings.apps_open_file(), "{ not json").unwrap();

        let err = AppCatalog::load_for(settings.clone(), Platform::LINUX_X64).unwrap_err();
        match err {
            Error::Configuration { file, .. } => {
                assert_eq!(file, settings.apps_open_file());
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn duplicate_app_name_across_collections_is_rejected() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::create_dir_all(settings.get_data_directory()).unwrap();
        // caller is also seeded into the downloadable collection
        fs::write(
            settings.apps_local_file(),
            r#"[{"name": "autodarts-caller", "description_short": "dup"}]"#,
        )
        .unwrap();

        let err = AppCatalog::load_for(settings, Platform::LINUX_X64).unwrap_err();
        assert!(matches!(err, Error::DuplicateApp(name) if name == "autodarts-caller"));
    }

    #[test]
    fn unknown_profile_reference_fails_linking() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::create_dir_all(settings.get_data_directory()).unwrap();
        fs::write(
            settings.profiles_file(),
            r#"[{"name": "mine", "apps": [{"app": "ghost", "tagged_for_start": true}]}]"#,
        )
        .unwrap();

        let err = AppCatalog::load_for(settings, Platform::LINUX_X64).unwrap_err();
        match err {
            Error::Linking { profile, app } => {
                assert_eq!(profile, "mine");
                assert_eq!(app, "ghost");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn deleting_a_configuration_file_reseeds_on_next_load() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        AppCatalog::load_for(settings.clone(), Platform::LINUX_X64).unwrap();

        AppCatalog::delete_configuration_file(&settings.apps_local_file()).unwrap();
        assert!(!settings.apps_local_file().exists());

        let catalog = AppCatalog::load_for(settings.clone(), Platform::LINUX_X64).unwrap();
        assert!(catalog.has_app("custom"));
        assert!(settings.apps_local_file().exists());
    }
}
