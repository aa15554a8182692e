//! Catalog migrations - ordered, idempotent transforms run on every load
//!
//! Each step upgrades persisted state left behind by an earlier release:
//! retired apps disappear, newly introduced apps join existing profiles,
//! profiles whose anchor app vanished are dropped. Running the sequence a
//! second time changes nothing.

use tracing::debug;

use super::catalog::AppCatalog;
use super::defaults;
use super::profile::ProfileState;

struct Migration {
    name: &'static str,
    apply: fn(&mut AppCatalog),
}

/// App names earlier releases shipped that may legitimately be absent now,
/// retired or simply not offered on this platform. References to these are
/// pruned when the app is missing; any other unresolved name stays and fails
/// linking.
const RETIRED_OR_PLATFORM_BOUND: &[&str] = &[
    "autodarts-bot",
    "virtual-darts-zoom",
    "dartboards-client",
    "droid-cam",
    "epoc-cam",
    "cam-loader",
    "autodarts-wled",
    "autodarts-gif",
    "autodarts-voice",
];

/// Profiles are anchored on these; a profile referencing an anchor that left
/// the catalog is useless and gets dropped whole.
const ANCHOR_APPS: &[&str] = &["autodarts-caller", "autodarts-extern"];

const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "remove retired autodarts-bot",
        apply: remove_autodarts_bot,
    },
    Migration {
        name: "introduce autodarts-boardmanager open app",
        apply: introduce_boardmanager_app,
    },
    Migration {
        name: "prune references to absent known apps",
        apply: prune_known_absent_references,
    },
    Migration {
        name: "drop profiles whose anchor app vanished",
        apply: drop_orphaned_anchor_profiles,
    },
    Migration {
        name: "rebuild the autodarts-client profile",
        apply: rebuild_client_profile,
    },
    Migration {
        name: "trim camera helpers from the client profile",
        apply: trim_client_profile,
    },
    Migration {
        name: "introduce companion apps into profiles",
        apply: introduce_companions,
    },
];

/// Run the full sequence in order. Called once per catalog load, after the
/// collections are read and before profile linking.
pub(crate) fn run(catalog: &mut AppCatalog) {
    for migration in MIGRATIONS {
        debug!("migration: {}", migration.name);
        (migration.apply)(catalog);
    }
}

fn remove_autodarts_bot(catalog: &mut AppCatalog) {
    catalog.remove_app("autodarts-bot");
}

fn introduce_boardmanager_app(catalog: &mut AppCatalog) {
    if !catalog.has_app("autodarts-boardmanager") {
        for (base, kind) in defaults::open_apps() {
            if base.name == "autodarts-boardmanager" {
                catalog.add_app(base, kind);
            }
        }
    }
}

fn prune_known_absent_references(catalog: &mut AppCatalog) {
    for name in RETIRED_OR_PLATFORM_BOUND {
        if !catalog.has_app(name) {
            for profile in &mut catalog.profiles {
                profile.remove_app(name);
            }
        }
    }
}

fn drop_orphaned_anchor_profiles(catalog: &mut AppCatalog) {
    for anchor in ANCHOR_APPS {
        if !catalog.has_app(anchor) {
            catalog.profiles.retain(|p| !p.contains_app(anchor));
        }
    }
}

fn rebuild_client_profile(catalog: &mut AppCatalog) {
    if catalog.has_app("autodarts-client") && catalog.profile("autodarts-client").is_none() {
        let has = |name: &str| catalog.has_app(name);
        let profile = defaults::client_profile(&has);
        catalog.profiles.push(profile);
    }
}

/// The camera-only profile drives the board cameras itself; the camera
/// helper apps that joined it in earlier releases get in the way there.
fn trim_client_profile(catalog: &mut AppCatalog) {
    if let Some(profile) = catalog.profile_mut("autodarts-client") {
        for name in ["virtual-darts-zoom", "droid-cam", "epoc-cam"] {
            profile.remove_app(name);
        }
    }
}

fn introduce_companions(catalog: &mut AppCatalog) {
    // boardmanager and cam-loader join every profile; the caller companions
    // make no sense in the camera-only client profile
    let everywhere = ["autodarts-boardmanager", "cam-loader"];
    let except_client = ["autodarts-wled", "autodarts-gif", "autodarts-voice"];

    for name in everywhere {
        if catalog.has_app(name) {
            for profile in &mut catalog.profiles {
                profile.add_app(name, ProfileState::default());
            }
        }
    }
    for name in except_client {
        if catalog.has_app(name) {
            for profile in &mut catalog.profiles {
                if profile.name != "autodarts-client" {
                    profile.add_app(name, ProfileState::default());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::download_map::Platform;
    use crate::core::settings::Settings;
    use std::fs;
    use tempfile::tempdir;

    fn load(settings: &Settings) -> AppCatalog {
        AppCatalog::load_for(settings.clone(), Platform::LINUX_X64).unwrap()
    }

    #[test]
    fn retired_bot_is_removed_from_apps_and_profiles() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_directory(dir.path());
        fs::create_dir_all(settings.get_data_directory()).unwrap();
        fs::write(
            settings.apps_downloadable_file(),
            r#"[
                {"name": "autodarts-bot", "download_url": "https://example.org/bot"},
                {"name": "autodarts-caller", "download_url": "https://example.org/caller"}
            ]"#,
        )
        .unwrap();
        fs::write(
            settings.profiles_file(),
            r#"[{"name": "autodarts-caller", "apps": [
                {"app": "autodarts-caller", "tagged_for_start": true, "is_required": true},
                {"app": "autodarts-bot"}
            ]}]"#,
        )
        .unwrap();

        let catalog = load(&settings);
        assert!(!catalog.has_app("autodarts-bot"));
        let profile = catalog.profile("autodarts-caller").unwrap();
        assert!(!profile.contains_app("autodarts-bot"));
    }

    #[test]
    fn boardmanager_is_reintroduced_into_old_open_catalogs() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_directory(dir.path());
        fs::create_dir_all(settings.get_data_directory()).unwrap();
        // an old apps-open.json from before the boardmanager existed
        fs::write(
            settings.apps_open_file(),
            r#"[{"name": "autodarts.io", "target": "https://autodarts.io"}]"#,
        )
        .unwrap();

        let catalog = load(&settings);
        assert!(catalog.has_app("autodarts-boardmanager"));
        for profile in catalog.profiles() {
            assert!(profile.contains_app("autodarts-boardmanager"));
        }
    }

    #[test]
    fn references_to_platform_absent_apps_are_pruned() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_directory(dir.path());
        fs::create_dir_all(settings.get_data_directory()).unwrap();
        // a profile written on Windows, loaded on Linux where these apps
        // are not offered
        fs::write(
            settings.profiles_file(),
            r#"[{"name": "autodarts-caller", "apps": [
                {"app": "autodarts-caller", "tagged_for_start": true, "is_required": true},
                {"app": "virtual-darts-zoom"},
                {"app": "droid-cam"}
            ]}]"#,
        )
        .unwrap();

        let catalog = load(&settings);
        let profile = catalog.profile("autodarts-caller").unwrap();
        assert!(!profile.contains_app("virtual-darts-zoom"));
        assert!(!profile.contains_app("droid-cam"));
        assert!(profile.contains_app("autodarts-caller"));
    }

    #[test]
    fn client_profile_is_rebuilt_when_missing() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_directory(dir.path());
        fs::create_dir_all(settings.get_data_directory()).unwrap();
        fs::write(settings.profiles_file(), "[]").unwrap();

        let catalog = load(&settings);
        let profile = catalog.profile("autodarts-client").unwrap();
        let entry = profile.entry("autodarts-client").unwrap();
        assert!(entry.state.is_required);
    }

    #[test]
    fn camera_helpers_are_trimmed_from_the_client_profile() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_directory(dir.path());
        fs::create_dir_all(settings.get_data_directory()).unwrap();
        // a client profile persisted before the camera helpers moved out
        fs::write(
            settings.profiles_file(),
            r#"[{"name": "autodarts-client", "apps": [
                {"app": "autodarts-client", "tagged_for_start": true, "is_required": true},
                {"app": "virtual-darts-zoom"},
                {"app": "droid-cam"},
                {"app": "epoc-cam"}
            ]}]"#,
        )
        .unwrap();

        // Windows offers all three camera apps, so pruning by absence
        // cannot be what removes them here
        let catalog =
            AppCatalog::load_for(settings, Platform::WINDOWS_X64).unwrap();
        let profile = catalog.profile("autodarts-client").unwrap();
        assert!(!profile.contains_app("virtual-darts-zoom"));
        assert!(!profile.contains_app("droid-cam"));
        assert!(!profile.contains_app("epoc-cam"));
        assert!(profile.contains_app("autodarts-client"));
    }

    #[test]
    fn companions_join_profiles_except_the_client_profile() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_directory(dir.path());
        let catalog = load(&settings);

        let caller = catalog.profile("autodarts-caller").unwrap();
        assert!(caller.contains_app("autodarts-wled"));
        assert!(caller.contains_app("autodarts-voice"));

        let client = catalog.profile("autodarts-client").unwrap();
        assert!(!client.contains_app("autodarts-wled"));
        assert!(!client.contains_app("autodarts-gif"));
    }

    #[test]
    fn sequence_is_idempotent() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_directory(dir.path());
        let mut catalog = load(&settings);

        let before = serde_json::to_string(catalog.profiles()).unwrap();
        run(&mut catalog);
        let after = serde_json::to_string(catalog.profiles()).unwrap();
        assert_eq!(before, after);
    }
}
