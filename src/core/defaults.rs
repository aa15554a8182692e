//! Built-in seed catalogs and profiles, used on first run or after an
//! operator deleted a configuration file. Apps whose download map does not
//! resolve on the current platform are not offered.

use std::collections::HashMap;
use std::path::PathBuf;

use super::app::{
    App, AppBase, AppKind, DownloadableSpec, InstallableSpec, LocalSpec, OpenSpec,
};
use super::argument::{Argument, Configuration};
use super::download_map::{DownloadMap, Platform};
use super::profile::{Profile, ProfileState};

fn downloadable(url: String, run_as_admin: bool) -> AppKind {
    AppKind::Downloadable(DownloadableSpec {
        download_url: url,
        run_as_admin,
    })
}

pub fn downloadable_apps(platform: Platform) -> Vec<(AppBase, AppKind)> {
    let mut apps = Vec::new();

    let client_map = DownloadMap {
        windows_x64: Some("https://github.com/autodarts/releases/releases/download/v***VERSION***/autodarts***VERSION***.windows-amd64.zip".into()),
        linux_x64: Some("https://github.com/autodarts/releases/releases/download/v***VERSION***/autodarts***VERSION***.linux-amd64.tar.gz".into()),
        linux_arm64: Some("https://github.com/autodarts/releases/releases/download/v***VERSION***/autodarts***VERSION***.linux-arm64.tar.gz".into()),
        mac_x64: Some("https://github.com/autodarts/releases/releases/download/v***VERSION***/autodarts***VERSION***.darwin-amd64.opencv4.7.0.tar.gz".into()),
        mac_arm64: Some("https://github.com/autodarts/releases/releases/download/v***VERSION***/autodarts***VERSION***.darwin-arm64.opencv4.7.0.tar.gz".into()),
        ..Default::default()
    };
    if let Some(url) = client_map.resolve_for(platform, Some("0.22.0")) {
        apps.push((
            AppBase::new("autodarts-client", "Client for dart recognition with cameras")
                .help_url("https://docs.autodarts.io/"),
            downloadable(url, false),
        ));
    }

    let caller_map = DownloadMap {
        windows_x64: Some("https://github.com/lbormann/autodarts-caller/releases/download/***VERSION***/autodarts-caller.exe".into()),
        linux_x64: Some("https://github.com/lbormann/autodarts-caller/releases/download/***VERSION***/autodarts-caller".into()),
        mac_x64: Some("https://github.com/lbormann/autodarts-caller/releases/download/***VERSION***/autodarts-caller-mac".into()),
        ..Default::default()
    };
    if let Some(url) = caller_map.resolve_for(platform, Some("v2.0.0")) {
        apps.push((
            AppBase::new("autodarts-caller", "calls out thrown points")
                .help_url("https://github.com/lbormann/autodarts-caller")
                .configuration(Configuration::new("-", " ").with_arguments(vec![
                    Argument::new("U", "string")
                        .required()
                        .human("autodarts-username")
                        .section("Autodarts"),
                    Argument::new("P", "password")
                        .required()
                        .human("autodarts-password")
                        .section("Autodarts"),
                    Argument::new("B", "string")
                        .required()
                        .human("autodarts-board-id")
                        .section("Autodarts"),
                    Argument::new("M", "path")
                        .required()
                        .human("path-to-sound-files")
                        .section("Media"),
                    Argument::new("V", "float[0.0..1.0]")
                        .human("caller-volume")
                        .section("Media"),
                    Argument::new("C", "string")
                        .human("specific-caller")
                        .section("Calls"),
                    Argument::new("R", "bool")
                        .human("random-caller")
                        .section("Random")
                        .bool_mapped(),
                    Argument::new("E", "bool")
                        .human("call-every-dart")
                        .section("Calls")
                        .bool_mapped(),
                    Argument::new("WEB", "int[0..2]")
                        .human("web-caller")
                        .section("Service"),
                    Argument::new("DEB", "bool")
                        .human("debug")
                        .section("Service")
                        .bool_mapped(),
                ])),
            downloadable(url, false),
        ));
    }

    let extern_map = DownloadMap {
        windows_x64: Some("https://github.com/lbormann/autodarts-extern/releases/download/v***VERSION***/autodarts-extern.exe".into()),
        linux_x64: Some("https://github.com/lbormann/autodarts-extern/releases/download/v***VERSION***/autodarts-extern".into()),
        mac_x64: Some("https://github.com/lbormann/autodarts-extern/releases/download/v***VERSION***/autodarts-extern-mac".into()),
        ..Default::default()
    };
    if let Some(url) = extern_map.resolve_for(platform, Some("1.5.4")) {
        apps.push((
            AppBase::new("autodarts-extern", "automates dart web platforms with autodarts")
                .help_url("https://github.com/lbormann/autodarts-extern")
                .configuration(Configuration::new("--", " ").with_arguments(vec![
                    Argument::new("connection", "string")
                        .human("Connection")
                        .section("Service"),
                    Argument::new("browser_path", "file")
                        .required()
                        .human("Path to browser"),
                    Argument::new("autodarts_user", "string")
                        .required()
                        .human("Autodarts-Email")
                        .section("Autodarts"),
                    Argument::new("autodarts_password", "password")
                        .required()
                        .human("Autodarts-Password")
                        .section("Autodarts"),
                    Argument::new("autodarts_board_id", "string")
                        .required()
                        .human("Autodarts-Board-ID")
                        .section("Autodarts"),
                    Argument::new("extern_platform", "selection[lidarts,nakka,dartboards]")
                        .required()
                        .runtime(),
                    Argument::new("time_before_exit", "int[0..150000]")
                        .human("Dwell after match end (in milliseconds)")
                        .section("Match"),
                    Argument::new("lidarts_user", "string")
                        .human("Lidarts-Email")
                        .section("Lidarts")
                        .required_on("extern_platform=lidarts"),
                    Argument::new("lidarts_password", "password")
                        .human("Lidarts-Password")
                        .section("Lidarts")
                        .required_on("extern_platform=lidarts"),
                    Argument::new("lidarts_skip_dart_modals", "bool")
                        .human("Skip dart-modals")
                        .section("Lidarts"),
                    Argument::new("nakka_skip_dart_modals", "bool")
                        .human("Skip dart-modals")
                        .section("Nakka"),
                    Argument::new("dartboards_user", "string")
                        .human("Dartboards-Email")
                        .section("Dartboards")
                        .required_on("extern_platform=dartboards"),
                    Argument::new("dartboards_password", "password")
                        .human("Dartboards-Password")
                        .section("Dartboards")
                        .required_on("extern_platform=dartboards"),
                    Argument::new("dartboards_skip_dart_modals", "bool")
                        .human("Skip dart-modals")
                        .section("Dartboards"),
                ])),
            downloadable(url, false),
        ));
    }

    let wled_map = DownloadMap {
        windows_x64: Some("https://github.com/lbormann/autodarts-wled/releases/download/v***VERSION***/autodarts-wled.exe".into()),
        linux_x64: Some("https://github.com/lbormann/autodarts-wled/releases/download/v***VERSION***/autodarts-wled".into()),
        mac_x64: Some("https://github.com/lbormann/autodarts-wled/releases/download/v***VERSION***/autodarts-wled-mac".into()),
        ..Default::default()
    };
    if let Some(url) = wled_map.resolve_for(platform, Some("1.4.6")) {
        apps.push((
            AppBase::new("autodarts-wled", "control wled installations")
                .help_url("https://github.com/lbormann/autodarts-wled")
                .configuration(Configuration::new("-", " ").with_arguments(vec![
                    Argument::new("CON", "string")
                        .human("Connection")
                        .section("Service"),
                    Argument::new("WEPS", "string")
                        .required()
                        .multi()
                        .human("wled-endpoints")
                        .section("WLED"),
                    Argument::new("DU", "int[0..10]")
                        .human("effects-duration")
                        .section("WLED"),
                    Argument::new("BRI", "int[1..255]")
                        .human("effects-brightness")
                        .section("WLED"),
                    Argument::new("HFO", "int[2..170]")
                        .human("highfinish-on")
                        .section("Autodarts"),
                    Argument::new("HF", "string")
                        .multi()
                        .human("high-finish-effects")
                        .section("WLED"),
                    Argument::new("IDE", "string")
                        .human("idle-effect")
                        .section("WLED"),
                    Argument::new("DEB", "bool")
                        .human("debug")
                        .section("Service")
                        .bool_mapped(),
                ])),
            downloadable(url, false),
        ));
    }

    let vdz_map = DownloadMap {
        windows_x64: Some("https://www.lehmann-bo.de/Downloads/VDZ/Virtual Darts Zoom.zip".into()),
        ..Default::default()
    };
    if let Some(url) = vdz_map.resolve_for(platform, None) {
        apps.push((
            AppBase::new("virtual-darts-zoom", "zooms webcam image onto the thrown darts")
                .help_url("https://lehmann-bo.de/?p=28"),
            downloadable(url, true),
        ));
    }

    let gif_map = DownloadMap {
        windows_x64: Some("https://github.com/lbormann/autodarts-gif/releases/download/v***VERSION***/autodarts-gif.exe".into()),
        linux_x64: Some("https://github.com/lbormann/autodarts-gif/releases/download/v***VERSION***/autodarts-gif".into()),
        mac_x64: Some("https://github.com/lbormann/autodarts-gif/releases/download/v***VERSION***/autodarts-gif-mac".into()),
        ..Default::default()
    };
    if let Some(url) = gif_map.resolve_for(platform, Some("1.0.3")) {
        apps.push((
            AppBase::new("autodarts-gif", "displays your favorite gifs")
                .help_url("https://github.com/lbormann/autodarts-gif")
                .configuration(Configuration::new("-", " ").with_arguments(vec![
                    Argument::new("MP", "path")
                        .human("path-to-image-files")
                        .section("Media"),
                    Argument::new("CON", "string")
                        .human("Connection")
                        .section("Service"),
                    Argument::new("HFO", "int[2..170]")
                        .human("highfinish-on")
                        .section("Autodarts"),
                    Argument::new("G", "string")
                        .multi()
                        .human("game-won-images")
                        .section("Images"),
                    Argument::new("DEB", "bool")
                        .human("debug")
                        .section("Service")
                        .bool_mapped(),
                ])),
            downloadable(url, false),
        ));
    }

    let voice_map = DownloadMap {
        windows_x64: Some("https://github.com/lbormann/autodarts-voice/releases/download/v***VERSION***/autodarts-voice.exe".into()),
        linux_x64: Some("https://github.com/lbormann/autodarts-voice/releases/download/v***VERSION***/autodarts-voice".into()),
        mac_x64: Some("https://github.com/lbormann/autodarts-voice/releases/download/v***VERSION***/autodarts-voice-mac".into()),
        ..Default::default()
    };
    if let Some(url) = voice_map.resolve_for(platform, Some("1.0.5")) {
        apps.push((
            AppBase::new("autodarts-voice", "control autodarts by voice")
                .help_url("https://github.com/lbormann/autodarts-voice")
                .configuration(Configuration::new("-", " ").with_arguments(vec![
                    Argument::new("CON", "string")
                        .human("Connection")
                        .section("Service"),
                    Argument::new("MP", "path")
                        .required()
                        .human("path-to-speech-model")
                        .section("Voice-Recognition"),
                    Argument::new("L", "int[0..2]")
                        .human("language")
                        .section("Voice-Recognition"),
                    Argument::new("KN", "string")
                        .multi()
                        .human("keywords-next")
                        .section("Voice-Recognition"),
                    Argument::new("KU", "string")
                        .multi()
                        .human("keywords-undo")
                        .section("Voice-Recognition"),
                    Argument::new("DEB", "bool")
                        .human("debug")
                        .section("Service")
                        .bool_mapped(),
                ])),
            downloadable(url, false),
        ));
    }

    let cam_loader_map = DownloadMap {
        windows_x64: Some("https://github.com/lbormann/cam-loader/releases/download/v***VERSION***/cam-loader.zip".into()),
        windows_x86: Some("https://github.com/lbormann/cam-loader/releases/download/v***VERSION***/cam-loader.zip".into()),
        ..Default::default()
    };
    if let Some(url) = cam_loader_map.resolve_for(platform, Some("1.0.0")) {
        apps.push((
            AppBase::new("cam-loader", "Saves and loads camera settings")
                .help_url("https://github.com/lbormann/cam-loader"),
            downloadable(url, false),
        ));
    }

    apps
}

pub fn installable_apps(platform: Platform) -> Vec<(AppBase, AppKind)> {
    let mut apps = Vec::new();

    let dartboards_map = DownloadMap {
        windows_x64: Some("https://dartboards.online/dboclient_***VERSION***.exe".into()),
        ..Default::default()
    };
    if let Some(url) = dartboards_map.resolve_for(platform, Some("0.9.2")) {
        let install_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("AppData")
            .join("Local")
            .join("Programs")
            .join("dartboardsonlineclient");
        apps.push((
            AppBase::new(
                "dartboards-client",
                "webcam connection client for dartboards.online",
            )
            .help_url("https://dartboards.online/client"),
            AppKind::Installable(InstallableSpec {
                download_url: url,
                executable: "dartboardsonlineclient.exe".into(),
                default_install_path: Some(install_path),
                run_as_admin_install: false,
                starts_after_installation: true,
                is_service: false,
            }),
        ));
    }

    let droidcam_map = DownloadMap {
        windows_x64: Some("https://github.com/dev47apps/windows-releases/releases/download/win-***VERSION***/DroidCam.Setup.***VERSION***.exe".into()),
        ..Default::default()
    };
    if let Some(url) = droidcam_map.resolve_for(platform, Some("6.5.2")) {
        apps.push((
            AppBase::new("droid-cam", "uses your android phone/tablet as local camera")
                .help_url("https://www.dev47apps.com"),
            AppKind::Installable(InstallableSpec {
                download_url: url,
                executable: "DroidCamApp.exe".into(),
                default_install_path: Some(PathBuf::from(r"C:\Program Files (x86)\DroidCam")),
                run_as_admin_install: true,
                starts_after_installation: false,
                is_service: false,
            }),
        ));
    }

    let epoccam_map = DownloadMap {
        windows_x64: Some("https://edge.elgato.com/egc/windows/epoccam/EpocCam_Installer64_***VERSION***.exe".into()),
        ..Default::default()
    };
    if let Some(url) = epoccam_map.resolve_for(platform, Some("3_4_0")) {
        apps.push((
            AppBase::new("epoc-cam", "uses your iOS phone/tablet as local camera")
                .help_url("https://www.elgato.com/de/epoccam"),
            AppKind::Installable(InstallableSpec {
                download_url: url,
                executable: "EpocCamService.exe".into(),
                default_install_path: Some(PathBuf::from(r"C:\Program Files (x86)\Elgato\EpocCam")),
                run_as_admin_install: false,
                starts_after_installation: false,
                is_service: true,
            }),
        ));
    }

    apps
}

pub fn local_apps() -> Vec<(AppBase, AppKind)> {
    vec![(
        AppBase::new("custom", "Starts a program on your file-system"),
        AppKind::Local(LocalSpec::default()),
    )]
}

pub fn open_apps() -> Vec<(AppBase, AppKind)> {
    vec![
        (
            AppBase::new("autodarts.io", "Opens autodart`s web-platform"),
            AppKind::Open(OpenSpec {
                target: "https://autodarts.io".into(),
            }),
        ),
        (
            AppBase::new("autodarts-boardmanager", "Opens autodart`s board-manager"),
            AppKind::Open(OpenSpec {
                target: "http://127.0.0.1:3180".into(),
            }),
        ),
    ]
}

/// Compose the default profiles from whichever apps the platform offers.
pub fn default_profiles(apps: &[App]) -> Vec<Profile> {
    let has = |name: &str| apps.iter().any(|a| a.name() == name);
    let mut profiles = Vec::new();

    let companions = [
        "autodarts-wled",
        "autodarts-gif",
        "autodarts-voice",
        "cam-loader",
    ];
    let cameras = ["virtual-darts-zoom", "droid-cam", "epoc-cam"];

    if has("autodarts-caller") {
        let mut p = Profile::new("autodarts-caller");
        if has("autodarts-client") {
            p.add_app("autodarts-client", ProfileState::default());
        }
        p.add_app("autodarts.io", ProfileState::default());
        p.add_app("autodarts-boardmanager", ProfileState::default());
        p.add_app("autodarts-caller", ProfileState::required());
        for name in companions {
            if has(name) {
                p.add_app(name, ProfileState::default());
            }
        }
        if has("custom") {
            p.add_app("custom", ProfileState::default());
        }
        profiles.push(p);
    }

    if has("autodarts-caller") && has("autodarts-extern") {
        for (profile_name, platform_value) in [
            ("autodarts-extern: lidarts.org", "lidarts"),
            ("autodarts-extern: nakka.com/n01/online", "nakka"),
            ("autodarts-extern: dartboards.online", "dartboards"),
        ] {
            let mut p = Profile::new(profile_name);
            if has("autodarts-client") {
                p.add_app("autodarts-client", ProfileState::default());
            }
            p.add_app("autodarts.io", ProfileState::default());
            p.add_app("autodarts-boardmanager", ProfileState::default());
            p.add_app("autodarts-caller", ProfileState::required());
            let runtime =
                HashMap::from([("extern_platform".to_string(), platform_value.to_string())]);
            p.add_app(
                "autodarts-extern",
                ProfileState::required().with_runtime_arguments(runtime),
            );
            for name in companions.iter().chain(cameras.iter()) {
                if has(name) {
                    p.add_app(*name, ProfileState::default());
                }
            }
            if platform_value == "dartboards" && has("dartboards-client") {
                p.add_app("dartboards-client", ProfileState::default());
            }
            if has("custom") {
                p.add_app("custom", ProfileState::default());
            }
            profiles.push(p);
        }
    }

    if has("autodarts-client") {
        profiles.push(client_profile(&has));
    }

    profiles
}

/// The camera-only profile; also rebuilt by migration when it went missing.
pub fn client_profile(has: &dyn Fn(&str) -> bool) -> Profile {
    let mut p = Profile::new("autodarts-client");
    p.add_app("autodarts-client", ProfileState::required());
    p.add_app("autodarts.io", ProfileState::default());
    p.add_app("autodarts-boardmanager", ProfileState::default());
    if has("cam-loader") {
        p.add_app("cam-loader", ProfileState::default());
    }
    if has("custom") {
        p.add_app("custom", ProfileState::default());
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_seed_skips_windows_only_apps() {
        let apps = downloadable_apps(Platform::LINUX_X64);
        let names: Vec<&str> = apps.iter().map(|(b, _)| b.name.as_str()).collect();
        assert!(names.contains(&"autodarts-client"));
        assert!(names.contains(&"autodarts-caller"));
        assert!(!names.contains(&"virtual-darts-zoom"));
        assert!(!names.contains(&"cam-loader"));
        assert!(installable_apps(Platform::LINUX_X64).is_empty());
    }

    #[test]
    fn windows_seed_offers_the_full_catalog() {
        let apps = downloadable_apps(Platform::WINDOWS_X64);
        let names: Vec<&str> = apps.iter().map(|(b, _)| b.name.as_str()).collect();
        assert!(names.contains(&"virtual-darts-zoom"));
        assert_eq!(installable_apps(Platform::WINDOWS_X64).len(), 3);
    }

    #[test]
    fn seeded_urls_have_no_version_token_left() {
        for (base, kind) in downloadable_apps(Platform::WINDOWS_X64) {
            if let AppKind::Downloadable(spec) = kind {
                // virtual-darts-zoom has no per-release URL at all
                if base.name != "virtual-darts-zoom" {
                    assert!(!spec.download_url.contains("***"), "{}", base.name);
                }
            }
        }
    }
}
