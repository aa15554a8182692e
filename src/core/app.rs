//! App variants and their lifecycle state machines

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Child;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::argument::Configuration;
use super::events::{AppEvent, EventBus};
use super::is_false;
use super::process;
use crate::error::{Error, Result};
use crate::net::Downloader;

/// Lifecycle stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Download,
    Install,
    Run,
}

/// Lifecycle status of an app. Local and Open apps start in `Ready`; the
/// download/install stages do not exist for them.
#[derive(Debug, Clone, PartialEq)]
pub enum AppStatus {
    Idle,
    Downloading,
    Downloaded,
    Installing,
    Installed,
    Ready,
    Running,
    Closed,
    Failed { stage: FailureStage, reason: String },
}

impl AppStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Closed => "closed",
            Self::Failed { .. } => "failed",
        }
    }

    fn failed_at(&self, at: FailureStage) -> bool {
        matches!(self, Self::Failed { stage, .. } if *stage == at)
    }
}

/// Fields shared by every app variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppBase {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description_short: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Configuration>,
}

impl AppBase {
    pub fn new(name: impl Into<String>, description_short: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description_short: description_short.into(),
            help_url: None,
            configuration: None,
        }
    }

    pub fn help_url(mut self, url: impl Into<String>) -> Self {
        self.help_url = Some(url.into());
        self
    }

    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }
}

/// An app fetched as a single artifact that is the executable itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadableSpec {
    pub download_url: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub run_as_admin: bool,
}

/// An app fetched as an installer that places an executable elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallableSpec {
    pub download_url: String,
    pub executable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_install_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub run_as_admin_install: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub starts_after_installation: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_service: bool,
}

impl InstallableSpec {
    pub fn installed_executable(&self) -> Option<PathBuf> {
        self.default_install_path
            .as_ref()
            .map(|p| p.join(&self.executable))
    }
}

/// An arbitrary executable on the user's file system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
}

/// A URL or fixed target handed to the OS open-handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSpec {
    pub target: String,
}

/// Closed set of app variants. Capability queries dispatch on this instead
/// of a class hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum AppKind {
    Downloadable(DownloadableSpec),
    Installable(InstallableSpec),
    Local(LocalSpec),
    Open(OpenSpec),
}

impl AppKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Downloadable(_) => "downloadable",
            Self::Installable(_) => "installable",
            Self::Local(_) => "local",
            Self::Open(_) => "open",
        }
    }

    fn download_url(&self) -> Option<&str> {
        match self {
            Self::Downloadable(s) => Some(&s.download_url),
            Self::Installable(s) => Some(&s.download_url),
            _ => None,
        }
    }
}

fn artifact_filename(url: &str) -> String {
    let tail = url.rsplit('/').next().unwrap_or(url);
    let tail = tail.split(['?', '#']).next().unwrap_or(tail);
    if tail.is_empty() {
        "artifact".to_string()
    } else {
        tail.to_string()
    }
}

/// A managed companion app: shared identity plus variant data, the lifecycle
/// status and the owned process handle. Identity (`name`) is immutable after
/// creation and unique across all catalogs.
#[derive(Debug)]
pub struct App {
    pub base: AppBase,
    pub kind: AppKind,
    pub status: AppStatus,
    /// When the app was last started
    pub started_at: Option<DateTime<Utc>>,
    /// When the app last stopped
    pub stopped_at: Option<DateTime<Utc>>,
    child: Option<Child>,
    events: EventBus,
    download_dir: PathBuf,
}

impl App {
    pub fn new(base: AppBase, kind: AppKind, events: EventBus, downloads_root: &Path) -> Self {
        let download_dir = downloads_root.join(&base.name);
        let status = Self::initial_status(&kind, &download_dir);
        Self {
            base,
            kind,
            status,
            started_at: None,
            stopped_at: None,
            child: None,
            events,
            download_dir,
        }
    }

    /// Recover the lifecycle stage from what is already on disk.
    fn initial_status(kind: &AppKind, download_dir: &Path) -> AppStatus {
        let artifact = kind
            .download_url()
            .map(|url| download_dir.join(artifact_filename(url)));
        match kind {
            AppKind::Local(_) | AppKind::Open(_) => AppStatus::Ready,
            AppKind::Downloadable(_) => {
                if artifact.is_some_and(|p| p.exists()) {
                    AppStatus::Ready
                } else {
                    AppStatus::Idle
                }
            }
            AppKind::Installable(spec) => {
                if spec.installed_executable().is_some_and(|p| p.exists()) {
                    AppStatus::Installed
                } else if artifact.is_some_and(|p| p.exists()) {
                    AppStatus::Downloaded
                } else {
                    AppStatus::Idle
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn is_configurable(&self) -> bool {
        self.base.configuration.is_some()
    }

    pub fn is_downloadable(&self) -> bool {
        matches!(
            self.kind,
            AppKind::Downloadable(_) | AppKind::Installable(_)
        )
    }

    pub fn is_installable(&self) -> bool {
        matches!(self.kind, AppKind::Installable(_))
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, AppStatus::Running)
    }

    /// Where the downloaded artifact lives (downloadable and installable
    /// apps only)
    pub fn artifact_path(&self) -> Option<PathBuf> {
        self.kind
            .download_url()
            .map(|url| self.download_dir.join(artifact_filename(url)))
    }

    /// The executable `run` would launch, if the variant has one
    pub fn executable_path(&self) -> Option<PathBuf> {
        match &self.kind {
            AppKind::Downloadable(_) => self.artifact_path(),
            AppKind::Installable(spec) => spec.installed_executable(),
            AppKind::Local(spec) => spec.executable.clone(),
            AppKind::Open(_) => None,
        }
    }

    /// Point a local app at an executable on the file system
    pub fn set_local_executable(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        match &mut self.kind {
            AppKind::Local(spec) => {
                spec.executable = Some(path.into());
                Ok(())
            }
            _ => Err(Error::InvalidArgument(format!(
                "'{}' is not a local app",
                self.base.name
            ))),
        }
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            app: self.base.name.clone(),
            action,
            status: self.status.label().to_string(),
        }
    }

    /// Fetch the artifact. Valid from `Idle` or a failed download; anything
    /// else, including an in-flight download, is rejected. No automatic
    /// retry: a failure leaves the app in `Failed(download)` and the caller
    /// decides whether to invoke again.
    pub async fn download(&mut self, downloader: &Downloader) -> Result<()> {
        let Some(url) = self.kind.download_url().map(str::to_string) else {
            return Err(self.invalid("download"));
        };
        let valid = matches!(self.status, AppStatus::Idle)
            || self.status.failed_at(FailureStage::Download);
        if !valid {
            return Err(self.invalid("download"));
        }

        let dest = self.download_dir.join(artifact_filename(&url));
        let name = self.base.name.clone();
        self.status = AppStatus::Downloading;
        self.events.emit(AppEvent::DownloadStarted { app: name.clone() });

        let progress_bus = self.events.clone();
        let progress_app = name.clone();
        let result = downloader
            .fetch(&url, &dest, move |received, total| {
                progress_bus.emit(AppEvent::DownloadProgressed {
                    app: progress_app.clone(),
                    received,
                    total,
                });
            })
            .await;

        // a chmod failure is a download failure too
        #[cfg(unix)]
        let result = result.and_then(|()| make_executable(&dest).map_err(Error::Io));

        match result {
            Ok(()) => {
                self.status = if self.is_installable() {
                    AppStatus::Downloaded
                } else {
                    AppStatus::Ready
                };
                info!("'{}' downloaded to {:?}", name, dest);
                self.events.emit(AppEvent::DownloadFinished { app: name });
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("'{}' download failed: {}", name, reason);
                self.status = AppStatus::Failed {
                    stage: FailureStage::Download,
                    reason: reason.clone(),
                };
                self.events
                    .emit(AppEvent::DownloadFailed { app: name, reason });
                Err(e)
            }
        }
    }

    /// Run the downloaded installer. Valid from `Downloaded` or a failed
    /// install. Service installers are left to start themselves; otherwise
    /// `starts_after_installation` runs the app right away.
    pub async fn install(&mut self) -> Result<()> {
        let spec = match &self.kind {
            AppKind::Installable(s) => s.clone(),
            _ => return Err(self.invalid("install")),
        };
        let valid = matches!(self.status, AppStatus::Downloaded)
            || self.status.failed_at(FailureStage::Install);
        if !valid {
            return Err(self.invalid("install"));
        }

        let name = self.base.name.clone();
        let installer = self.download_dir.join(artifact_filename(&spec.download_url));
        self.status = AppStatus::Installing;
        self.events.emit(AppEvent::InstallStarted { app: name.clone() });

        let result = process::run_installer(&installer, spec.run_as_admin_install).await;
        let failure = match result {
            Ok(status) if status.success() => None,
            Ok(status) => Some(format!("installer exited with {status}")),
            Err(e) => Some(e.to_string()),
        };

        if let Some(reason) = failure {
            warn!("'{}' install failed: {}", name, reason);
            self.status = AppStatus::Failed {
                stage: FailureStage::Install,
                reason: reason.clone(),
            };
            self.events.emit(AppEvent::InstallFailed {
                app: name.clone(),
                reason: reason.clone(),
            });
            return Err(Error::Lifecycle {
                app: name,
                stage: "install",
                reason,
            });
        }

        self.status = AppStatus::Installed;
        info!("'{}' installed", name);
        self.events.emit(AppEvent::InstallFinished { app: name });
        if spec.starts_after_installation && !spec.is_service {
            self.run(&HashMap::new());
        }
        Ok(())
    }

    /// Gate before `run`: resolve the argument vector or report which
    /// required arguments are missing. Emits the configuration-required
    /// event; this blocks the run transition without being a failure.
    pub fn ensure_configured(&self, runtime: &HashMap<String, String>) -> Result<Vec<String>> {
        let Some(configuration) = &self.base.configuration else {
            return Ok(Vec::new());
        };
        configuration.render_args(runtime).map_err(|gate| {
            self.events.emit(AppEvent::ConfigurationRequired {
                app: self.base.name.clone(),
                missing: gate.missing.clone(),
            });
            Error::ConfigurationIncomplete {
                app: self.base.name.clone(),
                missing: gate.missing,
            }
        })
    }

    /// Launch the app with stored configuration overridden by `runtime`.
    /// The configuration gate is evaluated before the state guard, so a
    /// tagged app that was never downloaded still surfaces its missing
    /// arguments. Idempotent while already running; a failure is recorded
    /// per app and never propagates to others. Returns whether the app is
    /// running.
    pub fn run(&mut self, runtime: &HashMap<String, String>) -> bool {
        if self.is_running() {
            match self.child.as_mut().map(process::has_exited) {
                Some(false) | None => return true,
                Some(true) => self.child = None, // died underneath us; start over
            }
        }

        let args = match self.ensure_configured(runtime) {
            Ok(args) => args,
            Err(_) => return false,
        };

        // Running is only reachable here when the child died underneath us
        let startable = matches!(
            self.status,
            AppStatus::Running | AppStatus::Ready | AppStatus::Installed | AppStatus::Closed
        ) || self.status.failed_at(FailureStage::Run);
        if !startable {
            warn!(
                "'{}' cannot run while {}",
                self.base.name,
                self.status.label()
            );
            return false;
        }

        enum Launch {
            Open(String),
            Exec(PathBuf, bool),
        }
        let plan = match &self.kind {
            AppKind::Open(spec) => Launch::Open(spec.target.clone()),
            AppKind::Downloadable(spec) => match self.executable_path() {
                Some(path) => Launch::Exec(path, spec.run_as_admin),
                None => unreachable!("downloadable apps always have an artifact path"),
            },
            AppKind::Installable(_) | AppKind::Local(_) => match self.executable_path() {
                Some(path) => Launch::Exec(path, false),
                None => {
                    self.fail_run("no executable configured".to_string());
                    return false;
                }
            },
        };

        match plan {
            Launch::Open(target) => match open::that(&target) {
                Ok(()) => {
                    self.mark_running(None);
                    true
                }
                Err(e) => {
                    self.fail_run(format!("open-handler failed for {target}: {e}"));
                    false
                }
            },
            Launch::Exec(executable, elevated) => {
                if !executable.exists() {
                    self.fail_run(format!("executable not found: {}", executable.display()));
                    return false;
                }
                match process::spawn_app(&executable, &args, elevated) {
                    Ok(child) => {
                        self.mark_running(Some(child));
                        true
                    }
                    Err(e) => {
                        self.fail_run(e.to_string());
                        false
                    }
                }
            }
        }
    }

    /// Terminate the owned process if one exists; tolerant of a process
    /// that already exited. No-op unless running.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        if let Some(mut child) = self.child.take() {
            process::terminate(&mut child)?;
        }
        self.status = AppStatus::Closed;
        self.stopped_at = Some(Utc::now());
        info!("'{}' closed", self.base.name);
        Ok(())
    }

    fn mark_running(&mut self, child: Option<Child>) {
        self.child = child;
        self.status = AppStatus::Running;
        self.started_at = Some(Utc::now());
        self.stopped_at = None;
        info!("'{}' running", self.base.name);
    }

    fn fail_run(&mut self, reason: String) {
        warn!("'{}' run failed: {}", self.base.name, reason);
        self.status = AppStatus::Failed {
            stage: FailureStage::Run,
            reason,
        };
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::argument::{Argument, Configuration};

    fn local_app(executable: Option<&str>) -> App {
        App::new(
            AppBase::new("custom", "Starts a program on your file-system"),
            AppKind::Local(LocalSpec {
                executable: executable.map(PathBuf::from),
            }),
            EventBus::default(),
            Path::new("/tmp/dartmate-downloads"),
        )
    }

    fn downloadable_app(configuration: Option<Configuration>) -> App {
        let mut base = AppBase::new("caller", "calls out thrown points");
        base.configuration = configuration;
        App::new(
            base,
            AppKind::Downloadable(DownloadableSpec {
                download_url: "https://example.org/releases/caller".into(),
                run_as_admin: false,
            }),
            EventBus::default(),
            Path::new("/tmp/dartmate-downloads"),
        )
    }

    #[test]
    fn local_and_open_apps_start_ready() {
        assert_eq!(local_app(None).status, AppStatus::Ready);
        let open = App::new(
            AppBase::new("autodarts.io", "Opens the web platform"),
            AppKind::Open(OpenSpec {
                target: "https://autodarts.io".into(),
            }),
            EventBus::default(),
            Path::new("/tmp/dartmate-downloads"),
        );
        assert_eq!(open.status, AppStatus::Ready);
    }

    #[test]
    fn downloadable_app_without_artifact_starts_idle() {
        assert_eq!(downloadable_app(None).status, AppStatus::Idle);
    }

    #[tokio::test]
    async fn download_is_rejected_for_local_apps() {
        let mut app = local_app(None);
        let err = app.download(&Downloader::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn download_reentry_is_rejected() {
        let mut app = downloadable_app(None);
        app.status = AppStatus::Downloading;
        let err = app.download(&Downloader::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(app.status, AppStatus::Downloading);
    }

    #[test]
    fn configuration_gate_fires_before_any_download_happened() {
        let configuration = Configuration::new("-", " ")
            .with_arguments(vec![Argument::new("U", "string").required()]);
        let mut app = downloadable_app(Some(configuration));
        assert_eq!(app.status, AppStatus::Idle);

        let mut rx = app.events.subscribe();
        assert!(!app.run(&HashMap::new()));
        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::ConfigurationRequired { .. }
        ));
        assert_ne!(app.status, AppStatus::Running);
    }

    #[tokio::test]
    async fn failed_download_stays_retryable() {
        let mut app = App::new(
            AppBase::new("caller", "calls out thrown points"),
            AppKind::Downloadable(DownloadableSpec {
                download_url: "http://127.0.0.1:9/caller".into(),
                run_as_admin: false,
            }),
            EventBus::default(),
            Path::new("/tmp/dartmate-downloads"),
        );
        let mut rx = app.events.subscribe();

        assert!(app.download(&Downloader::new()).await.is_err());
        assert!(app.status.failed_at(FailureStage::Download));
        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::DownloadStarted { .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::DownloadFailed { .. }
        ));

        // a failed download may be attempted again
        assert!(app.download(&Downloader::new()).await.is_err());
    }

    #[test]
    fn unresolved_required_argument_gates_run() {
        let configuration = Configuration::new("-", " ")
            .with_arguments(vec![Argument::new("U", "string").required()]);
        let mut app = downloadable_app(Some(configuration));
        app.status = AppStatus::Ready;

        let mut rx = app.events.subscribe();
        assert!(!app.run(&HashMap::new()));

        assert_ne!(app.status, AppStatus::Running);
        match rx.try_recv().unwrap() {
            AppEvent::ConfigurationRequired { app, missing } => {
                assert_eq!(app, "caller");
                assert_eq!(missing, vec!["U".to_string()]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn run_is_idempotent_and_close_is_tolerant() {
        let mut app = local_app(Some("/bin/sleep"));
        // prefix-less, delimiter-less flag renders the bare sleep duration
        app.base.configuration = Some(
            Configuration::new("", "")
                .with_arguments(vec![Argument::new("30", "string").value("")]),
        );
        assert!(app.run(&HashMap::new()));
        assert!(app.is_running());
        // second invocation is a no-op that reports success
        assert!(app.run(&HashMap::new()));
        app.close().unwrap();
        assert_eq!(app.status, AppStatus::Closed);
        // closing again is a no-op
        app.close().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn run_restarts_after_the_child_exited_underneath() {
        let mut app = local_app(Some("/bin/true"));
        assert!(app.run(&HashMap::new()));
        std::thread::sleep(std::time::Duration::from_millis(200));
        // the process is long gone even though the status still says running
        assert!(app.run(&HashMap::new()));
        app.close().unwrap();
    }

    #[test]
    fn run_failure_records_stage_and_reason() {
        let mut app = local_app(Some("/nonexistent/never-here"));
        assert!(!app.run(&HashMap::new()));
        match &app.status {
            AppStatus::Failed { stage, reason } => {
                assert_eq!(*stage, FailureStage::Run);
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn artifact_filename_strips_query_and_path() {
        assert_eq!(
            artifact_filename("https://example.org/v1/app.zip?token=x"),
            "app.zip"
        );
        assert_eq!(artifact_filename("https://example.org/dir/"), "artifact");
    }
}
