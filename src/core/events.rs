//! Lifecycle event bus - typed events surfaced to the presentation layer

use tokio::sync::broadcast;

/// Events published while apps move through their lifecycle. Progress totals
/// are `None` when the server does not report a length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    DownloadStarted {
        app: String,
    },
    DownloadProgressed {
        app: String,
        received: u64,
        total: Option<u64>,
    },
    DownloadFinished {
        app: String,
    },
    DownloadFailed {
        app: String,
        reason: String,
    },
    InstallStarted {
        app: String,
    },
    InstallProgressed {
        app: String,
        received: u64,
        total: Option<u64>,
    },
    InstallFinished {
        app: String,
    },
    InstallFailed {
        app: String,
        reason: String,
    },
    /// Required arguments are unresolved; the run transition is blocked until
    /// the configuration surface fills them in. A gate, not a failure.
    ConfigurationRequired {
        app: String,
        missing: Vec<String>,
    },
}

impl AppEvent {
    /// The app this event belongs to
    pub fn app(&self) -> &str {
        match self {
            AppEvent::DownloadStarted { app }
            | AppEvent::DownloadProgressed { app, .. }
            | AppEvent::DownloadFinished { app }
            | AppEvent::DownloadFailed { app, .. }
            | AppEvent::InstallStarted { app }
            | AppEvent::InstallProgressed { app, .. }
            | AppEvent::InstallFinished { app }
            | AppEvent::InstallFailed { app, .. }
            | AppEvent::ConfigurationRequired { app, .. } => app,
        }
    }
}

/// Single-level event aggregation: every app publishes into the catalog's
/// bus, listeners subscribe once. Sending never blocks; events published with
/// no subscriber are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(AppEvent::DownloadStarted {
            app: "autodarts-caller".into(),
        });
        let event = rx.try_recv().unwrap();
        assert_eq!(event.app(), "autodarts-caller");
    }

    #[test]
    fn emitting_without_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.emit(AppEvent::DownloadFinished { app: "x".into() });
    }
}
