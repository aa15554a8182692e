//! Profile execution - starting tagged apps in order and closing everything

use std::collections::HashMap;

use tracing::{info, warn};

use super::catalog::AppCatalog;
use crate::error::{Error, Result};

impl AppCatalog {
    /// Start every tagged app of the named profile in stored order, each
    /// with its runtime-argument overrides. One app failing or being gated
    /// on configuration never stops the rest; the result is whether all of
    /// them ended up running.
    pub fn run_profile(&mut self, name: &str) -> Result<bool> {
        let profile = self
            .profile(name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))?;
        let planned: Vec<(String, HashMap<String, String>)> = profile
            .tagged_apps()
            .map(|e| (e.app.clone(), e.state.runtime_arguments.clone()))
            .collect();
        info!("starting profile '{}', {} tagged apps", name, planned.len());

        let mut all_running = true;
        for (app_name, runtime) in planned {
            // linking guarantees the app exists
            let Some(app) = self.app_mut(&app_name) else {
                warn!("profile '{}' references missing app '{}'", name, app_name);
                all_running = false;
                continue;
            };
            if !app.run(&runtime) {
                all_running = false;
            }
        }
        Ok(all_running)
    }

    /// Close every app in the catalog. Per-app errors are logged, never
    /// propagated; shutdown always visits all of them.
    pub fn close_apps(&mut self) {
        for app in &mut self.apps {
            if let Err(e) = app.close() {
                warn!("closing '{}' failed: {}", app.name(), e);
            }
        }
    }
}
