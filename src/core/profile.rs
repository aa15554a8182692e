//! Profiles - named, ordered app selections started together

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::is_false;
use crate::error::{Error, Result};

/// Per-app state inside a profile: whether the app starts with the profile
/// and which argument values override its stored configuration at launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileState {
    #[serde(default, skip_serializing_if = "is_false")]
    pub tagged_for_start: bool,
    /// Cannot be untagged by the user
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub runtime_arguments: HashMap<String, String>,
}

impl ProfileState {
    pub fn tagged() -> Self {
        Self {
            tagged_for_start: true,
            ..Default::default()
        }
    }

    pub fn required() -> Self {
        Self {
            tagged_for_start: true,
            is_required: true,
            ..Default::default()
        }
    }

    pub fn with_runtime_arguments(mut self, arguments: HashMap<String, String>) -> Self {
        self.runtime_arguments = arguments;
        self
    }
}

/// One app membership in a profile, in the profile's stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub app: String,
    #[serde(flatten)]
    pub state: ProfileState,
}

/// A named, ordered subset of catalog apps with per-app start tagging and
/// runtime-argument overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub apps: Vec<ProfileEntry>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            apps: Vec::new(),
        }
    }

    pub fn contains_app(&self, app: &str) -> bool {
        self.apps.iter().any(|e| e.app == app)
    }

    pub fn entry(&self, app: &str) -> Option<&ProfileEntry> {
        self.apps.iter().find(|e| e.app == app)
    }

    pub fn entry_mut(&mut self, app: &str) -> Option<&mut ProfileEntry> {
        self.apps.iter_mut().find(|e| e.app == app)
    }

    /// Append an app unless it is already a member
    pub fn add_app(&mut self, app: impl Into<String>, state: ProfileState) {
        let app = app.into();
        if !self.contains_app(&app) {
            self.apps.push(ProfileEntry { app, state });
        }
    }

    /// Remove an app membership; true if it was present
    pub fn remove_app(&mut self, app: &str) -> bool {
        let before = self.apps.len();
        self.apps.retain(|e| e.app != app);
        self.apps.len() != before
    }

    /// Tag or untag an app for start. Untagging a required membership is
    /// rejected.
    pub fn set_tagged(&mut self, app: &str, tagged: bool) -> Result<()> {
        let entry = self
            .entry_mut(app)
            .ok_or_else(|| Error::InvalidArgument(format!("app '{app}' is not in the profile")))?;
        if !tagged && entry.state.is_required {
            return Err(Error::InvalidArgument(format!(
                "app '{app}' is required and cannot be untagged"
            )));
        }
        entry.state.tagged_for_start = tagged;
        Ok(())
    }

    /// Apps tagged for start, in stored order
    pub fn tagged_apps(&self) -> impl Iterator<Item = &ProfileEntry> {
        self.apps.iter().filter(|e| e.state.tagged_for_start)
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        let mut p = Profile::new("autodarts-caller");
        p.add_app("autodarts-client", ProfileState::default());
        p.add_app("autodarts-caller", ProfileState::required());
        p.add_app("autodarts-wled", ProfileState::tagged());
        p
    }

    #[test]
    fn membership_order_is_preserved() {
        let p = profile();
        let names: Vec<&str> = p.apps.iter().map(|e| e.app.as_str()).collect();
        assert_eq!(
            names,
            vec!["autodarts-client", "autodarts-caller", "autodarts-wled"]
        );
    }

    #[test]
    fn required_membership_cannot_be_untagged() {
        let mut p = profile();
        assert!(p.set_tagged("autodarts-caller", false).is_err());
        assert!(p.set_tagged("autodarts-wled", false).is_ok());
        assert!(p.set_tagged("autodarts-client", true).is_ok());
    }

    #[test]
    fn adding_an_existing_app_is_a_no_op() {
        let mut p = profile();
        p.add_app("autodarts-wled", ProfileState::default());
        assert_eq!(p.apps.len(), 3);
        // the original state survives
        assert!(p.entry("autodarts-wled").unwrap().state.tagged_for_start);
    }

    #[test]
    fn tagged_apps_iterates_in_order() {
        let p = profile();
        let tagged: Vec<&str> = p.tagged_apps().map(|e| e.app.as_str()).collect();
        assert_eq!(tagged, vec!["autodarts-caller", "autodarts-wled"]);
    }

    #[test]
    fn default_fields_are_omitted_when_serialized() {
        let json = serde_json::to_string(&profile()).unwrap();
        assert!(!json.contains("runtime_arguments"));
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile());
    }
}
