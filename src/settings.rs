use crate::exceptions::AidantError;
use crate::fs::{atomic_write_json, read_json};
use crate::utils::get_app_config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const WORKSPACE_CONFIG_FILE: &str = ".aidant.json";
pub const APP_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub coder: CoderSettings,
    pub repository: RepositorySettings,
    pub ui: UiSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoderSettings {
    pub auto_apply: bool,
    pub show_diffs: bool,
    pub backup_files: bool,
    pub rollback_on_failure: bool,
    pub whitespace_flexible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    pub auto_commit: bool,
    pub commit_message_template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub confirm_changes: bool,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            coder: CoderSettings::default(),
            repository: RepositorySettings::default(),
            ui: UiSettings::default(),
        }
    }
}

impl Default for CoderSettings {
    fn default() -> Self {
        Self {
            auto_apply: false,
            show_diffs: true,
            backup_files: false,
            rollback_on_failure: true,
            whitespace_flexible: false,
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            confirm_changes: true,
            verbose: false,
        }
    }
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            auto_commit: true,
            commit_message_template: "AI: {description}".to_string(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl Settings {
    /// Defaults, then the first config file found, then environment overrides.
    pub fn load(workspace: &Path) -> Result<Self, AidantError> {
        let mut settings = match Self::config_file(workspace) {
            Some(path) => {
                debug!(path = %path.display(), "loading settings");
                read_json::<Settings>(&path).map_err(|e| {
                    AidantError::Configuration(format!("{}: {}", path.display(), e))
                })?
            }
            None => Settings::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn config_file(workspace: &Path) -> Option<PathBuf> {
        let local = workspace.join(WORKSPACE_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        get_app_config_dir()
            .map(|dir| dir.join(APP_CONFIG_FILE))
            .filter(|p| p.is_file())
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), AidantError> {
        if let Some(model) = lookup("AIDANT_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model = model.trim().to_string();
        }

        let flags: [(&str, &mut bool); 4] = [
            ("AIDANT_AUTO_APPLY", &mut self.coder.auto_apply),
            ("AIDANT_AUTO_COMMIT", &mut self.repository.auto_commit),
            ("AIDANT_BACKUP_FILES", &mut self.coder.backup_files),
            ("AIDANT_VERBOSE", &mut self.ui.verbose),
        ];
        for (key, slot) in flags {
            if let Some(raw) = lookup(key) {
                *slot = parse_bool(&raw).ok_or_else(|| {
                    AidantError::Configuration(format!(
                        "{} must be a boolean, got '{}'",
                        key, raw
                    ))
                })?;
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), AidantError> {
        atomic_write_json(path, self)
    }
}
