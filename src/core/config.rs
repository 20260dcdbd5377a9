//! Deployment settings loaded from `coursewright.toml` in the store root.
//!
//! The template itself is compiled in. Only the values that legitimately vary
//! between deployments (rename target, due-date lead time, audit actor) live
//! here, and a missing file means "use the defaults".

use crate::core::error::CourseError;
use crate::plugins::rename::{DEFAULT_FULLNAME, DEFAULT_SHORTNAME, RenameTarget};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "coursewright.toml";

/// Upper bound for `items.due_lead_days` (ten years).
pub const MAX_DUE_LEAD_DAYS: u64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub course: CourseConfig,
    #[serde(default)]
    pub items: ItemsConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseConfig {
    #[serde(default = "default_fullname")]
    pub fullname: String,
    #[serde(default = "default_shortname")]
    pub shortname: String,
    /// Rename the course before provisioning it.
    #[serde(default = "default_true")]
    pub rename: bool,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            fullname: default_fullname(),
            shortname: default_shortname(),
            rename: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsConfig {
    #[serde(default = "default_due_lead_days")]
    pub due_lead_days: u64,
}

impl Default for ItemsConfig {
    fn default() -> Self {
        Self {
            due_lead_days: default_due_lead_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_actor")]
    pub actor: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            actor: default_actor(),
        }
    }
}

fn default_fullname() -> String {
    DEFAULT_FULLNAME.to_string()
}

fn default_shortname() -> String {
    DEFAULT_SHORTNAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_due_lead_days() -> u64 {
    30
}

fn default_actor() -> String {
    "coursewright".to_string()
}

impl Config {
    pub fn rename_target(&self) -> RenameTarget {
        RenameTarget {
            fullname: self.course.fullname.clone(),
            shortname: self.course.shortname.clone(),
        }
    }

    fn validate(self) -> Result<Self, CourseError> {
        if self.course.shortname.trim().is_empty() {
            return Err(CourseError::ConfigError(
                "course.shortname must not be empty".to_string(),
            ));
        }
        if self.items.due_lead_days > MAX_DUE_LEAD_DAYS {
            return Err(CourseError::ConfigError(format!(
                "items.due_lead_days must be at most {}, got {}",
                MAX_DUE_LEAD_DAYS, self.items.due_lead_days
            )));
        }
        if self.audit.actor.trim().is_empty() {
            return Err(CourseError::ConfigError(
                "audit.actor must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

pub fn parse_config(content: &str) -> Result<Config, CourseError> {
    let config: Config =
        toml::from_str(content).map_err(|e| CourseError::ConfigError(e.to_string()))?;
    config.validate()
}

/// Load `coursewright.toml` from the store root; no file means defaults.
pub fn load_config(root: &Path) -> Result<Config, CourseError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&path).map_err(CourseError::IoError)?;
    parse_config(&content)
}

/// Write the default config unless one is already present. Returns true if written.
pub fn write_default_config(root: &Path) -> Result<bool, CourseError> {
    let path = config_path(root);
    if path.exists() {
        return Ok(false);
    }
    let body = toml::to_string_pretty(&Config::default())
        .map_err(|e| CourseError::ConfigError(e.to_string()))?;
    fs::write(&path, body)?;
    Ok(true)
}
