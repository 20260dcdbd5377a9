//! On-disk layout of a coursewright workspace.
//!
//! A store is one directory holding the reference host database, the gateway
//! audit log and the deployment config file.

use crate::core::broker::AUDIT_LOG_NAME;
use crate::core::config::CONFIG_FILE_NAME;
use crate::core::db;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn host_db_path(&self) -> PathBuf {
        db::host_db_path(&self.root)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join(AUDIT_LOG_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn is_initialized(&self) -> bool {
        self.host_db_path().exists()
    }
}
