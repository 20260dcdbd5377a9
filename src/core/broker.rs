use crate::core::db;
use crate::core::error;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const AUDIT_LOG_NAME: &str = "gateway.events.jsonl";

/// Single entry point for host database access.
/// Serializes connections in-process and appends one audit event per operation.
#[derive(Debug, Clone)]
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: root.join(AUDIT_LOG_NAME),
        }
    }

    /// Execute a closure with a serialized connection to the specified DB.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, error::CourseError>
    where
        F: FnOnce(&Connection) -> Result<R, error::CourseError>,
    {
        static DB_LOCK: Mutex<()> = Mutex::new(());
        // A poisoned lock only means another operation panicked; the guard itself holds no state.
        let _lock = DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let conn = db::db_connect(&db_path.to_string_lossy())?;

        let result = f(&conn);

        let status = if result.is_ok() { "success" } else { "error" };
        self.log_event(actor, op_name, &db_id, status)?;

        result
    }

    fn log_event(
        &self,
        actor: &str,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::CourseError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };
        let line = serde_json::to_string(&ev)
            .map_err(|e| error::CourseError::ValidationError(e.to_string()))?;

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(error::CourseError::IoError)?;

        writeln!(f, "{}", line).map_err(error::CourseError::IoError)?;
        Ok(())
    }
}

/// Read back every audit event, oldest first.
pub fn read_audit_log(root: &Path) -> Result<Vec<BrokerEvent>, error::CourseError> {
    let path = root.join(AUDIT_LOG_NAME);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let mut events = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let ev: BrokerEvent = serde_json::from_str(line)
            .map_err(|e| error::CourseError::ValidationError(format!("bad audit line: {}", e)))?;
        events.push(ev);
    }
    Ok(events)
}
