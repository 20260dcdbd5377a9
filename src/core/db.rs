use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::CourseError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::CourseError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::CourseError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::CourseError::RusqliteError)?;
    Ok(conn)
}

pub fn host_db_path(root: &Path) -> PathBuf {
    root.join(schemas::HOST_DB_NAME)
}

pub fn initialize_host_db(root: &Path, actor: &str) -> Result<PathBuf, error::CourseError> {
    fs::create_dir_all(root).map_err(error::CourseError::IoError)?;
    let db_path = host_db_path(root);

    let broker = DbBroker::new(root);
    broker.with_conn(&db_path, actor, "host.init", |conn| {
        conn.execute(schemas::HOST_DB_SCHEMA_COURSES, [])?;
        conn.execute(schemas::HOST_DB_SCHEMA_SECTIONS, [])?;
        conn.execute(schemas::HOST_DB_SCHEMA_SECTIONS_INDEX, [])?;
        conn.execute(schemas::HOST_DB_SCHEMA_ITEMS, [])?;
        conn.execute(schemas::HOST_DB_SCHEMA_ROLES, [])?;
        conn.execute(schemas::HOST_DB_SCHEMA_CAPABILITIES, [])?;
        Ok(())
    })?;

    Ok(db_path)
}
