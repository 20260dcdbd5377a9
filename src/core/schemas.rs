//! Database schema for the reference host platform.
//!
//! One SQLite file (`host.db`) holds the course, section, item, role and
//! capability tables that `plugins::host::SqliteHost` serves through the
//! gateway traits.

pub const HOST_DB_NAME: &str = "host.db";

pub const HOST_DB_SCHEMA_COURSES: &str = "
    CREATE TABLE IF NOT EXISTS courses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        fullname TEXT NOT NULL,
        shortname TEXT NOT NULL,
        cache_rev INTEGER NOT NULL DEFAULT 0
    )
";

pub const HOST_DB_SCHEMA_SECTIONS: &str = "
    CREATE TABLE IF NOT EXISTS course_sections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course INTEGER NOT NULL REFERENCES courses(id),
        section INTEGER NOT NULL,
        name TEXT NOT NULL,
        summary TEXT NOT NULL DEFAULT '',
        summaryformat INTEGER NOT NULL DEFAULT 1,
        visible INTEGER NOT NULL DEFAULT 1,
        availability TEXT
    )
";

pub const HOST_DB_SCHEMA_SECTIONS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_course_sections_course ON course_sections(course, section)";

pub const HOST_DB_SCHEMA_ITEMS: &str = "
    CREATE TABLE IF NOT EXISTS course_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course INTEGER NOT NULL REFERENCES courses(id),
        section INTEGER NOT NULL REFERENCES course_sections(id),
        name TEXT NOT NULL,
        intro TEXT NOT NULL DEFAULT '',
        duedate INTEGER NOT NULL,
        policy_json TEXT NOT NULL
    )
";

pub const HOST_DB_SCHEMA_ROLES: &str = "
    CREATE TABLE IF NOT EXISTS roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        shortname TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL
    )
";

pub const HOST_DB_SCHEMA_CAPABILITIES: &str = "
    CREATE TABLE IF NOT EXISTS role_capabilities (
        role INTEGER NOT NULL REFERENCES roles(id),
        scope TEXT NOT NULL,
        capability TEXT NOT NULL,
        verdict TEXT NOT NULL,
        PRIMARY KEY (role, scope, capability)
    )
";

/// Role set a fresh host is seeded with.
pub const STANDARD_ROLES: [(&str, &str); 8] = [
    ("manager", "Manager"),
    ("coursecreator", "Course creator"),
    ("editingteacher", "Teacher"),
    ("teacher", "Non-editing teacher"),
    ("student", "Student"),
    ("guest", "Guest"),
    ("user", "Authenticated user"),
    ("frontpage", "Authenticated user on site home"),
];
