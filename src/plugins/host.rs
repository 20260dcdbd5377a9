//! Reference host platform backed by a single SQLite file.
//!
//! `SqliteHost` serves both gateway traits. Every call goes through the
//! [`DbBroker`], so each host operation is serialized in-process and leaves one
//! line in `gateway.events.jsonl`.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::CourseError;
use crate::core::gateway::{
    CapabilityGateway, Course, CourseId, Item, ItemId, ItemParams, NewSection, ResourceGateway,
    Role, RoleId, Scope, Section, SectionId, Verdict,
};
use crate::core::schemas;
use crate::core::store::Store;
use rusqlite::{OptionalExtension, params};
use std::path::PathBuf;

pub struct SqliteHost {
    db_path: PathBuf,
    broker: DbBroker,
    actor: String,
}

impl SqliteHost {
    /// Open the host database under the store root, creating tables as needed.
    pub fn open(store: &Store, actor: &str) -> Result<Self, CourseError> {
        let db_path = db::initialize_host_db(&store.root, actor)?;
        Ok(Self {
            db_path,
            broker: DbBroker::new(&store.root),
            actor: actor.to_string(),
        })
    }

    fn with_conn<F, T>(&self, op: &str, f: F) -> Result<T, CourseError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, CourseError>,
    {
        self.broker.with_conn(&self.db_path, &self.actor, op, f)
    }

    pub fn add_course(&self, fullname: &str, shortname: &str) -> Result<CourseId, CourseError> {
        self.with_conn("course.add", |conn| {
            conn.execute(
                "INSERT INTO courses(fullname, shortname) VALUES(?1, ?2)",
                params![fullname, shortname],
            )?;
            let id = conn.last_insert_rowid();
            // Every course starts with its general section at position 0.
            conn.execute(
                "INSERT INTO course_sections(course, section, name) VALUES(?1, 0, '')",
                params![id],
            )?;
            Ok(id)
        })
    }

    pub fn list_courses(&self) -> Result<Vec<Course>, CourseError> {
        self.with_conn("course.list", |conn| {
            let mut stmt =
                conn.prepare("SELECT id, fullname, shortname FROM courses ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(Course {
                    id: row.get(0)?,
                    fullname: row.get(1)?,
                    shortname: row.get(2)?,
                })
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }

    pub fn add_role(&self, shortname: &str, name: &str) -> Result<RoleId, CourseError> {
        self.with_conn("role.add", |conn| {
            conn.execute(
                "INSERT INTO roles(shortname, name) VALUES(?1, ?2)",
                params![shortname, name],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Insert the standard role set, skipping roles that already exist.
    pub fn seed_standard_roles(&self) -> Result<usize, CourseError> {
        self.with_conn("role.seed", |conn| {
            let mut added = 0;
            for (shortname, name) in schemas::STANDARD_ROLES {
                added += conn.execute(
                    "INSERT OR IGNORE INTO roles(shortname, name) VALUES(?1, ?2)",
                    params![shortname, name],
                )?;
            }
            Ok(added)
        })
    }

    pub fn verdict(
        &self,
        role: RoleId,
        scope: Scope,
        capability: &str,
    ) -> Result<Option<Verdict>, CourseError> {
        let raw: Option<String> = self.with_conn("capability.get", |conn| {
            Ok(conn
                .query_row(
                    "SELECT verdict FROM role_capabilities WHERE role = ?1 AND scope = ?2 AND capability = ?3",
                    params![role, scope.to_string(), capability],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        match raw {
            None => Ok(None),
            Some(s) => Verdict::parse(&s).map(Some).ok_or_else(|| {
                CourseError::ValidationError(format!("unknown verdict '{}' in host db", s))
            }),
        }
    }

    /// How many times the course cache has been rebuilt.
    pub fn cache_revision(&self, course: CourseId) -> Result<i64, CourseError> {
        self.with_conn("course.cache_rev", |conn| {
            conn.query_row(
                "SELECT cache_rev FROM courses WHERE id = ?1",
                params![course],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| CourseError::NotFound(format!("course {}", course)))
        })
    }
}

fn course_exists(conn: &rusqlite::Connection, course: CourseId) -> Result<(), CourseError> {
    conn.query_row("SELECT 1 FROM courses WHERE id = ?1", params![course], |_| Ok(()))
        .optional()?
        .ok_or_else(|| CourseError::NotFound(format!("course {}", course)))
}

fn expect_one(changed: usize, what: String) -> Result<(), CourseError> {
    if changed == 0 {
        return Err(CourseError::NotFound(what));
    }
    Ok(())
}

impl ResourceGateway for SqliteHost {
    fn list_sections(&self, course: CourseId) -> Result<Vec<Section>, CourseError> {
        self.with_conn("section.list", |conn| {
            course_exists(conn, course)?;
            let mut stmt = conn.prepare(
                "SELECT id, course, section, name, summary, visible, availability
                 FROM course_sections WHERE course = ?1 ORDER BY section, id",
            )?;
            let rows = stmt.query_map(params![course], |row| {
                Ok(Section {
                    id: row.get(0)?,
                    course: row.get(1)?,
                    position: row.get(2)?,
                    name: row.get(3)?,
                    summary: row.get(4)?,
                    visible: row.get::<_, i64>(5)? != 0,
                    availability: row.get(6)?,
                })
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }

    fn insert_section(&self, section: &NewSection) -> Result<SectionId, CourseError> {
        self.with_conn("section.insert", |conn| {
            conn.execute(
                "INSERT INTO course_sections(course, section, name, summary, visible, availability)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    section.course,
                    section.position,
                    section.name,
                    section.summary,
                    section.visible as i64,
                    section.availability
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn delete_section(&self, section: SectionId) -> Result<(), CourseError> {
        self.with_conn("section.delete", |conn| {
            let (course, position): (CourseId, u32) = conn
                .query_row(
                    "SELECT course, section FROM course_sections WHERE id = ?1",
                    params![section],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| CourseError::NotFound(format!("section {}", section)))?;
            conn.execute("DELETE FROM course_sections WHERE id = ?1", params![section])?;
            // Later sections close the gap so positions stay contiguous.
            conn.execute(
                "UPDATE course_sections SET section = section - 1 WHERE course = ?1 AND section > ?2",
                params![course, position],
            )?;
            Ok(())
        })
    }

    fn list_items(&self, course: CourseId, section: SectionId) -> Result<Vec<Item>, CourseError> {
        self.with_conn("item.list", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, course, section, name, duedate FROM course_items
                 WHERE course = ?1 AND section = ?2 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![course, section], |row| {
                Ok(Item {
                    id: row.get(0)?,
                    course: row.get(1)?,
                    section: row.get(2)?,
                    display_name: row.get(3)?,
                    due_at: row.get::<_, i64>(4)? as u64,
                })
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }

    fn create_item(&self, item: &ItemParams) -> Result<Item, CourseError> {
        let policy_json = serde_json::to_string(&item.policy)
            .map_err(|e| CourseError::ValidationError(e.to_string()))?;
        let due_at = i64::try_from(item.due_at).map_err(|_| {
            CourseError::ValidationError(format!("due date {} out of range", item.due_at))
        })?;
        self.with_conn("item.create", |conn| {
            conn.execute(
                "INSERT INTO course_items(course, section, name, intro, duedate, policy_json)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    item.course,
                    item.section,
                    item.display_name,
                    item.intro,
                    due_at,
                    policy_json
                ],
            )?;
            Ok(Item {
                id: conn.last_insert_rowid(),
                course: item.course,
                section: item.section,
                display_name: item.display_name.clone(),
                due_at: item.due_at,
            })
        })
    }

    fn delete_item(&self, item: ItemId) -> Result<(), CourseError> {
        let scope = Scope::Item(item).to_string();
        self.with_conn("item.delete", |conn| {
            conn.execute(
                "DELETE FROM role_capabilities WHERE scope = ?1",
                params![scope],
            )?;
            let changed = conn.execute("DELETE FROM course_items WHERE id = ?1", params![item])?;
            expect_one(changed, format!("item {}", item))
        })
    }

    fn rebuild_course_cache(&self, course: CourseId) -> Result<(), CourseError> {
        self.with_conn("course.rebuild_cache", |conn| {
            let changed = conn.execute(
                "UPDATE courses SET cache_rev = cache_rev + 1 WHERE id = ?1",
                params![course],
            )?;
            expect_one(changed, format!("course {}", course))
        })
    }

    fn get_course(&self, course: CourseId) -> Result<Course, CourseError> {
        self.with_conn("course.get", |conn| {
            conn.query_row(
                "SELECT id, fullname, shortname FROM courses WHERE id = ?1",
                params![course],
                |row| {
                    Ok(Course {
                        id: row.get(0)?,
                        fullname: row.get(1)?,
                        shortname: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| CourseError::NotFound(format!("course {}", course)))
        })
    }

    fn update_course(&self, course: &Course) -> Result<(), CourseError> {
        self.with_conn("course.update", |conn| {
            let changed = conn.execute(
                "UPDATE courses SET fullname = ?1, shortname = ?2 WHERE id = ?3",
                params![course.fullname, course.shortname, course.id],
            )?;
            expect_one(changed, format!("course {}", course.id))
        })
    }

    fn find_courses_by_shortname_prefix(
        &self,
        prefix: &str,
        excluding: CourseId,
    ) -> Result<Vec<CourseId>, CourseError> {
        self.with_conn("course.find_prefix", |conn| {
            // substr/length instead of LIKE: case-sensitive, and no wildcard escaping.
            let mut stmt = conn.prepare(
                "SELECT id FROM courses
                 WHERE substr(shortname, 1, length(?1)) = ?1 AND id <> ?2 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![prefix, excluding], |row| row.get::<_, CourseId>(0))?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }
}

impl CapabilityGateway for SqliteHost {
    fn list_roles(&self) -> Result<Vec<Role>, CourseError> {
        self.with_conn("role.list", |conn| {
            let mut stmt = conn.prepare("SELECT id, shortname, name FROM roles ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(Role {
                    id: row.get(0)?,
                    shortname: row.get(1)?,
                    name: row.get(2)?,
                })
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }

    fn set_capability_verdict(
        &self,
        role: RoleId,
        scope: Scope,
        capability: &str,
        verdict: Verdict,
    ) -> Result<(), CourseError> {
        self.with_conn("capability.set", |conn| {
            conn.execute(
                "INSERT INTO role_capabilities(role, scope, capability, verdict)
                 VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(role, scope, capability) DO UPDATE SET verdict = excluded.verdict",
                params![role, scope.to_string(), capability, verdict.as_str()],
            )?;
            Ok(())
        })
    }
}
