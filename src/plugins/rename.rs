//! Course rename that precedes provisioning.
//!
//! Courses get a fixed target short name. When other courses already use that
//! name as a prefix, a numeric suffix of `collisions + 1` is appended. The rule
//! is deterministic so that re-running it agrees with courses renamed earlier.

use crate::core::error::CourseError;
use crate::core::gateway::{CourseId, ResourceGateway};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_FULLNAME: &str = "ГЭК - 09.03.02 Информационные системы и технологии 2025";
pub const DEFAULT_SHORTNAME: &str = "ГЭК 09.03.02 2025";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameTarget {
    pub fullname: String,
    pub shortname: String,
}

impl Default for RenameTarget {
    fn default() -> Self {
        Self {
            fullname: DEFAULT_FULLNAME.to_string(),
            shortname: DEFAULT_SHORTNAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenameOutcome {
    Unchanged,
    Renamed { shortname: String, collisions: usize },
}

pub fn disambiguate(target: &str, collisions: usize) -> String {
    if collisions == 0 {
        target.to_string()
    } else {
        format!("{} {}", target, collisions + 1)
    }
}

pub fn rename_course<R: ResourceGateway + ?Sized>(
    resources: &R,
    course: CourseId,
    target: &RenameTarget,
) -> Result<RenameOutcome, CourseError> {
    let mut current = resources.get_course(course)?;
    if current.shortname == target.shortname {
        return Ok(RenameOutcome::Unchanged);
    }

    let collisions = resources
        .find_courses_by_shortname_prefix(&target.shortname, course)?
        .len();
    let shortname = disambiguate(&target.shortname, collisions);

    current.fullname = target.fullname.clone();
    current.shortname = shortname.clone();
    resources.update_course(&current)?;

    info!(course, shortname = %shortname, collisions, "course renamed");
    Ok(RenameOutcome::Renamed {
        shortname,
        collisions,
    })
}
