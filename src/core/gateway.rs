//! Contracts between the provisioning core and the host platform.
//!
//! The engines never talk to storage directly. Everything they read or write
//! goes through [`ResourceGateway`] (courses, sections, items) and
//! [`CapabilityGateway`] (roles and permission verdicts). Implementations live
//! in `plugins::host` (SQLite) and `plugins::memory` (in-process fake).

use crate::core::error::CourseError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CourseId = i64;
pub type SectionId = i64;
pub type ItemId = i64;
pub type RoleId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub fullname: String,
    pub shortname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub course: CourseId,
    /// Section number within the course; 0 is the course's general section.
    pub position: u32,
    pub name: String,
    pub summary: String,
    pub visible: bool,
    pub availability: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub course: CourseId,
    pub position: u32,
    pub name: String,
    pub summary: String,
    pub visible: bool,
    pub availability: Option<String>,
}

/// What happens to a submission once it has been graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptReopen {
    None,
    Manual,
    UntilPass,
}

impl AttemptReopen {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptReopen::None => "none",
            AttemptReopen::Manual => "manual",
            AttemptReopen::UntilPass => "untilpass",
        }
    }
}

/// Assignment parameters shared by every provisioned item.
///
/// Fixed per deployment; only the due date varies per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPolicy {
    pub always_show_description: bool,
    pub submission_drafts: bool,
    pub require_submission_statement: bool,
    pub send_notifications: bool,
    pub send_late_notifications: bool,
    pub allow_submissions_from: u64,
    pub cutoff_date: u64,
    pub grading_due_date: u64,
    pub grade: i32,
    pub team_submission: bool,
    pub require_all_team_members_submit: bool,
    pub blind_marking: bool,
    pub hide_grader: bool,
    pub attempt_reopen: AttemptReopen,
    /// `-1` means unlimited.
    pub max_attempts: i32,
    pub marking_workflow: bool,
    pub marking_allocation: bool,
    pub feedback_comments: bool,
    pub visible: bool,
}

impl Default for ActivityPolicy {
    fn default() -> Self {
        Self {
            always_show_description: true,
            submission_drafts: false,
            require_submission_statement: false,
            send_notifications: false,
            send_late_notifications: false,
            allow_submissions_from: 0,
            cutoff_date: 0,
            grading_due_date: 0,
            grade: 100,
            team_submission: false,
            require_all_team_members_submit: false,
            blind_marking: false,
            hide_grader: false,
            attempt_reopen: AttemptReopen::None,
            max_attempts: -1,
            marking_workflow: false,
            marking_allocation: false,
            feedback_comments: true,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemParams {
    pub course: CourseId,
    pub section: SectionId,
    pub display_name: String,
    pub intro: String,
    /// Unix epoch seconds.
    pub due_at: u64,
    pub policy: ActivityPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub course: CourseId,
    pub section: SectionId,
    pub display_name: String,
    pub due_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub shortname: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Inherit,
    Allow,
    Prevent,
    Prohibit,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Inherit => "inherit",
            Verdict::Allow => "allow",
            Verdict::Prevent => "prevent",
            Verdict::Prohibit => "prohibit",
        }
    }

    pub fn parse(raw: &str) -> Option<Verdict> {
        match raw {
            "inherit" => Some(Verdict::Inherit),
            "allow" => Some(Verdict::Allow),
            "prevent" => Some(Verdict::Prevent),
            "prohibit" => Some(Verdict::Prohibit),
            _ => None,
        }
    }
}

/// Permission scope a verdict is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Course(CourseId),
    Item(ItemId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Course(id) => write!(f, "course:{}", id),
            Scope::Item(id) => write!(f, "item:{}", id),
        }
    }
}

pub trait ResourceGateway {
    fn list_sections(&self, course: CourseId) -> Result<Vec<Section>, CourseError>;
    fn insert_section(&self, section: &NewSection) -> Result<SectionId, CourseError>;
    fn delete_section(&self, section: SectionId) -> Result<(), CourseError>;
    fn list_items(&self, course: CourseId, section: SectionId) -> Result<Vec<Item>, CourseError>;
    fn create_item(&self, params: &ItemParams) -> Result<Item, CourseError>;
    fn delete_item(&self, item: ItemId) -> Result<(), CourseError>;
    /// Host caches of course structure are not self-invalidating; call after any section change.
    fn rebuild_course_cache(&self, course: CourseId) -> Result<(), CourseError>;
    fn get_course(&self, course: CourseId) -> Result<Course, CourseError>;
    fn update_course(&self, course: &Course) -> Result<(), CourseError>;
    /// Case-sensitive prefix match on short names.
    fn find_courses_by_shortname_prefix(
        &self,
        prefix: &str,
        excluding: CourseId,
    ) -> Result<Vec<CourseId>, CourseError>;
}

pub trait CapabilityGateway {
    fn list_roles(&self) -> Result<Vec<Role>, CourseError>;
    fn set_capability_verdict(
        &self,
        role: RoleId,
        scope: Scope,
        capability: &str,
        verdict: Verdict,
    ) -> Result<(), CourseError>;
}
