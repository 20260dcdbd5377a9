//! In-process host used by tests and dry runs.
//!
//! State sits behind a mutex so the gateway traits can take `&self` like the
//! SQLite host does. Every gateway call is recorded by operation name, and a
//! single failure can be armed per operation to exercise partial runs.

use crate::core::error::CourseError;
use crate::core::gateway::{
    CapabilityGateway, Course, CourseId, Item, ItemId, ItemParams, NewSection, ResourceGateway,
    Role, RoleId, Scope, Section, SectionId, Verdict,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    courses: Vec<Course>,
    sections: Vec<Section>,
    items: Vec<Item>,
    roles: Vec<Role>,
    verdicts: HashMap<(RoleId, Scope, String), Verdict>,
    cache_rebuilds: HashMap<CourseId, usize>,
    calls: Vec<String>,
    /// op name -> number of further successful calls before it fails
    armed: HashMap<String, usize>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_course(&self, course: CourseId) -> Result<(), CourseError> {
        if self.courses.iter().any(|c| c.id == course) {
            return Ok(());
        }
        Err(CourseError::NotFound(format!("course {}", course)))
    }
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<MemoryState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a gateway call and fail it if a failure is armed for `op`.
    fn enter(&self, op: &str) -> Result<MutexGuard<'_, MemoryState>, CourseError> {
        let mut state = self.lock();
        state.calls.push(op.to_string());
        let fire = match state.armed.get_mut(op) {
            Some(0) => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        };
        if fire {
            state.armed.remove(op);
            return Err(CourseError::GatewayUnavailable(format!(
                "injected failure on {}",
                op
            )));
        }
        Ok(state)
    }

    /// Make the call to `op` after `successes` successful ones fail once.
    pub fn fail_on(&self, op: &str, successes: usize) {
        self.lock().armed.insert(op.to_string(), successes);
    }

    /// Gateway operations seen so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn add_course(&self, fullname: &str, shortname: &str) -> CourseId {
        let mut state = self.lock();
        let id = state.next_id();
        state.courses.push(Course {
            id,
            fullname: fullname.to_string(),
            shortname: shortname.to_string(),
        });
        id
    }

    /// Put a section on the course directly, bypassing the gateway log.
    pub fn add_section(&self, course: CourseId, position: u32, name: &str) -> SectionId {
        let mut state = self.lock();
        let id = state.next_id();
        state.sections.push(Section {
            id,
            course,
            position,
            name: name.to_string(),
            summary: String::new(),
            visible: true,
            availability: None,
        });
        id
    }

    pub fn rename_section(&self, section: SectionId, name: &str) {
        let mut state = self.lock();
        if let Some(s) = state.sections.iter_mut().find(|s| s.id == section) {
            s.name = name.to_string();
        }
    }

    pub fn add_role(&self, shortname: &str) -> RoleId {
        let mut state = self.lock();
        let id = state.next_id();
        state.roles.push(Role {
            id,
            shortname: shortname.to_string(),
            name: shortname.to_string(),
        });
        id
    }

    pub fn course(&self, course: CourseId) -> Option<Course> {
        self.lock().courses.iter().find(|c| c.id == course).cloned()
    }

    pub fn sections(&self, course: CourseId) -> Vec<Section> {
        let mut out: Vec<Section> = self
            .lock()
            .sections
            .iter()
            .filter(|s| s.course == course)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.position, s.id));
        out
    }

    pub fn items(&self, course: CourseId) -> Vec<Item> {
        self.lock()
            .items
            .iter()
            .filter(|i| i.course == course)
            .cloned()
            .collect()
    }

    pub fn verdict(&self, role: RoleId, scope: Scope, capability: &str) -> Option<Verdict> {
        self.lock()
            .verdicts
            .get(&(role, scope, capability.to_string()))
            .copied()
    }

    pub fn verdict_count(&self) -> usize {
        self.lock().verdicts.len()
    }

    pub fn cache_rebuilds(&self, course: CourseId) -> usize {
        self.lock().cache_rebuilds.get(&course).copied().unwrap_or(0)
    }
}

impl ResourceGateway for MemoryHost {
    fn list_sections(&self, course: CourseId) -> Result<Vec<Section>, CourseError> {
        let state = self.enter("section.list")?;
        state.require_course(course)?;
        Ok(state
            .sections
            .iter()
            .filter(|s| s.course == course)
            .cloned()
            .collect())
    }

    fn insert_section(&self, section: &NewSection) -> Result<SectionId, CourseError> {
        let mut state = self.enter("section.insert")?;
        state.require_course(section.course)?;
        let id = state.next_id();
        state.sections.push(Section {
            id,
            course: section.course,
            position: section.position,
            name: section.name.clone(),
            summary: section.summary.clone(),
            visible: section.visible,
            availability: section.availability.clone(),
        });
        Ok(id)
    }

    fn delete_section(&self, section: SectionId) -> Result<(), CourseError> {
        let mut state = self.enter("section.delete")?;
        let Some(index) = state.sections.iter().position(|s| s.id == section) else {
            return Err(CourseError::NotFound(format!("section {}", section)));
        };
        let removed = state.sections.remove(index);
        for s in state
            .sections
            .iter_mut()
            .filter(|s| s.course == removed.course && s.position > removed.position)
        {
            s.position -= 1;
        }
        Ok(())
    }

    fn list_items(&self, course: CourseId, section: SectionId) -> Result<Vec<Item>, CourseError> {
        let state = self.enter("item.list")?;
        Ok(state
            .items
            .iter()
            .filter(|i| i.course == course && i.section == section)
            .cloned()
            .collect())
    }

    fn create_item(&self, params: &ItemParams) -> Result<Item, CourseError> {
        let mut state = self.enter("item.create")?;
        if !state
            .sections
            .iter()
            .any(|s| s.id == params.section && s.course == params.course)
        {
            return Err(CourseError::NotFound(format!(
                "section {} in course {}",
                params.section, params.course
            )));
        }
        let item = Item {
            id: state.next_id(),
            course: params.course,
            section: params.section,
            display_name: params.display_name.clone(),
            due_at: params.due_at,
        };
        state.items.push(item.clone());
        Ok(item)
    }

    fn delete_item(&self, item: ItemId) -> Result<(), CourseError> {
        let mut state = self.enter("item.delete")?;
        let before = state.items.len();
        state.items.retain(|i| i.id != item);
        if state.items.len() == before {
            return Err(CourseError::NotFound(format!("item {}", item)));
        }
        state.verdicts.retain(|(_, scope, _), _| *scope != Scope::Item(item));
        Ok(())
    }

    fn rebuild_course_cache(&self, course: CourseId) -> Result<(), CourseError> {
        let mut state = self.enter("course.rebuild_cache")?;
        *state.cache_rebuilds.entry(course).or_insert(0) += 1;
        Ok(())
    }

    fn get_course(&self, course: CourseId) -> Result<Course, CourseError> {
        let state = self.enter("course.get")?;
        state
            .courses
            .iter()
            .find(|c| c.id == course)
            .cloned()
            .ok_or_else(|| CourseError::NotFound(format!("course {}", course)))
    }

    fn update_course(&self, course: &Course) -> Result<(), CourseError> {
        let mut state = self.enter("course.update")?;
        let slot = state
            .courses
            .iter_mut()
            .find(|c| c.id == course.id)
            .ok_or_else(|| CourseError::NotFound(format!("course {}", course.id)))?;
        *slot = course.clone();
        Ok(())
    }

    fn find_courses_by_shortname_prefix(
        &self,
        prefix: &str,
        excluding: CourseId,
    ) -> Result<Vec<CourseId>, CourseError> {
        let state = self.enter("course.find_prefix")?;
        Ok(state
            .courses
            .iter()
            .filter(|c| c.id != excluding && c.shortname.starts_with(prefix))
            .map(|c| c.id)
            .collect())
    }
}

impl CapabilityGateway for MemoryHost {
    fn list_roles(&self) -> Result<Vec<Role>, CourseError> {
        let state = self.enter("role.list")?;
        Ok(state.roles.clone())
    }

    fn set_capability_verdict(
        &self,
        role: RoleId,
        scope: Scope,
        capability: &str,
        verdict: Verdict,
    ) -> Result<(), CourseError> {
        let mut state = self.enter("capability.set")?;
        state
            .verdicts
            .insert((role, scope, capability.to_string()), verdict);
        Ok(())
    }
}
