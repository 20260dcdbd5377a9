//! Reset engine: removes what provisioning created.
//!
//! No run id is stored, so sections are found by name against the template's
//! fixed section set. A section renamed by hand is left alone.

use crate::core::error::{CourseError, Step};
use crate::core::gateway::{CourseId, ResourceGateway};
use crate::plugins::template::Template;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResetOutcome {
    pub sections_removed: usize,
    pub items_removed: usize,
}

pub struct ResetEngine<'a, R: ?Sized> {
    template: &'a Template,
    resources: &'a R,
}

impl<'a, R: ResourceGateway + ?Sized> ResetEngine<'a, R> {
    pub fn new(template: &'a Template, resources: &'a R) -> Self {
        Self {
            template,
            resources,
        }
    }

    pub fn reset(&self, course: CourseId) -> Result<ResetOutcome, CourseError> {
        let sections = self
            .resources
            .list_sections(course)
            .map_err(|e| e.at(Step::ResetScan))?;

        let mut outcome = ResetOutcome::default();
        // Store order; sections are removed outright so positions do not matter.
        for section in sections
            .iter()
            .filter(|s| self.template.is_template_section(&s.name))
        {
            let items = self
                .resources
                .list_items(course, section.id)
                .map_err(|e| e.at(Step::ResetItems))?;
            for item in &items {
                self.resources
                    .delete_item(item.id)
                    .map_err(|e| e.at(Step::ResetItems))?;
                outcome.items_removed += 1;
            }

            self.resources
                .delete_section(section.id)
                .map_err(|e| e.at(Step::ResetSections))?;
            outcome.sections_removed += 1;
            debug!(course, section = section.id, items = items.len(), "section removed");
        }

        self.resources
            .rebuild_course_cache(course)
            .map_err(|e| e.at(Step::RebuildCache))?;

        info!(
            course,
            sections = outcome.sections_removed,
            items = outcome.items_removed,
            "course reset"
        );
        Ok(outcome)
    }
}
