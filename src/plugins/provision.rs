//! Provisioning engine.
//!
//! `provision` runs the whole workflow against one course:
//! idempotency check, optional rename, section creation, cache rebuild, item
//! creation and per-item lockdown. Calls are strictly sequential. A failure
//! stops the run where it is; nothing already created is rolled back.
//!
//! The idempotency check is name based: a course counts as provisioned when a
//! section carries the template's first section name. Renaming that section by
//! hand makes the course look untouched again. Two concurrent runs on the same
//! course can both pass the check; callers must serialize them.

use crate::core::config::Config;
use crate::core::error::{CourseError, Step};
use crate::core::gateway::{
    CapabilityGateway, CourseId, Item, ItemParams, NewSection, ResourceGateway, Section,
};
use crate::core::time;
use crate::plugins::lockdown;
use crate::plugins::rename::{self, RenameOutcome, RenameTarget};
use crate::plugins::template::Template;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Seconds between the run and every item's due date.
    pub due_lead_secs: u64,
    /// Rename the course before creating anything.
    pub rename: Option<RenameTarget>,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            due_lead_secs: 30 * time::SECONDS_PER_DAY,
            rename: None,
        }
    }
}

impl ProvisionOptions {
    pub fn from_config(config: &Config) -> Result<Self, CourseError> {
        let due_lead_secs = config
            .items
            .due_lead_days
            .checked_mul(time::SECONDS_PER_DAY)
            .ok_or_else(|| {
                CourseError::ValidationError(format!(
                    "due lead of {} days is out of range",
                    config.items.due_lead_days
                ))
            })?;
        Ok(Self {
            due_lead_secs,
            rename: config.course.rename.then(|| config.rename_target()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    /// No template section yet; new sections go after `section_count` existing ones.
    Untouched { section_count: usize },
    Provisioned,
}

impl Readiness {
    pub fn needs_provisioning(&self) -> bool {
        matches!(self, Readiness::Untouched { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub course: CourseId,
    pub template_fingerprint: String,
    pub rename: Option<RenameOutcome>,
    pub sections: Vec<Section>,
    /// Position of the section that received the items.
    pub item_section: u32,
    pub items: Vec<Item>,
    pub verdicts_written: usize,
}

impl ProvisionReport {
    pub fn sections_created(&self) -> usize {
        self.sections.len()
    }

    pub fn items_created(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    AlreadyProvisioned,
    Provisioned(ProvisionReport),
}

/// Scan the course for the template's first section name.
pub fn needs_provisioning<R: ResourceGateway + ?Sized>(
    resources: &R,
    template: &Template,
    course: CourseId,
) -> Result<Readiness, CourseError> {
    let sections = resources.list_sections(course)?;
    let marker = &template.first_section().name;
    if sections.iter().any(|s| &s.name == marker) {
        return Ok(Readiness::Provisioned);
    }
    Ok(Readiness::Untouched {
        section_count: sections.len(),
    })
}

#[derive(Default)]
struct Progress {
    sections_created: usize,
    items_created: usize,
}

impl Progress {
    fn fail(&self, step: Step, source: CourseError) -> CourseError {
        if self.sections_created == 0 && self.items_created == 0 {
            return source.at(step);
        }
        warn!(
            %step,
            sections_created = self.sections_created,
            items_created = self.items_created,
            "provisioning stopped part way"
        );
        CourseError::PartialProvision {
            step,
            sections_created: self.sections_created,
            items_created: self.items_created,
            source: Box::new(source),
        }
    }
}

pub struct ProvisionEngine<'a, R: ?Sized, C: ?Sized> {
    template: &'a Template,
    resources: &'a R,
    capabilities: &'a C,
    options: ProvisionOptions,
}

impl<'a, R, C> ProvisionEngine<'a, R, C>
where
    R: ResourceGateway + ?Sized,
    C: CapabilityGateway + ?Sized,
{
    pub fn new(
        template: &'a Template,
        resources: &'a R,
        capabilities: &'a C,
        options: ProvisionOptions,
    ) -> Self {
        Self {
            template,
            resources,
            capabilities,
            options,
        }
    }

    pub fn needs_provisioning(&self, course: CourseId) -> Result<Readiness, CourseError> {
        needs_provisioning(self.resources, self.template, course)
    }

    pub fn provision(&self, course: CourseId) -> Result<ProvisionOutcome, CourseError> {
        self.provision_at(course, time::now_epoch())
    }

    /// Same as [`provision`](Self::provision) with an explicit "now" in epoch seconds.
    pub fn provision_at(&self, course: CourseId, now: u64) -> Result<ProvisionOutcome, CourseError> {
        let section_count = match self
            .needs_provisioning(course)
            .map_err(|e| e.at(Step::IdempotencyCheck))?
        {
            Readiness::Provisioned => {
                info!(course, "course already provisioned");
                return Ok(ProvisionOutcome::AlreadyProvisioned);
            }
            Readiness::Untouched { section_count } => section_count,
        };

        let due_at = now.checked_add(self.options.due_lead_secs).ok_or_else(|| {
            CourseError::ValidationError(format!(
                "due date {} + {}s is out of range",
                now, self.options.due_lead_secs
            ))
        })?;

        let rename = match &self.options.rename {
            Some(target) => Some(
                rename::rename_course(self.resources, course, target)
                    .map_err(|e| e.at(Step::RenameCourse))?,
            ),
            None => None,
        };

        let mut progress = Progress::default();
        let sections = self.create_sections(course, section_count, &mut progress)?;

        self.resources
            .rebuild_course_cache(course)
            .map_err(|e| progress.fail(Step::RebuildCache, e))?;

        // Non-empty is checked at construction.
        let item_section = &sections[sections.len() - 1];

        let mut items = Vec::with_capacity(self.template.items().len());
        let mut verdicts_written = 0;
        for spec in self.template.items() {
            let params = ItemParams {
                course,
                section: item_section.id,
                display_name: spec.display_name.clone(),
                intro: self.template.intro().to_string(),
                due_at,
                policy: self.template.policy().clone(),
            };
            let item = self
                .resources
                .create_item(&params)
                .map_err(|e| progress.fail(Step::CreateItems, e))?;
            progress.items_created += 1;
            debug!(course, item = item.id, key = %spec.key, "item created");

            verdicts_written += lockdown::lock_item(self.capabilities, item.id)
                .map_err(|e| progress.fail(Step::Lockdown, e))?;
            items.push(item);
        }

        info!(
            course,
            sections = sections.len(),
            items = items.len(),
            verdicts = verdicts_written,
            "course provisioned"
        );

        Ok(ProvisionOutcome::Provisioned(ProvisionReport {
            course,
            template_fingerprint: self.template.fingerprint(),
            rename,
            item_section: item_section.position,
            sections,
            items,
            verdicts_written,
        }))
    }

    fn create_sections(
        &self,
        course: CourseId,
        section_count: usize,
        progress: &mut Progress,
    ) -> Result<Vec<Section>, CourseError> {
        let base = u32::try_from(section_count).map_err(|_| {
            CourseError::ValidationError(format!(
                "course {} has too many sections ({})",
                course, section_count
            ))
            .at(Step::CreateSections)
        })?;

        let mut created = Vec::with_capacity(self.template.sections().len());
        for (offset, spec) in (1u32..).zip(self.template.sections()) {
            let new_section = NewSection {
                course,
                position: base + offset,
                name: spec.name.clone(),
                summary: spec.summary.clone(),
                visible: spec.visible,
                availability: spec.availability.clone(),
            };
            let id = self
                .resources
                .insert_section(&new_section)
                .map_err(|e| progress.fail(Step::CreateSections, e))?;
            progress.sections_created += 1;
            debug!(course, section = id, position = new_section.position, "section created");

            created.push(Section {
                id,
                course,
                position: new_section.position,
                name: new_section.name,
                summary: new_section.summary,
                visible: new_section.visible,
                availability: new_section.availability,
            });
        }
        Ok(created)
    }
}
