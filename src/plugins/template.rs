//! Template catalog: the fixed structure provisioned onto a course.
//!
//! A [`Template`] is an immutable value. It is validated once, when it is
//! built, and then handed to the engines by reference. Nothing in here touches
//! a course.

use crate::core::error::CourseError;
use crate::core::gateway::ActivityPolicy;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSpec {
    pub name: String,
    pub summary: String,
    pub visible: bool,
    pub availability: Option<String>,
}

impl SectionSpec {
    pub fn visible(name: &str) -> Self {
        Self {
            name: name.to_string(),
            summary: String::new(),
            visible: true,
            availability: None,
        }
    }
}

/// One work item. `depends_on` is informational: creation always follows
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSpec {
    pub key: String,
    pub display_name: String,
    pub depends_on: Vec<String>,
}

impl ItemSpec {
    pub fn new(key: &str, display_name: &str, depends_on: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    sections: Vec<SectionSpec>,
    items: Vec<ItemSpec>,
    intro: String,
    policy: ActivityPolicy,
}

pub const THESIS_PREPARATION: &str = "Подготовка ВКР";
pub const THESIS_DEFENSE: &str = "Защита ВКР";
pub const THESIS_ITEM_INTRO: &str = "Загрузите окончательную версию ВКР и отзыв руководителя";

impl Template {
    pub fn new(
        sections: Vec<SectionSpec>,
        items: Vec<ItemSpec>,
        intro: &str,
        policy: ActivityPolicy,
    ) -> Result<Self, CourseError> {
        let template = Self {
            sections,
            items,
            intro: intro.to_string(),
            policy,
        };
        template.check_integrity()?;
        Ok(template)
    }

    /// The thesis preparation/defense structure deployed on existing courses.
    /// Section names double as the idempotency marker, so they must not change.
    pub fn thesis() -> Result<Self, CourseError> {
        Self::new(
            vec![
                SectionSpec::visible(THESIS_PREPARATION),
                SectionSpec::visible(THESIS_DEFENSE),
            ],
            vec![
                ItemSpec::new("review", "Отзыв руководителя", &[]),
                ItemSpec::new("normcontrol", "Нормоконтроль", &["review"]),
                ItemSpec::new("pass", "Допуск", &["review", "normcontrol"]),
            ],
            THESIS_ITEM_INTRO,
            ActivityPolicy::default(),
        )
    }

    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    pub fn items(&self) -> &[ItemSpec] {
        &self.items
    }

    pub fn intro(&self) -> &str {
        &self.intro
    }

    pub fn policy(&self) -> &ActivityPolicy {
        &self.policy
    }

    pub fn first_section(&self) -> &SectionSpec {
        // Non-empty is checked at construction.
        &self.sections[0]
    }

    pub fn is_template_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    pub fn item(&self, key: &str) -> Option<&ItemSpec> {
        self.items.iter().find(|i| i.key == key)
    }

    /// Stable digest of the template's shape, recorded alongside provisioning runs.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        for section in &self.sections {
            hasher.update(section.name.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([0xffu8]);
        for item in &self.items {
            hasher.update(item.key.as_bytes());
            hasher.update([0u8]);
            hasher.update(item.display_name.as_bytes());
            for dep in &item.depends_on {
                hasher.update([1u8]);
                hasher.update(dep.as_bytes());
            }
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    fn check_integrity(&self) -> Result<(), CourseError> {
        if self.sections.is_empty() {
            return Err(CourseError::TemplateIntegrity(
                "template declares no sections".to_string(),
            ));
        }

        let mut section_names = HashSet::new();
        for section in &self.sections {
            if section.name.trim().is_empty() {
                return Err(CourseError::TemplateIntegrity(
                    "section name must not be empty".to_string(),
                ));
            }
            if !section_names.insert(section.name.as_str()) {
                return Err(CourseError::TemplateIntegrity(format!(
                    "duplicate section name '{}'",
                    section.name
                )));
            }
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, item) in self.items.iter().enumerate() {
            if index.insert(item.key.as_str(), i).is_some() {
                return Err(CourseError::TemplateIntegrity(format!(
                    "duplicate item key '{}'",
                    item.key
                )));
            }
        }

        for item in &self.items {
            for dep in &item.depends_on {
                if !index.contains_key(dep.as_str()) {
                    return Err(CourseError::TemplateIntegrity(format!(
                        "item '{}' depends on unknown item '{}'",
                        item.key, dep
                    )));
                }
            }
        }

        self.check_acyclic(&index)
    }

    fn check_acyclic(&self, index: &HashMap<&str, usize>) -> Result<(), CourseError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.items.len()];
        for start in 0..self.items.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            // Iterative DFS: (node, next dependency to look at).
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::InProgress;
            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                let deps = &self.items[node].depends_on;
                if next < deps.len() {
                    frame.1 += 1;
                    let dep = index[deps[next].as_str()];
                    match marks[dep] {
                        Mark::InProgress => {
                            return Err(CourseError::TemplateIntegrity(format!(
                                "dependency cycle through item '{}'",
                                self.items[dep].key
                            )));
                        }
                        Mark::Unvisited => {
                            marks[dep] = Mark::InProgress;
                            stack.push((dep, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}
