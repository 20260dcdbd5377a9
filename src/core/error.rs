use rusqlite;
use std::fmt;
use std::io;
use thiserror::Error;

/// Named stage of a provisioning or reset run, reported with every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    IdempotencyCheck,
    RenameCourse,
    CreateSections,
    RebuildCache,
    CreateItems,
    Lockdown,
    ResetScan,
    ResetItems,
    ResetSections,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::IdempotencyCheck => "idempotency check",
            Step::RenameCourse => "course rename",
            Step::CreateSections => "section creation",
            Step::RebuildCache => "course cache rebuild",
            Step::CreateItems => "item creation",
            Step::Lockdown => "capability lockdown",
            Step::ResetScan => "reset scan",
            Step::ResetItems => "reset item removal",
            Step::ResetSections => "reset section removal",
        };
        f.write_str(name)
    }
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    GatewayUnavailable,
    TemplateIntegrity,
    NotFound,
    PartialProvisionFailure,
    Invalid,
}

#[derive(Error, Debug)]
pub enum CourseError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Template integrity error: {0}")]
    TemplateIntegrity(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("{step} failed: {source}")]
    StepFailed {
        step: Step,
        #[source]
        source: Box<CourseError>,
    },
    #[error(
        "{step} failed after creating {sections_created} section(s) and {items_created} item(s); run reset before provisioning again: {source}"
    )]
    PartialProvision {
        step: Step,
        sections_created: usize,
        items_created: usize,
        #[source]
        source: Box<CourseError>,
    },
}

impl CourseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CourseError::RusqliteError(rusqlite::Error::QueryReturnedNoRows) => ErrorKind::NotFound,
            CourseError::RusqliteError(_)
            | CourseError::IoError(_)
            | CourseError::GatewayUnavailable(_) => ErrorKind::GatewayUnavailable,
            CourseError::TemplateIntegrity(_) => ErrorKind::TemplateIntegrity,
            CourseError::NotFound(_) => ErrorKind::NotFound,
            CourseError::ValidationError(_) | CourseError::ConfigError(_) => ErrorKind::Invalid,
            CourseError::StepFailed { source, .. } => source.kind(),
            CourseError::PartialProvision { .. } => ErrorKind::PartialProvisionFailure,
        }
    }

    /// The run step that failed, if this error came out of an engine.
    pub fn step(&self) -> Option<Step> {
        match self {
            CourseError::StepFailed { step, .. } | CourseError::PartialProvision { step, .. } => {
                Some(*step)
            }
            _ => None,
        }
    }

    pub(crate) fn at(self, step: Step) -> CourseError {
        CourseError::StepFailed {
            step,
            source: Box::new(self),
        }
    }
}
