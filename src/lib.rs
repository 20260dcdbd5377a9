//! coursewright: one-shot course structure provisioning.
//!
//! Takes a course on a host learning platform and gives it a fixed structure:
//! the thesis preparation and defense sections, three dependent assignments
//! (supervisor review, formatting check, admission) and a capability lockdown
//! so nobody can restructure them afterwards.
//!
//! # Architecture
//!
//! - [`core`]: errors, the gateway traits the engines talk through, SQLite
//!   plumbing for the reference host, config and time helpers.
//! - [`plugins`]: the template catalog, the provisioning and reset engines,
//!   and two gateway implementations (`SqliteHost`, `MemoryHost`).
//!
//! # Example
//!
//! ```no_run
//! use coursewright::core::store::Store;
//! use coursewright::plugins::host::SqliteHost;
//! use coursewright::plugins::provision::{ProvisionEngine, ProvisionOptions};
//! use coursewright::plugins::template::Template;
//!
//! # fn main() -> Result<(), coursewright::core::error::CourseError> {
//! let store = Store::new("/var/lib/coursewright");
//! let host = SqliteHost::open(&store, "operator")?;
//! let template = Template::thesis()?;
//! let engine = ProvisionEngine::new(&template, &host, &host, ProvisionOptions::default());
//! engine.provision(42)?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod plugins;

mod cli;

use cli::{Cli, Command, CourseCommand, OutputFormat, RolesCommand, TemplateCommand};
use crate::core::{
    config, error,
    gateway::{CapabilityGateway, ResourceGateway},
    store::Store,
    time,
};
use crate::plugins::{
    host::SqliteHost,
    provision::{ProvisionEngine, ProvisionOptions, ProvisionOutcome, Readiness},
    rename::RenameOutcome,
    reset::ResetEngine,
    template::Template,
};

use clap::Parser;
use colored::Colorize;
use serde_json::json;

fn emit(format: OutputFormat, cmd: &str, extra: serde_json::Value, text: &[String]) {
    match format {
        OutputFormat::Json => {
            let envelope = time::command_envelope(cmd, "ok", extra);
            println!(
                "{}",
                serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string())
            );
        }
        OutputFormat::Text => {
            for line in text {
                println!("{}", line);
            }
        }
    }
}

/// Open the host of an initialized store; `init` is the only command that creates one.
fn open_host(store: &Store, actor: &str) -> Result<SqliteHost, error::CourseError> {
    if !store.is_initialized() {
        return Err(error::CourseError::NotFound(format!(
            "no host database at {}; run `coursewright init` first",
            store.host_db_path().display()
        )));
    }
    SqliteHost::open(store, actor)
}

pub fn run() -> Result<(), error::CourseError> {
    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let store = Store::new(root);
    let config = config::load_config(&store.root)?;
    let actor = config.audit.actor.clone();
    let format = cli.format;

    match cli.command {
        Command::Init => {
            let host_db = crate::core::db::initialize_host_db(&store.root, &actor)?;
            let wrote_config = config::write_default_config(&store.root)?;
            emit(
                format,
                "init",
                json!({
                    "host_db": host_db.display().to_string(),
                    "audit_log": store.audit_log_path().display().to_string(),
                    "config_written": wrote_config,
                }),
                &[
                    format!("{} host database at {}", "✓".green(), host_db.display()),
                    format!("  gateway audit log at {}", store.audit_log_path().display()),
                    if wrote_config {
                        format!("{} wrote {}", "✓".green(), store.config_path().display())
                    } else {
                        format!("  kept existing {}", store.config_path().display())
                    },
                ],
            );
        }
        Command::Course(course_cli) => {
            let host = open_host(&store, &actor)?;
            match course_cli.command {
                CourseCommand::Add {
                    fullname,
                    shortname,
                } => {
                    let id = host.add_course(&fullname, &shortname)?;
                    emit(
                        format,
                        "course.add",
                        json!({ "course": id }),
                        &[format!("Course added (ID: {})", id)],
                    );
                }
                CourseCommand::List => {
                    let courses = host.list_courses()?;
                    let lines = courses
                        .iter()
                        .map(|c| format!("{:>5}  {:<30}  {}", c.id, c.shortname, c.fullname))
                        .collect::<Vec<_>>();
                    emit(format, "course.list", json!({ "courses": courses }), &lines);
                }
            }
        }
        Command::Roles(roles_cli) => {
            let host = open_host(&store, &actor)?;
            match roles_cli.command {
                RolesCommand::Seed => {
                    let added = host.seed_standard_roles()?;
                    emit(
                        format,
                        "roles.seed",
                        json!({ "added": added }),
                        &[format!("{} role(s) added", added)],
                    );
                }
                RolesCommand::List => {
                    let roles = host.list_roles()?;
                    let lines = roles
                        .iter()
                        .map(|r| format!("{:>5}  {:<16}  {}", r.id, r.shortname, r.name))
                        .collect::<Vec<_>>();
                    emit(format, "roles.list", json!({ "roles": roles }), &lines);
                }
            }
        }
        Command::Status { course } => {
            let host = open_host(&store, &actor)?;
            let template = Template::thesis()?;
            let engine =
                ProvisionEngine::new(&template, &host, &host, ProvisionOptions::from_config(&config)?);
            let readiness = engine.needs_provisioning(course)?;
            let sections = host.list_sections(course)?;

            let mut lines = vec![match readiness {
                Readiness::Provisioned => format!("Course {}: {}", course, "provisioned".green()),
                Readiness::Untouched { section_count } => format!(
                    "Course {}: {} ({} existing section(s))",
                    course,
                    "needs provisioning".yellow(),
                    section_count
                ),
            }];
            for s in &sections {
                let marker = if template.is_template_section(&s.name) { "*" } else { " " };
                lines.push(format!("  {} {:>3}  {}", marker, s.position, s.name));
            }
            emit(
                format,
                "status",
                json!({ "course": course, "readiness": readiness, "sections": sections }),
                &lines,
            );
        }
        Command::Provision { course, no_rename } => {
            let host = open_host(&store, &actor)?;
            let template = Template::thesis()?;
            let mut options = ProvisionOptions::from_config(&config)?;
            if no_rename {
                options.rename = None;
            }
            let engine = ProvisionEngine::new(&template, &host, &host, options);
            let outcome = engine.provision(course)?;

            let lines = match &outcome {
                ProvisionOutcome::AlreadyProvisioned => vec![format!(
                    "{} course {} is already provisioned; nothing to do",
                    "i".cyan(),
                    course
                )],
                ProvisionOutcome::Provisioned(report) => {
                    let mut lines = Vec::new();
                    if let Some(RenameOutcome::Renamed { shortname, .. }) = &report.rename {
                        lines.push(format!("Course renamed to '{}'", shortname));
                    }
                    lines.push(format!(
                        "{} {} section(s), {} item(s) in section {}, {} verdict(s) written",
                        "✓".green(),
                        report.sections_created(),
                        report.items_created(),
                        report.item_section,
                        report.verdicts_written
                    ));
                    lines
                }
            };
            emit(format, "provision", json!({ "course": course, "result": outcome }), &lines);
        }
        Command::Reset { course } => {
            let host = open_host(&store, &actor)?;
            let template = Template::thesis()?;
            let outcome = ResetEngine::new(&template, &host).reset(course)?;
            emit(
                format,
                "reset",
                json!({ "course": course, "result": outcome }),
                &[format!(
                    "Removed {} section(s) and {} item(s) from course {}",
                    outcome.sections_removed, outcome.items_removed, course
                )],
            );
        }
        Command::Template(template_cli) => match template_cli.command {
            TemplateCommand::Show => {
                let template = Template::thesis()?;
                let mut lines = vec!["Sections:".bold().to_string()];
                for (i, s) in template.sections().iter().enumerate() {
                    lines.push(format!("  {}. {}", i + 1, s.name));
                }
                lines.push("Items:".bold().to_string());
                for item in template.items() {
                    let deps = if item.depends_on.is_empty() {
                        String::new()
                    } else {
                        format!(" (after {})", item.depends_on.join(", "))
                    };
                    lines.push(format!("  {:<12} {}{}", item.key, item.display_name, deps));
                }
                lines.push(format!("Fingerprint: {}", template.fingerprint()));
                emit(
                    format,
                    "template.show",
                    json!({ "template": template, "fingerprint": template.fingerprint() }),
                    &lines,
                );
            }
        },
    }
    Ok(())
}
