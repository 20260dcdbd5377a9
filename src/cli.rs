//! CLI struct definitions for the coursewright command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use crate::core::gateway::CourseId;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "coursewright",
    version = env!("CARGO_PKG_VERSION"),
    about = "Provision the thesis preparation/defense structure onto a course, once, and lock it down."
)]
pub(crate) struct Cli {
    /// Store directory holding host.db and coursewright.toml (defaults to the current directory).
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
    /// Output format.
    #[clap(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the host database and a default coursewright.toml
    Init,
    /// Manage courses in the host database
    Course(CourseCli),
    /// Manage roles in the host database
    Roles(RolesCli),
    /// Show whether a course still needs provisioning
    Status {
        #[clap(long)]
        course: CourseId,
    },
    /// Create the template sections and items on a course
    Provision {
        #[clap(long)]
        course: CourseId,
        /// Leave the course name alone even if the config asks for a rename.
        #[clap(long)]
        no_rename: bool,
    },
    /// Remove template sections and their items from a course
    Reset {
        #[clap(long)]
        course: CourseId,
    },
    /// Inspect the compiled-in template
    Template(TemplateCli),
}

#[derive(clap::Args, Debug)]
pub(crate) struct CourseCli {
    #[clap(subcommand)]
    pub command: CourseCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CourseCommand {
    /// Add a course
    Add {
        #[clap(long)]
        fullname: String,
        #[clap(long)]
        shortname: String,
    },
    /// List courses
    List,
}

#[derive(clap::Args, Debug)]
pub(crate) struct RolesCli {
    #[clap(subcommand)]
    pub command: RolesCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum RolesCommand {
    /// Insert the standard role set
    Seed,
    /// List roles
    List,
}

#[derive(clap::Args, Debug)]
pub(crate) struct TemplateCli {
    #[clap(subcommand)]
    pub command: TemplateCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum TemplateCommand {
    /// Print sections, items, dependencies and the template fingerprint
    Show,
}
