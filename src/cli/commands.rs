use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::ProjectId;

#[derive(Parser)]
#[command(name = "cascade", about = concat!("cascade v", env!("CARGO_PKG_VERSION"), " - edit a scheduled task graph"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive graph editor for a project
    View(ViewArgs),
    /// Print a project's graph with critical and search annotations
    Graph(GraphArgs),
    /// Inspect or edit the configuration file
    Config(ConfigCmd),
}

#[derive(Args)]
pub struct ViewArgs {
    /// Project id (UUID) on the scheduling service
    pub project: Option<ProjectId>,
    /// Use an in-memory demo project instead of the service
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Project id (UUID) on the scheduling service
    pub project: Option<ProjectId>,
    /// Mark tasks whose title or description contains this text
    #[arg(long)]
    pub search: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
    /// Use the in-memory demo project
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Set one value, keeping the rest of the file as written
    Set {
        /// Dotted key, e.g. history.cap
        key: String,
        value: String,
    },
}
