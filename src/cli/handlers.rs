use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::cli::commands::*;
use crate::cli::output::format_graph;
use crate::graph::{LayoutSpacing, VisualGraph, ViewState, project};
use crate::io::config_io::{self, ConfigError};
use crate::io::logging::{LogTarget, LoggingError, init_tracing};
use crate::model::{CascadeConfig, ProjectId};
use crate::service::{HttpService, MemoryService, ServiceError, TaskService};
use crate::session::Session;

/// Anything a subcommand can fail with; printed as `error: <msg>`
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
    #[error("could not encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not encode config: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("a project id is required (or pass --offline)")]
    MissingProject,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Load config, start logging, run the subcommand. `config` subcommands skip
/// both so they work while the file is missing or broken.
pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let explicit = cli.config.as_deref();
    let command = match cli.command {
        Commands::Config(cmd) => return cmd_config(explicit, cmd.action),
        other => other,
    };

    let config = config_io::load(explicit)?;
    let target = match command {
        // The terminal belongs to the editor
        Commands::View(_) => LogTarget::FileOnly,
        _ => LogTarget::Console,
    };
    if let Some(path) = init_tracing(&config.logging, target)? {
        debug!(path = %path.display(), "logging to file");
    }

    match command {
        Commands::View(args) => cmd_view(args, &config).await,
        Commands::Graph(args) => cmd_graph(args, &config).await,
        Commands::Config(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The service and project a command works against. Offline mode seeds a
/// demo project starting today.
async fn connect(
    project: Option<ProjectId>,
    offline: bool,
    config: &CascadeConfig,
) -> Result<(Arc<dyn TaskService>, ProjectId), CliError> {
    if offline {
        if project.is_some() {
            warn!("--offline ignores the project id");
        }
        let (service, project) = MemoryService::seeded(Local::now().date_naive()).await;
        return Ok((Arc::new(service), project));
    }
    let project = project.ok_or(CliError::MissingProject)?;
    let service = HttpService::new(&config.service)?;
    info!(base_url = %config.service.base_url, %project, "connecting");
    Ok((Arc::new(service), project))
}

// ---------------------------------------------------------------------------
// View and graph
// ---------------------------------------------------------------------------

async fn cmd_view(args: ViewArgs, config: &CascadeConfig) -> Result<(), CliError> {
    let (service, project) = connect(args.project, args.offline, config).await?;
    let session = Session::new(service, project, config);
    crate::tui::run(session, config).await?;
    Ok(())
}

/// Fetch one snapshot and project it the same way the editor does.
pub async fn build_graph(
    service: &dyn TaskService,
    project_id: ProjectId,
    search: Option<&str>,
    config: &CascadeConfig,
) -> Result<VisualGraph, ServiceError> {
    let snapshot = service.snapshot(project_id).await?;
    let view = ViewState {
        critical: snapshot.critical_task_ids.clone(),
        search: search.unwrap_or_default().to_string(),
        ..Default::default()
    };
    Ok(project(
        &snapshot.tasks,
        &snapshot.dependencies,
        &view,
        LayoutSpacing::from(&config.view),
    ))
}

async fn cmd_graph(args: GraphArgs, config: &CascadeConfig) -> Result<(), CliError> {
    let (service, project_id) = connect(args.project, args.offline, config).await?;
    let graph = build_graph(service.as_ref(), project_id, args.search.as_deref(), config).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else if graph.nodes.is_empty() {
        println!("(no tasks)");
    } else {
        let searching = args.search.as_deref().is_some_and(|s| !s.trim().is_empty());
        println!("{}", format_graph(&graph, searching));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

pub fn cmd_config(explicit: Option<&Path>, action: ConfigAction) -> Result<(), CliError> {
    let path = config_io::resolve_path(explicit).ok_or(ConfigError::NoConfigDir)?;
    match action {
        ConfigAction::Init { force } => {
            config_io::init(&path, force)?;
            println!("wrote {}", path.display());
        }
        ConfigAction::Show => {
            let config = config_io::load(explicit)?;
            if path.exists() {
                println!("# {}", path.display());
            } else {
                println!("# {} (not found, showing defaults)", path.display());
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            if !path.exists() {
                config_io::init(&path, false)?;
            }
            let (_, mut doc) = config_io::read_document(&path)?;
            config_io::set_value(&mut doc, &key, &value)?;
            config_io::write_document(&path, &doc)?;
            println!("{} = {}", key, value);
        }
    }
    Ok(())
}
