//! Stdio tool server for one upstream service.
//!
//! Logs go to stderr; stdout carries MCP messages only.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use matchbox_gateway::config::ServiceKind;
use matchbox_gateway::lifecycle::startup::{check_connectivity, require_credentials};
use matchbox_gateway::lifecycle::StartupError;
use matchbox_gateway::observability::logging::{self, LogTarget};
use matchbox_gateway::services::ServiceRegistry;
use matchbox_gateway::tools::{registry_for, ToolServer};

#[derive(Parser)]
#[command(name = "matchbox-tools")]
#[command(about = "MCP tool server over stdio", long_about = None)]
struct Cli {
    /// Service to expose: wazuh, thehive or opencti
    #[arg(short, long)]
    service: String,

    /// Path to the gateway TOML config
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn probe_path(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Wazuh => "/",
        ServiceKind::TheHive => "/api/v1/status",
        ServiceKind::OpenCti => "/health",
        ServiceKind::Grafana => "/api/health",
        ServiceKind::Cortex => "/api/status",
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Tool server failed");
            eprintln!("FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = matchbox_gateway::config::load(cli.config.as_deref())?;
    if let Err(e) = logging::init(
        &config.observability.log_level,
        config.observability.log_format,
        LogTarget::Stderr,
    ) {
        eprintln!("logging already initialised: {e}");
    }
    tracing::info!(
        path = ?matchbox_gateway::config::resolve_path(cli.config.as_deref()),
        "Configuration loaded"
    );

    require_credentials(&config, &cli.service)?;

    let registry = ServiceRegistry::from_config(&config)?;
    let handle = registry
        .get(&cli.service)
        .ok_or_else(|| StartupError::UnknownService(cli.service.clone()))?;
    let kind = handle.client.kind();

    let tools = registry_for(kind, handle.client.clone(), config.governor.max_response_chars)
        .ok_or_else(|| StartupError::UnknownService(format!("{} has no tool adapter", cli.service)))?;

    check_connectivity(&handle.client, probe_path(kind)).await;

    let server = ToolServer::new(format!("{}-tools", kind.as_str()), tools);
    tracing::info!(server = %server.name(), "Tool server running on stdio");
    server.run_stdio().await?;
    Ok(())
}
