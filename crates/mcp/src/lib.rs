mod session;
mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use pmcp::types::capabilities::ServerCapabilities;
use pmcp::Server;
use taskmark_core::config::AppConfig;
use taskmark_core::services::TasksService;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

pub use session::{ListSession, Listing};

/// Runtime configuration for the taskmark MCP server.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub data_dir: Option<PathBuf>,
    pub log_filter: Option<String>,
}

/// Launch the MCP server using the provided configuration.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    init_tracing(config.log_filter.clone())?;

    let app_config =
        AppConfig::discover(config.data_dir.clone()).context("failed to resolve data directory")?;
    let tasks_service =
        Arc::new(TasksService::new(&app_config).context("failed to initialize task service")?);

    let server = build_server(tasks_service).context("failed to build MCP server")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %app_config.data_dir().display(),
        page_size = app_config.page_size(),
        completion_tracking = %app_config.completion_tracking(),
        tools = %tools::TOOL_NAMES.join(", "),
        "starting taskmark-mcp"
    );

    server
        .run_stdio()
        .await
        .map_err(|err| anyhow::anyhow!("MCP server error: {}", err))
}

/// Run the MCP server by creating an internal Tokio runtime.
pub fn run_server_blocking(config: ServerConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run_server(config))
}

fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "info".to_string());
    let directive: Directive = filter.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}

fn build_server(service: Arc<TasksService>) -> Result<Server> {
    let builder = Server::builder()
        .name("taskmark-mcp")
        .version(env!("CARGO_PKG_VERSION"))
        .capabilities(ServerCapabilities::tools_only());

    let session = ListSession::spawn(service.clone());
    let builder = tools::register(builder, service, session);
    builder
        .build()
        .map_err(|err| anyhow::anyhow!(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_server_over_seeded_data_dir() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        std::fs::write(
            dir.path().join("tasks.json"),
            r#"[{"id": "seed-1", "title": "Seeded task", "priority": "HIGH", "created_at": "2026-04-01T09:00:00Z", "status": "pending"}]"#,
        )
        .expect("write seed");

        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        let service = Arc::new(TasksService::new(&config).expect("service"));
        let seeded = service.get("seed-1").expect("get").expect("seeded task");
        assert_eq!(seeded.task.title, "Seeded task");

        assert!(build_server(service).is_ok());
    }
}
