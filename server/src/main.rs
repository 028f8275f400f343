//! Complaint Desk HTTP server.

use complaint_desk_server::{config::Config, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let config = Config::from_env();
    tracing::info!(
        http = %config.http_addr(),
        metrics_port = config.server.metrics_port,
        max_conflict_retries = config.lifecycle.max_conflict_retries,
        "Starting Complaint Desk"
    );

    run(config).await
}
