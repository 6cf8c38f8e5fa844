mod routes;

use anyhow::{Context, Result};
use buildinfra::payload::ProfilePayload;
use buildinfra::service::memory::InMemoryProfileService;
use clap::Parser;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// In-memory orchestrator serving the infra-config profile API.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Start with a sample `large` profile
    #[arg(long)]
    seed: bool,
}

fn sample_profile() -> Result<ProfilePayload> {
    let payload = serde_json::from_value(json!({
        "name": "large",
        "description": "More CPU and memory for heavy builds",
        "type": "NORMAL",
        "configurations": {
            "default": [
                {"key": "cpu_limit", "value": 4, "unit": "Core", "active": true},
                {"key": "memory_limit", "value": 8, "unit": "Gi", "active": true},
                {"key": "node_selector", "value": [{"key": "pool", "value": "large"}], "active": true}
            ]
        }
    }))?;
    Ok(payload)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Failed to parse socket address")?;

    let service = Arc::new(InMemoryProfileService::new());
    if args.seed {
        service.seed(sample_profile()?).await?;
    }

    info!("Stub orchestrator running at http://{}", addr);
    warp::serve(routes::routes(service)).run(addr).await;
    Ok(())
}
