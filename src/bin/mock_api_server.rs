use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Error};
use api_contract_diff::mock_server::MockServer;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Serve a canned API response at GET /v2/breeds for contract tests
#[derive(Parser)]
#[command(about, version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
    /// File whose contents are served
    #[arg(long, default_value = "_fixtures/new_request_mock.txt")]
    fixture: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let server = MockServer::bind(args.addr, &args.fixture)
        .await
        .with_context(|| format!("failed to bind {}, is another server running?", args.addr))?;

    server
        .serve_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "failed to listen for ctrl-c");
            }
        })
        .await?;

    Ok(())
}
