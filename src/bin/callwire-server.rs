//! Dispatch server exposing the demo `SayHello` function.
//!
//! ```text
//! callwire-server --port 9090
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change the level.

use anyhow::Context;
use callwire::{CallRequest, CallResponse, Endpoint, Server};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "callwire-server", about = "Serve registered functions over TCP")]
struct Args {
    /// Port to listen on (all interfaces). Must be non-zero.
    #[arg(short, long, default_value_t = 0)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let endpoint = Endpoint::any(args.port).context("refusing to start")?;

    let server = Server::builder()
        .register("SayHello", |_req: &CallRequest| Ok(CallResponse::ok("I'm Rust")))
        .bind(endpoint)
        .await
        .context("refusing to start")?;

    let handle = server.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Interrupt received, shutting down"),
            Err(e) => tracing::error!("Cannot listen for interrupt: {}", e),
        }
        handle.shutdown();
    });

    server.serve().await?;
    Ok(())
}
