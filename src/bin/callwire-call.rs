//! Forward one call to a dispatch server and print the response.
//!
//! ```text
//! callwire-call --port 9090 SayHello
//! ```
//!
//! Exits with status 1 when the response has `success = false`.

use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use callwire::{client, CallRequest, ClientConfig, Endpoint};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "callwire-call", about = "Call a function on a callwire server")]
struct Args {
    /// Server port. Must be non-zero.
    #[arg(short, long)]
    port: u16,

    /// Server address.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// Give up after this many milliseconds. Waits forever when omitted.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Function to call.
    function: String,

    /// Argument passed to the function as UTF-8 bytes.
    #[arg(default_value = "")]
    argument: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let endpoint = Endpoint::new(args.host, args.port)?;

    let mut config = ClientConfig::default();
    if let Some(ms) = args.timeout_ms {
        config = config.timeout(Duration::from_millis(ms));
    }

    let request = CallRequest::new(args.function, args.argument);
    let response = client::call_with(&endpoint, request, config)
        .await
        .with_context(|| format!("call to {} failed", endpoint))?;

    println!("{}", response.result_str());
    Ok(if response.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
