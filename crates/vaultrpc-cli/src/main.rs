// Copyright 2025 vaultrpc Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # vaultrpc CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Serve the demo handler
//! vaultrpc serve -b 0.0.0.0:3000 --geo-table geo.json
//!
//! # Make a call (outputs raw JSON)
//! vaultrpc call http://127.0.0.1:3000 echo -p '{"hello": "world"}'
//! ```
//!
//! ## URL Format
//!
//! URLs must include the `http://` or `https://` prefix.

use anyhow::Result;
use argh::FromArgs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use vaultrpc_cli::demo::DemoHandler;
use vaultrpc_client::{HttpSender, SenderConfig};
use vaultrpc_common::geo::{Locate, NoLocation, StaticLocator};
use vaultrpc_common::logging::TracingLogger;
use vaultrpc_common::protocol::{DeviceInfo, Request};
use vaultrpc_common::transport::{Receiver, Sender};
use vaultrpc_server::config::{DEFAULT_GEO_LOOKUP_TIMEOUT, DEFAULT_MAX_REQUEST_SIZE};
use vaultrpc_server::{HttpReceiver, ReceiverConfig};

/// Validates that a URL string starts with http:// or https://
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

#[derive(FromArgs)]
/// vaultrpc - JSON request/response transport over HTTP
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Call(CallArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// serve the demo handler over HTTP
struct ServeArgs {
    /// address to bind the receiver to
    #[argh(option, short = 'b', default = "\"0.0.0.0:3000\".into()")]
    bind: String,

    /// largest accepted request body in bytes
    #[argh(option, long = "max-request-size", default = "DEFAULT_MAX_REQUEST_SIZE")]
    max_request_size: usize,

    /// json file mapping IP addresses to {country, city}
    ///
    /// Without it no location is ever assigned.
    #[argh(option, long = "geo-table")]
    geo_table: Option<String>,

    /// deadline for a single geolocation lookup in milliseconds
    #[argh(
        option,
        long = "geo-timeout-ms",
        default = "DEFAULT_GEO_LOOKUP_TIMEOUT.as_millis() as u64"
    )]
    geo_timeout_ms: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// send one request and print the raw response JSON
struct CallArgs {
    /// receiver URL (e.g. http://127.0.0.1:3000)
    #[argh(positional)]
    url: String,

    /// method name
    #[argh(positional)]
    method: String,

    /// request params as JSON
    #[argh(option, short = 'p', long = "params", default = "\"{}\".into()")]
    params: String,

    /// client version reported as device.appVersion
    #[argh(option, long = "app-version")]
    app_version: Option<String>,

    /// request deadline in milliseconds
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // call: keep stdout clean for piping to jq
    if !matches!(cli.command, Commands::Call(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Call(args) => run_call(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let addr: SocketAddr = args
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", args.bind, e))?;

    let config = ReceiverConfig::new(addr)
        .with_max_request_size(args.max_request_size)
        .with_geo_lookup_timeout(Duration::from_millis(args.geo_timeout_ms));

    let locator: Arc<dyn Locate> = match &args.geo_table {
        Some(path) => {
            let table = StaticLocator::from_json_file(path)?;
            tracing::info!("Loaded {} geolocation entries from {}", table.len(), path);
            Arc::new(table)
        }
        None => Arc::new(NoLocation),
    };

    let receiver = HttpReceiver::bind(config)
        .await?
        .with_locator(locator)
        .with_logger(Arc::new(TracingLogger::new()));

    tracing::info!("Maximum request size: {} bytes", args.max_request_size);
    receiver.listen(Arc::new(DemoHandler)).await?;

    Ok(())
}

/// Sends one request and prints the response envelope as JSON.
///
/// Application errors are part of the envelope and still exit 0. Transport
/// failures go to stderr with a non-zero exit code.
async fn run_call(args: CallArgs) -> Result<()> {
    validate_http_url(&args.url, "receiver URL")?;

    let params: serde_json::Value = serde_json::from_str(&args.params)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in params: {}", e))?;

    let mut request = Request::new(args.method, params);
    if let Some(app_version) = args.app_version {
        request = request.with_device(DeviceInfo {
            app_version: Some(app_version),
            ..Default::default()
        });
    }

    let config = SenderConfig::new().with_timeout(Duration::from_millis(args.timeout_ms));
    let sender = HttpSender::with_config(args.url, config)?;
    let response = sender.send(request).await?;

    println!("{}", serde_json::to_string(&response)?);

    Ok(())
}
