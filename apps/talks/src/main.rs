use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::GraphqlTalkClient;
use controller::orchestration::TalkController;
use shared::domain::ClientId;
use tokio::io::BufReader;
use tracing::info;

mod config;
mod controller;
mod view;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "List and create talks against a GraphQL backend")]
struct Args {
    /// GraphQL HTTP endpoint.
    #[arg(long)]
    endpoint: Option<String>,
    /// Subscription websocket endpoint; derived from --endpoint when omitted.
    #[arg(long)]
    ws_endpoint: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long, default_value = "talks.toml")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config);
    if let Some(endpoint) = args.endpoint {
        settings.endpoint = endpoint;
    }
    if let Some(ws_endpoint) = args.ws_endpoint {
        settings.ws_endpoint = Some(ws_endpoint);
    }
    if let Some(api_key) = args.api_key {
        settings.api_key = Some(api_key);
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let client = GraphqlTalkClient::new(settings.client_config())
        .with_context(|| format!("invalid endpoint configuration: {}", settings.endpoint))?;
    let client_id = ClientId::generate();
    info!(
        %client_id,
        endpoint = %client.endpoint(),
        ws_endpoint = %client.ws_endpoint(),
        "starting talks client"
    );

    let controller = TalkController::mount(Arc::new(client), client_id);
    let result = view::run_terminal(
        &controller,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;
    controller.shutdown().await;
    result
}
