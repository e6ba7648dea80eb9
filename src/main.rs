use std::sync::Arc;

use anyhow::Result;
use clap::Parser as _;
use event_loop::event_loop;
use rpc::HttpTransport;

mod application;
mod args;
mod command;
mod config;
mod context;
mod controls;
mod event;
mod event_loop;
mod format;
mod output;
mod player;
mod playlist;
mod rpc;
mod scheduler;
mod session;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = args::Args::parse();
    args.init_tracing_subscriber()?;
    let config = args.build_config()?;

    tracing::info!(host = %config.server.host, port = config.server.port, "Connecting to media center");
    let transport = HttpTransport::new(&config.server)?;
    event_loop(Arc::new(transport), config).await
}
