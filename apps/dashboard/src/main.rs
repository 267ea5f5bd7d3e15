use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{socket_url, DashboardView, ManagerConfig, WsConnector};
use store::Store;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Terminal view of the trading backend status")]
struct Args {
    /// Page location the socket endpoint is derived from, e.g. http://host:8080/
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Mark the session fatal after this many consecutive malformed frames.
    #[arg(long)]
    malformed_frame_limit: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref(), |key| std::env::var(key).ok())?;
    if let Some(location) = args.location {
        settings.location = location;
    }
    if args.malformed_frame_limit.is_some() {
        settings.malformed_frame_limit = args.malformed_frame_limit;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .with_writer(std::io::stderr)
        .init();

    let location = Url::parse(&settings.location)
        .with_context(|| format!("invalid location {}", settings.location))?;
    let mut manager_config = ManagerConfig::new(socket_url(&location)?);
    manager_config.malformed_frame_limit = settings.malformed_frame_limit;

    let store = Arc::new(Store::new());
    let mut view = DashboardView::mount(&store, manager_config, Arc::new(WsConnector));
    println!("{}", view.title());

    let mut shown = view.render();
    println!("{shown}");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        let changed = tokio::select! {
            res = &mut ctrl_c => {
                if let Err(err) = res {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                false
            }
            changed = view.changed() => changed,
        };
        if !changed {
            break;
        }

        let next = view.render();
        if next != shown {
            println!("{next}");
            shown = next;
        }
    }

    info!("shutting down");
    view.unmount().await;
    Ok(())
}
