// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SnapSphere API server
//!
//! Standalone HTTP server for the photo enrichment and recommendation API.

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use snapsphere::config::AppConfig;
use snapsphere::service::PhotoService;
use snapsphere::Result;

#[derive(Parser, Debug)]
#[command(name = "snapsphere-web")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "0.4.0")]
#[command(about = "SnapSphere API Server")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Photo database path
    #[arg(long)]
    database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("SnapSphere API v0.4.0");

    // Load config
    let mut config = AppConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.web.host = host;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }

    let service = PhotoService::from_config(&config)?;
    if config.imagery.access_token.trim().is_empty() {
        warn!("No imagery access token configured; /fetch_mapillary_photos will fail");
    }

    snapsphere::web::start_server(config, service).await
}
