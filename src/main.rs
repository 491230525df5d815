mod charts;
mod config;
mod dashboard;
mod fetch;
mod metrics;
mod models;
mod normalize;
mod table;

use axum::{
    response::Redirect,
    routing::{get, get_service},
    Router,
};
use clap::Parser;
use env_logger::Env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::config::load_config;
use crate::config::AppConfig;
use crate::dashboard::{get_dashboard, get_sources, run_pass, AppState};
use crate::fetch::build_client;
use crate::models::MinerType;

/// CLI arguments
#[derive(Parser)]
#[command(name = "WESO Leaderboard", about = "WESO mining leaderboard dashboard")]
struct Cli {
    /// IP address to bind the server to
    #[arg(long)]
    listen_ip: Option<String>,

    /// Port to bind the server to
    #[arg(long)]
    port: Option<u16>,

    /// Path to a TOML config file (defaults to ./config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip TLS certificate verification for the leaderboard endpoints
    #[arg(long)]
    accept_invalid_certs: bool,

    /// Render a single pass as JSON on stdout instead of serving
    #[arg(long, value_enum)]
    once: Option<MinerType>,
}

impl Cli {
    /// CLI arguments win over the config file.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(ip) = &self.listen_ip {
            config.server.listen_ip = Some(ip.clone());
        }
        if let Some(port) = self.port {
            config.server.port = Some(port);
        }
        if self.accept_invalid_certs {
            config.fetch.accept_invalid_certs = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Cli::parse();
    let mut config: AppConfig = load_config(args.config.as_deref())?;

    args.apply_overrides(&mut config);

    let client = build_client(&config.fetch)?;
    let state = Arc::new(AppState { config, client });

    if let Some(miner_type) = args.once {
        return match run_pass(&state, miner_type).await {
            Ok(report) => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                Ok(())
            }
            Err(e) => {
                log::error!("{}", e);
                Err(e.into())
            }
        };
    }

    std::fs::create_dir_all("static")?;
    std::fs::write("static/index.html", include_str!("static/index.html"))?;

    let ip = state
        .config
        .server
        .listen_ip
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = state.config.server.port.unwrap_or(3000);

    let app = Router::new()
        .route("/", get(|| async { Redirect::to("/static/index.html") }))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/sources", get(get_sources))
        .nest_service("/static", get_service(ServeDir::new("static")))
        .with_state(state);

    let addr_str = format!("{}:{}", ip, port);
    let addr: SocketAddr = addr_str.parse()?;
    log::info!("Server running on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
