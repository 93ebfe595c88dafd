//! # engine_app
//!
//! Runs one side of world replication over NATS.
//!
//! - `authority` simulates a demo scene and publishes a delta frame every
//!   tick on `engine.replication`.
//! - `replica` subscribes, mirrors spawns and despawns, applies frames and
//!   interpolates kinematic bodies between them.

mod authority;
mod replica;
mod scene;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine_net::NatsConnection;
use engine_sim::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    Authority,
    Replica,
}

#[derive(Debug, Parser)]
#[command(name = "engine_app", about = "Replicate a world over NATS")]
struct Args {
    /// Which side of replication to run
    #[arg(short, long, value_enum, default_value = "authority")]
    role: Role,

    /// Path to a JSON engine config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of demo entities the authority spawns
    #[arg(short, long, default_value_t = 8)]
    entities: usize,

    /// NATS server URL (defaults to $NATS_URL, then localhost)
    #[arg(short, long)]
    nats_url: Option<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::from_json_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    info!(role = ?args.role, tick_rate = config.tick_rate, "engine starting");

    let conn = match &args.nats_url {
        Some(url) => NatsConnection::connect_to(url).await?,
        None => NatsConnection::connect().await?,
    };

    match args.role {
        Role::Authority => authority::run(&conn, config, args.entities).await?,
        Role::Replica => replica::run(&conn, config).await?,
    }

    info!("engine shut down");
    Ok(())
}
