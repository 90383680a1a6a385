//! memsrv entry point: load and validate configuration, build the memory
//! store and authority, then serve every configured ingress gate.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use authority::Authority;
use memsrv::config::{build_authority_policies, build_memory_store, Config};
use memsrv::ingress;

#[derive(Parser, Debug)]
#[command(author, version, about = "memsrv - Modbus memory appliance")]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "MEMSRV_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate the configuration and exit
    Check,
}

const DEFAULT_CONFIG_PATH: &str = "config/memsrv.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = Config::from_file(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;
    config.validate().context("config validation failed")?;

    memsrv::logging::init(&config.log.level)
        .map_err(|e| anyhow::anyhow!("logging init failed: {e}"))?;

    info!("config loaded and validated: {}", config_path.display());

    if let Some(Commands::Check) = args.command {
        println!("config ok: {}", config_path.display());
        return Ok(());
    }

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(build_memory_store(&config).context("memory build failed")?);
    info!("memory store built: {} memories", store.len());

    let auth = Arc::new(Authority::new());
    let policies = build_authority_policies(&config).context("policy build failed")?;
    info!("authority policies loaded: {}", policies.len());
    auth.replace_policies(policies);

    for gate in config.listeners.clone() {
        let store = Arc::clone(&store);
        let auth = Arc::clone(&auth);
        let id = gate.id.clone();

        tokio::spawn(async move {
            if let Err(e) = ingress::serve_gate(gate, store, auth).await {
                tracing::error!("ingress {id} failed: {e}");
                std::process::exit(1);
            }
        });
    }

    info!("memsrv ingress started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    Ok(())
}
