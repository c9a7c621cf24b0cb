//! Shield relay daemon.
//!
//! ```text
//!   cluster (wss, finalized)                           minting side
//!   ────────────────────────┐                        ┌─────────────▶
//!                           ▼                        │
//!                    ┌─────────────┐   ┌──────────┐  │
//!                    │ WsLogSource │──▶│ Subscr.  │──┘ ShieldSink
//!                    └─────────────┘   │  Loop    │
//!                                      └────┬─────┘
//!                  validator → codec → dedup┘
//!
//!   config · observability · lifecycle (SIGINT/SIGTERM → Shutdown)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use shield_relay::config::load_config;
use shield_relay::lifecycle::{signals, Shutdown};
use shield_relay::observability::{logging, metrics};
use shield_relay::relay::{
    DedupStore, DedupTracker, FileDedupStore, LogSink, LoopConfig, MemoryDedupStore,
    SubscriptionLoop, WsLogSource,
};

#[derive(Parser)]
#[command(name = "shield-relay")]
#[command(about = "Relays finalized shield events from the bridge program", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability.log_level, config.observability.json_logs);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "shield-relay starting");

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let store: Arc<dyn DedupStore> = match &config.dedup.persistence_path {
        Some(path) => Arc::new(FileDedupStore::open(path)?),
        None => {
            tracing::warn!("No dedup persistence_path; duplicates are only suppressed until restart");
            Arc::new(MemoryDedupStore::new())
        }
    };

    let loop_config = LoopConfig::from_config(&config)?;
    tracing::info!(
        ws_url = %config.chain.ws_url,
        program = %loop_config.program_id,
        trusted_proxy = %loop_config.trusted_proxy,
        "Configuration loaded"
    );

    let idle_timeout_secs = config.subscription.idle_timeout_secs;
    let source = WsLogSource::new(
        config.chain.ws_url.clone(),
        Duration::from_secs(config.chain.rpc_timeout_secs),
    )
    .with_idle_timeout((idle_timeout_secs > 0).then(|| Duration::from_secs(idle_timeout_secs)));
    let relay = SubscriptionLoop::new(
        source,
        loop_config,
        DedupTracker::new(store),
        Arc::new(LogSink),
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let stats = relay.run(shutdown.subscribe()).await?;
    tracing::info!(
        delivered = stats.delivered,
        rejected = stats.rejected,
        duplicates = stats.duplicates,
        "Shutdown complete"
    );
    Ok(())
}
