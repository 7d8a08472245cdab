mod console;

use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vitalis_core::VitalisConfig;
use vitalis_engine::{JsonSnapshotStore, Organism, SnapshotStore};

use console::{parse_line, ConsoleCommand, HELP};

#[derive(Parser, Debug)]
#[command(name = "vitalis", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "vitalis.toml", env = "VITALIS_CONFIG")]
    config: PathBuf,

    /// Snapshot directory (overrides the config file)
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Tick interval in milliseconds (overrides the config file)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Start from a fresh condition even if snapshots exist
    #[arg(long)]
    fresh: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "VITALIS_JSON_LOGS")]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = VitalisConfig::load_or_default(&args.config);
    if let Some(dir) = args.snapshot_dir {
        config.engine.snapshot_dir = dir;
    }
    if let Some(ms) = args.tick_ms {
        config.engine.tick_interval_ms = ms;
    }

    info!("Initializing Vitalis...");
    let store = Arc::new(
        JsonSnapshotStore::new(config.engine.snapshot_dir.clone())
            .with_retention(config.engine.snapshot_retain),
    );

    let mut builder = Organism::builder(config).store(store.clone());
    if args.fresh {
        info!("Starting from a fresh condition");
    } else {
        match store.load_latest().await {
            Ok(Some(condition)) => builder = builder.condition(condition),
            Ok(None) => info!("No snapshot found, starting from a fresh condition"),
            Err(e) => warn!("Snapshot recovery failed, starting fresh: {:#}", e),
        }
    }
    let organism = builder.spawn();

    println!("Vitalis online. Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
            line = lines.next_line() => line?,
        };
        // stdin closed
        let Some(line) = line else { break };

        match parse_line(&line) {
            Ok(ConsoleCommand::Empty) => {}
            Ok(ConsoleCommand::Help) => println!("{HELP}"),
            Ok(ConsoleCommand::Quit) => break,
            Ok(ConsoleCommand::Status) => {
                let snapshot = organism.snapshot_condition();
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Ok(ConsoleCommand::Stimulus { category, intensity }) => {
                if let Err(e) =
                    organism.submit_stimulus(&category, intensity, None, HashMap::new())
                {
                    println!("rejected: {e}");
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    info!("Stopping...");
    match organism.stop().await {
        Ok(condition) => {
            info!(
                "Stopped at tick {} (vitality {:.1}, integrity {:.2}, stability {:.2})",
                condition.tick_count, condition.vitality, condition.integrity, condition.stability
            );
            if let Err(e) = store.save(&condition).await {
                error!("Final snapshot failed: {:#}", e);
            }
        }
        Err(e) => error!("Scheduler did not shut down cleanly: {:#}", e),
    }

    Ok(())
}
