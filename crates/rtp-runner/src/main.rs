//! Random relocation runner.
//!
//! This binary:
//! 1. Loads the config (`RTP_CONFIG`, or the bundled default)
//! 2. Activates every configured region on procedural terrain
//! 3. Sends `RTP_AGENTS` simulated agents through `RTP_ROUNDS` relocations each
//!
//! Ctrl-C stops early.

mod agents;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use rand::Rng as _;
use rtp_config::Config;
use rtp_queue::RegionRegistry;
use rtp_relocate::{
    LogSink, RelocationError, RelocationFlags, RelocationRequest, RelocationScheduler,
};
use rtp_search::LocationSearcher;
use rtp_world::{NoiseWorld, RegionId, TerrainConfig};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::agents::{Bank, Wanderer};

const DEFAULT_CONFIG: &str = include_str!("../config/default.json");

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

async fn drain(agents: &mut JoinSet<u64>) {
    while let Some(finished) = agents.join_next().await {
        match finished {
            Ok(id) => info!("Agent {} finished", id),
            Err(err) => error!("Agent task failed: {}", err),
        }
    }
}

fn load_config() -> eyre::Result<Config> {
    match std::env::var("RTP_CONFIG") {
        Ok(path) => {
            let path = PathBuf::from(path);
            info!("Config: {}", path.display());
            Config::load(&path).wrap_err_with(|| format!("loading {}", path.display()))
        }
        Err(_) => {
            info!("Config: bundled default");
            Config::from_json(DEFAULT_CONFIG).wrap_err("bundled default config")
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtp_runner=info".parse()?)
                .add_directive("rtp_queue=info".parse()?)
                .add_directive("rtp_relocate=info".parse()?),
        )
        .init();

    info!("Starting random relocation runner");

    let config = load_config()?;
    let agent_count: u64 = env_or("RTP_AGENTS", 4);
    let rounds: u32 = env_or("RTP_ROUNDS", 5);
    let seed: u64 = env_or("RTP_SEED", 0x5EED);

    let world = NoiseWorld::new(TerrainConfig {
        seed,
        ..TerrainConfig::default()
    })
    .with_latency(Duration::from_millis(5));
    let searcher = Arc::new(
        LocationSearcher::new(Arc::new(world), config.criteria())
            .with_options(config.search_options())
            .with_seed(seed),
    );

    let registry = Arc::new(
        RegionRegistry::new(searcher).with_population_logging(config.debug.show_queue_population),
    );
    let regions = config.regions()?;
    for (region, capacity) in &regions {
        registry.configure(region.clone(), *capacity);
    }

    // world load: every region starts filling at once
    let mut fills = Vec::new();
    for (region, _) in &regions {
        if let Some(activation) = registry.activate(&region.id) {
            if let Some(fill) = activation.initial_fill {
                fills.push((region.id.clone(), fill));
            }
        }
    }
    for (id, fill) in fills {
        let report = fill.wait().await;
        info!(
            "Region {} ready: {} queued, {} failed searches",
            id, report.pushed, report.failed
        );
    }

    let mut scheduler =
        RelocationScheduler::new(registry.clone(), LogSink).with_options(config.scheduler_options());
    let bank = Arc::new(Bank::new(config.economy.price * f64::from(rounds)));
    if config.economy.price > 0.0 {
        scheduler = scheduler.with_cost_provider(bank.clone());
    }
    let scheduler = Arc::new(scheduler);

    let region_ids: Vec<RegionId> = regions.into_iter().map(|(region, _)| region.id).collect();
    let mut agents = JoinSet::new();
    for id in 0..agent_count {
        // the first agent relocates with the "vip" kind when one is configured
        let kind = (id == 0 && config.kinds.contains_key("vip")).then_some("vip");
        let settings = config.settings(kind)?;
        let mut flags = RelocationFlags::empty();
        if settings.price > 0.0 {
            flags |= RelocationFlags::USES_COST;
        }

        let agent = Arc::new(Wanderer::new(id, 0.15));
        let scheduler = scheduler.clone();
        let region_ids = region_ids.clone();
        agents.spawn(async move {
            let mut done = 0;
            while done < rounds {
                let region = region_ids[rand::thread_rng().gen_range(0..region_ids.len())].clone();
                let request = RelocationRequest::new(agent.clone(), region)
                    .with_settings(settings)
                    .with_flags(flags);

                let fidget = {
                    let agent = agent.clone();
                    tokio::spawn(async move {
                        loop {
                            tokio::time::sleep(Duration::from_millis(400)).await;
                            agent.fidget();
                        }
                    })
                };
                let outcome = scheduler.request_relocation(request).await;
                fidget.abort();

                match outcome {
                    Ok(relocation) => {
                        done += 1;
                        info!(
                            "Agent {} relocated to {} ({:?}, round {}/{})",
                            id, relocation.position, relocation.source, done, rounds
                        );
                    }
                    Err(RelocationError::OnCooldown { remaining }) => {
                        tokio::time::sleep(remaining).await;
                    }
                    Err(RelocationError::InsufficientFunds { .. }) => {
                        warn!("Agent {} is out of money", id);
                        break;
                    }
                    Err(err) => {
                        warn!("Agent {} relocation failed: {}", id, err);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
            id
        });
    }

    let interrupted = tokio::select! {
        () = drain(&mut agents) => false,
        result = tokio::signal::ctrl_c() => {
            result.wrap_err("listening for ctrl-c")?;
            true
        }
    };
    if interrupted {
        info!("Shutting down...");
        agents.shutdown().await;
    } else {
        info!("All agents finished across {} regions", region_ids.len());
    }

    for id in registry.active() {
        if let Some(queue) = registry.queue(&id) {
            info!("Region {}: {}/{} queued", id, queue.len(), queue.capacity());
        }
    }
    info!(
        "Agent 0 balance: {:.2}",
        bank.balance(rtp_relocate::RequesterId(0))
    );

    Ok(())
}
