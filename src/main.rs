use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::{error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use arena_sentinel::config::EngineConfig;
use arena_sentinel::engine::world::{Actuator, WorldProvider};
use arena_sentinel::engine::Engine;
use arena_sentinel::metrics;
use arena_sentinel::sim::SimulatedWorld;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Arena Sentinel v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {} competitors, {} targets, {} Hz, risk_bias={}",
        config.sim_competitors, config.sim_targets, config.tick_rate, config.risk_bias
    );

    let mut world = SimulatedWorld::new(config.sim_seed, config.sim_competitors, config.sim_targets);
    let mut engine = Engine::new(config.clone());
    let telemetry = engine.telemetry();

    if let Some(port) = config.metrics_port {
        let telemetry = telemetry.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(telemetry, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / config.tick_rate as f64));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut stats = tokio::time::interval(Duration::from_secs(config.stats_interval_secs));
    stats.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = world.snapshot();
                let outcome = engine.tick(&snapshot);
                world.apply(outcome.command);
            }
            _ = stats.tick() => {
                info!(
                    ticks = telemetry.tick_count.load(Ordering::Relaxed),
                    lockout_ticks = telemetry.lockout_ticks.load(Ordering::Relaxed),
                    sensor_errors = telemetry.sensor_errors.load(Ordering::Relaxed),
                    tick_p95_us = telemetry.tick_time_p95_us.load(Ordering::Relaxed),
                    strategy = engine.latency().strategy().as_str(),
                    deaths = world.deaths(),
                    eaten = world.eaten(),
                    "Engine stats"
                );
                match telemetry.overlay_json() {
                    Ok(json) => trace!(overlay = %json, "Overlay snapshot"),
                    Err(e) => warn!("Failed to serialize overlay: {}", e),
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
        }
    }

    info!(
        ticks = engine.tick_count(),
        deaths = world.deaths(),
        degraded = engine.is_degraded(),
        "Engine stopped"
    );
    Ok(())
}
