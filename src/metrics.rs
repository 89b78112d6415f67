//! Engine telemetry
//!
//! Atomic counters for the decision loop plus the latest overlay snapshot (chosen proposal,
//! danger rings, blocked arcs, gaps, active target) for external renderers. Counters render
//! in Prometheus text format; the optional endpoint serves them at /metrics.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::engine::arbiter::ArbiterState;
use crate::engine::evasion::{AngularArc, DangerRing};
use crate::engine::performance::MovementStrategy;
use crate::engine::proposal::ActionProposal;
use crate::engine::targeting::TargetChoice;

/// Ten seconds of ticks at the default rate
const TICK_WINDOW: usize = 600;
const MIN_PERCENTILE_SAMPLES: usize = 10;

/// `q`-quantile of an ascending slice, 0 when empty
fn percentile(sorted: &[u64], q: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() - 1) as f32 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Read-only view of the last tick, published for rendering and debugging
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverlaySnapshot {
    pub tick: u64,
    pub state: ArbiterState,
    pub chosen: Option<ActionProposal>,
    pub rings: Vec<DangerRing>,
    pub blocked: Vec<AngularArc>,
    pub gaps: Vec<AngularArc>,
    /// Active target with its risk/reward breakdown
    pub target: Option<TargetChoice>,
    pub tracked_competitors: usize,
    /// Highest sensor danger level this tick (0-1)
    pub danger_level: f32,
    pub lockout: bool,
    pub degraded: bool,
    pub strategy: MovementStrategy,
}

#[derive(Debug)]
pub struct Telemetry {
    // Decision loop
    pub tick_count: AtomicU64,
    pub decisions: AtomicU64,
    pub holds: AtomicU64,
    pub lockout_ticks: AtomicU64,
    pub proposals: AtomicU64,
    pub target_scans: AtomicU64,

    // Failures
    pub sensor_errors: AtomicU64,
    pub sensor_panics: AtomicU64,

    // Current state
    pub tracked_competitors: AtomicU64,
    pub aggressive_competitors: AtomicU64,
    /// Danger level x1000
    pub danger_level_milli: AtomicU64,
    pub lockout: AtomicU64,
    pub degraded: AtomicU64,
    /// 0=Normal, 1=Cautious, 2=Straight, 3=Minimal
    pub strategy: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
    overlay: RwLock<OverlaySnapshot>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            decisions: AtomicU64::new(0),
            holds: AtomicU64::new(0),
            lockout_ticks: AtomicU64::new(0),
            proposals: AtomicU64::new(0),
            target_scans: AtomicU64::new(0),
            sensor_errors: AtomicU64::new(0),
            sensor_panics: AtomicU64::new(0),
            tracked_competitors: AtomicU64::new(0),
            aggressive_competitors: AtomicU64::new(0),
            danger_level_milli: AtomicU64::new(0),
            lockout: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
            strategy: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_WINDOW)),
            overlay: RwLock::new(OverlaySnapshot::default()),
        }
    }

    /// Record a tick time and update percentiles over the rolling window
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut window = self.tick_history.write();
        if window.len() == TICK_WINDOW {
            window.pop_front();
        }
        window.push_back(us);
        if window.len() < MIN_PERCENTILE_SAMPLES {
            return;
        }

        let mut sorted: Vec<u64> = window.iter().copied().collect();
        drop(window);
        sorted.sort_unstable();
        self.tick_time_p95_us.store(percentile(&sorted, 0.95), Ordering::Relaxed);
        self.tick_time_p99_us.store(percentile(&sorted, 0.99), Ordering::Relaxed);
        self.tick_time_max_us.store(percentile(&sorted, 1.0), Ordering::Relaxed);
    }

    /// Replace the overlay and mirror its scalar fields into the gauges
    pub fn publish(&self, overlay: OverlaySnapshot) {
        self.tracked_competitors.store(overlay.tracked_competitors as u64, Ordering::Relaxed);
        self.danger_level_milli
            .store((overlay.danger_level.clamp(0.0, 1.0) * 1000.0) as u64, Ordering::Relaxed);
        self.lockout.store(overlay.lockout as u64, Ordering::Relaxed);
        self.degraded.store(overlay.degraded as u64, Ordering::Relaxed);
        self.strategy.store(overlay.strategy.level(), Ordering::Relaxed);
        *self.overlay.write() = overlay;
    }

    /// Clone of the latest overlay
    pub fn overlay(&self) -> OverlaySnapshot {
        self.overlay.read().clone()
    }

    pub fn overlay_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&*self.overlay.read())
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed) != 0
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("arena_sentinel_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("arena_sentinel_decisions_total", "Ticks that executed a proposal", "counter",
            self.decisions.load(Ordering::Relaxed));
        metric!("arena_sentinel_holds_total", "Ticks that held heading", "counter",
            self.holds.load(Ordering::Relaxed));
        metric!("arena_sentinel_lockout_ticks_total", "Ticks spent in lockout", "counter",
            self.lockout_ticks.load(Ordering::Relaxed));
        metric!("arena_sentinel_proposals_total", "Proposals gathered", "counter",
            self.proposals.load(Ordering::Relaxed));
        metric!("arena_sentinel_target_scans_total", "Full target selection scans", "counter",
            self.target_scans.load(Ordering::Relaxed));

        metric!("arena_sentinel_sensor_errors_total", "Sensor runs that failed", "counter",
            self.sensor_errors.load(Ordering::Relaxed));
        metric!("arena_sentinel_sensor_panics_total", "Sensor runs that panicked", "counter",
            self.sensor_panics.load(Ordering::Relaxed));

        metric!("arena_sentinel_tracked_competitors", "Competitors tracked by the predictor", "gauge",
            self.tracked_competitors.load(Ordering::Relaxed));
        metric!("arena_sentinel_aggressive_competitors", "Competitors with live aggression records", "gauge",
            self.aggressive_competitors.load(Ordering::Relaxed));
        metric!("arena_sentinel_danger_level", "Highest sensor danger level (0-1)", "gauge",
            self.danger_level_milli.load(Ordering::Relaxed) as f64 / 1000.0);
        metric!("arena_sentinel_lockout", "Arbiter in lockout (0/1)", "gauge",
            self.lockout.load(Ordering::Relaxed));
        metric!("arena_sentinel_degraded", "Repeated sensor errors (0/1)", "gauge",
            self.degraded.load(Ordering::Relaxed));
        metric!("arena_sentinel_movement_strategy", "Movement strategy (0=Normal, 3=Minimal)", "gauge",
            self.strategy.load(Ordering::Relaxed));

        metric!("arena_sentinel_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("arena_sentinel_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("arena_sentinel_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("arena_sentinel_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("arena_sentinel_uptime_seconds", "Engine uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Counters as JSON (alternative for direct API access)
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "decisions": {
                "ticks": self.tick_count.load(Ordering::Relaxed),
                "executed": self.decisions.load(Ordering::Relaxed),
                "holds": self.holds.load(Ordering::Relaxed),
                "lockout_ticks": self.lockout_ticks.load(Ordering::Relaxed),
                "proposals": self.proposals.load(Ordering::Relaxed),
                "target_scans": self.target_scans.load(Ordering::Relaxed),
            },
            "errors": {
                "sensor_errors": self.sensor_errors.load(Ordering::Relaxed),
                "sensor_panics": self.sensor_panics.load(Ordering::Relaxed),
                "degraded": self.is_degraded(),
            },
            "state": {
                "tracked_competitors": self.tracked_competitors.load(Ordering::Relaxed),
                "aggressive_competitors": self.aggressive_competitors.load(Ordering::Relaxed),
                "danger_level": self.danger_level_milli.load(Ordering::Relaxed) as f64 / 1000.0,
                "lockout": self.lockout.load(Ordering::Relaxed) != 0,
                "strategy": self.strategy.load(Ordering::Relaxed),
            },
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "uptime_seconds": self.uptime_seconds(),
            },
        })
        .to_string()
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const SERVER_ERROR: &str = "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

fn http_ok(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Build the full HTTP response for a raw request head
fn route(request: &str, telemetry: &Telemetry) -> String {
    let path = request
        .strip_prefix("GET ")
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("");

    match path {
        "/metrics" => http_ok("text/plain; version=0.0.4", &telemetry.to_prometheus()),
        "/json" | "/metrics/json" => http_ok("application/json", &telemetry.to_json()),
        "/overlay" => match telemetry.overlay_json() {
            Ok(body) => http_ok("application/json", &body),
            Err(e) => {
                debug!("Overlay serialization failed: {}", e);
                SERVER_ERROR.to_string()
            }
        },
        "/" | "/health" => {
            let body = if telemetry.is_degraded() { "DEGRADED" } else { "OK" };
            http_ok("text/plain", body)
        }
        _ => NOT_FOUND.to_string(),
    }
}

/// Serve /metrics, /json, /overlay and /health over plain HTTP
pub async fn start_metrics_server(telemetry: Arc<Telemetry>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Telemetry endpoint on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let telemetry = telemetry.clone();

        tokio::spawn(async move {
            let mut head = [0u8; 1024];
            let n = match socket.read(&mut head).await {
                Ok(0) => return,
                Ok(n) => n,
                Err(e) => {
                    debug!(%peer, "Telemetry read failed: {}", e);
                    return;
                }
            };
            let response = route(&String::from_utf8_lossy(&head[..n]), &telemetry);
            if let Err(e) = socket.write_all(response.as_bytes()).await {
                debug!(%peer, "Telemetry write failed: {}", e);
            }
        });
    }
}
