//! Threat & decision engine
//!
//! One [`Engine::tick`] per host frame:
//! 1. Predictor records motion, classifies intent, evicts stale records
//! 2. Nearby-competitor memo and evasion geometry are rebuilt
//! 3. Target selection (Half tier, skipped in danger mode) or carry-forward
//! 4. Sensors run at their tier cadence; failures and panics are contained per sensor
//! 5. The arbiter picks one proposal and the actuator receives exactly one command

pub mod arbiter;
pub mod constants;
pub mod evasion;
pub mod nearby;
pub mod performance;
pub mod predictor;
pub mod proposal;
pub mod risk;
pub mod scheduler;
pub mod sensors;
pub mod spatial;
pub mod targeting;
pub mod world;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::metrics::Telemetry;

use self::arbiter::{Arbiter, ArbiterState, Decision};
use self::evasion::EvasionEngine;
use self::nearby::NearbyCompetitors;
use self::performance::LatencyMonitor;
use self::predictor::TrajectoryPredictor;
use self::proposal::ActionProposal;
use self::risk::RiskEvaluator;
use self::scheduler::{Tier, TieredScheduler};
use self::sensors::{default_sensors, Sensor, SensorContext, SensorError};
use self::targeting::TargetSelector;
use self::world::{Actuator, SteeringCommand, WorldProvider, WorldSnapshot};

/// Result of one tick, handed back to the host loop
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub tick: u64,
    pub command: SteeringCommand,
    /// `None` when the entity was missing
    pub decision: Option<Decision>,
    pub danger: bool,
    pub sensor_errors: u32,
}

pub struct Engine {
    config: EngineConfig,
    predictor: TrajectoryPredictor,
    evasion: EvasionEngine,
    selector: TargetSelector,
    risk: RiskEvaluator,
    sensors: Vec<Box<dyn Sensor>>,
    scheduler: TieredScheduler,
    arbiter: Arbiter,
    latency: LatencyMonitor,
    telemetry: Arc<Telemetry>,
    tick: u64,
    consecutive_error_ticks: u32,
    degraded: bool,
    last_heading: f32,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sensors(config, default_sensors())
    }

    /// Engine with a custom sensor set, run in the given order
    pub fn with_sensors(config: EngineConfig, sensors: Vec<Box<dyn Sensor>>) -> Self {
        info!(
            sensors = sensors.len(),
            risk_bias = config.risk_bias,
            tracking_radius = config.tracking_radius,
            "Engine initialized"
        );
        Self {
            predictor: TrajectoryPredictor::new(),
            evasion: EvasionEngine::new(),
            selector: TargetSelector::new(config.scan_radius),
            risk: RiskEvaluator::new(config.risk_bias),
            sensors,
            scheduler: TieredScheduler::new(),
            arbiter: Arbiter::new(config.jitter_seed, config.instant_turn_priority),
            latency: LatencyMonitor::default(),
            telemetry: Arc::new(Telemetry::new()),
            tick: 0,
            consecutive_error_ticks: 0,
            degraded: false,
            last_heading: 0.0,
            config,
        }
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn predictor(&self) -> &TrajectoryPredictor {
        &self.predictor
    }

    pub fn scheduler(&self) -> &TieredScheduler {
        &self.scheduler
    }

    pub fn selector(&self) -> &TargetSelector {
        &self.selector
    }

    pub fn latency(&self) -> &LatencyMonitor {
        &self.latency
    }

    pub fn arbiter_state(&self) -> ArbiterState {
        self.arbiter.state()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Ticks processed so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Pull a snapshot, decide, push exactly one command
    pub fn run_tick<P, A>(&mut self, provider: &mut P, actuator: &mut A) -> TickOutcome
    where
        P: WorldProvider + ?Sized,
        A: Actuator + ?Sized,
    {
        let world = provider.snapshot();
        let outcome = self.tick(&world);
        actuator.apply(outcome.command);
        outcome
    }

    /// One decision cycle. Never fails: missing data or sensor failures degrade to fewer
    /// proposals, and no proposals degrade to holding the current heading.
    pub fn tick(&mut self, world: &WorldSnapshot) -> TickOutcome {
        let started = Instant::now();
        let tick = self.tick;
        self.tick += 1;

        if let Some(latency) = world.latency_ms {
            let before = self.latency.strategy();
            self.latency.record(latency);
            if self.latency.strategy() != before {
                info!(tick, "Movement strategy: {}", self.latency.status_message());
            }
        }

        let Some(entity) = world.entity else {
            // Dead or not spawned: nothing to steer, keep the last heading
            self.selector.clear();
            self.predictor.advance_to(world.timestamp_ms);
            self.predictor.evict(world.timestamp_ms);
            let command = SteeringCommand::hold(self.last_heading);
            self.telemetry.holds.fetch_add(1, Ordering::Relaxed);
            self.telemetry.record_tick_time(started.elapsed());
            return TickOutcome {
                tick,
                command,
                decision: None,
                danger: false,
                sensor_errors: 0,
            };
        };

        let tracking_radius = self.config.tracking_radius;
        let tracked = self.predictor.observe(world, &entity, tracking_radius);
        let nearby = NearbyCompetitors::build(world, entity.position, tracking_radius, tick);
        self.evasion.rebuild(&entity, &nearby, &self.predictor);

        let danger_mode = self.scheduler.danger_mode();
        let competitors = nearby.snapshots_within(tracking_radius);
        let scan = !danger_mode && TieredScheduler::is_due(Tier::Half, tick, false);
        let target = if scan {
            self.telemetry.target_scans.fetch_add(1, Ordering::Relaxed);
            self.selector
                .select(&entity, &world.targets, &competitors, &self.risk)
        } else {
            self.selector.carry_forward(entity.position)
        };

        let mut proposals: SmallVec<[ActionProposal; 16]> = SmallVec::new();
        let mut danger = false;
        let mut danger_level: f32 = 0.0;
        let mut errors = 0u32;
        {
            let ctx = SensorContext {
                tick,
                world,
                entity: &entity,
                nearby: &nearby,
                predictor: &self.predictor,
                risk: &self.risk,
                evasion: self.evasion.state(),
                target,
            };

            for sensor in self.sensors.iter_mut() {
                if !self.scheduler.should_run(sensor.tier(), tick) {
                    continue;
                }
                let name = sensor.name();
                let result = panic::catch_unwind(AssertUnwindSafe(|| sensor.sense(&ctx)))
                    .unwrap_or_else(|payload| {
                        Err(SensorError::Panicked {
                            sensor: name,
                            message: panic_message(payload),
                        })
                    });

                match result {
                    Ok(reading) => {
                        danger |= reading.danger;
                        danger_level = danger_level.max(reading.danger_level);
                        if let Some(proposal) = reading.proposal {
                            proposals.push(proposal);
                        }
                    }
                    Err(e) => {
                        warn!(tick, sensor = name, error = %e, "Sensor failed, proposal dropped");
                        if matches!(e, SensorError::Panicked { .. }) {
                            self.telemetry.sensor_panics.fetch_add(1, Ordering::Relaxed);
                        }
                        self.telemetry.sensor_errors.fetch_add(1, Ordering::Relaxed);
                        errors += 1;
                    }
                }
            }
        }
        if let Some(target) = target {
            proposals.push(target.to_proposal());
        }

        let profile = self.latency.profile();
        let decision = self.arbiter.decide(&proposals, danger, &entity, &profile);
        if self.scheduler.set_danger_mode(danger) {
            debug!(tick, danger, "Scheduler danger mode changed");
        }

        if errors > 0 {
            self.consecutive_error_ticks += 1;
        } else {
            self.consecutive_error_ticks = 0;
        }
        let degraded = self.consecutive_error_ticks >= self.config.degraded_error_ticks;
        if degraded != self.degraded {
            if degraded {
                warn!(tick, consecutive = self.consecutive_error_ticks, "Engine degraded by repeated sensor errors");
            } else {
                info!(tick, "Engine recovered");
            }
            self.degraded = degraded;
        }

        let command = decision.command;
        self.last_heading = command.heading;

        let telemetry = &self.telemetry;
        telemetry.proposals.fetch_add(proposals.len() as u64, Ordering::Relaxed);
        if decision.proposal.is_some() {
            telemetry.decisions.fetch_add(1, Ordering::Relaxed);
        } else {
            telemetry.holds.fetch_add(1, Ordering::Relaxed);
        }
        if decision.state == ArbiterState::Lockout {
            telemetry.lockout_ticks.fetch_add(1, Ordering::Relaxed);
        }
        telemetry
            .aggressive_competitors
            .store(self.predictor.aggressive_count() as u64, Ordering::Relaxed);

        #[cfg(feature = "telemetry")]
        {
            let state = self.evasion.state();
            telemetry.publish(crate::metrics::OverlaySnapshot {
                tick,
                state: decision.state,
                chosen: decision.proposal.clone(),
                rings: state.rings.clone(),
                blocked: state.blocked.clone(),
                gaps: state.gaps.clone(),
                target: self.selector.last_choice().cloned(),
                tracked_competitors: tracked,
                danger_level,
                lockout: decision.state == ArbiterState::Lockout,
                degraded,
                strategy: self.latency.strategy(),
            });
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = (tracked, danger_level);
            telemetry.degraded.store(degraded as u64, Ordering::Relaxed);
            telemetry.lockout.store((decision.state == ArbiterState::Lockout) as u64, Ordering::Relaxed);
        }
        telemetry.record_tick_time(started.elapsed());

        TickOutcome {
            tick,
            command,
            decision: Some(decision),
            danger,
            sensor_errors: errors,
        }
    }
}
