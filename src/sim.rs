//! Seeded simulated arena
//!
//! A small deterministic world for the demo loop and benchmarks. Competitors pick a behavior
//! on a decision timer (wander, chase the controlled entity, or collect food), drag a trailing
//! body behind them, and the controlled entity moves by whatever command the engine applied
//! last. Running into a body kills the entity; it respawns after a short delay.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::engine::constants::timing::NOMINAL_TICK_MS;
use crate::engine::world::{
    Actuator, ArenaBoundary, BodySegment, CompetitorId, CompetitorSnapshot, ControlledEntity,
    SteeringCommand, TargetPoint, WorldProvider, WorldSnapshot,
};
use crate::util::geometry::{angle_delta, normalize_angle};
use crate::util::vec2::Vec2;

const ARENA_RADIUS: f32 = 3_000.0;
const BASE_SPEED: f32 = 5.0;
const BOOST_SPEED: f32 = 10.0;
const MAX_TURN: f32 = 0.12;
/// Trail points between body segments
const SEGMENT_SPACING: usize = 3;
const EAT_RADIUS: f32 = 20.0;
const RESPAWN_TICKS: u32 = 90;
/// Decision interval in ticks
const DECISION_INTERVAL: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Wander,
    Chase,
    Collect,
}

#[derive(Debug, Clone)]
struct SimCompetitor {
    id: CompetitorId,
    position: Vec2,
    heading: f32,
    desired_heading: f32,
    boosting: bool,
    behavior: Behavior,
    decision_timer: u32,
    /// How likely to chase (0-1)
    aggression: f32,
    segments: usize,
    trail: VecDeque<Vec2>,
}

impl SimCompetitor {
    fn snapshot(&self) -> CompetitorSnapshot {
        let body = self
            .trail
            .iter()
            .skip(SEGMENT_SPACING)
            .step_by(SEGMENT_SPACING)
            .take(self.segments)
            .map(|&position| BodySegment { position, radius: 10.0 })
            .collect();
        let speed = if self.boosting { BOOST_SPEED } else { BASE_SPEED };
        CompetitorSnapshot::new(self.id, self.position, self.heading, speed)
            .boosting(self.boosting)
            .with_body(body)
    }
}

/// Deterministic world implementing both host-facing traits
#[derive(Debug)]
pub struct SimulatedWorld {
    rng: StdRng,
    entity: Option<ControlledEntity>,
    respawn_timer: u32,
    competitors: Vec<SimCompetitor>,
    targets: Vec<TargetPoint>,
    boundary: ArenaBoundary,
    command: SteeringCommand,
    tick: u64,
    deaths: u32,
    eaten: u64,
}

impl SimulatedWorld {
    pub fn new(seed: u64, competitors: usize, targets: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let boundary = ArenaBoundary::new(Vec2::ZERO, ARENA_RADIUS);

        let competitors = (0..competitors)
            .map(|i| {
                let position = random_point(&mut rng, ARENA_RADIUS * 0.8);
                let heading = rng.gen_range(0.0..TAU);
                SimCompetitor {
                    id: i as CompetitorId + 1,
                    position,
                    heading,
                    desired_heading: heading,
                    boosting: false,
                    behavior: Behavior::Wander,
                    decision_timer: rng.gen_range(0..DECISION_INTERVAL),
                    aggression: rng.gen_range(0.2..0.8),
                    segments: rng.gen_range(5..30),
                    trail: VecDeque::with_capacity(128),
                }
            })
            .collect();
        let targets = (0..targets)
            .map(|_| random_target(&mut rng, ARENA_RADIUS * 0.95))
            .collect();

        Self {
            rng,
            entity: Some(ControlledEntity::new(Vec2::ZERO, 0.0, BASE_SPEED)),
            respawn_timer: 0,
            competitors,
            targets,
            boundary,
            command: SteeringCommand::hold(0.0),
            tick: 0,
            deaths: 0,
            eaten: 0,
        }
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn eaten(&self) -> u64 {
        self.eaten
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance one tick: entity, competitors, food, collisions
    fn step(&mut self) {
        self.tick += 1;
        self.step_entity();

        let entity_position = self.entity.map(|e| e.position);
        let targets = &self.targets;
        for competitor in &mut self.competitors {
            step_competitor(competitor, entity_position, targets, &mut self.rng);
        }

        self.consume_targets();
        self.check_collisions();
    }

    fn step_entity(&mut self) {
        let Some(entity) = self.entity.as_mut() else {
            self.respawn_timer = self.respawn_timer.saturating_sub(1);
            if self.respawn_timer == 0 {
                let position = random_point(&mut self.rng, ARENA_RADIUS * 0.5);
                self.entity = Some(ControlledEntity::new(position, 0.0, BASE_SPEED));
                debug!(tick = self.tick, "Simulated entity respawned");
            }
            return;
        };

        let turn = angle_delta(entity.heading, self.command.heading).clamp(-MAX_TURN, MAX_TURN);
        entity.heading = normalize_angle(entity.heading + turn);
        entity.boosting = self.command.boost;
        entity.speed = if self.command.boost { BOOST_SPEED } else { BASE_SPEED };
        entity.position += Vec2::from_angle(entity.heading) * entity.speed;

        if self.boundary.depth_fraction(entity.position) >= 1.0 {
            self.kill_entity("boundary");
        }
    }

    fn consume_targets(&mut self) {
        let Some(mut entity) = self.entity else {
            return;
        };
        let mut eaten = 0;
        for i in 0..self.targets.len() {
            if self.targets[i].position.distance_to(entity.position) < EAT_RADIUS + entity.radius {
                entity.length += self.targets[i].value * 0.1;
                self.targets[i] = random_target(&mut self.rng, ARENA_RADIUS * 0.95);
                eaten += 1;
            }
        }
        self.eaten += eaten;
        self.entity = Some(entity);
    }

    fn check_collisions(&mut self) {
        let Some(entity) = self.entity else {
            return;
        };
        let hit = self.competitors.iter().any(|c| {
            c.snapshot()
                .body
                .iter()
                .any(|s| s.position.distance_to(entity.position) < s.radius + entity.radius)
        });
        if hit {
            self.kill_entity("body collision");
        }
    }

    fn kill_entity(&mut self, cause: &'static str) {
        if let Some(entity) = self.entity.take() {
            self.deaths += 1;
            self.respawn_timer = RESPAWN_TICKS;
            // Leave a debris field where it died
            for i in 0..8 {
                let offset = Vec2::polar(i as f32 * TAU / 8.0, 25.0);
                if let Some(slot) = self.targets.get_mut(i) {
                    *slot = TargetPoint::new(entity.position + offset, 10.0);
                }
            }
            debug!(tick = self.tick, cause, deaths = self.deaths, "Simulated entity died");
        }
    }
}

fn random_point(rng: &mut StdRng, max_radius: f32) -> Vec2 {
    let angle = rng.gen_range(0.0..TAU);
    // sqrt for uniform area density
    let radius = max_radius * rng.gen::<f32>().sqrt();
    Vec2::polar(angle, radius)
}

fn random_target(rng: &mut StdRng, max_radius: f32) -> TargetPoint {
    TargetPoint::new(random_point(rng, max_radius), rng.gen_range(1.0..5.0))
}

fn step_competitor(
    competitor: &mut SimCompetitor,
    entity: Option<Vec2>,
    targets: &[TargetPoint],
    rng: &mut StdRng,
) {
    if competitor.decision_timer == 0 {
        competitor.decision_timer = DECISION_INTERVAL + rng.gen_range(0..DECISION_INTERVAL / 2);
        let near_entity = entity.is_some_and(|p| p.distance_to(competitor.position) < 500.0);
        competitor.behavior = if near_entity && rng.gen::<f32>() < competitor.aggression {
            Behavior::Chase
        } else if rng.gen::<f32>() < 0.6 {
            Behavior::Collect
        } else {
            Behavior::Wander
        };
    } else {
        competitor.decision_timer -= 1;
    }

    competitor.boosting = false;
    match competitor.behavior {
        Behavior::Chase => match entity {
            Some(target) => {
                competitor.desired_heading = competitor.position.bearing_to(target);
                competitor.boosting = competitor.position.distance_to(target) < 250.0;
            }
            None => competitor.behavior = Behavior::Wander,
        },
        Behavior::Collect => {
            let nearest = targets.iter().min_by(|a, b| {
                a.position
                    .distance_sq_to(competitor.position)
                    .total_cmp(&b.position.distance_sq_to(competitor.position))
            });
            if let Some(t) = nearest {
                competitor.desired_heading = competitor.position.bearing_to(t.position);
            }
        }
        Behavior::Wander => {
            competitor.desired_heading += rng.gen_range(-0.1..0.1);
        }
    }

    // Turn back before leaving the arena
    if competitor.position.length() > ARENA_RADIUS * 0.9 {
        competitor.desired_heading = competitor.position.bearing_to(Vec2::ZERO);
    }

    let turn = angle_delta(competitor.heading, competitor.desired_heading).clamp(-MAX_TURN, MAX_TURN);
    competitor.heading = normalize_angle(competitor.heading + turn);
    let speed = if competitor.boosting { BOOST_SPEED } else { BASE_SPEED };
    competitor.trail.push_front(competitor.position);
    competitor.trail.truncate((competitor.segments + 1) * SEGMENT_SPACING);
    competitor.position += Vec2::from_angle(competitor.heading) * speed;
}

impl WorldProvider for SimulatedWorld {
    fn snapshot(&mut self) -> WorldSnapshot {
        self.step();
        WorldSnapshot {
            entity: self.entity,
            competitors: self.competitors.iter().map(SimCompetitor::snapshot).collect(),
            targets: self.targets.clone(),
            boundary: self.boundary,
            timestamp_ms: (self.tick as f32 * NOMINAL_TICK_MS) as u64,
            latency_ms: Some(NOMINAL_TICK_MS + self.rng.gen_range(0.0..4.0)),
        }
    }
}

impl Actuator for SimulatedWorld {
    fn apply(&mut self, command: SteeringCommand) {
        self.command = command;
    }
}
