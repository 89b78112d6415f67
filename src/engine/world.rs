//! World snapshot types and the host-facing traits.
//!
//! The host supplies one immutable [`WorldSnapshot`] per tick through a [`WorldProvider`]
//! and receives exactly one [`SteeringCommand`] through an [`Actuator`].

use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Stable competitor identity, used as the key for history and aggression memory
pub type CompetitorId = u64;

/// The agent the engine drives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlledEntity {
    pub position: Vec2,
    /// Radians, 0 = +x, counter-clockwise
    pub heading: f32,
    /// Units per tick
    pub speed: f32,
    pub boosting: bool,
    /// Growth length (segment count)
    pub length: f32,
    /// Head/body radius
    pub radius: f32,
}

impl ControlledEntity {
    pub fn new(position: Vec2, heading: f32, speed: f32) -> Self {
        Self {
            position,
            heading,
            speed,
            boosting: false,
            length: 10.0,
            radius: 10.0,
        }
    }
}

/// One trailing body point of a competitor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySegment {
    pub position: Vec2,
    pub radius: f32,
}

/// Read-only view of another agent for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSnapshot {
    pub id: CompetitorId,
    pub position: Vec2,
    pub heading: f32,
    /// Units per tick
    pub speed: f32,
    pub boosting: bool,
    pub head_radius: f32,
    /// Ordered from the neck toward the tail
    pub body: Vec<BodySegment>,
}

impl CompetitorSnapshot {
    pub fn new(id: CompetitorId, position: Vec2, heading: f32, speed: f32) -> Self {
        Self {
            id,
            position,
            heading,
            speed,
            boosting: false,
            head_radius: 10.0,
            body: Vec::new(),
        }
    }

    pub fn boosting(mut self, boosting: bool) -> Self {
        self.boosting = boosting;
        self
    }

    pub fn with_body(mut self, body: Vec<BodySegment>) -> Self {
        self.body = body;
        self
    }

    /// Head plus every body segment, as (position, radius)
    pub fn points(&self) -> impl Iterator<Item = (Vec2, f32)> + '_ {
        std::iter::once((self.position, self.head_radius))
            .chain(self.body.iter().map(|s| (s.position, s.radius)))
    }

    /// Approximate length, used to compare against the controlled entity
    pub fn length(&self) -> f32 {
        (self.body.len() + 1) as f32
    }
}

/// A consumable resource point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPoint {
    pub position: Vec2,
    pub value: f32,
}

impl TargetPoint {
    pub fn new(position: Vec2, value: f32) -> Self {
        Self { position, value }
    }
}

/// Circular arena boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaBoundary {
    pub center: Vec2,
    pub radius: f32,
}

impl ArenaBoundary {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Distance from the center as a fraction of the radius
    pub fn depth_fraction(&self, position: Vec2) -> f32 {
        if self.radius <= 0.0 {
            return 0.0;
        }
        position.distance_to(self.center) / self.radius
    }
}

impl Default for ArenaBoundary {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 21_600.0)
    }
}

/// Everything the engine reads for one tick
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    /// `None` while the controlled entity is dead or not yet spawned
    pub entity: Option<ControlledEntity>,
    pub competitors: Vec<CompetitorSnapshot>,
    pub targets: Vec<TargetPoint>,
    pub boundary: ArenaBoundary,
    /// Host clock (ms)
    pub timestamp_ms: u64,
    /// Host frame time / ping signal (ms), feeds the movement strategy
    pub latency_ms: Option<f32>,
}

/// Output of one decision cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringCommand {
    /// Unit vector
    pub direction: Vec2,
    pub heading: f32,
    pub boost: bool,
}

impl SteeringCommand {
    pub fn new(heading: f32, boost: bool) -> Self {
        Self {
            direction: Vec2::from_angle(heading),
            heading,
            boost,
        }
    }

    /// Keep going the way the entity already points, no boost
    pub fn hold(heading: f32) -> Self {
        Self::new(heading, false)
    }
}

/// Source of per-tick world snapshots
pub trait WorldProvider {
    fn snapshot(&mut self) -> WorldSnapshot;
}

/// Sink for the engine's steering output
pub trait Actuator {
    fn apply(&mut self, command: SteeringCommand);
}
