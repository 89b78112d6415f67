//! Threat sensors
//!
//! Each sensor reads the shared per-tick [`SensorContext`] and emits at most one proposal.
//! Crossing its own danger threshold also raises the shared danger flag, which puts the
//! arbiter in lockout for the tick and the scheduler in danger mode for the next ones.

pub mod body;
pub mod boundary;
pub mod counter;
pub mod crowd;
pub mod encirclement;
pub mod instant;
pub mod squeeze;
pub mod vigilance;
pub mod wander;

use serde::Serialize;
use thiserror::Error;

use crate::engine::evasion::EvasionState;
use crate::engine::nearby::NearbyCompetitors;
use crate::engine::predictor::TrajectoryPredictor;
use crate::engine::proposal::ActionProposal;
use crate::engine::risk::RiskEvaluator;
use crate::engine::scheduler::Tier;
use crate::engine::targeting::TargetChoice;
use crate::engine::world::{ControlledEntity, WorldSnapshot};

pub use body::BodyProximitySensor;
pub use boundary::BoundarySensor;
pub use counter::CounterAttackSensor;
pub use crowd::CrowdSensor;
pub use encirclement::EncirclementSensor;
pub use instant::InstantEvasionSensor;
pub use squeeze::SqueezeSensor;
pub use vigilance::VigilanceSensor;
pub use wander::IdleWanderSensor;

/// Transient failure inside one sensor; the tick continues without its proposal
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("non-finite {what} in {sensor}")]
    NonFinite {
        sensor: &'static str,
        what: &'static str,
    },

    #[error("{sensor} panicked: {message}")]
    Panicked {
        sensor: &'static str,
        message: String,
    },
}

/// Everything a sensor may read during one tick
pub struct SensorContext<'a> {
    pub tick: u64,
    pub world: &'a WorldSnapshot,
    pub entity: &'a ControlledEntity,
    pub nearby: &'a NearbyCompetitors<'a>,
    pub predictor: &'a TrajectoryPredictor,
    pub risk: &'a RiskEvaluator,
    pub evasion: &'a EvasionState,
    /// Active target, if the selector has one
    pub target: Option<&'a TargetChoice>,
}

/// Output of one sensor run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorReading {
    pub proposal: Option<ActionProposal>,
    /// Danger threshold crossed
    pub danger: bool,
    /// 0-1, for telemetry
    pub danger_level: f32,
}

impl SensorReading {
    pub fn quiet() -> Self {
        Self::default()
    }

    pub fn propose(proposal: ActionProposal) -> Self {
        Self {
            proposal: Some(proposal),
            danger: false,
            danger_level: 0.0,
        }
    }

    /// Raise the danger flag with `level`
    pub fn with_danger(mut self, level: f32) -> Self {
        self.danger = true;
        self.danger_level = level.clamp(0.0, 1.0);
        self
    }

    /// Report a level without raising the flag
    pub fn with_level(mut self, level: f32) -> Self {
        self.danger_level = level.clamp(0.0, 1.0);
        self
    }
}

pub trait Sensor: Send {
    /// Stable name for logs and metrics
    fn name(&self) -> &'static str;

    fn tier(&self) -> Tier;

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError>;
}

/// Fail with `NonFinite` when a computed heading is NaN or infinite
pub(crate) fn finite_heading(
    sensor: &'static str,
    heading: f32,
) -> Result<f32, SensorError> {
    if heading.is_finite() {
        Ok(heading)
    } else {
        Err(SensorError::NonFinite { sensor, what: "heading" })
    }
}

/// Default sensor set in fixed tier order
pub fn default_sensors() -> Vec<Box<dyn Sensor>> {
    vec![
        Box::new(BodyProximitySensor::default()),
        Box::new(BoundarySensor::default()),
        Box::new(SqueezeSensor::default()),
        Box::new(InstantEvasionSensor::default()),
        Box::new(EncirclementSensor::default()),
        Box::new(CrowdSensor::default()),
        Box::new(VigilanceSensor::default()),
        Box::new(CounterAttackSensor::default()),
        Box::new(IdleWanderSensor::default()),
    ]
}
