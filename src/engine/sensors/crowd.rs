//! Crowd density: too many competitor heads nearby, regardless of what each is doing.

use crate::engine::constants::sensors::*;
use crate::engine::evasion::best_escape;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::util::vec2::Vec2;

const NAME: &str = "crowd";

#[derive(Debug)]
pub struct CrowdSensor {
    radius: f32,
}

impl Default for CrowdSensor {
    fn default() -> Self {
        Self {
            radius: CROWD_RADIUS,
        }
    }
}

impl Sensor for CrowdSensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::Half
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        let origin = ctx.entity.position;
        let (count, sum) = ctx
            .nearby
            .within(self.radius)
            .fold((0usize, Vec2::ZERO), |(n, sum), c| (n + 1, sum + c.snapshot.position));

        let level = count as f32 / CROWD_CRITICAL_COUNT as f32;
        if count < CROWD_AVOID_COUNT {
            return Ok(SensorReading::quiet().with_level(level));
        }

        let centroid = sum * (1.0 / count as f32);
        let away = origin - centroid;
        let preferred = if away.length_sq() > 1e-6 { away.angle() } else { ctx.entity.heading };
        let heading = finite_heading(NAME, best_escape(preferred, ctx.evasion).heading)?;
        let reason = format!("{} competitors within {:.0}", count, self.radius);

        if count >= CROWD_CRITICAL_COUNT {
            let proposal = ActionProposal::new(ProposalKind::CrowdCritical, heading, reason);
            Ok(SensorReading::propose(proposal).with_danger(level))
        } else {
            let proposal = ActionProposal::new(ProposalKind::CrowdAvoidance, heading, reason);
            Ok(SensorReading::propose(proposal).with_level(level))
        }
    }
}
