//! Vigilance while targeting: watch the straight path to the active target for threatening
//! competitors whose forecast ring would cut across it.

use crate::engine::constants::evasion::HOSTILE_LEVEL;
use crate::engine::constants::sensors::*;
use crate::engine::evasion::{best_escape, ring_radius};
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::engine::world::CompetitorId;
use crate::util::geometry::line_circle_intersection;

const NAME: &str = "vigilance";

#[derive(Debug)]
pub struct VigilanceSensor {
    range: f32,
}

impl Default for VigilanceSensor {
    fn default() -> Self {
        Self {
            range: VIGILANCE_RANGE,
        }
    }
}

impl Sensor for VigilanceSensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::Half
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        let Some(target) = ctx.target else {
            return Ok(SensorReading::quiet());
        };
        let origin = ctx.entity.position;

        // (competitor, threat, distance) of the worst threat blocking the path
        let mut worst: Option<(CompetitorId, f32, f32)> = None;
        for competitor in ctx.nearby.within(self.range) {
            let snapshot = competitor.snapshot;
            let aggression = ctx.predictor.aggression_level(snapshot.id);
            let threat = ctx.predictor.intent(snapshot.id).threat.max(aggression);
            if threat < VIGILANCE_THREAT {
                continue;
            }

            let forecast = ctx.predictor.predict_snapshot(snapshot, VIGILANCE_LOOKAHEAD_FRAMES);
            let radius = ring_radius(
                competitor.distance,
                snapshot.speed,
                snapshot.boosting,
                aggression > HOSTILE_LEVEL,
            );
            if line_circle_intersection(origin, target.aim, forecast.position, radius).is_none() {
                continue;
            }
            if worst.map_or(true, |(_, t, _)| threat > t) {
                worst = Some((snapshot.id, threat, competitor.distance));
            }
        }

        let Some((id, threat, distance)) = worst else {
            return Ok(SensorReading::quiet());
        };

        let escape = best_escape(target.heading, ctx.evasion);
        let heading = finite_heading(NAME, escape.heading)?;
        let proposal = ActionProposal::new(
            ProposalKind::Vigilance,
            heading,
            format!("competitor {} threatens target path ({:.2})", id, threat),
        );

        let reading = SensorReading::propose(proposal);
        if threat >= VIGILANCE_DANGER_THREAT && distance < VIGILANCE_DANGER_RANGE {
            Ok(reading.with_danger(threat))
        } else {
            Ok(reading.with_level(threat))
        }
    }
}
