//! Squeeze detection
//!
//! Splits the surroundings into the four world-axis quadrants. When competitor heads or
//! bodies inside squeeze range occupy three or more, the entity is being wrapped and must
//! boost out through the open quadrant (or the least crowded one).

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::engine::constants::sensors::*;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::engine::world::CompetitorId;
use crate::util::geometry::wrap_positive;

const NAME: &str = "squeeze";

#[derive(Debug, Clone, Copy, Default)]
struct Quadrant {
    occupied: bool,
    /// Closest occupying point
    nearest: f32,
}

#[derive(Debug)]
pub struct SqueezeSensor {
    range: f32,
    min_quadrants: usize,
}

impl Default for SqueezeSensor {
    fn default() -> Self {
        Self {
            range: SQUEEZE_RANGE,
            min_quadrants: SQUEEZE_MIN_QUADRANTS,
        }
    }
}

#[inline]
fn quadrant_of(bearing: f32) -> usize {
    ((wrap_positive(bearing) / FRAC_PI_2) as usize).min(3)
}

#[inline]
fn quadrant_center(index: usize) -> f32 {
    index as f32 * FRAC_PI_2 + FRAC_PI_4
}

impl Sensor for SqueezeSensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::EveryTick
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        let origin = ctx.entity.position;
        let mut quadrants = [Quadrant { occupied: false, nearest: f32::INFINITY }; 4];
        // Single competitor spanning the most quadrants
        let mut wrapper: Option<(CompetitorId, usize)> = None;

        for competitor in ctx.nearby.reaching(self.range) {
            let mut own = [false; 4];
            for (point, _) in competitor.snapshot.points() {
                let distance = origin.distance_to(point);
                if distance > self.range || distance <= f32::EPSILON {
                    continue;
                }
                let q = quadrant_of(origin.bearing_to(point));
                own[q] = true;
                quadrants[q].occupied = true;
                quadrants[q].nearest = quadrants[q].nearest.min(distance);
            }
            let spanned = own.iter().filter(|&&o| o).count();
            if spanned > wrapper.map_or(0, |(_, s)| s) {
                wrapper = Some((competitor.snapshot.id, spanned));
            }
        }

        let occupied = quadrants.iter().filter(|q| q.occupied).count();
        if occupied < self.min_quadrants {
            return Ok(SensorReading::quiet());
        }

        // Free quadrant if any, otherwise the one whose nearest threat is farthest
        let exit = (0..4)
            .find(|&q| !quadrants[q].occupied)
            .unwrap_or_else(|| {
                (0..4)
                    .max_by(|&a, &b| quadrants[a].nearest.total_cmp(&quadrants[b].nearest))
                    .unwrap_or(0)
            });
        let heading = finite_heading(NAME, quadrant_center(exit))?;

        let reason = match wrapper {
            Some((id, spanned)) if spanned >= self.min_quadrants => {
                format!("wrapped by competitor {} across {} quadrants", id, spanned)
            }
            _ => format!("squeezed from {} quadrants", occupied),
        };
        let proposal =
            ActionProposal::new(ProposalKind::Squeeze, heading, reason).with_boost(true);
        Ok(SensorReading::propose(proposal).with_danger(occupied as f32 / 4.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sensors::test_support::Fixture;
    use crate::engine::world::{BodySegment, CompetitorSnapshot, WorldSnapshot};
    use crate::util::geometry::angle_between;
    use crate::util::vec2::Vec2;

    fn at_degrees(id: u64, degrees: f32, distance: f32) -> CompetitorSnapshot {
        let bearing = degrees.to_radians();
        CompetitorSnapshot::new(id, Vec2::polar(bearing, distance), bearing + std::f32::consts::PI, 4.0)
    }

    #[test]
    fn test_three_quadrants_escape_into_free_one() {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![
                at_degrees(1, 45.0, 120.0),
                at_degrees(2, 135.0, 120.0),
                at_degrees(3, 225.0, 120.0),
            ],
            ..Default::default()
        });
        let reading = fixture.run(&mut SqueezeSensor::default());
        let proposal = reading.proposal.expect("proposal");
        assert!(reading.danger);
        assert_eq!(proposal.kind, ProposalKind::Squeeze);
        assert!(proposal.boost);
        assert!(angle_between(proposal.heading, -FRAC_PI_4) < 1e-4);
    }

    #[test]
    fn test_two_quadrants_quiet() {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![at_degrees(1, 45.0, 120.0), at_degrees(2, 135.0, 120.0)],
            ..Default::default()
        });
        assert!(fixture.run(&mut SqueezeSensor::default()).proposal.is_none());
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![
                at_degrees(1, 45.0, 120.0),
                at_degrees(2, 135.0, 120.0),
                at_degrees(3, 225.0, 400.0),
            ],
            ..Default::default()
        });
        assert!(fixture.run(&mut SqueezeSensor::default()).proposal.is_none());
    }

    #[test]
    fn test_single_wrapper_all_quadrants_picks_farthest() {
        let body: Vec<BodySegment> = [(200.0, 10.0), (-10.0, 200.0), (-240.0, -10.0), (10.0, -100.0)]
            .iter()
            .map(|&(x, y)| BodySegment { position: Vec2::new(x, y), radius: 10.0 })
            .collect();
        let wrapper = CompetitorSnapshot::new(7, Vec2::new(150.0, 150.0), 0.0, 4.0).with_body(body);
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![wrapper],
            ..Default::default()
        });
        let proposal = fixture.run(&mut SqueezeSensor::default()).proposal.expect("proposal");
        assert!(proposal.reason.contains("competitor 7"));
        // Quadrant 2 (180-270 degrees) holds only the point at 240 units
        assert!(angle_between(proposal.heading, quadrant_center(2)) < 1e-4);
    }
}
