//! Chain ("string") discovery
//!
//! Greedy extension from each ungrouped seed in 16 candidate directions. Each step picks the
//! next point within the gap tolerance that best keeps the current direction. The longest,
//! straightest chain per seed wins and its points are claimed.

use std::f32::consts::{PI, TAU};

use bitvec::prelude::*;
use serde::Serialize;

use crate::engine::constants::targeting::*;
use crate::engine::constants::timing::NOMINAL_TICK_MS;
use crate::engine::risk::RiskAssessment;
use crate::engine::targeting::ScanContext;
use crate::util::geometry::angle_between;

/// An ordered run of targets, entry point first
#[derive(Debug, Clone, Serialize)]
pub struct Chain {
    pub members: Vec<usize>,
    pub total_value: f32,
    /// Sum of segment lengths
    pub path_length: f32,
    /// Endpoint distance / path length (1 = perfectly straight)
    pub straightness: f32,
    /// Distance from the entity to the entry point
    pub reach: f32,
    /// Turning expressed as equivalent path units
    pub turn_cost: f32,
    pub value_per_second: f32,
    pub value_per_distance: f32,
    /// cos of the angle between the entity heading and the chain direction, floored at 0
    pub alignment: f32,
    /// Worst adjusted risk sampled along the chain
    pub path_risk: f32,
    pub assessment: RiskAssessment,
    pub score: f32,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn entry(&self) -> usize {
        self.members[0]
    }

    /// Orient `members` so the end nearer the entity comes first, then derive the metrics
    fn evaluate(ctx: &ScanContext<'_>, mut members: Vec<usize>) -> Self {
        let targets = ctx.targets;
        let entity = ctx.entity;
        let origin = entity.position;

        let first = targets[members[0]].position;
        let last = targets[members[members.len() - 1]].position;
        if last.distance_sq_to(origin) < first.distance_sq_to(origin) {
            members.reverse();
        }

        let positions: Vec<_> = members.iter().map(|&i| targets[i].position).collect();
        let total_value: f32 = members.iter().map(|&i| targets[i].value).sum();
        let path_length: f32 = positions.windows(2).map(|w| w[0].distance_to(w[1])).sum();
        let entry = positions[0];
        let exit = positions[positions.len() - 1];
        let straightness = if path_length > f32::EPSILON {
            entry.distance_to(exit) / path_length
        } else {
            1.0
        };

        let reach = origin.distance_to(entry);
        let mut turning: f32 = positions
            .windows(3)
            .map(|w| angle_between(w[0].bearing_to(w[1]), w[1].bearing_to(w[2])))
            .sum();
        if reach > 1.0 {
            turning += angle_between(entity.heading, origin.bearing_to(entry));
        }
        let turn_cost = turning * TURN_COST_PER_RADIAN;

        let speed = entity.speed.max(1.0);
        let seconds = ((reach + path_length + turn_cost) / speed * NOMINAL_TICK_MS / 1000.0).max(1e-3);
        let value_per_second = total_value / seconds;
        let value_per_distance = total_value / (reach + path_length).max(1.0);
        let alignment = angle_between(entity.heading, entry.bearing_to(exit)).cos().max(0.0);

        let mean_value = total_value / members.len() as f32;
        let middle = positions[positions.len() / 2];
        let assessment = [entry, middle, exit]
            .into_iter()
            .map(|p| ctx.risk.score_point(p, Some(mean_value), ctx.competitors))
            .max_by(|a, b| a.adjusted_risk.total_cmp(&b.adjusted_risk))
            .unwrap_or_else(|| ctx.risk.score_point(entry, Some(mean_value), ctx.competitors));
        let path_risk = assessment.adjusted_risk;

        let score = (value_per_second * CHAIN_FPS_WEIGHT + value_per_distance * CHAIN_FPD_WEIGHT)
            * (1.0 + CHAIN_ALIGNMENT_BONUS * alignment)
            * (1.0 - path_risk);

        Self {
            members,
            total_value,
            path_length,
            straightness,
            reach,
            turn_cost,
            value_per_second,
            value_per_distance,
            alignment,
            path_risk,
            assessment,
            score,
        }
    }
}

/// Walk from `start` along `direction`, never revisiting `exclude` or claimed points
fn extend(
    ctx: &ScanContext<'_>,
    eligible: &BitSlice,
    exclude: &[usize],
    start: usize,
    direction: f32,
    max_steps: usize,
) -> Vec<usize> {
    let targets = ctx.targets;
    let mut path = Vec::new();
    let mut current = start;
    let mut heading = direction;

    while path.len() < max_steps {
        let here = targets[current].position;
        let next = ctx
            .grid
            .query_radius(targets, here, CHAIN_GAP_TOLERANCE)
            .filter(|&j| j != current && eligible[j] && !exclude.contains(&j) && !path.contains(&j))
            .filter_map(|j| {
                let offset = targets[j].position - here;
                let distance = offset.length();
                if distance < 1e-3 {
                    return None;
                }
                let deviation = angle_between(offset.angle(), heading);
                (deviation <= CHAIN_ANGLE_TOLERANCE).then(|| {
                    let cost = deviation / CHAIN_ANGLE_TOLERANCE + distance / CHAIN_GAP_TOLERANCE;
                    (j, cost)
                })
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((j, _)) = next else { break };
        heading = here.bearing_to(targets[j].position);
        path.push(j);
        current = j;
    }
    path
}

/// Best chain through `seed`, trying each candidate direction both ways
fn best_chain_from(ctx: &ScanContext<'_>, eligible: &BitSlice, seed: usize) -> Option<Vec<usize>> {
    let targets = ctx.targets;
    let mut best: Option<(Vec<usize>, f32)> = None;

    for i in 0..CHAIN_DIRECTIONS {
        let direction = i as f32 * TAU / CHAIN_DIRECTIONS as f32;
        let forward = extend(ctx, eligible, &[seed], seed, direction, CHAIN_MAX_LENGTH - 1);

        let back_direction = match forward.first() {
            Some(&first) => targets[seed].position.bearing_to(targets[first].position) + PI,
            None => direction + PI,
        };
        let mut exclude = Vec::with_capacity(forward.len() + 1);
        exclude.push(seed);
        exclude.extend_from_slice(&forward);
        let room = CHAIN_MAX_LENGTH - 1 - forward.len();
        let backward = extend(ctx, eligible, &exclude, seed, back_direction, room);

        let mut members: Vec<usize> = backward.into_iter().rev().collect();
        members.push(seed);
        members.extend(forward);
        if members.len() < CHAIN_MIN_LENGTH {
            continue;
        }

        let path_length: f32 = members
            .windows(2)
            .map(|w| targets[w[0]].position.distance_to(targets[w[1]].position))
            .sum();
        let span = targets[members[0]]
            .position
            .distance_to(targets[members[members.len() - 1]].position);
        let straightness = if path_length > f32::EPSILON { span / path_length } else { 1.0 };
        let quality = members.len() as f32 * straightness;

        if best.as_ref().map_or(true, |(_, q)| quality > *q) {
            best = Some((members, quality));
        }
    }
    best.map(|(members, _)| members)
}

/// Chains among `candidates` (nearest first), best score first
pub fn find_chains(ctx: &ScanContext<'_>, candidates: &[usize]) -> Vec<Chain> {
    let mut eligible = bitvec![0; ctx.targets.len()];
    for &i in candidates {
        eligible.set(i, true);
    }

    let mut chains = Vec::new();
    for &seed in candidates {
        if !eligible[seed] {
            continue;
        }
        if let Some(members) = best_chain_from(ctx, &eligible, seed) {
            for &i in &members {
                eligible.set(i, false);
            }
            chains.push(Chain::evaluate(ctx, members));
        }
    }
    chains.sort_by(|a, b| b.score.total_cmp(&a.score));
    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::risk::RiskEvaluator;
    use crate::engine::spatial::TargetGrid;
    use crate::engine::world::{ControlledEntity, TargetPoint};
    use crate::util::vec2::Vec2;

    fn chains_for(targets: &[TargetPoint], entity: &ControlledEntity) -> Vec<Chain> {
        let mut grid = TargetGrid::default();
        grid.rebuild(targets);
        let risk = RiskEvaluator::default();
        let ctx = ScanContext {
            targets,
            grid: &grid,
            entity,
            risk: &risk,
            competitors: &[],
        };
        let mut candidates: Vec<usize> = (0..targets.len()).collect();
        candidates.sort_by(|&a, &b| {
            targets[a]
                .position
                .distance_sq_to(entity.position)
                .total_cmp(&targets[b].position.distance_sq_to(entity.position))
        });
        find_chains(&ctx, &candidates)
    }

    fn line(start: Vec2, step: Vec2, count: usize) -> Vec<TargetPoint> {
        (0..count).map(|i| TargetPoint::new(start + step * i as f32, 1.0)).collect()
    }

    #[test]
    fn test_collinear_points_form_one_chain() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets = line(Vec2::new(100.0, 0.0), Vec2::new(40.0, 0.0), 5);
        let chains = chains_for(&targets, &entity);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 5);
        assert_eq!(chains[0].entry(), 0);
        assert!((chains[0].straightness - 1.0).abs() < 1e-4);
        assert!((chains[0].alignment - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_middle_seed_extends_both_ways() {
        let entity = ControlledEntity::new(Vec2::new(200.0, 100.0), 0.0, 5.0);
        let targets = line(Vec2::ZERO, Vec2::new(40.0, 0.0), 9);
        let chains = chains_for(&targets, &entity);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 9);
    }

    #[test]
    fn test_gap_breaks_chain() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let mut targets = line(Vec2::new(100.0, 0.0), Vec2::new(40.0, 0.0), 3);
        targets.extend(line(Vec2::new(500.0, 0.0), Vec2::new(40.0, 0.0), 3));
        let chains = chains_for(&targets, &entity);
        assert_eq!(chains.len(), 2);
        assert!(chains.iter().all(|c| c.len() == 3));
    }

    #[test]
    fn test_sharp_turn_not_followed() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        // Right angle after three points
        let mut targets = line(Vec2::new(100.0, 0.0), Vec2::new(40.0, 0.0), 3);
        targets.push(TargetPoint::new(Vec2::new(180.0, 40.0), 1.0));
        targets.push(TargetPoint::new(Vec2::new(180.0, 80.0), 1.0));
        let chains = chains_for(&targets, &entity);
        assert!(chains.iter().all(|c| c.straightness > 0.5));
    }

    #[test]
    fn test_too_short_rejected() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets = line(Vec2::new(100.0, 0.0), Vec2::new(40.0, 0.0), 2);
        assert!(chains_for(&targets, &entity).is_empty());
    }
}
