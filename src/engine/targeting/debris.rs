//! Debris-field detection
//!
//! A debris field is a dense patch of high-value points, typically left behind when a
//! competitor dies. Fields are found with the same radius linking as clusters, over a wider
//! scan and restricted to high-value points.

use serde::Serialize;

use crate::engine::constants::targeting::*;
use crate::engine::targeting::cluster::{link_groups, Cluster};
use crate::engine::targeting::ScanContext;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Serialize)]
pub struct DebrisField {
    pub cluster: Cluster,
    /// Lies within 60 degrees of the current heading
    pub ahead: bool,
    /// total * sqrt(count), +50% when ahead
    pub score: f32,
}

/// Debris fields around the entity, best score first
pub fn find_debris_fields(ctx: &ScanContext<'_>) -> Vec<DebrisField> {
    let origin = ctx.entity.position;
    let candidates: Vec<usize> = ctx
        .grid
        .query_radius(ctx.targets, origin, DEBRIS_SCAN_RADIUS)
        .filter(|&i| ctx.targets[i].value >= DEBRIS_POINT_VALUE)
        .collect();
    if candidates.len() < DEBRIS_MIN_POINTS {
        return Vec::new();
    }

    let heading = Vec2::from_angle(ctx.entity.heading);
    let mut fields: Vec<DebrisField> =
        link_groups(ctx.targets, ctx.grid, &candidates, DEBRIS_LINK_RADIUS)
            .into_iter()
            .filter(|group| group.len() >= DEBRIS_MIN_POINTS)
            .map(|group| {
                let cluster = Cluster::from_members(ctx, group);
                let to_field = (cluster.centroid - origin).normalize();
                let ahead = heading.dot(to_field) > DEBRIS_AHEAD_COS;
                let mut score = cluster.total_value * (cluster.count() as f32).sqrt();
                if ahead {
                    score *= 1.0 + DEBRIS_AHEAD_BONUS;
                }
                DebrisField { cluster, ahead, score }
            })
            .collect();
    fields.sort_by(|a, b| b.score.total_cmp(&a.score));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::risk::RiskEvaluator;
    use crate::engine::spatial::TargetGrid;
    use crate::engine::world::{ControlledEntity, TargetPoint};

    fn patch(center: Vec2, count: usize, value: f32) -> Vec<TargetPoint> {
        (0..count)
            .map(|i| TargetPoint::new(center + Vec2::new(i as f32 * 15.0, (i % 2) as f32 * 15.0), value))
            .collect()
    }

    fn fields_for(targets: &[TargetPoint], entity: &ControlledEntity) -> Vec<DebrisField> {
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
        find_debris_fields(&ctx)
    }

    #[test]
    fn test_low_value_points_ignored() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets = patch(Vec2::new(300.0, 0.0), 10, 2.0);
        assert!(fields_for(&targets, &entity).is_empty());
    }

    #[test]
    fn test_field_needs_min_points() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let mut targets = patch(Vec2::new(300.0, 0.0), 3, 10.0);
        assert!(fields_for(&targets, &entity).is_empty());
        targets.extend(patch(Vec2::new(345.0, 0.0), 1, 10.0));
        assert_eq!(fields_for(&targets, &entity).len(), 1);
    }

    #[test]
    fn test_ahead_bonus_ranks_first() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let mut targets = patch(Vec2::new(400.0, 0.0), 5, 10.0);
        targets.extend(patch(Vec2::new(-460.0, 0.0), 5, 10.0));
        let fields = fields_for(&targets, &entity);
        assert_eq!(fields.len(), 2);
        assert!(fields[0].ahead);
        assert!(!fields[1].ahead);
        assert!(fields[0].cluster.centroid.x > 0.0);
    }
}
