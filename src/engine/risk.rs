//! Risk/reward evaluator
//!
//! Scores a point in space against the competitors around it and offsets the risk by the
//! value of whatever sits there. Pure: the same snapshot always yields the same score, so
//! callers may evaluate as often as they like (and are responsible for throttling).

use serde::Serialize;

use crate::engine::constants::risk::*;
use crate::engine::world::CompetitorSnapshot;
use crate::util::geometry::remap;
use crate::util::vec2::Vec2;

/// Policy derived from the adjusted risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskDecision {
    Safe,
    Caution,
    Risky,
    Avoid,
}

impl RiskDecision {
    pub fn from_adjusted_risk(adjusted: f32) -> Self {
        if adjusted >= AVOID_THRESHOLD {
            RiskDecision::Avoid
        } else if adjusted >= RISKY_THRESHOLD {
            RiskDecision::Risky
        } else if adjusted >= CAUTION_THRESHOLD {
            RiskDecision::Caution
        } else {
            RiskDecision::Safe
        }
    }

    pub fn allows_boost(self) -> bool {
        self == RiskDecision::Safe
    }

    pub fn allows_fast_approach(self) -> bool {
        matches!(self, RiskDecision::Safe | RiskDecision::Caution)
    }
}

/// Full breakdown of one evaluation, published to the overlay for the active target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// Highest single-competitor danger (unbounded before the crowd clamp)
    pub max_danger: f32,
    pub crowd_count: usize,
    pub crowd_multiplier: f32,
    /// Bounded risk in [0, 1]
    pub risk: f32,
    pub reward: f32,
    /// `risk * bias - reward * (1 - bias)`, clamped to [0, 1]
    pub adjusted_risk: f32,
    pub decision: RiskDecision,
}

impl RiskAssessment {
    pub fn allows_boost(&self) -> bool {
        self.decision.allows_boost()
    }
}

/// Debris-field evaluation with the stricter contested acceptance rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebrisAssessment {
    pub base: RiskAssessment,
    /// Competitors independently heading toward the same field
    pub contest_count: usize,
    pub contested_risk: f32,
    pub value_per_risk: f32,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RiskEvaluator {
    risk_bias: f32,
}

impl Default for RiskEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_RISK_BIAS)
    }
}

impl RiskEvaluator {
    pub fn new(risk_bias: f32) -> Self {
        Self {
            risk_bias: risk_bias.clamp(0.0, 1.0),
        }
    }

    pub fn risk_bias(&self) -> f32 {
        self.risk_bias
    }

    /// Zone-based danger from distance alone
    pub fn base_danger(distance: f32) -> f32 {
        if distance <= CRITICAL_ZONE {
            CRITICAL_DANGER
        } else if distance <= DANGER_ZONE {
            remap(distance, CRITICAL_ZONE, DANGER_ZONE, CRITICAL_DANGER, DANGER_DANGER)
        } else if distance <= CAUTION_ZONE {
            remap(distance, DANGER_ZONE, CAUTION_ZONE, DANGER_DANGER, CAUTION_DANGER)
        } else {
            0.0
        }
    }

    /// Danger one competitor poses to `point`
    pub fn competitor_danger(point: Vec2, competitor: &CompetitorSnapshot) -> f32 {
        let distance = competitor.position.distance_to(point);
        let base = Self::base_danger(distance);
        if base <= 0.0 {
            return 0.0;
        }

        let speed_factor = if competitor.speed > BASELINE_SPEED {
            1.0 + SPEED_FACTOR_SLOPE * (competitor.speed - BASELINE_SPEED) / BASELINE_SPEED
        } else {
            1.0
        };
        let boost_factor = if competitor.boosting { BOOST_MULTIPLIER } else { 1.0 };

        let to_point = point - competitor.position;
        let alignment_cos = if to_point.length_sq() > f32::EPSILON {
            Vec2::from_angle(competitor.heading).dot(to_point.normalize())
        } else {
            1.0
        };
        let alignment_factor = 1.0 + ALIGNMENT_WEIGHT * alignment_cos;

        base * speed_factor * boost_factor * alignment_factor
    }

    /// Reward offset unlocked by a resource of `value`
    pub fn reward_for(value: f32) -> f32 {
        if value <= 0.0 {
            return 0.0;
        }
        REWARD_TIERS
            .iter()
            .find(|(min_value, _)| value >= *min_value)
            .map(|&(_, reward)| reward)
            .unwrap_or(value * REWARD_LINEAR_SLOPE)
    }

    fn crowd_multiplier(count: usize) -> f32 {
        match count {
            0 | 1 => 1.0,
            2 => CROWD_MULTIPLIER_TWO,
            _ => CROWD_MULTIPLIER_THREE,
        }
    }

    /// Score `point` against `competitors`, offset by `resource_value` when given
    pub fn score_point(
        &self,
        point: Vec2,
        resource_value: Option<f32>,
        competitors: &[&CompetitorSnapshot],
    ) -> RiskAssessment {
        let mut max_danger: f32 = 0.0;
        let mut crowd_count = 0;
        for competitor in competitors {
            let danger = Self::competitor_danger(point, competitor);
            if danger > CROWD_FLOOR {
                crowd_count += 1;
            }
            max_danger = max_danger.max(danger);
        }

        let crowd_multiplier = Self::crowd_multiplier(crowd_count);
        let risk = (max_danger * crowd_multiplier).clamp(0.0, 1.0);
        let reward = resource_value.map(Self::reward_for).unwrap_or(0.0);
        let adjusted_risk =
            (risk * self.risk_bias - reward * (1.0 - self.risk_bias)).clamp(0.0, 1.0);

        RiskAssessment {
            max_danger,
            crowd_count,
            crowd_multiplier,
            risk,
            reward,
            adjusted_risk,
            decision: RiskDecision::from_adjusted_risk(adjusted_risk),
        }
    }

    /// Debris fields attract everyone nearby: add a contest penalty per competitor racing
    /// toward the field and demand a minimum value-per-risk before accepting.
    ///
    /// The ratio threshold together with the risk ceiling rejects some trades that would pay
    /// off.
    pub fn assess_debris_field(
        &self,
        center: Vec2,
        total_value: f32,
        competitors: &[&CompetitorSnapshot],
    ) -> DebrisAssessment {
        let base = self.score_point(center, Some(total_value), competitors);

        let contest_count = competitors
            .iter()
            .filter(|c| {
                let to_field = center - c.position;
                let distance = to_field.length();
                distance <= CONTEST_RANGE
                    && distance > f32::EPSILON
                    && Vec2::from_angle(c.heading).dot(to_field * (1.0 / distance))
                        > CONTEST_ALIGNMENT_COS
            })
            .count();

        let contested_risk =
            (base.adjusted_risk + CONTEST_PENALTY * contest_count as f32).clamp(0.0, 1.0);
        let value_per_risk = total_value / contested_risk.max(DEBRIS_RISK_EPSILON);
        let accepted = base.decision != RiskDecision::Avoid
            && contested_risk < DEBRIS_RISK_CEILING
            && value_per_risk >= DEBRIS_MIN_VALUE_PER_RISK;

        DebrisAssessment {
            base,
            contest_count,
            contested_risk,
            value_per_risk,
            accepted,
        }
    }
}
