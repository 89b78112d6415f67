//! Trajectory predictor
//!
//! Owns the only multi-tick memory in the engine:
//! - a bounded motion history per competitor identity
//! - a time-decayed aggression record per identity
//!
//! Both maps are mutated exclusively through [`TrajectoryPredictor::observe`] (once per
//! identity per tick) and [`TrajectoryPredictor::mark_aggressive`]. Everything else reads.

use std::collections::VecDeque;

use hashbrown::HashMap;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::debug;

use crate::engine::constants::predictor::*;
use crate::engine::constants::timing::NOMINAL_TICK_MS;
use crate::engine::world::{CompetitorId, CompetitorSnapshot, ControlledEntity, WorldSnapshot};
use crate::util::geometry::{angle_between, angle_delta, predict_linear};
use crate::util::vec2::Vec2;

// ============================================================================
// History
// ============================================================================

/// One observation of a competitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub position: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub boosting: bool,
    pub timestamp_ms: u64,
}

impl MotionSample {
    fn from_snapshot(snapshot: &CompetitorSnapshot, timestamp_ms: u64) -> Self {
        Self {
            position: snapshot.position,
            heading: snapshot.heading,
            speed: snapshot.speed,
            boosting: snapshot.boosting,
            timestamp_ms,
        }
    }
}

/// Bounded ring buffer of recent samples for one identity
#[derive(Debug, Clone)]
pub struct CompetitorHistory {
    samples: VecDeque<MotionSample>,
    last_seen_ms: u64,
}

impl CompetitorHistory {
    fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_CAPACITY),
            last_seen_ms: 0,
        }
    }

    fn push(&mut self, sample: MotionSample) {
        // A second sample for the same timestamp replaces the first
        if self.samples.back().is_some_and(|s| s.timestamp_ms == sample.timestamp_ms) {
            self.samples.pop_back();
        }
        self.samples.push_back(sample);
        self.last_seen_ms = sample.timestamp_ms;

        let cutoff = sample.timestamp_ms.saturating_sub(HISTORY_HORIZON_MS);
        while self.samples.front().is_some_and(|s| s.timestamp_ms < cutoff) {
            self.samples.pop_front();
        }
        while self.samples.len() > HISTORY_CAPACITY {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&MotionSample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&MotionSample> {
        self.samples.front()
    }

    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    pub fn samples(&self) -> impl Iterator<Item = &MotionSample> {
        self.samples.iter()
    }
}

// ============================================================================
// Aggression memory
// ============================================================================

/// Why a competitor was flagged hostile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AggressionReason {
    Attacking,
    Intercepting,
    BoostingClose,
    Squeezing,
}

/// Durable hostility memory for one identity
#[derive(Debug, Clone)]
pub struct AggressionRecord {
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
    pub max_threat: f32,
    pub reasons: SmallVec<[AggressionReason; 4]>,
}

impl AggressionRecord {
    /// Linear decay from `max_threat` at last-seen to zero at last-seen + timeout
    pub fn level_at(&self, now_ms: u64) -> f32 {
        let elapsed = now_ms.saturating_sub(self.last_seen_ms) as f32;
        let remaining = 1.0 - elapsed / AGGRESSION_TIMEOUT_MS as f32;
        (self.max_threat * remaining).max(0.0)
    }
}

// ============================================================================
// Prediction & intent
// ============================================================================

/// Forecast position with confidence in [CONFIDENCE_FLOOR, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub position: Vec2,
    pub heading: f32,
    pub confidence: f32,
}

/// Coarse classification of what a competitor is doing relative to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Intent {
    Attacking,
    Intercepting,
    Chasing,
    Converging,
    Circling,
    Fleeing,
    Wandering,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntentAssessment {
    pub intent: Intent,
    /// 0-1
    pub threat: f32,
    pub distance: f32,
    pub closing: bool,
}

impl IntentAssessment {
    pub const BENIGN: IntentAssessment = IntentAssessment {
        intent: Intent::Wandering,
        threat: 0.0,
        distance: f32::INFINITY,
        closing: false,
    };

    pub fn is_hostile(&self) -> bool {
        matches!(self.intent, Intent::Attacking | Intent::Intercepting)
    }
}

#[inline]
fn confidence_for(frames: u32) -> f32 {
    (1.0 - CONFIDENCE_DECAY_PER_FRAME * frames as f32).max(CONFIDENCE_FLOOR)
}

// ============================================================================
// Predictor
// ============================================================================

/// Identity-keyed history and aggression store
#[derive(Debug, Default)]
pub struct TrajectoryPredictor {
    histories: HashMap<CompetitorId, CompetitorHistory>,
    aggression: HashMap<CompetitorId, AggressionRecord>,
    /// Intent classification computed during the current tick's observe pass
    intents: HashMap<CompetitorId, IntentAssessment>,
    now_ms: u64,
}

impl TrajectoryPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the predictor clock forward. Time never goes backwards.
    pub fn advance_to(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Per-tick update: record samples for every competitor inside `tracking_radius`,
    /// classify intent, flag hostile competitors and evict stale records.
    ///
    /// Returns the number of competitors tracked this tick.
    pub fn observe(
        &mut self,
        world: &WorldSnapshot,
        entity: &ControlledEntity,
        tracking_radius: f32,
    ) -> usize {
        self.advance_to(world.timestamp_ms);
        self.intents.clear();

        let radius_sq = tracking_radius * tracking_radius;
        let mut tracked: SmallVec<[CompetitorId; 32]> = SmallVec::new();
        for competitor in &world.competitors {
            if entity.position.distance_sq_to(competitor.position) > radius_sq {
                continue;
            }
            self.record_sample(competitor, self.now_ms);
            tracked.push(competitor.id);
        }

        for &id in &tracked {
            let assessment = self.classify_intent(id, entity);
            let latest_boosting = self
                .histories
                .get(&id)
                .and_then(|h| h.latest())
                .is_some_and(|s| s.boosting);

            let reason = match assessment.intent {
                Intent::Attacking => Some(AggressionReason::Attacking),
                Intent::Intercepting => Some(AggressionReason::Intercepting),
                _ if latest_boosting
                    && assessment.closing
                    && assessment.distance < HOSTILE_BOOST_RANGE =>
                {
                    Some(AggressionReason::BoostingClose)
                }
                _ => None,
            };
            if let Some(reason) = reason {
                self.mark_aggressive(id, reason, assessment.threat);
            }
            self.intents.insert(id, assessment);
        }

        self.evict(self.now_ms);
        tracked.len()
    }

    /// Append a sample to the identity's history, evicting samples past the horizon
    pub fn record_sample(&mut self, snapshot: &CompetitorSnapshot, timestamp_ms: u64) {
        self.histories
            .entry(snapshot.id)
            .or_insert_with(CompetitorHistory::new)
            .push(MotionSample::from_snapshot(snapshot, timestamp_ms));
    }

    /// Drop silent histories and fully decayed aggression records
    pub fn evict(&mut self, now_ms: u64) {
        let before = self.histories.len();
        self.histories
            .retain(|_, h| now_ms.saturating_sub(h.last_seen_ms) < HISTORY_SILENCE_TIMEOUT_MS);
        self.aggression.retain(|_, r| r.level_at(now_ms) > 0.0);

        let evicted = before - self.histories.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.histories.len(), "Evicted silent competitor histories");
        }
    }

    pub fn history(&self, id: CompetitorId) -> Option<&CompetitorHistory> {
        self.histories.get(&id)
    }

    pub fn tracked_count(&self) -> usize {
        self.histories.len()
    }

    /// Intent computed for `id` during this tick's observe pass
    pub fn intent(&self, id: CompetitorId) -> IntentAssessment {
        self.intents.get(&id).copied().unwrap_or(IntentAssessment::BENIGN)
    }

    /// Mean angular change per tick over the most recent samples (0 with fewer than 3)
    pub fn estimate_turn_rate(&self, id: CompetitorId) -> f32 {
        let Some(history) = self.histories.get(&id) else {
            return 0.0;
        };
        if history.len() < MIN_TURN_SAMPLES {
            return 0.0;
        }

        let skip = history.len().saturating_sub(TURN_RATE_WINDOW);
        let mut total_turn = 0.0;
        let mut total_ticks = 0.0;
        let mut prev: Option<&MotionSample> = None;
        for sample in history.samples().skip(skip) {
            if let Some(p) = prev {
                let dt_ticks = sample.timestamp_ms.saturating_sub(p.timestamp_ms) as f32 / NOMINAL_TICK_MS;
                if dt_ticks > 0.0 {
                    total_turn += angle_delta(p.heading, sample.heading);
                    total_ticks += dt_ticks;
                }
            }
            prev = Some(sample);
        }

        if total_ticks > 0.0 {
            total_turn / total_ticks
        } else {
            0.0
        }
    }

    /// Integrate the last known motion forward `frames_ahead` ticks
    pub fn predict(&self, id: CompetitorId, frames_ahead: u32) -> Option<Prediction> {
        let latest = *self.histories.get(&id)?.latest()?;
        let turn_rate = self.estimate_turn_rate(id);
        Some(Self::integrate(latest.position, latest.heading, latest.speed, turn_rate, frames_ahead))
    }

    /// Forecast from history when available, otherwise straight-line from the snapshot
    pub fn predict_snapshot(&self, snapshot: &CompetitorSnapshot, frames_ahead: u32) -> Prediction {
        self.predict(snapshot.id, frames_ahead).unwrap_or_else(|| Prediction {
            position: predict_linear(snapshot.position, snapshot.heading, snapshot.speed, frames_ahead as f32),
            heading: snapshot.heading,
            confidence: confidence_for(frames_ahead),
        })
    }

    fn integrate(position: Vec2, heading: f32, speed: f32, turn_rate: f32, frames: u32) -> Prediction {
        let mut position = position;
        let mut heading = heading;
        for _ in 0..frames {
            heading += turn_rate;
            position += Vec2::from_angle(heading) * speed;
        }
        Prediction {
            position,
            heading,
            confidence: confidence_for(frames),
        }
    }

    /// Classify what `id` is doing relative to the controlled entity
    pub fn classify_intent(&self, id: CompetitorId, entity: &ControlledEntity) -> IntentAssessment {
        let Some(history) = self.histories.get(&id) else {
            return IntentAssessment::BENIGN;
        };
        let Some(latest) = history.latest() else {
            return IntentAssessment::BENIGN;
        };
        if latest.speed <= 0.0 && history.len() < 2 {
            return IntentAssessment::BENIGN;
        }

        let distance = latest.position.distance_to(entity.position);
        let alignment = angle_between(latest.heading, latest.position.bearing_to(entity.position));

        let forecast = match self.predict(id, CLOSING_LOOKAHEAD_FRAMES) {
            Some(p) => p,
            None => return IntentAssessment::BENIGN,
        };
        let entity_future = predict_linear(
            entity.position,
            entity.heading,
            entity.speed,
            CLOSING_LOOKAHEAD_FRAMES as f32,
        );
        let future_distance = forecast.position.distance_to(entity_future);
        let closing = future_distance < distance - CLOSING_EPSILON;
        let departing = future_distance > distance + CLOSING_EPSILON;
        let intercept_alignment = angle_between(latest.heading, latest.position.bearing_to(entity_future));
        let turn_rate = self.estimate_turn_rate(id);

        let mut threat = 0.0;
        if closing {
            threat += THREAT_CLOSING;
        }
        if latest.boosting {
            threat += THREAT_BOOSTING;
        }
        if alignment < TIGHT_ALIGNMENT {
            threat += THREAT_ALIGNED;
        }
        threat += (1.0 - distance / PROXIMITY_THREAT_RANGE).clamp(0.0, 1.0) * THREAT_PROXIMITY;

        let intent = if closing && alignment < TIGHT_ALIGNMENT && distance < ATTACK_RANGE {
            Intent::Attacking
        } else if closing && alignment >= TIGHT_ALIGNMENT && intercept_alignment < INTERCEPT_ALIGNMENT {
            Intent::Intercepting
        } else if closing && alignment < TIGHT_ALIGNMENT {
            Intent::Chasing
        } else if closing && alignment < LOOSE_ALIGNMENT {
            Intent::Converging
        } else if turn_rate.abs() > CIRCLING_TURN_RATE && distance < CIRCLING_RANGE {
            threat += THREAT_CIRCLING;
            Intent::Circling
        } else if departing && alignment > DEPARTING_ALIGNMENT {
            Intent::Fleeing
        } else {
            Intent::Wandering
        };

        if departing {
            threat *= DEPARTING_FACTOR;
        }

        IntentAssessment {
            intent,
            threat: self.apply_aggression(id, threat).clamp(0.0, 1.0),
            distance,
            closing,
        }
    }

    /// Floor-and-add: a remembered hostile is never scored fully benign
    fn apply_aggression(&self, id: CompetitorId, threat: f32) -> f32 {
        let level = self.aggression_level(id);
        if level <= 0.0 {
            return threat;
        }
        let floored = threat.max(AGGRESSION_FLOOR_FACTOR * level);
        (floored + AGGRESSION_BONUS).min(1.0)
    }

    /// Create or refresh the aggression record for `id`
    pub fn mark_aggressive(&mut self, id: CompetitorId, reason: AggressionReason, threat: f32) {
        let now = self.now_ms;
        let record = self.aggression.entry(id).or_insert_with(|| {
            debug!(competitor = id, ?reason, threat, "Competitor flagged hostile");
            AggressionRecord {
                first_seen_ms: now,
                last_seen_ms: now,
                max_threat: 0.0,
                reasons: SmallVec::new(),
            }
        });
        record.last_seen_ms = now;
        record.max_threat = record.max_threat.max(threat.clamp(0.0, 1.0));
        if !record.reasons.contains(&reason) {
            record.reasons.push(reason);
        }
    }

    pub fn is_aggressive(&self, id: CompetitorId) -> bool {
        self.aggression_level(id) > 0.0
    }

    /// Current decayed aggression level in [0, 1]
    pub fn aggression_level(&self, id: CompetitorId) -> f32 {
        self.aggression
            .get(&id)
            .map(|r| r.level_at(self.now_ms))
            .unwrap_or(0.0)
    }

    pub fn aggression_record(&self, id: CompetitorId) -> Option<&AggressionRecord> {
        self.aggression.get(&id)
    }

    pub fn aggressive_count(&self) -> usize {
        self.aggression.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn snap(id: CompetitorId, x: f32, y: f32, heading: f32, speed: f32) -> CompetitorSnapshot {
        CompetitorSnapshot::new(id, Vec2::new(x, y), heading, speed)
    }

    fn entity_at_origin() -> ControlledEntity {
        ControlledEntity::new(Vec2::ZERO, 0.0, 0.0)
    }

    #[test]
    fn test_record_sample_evicts_past_horizon() {
        let mut p = TrajectoryPredictor::new();
        for i in 0..=30u64 {
            p.record_sample(&snap(1, i as f32, 0.0, 0.0, 1.0), i * 100);
        }
        let history = p.history(1).unwrap();
        let oldest = history.oldest().unwrap().timestamp_ms;
        assert!(oldest >= 3000 - HISTORY_HORIZON_MS);
        assert!(history.len() <= HISTORY_CAPACITY);
        assert_eq!(history.latest().unwrap().timestamp_ms, 3000);
    }

    #[test]
    fn test_record_sample_capacity() {
        let mut p = TrajectoryPredictor::new();
        for i in 0..100u64 {
            p.record_sample(&snap(1, 0.0, 0.0, 0.0, 1.0), i * 10);
        }
        assert_eq!(p.history(1).unwrap().len(), HISTORY_CAPACITY);
    }

    #[test]
    fn test_turn_rate_requires_three_samples() {
        let mut p = TrajectoryPredictor::new();
        p.record_sample(&snap(1, 0.0, 0.0, 0.0, 1.0), 0);
        p.record_sample(&snap(1, 0.0, 0.0, 0.5, 1.0), 100);
        assert_eq!(p.estimate_turn_rate(1), 0.0);
        assert_eq!(p.estimate_turn_rate(99), 0.0);
    }

    #[test]
    fn test_turn_rate_estimate() {
        let mut p = TrajectoryPredictor::new();
        // 100ms = 6 nominal ticks, 0.3 rad per sample -> 0.05 rad/tick
        for i in 0..5u64 {
            p.record_sample(&snap(1, 0.0, 0.0, 0.3 * i as f32, 1.0), i * 100);
        }
        assert!((p.estimate_turn_rate(1) - 0.05).abs() < 1e-3);
    }

    #[test]
    fn test_turn_rate_across_wrap() {
        let mut p = TrajectoryPredictor::new();
        let headings = [PI - 0.2, PI - 0.1, -PI + 0.0001, -PI + 0.1];
        for (i, h) in headings.iter().enumerate() {
            p.record_sample(&snap(1, 0.0, 0.0, *h, 1.0), i as u64 * 100);
        }
        assert!(p.estimate_turn_rate(1) > 0.0);
    }

    #[test]
    fn test_predict_straight_line() {
        let mut p = TrajectoryPredictor::new();
        p.record_sample(&snap(1, 0.0, 0.0, 0.0, 5.0), 0);
        let pred = p.predict(1, 10).unwrap();
        assert!(pred.position.approx_eq(Vec2::new(50.0, 0.0), 1e-3));
        assert!((pred.confidence - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_confidence_floor() {
        let mut p = TrajectoryPredictor::new();
        p.record_sample(&snap(1, 0.0, 0.0, 0.0, 5.0), 0);
        let near = p.predict(1, 5).unwrap().confidence;
        let far = p.predict(1, 200).unwrap().confidence;
        assert!(near > far);
        assert_eq!(far, CONFIDENCE_FLOOR);
    }

    #[test]
    fn test_predict_snapshot_without_history() {
        let p = TrajectoryPredictor::new();
        let pred = p.predict_snapshot(&snap(5, 10.0, 0.0, PI / 2.0, 2.0), 5);
        assert!(pred.position.approx_eq(Vec2::new(10.0, 10.0), 1e-3));
        assert!(p.predict(5, 5).is_none());
    }

    #[test]
    fn test_unknown_identity_is_benign() {
        let p = TrajectoryPredictor::new();
        let a = p.classify_intent(42, &entity_at_origin());
        assert_eq!(a.intent, Intent::Wandering);
        assert_eq!(a.threat, 0.0);
    }

    #[test]
    fn test_classify_attacking() {
        let mut p = TrajectoryPredictor::new();
        p.record_sample(&snap(1, 170.0, 0.0, PI, 8.0), 0);
        p.record_sample(&snap(1, 150.0, 0.0, PI, 8.0), 100);
        p.advance_to(100);

        let a = p.classify_intent(1, &entity_at_origin());
        assert_eq!(a.intent, Intent::Attacking);
        assert!(a.closing);
        assert!(a.threat > 0.6, "threat {}", a.threat);
    }

    #[test]
    fn test_classify_fleeing_reduces_threat() {
        let mut p = TrajectoryPredictor::new();
        p.record_sample(&snap(1, 130.0, 0.0, 0.0, 8.0), 0);
        p.record_sample(&snap(1, 150.0, 0.0, 0.0, 8.0), 100);
        p.advance_to(100);

        let a = p.classify_intent(1, &entity_at_origin());
        assert_eq!(a.intent, Intent::Fleeing);
        assert!(!a.closing);
        assert!(a.threat < 0.1);
    }

    #[test]
    fn test_aggression_floor_and_add() {
        let mut p = TrajectoryPredictor::new();
        p.record_sample(&snap(1, 130.0, 0.0, 0.0, 8.0), 0);
        p.record_sample(&snap(1, 150.0, 0.0, 0.0, 8.0), 100);
        p.advance_to(100);
        p.mark_aggressive(1, AggressionReason::Attacking, 1.0);

        assert!(p.is_aggressive(1));
        let a = p.classify_intent(1, &entity_at_origin());
        assert!((a.threat - 0.9).abs() < 1e-4, "threat {}", a.threat);
    }

    #[test]
    fn test_aggression_decays_and_purges() {
        let mut p = TrajectoryPredictor::new();
        p.advance_to(1_000);
        p.mark_aggressive(7, AggressionReason::BoostingClose, 0.8);
        p.mark_aggressive(7, AggressionReason::BoostingClose, 0.5);
        assert_eq!(p.aggression_record(7).unwrap().reasons.len(), 1);
        assert!((p.aggression_level(7) - 0.8).abs() < 1e-6);

        p.advance_to(1_000 + AGGRESSION_TIMEOUT_MS / 2);
        assert!((p.aggression_level(7) - 0.4).abs() < 1e-4);

        p.advance_to(1_000 + AGGRESSION_TIMEOUT_MS);
        assert!(!p.is_aggressive(7));
        p.evict(p.now_ms());
        assert!(p.aggression_record(7).is_none());
    }

    #[test]
    fn test_observe_marks_boosting_attacker() {
        let mut p = TrajectoryPredictor::new();
        let entity = entity_at_origin();
        for (i, x) in [190.0, 170.0, 150.0].iter().enumerate() {
            let world = WorldSnapshot {
                competitors: vec![snap(3, *x, 0.0, PI, 10.0).boosting(true)],
                timestamp_ms: i as u64 * 100,
                ..Default::default()
            };
            assert_eq!(p.observe(&world, &entity, 1000.0), 1);
        }
        assert!(p.is_aggressive(3));
        assert_eq!(p.intent(3).intent, Intent::Attacking);
        assert_eq!(p.intent(99).intent, Intent::Wandering);
    }

    #[test]
    fn test_observe_ignores_far_and_evicts_silent() {
        let mut p = TrajectoryPredictor::new();
        let entity = entity_at_origin();
        let world = WorldSnapshot {
            competitors: vec![snap(1, 100.0, 0.0, 0.0, 1.0), snap(2, 5000.0, 0.0, 0.0, 1.0)],
            timestamp_ms: 0,
            ..Default::default()
        };
        assert_eq!(p.observe(&world, &entity, 1000.0), 1);
        assert!(p.history(2).is_none());

        let empty = WorldSnapshot {
            timestamp_ms: HISTORY_SILENCE_TIMEOUT_MS + 1,
            ..Default::default()
        };
        p.observe(&empty, &entity, 1000.0);
        assert_eq!(p.tracked_count(), 0);
    }
}
