//! Evasion geometry engine
//!
//! Builds one danger ring per nearby competitor, projects the rings onto blocked angular
//! arcs around the controlled entity, merges them, and derives the safe gaps between.
//! Candidate escape headings are scored by sampling points along the ray.
//!
//! The engine is a pure function of the current tick's snapshot. The only thing it keeps
//! between calls is the last computed [`EvasionState`], for read-only overlay inspection.

use std::f32::consts::TAU;

use serde::Serialize;

use crate::engine::constants::evasion::*;
use crate::engine::nearby::NearbyCompetitors;
use crate::engine::predictor::TrajectoryPredictor;
use crate::engine::world::{CompetitorId, ControlledEntity};
use crate::util::geometry::{angle_in_range, normalize_angle, wrap_positive};
use crate::util::vec2::Vec2;

// ============================================================================
// Arcs
// ============================================================================

/// Counter-clockwise arc: `start` in [0, TAU), `span` in (0, TAU]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngularArc {
    pub start: f32,
    pub span: f32,
}

impl AngularArc {
    pub const FULL: AngularArc = AngularArc { start: 0.0, span: TAU };

    pub fn new(start: f32, span: f32) -> Self {
        Self {
            start: wrap_positive(start),
            span: span.clamp(0.0, TAU),
        }
    }

    /// Arc of `width` centered on `center`
    pub fn centered(center: f32, width: f32) -> Self {
        Self::new(center - width * 0.5, width)
    }

    /// Unwrapped end angle; may exceed TAU for arcs crossing zero
    #[inline]
    pub fn end(&self) -> f32 {
        self.start + self.span
    }

    /// Mid-arc heading, normalized to (-PI, PI]
    pub fn center(&self) -> f32 {
        normalize_angle(self.start + self.span * 0.5)
    }

    pub fn is_full(&self) -> bool {
        self.span >= TAU - 1e-6
    }

    pub fn contains(&self, angle: f32) -> bool {
        angle_in_range(angle, self.start, self.span)
    }
}

/// Merge overlapping arcs (wrap-aware) into disjoint blocked segments sorted by start
pub fn merge_arcs(arcs: impl IntoIterator<Item = AngularArc>) -> Vec<AngularArc> {
    let mut arcs: Vec<AngularArc> = arcs.into_iter().filter(|a| a.span > 0.0).collect();
    if arcs.is_empty() {
        return Vec::new();
    }
    if arcs.iter().any(|a| a.is_full()) {
        return vec![AngularArc::FULL];
    }
    arcs.sort_by(|a, b| a.start.total_cmp(&b.start));

    // (start, unwrapped end)
    let mut merged: Vec<(f32, f32)> = Vec::with_capacity(arcs.len());
    for arc in arcs {
        match merged.last_mut() {
            Some(last) if arc.start <= last.1 => last.1 = last.1.max(arc.end()),
            _ => merged.push((arc.start, arc.end())),
        }
    }

    // The last segment may run past TAU into the first ones
    while merged.len() > 1 {
        let last_end = merged[merged.len() - 1].1;
        let (first_start, first_end) = merged[0];
        if last_end - TAU < first_start {
            break;
        }
        let last_idx = merged.len() - 1;
        merged[last_idx].1 = last_end.max(first_end + TAU);
        merged.remove(0);
    }

    merged
        .into_iter()
        .map(|(start, end)| {
            if end - start >= TAU {
                AngularArc::FULL
            } else {
                AngularArc::new(start, end - start)
            }
        })
        .collect()
}

/// Complement of merged blocked segments on the full circle, dropping gaps narrower than
/// `min_width`. A `min_width` of 0 gives the exact complement.
pub fn compute_gaps(blocked: &[AngularArc], min_width: f32) -> Vec<AngularArc> {
    if blocked.is_empty() {
        return vec![AngularArc::FULL];
    }
    if blocked.iter().any(|a| a.is_full()) {
        return Vec::new();
    }

    let mut sorted = blocked.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut gaps = Vec::with_capacity(sorted.len());
    for (i, arc) in sorted.iter().enumerate() {
        let gap_start = arc.end();
        let next_start = match sorted.get(i + 1) {
            Some(next) => next.start,
            None => sorted[0].start + TAU,
        };
        let span = next_start - gap_start;
        if span > 1e-6 && span >= min_width {
            gaps.push(AngularArc::new(gap_start, span));
        }
    }
    gaps
}

/// Total angular measure of a set of arcs
pub fn total_span(arcs: &[AngularArc]) -> f32 {
    arcs.iter().map(|a| a.span).sum()
}

// ============================================================================
// Danger rings
// ============================================================================

/// Ring radius for a competitor at `distance`. Non-increasing in distance; boosting,
/// hostility and speed only scale it up.
pub fn ring_radius(distance: f32, speed: f32, boosting: bool, hostile: bool) -> f32 {
    let band = RING_DISTANCE_BANDS
        .iter()
        .find(|(limit, _)| distance < *limit)
        .map(|&(_, factor)| factor)
        .unwrap_or(1.0);

    let mut radius = RING_BASE_RADIUS * band;
    if boosting {
        radius *= RING_BOOST_FACTOR;
    }
    if hostile {
        radius *= RING_HOSTILE_FACTOR;
    }
    radius *= (speed / RING_BASE_SPEED).clamp(1.0, RING_MAX_SPEED_FACTOR);
    radius.min(RING_MAX_RADIUS)
}

/// Per-tick exclusion zone around one competitor
#[derive(Debug, Clone, Serialize)]
pub struct DangerRing {
    pub competitor_id: CompetitorId,
    pub center: Vec2,
    pub radius: f32,
    pub bearing: f32,
    pub distance: f32,
    pub arc: AngularArc,
    /// 0-1
    pub threat: f32,
    pub hostile: bool,
    pub boosting: bool,
    /// Forecast owner position at each ray sample distance, with confidence
    #[serde(skip)]
    pub predicted: [(Vec2, f32); RAY_SAMPLES.len()],
}

/// Rings, blocked segments and gaps computed for one tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvasionState {
    pub origin: Vec2,
    pub entity_speed: f32,
    pub rings: Vec<DangerRing>,
    pub blocked: Vec<AngularArc>,
    pub gaps: Vec<AngularArc>,
    /// Threat-weighted center of all rings
    pub threat_centroid: Option<Vec2>,
}

impl EvasionState {
    pub fn largest_gap(&self) -> Option<&AngularArc> {
        self.gaps.iter().max_by(|a, b| a.span.total_cmp(&b.span))
    }

    pub fn max_threat(&self) -> f32 {
        self.rings.iter().map(|r| r.threat).fold(0.0, f32::max)
    }

    /// Heading pointing directly away from the threat centroid
    pub fn away_from_threats(&self) -> Option<f32> {
        let centroid = self.threat_centroid?;
        let away = self.origin - centroid;
        (away.length_sq() > f32::EPSILON).then(|| away.angle())
    }
}

/// Where an escape heading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EscapeSource {
    Preferred,
    Gap,
    Sampled,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EscapeChoice {
    pub heading: f32,
    pub score: f32,
    pub source: EscapeSource,
}

/// Builds and caches the evasion geometry for each tick
#[derive(Debug, Default)]
pub struct EvasionEngine {
    state: EvasionState,
}

impl EvasionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last computed geometry
    pub fn state(&self) -> &EvasionState {
        &self.state
    }

    /// Rebuild rings, blocked segments and gaps for this tick
    pub fn rebuild(
        &mut self,
        entity: &ControlledEntity,
        nearby: &NearbyCompetitors<'_>,
        predictor: &TrajectoryPredictor,
    ) -> &EvasionState {
        let speed = entity.speed.max(MIN_ENTITY_SPEED);
        let frames: [u32; RAY_SAMPLES.len()] =
            std::array::from_fn(|i| (RAY_SAMPLES[i] / speed).round().min(120.0) as u32);

        let rings: Vec<DangerRing> = nearby
            .within(RING_SCAN_RADIUS)
            .map(|c| {
                let snapshot = c.snapshot;
                let intent = predictor.intent(snapshot.id);
                let aggression = predictor.aggression_level(snapshot.id);
                let hostile = intent.is_hostile() || aggression > HOSTILE_LEVEL;
                let radius = ring_radius(c.distance, snapshot.speed, snapshot.boosting, hostile);
                let width = 2.0 * (radius / c.distance.max(1.0)).atan();
                let proximity = 1.0 - c.distance / RING_SCAN_RADIUS;
                let predicted = std::array::from_fn(|i| {
                    let p = predictor.predict_snapshot(snapshot, frames[i]);
                    (p.position, p.confidence)
                });

                DangerRing {
                    competitor_id: snapshot.id,
                    center: snapshot.position,
                    radius,
                    bearing: c.bearing,
                    distance: c.distance,
                    arc: AngularArc::centered(c.bearing, width),
                    threat: intent.threat.max(aggression).max(proximity).clamp(0.0, 1.0),
                    hostile,
                    boosting: snapshot.boosting,
                    predicted,
                }
            })
            .collect();

        let blocked = merge_arcs(rings.iter().map(|r| r.arc));
        let gaps = compute_gaps(&blocked, MIN_GAP_WIDTH);

        let weight_total: f32 = rings.iter().map(|r| r.threat + 0.1).sum();
        let threat_centroid = (!rings.is_empty()).then(|| {
            rings.iter().map(|r| r.center * (r.threat + 0.1)).sum::<Vec2>() * (1.0 / weight_total)
        });

        self.state = EvasionState {
            origin: entity.position,
            entity_speed: speed,
            rings,
            blocked,
            gaps,
            threat_centroid,
        };
        &self.state
    }

    /// Score a heading against the cached rings; 1 = fully clear
    pub fn score_direction(&self, heading: f32) -> f32 {
        score_direction(heading, &self.state)
    }

    /// Best escape heading against the cached rings and gaps
    pub fn best_escape(&self, preferred: f32) -> EscapeChoice {
        best_escape(preferred, &self.state)
    }
}

/// Sample points along `heading` and penalize proximity to rings and to their owners'
/// predicted positions. Clamped to [0, 1].
pub fn score_direction(heading: f32, state: &EvasionState) -> f32 {
    let dir = Vec2::from_angle(heading);
    if state.rings.is_empty() {
        return 1.0;
    }

    let mut penalty = 0.0;
    let mut weight_total = 0.0;
    for (i, &distance) in RAY_SAMPLES.iter().enumerate() {
        let sample = state.origin + dir * distance;
        let weight = 1.0 - i as f32 * SAMPLE_WEIGHT_STEP;
        weight_total += weight;

        for ring in &state.rings {
            let d = sample.distance_to(ring.center);
            let mut p = if d < ring.radius {
                PENALTY_INSIDE
            } else if d < ring.radius * BAND_HEAVY {
                PENALTY_HEAVY
            } else if d < ring.radius * BAND_MEDIUM {
                PENALTY_MEDIUM
            } else if d < ring.radius * BAND_LIGHT {
                PENALTY_LIGHT
            } else {
                0.0
            };
            if ring.hostile || ring.boosting {
                p *= HOSTILE_PENALTY_FACTOR;
            }

            let (predicted, confidence) = ring.predicted[i];
            if predicted.distance_to(sample) < ring.radius {
                p += PREDICTED_PENALTY * confidence;
            }
            penalty += p * weight;
        }
    }

    let mut score = 1.0 - penalty / weight_total;
    if let Some(away) = state.away_from_threats() {
        let alignment = dir.dot(Vec2::from_angle(away));
        if alignment > 0.0 {
            score += AWAY_BONUS * alignment;
        }
    }
    score.clamp(0.0, 1.0)
}

/// Pick the escape heading: preferred, largest gap center, or one of 16 uniform headings.
/// The preferred heading wins whenever it scores within 80% of the best.
pub fn best_escape(preferred: f32, state: &EvasionState) -> EscapeChoice {
    let preferred = normalize_angle(preferred);
    let preferred_score = score_direction(preferred, state);

    let mut best = EscapeChoice {
        heading: preferred,
        score: preferred_score,
        source: EscapeSource::Preferred,
    };

    if let Some(gap) = state.largest_gap() {
        let heading = gap.center();
        let score = score_direction(heading, state);
        if score > best.score {
            best = EscapeChoice { heading, score, source: EscapeSource::Gap };
        }
    }

    for i in 0..ESCAPE_CANDIDATES {
        let heading = normalize_angle(i as f32 * TAU / ESCAPE_CANDIDATES as f32);
        let score = score_direction(heading, state);
        if score > best.score {
            best = EscapeChoice { heading, score, source: EscapeSource::Sampled };
        }
    }

    if best.score < ESCAPE_SCORE_FLOOR {
        let heading = state.away_from_threats().unwrap_or(preferred);
        return EscapeChoice {
            heading,
            score: score_direction(heading, state),
            source: EscapeSource::Fallback,
        };
    }

    if preferred_score >= PREFERRED_KEEP_RATIO * best.score {
        return EscapeChoice {
            heading: preferred,
            score: preferred_score,
            source: EscapeSource::Preferred,
        };
    }
    best
}
