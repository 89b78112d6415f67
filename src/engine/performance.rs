//! Latency monitoring and movement strategy selection
//!
//! Tracks the host latency signal (frame time or ping) and maps it to a movement strategy:
//! - Turn responsiveness (rate limit and smoothing)
//! - Boost permission
//! - Whether high-priority evasion may turn instantly
//!
//! Body-proximity and boundary-emergency ignore all of this; the arbiter always applies them
//! instantly.

use std::collections::VecDeque;

use serde::Serialize;

/// Samples required before the strategy moves off `Normal`
const MIN_SAMPLES: usize = 10;

/// Movement strategy levels, from fully responsive to most conservative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MovementStrategy {
    /// Low latency, full responsiveness
    #[default]
    Normal,
    /// Noticeable latency, gentler turning
    Cautious,
    /// High latency, prefer straight lines and no boost
    Straight,
    /// Severe latency, minimal steering
    Minimal,
}

/// Steering limits for one strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovementProfile {
    /// Max heading change per tick (radians)
    pub turn_limit: f32,
    /// Exponential smoothing factor toward the chosen heading (0-1)
    pub smoothing: f32,
    pub allow_boost: bool,
    /// High-priority (non-safety) proposals may bypass smoothing
    pub allow_instant_turn: bool,
}

impl MovementStrategy {
    pub fn profile(self) -> MovementProfile {
        match self {
            MovementStrategy::Normal => MovementProfile {
                turn_limit: 0.25,
                smoothing: 0.35,
                allow_boost: true,
                allow_instant_turn: true,
            },
            MovementStrategy::Cautious => MovementProfile {
                turn_limit: 0.18,
                smoothing: 0.25,
                allow_boost: true,
                allow_instant_turn: true,
            },
            MovementStrategy::Straight => MovementProfile {
                turn_limit: 0.10,
                smoothing: 0.15,
                allow_boost: false,
                allow_instant_turn: false,
            },
            MovementStrategy::Minimal => MovementProfile {
                turn_limit: 0.06,
                smoothing: 0.10,
                allow_boost: false,
                allow_instant_turn: false,
            },
        }
    }

    pub fn is_degraded(self) -> bool {
        self != MovementStrategy::Normal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementStrategy::Normal => "normal",
            MovementStrategy::Cautious => "cautious",
            MovementStrategy::Straight => "straight",
            MovementStrategy::Minimal => "minimal",
        }
    }

    /// Numeric level for gauges (0 = normal)
    pub fn level(self) -> u64 {
        self as u64
    }
}

/// Rolling latency window that selects the movement strategy
#[derive(Debug)]
pub struct LatencyMonitor {
    /// Rolling window of latency samples (ms)
    samples: VecDeque<f32>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Average latency below this is normal (ms)
    cautious_threshold: f32,
    /// Average latency at or above this drops to straight-line movement (ms)
    straight_threshold: f32,
    /// Average latency at or above this is minimal steering (ms)
    minimal_threshold: f32,
    strategy: MovementStrategy,
}

impl LatencyMonitor {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            cautious_threshold: 40.0,
            straight_threshold: 80.0,
            minimal_threshold: 150.0,
            strategy: MovementStrategy::Normal,
        }
    }

    /// Record one latency sample; non-finite or negative values are ignored
    pub fn record(&mut self, latency_ms: f32) {
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            return;
        }
        self.samples.push_back(latency_ms);
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
        self.update_strategy();
    }

    fn update_strategy(&mut self) {
        if self.samples.len() < MIN_SAMPLES {
            return;
        }

        let avg = self.average_latency();
        self.strategy = if avg < self.cautious_threshold {
            MovementStrategy::Normal
        } else if avg < self.straight_threshold {
            MovementStrategy::Cautious
        } else if avg < self.minimal_threshold {
            MovementStrategy::Straight
        } else {
            MovementStrategy::Minimal
        };
    }

    pub fn average_latency(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    /// 95th percentile latency
    pub fn p95_latency(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f32> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn strategy(&self) -> MovementStrategy {
        self.strategy
    }

    pub fn profile(&self) -> MovementProfile {
        self.strategy.profile()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn status_message(&self) -> String {
        format!(
            "{} - avg {:.1}ms, p95 {:.1}ms",
            self.strategy.as_str(),
            self.average_latency(),
            self.p95_latency()
        )
    }
}

impl Default for LatencyMonitor {
    fn default() -> Self {
        Self::new(60)
    }
}
