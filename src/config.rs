use thiserror::Error;

use crate::engine::constants::{arbiter, risk, targeting, timing};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within {min}-{max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Engine and demo configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Weight toward safety in the adjusted risk (0.5-1)
    pub risk_bias: f32,
    /// Competitors beyond this radius are not tracked
    pub tracking_radius: f32,
    /// Target selection scan radius
    pub scan_radius: f32,
    /// Proposals at or above this priority skip smoothing
    pub instant_turn_priority: u16,
    /// Consecutive error ticks before telemetry reports degraded
    pub degraded_error_ticks: u32,
    /// Seed for erratic jitter
    pub jitter_seed: u64,
    /// Simulated world: number of competitors
    pub sim_competitors: usize,
    /// Simulated world: number of target points
    pub sim_targets: usize,
    /// Simulated world seed
    pub sim_seed: u64,
    /// Demo loop tick rate (Hz)
    pub tick_rate: u32,
    /// Seconds between stats log lines
    pub stats_interval_secs: u64,
    /// Port for the metrics endpoint, `None` to disable
    pub metrics_port: Option<u16>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_bias: risk::DEFAULT_RISK_BIAS,
            tracking_radius: 1_500.0,
            scan_radius: targeting::SCAN_RADIUS,
            instant_turn_priority: arbiter::INSTANT_TURN_PRIORITY,
            degraded_error_ticks: arbiter::DEGRADED_ERROR_TICKS,
            jitter_seed: 0x5eed,
            sim_competitors: 12,
            sim_targets: 400,
            sim_seed: 42,
            tick_rate: timing::DEFAULT_TICK_RATE,
            stats_interval_secs: 5,
            metrics_port: None,
        }
    }
}

/// Parse `key` into `slot` when set; invalid or out-of-range values warn and keep the default
fn load_var<T>(key: &str, slot: &mut T, valid: impl Fn(&T) -> bool)
where
    T: std::str::FromStr,
{
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(parsed) if valid(&parsed) => *slot = parsed,
        Ok(_) => tracing::warn!("{} '{}' out of range, using default", key, raw),
        Err(_) => tracing::warn!("Invalid {} '{}', using default", key, raw),
    }
}

impl EngineConfig {
    /// Load config from `SENTINEL_*` environment variables or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        load_var("SENTINEL_RISK_BIAS", &mut config.risk_bias, |v| (0.5..=1.0).contains(v));
        load_var("SENTINEL_TRACKING_RADIUS", &mut config.tracking_radius, |v| *v > 0.0);
        load_var("SENTINEL_SCAN_RADIUS", &mut config.scan_radius, |v| *v > 0.0);
        load_var("SENTINEL_INSTANT_TURN_PRIORITY", &mut config.instant_turn_priority, |v| *v > 0);
        load_var("SENTINEL_DEGRADED_ERROR_TICKS", &mut config.degraded_error_ticks, |v| *v > 0);
        load_var("SENTINEL_JITTER_SEED", &mut config.jitter_seed, |_| true);
        load_var("SENTINEL_SIM_COMPETITORS", &mut config.sim_competitors, |v| *v <= 500);
        load_var("SENTINEL_SIM_TARGETS", &mut config.sim_targets, |v| *v <= 20_000);
        load_var("SENTINEL_SIM_SEED", &mut config.sim_seed, |_| true);
        load_var("SENTINEL_TICK_RATE", &mut config.tick_rate, |v| (1..=240).contains(v));
        load_var("SENTINEL_STATS_INTERVAL", &mut config.stats_interval_secs, |v| *v > 0);

        if let Ok(port) = std::env::var("SENTINEL_METRICS_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.metrics_port = Some(parsed),
                _ => tracing::warn!("Invalid SENTINEL_METRICS_PORT '{}', metrics endpoint disabled", port),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.5..=1.0).contains(&self.risk_bias) {
            return Err(ConfigError::OutOfRange {
                field: "risk_bias",
                value: self.risk_bias as f64,
                min: 0.5,
                max: 1.0,
            });
        }
        if self.tracking_radius <= 0.0 || self.scan_radius <= 0.0 {
            return Err(ConfigError::Invalid("radii must be positive".to_string()));
        }
        if self.scan_radius > self.tracking_radius {
            return Err(ConfigError::Invalid(
                "scan_radius cannot exceed tracking_radius".to_string(),
            ));
        }
        if self.tick_rate == 0 || self.tick_rate > 240 {
            return Err(ConfigError::OutOfRange {
                field: "tick_rate",
                value: self.tick_rate as f64,
                min: 1.0,
                max: 240.0,
            });
        }
        if self.degraded_error_ticks == 0 {
            return Err(ConfigError::Invalid(
                "degraded_error_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.instant_turn_priority, 800);
        assert_eq!(config.degraded_error_ticks, 3);
        assert!(config.metrics_port.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = EngineConfig::load_or_default();
        assert!(config.tick_rate > 0);
    }

    #[test]
    fn test_validate_rejects_reckless_bias() {
        let config = EngineConfig {
            risk_bias: 0.2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "risk_bias", .. })
        ));
    }

    #[test]
    fn test_validate_scan_within_tracking() {
        let config = EngineConfig {
            scan_radius: 5_000.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
