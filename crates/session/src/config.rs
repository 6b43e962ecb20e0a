//! Session configuration
//!
//! Timer delays and odds tuning for [`crate::Session`]. Read from `MINES_*`
//! environment variables; anything unset or unparsable keeps its default.

use std::env;
use std::time::Duration;

use crate::types::{
    Theme, AUTOBET_PAUSE_MS, AUTOBET_STOP_DELAY_MS, AUTOFILL_STAGGER_MS,
    DEFAULT_COEFFICIENT_CEILING, MINES_AMOUNT_MIN, MULTI_TAP_RESET_MS, SETTLE_RESET_MS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub theme: Theme,
    /// Board stays visible this long after a settlement (ms)
    pub settle_reset_ms: u32,
    /// Same, after a manual multi-reveal (ms)
    pub multi_tap_reset_ms: u32,
    /// Autobet pause between rounds (ms)
    pub autobet_pause_ms: u64,
    /// Autobet delay before honouring stop-on-any-win (ms)
    pub autobet_stop_delay_ms: u64,
    /// Per-cell stagger of the default selection fill (ms)
    pub autofill_stagger_ms: u32,
    /// Largest payable multiplier
    pub coefficient_ceiling: f64,
    /// Lowest mine count the turbo variant accepts
    pub mines_min: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            settle_reset_ms: SETTLE_RESET_MS,
            multi_tap_reset_ms: MULTI_TAP_RESET_MS,
            autobet_pause_ms: u64::from(AUTOBET_PAUSE_MS),
            autobet_stop_delay_ms: u64::from(AUTOBET_STOP_DELAY_MS),
            autofill_stagger_ms: AUTOFILL_STAGGER_MS,
            coefficient_ceiling: DEFAULT_COEFFICIENT_CEILING,
            mines_min: MINES_AMOUNT_MIN,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl SessionConfig {
    /// Create from environment variables
    ///
    /// - `MINES_THEME`
    /// - `MINES_SETTLE_RESET_MS`, `MINES_MULTI_TAP_RESET_MS`
    /// - `MINES_AUTOBET_PAUSE_MS`, `MINES_AUTOBET_STOP_DELAY_MS`
    /// - `MINES_AUTOFILL_STAGGER_MS`
    /// - `MINES_COEFFICIENT_CEILING`
    /// - `MINES_MINES_MIN`
    pub fn from_env() -> Self {
        let d = Self::default();
        let coefficient_ceiling = parsed::<f64>("MINES_COEFFICIENT_CEILING")
            .filter(|c| c.is_finite() && *c > 1.0)
            .unwrap_or(d.coefficient_ceiling);

        Self {
            theme: env::var("MINES_THEME").map(Theme::new).unwrap_or(d.theme),
            settle_reset_ms: parsed("MINES_SETTLE_RESET_MS").unwrap_or(d.settle_reset_ms),
            multi_tap_reset_ms: parsed("MINES_MULTI_TAP_RESET_MS").unwrap_or(d.multi_tap_reset_ms),
            autobet_pause_ms: parsed("MINES_AUTOBET_PAUSE_MS").unwrap_or(d.autobet_pause_ms),
            autobet_stop_delay_ms: parsed("MINES_AUTOBET_STOP_DELAY_MS")
                .unwrap_or(d.autobet_stop_delay_ms),
            autofill_stagger_ms: parsed("MINES_AUTOFILL_STAGGER_MS")
                .unwrap_or(d.autofill_stagger_ms),
            coefficient_ceiling,
            mines_min: parsed::<u32>("MINES_MINES_MIN")
                .filter(|m| *m >= 1)
                .unwrap_or(d.mines_min),
        }
    }

    /// Delays suitable for tests and headless drivers: nothing waits.
    pub fn immediate() -> Self {
        Self {
            settle_reset_ms: 0,
            multi_tap_reset_ms: 0,
            autobet_pause_ms: 0,
            autobet_stop_delay_ms: 0,
            autofill_stagger_ms: 0,
            ..Self::default()
        }
    }

    pub fn autobet_pause(&self) -> Duration {
        Duration::from_millis(self.autobet_pause_ms)
    }

    pub fn autobet_stop_delay(&self) -> Duration {
        Duration::from_millis(self.autobet_stop_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_timing_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.settle_reset_ms, 3000);
        assert_eq!(config.multi_tap_reset_ms, 2000);
        assert_eq!(config.autobet_pause(), Duration::from_secs(2));
        assert_eq!(config.autobet_stop_delay(), Duration::from_secs(1));
        assert_eq!(config.autofill_stagger_ms, 50);
        assert_eq!(config.mines_min, 1);
    }

    #[test]
    fn from_env_ignores_garbage() {
        std::env::set_var("MINES_SETTLE_RESET_MS", "500");
        std::env::set_var("MINES_COEFFICIENT_CEILING", "nope");
        std::env::set_var("MINES_MINES_MIN", "0");
        let config = SessionConfig::from_env();
        assert_eq!(config.settle_reset_ms, 500);
        assert_eq!(config.coefficient_ceiling, DEFAULT_COEFFICIENT_CEILING);
        assert_eq!(config.mines_min, 1);
        std::env::remove_var("MINES_SETTLE_RESET_MS");
        std::env::remove_var("MINES_COEFFICIENT_CEILING");
        std::env::remove_var("MINES_MINES_MIN");
    }
}
