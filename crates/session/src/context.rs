//! Read-only inputs from sibling subsystems
//!
//! The session never reaches into profile, limits or autobet settings on its
//! own; callers hand a [`Context`] to every operation that needs them. The
//! autobet settings are the one shared, mutable piece: the loop and the UI
//! both hold an [`AutobetControl`] handle to the same configuration.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{Limits, Money, DEFAULT_RTP};

/// Player profile as seen by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// `None` until the wallet has reported a balance
    pub balance: Option<Money>,
    pub currency: String,
    pub token_present: bool,
    pub rtp: f64,
    /// Display precision of the currency
    pub rounding: u8,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            balance: None,
            currency: "USD".to_string(),
            token_present: false,
            rtp: DEFAULT_RTP,
            rounding: 2,
        }
    }
}

/// Stake adjustment applied after a round.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StakeRule {
    /// Grow by `percent`; when false the stake returns to the initial amount.
    pub increase: bool,
    pub percent: f64,
}

impl StakeRule {
    pub fn increase_by(percent: f64) -> Self {
        Self {
            increase: true,
            percent,
        }
    }

    pub fn reset() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AutobetConfig {
    pub enabled: bool,
    /// A bet count was configured when automation started
    pub limit_enabled: bool,
    pub bets_remaining: u32,
    /// Stake when automation started
    pub initial_amount: Money,
    pub on_win: StakeRule,
    pub on_lose: StakeRule,
    pub stop_on_any_win: bool,
}

/// Shared handle to the autobet configuration.
#[derive(Debug, Clone, Default)]
pub struct AutobetControl {
    inner: Arc<Mutex<AutobetConfig>>,
}

impl AutobetControl {
    pub fn new(config: AutobetConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(config)),
        }
    }

    /// Copy of the current configuration
    pub fn get(&self) -> AutobetConfig {
        self.inner.lock().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut AutobetConfig) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    /// Ask a running loop to stop at its next iteration boundary.
    pub fn request_stop(&self) {
        self.inner.lock().enabled = false;
    }
}

/// Everything an operation may read from outside the session.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub profile: Profile,
    pub limits: Limits,
    pub autobet: AutobetControl,
}

impl Context {
    pub fn new(profile: Profile, limits: Limits) -> Self {
        Self {
            profile,
            limits,
            autobet: AutobetControl::default(),
        }
    }

    pub fn with_autobet(mut self, autobet: AutobetControl) -> Self {
        self.autobet = autobet;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_clones_share_state() {
        let control = AutobetControl::new(AutobetConfig {
            enabled: true,
            ..AutobetConfig::default()
        });
        let ui = control.clone();
        ui.request_stop();
        assert!(!control.is_enabled());

        control.update(|c| c.bets_remaining = 4);
        assert_eq!(ui.get().bets_remaining, 4);
    }
}
