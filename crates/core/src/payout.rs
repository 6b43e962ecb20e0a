//! Payout module - derived win figures and presentation helpers
//!
//! Everything here is computed on read from the current stake, mine count and
//! odds; nothing is cached. Currency rounding happens only in the formatting
//! helpers at the bottom of this module.

use crate::coefficient::Odds;
use crate::types::{DeskSize, Money};

/// One row of the multiplier ladder shown next to the board.
#[derive(Debug, Clone, PartialEq)]
pub struct HitTier {
    pub index: u32,
    pub coefficient: f64,
    pub label: String,
    pub payout: Money,
    pub active: bool,
}

/// Inputs shared by every payout figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutInputs {
    pub desk: DeskSize,
    pub mines: u32,
    pub rtp: f64,
    pub stake: Money,
    pub max_win: Money,
}

/// `min(max_win + stake, floor(coefficient * stake))`
///
/// ```
/// use mines_core::payout::capped_payout;
/// use mines_core::types::Money;
///
/// let stake = Money::from_cents(100);
/// assert_eq!(capped_payout(4.2, stake, Money::from_cents(10_000)), Money::from_cents(420));
/// assert_eq!(capped_payout(1.13, stake, Money::from_cents(10_000)), Money::from_cents(113));
/// assert_eq!(capped_payout(500.0, stake, Money::from_cents(10_000)), Money::from_cents(10_100));
/// ```
///
/// The multiplier is quantised to [`Money::DECIMALS`] places first so the
/// floor works on exact integers.
pub fn capped_payout(coefficient: f64, stake: Money, max_win: Money) -> Money {
    let factor = (coefficient * Money::SCALE as f64).round();
    if !factor.is_finite() || factor <= 0.0 {
        return Money::ZERO;
    }
    let raw = u128::from(stake.atoms()) * factor as u128 / u128::from(Money::SCALE);
    let raw = Money::from_atoms(u64::try_from(raw).unwrap_or(u64::MAX));
    raw.min(max_win.saturating_add(stake))
}

impl PayoutInputs {
    pub fn current_coefficient(&self, odds: &Odds, hit: u32) -> f64 {
        odds.coefficient(self.mines, hit, self.desk, self.rtp)
            .unwrap_or(1.0)
    }

    /// Capped payout if the round were cashed out at `hit`.
    pub fn possible_win(&self, odds: &Odds, hit: u32) -> Money {
        capped_payout(self.current_coefficient(odds, hit), self.stake, self.max_win)
    }

    /// Capped payout after one more safe reveal; falls back to `1x` when the
    /// next step does not exist.
    pub fn possible_win_next(&self, odds: &Odds, hit: u32) -> Money {
        let coefficient = odds
            .coefficient(self.mines, hit + 1, self.desk, self.rtp)
            .unwrap_or(1.0);
        capped_payout(coefficient, self.stake, self.max_win)
    }

    /// Ladder rows for hit indices `1..=diamonds_max`.
    pub fn hits(&self, odds: &Odds, active_hit: u32) -> Vec<HitTier> {
        let max = odds.diamonds_max(self.desk, self.mines, self.rtp);
        (1..=max)
            .filter_map(|index| {
                let coefficient = odds.coefficient(self.mines, index, self.desk, self.rtp).ok()?;
                Some(HitTier {
                    index,
                    coefficient,
                    label: format!("x{}", short_number(coefficient)),
                    payout: capped_payout(coefficient, self.stake, self.max_win),
                    active: index == active_hit,
                })
            })
            .collect()
    }
}

/// Risk tier (1 = low, 3 = high) from how many payable steps remain.
pub fn risk_level(diamonds_max: u32, revealed: u32) -> u8 {
    const HIGH: i64 = 5;
    const MID: i64 = 14;
    let open = i64::from(revealed) + 1;
    let left = i64::from(diamonds_max) - open;
    if left <= HIGH {
        3
    } else if left < MID {
        2
    } else {
        1
    }
}

/// Risk tier for the turbo variant: which third of the board the next hit lands in.
pub fn turbo_risk_level(desk: DeskSize, hit: u32) -> u8 {
    let part = (desk.cells() as f64 / 3.0).round() as u32;
    let next = hit + 1;
    if next <= part {
        1
    } else if next <= part * 2 {
        2
    } else {
        3
    }
}

/// Compact number for multiplier labels: two decimals below a thousand,
/// then `K`/`M`/`B` suffixes.
pub fn short_number(value: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e9, "B"), (1e6, "M"), (1e3, "K")];
    for (scale, suffix) in UNITS {
        if value.abs() >= scale {
            return format!("{}{}", trim_decimals(value / scale), suffix);
        }
    }
    trim_decimals(value)
}

fn trim_decimals(value: f64) -> String {
    let floored = (value * 100.0).floor() / 100.0;
    let s = format!("{floored:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// Format an amount with the currency's display precision (floored).
///
/// Digits past [`Money::DECIMALS`] are padded with zeros.
pub fn format_amount(amount: Money, decimals: u8) -> String {
    let whole = amount.atoms() / Money::SCALE;
    if decimals == 0 {
        return whole.to_string();
    }
    let mut frac = format!(
        "{:0width$}",
        amount.atoms() % Money::SCALE,
        width = Money::DECIMALS as usize
    );
    let decimals = usize::from(decimals);
    frac.truncate(decimals);
    while frac.len() < decimals {
        frac.push('0');
    }
    format!("{whole}.{frac}")
}
