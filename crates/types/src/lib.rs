//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the engine.
//! All types are plain data with no I/O, making them usable in any context
//! (odds math, session state machine, wire protocol).
//!
//! # Grid Sizes
//!
//! The board is always square and comes in four sizes:
//!
//! | Desk | Cells | Default mines | Default autobet pattern |
//! |------|-------|---------------|-------------------------|
//! | 3x3  | 9     | 2             | 3..=5                   |
//! | 5x5  | 25    | 3             | 10..=14                 |
//! | 7x7  | 49    | 5             | 21..=27                 |
//! | 9x9  | 81    | 10            | 36..=44                 |
//!
//! # Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Timer registry driver interval |
//! | `SETTLE_RESET_MS` | 3000 | Board stays revealed after a settlement |
//! | `MULTI_TAP_RESET_MS` | 2000 | Board stays revealed after a manual bulk reveal |
//! | `AUTOBET_PAUSE_MS` | 2000 | Pause between autobet rounds |
//! | `AUTOBET_STOP_DELAY_MS` | 1000 | Delay before honouring "stop on any win" |
//! | `AUTOFILL_STAGGER_MS` | 50 | Per-cell delay when animating the default selection |
//!
//! # Examples
//!
//! ```
//! use mines_types::{DeskSize, Money, Tile};
//!
//! let desk = DeskSize::from_cells(25).unwrap();
//! assert_eq!(desk, DeskSize::Five);
//! assert_eq!(desk.default_mines(), 3);
//!
//! assert_eq!(Tile::from_status(1), Some(Tile::Diamond));
//! assert_eq!(Tile::from_status(0), Some(Tile::Mine));
//!
//! let stake: Money = "1.50".parse().unwrap();
//! assert_eq!(stake, Money::from_cents(150));
//! assert_eq!(stake.to_string(), "1.50");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Timer registry driver interval in milliseconds (16ms ≈ 60 Hz)
pub const TICK_MS: u32 = 16;

/// How long a settled board stays revealed before the session collapses to idle.
pub const SETTLE_RESET_MS: u32 = 3000;

/// How long a manual bulk reveal stays on screen before the board is cleared.
pub const MULTI_TAP_RESET_MS: u32 = 2000;

/// Pause between autobet rounds.
pub const AUTOBET_PAUSE_MS: u32 = 2000;

/// Delay before the autobet loop honours "stop on any win".
pub const AUTOBET_STOP_DELAY_MS: u32 = 1000;

/// Per-cell stagger when animating the default autobet selection.
pub const AUTOFILL_STAGGER_MS: u32 = 50;

/// Smallest mine count a round may be created with.
pub const MINES_AMOUNT_MIN: u32 = 1;

/// Default return-to-player ratio.
pub const DEFAULT_RTP: f64 = 0.97;

/// Highest multiplier the default step rule will offer.
pub const DEFAULT_COEFFICIENT_CEILING: f64 = 1_000_000.0;

/// Largest default autobet pattern (9x9 desk).
pub const MAX_DEFAULT_PATTERN: usize = 9;

/// Supported board sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeskSize {
    /// 3x3 board
    Three,
    /// 5x5 board
    Five,
    /// 7x7 board
    Seven,
    /// 9x9 board
    Nine,
}

impl DeskSize {
    pub const ALL: [DeskSize; 4] = [
        DeskSize::Three,
        DeskSize::Five,
        DeskSize::Seven,
        DeskSize::Nine,
    ];

    /// Number of cells on the board
    pub fn cells(self) -> usize {
        match self {
            DeskSize::Three => 9,
            DeskSize::Five => 25,
            DeskSize::Seven => 49,
            DeskSize::Nine => 81,
        }
    }

    /// Parse from a cell count
    ///
    /// ```
    /// use mines_types::DeskSize;
    ///
    /// assert_eq!(DeskSize::from_cells(81), Some(DeskSize::Nine));
    /// assert_eq!(DeskSize::from_cells(16), None);
    /// ```
    pub fn from_cells(cells: usize) -> Option<Self> {
        match cells {
            9 => Some(DeskSize::Three),
            25 => Some(DeskSize::Five),
            49 => Some(DeskSize::Seven),
            81 => Some(DeskSize::Nine),
            _ => None,
        }
    }

    /// Mine count selected when switching to this desk
    pub fn default_mines(self) -> u32 {
        match self {
            DeskSize::Three => 2,
            DeskSize::Five => 3,
            DeskSize::Seven => 5,
            DeskSize::Nine => 10,
        }
    }

    /// Largest mine count a round on this desk may carry
    pub fn mines_max(self) -> u32 {
        self.cells() as u32 - 1
    }

    /// Default autobet selection (centre row), before RTP truncation
    pub fn autobet_pattern(self) -> &'static [usize] {
        match self {
            DeskSize::Three => &[3, 4, 5],
            DeskSize::Five => &[10, 11, 12, 13, 14],
            DeskSize::Seven => &[21, 22, 23, 24, 25, 26, 27],
            DeskSize::Nine => &[36, 37, 38, 39, 40, 41, 42, 43, 44],
        }
    }
}

impl Default for DeskSize {
    fn default() -> Self {
        DeskSize::Five
    }
}

impl fmt::Display for DeskSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cells())
    }
}

impl Serialize for DeskSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.cells() as u32)
    }
}

impl<'de> Deserialize<'de> for DeskSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let cells = u32::deserialize(deserializer)?;
        DeskSize::from_cells(cells as usize)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported desk size {cells}")))
    }
}

/// State of a single board cell
///
/// The wire encoding follows the server: `null` for hidden,
/// `1` for a diamond and `0` for a mine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tile {
    #[default]
    Hidden,
    Diamond,
    Mine,
}

impl Tile {
    /// Decode a reveal status code
    pub fn from_status(status: u8) -> Option<Self> {
        match status {
            1 => Some(Tile::Diamond),
            0 => Some(Tile::Mine),
            _ => None,
        }
    }

    /// Encode as reveal status code (`None` while hidden)
    pub fn status(self) -> Option<u8> {
        match self {
            Tile::Hidden => None,
            Tile::Diamond => Some(1),
            Tile::Mine => Some(0),
        }
    }

    pub fn is_revealed(self) -> bool {
        self != Tile::Hidden
    }
}

/// Settlement outcome reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundResult {
    Won,
    Lost,
}

impl RoundResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundResult::Won => "won",
            RoundResult::Lost => "lost",
        }
    }
}

/// Where the session is in the round lifecycle
///
/// ```text
/// Idle -> Creating -> Active -> Tapping | MultiTapping -> Active | Settled
/// Settled -> Idle
/// Active -> CancelledExternally -> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Creating,
    Active,
    Tapping,
    MultiTapping,
    Settled,
    CancelledExternally,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Creating => "creating",
            Phase::Active => "active",
            Phase::Tapping => "tapping",
            Phase::MultiTapping => "multiTapping",
            Phase::Settled => "settled",
            Phase::CancelledExternally => "cancelledExternally",
        }
    }
}

/// Server-assigned round identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoundId(String);

impl<'de> Deserialize<'de> for RoundId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        RoundId::new(raw).ok_or_else(|| serde::de::Error::custom("empty round id"))
    }
}

impl RoundId {
    /// Wrap a raw identifier; empty strings are not valid round ids.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monetary amount in the currency's major unit, held as a whole number of
/// 1e-8 steps.
///
/// The server speaks decimal numbers in major units. Eight places cover
/// sub-cent crypto stakes as well as fiat; rounding to a currency's display
/// precision happens only in the formatting helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Fractional digits kept for every amount.
    pub const DECIMALS: u32 = 8;

    /// Steps per major unit.
    pub const SCALE: u64 = 100_000_000;

    pub const fn from_atoms(atoms: u64) -> Self {
        Self(atoms)
    }

    /// Amount given in hundredths of a major unit.
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents.saturating_mul(Self::SCALE / 100))
    }

    /// Convert from major units, rounding to the nearest step.
    /// Negative and non-finite inputs clamp to zero.
    pub fn from_major(major: f64) -> Self {
        if !major.is_finite() || major <= 0.0 {
            return Self::ZERO;
        }
        Self((major * Self::SCALE as f64).round() as u64)
    }

    pub const fn atoms(self) -> u64 {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    pub fn saturating_mul(self, factor: u64) -> Money {
        Money(self.0.saturating_mul(factor))
    }

    /// Grow by `percent` of the current value, rounded to the nearest step.
    ///
    /// ```
    /// use mines_types::Money;
    ///
    /// let stake = Money::from_cents(500);
    /// assert_eq!(stake.increased_by_percent(50.0), Money::from_cents(750));
    /// ```
    pub fn increased_by_percent(self, percent: f64) -> Money {
        if !percent.is_finite() || percent <= 0.0 {
            return self;
        }
        let delta = (self.0 as f64 * percent / 100.0).round() as u64;
        Money(self.0.saturating_add(delta))
    }
}

/// Full precision with trailing zeros trimmed, never fewer than two decimals.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frac = format!(
            "{:0width$}",
            self.0 % Self::SCALE,
            width = Self::DECIMALS as usize
        );
        let trimmed = frac.trim_end_matches('0');
        let frac = if trimmed.len() < 2 { &frac[..2] } else { trimmed };
        write!(f, "{}.{}", self.0 / Self::SCALE, frac)
    }
}

/// Error returned when parsing a [`Money`] string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoneyError(String);

impl fmt::Display for ParseMoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid amount: {:?}", self.0)
    }
}

impl std::error::Error for ParseMoneyError {}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(Money::from_major(v)),
            _ => Err(ParseMoneyError(trimmed.to_string())),
        }
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let major = f64::deserialize(deserializer)?;
        if !major.is_finite() || major < 0.0 {
            return Err(serde::de::Error::custom("amount must be a non-negative number"));
        }
        Ok(Money::from_major(major))
    }
}

/// Betting limits for the current player and currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub min_bet: Money,
    #[serde(default)]
    pub default_bet: Money,
    pub max_bet: Money,
    pub max_win: Money,
}

/// Provably-fair seed material for one bet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTriple {
    pub client_seed: String,
    pub server_seed: Option<String>,
    pub nonce: u64,
}

/// Skin / game variant the session talks to the server as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Theme {
    name: String,
}

impl Theme {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            "default".to_string()
        } else {
            name.trim().to_lowercase()
        };
        Self { name }
    }

    /// Raw configured theme name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Theme name sent to the server (`testb` is an A/B variant of `turbomines`)
    pub fn server_name(&self) -> &str {
        if self.name == "testb" {
            "turbomines"
        } else {
            &self.name
        }
    }

    /// A/B tag attached to reveal requests
    pub fn tag(&self) -> Option<&'static str> {
        match self.name.as_str() {
            "testb" => Some("b"),
            "turbomines" => Some("a"),
            _ => None,
        }
    }

    /// Game name used for rules that vary per variant
    pub fn game_name(&self) -> &str {
        if self.name == "default" {
            "mines"
        } else {
            self.server_name()
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults() {
        assert_eq!(SETTLE_RESET_MS, 3000);
        assert_eq!(MULTI_TAP_RESET_MS, 2000);
        assert_eq!(AUTOBET_PAUSE_MS, 2000);
        assert_eq!(AUTOFILL_STAGGER_MS, 50);
        assert_eq!(MINES_AMOUNT_MIN, 1);
    }

    #[test]
    fn desk_sizes_round_trip_cells() {
        for desk in DeskSize::ALL {
            assert_eq!(DeskSize::from_cells(desk.cells()), Some(desk));
            assert!(desk.autobet_pattern().len() <= MAX_DEFAULT_PATTERN);
            assert!(desk
                .autobet_pattern()
                .iter()
                .all(|&i| i < desk.cells()));
        }
    }

    #[test]
    fn desk_size_serde_uses_cell_count() {
        let v = serde_json::to_string(&DeskSize::Seven).unwrap();
        assert_eq!(v, "49");
        let d: DeskSize = serde_json::from_str("81").unwrap();
        assert_eq!(d, DeskSize::Nine);
        assert!(serde_json::from_str::<DeskSize>("16").is_err());
    }

    #[test]
    fn money_parse_and_display() {
        assert_eq!("4.20".parse::<Money>().unwrap(), Money::from_cents(420));
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(700).to_string(), "7.00");
        assert!("abc".parse::<Money>().is_err());
        assert!("-1".parse::<Money>().is_err());
        assert_eq!(Money::from_major(-3.0), Money::ZERO);
    }

    #[test]
    fn money_keeps_sub_cent_amounts() {
        let tiny: Money = "0.004".parse().unwrap();
        assert!(!tiny.is_zero());
        assert_eq!(tiny.atoms(), 400_000);
        assert_eq!(tiny.to_string(), "0.004");
        assert_eq!(Money::from_atoms(1).to_string(), "0.00000001");
        assert_eq!(tiny.to_string().parse::<Money>().unwrap(), tiny);
    }

    #[test]
    fn money_serde_is_major_units() {
        let m: Money = serde_json::from_str("4.2").unwrap();
        assert_eq!(m, Money::from_cents(420));
        assert_eq!(serde_json::to_string(&Money::from_cents(750)).unwrap(), "7.5");
        let m: Money = serde_json::from_str("0.0042").unwrap();
        assert_eq!(m.atoms(), 420_000);
        assert_eq!(serde_json::to_string(&m).unwrap(), "0.0042");
    }

    #[test]
    fn money_percent_increase() {
        let stake = Money::from_cents(500);
        assert_eq!(stake.increased_by_percent(50.0), Money::from_cents(750));
        assert_eq!(stake.increased_by_percent(0.0), stake);
        assert_eq!(
            Money::from_cents(333).increased_by_percent(10.0),
            Money::from_atoms(366_300_000)
        );
    }

    #[test]
    fn round_id_rejects_empty() {
        assert!(RoundId::new("").is_none());
        assert!(RoundId::new("  ").is_none());
        assert_eq!(RoundId::new("r-1").unwrap().as_str(), "r-1");
    }

    #[test]
    fn theme_variants() {
        let t = Theme::new("testb");
        assert_eq!(t.server_name(), "turbomines");
        assert_eq!(t.tag(), Some("b"));
        assert_eq!(t.game_name(), "turbomines");

        let t = Theme::new("turbomines");
        assert_eq!(t.tag(), Some("a"));

        let t = Theme::default();
        assert_eq!(t.server_name(), "default");
        assert_eq!(t.game_name(), "mines");
        assert_eq!(t.tag(), None);

        assert_eq!(Theme::new("").name(), "default");
    }

    #[test]
    fn tile_status_codes() {
        assert_eq!(Tile::Hidden.status(), None);
        assert_eq!(Tile::Diamond.status(), Some(1));
        assert_eq!(Tile::Mine.status(), Some(0));
        assert_eq!(Tile::from_status(7), None);
        assert!(!Tile::default().is_revealed());
    }
}
