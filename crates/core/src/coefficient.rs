//! Coefficient model - payout multiplier curve
//!
//! The multiplier for `hit` safe reveals on a board of `n` cells with `m` mines
//! derives from the survival odds `C(n, hit) / C(n - m, hit)`. The house edge
//! (`1 - rtp`) is taken from the profit portion only, so the curve starts at
//! exactly `1x` and rises strictly with every safe reveal.
//!
//! How far along the curve a round may go is a separate, pluggable business
//! rule ([`StepRule`]). Callers use [`Odds::diamonds_max`] (rule-bounded) for
//! every UI and automation decision and [`Odds::safe_max`] only when they need
//! the combinatorial limit.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::types::{DeskSize, DEFAULT_COEFFICIENT_CEILING};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoefficientError {
    #[error("mine count {mines} is outside 1..={max}")]
    InvalidMines { mines: u32, max: u32 },
    #[error("hit index {hit} exceeds {max} safe cells")]
    HitOutOfRange { hit: u32, max: u32 },
    #[error("return-to-player ratio {0} is outside (0, 1]")]
    InvalidRtp(f64),
}

/// Maps (mines, hit index, desk, rtp) to a payout multiplier.
///
/// Implementations must be deterministic and side-effect free.
pub trait CoefficientModel: Send + Sync {
    fn coefficient(
        &self,
        mines: u32,
        hit: u32,
        desk: DeskSize,
        rtp: f64,
    ) -> Result<f64, CoefficientError>;
}

/// Decides the highest hit index the game will pay for.
pub trait StepRule: Send + Sync {
    fn max_step(&self, model: &dyn CoefficientModel, desk: DeskSize, mines: u32, rtp: f64) -> u32;
}

/// Combinatorial survival odds with the edge applied to profit.
#[derive(Debug, Clone, Copy, Default)]
pub struct FairOdds;

impl FairOdds {
    /// `C(cells, hit) / C(cells - mines, hit)` computed as a running product.
    pub fn fair_multiplier(cells: u32, mines: u32, hit: u32) -> f64 {
        let mut acc = 1.0f64;
        for i in 0..hit {
            acc *= f64::from(cells - i) / f64::from(cells - mines - i);
        }
        acc
    }
}

fn validate(mines: u32, hit: u32, desk: DeskSize, rtp: f64) -> Result<u32, CoefficientError> {
    let cells = desk.cells() as u32;
    if mines == 0 || mines >= cells {
        return Err(CoefficientError::InvalidMines {
            mines,
            max: cells - 1,
        });
    }
    if !(rtp > 0.0 && rtp <= 1.0) {
        return Err(CoefficientError::InvalidRtp(rtp));
    }
    let safe = cells - mines;
    if hit > safe {
        return Err(CoefficientError::HitOutOfRange { hit, max: safe });
    }
    Ok(cells)
}

impl CoefficientModel for FairOdds {
    fn coefficient(
        &self,
        mines: u32,
        hit: u32,
        desk: DeskSize,
        rtp: f64,
    ) -> Result<f64, CoefficientError> {
        let cells = validate(mines, hit, desk, rtp)?;
        if hit == 0 {
            return Ok(1.0);
        }
        let fair = Self::fair_multiplier(cells, mines, hit);
        Ok(1.0 + rtp * (fair - 1.0))
    }
}

/// Offers steps while the multiplier stays at or below a ceiling.
#[derive(Debug, Clone, Copy)]
pub struct CeilingRule {
    pub ceiling: f64,
}

impl Default for CeilingRule {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_COEFFICIENT_CEILING,
        }
    }
}

impl StepRule for CeilingRule {
    fn max_step(&self, model: &dyn CoefficientModel, desk: DeskSize, mines: u32, rtp: f64) -> u32 {
        let Ok(mut prev) = model.coefficient(mines, 0, desk, rtp) else {
            return 0;
        };
        let safe = (desk.cells() as u32).saturating_sub(mines);
        let mut max = 0;
        for hit in 1..=safe {
            match model.coefficient(mines, hit, desk, rtp) {
                Ok(c) if c > prev && c <= self.ceiling => {
                    prev = c;
                    max = hit;
                }
                _ => break,
            }
        }
        max
    }
}

/// Coefficient model plus step rule, shared by every derived figure.
#[derive(Clone)]
pub struct Odds {
    model: Arc<dyn CoefficientModel>,
    rule: Arc<dyn StepRule>,
}

impl Odds {
    pub fn new(model: Arc<dyn CoefficientModel>, rule: Arc<dyn StepRule>) -> Self {
        Self { model, rule }
    }

    /// Default model with a custom multiplier ceiling
    pub fn with_ceiling(ceiling: f64) -> Self {
        Self::new(Arc::new(FairOdds), Arc::new(CeilingRule { ceiling }))
    }

    pub fn coefficient(
        &self,
        mines: u32,
        hit: u32,
        desk: DeskSize,
        rtp: f64,
    ) -> Result<f64, CoefficientError> {
        self.model.coefficient(mines, hit, desk, rtp)
    }

    /// Combinatorially safe maximum: every non-mine cell revealed.
    pub fn safe_max(&self, desk: DeskSize, mines: u32) -> u32 {
        (desk.cells() as u32).saturating_sub(mines)
    }

    /// Highest payable hit index under the step rule.
    pub fn diamonds_max(&self, desk: DeskSize, mines: u32, rtp: f64) -> u32 {
        self.rule
            .max_step(self.model.as_ref(), desk, mines, rtp)
            .min(self.safe_max(desk, mines))
    }

    /// Multipliers for hit indices `1..=diamonds_max`.
    pub fn curve(&self, desk: DeskSize, mines: u32, rtp: f64) -> Vec<f64> {
        (1..=self.diamonds_max(desk, mines, rtp))
            .filter_map(|hit| self.coefficient(mines, hit, desk, rtp).ok())
            .collect()
    }
}

impl Default for Odds {
    fn default() -> Self {
        Self::new(Arc::new(FairOdds), Arc::new(CeilingRule::default()))
    }
}

impl fmt::Debug for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Odds").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_RTP;

    #[test]
    fn zero_hits_is_one() {
        let odds = Odds::default();
        for desk in DeskSize::ALL {
            for mines in 1..desk.cells() as u32 {
                assert_eq!(odds.coefficient(mines, 0, desk, DEFAULT_RTP).unwrap(), 1.0);
            }
        }
    }

    #[test]
    fn curve_strictly_increasing_up_to_diamonds_max() {
        let odds = Odds::default();
        for desk in DeskSize::ALL {
            for mines in 1..desk.cells() as u32 {
                let max = odds.diamonds_max(desk, mines, DEFAULT_RTP);
                let mut prev = 1.0;
                for hit in 1..=max {
                    let c = odds.coefficient(mines, hit, desk, DEFAULT_RTP).unwrap();
                    assert!(c > prev, "desk {desk} mines {mines} hit {hit}: {c} <= {prev}");
                    prev = c;
                }
            }
        }
    }

    #[test]
    fn diamonds_max_never_exceeds_safe_cells() {
        let odds = Odds::default();
        for desk in DeskSize::ALL {
            for mines in 1..desk.cells() as u32 {
                assert!(odds.diamonds_max(desk, mines, DEFAULT_RTP) <= odds.safe_max(desk, mines));
            }
        }
    }

    #[test]
    fn ceiling_bounds_large_boards() {
        let odds = Odds::default();
        // 81 cells with 10 mines: the full clear is far above any ceiling.
        let max = odds.diamonds_max(DeskSize::Nine, 10, DEFAULT_RTP);
        assert!(max < 71);
        assert!(max > 0);
        let top = odds.coefficient(10, max, DeskSize::Nine, DEFAULT_RTP).unwrap();
        assert!(top <= DEFAULT_COEFFICIENT_CEILING);
    }

    #[test]
    fn small_board_reaches_full_clear() {
        let odds = Odds::default();
        assert_eq!(odds.diamonds_max(DeskSize::Five, 3, DEFAULT_RTP), 22);
        assert_eq!(odds.diamonds_max(DeskSize::Three, 2, DEFAULT_RTP), 7);
    }

    #[test]
    fn hit_beyond_safe_cells_is_error() {
        let odds = Odds::default();
        assert_eq!(
            odds.coefficient(3, 23, DeskSize::Five, DEFAULT_RTP),
            Err(CoefficientError::HitOutOfRange { hit: 23, max: 22 })
        );
    }

    #[test]
    fn invalid_inputs() {
        let odds = Odds::default();
        assert!(matches!(
            odds.coefficient(0, 1, DeskSize::Five, DEFAULT_RTP),
            Err(CoefficientError::InvalidMines { .. })
        ));
        assert!(matches!(
            odds.coefficient(25, 0, DeskSize::Five, DEFAULT_RTP),
            Err(CoefficientError::InvalidMines { .. })
        ));
        assert!(matches!(
            odds.coefficient(3, 1, DeskSize::Five, 0.0),
            Err(CoefficientError::InvalidRtp(_))
        ));
        assert_eq!(odds.diamonds_max(DeskSize::Five, 3, 1.5), 0);
    }

    #[test]
    fn fair_multiplier_matches_binomials() {
        // C(25,5) / C(22,5) = 53130 / 26334
        let fair = FairOdds::fair_multiplier(25, 3, 5);
        assert!((fair - 53130.0 / 26334.0).abs() < 1e-9);
    }

    #[test]
    fn full_rtp_is_fair() {
        let c = FairOdds.coefficient(1, 1, DeskSize::Three, 1.0).unwrap();
        assert!((c - 9.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn custom_ceiling_truncates() {
        let odds = Odds::with_ceiling(2.0);
        let max = odds.diamonds_max(DeskSize::Five, 3, DEFAULT_RTP);
        assert!(odds.coefficient(3, max, DeskSize::Five, DEFAULT_RTP).unwrap() <= 2.0);
        assert!(odds.coefficient(3, max + 1, DeskSize::Five, DEFAULT_RTP).unwrap() > 2.0);
        assert_eq!(odds.curve(DeskSize::Five, 3, DEFAULT_RTP).len(), max as usize);
    }
}
