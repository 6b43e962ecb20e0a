//! Core game logic module - pure, deterministic, and testable
//!
//! This module contains the odds model, board state and payout math for the
//! mines session engine. It has **zero dependencies** on networking or I/O,
//! making it:
//!
//! - **Deterministic**: the same inputs always produce the same multiplier curve
//! - **Testable**: every rule is unit-tested without a server
//! - **Portable**: usable from the session engine, a CLI or a UI layer
//!
//! # Module Structure
//!
//! - [`coefficient`]: payout multiplier curve and the rule bounding how far it may go
//! - [`grid`]: fixed-size board of hidden / diamond / mine tiles with a hit counter
//! - [`selection`]: autobet / bulk-reveal cell selection and default patterns
//! - [`payout`]: capped win figures, hit ladder, risk tiers and display helpers
//! - [`snapshot`]: read-only session view for UI consumers
//!
//! # Game Rules
//!
//! - A round hides `m` mines among `n` cells (`n` in {9, 25, 49, 81})
//! - Each safe reveal ("hit") raises the multiplier; a mine loses the stake
//! - The multiplier at zero hits is exactly `1x`
//! - Payouts never exceed `max_win + stake`
//!
//! # Example
//!
//! ```
//! use mines_core::{Grid, Odds, Selection};
//! use mines_core::types::{DeskSize, Tile, DEFAULT_RTP};
//!
//! let odds = Odds::default();
//! let mut grid = Grid::new(DeskSize::Five);
//! grid.set_mines(3);
//!
//! grid.reveal(12, Tile::Diamond);
//! let c = odds.coefficient(grid.mines(), grid.hit(), grid.desk(), DEFAULT_RTP).unwrap();
//! assert!(c > 1.0);
//!
//! let mut selection = Selection::new(DeskSize::Five);
//! let limit = odds.diamonds_max(DeskSize::Five, 3, DEFAULT_RTP);
//! selection.toggle(10, limit);
//! assert_eq!(selection.indexes(), vec![10]);
//! ```

pub mod coefficient;
pub mod grid;
pub mod payout;
pub mod selection;
pub mod snapshot;

pub use mines_types as types;

// Re-export commonly used types for convenience
pub use coefficient::{CeilingRule, CoefficientError, CoefficientModel, FairOdds, Odds, StepRule};
pub use grid::Grid;
pub use payout::{capped_payout, HitTier, PayoutInputs};
pub use selection::{default_pattern, Selection, Toggle};
pub use snapshot::SessionSnapshot;
