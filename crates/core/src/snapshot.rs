use crate::types::{DeskSize, Money, Phase, RoundId, RoundResult, Tile};

/// Read-only copy of the session for UI consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub round_id: Option<RoundId>,
    pub desk: DeskSize,
    pub mines: u32,
    pub tiles: Vec<Tile>,
    pub selection: Vec<Option<usize>>,
    pub opened: Vec<usize>,
    pub hit: u32,
    pub stake: Money,
    pub client_seed: String,
    pub server_seed: Option<String>,
    pub nonce: u64,
    pub game_started: bool,
    pub bet_placed: bool,
    pub tap_loading: bool,
    pub tap_loading_index: Option<usize>,
    pub bet_loading: bool,
    pub is_opened_table: bool,
    pub retrieve_loading: bool,
    pub result: Option<RoundResult>,
    pub payout: Money,
    pub coefficient: f64,
    pub my_bets_updater: u64,
    pub turbo_mode: bool,
    pub auto_mode: bool,
}

impl SessionSnapshot {
    /// True when a round is held server-side
    pub fn has_round(&self) -> bool {
        self.round_id.is_some()
    }

    pub fn is_settled(&self) -> bool {
        self.result.is_some() && self.is_opened_table
    }

    pub fn selected_count(&self) -> usize {
        self.selection.iter().filter(|c| c.is_some()).count()
    }
}
