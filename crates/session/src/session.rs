//! Game session - round lifecycle state machine
//!
//! ```text
//! Idle ──start──▶ Creating ──roundId──▶ Active ──tap──▶ Tapping ──▶ Active | Settled
//!                                         │
//!                                         ├──multi-tap──▶ MultiTapping ──▶ Settled
//!                                         ├──cashout────────────────────▶ Settled
//!                                         └──claimed elsewhere──▶ CancelledExternally ──▶ Idle
//! Settled ──reset timer──▶ Idle
//! ```
//!
//! All state lives behind one lock that is never held across a request, so
//! a second tap arriving while a reveal is in flight sees the loading guard
//! and is rejected instead of queued. Derived figures (coefficients, win
//! amounts, risk tiers) are computed from the state on every read.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::adapter::{
    create_multi_reveal_request, create_reveal_request, create_round_request, ApiError,
    CashoutRequest, GameApi, Settlement, SettlementResponse,
};
use crate::config::SessionConfig;
use crate::context::Context;
use crate::core::{
    default_pattern, payout, Grid, HitTier, Odds, PayoutInputs, Selection, SessionSnapshot, Toggle,
};
use crate::error::{ErrorResolver, ResetOnFailure, Resolution, Result, SessionError};
use crate::events::{AlertLevel, EventBus, SessionEvent};
use crate::seed::{initial_seeds, SeedOverride};
use crate::storage::{save_amount, KeyValueStore};
use crate::timers::{TimerKind, TimerRegistry};
use crate::types::{
    DeskSize, Money, Phase, RoundId, RoundResult, SeedTriple, Tile, MINES_AMOUNT_MIN,
};

/// HTTP status the server uses when another client already holds a round.
const ROUND_CONFLICT: u16 = 409;

#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) phase: Phase,
    pub(crate) round_id: Option<RoundId>,
    pub(crate) grid: Grid,
    pub(crate) selection: Selection,
    pub(crate) opened: Vec<usize>,
    pub(crate) stake: Money,
    pub(crate) seeds: SeedTriple,
    pub(crate) game_started: bool,
    pub(crate) bet_placed: bool,
    pub(crate) tap_loading: bool,
    pub(crate) tap_loading_index: Option<usize>,
    pub(crate) bet_loading: bool,
    pub(crate) is_opened_table: bool,
    pub(crate) retrieve_loading: bool,
    pub(crate) result: Option<RoundResult>,
    pub(crate) payout: Money,
    pub(crate) coefficient: f64,
    pub(crate) my_bets_updater: u64,
    pub(crate) turbo_mode: bool,
    pub(crate) auto_mode: bool,
    /// Selection limit in force when the pending auto-fill was scheduled
    pub(crate) fill_limit: u32,
    pub(crate) timers: TimerRegistry,
}

impl SessionState {
    fn new(seeds: SeedTriple) -> Self {
        let desk = DeskSize::default();
        Self {
            phase: Phase::Idle,
            round_id: None,
            grid: Grid::new(desk),
            selection: Selection::new(desk),
            opened: Vec::new(),
            stake: Money::ZERO,
            seeds,
            game_started: false,
            bet_placed: false,
            tap_loading: false,
            tap_loading_index: None,
            bet_loading: false,
            is_opened_table: false,
            retrieve_loading: false,
            result: None,
            payout: Money::ZERO,
            coefficient: 0.0,
            my_bets_updater: 0,
            turbo_mode: false,
            auto_mode: false,
            fill_limit: 0,
            timers: TimerRegistry::new(),
        }
    }

    /// Clear the board and the last result; the round id is left alone.
    pub(crate) fn reset_game(&mut self) {
        self.opened.clear();
        self.grid.clear();
        self.result = None;
        self.payout = Money::ZERO;
        self.coefficient = 0.0;
        self.game_started = false;
        self.bet_placed = false;
        self.is_opened_table = false;
    }

    /// Drop the round client-side and return to idle.
    pub(crate) fn cancel_round(&mut self) {
        self.round_id = None;
        self.timers.cancel(TimerKind::ResetRound);
        self.reset_game();
        self.tap_loading = false;
        self.tap_loading_index = None;
        self.phase = Phase::Idle;
    }

    fn has_round(&self) -> bool {
        self.round_id.is_some()
    }
}

/// Client-side engine for one game tab.
pub struct Session {
    pub(crate) api: Arc<dyn GameApi>,
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) resolver: Arc<dyn ErrorResolver>,
    pub(crate) odds: Odds,
    pub(crate) config: SessionConfig,
    pub(crate) seed_override: Option<SeedOverride>,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) events: EventBus,
}

impl Session {
    pub fn new(api: Arc<dyn GameApi>, store: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
        let odds = Odds::with_ceiling(config.coefficient_ceiling);
        Self {
            api,
            store,
            resolver: Arc::new(ResetOnFailure),
            odds,
            config,
            seed_override: None,
            state: Mutex::new(SessionState::new(initial_seeds(None))),
            events: EventBus::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ErrorResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the coefficient model / step rule.
    pub fn with_odds(mut self, odds: Odds) -> Self {
        self.odds = odds;
        self
    }

    /// Pin seeds for deterministic replays. The override also wins over
    /// seeds restored by [`Session::recover`].
    pub fn with_seed_override(mut self, seed_override: SeedOverride) -> Self {
        seed_override.apply(&mut self.state.get_mut().seeds);
        self.seed_override = Some(seed_override);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn odds(&self) -> &Odds {
        &self.odds
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.state.lock();
        SessionSnapshot {
            phase: st.phase,
            round_id: st.round_id.clone(),
            desk: st.grid.desk(),
            mines: st.grid.mines(),
            tiles: st.grid.tiles().to_vec(),
            selection: st.selection.cells().to_vec(),
            opened: st.opened.clone(),
            hit: st.grid.hit(),
            stake: st.stake,
            client_seed: st.seeds.client_seed.clone(),
            server_seed: st.seeds.server_seed.clone(),
            nonce: st.seeds.nonce,
            game_started: st.game_started,
            bet_placed: st.bet_placed,
            tap_loading: st.tap_loading,
            tap_loading_index: st.tap_loading_index,
            bet_loading: st.bet_loading,
            is_opened_table: st.is_opened_table,
            retrieve_loading: st.retrieve_loading,
            result: st.result,
            payout: st.payout,
            coefficient: st.coefficient,
            my_bets_updater: st.my_bets_updater,
            turbo_mode: st.turbo_mode,
            auto_mode: st.auto_mode,
        }
    }

    // ============== Round lifecycle ==============

    /// Create a new round on the server.
    ///
    /// Fails without any request when a round is already held, the mine
    /// count is invalid, or the stake is zero or above the known balance.
    pub async fn start(&self, ctx: &Context) -> Result<RoundId> {
        let request = {
            let mut st = self.state.lock();
            if st.timers.cancel(TimerKind::ResetRound) {
                st.reset_game();
                st.phase = Phase::Idle;
                self.events.emit(SessionEvent::BoardReset);
            }
            if st.has_round() {
                warn!(round_id = ?st.round_id, "start rejected: round already active");
                self.events
                    .alert(AlertLevel::Error, SessionError::RoundActiveElsewhere.to_string());
                return Err(SessionError::RoundActiveElsewhere);
            }
            if st.bet_loading {
                return Err(SessionError::Busy("round creation"));
            }
            self.validate_mines(&st)?;
            if st.stake.is_zero() {
                return Err(SessionError::InvalidStake);
            }
            if let Some(balance) = ctx.profile.balance {
                if balance.is_zero() || balance < st.stake {
                    self.events
                        .alert(AlertLevel::Error, SessionError::InsufficientBalance.to_string());
                    return Err(SessionError::InsufficientBalance);
                }
            }
            st.bet_loading = true;
            st.phase = Phase::Creating;
            st.grid.set_hit(0);
            create_round_request(&st.seeds, st.grid.mines(), st.grid.desk(), &self.config.theme)
        };

        let response = self.api.create_round(request).await;

        let mut st = self.state.lock();
        st.bet_loading = false;
        match response {
            Ok(resp) => {
                st.round_id = Some(resp.round_id.clone());
                st.game_started = true;
                st.phase = Phase::Active;
                info!(round_id = %resp.round_id, mines = st.grid.mines(), desk = %st.grid.desk(), "round created");
                self.events.emit(SessionEvent::RoundCreated {
                    round_id: resp.round_id.clone(),
                });
                Ok(resp.round_id)
            }
            Err(err) => {
                st.phase = Phase::Idle;
                drop(st);
                if err.status() == Some(ROUND_CONFLICT) {
                    warn!(error = %err, "server rejected round: already active elsewhere");
                    self.events
                        .alert(AlertLevel::Error, SessionError::RoundActiveElsewhere.to_string());
                    return Err(SessionError::RoundActiveElsewhere);
                }
                Err(self.request_failed(err, false))
            }
        }
    }

    /// Reveal one cell of the active round.
    pub async fn tap(&self, ctx: &Context, index: usize) -> Result<Tile> {
        if ctx.autobet.is_enabled() {
            return Err(SessionError::AutomationActive);
        }
        let (round_id, request) = {
            let mut st = self.state.lock();
            if st.tap_loading {
                debug!(index, pending = ?st.tap_loading_index, "tap rejected: reveal in flight");
                return Err(SessionError::TapInProgress);
            }
            if st.bet_loading {
                debug!(index, "tap rejected: cashout in flight");
                return Err(SessionError::Busy("cashout"));
            }
            let round_id = st.round_id.clone().ok_or(SessionError::NoActiveRound)?;
            match st.grid.get(index) {
                None => {
                    debug!(index, cells = st.grid.desk().cells(), "tap rejected: off the board");
                    return Err(SessionError::OutOfRange(index));
                }
                Some(tile) if tile.is_revealed() => return Ok(tile),
                Some(_) => {}
            }
            st.tap_loading = true;
            st.tap_loading_index = Some(index);
            st.phase = Phase::Tapping;
            let first = (!st.bet_placed).then(|| (st.stake, ctx.profile.currency.as_str()));
            let request =
                create_reveal_request(round_id.clone(), index, &st.seeds, first, &self.config.theme);
            (round_id, request)
        };

        let response = self.api.reveal(request).await;

        let mut st = self.state.lock();
        if st.round_id.as_ref() != Some(&round_id) {
            // Cancelled or replaced while the reveal was in flight; the
            // loading flags now belong to whatever came after.
            debug!(index, %round_id, current = ?st.round_id, "dropping reveal for a stale round");
            return Err(SessionError::NoActiveRound);
        }
        st.tap_loading = false;
        st.tap_loading_index = None;
        let resp = match response {
            Ok(resp) => resp,
            Err(err) => {
                if st.has_round() {
                    st.phase = Phase::Active;
                }
                drop(st);
                return Err(self.request_failed(err, false));
            }
        };

        if !st.bet_placed {
            st.bet_placed = true;
            let coefficient = self.coefficient_at(ctx, &st, st.grid.hit());
            self.events.emit(SessionEvent::BetPlaced {
                stake: st.stake,
                coefficient,
            });
        }

        let settlement = resp.settlement.settlement();
        let tile = match (resp.outcome(), &settlement) {
            // Last safe cell: the server settles the round as a win.
            (_, Some(s)) if s.result == RoundResult::Won => Tile::Diamond,
            (Some(tile), _) => tile,
            (None, Some(_)) => Tile::Mine,
            (None, None) => {
                warn!(index, "reveal response carried no outcome");
                st.cancel_round();
                self.events.emit(SessionEvent::BoardReset);
                return Err(SessionError::IncompleteResponse("status"));
            }
        };

        st.grid.reveal(index, tile);
        debug!(index, ?tile, hit = st.grid.hit(), "tile revealed");
        self.events.emit(SessionEvent::TileRevealed {
            index,
            tile,
            hit: st.grid.hit(),
        });

        match settlement {
            Some(s) => self.settle(&mut st, s, self.config.settle_reset_ms),
            None if tile == Tile::Mine => {
                warn!(index, "mine revealed without a mine layout");
                self.finish_round(&mut st, RoundResult::Lost, Money::ZERO, 0.0, self.config.settle_reset_ms);
            }
            None => st.phase = Phase::Active,
        }
        Ok(tile)
    }

    /// Create a round and reveal the whole selection in one request.
    pub async fn multi_tap(&self, ctx: &Context) -> Result<Settlement> {
        if ctx.autobet.is_enabled() {
            return Err(SessionError::AutomationActive);
        }
        {
            let mut st = self.state.lock();
            if st.selection.is_empty() {
                return Err(SessionError::NothingSelected);
            }
            if st.tap_loading {
                return Err(SessionError::TapInProgress);
            }
            st.tap_loading = true;
        }
        let result = self.play_selection(ctx, self.config.multi_tap_reset_ms).await;
        self.state.lock().tap_loading = false;
        result
    }

    /// Start a round and submit the current selection; shared by manual
    /// multi-tap and the autobet loop.
    pub(crate) async fn play_selection(&self, ctx: &Context, reset_ms: u32) -> Result<Settlement> {
        self.start(ctx).await?;

        let (request, selected) = {
            let mut st = self.state.lock();
            let round_id = st.round_id.clone().ok_or(SessionError::NoActiveRound)?;
            let selected = st.selection.indexes();
            st.phase = Phase::MultiTapping;
            let request = create_multi_reveal_request(
                round_id,
                selected.clone(),
                &st.seeds,
                st.stake,
                &ctx.profile.currency,
                &self.config.theme,
            );
            (request, selected)
        };

        let response = match self.api.multi_reveal(request).await {
            Ok(resp) => resp,
            Err(err) => return Err(self.request_failed(err, true)),
        };

        let mut st = self.state.lock();
        if !st.bet_placed {
            st.bet_placed = true;
            let coefficient = self.coefficient_at(ctx, &st, 0);
            self.events.emit(SessionEvent::BetPlaced {
                stake: st.stake,
                coefficient,
            });
        }
        self.apply_multi(&mut st, &response, &selected, reset_ms)
    }

    fn apply_multi(
        &self,
        st: &mut SessionState,
        response: &SettlementResponse,
        selected: &[usize],
        reset_ms: u32,
    ) -> Result<Settlement> {
        let Some(result) = response.result else {
            warn!("multi reveal response carried no result");
            st.cancel_round();
            self.events.emit(SessionEvent::BoardReset);
            return Err(SessionError::IncompleteResponse("result"));
        };

        if result == RoundResult::Won {
            for &index in selected {
                st.grid.reveal(index, Tile::Diamond);
            }
        }

        let settlement = match response.settlement() {
            Some(s) => {
                self.settle(st, s.clone(), reset_ms);
                s
            }
            None => {
                let s = Settlement {
                    result,
                    payout: response.payout.unwrap_or_default(),
                    coefficient: response.coefficient.unwrap_or_default(),
                    mines: Vec::new(),
                };
                warn!(?result, "multi reveal settled without a mine layout");
                self.finish_round(st, s.result, s.payout, s.coefficient, reset_ms);
                s
            }
        };
        st.opened = selected.to_vec();
        Ok(settlement)
    }

    /// Settle the round at the current multiplier.
    ///
    /// Any failure cancels the round locally: the server may already have
    /// settled it, and a stale round id would block every future start.
    pub async fn cashout(&self) -> Result<Settlement> {
        let request = {
            let mut st = self.state.lock();
            let round_id = st.round_id.clone().ok_or(SessionError::NoActiveRound)?;
            if st.bet_loading {
                return Err(SessionError::Busy("cashout"));
            }
            if st.tap_loading {
                return Err(SessionError::TapInProgress);
            }
            st.bet_loading = true;
            CashoutRequest { round_id }
        };

        let response = self.api.cashout(request).await;

        let mut st = self.state.lock();
        st.bet_loading = false;
        let resp = match response {
            Ok(resp) => resp,
            Err(err) => {
                drop(st);
                return Err(self.request_failed(err, true));
            }
        };
        self.events.emit(SessionEvent::TournamentsStale);
        match resp.settlement() {
            Some(s) => {
                self.settle(&mut st, s.clone(), self.config.settle_reset_ms);
                Ok(s)
            }
            None => {
                warn!("cashout response carried no settlement");
                st.cancel_round();
                self.events.emit(SessionEvent::BoardReset);
                Err(SessionError::IncompleteResponse("settlement"))
            }
        }
    }

    /// Drop the round locally without asking the server.
    pub fn cancel_round(&self) {
        let mut st = self.state.lock();
        info!(round_id = ?st.round_id, "round cancelled");
        st.cancel_round();
        self.events.emit(SessionEvent::BoardReset);
    }

    /// Another client claimed the round; keep the board until the reset timer fires.
    pub fn cancel_externally(&self) {
        let mut st = self.state.lock();
        if !st.has_round() {
            return;
        }
        warn!(round_id = ?st.round_id, "round claimed by another session");
        st.round_id = None;
        st.tap_loading = false;
        st.tap_loading_index = None;
        st.phase = Phase::CancelledExternally;
        st.timers.schedule(TimerKind::ResetRound, self.config.settle_reset_ms);
        self.events
            .alert(AlertLevel::Error, SessionError::RoundActiveElsewhere.to_string());
    }

    /// Collapse a settled board to idle now instead of waiting for the timer.
    ///
    /// Returns false when a round is still active.
    pub fn reset_round(&self) -> bool {
        let mut st = self.state.lock();
        if st.has_round() {
            return false;
        }
        st.timers.cancel(TimerKind::ResetRound);
        st.reset_game();
        st.phase = Phase::Idle;
        self.events.emit(SessionEvent::BoardReset);
        true
    }

    /// Advance session timers by `elapsed_ms`.
    pub fn tick(&self, elapsed_ms: u32) {
        let mut st = self.state.lock();
        for kind in st.timers.advance(elapsed_ms) {
            match kind {
                TimerKind::ResetRound => {
                    debug!("reset timer fired");
                    st.reset_game();
                    st.round_id = None;
                    st.phase = Phase::Idle;
                    self.events.emit(SessionEvent::BoardReset);
                }
                TimerKind::Autofill(index) => {
                    let limit = st.fill_limit;
                    if !st.selection.is_selected(index)
                        && st.selection.toggle(index, limit) == Toggle::Selected
                    {
                        self.events.emit(SessionEvent::SelectionChanged {
                            count: st.selection.count(),
                        });
                    }
                }
            }
        }
    }

    fn settle(&self, st: &mut SessionState, settlement: Settlement, reset_ms: u32) {
        st.opened = st.grid.reveal_all(&settlement.mines);
        st.is_opened_table = true;
        self.finish_round(st, settlement.result, settlement.payout, settlement.coefficient, reset_ms);
    }

    fn finish_round(
        &self,
        st: &mut SessionState,
        result: RoundResult,
        payout: Money,
        coefficient: f64,
        reset_ms: u32,
    ) {
        info!(round_id = ?st.round_id, result = result.as_str(), %payout, coefficient, "round settled");
        st.result = Some(result);
        st.payout = payout;
        st.coefficient = coefficient;
        st.my_bets_updater += 1;
        st.round_id = None;
        st.phase = Phase::Settled;
        st.timers.schedule(TimerKind::ResetRound, reset_ms);
        self.events.emit(SessionEvent::Settled {
            result,
            payout,
            coefficient,
        });
    }

    /// Route a request failure through the resolver.
    pub(crate) fn request_failed(&self, err: ApiError, force_reset: bool) -> SessionError {
        warn!(error = %err, status = ?err.status(), "game api request failed");
        if let Some(message) = self.resolver.report(&err) {
            self.events.alert(AlertLevel::Error, message);
        }
        let resolution = if force_reset {
            Resolution::ResetRound
        } else {
            self.resolver.classify(&err)
        };
        if resolution == Resolution::ResetRound {
            self.state.lock().cancel_round();
            self.events.emit(SessionEvent::BoardReset);
        }
        SessionError::Api(err)
    }

    // ============== Board configuration ==============

    /// Switch grid size; resets mine count to the desk default.
    pub fn set_desk_size(&self, desk: DeskSize) -> Result<()> {
        let mut st = self.state.lock();
        if st.game_started {
            return Err(SessionError::Busy("round"));
        }
        st.timers.cancel_autofill();
        st.grid.resize(desk);
        st.grid.set_mines(desk.default_mines());
        st.selection.resize(desk);
        debug!(%desk, mines = desk.default_mines(), "desk size changed");
        self.events.emit(SessionEvent::BoardReset);
        self.events.emit(SessionEvent::SelectionChanged { count: 0 });
        Ok(())
    }

    /// Change the mine count; clears the selection (refilled in turbo mode).
    pub fn set_mines_amount(&self, ctx: &Context, mines: u32) -> Result<()> {
        let mut st = self.state.lock();
        if st.game_started {
            return Err(SessionError::Busy("round"));
        }
        st.grid.set_mines(mines);
        st.grid.set_hit(0);
        st.selection.clear();
        st.timers.cancel_autofill();
        if st.turbo_mode {
            self.fill_defaults(&mut st, ctx.profile.rtp, self.config.autofill_stagger_ms);
        }
        self.events.emit(SessionEvent::SelectionChanged {
            count: st.selection.count(),
        });
        Ok(())
    }

    /// Set the stake and remember it for this currency.
    pub fn set_amount(&self, ctx: &Context, amount: Money) -> Result<()> {
        let mut st = self.state.lock();
        if st.game_started {
            return Err(SessionError::Busy("round"));
        }
        self.apply_stake(&mut st, &ctx.profile.currency, amount);
        Ok(())
    }

    pub(crate) fn apply_stake(&self, st: &mut SessionState, currency: &str, amount: Money) {
        st.stake = amount;
        if let Err(e) = save_amount(self.store.as_ref(), currency, amount) {
            warn!(error = %e, "failed to persist stake");
        }
        self.events.emit(SessionEvent::StakeChanged { stake: amount });
    }

    pub fn stake(&self) -> Money {
        self.state.lock().stake
    }

    pub fn set_turbo_mode(&self, ctx: &Context, enabled: bool) {
        let mut st = self.state.lock();
        st.turbo_mode = enabled;
        st.selection.clear();
        if enabled {
            self.fill_defaults(&mut st, ctx.profile.rtp, self.config.autofill_stagger_ms);
        } else {
            st.grid.set_hit(0);
            st.timers.cancel_autofill();
        }
        self.events.emit(SessionEvent::SelectionChanged {
            count: st.selection.count(),
        });
    }

    /// Toggle automation mode; the board and selection start over.
    pub fn set_auto_mode(&self, ctx: &Context, enabled: bool) -> Result<()> {
        let mut st = self.state.lock();
        if st.game_started {
            return Err(SessionError::Busy("round"));
        }
        st.auto_mode = enabled;
        st.grid.clear();
        st.selection.clear();
        if st.turbo_mode {
            self.fill_defaults(&mut st, ctx.profile.rtp, 0);
        }
        self.events.emit(SessionEvent::BoardReset);
        self.events.emit(SessionEvent::SelectionChanged {
            count: st.selection.count(),
        });
        Ok(())
    }

    /// Flip one cell of the bulk-reveal selection, bounded by `diamonds_max`.
    pub fn toggle_selection(&self, ctx: &Context, index: usize) -> Toggle {
        let mut st = self.state.lock();
        let limit = self.diamonds_max_for(&st, ctx.profile.rtp);
        let outcome = st.selection.toggle(index, limit);
        if outcome != Toggle::Rejected {
            self.events.emit(SessionEvent::SelectionChanged {
                count: st.selection.count(),
            });
        }
        outcome
    }

    /// Replace the selection with the desk's default pattern.
    ///
    /// With `stagger` the cells are added one tick-driven timer at a time.
    pub fn fill_default_selection(&self, ctx: &Context, stagger: bool) {
        let mut st = self.state.lock();
        st.selection.clear();
        let stagger_ms = if stagger { self.config.autofill_stagger_ms } else { 0 };
        self.fill_defaults(&mut st, ctx.profile.rtp, stagger_ms);
        self.events.emit(SessionEvent::SelectionChanged {
            count: st.selection.count(),
        });
    }

    pub(crate) fn fill_defaults(&self, st: &mut SessionState, rtp: f64, stagger_ms: u32) {
        st.timers.cancel_autofill();
        let limit = self.diamonds_max_for(st, rtp);
        st.fill_limit = limit;
        for (i, index) in default_pattern(st.grid.desk(), limit).into_iter().enumerate() {
            if stagger_ms == 0 {
                if !st.selection.is_selected(index) {
                    st.selection.toggle(index, limit);
                }
            } else {
                st.timers
                    .schedule(TimerKind::Autofill(index), stagger_ms.saturating_mul(i as u32));
            }
        }
    }

    // ============== Derived values ==============

    fn diamonds_max_for(&self, st: &SessionState, rtp: f64) -> u32 {
        self.odds.diamonds_max(st.grid.desk(), st.grid.mines(), rtp)
    }

    fn coefficient_at(&self, ctx: &Context, st: &SessionState, hit: u32) -> f64 {
        self.payout_inputs(ctx, st).current_coefficient(&self.odds, hit)
    }

    fn payout_inputs(&self, ctx: &Context, st: &SessionState) -> PayoutInputs {
        PayoutInputs {
            desk: st.grid.desk(),
            mines: st.grid.mines(),
            rtp: ctx.profile.rtp,
            stake: st.stake,
            max_win: ctx.limits.max_win,
        }
    }

    fn mines_min(&self) -> u32 {
        if self.config.theme.game_name() == "turbomines" {
            self.config.mines_min
        } else {
            MINES_AMOUNT_MIN
        }
    }

    fn validate_mines(&self, st: &SessionState) -> Result<()> {
        let min = self.mines_min();
        let max = st.grid.desk().mines_max();
        let mines = st.grid.mines();
        if mines == 0 || mines < min || mines > max {
            let target = if self.config.theme.game_name() == "dogstreet" {
                "cats"
            } else {
                "mines"
            };
            return Err(SessionError::InvalidMines { min, max, target });
        }
        Ok(())
    }

    /// Highest payable hit count for the current desk and mine count.
    pub fn diamonds_max(&self, ctx: &Context) -> u32 {
        let st = self.state.lock();
        self.diamonds_max_for(&st, ctx.profile.rtp)
    }

    /// Inline validation message for the mine count.
    pub fn mines_error(&self) -> Option<String> {
        let st = self.state.lock();
        self.validate_mines(&st).err().map(|e| e.to_string())
    }

    /// Stake problem that blocks starting a round.
    pub fn stake_error(&self, ctx: &Context) -> Option<SessionError> {
        let stake = self.state.lock().stake;
        if stake.is_zero() {
            return Some(SessionError::InvalidStake);
        }
        match ctx.profile.balance {
            Some(balance) if balance.is_zero() || balance < stake => {
                Some(SessionError::InsufficientBalance)
            }
            _ => None,
        }
    }

    pub fn hits(&self, ctx: &Context) -> Vec<HitTier> {
        let st = self.state.lock();
        self.payout_inputs(ctx, &st).hits(&self.odds, st.grid.hit())
    }

    pub fn possible_win(&self, ctx: &Context) -> Money {
        let st = self.state.lock();
        self.payout_inputs(ctx, &st).possible_win(&self.odds, st.grid.hit())
    }

    pub fn possible_win_next(&self, ctx: &Context) -> Money {
        let st = self.state.lock();
        self.payout_inputs(ctx, &st)
            .possible_win_next(&self.odds, st.grid.hit())
    }

    /// Multiplier at `hit` for the current desk and mine count.
    pub fn coefficient_for(&self, ctx: &Context, hit: u32) -> Result<f64> {
        let st = self.state.lock();
        Ok(self
            .odds
            .coefficient(st.grid.mines(), hit, st.grid.desk(), ctx.profile.rtp)?)
    }

    pub fn current_coefficient(&self, ctx: &Context) -> f64 {
        let st = self.state.lock();
        self.coefficient_at(ctx, &st, st.grid.hit())
    }

    pub fn risk_level(&self, ctx: &Context) -> u8 {
        let st = self.state.lock();
        let diamonds = st
            .grid
            .tiles()
            .iter()
            .filter(|t| **t == Tile::Diamond)
            .count() as u32;
        payout::risk_level(self.diamonds_max_for(&st, ctx.profile.rtp), diamonds)
    }

    pub fn turbo_risk_level(&self) -> u8 {
        let st = self.state.lock();
        payout::turbo_risk_level(st.grid.desk(), st.grid.hit())
    }

    /// Board and bet controls are frozen.
    pub fn locked_ui(&self, ctx: &Context) -> bool {
        ctx.autobet.is_enabled() || self.state.lock().game_started
    }

    /// Start buttons are disabled.
    pub fn locked_buttons(&self, ctx: &Context) -> bool {
        let (game_started, retrieve_loading) = {
            let st = self.state.lock();
            (st.game_started, st.retrieve_loading)
        };
        !game_started
            && (self.stake_error(ctx).is_some()
                || self.mines_error().is_some()
                || !ctx.profile.token_present
                || retrieve_loading)
    }

    pub fn table_touched(&self) -> bool {
        self.state.lock().grid.is_touched()
    }

    pub fn mines_amount_max(&self) -> u32 {
        self.state.lock().grid.desk().mines_max()
    }

    pub fn target_amount_max(&self) -> u32 {
        let cells = self.state.lock().grid.desk().cells() as u32;
        cells.saturating_sub(self.mines_min())
    }

    pub fn target_amount_min(&self) -> u32 {
        let cells = self.state.lock().grid.desk().cells() as u32;
        cells.saturating_sub(self.mines_amount_max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::ScriptedApi;
    use crate::types::Theme;

    fn session(api: Arc<ScriptedApi>) -> Session {
        Session::new(api, Arc::new(MemoryStore::new()), SessionConfig::immediate())
    }

    fn ctx() -> Context {
        let mut ctx = Context::default();
        ctx.profile.balance = Some(Money::from_cents(10_000));
        ctx.profile.token_present = true;
        ctx.limits.max_bet = Money::from_cents(10_000);
        ctx.limits.max_win = Money::from_cents(1_000_000);
        ctx
    }

    #[test]
    fn mines_error_message() {
        let s = session(Arc::new(ScriptedApi::default()));
        assert_eq!(s.mines_error(), None);
        s.set_mines_amount(&ctx(), 0).unwrap();
        assert_eq!(s.mines_error().as_deref(), Some("Please choose from 1 to 24 mines"));
        s.set_mines_amount(&ctx(), 25).unwrap();
        assert!(s.mines_error().is_some());
    }

    #[test]
    fn dogstreet_counts_cats() {
        let config = SessionConfig {
            theme: Theme::new("dogstreet"),
            ..SessionConfig::immediate()
        };
        let s = Session::new(
            Arc::new(ScriptedApi::default()),
            Arc::new(MemoryStore::new()),
            config,
        );
        s.set_mines_amount(&ctx(), 30).unwrap();
        assert_eq!(s.mines_error().as_deref(), Some("Please choose from 1 to 24 cats"));
    }

    #[test]
    fn desk_size_resets_board_and_mines() {
        let s = session(Arc::new(ScriptedApi::default()));
        s.set_desk_size(DeskSize::Nine).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.tiles.len(), 81);
        assert_eq!(snap.selection.len(), 81);
        assert_eq!(snap.mines, 10);
        assert_eq!(snap.hit, 0);
        assert_eq!(s.mines_amount_max(), 80);
        assert_eq!(s.target_amount_max(), 80);
        assert_eq!(s.target_amount_min(), 1);
    }

    #[test]
    fn selection_bounded_by_diamonds_max() {
        let s = session(Arc::new(ScriptedApi::default()));
        let ctx = ctx();
        s.set_desk_size(DeskSize::Three).unwrap();
        s.set_mines_amount(&ctx, 8).unwrap();
        assert_eq!(s.diamonds_max(&ctx), 1);
        assert_eq!(s.toggle_selection(&ctx, 0), Toggle::Selected);
        assert_eq!(s.toggle_selection(&ctx, 1), Toggle::Rejected);
        assert_eq!(s.toggle_selection(&ctx, 0), Toggle::Deselected);
    }

    #[test]
    fn turbo_fill_is_staggered_by_ticks() {
        let config = SessionConfig {
            autofill_stagger_ms: 50,
            ..SessionConfig::immediate()
        };
        let s = Session::new(
            Arc::new(ScriptedApi::default()),
            Arc::new(MemoryStore::new()),
            config,
        );
        s.set_turbo_mode(&ctx(), true);
        // First cell has zero delay but still waits for a tick.
        assert_eq!(s.snapshot().selected_count(), 0);
        s.tick(0);
        assert_eq!(s.snapshot().selected_count(), 1);
        s.tick(50);
        assert_eq!(s.snapshot().selected_count(), 2);
        s.tick(1000);
        assert_eq!(s.snapshot().selection[10], Some(10));
        assert_eq!(s.snapshot().selected_count(), 5);
    }

    #[test]
    fn desk_change_cancels_pending_fill() {
        let config = SessionConfig {
            autofill_stagger_ms: 50,
            ..SessionConfig::immediate()
        };
        let s = Session::new(
            Arc::new(ScriptedApi::default()),
            Arc::new(MemoryStore::new()),
            config,
        );
        s.set_turbo_mode(&ctx(), true);
        s.set_desk_size(DeskSize::Three).unwrap();
        s.tick(10_000);
        assert_eq!(s.snapshot().selected_count(), 0);
    }

    #[test]
    fn locked_buttons_without_token_or_stake() {
        let s = session(Arc::new(ScriptedApi::default()));
        let mut ctx = ctx();
        assert!(s.locked_buttons(&ctx));
        s.set_amount(&ctx, Money::from_cents(100)).unwrap();
        assert!(!s.locked_buttons(&ctx));
        ctx.profile.token_present = false;
        assert!(s.locked_buttons(&ctx));
        assert!(!s.locked_ui(&ctx));
    }

    #[test]
    fn derived_figures_at_zero_hits() {
        let s = session(Arc::new(ScriptedApi::default()));
        let ctx = ctx();
        s.set_amount(&ctx, Money::from_cents(100)).unwrap();
        assert_eq!(s.current_coefficient(&ctx), 1.0);
        assert_eq!(s.possible_win(&ctx), Money::from_cents(100));
        assert!(s.possible_win_next(&ctx) > Money::from_cents(100));
        assert_eq!(s.hits(&ctx).len() as u32, s.diamonds_max(&ctx));
        assert_eq!(s.turbo_risk_level(), 1);
        assert!(!s.table_touched());
    }

    #[test]
    fn coefficient_for_rejects_invalid_board() {
        let s = session(Arc::new(ScriptedApi::default()));
        let ctx = ctx();
        assert_eq!(s.coefficient_for(&ctx, 0).unwrap(), 1.0);
        assert!(s.coefficient_for(&ctx, 3).unwrap() > 1.0);
        assert!(matches!(s.coefficient_for(&ctx, 23), Err(SessionError::Odds(_))));
        s.set_mines_amount(&ctx, 0).unwrap();
        assert!(matches!(s.coefficient_for(&ctx, 1), Err(SessionError::Odds(_))));
    }

    #[tokio::test]
    async fn start_requires_stake() {
        let api = Arc::new(ScriptedApi::default());
        let s = session(api.clone());
        let err = s.start(&ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidStake));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn start_checks_balance() {
        let api = Arc::new(ScriptedApi::default());
        let s = session(api.clone());
        let mut ctx = ctx();
        s.set_amount(&ctx, Money::from_cents(500)).unwrap();
        ctx.profile.balance = Some(Money::from_cents(499));
        let err = s.start(&ctx).await.unwrap_err();
        assert!(matches!(err, SessionError::InsufficientBalance));
        assert!(err.is_validation());
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn tap_without_round_is_rejected() {
        let api = Arc::new(ScriptedApi::default());
        let s = session(api.clone());
        let err = s.tap(&ctx(), 3).await.unwrap_err();
        assert!(matches!(err, SessionError::NoActiveRound));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn tap_sends_first_reveal_params_once() {
        let api = Arc::new(ScriptedApi::default());
        api.push_create("r-1");
        api.push_reveal(r#"{"status":1}"#);
        api.push_reveal(r#"{"status":1}"#);
        let s = session(api.clone());
        let ctx = ctx();
        s.set_amount(&ctx, Money::from_cents(100)).unwrap();
        s.start(&ctx).await.unwrap();

        assert_eq!(s.tap(&ctx, 4).await.unwrap(), Tile::Diamond);
        assert_eq!(s.tap(&ctx, 5).await.unwrap(), Tile::Diamond);

        let reveals = api.reveal_requests();
        assert!(reveals[0].first.is_some());
        assert!(reveals[1].first.is_none());
        let snap = s.snapshot();
        assert_eq!(snap.hit, 2);
        assert!(snap.bet_placed);
        assert_eq!(snap.phase, Phase::Active);
        assert!(!snap.tap_loading);
    }

    #[tokio::test]
    async fn mine_settles_and_reset_timer_returns_to_idle() {
        let api = Arc::new(ScriptedApi::default());
        api.push_create("r-1");
        api.push_reveal(r#"{"status":0,"result":"lost","payout":0,"coefficient":0,"mines":[4,9,16]}"#);
        let s = session(api.clone());
        let ctx = ctx();
        s.set_amount(&ctx, Money::from_cents(100)).unwrap();
        s.start(&ctx).await.unwrap();

        assert_eq!(s.tap(&ctx, 4).await.unwrap(), Tile::Mine);
        let snap = s.snapshot();
        assert_eq!(snap.phase, Phase::Settled);
        assert_eq!(snap.result, Some(RoundResult::Lost));
        assert!(snap.is_opened_table);
        assert!(snap.tiles.iter().all(|t| t.is_revealed()));
        assert_eq!(snap.round_id, None);
        assert_eq!(snap.my_bets_updater, 1);

        s.tick(0);
        let snap = s.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert!(!snap.game_started);
        assert!(snap.tiles.iter().all(|t| *t == Tile::Hidden));
    }

    #[tokio::test]
    async fn cancel_externally_keeps_board_until_reset() {
        let api = Arc::new(ScriptedApi::default());
        api.push_create("r-1");
        let s = session(api);
        let ctx = ctx();
        s.set_amount(&ctx, Money::from_cents(100)).unwrap();
        s.start(&ctx).await.unwrap();

        s.cancel_externally();
        assert_eq!(s.snapshot().phase, Phase::CancelledExternally);
        assert_eq!(s.snapshot().round_id, None);
        s.tick(0);
        assert_eq!(s.snapshot().phase, Phase::Idle);
    }
}
