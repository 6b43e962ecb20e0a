//! Session recovery and startup helpers
//!
//! On attach the session asks the server whether a round is still in flight
//! and rebuilds the board from the answer. "No round" is the normal case, and
//! any answer missing the fields needed to resume is treated the same way:
//! the session stays idle instead of showing a half-restored board.

use tracing::{debug, info, warn};

use crate::adapter::{ActiveRoundResponse, RetrieveRoundRequest};
use crate::context::Context;
use crate::error::{Result, SessionError};
use crate::events::{AlertLevel, SessionEvent};
use crate::session::Session;
use crate::storage::saved_amount;
use crate::types::{DeskSize, Limits, Money, Phase, RoundId};

/// An in-flight round with every field needed to resume it.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredRound {
    pub round_id: RoundId,
    pub client_seed: String,
    pub nonce: u64,
    pub opened: Vec<usize>,
    pub mines: u32,
    pub desk: DeskSize,
    pub stake: Option<Money>,
}

impl RestoredRound {
    /// Validate a server view; `None` means there is nothing to resume.
    pub fn from_response(view: ActiveRoundResponse, current_desk: DeskSize) -> Option<Self> {
        let client_seed = view.client_seed.filter(|s| !s.is_empty())?;
        let nonce = view.nonce.filter(|n| *n != 0)?;
        let opened = view.opened?;
        let mines = view.mines_amount.filter(|m| *m != 0)?;
        let round_id = view.round_id?;
        let desk = view.desk_size.unwrap_or(current_desk);
        if mines > desk.mines_max() {
            return None;
        }
        Some(Self {
            round_id,
            client_seed,
            nonce,
            opened,
            mines,
            desk,
            stake: view.amount.filter(|a| !a.is_zero()),
        })
    }
}

impl Session {
    /// Resume a round held server-side, if there is one.
    pub async fn recover(&self, ctx: &Context) -> Result<Option<RoundId>> {
        {
            let mut st = self.state.lock();
            if st.retrieve_loading {
                return Err(SessionError::Busy("recovery"));
            }
            if st.round_id.is_some() {
                return Err(SessionError::RoundActiveElsewhere);
            }
            st.retrieve_loading = true;
        }

        let request = RetrieveRoundRequest {
            theme: self.config.theme.server_name().to_string(),
        };
        let response = self.api.retrieve_round(request).await;

        let mut st = self.state.lock();
        st.retrieve_loading = false;
        let view = match response {
            Ok(view) => view,
            Err(err) => {
                warn!(error = %err, "round recovery failed; starting idle");
                st.game_started = false;
                return Ok(None);
            }
        };
        let Some(round) = RestoredRound::from_response(view, st.grid.desk()) else {
            debug!("no active round to recover");
            st.game_started = false;
            return Ok(None);
        };

        if round.desk != st.grid.desk() {
            st.timers.cancel_autofill();
            st.grid.resize(round.desk);
            st.selection.resize(round.desk);
        }
        st.grid.set_mines(round.mines);
        st.grid.restore(&round.opened);
        st.opened = round.opened.clone();
        st.seeds.client_seed = round.client_seed;
        st.seeds.nonce = round.nonce;
        if let Some(seed_override) = &self.seed_override {
            seed_override.apply(&mut st.seeds);
        }
        st.round_id = Some(round.round_id.clone());
        st.game_started = true;
        st.phase = Phase::Active;
        if let Some(stake) = round.stake {
            st.bet_placed = true;
            self.apply_stake(&mut st, &ctx.profile.currency, stake);
        }
        info!(
            round_id = %round.round_id,
            desk = %round.desk,
            mines = round.mines,
            hit = st.grid.hit(),
            "round recovered"
        );
        self.events.emit(SessionEvent::RoundCreated {
            round_id: round.round_id.clone(),
        });
        self.events.alert(AlertLevel::Success, "Continue your round");
        Ok(Some(round.round_id))
    }

    /// Pick the starting stake: saved value, else default bet, else ten
    /// minimum bets, never more than the known balance.
    ///
    /// Has no effect while a round is started; returns the stake in force.
    pub fn restore_amount(&self, ctx: &Context) -> Money {
        let saved = saved_amount(self.store.as_ref(), &ctx.profile.currency);
        let mut st = self.state.lock();
        if st.game_started {
            return st.stake;
        }
        let limits = &ctx.limits;
        let candidate = saved
            .or_else(|| (!limits.default_bet.is_zero()).then_some(limits.default_bet))
            .unwrap_or_else(|| limits.min_bet.saturating_mul(10));
        let amount = match ctx.profile.balance {
            Some(balance) => candidate.min(balance),
            None => candidate,
        };
        debug!(%amount, from_store = saved.is_some(), "stake restored");
        st.stake = amount;
        self.events.emit(SessionEvent::StakeChanged { stake: amount });
        amount
    }

    /// Betting limits for the current player.
    pub async fn fetch_limits(&self) -> Result<Limits> {
        match self.api.fetch_limits().await {
            Ok(limits) => {
                debug!(min = %limits.min_bet, max = %limits.max_bet, max_win = %limits.max_win, "limits fetched");
                Ok(limits)
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch limits");
                Err(SessionError::Api(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> ActiveRoundResponse {
        serde_json::from_str(
            r#"{"clientSeed":"c","hash":"h","nonce":3,"opened":[1,2],"minesAmount":5,"amount":2.5,"deskSize":49,"roundId":"r-7"}"#,
        )
        .unwrap()
    }

    #[test]
    fn complete_view_restores() {
        let round = RestoredRound::from_response(full(), DeskSize::Five).unwrap();
        assert_eq!(round.round_id.as_str(), "r-7");
        assert_eq!(round.desk, DeskSize::Seven);
        assert_eq!(round.mines, 5);
        assert_eq!(round.opened, vec![1, 2]);
        assert_eq!(round.stake, Some(Money::from_cents(250)));
    }

    #[test]
    fn missing_fields_mean_no_round() {
        let mut view = full();
        view.nonce = None;
        assert_eq!(RestoredRound::from_response(view, DeskSize::Five), None);

        let mut view = full();
        view.nonce = Some(0);
        assert_eq!(RestoredRound::from_response(view, DeskSize::Five), None);

        let mut view = full();
        view.client_seed = Some(String::new());
        assert_eq!(RestoredRound::from_response(view, DeskSize::Five), None);

        let mut view = full();
        view.opened = None;
        assert_eq!(RestoredRound::from_response(view, DeskSize::Five), None);

        let mut view = full();
        view.mines_amount = Some(0);
        assert_eq!(RestoredRound::from_response(view, DeskSize::Five), None);

        assert_eq!(
            RestoredRound::from_response(ActiveRoundResponse::default(), DeskSize::Five),
            None
        );
    }

    #[test]
    fn desk_falls_back_to_current() {
        let mut view = full();
        view.desk_size = None;
        let round = RestoredRound::from_response(view, DeskSize::Five).unwrap();
        assert_eq!(round.desk, DeskSize::Five);
    }

    #[test]
    fn mine_count_must_fit_desk() {
        let mut view = full();
        view.desk_size = Some(DeskSize::Three);
        view.mines_amount = Some(9);
        assert_eq!(RestoredRound::from_response(view, DeskSize::Five), None);
    }
}
