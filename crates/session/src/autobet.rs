//! Autobet loop
//!
//! Plays the current selection round after round until a stop condition
//! holds. The loop is cooperative: it checks the shared [`AutobetControl`]
//! at every iteration boundary and never interrupts a request in flight, so
//! a stop from the UI takes effect once the current round settles.
//!
//! Per iteration:
//!
//! 1. Stop if automation is disabled, the bet count is exhausted, or nothing is selected
//! 2. Start a round and reveal the whole selection
//! 3. Count the bet against the limit
//! 4. On a win, stop if asked to stop on any win; otherwise apply the win rule
//! 5. On a loss, apply the loss rule
//! 6. Pause, clear the board, repeat
//!
//! [`AutobetControl`]: crate::context::AutobetControl

use tracing::{info, warn};

use crate::context::{Context, StakeRule};
use crate::error::{Result, SessionError};
use crate::events::{AlertLevel, SessionEvent};
use crate::session::Session;
use crate::timers::TimerKind;
use crate::types::{Money, Phase, RoundResult};

/// Stake for the next round after applying `rule`.
///
/// An increase is capped at `max_bet` (a zero `max_bet` means limits are
/// unknown and nothing is capped); without an increase the stake returns to
/// `initial`.
pub fn next_stake(current: Money, rule: StakeRule, initial: Money, max_bet: Money) -> Money {
    if !rule.increase {
        return initial;
    }
    if rule.percent <= 0.0 {
        return current;
    }
    let grown = current.increased_by_percent(rule.percent);
    if !max_bet.is_zero() && grown > max_bet {
        max_bet
    } else {
        grown
    }
}

/// Totals for one autobet run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutobetSummary {
    pub rounds: u32,
    pub wins: u32,
    pub losses: u32,
    pub final_stake: Money,
}

enum Step {
    Continue,
    Stop,
}

impl Session {
    /// Enable automation and run the loop until it stops.
    pub async fn start_autobet(&self, ctx: &Context) -> Result<AutobetSummary> {
        if let Some(balance) = ctx.profile.balance {
            if balance.is_zero() {
                self.events
                    .alert(AlertLevel::Error, SessionError::InsufficientBalance.to_string());
                return Err(SessionError::InsufficientBalance);
            }
        }
        let stake = self.stake();
        ctx.autobet.update(|c| {
            if c.bets_remaining > 0 {
                c.limit_enabled = true;
            }
            c.initial_amount = stake;
            c.enabled = true;
        });
        info!(%stake, config = ?ctx.autobet.get(), "autobet started");
        self.run_autobet(ctx).await
    }

    /// Run iterations while the shared configuration allows it.
    pub async fn run_autobet(&self, ctx: &Context) -> Result<AutobetSummary> {
        let mut summary = AutobetSummary::default();
        loop {
            let config = ctx.autobet.get();
            let exhausted = config.limit_enabled && config.bets_remaining == 0;
            let nothing_selected = self.state.lock().selection.is_empty();
            if !config.enabled || exhausted || nothing_selected {
                info!(
                    enabled = config.enabled,
                    exhausted,
                    nothing_selected,
                    rounds = summary.rounds,
                    "autobet finished"
                );
                self.stop_autobet(ctx);
                summary.final_stake = self.stake();
                return Ok(summary);
            }

            match self.autobet_round(ctx, &mut summary).await {
                Ok(Step::Continue) => {}
                Ok(Step::Stop) => {
                    summary.final_stake = self.stake();
                    return Ok(summary);
                }
                Err(e) => {
                    warn!(error = %e, rounds = summary.rounds, "autobet aborted");
                    if !matches!(e, SessionError::Api(_)) {
                        self.events.alert(AlertLevel::Error, e.to_string());
                    }
                    self.stop_autobet(ctx);
                    self.state.lock().cancel_round();
                    self.events.emit(SessionEvent::BoardReset);
                    return Err(e);
                }
            }
        }
    }

    async fn autobet_round(&self, ctx: &Context, summary: &mut AutobetSummary) -> Result<Step> {
        let config = ctx.autobet.get();
        let settlement = self.play_selection(ctx, self.config.settle_reset_ms).await?;

        if config.limit_enabled {
            ctx.autobet
                .update(|c| c.bets_remaining = c.bets_remaining.saturating_sub(1));
        }
        summary.rounds += 1;
        info!(
            round = summary.rounds,
            result = settlement.result.as_str(),
            payout = %settlement.payout,
            "autobet round settled"
        );

        let mut stop = false;
        match settlement.result {
            RoundResult::Won => {
                summary.wins += 1;
                if config.stop_on_any_win {
                    tokio::time::sleep(self.config.autobet_stop_delay()).await;
                    self.stop_autobet(ctx);
                    ctx.autobet.update(|c| c.stop_on_any_win = false);
                    stop = true;
                } else {
                    self.adjust_stake(ctx, config.on_win, config.initial_amount);
                }
            }
            RoundResult::Lost => {
                summary.losses += 1;
                self.adjust_stake(ctx, config.on_lose, config.initial_amount);
            }
        }

        tokio::time::sleep(self.config.autobet_pause()).await;
        self.clear_after_round();

        Ok(if stop { Step::Stop } else { Step::Continue })
    }

    fn adjust_stake(&self, ctx: &Context, rule: StakeRule, initial: Money) {
        let mut st = self.state.lock();
        let next = next_stake(st.stake, rule, initial, ctx.limits.max_bet);
        if next != st.stake {
            self.apply_stake(&mut st, &ctx.profile.currency, next);
        }
    }

    fn clear_after_round(&self) {
        let mut st = self.state.lock();
        if st.round_id.is_some() {
            return;
        }
        st.timers.cancel(TimerKind::ResetRound);
        st.reset_game();
        st.phase = Phase::Idle;
        self.events.emit(SessionEvent::BoardReset);
    }

    /// Disable automation and start the selection over.
    pub fn stop_autobet(&self, ctx: &Context) {
        ctx.autobet.update(|c| {
            c.enabled = false;
            c.limit_enabled = false;
        });
        let mut st = self.state.lock();
        st.timers.cancel_autofill();
        st.selection.clear();
        if st.turbo_mode {
            self.fill_defaults(&mut st, ctx.profile.rtp, self.config.autofill_stagger_ms);
        }
        st.grid.set_hit(0);
        self.events.emit(SessionEvent::AutobetStopped);
        self.events.emit(SessionEvent::SelectionChanged {
            count: st.selection.count(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(cents: u64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn win_increase_grows_stake() {
        let next = next_stake(m(500), StakeRule::increase_by(50.0), m(100), m(1000));
        assert_eq!(next, m(750));
    }

    #[test]
    fn increase_clamps_to_max_bet() {
        let next = next_stake(m(500), StakeRule::increase_by(50.0), m(100), m(700));
        assert_eq!(next, m(700));
    }

    #[test]
    fn no_increase_resets_to_initial() {
        assert_eq!(next_stake(m(900), StakeRule::reset(), m(100), m(1000)), m(100));
    }

    #[test]
    fn zero_percent_keeps_stake() {
        assert_eq!(next_stake(m(300), StakeRule::increase_by(0.0), m(100), m(1000)), m(300));
    }

    #[test]
    fn unknown_max_bet_does_not_cap() {
        assert_eq!(next_stake(m(500), StakeRule::increase_by(100.0), m(100), Money::ZERO), m(1000));
    }
}
