use std::sync::Arc;

use tokio_test::assert_err;

use mines::adapter::ApiError;
use mines::session::testing::ScriptedApi;
use mines::session::{
    AutobetConfig, Context, MemoryStore, Session, SessionConfig, SessionError, SessionEvent,
    StakeRule,
};
use mines::types::{Money, Phase};

const WON: &str = r#"{"result":"won","payout":2.0,"coefficient":2.0,"mines":[0,1,2]}"#;
const LOST: &str = r#"{"result":"lost","payout":0,"coefficient":0,"mines":[0,1,12]}"#;

fn ctx(config: AutobetConfig) -> Context {
    let mut ctx = Context::default();
    ctx.profile.balance = Some(Money::from_cents(100_000));
    ctx.profile.token_present = true;
    ctx.limits.max_bet = Money::from_cents(1_000);
    ctx.limits.max_win = Money::from_cents(10_000_000);
    ctx.autobet.update(|c| *c = config);
    ctx
}

fn armed(api: Arc<ScriptedApi>, ctx: &Context, stake_cents: u64) -> Session {
    let s = Session::new(api, Arc::new(MemoryStore::new()), SessionConfig::immediate());
    s.set_amount(ctx, Money::from_cents(stake_cents)).unwrap();
    for index in [10, 11, 12] {
        s.toggle_selection(ctx, index);
    }
    s
}

#[tokio::test]
async fn stop_on_any_win_ends_after_first_win() {
    let api = ScriptedApi::new();
    api.push_create("r-1");
    api.push_multi(WON);
    api.push_create("r-2");
    api.push_multi(WON);
    let ctx = ctx(AutobetConfig {
        stop_on_any_win: true,
        ..AutobetConfig::default()
    });
    let s = armed(api.clone(), &ctx, 100);

    let summary = s.start_autobet(&ctx).await.expect("autobet runs");
    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.wins, 1);
    assert_eq!(api.create_requests().len(), 1);

    let config = ctx.autobet.get();
    assert!(!config.enabled);
    assert!(!config.stop_on_any_win);
    assert_eq!(s.snapshot().selected_count(), 0);
}

#[tokio::test]
async fn bet_count_limits_rounds() {
    let api = ScriptedApi::new();
    for id in ["r-1", "r-2", "r-3"] {
        api.push_create(id);
        api.push_multi(LOST);
    }
    let ctx = ctx(AutobetConfig {
        bets_remaining: 2,
        ..AutobetConfig::default()
    });
    let s = armed(api.clone(), &ctx, 100);

    let summary = s.start_autobet(&ctx).await.expect("autobet runs");
    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.losses, 2);
    assert_eq!(api.create_requests().len(), 2);
    assert_eq!(api.multi_requests().len(), 2);

    let config = ctx.autobet.get();
    assert_eq!(config.bets_remaining, 0);
    assert!(!config.enabled);
    assert!(!config.limit_enabled);
    assert_eq!(s.snapshot().phase, Phase::Idle);
}

#[tokio::test]
async fn stake_rules_follow_results() {
    let api = ScriptedApi::new();
    api.push_create("r-1");
    api.push_multi(LOST);
    api.push_create("r-2");
    api.push_multi(LOST);
    api.push_create("r-3");
    api.push_multi(WON);
    let ctx = ctx(AutobetConfig {
        bets_remaining: 3,
        on_lose: StakeRule::increase_by(100.0),
        on_win: StakeRule::reset(),
        ..AutobetConfig::default()
    });
    let s = armed(api.clone(), &ctx, 300);

    let summary = s.start_autobet(&ctx).await.expect("autobet runs");
    assert_eq!(summary.rounds, 3);

    let stakes: Vec<Money> = api.multi_requests().iter().map(|r| r.amount).collect();
    // Second loss doubles past max bet and is capped.
    assert_eq!(
        stakes,
        vec![Money::from_cents(300), Money::from_cents(600), Money::from_cents(1_000)]
    );
    assert_eq!(summary.final_stake, Money::from_cents(300));
}

#[tokio::test]
async fn stop_request_ends_loop_after_current_round() {
    let api = ScriptedApi::new();
    api.push_create("r-1");
    api.push_multi(LOST);
    let ctx = ctx(AutobetConfig::default());
    let config = SessionConfig {
        autobet_pause_ms: 50,
        ..SessionConfig::immediate()
    };
    let s = Session::new(api.clone(), Arc::new(MemoryStore::new()), config);
    s.set_amount(&ctx, Money::from_cents(100)).unwrap();
    s.toggle_selection(&ctx, 10);

    // Nothing else is scripted, so a second round would fail the loop.
    let control = ctx.autobet.clone();
    let mut events = s.subscribe();
    let stopper = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if matches!(event, SessionEvent::Settled { .. }) {
                control.request_stop();
                break;
            }
        }
    });

    let summary = s.start_autobet(&ctx).await.expect("autobet stops cleanly");
    stopper.await.unwrap();
    assert_eq!(summary.rounds, 1);
    assert_eq!(api.create_requests().len(), 1);
}

#[tokio::test]
async fn failure_aborts_loop_and_clears_round() {
    let api = ScriptedApi::new();
    api.push_create("r-1");
    api.push_multi_error(ApiError::Transport("timed out".into()));
    let ctx = ctx(AutobetConfig::default());
    let s = armed(api.clone(), &ctx, 100);

    let err = assert_err!(s.start_autobet(&ctx).await);
    assert!(matches!(err, SessionError::Api(_)));
    assert!(!ctx.autobet.is_enabled());
    let snap = s.snapshot();
    assert_eq!(snap.round_id, None);
    assert_eq!(snap.phase, Phase::Idle);
}

#[tokio::test]
async fn zero_balance_refuses_to_start() {
    let api = ScriptedApi::new();
    let mut ctx = ctx(AutobetConfig::default());
    let s = armed(api.clone(), &ctx, 100);
    ctx.profile.balance = Some(Money::ZERO);

    let err = assert_err!(s.start_autobet(&ctx).await);
    assert!(matches!(err, SessionError::InsufficientBalance));
    assert!(!ctx.autobet.is_enabled());
    assert_eq!(api.calls(), 0);
}

#[tokio::test]
async fn manual_reveals_blocked_while_automated() {
    let api = ScriptedApi::new();
    let ctx = ctx(AutobetConfig {
        enabled: true,
        ..AutobetConfig::default()
    });
    let s = armed(api.clone(), &ctx, 100);

    assert!(matches!(
        s.tap(&ctx, 0).await,
        Err(SessionError::AutomationActive)
    ));
    assert!(matches!(
        s.multi_tap(&ctx).await,
        Err(SessionError::AutomationActive)
    ));
    assert!(s.locked_ui(&ctx));
}
