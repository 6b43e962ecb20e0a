use std::sync::Arc;

use mines::adapter::ApiError;
use mines::session::testing::ScriptedApi;
use mines::session::{
    Context, MemoryStore, SeedOverride, Session, SessionConfig, SessionError, SessionEvent,
};
use mines::types::{DeskSize, Money, Phase, Tile};

fn session(api: Arc<ScriptedApi>) -> Session {
    Session::new(api, Arc::new(MemoryStore::new()), SessionConfig::immediate())
}

fn ctx() -> Context {
    let mut ctx = Context::default();
    ctx.profile.balance = Some(Money::from_cents(10_000));
    ctx.profile.token_present = true;
    ctx.limits.max_win = Money::from_cents(1_000_000);
    ctx
}

#[tokio::test]
async fn missing_nonce_means_no_round() {
    let api = ScriptedApi::new();
    api.push_retrieve(
        r#"{"clientSeed":"abc","hash":"h","opened":[1],"minesAmount":3,"amount":1.0,"deskSize":25,"roundId":"r-9"}"#,
    );
    let s = session(api.clone());

    let restored = s.recover(&ctx()).await.expect("recovery never fails on bad data");
    assert_eq!(restored, None);
    let snap = s.snapshot();
    assert!(!snap.game_started);
    assert!(!snap.retrieve_loading);
    assert_eq!(snap.phase, Phase::Idle);
    assert_eq!(snap.round_id, None);
}

#[tokio::test]
async fn server_error_means_no_round() {
    let api = ScriptedApi::new();
    api.push_retrieve_error(ApiError::Transport("offline".into()));
    let s = session(api);

    assert_eq!(s.recover(&ctx()).await.unwrap(), None);
    assert!(!s.snapshot().retrieve_loading);
}

#[tokio::test]
async fn complete_view_resumes_round() {
    let api = ScriptedApi::new();
    api.push_retrieve(
        r#"{"clientSeed":"abc","hash":"h","nonce":4,"opened":[3,17],"minesAmount":5,"amount":2.5,"deskSize":49,"roundId":"r-9"}"#,
    );
    api.push_reveal(r#"{"status":1}"#);
    let s = session(api.clone());
    let ctx = ctx();
    let mut events = s.subscribe();

    let round_id = s.recover(&ctx).await.unwrap().expect("round resumed");
    assert_eq!(round_id.as_str(), "r-9");

    let snap = s.snapshot();
    assert_eq!(snap.desk, DeskSize::Seven);
    assert_eq!(snap.tiles.len(), 49);
    assert_eq!(snap.mines, 5);
    assert_eq!(snap.hit, 2);
    assert_eq!(snap.tiles[3], Tile::Diamond);
    assert_eq!(snap.tiles[17], Tile::Diamond);
    assert_eq!(snap.client_seed, "abc");
    assert_eq!(snap.nonce, 4);
    assert_eq!(snap.stake, Money::from_cents(250));
    assert_eq!(snap.phase, Phase::Active);
    assert!(snap.game_started);
    assert!(snap.bet_placed);

    let mut alerts = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Alert { message, .. } = event {
            alerts.push(message);
        }
    }
    assert_eq!(alerts, vec!["Continue your round".to_string()]);

    // The resumed round plays on without resending first-reveal params.
    assert_eq!(s.tap(&ctx, 20).await.unwrap(), Tile::Diamond);
    let reveal = &api.reveal_requests()[0];
    assert_eq!(reveal.round_id.as_str(), "r-9");
    assert!(reveal.first.is_none());
    assert_eq!(s.snapshot().hit, 3);
}

#[tokio::test]
async fn seed_override_survives_recovery() {
    let api = ScriptedApi::new();
    api.push_retrieve(
        r#"{"clientSeed":"abc","hash":"h","nonce":4,"opened":[3],"minesAmount":3,"amount":1.0,"deskSize":25,"roundId":"r-9"}"#,
    );
    api.push_reveal(r#"{"status":1}"#);
    let pinned = SeedOverride::from_query("serverSeed=srv&nonce=42&clientSeed=pinned").unwrap();
    let s = session(api.clone()).with_seed_override(pinned);
    let ctx = ctx();

    s.recover(&ctx).await.unwrap().expect("round resumed");
    let snap = s.snapshot();
    assert_eq!(snap.client_seed, "pinned");
    assert_eq!(snap.server_seed.as_deref(), Some("srv"));
    assert_eq!(snap.nonce, 42);
    assert_eq!(snap.hit, 1);

    s.tap(&ctx, 7).await.unwrap();
    assert_eq!(api.reveal_requests()[0].server_seed.as_deref(), Some("srv"));
}

#[tokio::test]
async fn partial_override_keeps_restored_client_seed() {
    let api = ScriptedApi::new();
    api.push_retrieve(
        r#"{"clientSeed":"abc","hash":"h","nonce":4,"opened":[],"minesAmount":3,"amount":1.0,"deskSize":25,"roundId":"r-9"}"#,
    );
    let pinned = SeedOverride::from_query("serverSeed=srv").unwrap();
    let s = session(api).with_seed_override(pinned);

    s.recover(&ctx()).await.unwrap().expect("round resumed");
    let snap = s.snapshot();
    assert_eq!(snap.client_seed, "abc");
    assert_eq!(snap.nonce, 4);
    assert_eq!(snap.server_seed.as_deref(), Some("srv"));
}

#[tokio::test]
async fn recover_refused_while_round_held() {
    let api = ScriptedApi::new();
    api.push_create("r-1");
    let s = session(api.clone());
    let ctx = ctx();
    s.set_amount(&ctx, Money::from_cents(100)).unwrap();
    s.start(&ctx).await.unwrap();

    let calls = api.calls();
    assert!(matches!(
        s.recover(&ctx).await,
        Err(SessionError::RoundActiveElsewhere)
    ));
    assert_eq!(api.calls(), calls);
}

#[tokio::test]
async fn limits_pass_through() {
    let api = ScriptedApi::new();
    api.push_limits(r#"{"minBet":0.1,"defaultBet":1,"maxBet":100,"maxWin":10000}"#);
    let s = session(api);

    let limits = s.fetch_limits().await.unwrap();
    assert_eq!(limits.min_bet, Money::from_cents(10));
    assert_eq!(limits.default_bet, Money::from_cents(100));
    assert_eq!(limits.max_bet, Money::from_cents(10_000));
    assert_eq!(limits.max_win, Money::from_cents(1_000_000));
}
