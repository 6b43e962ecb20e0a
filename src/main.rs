//! Headless mines runner (default binary).
//!
//! Drives the session engine against a live game server from the command
//! line. Server settings come from `MINES_*` environment variables; logging
//! is controlled with `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mines::adapter::{ApiConfig, HttpApi};
use mines::core::payout::format_amount;
use mines::session::{
    AutobetConfig, Context, JsonFileStore, KeyValueStore, MemoryStore, Profile, SeedOverride,
    Session, SessionConfig, SessionEvent, StakeRule,
};
use mines::types::{DeskSize, Money, TICK_MS};

#[derive(Parser, Debug)]
#[command(name = "mines", about = "Headless client for the mines game server")]
struct Cli {
    /// Grid size in cells (9, 25, 49 or 81)
    #[arg(long, default_value_t = 25)]
    desk: usize,

    /// Mine count (defaults per grid size)
    #[arg(long)]
    mines: Option<u32>,

    /// Stake in major units; restored from the store when omitted
    #[arg(long)]
    stake: Option<Money>,

    /// Known wallet balance in major units
    #[arg(long)]
    balance: Option<Money>,

    #[arg(long, default_value = "USD")]
    currency: String,

    /// Return-to-player rate
    #[arg(long, default_value_t = mines::types::DEFAULT_RTP)]
    rtp: f64,

    /// JSON file remembering the last stake; in-memory when omitted
    #[arg(long)]
    store: Option<PathBuf>,

    /// Debug seed override, e.g. "serverSeed=..&nonce=..&clientSeed=.."
    #[arg(long)]
    seed_query: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resume a round left in flight, if any
    Recover,
    /// Print betting limits
    Limits,
    /// Reveal tiles one by one, then optionally cash out
    Play {
        #[arg(long, value_delimiter = ',', required = true)]
        tiles: Vec<usize>,
        #[arg(long)]
        cashout: bool,
    },
    /// Reveal a set of tiles in one request
    Multi {
        #[arg(long, value_delimiter = ',')]
        tiles: Vec<usize>,
    },
    /// Repeat bulk reveals with stake rules until a stop condition
    Autobet {
        #[arg(long, value_delimiter = ',')]
        tiles: Vec<usize>,
        /// Number of rounds (0 = until stopped)
        #[arg(long, default_value_t = 0)]
        bets: u32,
        /// Grow stake by this percent after a win (reset to initial when omitted)
        #[arg(long)]
        on_win_percent: Option<f64>,
        /// Grow stake by this percent after a loss (reset to initial when omitted)
        #[arg(long)]
        on_lose_percent: Option<f64>,
        #[arg(long)]
        stop_on_win: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn stake_rule(percent: Option<f64>) -> StakeRule {
    match percent {
        Some(p) => StakeRule::increase_by(p),
        None => StakeRule::reset(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let api_config = ApiConfig::from_env();
    let token_present = api_config.token.is_some();
    let api = Arc::new(HttpApi::new(api_config).context("failed to build game api client")?);

    let store: Arc<dyn KeyValueStore> = match &cli.store {
        Some(path) => Arc::new(
            JsonFileStore::open(path)
                .with_context(|| format!("failed to open store {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let mut session = Session::new(api, store, SessionConfig::from_env());
    if let Some(seed_override) = cli.seed_query.as_deref().and_then(SeedOverride::from_query) {
        session = session.with_seed_override(seed_override);
    }
    let session = Arc::new(session);

    let limits = match session.fetch_limits().await {
        Ok(limits) => limits,
        Err(e) => {
            warn!(error = %e, "continuing without limits");
            Default::default()
        }
    };
    let ctx = Context::new(
        Profile {
            balance: cli.balance,
            currency: cli.currency.clone(),
            token_present,
            rtp: cli.rtp,
            ..Profile::default()
        },
        limits,
    );

    spawn_tick_driver(session.clone());
    spawn_event_log(&session);

    let desk = DeskSize::from_cells(cli.desk)
        .with_context(|| format!("unsupported desk size {}", cli.desk))?;
    session.set_desk_size(desk)?;
    if let Some(mines) = cli.mines {
        session.set_mines_amount(&ctx, mines)?;
    }
    if let Some(message) = session.mines_error() {
        bail!(message);
    }
    match cli.stake {
        Some(stake) => session.set_amount(&ctx, stake)?,
        None => {
            session.restore_amount(&ctx);
        }
    }

    match cli.command {
        Command::Recover => match session.recover(&ctx).await? {
            Some(round_id) => {
                let snap = session.snapshot();
                println!(
                    "resumed {round_id}: desk {} mines {} opened {:?} stake {}",
                    snap.desk, snap.mines, snap.opened, snap.stake
                );
            }
            None => println!("no active round"),
        },
        Command::Limits => {
            println!(
                "min {} default {} max {} max win {}",
                ctx.limits.min_bet, ctx.limits.default_bet, ctx.limits.max_bet, ctx.limits.max_win
            );
        }
        Command::Play { tiles, cashout } => {
            let round_id = session.start(&ctx).await?;
            println!("round {round_id}");
            for index in tiles {
                let tile = session.tap(&ctx, index).await?;
                println!(
                    "tile {index}: {tile:?} (x{:.2}, next win {})",
                    session.current_coefficient(&ctx),
                    session.possible_win_next(&ctx)
                );
                if session.snapshot().is_settled() {
                    break;
                }
            }
            if cashout && session.snapshot().has_round() {
                let settlement = session.cashout().await?;
                println!("cashed out {} at x{:.2}", settlement.payout, settlement.coefficient);
            }
            print_result(&session, &ctx);
        }
        Command::Multi { tiles } => {
            select(&session, &ctx, &tiles);
            let settlement = session.multi_tap(&ctx).await?;
            println!(
                "{} payout {} x{:.2} mines {:?}",
                settlement.result.as_str(),
                settlement.payout,
                settlement.coefficient,
                settlement.mines
            );
        }
        Command::Autobet {
            tiles,
            bets,
            on_win_percent,
            on_lose_percent,
            stop_on_win,
        } => {
            select(&session, &ctx, &tiles);
            ctx.autobet.update(|c| {
                *c = AutobetConfig {
                    bets_remaining: bets,
                    on_win: stake_rule(on_win_percent),
                    on_lose: stake_rule(on_lose_percent),
                    stop_on_any_win: stop_on_win,
                    ..AutobetConfig::default()
                }
            });
            let control = ctx.autobet.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("stop requested");
                    control.request_stop();
                }
            });
            let summary = session.start_autobet(&ctx).await?;
            println!(
                "{} rounds: {} won, {} lost, final stake {}",
                summary.rounds, summary.wins, summary.losses, summary.final_stake
            );
        }
    }
    Ok(())
}

/// Select `tiles`, or the desk's default pattern when none are given.
fn select(session: &Session, ctx: &Context, tiles: &[usize]) {
    if tiles.is_empty() {
        session.fill_default_selection(ctx, false);
        return;
    }
    for &index in tiles {
        session.toggle_selection(ctx, index);
    }
}

fn print_result(session: &Session, ctx: &Context) {
    let snap = session.snapshot();
    match snap.result {
        Some(result) => println!(
            "{} payout {} {} x{:.2}",
            result.as_str(),
            format_amount(snap.payout, ctx.profile.rounding),
            ctx.profile.currency,
            snap.coefficient
        ),
        None => println!("round still open at hit {}", snap.hit),
    }
}

/// Advance session timers on a fixed tick.
fn spawn_tick_driver(session: Arc<Session>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(u64::from(TICK_MS)));
        let mut last = Instant::now();
        loop {
            interval.tick().await;
            let now = Instant::now();
            let elapsed = now.duration_since(last).as_millis().min(u128::from(u32::MAX)) as u32;
            last = now;
            session.tick(elapsed);
        }
    });
}

fn spawn_event_log(session: &Session) {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Alert { level, message }) => info!(?level, %message, "alert"),
                Ok(event) => tracing::debug!(?event, "session event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "event log lagging")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
