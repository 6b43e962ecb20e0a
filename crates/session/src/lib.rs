//! Session module - game session engine
//!
//! This module drives rounds against the game server: the session state
//! machine, the autobet loop, and recovery of a round left in flight.
//!
//! # Architecture
//!
//! - [`Session`] owns all round state behind a lock that is never held
//!   across a request
//! - [`Context`] carries read-only profile and limits plus the shared
//!   [`AutobetControl`]
//! - [`TimerRegistry`] holds the reset and auto-fill countdowns; the owner
//!   advances it with [`Session::tick`]
//! - [`SessionEvent`]s are broadcast to UI subscribers
//!
//! # Timing
//!
//! | Timer | Default | Purpose |
//! |-------|---------|---------|
//! | Settle reset | 3000ms | Board stays visible after a settlement |
//! | Multi-tap reset | 2000ms | Same, after a manual bulk reveal |
//! | Autobet pause | 2000ms | Between automated rounds |
//! | Stop-on-win delay | 1000ms | Before honouring stop-on-any-win |
//! | Auto-fill stagger | 50ms | Per cell of the default selection |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mines_session::adapter::{ApiConfig, HttpApi};
//! use mines_session::{Context, MemoryStore, Session, SessionConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(HttpApi::new(ApiConfig::from_env())?);
//! let session = Session::new(api, Arc::new(MemoryStore::new()), SessionConfig::from_env());
//! let ctx = Context::default();
//!
//! session.restore_amount(&ctx);
//! session.start(&ctx).await?;
//! session.tap(&ctx, 12).await?;
//! let settlement = session.cashout().await?;
//! println!("{:?} {}", settlement.result, settlement.payout);
//! # Ok(())
//! # }
//! ```

pub mod autobet;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod recovery;
pub mod seed;
pub mod session;
pub mod storage;
pub mod timers;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use mines_adapter as adapter;
pub use mines_core as core;
pub use mines_types as types;

pub use autobet::{next_stake, AutobetSummary};
pub use config::SessionConfig;
pub use context::{AutobetConfig, AutobetControl, Context, Profile, StakeRule};
pub use error::{ErrorResolver, ResetOnFailure, Resolution, SessionError};
pub use events::{AlertLevel, SessionEvent};
pub use recovery::RestoredRound;
pub use seed::SeedOverride;
pub use session::Session;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use timers::{TimerKind, TimerRegistry};
