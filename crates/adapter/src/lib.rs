//! Adapter module - game server RPC over HTTP with a JSON protocol
//!
//! This module is the session engine's only window onto the game server.
//! Everything the engine needs from the network is expressed as the
//! [`GameApi`] request/response contract, so the engine can be driven by the
//! real HTTP client or by a scripted fake in tests.
//!
//! # Operations
//!
//! | Operation | Request | Response |
//! |---|---|---|
//! | Create round | `clientSeed`, `nonce`, `size`, `deskSize`, `serverSeed?`, `theme` | `roundId` |
//! | Reveal | `roundId`, `index`, `serverSeed?`, seed triple + stake on first reveal | `status`, settlement on win-out or mine |
//! | Multi reveal | `roundId`, `opened`, stake, currency, seed triple | settlement |
//! | Cashout | `roundId` | settlement |
//! | Retrieve round | `theme` | partial round view, empty when none |
//! | Fetch limits | none | `minBet`, `defaultBet`, `maxBet`, `maxWin` |
//!
//! A settlement carries `result` (`won` / `lost`), `payout`, `coefficient`
//! and the full `mines` layout.
//!
//! # Environment Variables
//!
//! See [`ApiConfig::from_env`]:
//!
//! - `MINES_API_URL`: server base URL (default: "http://127.0.0.1:8080/")
//! - `MINES_API_TOKEN` / `MINES_PLAYER_ID` / `MINES_SUBPARTNER_ID`: identity headers
//! - `MINES_THEME`: game variant
//! - `MINES_DEVICE`: `desktop` or `mobile`
//!
//! # Example Exchange
//!
//! ```text
//! POST /mines/create   {"clientSeed":"6f1c..","nonce":1,"size":3,"deskSize":25,"theme":"default"}
//!                   -> {"roundId":"r-81f2"}
//! POST /mines/tap      {"theme":"default","roundId":"r-81f2","index":12,"clientSeed":"6f1c..","nonce":1,"amount":1.0,"currency":"USD"}
//!                   -> {"status":1}
//! POST /mines/cashout  {"roundId":"r-81f2"}
//!                   -> {"result":"won","payout":1.13,"coefficient":1.13,"mines":[2,7,19]}
//! ```

pub mod api;
pub mod config;
pub mod http;
pub mod protocol;

pub use mines_types as types;

// Re-export protocol types for convenience
pub use api::{ApiError, GameApi};
pub use config::ApiConfig;
pub use http::HttpApi;
pub use protocol::*;
