//! Mines session engine (workspace facade crate).
//!
//! Stable `mines::{types,core,adapter,session}` paths over the member crates
//! under `crates/`.

pub use mines_adapter as adapter;
pub use mines_core as core;
pub use mines_session as session;
pub use mines_types as types;
