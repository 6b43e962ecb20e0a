//! Change notifications for UI consumers.

use tokio::sync::broadcast;

use crate::types::{Money, RoundId, RoundResult, Tile};

/// Broadcast buffer; slow subscribers see `Lagged` instead of blocking the session.
pub const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RoundCreated {
        round_id: RoundId,
    },
    TileRevealed {
        index: usize,
        tile: Tile,
        hit: u32,
    },
    /// First reveal of a round; the stake is committed (tournament credit).
    BetPlaced {
        stake: Money,
        coefficient: f64,
    },
    Settled {
        result: RoundResult,
        payout: Money,
        coefficient: f64,
    },
    TournamentsStale,
    BoardReset,
    SelectionChanged {
        count: u32,
    },
    StakeChanged {
        stake: Money,
    },
    AutobetStopped,
    Alert {
        level: AlertLevel,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Fire and forget; having no subscribers is fine.
    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn alert(&self, level: AlertLevel, message: impl Into<String>) {
        self.emit(SessionEvent::Alert {
            level,
            message: message.into(),
        });
    }
}
