//! Timer registry
//!
//! Session timers are plain countdowns advanced by [`TimerRegistry::advance`],
//! the same fixed-tick model a game loop uses. Nothing fires on its own: the
//! owner ticks the registry and acts on whatever expired, so every pending
//! timer can be inspected and bulk-cancelled.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Collapse a settled round back to idle.
    ResetRound,
    /// Select one cell of the default pattern.
    Autofill(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timer {
    kind: TimerKind,
    remaining_ms: u32,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TimerRegistry {
    pending: Vec<Timer>,
    next_seq: u64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire after `delay_ms`, replacing a pending timer of the same kind.
    pub fn schedule(&mut self, kind: TimerKind, delay_ms: u32) {
        self.pending.retain(|t| t.kind != kind);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Timer {
            kind,
            remaining_ms: delay_ms,
            seq,
        });
    }

    /// Returns true if a timer was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.kind != kind);
        before != self.pending.len()
    }

    pub fn cancel_autofill(&mut self) {
        self.pending
            .retain(|t| !matches!(t.kind, TimerKind::Autofill(_)));
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|t| t.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Advance every timer by `elapsed_ms`; returns the expired ones in firing order.
    pub fn advance(&mut self, elapsed_ms: u32) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        self.pending.retain_mut(|t| {
            if t.remaining_ms <= elapsed_ms {
                fired.push(*t);
                false
            } else {
                t.remaining_ms -= elapsed_ms;
                true
            }
        });
        fired.sort_by_key(|t| (t.remaining_ms, t.seq));
        fired.into_iter().map(|t| t.kind).collect()
    }
}
