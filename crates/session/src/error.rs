//! Session errors and failure classification

use thiserror::Error;

use crate::adapter::ApiError;
use crate::core::CoefficientError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please choose from {min} to {max} {target}")]
    InvalidMines {
        min: u32,
        max: u32,
        target: &'static str,
    },
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("stake must be greater than zero")]
    InvalidStake,
    #[error("game has already started from another tab")]
    RoundActiveElsewhere,
    #[error("{0} already in progress")]
    Busy(&'static str),
    #[error("no active round")]
    NoActiveRound,
    #[error("another reveal is still in flight")]
    TapInProgress,
    #[error("not available while autobet is running")]
    AutomationActive,
    #[error("no cells selected")]
    NothingSelected,
    #[error("tile {0} is outside the board")]
    OutOfRange(usize),
    #[error("server response missing {0}")]
    IncompleteResponse(&'static str),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Odds(#[from] CoefficientError),
}

impl SessionError {
    /// Rejected locally, before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidMines { .. }
                | SessionError::InsufficientBalance
                | SessionError::InvalidStake
                | SessionError::TapInProgress
                | SessionError::AutomationActive
                | SessionError::NothingSelected
                | SessionError::OutOfRange(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// What to do with the local round after a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Drop the round and return to idle.
    ResetRound,
    /// Leave the round in place; the request may be retried.
    KeepRound,
}

/// Decides how request failures affect the round.
pub trait ErrorResolver: Send + Sync {
    fn classify(&self, error: &ApiError) -> Resolution;

    /// Message shown to the player, if any.
    fn report(&self, error: &ApiError) -> Option<String> {
        Some(error.to_string())
    }
}

/// Resets the round on every failure except rate limiting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetOnFailure;

const TOO_MANY_REQUESTS: u16 = 429;

impl ErrorResolver for ResetOnFailure {
    fn classify(&self, error: &ApiError) -> Resolution {
        match error.status() {
            Some(TOO_MANY_REQUESTS) => Resolution::KeepRound,
            _ => Resolution::ResetRound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            status: code,
            code: None,
            message: "nope".to_string(),
        }
    }

    #[test]
    fn default_resolver_keeps_round_only_when_rate_limited() {
        let resolver = ResetOnFailure;
        assert_eq!(resolver.classify(&status(429)), Resolution::KeepRound);
        assert_eq!(resolver.classify(&status(500)), Resolution::ResetRound);
        assert_eq!(
            resolver.classify(&ApiError::Transport("reset".into())),
            Resolution::ResetRound
        );
    }

    #[test]
    fn validation_category() {
        let mines = SessionError::InvalidMines {
            min: 1,
            max: 24,
            target: "mines",
        };
        assert!(mines.is_validation());
        assert_eq!(mines.to_string(), "Please choose from 1 to 24 mines");
        assert!(SessionError::InsufficientBalance.is_validation());
        assert!(!SessionError::RoundActiveElsewhere.is_validation());
        assert!(!SessionError::Api(status(500)).is_validation());
    }
}
