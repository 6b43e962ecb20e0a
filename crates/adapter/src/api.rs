//! Game API contract
//!
//! The session engine talks to the game server only through [`GameApi`].
//! [`crate::http::HttpApi`] is the production implementation; tests plug in
//! scripted fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{
    ActiveRoundResponse, CashoutRequest, CreateRoundRequest, CreateRoundResponse,
    MultiRevealRequest, RetrieveRoundRequest, RevealRequest, RevealResponse, SettlementResponse,
};
use crate::types::Limits;

/// Error type for game API calls.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// HTTP status for server-reported failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Reqwest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server error code, when the body carried one
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// True when the request may never have reached the server
    pub fn is_transport(&self) -> bool {
        match self {
            ApiError::Reqwest(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ApiError::Transport(_) => true,
            _ => false,
        }
    }
}

/// Result type for game API calls.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Request/response contract with the game server.
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Open a round; the server assigns its id.
    async fn create_round(&self, req: CreateRoundRequest) -> Result<CreateRoundResponse>;

    /// Reveal one cell.
    async fn reveal(&self, req: RevealRequest) -> Result<RevealResponse>;

    /// Reveal a set of cells in one request; always settles the round.
    async fn multi_reveal(&self, req: MultiRevealRequest) -> Result<SettlementResponse>;

    /// Settle the round at the current multiplier.
    async fn cashout(&self, req: CashoutRequest) -> Result<SettlementResponse>;

    /// Server view of any in-flight round (empty when there is none).
    async fn retrieve_round(&self, req: RetrieveRoundRequest) -> Result<ActiveRoundResponse>;

    async fn fetch_limits(&self) -> Result<Limits>;
}
