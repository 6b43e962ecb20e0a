//! Protocol module - JSON request/response types for the game server
//!
//! Field names follow the server's camelCase JSON. Optional response fields
//! default to `None` so a partial payload decodes and the session engine
//! decides what "missing" means.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DeskSize, Money, RoundId, RoundResult, SeedTriple, Theme, Tile};

// ============== Request Metadata ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Desktop,
    Mobile,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown device {0:?}")]
pub struct ParseDeviceError(String);

impl FromStr for Device {
    type Err = ParseDeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("desktop") {
            Ok(Self::Desktop)
        } else if s.eq_ignore_ascii_case("mobile") {
            Ok(Self::Mobile)
        } else {
            Err(ParseDeviceError(s.to_string()))
        }
    }
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
        }
    }
}

impl Serialize for Device {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Sent JSON-encoded in the `metadata` header of reveal requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestMetadata {
    pub device: Device,
    pub manual: bool,
}

// ============== Client -> Server ==============

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoundRequest {
    pub client_seed: String,
    pub nonce: u64,
    /// Mine count
    pub size: u32,
    pub desk_size: DeskSize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed: Option<String>,
    pub theme: String,
}

/// Seed triple and stake, sent only with the first reveal of a round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstRevealParams {
    pub client_seed: String,
    pub nonce: u64,
    pub amount: Money,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealRequest {
    pub theme: String,
    pub round_id: RoundId,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed: Option<String>,
    #[serde(flatten)]
    pub first: Option<FirstRevealParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiRevealRequest {
    pub opened: Vec<usize>,
    pub round_id: RoundId,
    pub theme: String,
    pub client_seed: String,
    pub nonce: u64,
    pub amount: Money,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutRequest {
    pub round_id: RoundId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrieveRoundRequest {
    pub theme: String,
}

// ============== Server -> Client ==============

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoundResponse {
    pub round_id: RoundId,
}

/// Settlement payload of a reveal, multi-reveal or cashout.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SettlementResponse {
    pub result: Option<RoundResult>,
    pub payout: Option<Money>,
    pub coefficient: Option<f64>,
    pub mines: Option<Vec<usize>>,
}

/// A complete settlement: outcome plus the full mine layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub result: RoundResult,
    pub payout: Money,
    pub coefficient: f64,
    pub mines: Vec<usize>,
}

impl SettlementResponse {
    /// Settlement when both `result` and `mines` are present.
    pub fn settlement(&self) -> Option<Settlement> {
        let result = self.result?;
        let mines = self.mines.clone()?;
        Some(Settlement {
            result,
            payout: self.payout.unwrap_or_default(),
            coefficient: self.coefficient.unwrap_or_default(),
            mines,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RevealResponse {
    /// `1` diamond, `0` mine
    pub status: Option<u8>,
    #[serde(flatten)]
    pub settlement: SettlementResponse,
}

impl RevealResponse {
    pub fn outcome(&self) -> Option<Tile> {
        self.status.and_then(Tile::from_status)
    }
}

/// Server view of the in-flight round; every field may be absent.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActiveRoundResponse {
    pub client_seed: Option<String>,
    pub hash: Option<String>,
    pub nonce: Option<u64>,
    pub opened: Option<Vec<usize>>,
    pub mines_amount: Option<u32>,
    pub amount: Option<Money>,
    pub desk_size: Option<DeskSize>,
    pub round_id: Option<RoundId>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

// ============== Helper Functions ==============

pub fn create_round_request(seeds: &SeedTriple, mines: u32, desk: DeskSize, theme: &Theme) -> CreateRoundRequest {
    CreateRoundRequest {
        client_seed: seeds.client_seed.clone(),
        nonce: seeds.nonce,
        size: mines,
        desk_size: desk,
        server_seed: seeds.server_seed.clone(),
        theme: theme.server_name().to_string(),
    }
}

pub fn create_reveal_request(
    round_id: RoundId,
    index: usize,
    seeds: &SeedTriple,
    first: Option<(Money, &str)>,
    theme: &Theme,
) -> RevealRequest {
    RevealRequest {
        theme: theme.server_name().to_string(),
        round_id,
        index,
        server_seed: seeds.server_seed.clone(),
        first: first.map(|(amount, currency)| FirstRevealParams {
            client_seed: seeds.client_seed.clone(),
            nonce: seeds.nonce,
            amount,
            currency: currency.to_string(),
        }),
        tag: theme.tag().map(str::to_string),
    }
}

pub fn create_multi_reveal_request(
    round_id: RoundId,
    opened: Vec<usize>,
    seeds: &SeedTriple,
    amount: Money,
    currency: &str,
    theme: &Theme,
) -> MultiRevealRequest {
    MultiRevealRequest {
        opened,
        round_id,
        theme: theme.server_name().to_string(),
        client_seed: seeds.client_seed.clone(),
        nonce: seeds.nonce,
        amount,
        currency: currency.to_string(),
        server_seed: seeds.server_seed.clone(),
        tag: theme.tag().map(str::to_string),
    }
}
