//! HTTP transport for the game API
//!
//! JSON over HTTPS POST. Every call carries the player's `authorization` and
//! `apikey` headers; reveal calls also carry a JSON `metadata` header telling
//! the server the device and whether the reveal was manual.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::api::{ApiError, GameApi, Result};
use crate::config::ApiConfig;
use crate::protocol::{
    ActiveRoundResponse, CashoutRequest, CreateRoundRequest, CreateRoundResponse, ErrorBody,
    MultiRevealRequest, RequestMetadata, RetrieveRoundRequest, RevealRequest, RevealResponse,
    SettlementResponse,
};
use crate::types::Limits;

const CREATE_PATH: &str = "mines/create";
const REVEAL_PATH: &str = "mines/tap";
const MULTI_REVEAL_PATH: &str = "mines/multi-tap";
const CASHOUT_PATH: &str = "mines/cashout";
const RETRIEVE_PATH: &str = "mines/retrieve";
const LIMITS_PATH: &str = "limits";

pub struct HttpApi {
    http_client: reqwest::Client,
    base_url: Url,
    config: ApiConfig,
}

impl HttpApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http_client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn headers(&self, manual: Option<bool>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut put = |name: &'static str, value: &str| -> Result<()> {
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::Transport(format!("invalid {name} header: {e}")))?;
            headers.insert(name, value);
            Ok(())
        };
        if let Some(token) = &self.config.token {
            put("authorization", token)?;
        }
        if let Some(player_id) = &self.config.player_id {
            put("apikey", player_id)?;
        }
        if let Some(sub_partner_id) = &self.config.sub_partner_id {
            put("subpartnerid", sub_partner_id)?;
        }
        if let Some(manual) = manual {
            let metadata = serde_json::to_string(&RequestMetadata {
                device: self.config.device,
                manual,
            })?;
            put("metadata", &metadata)?;
        }
        Ok(headers)
    }

    async fn send<Req, Resp>(&self, path: &str, body: Option<&Req>, manual: Option<bool>) -> Result<Option<Resp>>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        debug!(%url, "game api request");

        let mut request = match body {
            Some(_) => self.http_client.post(url.clone()),
            None => self.http_client.get(url.clone()),
        };
        request = request.headers(self.headers(manual)?);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            let message = body
                .message
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).trim().to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                code: body.code,
                message,
            });
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req, manual: Option<bool>) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        self.send(path, Some(body), manual)
            .await?
            .ok_or_else(|| ApiError::Status {
                status: reqwest::StatusCode::NOT_FOUND.as_u16(),
                code: None,
                message: format!("{path} not found"),
            })
    }
}

#[async_trait]
impl GameApi for HttpApi {
    async fn create_round(&self, req: CreateRoundRequest) -> Result<CreateRoundResponse> {
        self.post(CREATE_PATH, &req, None).await
    }

    async fn reveal(&self, req: RevealRequest) -> Result<RevealResponse> {
        self.post(REVEAL_PATH, &req, Some(true)).await
    }

    async fn multi_reveal(&self, req: MultiRevealRequest) -> Result<SettlementResponse> {
        self.post(MULTI_REVEAL_PATH, &req, Some(false)).await
    }

    async fn cashout(&self, req: CashoutRequest) -> Result<SettlementResponse> {
        self.post(CASHOUT_PATH, &req, None).await
    }

    async fn retrieve_round(&self, req: RetrieveRoundRequest) -> Result<ActiveRoundResponse> {
        // 404 is the common "no round in flight" answer.
        Ok(self
            .send(RETRIEVE_PATH, Some(&req), None)
            .await?
            .unwrap_or_default())
    }

    async fn fetch_limits(&self) -> Result<Limits> {
        self.send::<(), Limits>(LIMITS_PATH, None, None)
            .await?
            .ok_or_else(|| ApiError::Status {
                status: reqwest::StatusCode::NOT_FOUND.as_u16(),
                code: None,
                message: format!("{LIMITS_PATH} not found"),
            })
    }
}
