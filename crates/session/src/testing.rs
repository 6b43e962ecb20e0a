//! Scripted [`GameApi`] for tests
//!
//! Responses are queued per operation and replayed in order; every request is
//! recorded so tests can assert on what was (or was not) sent. An operation
//! with an empty queue fails with a transport error.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::adapter::api::Result;
use crate::adapter::{
    ActiveRoundResponse, ApiError, CashoutRequest, CreateRoundRequest, CreateRoundResponse,
    GameApi, MultiRevealRequest, RetrieveRoundRequest, RevealRequest, RevealResponse,
    SettlementResponse,
};
use crate::types::{Limits, RoundId};

type Queue<T> = Mutex<VecDeque<Result<T>>>;

#[derive(Default)]
pub struct ScriptedApi {
    creates: Queue<CreateRoundResponse>,
    reveals: Queue<RevealResponse>,
    multis: Queue<SettlementResponse>,
    cashouts: Queue<SettlementResponse>,
    retrieves: Queue<ActiveRoundResponse>,
    limits: Queue<Limits>,

    create_log: Mutex<Vec<CreateRoundRequest>>,
    reveal_log: Mutex<Vec<RevealRequest>>,
    multi_log: Mutex<Vec<MultiRevealRequest>>,
    cashout_log: Mutex<Vec<CashoutRequest>>,
    retrieve_log: Mutex<Vec<RetrieveRoundRequest>>,
    calls: AtomicUsize,

    /// When set, `reveal` waits for a permit before answering.
    reveal_gate: Mutex<Option<Arc<Notify>>>,
    cashout_gate: Mutex<Option<Arc<Notify>>>,
}

fn parse<T: serde::de::DeserializeOwned>(json: &str) -> T {
    serde_json::from_str(json).unwrap_or_else(|e| panic!("bad scripted response {json}: {e}"))
}

fn missing(op: &str) -> ApiError {
    ApiError::Transport(format!("no scripted response for {op}"))
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_create(&self, round_id: &str) {
        let round_id = RoundId::new(round_id).unwrap_or_else(|| panic!("empty round id"));
        self.creates
            .lock()
            .push_back(Ok(CreateRoundResponse { round_id }));
    }

    pub fn push_create_error(&self, error: ApiError) {
        self.creates.lock().push_back(Err(error));
    }

    pub fn push_reveal(&self, json: &str) {
        self.reveals.lock().push_back(Ok(parse(json)));
    }

    pub fn push_reveal_error(&self, error: ApiError) {
        self.reveals.lock().push_back(Err(error));
    }

    pub fn push_multi(&self, json: &str) {
        self.multis.lock().push_back(Ok(parse(json)));
    }

    pub fn push_multi_error(&self, error: ApiError) {
        self.multis.lock().push_back(Err(error));
    }

    pub fn push_cashout(&self, json: &str) {
        self.cashouts.lock().push_back(Ok(parse(json)));
    }

    pub fn push_cashout_error(&self, error: ApiError) {
        self.cashouts.lock().push_back(Err(error));
    }

    pub fn push_retrieve(&self, json: &str) {
        self.retrieves.lock().push_back(Ok(parse(json)));
    }

    pub fn push_retrieve_error(&self, error: ApiError) {
        self.retrieves.lock().push_back(Err(error));
    }

    pub fn push_limits(&self, json: &str) {
        self.limits.lock().push_back(Ok(parse(json)));
    }

    /// Hold every reveal until `gate.notify_one()` is called.
    pub fn gate_reveals(&self, gate: Arc<Notify>) {
        *self.reveal_gate.lock() = Some(gate);
    }

    /// Hold every cashout until `gate.notify_one()` is called.
    pub fn gate_cashouts(&self, gate: Arc<Notify>) {
        *self.cashout_gate.lock() = Some(gate);
    }

    /// Total requests received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn create_requests(&self) -> Vec<CreateRoundRequest> {
        self.create_log.lock().clone()
    }

    pub fn reveal_requests(&self) -> Vec<RevealRequest> {
        self.reveal_log.lock().clone()
    }

    pub fn multi_requests(&self) -> Vec<MultiRevealRequest> {
        self.multi_log.lock().clone()
    }

    pub fn cashout_requests(&self) -> Vec<CashoutRequest> {
        self.cashout_log.lock().clone()
    }

    pub fn retrieve_requests(&self) -> Vec<RetrieveRoundRequest> {
        self.retrieve_log.lock().clone()
    }

    fn next<T>(&self, queue: &Queue<T>, op: &str) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        queue.lock().pop_front().unwrap_or_else(|| Err(missing(op)))
    }
}

#[async_trait]
impl GameApi for ScriptedApi {
    async fn create_round(&self, req: CreateRoundRequest) -> Result<CreateRoundResponse> {
        self.create_log.lock().push(req);
        self.next(&self.creates, "create_round")
    }

    async fn reveal(&self, req: RevealRequest) -> Result<RevealResponse> {
        self.reveal_log.lock().push(req);
        let gate = self.reveal_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next(&self.reveals, "reveal")
    }

    async fn multi_reveal(&self, req: MultiRevealRequest) -> Result<SettlementResponse> {
        self.multi_log.lock().push(req);
        self.next(&self.multis, "multi_reveal")
    }

    async fn cashout(&self, req: CashoutRequest) -> Result<SettlementResponse> {
        self.cashout_log.lock().push(req);
        let gate = self.cashout_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next(&self.cashouts, "cashout")
    }

    async fn retrieve_round(&self, req: RetrieveRoundRequest) -> Result<ActiveRoundResponse> {
        self.retrieve_log.lock().push(req);
        self.next(&self.retrieves, "retrieve_round")
    }

    async fn fetch_limits(&self) -> Result<Limits> {
        self.next(&self.limits, "fetch_limits")
    }
}
