//! In-memory fakes for the external collaborators (testing only)
//!
//! Provides `ScriptedReasoner`, `MemoryFetcher` and `FakePaymentGateway`,
//! which satisfy the client traits deterministically and without network
//! access.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::clients::llm_client::parse_json_output;
use crate::clients::{PaymentGateway, PaymentRequest, PaymentRequestParams, Reasoner, ReasoningPrompt, Stage};
use crate::error::{AppError, AppResult, FetchError, PaymentError};

// ---------------------------------------------------------------------------
// ScriptedReasoner
// ---------------------------------------------------------------------------

/// Reasoner that replays canned answers per stage
///
/// Answers queued for a stage are handed out in order; the last one repeats.
/// A stage with nothing scripted fails like an unreachable model would.
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    scripts: Mutex<HashMap<Stage, VecDeque<Scripted>>>,
    contexts: Mutex<HashMap<Stage, Vec<Value>>>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(Value),
    /// Raw model text, parsed the way a real completion is
    Text(String),
    Failure(String),
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, stage: Stage, output: Value) -> Self {
        self.push(stage, Scripted::Output(output));
        self
    }

    /// Script a raw completion; text that is not JSON fails as `InvalidJson`
    pub fn respond_text(self, stage: Stage, text: &str) -> Self {
        self.push(stage, Scripted::Text(text.to_string()));
        self
    }

    /// Script a failed call
    pub fn fail(self, stage: Stage, reason: &str) -> Self {
        self.push(stage, Scripted::Failure(reason.to_string()));
        self
    }

    fn push(&self, stage: Stage, entry: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(entry);
    }

    pub fn calls(&self, stage: Stage) -> usize {
        self.contexts
            .lock()
            .unwrap()
            .get(&stage)
            .map_or(0, Vec::len)
    }

    /// Contexts the stage was called with, oldest first
    pub fn contexts(&self, stage: Stage) -> Vec<Value> {
        self.contexts
            .lock()
            .unwrap()
            .get(&stage)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn reason(&self, prompt: &ReasoningPrompt, context: &Value) -> AppResult<Value> {
        self.contexts
            .lock()
            .unwrap()
            .entry(prompt.stage)
            .or_default()
            .push(context.clone());

        let mut scripts = self.scripts.lock().unwrap();
        let entry = match scripts.get_mut(&prompt.stage) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        drop(scripts);

        match entry {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Text(text)) => parse_json_output(&text),
            Some(Scripted::Failure(reason)) => Err(AppError::llm_api_failed("scripted", reason)),
            None => Err(AppError::llm_api_failed(
                "scripted",
                format!("no answer scripted for {}", prompt.stage),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryFetcher
// ---------------------------------------------------------------------------

/// Fetcher backed by a `HashMap<locator, text>`
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: &str, text: &str) -> Self {
        self.documents.insert(locator.to_string(), text.to_string());
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl crate::clients::DocumentFetcher for MemoryFetcher {
    async fn fetch(&self, source: &str) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if source.trim().is_empty() {
            return Err(FetchError::EmptySource);
        }
        self.documents
            .get(source)
            .cloned()
            .ok_or_else(|| FetchError::Unreachable {
                source_url: source.to_string(),
                reason: "no such document".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// FakePaymentGateway
// ---------------------------------------------------------------------------

/// Payment gateway whose on-chain state is set by the test
#[derive(Debug)]
pub struct FakePaymentGateway {
    state: Mutex<String>,
    fail_requests: AtomicBool,
    fail_status_checks: AtomicBool,
    fail_completions: AtomicBool,
    requests: AtomicUsize,
    status_checks: AtomicUsize,
    completions: Mutex<Vec<(String, String)>>,
}

impl Default for FakePaymentGateway {
    fn default() -> Self {
        Self {
            state: Mutex::new("pending".to_string()),
            fail_requests: AtomicBool::new(false),
            fail_status_checks: AtomicBool::new(false),
            fail_completions: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            status_checks: AtomicUsize::new(0),
            completions: Mutex::new(Vec::new()),
        }
    }
}

impl FakePaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// On-chain state reported for every payment from now on
    pub fn set_status(&self, state: &str) {
        *self.state.lock().unwrap() = state.to_string();
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    pub fn fail_status_checks(&self, fail: bool) {
        self.fail_status_checks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_completions(&self, fail: bool) {
        self.fail_completions.store(fail, Ordering::SeqCst);
    }

    pub fn requests_created(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn status_checks(&self) -> usize {
        self.status_checks.load(Ordering::SeqCst)
    }

    /// `(blockchain_identifier, proof)` for every completed payment
    pub fn completions(&self) -> Vec<(String, String)> {
        self.completions.lock().unwrap().clone()
    }

    fn rejected(endpoint: &str) -> PaymentError {
        PaymentError::Rejected {
            endpoint: endpoint.to_string(),
            status: 503,
            body: "payment service unavailable".to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_request(&self, params: &PaymentRequestParams) -> Result<PaymentRequest, PaymentError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(Self::rejected("payment/"));
        }
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentRequest {
            blockchain_identifier: format!("bc-{}", n),
            pay_by_time: params.pay_by_time.timestamp_millis().to_string(),
            submit_result_time: params.submit_result_time.timestamp_millis().to_string(),
            unlock_time: params.unlock_time.timestamp_millis().to_string(),
            external_dispute_unlock_time: params.external_dispute_unlock_time.timestamp_millis().to_string(),
        })
    }

    async fn check_status(&self, _blockchain_identifier: &str) -> Result<String, PaymentError> {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        if self.fail_status_checks.load(Ordering::SeqCst) {
            return Err(Self::rejected("payment/"));
        }
        Ok(self.state.lock().unwrap().clone())
    }

    async fn complete(&self, blockchain_identifier: &str, proof_text: &str) -> Result<(), PaymentError> {
        if self.fail_completions.load(Ordering::SeqCst) {
            return Err(Self::rejected("payment/submit-result"));
        }
        self.completions
            .lock()
            .unwrap()
            .push((blockchain_identifier.to_string(), proof_text.to_string()));
        Ok(())
    }
}
