//! Payment gateway client
//!
//! Talks to a Masumi payment service: create a payment hold, poll its
//! on-chain state, and submit the result hash to release the funds.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::Config;
use crate::error::PaymentError;

/// On-chain state reported once the purchaser's funds are locked for this job
pub const FUNDS_LOCKED: &str = "FundsLocked";

/// Payment status recorded once the result has been submitted
pub const PAYMENT_COMPLETED: &str = "completed";

const STATUS_PAGE_SIZE: usize = 100;
const MAX_STATUS_PAGES: usize = 50;

pub fn is_funds_locked(payment_status: &str) -> bool {
    payment_status == FUNDS_LOCKED
}

/// What the agent asks the gateway to hold
#[derive(Debug, Clone)]
pub struct PaymentRequestParams {
    pub identifier_from_purchaser: String,
    pub input_hash: String,
    pub pay_by_time: DateTime<Utc>,
    pub submit_result_time: DateTime<Utc>,
    pub unlock_time: DateTime<Utc>,
    pub external_dispute_unlock_time: DateTime<Utc>,
}

/// The gateway's answer to a payment request
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub blockchain_identifier: String,
    pub pay_by_time: String,
    pub submit_result_time: String,
    pub unlock_time: String,
    pub external_dispute_unlock_time: String,
}

/// Price entry echoed back to the purchaser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amount {
    pub amount: String,
    pub unit: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_request(&self, params: &PaymentRequestParams) -> Result<PaymentRequest, PaymentError>;

    /// Current on-chain state of the payment
    async fn check_status(&self, blockchain_identifier: &str) -> Result<String, PaymentError>;

    /// Finalize the payment, carrying the serialized result as proof
    async fn complete(&self, blockchain_identifier: &str, proof_text: &str) -> Result<(), PaymentError>;
}

/// SHA-256 of the canonical (key-sorted) JSON encoding of the job input
pub fn compute_input_hash(input_data: &BTreeMap<String, String>) -> String {
    let canonical = serde_json::to_string(input_data).unwrap_or_default();
    sha256_hex(&canonical)
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// HTTP client for the Masumi payment service
pub struct MasumiPaymentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    network: String,
    agent_identifier: String,
}

impl MasumiPaymentClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.payment_service_url.trim_end_matches('/').to_string(),
            api_key: config.payment_api_key.clone(),
            network: config.network.clone(),
            agent_identifier: config.agent_identifier.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<Value, PaymentError> {
        let response = request
            .header("token", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PaymentError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| PaymentError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(PaymentError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: format!("invalid JSON: {}", e),
        })
    }
}

#[async_trait]
impl PaymentGateway for MasumiPaymentClient {
    async fn create_request(&self, params: &PaymentRequestParams) -> Result<PaymentRequest, PaymentError> {
        let endpoint = self.endpoint("payment/");
        let body = json!({
            "agentIdentifier": self.agent_identifier,
            "network": self.network,
            "inputHash": params.input_hash,
            "payByTime": params.pay_by_time.to_rfc3339(),
            "submitResultTime": params.submit_result_time.to_rfc3339(),
            "unlockTime": params.unlock_time.to_rfc3339(),
            "externalDisputeUnlockTime": params.external_dispute_unlock_time.to_rfc3339(),
            "identifierFromPurchaser": params.identifier_from_purchaser,
            "metadata": format!("AuditSense job input {}", params.input_hash),
        });

        debug!("Creating payment request at {}", endpoint);
        let response = self.send(&endpoint, self.client.post(&endpoint).json(&body)).await?;
        parse_payment_request(&endpoint, &response)
    }

    async fn check_status(&self, blockchain_identifier: &str) -> Result<String, PaymentError> {
        let endpoint = self.endpoint("payment/");
        let limit = STATUS_PAGE_SIZE.to_string();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_STATUS_PAGES {
            let mut query = vec![
                ("network", self.network.as_str()),
                ("limit", limit.as_str()),
                ("includeHistory", "false"),
            ];
            if let Some(cursor_id) = cursor.as_deref() {
                query.push(("cursorId", cursor_id));
            }

            let response = self.send(&endpoint, self.client.get(&endpoint).query(&query)).await?;
            let payments = payment_page(&response)?;
            if let Some(state) = find_payment_state(payments, blockchain_identifier) {
                return Ok(state);
            }
            match next_cursor(payments) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Err(PaymentError::UnknownPayment {
            blockchain_identifier: blockchain_identifier.to_string(),
        })
    }

    async fn complete(&self, blockchain_identifier: &str, proof_text: &str) -> Result<(), PaymentError> {
        let endpoint = self.endpoint("payment/submit-result");
        let body = json!({
            "network": self.network,
            "blockchainIdentifier": blockchain_identifier,
            "submitResultHash": sha256_hex(proof_text),
        });

        debug!("Submitting result hash for {}", blockchain_identifier);
        self.send(&endpoint, self.client.post(&endpoint).json(&body)).await?;
        Ok(())
    }
}

fn parse_payment_request(endpoint: &str, response: &Value) -> Result<PaymentRequest, PaymentError> {
    let data = response.get("data").unwrap_or(response);
    let field = |name: &str| -> Result<String, PaymentError> {
        match data.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(PaymentError::MalformedResponse {
                endpoint: endpoint.to_string(),
                field: name.to_string(),
            }),
        }
    };

    Ok(PaymentRequest {
        blockchain_identifier: field("blockchainIdentifier")?,
        pay_by_time: field("payByTime")?,
        submit_result_time: field("submitResultTime")?,
        unlock_time: field("unlockTime")?,
        external_dispute_unlock_time: field("externalDisputeUnlockTime")?,
    })
}

fn payment_page(response: &Value) -> Result<&[Value], PaymentError> {
    response
        .pointer("/data/Payments")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| PaymentError::MalformedResponse {
            endpoint: "payment/".to_string(),
            field: "data.Payments".to_string(),
        })
}

/// On-chain state of the payment, if it is on this page
fn find_payment_state(payments: &[Value], blockchain_identifier: &str) -> Option<String> {
    payments
        .iter()
        .find(|p| p.get("blockchainIdentifier").and_then(Value::as_str) == Some(blockchain_identifier))
        .map(|p| {
            p.get("onChainState")
                .and_then(Value::as_str)
                .unwrap_or("pending")
                .to_string()
        })
}

/// Cursor for the page after `payments`; `None` on the last page
fn next_cursor(payments: &[Value]) -> Option<String> {
    if payments.len() < STATUS_PAGE_SIZE {
        return None;
    }
    payments
        .last()
        .and_then(|p| p.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
