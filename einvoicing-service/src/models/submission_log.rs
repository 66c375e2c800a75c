//! Append-only audit log of ZATCA API interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which authority operation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionAction {
    SubmitInvoice,
    CancelInvoice,
}

impl SubmissionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionAction::SubmitInvoice => "submit_invoice",
            SubmissionAction::CancelInvoice => "cancel_invoice",
        }
    }
}

/// One authority-API interaction. Appended before the network call with the
/// outgoing payload; the only mutation ever applied afterwards is attaching
/// the completion (response, status code, success flag, error text).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionLogEntry {
    pub entry_id: Uuid,
    pub invoice_id: Uuid,
    pub action: SubmissionAction,
    pub request_data: serde_json::Value,
    pub response_data: Option<serde_json::Value>,
    pub status_code: Option<u16>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for appending a pending entry; the response is attached later.
#[derive(Debug, Clone)]
pub struct NewSubmissionLog {
    pub invoice_id: Uuid,
    pub action: SubmissionAction,
    pub request_data: serde_json::Value,
}

/// Completion attached to a pending entry once the call has finished (or
/// failed without a response).
#[derive(Debug, Clone)]
pub struct SubmissionLogCompletion {
    pub response_data: Option<serde_json::Value>,
    pub status_code: Option<u16>,
    pub success: bool,
    pub error_message: Option<String>,
}
