//! ZATCA authority client.
//!
//! Serializes an invoice aggregate into the authority's JSON shape, performs
//! the HTTP calls (submit, status lookup, cancel) and records every
//! interaction in the submission log. An audit entry is appended before each
//! mutating call so a trail exists even if the call never completes, and
//! finalized with the response once one arrives.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::{json, Value};
use service_core::error::AppError;
use uuid::Uuid;

use crate::config::ZatcaConfig;
use crate::models::{
    Company, Customer, Invoice, LineItem, NewSubmissionLog, SubmissionAction,
    SubmissionLogCompletion,
};

/// Where the client records its audit trail. Implemented by the repository.
#[async_trait]
pub trait SubmissionLogSink: Send + Sync {
    /// Append a pending entry carrying the outgoing payload.
    async fn append(&self, entry: NewSubmissionLog) -> Result<Uuid, AppError>;

    /// Attach the completion to a previously appended entry.
    async fn finalize(
        &self,
        invoice_id: Uuid,
        entry_id: Uuid,
        completion: SubmissionLogCompletion,
    ) -> Result<(), AppError>;
}

/// Tri-part result of every authority operation. Callers branch on `success`
/// and surface `message`; `data` carries the raw authority body (an empty
/// object when nothing usable came back). Failures never escape as errors.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub message: String,
    pub data: Value,
}

impl SubmissionOutcome {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: json!({}),
        }
    }

    pub fn failure_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
        }
    }
}

/// Invoice payload in the authority's expected shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvoicePayload {
    invoice_number: String,
    invoice_type: crate::models::InvoiceType,
    issue_date: chrono::NaiveDate,
    issue_time: chrono::NaiveTime,
    seller: SellerPayload,
    buyer: BuyerPayload,
    invoice_lines: Vec<LinePayload>,
    totals: TotalsPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SellerPayload {
    name: String,
    vat_number: String,
    cr_number: String,
    address: AddressPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuyerPayload {
    name: String,
    vat_number: String,
    address: AddressPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressPayload {
    street: String,
    building_number: String,
    district: String,
    city: String,
    postal_code: String,
    country: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinePayload {
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    vat_rate: Decimal,
    vat_amount: Decimal,
    discount: Decimal,
    line_total: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TotalsPayload {
    subtotal: Decimal,
    vat_amount: Decimal,
    discount: Decimal,
    total: Decimal,
}

#[derive(Debug, Serialize)]
struct CancelPayload {
    uuid: String,
    reason: String,
}

fn invoice_payload(
    invoice: &Invoice,
    company: &Company,
    customer: &Customer,
    items: &[LineItem],
) -> InvoicePayload {
    InvoicePayload {
        invoice_number: invoice.invoice_number.clone(),
        invoice_type: invoice.invoice_type,
        issue_date: invoice.issue_date,
        issue_time: invoice.issue_time,
        seller: SellerPayload {
            name: company.name.clone(),
            vat_number: company.vat_number.clone(),
            cr_number: company.cr_number.clone(),
            address: AddressPayload {
                street: company.street_name.clone(),
                building_number: company.building_number.clone(),
                district: company.district.clone(),
                city: company.city.clone(),
                postal_code: company.postal_code.clone(),
                country: company.country.clone(),
            },
        },
        // Optional buyer fields collapse to empty strings; ZATCA accepts
        // sparse buyer data on simplified invoices.
        buyer: BuyerPayload {
            name: customer.name.clone(),
            vat_number: customer.vat_number.clone().unwrap_or_default(),
            address: AddressPayload {
                street: customer.street_name.clone().unwrap_or_default(),
                building_number: customer.building_number.clone().unwrap_or_default(),
                district: customer.district.clone().unwrap_or_default(),
                city: customer.city.clone(),
                postal_code: customer.postal_code.clone().unwrap_or_default(),
                country: customer.country.clone(),
            },
        },
        invoice_lines: items
            .iter()
            .map(|item| LinePayload {
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                vat_rate: item.vat_rate,
                vat_amount: item.vat_amount,
                discount: item.discount,
                line_total: item.total,
            })
            .collect(),
        totals: TotalsPayload {
            subtotal: invoice.subtotal,
            vat_amount: invoice.vat_amount,
            discount: invoice.discount,
            total: invoice.total,
        },
    }
}

/// Client for the ZATCA e-invoicing API.
#[derive(Clone)]
pub struct ZatcaClient {
    client: Client,
    config: ZatcaConfig,
    log_sink: Arc<dyn SubmissionLogSink>,
}

impl ZatcaClient {
    /// Configuration is injected explicitly; nothing is read from ambient
    /// state, so tests and environments swap credentials freely.
    pub fn new(config: ZatcaConfig, log_sink: Arc<dyn SubmissionLogSink>) -> Self {
        Self {
            client: Client::new(),
            config,
            log_sink,
        }
    }

    /// Check if the client has a bearer credential.
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.expose_secret().is_empty()
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Submit an invoice for clearance.
    ///
    /// The caller guarantees the invoice is a draft with seller, buyer and at
    /// least one line item; no status re-validation happens here. On a 200
    /// the authority identifiers land on the invoice and it moves to
    /// submitted; on any failure the invoice is left untouched.
    pub async fn submit_invoice(
        &self,
        invoice: &mut Invoice,
        company: &Company,
        customer: &Customer,
        items: &[LineItem],
    ) -> SubmissionOutcome {
        let payload = invoice_payload(invoice, company, customer, items);
        let request_data = match serde_json::to_value(&payload) {
            Ok(value) => value,
            Err(e) => {
                return SubmissionOutcome::failure(format!("Failed to serialize invoice: {}", e))
            }
        };

        let entry_id = match self
            .log_sink
            .append(NewSubmissionLog {
                invoice_id: invoice.invoice_id,
                action: SubmissionAction::SubmitInvoice,
                request_data,
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                return SubmissionOutcome::failure(format!(
                    "Failed to record submission attempt: {}",
                    e
                ))
            }
        };

        let url = format!("{}/invoices", self.config.api_url);
        let sent = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout())
            .json(&payload)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let message = format!("Network error: {}", e);
                tracing::warn!(
                    invoice_number = %invoice.invoice_number,
                    error = %e,
                    "ZATCA submission failed before a response arrived"
                );
                self.finalize_entry(invoice.invoice_id, entry_id, None, None, false, &message)
                    .await;
                return SubmissionOutcome::failure(message);
            }
        };

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();

        if status != StatusCode::OK {
            let message = format!("ZATCA API Error: {}", status.as_u16());
            tracing::warn!(
                invoice_number = %invoice.invoice_number,
                status = %status,
                "ZATCA rejected the submission"
            );
            self.finalize_entry(
                invoice.invoice_id,
                entry_id,
                body.clone(),
                Some(status.as_u16()),
                false,
                &message,
            )
            .await;
            return SubmissionOutcome::failure_with(message, body.unwrap_or_else(|| json!({})));
        }

        let Some(body) = body else {
            let message = "Malformed ZATCA response: expected a JSON body".to_string();
            self.finalize_entry(
                invoice.invoice_id,
                entry_id,
                None,
                Some(status.as_u16()),
                false,
                &message,
            )
            .await;
            return SubmissionOutcome::failure(message);
        };

        let Some(zatca_uuid) = body.get("uuid").and_then(Value::as_str).map(str::to_owned)
        else {
            let message = "Malformed ZATCA response: missing invoice uuid".to_string();
            self.finalize_entry(
                invoice.invoice_id,
                entry_id,
                Some(body.clone()),
                Some(status.as_u16()),
                false,
                &message,
            )
            .await;
            return SubmissionOutcome::failure_with(message, body);
        };
        let qr_code = body.get("qrCode").and_then(Value::as_str).map(str::to_owned);

        if let Err(e) = invoice.record_submission(zatca_uuid, qr_code, body.clone()) {
            let message = format!("Failed to apply submission result: {}", e);
            self.finalize_entry(
                invoice.invoice_id,
                entry_id,
                Some(body.clone()),
                Some(status.as_u16()),
                false,
                &message,
            )
            .await;
            return SubmissionOutcome::failure_with(message, body);
        }

        if let Err(e) = self
            .log_sink
            .finalize(
                invoice.invoice_id,
                entry_id,
                SubmissionLogCompletion {
                    response_data: Some(body.clone()),
                    status_code: Some(status.as_u16()),
                    success: true,
                    error_message: None,
                },
            )
            .await
        {
            tracing::error!(error = %e, "Failed to finalize submission log entry");
        }

        tracing::info!(
            invoice_number = %invoice.invoice_number,
            zatca_uuid = invoice.zatca_uuid.as_deref().unwrap_or_default(),
            "Invoice submitted to ZATCA"
        );
        SubmissionOutcome::ok("Invoice submitted successfully", body)
    }

    /// Look up the authority-side status of a submitted invoice. Never
    /// mutates the invoice and makes no call at all when it was never
    /// submitted.
    pub async fn check_status(&self, invoice: &Invoice) -> SubmissionOutcome {
        let Some(zatca_uuid) = invoice.zatca_uuid.as_deref() else {
            return SubmissionOutcome::failure("Invoice not yet submitted to ZATCA");
        };

        let url = format!("{}/invoices/{}", self.config.api_url, zatca_uuid);
        match self
            .client
            .get(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout())
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => {
                match response.json::<Value>().await {
                    Ok(body) => SubmissionOutcome::ok("Status retrieved", body),
                    Err(e) => {
                        SubmissionOutcome::failure(format!("Malformed ZATCA response: {}", e))
                    }
                }
            }
            Ok(response) => {
                SubmissionOutcome::failure(format!("Error: {}", response.status().as_u16()))
            }
            Err(e) => SubmissionOutcome::failure(format!("Network error: {}", e)),
        }
    }

    /// Cancel a previously submitted invoice. On a 200 the invoice moves to
    /// cancelled; otherwise it is left untouched. The status precondition
    /// (submitted or approved) is the caller's responsibility.
    pub async fn cancel_invoice(
        &self,
        invoice: &mut Invoice,
        reason: Option<String>,
    ) -> SubmissionOutcome {
        let Some(zatca_uuid) = invoice.zatca_uuid.clone() else {
            return SubmissionOutcome::failure("Invoice not yet submitted to ZATCA");
        };

        let payload = CancelPayload {
            uuid: zatca_uuid.clone(),
            reason: reason.unwrap_or_else(|| "Cancelled by user".to_string()),
        };
        let request_data = match serde_json::to_value(&payload) {
            Ok(value) => value,
            Err(e) => {
                return SubmissionOutcome::failure(format!(
                    "Failed to serialize cancellation: {}",
                    e
                ))
            }
        };

        let entry_id = match self
            .log_sink
            .append(NewSubmissionLog {
                invoice_id: invoice.invoice_id,
                action: SubmissionAction::CancelInvoice,
                request_data,
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                return SubmissionOutcome::failure(format!(
                    "Failed to record cancellation attempt: {}",
                    e
                ))
            }
        };

        let url = format!("{}/invoices/{}/cancel", self.config.api_url, zatca_uuid);
        let sent = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout())
            .json(&payload)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let message = format!("Network error: {}", e);
                self.finalize_entry(invoice.invoice_id, entry_id, None, None, false, &message)
                    .await;
                return SubmissionOutcome::failure(message);
            }
        };

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();

        if status != StatusCode::OK {
            let message = format!("Error: {}", status.as_u16());
            self.finalize_entry(
                invoice.invoice_id,
                entry_id,
                body.clone(),
                Some(status.as_u16()),
                false,
                &message,
            )
            .await;
            return SubmissionOutcome::failure_with(message, body.unwrap_or_else(|| json!({})));
        }

        let body = body.unwrap_or_else(|| json!({}));

        if let Err(e) = invoice.record_cancellation() {
            let message = format!("Failed to apply cancellation result: {}", e);
            self.finalize_entry(
                invoice.invoice_id,
                entry_id,
                Some(body.clone()),
                Some(status.as_u16()),
                false,
                &message,
            )
            .await;
            return SubmissionOutcome::failure_with(message, body);
        }

        if let Err(e) = self
            .log_sink
            .finalize(
                invoice.invoice_id,
                entry_id,
                SubmissionLogCompletion {
                    response_data: Some(body.clone()),
                    status_code: Some(status.as_u16()),
                    success: true,
                    error_message: None,
                },
            )
            .await
        {
            tracing::error!(error = %e, "Failed to finalize submission log entry");
        }

        tracing::info!(
            invoice_number = %invoice.invoice_number,
            zatca_uuid = %zatca_uuid,
            "Invoice cancelled in ZATCA"
        );
        SubmissionOutcome::ok("Invoice cancelled successfully", body)
    }

    async fn finalize_entry(
        &self,
        invoice_id: Uuid,
        entry_id: Uuid,
        response_data: Option<Value>,
        status_code: Option<u16>,
        success: bool,
        error_message: &str,
    ) {
        let completion = SubmissionLogCompletion {
            response_data,
            status_code,
            success,
            error_message: (!success).then(|| error_message.to_string()),
        };
        if let Err(e) = self
            .log_sink
            .finalize(invoice_id, entry_id, completion)
            .await
        {
            tracing::error!(error = %e, "Failed to finalize submission log entry");
        }
    }
}
