//! Invoice handlers: CRUD plus the ZATCA actions (submit, status, cancel).
//!
//! Status preconditions are checked here, before any network traffic, using
//! the entity's lifecycle guards; the client itself does not re-validate.

use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CancelInvoiceRequest, CreateInvoiceRequest, InvoiceDetail, InvoiceEnvelope, InvoiceListQuery,
    UpdateInvoiceRequest,
};
use crate::models::{Company, Customer, Invoice, ListInvoicesFilter, SubmissionLogEntry};
use crate::services::{invoice_qr_payload, SubmissionOutcome};
use crate::startup::AppState;

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceEnvelope>), AppError> {
    payload.validate()?;
    for item in &payload.items {
        item.validate()?;
    }

    let (input, items) = payload.into_parts();
    let (invoice, items) = state.repository.create_invoice(input, items).await?;
    Ok((StatusCode::CREATED, Json(InvoiceEnvelope { invoice, items })))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let filter = ListInvoicesFilter {
        status: query.status,
    };
    Ok(Json(state.repository.list_invoices(filter).await?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let invoice = fetch_invoice(&state, invoice_id).await?;
    let items = state.repository.get_line_items(invoice_id).await?;
    let logs = state.repository.list_logs(invoice_id).await?;
    Ok(Json(InvoiceDetail {
        invoice,
        items,
        logs,
    }))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceEnvelope>, AppError> {
    payload.validate()?;
    if let Some(items) = &payload.items {
        for item in items {
            item.validate()?;
        }
    }

    let (input, items) = payload.into_parts();
    let (invoice, items) = state
        .repository
        .update_invoice(invoice_id, input, items)
        .await?;
    Ok(Json(InvoiceEnvelope { invoice, items }))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_invoice(invoice_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit a draft invoice to ZATCA. The draft guard and the non-empty line
/// item requirement are enforced here so a doomed submission never reaches
/// the network.
pub async fn submit_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let mut invoice = fetch_invoice(&state, invoice_id).await?;
    if !invoice.can_submit() {
        return Err(AppError::Conflict(anyhow!(
            "Invoice already submitted or not in draft status"
        )));
    }

    let (company, customer) = fetch_parties(&state, &invoice).await?;
    let items = state.repository.get_line_items(invoice_id).await?;
    if items.is_empty() {
        return Err(AppError::BadRequest(anyhow!(
            "Cannot submit an invoice without line items"
        )));
    }

    info!(
        invoice_id = %invoice_id,
        invoice_number = %invoice.invoice_number,
        "Submitting invoice to ZATCA"
    );

    let outcome = state
        .zatca
        .submit_invoice(&mut invoice, &company, &customer, &items)
        .await;
    if outcome.success {
        state.repository.save_invoice(&invoice).await?;
    }
    Ok(Json(outcome))
}

/// Ask ZATCA for the authority-side status of an invoice. Read-only; the
/// local status is deliberately not synchronized from the response.
pub async fn check_invoice_status(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let invoice = fetch_invoice(&state, invoice_id).await?;
    let outcome = state.zatca.check_status(&invoice).await;
    Ok(Json(outcome))
}

/// Cancel a submitted or approved invoice in ZATCA.
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<CancelInvoiceRequest>>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let mut invoice = fetch_invoice(&state, invoice_id).await?;
    if !invoice.can_cancel() {
        return Err(AppError::Conflict(anyhow!(
            "Can only cancel submitted or approved invoices"
        )));
    }

    let reason = payload.and_then(|Json(request)| request.reason);
    let outcome = state.zatca.cancel_invoice(&mut invoice, reason).await;
    if outcome.success {
        state.repository.save_invoice(&invoice).await?;
    }
    Ok(Json(outcome))
}

/// Locally generated TLV QR payload for the invoice. Absence (an encoding
/// failure) surfaces as a miss, never as a fault.
pub async fn invoice_qr(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let invoice = fetch_invoice(&state, invoice_id).await?;
    let company = state
        .repository
        .get_company(invoice.company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Company not found")))?;

    match invoice_qr_payload(&invoice, &company) {
        Some(qr_code) => Ok(Json(json!({ "qr_code": qr_code }))),
        None => Err(AppError::NotFound(anyhow!(
            "QR payload unavailable for this invoice"
        ))),
    }
}

pub async fn list_submission_logs(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<SubmissionLogEntry>>, AppError> {
    fetch_invoice(&state, invoice_id).await?;
    Ok(Json(state.repository.list_logs(invoice_id).await?))
}

async fn fetch_invoice(state: &AppState, invoice_id: Uuid) -> Result<Invoice, AppError> {
    state
        .repository
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))
}

async fn fetch_parties(
    state: &AppState,
    invoice: &Invoice,
) -> Result<(Company, Customer), AppError> {
    let company = state
        .repository
        .get_company(invoice.company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Company not found")))?;
    let customer = state
        .repository
        .get_customer(invoice.customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Customer not found")))?;
    Ok((company, customer))
}
