//! Invoice aggregate and its status lifecycle.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use super::LineItem;

/// Invoice type per the ZATCA classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Standard,
    Simplified,
    Debit,
    Credit,
}

impl Default for InvoiceType {
    fn default() -> Self {
        InvoiceType::Standard
    }
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Standard => "standard",
            InvoiceType::Simplified => "simplified",
            InvoiceType::Debit => "debit",
            InvoiceType::Credit => "credit",
        }
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Submitted => "submitted",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Rejected => "rejected",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Legal lifecycle edges. Rejected and cancelled are terminal.
    pub fn can_transition(self, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, to),
            (Draft, Submitted)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Submitted, Cancelled)
                | (Approved, Cancelled)
        )
    }
}

/// The invoice aggregate root. Owns its line items and submission log; the
/// authority-assigned fields (uuid, qr_code, raw response) are populated only
/// after a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub issue_date: NaiveDate,
    pub issue_time: NaiveTime,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    /// Invoice-level discount, applied after line totals are summed.
    pub discount: Decimal,
    pub total: Decimal,
    /// Identifier assigned by ZATCA on acceptance.
    pub zatca_uuid: Option<String>,
    /// QR payload returned by ZATCA on acceptance.
    pub qr_code: Option<String>,
    pub zatca_response: Option<serde_json::Value>,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    /// Move to `to` if the lifecycle allows it.
    pub fn transition_to(&mut self, to: InvoiceStatus) -> Result<(), AppError> {
        if !self.status.can_transition(to) {
            return Err(AppError::Conflict(anyhow!(
                "Illegal status transition: {} -> {}",
                self.status.as_str(),
                to.as_str()
            )));
        }
        self.status = to;
        Ok(())
    }

    pub fn can_edit(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }

    pub fn can_delete(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }

    pub fn can_submit(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }

    pub fn can_cancel(&self) -> bool {
        matches!(
            self.status,
            InvoiceStatus::Submitted | InvoiceStatus::Approved
        )
    }

    /// Recompute the header totals from the line items:
    /// subtotal = sum(line totals), vat_amount = sum(line vat amounts),
    /// total = subtotal + vat_amount - discount. Idempotent; amounts are
    /// quantized to 2 decimal places like the line items.
    pub fn calculate_totals(&mut self, items: &[LineItem]) {
        self.subtotal = items.iter().map(|item| item.total).sum::<Decimal>().round_dp(2);
        self.vat_amount = items
            .iter()
            .map(|item| item.vat_amount)
            .sum::<Decimal>()
            .round_dp(2);
        self.total = (self.subtotal + self.vat_amount - self.discount).round_dp(2);
    }

    /// Apply an accepted submission: store the authority identifiers and the
    /// raw response, and move draft -> submitted.
    pub fn record_submission(
        &mut self,
        zatca_uuid: String,
        qr_code: Option<String>,
        response: serde_json::Value,
    ) -> Result<(), AppError> {
        self.transition_to(InvoiceStatus::Submitted)?;
        self.zatca_uuid = Some(zatca_uuid);
        self.qr_code = qr_code;
        self.zatca_response = Some(response);
        self.updated_utc = Utc::now();
        Ok(())
    }

    /// Apply an accepted cancellation.
    pub fn record_cancellation(&mut self) -> Result<(), AppError> {
        self.transition_to(InvoiceStatus::Cancelled)?;
        self.updated_utc = Utc::now();
        Ok(())
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub issue_date: NaiveDate,
    pub issue_time: NaiveTime,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub discount: Decimal,
    pub notes: Option<String>,
}

/// Input for updating an invoice (draft only).
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub invoice_number: Option<String>,
    pub invoice_type: Option<InvoiceType>,
    pub issue_date: Option<NaiveDate>,
    pub issue_time: Option<NaiveTime>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
}
