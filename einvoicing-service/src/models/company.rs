//! Seller (company) model for einvoicing-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seller legal/tax identity with the structured address ZATCA expects.
///
/// Referenced by invoices as the seller party; deletion is blocked while any
/// invoice points at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub company_id: Uuid,
    pub name: String,
    /// 15-digit VAT registration number, unique across companies.
    pub vat_number: String,
    /// Commercial registration number.
    pub cr_number: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub building_number: String,
    pub street_name: String,
    pub district: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a company.
#[derive(Debug, Clone)]
pub struct CreateCompany {
    pub name: String,
    pub vat_number: String,
    pub cr_number: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub building_number: String,
    pub street_name: String,
    pub district: String,
}

/// Input for updating a company.
#[derive(Debug, Clone, Default)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub vat_number: Option<String>,
    pub cr_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub building_number: Option<String>,
    pub street_name: Option<String>,
    pub district: Option<String>,
}
