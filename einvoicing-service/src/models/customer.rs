//! Buyer (customer) model for einvoicing-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Buyer identity and address.
///
/// Only name, address and city are required; ZATCA's simplified invoices
/// accept sparse buyer data, so everything else is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: Uuid,
    pub name: String,
    pub vat_number: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
    pub building_number: Option<String>,
    pub street_name: Option<String>,
    pub district: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a customer.
#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub name: String,
    pub vat_number: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
    pub building_number: Option<String>,
    pub street_name: Option<String>,
    pub district: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Input for updating a customer.
#[derive(Debug, Clone, Default)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub vat_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub building_number: Option<String>,
    pub street_name: Option<String>,
    pub district: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}
