//! Request and response DTOs for the HTTP surface.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    CreateCompany, CreateCustomer, CreateInvoice, CreateLineItem, Invoice, InvoiceStatus,
    InvoiceType, LineItem, SubmissionLogEntry, UpdateCompany, UpdateCustomer, UpdateInvoice,
};

fn default_country() -> String {
    "SA".to_string()
}

fn default_vat_rate() -> Decimal {
    Decimal::new(15, 0)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(equal = 15))]
    pub vat_number: String,
    #[validate(length(min = 1, max = 20))]
    pub cr_number: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 10))]
    pub postal_code: String,
    #[serde(default = "default_country")]
    #[validate(length(equal = 2))]
    pub country: String,
    #[validate(length(min = 1, max = 10))]
    pub building_number: String,
    #[validate(length(min = 1, max = 255))]
    pub street_name: String,
    #[validate(length(min = 1, max = 100))]
    pub district: String,
}

impl From<CreateCompanyRequest> for CreateCompany {
    fn from(req: CreateCompanyRequest) -> Self {
        CreateCompany {
            name: req.name,
            vat_number: req.vat_number,
            cr_number: req.cr_number,
            address: req.address,
            city: req.city,
            postal_code: req.postal_code,
            country: req.country,
            building_number: req.building_number,
            street_name: req.street_name,
            district: req.district,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(equal = 15))]
    pub vat_number: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub cr_number: Option<String>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub postal_code: Option<String>,
    #[validate(length(equal = 2))]
    pub country: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub building_number: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub street_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub district: Option<String>,
}

impl From<UpdateCompanyRequest> for UpdateCompany {
    fn from(req: UpdateCompanyRequest) -> Self {
        UpdateCompany {
            name: req.name,
            vat_number: req.vat_number,
            cr_number: req.cr_number,
            address: req.address,
            city: req.city,
            postal_code: req.postal_code,
            country: req.country,
            building_number: req.building_number,
            street_name: req.street_name,
            district: req.district,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(equal = 15))]
    pub vat_number: Option<String>,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 10))]
    pub postal_code: Option<String>,
    #[serde(default = "default_country")]
    #[validate(length(equal = 2))]
    pub country: String,
    #[validate(length(min = 1, max = 10))]
    pub building_number: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub street_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub district: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
}

impl From<CreateCustomerRequest> for CreateCustomer {
    fn from(req: CreateCustomerRequest) -> Self {
        CreateCustomer {
            name: req.name,
            vat_number: req.vat_number,
            address: req.address,
            city: req.city,
            postal_code: req.postal_code,
            country: req.country,
            building_number: req.building_number,
            street_name: req.street_name,
            district: req.district,
            email: req.email,
            phone: req.phone,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(equal = 15))]
    pub vat_number: Option<String>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub postal_code: Option<String>,
    #[validate(length(equal = 2))]
    pub country: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub building_number: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub street_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub district: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
}

impl From<UpdateCustomerRequest> for UpdateCustomer {
    fn from(req: UpdateCustomerRequest) -> Self {
        UpdateCustomer {
            name: req.name,
            vat_number: req.vat_number,
            address: req.address,
            city: req.city,
            postal_code: req.postal_code,
            country: req.country,
            building_number: req.building_number,
            street_name: req.street_name,
            district: req.district,
            email: req.email,
            phone: req.phone,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// VAT percentage; defaults to the standard 15% rate.
    #[serde(default = "default_vat_rate")]
    pub vat_rate: Decimal,
    #[serde(default)]
    pub discount: Decimal,
}

impl From<LineItemRequest> for CreateLineItem {
    fn from(req: LineItemRequest) -> Self {
        CreateLineItem {
            description: req.description,
            quantity: req.quantity,
            unit_price: req.unit_price,
            vat_rate: req.vat_rate,
            discount: req.discount,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: String,
    #[serde(default)]
    pub invoice_type: InvoiceType,
    pub issue_date: NaiveDate,
    pub issue_time: NaiveTime,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    #[serde(default)]
    pub discount: Decimal,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItemRequest>,
}

impl CreateInvoiceRequest {
    pub fn into_parts(self) -> (CreateInvoice, Vec<CreateLineItem>) {
        let items = self.items.into_iter().map(CreateLineItem::from).collect();
        (
            CreateInvoice {
                invoice_number: self.invoice_number,
                invoice_type: self.invoice_type,
                issue_date: self.issue_date,
                issue_time: self.issue_time,
                company_id: self.company_id,
                customer_id: self.customer_id,
                discount: self.discount,
                notes: self.notes,
            },
            items,
        )
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: Option<String>,
    pub invoice_type: Option<InvoiceType>,
    pub issue_date: Option<NaiveDate>,
    pub issue_time: Option<NaiveTime>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
    /// When present, replaces the invoice's line items wholesale.
    pub items: Option<Vec<LineItemRequest>>,
}

impl UpdateInvoiceRequest {
    pub fn into_parts(self) -> (UpdateInvoice, Option<Vec<CreateLineItem>>) {
        let items = self
            .items
            .map(|items| items.into_iter().map(CreateLineItem::from).collect());
        (
            UpdateInvoice {
                invoice_number: self.invoice_number,
                invoice_type: self.invoice_type,
                issue_date: self.issue_date,
                issue_time: self.issue_time,
                discount: self.discount,
                notes: self.notes,
            },
            items,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelInvoiceRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub status: Option<InvoiceStatus>,
}

/// Invoice header plus its line items.
#[derive(Debug, Serialize)]
pub struct InvoiceEnvelope {
    pub invoice: Invoice,
    pub items: Vec<LineItem>,
}

/// Full invoice detail: header, line items and the submission audit trail.
#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<LineItem>,
    pub logs: Vec<SubmissionLogEntry>,
}
