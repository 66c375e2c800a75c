//! In-memory repository for the e-invoicing domain.
//!
//! RwLock'd maps behind an `Arc`, cloneable across handlers. The rules that
//! guard the data live here next to it: unique invoice numbers and VAT
//! numbers, referential protection on company/customer deletion, draft-only
//! invoice edits, cascade removal of line items and logs, and the
//! append-then-finalize discipline of the submission log.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Company, CreateCompany, CreateCustomer, CreateInvoice, CreateLineItem, Customer, Invoice,
    InvoiceStatus, LineItem, ListInvoicesFilter, NewSubmissionLog, SubmissionLogCompletion,
    SubmissionLogEntry, UpdateCompany, UpdateCustomer, UpdateInvoice,
};
use crate::services::zatca::SubmissionLogSink;

#[derive(Default)]
struct Store {
    companies: HashMap<Uuid, Company>,
    customers: HashMap<Uuid, Customer>,
    invoices: HashMap<Uuid, Invoice>,
    line_items: HashMap<Uuid, Vec<LineItem>>,
    logs: HashMap<Uuid, Vec<SubmissionLogEntry>>,
}

/// Thread-safe in-memory store for companies, customers, invoices, their
/// line items and the submission audit log.
#[derive(Clone, Default)]
pub struct InvoiceRepository {
    inner: Arc<RwLock<Store>>,
}

impl InvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Store>, AppError> {
        self.inner
            .read()
            .map_err(|e| AppError::InternalError(anyhow!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Store>, AppError> {
        self.inner
            .write()
            .map_err(|e| AppError::InternalError(anyhow!("Failed to acquire write lock: {}", e)))
    }

    // -------------------------------------------------------------------------
    // Company operations
    // -------------------------------------------------------------------------

    pub async fn create_company(&self, input: CreateCompany) -> Result<Company, AppError> {
        let mut store = self.write()?;

        if store
            .companies
            .values()
            .any(|c| c.vat_number == input.vat_number)
        {
            return Err(AppError::Conflict(anyhow!(
                "A company with VAT number {} already exists",
                input.vat_number
            )));
        }

        let now = Utc::now();
        let company = Company {
            company_id: Uuid::new_v4(),
            name: input.name,
            vat_number: input.vat_number,
            cr_number: input.cr_number,
            address: input.address,
            city: input.city,
            postal_code: input.postal_code,
            country: input.country,
            building_number: input.building_number,
            street_name: input.street_name,
            district: input.district,
            created_utc: now,
            updated_utc: now,
        };
        store.companies.insert(company.company_id, company.clone());

        info!(company_id = %company.company_id, name = %company.name, "Company created");
        Ok(company)
    }

    pub async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, AppError> {
        Ok(self.read()?.companies.get(&company_id).cloned())
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, AppError> {
        let mut companies: Vec<Company> = self.read()?.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    pub async fn update_company(
        &self,
        company_id: Uuid,
        input: UpdateCompany,
    ) -> Result<Company, AppError> {
        let mut store = self.write()?;

        if let Some(vat_number) = &input.vat_number {
            if store
                .companies
                .values()
                .any(|c| c.company_id != company_id && &c.vat_number == vat_number)
            {
                return Err(AppError::Conflict(anyhow!(
                    "A company with VAT number {} already exists",
                    vat_number
                )));
            }
        }

        let company = store
            .companies
            .get_mut(&company_id)
            .ok_or_else(|| AppError::NotFound(anyhow!("Company not found")))?;

        if let Some(name) = input.name {
            company.name = name;
        }
        if let Some(vat_number) = input.vat_number {
            company.vat_number = vat_number;
        }
        if let Some(cr_number) = input.cr_number {
            company.cr_number = cr_number;
        }
        if let Some(address) = input.address {
            company.address = address;
        }
        if let Some(city) = input.city {
            company.city = city;
        }
        if let Some(postal_code) = input.postal_code {
            company.postal_code = postal_code;
        }
        if let Some(country) = input.country {
            company.country = country;
        }
        if let Some(building_number) = input.building_number {
            company.building_number = building_number;
        }
        if let Some(street_name) = input.street_name {
            company.street_name = street_name;
        }
        if let Some(district) = input.district {
            company.district = district;
        }
        company.updated_utc = Utc::now();

        Ok(company.clone())
    }

    /// Delete a company. Referential integrity is authoritative: fails with a
    /// conflict while any invoice references the company as its seller.
    pub async fn delete_company(&self, company_id: Uuid) -> Result<(), AppError> {
        let mut store = self.write()?;

        if !store.companies.contains_key(&company_id) {
            return Err(AppError::NotFound(anyhow!("Company not found")));
        }
        if store
            .invoices
            .values()
            .any(|invoice| invoice.company_id == company_id)
        {
            return Err(AppError::Conflict(anyhow!(
                "Company is referenced by existing invoices and cannot be deleted"
            )));
        }

        store.companies.remove(&company_id);
        info!(company_id = %company_id, "Company deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Customer operations
    // -------------------------------------------------------------------------

    pub async fn create_customer(&self, input: CreateCustomer) -> Result<Customer, AppError> {
        let mut store = self.write()?;

        let now = Utc::now();
        let customer = Customer {
            customer_id: Uuid::new_v4(),
            name: input.name,
            vat_number: input.vat_number,
            address: input.address,
            city: input.city,
            postal_code: input.postal_code,
            country: input.country,
            building_number: input.building_number,
            street_name: input.street_name,
            district: input.district,
            email: input.email,
            phone: input.phone,
            created_utc: now,
            updated_utc: now,
        };
        store.customers.insert(customer.customer_id, customer.clone());

        info!(customer_id = %customer.customer_id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, AppError> {
        Ok(self.read()?.customers.get(&customer_id).cloned())
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let mut customers: Vec<Customer> = self.read()?.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        input: UpdateCustomer,
    ) -> Result<Customer, AppError> {
        let mut store = self.write()?;

        let customer = store
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| AppError::NotFound(anyhow!("Customer not found")))?;

        if let Some(name) = input.name {
            customer.name = name;
        }
        if let Some(vat_number) = input.vat_number {
            customer.vat_number = Some(vat_number);
        }
        if let Some(address) = input.address {
            customer.address = address;
        }
        if let Some(city) = input.city {
            customer.city = city;
        }
        if let Some(postal_code) = input.postal_code {
            customer.postal_code = Some(postal_code);
        }
        if let Some(country) = input.country {
            customer.country = country;
        }
        if let Some(building_number) = input.building_number {
            customer.building_number = Some(building_number);
        }
        if let Some(street_name) = input.street_name {
            customer.street_name = Some(street_name);
        }
        if let Some(district) = input.district {
            customer.district = Some(district);
        }
        if let Some(email) = input.email {
            customer.email = Some(email);
        }
        if let Some(phone) = input.phone {
            customer.phone = Some(phone);
        }
        customer.updated_utc = Utc::now();

        Ok(customer.clone())
    }

    /// Delete a customer; blocked while any invoice references it as buyer.
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), AppError> {
        let mut store = self.write()?;

        if !store.customers.contains_key(&customer_id) {
            return Err(AppError::NotFound(anyhow!("Customer not found")));
        }
        if store
            .invoices
            .values()
            .any(|invoice| invoice.customer_id == customer_id)
        {
            return Err(AppError::Conflict(anyhow!(
                "Customer is referenced by existing invoices and cannot be deleted"
            )));
        }

        store.customers.remove(&customer_id);
        info!(customer_id = %customer_id, "Customer deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invoice operations
    // -------------------------------------------------------------------------

    /// Create an invoice with its line items. Derived line amounts and header
    /// totals are computed here, before anything is stored.
    pub async fn create_invoice(
        &self,
        input: CreateInvoice,
        items: Vec<CreateLineItem>,
    ) -> Result<(Invoice, Vec<LineItem>), AppError> {
        let mut store = self.write()?;

        if !store.companies.contains_key(&input.company_id) {
            return Err(AppError::NotFound(anyhow!("Company not found")));
        }
        if !store.customers.contains_key(&input.customer_id) {
            return Err(AppError::NotFound(anyhow!("Customer not found")));
        }
        if store
            .invoices
            .values()
            .any(|invoice| invoice.invoice_number == input.invoice_number)
        {
            return Err(AppError::Conflict(anyhow!(
                "Invoice number {} already exists",
                input.invoice_number
            )));
        }

        let now = Utc::now();
        let invoice_id = Uuid::new_v4();
        let line_items = build_line_items(invoice_id, items);

        let mut invoice = Invoice {
            invoice_id,
            invoice_number: input.invoice_number,
            invoice_type: input.invoice_type,
            issue_date: input.issue_date,
            issue_time: input.issue_time,
            company_id: input.company_id,
            customer_id: input.customer_id,
            subtotal: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
            discount: input.discount,
            total: Decimal::ZERO,
            zatca_uuid: None,
            qr_code: None,
            zatca_response: None,
            status: InvoiceStatus::Draft,
            notes: input.notes,
            created_utc: now,
            updated_utc: now,
        };
        invoice.calculate_totals(&line_items);

        store.invoices.insert(invoice_id, invoice.clone());
        store.line_items.insert(invoice_id, line_items.clone());

        info!(
            invoice_id = %invoice_id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Invoice created"
        );
        Ok((invoice, line_items))
    }

    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.read()?.invoices.get(&invoice_id).cloned())
    }

    pub async fn list_invoices(
        &self,
        filter: ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let store = self.read()?;
        let mut invoices: Vec<Invoice> = store
            .invoices
            .values()
            .filter(|invoice| filter.status.is_none_or(|status| invoice.status == status))
            .cloned()
            .collect();
        // Newest first, like the original listing.
        invoices.sort_by(|a, b| {
            (b.issue_date, b.issue_time).cmp(&(a.issue_date, a.issue_time))
        });
        Ok(invoices)
    }

    pub async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<LineItem>, AppError> {
        Ok(self
            .read()?
            .line_items
            .get(&invoice_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Update a draft invoice, optionally replacing its line items. Totals
    /// are recomputed whenever anything affecting them changed.
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        input: UpdateInvoice,
        items: Option<Vec<CreateLineItem>>,
    ) -> Result<(Invoice, Vec<LineItem>), AppError> {
        let mut store = self.write()?;

        if let Some(invoice_number) = &input.invoice_number {
            if store.invoices.values().any(|i| {
                i.invoice_id != invoice_id && &i.invoice_number == invoice_number
            }) {
                return Err(AppError::Conflict(anyhow!(
                    "Invoice number {} already exists",
                    invoice_number
                )));
            }
        }

        let invoice = store
            .invoices
            .get(&invoice_id)
            .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;
        if !invoice.can_edit() {
            return Err(AppError::Conflict(anyhow!(
                "Only draft invoices can be edited"
            )));
        }
        let mut invoice = invoice.clone();

        if let Some(invoice_number) = input.invoice_number {
            invoice.invoice_number = invoice_number;
        }
        if let Some(invoice_type) = input.invoice_type {
            invoice.invoice_type = invoice_type;
        }
        if let Some(issue_date) = input.issue_date {
            invoice.issue_date = issue_date;
        }
        if let Some(issue_time) = input.issue_time {
            invoice.issue_time = issue_time;
        }
        if let Some(discount) = input.discount {
            invoice.discount = discount;
        }
        if let Some(notes) = input.notes {
            invoice.notes = Some(notes);
        }

        let line_items = match items {
            Some(items) => {
                let rebuilt = build_line_items(invoice_id, items);
                store.line_items.insert(invoice_id, rebuilt.clone());
                rebuilt
            }
            None => store
                .line_items
                .get(&invoice_id)
                .cloned()
                .unwrap_or_default(),
        };

        invoice.calculate_totals(&line_items);
        invoice.updated_utc = Utc::now();
        store.invoices.insert(invoice_id, invoice.clone());

        Ok((invoice, line_items))
    }

    /// Delete a draft invoice and everything it owns (line items, logs).
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<(), AppError> {
        let mut store = self.write()?;

        let invoice = store
            .invoices
            .get(&invoice_id)
            .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;
        if !invoice.can_delete() {
            return Err(AppError::Conflict(anyhow!(
                "Only draft invoices can be deleted"
            )));
        }

        store.invoices.remove(&invoice_id);
        store.line_items.remove(&invoice_id);
        store.logs.remove(&invoice_id);
        info!(invoice_id = %invoice_id, "Invoice deleted");
        Ok(())
    }

    /// Persist an invoice whose authority fields were mutated by the
    /// submission flow. Status guards are the caller's concern here.
    pub async fn save_invoice(&self, invoice: &Invoice) -> Result<(), AppError> {
        let mut store = self.write()?;
        if !store.invoices.contains_key(&invoice.invoice_id) {
            return Err(AppError::NotFound(anyhow!("Invoice not found")));
        }
        store.invoices.insert(invoice.invoice_id, invoice.clone());
        Ok(())
    }

    /// Submission log entries for an invoice, newest first.
    pub async fn list_logs(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<SubmissionLogEntry>, AppError> {
        let store = self.read()?;
        let mut entries = store.logs.get(&invoice_id).cloned().unwrap_or_default();
        entries.reverse();
        Ok(entries)
    }
}

fn build_line_items(invoice_id: Uuid, items: Vec<CreateLineItem>) -> Vec<LineItem> {
    let now = Utc::now();
    items
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            let mut item = LineItem {
                line_item_id: Uuid::new_v4(),
                invoice_id,
                description: input.description,
                quantity: input.quantity,
                unit_price: input.unit_price,
                vat_rate: input.vat_rate,
                discount: input.discount,
                vat_amount: Decimal::ZERO,
                total: Decimal::ZERO,
                sort_order: index as i32,
                created_utc: now,
            };
            item.recompute();
            item
        })
        .collect()
}

#[async_trait]
impl SubmissionLogSink for InvoiceRepository {
    async fn append(&self, entry: NewSubmissionLog) -> Result<Uuid, AppError> {
        let mut store = self.write()?;
        let entry_id = Uuid::new_v4();
        store
            .logs
            .entry(entry.invoice_id)
            .or_default()
            .push(SubmissionLogEntry {
                entry_id,
                invoice_id: entry.invoice_id,
                action: entry.action,
                request_data: entry.request_data,
                response_data: None,
                status_code: None,
                success: false,
                error_message: None,
                created_utc: Utc::now(),
            });
        Ok(entry_id)
    }

    async fn finalize(
        &self,
        invoice_id: Uuid,
        entry_id: Uuid,
        completion: SubmissionLogCompletion,
    ) -> Result<(), AppError> {
        let mut store = self.write()?;
        let entry = store
            .logs
            .get_mut(&invoice_id)
            .and_then(|entries| entries.iter_mut().find(|e| e.entry_id == entry_id))
            .ok_or_else(|| AppError::NotFound(anyhow!("Submission log entry not found")))?;

        entry.response_data = completion.response_data;
        entry.status_code = completion.status_code;
        entry.success = completion.success;
        entry.error_message = completion.error_message;
        Ok(())
    }
}
