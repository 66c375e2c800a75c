pub mod company;
pub mod customer;
pub mod invoice;
pub mod line_item;
pub mod submission_log;

pub use company::{Company, CreateCompany, UpdateCompany};
pub use customer::{CreateCustomer, Customer, UpdateCustomer};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceStatus, InvoiceType, ListInvoicesFilter, UpdateInvoice,
};
pub use line_item::{CreateLineItem, LineItem};
pub use submission_log::{
    NewSubmissionLog, SubmissionAction, SubmissionLogCompletion, SubmissionLogEntry,
};
