pub mod qr;
pub mod repository;
pub mod zatca;

pub use qr::{encode_qr_payload, invoice_qr_payload, QrError};
pub use repository::InvoiceRepository;
pub use zatca::{SubmissionLogSink, SubmissionOutcome, ZatcaClient};
