//! einvoicing-service: ZATCA e-invoicing.
//!
//! Invoice management over an in-memory store, compliance QR payloads (TLV
//! over base64), and submission to the ZATCA authority API with an
//! append-only audit trail of every interaction.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{AppState, Application};
