//! ZATCA compliance QR payload.
//!
//! The authority mandates a base64-encoded TLV sequence over five fields:
//! tag 1 seller name, tag 2 VAT number, tag 3 issue timestamp, tag 4 total
//! with VAT, tag 5 VAT amount. Each record is one tag byte, one length byte
//! (UTF-8 byte length, so at most 255), then the value bytes.

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;
use tracing::warn;

use crate::models::{Company, Invoice};

const TAG_SELLER_NAME: u8 = 1;
const TAG_VAT_NUMBER: u8 = 2;
const TAG_TIMESTAMP: u8 = 3;
const TAG_TOTAL: u8 = 4;
const TAG_VAT_AMOUNT: u8 = 5;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("TLV value for tag {tag} is {len} bytes; the single-byte length field allows at most 255")]
    ValueTooLong { tag: u8, len: usize },
}

/// Encode the five mandated fields as TLV and base64 the concatenation.
///
/// The single-byte length field is fixed by the authority's format; a value
/// that does not fit is an error rather than silent truncation.
pub fn encode_qr_payload(
    seller_name: &str,
    vat_number: &str,
    timestamp: &str,
    total: &str,
    vat_amount: &str,
) -> Result<String, QrError> {
    let mut tlv = Vec::new();
    push_tlv(&mut tlv, TAG_SELLER_NAME, seller_name)?;
    push_tlv(&mut tlv, TAG_VAT_NUMBER, vat_number)?;
    push_tlv(&mut tlv, TAG_TIMESTAMP, timestamp)?;
    push_tlv(&mut tlv, TAG_TOTAL, total)?;
    push_tlv(&mut tlv, TAG_VAT_AMOUNT, vat_amount)?;
    Ok(general_purpose::STANDARD.encode(tlv))
}

fn push_tlv(buf: &mut Vec<u8>, tag: u8, value: &str) -> Result<(), QrError> {
    let bytes = value.as_bytes();
    let len = u8::try_from(bytes.len()).map_err(|_| QrError::ValueTooLong {
        tag,
        len: bytes.len(),
    })?;
    buf.push(tag);
    buf.push(len);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// QR payload for an invoice, or `None` when encoding fails.
///
/// A missing QR is never fatal to the submission flow; callers treat absence
/// as "QR unavailable".
pub fn invoice_qr_payload(invoice: &Invoice, company: &Company) -> Option<String> {
    let timestamp = format!("{}T{}", invoice.issue_date, invoice.issue_time);
    match encode_qr_payload(
        &company.name,
        &company.vat_number,
        &timestamp,
        &invoice.total.to_string(),
        &invoice.vat_amount.to_string(),
    ) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(
                invoice_number = %invoice.invoice_number,
                error = %e,
                "QR payload generation failed"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload: &str) -> Vec<u8> {
        general_purpose::STANDARD
            .decode(payload)
            .expect("QR payload is valid base64")
    }

    /// Walk a TLV buffer and return (tag, value) pairs.
    fn parse_tlv(bytes: &[u8]) -> Vec<(u8, String)> {
        let mut records = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let tag = bytes[pos];
            let len = bytes[pos + 1] as usize;
            let value = String::from_utf8(bytes[pos + 2..pos + 2 + len].to_vec()).unwrap();
            records.push((tag, value));
            pos += 2 + len;
        }
        records
    }

    #[test]
    fn encodes_five_records_in_tag_order() {
        let payload = encode_qr_payload(
            "Acme Co",
            "123456789012345",
            "2024-01-01T10:00:00",
            "115.00",
            "15.00",
        )
        .unwrap();

        let bytes = decode(&payload);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1] as usize, "Acme Co".len());
        assert_eq!(&bytes[2..2 + "Acme Co".len()], "Acme Co".as_bytes());

        let records = parse_tlv(&bytes);
        assert_eq!(
            records,
            vec![
                (1, "Acme Co".to_string()),
                (2, "123456789012345".to_string()),
                (3, "2024-01-01T10:00:00".to_string()),
                (4, "115.00".to_string()),
                (5, "15.00".to_string()),
            ]
        );
    }

    #[test]
    fn length_byte_counts_utf8_bytes_not_chars() {
        // Arabic seller names are the common case in this domain.
        let name = "شركة الاختبار";
        let payload =
            encode_qr_payload(name, "310122393500003", "2024-06-01T09:30:00", "57.50", "7.50")
                .unwrap();

        let bytes = decode(&payload);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1] as usize, name.len());
        assert!(name.len() > name.chars().count());

        let records = parse_tlv(&bytes);
        assert_eq!(records[0], (1, name.to_string()));
    }

    #[test]
    fn oversized_value_fails_instead_of_truncating() {
        let long_name = "x".repeat(256);
        let err = encode_qr_payload(&long_name, "1", "2024-01-01T00:00:00", "0", "0").unwrap_err();
        match err {
            QrError::ValueTooLong { tag, len } => {
                assert_eq!(tag, 1);
                assert_eq!(len, 256);
            }
        }
    }

    #[test]
    fn boundary_255_byte_value_is_accepted() {
        let name = "x".repeat(255);
        let payload = encode_qr_payload(&name, "1", "t", "0", "0").unwrap();
        let bytes = decode(&payload);
        assert_eq!(bytes[1], 255);
    }
}
