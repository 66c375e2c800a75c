//! Line item model for einvoicing-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Line item on an invoice. Owned by exactly one invoice and removed with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// VAT percentage, e.g. 15 for the standard Saudi rate.
    pub vat_rate: Decimal,
    pub discount: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

impl LineItem {
    /// Recompute the derived amounts from the stored inputs:
    /// total = quantity x unit_price - discount,
    /// vat_amount = total x (vat_rate / 100).
    ///
    /// Runs on every persistence so the derived fields are never stale.
    /// Amounts are quantized to 2 decimal places, banker's rounding.
    pub fn recompute(&mut self) {
        self.total = (self.quantity * self.unit_price - self.discount).round_dp(2);
        self.vat_amount = (self.total * (self.vat_rate / Decimal::ONE_HUNDRED)).round_dp(2);
    }
}

/// Input for creating a line item.
#[derive(Debug, Clone)]
pub struct CreateLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
    pub discount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(quantity: &str, unit_price: &str, vat_rate: &str, discount: &str) -> LineItem {
        let mut item = LineItem {
            line_item_id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            description: "Widget".to_string(),
            quantity: Decimal::from_str(quantity).unwrap(),
            unit_price: Decimal::from_str(unit_price).unwrap(),
            vat_rate: Decimal::from_str(vat_rate).unwrap(),
            discount: Decimal::from_str(discount).unwrap(),
            vat_amount: Decimal::ZERO,
            total: Decimal::ZERO,
            sort_order: 0,
            created_utc: Utc::now(),
        };
        item.recompute();
        item
    }

    #[test]
    fn recompute_derives_total_and_vat() {
        let item = item("2", "50.00", "15", "0");
        assert_eq!(item.total, Decimal::from_str("100.00").unwrap());
        assert_eq!(item.vat_amount, Decimal::from_str("15.00").unwrap());
    }

    #[test]
    fn recompute_applies_line_discount_before_vat() {
        let item = item("3", "10.00", "15", "5.00");
        assert_eq!(item.total, Decimal::from_str("25.00").unwrap());
        assert_eq!(item.vat_amount, Decimal::from_str("3.75").unwrap());
    }

    #[test]
    fn recompute_tracks_input_changes() {
        let mut item = item("2", "50.00", "15", "0");
        item.quantity = Decimal::from_str("4").unwrap();
        item.recompute();
        assert_eq!(item.total, Decimal::from_str("200.00").unwrap());
        assert_eq!(item.vat_amount, Decimal::from_str("30.00").unwrap());

        item.vat_rate = Decimal::from_str("5").unwrap();
        item.recompute();
        assert_eq!(item.vat_amount, Decimal::from_str("10.00").unwrap());
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut item = item("7", "19.99", "15", "1.25");
        let total = item.total;
        let vat = item.vat_amount;
        item.recompute();
        item.recompute();
        assert_eq!(item.total, total);
        assert_eq!(item.vat_amount, vat);
    }
}
