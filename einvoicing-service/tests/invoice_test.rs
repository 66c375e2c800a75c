//! Invoice CRUD and totals integration tests for einvoicing-service.

mod common;

use base64::{engine::general_purpose, Engine as _};
use common::TestApp;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("expected a decimal string")).unwrap()
}

#[tokio::test]
async fn create_invoice_computes_line_and_header_totals() {
    let app = TestApp::spawn().await;
    let company_id = app.seed_company().await;
    let customer_id = app.seed_customer().await;

    let response = app
        .post_json(
            "/invoices",
            json!({
                "invoice_number": "INV-100",
                "invoice_type": "standard",
                "issue_date": "2024-03-15",
                "issue_time": "14:30:00",
                "company_id": company_id,
                "customer_id": customer_id,
                "discount": "10.00",
                "items": [
                    { "description": "Widget", "quantity": "2", "unit_price": "50.00" },
                    { "description": "Gadget", "quantity": "3", "unit_price": "10.00", "discount": "5.00" }
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    // 2 x 50.00 = 100.00, VAT 15.00; 3 x 10.00 - 5.00 = 25.00, VAT 3.75
    assert_eq!(decimal(&items[0]["total"]), Decimal::from_str("100.00").unwrap());
    assert_eq!(decimal(&items[0]["vat_amount"]), Decimal::from_str("15.00").unwrap());
    assert_eq!(decimal(&items[1]["total"]), Decimal::from_str("25.00").unwrap());
    assert_eq!(decimal(&items[1]["vat_amount"]), Decimal::from_str("3.75").unwrap());

    let invoice = &body["invoice"];
    assert_eq!(invoice["status"], "draft");
    assert_eq!(decimal(&invoice["subtotal"]), Decimal::from_str("125.00").unwrap());
    assert_eq!(decimal(&invoice["vat_amount"]), Decimal::from_str("18.75").unwrap());
    assert_eq!(decimal(&invoice["total"]), Decimal::from_str("133.75").unwrap());

    // total == subtotal + vat - discount, exactly
    assert_eq!(
        decimal(&invoice["total"]),
        decimal(&invoice["subtotal"]) + decimal(&invoice["vat_amount"])
            - decimal(&invoice["discount"])
    );
}

#[tokio::test]
async fn recomputing_totals_is_idempotent_across_saves() {
    let app = TestApp::spawn().await;
    let company_id = app.seed_company().await;
    let customer_id = app.seed_customer().await;
    let created = app
        .seed_invoice("INV-101", &company_id, &customer_id)
        .await;
    let invoice_id = created["invoice"]["invoice_id"].as_str().unwrap();

    let items = json!({
        "items": [
            { "description": "Oddly priced", "quantity": "3", "unit_price": "3.33" }
        ]
    });

    let first = app
        .put_json(&format!("/invoices/{}", invoice_id), items.clone())
        .await;
    assert_eq!(first.status(), 200);
    let first: Value = first.json().await.unwrap();

    let second = app
        .put_json(&format!("/invoices/{}", invoice_id), items)
        .await;
    assert_eq!(second.status(), 200);
    let second: Value = second.json().await.unwrap();

    for field in ["subtotal", "vat_amount", "total"] {
        assert_eq!(
            decimal(&first["invoice"][field]),
            decimal(&second["invoice"][field]),
            "{field} drifted between identical saves"
        );
    }
}

#[tokio::test]
async fn duplicate_invoice_number_is_rejected() {
    let app = TestApp::spawn().await;
    let company_id = app.seed_company().await;
    let customer_id = app.seed_customer().await;

    app.seed_invoice("INV-102", &company_id, &customer_id).await;

    let response = app
        .post_json(
            "/invoices",
            json!({
                "invoice_number": "INV-102",
                "issue_date": "2024-01-02",
                "issue_time": "09:00:00",
                "company_id": company_id,
                "customer_id": customer_id,
                "items": []
            }),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn list_invoices_filters_by_status() {
    let app = TestApp::spawn().await;
    let company_id = app.seed_company().await;
    let customer_id = app.seed_customer().await;

    let created = app
        .seed_invoice("INV-103", &company_id, &customer_id)
        .await;
    let submitted_id = created["invoice"]["invoice_id"].as_str().unwrap().to_string();
    app.seed_invoice("INV-104", &company_id, &customer_id).await;

    let response = app
        .post_json(&format!("/invoices/{}/submit", submitted_id), json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let drafts: Vec<Value> = app.get("/invoices?status=draft").await.json().await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0]["invoice_number"], "INV-104");

    let submitted: Vec<Value> = app
        .get("/invoices?status=submitted")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["invoice_number"], "INV-103");

    let all: Vec<Value> = app.get("/invoices").await.json().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn editing_and_deleting_are_draft_only() {
    let app = TestApp::spawn().await;
    let company_id = app.seed_company().await;
    let customer_id = app.seed_customer().await;
    let created = app
        .seed_invoice("INV-105", &company_id, &customer_id)
        .await;
    let invoice_id = created["invoice"]["invoice_id"].as_str().unwrap();

    let response = app
        .post_json(&format!("/invoices/{}/submit", invoice_id), json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let edit = app
        .put_json(
            &format!("/invoices/{}", invoice_id),
            json!({ "notes": "too late" }),
        )
        .await;
    assert_eq!(edit.status(), 409);

    let delete = app.delete(&format!("/invoices/{}", invoice_id)).await;
    assert_eq!(delete.status(), 409);
}

#[tokio::test]
async fn referenced_parties_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let company_id = app.seed_company().await;
    let customer_id = app.seed_customer().await;
    let created = app
        .seed_invoice("INV-106", &company_id, &customer_id)
        .await;
    let invoice_id = created["invoice"]["invoice_id"].as_str().unwrap();

    assert_eq!(
        app.delete(&format!("/companies/{}", company_id)).await.status(),
        409
    );
    assert_eq!(
        app.delete(&format!("/customers/{}", customer_id)).await.status(),
        409
    );

    // Once the draft invoice is gone the protection lifts.
    assert_eq!(
        app.delete(&format!("/invoices/{}", invoice_id)).await.status(),
        204
    );
    assert_eq!(
        app.delete(&format!("/companies/{}", company_id)).await.status(),
        204
    );
    assert_eq!(
        app.delete(&format!("/customers/{}", customer_id)).await.status(),
        204
    );
}

#[tokio::test]
async fn invoice_detail_includes_items_and_logs() {
    let app = TestApp::spawn().await;
    let company_id = app.seed_company().await;
    let customer_id = app.seed_customer().await;
    let created = app
        .seed_invoice("INV-107", &company_id, &customer_id)
        .await;
    let invoice_id = created["invoice"]["invoice_id"].as_str().unwrap();

    let detail: Value = app
        .get(&format!("/invoices/{}", invoice_id))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(detail["invoice"]["invoice_number"], "INV-107");
    assert_eq!(detail["items"].as_array().unwrap().len(), 1);
    assert_eq!(detail["logs"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn invalid_company_payload_is_unprocessable() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/companies",
            json!({
                "name": "Acme Co",
                "vat_number": "123",
                "cr_number": "1010101010",
                "address": "King Fahd Rd",
                "city": "Riyadh",
                "postal_code": "12345",
                "building_number": "7788",
                "street_name": "King Fahd Rd",
                "district": "Al Olaya"
            }),
        )
        .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn qr_endpoint_returns_decodable_tlv_payload() {
    let app = TestApp::spawn().await;
    let company_id = app.seed_company().await;
    let customer_id = app.seed_customer().await;
    let created = app
        .seed_invoice("INV-108", &company_id, &customer_id)
        .await;
    let invoice_id = created["invoice"]["invoice_id"].as_str().unwrap();

    let response = app.get(&format!("/invoices/{}/qr", invoice_id)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();

    let bytes = general_purpose::STANDARD
        .decode(body["qr_code"].as_str().unwrap())
        .expect("QR payload must be valid base64");

    // Tag 1 record carries the seller name.
    assert_eq!(bytes[0], 0x01);
    let len = bytes[1] as usize;
    assert_eq!(&bytes[2..2 + len], "Acme Co".as_bytes());
    // Tag 2 follows immediately.
    assert_eq!(bytes[2 + len], 0x02);
}
