//! Shared test harness: spawns the service wired to a scripted in-process
//! mock of the ZATCA API. Per-route request counters make "no network call"
//! assertions literal call-count assertions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use secrecy::Secret;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use einvoicing_service::config::{Config, ServerConfig, ZatcaConfig};
use einvoicing_service::Application;

/// What the mock authority replies to the next submit/cancel call.
#[derive(Clone)]
pub enum AuthorityReply {
    Accept { uuid: String, qr_code: String },
    Reject { status: u16, body: Value },
}

#[derive(Clone)]
pub struct MockAuthority {
    pub url: String,
    submit_calls: Arc<AtomicU64>,
    status_calls: Arc<AtomicU64>,
    cancel_calls: Arc<AtomicU64>,
    reply: Arc<Mutex<AuthorityReply>>,
    last_submit_body: Arc<Mutex<Option<Value>>>,
}

impl MockAuthority {
    pub async fn spawn() -> Self {
        let authority = Self {
            url: String::new(),
            submit_calls: Arc::new(AtomicU64::new(0)),
            status_calls: Arc::new(AtomicU64::new(0)),
            cancel_calls: Arc::new(AtomicU64::new(0)),
            reply: Arc::new(Mutex::new(AuthorityReply::Accept {
                uuid: "zatca-uuid-1".to_string(),
                qr_code: "qr-payload-1".to_string(),
            })),
            last_submit_body: Arc::new(Mutex::new(None)),
        };

        let router = Router::new()
            .route("/invoices", post(handle_submit))
            .route("/invoices/:uuid", get(handle_status))
            .route("/invoices/:uuid/cancel", post(handle_cancel))
            .with_state(authority.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock authority");
        let addr = listener.local_addr().expect("Missing local addr");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Mock authority server failed");
        });

        Self {
            url: format!("http://{}", addr),
            ..authority
        }
    }

    pub fn set_reply(&self, reply: AuthorityReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn submit_calls(&self) -> u64 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u64 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> u64 {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn last_submit_body(&self) -> Option<Value> {
        self.last_submit_body.lock().unwrap().clone()
    }
}

async fn handle_submit(
    State(authority): State<MockAuthority>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    authority.submit_calls.fetch_add(1, Ordering::SeqCst);
    *authority.last_submit_body.lock().unwrap() = Some(body);

    match authority.reply.lock().unwrap().clone() {
        AuthorityReply::Accept { uuid, qr_code } => (
            StatusCode::OK,
            Json(json!({ "uuid": uuid, "qrCode": qr_code, "status": "REPORTED" })),
        ),
        AuthorityReply::Reject { status, body } => (
            StatusCode::from_u16(status).expect("Invalid scripted status"),
            Json(body),
        ),
    }
}

async fn handle_status(
    State(authority): State<MockAuthority>,
    Path(uuid): Path<String>,
) -> (StatusCode, Json<Value>) {
    authority.status_calls.fetch_add(1, Ordering::SeqCst);
    match authority.reply.lock().unwrap().clone() {
        AuthorityReply::Accept { .. } => (
            StatusCode::OK,
            Json(json!({ "uuid": uuid, "status": "approved" })),
        ),
        AuthorityReply::Reject { status, body } => (
            StatusCode::from_u16(status).expect("Invalid scripted status"),
            Json(body),
        ),
    }
}

async fn handle_cancel(
    State(authority): State<MockAuthority>,
    Path(uuid): Path<String>,
) -> (StatusCode, Json<Value>) {
    authority.cancel_calls.fetch_add(1, Ordering::SeqCst);
    match authority.reply.lock().unwrap().clone() {
        AuthorityReply::Accept { .. } => (
            StatusCode::OK,
            Json(json!({ "uuid": uuid, "status": "cancelled" })),
        ),
        AuthorityReply::Reject { status, body } => (
            StatusCode::from_u16(status).expect("Invalid scripted status"),
            Json(body),
        ),
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub authority: MockAuthority,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let authority = MockAuthority::spawn().await;
        let url = authority.url.clone();
        Self::spawn_against(authority, url).await
    }

    /// Spawn the service pointed at an arbitrary authority URL, e.g. a dead
    /// endpoint for transport-failure tests.
    pub async fn spawn_with_authority_url(url: &str) -> Self {
        let authority = MockAuthority::spawn().await;
        Self::spawn_against(authority, url.to_string()).await
    }

    async fn spawn_against(authority: MockAuthority, authority_url: String) -> Self {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            zatca: ZatcaConfig {
                api_url: authority_url,
                api_key: Secret::new("test-api-key".to_string()),
                timeout_secs: 5,
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());
        tokio::spawn(app.run_until_stopped());

        Self {
            address,
            client: reqwest::Client::new(),
            authority,
        }
    }

    pub async fn post_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn put_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Seed a standard seller, returning its id.
    pub async fn seed_company(&self) -> String {
        let response = self
            .post_json(
                "/companies",
                json!({
                    "name": "Acme Co",
                    "vat_number": "123456789012345",
                    "cr_number": "1010101010",
                    "address": "King Fahd Rd, Riyadh",
                    "city": "Riyadh",
                    "postal_code": "12345",
                    "building_number": "7788",
                    "street_name": "King Fahd Rd",
                    "district": "Al Olaya"
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "Failed to seed company");
        response.json::<Value>().await.unwrap()["company_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Seed a minimal buyer, returning its id.
    pub async fn seed_customer(&self) -> String {
        let response = self
            .post_json(
                "/customers",
                json!({
                    "name": "Buyer LLC",
                    "address": "Main St",
                    "city": "Jeddah"
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "Failed to seed customer");
        response.json::<Value>().await.unwrap()["customer_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Seed a draft invoice with one 2 x 50.00 line at 15% VAT, returning
    /// the created envelope.
    pub async fn seed_invoice(
        &self,
        number: &str,
        company_id: &str,
        customer_id: &str,
    ) -> Value {
        let response = self
            .post_json(
                "/invoices",
                json!({
                    "invoice_number": number,
                    "invoice_type": "simplified",
                    "issue_date": "2024-01-01",
                    "issue_time": "10:00:00",
                    "company_id": company_id,
                    "customer_id": customer_id,
                    "items": [
                        {
                            "description": "Consulting",
                            "quantity": "2",
                            "unit_price": "50.00"
                        }
                    ]
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "Failed to seed invoice");
        response.json().await.unwrap()
    }
}
