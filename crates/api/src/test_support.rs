//! In-process application for router tests: in-memory store, scripted
//! provider fakes and the production layer stack, driven through
//! `tower::ServiceExt::oneshot`.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use memoria_core::document::{Collection, DocumentId};
use memoria_core::events::EventBus;
use memoria_core::store::{DocumentStore, MemoryStore};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::gateways::{
    GatewayError, GeocodeGateway, Gateways, Invoice, InvoiceRequest, Mailer, MarketGateway,
    ObjectStorage, OtpCheck, OtpGateway, PaymentGateway, Place, PresignedUpload,
    ProxiedResponse, ShippingGateway,
};
use crate::middleware;
use crate::routes::build_router;
use crate::state::AppState;

/// Scripted stand-in for every provider. Records what it was asked to do.
#[derive(Default)]
pub struct FakeProviders {
    /// Code the OTP fake approves.
    pub otp_code: Mutex<String>,
    /// When set, every provider call fails as if the upstream were down.
    pub down: AtomicBool,
    pub otp_sent: Mutex<Vec<String>>,
    pub mail: Mutex<Vec<(String, String, String)>>,
    pub invoices: Mutex<Vec<InvoiceRequest>>,
    pub made_public: Mutex<Vec<String>>,
}

impl FakeProviders {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self, provider: &'static str) -> Result<(), GatewayError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(GatewayError {
                provider,
                status: Some(503),
                details: "service unavailable".into(),
            });
        }
        Ok(())
    }

    /// Last mailed body, i.e. the reset code message.
    pub fn last_mail_body(&self) -> Option<String> {
        self.mail.lock().unwrap().last().map(|(_, _, body)| body.clone())
    }
}

#[async_trait]
impl OtpGateway for FakeProviders {
    async fn send_code(&self, phone: &str) -> Result<String, GatewayError> {
        self.check("twilio")?;
        self.otp_sent.lock().unwrap().push(phone.to_string());
        Ok("pending".into())
    }

    async fn check_code(&self, _phone: &str, code: &str) -> Result<OtpCheck, GatewayError> {
        self.check("twilio")?;
        if *self.otp_code.lock().unwrap() == code {
            Ok(OtpCheck::Approved)
        } else {
            Ok(OtpCheck::Rejected)
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeProviders {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, GatewayError> {
        self.check("monobank")?;
        let mut invoices = self.invoices.lock().unwrap();
        invoices.push(request.clone());
        Ok(Invoice {
            invoice_id: format!("inv-{}", invoices.len()),
            page_url: format!("https://pay.example/inv-{}", invoices.len()),
        })
    }
}

#[async_trait]
impl ShippingGateway for FakeProviders {
    async fn settlements(&self, query: &str, limit: u32) -> Result<Value, GatewayError> {
        self.check("novaposhta")?;
        Ok(json!([{"Present": query, "limit": limit}]))
    }

    async fn warehouses(&self, city_ref: &str, search: Option<&str>) -> Result<Value, GatewayError> {
        self.check("novaposhta")?;
        Ok(json!([{"CityRef": city_ref, "search": search}]))
    }
}

#[async_trait]
impl GeocodeGateway for FakeProviders {
    async fn search(&self, query: &str) -> Result<Vec<Place>, GatewayError> {
        self.check("geonames")?;
        Ok(vec![Place {
            area_id: "702550".into(),
            name: query.to_string(),
            region: Some("Львівська область".into()),
        }])
    }
}

#[async_trait]
impl ObjectStorage for FakeProviders {
    fn presign_upload(&self, key: &str, _now: DateTime<Utc>) -> Result<PresignedUpload, GatewayError> {
        self.check("spaces")?;
        Ok(PresignedUpload {
            upload_url: format!("https://bucket.example/{key}?X-Amz-Signature=fake"),
            key: key.to_string(),
            public_url: format!("https://bucket.example/{key}"),
            expires_in: 900,
        })
    }

    async fn make_public(&self, key: &str) -> Result<String, GatewayError> {
        self.check("spaces")?;
        self.made_public.lock().unwrap().push(key.to_string());
        Ok(format!("https://bucket.example/{key}"))
    }
}

#[async_trait]
impl Mailer for FakeProviders {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), GatewayError> {
        self.check("sendgrid")?;
        self.mail
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[async_trait]
impl MarketGateway for FakeProviders {
    async fn binance_p2p(&self, body: &Value) -> Result<ProxiedResponse, GatewayError> {
        self.check("binance")?;
        Ok(ProxiedResponse {
            status: 200,
            body: serde_json::to_vec(&json!({"code": "000000", "echo": body})).unwrap(),
        })
    }

    async fn coin_icon(&self, symbol: &str) -> Result<Option<String>, GatewayError> {
        self.check("coingecko")?;
        Ok((symbol == "btc").then(|| "https://img.example/btc-thumb.png".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub fakes: Arc<FakeProviders>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig {
            chat_auto_reply_delay_secs: 0,
            ..AppConfig::default()
        })
    }

    pub fn with_config(config: AppConfig) -> Self {
        let fakes = Arc::new(FakeProviders::default());
        let gateways = Gateways {
            otp: fakes.clone(),
            payments: fakes.clone(),
            shipping: fakes.clone(),
            geocoder: fakes.clone(),
            storage: fakes.clone(),
            mailer: fakes.clone(),
            market: fakes.clone(),
        };
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let event_bus = EventBus::new(config.event_bus_capacity);
        let state = AppState::new(store, gateways, config.clone(), event_bus);
        Self {
            router: middleware::apply(build_router(state.clone()), &config),
            state,
            fakes,
        }
    }

    /// Insert a document directly into the store.
    pub async fn seed(&self, collection: Collection, content: Value) -> DocumentId {
        let content = content.as_object().cloned().unwrap_or_default();
        self.state.store().insert(collection, content).await.unwrap().id
    }

    pub async fn stored(&self, collection: Collection, id: DocumentId) -> Value {
        let doc = self.state.store().get(collection, id).await.unwrap().unwrap();
        Value::Object(doc.content)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), None).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body), None).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}
