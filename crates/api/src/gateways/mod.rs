//! Thin clients for the third-party providers.
//!
//! Handlers only see the traits; [`Gateways::http`] wires the `reqwest`
//! implementations. Every call is a single attempt, and any transport error
//! or non-2xx status becomes a [`GatewayError`].

pub mod geonames;
pub mod market;
pub mod monobank;
pub mod novaposhta;
pub mod sendgrid;
pub mod spaces;
pub mod twilio;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ProviderConfig;

pub use monobank::{Invoice, InvoiceRequest, MerchantPaymInfo};
pub use spaces::PresignedUpload;

#[derive(Debug, Error)]
#[error("{provider} request failed: {details}")]
pub struct GatewayError {
    pub provider: &'static str,
    /// Upstream HTTP status, when a response was received.
    pub status: Option<u16>,
    pub details: String,
}

impl GatewayError {
    pub fn new(provider: &'static str, details: impl Into<String>) -> Self {
        Self {
            provider,
            status: None,
            details: details.into(),
        }
    }

    pub fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        Self {
            provider,
            status: err.status().map(|s| s.as_u16()),
            details: err.to_string(),
        }
    }

    /// Capture status and body of a failed response.
    pub async fn from_response(provider: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let details = response
            .text()
            .await
            .unwrap_or_else(|e| format!("unreadable response body: {e}"));
        Self {
            provider,
            status: Some(status),
            details,
        }
    }
}

/// Decode a JSON response, treating non-2xx as a provider failure.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    if !response.status().is_success() {
        return Err(GatewayError::from_response(provider, response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::transport(provider, e))
}

/// Outcome of an OTP check that reached the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Approved,
    Rejected,
}

#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Start an SMS verification. Returns the provider status, e.g. `pending`.
    async fn send_code(&self, phone: &str) -> Result<String, GatewayError>;
    async fn check_code(&self, phone: &str, code: &str) -> Result<OtpCheck, GatewayError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, GatewayError>;
}

#[async_trait]
pub trait ShippingGateway: Send + Sync {
    async fn settlements(&self, query: &str, limit: u32) -> Result<Value, GatewayError>;
    async fn warehouses(&self, city_ref: &str, search: Option<&str>) -> Result<Value, GatewayError>;
}

/// A populated place returned by the geocoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub area_id: String,
    pub name: String,
    pub region: Option<String>,
}

#[async_trait]
pub trait GeocodeGateway: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Place>, GatewayError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn presign_upload(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<PresignedUpload, GatewayError>;
    /// Grant public read on an uploaded object. Returns its public URL.
    async fn make_public(&self, key: &str) -> Result<String, GatewayError>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), GatewayError>;
}

/// Raw upstream reply mirrored back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait MarketGateway: Send + Sync {
    async fn binance_p2p(&self, body: &Value) -> Result<ProxiedResponse, GatewayError>;
    /// Thumbnail of the best search match for a coin symbol.
    async fn coin_icon(&self, symbol: &str) -> Result<Option<String>, GatewayError>;
}

/// Provider clients injected into the application state.
#[derive(Clone)]
pub struct Gateways {
    pub otp: Arc<dyn OtpGateway>,
    pub payments: Arc<dyn PaymentGateway>,
    pub shipping: Arc<dyn ShippingGateway>,
    pub geocoder: Arc<dyn GeocodeGateway>,
    pub storage: Arc<dyn ObjectStorage>,
    pub mailer: Arc<dyn Mailer>,
    pub market: Arc<dyn MarketGateway>,
}

impl Gateways {
    /// Build the HTTP-backed clients sharing one connection pool.
    pub fn http(config: &ProviderConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| GatewayError::transport("http-client", e))?;

        Ok(Self {
            otp: Arc::new(twilio::TwilioVerify::new(client.clone(), config)),
            payments: Arc::new(monobank::Monobank::new(client.clone(), config)),
            shipping: Arc::new(novaposhta::NovaPoshta::new(client.clone(), config)),
            geocoder: Arc::new(geonames::GeoNames::new(client.clone(), config)),
            storage: Arc::new(spaces::SpacesStorage::new(client.clone(), config)),
            mailer: Arc::new(sendgrid::SendGrid::new(client.clone(), config)),
            market: Arc::new(market::MarketProxy::new(client)),
        })
    }
}
