use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{read_json, GatewayError, PaymentGateway};
use crate::config::ProviderConfig;

const PROVIDER: &str = "monobank";
const API_BASE_URL: &str = "https://api.monobank.ua";

/// Hryvnia, ISO 4217 numeric code.
pub const UAH: u16 = 980;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantPaymInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// Body of `POST /api/merchant/invoice/create`. `amount` is in kopecks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRequest {
    pub amount: i64,
    pub ccy: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_paym_info: Option<MerchantPaymInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_hook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: String,
    pub page_url: String,
}

pub struct Monobank {
    client: Client,
    base_url: String,
    token: String,
}

impl Monobank {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: API_BASE_URL.to_string(),
            token: config.monobank_token.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for Monobank {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, GatewayError> {
        let response = self
            .client
            .post(format!("{}/api/merchant/invoice/create", self.base_url))
            .header("X-Token", &self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;
        let invoice: Invoice = read_json(PROVIDER, response).await?;
        tracing::info!(invoice_id = %invoice.invoice_id, "invoice created");
        Ok(invoice)
    }
}
