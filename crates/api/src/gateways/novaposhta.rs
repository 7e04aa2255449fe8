use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{read_json, GatewayError, ShippingGateway};
use crate::config::ProviderConfig;

const PROVIDER: &str = "novaposhta";
const API_URL: &str = "https://api.novaposhta.ua/v2.0/json/";

/// Nova Poshta JSON API: every call is a POST naming a model and method.
pub struct NovaPoshta {
    client: Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Vec<String>,
}

impl NovaPoshta {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            url: API_URL.to_string(),
            api_key: config.nova_poshta_api_key.clone(),
        }
    }

    async fn call(&self, model: &str, method: &str, properties: Value) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "apiKey": self.api_key,
                "modelName": model,
                "calledMethod": method,
                "methodProperties": properties,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;
        let envelope: Envelope = read_json(PROVIDER, response).await?;
        if !envelope.success {
            return Err(GatewayError::new(PROVIDER, envelope.errors.join("; ")));
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl ShippingGateway for NovaPoshta {
    async fn settlements(&self, query: &str, limit: u32) -> Result<Value, GatewayError> {
        self.call(
            "Address",
            "searchSettlements",
            json!({ "CityName": query, "Limit": limit.to_string(), "Page": "1" }),
        )
        .await
    }

    async fn warehouses(&self, city_ref: &str, search: Option<&str>) -> Result<Value, GatewayError> {
        let mut properties = json!({ "SettlementRef": city_ref, "Limit": "50", "Page": "1" });
        if let Some(search) = search {
            properties["FindByString"] = json!(search);
        }
        self.call("Address", "getWarehouses", properties).await
    }
}
