use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{read_json, GatewayError, GeocodeGateway, Place};
use crate::config::ProviderConfig;

const PROVIDER: &str = "geonames";
const SEARCH_URL: &str = "http://api.geonames.org/searchJSON";

/// GeoNames search; `geonameId` is what people and areas store as `areaId`.
pub struct GeoNames {
    client: Client,
    url: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    geonames: Vec<GeoName>,
    /// Present instead of results on errors such as an unknown username.
    status: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoName {
    geoname_id: i64,
    name: String,
    admin_name1: Option<String>,
}

impl GeoNames {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            url: SEARCH_URL.to_string(),
            username: config.geonames_username.clone(),
        }
    }
}

#[async_trait]
impl GeocodeGateway for GeoNames {
    async fn search(&self, query: &str) -> Result<Vec<Place>, GatewayError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", query),
                ("country", "UA"),
                ("featureClass", "P"),
                ("maxRows", "10"),
                ("lang", "uk"),
                ("username", self.username.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;
        let body: SearchResponse = read_json(PROVIDER, response).await?;
        if let Some(status) = body.status {
            return Err(GatewayError::new(PROVIDER, status.to_string()));
        }
        Ok(body
            .geonames
            .into_iter()
            .map(|g| Place {
                area_id: g.geoname_id.to_string(),
                name: g.name,
                region: g.admin_name1.filter(|r| !r.is_empty()),
            })
            .collect())
    }
}
