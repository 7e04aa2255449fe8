use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{read_json, GatewayError, MarketGateway, ProxiedResponse};

const BINANCE_P2P_URL: &str = "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search";
const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Binance P2P search and CoinGecko coin lookup, both unauthenticated.
pub struct MarketProxy {
    client: Client,
    binance_url: String,
    coingecko_base: String,
}

#[derive(Debug, Deserialize)]
struct CoinSearch {
    #[serde(default)]
    coins: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct Coin {
    thumb: Option<String>,
}

impl MarketProxy {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            binance_url: BINANCE_P2P_URL.to_string(),
            coingecko_base: COINGECKO_API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl MarketGateway for MarketProxy {
    async fn binance_p2p(&self, body: &Value) -> Result<ProxiedResponse, GatewayError> {
        let response = self
            .client
            .post(&self.binance_url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::transport("binance", e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::transport("binance", e))?;
        Ok(ProxiedResponse {
            status,
            body: body.to_vec(),
        })
    }

    async fn coin_icon(&self, symbol: &str) -> Result<Option<String>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/search", self.coingecko_base))
            .query(&[("query", symbol)])
            .send()
            .await
            .map_err(|e| GatewayError::transport("coingecko", e))?;
        let search: CoinSearch = read_json("coingecko", response).await?;
        Ok(search.coins.into_iter().next().and_then(|coin| coin.thumb))
    }
}
