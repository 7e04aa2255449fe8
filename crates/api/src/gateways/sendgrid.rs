use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{GatewayError, Mailer};
use crate::config::ProviderConfig;

const PROVIDER: &str = "sendgrid";
const SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub struct SendGrid {
    client: Client,
    url: String,
    api_key: String,
    from: String,
}

impl SendGrid {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            url: SEND_URL.to_string(),
            api_key: config.sendgrid_api_key.clone(),
            from: config.email_from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for SendGrid {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "personalizations": [{ "to": [{ "email": to }] }],
                "from": { "email": self.from },
                "subject": subject,
                "content": [{ "type": "text/plain", "value": body }],
            }))
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(GatewayError::from_response(PROVIDER, response).await);
        }
        Ok(())
    }
}
