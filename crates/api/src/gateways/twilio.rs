use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{read_json, GatewayError, OtpCheck, OtpGateway};
use crate::config::ProviderConfig;

const PROVIDER: &str = "twilio";
const VERIFY_BASE_URL: &str = "https://verify.twilio.com/v2";

/// Twilio Verify: the provider generates, sends and checks the codes.
pub struct TwilioVerify {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    service_sid: String,
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    status: String,
}

impl TwilioVerify {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: VERIFY_BASE_URL.to_string(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            service_sid: config.twilio_verify_service_sid.clone(),
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/Services/{}/{resource}", self.base_url, self.service_sid)
    }
}

#[async_trait]
impl OtpGateway for TwilioVerify {
    async fn send_code(&self, phone: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.url("Verifications"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone), ("Channel", "sms")])
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;
        let verification: VerificationResponse = read_json(PROVIDER, response).await?;
        tracing::info!(status = %verification.status, "otp verification started");
        Ok(verification.status)
    }

    async fn check_code(&self, phone: &str, code: &str) -> Result<OtpCheck, GatewayError> {
        let response = self
            .client
            .post(self.url("VerificationCheck"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone), ("Code", code)])
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;
        // Twilio answers 404 once a verification is expired, used up or never started.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(OtpCheck::Rejected);
        }
        let check: VerificationResponse = read_json(PROVIDER, response).await?;
        Ok(if check.status == "approved" {
            OtpCheck::Approved
        } else {
            OtpCheck::Rejected
        })
    }
}
