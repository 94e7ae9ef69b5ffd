//! Mailgun API client for outbound email delivery.

use std::time::Duration;

use serde::Deserialize;

use super::{EmailSender, ProviderError};
use crate::config::BridgeConfig;

const API_BASE: &str = "https://api.mailgun.net/v3";

/// Client for `POST /v3/{domain}/messages`.
#[derive(Clone)]
pub struct MailgunClient {
    http: reqwest::Client,
    domain: String,
    api_key: String,
    base_url: String,
}

impl MailgunClient {
    pub fn new(config: &BridgeConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("bridge-server/0.1")
            .build()
            .map_err(ProviderError::Http)?;

        Ok(Self {
            http,
            domain: config.mail_domain.clone(),
            api_key: config.mail_api_key.clone(),
            base_url: API_BASE.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
    #[allow(dead_code)]
    message: Option<String>,
}

#[rocket::async_trait]
impl EmailSender for MailgunClient {
    async fn send(
        &self,
        from: &str,
        subject: &str,
        body: &str,
        to: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/{}/messages", self.base_url, self.domain);
        let form = [
            ("from", from),
            ("to", to),
            ("subject", subject),
            ("text", body),
        ];

        let response = self
            .http
            .post(url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(ProviderError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Service { status, body });
        }

        let bytes = response.bytes().await.map_err(ProviderError::Http)?;
        let parsed: SendResponse = serde_json::from_slice(&bytes)?;

        parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or(ProviderError::MissingField("outbound message id"))
    }
}
