//! GitHub API client: identity lookups and issue comments.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{IdentityProvider, ProviderError, TrackerClient};
use crate::config::BridgeConfig;

const API_BASE: &str = "https://api.github.com";

/// Thin client for the two GitHub operations the bridge needs:
/// `GET /users/{handle}` and `POST /repos/{o}/{r}/issues/{n}/comments`.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    repo_owner: String,
    repo_name: String,
    base_url: String,
}

impl GitHubClient {
    pub fn new(config: &BridgeConfig) -> Result<Self, ProviderError> {
        let (owner, name) = config
            .tracker_repo_parts()
            .ok_or(ProviderError::MissingField("tracker repository (owner/name)"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("bridge-server/0.1")
            .build()
            .map_err(ProviderError::Http)?;

        Ok(Self {
            http,
            token: config.tracker_token.clone(),
            repo_owner: owner.to_string(),
            repo_name: name.to_string(),
            base_url: API_BASE.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.token)
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[rocket::async_trait]
impl IdentityProvider for GitHubClient {
    async fn display_name(&self, handle: &str) -> Result<String, ProviderError> {
        let url = format!("{}/users/{handle}", self.base_url);
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(ProviderError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Service { status, body });
        }

        let body = response.bytes().await.map_err(ProviderError::Http)?;
        let user: UserResponse = serde_json::from_slice(&body)?;

        // Accounts without a profile name fall back to the login handle.
        Ok(user.name.unwrap_or(user.login))
    }
}

#[rocket::async_trait]
impl TrackerClient for GitHubClient {
    async fn create_comment(&self, issue_number: i64, body: &str) -> Result<(), ProviderError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{issue_number}/comments",
            self.base_url, self.repo_owner, self.repo_name
        );
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .json(&CommentRequest { body })
            .send()
            .await
            .map_err(ProviderError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Service { status, body });
        }

        Ok(())
    }
}
