//! Outbound capability interfaces and their real implementations.
//!
//! The dispatcher only ever talks to these traits; the concrete reqwest
//! clients live in `github` and `mailgun`, and tests inject recording or
//! stub doubles instead.

pub mod github;
pub mod mailgun;

pub use github::GitHubClient;
pub use mailgun::MailgunClient;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors from the external identity, email and tracker providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {status}: {body}")]
    Service { status: StatusCode, body: String },
    #[error("failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("provider response missing {0}")]
    MissingField(&'static str),
}

/// Resolves an external user handle to a human display name.
#[rocket::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn display_name(&self, handle: &str) -> Result<String, ProviderError>;
}

/// Delivers an outbound email, returning the provider's message id.
#[rocket::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        from: &str,
        subject: &str,
        body: &str,
        to: &str,
    ) -> Result<String, ProviderError>;
}

/// Appends a comment to a tracked issue.
#[rocket::async_trait]
pub trait TrackerClient: Send + Sync {
    async fn create_comment(&self, issue_number: i64, body: &str) -> Result<(), ProviderError>;
}
