//! Request-scoped error taxonomy and its HTTP response mapping.
//!
//! Every failure is bounded to the request that triggered it: a bad
//! webhook payload, an unattributable reply or a provider outage is
//! reported to the caller and never takes the service down. The bridge
//! performs no internal retry; upstream webhook senders retry per their
//! own policy on server-error responses.

use std::io::Cursor;

use rocket::catch;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{Request, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::ExtractError;
use crate::providers::ProviderError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Missing or malformed fields in the inbound event.
    #[error("malformed source: {0}")]
    MalformedSource(String),
    /// The correlation key of an email reply is unknown, so the reply
    /// cannot be attributed to an issue.
    #[error("unknown correlation key: {0}")]
    Unattributable(String),
    /// An identity, email or tracker API call failed.
    #[error("upstream provider error: {0}")]
    Provider(#[from] ProviderError),
    /// Persistence failed while recording a correlation.
    #[error("correlation store error: {0}")]
    Store(StoreError),
}

impl BridgeError {
    pub fn status(&self) -> Status {
        match self {
            BridgeError::MalformedSource(_) => Status::BadRequest,
            BridgeError::Unattributable(_) => Status::NotFound,
            BridgeError::Provider(_) => Status::BadGateway,
            BridgeError::Store(_) => Status::InternalServerError,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            BridgeError::MalformedSource(_) => "MalformedSource",
            BridgeError::Unattributable(_) => "NotFound",
            BridgeError::Provider(_) => "UpstreamProvider",
            BridgeError::Store(_) => "Store",
        }
    }
}

impl From<ExtractError> for BridgeError {
    fn from(err: ExtractError) -> Self {
        BridgeError::MalformedSource(err.to_string())
    }
}

impl From<StoreError> for BridgeError {
    fn from(err: StoreError) -> Self {
        BridgeError::Store(err)
    }
}

/// Error payload shared by [`BridgeError`] responses and the default
/// catcher, so every failure leaves the service in the same JSON shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Catches failures that never reach a handler, such as guard
/// rejections and unmatched routes, and answers in the same envelope
/// as [`BridgeError`].
#[catch(default)]
pub fn default_catcher(status: Status, request: &Request) -> Custom<Json<ErrorResponse>> {
    Custom(
        status,
        Json(ErrorResponse {
            error: status.reason_lossy().to_string(),
            message: format!("{} {}", request.method(), request.uri()),
        }),
    )
}

impl<'r> Responder<'r, 'static> for BridgeError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let message = self.to_string();

        match &self {
            BridgeError::MalformedSource(msg) => log::debug!("malformed source: {}", msg),
            BridgeError::Unattributable(key) => {
                log::warn!("unattributable reply, correlation key {} unknown", key)
            }
            BridgeError::Provider(err) => log::error!("provider error: {}", err),
            BridgeError::Store(err) => log::error!("store error: {}", err),
        }

        let error_response = ErrorResponse {
            error: self.kind().to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            BridgeError::MalformedSource("x".into()).status(),
            Status::BadRequest
        );
        assert_eq!(
            BridgeError::Unattributable("m-1".into()).status(),
            Status::NotFound
        );
        assert_eq!(
            BridgeError::Provider(ProviderError::MissingField("id")).status(),
            Status::BadGateway
        );
        assert_eq!(
            BridgeError::Store(StoreError::DuplicateKey("m-1".into())).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn extract_errors_become_malformed_source() {
        let err: BridgeError = ExtractError::MissingMarker.into();
        assert!(matches!(err, BridgeError::MalformedSource(_)));
    }
}
