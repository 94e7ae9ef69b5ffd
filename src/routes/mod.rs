//! HTTP surface: the two webhook endpoints plus health and admin
//! diagnostics.

pub mod admin;
pub mod email;
pub mod health;
pub mod tracker;

use serde::{Deserialize, Serialize};

/// Simple message wrapper for acknowledgement responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Response text.
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
