//! Inbound webhook for email replies.

use std::sync::Arc;

use rocket::form::Form;
use rocket::post;
use rocket::serde::json::Json;
use rocket::State;

use super::MessageResponse;
use crate::dispatch::{BridgeDispatcher, DispatchOutcome};
use crate::error::BridgeError;
use crate::reply::EmailWebhook;

/// Accept an email-provider webhook delivery.
///
/// The form must carry `stripped-html`, `From` and `In-Reply-To`; a
/// reply whose In-Reply-To is not a recorded outbound message id is
/// unattributable and rejected.
#[post("/webhooks/email", data = "<form>")]
pub async fn email_webhook(
    form: Form<EmailWebhook>,
    dispatcher: &State<Arc<BridgeDispatcher>>,
) -> Result<Json<MessageResponse>, BridgeError> {
    let outcome = dispatcher.dispatch_email_event(&form).await?;
    let message = match outcome {
        DispatchOutcome::Delivered => "email forwarded as issue comment".to_string(),
        DispatchOutcome::DryRun => "dry-run, delivery suppressed".to_string(),
        // Email events are never ignored; normalization either yields a
        // reply or fails.
        DispatchOutcome::Ignored { action } => format!("ignored action {action}"),
    };

    Ok(Json(MessageResponse::new(message)))
}
