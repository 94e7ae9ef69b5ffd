//! Inbound webhook for issue-tracker comment events.

use std::sync::Arc;

use rocket::http::Status;
use rocket::post;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::State;

use super::MessageResponse;
use crate::dispatch::{BridgeDispatcher, DispatchOutcome};
use crate::error::BridgeError;
use crate::reply::TrackerEvent;

/// Event kind taken from the `X-GitHub-Event` header. Also verifies the
/// delivery is JSON; non-JSON payloads and requests without the header
/// never reach the handler.
pub struct TrackerEventKind(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TrackerEventKind {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if !request.content_type().map_or(false, |ct| ct.is_json()) {
            return Outcome::Error((Status::NotAcceptable, ()));
        }
        match request.headers().get_one("X-GitHub-Event") {
            Some(kind) => Outcome::Success(TrackerEventKind(kind.to_string())),
            None => Outcome::Error((Status::BadRequest, ())),
        }
    }
}

/// Accept a tracker webhook delivery.
///
/// `ping` deliveries are acknowledged without processing; any kind other
/// than `issue_comment` is rejected before the core runs. Edit/delete
/// comment actions are acknowledged as ignored by the dispatcher.
#[post("/webhooks/tracker", data = "<event>")]
pub async fn tracker_webhook(
    kind: TrackerEventKind,
    event: Json<TrackerEvent>,
    dispatcher: &State<Arc<BridgeDispatcher>>,
) -> Result<Json<MessageResponse>, BridgeError> {
    if kind.0 == "ping" {
        log::info!("tracker pinged us");
        return Ok(Json(MessageResponse::new("pong")));
    }

    if kind.0 != "issue_comment" {
        return Err(BridgeError::MalformedSource(format!(
            "unsupported event type: {}",
            kind.0
        )));
    }

    let outcome = dispatcher.dispatch_tracker_event(&event).await?;
    let message = match outcome {
        DispatchOutcome::Ignored { action } => format!("ignored action {action}"),
        DispatchOutcome::Delivered => "comment forwarded as email".to_string(),
        DispatchOutcome::DryRun => "dry-run, delivery suppressed".to_string(),
    };

    Ok(Json(MessageResponse::new(message)))
}
