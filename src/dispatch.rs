//! Bridge dispatcher: consumes canonical replies and drives delivery.
//!
//! One inbound event runs the state machine to a single terminal state:
//! ignored, delivered, suppressed by dry-run, or failed with a
//! request-scoped error. Failures are reported to the upstream webhook
//! sender, whose own retry policy is the only retry in the system.

use std::sync::Arc;

use crate::error::BridgeError;
use crate::identity::IdentityResolver;
use crate::providers::{EmailSender, TrackerClient};
use crate::reply::{self, CanonicalReply, EmailWebhook, Normalized, TrackerEvent};
use crate::store::{CorrelationStore, StoreError};

/// Terminal state of one dispatched event.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Well-formed event that requires no action (edits, deletions).
    Ignored { action: String },
    /// Delivered to the other channel.
    Delivered,
    /// Dry-run: full processing, side effects suppressed.
    DryRun,
}

/// Wires the correlation store, identity resolver and outbound channels
/// together. One instance is shared by all in-flight webhook handlers.
pub struct BridgeDispatcher {
    identity: IdentityResolver,
    store: Arc<CorrelationStore>,
    email: Arc<dyn EmailSender>,
    tracker: Arc<dyn TrackerClient>,
    sender_address: String,
    dry_run: bool,
}

impl BridgeDispatcher {
    pub fn new(
        identity: IdentityResolver,
        store: Arc<CorrelationStore>,
        email: Arc<dyn EmailSender>,
        tracker: Arc<dyn TrackerClient>,
        sender_address: String,
        dry_run: bool,
    ) -> Self {
        Self {
            identity,
            store,
            email,
            tracker,
            sender_address,
            dry_run,
        }
    }

    /// Handle a tracker comment event: normalize, resolve the author's
    /// display name, email the issue's contact address and record the
    /// outbound correlation.
    pub async fn dispatch_tracker_event(
        &self,
        event: &TrackerEvent,
    ) -> Result<DispatchOutcome, BridgeError> {
        match reply::from_tracker_event(event)? {
            Normalized::Ignored { action } => {
                log::info!("ignoring tracker action {:?}, no delivery needed", action);
                Ok(DispatchOutcome::Ignored { action })
            }
            Normalized::Reply(reply) => self.deliver_email(reply).await,
        }
    }

    /// Handle an email reply: normalize, attribute it to an issue via
    /// the correlation store and append the comment.
    pub async fn dispatch_email_event(
        &self,
        form: &EmailWebhook,
    ) -> Result<DispatchOutcome, BridgeError> {
        let reply = reply::from_email_event(form)?;
        self.deliver_comment(reply).await
    }

    async fn deliver_email(&self, reply: CanonicalReply) -> Result<DispatchOutcome, BridgeError> {
        let issue_number = reply.issue_number.ok_or_else(|| {
            BridgeError::MalformedSource("tracker reply carries no issue number".into())
        })?;

        // Resolved even under dry-run: identity lookups are reads.
        let display_name = self.identity.resolve(&reply.author_handle).await?;

        log::info!(
            "forwarding comment on issue #{} by {} to {} (dry_run={})",
            issue_number,
            reply.author_handle,
            reply.correlation_key,
            self.dry_run
        );

        if self.dry_run {
            return Ok(DispatchOutcome::DryRun);
        }

        let from = format!("{} <{}>", display_name, self.sender_address);
        let subject = format!("Re: {}", reply.subject_context);
        let message_id = self
            .email
            .send(&from, &subject, &reply.body_text, &reply.correlation_key)
            .await?;

        match self.store.put(&message_id, issue_number) {
            Ok(()) => {}
            Err(StoreError::DuplicateKey(key)) => {
                // Upstream redelivery: the correlation already exists,
                // so the delivery is idempotent end-to-end.
                log::warn!("correlation {} already recorded, treating as delivered", key);
            }
            Err(err) => return Err(err.into()),
        }

        Ok(DispatchOutcome::Delivered)
    }

    async fn deliver_comment(&self, reply: CanonicalReply) -> Result<DispatchOutcome, BridgeError> {
        let issue_number = self
            .store
            .get(&reply.correlation_key)
            .ok_or_else(|| BridgeError::Unattributable(reply.correlation_key.clone()))?;

        log::info!(
            "forwarding email reply from {} to issue #{} (dry_run={})",
            reply.author_handle,
            issue_number,
            self.dry_run
        );

        if self.dry_run {
            return Ok(DispatchOutcome::DryRun);
        }

        let body = format!("{} wrote:\n\n{}", reply.author_handle, reply.body_text);
        self.tracker.create_comment(issue_number, &body).await?;

        Ok(DispatchOutcome::Delivered)
    }
}
