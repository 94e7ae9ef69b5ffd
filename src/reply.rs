//! Canonical reply representation and the two channel adapters.
//!
//! Each inbound channel represents "a reply" differently: tracker
//! comments carry an issue number, emails carry an In-Reply-To token.
//! The adapters here normalize both into [`CanonicalReply`] so the
//! dispatcher only ever handles one shape. Both adapters are pure:
//! well-formed input always normalizes, malformed input always fails
//! explicitly, and non-comment tracker actions are ignored rather than
//! rejected since edits and deletions are expected, frequent traffic.

use rocket::FromForm;
use serde::Deserialize;

use crate::error::BridgeError;
use crate::extract;

/// Which way a reply is traveling across the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TrackerToEmail,
    EmailToTracker,
}

/// The channel-agnostic representation of a single reply event.
#[derive(Debug, Clone)]
pub struct CanonicalReply {
    pub direction: Direction,
    /// Source-channel identity: a tracker login or an email From value.
    pub author_handle: String,
    /// Issue title, used for email subject threading.
    pub subject_context: String,
    pub body_text: String,
    /// Outbound: the recovered contact address. Inbound: the In-Reply-To
    /// message identifier, verbatim.
    pub correlation_key: String,
    /// Known for TrackerToEmail; resolved via the correlation store for
    /// EmailToTracker.
    pub issue_number: Option<i64>,
}

/// Result of normalizing a tracker event.
#[derive(Debug)]
pub enum Normalized {
    Reply(CanonicalReply),
    /// The event was well-formed but requires no action.
    Ignored { action: String },
}

/// Tracker webhook payload. Fields are optional at the wire level so the
/// adapter can report exactly which required piece is missing.
#[derive(Debug, Deserialize)]
pub struct TrackerEvent {
    pub action: Option<String>,
    pub issue: Option<IssuePayload>,
    pub comment: Option<CommentPayload>,
}

#[derive(Debug, Deserialize)]
pub struct IssuePayload {
    pub number: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub user: Option<UserPayload>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub login: Option<String>,
}

/// Email webhook form fields, named as the provider posts them.
#[derive(Debug, FromForm)]
pub struct EmailWebhook {
    #[field(name = "stripped-html")]
    pub stripped_html: Option<String>,
    #[field(name = "From")]
    pub from: Option<String>,
    #[field(name = "In-Reply-To")]
    pub in_reply_to: Option<String>,
}

fn require<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, BridgeError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BridgeError::MalformedSource(format!(
            "tracker event missing {what}"
        ))),
    }
}

/// Normalize a tracker comment event into a canonical reply.
///
/// Any action other than `created` yields [`Normalized::Ignored`]. The
/// correlation key is the contact address recovered from the issue body.
pub fn from_tracker_event(event: &TrackerEvent) -> Result<Normalized, BridgeError> {
    let action = require(&event.action, "action")?;
    if action != "created" {
        return Ok(Normalized::Ignored {
            action: action.to_string(),
        });
    }

    let issue = event
        .issue
        .as_ref()
        .ok_or_else(|| BridgeError::MalformedSource("tracker event missing issue".into()))?;
    let comment = event
        .comment
        .as_ref()
        .ok_or_else(|| BridgeError::MalformedSource("tracker event missing comment".into()))?;

    let issue_number = issue.number.ok_or_else(|| {
        BridgeError::MalformedSource("tracker event missing issue number".into())
    })?;
    let title = require(&issue.title, "issue title")?;
    let issue_body = require(&issue.body, "issue body")?;
    let author_login = comment.user.as_ref().and_then(|u| u.login.clone());
    let author = require(&author_login, "comment author")?;
    let comment_body = require(&comment.body, "comment body")?;

    let contact_address = extract::extract_address(issue_body)?;

    Ok(Normalized::Reply(CanonicalReply {
        direction: Direction::TrackerToEmail,
        author_handle: author.to_string(),
        subject_context: title.to_string(),
        body_text: comment_body.to_string(),
        correlation_key: contact_address,
        issue_number: Some(issue_number),
    }))
}

/// Normalize an email webhook into a canonical reply.
///
/// The correlation key is the In-Reply-To value verbatim; the issue
/// number is unknown until the dispatcher consults the store.
pub fn from_email_event(form: &EmailWebhook) -> Result<CanonicalReply, BridgeError> {
    let missing = |what: &str| BridgeError::MalformedSource(format!("email event missing {what}"));

    let body = match form.stripped_html.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => return Err(missing("stripped-html")),
    };
    let from = match form.from.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => return Err(missing("From")),
    };
    let in_reply_to = match form.in_reply_to.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => return Err(missing("In-Reply-To")),
    };

    Ok(CanonicalReply {
        direction: Direction::EmailToTracker,
        author_handle: from.to_string(),
        subject_context: String::new(),
        body_text: body.to_string(),
        correlation_key: in_reply_to.to_string(),
        issue_number: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_body(address: &str) -> String {
        format!("Report.\n<a href=\"mailto:'{address}'\">'{address}'</a>")
    }

    fn comment_created(address: &str) -> TrackerEvent {
        TrackerEvent {
            action: Some("created".to_string()),
            issue: Some(IssuePayload {
                number: Some(7),
                title: Some("Bug".to_string()),
                body: Some(contact_body(address)),
            }),
            comment: Some(CommentPayload {
                user: Some(UserPayload {
                    login: Some("alice".to_string()),
                }),
                body: Some("Looking into it".to_string()),
            }),
        }
    }

    #[test]
    fn created_comment_normalizes_to_outbound_reply() {
        let normalized = from_tracker_event(&comment_created("a@x.org")).unwrap();
        let reply = match normalized {
            Normalized::Reply(reply) => reply,
            Normalized::Ignored { action } => panic!("unexpected ignore of {action}"),
        };

        assert_eq!(reply.direction, Direction::TrackerToEmail);
        assert_eq!(reply.author_handle, "alice");
        assert_eq!(reply.subject_context, "Bug");
        assert_eq!(reply.body_text, "Looking into it");
        assert_eq!(reply.correlation_key, "a@x.org");
        assert_eq!(reply.issue_number, Some(7));
    }

    #[test]
    fn non_created_action_is_ignored_not_rejected() {
        let mut event = comment_created("a@x.org");
        event.action = Some("edited".to_string());

        match from_tracker_event(&event).unwrap() {
            Normalized::Ignored { action } => assert_eq!(action, "edited"),
            Normalized::Reply(_) => panic!("edited action must be ignored"),
        }
    }

    #[test]
    fn missing_comment_author_is_malformed() {
        let mut event = comment_created("a@x.org");
        event.comment.as_mut().unwrap().user = None;

        let err = from_tracker_event(&event).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedSource(_)));
    }

    #[test]
    fn issue_body_without_contact_block_is_malformed() {
        let mut event = comment_created("a@x.org");
        event.issue.as_mut().unwrap().body = Some("no contact block".to_string());

        let err = from_tracker_event(&event).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedSource(_)));
    }

    #[test]
    fn email_event_normalizes_with_verbatim_correlation_key() {
        let form = EmailWebhook {
            stripped_html: Some("Thanks, fixed!".to_string()),
            from: Some("a@x.org".to_string()),
            in_reply_to: Some("<m-100@mail.example>".to_string()),
        };

        let reply = from_email_event(&form).unwrap();
        assert_eq!(reply.direction, Direction::EmailToTracker);
        assert_eq!(reply.author_handle, "a@x.org");
        assert_eq!(reply.correlation_key, "<m-100@mail.example>");
        assert_eq!(reply.issue_number, None);
    }

    #[test]
    fn email_event_with_missing_or_empty_field_is_malformed() {
        let form = EmailWebhook {
            stripped_html: Some("body".to_string()),
            from: Some(String::new()),
            in_reply_to: Some("m-100".to_string()),
        };
        assert!(matches!(
            from_email_event(&form).unwrap_err(),
            BridgeError::MalformedSource(_)
        ));

        let form = EmailWebhook {
            stripped_html: Some("body".to_string()),
            from: Some("a@x.org".to_string()),
            in_reply_to: None,
        };
        assert!(matches!(
            from_email_event(&form).unwrap_err(),
            BridgeError::MalformedSource(_)
        ));
    }
}
