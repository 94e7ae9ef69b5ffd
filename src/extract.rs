//! Contact address extraction from issue bodies.
//!
//! Issues handled by the bridge are created from a single known template
//! that embeds the reporter's address in a mailto anchor:
//!
//! `<a href="mailto:'bugs@example.org'"><span>'bugs@example.org'</span></a>`
//!
//! The extractor walks that fragment delimiter by delimiter and fails
//! explicitly on each missing piece, so a malformed body can never yield
//! a wrong or empty address.

use thiserror::Error;

/// Opening marker of the templated contact block.
const MAILTO_MARKER: &str = "<a href=\"mailto:'";
/// Closing anchor tag bounding the fragment.
const ANCHOR_CLOSE: &str = "</a>";

/// Errors raised while locating the contact address in an issue body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("issue body has no mailto contact block")]
    MissingMarker,
    #[error("mailto contact block is not terminated by a closing anchor")]
    UnterminatedAnchor,
    #[error("mailto contact block has no closing quote around the address")]
    MissingQuote,
}

/// Recover the contact address from an issue body's templated mailto block.
///
/// Only the first contact block is considered; issue bodies produced from
/// the template contain exactly one. No HTML entity decoding is performed.
pub fn extract_address(body: &str) -> Result<String, ExtractError> {
    let start = body.find(MAILTO_MARKER).ok_or(ExtractError::MissingMarker)?;
    let fragment = &body[start + MAILTO_MARKER.len()..];

    let anchor_end = fragment
        .find(ANCHOR_CLOSE)
        .ok_or(ExtractError::UnterminatedAnchor)?;
    let inner = &fragment[..anchor_end];

    let quote = inner.find('\'').ok_or(ExtractError::MissingQuote)?;
    Ok(inner[..quote].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_templated_address() {
        let body = "Reported via the form.\n\
            <a href=\"mailto:'bugs@example.org'\">\
            <span style=\"font-family: monospace;\">'bugs@example.org'</span></a>\n\
            More text.";
        assert_eq!(extract_address(body).unwrap(), "bugs@example.org");
    }

    #[test]
    fn first_contact_block_wins() {
        let body = "<a href=\"mailto:'first@x.org'\">'first@x.org'</a>\
            <a href=\"mailto:'second@x.org'\">'second@x.org'</a>";
        assert_eq!(extract_address(body).unwrap(), "first@x.org");
    }

    #[test]
    fn missing_marker_is_an_error() {
        assert_eq!(
            extract_address("no contact block here"),
            Err(ExtractError::MissingMarker)
        );
    }

    #[test]
    fn unterminated_anchor_is_an_error() {
        assert_eq!(
            extract_address("<a href=\"mailto:'bugs@example.org'\">'bugs@example.org'"),
            Err(ExtractError::UnterminatedAnchor)
        );
    }

    #[test]
    fn missing_inner_quote_is_an_error() {
        assert_eq!(
            extract_address("<a href=\"mailto:'bugs@example.org</a>"),
            Err(ExtractError::MissingQuote)
        );
    }

    #[test]
    fn empty_body_is_an_error() {
        assert_eq!(extract_address(""), Err(ExtractError::MissingMarker));
    }
}
