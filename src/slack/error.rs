use thiserror::Error;

/// Sum type representing every way a single Slack call can fail.
///
/// Whether any of these is fatal depends on the step that produced it; see
/// [crate::error::Failure].
#[derive(Debug, Error)]
pub enum SlackError {
    /// Connection failures and timeouts.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("returned non-JSON response")]
    Malformed,
    /// Slack said `"ok": false`. The raw payload is kept for diagnosis.
    #[error("Slack API error: {payload}")]
    Api { error: String, payload: String },
    /// Valid JSON claiming success, but not in the shape we need.
    #[error("unexpected response: {payload}")]
    Protocol { payload: String },
}

impl SlackError {
    /// The error code Slack returned, if it returned one.
    pub fn api_error(&self) -> Option<&str> {
        match self {
            SlackError::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_surfaces_raw_payload() {
        let e = SlackError::Api {
            error: "invalid_auth".into(),
            payload: r#"{"ok":false,"error":"invalid_auth"}"#.into(),
        };

        assert_eq!(
            e.to_string(),
            r#"Slack API error: {"ok":false,"error":"invalid_auth"}"#
        );
        assert_eq!(e.api_error(), Some("invalid_auth"));
    }

    #[test]
    fn test_display_status() {
        let e = SlackError::Status {
            status: 500,
            body: "oops".into(),
        };

        assert_eq!(e.to_string(), "HTTP 500: oops");
        assert_eq!(e.api_error(), None);
    }
}
