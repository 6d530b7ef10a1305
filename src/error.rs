use thiserror::Error;

/// stands in for the server message when a non-2xx body carries none.
pub const GENERIC_STATUS_ERROR: &str = "Failed to get response.";

/// failure of a single chat round-trip.
///
/// none of these are propagated past the chat widget: they are turned into
/// the text of the bot bubble via [`RequestError::user_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// the request never produced a response (offline, dns, cors, ...).
    #[error("network error: {0}")]
    Network(String),
    /// the server answered with a non-2xx status.
    #[error("http {status}: {}", .message.as_deref().unwrap_or(GENERIC_STATUS_ERROR))]
    Status { status: u16, message: Option<String> },
    /// the body was not the json envelope we expect.
    #[error("malformed response body: {0}")]
    Body(String),
    /// 2xx with neither a `response` nor an `error` field.
    #[error("response body carried no reply")]
    MissingReply,
}

impl RequestError {
    /// the server supplied error string, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message: Some(m), .. } if !m.trim().is_empty() => Some(m),
            _ => None,
        }
    }

    /// text shown to the user in place of the reply.
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.server_message().unwrap_or(fallback)
    }
}

/// failure to read the page configuration handed in by the host page.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "Unable to respond right now. Please try again.";

    #[test]
    fn status_with_server_message_surfaces_it() {
        let err = RequestError::Status { status: 400, message: Some("bad input".into()) };
        assert_eq!(err.user_message(FALLBACK), "bad input");
    }

    #[test]
    fn other_failures_use_fallback() {
        let cases = [
            RequestError::Network("offline".into()),
            RequestError::Status { status: 500, message: None },
            RequestError::Status { status: 500, message: Some("   ".into()) },
            RequestError::Body("eof".into()),
            RequestError::MissingReply,
        ];
        for err in cases {
            assert_eq!(err.user_message(FALLBACK), FALLBACK, "{err}");
        }
    }

    #[test]
    fn display_mentions_status() {
        let err = RequestError::Status { status: 403, message: Some("No active session.".into()) };
        assert_eq!(err.to_string(), "http 403: No active session.");
    }
}
