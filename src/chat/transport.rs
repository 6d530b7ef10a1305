//! the one http round-trip behind the chat widget.
//!
//! wire format:
//! - request:  `POST {endpoint}` with `{"user_input": "<text>"}`
//! - response: `{"response": <reply>}` on success, `{"error": "<msg>"}` otherwise.
//!   a non-string reply is shown as its json text.
//!
//! on wasm the request goes through `gloo-net` (browser fetch); on native
//! through a blocking `ureq` agent run on tokio's blocking pool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

#[derive(Debug, Serialize)]
pub struct ChatRequestBody<'a> {
    pub user_input: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatResponseBody {
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponseBody {
    /// the reply as display text; `null` counts as missing.
    pub fn reply_text(self) -> Option<String> {
        match self.response? {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }
}

/// body of a successful `end_chat` call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct EndChat {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// turns a status + raw body into the reply or a typed error.
pub fn interpret_reply(status: u16, body: &str) -> Result<String, RequestError> {
    let parsed: Result<ChatResponseBody, _> = serde_json::from_str(body);
    if !(200..300).contains(&status) {
        // a non-2xx with an unreadable body still counts as a status failure
        let message = parsed.ok().and_then(|b| b.error);
        return Err(RequestError::Status { status, message });
    }
    let parsed = parsed.map_err(|e| RequestError::Body(e.to_string()))?;
    parsed.reply_text().ok_or(RequestError::MissingReply)
}

pub fn interpret_end_chat(status: u16, body: &str) -> Result<EndChat, RequestError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body).ok().and_then(|b| b.error);
        return Err(RequestError::Status { status, message });
    }
    serde_json::from_str(body).map_err(|e| RequestError::Body(e.to_string()))
}

/// something that can carry a chat message to the server.
#[async_trait(?Send)]
pub trait ChatTransport {
    async fn send(&self, message: &str) -> Result<String, RequestError>;
    async fn end_chat(&self) -> Result<EndChat, RequestError>;
}

#[cfg(target_arch = "wasm32")]
pub use web::FetchTransport;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::*;
    use gloo_net::http::Request;

    /// browser `fetch` transport (relative urls resolve against the page).
    #[derive(Clone, Debug)]
    pub struct FetchTransport {
        pub endpoint: String,
        pub end_chat_endpoint: String,
    }

    impl FetchTransport {
        pub fn from_config(cfg: &crate::config::ChatConfig) -> Self {
            Self {
                endpoint: cfg.endpoint.clone(),
                end_chat_endpoint: cfg.end_chat_endpoint.clone(),
            }
        }
    }

    fn net(err: gloo_net::Error) -> RequestError {
        RequestError::Network(err.to_string())
    }

    #[async_trait(?Send)]
    impl ChatTransport for FetchTransport {
        async fn send(&self, message: &str) -> Result<String, RequestError> {
            // `.json()` also sets `Content-Type: application/json`
            let resp = Request::post(&self.endpoint)
                .json(&ChatRequestBody { user_input: message })
                .map_err(|e| RequestError::Body(e.to_string()))?
                .send()
                .await
                .map_err(net)?;
            let status = resp.status();
            let body = resp.text().await.map_err(net)?;
            interpret_reply(status, &body)
        }

        async fn end_chat(&self) -> Result<EndChat, RequestError> {
            let resp = Request::post(&self.end_chat_endpoint).send().await.map_err(net)?;
            let status = resp.status();
            let body = resp.text().await.map_err(net)?;
            interpret_end_chat(status, &body)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::HttpTransport;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::*;
    use tracing::debug;
    use ureq::Agent;

    /// blocking `ureq` transport, offloaded to tokio's blocking pool.
    /// requires a tokio runtime.
    #[derive(Clone)]
    pub struct HttpTransport {
        agent: Agent,
        base_url: String,
        endpoint: String,
        end_chat_endpoint: String,
    }

    impl HttpTransport {
        pub fn new(base_url: impl Into<String>, cfg: &crate::config::ChatConfig) -> Self {
            // read error bodies ourselves instead of getting `Error::StatusCode`
            let agent: Agent = Agent::config_builder().http_status_as_error(false).build().into();
            Self {
                agent,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                endpoint: cfg.endpoint.clone(),
                end_chat_endpoint: cfg.end_chat_endpoint.clone(),
            }
        }

        pub fn url(&self, path: &str) -> String {
            if path.starts_with("http://") || path.starts_with("https://") {
                path.to_string()
            } else {
                format!("{}/{}", self.base_url, path.trim_start_matches('/'))
            }
        }

        async fn post(&self, path: &str, body: Option<serde_json::Value>) -> Result<(u16, String), RequestError> {
            let agent = self.agent.clone();
            let url = self.url(path);
            debug!(target: "calmpage", "POST {}", url);
            tokio::task::spawn_blocking(move || {
                let req = agent.post(&url);
                let resp = match body {
                    Some(json) => req.send_json(&json),
                    None => req.send_empty(),
                };
                let mut resp = resp.map_err(|e| RequestError::Network(e.to_string()))?;
                let status = resp.status().as_u16();
                let text = resp
                    .body_mut()
                    .read_to_string()
                    .map_err(|e| RequestError::Body(e.to_string()))?;
                Ok((status, text))
            })
            .await
            .map_err(|e| RequestError::Network(e.to_string()))?
        }
    }

    #[async_trait(?Send)]
    impl ChatTransport for HttpTransport {
        async fn send(&self, message: &str) -> Result<String, RequestError> {
            let body = serde_json::to_value(ChatRequestBody { user_input: message })
                .map_err(|e| RequestError::Body(e.to_string()))?;
            let (status, text) = self.post(&self.endpoint, Some(body)).await?;
            interpret_reply(status, &text)
        }

        async fn end_chat(&self) -> Result<EndChat, RequestError> {
            let (status, text) = self.post(&self.end_chat_endpoint, None).await?;
            interpret_end_chat(status, &text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_body_shape() {
        let json = serde_json::to_string(&ChatRequestBody { user_input: "hi \"there\"" }).unwrap();
        assert_eq!(json, r#"{"user_input":"hi \"there\""}"#);
    }

    #[test]
    fn ok_reply() {
        assert_eq!(interpret_reply(200, r#"{"response": "Hello"}"#), Ok("Hello".into()));
    }

    #[test]
    fn error_field_on_non_ok() {
        assert_eq!(
            interpret_reply(400, r#"{"error": "bad input"}"#),
            Err(RequestError::Status { status: 400, message: Some("bad input".into()) })
        );
    }

    #[test]
    fn non_ok_without_error_field() {
        for body in ["{}", "<html>oops</html>"] {
            let err = interpret_reply(502, body).unwrap_err();
            assert_eq!(err, RequestError::Status { status: 502, message: None });
            assert_eq!(err.to_string(), "http 502: Failed to get response.");
        }
    }

    #[test]
    fn malformed_ok_body() {
        assert!(matches!(interpret_reply(200, "not json"), Err(RequestError::Body(_))));
        assert_eq!(interpret_reply(200, r#"{"other": 1}"#), Err(RequestError::MissingReply));
    }

    #[test]
    fn non_string_reply_is_shown_as_text() {
        assert_eq!(interpret_reply(200, r#"{"response": 42}"#), Ok("42".into()));
        assert_eq!(interpret_reply(200, r#"{"response": ["a", 1]}"#), Ok(r#"["a",1]"#.into()));
        assert_eq!(interpret_reply(200, r#"{"response": null}"#), Err(RequestError::MissingReply));
    }

    #[test]
    fn end_chat_bodies() {
        let ok = interpret_end_chat(
            200,
            r#"{"message": "Chat ended and recommendation generated.", "redirect_url": "/recommendation"}"#,
        )
        .unwrap();
        assert_eq!(ok.redirect_url.as_deref(), Some("/recommendation"));

        assert_eq!(
            interpret_end_chat(403, r#"{"error": "No active session found."}"#),
            Err(RequestError::Status { status: 403, message: Some("No active session found.".into()) })
        );
    }
}
