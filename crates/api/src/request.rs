use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Per-call knobs that sit on top of the connection context.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds the pair only when a value is present.
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Like [`Self::header`] for names and values given as text, in any case.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
        Ok(self.header(name, value))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Copy with every query pair named `key` replaced by `value`.
    pub(crate) fn with_query_replaced(&self, key: &str, value: impl ToString) -> Self {
        let mut next = self.clone();
        next.query.retain(|(k, _)| k != key);
        next.query.push((key.to_string(), value.to_string()));
        next
    }
}

/// Request body. Multipart and raw payloads are streamed as-is and never
/// pass through JSON serialization.
pub enum Payload {
    Empty,
    Json(Value),
    Multipart(Form),
    Bytes {
        data: Vec<u8>,
        content_type: &'static str,
    },
}

impl Payload {
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self> {
        Ok(Payload::Json(serde_json::to_value(body)?))
    }

    /// Short loggable description of the body.
    pub(crate) fn preview(&self) -> String {
        match self {
            Payload::Empty => String::new(),
            Payload::Json(value) => {
                let text = value.to_string();
                if text.len() > 512 {
                    let cut = (0..=512).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
                    format!("{}...", &text[..cut])
                } else {
                    text
                }
            }
            Payload::Multipart(_) => "<multipart>".to_string(),
            Payload::Bytes { data, content_type } => format!("<{} bytes {content_type}>", data.len()),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

/// A successful (non 4xx/5xx) response, body fully read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_no_content(&self) -> bool {
        self.status == StatusCode::NO_CONTENT || self.body.iter().all(u8::is_ascii_whitespace)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.clone())
            .map_err(|e| ApiError::Decode(format!("response is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_builder() {
        let opts = RequestOptions::new()
            .query("start", 0)
            .query_opt("expand", Some("body.storage"))
            .query_opt::<&str>("status", None)
            .header(
                HeaderName::from_static("x-atlassian-token"),
                HeaderValue::from_static("no-check"),
            )
            .timeout(Duration::from_secs(5));

        assert_eq!(
            opts.query,
            vec![
                ("start".to_string(), "0".to_string()),
                ("expand".to_string(), "body.storage".to_string()),
            ]
        );
        assert_eq!(opts.headers["x-atlassian-token"], "no-check");
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_try_header_accepts_mixed_case() {
        let opts = RequestOptions::new()
            .try_header("X-ExperimentalApi", "opt-in")
            .unwrap();
        assert_eq!(opts.headers["x-experimentalapi"], "opt-in");

        let err = RequestOptions::new()
            .try_header("bad header", "x")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader(_)));

        let err = RequestOptions::new()
            .try_header("x-token", "line\nbreak")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader(_)));
    }

    #[test]
    fn test_with_query_replaced() {
        let opts = RequestOptions::new().query("limit", 25).query("start", 0);
        let next = opts.with_query_replaced("start", 25);
        assert_eq!(
            next.query,
            vec![
                ("limit".to_string(), "25".to_string()),
                ("start".to_string(), "25".to_string()),
            ]
        );
        assert_eq!(opts.query.len(), 2);
    }

    #[test]
    fn test_payload_preview_truncates() {
        let long = "x".repeat(2000);
        let preview = Payload::Json(json!({ "body": long })).preview();
        assert!(preview.len() < 600);
        assert!(preview.ends_with("..."));
        assert_eq!(Payload::Empty.preview(), "");
    }

    #[test]
    fn test_no_content_detection() {
        let raw = RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: b"  \n".to_vec(),
        };
        assert!(raw.is_no_content());

        let raw = RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: b"{}".to_vec(),
        };
        assert!(!raw.is_no_content());
    }
}
