use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::resource::DeploymentMode;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unauthorized (401) at {url}")]
    Unauthorized { url: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("{feature} is not supported on {mode}")]
    NotSupported {
        feature: String,
        mode: DeploymentMode,
    },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::RequestFailed(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { .. } => {
                Some("Verify the username and API token configured for this profile")
            }
            ApiError::Http { status: 403, .. } => {
                Some("The credentials are valid but lack permission for this resource")
            }
            ApiError::Http { status: 404, .. } => Some("Check if the resource ID is correct"),
            ApiError::Http { status: 400, .. } => Some("Review the request parameters"),
            ApiError::RequestFailed(err) if err.is_timeout() => {
                Some("Check your network connection or raise the client timeout")
            }
            ApiError::NotSupported { mode, .. } => match mode {
                DeploymentMode::Cloud => Some("This endpoint only exists on Server/Data Center"),
                DeploymentMode::Server => Some("This endpoint only exists on Cloud"),
            },
            _ => None,
        }
    }

    /// Builds the error for a 4xx/5xx response.
    pub(crate) fn from_response(
        status: StatusCode,
        content_type: Option<&str>,
        url: &str,
        body: &[u8],
    ) -> Self {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);

        // A 401 served as HTML is usually a login redirect page.
        if status == StatusCode::UNAUTHORIZED && !is_json {
            return ApiError::Unauthorized {
                url: url.to_string(),
            };
        }

        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|json| extract_message(&json))
            .unwrap_or_else(|| status_line(status));

        ApiError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

/// Pulls a human readable message out of the error envelopes used across
/// Jira, Confluence, Bitbucket and the cloud admin APIs.
pub fn extract_message(json: &Value) -> Option<String> {
    let mut messages: Vec<String> = Vec::new();

    if let Some(list) = json.get("errorMessages").and_then(Value::as_array) {
        messages.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
    }

    match json.get("errors") {
        Some(Value::Object(map)) => {
            if let Some(message) = map.get("message").and_then(Value::as_str) {
                messages.push(message.to_string());
            } else {
                messages.extend(map.values().filter_map(value_text));
            }
        }
        Some(Value::Array(list)) => {
            messages.extend(list.iter().filter_map(|item| match item {
                Value::Object(_) => item.get("message").and_then(value_text),
                other => value_text(other),
            }));
        }
        _ => {}
    }

    if messages.is_empty() {
        if let Some(message) = json.get("message").and_then(Value::as_str) {
            messages.push(message.to_string());
        } else if let Some(message) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
        {
            messages.push(message.to_string());
        }
    }

    messages.retain(|m| !m.is_empty());
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("\n"))
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
