//! Endpoint catalogs for Atlassian products on top of [`atlassian_rest_api`].
//!
//! Every catalog owns a cheap-to-clone [`ApiClient`] and maps one method onto
//! one REST call (or one pagination walk). Entities come back as
//! [`serde_json::Value`]; write calls return `Option<Value>` because many
//! endpoints answer with an empty body.

pub mod bitbucket;
pub mod cloud_admin;
pub mod confluence;
pub mod crowd;
pub mod insight;
pub mod jira;
pub mod marketplace;
pub mod service_desk;
pub mod statuspage;
pub mod tempo;
pub mod xray;

pub use atlassian_rest_api::{ApiClient, ApiError, DeploymentMode, Result};
pub use bitbucket::Bitbucket;
pub use cloud_admin::CloudAdmin;
pub use confluence::Confluence;
pub use crowd::Crowd;
pub use insight::Insight;
pub use jira::Jira;
pub use marketplace::Marketplace;
pub use service_desk::ServiceDesk;
pub use statuspage::StatusPage;
pub use tempo::Tempo;
pub use xray::Xray;

use atlassian_rest_api::RequestOptions;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};

pub(crate) const ATLASSIAN_TOKEN: HeaderName = HeaderName::from_static("x-atlassian-token");

/// Header Atlassian servers demand on multipart uploads to skip XSRF checks.
pub(crate) fn no_check() -> RequestOptions {
    RequestOptions::new().header(ATLASSIAN_TOKEN, HeaderValue::from_static("no-check"))
}

/// Single-file multipart form under the `file` field.
pub(crate) fn file_form(filename: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<Form> {
    let mut part = Part::bytes(data).file_name(filename.to_string());
    if let Some(mime) = content_type {
        part = part.mime_str(mime)?;
    }
    Ok(Form::new().part("file", part))
}
