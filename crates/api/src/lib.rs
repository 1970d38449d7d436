pub mod context;
pub mod decode;
pub mod error;
pub mod pagination;
pub mod request;
pub mod resource;

pub use atlassian_rest_auth::Credential;
pub use context::ConnectionContext;
pub use decode::{decode_lenient, decode_strict, take_array, take_field};
pub use error::{ApiError, Result};
pub use pagination::{collect_pages, CursorPaginator, OffsetPaginator, Page, Paginator};
pub use request::{Payload, RawResponse, RequestOptions};
pub use resource::{join_segments, ApiLayout, ApiRoot, DeploymentMode, ResourceUrl};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// HTTP client bound to one immutable [`ConnectionContext`].
///
/// Cloning is cheap and shares the connection pool and the context.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    context: Arc<ConnectionContext>,
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::from_context(ConnectionContext::new(base_url)?)
    }

    pub fn from_context(context: ConnectionContext) -> Result<Self> {
        let client = Client::builder()
            .user_agent(context.user_agent())
            .timeout(context.timeout())
            .danger_accept_invalid_certs(!context.verify_ssl())
            .default_headers(context.headers().clone())
            .build()
            .map_err(ApiError::RequestFailed)?;

        Ok(Self {
            client,
            context: Arc::new(context),
        })
    }

    pub fn with_basic_auth(self, username: impl Into<String>, token: impl Into<String>) -> Self {
        self.with_credential(Credential::basic(username, token))
    }

    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        self.with_credential(Credential::bearer(token))
    }

    pub fn with_session_cookie(self, cookie: impl Into<String>) -> Self {
        self.with_credential(Credential::session(cookie))
    }

    /// Replaces the credential before the client is put to use.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        let context = (*self.context).clone().with_credential(credential);
        self.context = Arc::new(context);
        self
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    pub fn base_url(&self) -> &str {
        self.context.base_url().as_str()
    }

    pub fn mode(&self) -> DeploymentMode {
        self.context.mode()
    }

    pub fn is_cloud(&self) -> bool {
        self.context.is_cloud()
    }

    /// Path of `resource` under the API root chosen by `layout` for this client's mode.
    pub fn resource_path<U: ResourceUrl + ?Sized>(&self, layout: &U, resource: &str) -> String {
        layout.resource_path(&self.context, resource)
    }

    /// Fails without touching the network unless the client targets Cloud.
    pub fn require_cloud(&self, feature: &str) -> Result<()> {
        if self.is_cloud() {
            Ok(())
        } else {
            Err(self.not_supported(feature))
        }
    }

    /// Fails without touching the network unless the client targets Server/Data Center.
    pub fn require_server(&self, feature: &str) -> Result<()> {
        if self.is_cloud() {
            Err(self.not_supported(feature))
        } else {
            Ok(())
        }
    }

    fn not_supported(&self, feature: &str) -> ApiError {
        ApiError::NotSupported {
            feature: feature.to_string(),
            mode: self.mode(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with(path, &RequestOptions::default()).await
    }

    /// GET with strict decoding: a body that does not parse is an error.
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        let raw = self
            .execute(Method::GET, path, Payload::Empty, options)
            .await?;
        decode_strict(&raw)
    }

    /// GET returning the undecoded body (exports, attachment downloads).
    pub async fn get_bytes(&self, path: &str, options: &RequestOptions) -> Result<Vec<u8>> {
        let raw = self
            .execute(Method::GET, path, Payload::Empty, options)
            .await?;
        Ok(raw.body)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>> {
        self.send(Method::POST, path, Payload::json(body)?, &RequestOptions::default())
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>> {
        self.send(Method::PUT, path, Payload::json(body)?, &RequestOptions::default())
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>> {
        self.send(Method::PATCH, path, Payload::json(body)?, &RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        self.send(Method::DELETE, path, Payload::Empty, &RequestOptions::default())
            .await
    }

    /// Non-GET request with lenient decoding: an empty or unparseable body
    /// on success yields `Ok(None)`.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        options: &RequestOptions,
    ) -> Result<Option<T>> {
        let raw = self.execute(method, path, payload, options).await?;
        Ok(decode_lenient(&raw))
    }

    /// Issues one request and returns the raw response. Statuses in 400..=599
    /// become [`ApiError`]s; nothing is retried.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        options: &RequestOptions,
    ) -> Result<RawResponse> {
        let url = self.context.endpoint(path, &options.query)?;

        debug!(
            method = %method,
            url = %url,
            auth = %self.context.credential().redacted(),
            headers = ?options.headers.keys().collect::<Vec<_>>(),
            body = %payload.preview(),
            "Sending request"
        );

        let mut req = self.client.request(method.clone(), url.clone());
        req = self.apply_auth(req);

        if !options.headers.is_empty() {
            req = req.headers(options.headers.clone());
        }
        if let Some(timeout) = options.timeout {
            req = req.timeout(timeout);
        }

        req = match payload {
            Payload::Empty => req,
            Payload::Json(body) => req.json(&body),
            Payload::Multipart(form) => req.multipart(form),
            Payload::Bytes { data, content_type } => {
                req.header(CONTENT_TYPE, content_type).body(data)
            }
        };

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!(method = %method, url = %url, status = %status, bytes = body.len(), "Received response");

        if status.is_client_error() || status.is_server_error() {
            let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
            let err = ApiError::from_response(status, content_type, url.as_str(), &body);
            debug!(method = %method, url = %url, error = %err, "Request failed");
            return Err(err);
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    pub fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match self.context.credential().header() {
            Some((name, value)) => request.header(name, value),
            None => request,
        }
    }

    pub fn offset_pages<T>(&self, path: impl Into<String>) -> OffsetPaginator<'_, T> {
        OffsetPaginator::new(self, path)
    }

    pub fn cursor_pages<T>(&self, path: impl Into<String>) -> CursorPaginator<'_, T> {
        CursorPaginator::new(self, path)
    }
}
