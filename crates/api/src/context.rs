use std::time::Duration;

use atlassian_rest_auth::Credential;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use url::Url;

use crate::error::{ApiError, Result};
use crate::resource::DeploymentMode;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(75);

/// Everything a client needs to reach one Atlassian site.
///
/// Built once, then frozen inside [`crate::ApiClient`]; every request and
/// every pagination walk made through that client reads the same values.
#[derive(Clone, Debug)]
pub struct ConnectionContext {
    base_url: Url,
    credential: Credential,
    headers: HeaderMap,
    timeout: Duration,
    verify_ssl: bool,
    mode: DeploymentMode,
    api_root: Option<String>,
    api_version: Option<String>,
    user_agent: String,
}

impl ConnectionContext {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.as_ref())?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url,
            credential: Credential::Anonymous,
            headers,
            timeout: DEFAULT_TIMEOUT,
            verify_ssl: true,
            mode: DeploymentMode::Server,
            api_root: None,
            api_version: None,
            user_agent: format!("atlassian-rest/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
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

    pub fn with_mode(mut self, mode: DeploymentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cloud(self, cloud: bool) -> Self {
        self.with_mode(DeploymentMode::from_cloud_flag(cloud))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    pub fn with_api_root(mut self, root: impl Into<String>) -> Self {
        self.api_root = Some(root.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Like [`Self::with_header`] for names and values coming from configuration.
    pub fn try_with_header(self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
        Ok(self.with_header(name, value))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn is_cloud(&self) -> bool {
        self.mode.is_cloud()
    }

    pub fn api_root(&self) -> Option<&str> {
        self.api_root.as_deref()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Absolute URL for `path` plus URL-encoded `query` pairs.
    pub fn endpoint(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Whether `link`, resolved against the base URL, stays on the same
    /// scheme, host and port. Credentials only ever go to that origin.
    pub fn shares_origin(&self, link: &str) -> bool {
        match self.base_url.join(link) {
            Ok(url) => url.origin() == self.base_url.origin(),
            Err(_) => false,
        }
    }

    /// Turns a pagination link into a path relative to the base URL so that
    /// the base is not applied twice.
    pub fn relative_path(&self, link: &str) -> String {
        let base = self.base_url.as_str();
        if let Some(rest) = link.strip_prefix(base) {
            return rest.to_string();
        }

        let bare = base.trim_end_matches('/');
        if let Some(rest) = link.strip_prefix(bare) {
            if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
                return rest.trim_start_matches('/').to_string();
            }
        }

        // Site-relative links that repeat the context path, e.g. `/wiki/api/v2/...`.
        let base_path = self.base_url.path();
        if base_path != "/" {
            if let Some(rest) = link.strip_prefix(base_path) {
                return rest.to_string();
            }
        }

        link.trim_start_matches('/').to_string()
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{trimmed}/"))?;
    if url.scheme() == "http" && url.host_str() != Some("localhost") {
        tracing::debug!(url = %url, "Base URL does not use HTTPS");
    }
    Ok(url)
}
