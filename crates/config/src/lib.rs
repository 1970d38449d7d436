use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use atlassian_rest_api::{ApiClient, ConnectionContext, Credential, DeploymentMode};
use atlassian_rest_auth::{token_key, CredentialStore};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const APP_DIR: &str = "atlassian-rest";

/// Represents the full client configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Config {
    /// Load configuration from the provided path or the default config file.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;

        serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))
    }

    /// Persist the configuration to disk, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: Option<P>) -> Result<()> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let serialized = serde_yaml::to_string(self)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Unable to write config file {}", path.display()))?;

        Ok(())
    }

    /// Convenience helper to retrieve a profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Returns either the requested profile or falls back to the default one.
    pub fn resolve_profile<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Option<(&'a str, &'a Profile)> {
        if let Some(name) = requested {
            self.profiles.get(name).map(|profile| (name, profile))
        } else if let Some(default_name) = self.default_profile.as_deref() {
            self.profiles
                .get(default_name)
                .map(|profile| (default_name, profile))
        } else if let Some((name, profile)) = self.profiles.iter().next() {
            Some((name.as_str(), profile))
        } else {
            None
        }
    }

    fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(format!(".{APP_DIR}"));
        path.push("config.yaml");
        path
    }
}

/// How the profile's token is presented to the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    #[default]
    Basic,
    Bearer,
    Session,
}

/// Connection settings for one site. Values are optional to support
/// partially configured setups (e.g. when the token lives in the credential store).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub base_url: Option<String>,
    #[serde(alias = "email")]
    pub username: Option<String>,
    pub api_token: Option<String>,
    #[serde(default)]
    pub auth: AuthKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Profile {
    /// Explicit `cloud` flag, otherwise guessed from well-known cloud hosts.
    pub fn deployment_mode(&self) -> DeploymentMode {
        if let Some(cloud) = self.cloud {
            return DeploymentMode::from_cloud_flag(cloud);
        }

        let host = self
            .base_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_string));

        let cloud = matches!(
            host.as_deref(),
            Some(h) if h.ends_with(".atlassian.net")
                || h == "bitbucket.org"
                || h == "api.bitbucket.org"
                || h == "api.atlassian.com"
        );
        DeploymentMode::from_cloud_flag(cloud)
    }

    /// Inline token, else the one saved for `profile_name` in `store`.
    pub fn resolve_token(&self, profile_name: &str, store: &CredentialStore) -> Result<Option<String>> {
        if let Some(token) = &self.api_token {
            return Ok(Some(token.clone()));
        }
        store
            .get(&token_key(profile_name))
            .with_context(|| format!("Unable to read stored token for profile {profile_name}"))
    }

    pub fn credential(&self, profile_name: &str, store: &CredentialStore) -> Result<Credential> {
        let token = self.resolve_token(profile_name, store)?;

        let credential = match (self.auth, token) {
            (_, None) => Credential::Anonymous,
            (AuthKind::Basic, Some(token)) => {
                let username = self.username.as_deref().ok_or_else(|| {
                    anyhow!("Profile {profile_name} uses basic auth but has no username")
                })?;
                Credential::basic(username, token)
            }
            (AuthKind::Bearer, Some(token)) => Credential::bearer(token),
            (AuthKind::Session, Some(cookie)) => Credential::session(cookie),
        };
        Ok(credential)
    }

    pub fn connection_context(
        &self,
        profile_name: &str,
        store: &CredentialStore,
    ) -> Result<ConnectionContext> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow!("Profile {profile_name} has no base_url"))?;

        let mut context = ConnectionContext::new(base_url)
            .with_context(|| format!("Invalid base_url for profile {profile_name}"))?
            .with_credential(self.credential(profile_name, store)?)
            .with_mode(self.deployment_mode());

        if let Some(secs) = self.timeout_secs {
            context = context.with_timeout(Duration::from_secs(secs));
        }
        if let Some(verify) = self.verify_ssl {
            context = context.with_verify_ssl(verify);
        }
        if let Some(root) = &self.api_root {
            context = context.with_api_root(root.clone());
        }
        if let Some(version) = &self.api_version {
            context = context.with_api_version(version.clone());
        }
        for (name, value) in &self.headers {
            context = context
                .try_with_header(name, value)
                .with_context(|| format!("Invalid header in profile {profile_name}"))?;
        }

        Ok(context)
    }

    pub fn build_client(&self, profile_name: &str, store: &CredentialStore) -> Result<ApiClient> {
        let context = self.connection_context(profile_name, store)?;
        debug!(
            profile = profile_name,
            base_url = %context.base_url(),
            mode = %context.mode(),
            "Building client from profile"
        );
        ApiClient::from_context(context).context("Unable to build HTTP client")
    }
}

/// Default secret store shared by all profiles.
pub fn default_credential_store() -> CredentialStore {
    CredentialStore::new(APP_DIR)
}
