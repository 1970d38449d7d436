use std::fmt;

use crate::context::ConnectionContext;

/// Which flavour of an Atlassian product the client talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DeploymentMode {
    #[default]
    Server,
    Cloud,
}

impl DeploymentMode {
    pub fn from_cloud_flag(cloud: bool) -> Self {
        if cloud {
            DeploymentMode::Cloud
        } else {
            DeploymentMode::Server
        }
    }

    pub fn is_cloud(self) -> bool {
        self == DeploymentMode::Cloud
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Server => f.write_str("Server"),
            DeploymentMode::Cloud => f.write_str("Cloud"),
        }
    }
}

/// `{root}/{version}` prefix of a REST API, e.g. `rest/api` + `1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiRoot {
    pub root: &'static str,
    pub version: &'static str,
}

impl ApiRoot {
    pub const fn new(root: &'static str, version: &'static str) -> Self {
        Self { root, version }
    }
}

/// Maps a resource name onto a path relative to the client base URL.
///
/// Catalogs whose URL shape cannot be described by an [`ApiLayout`]
/// implement this themselves; the executor only ever sees the result.
pub trait ResourceUrl {
    fn resource_path(&self, ctx: &ConnectionContext, resource: &str) -> String;
}

/// Per-product pair of API roots, one per deployment mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiLayout {
    pub server: ApiRoot,
    pub cloud: ApiRoot,
    overridable: bool,
}

impl ApiLayout {
    pub const fn new(server: ApiRoot, cloud: ApiRoot) -> Self {
        Self {
            server,
            cloud,
            overridable: true,
        }
    }

    /// Same root in both modes.
    pub const fn uniform(root: &'static str, version: &'static str) -> Self {
        let api = ApiRoot::new(root, version);
        Self::new(api, api)
    }

    /// Secondary layout of a catalog: the context's `api_root` / `api_version`
    /// overrides target the primary one and are ignored here.
    pub const fn fixed(self) -> Self {
        Self {
            overridable: false,
            ..self
        }
    }

    pub fn select(&self, mode: DeploymentMode) -> ApiRoot {
        match mode {
            DeploymentMode::Server => self.server,
            DeploymentMode::Cloud => self.cloud,
        }
    }
}

impl ResourceUrl for ApiLayout {
    fn resource_path(&self, ctx: &ConnectionContext, resource: &str) -> String {
        let api = self.select(ctx.mode());
        if !self.overridable {
            return join_segments(&[api.root, api.version, resource]);
        }
        let root = ctx.api_root().unwrap_or(api.root);
        let version = ctx.api_version().unwrap_or(api.version);
        join_segments(&[root, version, resource])
    }
}

/// Joins path segments with `/`, dropping empty ones and duplicate slashes.
pub fn join_segments(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
