use atlassian_rest_api::{
    join_segments, take_array, ApiClient, ApiError, ApiLayout, ConnectionContext, DeploymentMode,
    Payload, RequestOptions, ResourceUrl, Result,
};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::{file_form, no_check};

pub const SERVER_LAYOUT: ApiLayout = ApiLayout::uniform("rest/insight", "1.0");

const CLOUD_ROOT: &str = "jsm/insight/workspace";
const CLOUD_VERSION: &str = "v1";

/// Insight (Assets) Server lives under `rest/insight/1.0`; Cloud routes every
/// call through a workspace on `api.atlassian.com`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsightUrls {
    Server,
    Cloud { workspace_id: String },
}

impl ResourceUrl for InsightUrls {
    fn resource_path(&self, ctx: &ConnectionContext, resource: &str) -> String {
        match self {
            InsightUrls::Server => SERVER_LAYOUT.resource_path(ctx, resource),
            InsightUrls::Cloud { workspace_id } => {
                join_segments(&[CLOUD_ROOT, workspace_id.as_str(), CLOUD_VERSION, resource])
            }
        }
    }
}

#[derive(Clone)]
pub struct Insight {
    client: ApiClient,
    urls: InsightUrls,
}

impl Insight {
    /// Server/Data Center Assets under `rest/insight/1.0`.
    ///
    /// The routing comes from the constructor, not from the client's
    /// deployment mode: Cloud needs a workspace, so build it with
    /// [`Insight::cloud`]. Mode-gated calls on a Cloud client built here fail
    /// with `NotSupported` naming the missing workspace.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            urls: InsightUrls::Server,
        }
    }

    /// `client` must point at the Assets gateway (`https://api.atlassian.com`).
    pub fn cloud(client: ApiClient, workspace_id: impl Into<String>) -> Self {
        Self {
            client,
            urls: InsightUrls::Cloud {
                workspace_id: workspace_id.into(),
            },
        }
    }

    /// Looks up the Assets workspace id of a Jira Service Management Cloud site.
    pub async fn discover_workspace_id(site_client: &ApiClient) -> Result<String> {
        let envelope: Value = site_client
            .get("rest/servicedeskapi/insight/workspace")
            .await?;
        let workspace = take_array(envelope, "values")?
            .into_iter()
            .find_map(|w| w.get("workspaceId").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| {
                ApiError::InvalidResponse("site has no Assets workspace".to_string())
            })?;
        debug!(workspace = %workspace, "Discovered Assets workspace");
        Ok(workspace)
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn mode(&self) -> DeploymentMode {
        match self.urls {
            InsightUrls::Server => DeploymentMode::Server,
            InsightUrls::Cloud { .. } => DeploymentMode::Cloud,
        }
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&self.urls, resource)
    }

    fn require(&self, mode: DeploymentMode, feature: &str) -> Result<()> {
        if self.mode() == DeploymentMode::Server && self.client.mode().is_cloud() {
            return Err(ApiError::NotSupported {
                feature: format!("{feature} without an Assets workspace (use Insight::cloud)"),
                mode: DeploymentMode::Cloud,
            });
        }
        if self.mode() == mode {
            Ok(())
        } else {
            Err(ApiError::NotSupported {
                feature: feature.to_string(),
                mode: self.mode(),
            })
        }
    }

    pub async fn object(&self, id: &str) -> Result<Value> {
        self.client.get(&self.path(&format!("object/{id}"))).await
    }

    /// `attributes` is the list of
    /// `{"objectTypeAttributeId": ..., "objectAttributeValues": [{"value": ...}]}` entries.
    pub async fn create_object(&self, object_type_id: &str, attributes: Value) -> Result<Option<Value>> {
        let body = json!({ "objectTypeId": object_type_id, "attributes": attributes });
        self.client.post(&self.path("object/create"), &body).await
    }

    pub async fn update_object(
        &self,
        id: &str,
        object_type_id: &str,
        attributes: Value,
    ) -> Result<Option<Value>> {
        let body = json!({ "objectTypeId": object_type_id, "attributes": attributes });
        self.client
            .put(&self.path(&format!("object/{id}")), &body)
            .await
    }

    pub async fn delete_object(&self, id: &str) -> Result<()> {
        self.client
            .delete::<Value>(&self.path(&format!("object/{id}")))
            .await?;
        Ok(())
    }

    pub async fn object_attributes(&self, id: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("object/{id}/attributes")))
            .await
    }

    pub async fn object_type_attributes(&self, object_type_id: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("objecttype/{object_type_id}/attributes")))
            .await
    }

    pub async fn object_schemas(&self) -> Result<Vec<Value>> {
        let envelope: Value = self.client.get(&self.path("objectschema/list")).await?;
        let key = match self.urls {
            InsightUrls::Server => "objectschemas",
            InsightUrls::Cloud { .. } => "values",
        };
        take_array(envelope, key)
    }

    /// One page of IQL results. Server/Data Center only.
    pub async fn iql(&self, query: &str, page: u32, results_per_page: u32) -> Result<Value> {
        self.require(DeploymentMode::Server, "IQL search")?;
        let options = RequestOptions::new()
            .query("iql", query)
            .query("page", page)
            .query("resultPerPage", results_per_page);
        self.client
            .get_with(&self.path("iql/objects"), &options)
            .await
    }

    /// Server/Data Center only.
    pub async fn upload_attachment(
        &self,
        object_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<Option<Value>> {
        self.require(DeploymentMode::Server, "Insight attachment upload")?;
        let form = file_form(filename, data, None)?;
        self.client
            .send(
                Method::POST,
                &self.path(&format!("attachments/object/{object_id}")),
                Payload::Multipart(form),
                &no_check(),
            )
            .await
    }

    /// One page of AQL results. Cloud only.
    pub async fn aql(&self, query: &str, start_at: u64, max_results: u32) -> Result<Option<Value>> {
        self.require(DeploymentMode::Cloud, "AQL search")?;
        let options = RequestOptions::new()
            .query("startAt", start_at)
            .query("maxResults", max_results);
        self.client
            .send(
                Method::POST,
                &self.path("object/aql"),
                Payload::json(&json!({ "qlQuery": query }))?,
                &options,
            )
            .await
    }
}
