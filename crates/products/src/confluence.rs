use atlassian_rest_api::{
    join_segments, take_array, ApiClient, ApiError, ApiLayout, Paginator, Payload, RequestOptions,
    Result,
};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::{file_form, no_check};

/// Confluence keeps its REST API unversioned under `rest/api`.
pub const LAYOUT: ApiLayout = ApiLayout::uniform("rest/api", "");

/// Cloud-only v2 API, relative to the `/wiki` base.
const V2_ROOT: &str = "api/v2";

#[derive(Clone)]
pub struct Confluence {
    client: ApiClient,
}

impl Confluence {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&LAYOUT, resource)
    }

    async fn walk(&self, resource: &str, options: RequestOptions) -> Result<Vec<Value>> {
        self.client
            .cursor_pages::<Value>(self.path(resource))
            .options(options)
            .items_key("results")
            .next_pointer("/_links/next")
            .fetch_all()
            .await
    }

    pub async fn page_by_id(&self, id: &str, expand: Option<&str>) -> Result<Value> {
        let options = RequestOptions::new().query_opt("expand", expand);
        self.client
            .get_with(&self.path(&format!("content/{id}")), &options)
            .await
    }

    /// Looks a page up by exact title; `None` when the space has no such page.
    pub async fn page_by_title(
        &self,
        space: &str,
        title: &str,
        expand: Option<&str>,
    ) -> Result<Option<Value>> {
        let options = RequestOptions::new()
            .query("type", "page")
            .query("spaceKey", space)
            .query("title", title)
            .query_opt("expand", expand);
        let envelope: Value = self.client.get_with(&self.path("content"), &options).await?;
        Ok(take_array(envelope, "results")?.into_iter().next())
    }

    /// Creates a page whose body is in storage format.
    pub async fn create_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<Value>> {
        let mut payload = json!({
            "type": "page",
            "title": title,
            "space": { "key": space },
            "body": { "storage": { "value": body, "representation": "storage" } },
        });
        if let Some(parent) = parent_id {
            payload["ancestors"] = json!([{ "type": "page", "id": parent }]);
        }
        self.client.post(&self.path("content"), &payload).await
    }

    /// Replaces title and body. The current version is read first and the
    /// update is sent as the next version.
    pub async fn update_page(&self, id: &str, title: &str, body: &str) -> Result<Option<Value>> {
        let current = self.page_by_id(id, Some("version")).await?;
        let version = current
            .pointer("/version/number")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ApiError::InvalidResponse(format!("page {id} has no version number"))
            })?;

        debug!(page = id, from = version, to = version + 1, "Updating page");

        let payload = json!({
            "id": id,
            "type": "page",
            "title": title,
            "body": { "storage": { "value": body, "representation": "storage" } },
            "version": { "number": version + 1 },
        });
        self.client
            .put(&self.path(&format!("content/{id}")), &payload)
            .await
    }

    pub async fn remove_page(&self, id: &str) -> Result<()> {
        self.client
            .delete::<Value>(&self.path(&format!("content/{id}")))
            .await?;
        Ok(())
    }

    /// Every page of a space.
    pub async fn space_pages(&self, space: &str, expand: Option<&str>) -> Result<Vec<Value>> {
        let options = RequestOptions::new()
            .query("spaceKey", space)
            .query("type", "page")
            .query_opt("expand", expand);
        self.walk("content", options).await
    }

    pub async fn spaces(&self) -> Result<Vec<Value>> {
        self.walk("space", RequestOptions::new()).await
    }

    pub async fn space(&self, key: &str, expand: Option<&str>) -> Result<Value> {
        let options = RequestOptions::new().query_opt("expand", expand);
        self.client
            .get_with(&self.path(&format!("space/{key}")), &options)
            .await
    }

    /// One page of CQL search results.
    pub async fn cql(&self, query: &str, start: u64, limit: u32) -> Result<Value> {
        let options = RequestOptions::new()
            .query("cql", query)
            .query("start", start)
            .query("limit", limit);
        self.client.get_with(&self.path("search"), &options).await
    }

    /// Direct children of a page, first page of results only.
    pub async fn child_pages(&self, id: &str, start: u64, limit: u32) -> Result<Vec<Value>> {
        let options = RequestOptions::new().query("start", start).query("limit", limit);
        let envelope: Value = self
            .client
            .get_with(&self.path(&format!("content/{id}/child/page")), &options)
            .await?;
        take_array(envelope, "results")
    }

    pub async fn all_child_pages(&self, id: &str) -> Result<Vec<Value>> {
        self.walk(&format!("content/{id}/child/page"), RequestOptions::new())
            .await
    }

    pub async fn attachments(&self, id: &str) -> Result<Vec<Value>> {
        self.walk(&format!("content/{id}/child/attachment"), RequestOptions::new())
            .await
    }

    pub async fn attach_content(
        &self,
        id: &str,
        filename: &str,
        data: Vec<u8>,
        content_type: &str,
        comment: Option<&str>,
    ) -> Result<Option<Value>> {
        let mut form = file_form(filename, data, Some(content_type))?;
        if let Some(comment) = comment {
            form = form.text("comment", comment.to_string());
        }
        self.client
            .send(
                Method::POST,
                &self.path(&format!("content/{id}/child/attachment")),
                Payload::Multipart(form),
                &no_check(),
            )
            .await
    }

    pub async fn page_labels(&self, id: &str) -> Result<Vec<Value>> {
        let envelope: Value = self
            .client
            .get(&self.path(&format!("content/{id}/label")))
            .await?;
        take_array(envelope, "results")
    }

    pub async fn add_page_label(&self, id: &str, label: &str) -> Result<Option<Value>> {
        self.client
            .post(
                &self.path(&format!("content/{id}/label")),
                &json!([{ "prefix": "global", "name": label }]),
            )
            .await
    }

    /// PDF export through the Server/Data Center flying-pdf action.
    pub async fn export_page_pdf(&self, id: &str) -> Result<Vec<u8>> {
        let options = no_check()
            .query("pageId", id)
            .header(ACCEPT, HeaderValue::from_static("application/pdf"));
        self.client
            .get_bytes("spaces/flyingpdf/pdfpageexport.action", &options)
            .await
    }

    /// Pages of a space through the v2 API, which pages by cursor.
    pub async fn space_pages_v2(&self, space_id: &str) -> Result<Vec<Value>> {
        self.client.require_cloud("Confluence v2 space pages")?;
        self.client
            .cursor_pages::<Value>(join_segments(&[V2_ROOT, "spaces", space_id, "pages"]))
            .options(RequestOptions::new().query("limit", 250))
            .items_key("results")
            .next_pointer("/_links/next")
            .fetch_all()
            .await
    }
}
