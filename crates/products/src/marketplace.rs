use atlassian_rest_api::{collect_pages, ApiClient, ApiLayout, CursorPaginator, Paginator, RequestOptions, Result};
use serde_json::Value;

pub const LAYOUT: ApiLayout = ApiLayout::uniform("rest", "2");

pub const DEFAULT_URL: &str = "https://marketplace.atlassian.com";

/// Search filters for [`Marketplace::addons`].
#[derive(Debug, Clone, Default)]
pub struct AddonQuery<'a> {
    pub text: Option<&'a str>,
    pub hosting: Option<&'a str>,
    pub application: Option<&'a str>,
    /// Stop once this many add-ons were collected.
    pub limit: Option<usize>,
}

#[derive(Clone)]
pub struct Marketplace {
    client: ApiClient,
}

impl Marketplace {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&LAYOUT, resource)
    }

    /// HAL collections: items under `_embedded.<name>`, next link at `_links.next.href`.
    fn hal_pages(&self, resource: &str, embedded: &'static str) -> CursorPaginator<'_, Value> {
        self.client
            .cursor_pages(self.path(resource))
            .items_key(embedded)
            .next_pointer("/_links/next")
    }

    pub async fn addons(&self, query: &AddonQuery<'_>) -> Result<Vec<Value>> {
        let options = RequestOptions::new()
            .query_opt("text", query.text)
            .query_opt("hosting", query.hosting)
            .query_opt("application", query.application);
        let pages = self
            .hal_pages("addons", "/_embedded/addons")
            .options(options);
        collect_pages(&pages, query.limit).await
    }

    pub async fn addon(&self, key: &str) -> Result<Value> {
        self.client.get(&self.path(&format!("addons/{key}"))).await
    }

    pub async fn vendors(&self, text: Option<&str>) -> Result<Vec<Value>> {
        let options = RequestOptions::new().query_opt("text", text);
        self.hal_pages("vendors", "/_embedded/vendors")
            .options(options)
            .fetch_all()
            .await
    }

    /// Released versions of a host application such as `jira` or `confluence`.
    pub async fn application_versions(&self, application: &str) -> Result<Vec<Value>> {
        self.hal_pages(
            &format!("applications/{application}/versions"),
            "/_embedded/versions",
        )
        .fetch_all()
        .await
    }
}
