use atlassian_rest_api::{ApiClient, ApiLayout, ConnectionContext, Payload, RequestOptions, Result};
use reqwest::Method;
use serde_json::{json, Value};

pub const LAYOUT: ApiLayout = ApiLayout::uniform("v1", "");

pub const DEFAULT_URL: &str = "https://api.statuspage.io";

#[derive(Clone)]
pub struct StatusPage {
    client: ApiClient,
}

impl StatusPage {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Client for `base_url` authenticating every call with `Authorization: OAuth <key>`.
    pub fn with_api_key(base_url: &str, api_key: &str) -> Result<Self> {
        let context = ConnectionContext::new(base_url)?
            .with_cloud(true)
            .try_with_header("authorization", &format!("OAuth {api_key}"))?;
        Ok(Self::new(ApiClient::from_context(context)?))
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&LAYOUT, resource)
    }

    pub async fn pages(&self) -> Result<Vec<Value>> {
        self.client.get(&self.path("pages")).await
    }

    pub async fn page(&self, page_id: &str) -> Result<Value> {
        self.client
            .get(&self.path(&format!("pages/{page_id}")))
            .await
    }

    pub async fn update_page(&self, page_id: &str, fields: Value) -> Result<Option<Value>> {
        self.client
            .patch(
                &self.path(&format!("pages/{page_id}")),
                &json!({ "page": fields }),
            )
            .await
    }

    pub async fn components(&self, page_id: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("pages/{page_id}/components")))
            .await
    }

    pub async fn create_component(&self, page_id: &str, component: Value) -> Result<Option<Value>> {
        self.client
            .post(
                &self.path(&format!("pages/{page_id}/components")),
                &json!({ "component": component }),
            )
            .await
    }

    pub async fn incidents(&self, page_id: &str, query: Option<&str>) -> Result<Vec<Value>> {
        let options = RequestOptions::new().query_opt("q", query);
        self.client
            .get_with(&self.path(&format!("pages/{page_id}/incidents")), &options)
            .await
    }

    pub async fn unresolved_incidents(&self, page_id: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("pages/{page_id}/incidents/unresolved")))
            .await
    }

    pub async fn create_incident(&self, page_id: &str, incident: Value) -> Result<Option<Value>> {
        self.client
            .send(
                Method::POST,
                &self.path(&format!("pages/{page_id}/incidents")),
                Payload::json(&json!({ "incident": incident }))?,
                &RequestOptions::default(),
            )
            .await
    }

    pub async fn subscribers(&self, page_id: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("pages/{page_id}/subscribers")))
            .await
    }
}
