use atlassian_rest_api::{take_field, ApiClient, ApiLayout, Paginator, RequestOptions, Result};
use serde_json::{json, Value};

/// Organization administration (`https://api.atlassian.com`, bearer API key).
pub const ADMIN_LAYOUT: ApiLayout = ApiLayout::uniform("admin", "v1");

/// User management lives outside the admin root.
pub const USERS_LAYOUT: ApiLayout = ApiLayout::uniform("users", "").fixed();

pub const DEFAULT_URL: &str = "https://api.atlassian.com";

#[derive(Clone)]
pub struct CloudAdmin {
    client: ApiClient,
}

impl CloudAdmin {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&ADMIN_LAYOUT, resource)
    }

    /// Admin lists are `{"data": [...], "links": {"next": "<absolute url>"}}`.
    async fn walk(&self, resource: &str, options: RequestOptions) -> Result<Vec<Value>> {
        self.client
            .cursor_pages::<Value>(self.path(resource))
            .options(options)
            .items_key("data")
            .next_pointer("/links/next")
            .fetch_all()
            .await
    }

    pub async fn orgs(&self) -> Result<Vec<Value>> {
        self.walk("orgs", RequestOptions::new()).await
    }

    pub async fn org(&self, org_id: &str) -> Result<Value> {
        let envelope: Value = self
            .client
            .get(&self.path(&format!("orgs/{org_id}")))
            .await?;
        take_field(envelope, "data")
    }

    pub async fn org_users(&self, org_id: &str) -> Result<Vec<Value>> {
        self.walk(&format!("orgs/{org_id}/users"), RequestOptions::new())
            .await
    }

    pub async fn org_domains(&self, org_id: &str) -> Result<Vec<Value>> {
        self.walk(&format!("orgs/{org_id}/domains"), RequestOptions::new())
            .await
    }

    /// Audit events, optionally bounded by epoch-millisecond timestamps.
    pub async fn org_events(
        &self,
        org_id: &str,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<Value>> {
        let options = RequestOptions::new()
            .query_opt("from", from)
            .query_opt("to", to);
        self.walk(&format!("orgs/{org_id}/events"), options).await
    }

    pub async fn org_policies(&self, org_id: &str) -> Result<Vec<Value>> {
        self.walk(&format!("orgs/{org_id}/policies"), RequestOptions::new())
            .await
    }

    pub async fn disable_user(&self, account_id: &str, message: Option<&str>) -> Result<()> {
        let body = match message {
            Some(message) => json!({ "message": message }),
            None => json!({}),
        };
        let path = self.client.resource_path(
            &USERS_LAYOUT,
            &format!("{account_id}/manage/lifecycle/disable"),
        );
        self.client.post::<Value, _>(&path, &body).await?;
        Ok(())
    }

    pub async fn enable_user(&self, account_id: &str) -> Result<()> {
        let path = self.client.resource_path(
            &USERS_LAYOUT,
            &format!("{account_id}/manage/lifecycle/enable"),
        );
        self.client.post::<Value, _>(&path, &json!({})).await?;
        Ok(())
    }
}
