use atlassian_rest_api::{join_segments, ApiClient, ApiLayout, ApiRoot, Paginator, RequestOptions, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::debug;

/// Tempo Cloud (`https://api.tempo.io`).
pub const CLOUD_LAYOUT: ApiLayout = ApiLayout::uniform("core", "3");

/// Tempo plugins installed in Jira Server/Data Center.
pub const ACCOUNTS: ApiRoot = ApiRoot::new("rest/tempo-accounts", "1");
pub const TIMESHEETS: ApiRoot = ApiRoot::new("rest/tempo-timesheets", "4");
pub const TEAMS: ApiRoot = ApiRoot::new("rest/tempo-teams", "2");

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct Tempo {
    client: ApiClient,
}

impl Tempo {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn cloud_path(&self, resource: &str) -> String {
        self.client.resource_path(&CLOUD_LAYOUT, resource)
    }

    fn plugin_path(root: ApiRoot, resource: &str) -> String {
        join_segments(&[root.root, root.version, resource])
    }

    /// Cloud lists are `{"metadata": {"next": ...}, "results": [...]}`.
    async fn cloud_walk(&self, resource: &str, options: RequestOptions) -> Result<Vec<Value>> {
        self.client
            .cursor_pages::<Value>(self.cloud_path(resource))
            .options(options)
            .items_key("results")
            .next_pointer("/metadata/next")
            .fetch_all()
            .await
    }

    pub async fn accounts(&self) -> Result<Vec<Value>> {
        if self.client.is_cloud() {
            self.cloud_walk("accounts", RequestOptions::new()).await
        } else {
            self.client
                .get(&Self::plugin_path(ACCOUNTS, "account"))
                .await
        }
    }

    pub async fn teams(&self) -> Result<Vec<Value>> {
        if self.client.is_cloud() {
            self.cloud_walk("teams", RequestOptions::new()).await
        } else {
            self.client.get(&Self::plugin_path(TEAMS, "team")).await
        }
    }

    /// Worklogs between two dates, both inclusive.
    pub async fn worklogs(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Value>> {
        let from = from.format(DATE_FORMAT).to_string();
        let to = to.format(DATE_FORMAT).to_string();
        debug!(from = %from, to = %to, "Fetching worklogs");

        if self.client.is_cloud() {
            let options = RequestOptions::new().query("from", &from).query("to", &to);
            self.cloud_walk("worklogs", options).await
        } else {
            let found: Option<Vec<Value>> = self
                .client
                .post(
                    &Self::plugin_path(TIMESHEETS, "worklogs/search"),
                    &json!({ "from": from, "to": to }),
                )
                .await?;
            Ok(found.unwrap_or_default())
        }
    }

    pub async fn create_worklog(&self, worklog: &Value) -> Result<Option<Value>> {
        let path = if self.client.is_cloud() {
            self.cloud_path("worklogs")
        } else {
            Self::plugin_path(TIMESHEETS, "worklogs")
        };
        self.client.post(&path, worklog).await
    }
}
