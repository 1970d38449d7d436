use atlassian_rest_api::{
    join_segments, take_array, ApiClient, ApiLayout, Paginator, Payload, RequestOptions, Result,
};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::{file_form, no_check};

/// `rest/api/2` is served by both Jira Server/Data Center and Cloud.
pub const LAYOUT: ApiLayout = ApiLayout::uniform("rest/api", "2");

const AGILE_ROOT: &str = "rest/agile/1.0";

#[derive(Clone)]
pub struct Jira {
    client: ApiClient,
}

impl Jira {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&LAYOUT, resource)
    }

    pub async fn myself(&self) -> Result<Value> {
        self.client.get(&self.path("myself")).await
    }

    pub async fn issue(&self, key: &str, fields: Option<&str>, expand: Option<&str>) -> Result<Value> {
        let options = RequestOptions::new()
            .query_opt("fields", fields)
            .query_opt("expand", expand);
        self.client
            .get_with(&self.path(&format!("issue/{key}")), &options)
            .await
    }

    /// Creates an issue from a `fields` object, e.g.
    /// `{"project": {"key": "PROJ"}, "issuetype": {"name": "Task"}, "summary": "..."}`.
    pub async fn create_issue(&self, fields: Value) -> Result<Option<Value>> {
        self.client
            .post(&self.path("issue"), &json!({ "fields": fields }))
            .await
    }

    pub async fn update_issue_fields(&self, key: &str, fields: Value, notify_users: bool) -> Result<()> {
        let options = RequestOptions::new().query("notifyUsers", notify_users);
        self.client
            .send::<Value>(
                Method::PUT,
                &self.path(&format!("issue/{key}")),
                Payload::json(&json!({ "fields": fields }))?,
                &options,
            )
            .await?;
        Ok(())
    }

    pub async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> Result<()> {
        let options = RequestOptions::new().query("deleteSubtasks", delete_subtasks);
        self.client
            .send::<Value>(
                Method::DELETE,
                &self.path(&format!("issue/{key}")),
                Payload::Empty,
                &options,
            )
            .await?;
        Ok(())
    }

    pub async fn add_comment(&self, key: &str, body: &str) -> Result<Option<Value>> {
        self.client
            .post(
                &self.path(&format!("issue/{key}/comment")),
                &json!({ "body": body }),
            )
            .await
    }

    pub async fn issue_transitions(&self, key: &str) -> Result<Vec<Value>> {
        let envelope: Value = self
            .client
            .get(&self.path(&format!("issue/{key}/transitions")))
            .await?;
        take_array(envelope, "transitions")
    }

    pub async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        fields: Option<Value>,
    ) -> Result<()> {
        let mut body = json!({ "transition": { "id": transition_id } });
        if let Some(fields) = fields {
            body["fields"] = fields;
        }
        self.client
            .post::<Value, _>(&self.path(&format!("issue/{key}/transitions")), &body)
            .await?;
        Ok(())
    }

    /// One page of a JQL search; the envelope keeps `total`/`startAt`.
    pub async fn jql(
        &self,
        query: &str,
        fields: Option<&str>,
        start_at: u64,
        max_results: u32,
    ) -> Result<Value> {
        let options = RequestOptions::new()
            .query("jql", query)
            .query_opt("fields", fields)
            .query("startAt", start_at)
            .query("maxResults", max_results);
        self.client.get_with(&self.path("search"), &options).await
    }

    pub async fn projects(&self) -> Result<Vec<Value>> {
        self.client.get(&self.path("project")).await
    }

    pub async fn project(&self, key: &str) -> Result<Value> {
        self.client.get(&self.path(&format!("project/{key}"))).await
    }

    pub async fn project_components(&self, key: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("project/{key}/components")))
            .await
    }

    pub async fn fields(&self) -> Result<Vec<Value>> {
        self.client.get(&self.path("field")).await
    }

    /// Cloud identifies users by `accountId`, Server by `username`.
    pub async fn user(&self, id: &str, expand: Option<&str>) -> Result<Value> {
        let id_param = if self.client.is_cloud() {
            "accountId"
        } else {
            "username"
        };
        let options = RequestOptions::new()
            .query(id_param, id)
            .query_opt("expand", expand);
        self.client.get_with(&self.path("user"), &options).await
    }

    pub async fn add_worklog(
        &self,
        key: &str,
        time_spent: &str,
        started: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Option<Value>> {
        let mut body = json!({ "timeSpent": time_spent });
        if let Some(started) = started {
            body["started"] = json!(started);
        }
        if let Some(comment) = comment {
            body["comment"] = json!(comment);
        }
        self.client
            .post(&self.path(&format!("issue/{key}/worklog")), &body)
            .await
    }

    pub async fn add_attachment(
        &self,
        key: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<Option<Value>> {
        let form = file_form(filename, data, None)?;
        debug!(issue = key, filename, "Uploading attachment");
        self.client
            .send(
                Method::POST,
                &self.path(&format!("issue/{key}/attachments")),
                Payload::Multipart(form),
                &no_check(),
            )
            .await
    }

    /// Every agile board, optionally narrowed to one project.
    pub async fn agile_boards(&self, project_key: Option<&str>) -> Result<Vec<Value>> {
        let options = RequestOptions::new().query_opt("projectKeyOrId", project_key);
        self.client
            .offset_pages::<Value>(join_segments(&[AGILE_ROOT, "board"]))
            .start_param("startAt")
            .advance_by_count()
            .options(options)
            .fetch_all()
            .await
    }

    /// Starts a background re-index. Server/Data Center only.
    pub async fn reindex(&self) -> Result<Option<Value>> {
        self.client.require_server("Jira re-index")?;
        let options = RequestOptions::new().query("type", "BACKGROUND_PREFERRED");
        self.client
            .send(Method::POST, &self.path("reindex"), Payload::Empty, &options)
            .await
    }
}
