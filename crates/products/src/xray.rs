use atlassian_rest_api::{ApiClient, ApiLayout, Payload, RequestOptions, Result};
use reqwest::Method;
use serde_json::{json, Value};

/// Xray for Jira Server/Data Center.
pub const LAYOUT: ApiLayout = ApiLayout::uniform("rest/raven", "1.0");

#[derive(Clone)]
pub struct Xray {
    client: ApiClient,
}

impl Xray {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&LAYOUT, resource)
    }

    pub async fn tests(&self, keys: &[&str]) -> Result<Vec<Value>> {
        let options = RequestOptions::new().query("keys", keys.join(";"));
        self.client.get_with(&self.path("api/test"), &options).await
    }

    pub async fn test_runs(&self, test_key: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("api/test/{test_key}/testruns")))
            .await
    }

    pub async fn test_run(&self, id: u64) -> Result<Value> {
        self.client
            .get(&self.path(&format!("api/testrun/{id}")))
            .await
    }

    /// Sets a run to a status name such as `PASS`, `FAIL` or `TODO`.
    pub async fn update_test_run_status(&self, id: u64, status: &str) -> Result<()> {
        let options = RequestOptions::new().query("status", status);
        self.client
            .send::<Value>(
                Method::PUT,
                &self.path(&format!("api/testrun/{id}/status")),
                Payload::Empty,
                &options,
            )
            .await?;
        Ok(())
    }

    pub async fn test_plans(&self, test_key: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("api/test/{test_key}/testplans")))
            .await
    }

    pub async fn tests_in_plan(&self, plan_key: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("api/testplan/{plan_key}/test")))
            .await
    }

    pub async fn update_test_plan(
        &self,
        plan_key: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<Option<Value>> {
        self.client
            .post(
                &self.path(&format!("api/testplan/{plan_key}/test")),
                &json!({ "add": add, "remove": remove }),
            )
            .await
    }

    pub async fn test_executions(&self, test_key: &str) -> Result<Vec<Value>> {
        self.client
            .get(&self.path(&format!("api/test/{test_key}/testexecutions")))
            .await
    }

    /// Imports results in Xray JSON format.
    pub async fn import_execution_results(&self, results: &Value) -> Result<Option<Value>> {
        self.client
            .post(&self.path("import/execution"), results)
            .await
    }
}
