use atlassian_rest_api::{ApiClient, ApiLayout, Paginator, Payload, RequestOptions, Result};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};

pub const LAYOUT: ApiLayout = ApiLayout::uniform("rest/servicedeskapi", "");

/// Endpoints still flagged experimental refuse calls without this opt-in.
fn experimental() -> RequestOptions {
    RequestOptions::new().header(
        HeaderName::from_static("x-experimentalapi"),
        HeaderValue::from_static("opt-in"),
    )
}

#[derive(Clone)]
pub struct ServiceDesk {
    client: ApiClient,
}

impl ServiceDesk {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&LAYOUT, resource)
    }

    /// Service Desk envelopes carry `isLastPage` but no `nextPageStart`;
    /// they are walked through `_links.next`.
    async fn walk(&self, resource: &str, options: RequestOptions) -> Result<Vec<Value>> {
        self.client
            .cursor_pages::<Value>(self.path(resource))
            .options(options)
            .items_key("values")
            .next_pointer("/_links/next")
            .fetch_all()
            .await
    }

    pub async fn info(&self) -> Result<Value> {
        self.client.get(&self.path("info")).await
    }

    pub async fn service_desks(&self) -> Result<Vec<Value>> {
        self.walk("servicedesk", RequestOptions::new()).await
    }

    pub async fn service_desk(&self, id: &str) -> Result<Value> {
        self.client
            .get(&self.path(&format!("servicedesk/{id}")))
            .await
    }

    pub async fn request_types(&self, service_desk_id: &str) -> Result<Vec<Value>> {
        self.walk(
            &format!("servicedesk/{service_desk_id}/requesttype"),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn create_customer_request(
        &self,
        service_desk_id: &str,
        request_type_id: &str,
        values: Value,
        raise_on_behalf_of: Option<&str>,
    ) -> Result<Option<Value>> {
        let mut body = json!({
            "serviceDeskId": service_desk_id,
            "requestTypeId": request_type_id,
            "requestFieldValues": values,
        });
        if let Some(customer) = raise_on_behalf_of {
            body["raiseOnBehalfOf"] = json!(customer);
        }
        self.client.post(&self.path("request"), &body).await
    }

    pub async fn customer_request(&self, issue_key: &str) -> Result<Value> {
        self.client
            .get(&self.path(&format!("request/{issue_key}")))
            .await
    }

    pub async fn add_request_comment(
        &self,
        issue_key: &str,
        body: &str,
        public: bool,
    ) -> Result<Option<Value>> {
        self.client
            .post(
                &self.path(&format!("request/{issue_key}/comment")),
                &json!({ "body": body, "public": public }),
            )
            .await
    }

    pub async fn create_customer(&self, email: &str, display_name: &str) -> Result<Option<Value>> {
        let name_field = if self.client.is_cloud() {
            "displayName"
        } else {
            "fullName"
        };
        let mut body = json!({ "email": email });
        body[name_field] = json!(display_name);
        self.client
            .send(
                Method::POST,
                &self.path("customer"),
                Payload::json(&body)?,
                &experimental(),
            )
            .await
    }

    pub async fn queues(&self, service_desk_id: &str, include_count: bool) -> Result<Vec<Value>> {
        let options = experimental().query("includeCount", include_count);
        self.walk(&format!("servicedesk/{service_desk_id}/queue"), options)
            .await
    }

    /// Adds existing customers to a service desk. Cloud expects account ids,
    /// Server usernames.
    pub async fn add_customers(&self, service_desk_id: &str, customers: &[&str]) -> Result<()> {
        let key = if self.client.is_cloud() {
            "accountIds"
        } else {
            "usernames"
        };
        let mut body = json!({});
        body[key] = json!(customers);
        self.client
            .send::<Value>(
                Method::POST,
                &self.path(&format!("servicedesk/{service_desk_id}/customer")),
                Payload::json(&body)?,
                &experimental(),
            )
            .await?;
        Ok(())
    }

    pub async fn request_sla(&self, issue_key: &str) -> Result<Vec<Value>> {
        self.walk(&format!("request/{issue_key}/sla"), RequestOptions::new())
            .await
    }

    /// Organizations of one service desk, or of the whole site.
    pub async fn organizations(&self, service_desk_id: Option<&str>) -> Result<Vec<Value>> {
        let resource = match service_desk_id {
            Some(id) => format!("servicedesk/{id}/organization"),
            None => "organization".to_string(),
        };
        self.walk(&resource, RequestOptions::new()).await
    }
}
