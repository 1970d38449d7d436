use atlassian_rest_api::{take_array, ApiClient, ApiLayout, Payload, RequestOptions, Result};
use reqwest::Method;
use serde_json::{json, Value};

/// Crowd authenticates the calling *application*; the client credential is
/// the application name and password.
pub const LAYOUT: ApiLayout = ApiLayout::uniform("rest/usermanagement", "1");

/// Fields of a new Crowd user.
#[derive(Debug, Clone, Default)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub display_name: Option<&'a str>,
    pub active: bool,
}

#[derive(Clone)]
pub struct Crowd {
    client: ApiClient,
}

impl Crowd {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&LAYOUT, resource)
    }

    async fn send_unit(
        &self,
        method: Method,
        resource: &str,
        payload: Payload,
        options: &RequestOptions,
    ) -> Result<()> {
        self.client
            .send::<Value>(method, &self.path(resource), payload, options)
            .await?;
        Ok(())
    }

    pub async fn user(&self, username: &str) -> Result<Value> {
        let options = RequestOptions::new()
            .query("username", username)
            .query("expand", "attributes");
        self.client.get_with(&self.path("user"), &options).await
    }

    pub async fn create_user(&self, user: &NewUser<'_>) -> Result<Option<Value>> {
        let display_name = user
            .display_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", user.first_name, user.last_name));
        let body = json!({
            "name": user.username,
            "password": { "value": user.password },
            "active": user.active,
            "first-name": user.first_name,
            "last-name": user.last_name,
            "display-name": display_name,
            "email": user.email,
        });
        self.client.post(&self.path("user"), &body).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let options = RequestOptions::new().query("username", username);
        self.send_unit(Method::DELETE, "user", Payload::Empty, &options)
            .await
    }

    /// Crowd only accepts full user documents on update, so the user is read,
    /// its `active` flag flipped and the document written back.
    pub async fn set_user_active(&self, username: &str, active: bool) -> Result<()> {
        let mut user = self.user(username).await?;
        user["active"] = json!(active);
        let options = RequestOptions::new().query("username", username);
        self.send_unit(Method::PUT, "user", Payload::Json(user), &options)
            .await
    }

    /// Groups the user is a direct member of.
    pub async fn user_groups(&self, username: &str) -> Result<Vec<Value>> {
        let options = RequestOptions::new().query("username", username);
        let envelope: Value = self
            .client
            .get_with(&self.path("user/group/direct"), &options)
            .await?;
        take_array(envelope, "groups")
    }

    pub async fn group_members(
        &self,
        group: &str,
        start_index: u32,
        max_results: u32,
    ) -> Result<Vec<Value>> {
        let options = RequestOptions::new()
            .query("groupname", group)
            .query("start-index", start_index)
            .query("max-results", max_results);
        let envelope: Value = self
            .client
            .get_with(&self.path("group/user/direct"), &options)
            .await?;
        take_array(envelope, "users")
    }

    pub async fn create_group(&self, name: &str, description: Option<&str>) -> Result<Option<Value>> {
        let body = json!({
            "name": name,
            "type": "GROUP",
            "description": description.unwrap_or_default(),
            "active": true,
        });
        self.client.post(&self.path("group"), &body).await
    }

    pub async fn add_user_to_group(&self, username: &str, group: &str) -> Result<()> {
        let options = RequestOptions::new().query("username", username);
        self.send_unit(
            Method::POST,
            "user/group/direct",
            Payload::json(&json!({ "name": group }))?,
            &options,
        )
        .await
    }

    /// Checks a user's password; Crowd answers with the user on success
    /// and a 400 on bad credentials.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Value>> {
        let options = RequestOptions::new().query("username", username);
        self.client
            .send(
                Method::POST,
                &self.path("authentication"),
                Payload::json(&json!({ "value": password }))?,
                &options,
            )
            .await
    }
}
