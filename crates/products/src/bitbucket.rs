use atlassian_rest_api::{
    join_segments, ApiClient, ApiLayout, ApiRoot, ConnectionContext, Paginator, Payload,
    RequestOptions, ResourceUrl, Result,
};
use reqwest::Method;
use serde_json::{json, Value};

pub const LAYOUT: ApiLayout =
    ApiLayout::new(ApiRoot::new("rest/api", "1.0"), ApiRoot::new("rest/api", "2.0"));

const BRANCH_UTILS_ROOT: &str = "rest/branch-utils/1.0";
const CLOUD_API_HOST: &str = "api.bitbucket.org";

/// Server and Data Center serve `rest/api/1.0`. Cloud serves `rest/api/2.0`,
/// except on `api.bitbucket.org` where the version sits at the root.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitbucketUrls;

impl ResourceUrl for BitbucketUrls {
    fn resource_path(&self, ctx: &ConnectionContext, resource: &str) -> String {
        let api_host = ctx.base_url().host_str() == Some(CLOUD_API_HOST);
        if ctx.is_cloud() && api_host && ctx.api_root().is_none() {
            let version = ctx.api_version().unwrap_or(LAYOUT.cloud.version);
            join_segments(&[version, resource])
        } else {
            LAYOUT.resource_path(ctx, resource)
        }
    }
}

#[derive(Clone)]
pub struct Bitbucket {
    client: ApiClient,
}

impl Bitbucket {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn path(&self, resource: &str) -> String {
        self.client.resource_path(&BitbucketUrls, resource)
    }

    /// Server envelopes page by `start`/`nextPageStart`, Cloud ones by `next` links.
    async fn walk(&self, resource: &str, options: RequestOptions) -> Result<Vec<Value>> {
        let path = self.path(resource);
        if self.client.is_cloud() {
            self.client
                .cursor_pages::<Value>(path)
                .options(options)
                .fetch_all()
                .await
        } else {
            self.client
                .offset_pages::<Value>(path)
                .options(options)
                .fetch_all()
                .await
        }
    }

    pub async fn projects(&self) -> Result<Vec<Value>> {
        self.walk("projects", RequestOptions::new()).await
    }

    pub async fn project(&self, key: &str) -> Result<Value> {
        self.client.get(&self.path(&format!("projects/{key}"))).await
    }

    pub async fn create_project(
        &self,
        key: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Value>> {
        let mut body = json!({ "key": key, "name": name });
        if let Some(description) = description {
            body["description"] = json!(description);
        }
        self.client.post(&self.path("projects"), &body).await
    }

    pub async fn repos(&self, project_key: &str) -> Result<Vec<Value>> {
        self.walk(&format!("projects/{project_key}/repos"), RequestOptions::new())
            .await
    }

    pub async fn repo(&self, project_key: &str, slug: &str) -> Result<Value> {
        self.client
            .get(&self.path(&format!("projects/{project_key}/repos/{slug}")))
            .await
    }

    pub async fn branches(
        &self,
        project_key: &str,
        slug: &str,
        filter: Option<&str>,
    ) -> Result<Vec<Value>> {
        let options = RequestOptions::new().query_opt("filterText", filter);
        self.walk(
            &format!("projects/{project_key}/repos/{slug}/branches"),
            options,
        )
        .await
    }

    /// Pull requests in `state` (`OPEN`, `MERGED`, `DECLINED` or `ALL`).
    pub async fn pull_requests(
        &self,
        project_key: &str,
        slug: &str,
        state: &str,
    ) -> Result<Vec<Value>> {
        let options = RequestOptions::new().query("state", state);
        self.walk(
            &format!("projects/{project_key}/repos/{slug}/pull-requests"),
            options,
        )
        .await
    }

    pub async fn pull_request(&self, project_key: &str, slug: &str, id: u64) -> Result<Value> {
        self.client
            .get(&self.path(&format!(
                "projects/{project_key}/repos/{slug}/pull-requests/{id}"
            )))
            .await
    }

    /// Changed files of a pull request. Large diffs come back truncated
    /// without `nextPageStart`; whatever was listed is returned.
    pub async fn pull_request_changes(
        &self,
        project_key: &str,
        slug: &str,
        id: u64,
    ) -> Result<Vec<Value>> {
        self.walk(
            &format!("projects/{project_key}/repos/{slug}/pull-requests/{id}/changes"),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn open_pull_request(
        &self,
        project_key: &str,
        slug: &str,
        title: &str,
        description: Option<&str>,
        from_branch: &str,
        to_branch: &str,
        reviewers: &[&str],
    ) -> Result<Option<Value>> {
        let repository = json!({ "slug": slug, "project": { "key": project_key } });
        let body = json!({
            "title": title,
            "description": description.unwrap_or_default(),
            "state": "OPEN",
            "open": true,
            "closed": false,
            "fromRef": { "id": qualified_branch(from_branch), "repository": repository },
            "toRef": { "id": qualified_branch(to_branch), "repository": repository },
            "reviewers": reviewers
                .iter()
                .map(|name| json!({ "user": { "name": name } }))
                .collect::<Vec<_>>(),
        });
        self.client
            .post(
                &self.path(&format!("projects/{project_key}/repos/{slug}/pull-requests")),
                &body,
            )
            .await
    }

    /// Deletes a branch through the branch-utils plugin. Server/Data Center only.
    pub async fn delete_branch(
        &self,
        project_key: &str,
        slug: &str,
        branch: &str,
        end_point: Option<&str>,
    ) -> Result<()> {
        self.client.require_server("Bitbucket branch deletion")?;

        let mut body = json!({ "name": qualified_branch(branch), "dryRun": false });
        if let Some(end_point) = end_point {
            body["endPoint"] = json!(end_point);
        }
        let resource = format!("projects/{project_key}/repos/{slug}/branches");
        let path = join_segments(&[BRANCH_UTILS_ROOT, resource.as_str()]);
        self.client
            .send::<Value>(
                Method::DELETE,
                &path,
                Payload::json(&body)?,
                &RequestOptions::default(),
            )
            .await?;
        Ok(())
    }

    /// Pipelines of a repository, newest first. Cloud only.
    pub async fn pipelines(&self, workspace: &str, slug: &str) -> Result<Vec<Value>> {
        self.client.require_cloud("Bitbucket pipelines")?;
        let options = RequestOptions::new().query("sort", "-created_on");
        self.walk(&format!("repositories/{workspace}/{slug}/pipelines"), options)
            .await
    }
}

fn qualified_branch(name: &str) -> String {
    if name.starts_with("refs/") {
        name.to_string()
    } else {
        format!("refs/heads/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlassian_rest_api::DeploymentMode;

    fn ctx(url: &str, mode: DeploymentMode) -> ConnectionContext {
        ConnectionContext::new(url).unwrap().with_mode(mode)
    }

    #[test]
    fn test_server_and_cloud_roots() {
        let server = ctx("https://bitbucket.acme.internal", DeploymentMode::Server);
        assert_eq!(
            BitbucketUrls.resource_path(&server, "projects"),
            "rest/api/1.0/projects"
        );

        let cloud = ctx("https://bitbucket.org", DeploymentMode::Cloud);
        assert_eq!(
            BitbucketUrls.resource_path(&cloud, "projects"),
            "rest/api/2.0/projects"
        );
    }

    #[test]
    fn test_api_host_drops_rest_root() {
        let cloud = ctx("https://api.bitbucket.org", DeploymentMode::Cloud);
        assert_eq!(
            BitbucketUrls.resource_path(&cloud, "repositories/acme/app/pipelines"),
            "2.0/repositories/acme/app/pipelines"
        );
    }

    #[test]
    fn test_qualified_branch() {
        assert_eq!(qualified_branch("feature/x"), "refs/heads/feature/x");
        assert_eq!(qualified_branch("refs/heads/main"), "refs/heads/main");
    }
}
