use atlassian_rest_api::{ApiClient, ConnectionContext};
use atlassian_rest_products::marketplace::AddonQuery;
use atlassian_rest_products::{CloudAdmin, Marketplace, StatusPage};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_statuspage_uses_oauth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/pages/abc/incidents/unresolved"))
        .and(header("authorization", "OAuth key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "inc1", "status": "investigating"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let statuspage = StatusPage::with_api_key(&mock_server.uri(), "key-123").unwrap();
    let incidents = statuspage.unresolved_incidents("abc").await.unwrap();

    assert_eq!(incidents[0]["status"], "investigating");
}

#[tokio::test]
async fn test_statuspage_update_page_patches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/pages/abc"))
        .and(body_json(json!({"page": {"name": "Acme status"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc",
            "name": "Acme status"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let statuspage = StatusPage::with_api_key(&mock_server.uri(), "key-123").unwrap();
    let page = statuspage
        .update_page("abc", json!({"name": "Acme status"}))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(page["name"], "Acme status");
}

#[tokio::test]
async fn test_marketplace_addons_stop_at_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/2/addons"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"next": {"href": "/rest/2/addons?offset=4&text=jira"}},
            "_embedded": {"addons": [{"key": "c"}, {"key": "d"}]},
            "count": 6
        })))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/2/addons"))
        .and(query_param("text", "jira"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"next": {"href": "/rest/2/addons?offset=2&text=jira"}},
            "_embedded": {"addons": [{"key": "a"}, {"key": "b"}]},
            "count": 6
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let marketplace = Marketplace::new(ApiClient::new(mock_server.uri()).unwrap());
    let query = AddonQuery {
        text: Some("jira"),
        limit: Some(3),
        ..Default::default()
    };
    let addons = marketplace.addons(&query).await.unwrap();

    let keys: Vec<_> = addons.iter().map(|a| a["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_orgs_follow_absolute_links() {
    let mock_server = MockServer::start().await;
    let next = format!("{}/admin/v1/orgs?cursor=page2", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/admin/v1/orgs"))
        .and(query_param("cursor", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "org-2", "type": "orgs"}],
            "links": {}
        })))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/v1/orgs"))
        .and(header("authorization", "Bearer admin-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "org-1", "type": "orgs"}],
            "links": {"next": next}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = ConnectionContext::new(mock_server.uri())
        .unwrap()
        .with_cloud(true)
        .with_bearer_token("admin-key");
    let admin = CloudAdmin::new(ApiClient::from_context(context).unwrap());

    let orgs = admin.orgs().await.unwrap();
    let ids: Vec<_> = orgs.iter().map(|o| o["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["org-1", "org-2"]);
}

#[tokio::test]
async fn test_admin_org_unwraps_data_and_disables_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/v1/orgs/org-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "org-1", "attributes": {"name": "Acme"}}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/acc-1/manage/lifecycle/disable"))
        .and(body_json(json!({"message": "Left the company"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let admin = CloudAdmin::new(
        ApiClient::new(mock_server.uri())
            .unwrap()
            .with_bearer_token("admin-key"),
    );

    let org = admin.org("org-1").await.unwrap();
    assert_eq!(org["attributes"]["name"], "Acme");

    admin
        .disable_user("acc-1", Some("Left the company"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_admin_version_override_leaves_users_root_alone() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/v2/orgs/org-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "org-1"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/acc-1/manage/lifecycle/enable"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = ConnectionContext::new(mock_server.uri())
        .unwrap()
        .with_cloud(true)
        .with_api_version("v2")
        .with_bearer_token("admin-key");
    let admin = CloudAdmin::new(ApiClient::from_context(context).unwrap());

    let org = admin.org("org-1").await.unwrap();
    assert_eq!(org["id"], "org-1");

    admin.enable_user("acc-1").await.unwrap();
}
