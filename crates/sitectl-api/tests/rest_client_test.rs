#![allow(clippy::unwrap_used)]
// Integration tests for `RestClient` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sitectl_api::rest::types::CreateSiteRequest;
use sitectl_api::rest::SiteTransition;
use sitectl_api::{Credentials, Error, JobPoller, PollConfig, RestClient, ServerAuth, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let auth = ServerAuth::new(Credentials::Bearer {
        token: SecretString::from("oauth-token".to_owned()),
    });
    let client = RestClient::new(
        Url::parse(&server.uri()).unwrap(),
        auth,
        &TransportConfig::default(),
    )
    .unwrap()
    .with_poll(PollConfig::new(Duration::from_millis(5), 10));
    (server, client)
}

// ── Sites ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_site_by_name_with_expand() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites/management/api/v1/sites/name:Blog"))
        .and(query_param("expand", "channel,repository"))
        .and(header("authorization", "Bearer oauth-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "F1",
            "name": "Blog",
            "isEnterprise": true,
            "defaultLanguage": "en-US",
            "runtimeStatus": "offline",
            "publishStatus": "published",
            "repository": { "id": "R1" },
            "channel": { "id": "C1", "channelTokens": [{ "name": "defaultToken", "token": "abc" }] }
        })))
        .mount(&server)
        .await;

    let site = client
        .get_site("Blog", &["channel", "repository"])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(site.id, "F1");
    assert!(site.is_enterprise);
    assert_eq!(site.channel.unwrap().channel_tokens[0].secret(), Some("abc"));
}

#[tokio::test]
async fn missing_site_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites/management/api/v1/sites/name:nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "title": "Not Found", "detail": "Site nope not found"
        })))
        .mount(&server)
        .await;

    assert!(client.get_site("nope", &[]).await.unwrap().is_none());
    assert!(!client.site_exists("nope").await.unwrap());
}

#[tokio::test]
async fn error_detail_is_surfaced() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/sites/management/api/v1/sites/F1/publish"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "title": "Conflict", "detail": "Site is being published"
        })))
        .mount(&server)
        .await;

    let err = client
        .transition_site("F1", SiteTransition::Publish)
        .await
        .unwrap_err();
    match err {
        Error::Rest { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "Site is being published");
        }
        other => panic!("expected Rest error, got: {other:?}"),
    }
}

#[tokio::test]
async fn accepted_operation_is_polled_to_completion() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/sites/management/api/v1/sites"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("location", "/sites/management/api/v1/sites/.bulk/J7"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites/management/api/v1/sites/.bulk/J7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "progress": "processing", "completedPercentage": 50
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites/management/api/v1/sites/.bulk/J7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "progress": "succeeded", "completed": true, "completedPercentage": 100
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let request = CreateSiteRequest {
        name: "mysite".into(),
        template: "mytemplate".into(),
        template_id: Some("T1".into()),
        ..CreateSiteRequest::default()
    };
    let submission = client.create_site(&request).await.unwrap();
    let job = submission.job_id.unwrap();
    assert!(job.ends_with("/sites/management/api/v1/sites/.bulk/J7"));

    let outcome = JobPoller::new(client.poll_config())
        .await_job(&client, &job, |_| {})
        .await
        .unwrap();
    assert_eq!(outcome.attempts, 2);
}

// ── Content & documents ─────────────────────────────────────────────

#[tokio::test]
async fn repository_lookup_ignores_case() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/content/management/api/v1.1/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "R1", "name": "Marketing" }], "hasMore": false
        })))
        .mount(&server)
        .await;

    let repo = client.repository_by_name("marketing").await.unwrap().unwrap();
    assert_eq!(repo.id, "R1");
    assert!(client.repository_by_name("sales").await.unwrap().is_none());
}

#[tokio::test]
async fn share_uses_post_for_new_and_put_for_existing_members() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/documents/api/1.2/shares/F1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": "0", "role": "viewer", "user": { "id": "U1", "loginName": "alice" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/documents/api/1.2/shares/F1/role"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": "0", "role": "manager", "user": { "id": "U2", "loginName": "carol" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client.share_folder("F1", "U1", "viewer", true).await.unwrap();
    assert!(created.is_success());
    let updated = client.share_folder("F1", "U2", "manager", false).await.unwrap();
    assert_eq!(updated.role.as_deref(), Some("manager"));
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/documents/api/1.2/groups/items"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.groups().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}
