//! Integration tests for the Selectel clients using wiremock
//!
//! These tests run the identity handshake, catalog lookup, global router
//! listing and per-region quota updates against mocked endpoints.

use selvpc::resource::lookup::{find_service, find_zone, FilterQuery};
use selvpc::resource::manifest::{parse_declaration, ManifestFormat};
use selvpc::resource::quota::{apply_quota_updates, QuotaDeclaration};
use selvpc::selectel::auth::Credentials;
use selvpc::selectel::client::ClientFactory;
use selvpc::selectel::context::RequestContext;
use selvpc::selectel::global_router::GlobalRouterClient;
use selvpc::selectel::projects::{list_projects, ProjectQuotaApi};
use selvpc::ProviderError;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT_ID: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90";
const ISSUED_TOKEN: &str = "issued-token";

fn catalog(server: &MockServer) -> Value {
    json!([
        {
            "type": "quota-manager",
            "name": "quota-manager",
            "endpoints": [
                {"interface": "public", "region_id": "ru-1", "url": format!("{}/quota-manager/ru-1/", server.uri())},
                {"interface": "public", "region_id": "ru-2", "url": format!("{}/quota-manager/ru-2", server.uri())}
            ]
        },
        {
            "type": "global-router",
            "name": "global-router",
            "endpoints": [
                {"interface": "public", "region_id": "ru-1", "url": format!("{}/global-router/v1", server.uri())}
            ]
        }
    ])
}

fn password_credentials(server: &MockServer) -> Credentials {
    Credentials {
        username: "user".to_string(),
        password: "secret".to_string(),
        domain_name: "123456".to_string(),
        auth_url: format!("{}/identity/v3", server.uri()),
        endpoint: format!("{}/resell/v2", server.uri()),
        ..Default::default()
    }
}

fn token_credentials(server: &MockServer) -> Credentials {
    Credentials {
        token: "static-token".to_string(),
        auth_url: format!("{}/identity/v3/", server.uri()),
        endpoint: format!("{}/resell/v2", server.uri()),
        ..Default::default()
    }
}

async fn mount_project_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/identity/v3/auth/tokens"))
        .and(body_partial_json(json!({
            "auth": {
                "identity": {"methods": ["password"]},
                "scope": {"project": {"id": PROJECT_ID}}
            }
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Subject-Token", ISSUED_TOKEN)
                .set_body_json(json!({
                    "token": {
                        "expires_at": "2030-01-01T00:00:00Z",
                        "project": {"id": PROJECT_ID},
                        "catalog": catalog(server)
                    }
                })),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Module for identity and catalog tests
mod auth_tests {
    use super::*;

    /// Password credentials scoped to a project yield the issued token and catalog
    #[tokio::test]
    async fn test_project_client_with_password() {
        let server = MockServer::start().await;
        mount_project_auth(&server).await;

        let factory = ClientFactory::new(password_credentials(&server)).unwrap();
        let client = factory
            .project_client(&RequestContext::background(), PROJECT_ID)
            .await
            .expect("Authentication should succeed");

        assert_eq!(client.project_id(), Some(PROJECT_ID));
        assert_eq!(client.session().token, ISSUED_TOKEN);
        assert!(!client.session().is_expired());

        let url = client.resolve_endpoint("quota-manager", "ru-2").unwrap();
        assert_eq!(url.as_str(), format!("{}/quota-manager/ru-2", server.uri()));
    }

    /// A pre-issued token at account scope only fetches the catalog
    #[tokio::test]
    async fn test_account_client_with_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/identity/v3/auth/catalog"))
            .and(header("X-Auth-Token", "static-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "catalog": catalog(&server)
            })))
            .expect(1)
            .mount(&server)
            .await;

        let factory = ClientFactory::new(token_credentials(&server)).unwrap();
        let client = factory
            .account_client(&RequestContext::background())
            .await
            .expect("Catalog fetch should succeed");

        assert_eq!(client.project_id(), None);
        assert_eq!(client.session().token, "static-token");
        assert_eq!(client.catalog().regions("quota-manager"), vec!["ru-1", "ru-2"]);
    }

    /// A pre-issued token scoped to a project is exchanged via the token method
    #[tokio::test]
    async fn test_project_client_with_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/identity/v3/auth/tokens"))
            .and(header("X-Auth-Token", "static-token"))
            .and(body_partial_json(json!({
                "auth": {"identity": {"methods": ["token"], "token": {"id": "static-token"}}}
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("X-Subject-Token", "project-token")
                    .set_body_json(json!({"token": {"catalog": []}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let factory = ClientFactory::new(token_credentials(&server)).unwrap();
        let client = factory
            .project_client(&RequestContext::background(), PROJECT_ID)
            .await
            .unwrap();

        assert_eq!(client.session().token, "project-token");
        assert!(matches!(
            client.resolve_endpoint("dns", "ru-1"),
            Err(ProviderError::EndpointNotFound { .. })
        ));
    }

    /// An unknown project is reported as an authentication error
    #[tokio::test]
    async fn test_unknown_project_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/identity/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": 401, "message": "The request you have made requires authentication."}
            })))
            .mount(&server)
            .await;

        let factory = ClientFactory::new(password_credentials(&server)).unwrap();
        let err = factory
            .project_client(&RequestContext::background(), PROJECT_ID)
            .await
            .err()
            .expect("Authentication should fail");

        match err {
            ProviderError::Auth(msg) => {
                assert!(msg.contains(PROJECT_ID));
                assert!(msg.contains("requires authentication"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Missing token header is an invalid response, not a panic
    #[tokio::test]
    async fn test_missing_subject_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/identity/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"token": {"catalog": []}})),
            )
            .mount(&server)
            .await;

        let factory = ClientFactory::new(password_credentials(&server)).unwrap();
        let err = factory
            .account_client(&RequestContext::background())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    /// Slow identity responses hit the request deadline
    #[tokio::test]
    async fn test_deadline_exceeded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/identity/v3/auth/catalog"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"catalog": []}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let factory = ClientFactory::new(token_credentials(&server)).unwrap();
        let ctx = RequestContext::with_timeout(Duration::from_millis(100));
        let err = factory.account_client(&ctx).await.err().unwrap();
        assert!(matches!(err, ProviderError::DeadlineExceeded(_)));
    }
}

/// Module for quota apply tests
mod quota_tests {
    use super::*;

    fn declaration() -> QuotaDeclaration {
        parse_declaration(
            r#"
quotas:
  - resource_name: volume_gigabytes_basic
    resource_quotas:
      - region: ru-2
        zone: ru-2a
        value: 2
  - resource_name: compute_cores
    resource_quotas:
      - region: ru-2
        zone: ru-2b
        value: 6
      - region: ru-1
        zone: ru-1b
        value: 4
"#,
            ManifestFormat::Yaml,
        )
        .unwrap()
    }

    /// Two resources across two regions produce exactly two update calls
    #[tokio::test]
    async fn test_apply_two_regions() {
        let server = MockServer::start().await;
        mount_project_auth(&server).await;

        Mock::given(method("PATCH"))
            .and(path(format!("/quota-manager/ru-1/projects/{}/quotas", PROJECT_ID)))
            .and(header("X-Auth-Token", ISSUED_TOKEN))
            .and(body_json(json!({
                "quotas": [
                    {"name": "compute_cores", "resource_quotas": [{"zone": "ru-1b", "value": 4}]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quotas": []})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path(format!("/quota-manager/ru-2/projects/{}/quotas", PROJECT_ID)))
            .and(header("X-Auth-Token", ISSUED_TOKEN))
            .and(body_json(json!({
                "quotas": [
                    {"name": "compute_cores", "resource_quotas": [{"zone": "ru-2b", "value": 6}]},
                    {"name": "volume_gigabytes_basic", "resource_quotas": [{"zone": "ru-2a", "value": 2}]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quotas": []})))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = RequestContext::background();
        let factory = ClientFactory::new(password_credentials(&server)).unwrap();
        let client = factory.project_client(&ctx, PROJECT_ID).await.unwrap();

        let updates = declaration().reconcile().unwrap();
        let applied = apply_quota_updates(&client, &ctx, PROJECT_ID, &updates)
            .await
            .expect("Both regions should be updated");

        assert_eq!(applied, vec!["ru-1", "ru-2"]);
    }

    /// A failing region is reported; earlier regions stay applied
    #[tokio::test]
    async fn test_apply_partial_failure() {
        let server = MockServer::start().await;
        mount_project_auth(&server).await;

        Mock::given(method("PATCH"))
            .and(path(format!("/quota-manager/ru-1/projects/{}/quotas", PROJECT_ID)))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path(format!("/quota-manager/ru-2/projects/{}/quotas", PROJECT_ID)))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"error": "quota is lower than usage"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = RequestContext::background();
        let factory = ClientFactory::new(password_credentials(&server)).unwrap();
        let client = factory.project_client(&ctx, PROJECT_ID).await.unwrap();

        let updates = declaration().reconcile().unwrap();
        let err = apply_quota_updates(&client, &ctx, PROJECT_ID, &updates)
            .await
            .unwrap_err();

        assert_eq!(err.applied, vec!["ru-1"]);
        assert_eq!(err.failed_region, "ru-2");
        match err.source {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "quota is lower than usage");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Reading quotas back parses the quota manager response
    #[tokio::test]
    async fn test_get_project_quotas() {
        let server = MockServer::start().await;
        mount_project_auth(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/quota-manager/ru-1/projects/{}/quotas", PROJECT_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quotas": [{
                    "name": "compute_cores",
                    "resource_quotas": [{"zone": "ru-1b", "value": 4, "used": 1}]
                }]
            })))
            .mount(&server)
            .await;

        let ctx = RequestContext::background();
        let factory = ClientFactory::new(password_credentials(&server)).unwrap();
        let client = factory.project_client(&ctx, PROJECT_ID).await.unwrap();

        let quotas = client.get_project_quotas(&ctx, PROJECT_ID, "ru-1").await.unwrap();
        assert_eq!(quotas.len(), 1);
        assert_eq!(quotas[0].resource_quotas[0].value, Some(4));

        let err = client.get_project_quotas(&ctx, PROJECT_ID, "ru-9").await.unwrap_err();
        assert!(matches!(err, ProviderError::EndpointNotFound { .. }));
    }
}

/// Module for global router lookups and resell API listing
mod lookup_tests {
    use super::*;

    async fn mount_catalog(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/identity/v3/auth/catalog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "catalog": catalog(server)
            })))
            .mount(server)
            .await;
    }

    /// The service dimension is re-checked after a name-only listing
    #[tokio::test]
    async fn test_find_zone_by_name_and_service() {
        let server = MockServer::start().await;
        mount_catalog(&server).await;

        Mock::given(method("GET"))
            .and(path("/global-router/v1/zones"))
            .and(query_param("name", "ru-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "zones": [
                    {"id": "z-vpc", "name": "ru-1", "service": "vpc"},
                    {"id": "z-ded", "name": "ru-1", "service": "dedicated"}
                ]
            })))
            .mount(&server)
            .await;

        let ctx = RequestContext::background();
        let factory = ClientFactory::new(token_credentials(&server)).unwrap();
        let router = GlobalRouterClient::new(factory.account_client(&ctx).await.unwrap());

        let zone = find_zone(&router, &ctx, &FilterQuery::new("ru-1").with_service("dedicated"))
            .await
            .unwrap();
        assert_eq!(zone.id, "z-ded");

        let err = find_zone(&router, &ctx, &FilterQuery::new("ru-1").with_service("s3"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "your query returned no results. please change your search criteria and try again"
        );
    }

    /// Duplicate service names are ambiguous
    #[tokio::test]
    async fn test_find_service_ambiguous() {
        let server = MockServer::start().await;
        mount_catalog(&server).await;

        Mock::given(method("GET"))
            .and(path("/global-router/v1/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "services": [
                    {"id": "s1", "name": "vpc"},
                    {"id": "s2", "name": "vpc"}
                ]
            })))
            .mount(&server)
            .await;

        let ctx = RequestContext::background();
        let factory = ClientFactory::new(token_credentials(&server)).unwrap();
        let router = GlobalRouterClient::new(factory.account_client(&ctx).await.unwrap());

        let err = find_service(&router, &ctx, &FilterQuery::new("vpc")).await.unwrap_err();
        assert!(matches!(err, ProviderError::MultipleResults));
    }

    /// Projects are listed from the resell API with the session token
    #[tokio::test]
    async fn test_list_projects() {
        let server = MockServer::start().await;
        mount_catalog(&server).await;

        Mock::given(method("GET"))
            .and(path("/resell/v2/projects"))
            .and(header("X-Auth-Token", "static-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": [
                    {"id": PROJECT_ID, "name": "main", "enabled": true}
                ]
            })))
            .mount(&server)
            .await;

        let ctx = RequestContext::background();
        let factory = ClientFactory::new(token_credentials(&server)).unwrap();
        let client = factory.account_client(&ctx).await.unwrap();

        let projects = list_projects(&client, &ctx).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "main");
        assert!(projects[0].enabled);
    }
}
