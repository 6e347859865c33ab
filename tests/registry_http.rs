//! # Registry HTTP Client Tests
//!
//! Exercises the reqwest registry client against a wiremock registry: status
//! policy, headers, the list cache, and API key resolution.

mod common;

use common::{init_rustls, secret, FakeStore};
use oauth2_client_controller::controller::reconciler::ClusterStore;
use oauth2_client_controller::crd::ApiKeySecretRef;
use oauth2_client_controller::registry::{
    CachingRegistryClient, EndpointKey, HttpClientFactory, HttpOptions, HttpRegistryClient,
    OAuth2ClientRecord, RegistryClient, RegistryClientFactory, RegistryError, ResolvedEndpoint,
};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn endpoint_key(server: &MockServer, forwarded_proto: Option<&str>) -> EndpointKey {
    let uri = Url::parse(&server.uri()).unwrap();
    EndpointKey {
        url: format!("http://{}", uri.host_str().unwrap()),
        port: uri.port().unwrap(),
        endpoint: "/clients".to_string(),
        forwarded_proto: forwarded_proto.map(str::to_string),
    }
}

fn options() -> HttpOptions {
    HttpOptions {
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn client(server: &MockServer) -> HttpRegistryClient {
    init_rustls();
    HttpRegistryClient::new(&endpoint_key(server, None), None, &options()).unwrap()
}

fn record_json(id: &str, owner: &str) -> serde_json::Value {
    json!({
        "client_id": id,
        "client_name": "",
        "grant_types": ["client_credentials"],
        "response_types": null,
        "redirect_uris": null,
        "scope": "read",
        "owner": owner,
        "created_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn test_get_sends_configured_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .and(header("accept", "application/json"))
        .and(header("x-forwarded-proto", "https"))
        .and(header("authorization", "Bearer admin-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc", "default/web")))
        .expect(1)
        .mount(&server)
        .await;

    init_rustls();
    let registry = HttpRegistryClient::new(
        &endpoint_key(&server, Some("https")),
        Some("admin-token".to_string()),
        &options(),
    )
    .unwrap();

    let record = registry.get("abc").await.unwrap().unwrap();
    assert_eq!(record.client_id.as_deref(), Some("abc"));
    assert_eq!(record.owner, "default/web");
    assert!(record.redirect_uris.is_empty());
}

#[tokio::test]
async fn test_optional_headers_omitted_when_unset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .and(|request: &Request| {
            !request.headers.contains_key("x-forwarded-proto")
                && !request.headers.contains_key("authorization")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc", "default/web")))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).get("abc").await.unwrap().is_some());
}

#[tokio::test]
async fn test_get_not_found_and_unauthorized_mean_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clients/hidden"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let registry = client(&server);
    assert!(registry.get("missing").await.unwrap().is_none());
    assert!(registry.get("hidden").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_server_error_is_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server).get("abc").await.unwrap_err();
    assert!(matches!(err, RegistryError::UnexpectedStatus { method: "GET", .. }));
}

#[tokio::test]
async fn test_list_decodes_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            record_json("a", "default/web"),
            record_json("b", "default/api")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server).list().await.unwrap();
    let owners: Vec<_> = records.iter().map(|r| r.owner.as_str()).collect();
    assert_eq!(owners, vec!["default/web", "default/api"]);
}

#[tokio::test]
async fn test_create_posts_record_and_returns_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients"))
        .and(body_partial_json(json!({
            "grant_types": ["client_credentials"],
            "scope": "read write",
            "owner": "default/web"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "client_id": "generated",
            "client_secret": "generated-secret",
            "grant_types": ["client_credentials"],
            "scope": "read write",
            "owner": "default/web"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = OAuth2ClientRecord {
        grant_types: vec!["client_credentials".to_string()],
        scope: "read write".to_string(),
        owner: "default/web".to_string(),
        ..Default::default()
    };
    let created = client(&server).create(&record).await.unwrap();
    assert_eq!(created.client_id.as_deref(), Some("generated"));
    assert_eq!(created.client_secret.as_deref(), Some("generated-secret"));
}

#[tokio::test]
async fn test_create_conflict_is_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let record = OAuth2ClientRecord {
        client_id: Some("taken".to_string()),
        ..Default::default()
    };
    let err = client(&server).create(&record).await.unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { .. }));
    assert!(err.to_string().contains("requested ID already exists"));
}

#[tokio::test]
async fn test_update_puts_to_record_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/clients/abc"))
        .and(body_partial_json(json!({"client_id": "abc", "client_secret": "s3cret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc", "default/web")))
        .expect(1)
        .mount(&server)
        .await;

    let record = OAuth2ClientRecord {
        client_id: Some("abc".to_string()),
        client_secret: Some("s3cret".to_string()),
        owner: "default/web".to_string(),
        ..Default::default()
    };
    client(&server).update(&record).await.unwrap();
}

#[tokio::test]
async fn test_update_without_id_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .update(&OAuth2ClientRecord::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::MissingClientId));
}

#[tokio::test]
async fn test_delete_accepts_no_content_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/clients/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/clients/locked"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = client(&server);
    registry.delete("abc").await.unwrap();
    registry.delete("gone").await.unwrap();
    assert!(matches!(
        registry.delete("locked").await,
        Err(RegistryError::UnexpectedStatus { method: "DELETE", .. })
    ));
}

#[tokio::test]
async fn test_list_after_delete_goes_back_to_registry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            record_json("a", "default/web"),
            record_json("b", "default/api")
        ])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clients"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([record_json("b", "default/api")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/clients/a"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let cached = CachingRegistryClient::new(Arc::new(client(&server)), Duration::from_secs(60));

    assert_eq!(cached.list().await.unwrap().len(), 2);
    assert_eq!(cached.list().await.unwrap().len(), 2);

    cached.delete("a").await.unwrap();

    let after = cached.list().await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].client_id.as_deref(), Some("b"));

    server.verify().await;
}

fn resolved(server: &MockServer, api_key_ref: Option<ApiKeySecretRef>) -> ResolvedEndpoint {
    ResolvedEndpoint {
        key: endpoint_key(server, None),
        api_key_ref,
    }
}

fn key_ref() -> ApiKeySecretRef {
    ApiKeySecretRef {
        name: "registry-key".to_string(),
        namespace: Some("default".to_string()),
        key: "token".to_string(),
    }
}

#[tokio::test]
async fn test_factory_reads_api_key_from_secret() {
    init_rustls();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .and(header("authorization", "Bearer from-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc", "default/web")))
        .expect(1)
        .mount(&server)
        .await;

    let store = FakeStore::new();
    store.insert_secret(secret("default", "registry-key", &[("token", "from-secret")]));
    let factory = HttpClientFactory::new(
        Arc::clone(&store) as Arc<dyn ClusterStore>,
        options(),
        Duration::from_secs(5),
        None,
    );

    let registry = factory.build(&resolved(&server, Some(key_ref()))).await.unwrap();
    assert!(registry.get("abc").await.unwrap().is_some());
}

#[tokio::test]
async fn test_factory_api_key_override_wins() {
    init_rustls();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .and(header("authorization", "Bearer operator-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc", "default/web")))
        .expect(1)
        .mount(&server)
        .await;

    let store = FakeStore::new();
    store.insert_secret(secret("default", "registry-key", &[("token", "from-secret")]));
    let factory = HttpClientFactory::new(
        Arc::clone(&store) as Arc<dyn ClusterStore>,
        options(),
        Duration::from_secs(5),
        Some("operator-token".to_string()),
    );

    let registry = factory.build(&resolved(&server, Some(key_ref()))).await.unwrap();
    assert!(registry.get("abc").await.unwrap().is_some());
}

#[tokio::test]
async fn test_factory_missing_api_key_secret_is_endpoint_error() {
    init_rustls();
    let server = MockServer::start().await;
    let store = FakeStore::new();
    let factory = HttpClientFactory::new(
        Arc::clone(&store) as Arc<dyn ClusterStore>,
        options(),
        Duration::from_secs(5),
        None,
    );

    let err = factory
        .build(&resolved(&server, Some(key_ref())))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ApiKey(_)));

    store.insert_secret(secret("default", "registry-key", &[("other", "x")]));
    let err = factory
        .build(&resolved(&server, Some(key_ref())))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ApiKey(_)));
}

#[tokio::test]
async fn test_factory_secret_read_failure_is_transient() {
    init_rustls();
    let server = MockServer::start().await;
    let store = FakeStore::new();
    store
        .fail_secret_reads
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let factory = HttpClientFactory::new(
        Arc::clone(&store) as Arc<dyn ClusterStore>,
        options(),
        Duration::from_secs(5),
        None,
    );

    let err = factory
        .build(&resolved(&server, Some(key_ref())))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ApiKeyLookup(_)));
}
