//! BloodHound API client tests against a mock server.

use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vhound_bloodhound::{BloodHoundClient, BloodHoundConfig, BloodHoundError};

fn config(base_url: &str) -> BloodHoundConfig {
    BloodHoundConfig {
        base_url: base_url.to_string(),
        token_id: "token-id".to_string(),
        token_secret: "token-secret".to_string(),
        insecure: false,
    }
}

#[tokio::test]
async fn available_domains_sends_signed_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/available-domains"))
        .and(header_exists("Authorization"))
        .and(header_exists("RequestDate"))
        .and(header_exists("Signature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"name": "corp.local", "type": "active-directory", "collected": true},
                {"name": "child.corp.local", "type": "active-directory", "collected": false}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BloodHoundClient::new(&config(&server.uri())).unwrap();
    let domains = client.available_domains().await.unwrap();
    assert_eq!(domains.len(), 2);
    assert_eq!(domains[0].name, "corp.local");
    assert!(domains[0].collected);

    let received = server.received_requests().await.unwrap();
    let auth = received[0].headers.get("Authorization").unwrap();
    assert_eq!(auth.to_str().unwrap(), "bhesignature token-id");
}

#[tokio::test]
async fn domain_map_keys_only_the_short_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/available-domains"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"name": "corp.local", "type": "active-directory"},
                {"name": "azure-tenant", "type": "azure"}
            ]
        })))
        .mount(&server)
        .await;

    let client = BloodHoundClient::new(&config(&server.uri())).unwrap();
    let map = client.domain_map().await.unwrap();

    assert_eq!(map.get("CORP").map(String::as_str), Some("CORP.LOCAL"));
    assert!(
        !map.contains_key("CORP.LOCAL"),
        "only the first DNS label is keyed"
    );
    assert!(!map.contains_key("AZURE-TENANT"), "non-AD domains are excluded");
}

#[tokio::test]
async fn api_error_status_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/available-domains"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let client = BloodHoundClient::new(&config(&server.uri())).unwrap();
    let err = client.available_domains().await.unwrap_err();
    match err {
        BloodHoundError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "unauthorized");
        }
        other => panic!("expected api error, got {other}"),
    }
}

#[test]
fn empty_token_is_rejected() {
    let mut cfg = config("https://bloodhound.example.com");
    cfg.token_secret = String::new();
    let err = BloodHoundClient::new(&cfg).unwrap_err();
    assert!(matches!(err, BloodHoundError::InvalidConfiguration { .. }));
}
