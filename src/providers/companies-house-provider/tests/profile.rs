use companies_house_provider::{CompaniesHouseClient, CompaniesHouseConfig};
use regwatch_core::models::{ApiKey, CompanyNumber};
use regwatch_core::registry::{FetchError, RegistrySource};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// base64("test-key:") — the API key as basic-auth username, empty password.
const EXPECTED_AUTH: &str = "Basic dGVzdC1rZXk6";

fn client_for(server: &MockServer) -> CompaniesHouseClient {
    let config = CompaniesHouseConfig {
        base_url: server.uri(),
        api_key: ApiKey::new("test-key"),
        timeout: Duration::from_millis(500),
    };
    CompaniesHouseClient::new(config).expect("client")
}

#[tokio::test]
async fn success_returns_parsed_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/AB123"))
        .and(header("authorization", EXPECTED_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "company_name": "EXAMPLE LTD",
            "company_status": "active",
            "accounts": {"next_accounts": {"overdue": false}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    // Normalization happens in the identifier type; the request path must
    // carry the canonical form.
    let snapshot = client
        .company_profile(&CompanyNumber::new(" ab123 "))
        .await
        .expect("profile");

    assert_eq!(snapshot.company_name(), Some("EXAMPLE LTD"));
    assert_eq!(
        snapshot.bool_at(&["accounts", "next_accounts", "overdue"]),
        Some(false)
    );
}

#[tokio::test]
async fn unauthorized_maps_to_invalid_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/AB123"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .company_profile(&CompanyNumber::new("AB123"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidAuth));
}

#[tokio::test]
async fn missing_company_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/ZZ999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .company_profile(&CompanyNumber::new("ZZ999"))
        .await
        .unwrap_err();
    match err {
        FetchError::NotFound { company_number } => {
            assert_eq!(company_number.as_str(), "ZZ999");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn bad_request_maps_to_bad_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/AB123"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .company_profile(&CompanyNumber::new("AB123"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::BadRequest));
}

#[tokio::test]
async fn other_http_errors_carry_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/AB123"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .company_profile(&CompanyNumber::new("AB123"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Api { status: 503 }));
}

#[tokio::test]
async fn timeout_maps_to_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/AB123"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .company_profile(&CompanyNumber::new("AB123"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Connection { .. }));
}

#[tokio::test]
async fn refused_connection_maps_to_connection_error() {
    // Nothing listens on the discard port.
    let config = CompaniesHouseConfig {
        base_url: "http://127.0.0.1:9".into(),
        api_key: ApiKey::new("test-key"),
        timeout: Duration::from_millis(500),
    };
    let client = CompaniesHouseClient::new(config).expect("client");

    let err = client
        .company_profile(&CompanyNumber::new("AB123"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Connection { .. }));
}

#[tokio::test]
async fn non_json_success_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/AB123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .company_profile(&CompanyNumber::new("AB123"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Other { .. }));
}
