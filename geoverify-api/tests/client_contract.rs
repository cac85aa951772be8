//! Contract tests for the verification backend client.
//!
//! Verify request shape (method, path, headers, body) and how each response
//! form maps onto results and [`ApiError`] variants.

use geoverify_api::{AddGeoTagRequest, ApiClient, ApiConfig, ApiError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    let config = ApiConfig::default().with_base_url(format!("{}/v1/api", server.uri()));
    ApiClient::new(config).expect("client")
}

#[tokio::test]
async fn organization_config_sends_api_key_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/organization/address-verification-config"))
        .and(header("x-api-key", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "distanceTolerance": 100.0,
                "geotaggingPollingInterval": 2.0,
                "geotaggingSessionTimeout": 3
            },
            "status": true,
            "statusCode": 200,
            "message": "Config fetched"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = client_for(&server)
        .organization_config("key-1")
        .await
        .expect("config");
    assert!((config.geotagging_polling_interval - 2.0).abs() < f64::EPSILON);
    assert_eq!(config.geotagging_session_timeout, 3);

    let received: Vec<Request> = server.received_requests().await.expect("recorded");
    assert!(received[0].headers.get("x-auth-token").is_none());
}

#[tokio::test]
async fn customer_history_sends_both_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/customer/address-history"))
        .and(header("x-api-key", "key-1"))
        .and(header("x-auth-token", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"_id": "a", "verificationStatus": "verified", "metadata": {"locations": []}},
                {"_id": "b", "verificationStatus": "pending", "metadata": {"locations": [
                    {"address": "2 High St", "latitude": 1.0, "longitude": 2.0, "timestamp": "2025-07-28T09:00:00Z"}
                ]}}
            ],
            "status": true,
            "statusCode": 200,
            "message": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = client_for(&server)
        .customer_history("key-1", "tok-1")
        .await
        .expect("history");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].metadata.locations[0].address, "2 High St");
}

#[tokio::test]
async fn add_geotag_posts_camel_case_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/api/customer/add-geotag"))
        .and(header("x-auth-token", "tok-1"))
        .and(body_json(json!({
            "address": "1 Main St",
            "latitude": 6.5,
            "longitude": 3.25,
            "deviceTimestamp": "2025-07-28T10:00:00.000Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": 1, "status": true, "statusCode": 201, "message": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = AddGeoTagRequest {
        address: "1 Main St".into(),
        latitude: 6.5,
        longitude: 3.25,
        device_timestamp: "2025-07-28T10:00:00.000Z".into(),
    };
    client_for(&server)
        .add_geotag("key-1", "tok-1", &body)
        .await
        .expect("accepted");
}

#[tokio::test]
async fn http_401_maps_to_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/customer/address-history"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": false, "statusCode": 401, "message": "jwt expired"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .customer_history("key-1", "stale")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "jwt expired"));
}

#[tokio::test]
async fn envelope_failure_on_200_maps_to_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/api/customer/add-geotag"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null, "status": false, "statusCode": 422, "message": "verification closed"
        })))
        .mount(&server)
        .await;

    let body = AddGeoTagRequest {
        address: "x".into(),
        latitude: 0.0,
        longitude: 0.0,
        device_timestamp: "2025-07-28T10:00:00.000Z".into(),
    };
    let err = client_for(&server)
        .add_geotag("key-1", "tok-1", &body)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.to_string().contains("verification closed"));
}

#[tokio::test]
async fn server_error_maps_to_http_with_raw_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/organization/address-verification-config"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .organization_config("key-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 503, ref message } if message == "Service Unavailable"));
}

#[tokio::test]
async fn refresh_token_posts_refresh_token_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/api/customer/refresh-token"))
        .and(header("x-api-key", "key-1"))
        .and(body_json(json!({"refreshToken": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-2", "refreshToken": "refresh-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pair = client_for(&server)
        .refresh_token("key-1", "refresh-1")
        .await
        .expect("pair");
    assert_eq!(pair.token, "tok-2");
    assert_eq!(pair.refresh_token, "refresh-2");
}

#[tokio::test]
async fn refresh_with_rejected_refresh_token_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/api/customer/refresh-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "refresh token revoked"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .refresh_token("key-1", "revoked")
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:9/v1/api".into(),
        timeout_seconds: 2,
        user_agent: None,
    };
    let err = ApiClient::new(config)
        .expect("client")
        .organization_config("key-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}
