use bigdecimal::BigDecimal;
use bundle_bridge::config::{EdahabCredentials, WaafiCredentials};
use bundle_bridge::gateway::{
    ChargeCapability, CreditCapability, EdahabClient, GatewayError, GatewayMode, WaafiPayClient,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;

fn waafi_credentials(base_url: String) -> WaafiCredentials {
    WaafiCredentials {
        api_user_id: Some("1000416".to_string()),
        api_key: Some("API-675418888AHX".to_string()),
        merchant_uid: Some("M0910291".to_string()),
        base_url,
    }
}

fn edahab_credentials(base_url: String) -> EdahabCredentials {
    EdahabCredentials {
        api_key: Some("ed-key".to_string()),
        secret_key: Some("ed-secret".to_string()),
        agent_code: None,
        base_url,
    }
}

fn short_bundle() -> BigDecimal {
    BigDecimal::from_str("0.2").unwrap()
}

#[tokio::test]
async fn test_waafi_approved_purchase() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "serviceName": "API_PURCHASE",
            "serviceParams": {
                "merchantUid": "M0910291",
                "payerInfo": { "accountNo": "0610000001" },
                "transactionInfo": { "amount": "0.20", "currency": "USD" }
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"responseCode":"2001","responseMsg":"RCS_SUCCESS","params":{"transactionId":"WP-77812"}}"#,
        )
        .create_async()
        .await;

    let client = WaafiPayClient::new(waafi_credentials(server.url()), Duration::from_secs(5));
    let outcome = client.charge("0610000001", &short_bundle()).await.unwrap();

    mock.assert_async().await;
    assert!(outcome.success);
    assert_eq!(outcome.provider_reference.as_deref(), Some("WP-77812"));
    assert_eq!(client.mode(), GatewayMode::Live);
}

#[tokio::test]
async fn test_waafi_decline_is_an_outcome() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"responseCode":"5206","responseMsg":"Payment Failed (Haraaga xisaabtaadu kuguma filna)"}"#)
        .create_async()
        .await;

    let client = WaafiPayClient::new(waafi_credentials(server.url()), Duration::from_secs(5));
    let outcome = client.charge("0610000001", &short_bundle()).await.unwrap();

    assert!(!outcome.success);
    assert!(outcome.provider_reference.is_none());
    assert!(outcome.detail().contains("Payment Failed"));
}

#[tokio::test]
async fn test_waafi_server_error_is_a_transport_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(500)
        .create_async()
        .await;

    let client = WaafiPayClient::new(waafi_credentials(server.url()), Duration::from_secs(5));
    let result = client.charge("0610000001", &short_bundle()).await;

    assert!(matches!(result, Err(GatewayError::UnexpectedStatus(500))));
}

#[tokio::test]
async fn test_waafi_garbage_body_is_a_transport_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body("<html>gateway maintenance</html>")
        .create_async()
        .await;

    let client = WaafiPayClient::new(waafi_credentials(server.url()), Duration::from_secs(5));
    let result = client.charge("0610000001", &short_bundle()).await;

    assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_waafi_missing_credentials_never_calls_out() {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/").expect(0).create_async().await;

    let credentials = WaafiCredentials {
        api_key: None,
        ..waafi_credentials(server.url())
    };
    let client = WaafiPayClient::new(credentials, Duration::from_secs(5));
    let result = client.charge("0610000001", &short_bundle()).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(GatewayError::MissingCredentials(_))));
}

#[tokio::test]
async fn test_waafi_circuit_opens_after_repeated_failures() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let client = WaafiPayClient::new(waafi_credentials(server.url()), Duration::from_secs(5));
    assert_eq!(client.circuit_state(), "closed");

    for _ in 0..3 {
        let result = client.charge("0610000001", &short_bundle()).await;
        assert!(matches!(result, Err(GatewayError::UnexpectedStatus(503))));
    }

    let result = client.charge("0610000001", &short_bundle()).await;
    assert!(matches!(result, Err(GatewayError::CircuitOpen(_))));
    assert_eq!(client.circuit_state(), "open");
}

#[tokio::test]
async fn test_edahab_approved_transfer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "transactionType": "B2C",
            "recipient": "0650000001",
            "amount": "0.20"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"StatusCode":0,"StatusMessage":"Success","TransactionId":"ED-5512"}"#)
        .create_async()
        .await;

    let client = EdahabClient::new(edahab_credentials(server.url()), Duration::from_secs(5));
    let outcome = client.credit("0650000001", &short_bundle()).await.unwrap();

    mock.assert_async().await;
    assert!(outcome.success);
    assert_eq!(outcome.provider_reference.as_deref(), Some("ED-5512"));
}

#[tokio::test]
async fn test_edahab_decline_is_an_outcome() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"StatusCode":6,"StatusMessage":"Insufficient agent balance"}"#)
        .create_async()
        .await;

    let client = EdahabClient::new(edahab_credentials(server.url()), Duration::from_secs(5));
    let outcome = client.credit("0650000001", &short_bundle()).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.detail(), "Insufficient agent balance");
}

#[tokio::test]
async fn test_edahab_unreachable_provider_is_a_transport_failure() {
    // Nothing listens on port 9 locally.
    let client = EdahabClient::new(
        edahab_credentials("http://127.0.0.1:9".to_string()),
        Duration::from_secs(2),
    );
    let result = client.credit("0650000001", &short_bundle()).await;

    assert!(matches!(result, Err(GatewayError::Http(_))));
}
