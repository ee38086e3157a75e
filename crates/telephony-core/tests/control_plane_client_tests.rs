//! Integration tests for the control plane HTTP client
//!
//! These run against a local mock room service and verify the idempotence
//! contract the dialing engine relies on.

use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autodial_telephony_core::{
    ControlPlaneClient, ControlPlaneConfig, SessionControl, TelephonyError,
};

fn client_for(server: &MockServer) -> ControlPlaneClient {
    ControlPlaneClient::new(ControlPlaneConfig {
        url: server.uri(),
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
        sip_trunk_id: "ST_test_trunk".to_string(),
    })
    .expect("client config should be valid")
}

#[tokio::test]
async fn create_session_sends_authenticated_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twirp/livekit.RoomService/CreateRoom"))
        .and(header_exists("authorization"))
        .and(body_partial_json(serde_json::json!({"name": "survey_7"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "survey_7"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.create_session("survey_7").await.expect("create should succeed");
}

#[tokio::test]
async fn create_session_twice_does_not_error() {
    let server = MockServer::start().await;
    // First create succeeds, the duplicate is rejected by the provider.
    Mock::given(method("POST"))
        .and(path("/twirp/livekit.RoomService/CreateRoom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "survey_7"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/twirp/livekit.RoomService/CreateRoom"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string("twirp error: room already exists"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.create_session("survey_7").await.expect("first create should succeed");
    client
        .create_session("survey_7")
        .await
        .expect("duplicate create should be treated as success");
}

#[tokio::test]
async fn agent_dispatch_tolerates_existing_rule() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twirp/livekit.AgentDispatchService/CreateDispatch"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("dispatch rule already exists for agent"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .ensure_agent_joined("survey_7", "dakota")
        .await
        .expect("existing dispatch rule should not be an error");
}

#[tokio::test]
async fn dial_out_surfaces_trunk_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twirp/livekit.SIP/CreateSIPParticipant"))
        .respond_with(ResponseTemplate::new(500).set_body_string("trunk rejected the call"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .dial_out("survey_7", "+34600111222", "customer_+34600111222", "Test Customer")
        .await
        .expect_err("trunk rejection must surface");
    match err {
        TelephonyError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("trunk rejected"));
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[tokio::test]
async fn dial_out_requires_a_trunk() {
    let server = MockServer::start().await;
    let client = ControlPlaneClient::new(ControlPlaneConfig {
        url: server.uri(),
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
        sip_trunk_id: String::new(),
    })
    .expect("client config should be valid");

    let err = client
        .dial_out("survey_7", "+34600111222", "customer", "Customer")
        .await
        .expect_err("missing trunk must be rejected before any request");
    assert!(matches!(err, TelephonyError::Configuration(_)));
}

#[tokio::test]
async fn session_exists_reflects_the_listing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twirp/livekit.RoomService/ListRooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rooms": [{"name": "survey_9", "num_participants": 2, "creation_time": 170}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.session_exists("survey_9").await.unwrap());
    assert!(!client.session_exists("survey_10").await.unwrap());
}

#[tokio::test]
async fn delete_session_tolerates_missing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twirp/livekit.RoomService/DeleteRoom"))
        .respond_with(ResponseTemplate::new(404).set_body_string("room not found"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .delete_session("survey_9")
        .await
        .expect("deleting an already-gone session should succeed");
}

#[tokio::test]
async fn websocket_urls_are_normalized_for_the_admin_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twirp/livekit.RoomService/ListRooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"rooms": []})))
        .mount(&server)
        .await;

    let ws_url = server.uri().replacen("http://", "ws://", 1);
    let client = ControlPlaneClient::new(ControlPlaneConfig {
        url: ws_url,
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
        sip_trunk_id: "ST_test_trunk".to_string(),
    })
    .expect("ws URL should be accepted");

    assert!(!client.session_exists("survey_1").await.unwrap());
}
