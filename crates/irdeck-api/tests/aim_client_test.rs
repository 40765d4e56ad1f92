// Integration tests for `AimClient` and `PiremClient` using wiremock.
#![allow(clippy::unwrap_used)]

use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use irdeck_api::{AimClient, Error, IrData, PiremClient, RemoteChange};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, AimClient) {
    let server = MockServer::start().await;
    let client = AimClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

/// Encode one Connect envelope: flag byte, big-endian length, payload.
fn frame(flags: u8, payload: &serde_json::Value) -> Vec<u8> {
    let body = serde_json::to_vec(payload).unwrap();
    let mut out = vec![flags];
    out.extend(u32::try_from(body.len()).unwrap().to_be_bytes());
    out.extend(body);
    out
}

// ── Unary calls ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_remotes() {
    let (server, client) = setup().await;

    let body = json!({
        "remotes": [
            { "id": "r1", "name": "TV", "deviceId": "pirem-1", "tag": "button" },
            { "id": "r2", "name": "Light", "deviceId": "pirem-1", "tag": "toggle",
              "buttons": [ { "id": "b1", "name": "on" } ] }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/GetRemotes"))
        .and(header("connect-protocol-version", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let remotes = client.get_remotes().await.unwrap();

    assert_eq!(remotes.len(), 2);
    assert_eq!(remotes[0].id, "r1");
    assert_eq!(remotes[0].device_id, "pirem-1");
    assert!(remotes[0].buttons.is_none());
    assert_eq!(remotes[1].tag, "toggle");
    assert_eq!(remotes[1].buttons.as_ref().unwrap()[0].name, "on");
}

#[tokio::test]
async fn test_get_remotes_empty_catalogue() {
    let (server, client) = setup().await;

    // proto3 omits empty repeated fields entirely
    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/GetRemotes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    assert!(client.get_remotes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_buttons_sends_remote_id() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/GetButtons"))
        .and(body_json(json!({ "remoteId": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "buttons": [ { "id": "b1", "name": "push" }, { "id": "b2", "name": "power" } ]
        })))
        .mount(&server)
        .await;

    let buttons = client.get_buttons("r1").await.unwrap();
    assert_eq!(buttons.len(), 2);
    assert_eq!(buttons[0].id, "b1");
    assert_eq!(buttons[1].name, "power");
}

#[tokio::test]
async fn test_get_ir_data_passthrough() {
    let (server, client) = setup().await;

    let payload = json!({
        "@type": "type.googleapis.com/pirem.api.v1.IrData",
        "raw": { "carrierFrequencyKhz": 38, "onOff": [900, 450, 560] }
    });

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/GetIrData"))
        .and(body_json(json!({ "remoteId": "r1", "buttonId": "b1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
        .mount(&server)
        .await;

    let data = client.get_ir_data("r1", "b1").await.unwrap();
    assert_eq!(data, IrData(payload));
}

#[tokio::test]
async fn test_get_ir_data_empty_payload_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/GetIrData"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client.get_ir_data("r1", "b9").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_push_button() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/PushButton"))
        .and(body_json(json!({ "buttonId": "b7" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client.push_button("b7").await.unwrap();
}

#[tokio::test]
async fn test_send_ir() {
    let server = MockServer::start().await;
    let pirem = PiremClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();

    let data = IrData(json!({ "raw": { "onOff": [1, 2] } }));

    Mock::given(method("POST"))
        .and(path("/pirem.api.v1.PiRemService/SendIr"))
        .and(body_json(json!({ "deviceId": "pirem-1", "irData": { "raw": { "onOff": [1, 2] } } })))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    pirem.send_ir("pirem-1", &data).await.unwrap();
}

// ── Error normalization ─────────────────────────────────────────────

#[tokio::test]
async fn test_not_found_code() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/GetButtons"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "not_found",
            "message": "remote r404 does not exist"
        })))
        .mount(&server)
        .await;

    let err = client.get_buttons("r404").await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        Error::Rpc { message, .. } => assert!(message.contains("r404")),
        other => panic!("expected Rpc error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unavailable_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/GetRemotes"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream connect error"))
        .mount(&server)
        .await;

    let err = client.get_remotes().await.unwrap_err();
    assert!(err.is_transient());
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/GetRemotes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let err = client.get_remotes().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}

#[tokio::test]
async fn test_connection_refused() {
    // Nothing listens on port 9 (discard) in the test environment.
    let client = AimClient::from_reqwest("http://127.0.0.1:9", reqwest::Client::new()).unwrap();
    let err = client.get_remotes().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

// ── Server streaming ────────────────────────────────────────────────

#[tokio::test]
async fn test_notify_update_stream() {
    let (server, client) = setup().await;

    let mut body = frame(0, &json!({ "add": { "remote": { "id": "r3", "name": "Fan", "tag": "button" } } }));
    body.extend(frame(0, &json!({ "delete": { "remoteId": "r1" } })));
    body.extend(frame(0, &json!({ "update": { "remote": { "id": "r2", "name": "Lamp" } } })));
    body.extend(frame(0x02, &json!({})));

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/NotifyUpdate"))
        .and(header("content-type", "application/connect+json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/connect+json"))
        .mount(&server)
        .await;

    let changes: Vec<_> = client.notify_update().collect().await;
    let changes: Vec<RemoteChange> = changes.into_iter().map(Result::unwrap).collect();

    assert_eq!(changes.len(), 3);
    assert!(matches!(&changes[0], RemoteChange::Added(r) if r.id == "r3"));
    assert_eq!(
        changes[1],
        RemoteChange::Removed {
            remote_id: "r1".into()
        }
    );
    assert!(matches!(&changes[2], RemoteChange::Updated(r) if r.name == "Lamp"));
}

#[tokio::test]
async fn test_notify_update_trailer_error() {
    let (server, client) = setup().await;

    let mut body = frame(0, &json!({ "delete": { "remoteId": "r1" } }));
    body.extend(frame(
        0x02,
        &json!({ "error": { "code": "unavailable", "message": "server shutting down" } }),
    ));

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/NotifyUpdate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/connect+json"))
        .mount(&server)
        .await;

    let items: Vec<_> = client.notify_update().collect().await;
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    let err = items[1].as_ref().unwrap_err();
    assert_eq!(err.rpc_code(), Some("unavailable"));
}

#[tokio::test]
async fn test_notify_update_truncated_frame() {
    let (server, client) = setup().await;

    let mut body = frame(0, &json!({ "delete": { "remoteId": "r1" } }));
    body.extend([0, 0, 0, 0, 50, b'{']);

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/NotifyUpdate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/connect+json"))
        .mount(&server)
        .await;

    let items: Vec<_> = client.notify_update().collect().await;
    assert_eq!(items.len(), 2);
    assert!(matches!(items[1], Err(Error::Framing(_))));
}

#[tokio::test]
async fn test_notify_update_rejected_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/aim.api.v1.AimService/NotifyUpdate"))
        .respond_with(ResponseTemplate::new(401).set_body_string("missing bearer token"))
        .mount(&server)
        .await;

    let items: Vec<_> = client.notify_update().collect().await;
    assert_eq!(items.len(), 1);
    let err = items[0].as_ref().unwrap_err();
    assert_eq!(err.rpc_code(), Some("unauthenticated"));
    assert!(err.to_string().contains("missing bearer token"));
}
