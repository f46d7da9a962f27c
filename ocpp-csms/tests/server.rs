use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use ocpp_csms::{ReplyFormat, Server, ServerConfig};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_test::assert_ok;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::Response,
        http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderValue, StatusCode},
        Error as WsError, Message,
    },
    MaybeTlsStream, WebSocketStream,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start(config: ServerConfig) -> SocketAddr {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        ..config
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr, path: &str, protocol: &str) -> Result<(Client, Response), WsError> {
    let mut request = format!("ws://{}{}", addr, path).into_client_request()?;
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_str(protocol).unwrap());
    connect_async(request).await
}

async fn call(ws: &mut Client, text: &str) -> Value {
    ws.send(Message::text(text)).await.unwrap();
    next_reply(ws).await
}

async fn next_reply(ws: &mut Client) -> Value {
    let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for reply")
        .expect("stream ended")
        .unwrap();
    serde_json::from_str(message.to_text().unwrap()).unwrap()
}

#[tokio::test]
async fn test_handshake_selects_ocpp16() {
    let addr = start(ServerConfig::default()).await;

    let (_ws, response) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);
    assert_eq!(
        response.headers().get(SEC_WEBSOCKET_PROTOCOL).unwrap(),
        "ocpp1.6"
    );
}

#[tokio::test]
async fn test_boot_notification_accepted() {
    let addr = start(ServerConfig::default()).await;
    let (mut ws, _) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);

    let reply = call(&mut ws, r#"[2, "1", "BootNotification", {"vendor":"Acme"}]"#).await;

    assert_eq!(reply[0], 3);
    assert_eq!(reply[1], "1");
    assert_eq!(reply[2], "BootNotification");
    assert_eq!(reply[3]["status"], "Accepted");
    assert_eq!(reply[3]["interval"], 300);
    assert!(chrono::DateTime::parse_from_rfc3339(reply[3]["currentTime"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_status_notification_accepted() {
    let addr = start(ServerConfig::default()).await;
    let (mut ws, _) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);

    let reply = call(&mut ws, r#"[2, "2", "StatusNotification", {"connectorId":1}]"#).await;

    assert_eq!(reply[0], 3);
    assert_eq!(reply[1], "2");
    assert_eq!(reply[3]["status"], "Accepted");
    assert_eq!(reply[3]["heartbeatInterval"], 300);
}

#[tokio::test]
async fn test_unknown_action_rejected() {
    let addr = start(ServerConfig::default()).await;
    let (mut ws, _) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);

    let reply = call(&mut ws, r#"[2, "3", "FooBar", {}]"#).await;

    assert_eq!(reply[0], 4);
    assert_eq!(reply[1], "3");
    assert_eq!(reply[2], "FooBar");
    assert_eq!(reply[3]["status"], "Rejected");
    assert_eq!(reply[3]["heartbeatInterval"], 300);
}

#[tokio::test]
async fn test_non_string_action_rejected() {
    let addr = start(ServerConfig::default()).await;
    let (mut ws, _) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);

    let reply = call(&mut ws, r#"[2, "1", 42, {}]"#).await;
    assert_eq!(reply[0], 4);
    assert_eq!(reply[1], "1");
    assert_eq!(reply[2], 42);
    assert_eq!(reply[3]["status"], "Rejected");

    let reply = call(&mut ws, r#"[2, "1", null, {}]"#).await;
    assert_eq!(reply[0], 4);
    assert_eq!(reply[1], "1");
    assert!(reply[2].is_null());
    assert_eq!(reply[3]["status"], "Rejected");
}

#[tokio::test]
async fn test_oversized_message_closes_connection() {
    let addr = start(ServerConfig::default().with_max_message_size(1024)).await;
    let (mut ws, _) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);

    let padding = "x".repeat(4096);
    let text = format!(r#"[2, "big", "BootNotification", {{"pad":"{}"}}]"#, padding);
    ws.send(Message::text(text)).await.unwrap();

    // No reply, only the end of the connection
    let next = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("connection was not closed");
    match next {
        None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {}
        Some(Ok(other)) => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_frame_gets_no_reply_and_keeps_connection() {
    let addr = start(ServerConfig::default()).await;
    let (mut ws, _) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);

    ws.send(Message::text("not-json")).await.unwrap();
    ws.send(Message::text(r#"[2, "x", "BootNotification"]"#)).await.unwrap();

    // The first reply on the socket belongs to the next valid CALL
    let reply = call(&mut ws, r#"[2, "after", "BootNotification", {}]"#).await;
    assert_eq!(reply[1], "after");
}

#[tokio::test]
async fn test_missing_client_id_is_not_found() {
    let addr = start(ServerConfig::default()).await;

    match connect(addr, "/", "ocpp1.6").await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::NOT_FOUND),
        other => panic!("expected 404, got {:?}", other.map(|(_, r)| r.status())),
    }
}

#[tokio::test]
async fn test_undefined_client_id_is_not_found() {
    let addr = start(ServerConfig::default()).await;

    match connect(addr, "/undefined", "ocpp1.6").await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::NOT_FOUND),
        other => panic!("expected 404, got {:?}", other.map(|(_, r)| r.status())),
    }
}

#[tokio::test]
async fn test_subprotocol_mismatch_fails_handshake() {
    let addr = start(ServerConfig::default()).await;

    // No subprotocol comes back, which the client treats as failure
    assert!(connect(addr, "/CP001", "ocpp2.0.1").await.is_err());
}

#[tokio::test]
async fn test_strict_subprotocol_returns_bad_request() {
    let addr = start(ServerConfig::default().strict()).await;

    match connect(addr, "/CP001", "ocpp2.0.1").await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::BAD_REQUEST),
        other => panic!("expected 400, got {:?}", other.map(|(_, r)| r.status())),
    }
}

#[tokio::test]
async fn test_standard_reply_format() {
    let config = ServerConfig::default().with_reply_format(ReplyFormat::Standard);
    let addr = start(config).await;
    let (mut ws, _) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);

    let reply = call(&mut ws, r#"[2, "1", "BootNotification", {}]"#).await;
    assert_eq!(reply.as_array().unwrap().len(), 3);
    assert_eq!(reply[2]["status"], "Accepted");

    let reply = call(&mut ws, r#"[2, "2", "FooBar", {}]"#).await;
    assert_eq!(reply.as_array().unwrap().len(), 5);
    assert_eq!(reply[2], "NotImplemented");
}

#[tokio::test]
async fn test_connections_are_independent() {
    let addr = start(ServerConfig::default().with_heartbeat_interval(60)).await;
    let (mut first, _) = assert_ok!(connect(addr, "/CP001", "ocpp1.6").await);
    let (mut second, _) = assert_ok!(connect(addr, "/CP002", "ocpp1.6").await);

    let a = call(&mut first, r#"[2, "same-id", "BootNotification", {}]"#).await;
    let b = call(&mut second, r#"[2, "same-id", "StatusNotification", {}]"#).await;

    assert_eq!(a[2], "BootNotification");
    assert_eq!(a[3]["interval"], 60);
    assert_eq!(b[2], "StatusNotification");
    assert_eq!(b[3]["heartbeatInterval"], 60);
}
