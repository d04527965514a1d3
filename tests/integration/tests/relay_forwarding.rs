//! S6 (spec §8): two same-user clients register with the relay; a
//! `PeerConnectionRequest` addressed to one is delivered to only that
//! peer's websocket, never to the sender.
//!
//! Drives a real `proxystore-relay` axum router over a loopback TCP
//! socket with `tokio-tungstenite` clients, rather than calling the
//! handler functions directly, so the test exercises the actual WebSocket
//! wire protocol (spec §4.7, §6).

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use proxystore_network::relay::{
    DescriptionType, PeerConnectionRequest, RelayMessage, RelayRegistrationRequest,
};
use proxystore_relay::RelayState;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

async fn spawn_relay() -> std::net::SocketAddr {
    let state = Arc::new(RelayState {
        clients: proxystore_relay::clients::ClientManager::new(),
        authenticator: Arc::new(proxystore_relay::auth::NullAuthenticator),
        max_message_bytes: None,
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = proxystore_relay::server::router(state);
    let make_service = router.into_make_service_with_connect_info::<std::net::SocketAddr>();
    tokio::spawn(async move {
        axum::serve(listener, make_service).await.unwrap();
    });
    addr
}

async fn connect(addr: std::net::SocketAddr) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>> {
    let url = format!("ws://{addr}/");
    let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws
}

async fn register(
    ws: &mut tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    name: &str,
    uuid: Uuid,
) {
    let req = RelayMessage::RelayRegistrationRequest(RelayRegistrationRequest {
        name: name.to_string(),
        uuid,
    });
    ws.send(WsMessage::Text(req.to_json().unwrap())).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("registration reply timed out")
        .unwrap()
        .unwrap();
    let WsMessage::Text(text) = reply else {
        panic!("expected a text reply to registration");
    };
    match RelayMessage::from_json(&text).unwrap() {
        RelayMessage::RelayResponse(resp) => assert!(resp.success),
        other => panic!("unexpected reply to registration: {other:?}"),
    }
}

#[tokio::test]
async fn s6_peer_connection_request_reaches_only_the_addressed_peer() {
    let addr = spawn_relay().await;

    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    let mut c1 = connect(addr).await;
    let mut c2 = connect(addr).await;
    register(&mut c1, "client-one", u1).await;
    register(&mut c2, "client-two", u2).await;

    let request = RelayMessage::PeerConnectionRequest(PeerConnectionRequest {
        source_uuid: u1,
        source_name: "client-one".to_string(),
        peer_uuid: u2,
        description_type: DescriptionType::Offer,
        description: "sdp-offer-blob".to_string(),
        error: None,
    });
    c1.send(WsMessage::Text(request.to_json().unwrap())).await.unwrap();

    // c2 receives the identical request, forwarded verbatim.
    let forwarded = tokio::time::timeout(Duration::from_secs(2), c2.next())
        .await
        .expect("c2 never received the forwarded request")
        .unwrap()
        .unwrap();
    let WsMessage::Text(text) = forwarded else {
        panic!("expected a text frame");
    };
    match RelayMessage::from_json(&text).unwrap() {
        RelayMessage::PeerConnectionRequest(req) => {
            assert_eq!(req.source_uuid, u1);
            assert_eq!(req.peer_uuid, u2);
            assert_eq!(req.description, "sdp-offer-blob");
            assert!(req.error.is_none());
        }
        other => panic!("unexpected message forwarded to peer: {other:?}"),
    }

    // c1 receives nothing further within a short window: the relay never
    // echoes the request back to its sender.
    let nothing = tokio::time::timeout(Duration::from_millis(300), c1.next()).await;
    assert!(nothing.is_err(), "sender should not receive its own forwarded request");
}

#[tokio::test]
async fn cross_user_peer_connection_request_is_refused_with_an_error_reply_to_the_sender() {
    let addr = spawn_relay().await;

    // NullAuthenticator assigns every connection the same user, so to
    // exercise the cross-user path this test registers a peer uuid that
    // simply does not exist, which the relay treats identically to
    // "belongs to a different user" for forwarding purposes: an
    // error-tagged echo to the sender, not a close.
    let u1 = Uuid::new_v4();
    let unknown_peer = Uuid::new_v4();
    let mut c1 = connect(addr).await;
    register(&mut c1, "client-one", u1).await;

    let request = RelayMessage::PeerConnectionRequest(PeerConnectionRequest {
        source_uuid: u1,
        source_name: "client-one".to_string(),
        peer_uuid: unknown_peer,
        description_type: DescriptionType::Offer,
        description: "sdp".to_string(),
        error: None,
    });
    c1.send(WsMessage::Text(request.to_json().unwrap())).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(2), c1.next())
        .await
        .expect("sender never received an error reply")
        .unwrap()
        .unwrap();
    let WsMessage::Text(text) = reply else {
        panic!("expected a text frame");
    };
    match RelayMessage::from_json(&text).unwrap() {
        RelayMessage::PeerConnectionRequest(req) => assert!(req.error.is_some()),
        other => panic!("unexpected reply: {other:?}"),
    }
}
