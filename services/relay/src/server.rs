//! Relay HTTP/WebSocket server: one axum route upgrading to the per-client
//! message loop described in spec §4.7.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use proxystore_network::relay::{close_code, RelayMessage, RelayResponse};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, error, info, warn};

use crate::auth::Authenticator;
use crate::clients::{ClientManager, RegisterOutcome};
use crate::error::RelayResult;

pub struct RelayState {
    pub clients: ClientManager,
    pub authenticator: Arc<dyn Authenticator>,
    pub max_message_bytes: Option<usize>,
}

pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<RelayState>) -> RelayResult<()> {
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| crate::error::RelayError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
    info!(%addr, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| crate::error::RelayError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
    headers: HeaderMap,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, headers, peer_addr))
}

fn close_with(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

async fn handle_socket(socket: WebSocket, state: Arc<RelayState>, headers: HeaderMap, peer_addr: SocketAddr) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = unbounded_channel::<Message>();
    let connection_id = state.clients.next_connection_id();
    let mut registered_uuid: Option<uuid::Uuid> = None;

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let is_close = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                break;
            }
            if is_close {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        if let Some(max) = state.max_message_bytes {
            if text.len() > max {
                warn!(%peer_addr, len = text.len(), max, "message exceeds configured cap");
                let _ = tx.send(close_with(close_code::MESSAGE_TOO_LARGE, "message too large"));
                break;
            }
        }

        let parsed = match RelayMessage::from_json(&text) {
            Ok(m) => m,
            Err(e) => {
                debug!(%peer_addr, error = %e, "failed to decode relay message");
                let _ = tx.send(close_with(close_code::UNKNOWN_MESSAGE_TYPE, "unknown message type"));
                break;
            }
        };

        match parsed {
            RelayMessage::RelayRegistrationRequest(req) => {
                let Some(user) = state.authenticator.authenticate(&headers).await else {
                    let _ = tx.send(close_with(close_code::UNAUTHENTICATED, "unauthenticated"));
                    break;
                };
                match state.clients.try_register(req.uuid, req.name.clone(), user, connection_id, tx.clone()) {
                    RegisterOutcome::Conflict => {
                        let _ = tx.send(close_with(close_code::FORBIDDEN, "uuid registered to a different user"));
                        break;
                    }
                    RegisterOutcome::Registered { displaced } => {
                        if let Some(old) = displaced {
                            info!(uuid = %req.uuid, "client reconnected, displacing previous connection");
                            let _ = old.sender.send(close_with(close_code::EXPECTED, "displaced by reconnection"));
                        }
                        registered_uuid = Some(req.uuid);
                        if let Ok(json) = RelayMessage::RelayResponse(RelayResponse::ok()).to_json() {
                            let _ = tx.send(Message::Text(json));
                        }
                    }
                }
            }
            RelayMessage::PeerConnectionRequest(req) => {
                let Some(sender_uuid) = registered_uuid else {
                    let _ = tx.send(close_with(close_code::FORBIDDEN, "not registered"));
                    break;
                };
                let Some(sender_reg) = state.clients.get(&sender_uuid) else {
                    let _ = tx.send(close_with(close_code::FORBIDDEN, "not registered"));
                    break;
                };

                match state.clients.get(&req.peer_uuid) {
                    None => {
                        let errored = req.with_error("unknown peer");
                        if let Ok(json) = RelayMessage::PeerConnectionRequest(errored).to_json() {
                            let _ = tx.send(Message::Text(json));
                        }
                    }
                    Some(target) if target.user != sender_reg.user => {
                        let errored = req.with_error("peer belongs to a different user");
                        if let Ok(json) = RelayMessage::PeerConnectionRequest(errored).to_json() {
                            let _ = tx.send(Message::Text(json));
                        }
                    }
                    Some(target) => {
                        if let Ok(json) = RelayMessage::PeerConnectionRequest(req).to_json() {
                            let _ = target.sender.send(Message::Text(json));
                        }
                    }
                }
            }
            RelayMessage::RelayResponse(_) => {
                // Clients never send this variant; well-typed clients make
                // this unreachable, so we log and ignore rather than panic.
                error!(%peer_addr, "client sent a RelayResponse, which is server-to-client only");
            }
        }
    }

    if let Some(uuid) = registered_uuid {
        state.clients.remove_if_current(&uuid, connection_id);
    }
    writer.abort();
}
