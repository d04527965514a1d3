//! HTTP surface an [`EndpointConnector`](proxystore_connectors) talks to
//! (spec §4.5/§4.6): `/set`, `/get`, `/exists`, `/evict` dispatch locally
//! when the `endpoint` query param names this daemon, and forward across
//! the peer fabric otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::EndpointError;
use crate::peer::PeerFabric;
use crate::storage::ObjectStore;
use proxystore_network::peer::{PeerOp, PeerResult};

pub struct EndpointState {
    pub self_uuid: Uuid,
    pub self_name: String,
    pub store: Arc<ObjectStore>,
    pub fabric: Arc<PeerFabric>,
}

#[derive(Debug, Deserialize)]
pub struct EndpointQuery {
    endpoint: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct ExistsBody {
    exists: bool,
}

#[derive(Debug, Serialize)]
struct SelfBody {
    uuid: Uuid,
    name: String,
}

pub fn router(state: Arc<EndpointState>) -> Router {
    Router::new()
        .route("/endpoint", get(self_identify))
        .route("/set/:object_id", post(set_object))
        .route("/get/:object_id", get(get_object))
        .route("/exists/:object_id", get(exists_object))
        .route("/evict/:object_id", delete(evict_object))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<EndpointState>) -> Result<(), EndpointError> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EndpointError::Bind { addr: addr.to_string(), source: e })?;
    info!(%addr, "endpoint listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| EndpointError::Bind { addr: addr.to_string(), source: e })?;
    Ok(())
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let status = match &self {
            EndpointError::ObjectTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EndpointError::UnknownPeer(_) => StatusCode::BAD_GATEWAY,
            EndpointError::PeerTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EndpointError::TransientPeer { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

async fn self_identify(State(state): State<Arc<EndpointState>>) -> Json<SelfBody> {
    Json(SelfBody { uuid: state.self_uuid, name: state.self_name.clone() })
}

/// Whether `object_id`'s request targets this daemon's own store.
fn is_local(state: &EndpointState, endpoint: Option<Uuid>) -> bool {
    endpoint.map(|e| e == state.self_uuid).unwrap_or(true)
}

async fn set_object(
    State(state): State<Arc<EndpointState>>,
    Path(object_id): Path<Uuid>,
    Query(q): Query<EndpointQuery>,
    body: axum::body::Bytes,
) -> Result<StatusCode, EndpointError> {
    if is_local(&state, q.endpoint) {
        state.store.put(object_id, body.to_vec())?;
        return Ok(StatusCode::CREATED);
    }
    let peer = q.endpoint.unwrap();
    match state
        .fabric
        .request(peer, PeerOp::Set { object_id, bytes: body.to_vec() })
        .await?
    {
        PeerResult::Ack => Ok(StatusCode::CREATED),
        PeerResult::Error(msg) => Err(EndpointError::Storage(msg)),
        _ => Err(EndpointError::Storage("unexpected peer response to set".to_string())),
    }
}

async fn get_object(
    State(state): State<Arc<EndpointState>>,
    Path(object_id): Path<Uuid>,
    Query(q): Query<EndpointQuery>,
) -> Result<Response, EndpointError> {
    if is_local(&state, q.endpoint) {
        return Ok(match state.store.get(object_id)? {
            Some(bytes) => (StatusCode::OK, bytes.to_vec()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        });
    }
    let peer = q.endpoint.unwrap();
    match state.fabric.request(peer, PeerOp::Get { object_id }).await? {
        PeerResult::Bytes(Some(data)) => Ok((StatusCode::OK, data).into_response()),
        PeerResult::Bytes(None) => Ok(StatusCode::NOT_FOUND.into_response()),
        PeerResult::Error(msg) => Err(EndpointError::Storage(msg)),
        _ => Err(EndpointError::Storage("unexpected peer response to get".to_string())),
    }
}

async fn exists_object(
    State(state): State<Arc<EndpointState>>,
    Path(object_id): Path<Uuid>,
    Query(q): Query<EndpointQuery>,
) -> Result<Json<bool>, EndpointError> {
    if is_local(&state, q.endpoint) {
        return Ok(Json(state.store.exists(object_id)));
    }
    let peer = q.endpoint.unwrap();
    match state.fabric.request(peer, PeerOp::Exists { object_id }).await? {
        PeerResult::Exists(b) => Ok(Json(b)),
        PeerResult::Error(msg) => Err(EndpointError::Storage(msg)),
        _ => Err(EndpointError::Storage("unexpected peer response to exists".to_string())),
    }
}

async fn evict_object(
    State(state): State<Arc<EndpointState>>,
    Path(object_id): Path<Uuid>,
    Query(q): Query<EndpointQuery>,
) -> Result<StatusCode, EndpointError> {
    if is_local(&state, q.endpoint) {
        state.store.evict(object_id)?;
        return Ok(StatusCode::NO_CONTENT);
    }
    let peer = q.endpoint.unwrap();
    match state.fabric.request(peer, PeerOp::Evict { object_id }).await? {
        PeerResult::Ack => Ok(StatusCode::NO_CONTENT),
        PeerResult::Error(msg) => {
            error!(%object_id, %peer, error = %msg, "peer evict failed");
            Ok(StatusCode::NO_CONTENT)
        }
        _ => Err(EndpointError::Storage("unexpected peer response to evict".to_string())),
    }
}
