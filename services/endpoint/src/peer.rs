//! Peer fabric: one [`PeerManager`] per remote endpoint uuid, driving the
//! `DISCONNECTED -> DIALING -> SIGNALING -> CONNECTED -> CLOSED` state
//! machine of spec §4.6 over a [`WebRtcChannel`], with signaling brokered
//! through the relay.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use proxystore_network::peer::{chunk, encode_frame, FrameReassembler, PeerOp, PeerRequest, PeerResponse, PeerResult};
use proxystore_network::relay::{DescriptionType, PeerConnectionRequest};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Notify};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{EndpointError, EndpointResult};
use crate::relay_client::RelayClient;
use crate::storage::ObjectStore;
use crate::webrtc_channel::WebRtcChannel;

/// One frame on the data channel: either a request the peer wants us to
/// execute locally, or a response to a request we sent it. `PeerRequest`
/// and `PeerResponse` are plain bincode payloads with no type tag of their
/// own, so every frame on the wire is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum WireMessage {
    Request(PeerRequest),
    Response(PeerResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Disconnected,
    Dialing,
    Signaling,
    Connected,
    Closed,
}

struct PeerManagerInner {
    state: PeerState,
    channel: Option<Arc<WebRtcChannel>>,
    reassembler: FrameReassembler,
}

pub struct PeerManager {
    peer_uuid: Uuid,
    inner: Mutex<PeerManagerInner>,
    connected: Notify,
    closed: Notify,
    pending: DashMap<u64, oneshot::Sender<PeerResult>>,
    next_request_id: AtomicU64,
}

impl PeerManager {
    fn new(peer_uuid: Uuid) -> Arc<Self> {
        Arc::new(Self {
            peer_uuid,
            inner: Mutex::new(PeerManagerInner {
                state: PeerState::Disconnected,
                channel: None,
                reassembler: FrameReassembler::new(),
            }),
            connected: Notify::new(),
            closed: Notify::new(),
            pending: DashMap::new(),
            next_request_id: AtomicU64::new(1),
        })
    }

    pub fn state(&self) -> PeerState {
        self.inner.lock().state
    }

    fn set_state(&self, state: PeerState) {
        let mut inner = self.inner.lock();
        inner.state = state;
        drop(inner);
        match state {
            PeerState::Connected => self.connected.notify_waiters(),
            PeerState::Closed => self.closed.notify_waiters(),
            _ => {}
        }
    }

    fn fail_pending(&self) {
        let ids: Vec<u64> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(PeerResult::Error("peer channel closed".to_string()));
            }
        }
    }

    async fn wait_connected(&self, timeout: Duration) -> EndpointResult<()> {
        if self.state() == PeerState::Connected {
            return Ok(());
        }
        tokio::time::timeout(timeout, self.connected.notified())
            .await
            .map_err(|_| EndpointError::PeerTimeout { peer: self.peer_uuid })?;
        Ok(())
    }

    /// Feeds one raw data-channel message through this peer's reassembler
    /// and dispatches every frame body that becomes complete as a result
    /// (a data-channel message may be only one chunk of a larger frame,
    /// per spec §4.6 "Ordering and message framing").
    fn on_channel_message(self: &Arc<Self>, data: Vec<u8>, store: Arc<ObjectStore>) {
        let bodies = self.inner.lock().reassembler.push(&data);
        for body in bodies {
            self.dispatch_frame(body, &store);
        }
    }

    fn dispatch_frame(self: &Arc<Self>, body: Vec<u8>, store: &Arc<ObjectStore>) {
        let msg: WireMessage = match bincode::deserialize(&body) {
            Ok(m) => m,
            Err(e) => {
                error!(peer = %self.peer_uuid, error = %e, "failed to decode peer frame");
                return;
            }
        };
        match msg {
            WireMessage::Response(resp) => {
                if let Some((_, tx)) = self.pending.remove(&resp.request_id) {
                    let _ = tx.send(resp.result);
                }
            }
            WireMessage::Request(req) => {
                let result = execute_local(store, &req.op);
                let response = PeerResponse {
                    request_id: req.request_id,
                    result,
                };
                self.send_wire(&WireMessage::Response(response));
            }
        }
    }

    fn send_wire(&self, msg: &WireMessage) {
        let Ok(frame) = encode_frame(msg) else {
            error!(peer = %self.peer_uuid, "failed to encode peer frame");
            return;
        };
        let inner = self.inner.lock();
        let Some(channel) = &inner.channel else { return };
        for piece in chunk(&frame) {
            channel.send(piece.to_vec());
        }
    }

    async fn send_request(self: &Arc<Self>, op: PeerOp, timeout: Duration) -> EndpointResult<PeerResult> {
        self.wait_connected(timeout).await?;
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id, tx);
        self.send_wire(&WireMessage::Request(PeerRequest { request_id, op }));
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) | Err(_) => {
                self.pending.remove(&request_id);
                Err(EndpointError::TransientPeer { peer: self.peer_uuid })
            }
        }
    }
}

fn execute_local(store: &ObjectStore, op: &PeerOp) -> PeerResult {
    match op {
        PeerOp::Get { object_id } => match store.get(*object_id) {
            Ok(bytes) => PeerResult::Bytes(bytes.map(|b| b.to_vec())),
            Err(e) => PeerResult::Error(e.to_string()),
        },
        PeerOp::Set { object_id, bytes } => match store.put(*object_id, bytes.clone()) {
            Ok(()) => PeerResult::Ack,
            Err(e) => PeerResult::Error(e.to_string()),
        },
        PeerOp::Exists { object_id } => PeerResult::Exists(store.exists(*object_id)),
        PeerOp::Evict { object_id } => match store.evict(*object_id) {
            Ok(()) => PeerResult::Ack,
            Err(e) => PeerResult::Error(e.to_string()),
        },
    }
}

/// Registry of [`PeerManager`]s, one per remote endpoint this process has
/// ever dialed or been dialed by.
pub struct PeerFabric {
    self_uuid: Uuid,
    self_name: String,
    store: Arc<ObjectStore>,
    relay: RelayClient,
    managers: DashMap<Uuid, Arc<PeerManager>>,
    request_timeout: Duration,
}

impl PeerFabric {
    pub fn new(self_uuid: Uuid, self_name: String, store: Arc<ObjectStore>, relay: RelayClient) -> Arc<Self> {
        Arc::new(Self {
            self_uuid,
            self_name,
            store,
            relay,
            managers: DashMap::new(),
            request_timeout: Duration::from_secs(30),
        })
    }

    fn get_or_create(self: &Arc<Self>, peer_uuid: Uuid) -> Arc<PeerManager> {
        self.managers
            .entry(peer_uuid)
            .or_insert_with(|| PeerManager::new(peer_uuid))
            .clone()
    }

    /// Forwards `op` to `peer_uuid`, dialing it first if there is no
    /// existing connection (spec §4.6 "On first local request targeting an
    /// unknown peer UUID").
    pub async fn request(self: &Arc<Self>, peer_uuid: Uuid, op: PeerOp) -> EndpointResult<PeerResult> {
        let manager = self.get_or_create(peer_uuid);
        if manager.state() == PeerState::Disconnected {
            self.dial(manager.clone()).await?;
        }
        manager.send_request(op, self.request_timeout).await
    }

    async fn dial(self: &Arc<Self>, manager: Arc<PeerManager>) -> EndpointResult<()> {
        manager.set_state(PeerState::Dialing);
        let store = self.store.clone();
        let manager_for_cb = manager.clone();
        let on_message: crate::webrtc_channel::OnMessage = Arc::new(move |data| {
            manager_for_cb.clone().on_channel_message(data, store.clone());
        });
        let manager_for_close = manager.clone();
        let on_close: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            manager_for_close.set_state(PeerState::Closed);
            manager_for_close.fail_pending();
        });
        let (channel, offer_sdp) = WebRtcChannel::create_offer(on_message, on_close).await?;
        manager.inner.lock().channel = Some(Arc::new(channel));
        manager.set_state(PeerState::Signaling);

        self.relay.send(proxystore_network::relay::RelayMessage::PeerConnectionRequest(PeerConnectionRequest {
            source_uuid: self.self_uuid,
            source_name: self.self_name.clone(),
            peer_uuid: manager.peer_uuid,
            description_type: DescriptionType::Offer,
            description: offer_sdp,
            error: None,
        }));
        Ok(())
    }

    /// Applies an answer forwarded by the relay to a previously sent offer
    /// (spec: SIGNALING -> CONNECTED).
    pub async fn on_answer(self: &Arc<Self>, peer_uuid: Uuid, sdp: String) {
        let manager = self.get_or_create(peer_uuid);
        let channel = manager.inner.lock().channel.clone();
        let Some(channel) = channel else {
            warn!(peer = %peer_uuid, "received answer for a peer with no open offer");
            return;
        };
        match channel.apply_answer(&sdp).await {
            Ok(()) => manager.set_state(PeerState::Connected),
            Err(e) => {
                error!(peer = %peer_uuid, error = %e, "failed to apply relay-forwarded answer");
                manager.set_state(PeerState::Closed);
            }
        }
    }

    /// Handles an offer forwarded by the relay for a peer we were not
    /// already talking to (spec: "create a peer manager, generate an
    /// answer, transition directly to SIGNALING -> CONNECTED on channel
    /// open").
    pub async fn on_offer(self: &Arc<Self>, source_uuid: Uuid, sdp: String) -> EndpointResult<()> {
        let manager = self.get_or_create(source_uuid);
        manager.set_state(PeerState::Signaling);

        let (peer_connection, mut data_channel_rx, answer_sdp) = WebRtcChannel::create_answer(&sdp).await?;

        self.relay.send(proxystore_network::relay::RelayMessage::PeerConnectionRequest(PeerConnectionRequest {
            source_uuid: self.self_uuid,
            source_name: self.self_name.clone(),
            peer_uuid: source_uuid,
            description_type: DescriptionType::Answer,
            description: answer_sdp,
            error: None,
        }));

        let fabric = self.clone();
        let manager_for_task = manager.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(Duration::from_secs(30), data_channel_rx.recv()).await {
                Ok(Some(data_channel)) => {
                    let store = fabric.store.clone();
                    let manager_for_cb = manager_for_task.clone();
                    let on_message: crate::webrtc_channel::OnMessage = Arc::new(move |data| {
                        manager_for_cb.clone().on_channel_message(data, store.clone());
                    });
                    let manager_for_close = manager_for_task.clone();
                    let on_close: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                        manager_for_close.set_state(PeerState::Closed);
                        manager_for_close.fail_pending();
                    });
                    let channel = WebRtcChannel::attach(peer_connection, data_channel, on_message, on_close);
                    manager_for_task.inner.lock().channel = Some(Arc::new(channel));
                    manager_for_task.set_state(PeerState::Connected);
                    info!(peer = %manager_for_task.peer_uuid, "peer data channel opened");
                }
                _ => {
                    warn!(peer = %manager_for_task.peer_uuid, "timed out waiting for answering data channel");
                    manager_for_task.set_state(PeerState::Closed);
                }
            }
        });
        Ok(())
    }

    pub fn states(&self) -> HashMap<Uuid, PeerState> {
        self.managers.iter().map(|e| (*e.key(), e.value().state())).collect()
    }
}
