//! Thin wrapper over a single `webrtc` crate peer connection and its one
//! data channel (spec §4.6 peer fabric). Everything above this module only
//! ever sees [`WebRtcChannel`]'s `send`/message-callback surface; the raw
//! `RTCPeerConnection`/`RTCDataChannel` types never leak past this file.

use std::sync::Arc;

use tokio::sync::mpsc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use crate::error::{EndpointError, EndpointResult};

const DATA_CHANNEL_LABEL: &str = "proxystore";

/// Callback invoked with each reassembled message received on the channel.
pub type OnMessage = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

fn default_configuration() -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: vec![RTCIceServer {
            urls: vec!["stun:stun.l.google.com:19302".to_string()],
            ..Default::default()
        }],
        ..Default::default()
    }
}

async fn new_peer_connection() -> EndpointResult<Arc<RTCPeerConnection>> {
    let mut media_engine = MediaEngine::default();
    media_engine
        .register_default_codecs()
        .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)
        .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();
    let pc = api
        .new_peer_connection(default_configuration())
        .await
        .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
    Ok(Arc::new(pc))
}

fn register_data_channel_handlers(dc: &Arc<RTCDataChannel>, on_message: OnMessage, on_close: Arc<dyn Fn() + Send + Sync>) {
    let message_cb = on_message;
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let message_cb = message_cb.clone();
        let data = msg.data.to_vec();
        Box::pin(async move {
            message_cb(data);
        })
    }));
    dc.on_close(Box::new(move || {
        let on_close = on_close.clone();
        Box::pin(async move {
            on_close();
        })
    }));
}

/// One negotiated peer connection plus its single data channel, ready to
/// carry [`proxystore_network::peer`] frames in both directions.
pub struct WebRtcChannel {
    peer_connection: Arc<RTCPeerConnection>,
    data_channel: Arc<RTCDataChannel>,
}

impl WebRtcChannel {
    /// Dialing side (spec §4.6 "create a peer manager, generate an offer"):
    /// opens the data channel locally and returns the SDP offer to forward
    /// to the relay.
    pub async fn create_offer(on_message: OnMessage, on_close: Arc<dyn Fn() + Send + Sync>) -> EndpointResult<(Self, String)> {
        let peer_connection = new_peer_connection().await?;
        let data_channel = peer_connection
            .create_data_channel(DATA_CHANNEL_LABEL, None)
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
        register_data_channel_handlers(&data_channel, on_message, on_close);

        let offer = peer_connection
            .create_offer(None)
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
        let mut gather_complete = peer_connection.gathering_complete_promise().await;
        peer_connection
            .set_local_description(offer)
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
        let _ = gather_complete.recv().await;

        let local = peer_connection
            .local_description()
            .await
            .ok_or_else(|| EndpointError::WebRtc("no local description after gathering".to_string()))?;

        Ok((
            Self {
                peer_connection,
                data_channel,
            },
            local.sdp,
        ))
    }

    /// Applies the remote answer to a previously created offer, completing
    /// the dialing side's negotiation (spec: SIGNALING -> CONNECTED on
    /// receiving the answer).
    pub async fn apply_answer(&self, sdp: &str) -> EndpointResult<()> {
        let answer = RTCSessionDescription::answer(sdp.to_string())
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
        self.peer_connection
            .set_remote_description(answer)
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))
    }

    /// Answering side (spec §4.6 "create a peer manager, generate an
    /// answer"): applies the remote offer and returns the SDP answer plus a
    /// future that resolves once the dialing side's data channel arrives.
    /// The caller wires `on_message`/`on_close` via [`Self::attach`] once it
    /// resolves, since the `webrtc` crate only delivers the channel
    /// asynchronously after negotiation completes.
    pub async fn create_answer(offer_sdp: &str) -> EndpointResult<(Arc<RTCPeerConnection>, mpsc::Receiver<Arc<RTCDataChannel>>, String)> {
        let peer_connection = new_peer_connection().await?;
        let offer = RTCSessionDescription::offer(offer_sdp.to_string())
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
        peer_connection
            .set_remote_description(offer)
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;

        let (tx, rx) = mpsc::channel(1);
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(dc).await;
            })
        }));

        let answer = peer_connection
            .create_answer(None)
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
        let mut gather_complete = peer_connection.gathering_complete_promise().await;
        peer_connection
            .set_local_description(answer)
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
        let _ = gather_complete.recv().await;

        let local = peer_connection
            .local_description()
            .await
            .ok_or_else(|| EndpointError::WebRtc("no local description after gathering".to_string()))?;

        Ok((peer_connection, rx, local.sdp))
    }

    /// Completes construction for the answering side once its data channel
    /// has arrived via the receiver returned by [`Self::create_answer`].
    pub fn attach(
        peer_connection: Arc<RTCPeerConnection>,
        data_channel: Arc<RTCDataChannel>,
        on_message: OnMessage,
        on_close: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        register_data_channel_handlers(&data_channel, on_message, on_close);
        Self {
            peer_connection,
            data_channel,
        }
    }

    pub fn send(&self, bytes: Vec<u8>) {
        let dc = self.data_channel.clone();
        tokio::spawn(async move {
            let _ = dc.send(&bytes::Bytes::from(bytes)).await;
        });
    }

    pub async fn close(&self) -> EndpointResult<()> {
        self.data_channel
            .close()
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))?;
        self.peer_connection
            .close()
            .await
            .map_err(|e| EndpointError::WebRtc(e.to_string()))
    }
}
