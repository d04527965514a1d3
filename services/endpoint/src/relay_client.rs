//! Client-side connection to the relay server (spec §4.6/§4.7): registers
//! this endpoint's uuid, forwards outbound `PeerConnectionRequest`s, and
//! reconnects with exponential backoff (1s doubling to a 60s cap) when the
//! socket drops, matching the original `RelayClient`'s backoff constant and
//! the relay's own registration/forward contract.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use proxystore_network::relay::{RelayMessage, RelayRegistrationRequest};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// A handle callers use to send messages to the relay; the background
/// connection task owns the actual socket and survives reconnects.
#[derive(Clone)]
pub struct RelayClient {
    outbound: UnboundedSender<RelayMessage>,
}

impl RelayClient {
    /// Spawns the background connection task and returns a handle plus the
    /// channel of messages the relay sends back (registration responses and
    /// forwarded peer connection requests).
    pub fn connect(address: String, name: String, uuid: Uuid) -> (Self, UnboundedReceiver<RelayMessage>) {
        let (outbound_tx, outbound_rx) = unbounded_channel();
        let (inbound_tx, inbound_rx) = unbounded_channel();
        tokio::spawn(run(address, name, uuid, outbound_rx, inbound_tx));
        (Self { outbound: outbound_tx }, inbound_rx)
    }

    /// Enqueues `msg` for the relay. Transparently survives a disconnected
    /// socket: the background task redrains this queue once reconnected
    /// (spec §4.7 "Sending a message on a closed client transparently
    /// triggers reconnection before the send").
    pub fn send(&self, msg: RelayMessage) {
        let _ = self.outbound.send(msg);
    }
}

async fn run(
    address: String,
    name: String,
    uuid: Uuid,
    mut outbound_rx: UnboundedReceiver<RelayMessage>,
    inbound_tx: UnboundedSender<RelayMessage>,
) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match connect_async(&address).await {
            Ok((ws_stream, _response)) => {
                info!(%address, "connected to relay");
                backoff = INITIAL_BACKOFF;
                let (mut sink, mut stream) = ws_stream.split();

                let registration = RelayMessage::RelayRegistrationRequest(RelayRegistrationRequest {
                    name: name.clone(),
                    uuid,
                });
                if let Ok(json) = registration.to_json() {
                    if sink.send(WsMessage::Text(json)).await.is_err() {
                        warn!("failed to send registration, retrying connection");
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                        continue;
                    }
                }

                loop {
                    tokio::select! {
                        outgoing = outbound_rx.recv() => {
                            let Some(msg) = outgoing else { return };
                            match msg.to_json() {
                                Ok(json) => {
                                    if sink.send(WsMessage::Text(json)).await.is_err() {
                                        warn!("relay write failed, reconnecting");
                                        break;
                                    }
                                }
                                Err(e) => error!(error = %e, "failed to encode outbound relay message"),
                            }
                        }
                        incoming = stream.next() => {
                            match incoming {
                                Some(Ok(WsMessage::Text(text))) => {
                                    match RelayMessage::from_json(&text) {
                                        Ok(parsed) => { let _ = inbound_tx.send(parsed); }
                                        Err(e) => error!(error = %e, "failed to decode relay message"),
                                    }
                                }
                                Some(Ok(WsMessage::Close(_))) | None => {
                                    info!("relay connection closed, reconnecting");
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    error!(error = %e, "relay connection error, reconnecting");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, backoff_secs = backoff.as_secs(), "failed to connect to relay, backing off");
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}
