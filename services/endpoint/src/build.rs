//! Builds the running daemon's state from a loaded [`EndpointConfig`]
//! (spec §6): the local [`ObjectStore`], the relay connection, the peer
//! fabric, and the HTTP [`EndpointState`] they are all wired into.

use std::sync::Arc;

use proxystore_config::EndpointConfig;

use crate::error::EndpointResult;
use crate::http::EndpointState;
use crate::peer::PeerFabric;
use crate::relay_client::RelayClient;
use crate::storage::ObjectStore;

/// Listens forever on the relay's inbound channel, driving `fabric` off of
/// forwarded registration responses and peer connection requests.
fn spawn_relay_listener(
    fabric: Arc<PeerFabric>,
    mut inbound: tokio::sync::mpsc::UnboundedReceiver<proxystore_network::relay::RelayMessage>,
) {
    use proxystore_network::relay::{DescriptionType, RelayMessage};

    tokio::spawn(async move {
        while let Some(msg) = inbound.recv().await {
            match msg {
                RelayMessage::PeerConnectionRequest(req) => {
                    if let Some(err) = req.error {
                        tracing::warn!(peer = %req.source_uuid, error = %err, "relay reported a signaling error");
                        continue;
                    }
                    match req.description_type {
                        DescriptionType::Offer => {
                            if let Err(e) = fabric.on_offer(req.source_uuid, req.description).await {
                                tracing::error!(peer = %req.source_uuid, error = %e, "failed to answer peer offer");
                            }
                        }
                        DescriptionType::Answer => {
                            fabric.on_answer(req.source_uuid, req.description).await;
                        }
                    }
                }
                RelayMessage::RelayResponse(resp) => {
                    if !resp.success {
                        tracing::error!(error = ?resp.error, "relay registration failed");
                    }
                }
                RelayMessage::RelayRegistrationRequest(_) => {
                    tracing::error!("relay sent a registration request, which is client-to-server only");
                }
            }
        }
    });
}

pub fn build_state(config: &EndpointConfig) -> EndpointResult<Arc<EndpointState>> {
    let store = Arc::new(ObjectStore::new(
        config.storage.database_path.clone(),
        config.storage.max_object_size,
    )?);

    let relay_address = config.relay.address.clone().unwrap_or_default();
    let (relay, inbound) = RelayClient::connect(relay_address, config.name.clone(), config.uuid);

    let fabric = PeerFabric::new(config.uuid, config.name.clone(), store.clone(), relay);
    spawn_relay_listener(fabric.clone(), inbound);

    Ok(Arc::new(EndpointState {
        self_uuid: config.uuid,
        self_name: config.name.clone(),
        store,
        fabric,
    }))
}
