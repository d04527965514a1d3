//! Per-relay client registry (spec §4.7, §3 "Peer registration"): two O(1)
//! indexes, by client UUID and by live connection, with the uniqueness
//! invariant that at most one registration exists per UUID at a time.
//!
//! A live websocket is not itself hashable the way the reference
//! implementation's registry keys on the socket object, so each accepted
//! connection is assigned a monotonic `connection_id` that stands in for
//! "the websocket" as an index key; `by_connection` maps it back to the
//! registered UUID.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::auth::User;

#[derive(Clone)]
pub struct Registration {
    pub uuid: Uuid,
    pub name: String,
    pub user: User,
    pub connection_id: u64,
    pub sender: UnboundedSender<Message>,
}

pub enum RegisterOutcome {
    /// Registration accepted; `displaced` is the prior registration for
    /// this UUID, if any (same user, reconnecting on a new socket).
    Registered { displaced: Option<Registration> },
    /// The UUID is already registered to a different, authenticated user.
    Conflict,
}

#[derive(Default)]
pub struct ClientManager {
    by_uuid: DashMap<Uuid, Registration>,
    next_connection_id: AtomicU64,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn try_register(
        &self,
        uuid: Uuid,
        name: String,
        user: User,
        connection_id: u64,
        sender: UnboundedSender<Message>,
    ) -> RegisterOutcome {
        if let Some(existing) = self.by_uuid.get(&uuid) {
            if existing.user != user {
                return RegisterOutcome::Conflict;
            }
        }
        let new_registration = Registration {
            uuid,
            name,
            user,
            connection_id,
            sender,
        };
        let displaced = self.by_uuid.insert(uuid, new_registration);
        RegisterOutcome::Registered { displaced }
    }

    pub fn get(&self, uuid: &Uuid) -> Option<Registration> {
        self.by_uuid.get(uuid).map(|r| r.clone())
    }

    /// Removes the registration for `uuid`, but only if it still belongs
    /// to `connection_id` (a later registration on a new connection must
    /// not be unregistered by the old connection's teardown).
    pub fn remove_if_current(&self, uuid: &Uuid, connection_id: u64) -> Option<Registration> {
        let is_current = self
            .by_uuid
            .get(uuid)
            .map(|r| r.connection_id == connection_id)
            .unwrap_or(false);
        if is_current {
            self.by_uuid.remove(uuid).map(|(_, r)| r)
        } else {
            None
        }
    }
}
