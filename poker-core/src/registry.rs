//! Process-wide room registry (C5).
//!
//! Guarded by a single mutex that is never held while blocking on a
//! room actor's channels: `create`/`find`/`list` take the lock only to
//! touch the map itself. Destruction is entirely out-of-band — a room
//! actor that empties out sends its id on `destroy_tx`; a dedicated
//! reaper task drains that channel and removes the entry. This is the
//! lock-ordering rule from spec §4.5: the registry must never wait on
//! a room, and a room must never wait on the registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::room::{RoomActor, RoomHandle, RoomId};
use crate::verifier::PasswordVerifier;

/// Summary returned by [`Registry::list_active`], one per unlocked room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub player_count: usize,
}

struct Inner {
    rooms: HashMap<RoomId, RoomHandle>,
}

/// Owns the `RoomId -> RoomHandle` map. Cheap to clone (wraps an `Arc`).
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<Inner>>,
    destroy_tx: mpsc::UnboundedSender<RoomId>,
    verifier: Arc<dyn PasswordVerifier>,
}

impl Registry {
    /// Build a registry and spawn its reaper task. Keep the returned
    /// join handle only if the caller wants to await a clean shutdown;
    /// dropping the registry's last clone cancels the reaper since its
    /// channel closes.
    pub fn new(verifier: Arc<dyn PasswordVerifier>) -> Self {
        let (destroy_tx, destroy_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Mutex::new(Inner {
            rooms: HashMap::new(),
        }));
        tokio::spawn(Self::run_reaper(inner.clone(), destroy_rx));
        Registry {
            inner,
            destroy_tx,
            verifier,
        }
    }

    async fn run_reaper(inner: Arc<Mutex<Inner>>, mut destroy_rx: mpsc::UnboundedReceiver<RoomId>) {
        while let Some(room_id) = destroy_rx.recv().await {
            let mut guard = inner.lock().await;
            guard.rooms.remove(&room_id);
            drop(guard);
            tracing::debug!(room_id = %room_id, "reaped empty room");
        }
    }

    /// Create a room, spawn its actor, and register it. A creation that
    /// races a reap of some other room is unaffected; this only ever
    /// inserts a brand-new id.
    pub async fn create(&self, creator_name: String) -> RoomHandle {
        let handle = RoomActor::spawn(creator_name, self.destroy_tx.clone(), self.verifier.clone());
        let mut guard = self.inner.lock().await;
        guard.rooms.insert(handle.id().clone(), handle.clone());
        handle
    }

    pub async fn find(&self, id: &RoomId) -> Option<RoomHandle> {
        let guard = self.inner.lock().await;
        guard.rooms.get(id).cloned()
    }

    pub async fn exists(&self, id: &RoomId) -> bool {
        self.find(id).await.is_some()
    }

    /// Unlocked rooms only, ordered by creation time ascending.
    pub async fn list_active(&self) -> Vec<RoomSummary> {
        let guard = self.inner.lock().await;
        let handles: Vec<RoomHandle> = guard.rooms.values().cloned().collect();
        drop(guard);

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let snapshot = handle.snapshot().await;
            if snapshot.is_locked() {
                continue;
            }
            summaries.push((
                snapshot.created_at,
                RoomSummary {
                    id: handle.id().clone(),
                    player_count: snapshot.members.len(),
                },
            ));
        }
        summaries.sort_by_key(|(created_at, _)| *created_at);
        summaries.into_iter().map(|(_, summary)| summary).collect()
    }

    pub async fn user_in_room(&self, id: &RoomId, name: &str) -> bool {
        match self.find(id).await {
            Some(handle) => handle
                .snapshot()
                .await
                .members
                .iter()
                .any(|m| m.name == name),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::VerifierError;

    struct StubVerifier;
    impl PasswordVerifier for StubVerifier {
        fn hash(&self, password: &str) -> Result<String, VerifierError> {
            Ok(password.to_string())
        }
        fn verify(&self, digest: &str, password: &str) -> bool {
            digest == password
        }
    }

    fn registry() -> Registry {
        Registry::new(Arc::new(StubVerifier))
    }

    #[tokio::test]
    async fn list_active_starts_empty() {
        let reg = registry();
        assert!(reg.list_active().await.is_empty());
    }

    #[tokio::test]
    async fn create_then_find_then_reap() {
        let reg = registry();
        let handle = reg.create("Mo".to_string()).await;
        assert!(reg.exists(handle.id()).await);

        let pid = crate::room::ParticipantId::generate();
        let (tx, _rx) = crate::room::outbound_channel();
        handle
            .join(crate::room::Join {
                participant_id: pid,
                name: "Mo".to_string(),
                role: crate::message::Role::ProductOwner,
                outbound: tx,
            })
            .await;
        handle.leave(pid).await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!reg.exists(handle.id()).await);
    }

    #[tokio::test]
    async fn list_active_sorted_ascending_and_excludes_locked() {
        let reg = registry();
        let first = reg.create("A".to_string()).await;
        let second = reg.create("B".to_string()).await;

        let pid = crate::room::ParticipantId::generate();
        let (tx, _rx) = crate::room::outbound_channel();
        second
            .join(crate::room::Join {
                participant_id: pid,
                name: "B".to_string(),
                role: crate::message::Role::ProductOwner,
                outbound: tx,
            })
            .await;
        second
            .send_event(
                pid,
                crate::room::RoomEvent::LockRoom {
                    password: "pw".to_string(),
                    key: second.capability_key().to_string(),
                },
            )
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let summaries = reg.list_active().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, *first.id());
    }
}
