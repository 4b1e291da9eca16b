//! The room actor (C4): single-writer owner of one room's mutable state.
//!
//! A [`RoomActor`] is spawned once per room and drained by exactly one
//! task. Everyone else — sessions, the registry, the query surface —
//! only ever touches a cheap, cloneable [`RoomHandle`]: three mailbox
//! senders plus a read-only [`RoomSnapshot`] lock that the actor
//! refreshes after every mutation, so status queries never wait behind
//! the actor's event backlog.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::message::{Outbound, Role};
use crate::verifier::PasswordVerifier;

/// Opaque room identifier, a freshly minted UUIDv4 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn generate() -> Self {
        RoomId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomId {
    type Err = uuid::Error;

    /// A room id must parse as a UUID (spec boundary behavior); the
    /// canonical string form is what callers and the registry key on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: Uuid = s.parse()?;
        Ok(RoomId(parsed.to_string()))
    }
}

/// Per-room secret, combined with the creator's name, to lock/unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityKey(Uuid);

impl CapabilityKey {
    pub fn generate() -> Self {
        CapabilityKey(Uuid::new_v4())
    }

    pub fn matches(&self, candidate: &str) -> bool {
        candidate
            .parse::<Uuid>()
            .map(|u| u == self.0)
            .unwrap_or(false)
    }
}

impl std::fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_string())
    }
}

/// Identity key for a participant, distinct from its display name so
/// the room tolerates (at its own layer) duplicate names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    pub fn generate() -> Self {
        ParticipantId(Uuid::new_v4())
    }
}

struct MemberState {
    name: String,
    role: Role,
    current_guess: u32,
    skipped: bool,
    outbound: mpsc::Sender<Outbound>,
}

impl MemberState {
    fn is_done(&self) -> bool {
        self.current_guess > 0 || self.skipped
    }

    fn reset(&mut self) {
        self.current_guess = 0;
        self.skipped = false;
    }
}

/// A reveal-round entry for one estimator, sent verbatim on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevealEntry {
    pub name: String,
    pub role: Role,
    pub guess: u32,
    #[serde(rename = "doSkip")]
    pub do_skip: bool,
}

/// Read-only, actor-refreshed replica used by status/listing queries.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub in_progress: bool,
    pub password_digest: Option<String>,
    pub created_at: Instant,
    pub members: Vec<MemberSnapshot>,
}

impl RoomSnapshot {
    pub fn is_locked(&self) -> bool {
        self.password_digest.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MemberSnapshot {
    pub name: String,
    pub role: Role,
    pub current_guess: u32,
    pub skipped: bool,
}

/// Join request, constructed by a session once it has an outbound
/// channel wired up.
pub struct Join {
    pub participant_id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub outbound: mpsc::Sender<Outbound>,
}

/// One command arriving on the `events` mailbox, tagged with the
/// originating participant for authorization/logging.
pub enum RoomEvent {
    /// Published by the session right after it signals `Join` on the
    /// join mailbox — see spec §4.4's join-handling note.
    Joined,
    Estimate(String),
    Guess(u32),
    Skip,
    NewRound,
    Reveal,
    LockRoom { password: String, key: String },
    OpenRoom { key: String },
}

pub struct EventEnvelope {
    pub participant_id: ParticipantId,
    pub event: RoomEvent,
}

const OUTBOUND_CHANNEL_CAPACITY: usize = 32;

pub fn outbound_channel() -> (mpsc::Sender<Outbound>, mpsc::Receiver<Outbound>) {
    mpsc::channel(OUTBOUND_CHANNEL_CAPACITY)
}

/// Cheap, cloneable reference to a running room actor.
#[derive(Clone)]
pub struct RoomHandle {
    id: RoomId,
    creator_name: String,
    capability_key: CapabilityKey,
    join_tx: mpsc::Sender<Join>,
    leave_tx: mpsc::Sender<ParticipantId>,
    event_tx: mpsc::Sender<EventEnvelope>,
    status: Arc<RwLock<RoomSnapshot>>,
}

impl RoomHandle {
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn creator_name(&self) -> &str {
        &self.creator_name
    }

    pub fn capability_key(&self) -> CapabilityKey {
        self.capability_key
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        self.status.read().await.clone()
    }

    pub async fn join(&self, join: Join) {
        // A full mailbox would mean the actor is gone; the session's
        // own exit path (leave) then has nothing to undo.
        let _ = self.join_tx.send(join).await;
    }

    pub async fn leave(&self, participant_id: ParticipantId) {
        let _ = self.leave_tx.send(participant_id).await;
    }

    pub async fn send_event(&self, participant_id: ParticipantId, event: RoomEvent) {
        let _ = self
            .event_tx
            .send(EventEnvelope {
                participant_id,
                event,
            })
            .await;
    }
}

/// Single-writer room actor. Run with [`RoomActor::spawn`].
pub struct RoomActor {
    id: RoomId,
    creator_name: String,
    capability_key: CapabilityKey,
    members: HashMap<ParticipantId, MemberState>,
    in_progress: bool,
    password_digest: Option<String>,
    created_at: Instant,
    join_rx: mpsc::Receiver<Join>,
    leave_rx: mpsc::Receiver<ParticipantId>,
    event_rx: mpsc::Receiver<EventEnvelope>,
    destroy_tx: mpsc::UnboundedSender<RoomId>,
    status: Arc<RwLock<RoomSnapshot>>,
    verifier: Arc<dyn PasswordVerifier>,
}

const MAILBOX_CAPACITY: usize = 64;

impl RoomActor {
    /// Build the actor plus its handle and spawn the run loop. The
    /// handle is what the registry stores and sessions clone.
    pub fn spawn(
        creator_name: String,
        destroy_tx: mpsc::UnboundedSender<RoomId>,
        verifier: Arc<dyn PasswordVerifier>,
    ) -> RoomHandle {
        let id = RoomId::generate();
        let capability_key = CapabilityKey::generate();
        let created_at = Instant::now();

        let (join_tx, join_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (leave_tx, leave_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(MAILBOX_CAPACITY);

        let status = Arc::new(RwLock::new(RoomSnapshot {
            in_progress: false,
            password_digest: None,
            created_at,
            members: Vec::new(),
        }));

        let actor = RoomActor {
            id: id.clone(),
            creator_name: creator_name.clone(),
            capability_key,
            members: HashMap::new(),
            in_progress: false,
            password_digest: None,
            created_at,
            join_rx,
            leave_rx,
            event_rx,
            destroy_tx,
            status: status.clone(),
            verifier,
        };

        tokio::spawn(actor.run());

        RoomHandle {
            id,
            creator_name,
            capability_key,
            join_tx,
            leave_tx,
            event_tx,
            status,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                join = self.join_rx.recv() => {
                    match join {
                        Some(join) => self.handle_join(join).await,
                        None => break,
                    }
                }
                leave = self.leave_rx.recv() => {
                    match leave {
                        Some(participant_id) => {
                            let should_stop = self.handle_leave(participant_id).await;
                            if should_stop {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                event = self.event_rx.recv() => {
                    match event {
                        Some(envelope) => self.handle_event(envelope).await,
                        None => break,
                    }
                }
            }
        }
    }

    async fn handle_join(&mut self, join: Join) {
        self.members.insert(
            join.participant_id,
            MemberState {
                name: join.name,
                role: join.role,
                current_guess: 0,
                skipped: false,
                outbound: join.outbound,
            },
        );
        self.refresh_snapshot().await;
    }

    /// Returns true if the room is now empty and the actor should stop.
    async fn handle_leave(&mut self, participant_id: ParticipantId) -> bool {
        let Some(departed) = self.members.remove(&participant_id) else {
            // Idempotent: a second leave for the same participant is a no-op.
            return self.members.is_empty();
        };

        if self.in_progress {
            for member in self.members.values_mut() {
                if member.role == Role::Developer {
                    member.reset();
                }
            }
            self.in_progress = false;
            self.broadcast(Outbound::NewRound).await;
        } else {
            self.broadcast(Outbound::Leave(departed.name)).await;
        }

        self.refresh_snapshot().await;

        if self.members.is_empty() {
            let _ = self.destroy_tx.send(self.id.clone());
            true
        } else {
            false
        }
    }

    async fn handle_event(&mut self, envelope: EventEnvelope) {
        let participant_id = envelope.participant_id;
        match envelope.event {
            RoomEvent::Joined => {
                self.broadcast(Outbound::Join).await;
            }
            RoomEvent::Estimate(ticket_id) => {
                self.in_progress = true;
                self.broadcast(Outbound::Estimate(ticket_id)).await;
            }
            RoomEvent::Guess(n) => {
                let Some(member) = self.members.get_mut(&participant_id) else {
                    return;
                };
                if member.role != Role::Developer {
                    return;
                }
                member.current_guess = n;
                member.skipped = false;
                let everyone_done = self.all_estimators_done();
                self.send_to(participant_id, Outbound::YouGuessed(n)).await;
                if everyone_done {
                    self.broadcast(Outbound::EveryoneDone).await;
                } else {
                    self.broadcast(Outbound::DeveloperGuessed).await;
                }
            }
            RoomEvent::Skip => {
                let Some(member) = self.members.get_mut(&participant_id) else {
                    return;
                };
                if member.role != Role::Developer {
                    return;
                }
                member.skipped = true;
                member.current_guess = 0;
                let everyone_done = self.all_estimators_done();
                self.send_to(participant_id, Outbound::YouSkipped).await;
                if everyone_done {
                    self.broadcast(Outbound::EveryoneDone).await;
                } else {
                    self.broadcast(Outbound::DeveloperSkipped).await;
                }
            }
            RoomEvent::NewRound => {
                for member in self.members.values_mut() {
                    if member.role == Role::Developer {
                        member.reset();
                    }
                }
                self.in_progress = false;
                self.broadcast(Outbound::NewRound).await;
            }
            RoomEvent::Reveal => {
                let entries = self.reveal_entries();
                self.broadcast(Outbound::Reveal(entries)).await;
            }
            RoomEvent::LockRoom { password, key } => {
                if !self.authorized(participant_id, &key) {
                    return;
                }
                match self.verifier.hash(&password) {
                    Ok(digest) => {
                        self.password_digest = Some(digest);
                        self.broadcast(Outbound::RoomLocked).await;
                    }
                    Err(_) => return,
                }
            }
            RoomEvent::OpenRoom { key } => {
                if !self.authorized(participant_id, &key) {
                    return;
                }
                self.password_digest = None;
                self.broadcast(Outbound::RoomOpened).await;
            }
        }
        self.refresh_snapshot().await;
    }

    fn authorized(&self, participant_id: ParticipantId, key: &str) -> bool {
        if !self.capability_key.matches(key) {
            return false;
        }
        self.members
            .get(&participant_id)
            .map(|m| m.name == self.creator_name && !self.creator_name.is_empty())
            .unwrap_or(false)
    }

    fn all_estimators_done(&self) -> bool {
        self.members
            .values()
            .filter(|m| m.role == Role::Developer)
            .all(|m| m.is_done())
    }

    fn reveal_entries(&self) -> Vec<RevealEntry> {
        self.members
            .values()
            .filter(|m| m.role == Role::Developer)
            .map(|m| RevealEntry {
                name: m.name.clone(),
                role: m.role,
                guess: m.current_guess,
                do_skip: m.skipped,
            })
            .collect()
    }

    async fn broadcast(&self, message: Outbound) {
        for member in self.members.values() {
            self.try_deliver(member, message.clone());
        }
    }

    async fn send_to(&self, participant_id: ParticipantId, message: Outbound) {
        if let Some(member) = self.members.get(&participant_id) {
            self.try_deliver(member, message);
        }
    }

    /// Non-blocking, per-session drop-and-log: one slow client never
    /// back-pressures the room actor or the rest of the room.
    fn try_deliver(&self, member: &MemberState, message: Outbound) {
        if let Err(err) = member.outbound.try_send(message) {
            tracing::warn!(
                room_id = %self.id,
                participant = %member.name,
                error = %err,
                "dropping outbound message for slow or closed session"
            );
        }
    }

    async fn refresh_snapshot(&self) {
        let members = self
            .members
            .values()
            .map(|m| MemberSnapshot {
                name: m.name.clone(),
                role: m.role,
                current_guess: m.current_guess,
                skipped: m.skipped,
            })
            .collect();
        let mut status = self.status.write().await;
        status.in_progress = self.in_progress;
        status.password_digest = self.password_digest.clone();
        status.members = members;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::VerifierError;

    struct StubVerifier;

    impl PasswordVerifier for StubVerifier {
        fn hash(&self, password: &str) -> Result<String, VerifierError> {
            Ok(format!("digest:{password}"))
        }

        fn verify(&self, digest: &str, password: &str) -> bool {
            digest == format!("digest:{password}")
        }
    }

    async fn spawn_room() -> (RoomHandle, mpsc::UnboundedReceiver<RoomId>) {
        let (destroy_tx, destroy_rx) = mpsc::unbounded_channel();
        let handle = RoomActor::spawn("Mo".to_string(), destroy_tx, Arc::new(StubVerifier));
        (handle, destroy_rx)
    }

    async fn join(handle: &RoomHandle, name: &str, role: Role) -> (ParticipantId, mpsc::Receiver<Outbound>) {
        let id = ParticipantId::generate();
        let (tx, rx) = outbound_channel();
        handle
            .join(Join {
                participant_id: id,
                name: name.to_string(),
                role,
                outbound: tx,
            })
            .await;
        handle.send_event(id, RoomEvent::Joined).await;
        (id, rx)
    }

    #[tokio::test]
    async fn single_estimator_round_trip() {
        let (room, _destroy_rx) = spawn_room().await;
        let (alice, mut alice_rx) = join(&room, "Alice", Role::Developer).await;
        let (mo, mut mo_rx) = join(&room, "Mo", Role::ProductOwner).await;

        room.send_event(mo, RoomEvent::Estimate("T-1".to_string()))
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(room.snapshot().await.in_progress);

        room.send_event(alice, RoomEvent::Guess(3)).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        // drain Alice's join/estimate/you-guessed/everyone-done
        let mut alice_msgs = Vec::new();
        while let Ok(m) = alice_rx.try_recv() {
            alice_msgs.push(m);
        }
        assert!(alice_msgs.contains(&Outbound::YouGuessed(3)));
        assert!(alice_msgs.contains(&Outbound::EveryoneDone));

        let mut mo_msgs = Vec::new();
        while let Ok(m) = mo_rx.try_recv() {
            mo_msgs.push(m);
        }
        assert!(mo_msgs.contains(&Outbound::EveryoneDone));
        assert!(!mo_msgs.contains(&Outbound::DeveloperGuessed));
    }

    #[tokio::test]
    async fn skip_coexists_with_guess_and_reveal_reports_both() {
        let (room, _destroy_rx) = spawn_room().await;
        let (alice, _a_rx) = join(&room, "Alice", Role::Developer).await;
        let (bob, mut bob_rx) = join(&room, "Bob", Role::Developer).await;
        let (mo, _mo_rx) = join(&room, "Mo", Role::ProductOwner).await;

        room.send_event(mo, RoomEvent::Estimate("T-2".to_string()))
            .await;
        room.send_event(alice, RoomEvent::Guess(5)).await;
        room.send_event(bob, RoomEvent::Skip).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let mut bob_msgs = Vec::new();
        while let Ok(m) = bob_rx.try_recv() {
            bob_msgs.push(m);
        }
        assert!(bob_msgs.contains(&Outbound::YouSkipped));
        assert!(bob_msgs.contains(&Outbound::EveryoneDone));
        assert!(!bob_msgs.contains(&Outbound::DeveloperSkipped));

        let snap = room.snapshot().await;
        let bob_snap = snap.members.iter().find(|m| m.name == "Bob").unwrap();
        assert!(bob_snap.skipped);
        assert_eq!(bob_snap.current_guess, 0);
    }

    #[tokio::test]
    async fn disruptive_leave_forces_new_round() {
        let (room, _destroy_rx) = spawn_room().await;
        let (mo, _mo_rx) = join(&room, "Mo", Role::ProductOwner).await;
        let (alice, mut alice_rx) = join(&room, "Alice", Role::Developer).await;
        let (bob, _bob_rx) = join(&room, "Bob", Role::Developer).await;

        room.send_event(mo, RoomEvent::Estimate("T-3".to_string()))
            .await;
        room.send_event(alice, RoomEvent::Guess(2)).await;
        room.leave(bob).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let snap = room.snapshot().await;
        assert!(!snap.in_progress);
        let alice_snap = snap.members.iter().find(|m| m.name == "Alice").unwrap();
        assert_eq!(alice_snap.current_guess, 0);

        let mut alice_msgs = Vec::new();
        while let Ok(m) = alice_rx.try_recv() {
            alice_msgs.push(m);
        }
        assert!(alice_msgs.contains(&Outbound::NewRound));
    }

    #[tokio::test]
    async fn empty_room_signals_destroy() {
        let (room, mut destroy_rx) = spawn_room().await;
        let (mo, _mo_rx) = join(&room, "Mo", Role::ProductOwner).await;

        room.leave(mo).await;

        let destroyed = destroy_rx.recv().await;
        assert_eq!(destroyed, Some(room.id().clone()));
    }

    #[tokio::test]
    async fn double_leave_is_a_no_op() {
        let (room, mut destroy_rx) = spawn_room().await;
        let (mo, _mo_rx) = join(&room, "Mo", Role::ProductOwner).await;

        room.leave(mo).await;
        room.leave(mo).await;

        let destroyed = destroy_rx.recv().await;
        assert_eq!(destroyed, Some(room.id().clone()));
        assert!(destroy_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn lock_requires_creator_name_and_key() {
        let (room, _destroy_rx) = spawn_room().await;
        let (mo, mut mo_rx) = join(&room, "Mo", Role::ProductOwner).await;
        let (alice, mut alice_rx) = join(&room, "Alice", Role::Developer).await;

        room.send_event(
            alice,
            RoomEvent::LockRoom {
                password: "pw".to_string(),
                key: room.capability_key().to_string(),
            },
        )
        .await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!room.snapshot().await.is_locked());
        assert!(alice_rx.try_recv().is_err());

        room.send_event(
            mo,
            RoomEvent::LockRoom {
                password: "pw".to_string(),
                key: room.capability_key().to_string(),
            },
        )
        .await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(room.snapshot().await.is_locked());
        let mut mo_msgs = Vec::new();
        while let Ok(m) = mo_rx.try_recv() {
            mo_msgs.push(m);
        }
        assert!(mo_msgs.contains(&Outbound::RoomLocked));
    }

    #[test]
    fn room_id_must_parse_as_uuid() {
        assert!("not-a-uuid".parse::<RoomId>().is_err());
        let id = RoomId::generate();
        assert!(id.as_str().parse::<RoomId>().is_ok());
    }
}
