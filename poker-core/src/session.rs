//! Participant session (C3): the per-connection read/write loop.
//!
//! Two cooperative tasks share one transport handle — an inbound loop
//! (decode, authorize, forward) running in the caller's task, and an
//! outbound loop (serialize, periodic liveness probe) spawned onto its
//! own task. Either noticing a transport failure cancels the other via
//! a shared [`CancellationToken`]; both paths converge on the same
//! idempotent room-leave cleanup.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::message::{Inbound, Outbound, Role};
use crate::room::{self, Join, ParticipantId, RoomEvent, RoomHandle};
use crate::transport::{ChannelError, ChannelReader, ChannelWriter, FramedChannel};

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub ping_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ping_interval: Duration::from_secs(20),
        }
    }
}

pub struct Session {
    participant_id: ParticipantId,
    name: String,
    role: Role,
    room: RoomHandle,
    config: SessionConfig,
}

impl Session {
    pub fn new(name: String, role: Role, room: RoomHandle, config: SessionConfig) -> Self {
        Session {
            participant_id: ParticipantId::generate(),
            name,
            role,
            room,
            config,
        }
    }

    /// Drive the connection to completion: join, run both loops, leave.
    pub async fn run(self, channel: Box<dyn FramedChannel>) {
        let (reader, writer) = channel.split();
        let (outbound_tx, outbound_rx) = room::outbound_channel();

        self.room
            .join(Join {
                participant_id: self.participant_id,
                name: self.name.clone(),
                role: self.role,
                outbound: outbound_tx,
            })
            .await;
        self.room
            .send_event(self.participant_id, RoomEvent::Joined)
            .await;

        let cancel = CancellationToken::new();

        let outbound_task = tokio::spawn(Self::outbound_loop(
            writer,
            outbound_rx,
            self.config,
            cancel.clone(),
        ));

        self.inbound_loop(reader, cancel.clone()).await;
        cancel.cancel();
        let _ = outbound_task.await;

        self.room.leave(self.participant_id).await;
    }

    async fn inbound_loop(&self, mut reader: Box<dyn ChannelReader>, cancel: CancellationToken) {
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => return,
                frame = reader.recv() => frame,
            };

            let text = match frame {
                Ok(text) => text,
                Err(ChannelError::ClosedNormal) | Err(ChannelError::GoingAway) => return,
                Err(ChannelError::Other(reason)) => {
                    tracing::info!(
                        participant = %self.name,
                        error = %reason,
                        "session transport error"
                    );
                    return;
                }
            };

            match Inbound::decode(&text) {
                Ok(inbound) => self.dispatch(inbound).await,
                Err(err) => {
                    tracing::debug!(participant = %self.name, error = %err, "dropping malformed frame");
                }
            }
        }
    }

    async fn dispatch(&self, inbound: Inbound) {
        let event = match (inbound, self.role) {
            (Inbound::Guess(n), Role::Developer) => RoomEvent::Guess(n),
            (Inbound::Skip, Role::Developer) => RoomEvent::Skip,
            (Inbound::Estimate(ticket), Role::ProductOwner) => RoomEvent::Estimate(ticket),
            (Inbound::Reveal, Role::ProductOwner) => RoomEvent::Reveal,
            (Inbound::NewRound, Role::ProductOwner) => RoomEvent::NewRound,
            (Inbound::LockRoom { password, key }, _) => RoomEvent::LockRoom { password, key },
            (Inbound::OpenRoom { key }, _) => RoomEvent::OpenRoom { key },
            (_, role) => {
                tracing::debug!(
                    participant = %self.name,
                    role = ?role,
                    "dropping command not permitted for this role"
                );
                return;
            }
        };
        self.room.send_event(self.participant_id, event).await;
    }

    async fn outbound_loop(
        mut writer: Box<dyn ChannelWriter>,
        mut outbound_rx: mpsc::Receiver<Outbound>,
        config: SessionConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    writer.close().await;
                    return;
                }
                message = outbound_rx.recv() => {
                    match message {
                        Some(message) => {
                            if writer.send_text(message.to_frame()).await.is_err() {
                                cancel.cancel();
                                return;
                            }
                        }
                        None => {
                            writer.close().await;
                            return;
                        }
                    }
                }
                _ = tokio::time::sleep(config.ping_interval) => {
                    if writer.ping().await.is_err() {
                        cancel.cancel();
                        return;
                    }
                }
            }
        }
    }
}

/// Result of the session-boundary authorization table in spec §4.3,
/// exposed for callers (and tests) that want to check it without
/// driving a full session.
pub fn is_permitted(inbound: &Inbound, role: Role) -> bool {
    matches!(
        (inbound, role),
        (Inbound::Guess(_), Role::Developer)
            | (Inbound::Skip, Role::Developer)
            | (Inbound::Estimate(_), Role::ProductOwner)
            | (Inbound::Reveal, Role::ProductOwner)
            | (Inbound::NewRound, Role::ProductOwner)
            | (Inbound::LockRoom { .. }, _)
            | (Inbound::OpenRoom { .. }, _)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimator_may_guess_and_skip_only() {
        assert!(is_permitted(&Inbound::Guess(1), Role::Developer));
        assert!(is_permitted(&Inbound::Skip, Role::Developer));
        assert!(!is_permitted(&Inbound::Guess(1), Role::ProductOwner));
    }

    #[test]
    fn moderator_may_estimate_reveal_and_new_round_only() {
        assert!(is_permitted(
            &Inbound::Estimate("T-1".to_string()),
            Role::ProductOwner
        ));
        assert!(is_permitted(&Inbound::Reveal, Role::ProductOwner));
        assert!(is_permitted(&Inbound::NewRound, Role::ProductOwner));
        assert!(!is_permitted(&Inbound::Reveal, Role::Developer));
        assert!(!is_permitted(&Inbound::NewRound, Role::Developer));
    }

    #[test]
    fn lock_and_open_room_are_permitted_for_any_role() {
        let lock = Inbound::LockRoom {
            password: "pw".to_string(),
            key: "k".to_string(),
        };
        assert!(is_permitted(&lock, Role::Developer));
        assert!(is_permitted(&lock, Role::ProductOwner));
    }
}
