//! Read-only query surface (C6) consumed by the outer HTTP layer.
//!
//! Every operation here is a pure read: no retries, no mutation, and
//! nothing here is fatal to the process. `Admission` additionally
//! gates the one place a query result changes server behavior — the
//! session connect path decides whether to even open a connection.

use unicode_segmentation::UnicodeSegmentation;

use crate::message::Role;
use crate::room::{CapabilityKey, RoomId};
use crate::registry::{Registry, RoomSummary};

pub const MAX_NAME_RUNES: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomState {
    pub in_progress: bool,
    pub is_locked: bool,
}

impl RoomState {
    pub const UNKNOWN: RoomState = RoomState {
        in_progress: false,
        is_locked: false,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    Creator { key: CapabilityKey },
    NotCreator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberView {
    pub name: String,
    pub role: Role,
    pub is_done: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    NameTooLong,
    RoomNotFound,
    NameInUse,
}

pub struct QuerySurface<'a> {
    registry: &'a Registry,
}

impl<'a> QuerySurface<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        QuerySurface { registry }
    }

    pub async fn list_active(&self) -> Vec<RoomSummary> {
        self.registry.list_active().await
    }

    pub async fn room_state(&self, id: &RoomId) -> RoomState {
        match self.registry.find(id).await {
            Some(handle) => {
                let snapshot = handle.snapshot().await;
                RoomState {
                    in_progress: snapshot.in_progress,
                    is_locked: snapshot.is_locked(),
                }
            }
            None => RoomState::UNKNOWN,
        }
    }

    pub async fn permissions(&self, id: &RoomId, name: &str) -> Option<Permissions> {
        let handle = self.registry.find(id).await?;
        if !handle.creator_name().is_empty() && handle.creator_name() == name {
            Some(Permissions::Creator {
                key: handle.capability_key(),
            })
        } else {
            Some(Permissions::NotCreator)
        }
    }

    /// Sorted by name, case-sensitive Unicode codepoint order. Unknown
    /// room yields an empty list rather than an error.
    pub async fn members(&self, id: &RoomId) -> Vec<MemberView> {
        let Some(handle) = self.registry.find(id).await else {
            return Vec::new();
        };
        let snapshot = handle.snapshot().await;
        let mut members: Vec<MemberView> = snapshot
            .members
            .into_iter()
            .map(|m| MemberView {
                is_done: match m.role {
                    Role::Developer => Some(m.current_guess > 0 || m.skipped),
                    Role::ProductOwner => None,
                },
                name: m.name,
                role: m.role,
            })
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }

    /// `None` means the room is unknown, which callers treat as
    /// forbidden rather than a definite wrong-password answer.
    pub async fn authenticate(&self, id: &RoomId, password: &str, verifier: &dyn crate::verifier::PasswordVerifier) -> Option<bool> {
        let handle = self.registry.find(id).await?;
        let snapshot = handle.snapshot().await;
        Some(match snapshot.password_digest {
            Some(digest) => verifier.verify(&digest, password),
            None => false,
        })
    }

    pub async fn user_in_room(&self, id: &RoomId, name: &str) -> bool {
        self.registry.user_in_room(id, name).await
    }

    /// Admission check run before a session is ever created: name
    /// length, room existence, then name collision, in that order.
    pub async fn admit(&self, id: &RoomId, name: &str) -> Result<(), AdmissionError> {
        if name.graphemes(true).count() > MAX_NAME_RUNES {
            return Err(AdmissionError::NameTooLong);
        }
        let handle = self
            .registry
            .find(id)
            .await
            .ok_or(AdmissionError::RoomNotFound)?;
        let in_use = handle
            .snapshot()
            .await
            .members
            .iter()
            .any(|m| m.name == name);
        if in_use {
            return Err(AdmissionError::NameInUse);
        }
        Ok(())
    }
}
