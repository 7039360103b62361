use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{agents, token::generate_token};
use crate::shared::AppError;
use crate::store::{JoinOutcome, RoomStore};

/// Outcome of a successful admission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A fresh token was appended to the room's connected list; it must
    /// be handed back to the caller as its bearer credential
    NewToken(String),
    /// The presented token already holds a slot; nothing changed
    Existing,
    /// Automated agent: metadata is readable but no slot is consumed
    /// and no token issued
    AgentBypass,
}

/// Admission control in front of room access
///
/// Decides whether a request may enter a room and maintains the
/// two-party cap. The cap is enforced by the store's conditional-join
/// primitive, never by a read-then-write here.
pub struct GatewayService {
    store: Arc<dyn RoomStore + Send + Sync>,
}

impl GatewayService {
    pub fn new(store: Arc<dyn RoomStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Attempts to admit a request into a room.
    ///
    /// RoomNotFound and RoomFull are user-facing outcomes, not faults;
    /// callers present them distinctly and never retry them.
    #[instrument(skip(self, presented_token, user_agent))]
    pub async fn admit(
        &self,
        room_id: &str,
        presented_token: Option<&str>,
        user_agent: &str,
    ) -> Result<Admission, AppError> {
        let meta = self
            .store
            .get_meta(room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;

        if let Some(token) = presented_token.filter(|t| !t.is_empty()) {
            if meta.has_token(token) {
                debug!(room_id = %room_id, "Re-entry by admitted participant");
                return Ok(Admission::Existing);
            }
        }

        if agents::is_automated_agent(user_agent) {
            info!(room_id = %room_id, user_agent = %user_agent, "Automated agent bypass");
            return Ok(Admission::AgentBypass);
        }

        let token = generate_token();
        match self.store.conditional_join(room_id, &token).await? {
            JoinOutcome::Joined(room) => {
                info!(
                    room_id = %room_id,
                    connected = room.connected.len(),
                    "Participant admitted with new token"
                );
                Ok(Admission::NewToken(token))
            }
            // Fresh tokens cannot collide with stored ones; covered for
            // completeness of the primitive's contract
            JoinOutcome::AlreadyConnected(_) => Ok(Admission::Existing),
            JoinOutcome::Full => {
                debug!(room_id = %room_id, "Admission refused - room is full");
                Err(AppError::RoomFull)
            }
            JoinOutcome::NotFound => Err(AppError::RoomNotFound),
        }
    }
}
