//! Authentication gate.
//!
//! The gate starts [`AuthState::Pending`] while the client works out whether
//! a session exists, then settles on `Resolved` or `SignedOut`. Every login
//! and logout bumps a generation counter; anything cached under an older
//! generation belongs to a different session and must be refetched.

use std::sync::Arc;

use tally_core::roles::Role;
use tally_core::types::DbId;
use tokio::sync::watch;

use crate::error::{ClientError, ClientResult};

/// The signed-in user as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: DbId,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Session not yet known. Gated calls wait.
    Pending,
    Resolved(SessionUser),
    SignedOut,
}

#[derive(Debug, Clone)]
struct Snapshot {
    state: AuthState,
    generation: u64,
}

/// Shared, cloneable handle to the session state.
#[derive(Debug, Clone)]
pub struct AuthGate {
    tx: Arc<watch::Sender<Snapshot>>,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot {
            state: AuthState::Pending,
            generation: 0,
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> AuthState {
        self.tx.borrow().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Adopt a session that already existed (for example a stored token that
    /// `/auth/me` accepted). The generation is unchanged unless this replaces
    /// a different resolved user.
    pub fn resume(&self, user: SessionUser) {
        self.tx.send_modify(|snap| {
            let replaces_other = matches!(
                &snap.state,
                AuthState::Resolved(current) if current.user_id != user.user_id
            );
            if replaces_other {
                snap.generation += 1;
            }
            snap.state = AuthState::Resolved(user);
        });
    }

    /// Record a fresh login and start a new generation.
    pub fn signed_in(&self, user: SessionUser) {
        self.tx.send_modify(|snap| {
            snap.state = AuthState::Resolved(user);
            snap.generation += 1;
        });
    }

    /// Record a logout (or a rejected session) and start a new generation.
    pub fn signed_out(&self) {
        self.tx.send_modify(|snap| {
            snap.state = AuthState::SignedOut;
            snap.generation += 1;
        });
    }

    /// Wait until the gate leaves `Pending`.
    ///
    /// Returns the signed-in user and the generation it belongs to, or
    /// [`ClientError::SignedOut`].
    pub async fn resolved(&self) -> ClientResult<(SessionUser, u64)> {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let snap = rx
            .wait_for(|snap| snap.state != AuthState::Pending)
            .await
            .map_err(|_| ClientError::SignedOut)?
            .clone();

        match snap.state {
            AuthState::Resolved(user) => Ok((user, snap.generation)),
            _ => Err(ClientError::SignedOut),
        }
    }
}
