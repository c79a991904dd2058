use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::SessionToken;
use crate::errors::SessionError;
use crate::events::{ConnectionStatus, EventEmitter, HeymeEvent};
use crate::session::SessionHandle;

struct LifecycleState {
    token: Option<SessionToken>,
    status: ConnectionStatus,
    /// Bumped on every new attempt and on teardown. An attempt whose
    /// generation no longer matches when its connect call resolves is stale.
    generation: u64,
    last_error: Option<String>,
}

/// Drives connect/disconnect of the single session handle.
///
/// `Idle --set_token--> Authenticating --ok--> Connected`,
/// `Authenticating --err--> Failed` (token cleared),
/// `any --teardown--> Disconnected`. Outcomes of attempts that were torn
/// down while in flight are discarded.
pub struct SessionController {
    handle: Arc<dyn SessionHandle>,
    server_url: String,
    state: Mutex<LifecycleState>,
    /// Held across `handle.connect` so the handle never sees two attempts.
    connect_gate: Mutex<()>,
    /// Held by `teardown` across `handle.disconnect`; a new attempt waits
    /// on it before connecting.
    disconnecting: Mutex<()>,
    emitter: EventEmitter,
}

impl SessionController {
    pub fn new(
        handle: Arc<dyn SessionHandle>,
        server_url: impl Into<String>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            handle,
            server_url: server_url.into(),
            state: Mutex::new(LifecycleState {
                token: None,
                status: ConnectionStatus::Unauthenticated,
                generation: 0,
                last_error: None,
            }),
            connect_gate: Mutex::new(()),
            disconnecting: Mutex::new(()),
            emitter,
        }
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.lock().await.status
    }

    /// Message of the last failed connect, cleared by the next attempt.
    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn token_present(&self) -> bool {
        self.state.lock().await.token.is_some()
    }

    /// Apply a session token and connect with it.
    ///
    /// Blank tokens are ignored, as is re-applying the token that is already
    /// connecting or connected. A different token tears the current session
    /// down first. Returns once the attempt resolves; a failed attempt
    /// leaves the controller in `Failed` with no token.
    pub async fn set_token(&self, token: SessionToken) -> Result<(), SessionError> {
        if token.as_str().trim().is_empty() {
            tracing::debug!("ignoring empty session token");
            return Ok(());
        }

        let active = {
            let state = self.state.lock().await;
            let active = matches!(
                state.status,
                ConnectionStatus::Authenticating | ConnectionStatus::Connected
            );
            if active && state.token.as_ref() == Some(&token) {
                tracing::debug!("session token already applied ({:?})", state.status);
                return Ok(());
            }
            active
        };

        if active {
            tracing::info!("replacing active session token, tearing down first");
            self.teardown().await;
        }

        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.token = Some(token.clone());
            state.last_error = None;
            self.set_status(&mut state, ConnectionStatus::Authenticating);
            state.generation
        };

        let _gate = self.connect_gate.lock().await;
        {
            let _disconnecting = self.disconnecting.lock().await;
            if self.state.lock().await.generation != generation {
                tracing::debug!("attempt {generation} superseded before connecting");
                return Ok(());
            }
        }

        tracing::info!("connecting to {} (attempt {generation})", self.server_url);
        let result = self.handle.connect(&self.server_url, token.as_str()).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            drop(state);
            tracing::info!("discarding outcome of torn-down attempt {generation}");
            if result.is_ok() {
                self.handle.disconnect().await;
            }
            return Ok(());
        }

        match result {
            Ok(()) => {
                tracing::info!("connected to {}", self.server_url);
                self.set_status(&mut state, ConnectionStatus::Connected);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("failed to connect to room: {e}");
                state.token = None;
                state.last_error = Some(e.to_string());
                self.set_status(&mut state, ConnectionStatus::Failed);
                Err(e)
            }
        }
    }

    /// Disconnect the handle and drop the token, whatever state we are in.
    ///
    /// The status only moves to `Disconnected` if no new attempt started
    /// while the handle was disconnecting.
    pub async fn teardown(&self) {
        let _disconnecting = self.disconnecting.lock().await;
        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.token = None;
            state.generation
        };

        self.handle.disconnect().await;

        let mut state = self.state.lock().await;
        if state.generation == generation {
            self.set_status(&mut state, ConnectionStatus::Disconnected);
            tracing::info!("session torn down");
        } else {
            tracing::debug!("teardown {generation} superseded by a new attempt");
        }
    }

    /// React to the room being closed from the server side.
    ///
    /// Only a connected session is torn down; an attempt in flight keeps
    /// its own outcome.
    pub async fn handle_remote_disconnect(&self) {
        if self.status().await != ConnectionStatus::Connected {
            return;
        }
        tracing::info!("room closed by server");
        self.teardown().await;
    }

    fn set_status(&self, state: &mut LifecycleState, status: ConnectionStatus) {
        if state.status != status {
            state.status = status;
            self.emitter.emit(HeymeEvent::StatusChanged(status));
        }
    }
}
