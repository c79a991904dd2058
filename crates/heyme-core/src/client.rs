use std::sync::{Arc, Weak};

use crate::auth::{Credentials, TokenAcquirer};
use crate::controls::ControlBar;
use crate::errors::HeymeError;
use crate::events::{ConnectionStatus, EventEmitter, HeymeEvent, HeymeEventListener};
use crate::lifecycle::SessionController;
use crate::login::LoginForm;
use crate::participants::Tile;
use crate::room::LiveKitSession;
use crate::session::SessionHandle;
use crate::settings::Settings;

/// Everything a presentation shell needs: submit credentials, watch the
/// status, render tiles once connected, leave.
pub struct HeymeClient<H: SessionHandle + 'static = LiveKitSession> {
    acquirer: TokenAcquirer,
    controller: Arc<SessionController>,
    session: Arc<H>,
    emitter: EventEmitter,
}

impl HeymeClient<LiveKitSession> {
    pub fn new(settings: &Settings) -> Result<Self, HeymeError> {
        let emitter = EventEmitter::new();
        let session = Arc::new(LiveKitSession::new(emitter.clone()));
        Self::with_session(settings, session, emitter)
    }

    pub async fn tiles(&self) -> Vec<Tile> {
        self.session.tiles().await
    }

    pub fn controls(&self) -> Arc<ControlBar> {
        self.session.controls()
    }
}

/// Moves the controller out of `Connected` when the server closes the room.
struct RemoteDisconnectListener(Weak<SessionController>);

impl HeymeEventListener for RemoteDisconnectListener {
    fn on_event(&self, event: HeymeEvent) {
        if !matches!(event, HeymeEvent::RoomDisconnected) {
            return;
        }
        let Some(controller) = self.0.upgrade() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { controller.handle_remote_disconnect().await });
            }
            Err(_) => tracing::warn!("room disconnected outside a tokio runtime"),
        }
    }
}

impl<H: SessionHandle + 'static> HeymeClient<H> {
    pub fn with_session(
        settings: &Settings,
        session: Arc<H>,
        emitter: EventEmitter,
    ) -> Result<Self, HeymeError> {
        let acquirer = TokenAcquirer::new(&settings.api_base()?)?;
        let controller = Arc::new(SessionController::new(
            session.clone(),
            settings.livekit_ws_url()?,
            emitter.clone(),
        ));
        emitter.add_listener(Arc::new(RemoteDisconnectListener(Arc::downgrade(&controller))));
        Ok(Self {
            acquirer,
            controller,
            session,
            emitter,
        })
    }

    pub fn add_listener(&self, listener: Arc<dyn HeymeEventListener>) {
        self.emitter.add_listener(listener);
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.controller.status().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.controller.last_error().await
    }

    /// Acquire a session token and connect with it.
    ///
    /// Acquisition errors leave the status untouched.
    pub async fn submit(&self, credentials: &Credentials) -> Result<(), HeymeError> {
        let token = self.acquirer.acquire(credentials).await?;
        self.controller.set_token(token).await?;
        Ok(())
    }

    /// Submit the login form; any failure ends up in `form.error`.
    pub async fn submit_form(&self, form: &mut LoginForm) -> ConnectionStatus {
        if let Some(token) = form.submit(&self.acquirer).await {
            if let Err(e) = self.controller.set_token(token).await {
                form.error = Some(e.to_string());
            }
        }
        self.controller.status().await
    }

    pub async fn leave(&self) {
        self.controller.teardown().await;
    }
}
