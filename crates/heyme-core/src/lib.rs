//! HeyMe conferencing core.
//!
//! Turns user credentials into a LiveKit session token and drives the
//! lifecycle of the single room connection. Media transport and rendering
//! stay with the LiveKit SDK; presentation shells consume the status,
//! events and tiles exposed here.

pub mod auth;
pub mod client;
pub mod controls;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod login;
pub mod participants;
pub mod room;
pub mod session;
pub mod settings;

pub use auth::{Credentials, SessionToken, TokenAcquirer};
pub use client::HeymeClient;
pub use controls::ControlBar;
pub use errors::{AuthError, HeymeError, SessionError, SettingsError};
pub use events::{
    ConnectionQuality, ConnectionStatus, EventEmitter, HeymeEvent, HeymeEventListener,
    ParticipantInfo, TrackInfo, TrackKind, TrackSource,
};
pub use lifecycle::SessionController;
pub use login::{AuthMode, LoginForm};
pub use participants::{ParticipantRoster, Tile};
pub use room::LiveKitSession;
pub use session::{SessionHandle, SessionOptions};
pub use settings::{Settings, SettingsStore};
