use std::sync::Arc;

/// Events emitted by the core to presentation listeners.
#[derive(Debug, Clone)]
pub enum HeymeEvent {
    StatusChanged(ConnectionStatus),
    ParticipantJoined(ParticipantInfo),
    ParticipantLeft(String), // participant SID
    TrackSubscribed(TrackInfo),
    TrackUnsubscribed(String), // track SID
    TrackMuted { participant_sid: String, source: TrackSource },
    TrackUnmuted { participant_sid: String, source: TrackSource },
    ActiveSpeakersChanged(Vec<String>),
    ConnectionQualityChanged { participant_sid: String, quality: ConnectionQuality },
    /// The server closed the room underneath us.
    RoomDisconnected,
}

/// Where the session lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Unauthenticated,
    Authenticating,
    Connected,
    Failed,
    Disconnected,
}

impl ConnectionStatus {
    /// Whether the login surface should be shown.
    pub fn needs_credentials(self) -> bool {
        !matches!(self, Self::Authenticating | Self::Connected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub sid: String,
    pub identity: String,
    pub name: Option<String>,
    pub is_local: bool,
    pub is_muted: bool,
    pub camera_track_sid: Option<String>,
    pub screen_share_track_sid: Option<String>,
    pub connection_quality: ConnectionQuality,
}

impl ParticipantInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub sid: String,
    pub participant_sid: String,
    pub kind: TrackKind,
    pub source: TrackSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    ScreenShare,
    Unknown,
}

/// Receives events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait HeymeEventListener: Send + Sync {
    fn on_event(&self, event: HeymeEvent);
}

/// Fans events out to every registered listener.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<std::sync::RwLock<Vec<Arc<dyn HeymeEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn HeymeEventListener>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    pub fn emit(&self, event: HeymeEvent) {
        let listeners = match self.listeners.read() {
            Ok(l) => l,
            Err(poisoned) => poisoned.into_inner(),
        };
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}
