use std::sync::Arc;

use async_trait::async_trait;
use livekit::participant::{
    ConnectionQuality as LkConnectionQuality, LocalParticipant, RemoteParticipant,
};
use livekit::prelude::{Room, RoomEvent, RoomOptions};
use livekit::track::{TrackKind as LkTrackKind, TrackSource as LkTrackSource};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::controls::ControlBar;
use crate::errors::SessionError;
use crate::events::{
    ConnectionQuality, EventEmitter, HeymeEvent, ParticipantInfo, TrackInfo, TrackKind,
    TrackSource,
};
use crate::participants::{ParticipantRoster, Tile};
use crate::session::{SessionHandle, SessionOptions};

/// The LiveKit room, wrapped as a reusable session handle.
///
/// Created once at start-up. `connect` opens a fresh `Room` with the fixed
/// options and keeps the participant roster current until `disconnect`.
pub struct LiveKitSession {
    room: Arc<Mutex<Option<Arc<Room>>>>,
    roster: Arc<Mutex<ParticipantRoster>>,
    emitter: EventEmitter,
    options: SessionOptions,
    event_task: Mutex<Option<JoinHandle<()>>>,
    controls: Arc<ControlBar>,
}

impl LiveKitSession {
    pub fn new(emitter: EventEmitter) -> Self {
        let room = Arc::new(Mutex::new(None));
        Self {
            controls: Arc::new(ControlBar::new(room.clone())),
            room,
            roster: Arc::new(Mutex::new(ParticipantRoster::new())),
            emitter,
            options: SessionOptions::FIXED,
            event_task: Mutex::new(None),
        }
    }

    /// Control bar bound to whatever room is currently open.
    pub fn controls(&self) -> Arc<ControlBar> {
        self.controls.clone()
    }

    pub async fn tiles(&self) -> Vec<Tile> {
        self.roster.lock().await.tiles()
    }

    fn room_options(&self) -> RoomOptions {
        let mut options = RoomOptions::default();
        options.auto_subscribe = self.options.auto_subscribe;
        options.adaptive_stream = self.options.adaptive_stream;
        options.dynacast = self.options.dynacast;
        options
    }

    fn lk_source_to_heyme(source: LkTrackSource) -> TrackSource {
        match source {
            LkTrackSource::Microphone => TrackSource::Microphone,
            LkTrackSource::Camera => TrackSource::Camera,
            LkTrackSource::Screenshare => TrackSource::ScreenShare,
            _ => TrackSource::Unknown,
        }
    }

    fn local_participant_to_info(local: &LocalParticipant) -> ParticipantInfo {
        let name = Some(local.name().to_string()).filter(|n| !n.is_empty());
        let publications = local.track_publications();
        let track_for = |source: LkTrackSource| {
            publications
                .values()
                .find(|p| p.source() == source)
                .map(|p| p.sid().to_string())
        };
        let is_muted = publications
            .values()
            .any(|p| p.kind() == LkTrackKind::Audio && p.is_muted());

        ParticipantInfo {
            sid: local.sid().to_string(),
            identity: local.identity().to_string(),
            name,
            is_local: true,
            is_muted,
            camera_track_sid: track_for(LkTrackSource::Camera),
            screen_share_track_sid: track_for(LkTrackSource::Screenshare),
            connection_quality: ConnectionQuality::Excellent,
        }
    }

    fn remote_participant_to_info(p: &RemoteParticipant) -> ParticipantInfo {
        let name = Some(p.name().to_string()).filter(|n| !n.is_empty());

        // Video tracks are attached on TrackSubscribed only, so a tile never
        // points at a track that is not subscribed yet.
        let is_muted = p
            .track_publications()
            .values()
            .any(|pub_| pub_.kind() == LkTrackKind::Audio && pub_.is_muted());

        ParticipantInfo {
            sid: p.sid().to_string(),
            identity: p.identity().to_string(),
            name,
            is_local: false,
            is_muted,
            camera_track_sid: None,
            screen_share_track_sid: None,
            connection_quality: ConnectionQuality::Good,
        }
    }

    fn set_video_track(info: &mut ParticipantInfo, source: TrackSource, track_sid: Option<String>) {
        match source {
            TrackSource::Camera => info.camera_track_sid = track_sid,
            TrackSource::ScreenShare => info.screen_share_track_sid = track_sid,
            _ => {}
        }
    }

    async fn event_loop(
        mut events: tokio::sync::mpsc::UnboundedReceiver<RoomEvent>,
        emitter: EventEmitter,
        roster: Arc<Mutex<ParticipantRoster>>,
        room_ref: Arc<Mutex<Option<Arc<Room>>>>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                RoomEvent::Disconnected { reason } => {
                    tracing::info!("room disconnected by server: {reason:?}");
                    roster.lock().await.clear();
                    *room_ref.lock().await = None;
                    emitter.emit(HeymeEvent::RoomDisconnected);
                    break;
                }

                RoomEvent::ParticipantConnected(participant) => {
                    let info = Self::remote_participant_to_info(&participant);
                    roster.lock().await.add_participant(info.clone());
                    emitter.emit(HeymeEvent::ParticipantJoined(info));
                }

                RoomEvent::ParticipantDisconnected(participant) => {
                    let sid = participant.sid().to_string();
                    roster.lock().await.remove_participant(&sid);
                    emitter.emit(HeymeEvent::ParticipantLeft(sid));
                }

                RoomEvent::TrackSubscribed { track, publication, participant } => {
                    let source = Self::lk_source_to_heyme(publication.source());
                    let kind = match publication.kind() {
                        LkTrackKind::Audio => TrackKind::Audio,
                        LkTrackKind::Video => TrackKind::Video,
                    };
                    let psid = participant.sid().to_string();
                    let track_sid = track.sid().to_string();

                    if kind == TrackKind::Video {
                        let mut roster = roster.lock().await;
                        if let Some(p) = roster.participant_mut(&psid) {
                            Self::set_video_track(p, source, Some(track_sid.clone()));
                        }
                    }

                    emitter.emit(HeymeEvent::TrackSubscribed(TrackInfo {
                        sid: track_sid,
                        participant_sid: psid,
                        kind,
                        source,
                    }));
                }

                RoomEvent::TrackUnsubscribed { track, publication, participant } => {
                    let psid = participant.sid().to_string();
                    let track_sid = track.sid().to_string();

                    if publication.kind() == LkTrackKind::Video {
                        let source = Self::lk_source_to_heyme(publication.source());
                        let mut roster = roster.lock().await;
                        if let Some(p) = roster.participant_mut(&psid) {
                            Self::set_video_track(p, source, None);
                        }
                    }

                    emitter.emit(HeymeEvent::TrackUnsubscribed(track_sid));
                }

                RoomEvent::LocalTrackPublished { publication, participant, .. } => {
                    let source = Self::lk_source_to_heyme(publication.source());
                    let psid = participant.sid().to_string();
                    let mut roster = roster.lock().await;
                    if let Some(p) = roster.participant_mut(&psid) {
                        Self::set_video_track(p, source, Some(publication.sid().to_string()));
                    }
                }

                RoomEvent::LocalTrackUnpublished { publication, participant, .. } => {
                    let source = Self::lk_source_to_heyme(publication.source());
                    let psid = participant.sid().to_string();
                    let mut roster = roster.lock().await;
                    if let Some(p) = roster.participant_mut(&psid) {
                        Self::set_video_track(p, source, None);
                    }
                }

                RoomEvent::TrackMuted { participant, publication } => {
                    let psid = participant.sid().to_string();
                    let source = Self::lk_source_to_heyme(publication.source());
                    if source == TrackSource::Microphone {
                        if let Some(p) = roster.lock().await.participant_mut(&psid) {
                            p.is_muted = true;
                        }
                    }
                    emitter.emit(HeymeEvent::TrackMuted { participant_sid: psid, source });
                }

                RoomEvent::TrackUnmuted { participant, publication } => {
                    let psid = participant.sid().to_string();
                    let source = Self::lk_source_to_heyme(publication.source());
                    if source == TrackSource::Microphone {
                        if let Some(p) = roster.lock().await.participant_mut(&psid) {
                            p.is_muted = false;
                        }
                    }
                    emitter.emit(HeymeEvent::TrackUnmuted { participant_sid: psid, source });
                }

                RoomEvent::ActiveSpeakersChanged { speakers } => {
                    let sids: Vec<String> = speakers.iter().map(|p| p.sid().to_string()).collect();
                    roster.lock().await.set_active_speakers(sids.clone());
                    emitter.emit(HeymeEvent::ActiveSpeakersChanged(sids));
                }

                RoomEvent::ConnectionQualityChanged { quality, participant } => {
                    let psid = participant.sid().to_string();
                    let quality = match quality {
                        LkConnectionQuality::Excellent => ConnectionQuality::Excellent,
                        LkConnectionQuality::Good => ConnectionQuality::Good,
                        LkConnectionQuality::Poor => ConnectionQuality::Poor,
                        LkConnectionQuality::Lost => ConnectionQuality::Lost,
                    };
                    if let Some(p) = roster.lock().await.participant_mut(&psid) {
                        p.connection_quality = quality;
                    }
                    emitter.emit(HeymeEvent::ConnectionQualityChanged {
                        participant_sid: psid,
                        quality,
                    });
                }

                _ => {
                    tracing::debug!("unhandled room event: {event:?}");
                }
            }
        }

        tracing::info!("room event loop ended");
    }
}

#[async_trait]
impl SessionHandle for LiveKitSession {
    async fn connect(&self, url: &str, token: &str) -> Result<(), SessionError> {
        let (room, events) = Room::connect(url, token, self.room_options())
            .await
            .map_err(|e| SessionError::ConnectFailed(e.to_string()))?;
        let room = Arc::new(room);

        {
            let mut roster = self.roster.lock().await;
            roster.clear();
            roster.add_participant(Self::local_participant_to_info(&room.local_participant()));
            for participant in room.remote_participants().values() {
                let info = Self::remote_participant_to_info(participant);
                roster.add_participant(info.clone());
                self.emitter.emit(HeymeEvent::ParticipantJoined(info));
            }
        }

        *self.room.lock().await = Some(room);

        let task = tokio::spawn(Self::event_loop(
            events,
            self.emitter.clone(),
            self.roster.clone(),
            self.room.clone(),
        ));
        if let Some(previous) = self.event_task.lock().await.replace(task) {
            previous.abort();
        }

        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
        }
        let room = self.room.lock().await.take();
        if let Some(room) = room {
            if let Err(e) = room.close().await {
                tracing::warn!("error closing room: {e}");
            }
        }
        self.roster.lock().await.clear();
        self.controls.reset().await;
    }

    fn options(&self) -> SessionOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_built_with_fixed_quality_options() {
        let session = LiveKitSession::new(EventEmitter::new());
        assert_eq!(session.options(), SessionOptions::FIXED);

        let options = session.room_options();
        assert!(options.adaptive_stream);
        assert!(options.dynacast);
        assert!(options.auto_subscribe);
    }

    #[test]
    fn screenshare_source_maps_to_screen_share() {
        assert_eq!(
            LiveKitSession::lk_source_to_heyme(LkTrackSource::Screenshare),
            TrackSource::ScreenShare
        );
        assert_eq!(
            LiveKitSession::lk_source_to_heyme(LkTrackSource::Unknown),
            TrackSource::Unknown
        );
    }

    #[test]
    fn set_video_track_targets_source_slot() {
        let mut info = ParticipantInfo {
            sid: "p1".into(),
            identity: "alice".into(),
            name: None,
            is_local: false,
            is_muted: false,
            camera_track_sid: None,
            screen_share_track_sid: None,
            connection_quality: ConnectionQuality::Good,
        };
        LiveKitSession::set_video_track(&mut info, TrackSource::ScreenShare, Some("TR_1".into()));
        assert_eq!(info.screen_share_track_sid.as_deref(), Some("TR_1"));
        assert_eq!(info.camera_track_sid, None);

        LiveKitSession::set_video_track(&mut info, TrackSource::Microphone, Some("TR_2".into()));
        assert_eq!(info.camera_track_sid, None);
    }

    #[tokio::test]
    async fn disconnect_without_room_is_harmless() {
        let session = LiveKitSession::new(EventEmitter::new());
        session.disconnect().await;
        assert!(session.room.lock().await.is_none());
        assert!(session.tiles().await.is_empty());
        assert!(session.controls().audio_source().await.is_none());
    }
}
