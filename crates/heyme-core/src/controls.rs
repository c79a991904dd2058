use std::sync::Arc;

use livekit::options::TrackPublishOptions;
use livekit::prelude::*;
use livekit::track::TrackSource as LkTrackSource;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::prelude::*;
use livekit::webrtc::video_source::native::NativeVideoSource;
use tokio::sync::Mutex;

use crate::errors::SessionError;
use crate::events::TrackSource;

const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_CHANNELS: u32 = 1;
const AUDIO_QUEUE_SIZE_MS: u32 = 100;

const VIDEO_WIDTH: u32 = 1280;
const VIDEO_HEIGHT: u32 = 720;

/// Local media controls: microphone, camera and screen share.
///
/// Enabling a source that has no publication yet creates and publishes the
/// track. The host platform feeds captured frames into the native sources
/// exposed here; later toggles only mute or unmute the publication.
pub struct ControlBar {
    room: Arc<Mutex<Option<Arc<Room>>>>,
    audio_source: Mutex<Option<NativeAudioSource>>,
    video_source: Mutex<Option<NativeVideoSource>>,
    screen_source: Mutex<Option<NativeVideoSource>>,
}

impl ControlBar {
    pub fn new(room: Arc<Mutex<Option<Arc<Room>>>>) -> Self {
        Self {
            room,
            audio_source: Mutex::new(None),
            video_source: Mutex::new(None),
            screen_source: Mutex::new(None),
        }
    }

    pub async fn audio_source(&self) -> Option<NativeAudioSource> {
        self.audio_source.lock().await.clone()
    }

    pub async fn video_source(&self) -> Option<NativeVideoSource> {
        self.video_source.lock().await.clone()
    }

    pub async fn screen_share_source(&self) -> Option<NativeVideoSource> {
        self.screen_source.lock().await.clone()
    }

    /// Forget the sources of a closed room.
    pub async fn reset(&self) {
        self.audio_source.lock().await.take();
        self.video_source.lock().await.take();
        self.screen_source.lock().await.take();
    }

    /// Publish a microphone track and return the source to feed PCM into.
    pub async fn publish_microphone(&self) -> Result<NativeAudioSource, SessionError> {
        let room = self.current_room().await?;

        let source = NativeAudioSource::new(
            AudioSourceOptions {
                echo_cancellation: true,
                noise_suppression: true,
                auto_gain_control: true,
            },
            AUDIO_SAMPLE_RATE,
            AUDIO_CHANNELS,
            AUDIO_QUEUE_SIZE_MS,
        );
        let track =
            LocalAudioTrack::create_audio_track("microphone", RtcAudioSource::Native(source.clone()));

        room.local_participant()
            .publish_track(
                LocalTrack::Audio(track),
                TrackPublishOptions {
                    source: LkTrackSource::Microphone,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| SessionError::Publish(format!("audio: {e}")))?;

        *self.audio_source.lock().await = Some(source.clone());
        tracing::info!("microphone track published");
        Ok(source)
    }

    /// Publish a camera track and return the source to feed frames into.
    pub async fn publish_camera(&self) -> Result<NativeVideoSource, SessionError> {
        let source = self.publish_video("camera", LkTrackSource::Camera, false).await?;
        *self.video_source.lock().await = Some(source.clone());
        Ok(source)
    }

    /// Publish a screen-share track and return the source to feed frames into.
    pub async fn publish_screen_share(&self) -> Result<NativeVideoSource, SessionError> {
        let source = self.publish_video("screen", LkTrackSource::Screenshare, true).await?;
        *self.screen_source.lock().await = Some(source.clone());
        Ok(source)
    }

    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        if !self.set_enabled(TrackSource::Microphone, enabled).await? && enabled {
            self.publish_microphone().await?;
        }
        Ok(())
    }

    pub async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        if !self.set_enabled(TrackSource::Camera, enabled).await? && enabled {
            self.publish_camera().await?;
        }
        Ok(())
    }

    pub async fn set_screen_share_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        if !self.set_enabled(TrackSource::ScreenShare, enabled).await? && enabled {
            self.publish_screen_share().await?;
        }
        Ok(())
    }

    async fn current_room(&self) -> Result<Arc<Room>, SessionError> {
        self.room.lock().await.clone().ok_or(SessionError::NotConnected)
    }

    async fn publish_video(
        &self,
        name: &str,
        lk_source: LkTrackSource,
        is_screencast: bool,
    ) -> Result<NativeVideoSource, SessionError> {
        let room = self.current_room().await?;

        let source = NativeVideoSource::new(
            VideoResolution {
                width: VIDEO_WIDTH,
                height: VIDEO_HEIGHT,
            },
            is_screencast,
        );
        let track = LocalVideoTrack::create_video_track(name, RtcVideoSource::Native(source.clone()));

        room.local_participant()
            .publish_track(
                LocalTrack::Video(track),
                TrackPublishOptions {
                    source: lk_source,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| SessionError::Publish(format!("{name}: {e}")))?;

        tracing::info!("{name} track published");
        Ok(source)
    }

    /// Mute or unmute an existing publication. Returns whether one existed.
    async fn set_enabled(&self, source: TrackSource, enabled: bool) -> Result<bool, SessionError> {
        let lk_source = match source {
            TrackSource::Microphone => LkTrackSource::Microphone,
            TrackSource::Camera => LkTrackSource::Camera,
            TrackSource::ScreenShare => LkTrackSource::Screenshare,
            TrackSource::Unknown => return Ok(false),
        };

        let room = self.current_room().await?;
        let publication = room
            .local_participant()
            .track_publications()
            .into_values()
            .find(|p| p.source() == lk_source);

        let Some(publication) = publication else {
            tracing::debug!("no local {source:?} publication yet");
            return Ok(false);
        };
        if enabled {
            publication.unmute();
        } else {
            publication.mute();
        }
        tracing::info!("{source:?} enabled: {enabled}");
        Ok(true)
    }
}
