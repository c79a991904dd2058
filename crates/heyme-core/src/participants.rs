use crate::events::{ParticipantInfo, TrackSource};

/// One cell of the conference grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub participant_sid: String,
    pub display_name: String,
    pub source: TrackSource,
    /// `None` renders as a placeholder (camera tiles only).
    pub track_sid: Option<String>,
    pub is_speaking: bool,
    pub is_muted: bool,
}

impl Tile {
    pub fn is_placeholder(&self) -> bool {
        self.track_sid.is_none()
    }
}

/// Participants currently in the room, local participant first.
///
/// Updated by the room event loop. Read by the presentation shell.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRoster {
    participants: Vec<ParticipantInfo>,
    active_speakers: Vec<String>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_participant(&mut self, info: ParticipantInfo) {
        if self.participants.iter().any(|p| p.sid == info.sid) {
            return;
        }
        if info.is_local {
            self.participants.insert(0, info);
        } else {
            self.participants.push(info);
        }
    }

    pub fn remove_participant(&mut self, sid: &str) {
        self.participants.retain(|p| p.sid != sid);
        self.active_speakers.retain(|s| s != sid);
    }

    pub fn participants(&self) -> &[ParticipantInfo] {
        &self.participants
    }

    pub fn participant_mut(&mut self, sid: &str) -> Option<&mut ParticipantInfo> {
        self.participants.iter_mut().find(|p| p.sid == sid)
    }

    pub fn set_active_speakers(&mut self, sids: Vec<String>) {
        self.active_speakers = sids;
    }

    pub fn clear(&mut self) {
        self.participants.clear();
        self.active_speakers.clear();
    }

    /// Grid contents: a camera tile for everyone (placeholder when the
    /// camera is off), then one tile per active screen share.
    pub fn tiles(&self) -> Vec<Tile> {
        let tile = |p: &ParticipantInfo, source, track_sid: Option<&String>| Tile {
            participant_sid: p.sid.clone(),
            display_name: p.display_name().to_string(),
            source,
            track_sid: track_sid.cloned(),
            is_speaking: self.active_speakers.contains(&p.sid),
            is_muted: p.is_muted,
        };

        let cameras = self
            .participants
            .iter()
            .map(|p| tile(p, TrackSource::Camera, p.camera_track_sid.as_ref()));
        let screens = self.participants.iter().filter_map(|p| {
            p.screen_share_track_sid
                .as_ref()
                .map(|sid| tile(p, TrackSource::ScreenShare, Some(sid)))
        });
        cameras.chain(screens).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ConnectionQuality;

    fn make_participant(sid: &str, name: &str) -> ParticipantInfo {
        ParticipantInfo {
            sid: sid.to_string(),
            identity: format!("user-{sid}"),
            name: Some(name.to_string()),
            is_local: false,
            is_muted: false,
            camera_track_sid: None,
            screen_share_track_sid: None,
            connection_quality: ConnectionQuality::Good,
        }
    }

    #[test]
    fn add_is_deduplicated() {
        let mut roster = ParticipantRoster::new();
        roster.add_participant(make_participant("p1", "Alice"));
        roster.add_participant(make_participant("p1", "Alice again"));
        assert_eq!(roster.participants().len(), 1);
        assert_eq!(roster.participants()[0].display_name(), "Alice");
    }

    #[test]
    fn local_participant_sorts_first() {
        let mut roster = ParticipantRoster::new();
        roster.add_participant(make_participant("p1", "Alice"));
        let mut me = make_participant("me", "Me");
        me.is_local = true;
        roster.add_participant(me);
        assert_eq!(roster.participants()[0].sid, "me");
    }

    #[test]
    fn remove_also_drops_active_speaker() {
        let mut roster = ParticipantRoster::new();
        roster.add_participant(make_participant("p1", "Alice"));
        roster.add_participant(make_participant("p2", "Bob"));
        roster.set_active_speakers(vec!["p1".into(), "p2".into()]);

        roster.remove_participant("p1");

        assert_eq!(roster.participants().len(), 1);
        assert_eq!(roster.active_speakers, ["p2".to_string()]);
    }

    #[test]
    fn tiles_have_camera_placeholders_and_screen_shares() {
        let mut roster = ParticipantRoster::new();
        let mut alice = make_participant("p1", "Alice");
        alice.camera_track_sid = Some("TR_cam".into());
        alice.screen_share_track_sid = Some("TR_screen".into());
        roster.add_participant(alice);
        let mut bob = make_participant("p2", "Bob");
        bob.name = None;
        roster.add_participant(bob);
        roster.set_active_speakers(vec!["p2".into()]);

        let tiles = roster.tiles();

        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0].source, TrackSource::Camera);
        assert_eq!(tiles[0].track_sid.as_deref(), Some("TR_cam"));
        assert!(tiles[1].is_placeholder());
        assert_eq!(tiles[1].display_name, "user-p2");
        assert!(tiles[1].is_speaking);
        assert_eq!(tiles[2].source, TrackSource::ScreenShare);
        assert_eq!(tiles[2].track_sid.as_deref(), Some("TR_screen"));
    }

    #[test]
    fn no_screen_share_tile_without_track() {
        let mut roster = ParticipantRoster::new();
        roster.add_participant(make_participant("p1", "Alice"));
        let tiles = roster.tiles();
        assert_eq!(tiles.len(), 1);
        assert!(tiles.iter().all(|t| t.source == TrackSource::Camera));
    }

    #[test]
    fn clear_empties_everything() {
        let mut roster = ParticipantRoster::new();
        roster.add_participant(make_participant("p1", "Alice"));
        roster.set_active_speakers(vec!["p1".into()]);
        roster.clear();
        assert!(roster.participants().is_empty());
        assert!(roster.active_speakers.is_empty());
        assert!(roster.tiles().is_empty());
    }
}
