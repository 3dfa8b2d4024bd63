//! Multi-track timeline.
//!
//! Owns the tracks and the project-wide slow-motion pool, and runs the
//! cross-track workflows (producer replacement, effect propagation) by
//! calling each track in turn. There is no cross-track atomicity: a failure
//! on one track leaves earlier tracks updated.

use cutlist_core::{CutlistError, FrameRate, RationalTime, Result, TrackSettings};
use cutlist_playlist::{MediaFactory, Playlist, Producer, ProducerFactory, Properties};
use std::sync::Arc;
use tracing::{debug, info};

use crate::events::{NoEvents, TrackEvents};
use crate::info::{ItemInfo, TrackInfo, TrackKind};
use crate::slowmotion::SlowMotionPool;
use crate::track::Track;

/// A timeline containing tracks.
pub struct Timeline {
    /// Timeline name
    pub name: String,
    rate: FrameRate,
    tracks: Vec<Track>,
    slowmotion: SlowMotionPool,
    settings: TrackSettings,
    factory: Arc<dyn ProducerFactory>,
    events: Arc<dyn TrackEvents>,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("name", &self.name)
            .field("rate", &self.rate)
            .field("tracks", &self.tracks)
            .field("slowmotion", &self.slowmotion.len())
            .finish_non_exhaustive()
    }
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new(name: impl Into<String>, rate: FrameRate) -> Self {
        Self {
            name: name.into(),
            rate,
            tracks: Vec::new(),
            slowmotion: SlowMotionPool::new(),
            settings: TrackSettings::default(),
            factory: Arc::new(MediaFactory::new()),
            events: Arc::new(NoEvents),
        }
    }

    /// Create an empty timeline at the settings' default frame rate.
    pub fn from_settings(name: impl Into<String>, settings: TrackSettings) -> Self {
        Self::new(name, settings.default_frame_rate).with_settings(settings)
    }

    /// Create an empty timeline from the user's settings file, or defaults
    /// when there is none.
    pub fn from_user_settings(name: impl Into<String>) -> Result<Self> {
        Ok(Self::from_settings(name, TrackSettings::load_default()?))
    }

    /// Settings handed to tracks created from now on.
    pub fn with_settings(mut self, settings: TrackSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn ProducerFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn TrackEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.rate
    }

    /// Change the frame rate of the timeline and all its tracks.
    pub fn set_fps(&mut self, rate: FrameRate) {
        self.rate = rate;
        for track in &mut self.tracks {
            track.set_fps(rate);
        }
    }

    // ── Tracks ──────────────────────────────────────────────────

    /// Append a new empty track. Returns its index.
    ///
    /// Playlists are named `playlist<n>`, which is the track part of the
    /// track-local producer identifiers.
    pub fn add_track(&mut self, kind: TrackKind, name: &str) -> usize {
        let index = self.tracks.len();
        let playlist = Playlist::with_id(&format!("playlist{}", index + 1)).shared();
        let mut track = self.make_track(playlist, kind);
        track.set_info(TrackInfo::new(name, kind));
        self.tracks.push(track);
        debug!(index, name, ?kind, "Added track");
        index
    }

    /// Append a track built around an existing playlist.
    pub fn push_playlist(&mut self, playlist: Playlist, info: TrackInfo) -> usize {
        let mut track = self.make_track(playlist.shared(), info.kind);
        track.set_info(info);
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    fn make_track(&self, playlist: cutlist_playlist::SharedPlaylist, kind: TrackKind) -> Track {
        Track::new(playlist, kind, self.rate)
            .with_settings(self.settings.clone())
            .with_factory(Arc::clone(&self.factory))
            .with_events(Arc::clone(&self.events))
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Length of the longest track, in frames.
    pub fn playtime(&self) -> i64 {
        self.tracks.iter().map(Track::playtime).max().unwrap_or(0)
    }

    /// Get the total duration of the timeline.
    pub fn duration(&self) -> RationalTime {
        RationalTime::from_frames(self.playtime(), self.rate)
    }

    // ── Slow motion ─────────────────────────────────────────────

    pub fn slowmotion(&self) -> &SlowMotionPool {
        &self.slowmotion
    }

    pub fn slowmotion_mut(&mut self) -> &mut SlowMotionPool {
        &mut self.slowmotion
    }

    /// Keep a slow-motion producer for reuse, keyed by its identifier.
    pub fn store_slowmotion(&mut self, producer: Producer) -> bool {
        let stored = self.slowmotion.store(producer);
        if !stored {
            debug!("Producer is not a slowmotion producer, not stored");
        }
        stored
    }

    /// Change the speed of a clip on track `index` using the timeline pool.
    pub fn change_clip_speed(
        &mut self,
        index: usize,
        info: &ItemInfo,
        speed_independent_info: &ItemInfo,
        speed: f64,
        strobe: i32,
        pass_properties: &Properties,
    ) -> Result<i64> {
        let track = self
            .tracks
            .get(index)
            .ok_or_else(|| CutlistError::InvalidParameter(format!("no track {}", index)))?;
        track.change_clip_speed(
            info,
            speed_independent_info,
            speed,
            strobe,
            None,
            &mut self.slowmotion,
            pass_properties,
        )
    }

    // ── Cross-track workflows ───────────────────────────────────

    /// Swap every use of producer `id` for `original` on all tracks.
    ///
    /// Regions are first marked on every track, then re-cut. Returns the
    /// number of tracks that changed.
    pub fn replace_producer(
        &self,
        id: &str,
        original: &Producer,
        video_only: Option<&Producer>,
    ) -> usize {
        for track in &self.tracks {
            track.replace_id(id);
        }
        let changed = self
            .tracks
            .iter()
            .filter(|track| track.replace_all(id, original, video_only, &self.slowmotion))
            .count();
        info!(id, changed, "Replaced producer");
        changed
    }

    /// Propagate the effects of `original` to its duplicates on all tracks.
    pub fn update_effects(&self, id: &str, original: &Producer) {
        for track in &self.tracks {
            track.update_effects(id, original);
        }
    }

    /// Set properties on the track duplicates of `id` and on its slow-motion
    /// producers.
    pub fn update_clip_properties(&self, id: &str, properties: &Properties) {
        for track in &self.tracks {
            track.update_clip_properties(id, properties);
        }
        for (key, producer) in self.slowmotion.iter() {
            if key.source == id {
                for (name, value) in properties.iter() {
                    producer.set(name, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::InsertMode;
    use crate::producer_id::ClipState;
    use crate::slowmotion::SlowMotionKey;

    fn source() -> Producer {
        let producer = Producer::new("avformat", "a.mp4", 500);
        producer.set("id", "3");
        producer
    }

    fn two_tracks() -> Timeline {
        let mut timeline = Timeline::new("Main", FrameRate::FPS_25);
        timeline.add_track(TrackKind::Video, "V1");
        timeline.add_track(TrackKind::Audio, "A1");
        timeline
    }

    #[test]
    fn test_tracks_get_numbered_playlists() {
        let timeline = two_tracks();
        assert_eq!(timeline.track_count(), 2);
        let audio = timeline.track(1).unwrap();
        assert_eq!(audio.property("id"), "playlist2");
        assert_eq!(audio.info().name, "A1");
        assert_eq!(audio.kind(), TrackKind::Audio);
        assert!(timeline.track(2).is_none());
    }

    #[test]
    fn test_duration_is_max_of_tracks() {
        let timeline = two_tracks();
        let src = source();
        let add = |index: usize, start: f64, end: f64| {
            timeline
                .track(index)
                .unwrap()
                .add(start, &src, 0.0, end, ClipState::Original, true, InsertMode::Insert)
                .unwrap();
        };
        add(0, 0.0, 4.0);
        add(1, 2.0, 4.0);
        assert_eq!(timeline.playtime(), 150);
        assert_eq!(timeline.duration(), RationalTime::new(6, 1));
    }

    #[test]
    fn test_replace_producer_on_all_tracks() {
        let timeline = two_tracks();
        let src = source();
        for index in 0..2 {
            timeline
                .track(index)
                .unwrap()
                .add(0.0, &src, 0.0, 2.0, ClipState::Original, true, InsertMode::Insert)
                .unwrap();
        }

        let updated = Producer::new("avformat", "b.mp4", 500);
        updated.set("id", "3");
        assert_eq!(timeline.replace_producer("3", &updated, None), 2);

        for (index, expected) in [(0, "3_playlist1"), (1, "3_playlist2")] {
            let region = timeline.track(index).unwrap().regions().remove(0);
            let parent = region.clip.unwrap().parent();
            assert_eq!(parent.id(), expected);
            assert_eq!(parent.resource(), "b.mp4");
        }
    }

    #[test]
    fn test_speed_change_fills_timeline_pool() {
        let factory = MediaFactory::new();
        factory.register("a.mp4", 500);
        let mut timeline = Timeline::new("Main", FrameRate::FPS_25).with_factory(Arc::new(factory));
        timeline.add_track(TrackKind::Video, "V1");
        let src = source();
        timeline
            .track(0)
            .unwrap()
            .add(0.0, &src, 0.0, 4.0, ClipState::Original, false, InsertMode::Insert)
            .unwrap();

        let info = ItemInfo::from_frames(0, 0, 100, FrameRate::FPS_25);
        let length = timeline
            .change_clip_speed(0, &info, &info, 2.0, 1, &Properties::new())
            .unwrap();
        assert_eq!(length, 50);
        assert!(timeline
            .slowmotion()
            .get(&SlowMotionKey::new("3", "2", None))
            .is_some());
        assert!(timeline
            .change_clip_speed(4, &info, &info, 2.0, 1, &Properties::new())
            .is_err());

        let mut properties = Properties::new();
        properties.set("kdenlive:clipname", "renamed");
        timeline.update_clip_properties("3", &properties);
        let slow = timeline.track(0).unwrap().regions()[0].clip.clone().unwrap().parent();
        assert_eq!(slow.get("kdenlive:clipname").as_deref(), Some("renamed"));
    }

    #[test]
    fn test_store_slowmotion() {
        let mut timeline = two_tracks();
        let slow = Producer::new("framebuffer", "a.mp4?0.5", 1000);
        slow.set("id", "slowmotion:3:0.5");
        assert!(timeline.store_slowmotion(slow));
        assert!(!timeline.store_slowmotion(source()));
        assert_eq!(timeline.slowmotion().len(), 1);
    }

    #[test]
    fn test_user_settings_set_frame_rate() {
        let timeline = Timeline::from_user_settings("Main").unwrap();
        let expected = TrackSettings::load_default().unwrap().default_frame_rate;
        assert_eq!(timeline.frame_rate(), expected);
        assert_eq!(timeline.track_count(), 0);
    }

    #[test]
    fn test_set_fps_reaches_tracks() {
        let mut timeline = two_tracks();
        timeline.set_fps(FrameRate::FPS_50);
        assert_eq!(timeline.track(1).unwrap().fps(), 50.0);
        assert_eq!(timeline.track(1).unwrap().frame(1.0), 50);
    }
}
