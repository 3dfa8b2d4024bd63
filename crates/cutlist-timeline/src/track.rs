//! Timeline track: position-based editing over a shared playlist.
//!
//! Callers speak in seconds; the track quantises with `round(t * fps)` and
//! drives the playlist's index-based primitives. Every mutation holds the
//! playlist lock for its whole duration and leaves the playlist consolidated.
//! Notifications are sent after the lock is released, once per operation
//! whose net playtime changed.

use cutlist_core::{format_speed, frame_at, CutlistError, FrameRate, RationalTime, Result, TrackSettings};
use cutlist_playlist::{
    ClipEffects, Filter, FilterEffects, MediaFactory, Playlist, Producer, ProducerFactory,
    Properties, Region, SharedPlaylist,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::events::{NoEvents, TrackEvents};
use crate::info::{InsertMode, ItemInfo, TrackInfo, TrackKind};
use crate::producer_id::{ClipState, ProducerId};
use crate::slowmotion::{SlowMotionKey, SlowMotionPool};

const TRACK_NAME: &str = "kdenlive:track_name";
const TRACK_LOCKED: &str = "kdenlive:locked_track";
const HIDE: &str = "hide";

/// Which crop-window computation a speed change uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeedChange {
    /// Decoded source played at a new speed.
    Resample,
    /// Decoded source back at normal speed.
    Restore,
    /// Already speed-adjusted source, re-timed.
    Framebuffer,
}

/// One timeline lane wrapping a shared playlist.
pub struct Track {
    kind: TrackKind,
    rate: FrameRate,
    playlist: SharedPlaylist,
    settings: TrackSettings,
    factory: Arc<dyn ProducerFactory>,
    effects: Arc<dyn ClipEffects>,
    events: Arc<dyn TrackEvents>,
    track_effects: Vec<Filter>,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("kind", &self.kind)
            .field("rate", &self.rate)
            .field("playlist", &self.playlist)
            .finish_non_exhaustive()
    }
}

impl Track {
    /// Create a track over `playlist`.
    pub fn new(playlist: SharedPlaylist, kind: TrackKind, rate: FrameRate) -> Self {
        Self {
            kind,
            rate,
            playlist,
            settings: TrackSettings::default(),
            factory: Arc::new(MediaFactory::new()),
            effects: Arc::new(FilterEffects),
            events: Arc::new(NoEvents),
            track_effects: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: TrackSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Factory used to synthesise slow-motion producers.
    pub fn with_factory(mut self, factory: Arc<dyn ProducerFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_effects(mut self, effects: Arc<dyn ClipEffects>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn TrackEvents>) -> Self {
        self.events = events;
        self
    }

    // ── Members ─────────────────────────────────────────────────

    pub fn playlist(&self) -> SharedPlaylist {
        Arc::clone(&self.playlist)
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.rate
    }

    pub fn fps(&self) -> f64 {
        self.rate.to_fps_f64()
    }

    pub fn set_fps(&mut self, rate: FrameRate) {
        self.rate = rate;
    }

    /// Frame number for a time in seconds.
    pub fn frame(&self, seconds: f64) -> i64 {
        frame_at(seconds, self.fps())
    }

    /// Track length in seconds.
    pub fn length(&self) -> f64 {
        self.playtime() as f64 / self.fps()
    }

    /// Track length in frames.
    pub fn playtime(&self) -> i64 {
        self.playlist.lock().get_playtime()
    }

    /// Snapshot of the regions.
    pub fn regions(&self) -> Vec<Region> {
        self.playlist.lock().regions()
    }

    fn track_id(playlist: &Playlist) -> String {
        playlist.properties().get("id").unwrap_or_default().to_string()
    }

    fn notify_duration(&self, before: i64, after: i64) {
        if before != after {
            debug!(before, after, "Track duration changed");
            self.events.duration_changed(after);
        }
    }

    // ── Basic clip operations ───────────────────────────────────

    /// Add a whole producer (or an existing cut) at `time`.
    pub fn add_producer(
        &self,
        time: f64,
        producer: &Producer,
        duplicate: bool,
        mode: InsertMode,
    ) -> Result<()> {
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let source = if duplicate {
            self.clip_producer_in(&playlist, producer, ClipState::Original, false)
        } else {
            producer.clone()
        };
        let cut = source.cut(producer.get_in(), producer.get_out());
        let result = self.do_add(&mut playlist, time, &cut, mode);
        let after = playlist.get_playtime();
        drop(playlist);
        self.notify_duration(before, after);
        result.map(|_| ())
    }

    /// Add the `[cut_in, cut_out)` part of `producer` at `time`.
    ///
    /// With `duplicate`, sources that need it get a track-local copy for the
    /// requested `state`. Effects of `producer` are copied onto the new cut.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &self,
        time: f64,
        producer: &Producer,
        cut_in: f64,
        cut_out: f64,
        state: ClipState,
        duplicate: bool,
        mode: InsertMode,
    ) -> Result<()> {
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let source = if duplicate && state != ClipState::VideoOnly {
            self.clip_producer_in(&playlist, producer, state, false)
        } else {
            producer.clone()
        };
        let cut = source.cut(self.frame(cut_in), self.frame(cut_out) - 1);
        self.effects.add_effects(&cut, producer);
        let result = self.do_add(&mut playlist, time, &cut, mode);
        let after = playlist.get_playtime();
        drop(playlist);
        self.notify_duration(before, after);
        result.map(|_| ())
    }

    fn do_add(
        &self,
        playlist: &mut Playlist,
        time: f64,
        cut: &Producer,
        mode: InsertMode,
    ) -> Result<usize> {
        let position = self.frame(time);
        if position < 0 {
            return Err(CutlistError::InvalidParameter(format!(
                "negative position {}",
                position
            )));
        }
        let length = cut.get_out() - cut.get_in() + 1;
        if position < playlist.get_playtime() {
            match mode {
                InsertMode::Insert => {}
                InsertMode::Overwrite => {
                    playlist.remove_region(position, length);
                    let index = playlist.get_clip_index_at(position);
                    playlist.insert_blank(index, length);
                }
                InsertMode::SplitInsert => {
                    playlist.split_at(position);
                    let index = playlist.get_clip_index_at(position);
                    playlist.insert_blank(index, length);
                }
            }
        }
        playlist.consolidate_blanks(false);
        let index = playlist.insert_at(position, cut, true)?;
        debug!(position, length, index, ?mode, "Added clip");
        Ok(index)
    }

    /// Move the clip at `start` to `end`.
    pub fn move_clip(&self, start: f64, end: f64, mode: InsertMode) -> Result<()> {
        let position = self.frame(start);
        let destination = self.frame(end);
        if destination < 0 {
            warn!(start, end, "Cannot move clip before track start");
            return Err(CutlistError::InvalidParameter(format!(
                "negative position {}",
                destination
            )));
        }
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let index = playlist.get_clip_index_at(position);
        let source_start = playlist.clip_start(index);
        let Some(cut) = playlist.replace_with_blank(index) else {
            debug!(index, start, "Cannot get clip to move");
            return Err(CutlistError::not_found(position, "no clip to move"));
        };
        playlist.consolidate_blanks(false);
        let result = self.do_add(&mut playlist, end, &cut, mode);
        if result.is_err() {
            // Put the clip back where it was.
            if let Err(e) = playlist.insert_at(source_start, &cut, true) {
                warn!(error = %e, source_start, "Failed to restore moved clip");
            }
            playlist.consolidate_blanks(false);
        }
        let after = playlist.get_playtime();
        drop(playlist);
        self.notify_duration(before, after);
        result.map(|_| ())
    }

    /// Delete the clip at `time`, leaving a blank.
    pub fn delete(&self, time: f64) -> Result<()> {
        let position = self.frame(time);
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let index = playlist.get_clip_index_at(position);
        if playlist.replace_with_blank(index).is_none() {
            warn!(time, "Error deleting clip");
            return Err(CutlistError::not_found(position, "no clip to delete"));
        }
        playlist.consolidate_blanks(false);
        let after = playlist.get_playtime();
        drop(playlist);
        self.notify_duration(before, after);
        Ok(())
    }

    /// Blank out `duration` seconds from `time`, whatever regions lie there.
    pub fn delete_span(&self, time: f64, duration: f64) -> Result<()> {
        let position = self.frame(time);
        let length = self.frame(duration);
        if length <= 0 {
            return Err(CutlistError::InvalidParameter(format!(
                "span of {} frames at {}",
                length, position
            )));
        }
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let index = playlist.remove_region(position, length);
        playlist.insert_blank(index, length);
        playlist.consolidate_blanks(false);
        let after = playlist.get_playtime();
        drop(playlist);
        self.notify_duration(before, after);
        Ok(())
    }

    /// Grow (positive `delta`) or shrink the clip at `time` by `delta`
    /// seconds, at its end or at its start.
    ///
    /// The neighbouring blank absorbs the change so later clips keep their
    /// position. Sources shorter than the new out point (images, colour
    /// generators) get their declared length extended.
    pub fn resize(&self, time: f64, delta: f64, from_end: bool) -> Result<()> {
        let position = self.frame(time);
        let mut length = self.frame(delta);
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let mut index = playlist.get_clip_index_at(position);

        let clip = match playlist.get_clip(index) {
            Some(clip) if !clip.is_blank() => clip,
            _ => {
                warn!(time, "Can't resize clip");
                return Err(CutlistError::not_found(position, "no clip to resize"));
            }
        };

        let (mut in_point, mut out_point) = (clip.get_in(), clip.get_out());
        if from_end {
            out_point += length;
        } else {
            in_point += length;
        }

        // Image or colour clips are not bounded.
        if in_point < 0 {
            out_point -= in_point;
            in_point = 0;
        }
        if clip.get_length() < out_point + 1 {
            let parent = clip.parent();
            parent.set_int("length", out_point + 2);
            parent.set_int("out", out_point + 1);
            clip.set_int("length", out_point + 2);
        }

        if let Err(e) = playlist.resize_clip(index, in_point, out_point) {
            warn!(index, in_point, out_point, "Resize failed");
            return Err(e);
        }

        // Adjust the adjacent blank.
        if from_end {
            index += 1;
            if index >= playlist.count() {
                // Last clip: the track length follows the clip.
                let after = playlist.get_playtime();
                drop(playlist);
                self.notify_duration(before, after);
                return Ok(());
            }
            length = -length;
        }
        if length > 0 {
            // Clip got shorter: fill the freed frames.
            playlist.insert_blank(index, length);
        } else if length < 0 {
            let neighbour = if from_end {
                Some(index)
            } else {
                index.checked_sub(1)
            };
            match neighbour {
                Some(neighbour) if playlist.is_blank(neighbour) => {
                    let remaining = playlist.clip_length(neighbour) + length;
                    if remaining > 0 {
                        if let Err(e) = playlist.resize_clip(neighbour, 0, remaining - 1) {
                            warn!(neighbour, error = %e, "Error resizing blank");
                        }
                    } else if let Err(e) = playlist.remove(neighbour) {
                        warn!(neighbour, error = %e, "Error removing blank");
                    }
                }
                Some(neighbour) => {
                    warn!(neighbour, "Resizing over non-blank clip");
                }
                None => {
                    warn!(index, "No room before clip, later regions move");
                }
            }
        }
        playlist.consolidate_blanks(false);
        let after = playlist.get_playtime();
        drop(playlist);
        self.notify_duration(before, after);
        Ok(())
    }

    /// Split the clip at `time` in two. The second piece receives the
    /// effects of the first.
    pub fn cut(&self, time: f64) -> Result<()> {
        let position = self.frame(time);
        let mut playlist = self.playlist.lock();
        let index = playlist.get_clip_index_at(position);
        if playlist.is_blank(index) {
            return Err(CutlistError::not_found(position, "no clip to cut"));
        }
        let offset = position - playlist.clip_start(index);
        if let Err(e) = playlist.split(index, offset) {
            warn!(index, offset, "Split failed");
            return Err(e);
        }
        if let (Some(first), Some(second)) = (playlist.get_clip(index), playlist.get_clip(index + 1)) {
            self.effects.add_effects(&second, &first);
        }
        Ok(())
    }

    /// Swap the clip at `time` for a cut of `producer` with the same bounds.
    pub fn replace(&self, time: f64, producer: &Producer, state: ClipState) -> Result<()> {
        let position = self.frame(time);
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let index = playlist.get_clip_index_at(position);
        let start = playlist.clip_start(index);
        let Some(original) = playlist.replace_with_blank(index) else {
            return Err(CutlistError::not_found(position, "no clip to replace"));
        };
        let source = if state != ClipState::VideoOnly {
            self.clip_producer_in(&playlist, producer, state, false)
        } else {
            producer.clone()
        };
        let cut = source.cut(original.get_in(), original.get_out());
        self.effects.add_effects(&cut, &original);
        let result = playlist.insert_at(start, &cut, true).or_else(|e| {
            warn!(error = %e, "Replace failed, restoring clip");
            playlist.insert_at(start, &original, true)?;
            Err(e)
        });
        playlist.consolidate_blanks(false);
        let after = playlist.get_playtime();
        drop(playlist);
        self.notify_duration(before, after);
        result.map(|_| ())
    }

    // ── Producer substitution ───────────────────────────────────

    /// Whether producers of `service` get a track-local duplicate.
    pub fn needs_duplicate(&self, service: &str) -> bool {
        self.settings.needs_duplicate(service)
    }

    /// Mark every producer derived from `id` on this track for replacement.
    pub fn replace_id(&self, id: &str) {
        let playlist = self.playlist.lock();
        let track = Self::track_id(&playlist);
        for region in playlist.regions() {
            let Some(clip) = region.clip else { continue };
            let parent = clip.parent();
            let Ok(current) = ProducerId::parse(&parent.id()) else {
                continue;
            };
            let derived = match &current {
                ProducerId::Root(root) => root == id,
                ProducerId::SlowMotion { source, .. } => source == id,
                other if other.is_track_local() => {
                    other.root() == id && other.track() == Some(track.as_str())
                }
                _ => false,
            };
            if derived {
                parent.set("id", current.marked().to_string());
            }
        }
    }

    /// Speed keys (`<speed>[:<strobe>]`) of marked slow-motion producers of `id`.
    pub fn slowmotion_ids(&self, id: &str) -> Vec<String> {
        let playlist = self.playlist.lock();
        let mut keys: Vec<String> = Vec::new();
        for region in playlist.regions() {
            let Some(clip) = region.clip else { continue };
            let Ok(current) = ProducerId::parse(&clip.parent().id()) else {
                continue;
            };
            if !current.is_marked() {
                continue;
            }
            if let ProducerId::SlowMotion { source, .. } = current.unmarked() {
                if source == id {
                    if let Some(key) = current.slowmotion_key() {
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                }
            }
        }
        keys
    }

    /// Re-cut every region marked by [`Track::replace_id`] against its
    /// replacement: `original`, a fresh track duplicate, `video_only`, or the
    /// matching slow-motion producer from `pool`. Returns whether anything
    /// was replaced.
    pub fn replace_all(
        &self,
        id: &str,
        original: &Producer,
        video_only: Option<&Producer>,
        pool: &SlowMotionPool,
    ) -> bool {
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let track = Self::track_id(&playlist);
        let source = original.parent();
        let original_id = source.id();
        let duplicated = self.needs_duplicate(&source.service());
        let id_for_track = ProducerId::for_track(&original_id, &track, ClipState::Original);
        let id_for_audio = ProducerId::for_track(&original_id, &track, ClipState::AudioOnly);
        let id_for_video = ProducerId::for_track(&original_id, &track, ClipState::VideoOnly);

        let mut track_producer: Option<Producer> = None;
        let mut audio_producer: Option<Producer> = None;
        let mut found = false;

        for index in 0..playlist.count() {
            if playlist.is_blank(index) {
                continue;
            }
            let Some(clip) = playlist.get_clip(index) else { continue };
            let parent = clip.parent();
            let Ok(ProducerId::Marked(current)) = ProducerId::parse(&parent.id()) else {
                continue;
            };
            let current = *current;
            let (in_point, out_point) = (clip.get_in(), clip.get_out());

            let cut = match &current {
                ProducerId::SlowMotion { source, .. } if source == id => {
                    let replacement = SlowMotionKey::from_id(&current)
                        .and_then(|key| pool.get(&key))
                        .filter(|p| p.is_valid());
                    match replacement {
                        Some(slow) => Some(slow.cut(in_point, out_point)),
                        None => {
                            warn!(id, %current, "Couldn't find replacement slowmotion producer");
                            None
                        }
                    }
                }
                _ if !duplicated => {
                    (current.to_string() == original_id).then(|| original.cut(in_point, out_point))
                }
                ProducerId::Root(root) if root == id && parent.get_int("audio_index") == -1 => {
                    // No audio, no duplication required.
                    Some(original.cut(in_point, out_point))
                }
                _ if current == id_for_track => {
                    let duplicate = track_producer.get_or_insert_with(|| {
                        let duplicate = source.duplicate();
                        duplicate.set("id", id_for_track.to_string());
                        duplicate
                    });
                    Some(duplicate.cut(in_point, out_point))
                }
                _ if current == id_for_audio => {
                    let duplicate = audio_producer.get_or_insert_with(|| {
                        self.clip_producer_in(&playlist, original, ClipState::AudioOnly, true)
                    });
                    Some(duplicate.cut(in_point, out_point))
                }
                _ if current == id_for_video => match video_only {
                    Some(video) => Some(video.cut(in_point, out_point)),
                    None => {
                        warn!(%current, "No video-only producer to replace with");
                        None
                    }
                },
                _ => None,
            };

            if let Some(cut) = cut {
                // Effects come with the replacement source, not the old cut.
                if playlist.remove(index).is_ok() {
                    playlist.insert(&cut, index);
                    found = true;
                }
            }
        }
        playlist.consolidate_blanks(false);
        let after = playlist.get_playtime();
        drop(playlist);
        debug!(id, found, "Replaced producers on track");
        self.notify_duration(before, after);
        found
    }

    /// Copy the effects of `original` onto every track-local or slow-motion
    /// producer derived from `id`.
    pub fn update_effects(&self, id: &str, original: &Producer) {
        let playlist = self.playlist.lock();
        let source = original.parent();
        for region in playlist.regions() {
            let Some(clip) = region.clip else { continue };
            let origin = clip.parent();
            if origin.same_as(&source) {
                // Directly using the original producer.
                continue;
            }
            let Ok(current) = ProducerId::parse(&origin.id()) else {
                continue;
            };
            let derived = match &current {
                ProducerId::SlowMotion { source, .. } => source == id,
                ProducerId::Root(_) | ProducerId::Marked(_) => false,
                other => other.root() == id,
            };
            if derived {
                self.effects.replace_effects(&origin, original);
            }
        }
    }

    /// Set `properties` on this track's duplicates of `id`.
    ///
    /// Slow-motion producers live in the project pool and are updated there.
    pub fn update_clip_properties(&self, id: &str, properties: &Properties) {
        let playlist = self.playlist.lock();
        let track = Self::track_id(&playlist);
        let mut processed: Vec<Producer> = Vec::new();
        for region in playlist.regions() {
            let Some(clip) = region.clip else { continue };
            let parent = clip.parent();
            if processed.iter().any(|p| p.same_as(&parent)) {
                continue;
            }
            let Ok(current) = ProducerId::parse(&parent.id()) else {
                continue;
            };
            if current.is_track_local()
                && current.root() == id
                && current.track() == Some(track.as_str())
            {
                for (name, value) in properties.iter() {
                    parent.set(name, value);
                }
                processed.push(parent);
            }
        }
    }

    /// First cut from region `start` on whose parent has `name == value`.
    pub fn find(&self, name: &str, value: &str, start: usize) -> Option<Producer> {
        Self::find_in(&self.playlist.lock(), name, value, start)
    }

    fn find_in(playlist: &Playlist, name: &str, value: &str, start: usize) -> Option<Producer> {
        playlist
            .regions()
            .into_iter()
            .skip(start)
            .filter_map(|region| region.clip)
            .find(|clip| clip.parent().get(name).as_deref() == Some(value))
    }

    /// The producer to cut from when placing `parent` on this track.
    ///
    /// Sources that need it get a track-local duplicate tagged
    /// `<root>_<track>[_audio]`, reused when already on the track unless
    /// `force_creation`.
    pub fn clip_producer(&self, parent: &Producer, state: ClipState, force_creation: bool) -> Producer {
        let playlist = self.playlist.lock();
        self.clip_producer_in(&playlist, parent, state, force_creation)
    }

    fn clip_producer_in(
        &self,
        playlist: &Playlist,
        parent: &Producer,
        state: ClipState,
        force_creation: bool,
    ) -> Producer {
        let source = parent.parent();
        let service = source.service();
        let original_id = source.id();
        if !self.needs_duplicate(&service)
            || state == ClipState::VideoOnly
            || original_id.ends_with("_video")
        {
            // No audio to protect, share the producer.
            return parent.clone();
        }
        let root = original_id.split('_').next().unwrap_or_default();
        let id_for_track =
            ProducerId::for_track(root, &Self::track_id(playlist), state).to_string();
        if !force_creation {
            if let Some(existing) = Self::find_in(playlist, "id", &id_for_track, 0) {
                return existing.parent();
            }
        }
        let duplicate = source.duplicate();
        duplicate.set("id", id_for_track.as_str());
        if state == ClipState::AudioOnly {
            duplicate.set_int("video_index", -1);
        }
        debug!(id = %id_for_track, "Created track producer");
        duplicate
    }

    // ── Speed ───────────────────────────────────────────────────

    /// Change the playback speed of the clip at `info.start_pos`.
    ///
    /// Uses `producer` when given and valid, else the pool entry for the
    /// speed, else synthesises a framebuffer producer (stored in `pool` and
    /// announced through the events). The clip is re-cut with its crop window
    /// scaled by `1 / speed` and truncated to the free space before the next
    /// clip. Returns the new clip length in frames.
    #[allow(clippy::too_many_arguments)]
    pub fn change_clip_speed(
        &self,
        info: &ItemInfo,
        speed_independent_info: &ItemInfo,
        speed: f64,
        strobe: i32,
        producer: Option<Producer>,
        pool: &mut SlowMotionPool,
        pass_properties: &Properties,
    ) -> Result<i64> {
        let rate = self.rate;
        let start_pos = info.start_pos.frames(rate);
        let mut playlist = self.playlist.lock();
        let before = playlist.get_playtime();
        let mut clip_index = playlist.get_clip_index_at(start_pos);
        let clip_length = playlist.clip_length(clip_index);

        let Some(original) = playlist.get_clip(clip_index) else {
            debug!(start_pos, "No clip to change speed");
            return Err(CutlistError::InvalidState(format!("no clip at frame {}", start_pos)));
        };
        if !original.is_valid() || original.is_blank() {
            debug!(start_pos, "Invalid clip to change speed");
            return Err(CutlistError::InvalidState(format!("blank or invalid clip at frame {}", start_pos)));
        }
        let parent = original.parent();
        if !parent.is_valid() || parent.is_blank() {
            debug!(start_pos, "Invalid parent to change speed");
            return Err(CutlistError::InvalidState(format!("invalid parent at frame {}", start_pos)));
        }

        let speed = if speed <= 0.0 && speed > -1.0 { 1.0 } else { speed };
        let service = parent.service();
        let change = if service.contains("avformat") {
            if speed != 1.0 || strobe > 1 {
                SpeedChange::Resample
            } else {
                SpeedChange::Restore
            }
        } else if service == "framebuffer" {
            SpeedChange::Framebuffer
        } else {
            debug!(%service, "Speed change not supported for service");
            return Ok(clip_length);
        };

        let mut url = parent.resource();
        if service == "framebuffer" {
            url = url.split('?').next().unwrap_or_default().to_string();
        }
        let speed_text = format_speed(speed, self.settings.decimal_separator);
        url.push('?');
        url.push_str(&speed_text);
        if strobe > 1 {
            url.push_str(&format!("&strobe={}", strobe));
        }
        let parent_id = parent.id();
        let source_id = match ProducerId::parse(&parent_id) {
            Ok(id) => id.root().to_string(),
            Err(_) => parent_id.split('_').next().unwrap_or_default().to_string(),
        };
        let key = SlowMotionKey::new(source_id, speed_text, (strobe > 1).then_some(strobe as u32));

        // Get the target producer before touching the playlist.
        let existing = producer
            .filter(Producer::is_valid)
            .or_else(|| pool.get(&key).filter(|p| p.is_valid()).cloned());
        let (target, created) = match existing {
            Some(target) => (target, false),
            None => {
                let target = self.factory.create(&format!("framebuffer:{}", url));
                if !target.is_valid() {
                    warn!(%url, "Failed to create slowmotion producer");
                    return Err(CutlistError::Construction(format!("framebuffer:{}", url)));
                }
                if strobe > 1 || change == SpeedChange::Framebuffer {
                    target.set_int("strobe", strobe as i64);
                }
                target.set("id", key.producer_id().to_string());
                for (name, value) in pass_properties.iter() {
                    target.set(name, value);
                }
                pool.insert(key.clone(), target.clone());
                (target, true)
            }
        };

        let Some(removed) = playlist.replace_with_blank(clip_index) else {
            return Err(CutlistError::InvalidState(format!("no clip at frame {}", start_pos)));
        };
        playlist.consolidate_blanks(false);

        // Check that the blank space is long enough for the new duration.
        clip_index = playlist.get_clip_index_at(start_pos);
        let blank_end = playlist.clip_start(clip_index) + playlist.clip_length(clip_index);
        let followed = clip_index + 1 < playlist.count();
        let max_length = (RationalTime::from_frames(blank_end, rate) - info.start_pos).frames(rate);

        let cut = match change {
            SpeedChange::Resample => {
                let crop_start = info.crop_start.frames(rate) as f64;
                let in_point = (crop_start / speed) as i64;
                if followed && start_pos as f64 + clip_length as f64 / speed > blank_end as f64 {
                    target.cut(in_point, in_point + max_length - 1)
                } else {
                    target.cut(in_point, ((crop_start + clip_length as f64) / speed - 1.0) as i64)
                }
            }
            SpeedChange::Restore => {
                let original_start = speed_independent_info.crop_start.frames(rate);
                let duration = speed_independent_info.crop_duration.frames(rate);
                let natural_end = (info.start_pos + speed_independent_info.crop_duration).frames(rate);
                if followed && natural_end > blank_end {
                    target.cut(original_start, original_start + max_length - 1)
                } else {
                    target.cut(original_start, original_start + duration - 1)
                }
            }
            SpeedChange::Framebuffer => {
                let duration =
                    (speed_independent_info.crop_duration.frames(rate) as f64 / speed) as i64;
                let original_start =
                    (speed_independent_info.crop_start.frames(rate) as f64 / speed) as i64;
                if followed && start_pos + duration > blank_end {
                    target.cut(original_start, original_start + max_length - 1)
                } else {
                    target.cut(original_start, original_start + duration - 1)
                }
            }
        };

        // Move all effects to the new cut.
        self.effects.add_effects(&cut, &removed);
        if let Err(e) = playlist.insert_at(start_pos, &cut, true) {
            warn!(error = %e, start_pos, "Speed change failed, restoring clip");
            if let Err(restore) = playlist.insert_at(start_pos, &removed, true) {
                warn!(error = %restore, start_pos, "Failed to restore clip");
            }
            playlist.consolidate_blanks(false);
            return Err(e);
        }
        let new_length = playlist.clip_length(playlist.get_clip_index_at(start_pos));
        let after = playlist.get_playtime();
        drop(playlist);

        debug!(start_pos, speed, strobe, new_length, "Changed clip speed");
        if created {
            self.events.slowmotion_created(&url, &target);
        }
        self.notify_duration(before, after);
        Ok(new_length)
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Whether any clip on the track carries audio.
    pub fn has_audio(&self) -> bool {
        self.playlist
            .lock()
            .regions()
            .into_iter()
            .filter_map(|region| region.clip)
            .any(|clip| {
                let parent = clip.parent();
                let service = parent.service();
                service == "xml" || service == "consumer" || parent.get_int("audio_index") > -1
            })
    }

    /// Length of the blank at `position`: from the blank start when
    /// `from_blank_start`, else from `position`. `Some(0)` on a clip, `None`
    /// past the end of the track.
    pub fn blank_length(&self, position: i64, from_blank_start: bool) -> Option<i64> {
        let playlist = self.playlist.lock();
        let index = playlist.get_clip_index_at(position);
        if index >= playlist.count() {
            return None;
        }
        if !playlist.is_blank(index) {
            return Some(0);
        }
        let length = playlist.clip_length(index);
        if from_blank_start {
            Some(length)
        } else {
            Some(length + playlist.clip_start(index) - position)
        }
    }

    // ── Track properties ────────────────────────────────────────

    pub fn set_property(&self, name: &str, value: &str) {
        self.playlist.lock().properties_mut().set(name, value);
    }

    pub fn set_int_property(&self, name: &str, value: i64) {
        self.playlist.lock().properties_mut().set_int(name, value);
    }

    /// Track property, empty when unset.
    pub fn property(&self, name: &str) -> String {
        self.playlist
            .lock()
            .properties()
            .get(name)
            .unwrap_or_default()
            .to_string()
    }

    pub fn int_property(&self, name: &str) -> i64 {
        self.playlist.lock().properties().get_int(name)
    }

    pub fn info(&self) -> TrackInfo {
        let playlist = self.playlist.lock();
        let hide = playlist.parent_properties().get_int(HIDE);
        TrackInfo {
            name: playlist.properties().get(TRACK_NAME).unwrap_or_default().to_string(),
            locked: playlist.properties().get_int(TRACK_LOCKED) != 0,
            muted: hide & 2 != 0,
            hidden: hide & 1 != 0,
            kind: self.kind,
            effects: self.track_effects.clone(),
        }
    }

    pub fn set_info(&mut self, info: TrackInfo) {
        {
            let mut playlist = self.playlist.lock();
            playlist.properties_mut().set(TRACK_NAME, info.name.as_str());
            playlist
                .properties_mut()
                .set_int(TRACK_LOCKED, info.locked as i64);
            playlist
                .parent_properties_mut()
                .set_int(HIDE, info.hide_flags());
        }
        self.kind = info.kind;
        self.track_effects = info.effects;
    }

    /// Packed hide flags (bit 0 video hidden, bit 1 audio muted).
    pub fn state(&self) -> i64 {
        self.playlist.lock().parent_properties().get_int(HIDE)
    }

    pub fn set_state(&self, state: i64) {
        self.playlist.lock().parent_properties_mut().set_int(HIDE, state);
    }
}
