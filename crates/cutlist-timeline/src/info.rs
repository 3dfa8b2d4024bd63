//! Value types passed between the timeline and its tracks.

use cutlist_core::{FrameRate, RationalTime};
use cutlist_playlist::Filter;
use serde::{Deserialize, Serialize};

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// How `add` treats material already at the insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InsertMode {
    /// Place the clip without clearing room first.
    #[default]
    Insert,
    /// Remove whatever covers the new clip's span, then place it.
    Overwrite,
    /// Split at the insertion point and push later material back.
    SplitInsert,
}

/// Position and crop window of a clip on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Timeline position of the first frame.
    pub start_pos: RationalTime,
    /// Timeline position after the last frame.
    pub end_pos: RationalTime,
    /// Offset into the source.
    pub crop_start: RationalTime,
    /// Length taken from the source.
    pub crop_duration: RationalTime,
}

impl ItemInfo {
    /// Build an info from frame numbers.
    pub fn from_frames(start: i64, crop_start: i64, crop_duration: i64, rate: FrameRate) -> Self {
        Self {
            start_pos: RationalTime::from_frames(start, rate),
            end_pos: RationalTime::from_frames(start + crop_duration, rate),
            crop_start: RationalTime::from_frames(crop_start, rate),
            crop_duration: RationalTime::from_frames(crop_duration, rate),
        }
    }
}

/// User-visible track state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub name: String,
    pub locked: bool,
    pub muted: bool,
    pub hidden: bool,
    pub kind: TrackKind,
    /// Effects applied to the whole track.
    pub effects: Vec<Filter>,
}

impl TrackInfo {
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            name: name.into(),
            locked: false,
            muted: false,
            hidden: false,
            kind,
            effects: Vec::new(),
        }
    }

    /// Packed `hide` flags: bit 0 hides video, bit 1 mutes audio.
    pub fn hide_flags(&self) -> i64 {
        (self.hidden as i64) | ((self.muted as i64) << 1)
    }
}
