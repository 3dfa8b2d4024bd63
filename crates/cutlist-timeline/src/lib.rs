//! Cutlist Timeline - tracks over shared playlists
//!
//! Implements the editing layer of the timeline:
//! - Tracks translating time-based edits into playlist operations
//! - Track-local producer duplication and replacement
//! - Slow-motion producer synthesis and pooling
//! - A multi-track timeline and its persisted form

pub mod events;
pub mod info;
pub mod producer_id;
pub mod serialization;
pub mod slowmotion;
pub mod timeline;
pub mod track;

pub use events::{ChannelEvents, NoEvents, TrackEvent, TrackEvents};
pub use info::{InsertMode, ItemInfo, TrackInfo, TrackKind};
pub use producer_id::{ClipState, ProducerId};
pub use serialization::{RegionEntry, TimelineEntry, TimelineFile, TrackEntry};
pub use slowmotion::{SlowMotionKey, SlowMotionPool};
pub use timeline::Timeline;
pub use track::Track;
