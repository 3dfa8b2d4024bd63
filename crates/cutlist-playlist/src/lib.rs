//! Cutlist Playlist - in-memory playlist and producer engine
//!
//! The edit façade in `cutlist-timeline` drives this engine through index
//! based primitives, the same shape a multimedia framework playlist exposes:
//! - Producers (sources) and cuts (trimmed views of a source)
//! - Playlists of contiguous clip and blank regions
//! - Filters and the clip-effects collaborator
//! - A producer factory for synthesised sources

pub mod factory;
pub mod filter;
pub mod playlist;
pub mod producer;
pub mod properties;

pub use factory::{MediaFactory, ProducerFactory};
pub use filter::{ClipEffects, Filter, FilterEffects, EFFECT_ID};
pub use playlist::{Playlist, Region, SharedPlaylist};
pub use producer::Producer;
pub use properties::Properties;
