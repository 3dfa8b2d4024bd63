//! Timeline serialization with versioning and migration.
//!
//! Uses JSON with a schema version field for forward-compatible persistence.
//! Only the region layout is stored; producers are referenced by identifier
//! and resolved against a producer table on restore.

use cutlist_core::{CutlistError, FrameRate, Result};
use cutlist_playlist::{Playlist, Producer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::info::TrackInfo;
use crate::producer_id::{ClipState, ProducerId};
use crate::timeline::Timeline;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// One region of a stored track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegionEntry {
    Blank {
        length: i64,
    },
    Clip {
        producer: ProducerId,
        #[serde(rename = "in")]
        in_point: i64,
        #[serde(rename = "out")]
        out_point: i64,
    },
}

/// A stored track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    /// Playlist id, the track part of track-local producer ids.
    pub id: String,
    pub info: TrackInfo,
    pub regions: Vec<RegionEntry>,
}

/// The stored timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub name: String,
    pub frame_rate: FrameRate,
    pub tracks: Vec<TrackEntry>,
}

/// Versioned timeline file wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineFile {
    /// Schema version for migration.
    pub version: u32,
    /// The timeline data.
    pub timeline: TimelineEntry,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl TimelineFile {
    /// Capture the layout of `timeline`.
    ///
    /// Fails when a clip's producer has no valid identifier.
    pub fn from_timeline(timeline: &Timeline) -> Result<Self> {
        let mut tracks = Vec::with_capacity(timeline.track_count());
        for track in timeline.tracks() {
            let mut regions = Vec::new();
            for region in track.regions() {
                let entry = match region.clip {
                    None => RegionEntry::Blank {
                        length: region.length,
                    },
                    Some(cut) => RegionEntry::Clip {
                        producer: ProducerId::parse(&cut.parent().id())?,
                        in_point: cut.get_in(),
                        out_point: cut.get_out(),
                    },
                };
                regions.push(entry);
            }
            tracks.push(TrackEntry {
                id: track.property("id"),
                info: track.info(),
                regions,
            });
        }
        Ok(Self {
            version: CURRENT_VERSION,
            timeline: TimelineEntry {
                name: timeline.name.clone(),
                frame_rate: timeline.frame_rate(),
                tracks,
            },
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| CutlistError::Serialization(format!("Failed to serialize timeline: {}", e)))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| CutlistError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        if version > CURRENT_VERSION {
            return Err(CutlistError::Serialization(format!(
                "Timeline file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;

        serde_json::from_value(migrated)
            .map_err(|e| CutlistError::Serialization(format!("Failed to parse timeline: {}", e)))
    }

    /// Save timeline to a file path.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load timeline from a file path.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    /// Rebuild a timeline, resolving producers by identifier in `producers`.
    pub fn restore(&self, producers: &HashMap<String, Producer>) -> Result<Timeline> {
        let mut timeline = Timeline::new(self.timeline.name.clone(), self.timeline.frame_rate);
        self.restore_into(&mut timeline, producers)?;
        Ok(timeline)
    }

    /// Append the stored tracks to `timeline`.
    ///
    /// Track-local duplicates missing from `producers` are recreated from
    /// their root producer. Slow-motion producers end up in the timeline pool.
    pub fn restore_into(
        &self,
        timeline: &mut Timeline,
        producers: &HashMap<String, Producer>,
    ) -> Result<()> {
        let mut resolved: HashMap<String, Producer> = producers.clone();
        for entry in &self.timeline.tracks {
            let mut playlist = Playlist::with_id(&entry.id);
            for region in &entry.regions {
                match region {
                    RegionEntry::Blank { length } => playlist.append_blank(*length),
                    RegionEntry::Clip {
                        producer,
                        in_point,
                        out_point,
                    } => {
                        let source = resolve(&mut resolved, producer)?;
                        if matches!(producer.unmarked(), ProducerId::SlowMotion { .. }) {
                            timeline.slowmotion_mut().store(source.clone());
                        }
                        playlist.append(&source.cut(*in_point, *out_point));
                    }
                }
            }
            timeline.push_playlist(playlist, entry.info.clone());
        }
        debug!(
            name = %self.timeline.name,
            tracks = self.timeline.tracks.len(),
            "Restored timeline"
        );
        Ok(())
    }
}

/// Find the producer for `id`, deriving track duplicates from their root.
fn resolve(resolved: &mut HashMap<String, Producer>, id: &ProducerId) -> Result<Producer> {
    let key = id.to_string();
    if let Some(producer) = resolved.get(&key) {
        return Ok(producer.clone());
    }
    let state = match id.unmarked() {
        ProducerId::Track { .. } => ClipState::Original,
        ProducerId::TrackAudio { .. } => ClipState::AudioOnly,
        ProducerId::TrackVideo { .. } => ClipState::VideoOnly,
        _ => {
            warn!(id = %key, "Unknown producer in timeline file");
            return Err(CutlistError::Identifier(key));
        }
    };
    let Some(root) = resolved.get(id.root()) else {
        warn!(id = %key, "No root producer for track duplicate");
        return Err(CutlistError::Identifier(key));
    };
    let duplicate = root.duplicate();
    duplicate.set("id", key.as_str());
    if state == ClipState::AudioOnly {
        duplicate.set_int("video_index", -1);
    }
    resolved.insert(key, duplicate.clone());
    Ok(duplicate)
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 → v1: the entire value is the timeline
                if data.get("version").is_none() {
                    data = serde_json::json!({
                        "version": 1,
                        "timeline": data,
                        "app_version": "0.1.0",
                    });
                }
                version = 1;
            }
            _ => {
                return Err(CutlistError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{InsertMode, TrackKind};

    fn producers() -> HashMap<String, Producer> {
        let src = Producer::new("avformat", "a.mp4", 500);
        src.set("id", "3");
        let color = Producer::new("color", "red", 15000);
        color.set("id", "8");
        let slow = Producer::new("framebuffer", "a.mp4?0.5", 1000);
        slow.set("id", "slowmotion:3:0.5");
        [src, color, slow]
            .into_iter()
            .map(|p| (p.id(), p))
            .collect()
    }

    fn build(producers: &HashMap<String, Producer>) -> Timeline {
        let mut timeline = Timeline::new("Edit", FrameRate::FPS_25);
        timeline.add_track(TrackKind::Video, "V1");
        timeline.add_track(TrackKind::Audio, "A1");
        let video = timeline.track(0).unwrap();
        video
            .add(0.0, &producers["3"], 0.0, 2.0, ClipState::Original, true, InsertMode::Insert)
            .unwrap();
        video
            .add(4.0, &producers["8"], 0.0, 1.0, ClipState::Original, true, InsertMode::Insert)
            .unwrap();
        timeline
            .track(1)
            .unwrap()
            .add(1.0, &producers["slowmotion:3:0.5"], 0.4, 2.4, ClipState::Original, false, InsertMode::Insert)
            .unwrap();
        timeline
    }

    #[test]
    fn test_from_timeline_layout() {
        let producers = producers();
        let file = TimelineFile::from_timeline(&build(&producers)).unwrap();
        let video = &file.timeline.tracks[0];
        assert_eq!(video.id, "playlist1");
        assert_eq!(
            video.regions,
            vec![
                RegionEntry::Clip {
                    producer: ProducerId::parse("3_playlist1").unwrap(),
                    in_point: 0,
                    out_point: 49,
                },
                RegionEntry::Blank { length: 50 },
                RegionEntry::Clip {
                    producer: ProducerId::Root("8".into()),
                    in_point: 0,
                    out_point: 24,
                },
            ]
        );
        assert_eq!(file.timeline.tracks[1].info.kind, TrackKind::Audio);
    }

    #[test]
    fn test_region_json_shape() {
        let entry = RegionEntry::Clip {
            producer: ProducerId::parse("3_playlist1_audio").unwrap(),
            in_point: 5,
            out_point: 9,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "clip", "producer": "3_playlist1_audio", "in": 5, "out": 9})
        );
    }

    #[test]
    fn test_timeline_roundtrip() {
        let producers = producers();
        let original = build(&producers);
        let file = TimelineFile::from_timeline(&original).unwrap();

        let json = file.to_json().unwrap();
        let loaded = TimelineFile::from_json(&json).unwrap();
        assert_eq!(loaded.version, CURRENT_VERSION);
        assert_eq!(loaded.timeline, file.timeline);

        let restored = loaded.restore(&producers).unwrap();
        assert_eq!(restored.track_count(), 2);
        assert_eq!(restored.playtime(), original.playtime());
        assert_eq!(restored.track(1).unwrap().info().name, "A1");
        assert_eq!(restored.slowmotion().len(), 1);

        // The track duplicate is recreated from its root.
        let first = restored.track(0).unwrap().regions()[0].clip.clone().unwrap();
        assert_eq!(first.parent().id(), "3_playlist1");
        assert_eq!(first.parent().resource(), "a.mp4");
        assert!(!first.parent().same_as(&producers["3"]));

        let again = TimelineFile::from_timeline(&restored).unwrap();
        assert_eq!(again.timeline, file.timeline);
    }

    #[test]
    fn test_restore_unknown_producer_fails() {
        let producers = producers();
        let file = TimelineFile::from_timeline(&build(&producers)).unwrap();
        let mut partial = producers.clone();
        partial.remove("slowmotion:3:0.5");
        assert!(matches!(
            file.restore(&partial),
            Err(CutlistError::Identifier(id)) if id == "slowmotion:3:0.5"
        ));
    }

    #[test]
    fn test_migration_v0() {
        let producers = producers();
        let file = TimelineFile::from_timeline(&build(&producers)).unwrap();
        let raw_json = serde_json::to_vec(&file.timeline).unwrap();

        let loaded = TimelineFile::from_json(&raw_json).unwrap();
        assert_eq!(loaded.version, CURRENT_VERSION);
        assert_eq!(loaded.timeline.name, "Edit");
    }

    #[test]
    fn test_future_version_rejected() {
        let json = serde_json::json!({
            "version": 999,
            "timeline": {},
            "app_version": "99.0.0",
        });
        let data = serde_json::to_vec(&json).unwrap();
        assert!(TimelineFile::from_json(&data).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let producers = producers();
        let file = TimelineFile::from_timeline(&build(&producers)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edit.cutlist");
        file.save_to_file(&path).unwrap();
        let loaded = TimelineFile::load_from_file(&path).unwrap();
        assert_eq!(loaded.timeline, file.timeline);
    }
}
