//! Producer identifiers.
//!
//! Identifiers are persisted in project files, so the textual grammar is
//! fixed:
//!
//! ```text
//! <root>                                  source producer
//! <root>_<track>                          track-local duplicate
//! <root>_<track>_audio                    audio-only track duplicate
//! <root>_<track>_video                    video-only track duplicate
//! slowmotion:<root>:<speed>[:<strobe>]    speed-adjusted producer
//! #<any of the above>                     marked for replacement
//! ```
//!
//! Root identifiers never contain `_`; everything after the first `_` is
//! the track part.

use cutlist_core::{CutlistError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SLOWMOTION_PREFIX: &str = "slowmotion:";
const MARKER: char = '#';

/// Which media channels a region uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipState {
    /// Audio and video.
    Original,
    AudioOnly,
    VideoOnly,
}

/// Parsed producer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProducerId {
    Root(String),
    Track { root: String, track: String },
    TrackAudio { root: String, track: String },
    TrackVideo { root: String, track: String },
    SlowMotion {
        source: String,
        /// Speed as written in the identifier (`0.5`, `2`, `-1`).
        speed: String,
        strobe: Option<u32>,
    },
    Marked(Box<ProducerId>),
}

impl ProducerId {
    /// Parse an identifier.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(CutlistError::Identifier(text.to_string()));
        }
        if let Some(inner) = text.strip_prefix(MARKER) {
            let inner = Self::parse(inner)?;
            if inner.is_marked() {
                return Err(CutlistError::Identifier(text.to_string()));
            }
            return Ok(Self::Marked(Box::new(inner)));
        }
        if let Some(rest) = text.strip_prefix(SLOWMOTION_PREFIX) {
            return Self::parse_slowmotion(text, rest);
        }
        match text.split_once('_') {
            None => Ok(Self::Root(text.to_string())),
            Some((root, track_part)) if !root.is_empty() && !track_part.is_empty() => {
                let root = root.to_string();
                if let Some(track) = track_part.strip_suffix("_audio").filter(|t| !t.is_empty()) {
                    Ok(Self::TrackAudio {
                        root,
                        track: track.to_string(),
                    })
                } else if let Some(track) =
                    track_part.strip_suffix("_video").filter(|t| !t.is_empty())
                {
                    Ok(Self::TrackVideo {
                        root,
                        track: track.to_string(),
                    })
                } else {
                    Ok(Self::Track {
                        root,
                        track: track_part.to_string(),
                    })
                }
            }
            Some(_) => Err(CutlistError::Identifier(text.to_string())),
        }
    }

    fn parse_slowmotion(text: &str, rest: &str) -> Result<Self> {
        let mut parts = rest.split(':');
        let source = parts.next().filter(|s| !s.is_empty());
        let speed = parts.next().filter(|s| !s.is_empty());
        let strobe = match parts.next() {
            None => None,
            Some(s) => Some(
                s.parse::<u32>()
                    .map_err(|_| CutlistError::Identifier(text.to_string()))?,
            ),
        };
        match (source, speed, parts.next()) {
            (Some(source), Some(speed), None) => Ok(Self::SlowMotion {
                source: source.to_string(),
                speed: speed.to_string(),
                strobe,
            }),
            _ => Err(CutlistError::Identifier(text.to_string())),
        }
    }

    /// Identifier of a track-local producer for `root` on `track`.
    pub fn for_track(root: &str, track: &str, state: ClipState) -> Self {
        let (root, track) = (root.to_string(), track.to_string());
        match state {
            ClipState::Original => Self::Track { root, track },
            ClipState::AudioOnly => Self::TrackAudio { root, track },
            ClipState::VideoOnly => Self::TrackVideo { root, track },
        }
    }

    /// The source producer this identifier derives from.
    pub fn root(&self) -> &str {
        match self {
            Self::Root(root)
            | Self::Track { root, .. }
            | Self::TrackAudio { root, .. }
            | Self::TrackVideo { root, .. } => root,
            Self::SlowMotion { source, .. } => source,
            Self::Marked(inner) => inner.root(),
        }
    }

    /// The track part of a track-local identifier.
    pub fn track(&self) -> Option<&str> {
        match self {
            Self::Track { track, .. }
            | Self::TrackAudio { track, .. }
            | Self::TrackVideo { track, .. } => Some(track),
            Self::Marked(inner) => inner.track(),
            _ => None,
        }
    }

    pub fn is_marked(&self) -> bool {
        matches!(self, Self::Marked(_))
    }

    /// Whether this is a track-local duplicate of any kind.
    pub fn is_track_local(&self) -> bool {
        matches!(
            self,
            Self::Track { .. } | Self::TrackAudio { .. } | Self::TrackVideo { .. }
        )
    }

    /// This identifier with the replacement marker; already-marked stay as is.
    pub fn marked(self) -> Self {
        if self.is_marked() {
            self
        } else {
            Self::Marked(Box::new(self))
        }
    }

    /// This identifier without the replacement marker.
    pub fn unmarked(&self) -> &ProducerId {
        match self {
            Self::Marked(inner) => inner,
            other => other,
        }
    }

    /// Speed/strobe part of a slow-motion identifier: `<speed>[:<strobe>]`.
    pub fn slowmotion_key(&self) -> Option<String> {
        match self.unmarked() {
            Self::SlowMotion { speed, strobe, .. } => Some(match strobe {
                Some(strobe) => format!("{speed}:{strobe}"),
                None => speed.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(root) => f.write_str(root),
            Self::Track { root, track } => write!(f, "{root}_{track}"),
            Self::TrackAudio { root, track } => write!(f, "{root}_{track}_audio"),
            Self::TrackVideo { root, track } => write!(f, "{root}_{track}_video"),
            Self::SlowMotion {
                source,
                speed,
                strobe,
            } => {
                write!(f, "{SLOWMOTION_PREFIX}{source}:{speed}")?;
                if let Some(strobe) = strobe {
                    write!(f, ":{strobe}")?;
                }
                Ok(())
            }
            Self::Marked(inner) => write!(f, "{MARKER}{inner}"),
        }
    }
}

impl FromStr for ProducerId {
    type Err = CutlistError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ProducerId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProducerId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
