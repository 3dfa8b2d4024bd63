//! Playlist: an ordered sequence of clip and blank regions.
//!
//! Regions are addressed by index; positions are absolute frame numbers.
//! Regions are contiguous by construction, a region starts where the previous
//! one ends. Blank lengths are given in frames, clip bounds as inclusive
//! `[in, out]` source frames.

use cutlist_core::{CutlistError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::producer::Producer;
use crate::properties::Properties;

/// A playlist shared between a track and its owner, guarded by one coarse lock.
pub type SharedPlaylist = Arc<Mutex<Playlist>>;

#[derive(Debug, Clone)]
enum Entry {
    Blank(i64),
    Clip(Producer),
}

impl Entry {
    fn length(&self) -> i64 {
        match self {
            Entry::Blank(length) => *length,
            Entry::Clip(cut) => cut.get_playtime(),
        }
    }
}

/// Read-only view of one region.
#[derive(Debug, Clone)]
pub struct Region {
    pub index: usize,
    pub start: i64,
    pub length: i64,
    /// The cut, `None` for blanks.
    pub clip: Option<Producer>,
}

impl Region {
    /// First frame after this region.
    pub fn end(&self) -> i64 {
        self.start + self.length
    }

    pub fn is_blank(&self) -> bool {
        self.clip.is_none()
    }
}

#[derive(Debug, Default)]
pub struct Playlist {
    entries: Vec<Entry>,
    properties: Properties,
    parent_properties: Properties,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a playlist carrying an `id` property.
    pub fn with_id(id: &str) -> Self {
        let mut playlist = Self::new();
        playlist.properties.set("id", id);
        playlist
    }

    /// Wrap into a [`SharedPlaylist`].
    pub fn shared(self) -> SharedPlaylist {
        Arc::new(Mutex::new(self))
    }

    // ── Properties ──────────────────────────────────────────────

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Properties of the multitrack slot holding this playlist (`hide`, ...).
    pub fn parent_properties(&self) -> &Properties {
        &self.parent_properties
    }

    pub fn parent_properties_mut(&mut self) -> &mut Properties {
        &mut self.parent_properties
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Number of regions.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Total length in frames.
    pub fn get_playtime(&self) -> i64 {
        self.entries.iter().map(Entry::length).sum()
    }

    /// Start frame of region `index`; the playtime when past the end.
    pub fn clip_start(&self, index: usize) -> i64 {
        self.entries
            .iter()
            .take(index)
            .map(Entry::length)
            .sum()
    }

    /// Length of region `index`, zero when past the end.
    pub fn clip_length(&self, index: usize) -> i64 {
        self.entries.get(index).map_or(0, Entry::length)
    }

    /// Whether region `index` is blank. Out-of-range indices count as blank.
    pub fn is_blank(&self, index: usize) -> bool {
        !matches!(self.entries.get(index), Some(Entry::Clip(_)))
    }

    /// The cut at `index`, or a blank producer for blank regions.
    pub fn get_clip(&self, index: usize) -> Option<Producer> {
        match self.entries.get(index)? {
            Entry::Blank(length) => Some(Producer::blank(*length)),
            Entry::Clip(cut) => Some(cut.clone()),
        }
    }

    /// Index of the region containing `position`; `count()` when past the end.
    pub fn get_clip_index_at(&self, position: i64) -> usize {
        let mut end = 0;
        for (index, entry) in self.entries.iter().enumerate() {
            end += entry.length();
            if position < end {
                return index;
            }
        }
        self.entries.len()
    }

    /// Snapshot of all regions.
    pub fn regions(&self) -> Vec<Region> {
        let mut start = 0;
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let length = entry.length();
                let region = Region {
                    index,
                    start,
                    length,
                    clip: match entry {
                        Entry::Blank(_) => None,
                        Entry::Clip(cut) => Some(cut.clone()),
                    },
                };
                start += length;
                region
            })
            .collect()
    }

    // ── Structural edits ────────────────────────────────────────

    fn entry_for(producer: &Producer) -> Entry {
        if producer.is_blank() {
            Entry::Blank(producer.get_playtime())
        } else if producer.is_cut() {
            Entry::Clip(producer.clone())
        } else {
            Entry::Clip(producer.cut(producer.get_in(), producer.get_out()))
        }
    }

    /// Append a producer (a cut is made when given a parent).
    pub fn append(&mut self, producer: &Producer) -> usize {
        self.entries.push(Self::entry_for(producer));
        self.entries.len() - 1
    }

    /// Append a blank of `length` frames.
    pub fn append_blank(&mut self, length: i64) {
        if length > 0 {
            self.entries.push(Entry::Blank(length));
        }
    }

    /// Insert a producer before region `index` (clamped to the end).
    pub fn insert(&mut self, producer: &Producer, index: usize) -> usize {
        let index = index.min(self.entries.len());
        self.entries.insert(index, Self::entry_for(producer));
        index
    }

    /// Insert a blank of `length` frames before region `index`.
    pub fn insert_blank(&mut self, index: usize, length: i64) {
        if length > 0 {
            let index = index.min(self.entries.len());
            self.entries.insert(index, Entry::Blank(length));
        }
    }

    /// Remove region `index`, closing the gap.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(CutlistError::Engine(format!(
                "cannot remove region {} of {}",
                index,
                self.entries.len()
            )));
        }
        self.entries.remove(index);
        Ok(())
    }

    /// Replace region `index` with a blank of the same length.
    /// Returns the removed cut, `None` when the region is blank or missing.
    pub fn replace_with_blank(&mut self, index: usize) -> Option<Producer> {
        let entry = self.entries.get_mut(index)?;
        let Entry::Clip(cut) = entry else {
            return None;
        };
        let cut = cut.clone();
        *entry = Entry::Blank(cut.get_playtime());
        Some(cut)
    }

    /// Change the bounds of region `index`.
    ///
    /// For clips the bounds are source frames, clamped to the source length.
    /// For blanks only the resulting length `out - in + 1` matters.
    pub fn resize_clip(&mut self, index: usize, in_point: i64, out_point: i64) -> Result<()> {
        let count = self.entries.len();
        let entry = self.entries.get_mut(index).ok_or_else(|| {
            CutlistError::Engine(format!("cannot resize region {} of {}", index, count))
        })?;
        if in_point > out_point || out_point < 0 {
            return Err(CutlistError::Engine(format!(
                "invalid bounds [{}, {}] for region {}",
                in_point, out_point, index
            )));
        }
        match entry {
            Entry::Blank(length) => *length = out_point - in_point + 1,
            Entry::Clip(cut) => {
                cut.set_in_and_out(in_point, out_point);
            }
        }
        Ok(())
    }

    /// Split region `index` so the first piece keeps `offset` frames.
    ///
    /// The second piece of a clip is a fresh cut of the same parent; it does
    /// not inherit the filters of the first.
    pub fn split(&mut self, index: usize, offset: i64) -> Result<()> {
        let length = self.clip_length(index);
        if index >= self.entries.len() || offset <= 0 || offset >= length {
            return Err(CutlistError::Engine(format!(
                "cannot split region {} (length {}) at offset {}",
                index, length, offset
            )));
        }
        let second = match self.entries[index].clone() {
            Entry::Blank(_) => {
                self.entries[index] = Entry::Blank(offset);
                Entry::Blank(length - offset)
            }
            Entry::Clip(cut) => {
                let (in_point, out_point) = (cut.get_in(), cut.get_out());
                let tail = cut.cut(in_point + offset, out_point);
                cut.set_in_and_out(in_point, in_point + offset - 1);
                Entry::Clip(tail)
            }
        };
        self.entries.insert(index + 1, second);
        Ok(())
    }

    /// Make a region boundary at `position`. Returns the index of the region
    /// starting there (`count()` when past the end).
    pub fn split_at(&mut self, position: i64) -> usize {
        let index = self.get_clip_index_at(position);
        if index >= self.entries.len() {
            return index;
        }
        let start = self.clip_start(index);
        if position <= start {
            return index;
        }
        match self.split(index, position - start) {
            Ok(()) => index + 1,
            Err(_) => index,
        }
    }

    /// Remove `length` frames starting at `position`, regardless of region
    /// boundaries. Returns the index where the removed span began.
    pub fn remove_region(&mut self, position: i64, length: i64) -> usize {
        let start = self.split_at(position);
        if length <= 0 {
            return start;
        }
        self.split_at(position + length);
        let mut removed = 0;
        while start < self.entries.len() && removed < length {
            removed += self.entries[start].length();
            self.entries.remove(start);
        }
        start
    }

    /// Place `producer` at `position`. Returns the index of the new region.
    ///
    /// - Inside a blank: the blank is overwritten; when the clip is longer
    ///   than the rest of the blank, following regions are pushed back.
    /// - Inside a clip: inserted before or after it, whichever boundary is
    ///   nearer; with `overwrite`, a blank right after that boundary is
    ///   consumed by the new clip.
    /// - Past the end: padded with a blank and appended.
    pub fn insert_at(&mut self, position: i64, producer: &Producer, overwrite: bool) -> Result<usize> {
        if position < 0 {
            return Err(CutlistError::Engine(format!(
                "cannot insert at negative position {}",
                position
            )));
        }
        let length = producer.get_playtime();
        let mut index = self.get_clip_index_at(position);
        let count = self.entries.len();

        if index < count && self.is_blank(index) {
            let start = self.clip_start(index);
            if position != start {
                self.split(index, position - start)?;
                index += 1;
            }
            if length < self.clip_length(index) {
                self.split(index, length)?;
            }
            self.remove(index)?;
            Ok(self.insert(producer, index))
        } else if index < count {
            let start = self.clip_start(index);
            if position > start + self.clip_length(index) / 2 {
                index += 1;
            }
            if overwrite && index < self.entries.len() && self.is_blank(index) {
                if length < self.clip_length(index) {
                    self.split(index, length)?;
                }
                self.remove(index)?;
            }
            Ok(self.insert(producer, index))
        } else {
            let playtime = self.get_playtime();
            if position > playtime {
                self.append_blank(position - playtime);
            }
            Ok(self.append(producer))
        }
    }

    /// Merge adjacent blanks and drop empty ones. Unless `keep_length`, a
    /// trailing blank is removed so the playtime ends on the last clip.
    pub fn consolidate_blanks(&mut self, keep_length: bool) {
        let before = self.entries.len();
        let mut merged: Vec<Entry> = Vec::with_capacity(before);
        for entry in self.entries.drain(..) {
            match entry {
                Entry::Blank(length) if length <= 0 => {}
                Entry::Blank(length) => {
                    if let Some(Entry::Blank(previous)) = merged.last_mut() {
                        *previous += length;
                    } else {
                        merged.push(Entry::Blank(length));
                    }
                }
                clip => merged.push(clip),
            }
        }
        if !keep_length && matches!(merged.last(), Some(Entry::Blank(_))) {
            merged.pop();
        }
        if merged.len() != before {
            debug!(before, after = merged.len(), "Consolidated blanks");
        }
        self.entries = merged;
    }
}
