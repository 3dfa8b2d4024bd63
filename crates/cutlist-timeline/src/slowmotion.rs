//! Project-wide table of slow-motion producers.
//!
//! The table belongs to the caller (the timeline or project layer). Tracks
//! read from it and add newly synthesised producers to it, but never hold on
//! to it between calls.

use cutlist_playlist::Producer;
use std::collections::HashMap;

use crate::producer_id::ProducerId;

/// Key of a slow-motion producer: source id, speed text and strobe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlowMotionKey {
    pub source: String,
    pub speed: String,
    pub strobe: Option<u32>,
}

impl SlowMotionKey {
    pub fn new(source: impl Into<String>, speed: impl Into<String>, strobe: Option<u32>) -> Self {
        Self {
            source: source.into(),
            speed: speed.into(),
            strobe,
        }
    }

    /// Key of a (possibly marked) slow-motion identifier.
    pub fn from_id(id: &ProducerId) -> Option<Self> {
        match id.unmarked() {
            ProducerId::SlowMotion {
                source,
                speed,
                strobe,
            } => Some(Self::new(source.clone(), speed.clone(), *strobe)),
            _ => None,
        }
    }

    /// The producer identifier this key stands for.
    pub fn producer_id(&self) -> ProducerId {
        ProducerId::SlowMotion {
            source: self.source.clone(),
            speed: self.speed.clone(),
            strobe: self.strobe,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SlowMotionPool {
    producers: HashMap<SlowMotionKey, Producer>,
}

impl SlowMotionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SlowMotionKey) -> Option<&Producer> {
        self.producers.get(key)
    }

    /// Store a producer, replacing any previous one under the same key.
    pub fn insert(&mut self, key: SlowMotionKey, producer: Producer) -> Option<Producer> {
        self.producers.insert(key, producer)
    }

    /// Store a producer under the key derived from its `id` property.
    /// Returns `false` when the id is not a slow-motion identifier.
    pub fn store(&mut self, producer: Producer) -> bool {
        let key = ProducerId::parse(&producer.id())
            .ok()
            .and_then(|id| SlowMotionKey::from_id(&id));
        match key {
            Some(key) => {
                self.producers.insert(key, producer);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &SlowMotionKey) -> Option<Producer> {
        self.producers.remove(key)
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SlowMotionKey, &Producer)> {
        self.producers.iter()
    }
}
