//! Producer construction from `service:resource` strings.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::producer::Producer;

/// Creates producers from `service:resource` locators.
///
/// Construction never fails loudly: callers check [`Producer::is_valid`].
pub trait ProducerFactory: Send + Sync {
    fn create(&self, locator: &str) -> Producer;
}

/// Factory backed by a registry of known sources and their lengths.
///
/// Understands plain sources (`avformat:clip.mp4`, or just `clip.mp4`) and
/// speed-adjusted framebuffers (`framebuffer:clip.mp4?0.5&strobe=2`), whose
/// length is the source length divided by the absolute speed.
#[derive(Debug, Default)]
pub struct MediaFactory {
    sources: RwLock<HashMap<String, i64>>,
}

impl MediaFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `resource` known with `length` frames.
    pub fn register(&self, resource: impl Into<String>, length: i64) {
        self.sources.write().insert(resource.into(), length);
    }

    fn length_of(&self, resource: &str) -> Option<i64> {
        self.sources.read().get(resource).copied()
    }

    fn framebuffer(&self, locator: &str) -> Producer {
        let (resource, query) = locator.split_once('?').unwrap_or((locator, ""));
        let mut params = query.split('&');
        let speed = params
            .next()
            .map(|s| s.replace(',', "."))
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(1.0);
        let strobe = params
            .filter_map(|p| p.strip_prefix("strobe="))
            .find_map(|v| v.parse::<i64>().ok());

        let Some(source_length) = self.length_of(resource) else {
            warn!(resource, "Unknown framebuffer source");
            return Producer::invalid("framebuffer", locator);
        };
        if speed == 0.0 {
            warn!(locator, "Framebuffer speed must be non-zero");
            return Producer::invalid("framebuffer", locator);
        }

        let length = (source_length as f64 / speed.abs()).ceil() as i64;
        let producer = Producer::new("framebuffer", locator, length);
        producer.set("warp_resource", resource);
        producer.set("warp_speed", speed.to_string());
        if let Some(strobe) = strobe {
            producer.set_int("strobe", strobe);
        }
        debug!(locator, length, "Created framebuffer producer");
        producer
    }
}

impl ProducerFactory for MediaFactory {
    fn create(&self, locator: &str) -> Producer {
        let (service, resource) = locator.split_once(':').unwrap_or(("avformat", locator));
        if service == "framebuffer" {
            return self.framebuffer(resource);
        }
        match self.length_of(resource) {
            Some(length) => Producer::new(service, resource, length),
            None => {
                warn!(service, resource, "Unknown media source");
                Producer::invalid(service, resource)
            }
        }
    }
}
