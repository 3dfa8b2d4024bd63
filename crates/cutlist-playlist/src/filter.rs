//! Filters attached to producers, and the clip-effects collaborator.

use serde::{Deserialize, Serialize};

use crate::producer::Producer;
use crate::properties::Properties;

/// Property naming the effect a filter implements. Filters without it are
/// engine-internal (normalisers, converters) and are never copied around.
pub const EFFECT_ID: &str = "kdenlive_id";

/// A filter attached to a producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub properties: Properties,
}

impl Filter {
    /// Create a filter for an engine service.
    pub fn new(service: &str) -> Self {
        let mut properties = Properties::new();
        properties.set("mlt_service", service);
        Self { properties }
    }

    /// Create a user-facing effect filter.
    pub fn effect(service: &str, effect_id: &str) -> Self {
        Self::new(service).with(EFFECT_ID, effect_id)
    }

    /// Builder-style property setter.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.properties.set(name, value);
        self
    }

    pub fn service(&self) -> &str {
        self.properties.get("mlt_service").unwrap_or_default()
    }

    pub fn effect_id(&self) -> Option<&str> {
        self.properties.get(EFFECT_ID)
    }

    /// Whether this filter is a user effect (as opposed to an internal one).
    pub fn is_effect(&self) -> bool {
        self.effect_id().is_some()
    }
}

/// Copies effect metadata between producers.
pub trait ClipEffects: Send + Sync {
    /// Append the effects of `source` to `target`.
    fn add_effects(&self, target: &Producer, source: &Producer);

    /// Replace the effects of `target` with those of `source`.
    fn replace_effects(&self, target: &Producer, source: &Producer);
}

/// Default effects handling: effect filters are cloned, internal filters are
/// left where they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterEffects;

impl ClipEffects for FilterEffects {
    fn add_effects(&self, target: &Producer, source: &Producer) {
        if target.same_as(source) {
            return;
        }
        for filter in source.filters().into_iter().filter(Filter::is_effect) {
            target.attach(filter);
        }
    }

    fn replace_effects(&self, target: &Producer, source: &Producer) {
        if target.same_as(source) {
            return;
        }
        target.retain_filters(|f| !f.is_effect());
        self.add_effects(target, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_effects_skips_internal_filters() {
        let source = Producer::new("avformat", "a.mp4", 100);
        source.attach(Filter::new("audiolevel"));
        source.attach(Filter::effect("brightness", "brightness"));
        let target = Producer::new("avformat", "a.mp4", 100).cut(0, 9);

        FilterEffects.add_effects(&target, &source);
        let filters = target.filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].effect_id(), Some("brightness"));
    }

    #[test]
    fn test_replace_effects_keeps_internal_filters() {
        let target = Producer::new("avformat", "a.mp4", 100);
        target.attach(Filter::new("audiolevel"));
        target.attach(Filter::effect("volume", "volume"));
        let source = Producer::new("avformat", "a.mp4", 100);
        source.attach(Filter::effect("sepia", "sepia"));

        FilterEffects.replace_effects(&target, &source);
        let services: Vec<_> = target
            .filters()
            .iter()
            .map(|f| f.service().to_string())
            .collect();
        assert_eq!(services, vec!["audiolevel", "sepia"]);
    }
}
