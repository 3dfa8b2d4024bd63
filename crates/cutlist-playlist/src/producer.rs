//! Producers: shared handles to media sources and their cuts.
//!
//! A parent producer describes a source (file, generator, framebuffer).
//! A cut is a trimmed `[in, out]` view of a parent; playlists hold cuts.
//! Handles are cheap to clone and all clones see the same state, which is
//! how several regions (and several tracks) can share one source.

use parking_lot::RwLock;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::filter::Filter;
use crate::properties::Properties;

#[derive(Debug)]
struct ProducerState {
    properties: Properties,
    filters: SmallVec<[Filter; 4]>,
    parent: Option<Producer>,
    in_point: i64,
    out_point: i64,
    valid: bool,
    blank: bool,
}

/// Shared handle to a producer.
#[derive(Clone)]
pub struct Producer {
    inner: Arc<RwLock<ProducerState>>,
}

impl Producer {
    fn from_state(state: ProducerState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Create a parent producer for `service:resource` with `length` frames.
    pub fn new(service: &str, resource: &str, length: i64) -> Self {
        let mut properties = Properties::new();
        properties.set("mlt_service", service);
        properties.set("resource", resource);
        properties.set_int("length", length);
        Self::from_state(ProducerState {
            properties,
            filters: SmallVec::new(),
            parent: None,
            in_point: 0,
            out_point: length - 1,
            valid: length > 0,
            blank: false,
        })
    }

    /// A producer that failed to open.
    pub fn invalid(service: &str, resource: &str) -> Self {
        let producer = Self::new(service, resource, 0);
        producer.inner.write().valid = false;
        producer
    }

    /// A blank of `length` frames.
    pub fn blank(length: i64) -> Self {
        let producer = Self::new("blank", "blank", length);
        {
            let mut state = producer.inner.write();
            state.blank = true;
            state.valid = true;
        }
        producer
    }

    /// Create a cut of this producer's source, clamped to `[0, length - 1]`.
    ///
    /// Cutting a cut cuts its parent, so cuts never nest.
    pub fn cut(&self, in_point: i64, out_point: i64) -> Producer {
        let parent = self.parent();
        let (in_point, out_point) = clamp_range(parent.get_length(), in_point, out_point);
        let blank = parent.is_blank();
        Self::from_state(ProducerState {
            properties: Properties::new(),
            filters: SmallVec::new(),
            parent: Some(parent),
            in_point,
            out_point,
            valid: true,
            blank,
        })
    }

    /// The parent of a cut, or this producer itself.
    pub fn parent(&self) -> Producer {
        match &self.inner.read().parent {
            Some(parent) => parent.clone(),
            None => self.clone(),
        }
    }

    pub fn is_cut(&self) -> bool {
        self.inner.read().parent.is_some()
    }

    pub fn is_blank(&self) -> bool {
        self.inner.read().blank
    }

    pub fn is_valid(&self) -> bool {
        let (valid, parent) = {
            let state = self.inner.read();
            (state.valid, state.parent.clone())
        };
        valid && parent.map_or(true, |p| p.is_valid())
    }

    /// Whether both handles point at the same producer.
    pub fn same_as(&self, other: &Producer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn get_in(&self) -> i64 {
        self.inner.read().in_point
    }

    pub fn get_out(&self) -> i64 {
        self.inner.read().out_point
    }

    /// Number of frames between in and out, inclusive.
    pub fn get_playtime(&self) -> i64 {
        let state = self.inner.read();
        state.out_point - state.in_point + 1
    }

    /// Declared length of the underlying source.
    pub fn get_length(&self) -> i64 {
        if self.is_cut() {
            self.parent().get_length()
        } else {
            self.inner.read().properties.get_int("length")
        }
    }

    /// Move the in and out points, clamped to the source length.
    /// Returns the applied range.
    pub fn set_in_and_out(&self, in_point: i64, out_point: i64) -> (i64, i64) {
        let (in_point, out_point) = clamp_range(self.get_length(), in_point, out_point);
        let mut state = self.inner.write();
        state.in_point = in_point;
        state.out_point = out_point;
        (in_point, out_point)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.read().properties.get(name).map(str::to_string)
    }

    pub fn get_int(&self, name: &str) -> i64 {
        self.inner.read().properties.get_int(name)
    }

    pub fn get_double(&self, name: &str) -> f64 {
        self.inner.read().properties.get_double(name)
    }

    pub fn set(&self, name: &str, value: impl Into<String>) {
        self.inner.write().properties.set(name, value);
    }

    pub fn set_int(&self, name: &str, value: i64) {
        self.inner.write().properties.set_int(name, value);
    }

    /// Snapshot of this producer's own properties.
    pub fn properties(&self) -> Properties {
        self.inner.read().properties.clone()
    }

    /// Value of the `id` property, empty when unset.
    pub fn id(&self) -> String {
        self.get("id").unwrap_or_default()
    }

    /// Value of the `mlt_service` property, empty when unset.
    pub fn service(&self) -> String {
        self.get("mlt_service").unwrap_or_default()
    }

    /// Value of the `resource` property, empty when unset.
    pub fn resource(&self) -> String {
        self.get("resource").unwrap_or_default()
    }

    /// Snapshot of the attached filters.
    pub fn filters(&self) -> Vec<Filter> {
        self.inner.read().filters.to_vec()
    }

    pub fn filter_count(&self) -> usize {
        self.inner.read().filters.len()
    }

    /// Attach a filter at the end of the stack.
    pub fn attach(&self, filter: Filter) {
        self.inner.write().filters.push(filter);
    }

    /// Keep only the filters matching `keep`.
    pub fn retain_filters(&self, mut keep: impl FnMut(&Filter) -> bool) {
        self.inner.write().filters.retain(|f| keep(&*f));
    }

    /// Independent parent producer with the same source and properties.
    ///
    /// Filters are not copied; cuts of the duplicate start clean.
    pub fn duplicate(&self) -> Producer {
        let source = self.parent();
        let state = source.inner.read();
        Self::from_state(ProducerState {
            properties: state.properties.clone(),
            filters: SmallVec::new(),
            parent: None,
            in_point: state.in_point,
            out_point: state.out_point,
            valid: state.valid,
            blank: state.blank,
        })
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.parent();
        f.debug_struct("Producer")
            .field("id", &source.id())
            .field("service", &source.service())
            .field("cut", &self.is_cut())
            .field("in", &self.get_in())
            .field("out", &self.get_out())
            .finish()
    }
}

fn clamp_range(length: i64, in_point: i64, out_point: i64) -> (i64, i64) {
    let last = (length - 1).max(0);
    let in_point = in_point.clamp(0, last);
    let out_point = out_point.clamp(0, last);
    if in_point > out_point {
        (out_point, in_point)
    } else {
        (in_point, out_point)
    }
}
