//! Notifications emitted by a track.
//!
//! Events are delivered after the playlist lock is released, so handlers may
//! query the track that emitted them.

use crossbeam_channel::{Receiver, Sender};
use cutlist_playlist::Producer;

/// Something a track wants its owner to know about.
#[derive(Debug, Clone)]
pub enum TrackEvent {
    /// The track playtime changed; carries the new playtime in frames.
    DurationChanged(i64),
    /// A slow-motion producer was synthesised for `url` and should be kept
    /// in the project-wide pool.
    SlowMotionCreated { url: String, producer: Producer },
}

/// Receives track notifications.
pub trait TrackEvents: Send + Sync {
    fn duration_changed(&self, _playtime: i64) {}

    fn slowmotion_created(&self, _url: &str, _producer: &Producer) {}
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl TrackEvents for NoEvents {}

/// Forwards notifications over a channel.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    sender: Sender<TrackEvent>,
}

impl ChannelEvents {
    pub fn new(sender: Sender<TrackEvent>) -> Self {
        Self { sender }
    }

    /// Unbounded channel pair.
    pub fn unbounded() -> (Self, Receiver<TrackEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }

    fn send(&self, event: TrackEvent) {
        // A dropped receiver means nobody listens any more.
        let _ = self.sender.send(event);
    }
}

impl TrackEvents for ChannelEvents {
    fn duration_changed(&self, playtime: i64) {
        self.send(TrackEvent::DurationChanged(playtime));
    }

    fn slowmotion_created(&self, url: &str, producer: &Producer) {
        self.send(TrackEvent::SlowMotionCreated {
            url: url.to_string(),
            producer: producer.clone(),
        });
    }
}
