//! Notifications the map view publishes to the surrounding UI layer.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Map events delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
    /// Zoom, latitude and longitude settled after a pan, zoom or resize.
    /// Overlays reposition themselves on this signal.
    Relocated { zoom: u8, lat: f64, lon: f64 },
}

/// Fan-out of [`MapEvent`]s to any number of channel subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<MapEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<MapEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends to every live subscriber and forgets the ones that hung up.
    pub fn publish(&mut self, event: MapEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
