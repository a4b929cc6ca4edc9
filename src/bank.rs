// Track stack for one event
//
// Holds the primary and every secondary still waiting to be stepped. Track
// ids are handed out here so they stay unique within the event.

use crate::particle_change::Secondary;
use crate::track::Track;
use std::collections::VecDeque;

/// FIFO queue of tracks to be transported during a single event.
pub struct TrackStack {
    queue: VecDeque<Track>,
    /// Id given to the next secondary
    next_track_id: u32,
}

impl TrackStack {
    pub fn new() -> Self {
        TrackStack {
            queue: VecDeque::new(),
            next_track_id: 1,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TrackStack {
            queue: VecDeque::with_capacity(capacity),
            next_track_id: 1,
        }
    }

    /// Push the primary of a new event, resetting track numbering.
    ///
    /// The primary always gets track id 1 and parent id 0.
    pub fn push_primary(&mut self, track: Track) {
        self.queue.clear();
        self.queue.push_back(track.with_ids(1, 0));
        self.next_track_id = 2;
    }

    /// Queue a secondary produced by `parent` and return its track id.
    pub fn push_secondary(&mut self, secondary: &Secondary, parent: &Track) -> u32 {
        let id = self.next_track_id;
        self.next_track_id += 1;
        self.queue.push_back(secondary.to_track(id, parent));
        id
    }

    /// Next track to transport, `None` once the event is done.
    pub fn pop(&mut self) -> Option<Track> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Number of tracks created in this event, primary included
    pub fn tracks_created(&self) -> u32 {
        self.next_track_id - 1
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.next_track_id = 1;
    }
}

impl Default for TrackStack {
    fn default() -> Self {
        Self::new()
    }
}
