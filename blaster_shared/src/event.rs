//! Session events and the ordered queue they travel through.
//!
//! The synchronization layer delivers one totally ordered stream of
//! `SessionEvent`s to every replica. The queue only preserves that order;
//! it never reorders, deduplicates, or drops.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Identifies a participant (one view/client).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-player input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    LeftThruster(bool),
    RightThruster(bool),
    ForwardThruster(bool),
    FireBlaster,
    SetInitials(String),
}

/// Everything that can change a world between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    PlayerJoined(PlayerId),
    PlayerLeft(PlayerId),
    Input { player: PlayerId, input: InputEvent },
}

impl SessionEvent {
    pub fn input(player: PlayerId, input: InputEvent) -> Self {
        SessionEvent::Input { player, input }
    }
}

/// FIFO of events waiting for the next tick.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: VecDeque<SessionEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&mut self, e: SessionEvent) {
        self.queue.push_back(e);
    }

    /// Removes and returns every queued event in arrival order.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_arrival_order() {
        let mut q = EventQueue::new();
        q.push(SessionEvent::PlayerJoined(PlayerId(2)));
        q.push(SessionEvent::input(PlayerId(2), InputEvent::FireBlaster));
        q.push(SessionEvent::PlayerLeft(PlayerId(2)));
        let drained = q.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0], SessionEvent::PlayerJoined(PlayerId(2)));
        assert_eq!(drained[2], SessionEvent::PlayerLeft(PlayerId(2)));
        assert!(q.is_empty());
    }
}
