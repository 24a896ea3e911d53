//! Playback Events
//!
//! Event-based communication for UI synchronization during playback.
//! Events are emitted at key points:
//! - State changes (load, play, pause, end, failure)
//! - Position updates (seek and every sampling tick)
//! - Volume changes (user and fade steps)
//! - Fade lifecycle

use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Beyond this many undrained entries the oldest droppable event goes
const MAX_PENDING_EVENTS: usize = 256;

/// Events emitted by a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Session state changed
    StateChanged {
        /// The new state
        state: PlaybackState,
    },

    /// Position update (seek or sampling tick)
    PositionUpdate {
        /// Current position in seconds
        position: f64,
        /// Track duration in seconds
        duration: f64,
    },

    /// Volume or mute changed
    VolumeChanged {
        /// New level (0.0-1.0)
        level: f32,
        /// Whether audio is muted
        is_muted: bool,
    },

    /// Fade-in started after autoplay
    FadeStarted {
        /// Level the ramp ends at
        target: f32,
        /// Number of ramp steps
        steps: u32,
    },

    /// Fade-in reached its target
    FadeCompleted,

    /// Fade-in was cut short (pause, manual volume, dispose)
    FadeCancelled,

    /// Track reached its natural end
    TrackEnded {
        /// Whether the engine restarted the track
        looped: bool,
    },

    /// Error occurred
    Error {
        /// Error message
        message: String,
        /// Whether the session is now `Failed`
        fatal: bool,
    },
}

impl PlaybackEvent {
    /// State changes and errors are never evicted ahead of other events
    fn is_durable(&self) -> bool {
        matches!(self, Self::StateChanged { .. } | Self::Error { .. })
    }
}

/// Bounded queue of undrained events
///
/// Holds at most one position update: a newer one replaces the pending one.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    pending: VecDeque<PlaybackEvent>,
}

impl EventQueue {
    pub(crate) fn push(&mut self, event: PlaybackEvent) {
        if matches!(event, PlaybackEvent::PositionUpdate { .. }) {
            self.pending
                .retain(|e| !matches!(e, PlaybackEvent::PositionUpdate { .. }));
        }

        if self.pending.len() >= MAX_PENDING_EVENTS {
            let victim = self
                .pending
                .iter()
                .position(|e| !e.is_durable())
                .unwrap_or(0);
            self.pending.remove(victim);
        }
        self.pending.push_back(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<PlaybackEvent> {
        self.pending.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_events_in_order() {
        let mut queue = EventQueue::default();
        queue.push(PlaybackEvent::StateChanged {
            state: PlaybackState::Loading,
        });
        queue.push(PlaybackEvent::StateChanged {
            state: PlaybackState::Ready,
        });

        let events = queue.drain();
        assert_eq!(
            events,
            vec![
                PlaybackEvent::StateChanged {
                    state: PlaybackState::Loading
                },
                PlaybackEvent::StateChanged {
                    state: PlaybackState::Ready
                },
            ]
        );
        assert_eq!(queue.len(), 0);
    }

    fn volume(level: f32) -> PlaybackEvent {
        PlaybackEvent::VolumeChanged {
            level,
            is_muted: false,
        }
    }

    #[test]
    fn position_updates_coalesce() {
        let mut queue = EventQueue::default();
        queue.push(PlaybackEvent::StateChanged {
            state: PlaybackState::Playing,
        });
        for i in 0..1000 {
            queue.push(PlaybackEvent::PositionUpdate {
                position: f64::from(i) * 0.016,
                duration: 120.0,
            });
        }
        queue.push(PlaybackEvent::StateChanged {
            state: PlaybackState::Paused,
        });

        let events = queue.drain();
        assert_eq!(
            events,
            vec![
                PlaybackEvent::StateChanged {
                    state: PlaybackState::Playing
                },
                PlaybackEvent::PositionUpdate {
                    position: 999.0 * 0.016,
                    duration: 120.0
                },
                PlaybackEvent::StateChanged {
                    state: PlaybackState::Paused
                },
            ]
        );
    }

    #[test]
    fn queue_drops_oldest_when_full() {
        let mut queue = EventQueue::default();
        for i in 0..(MAX_PENDING_EVENTS + 10) {
            queue.push(volume(i as f32));
        }

        let events = queue.drain();
        assert_eq!(events.len(), MAX_PENDING_EVENTS);
        assert_eq!(events[0], volume(10.0));
    }

    #[test]
    fn overflow_keeps_state_changes_and_errors() {
        let mut queue = EventQueue::default();
        queue.push(PlaybackEvent::StateChanged {
            state: PlaybackState::Playing,
        });
        queue.push(PlaybackEvent::Error {
            message: "autoplay blocked".to_string(),
            fatal: false,
        });
        for i in 0..(MAX_PENDING_EVENTS * 2) {
            queue.push(volume(i as f32));
        }

        let events = queue.drain();
        assert_eq!(events.len(), MAX_PENDING_EVENTS);
        assert_eq!(
            events[0],
            PlaybackEvent::StateChanged {
                state: PlaybackState::Playing
            }
        );
        assert!(matches!(events[1], PlaybackEvent::Error { fatal: false, .. }));
        assert_eq!(
            *events.last().unwrap(),
            volume((MAX_PENDING_EVENTS * 2 - 1) as f32)
        );
    }
}
