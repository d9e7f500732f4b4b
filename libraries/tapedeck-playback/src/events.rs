//! Playback Events
//!
//! Event-based communication for UI synchronization. The transport records
//! events as it changes state; the host drains them on its own schedule.

use crate::types::{PlayMode, PlaybackState, VoiceId};
use serde::{Deserialize, Serialize};

/// Events emitted by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Transport moved between idle, playing and paused
    StateChanged {
        /// The new state
        state: PlaybackState,
    },

    /// A voice started rendering
    VoiceStarted {
        id: VoiceId,
        /// Playhead the voice started at
        offset: f64,
    },

    /// A voice left the registry
    VoiceEnded {
        id: VoiceId,
        /// True when the host reported a natural end, false when stopped
        natural: bool,
    },

    /// Signed playback rate changed
    RateChanged { rate: f64 },

    /// Sample data was reversed
    BufferReversed { reversed: bool },

    /// Re-trigger policy changed
    PlayModeChanged { mode: PlayMode },

    /// A decoded buffer was attached
    BufferLoaded {
        duration: f64,
        channels: usize,
        sample_rate: u32,
    },

    /// Decoding failed; the player stays unloaded
    LoadFailed { message: String },
}

/// Pending events in emission order
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<PlaybackEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: PlaybackEvent) {
        self.pending.push(event);
    }

    /// Take every pending event
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending)
    }
}
