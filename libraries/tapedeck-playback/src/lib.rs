//! Tapedeck - Transport Control
//!
//! Platform-agnostic playback control for a single decoded audio asset.
//!
//! This crate provides:
//! - Play / pause (toggle) / stop / loop over a playback window
//! - Signed playback rate, reversing the stored buffer for negative rates
//! - Sustain or restart re-trigger policy over overlapping voices
//! - Clock-anchored playhead position (no hardware polling)
//! - Waveform peak extraction
//! - Equal-power pan and scheduled output gain ramps
//!
//! # Architecture
//!
//! `tapedeck-playback` never touches audio hardware:
//! - Voices, the clock, gain and panning come from an [`AudioGraph`]
//! - Decoding is done by a [`SampleDecoder`]
//! - Engine-wide bookkeeping is an optional [`InstanceRegistry`]
//!
//! Voices report their natural end through a [`VoiceEndNotifier`]. The
//! notification is a message, so the host's audio thread never waits on the
//! player's lock.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tapedeck_playback::{AudioGraph, PlayOptions, Player, PlayerConfig, SampleBuffer};
//!
//! fn preview(graph: Arc<dyn AudioGraph>) -> tapedeck_playback::Result<()> {
//!     let player = Player::new(graph, PlayerConfig::default())?;
//!     player.attach_buffer(SampleBuffer::silent(2, 44100 * 4, 44100)?);
//!
//!     // Loop seconds 1..3 at double speed, half amplitude
//!     player.loop_play(PlayOptions::new().rate(2.0).amplitude(0.5).start(1.0).end(3.0))?;
//!
//!     // Pause, then resume from the same spot
//!     player.pause()?;
//!     player.pause()?;
//!
//!     // Play backwards
//!     player.set_rate(-1.0)?;
//!
//!     let peaks = player.get_peaks(Some(800))?;
//!     assert_eq!(peaks.len(), 800);
//!     Ok(())
//! }
//! ```

mod buffer;
mod error;
pub mod events;
mod graph;
mod peaks;
mod player;
pub mod timeline;
mod transport;
pub mod types;
mod voice;
mod volume;

// Public exports
pub use buffer::SampleBuffer;
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use graph::{
    AudioGraph, DecodeCompletion, InstanceRegistry, SampleDecoder, Voice, VoiceEndNotifier,
    VoiceParams,
};
pub use peaks::extract_peaks;
pub use player::{equal_power_position, Player};
pub use transport::{PlayOptions, Transport};
pub use types::{PlayMode, PlaybackState, PlaybackWindow, PlayerConfig, PlayerId, SinkId, VoiceId};
pub use voice::{VoiceHandle, VoiceRegistry};
pub use volume::{GainRamp, OutputVolume};
