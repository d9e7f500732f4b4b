//! Core types for transport control

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Re-trigger policy while a voice is already sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// New voices overlap the ones already playing
    #[default]
    Sustain,

    /// The active voice is stopped before a new one starts
    Restart,
}

impl FromStr for PlayMode {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sustain" => Ok(Self::Sustain),
            "restart" => Ok(Self::Restart),
            other => Err(PlaybackError::InvalidArgument(format!(
                "play mode must be 'sustain' or 'restart', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sustain => f.write_str("sustain"),
            Self::Restart => f.write_str("restart"),
        }
    }
}

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing started yet, or stopped
    Idle,

    /// At least the active voice is sounding
    Playing,

    /// Stopped mid-buffer with a resumable position
    Paused,
}

/// Sub-range of the buffer that voices play or loop over (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackWindow {
    /// Window start
    pub start: f64,

    /// Window end
    pub end: f64,
}

impl PlaybackWindow {
    /// Window covering a whole buffer of `duration` seconds
    pub fn full(duration: f64) -> Self {
        Self {
            start: 0.0,
            end: duration,
        }
    }

    /// Window length in seconds
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

impl Default for PlaybackWindow {
    fn default() -> Self {
        Self::full(0.0)
    }
}

/// Identifier of one hardware voice, unique per transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Identifier a player uses with an instance registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub uuid::Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Named destination in the audio graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkId(pub String);

impl From<&str> for SinkId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Configuration for a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Initial re-trigger policy (default: Sustain)
    pub mode: PlayMode,

    /// Initial loop flag (default: false)
    pub looping: bool,

    /// Initial signed playback rate (default: 1.0)
    pub playback_rate: f64,

    /// Initial output gain, linear (default: 1.0)
    pub volume: f32,

    /// Initial pan, -1.0..=1.0 (default: 0.0)
    pub pan: f32,

    /// Peak count used when `get_peaks` gets no resolution,
    /// usually the width of the waveform view (default: 1024)
    pub default_peak_resolution: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mode: PlayMode::Sustain,
            looping: false,
            playback_rate: 1.0,
            volume: 1.0,
            pan: 0.0,
            default_peak_resolution: 1024,
        }
    }
}

impl PlayerConfig {
    /// Reject values the transport or the output stage cannot use
    pub fn validate(&self) -> Result<()> {
        if !self.playback_rate.is_finite() {
            return Err(PlaybackError::InvalidArgument(format!(
                "playback rate must be finite, got {}",
                self.playback_rate
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "volume must be a non-negative number, got {}",
                self.volume
            )));
        }
        if !(-1.0..=1.0).contains(&self.pan) {
            return Err(PlaybackError::InvalidArgument(format!(
                "pan must be within -1.0..=1.0, got {}",
                self.pan
            )));
        }
        if self.default_peak_resolution == 0 {
            return Err(PlaybackError::InvalidArgument(
                "default peak resolution must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
