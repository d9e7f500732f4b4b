//! Playhead computation
//!
//! Position is never polled from hardware. When a voice starts the transport
//! records an [`Anchor`] (clock reading plus the playhead it started from);
//! the current position is derived from elapsed clock time, the rate the
//! voice runs at, and a wrap at the buffer duration.

use crate::error::{PlaybackError, Result};
use crate::types::{PlaybackState, PlaybackWindow};

/// Which playhead a voice was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorOrigin {
    /// Started at the window start
    Fresh,

    /// Resumed at the captured pause position
    Resumed,
}

/// Clock/playhead pair recorded when the active voice started
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Graph clock reading at start
    pub wall_clock: f64,

    /// Playhead the voice started at: the window start for a fresh start,
    /// the pause position for a resume
    pub playhead: f64,

    /// Rate magnitude the voice runs at
    pub rate: f64,

    pub origin: AnchorOrigin,
}

/// Everything needed to answer "where is the playhead"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    pub state: PlaybackState,
    pub window: PlaybackWindow,
    pub pause_time: f64,
    pub anchor: Option<Anchor>,
    pub duration: f64,
}

impl Timeline {
    /// Playhead position in seconds at clock time `now`
    ///
    /// - idle: the configured window start
    /// - paused: the captured pause position, exactly
    /// - playing: anchor playhead advanced by elapsed time at the anchor
    ///   rate, wrapped at the buffer duration
    pub fn position_at(&self, now: f64) -> f64 {
        match (self.state, self.anchor) {
            (PlaybackState::Paused, _) => self.pause_time,
            (PlaybackState::Playing, Some(anchor)) => {
                let elapsed = (now - anchor.wall_clock).max(0.0);
                wrap(anchor.playhead + elapsed * anchor.rate, self.duration)
            }
            (PlaybackState::Idle | PlaybackState::Playing, _) => self.window.start,
        }
    }
}

/// Wrap `position` into `[0, duration)`; a zero duration pins it to 0
pub fn wrap(position: f64, duration: f64) -> f64 {
    if duration <= 0.0 || !position.is_finite() {
        return 0.0;
    }
    position.rem_euclid(duration)
}

/// Resolve the window `play` should use
///
/// An absent `start` keeps the current window start; an absent `end` means
/// the whole remaining buffer. The resolved start must lie in
/// `[0, duration)`, `end` in `[0, duration]`, and the result must not end
/// before it starts.
pub fn resolve_play_window(
    current: PlaybackWindow,
    start: Option<f64>,
    end: Option<f64>,
    duration: f64,
) -> Result<PlaybackWindow> {
    let start = start.unwrap_or(current.start);
    if !(0.0..duration).contains(&start) {
        return Err(PlaybackError::range("start time", start, 0.0, duration));
    }
    if let Some(end) = end {
        if !(0.0..=duration).contains(&end) {
            return Err(PlaybackError::range("end time", end, 0.0, duration));
        }
    }

    let end = end.unwrap_or(duration);
    if end < start {
        return Err(PlaybackError::range("end time", end, start, duration));
    }

    Ok(PlaybackWindow { start, end })
}

/// Resolve the window for a seek to `cue`
///
/// `cue` must lie in `[0, duration]` and `end`, when given, in
/// `[cue, duration]`.
pub fn resolve_jump_window(cue: f64, end: Option<f64>, duration: f64) -> Result<PlaybackWindow> {
    if !(0.0..=duration).contains(&cue) {
        return Err(PlaybackError::range("cue time", cue, 0.0, duration));
    }

    let end = match end {
        Some(end) if !(cue..=duration).contains(&end) => {
            return Err(PlaybackError::range("end time", end, cue, duration));
        }
        Some(end) => end,
        None => duration,
    };

    Ok(PlaybackWindow { start: cue, end })
}
