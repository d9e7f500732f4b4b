//! Output gain with scheduled linear ramps
//!
//! The gain itself lives on the host graph. This keeps the bookkeeping needed
//! to hand it consistent automation: the target level and the ramp currently
//! scheduled, so a new ramp can start from wherever the old one had reached.

use crate::error::{PlaybackError, Result};

/// A linear gain change scheduled on the graph clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRamp {
    /// Gain held until `start_at`
    pub from: f32,

    /// Gain reached at `end_at`
    pub to: f32,

    /// Clock time the ramp begins
    pub start_at: f64,

    /// Clock time the ramp completes
    pub end_at: f64,
}

impl GainRamp {
    /// Gain the ramp produces at clock time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        if t <= self.start_at {
            return self.from;
        }
        if t >= self.end_at {
            return self.to;
        }
        let progress = ((t - self.start_at) / (self.end_at - self.start_at)) as f32;
        self.from + (self.to - self.from) * progress
    }
}

/// Linear output gain controller
#[derive(Debug, Clone)]
pub struct OutputVolume {
    /// Target gain (where the latest ramp ends)
    level: f32,

    /// Most recently scheduled ramp
    ramp: Option<GainRamp>,
}

impl OutputVolume {
    /// Create a controller sitting at `level`
    pub fn new(level: f32) -> Self {
        Self {
            level: level.max(0.0),
            ramp: None,
        }
    }

    /// Target gain
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Gain in effect at clock time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        self.ramp.map_or(self.level, |ramp| ramp.value_at(t))
    }

    /// Replace any pending automation with a ramp to `level`
    ///
    /// The ramp starts `delay` seconds after `now` from the gain in effect at
    /// `now` and lasts `ramp` seconds.
    pub fn schedule(&mut self, level: f32, ramp: f64, delay: f64, now: f64) -> Result<GainRamp> {
        if !level.is_finite() || level < 0.0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "volume must be a non-negative number, got {level}"
            )));
        }
        if !ramp.is_finite() || ramp < 0.0 || !delay.is_finite() || delay < 0.0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "ramp and delay must be non-negative, got ramp {ramp}s delay {delay}s"
            )));
        }

        let start_at = now + delay;
        let scheduled = GainRamp {
            from: self.value_at(now),
            to: level,
            start_at,
            end_at: start_at + ramp,
        };

        self.level = level;
        self.ramp = Some(scheduled);
        Ok(scheduled)
    }
}

impl Default for OutputVolume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_volume() {
        let vol = OutputVolume::new(0.8);
        assert_eq!(vol.level(), 0.8);
        assert_eq!(vol.value_at(123.0), 0.8);
    }

    #[test]
    fn ramp_interpolates_linearly() {
        let mut vol = OutputVolume::new(1.0);
        let ramp = vol.schedule(0.0, 2.0, 0.0, 10.0).unwrap();

        assert_eq!(ramp.from, 1.0);
        assert_eq!(vol.value_at(10.0), 1.0);
        assert!((vol.value_at(11.0) - 0.5).abs() < 1e-6);
        assert_eq!(vol.value_at(12.0), 0.0);
        assert_eq!(vol.level(), 0.0);
    }

    #[test]
    fn delay_holds_previous_gain() {
        let mut vol = OutputVolume::new(0.2);
        vol.schedule(1.0, 1.0, 3.0, 0.0).unwrap();

        assert_eq!(vol.value_at(2.9), 0.2);
        assert!((vol.value_at(3.5) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn new_ramp_starts_where_old_one_was() {
        let mut vol = OutputVolume::new(0.0);
        vol.schedule(1.0, 4.0, 0.0, 0.0).unwrap();

        let second = vol.schedule(0.0, 1.0, 0.0, 2.0).unwrap();
        assert!((second.from - 0.5).abs() < 1e-6);
    }

    #[test]
    fn immediate_change_without_ramp() {
        let mut vol = OutputVolume::new(1.0);
        vol.schedule(0.3, 0.0, 0.0, 5.0).unwrap();
        assert_eq!(vol.value_at(5.0), 1.0);
        assert_eq!(vol.value_at(5.000_001), 0.3);
    }

    #[test]
    fn rejects_negative_arguments() {
        let mut vol = OutputVolume::default();
        assert!(vol.schedule(-0.1, 0.0, 0.0, 0.0).is_err());
        assert!(vol.schedule(0.5, -1.0, 0.0, 0.0).is_err());
        assert!(vol.schedule(0.5, 0.0, -1.0, 0.0).is_err());
        assert!(vol.schedule(f32::NAN, 0.0, 0.0, 0.0).is_err());
        assert_eq!(vol.level(), 1.0);
    }
}
