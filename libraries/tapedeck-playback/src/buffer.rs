//! Decoded sample buffer
//!
//! Planar f32 audio as produced by the decoder. The only mutation ever
//! applied after decode is an in-place reversal used for negative rates.

use crate::error::{PlaybackError, Result};

/// Immutable decoded audio (one `Vec<f32>` per channel)
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build a buffer from planar channel data
    ///
    /// Fails with `InvalidArgument` when there are no channels, the channel
    /// lengths differ, or the sample rate is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(PlaybackError::InvalidArgument(
                "sample rate must be positive".to_string(),
            ));
        }

        let Some(first) = channels.first() else {
            return Err(PlaybackError::InvalidArgument(
                "buffer needs at least one channel".to_string(),
            ));
        };

        let frames = first.len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != frames)
        {
            return Err(PlaybackError::InvalidArgument(format!(
                "channel {index} has {} frames, expected {frames}",
                channel.len()
            )));
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Buffer of `frames` zero samples in each of `channels` channels
    pub fn silent(channels: usize, frames: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; frames]; channels], sample_rate)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Length in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / f64::from(self.sample_rate)
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Iterate over all channels in order
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Reverse the sample order of every channel in place
    pub fn reverse(&mut self) {
        for channel in &mut self.channels {
            channel.reverse();
        }
    }
}
