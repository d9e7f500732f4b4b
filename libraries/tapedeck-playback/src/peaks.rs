//! Waveform peak extraction
//!
//! Produces one amplitude value per display column. Each window is sampled
//! with a stride of a tenth of its width rather than read in full, which
//! keeps extraction fast on long buffers at the cost of occasionally missing
//! a narrow transient.

use crate::buffer::SampleBuffer;
use crate::error::{PlaybackError, Result};

/// Fraction of each window actually read (1 sample in `STRIDE_DIVISOR`)
const STRIDE_DIVISOR: f64 = 10.0;

/// Downsample `buffer` into `resolution` peak magnitudes
///
/// Window `i` spans `floor(i * size)..floor(floor(i * size) + size)` with
/// `size = frames / resolution`. Every channel is scanned; the first channel
/// seeds each peak and later channels can only raise it.
pub fn extract_peaks(buffer: &SampleBuffer, resolution: usize) -> Result<Vec<f32>> {
    if resolution == 0 {
        return Err(PlaybackError::InvalidArgument(
            "peak resolution must be positive".to_string(),
        ));
    }

    let frames = buffer.frame_count();
    let window_size = frames as f64 / resolution as f64;
    let step = stride(window_size);
    let mut peaks = vec![0.0f32; resolution];

    for (channel_index, samples) in buffer.channels().enumerate() {
        for (i, peak) in peaks.iter_mut().enumerate() {
            let start = (i as f64 * window_size) as usize;
            let end = ((start as f64 + window_size) as usize).min(frames);

            let max = samples
                .get(start..end)
                .unwrap_or_default()
                .iter()
                .step_by(step)
                .fold(0.0f32, |max, sample| max.max(sample.abs()));

            if channel_index == 0 || max > *peak {
                *peak = max;
            }
        }
    }

    Ok(peaks)
}

/// Sampling stride for a window of `window_size` frames (at least 1)
pub fn stride(window_size: f64) -> usize {
    ((window_size / STRIDE_DIVISOR) as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_resolution_is_rejected() {
        let buffer = SampleBuffer::silent(1, 100, 100).unwrap();
        assert!(matches!(
            extract_peaks(&buffer, 0),
            Err(PlaybackError::InvalidArgument(_))
        ));
    }

    #[test]
    fn silent_buffer_has_zero_peaks() {
        let buffer = SampleBuffer::silent(2, 4410, 44100).unwrap();
        let peaks = extract_peaks(&buffer, 64).unwrap();
        assert_eq!(peaks.len(), 64);
        assert!(peaks.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn stride_is_a_tenth_of_the_window() {
        assert_eq!(stride(0.5), 1);
        assert_eq!(stride(9.9), 1);
        assert_eq!(stride(25.0), 2);
        assert_eq!(stride(441.0), 44);
    }

    #[test]
    fn single_impulse_found_with_unit_stride() {
        let mut samples = vec![0.0f32; 16];
        samples[5] = 1.0;
        let buffer = SampleBuffer::new(vec![samples], 16).unwrap();

        let peaks = extract_peaks(&buffer, 8).unwrap();
        assert_eq!(peaks.len(), 8);
        assert_eq!(peaks[2], 1.0);
        assert_eq!(peaks.iter().filter(|&&p| p > 0.0).count(), 1);
    }

    #[test]
    fn impulse_on_stride_boundary_is_found() {
        // 400 frames over 4 windows: size 100, stride 10
        let mut samples = vec![0.0f32; 400];
        samples[230] = 1.0;
        let buffer = SampleBuffer::new(vec![samples], 400).unwrap();

        let peaks = extract_peaks(&buffer, 4).unwrap();
        assert_eq!(peaks, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn negative_samples_report_magnitude() {
        let buffer = SampleBuffer::new(vec![vec![-0.75, 0.25, 0.0, -0.5]], 4).unwrap();
        let peaks = extract_peaks(&buffer, 2).unwrap();
        assert_eq!(peaks, vec![0.75, 0.5]);
    }

    #[test]
    fn later_channels_only_raise_peaks() {
        let buffer = SampleBuffer::new(
            vec![vec![0.5, 0.0, 0.1, 0.0], vec![0.2, 0.0, 0.9, 0.0]],
            4,
        )
        .unwrap();
        let peaks = extract_peaks(&buffer, 2).unwrap();
        assert_eq!(peaks, vec![0.5, 0.9]);
    }

    #[test]
    fn more_columns_than_frames() {
        let buffer = SampleBuffer::new(vec![vec![0.3, 0.6]], 2).unwrap();
        let peaks = extract_peaks(&buffer, 5).unwrap();
        assert_eq!(peaks.len(), 5);
        assert!(peaks.iter().all(|&p| p >= 0.0));
    }
}
