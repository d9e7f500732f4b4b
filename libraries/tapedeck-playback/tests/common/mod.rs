//! Shared test doubles: a host graph with a hand-driven clock

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use tapedeck_playback::{
    AudioGraph, SampleBuffer, SinkId, Voice, VoiceEndNotifier, VoiceId, VoiceParams,
};

/// What a mock voice was told to do
#[derive(Debug, Clone)]
pub struct VoiceRecord {
    pub params: VoiceParams,
    pub started: Option<(f64, Option<f64>)>,
    pub stops: usize,
    pub amplitude: f32,
    pub looping: bool,
    pub buffer_head: Vec<f32>,
}

struct MockVoice {
    record: Arc<Mutex<VoiceRecord>>,
}

impl Voice for MockVoice {
    fn start(&mut self, offset: f64, duration: Option<f64>) {
        self.record.lock().started = Some((offset, duration));
    }

    fn stop(&mut self) {
        self.record.lock().stops += 1;
    }

    fn set_amplitude(&mut self, amplitude: f32) {
        self.record.lock().amplitude = amplitude;
    }

    fn set_loop(&mut self, looping: bool) {
        self.record.lock().looping = looping;
    }

    fn owns_gain(&self) -> bool {
        true
    }
}

/// Mock audio graph
///
/// The clock only moves when a test calls `advance`. End notifications are
/// held until a test fires them with `end_voice`.
#[derive(Default)]
pub struct MockGraph {
    now: Mutex<f64>,
    records: Mutex<Vec<Arc<Mutex<VoiceRecord>>>>,
    notifiers: Mutex<Vec<VoiceEndNotifier>>,
    pub connections: Mutex<Vec<String>>,
    pub panner: Mutex<(f32, f32, f32)>,
}

impl MockGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn advance(&self, seconds: f64) {
        *self.now.lock() += seconds;
    }

    /// Fire the end notification for `id`; false if it already fired
    pub fn end_voice(&self, id: VoiceId) -> bool {
        let notifier = {
            let mut notifiers = self.notifiers.lock();
            notifiers
                .iter()
                .position(|n| n.voice_id() == id)
                .map(|index| notifiers.remove(index))
        };
        match notifier {
            Some(notifier) => {
                notifier.notify();
                true
            }
            None => false,
        }
    }

    /// Take every pending notifier (to fire from another thread)
    pub fn take_notifiers(&self) -> Vec<VoiceEndNotifier> {
        std::mem::take(&mut *self.notifiers.lock())
    }

    pub fn record(&self, id: VoiceId) -> VoiceRecord {
        self.records
            .lock()
            .iter()
            .map(|record| record.lock().clone())
            .find(|record| record.params.id == id)
            .expect("voice was never created")
    }

    pub fn created(&self) -> usize {
        self.records.lock().len()
    }

    /// Voices created but never stopped
    pub fn sounding(&self) -> Vec<VoiceId> {
        self.records
            .lock()
            .iter()
            .map(|record| record.lock().clone())
            .filter(|record| record.stops == 0)
            .map(|record| record.params.id)
            .collect()
    }
}

impl AudioGraph for MockGraph {
    fn current_time(&self) -> f64 {
        *self.now.lock()
    }

    fn create_voice(
        &self,
        buffer: Arc<SampleBuffer>,
        params: VoiceParams,
        on_ended: VoiceEndNotifier,
    ) -> Box<dyn Voice> {
        let head = buffer
            .channel(0)
            .map(|samples| samples.iter().take(4).copied().collect())
            .unwrap_or_default();
        let record = Arc::new(Mutex::new(VoiceRecord {
            params,
            started: None,
            stops: 0,
            amplitude: 1.0,
            looping: params.looping,
            buffer_head: head,
        }));
        self.records.lock().push(Arc::clone(&record));
        self.notifiers.lock().push(on_ended);
        Box::new(MockVoice { record })
    }

    fn connect(&self, sink: Option<&SinkId>) {
        let name = sink.map_or("master", |sink| sink.0.as_str());
        self.connections.lock().push(format!("+{name}"));
    }

    fn disconnect(&self, sink: Option<&SinkId>) {
        let name = sink.map_or("*", |sink| sink.0.as_str());
        self.connections.lock().push(format!("-{name}"));
    }

    fn set_panner_position(&self, x: f32, y: f32, z: f32) {
        *self.panner.lock() = (x, y, z);
    }

    fn cancel_gain_ramps(&self, _at: f64) {}

    fn set_gain_at(&self, _value: f32, _at: f64) {}

    fn linear_ramp_gain_to(&self, _value: f32, _at: f64) {}
}

/// Ramp from 0.0 to 1.0 over `frames` frames, mono
pub fn ramp_buffer(frames: usize, sample_rate: u32) -> SampleBuffer {
    let samples = (0..frames).map(|i| i as f32 / frames as f32).collect();
    SampleBuffer::new(vec![samples], sample_rate).unwrap()
}

/// Silent stereo buffer lasting `seconds` at 100 Hz
pub fn seconds_buffer(seconds: usize) -> SampleBuffer {
    SampleBuffer::silent(2, seconds * 100, 100).unwrap()
}
