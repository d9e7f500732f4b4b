//! Platform-agnostic seams to the audio host
//!
//! The transport never talks to hardware directly. The host provides an
//! [`AudioGraph`] (clock, voice factory, output gain and panner), voices that
//! report their own end through a [`VoiceEndNotifier`], and optionally a
//! [`SampleDecoder`] and an [`InstanceRegistry`].

use crate::buffer::SampleBuffer;
use crate::error::Result;
use crate::types::{PlaybackWindow, PlayerId, SinkId, VoiceId};
use crossbeam_channel::Sender;
use std::sync::Arc;

/// Parameters a new voice is created with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// Identifier the transport tracks the voice under
    pub id: VoiceId,

    /// Region played, and loop bounds when looping
    pub window: PlaybackWindow,

    /// Playback rate magnitude (never negative)
    pub rate: f64,

    /// Whether the voice loops over `window`
    pub looping: bool,
}

/// One hardware playback instance
///
/// Implementations either own a dedicated gain stage or scale the voice
/// itself; either way the transport only sees `set_amplitude`.
pub trait Voice: Send {
    /// Begin rendering at `offset` seconds, for `duration` seconds if given
    fn start(&mut self, offset: f64, duration: Option<f64>);

    /// Stop rendering immediately
    fn stop(&mut self);

    /// Linear amplitude applied to this voice only
    fn set_amplitude(&mut self, amplitude: f32);

    /// Change the loop flag without restarting
    fn set_loop(&mut self, looping: bool);

    /// Whether the voice has its own gain node
    fn owns_gain(&self) -> bool {
        false
    }
}

/// The host audio graph
///
/// `current_time` must share a clock domain with the voices so that anchors
/// recorded by the transport compare correctly against later readings.
pub trait AudioGraph: Send + Sync {
    /// Monotonic clock, in seconds
    fn current_time(&self) -> f64;

    /// Create a voice over `buffer`; it must call `on_ended.notify()` once
    /// playback ends naturally
    fn create_voice(
        &self,
        buffer: Arc<SampleBuffer>,
        params: VoiceParams,
        on_ended: VoiceEndNotifier,
    ) -> Box<dyn Voice>;

    /// Route the player output to `sink`, or to the master output
    fn connect(&self, sink: Option<&SinkId>);

    /// Disconnect the player output from `sink`, or from everything
    fn disconnect(&self, sink: Option<&SinkId>);

    /// Position the output panner
    fn set_panner_position(&self, x: f32, y: f32, z: f32);

    /// Drop output gain automation scheduled at or after `at`
    fn cancel_gain_ramps(&self, at: f64);

    /// Set the output gain to `value` at clock time `at`
    fn set_gain_at(&self, value: f32, at: f64);

    /// Ramp the output gain linearly to `value`, arriving at clock time `at`
    fn linear_ramp_gain_to(&self, value: f32, at: f64);
}

/// One-shot handle a voice uses to report that playback ended
///
/// `notify` consumes the handle, so a voice can report at most once. Sending
/// never blocks; if the transport is gone the message is dropped.
#[derive(Debug)]
pub struct VoiceEndNotifier {
    id: VoiceId,
    tx: Sender<VoiceId>,
}

impl VoiceEndNotifier {
    pub(crate) fn new(id: VoiceId, tx: Sender<VoiceId>) -> Self {
        Self { id, tx }
    }

    /// Voice this notifier reports for
    pub fn voice_id(&self) -> VoiceId {
        self.id
    }

    /// Report that the voice has ended
    pub fn notify(self) {
        if self.tx.send(self.id).is_err() {
            tracing::trace!(voice = %self.id, "Voice ended after transport was dropped");
        }
    }
}

/// One-shot completion for an asynchronous decode
#[derive(Debug)]
pub struct DecodeCompletion {
    tx: Sender<Result<SampleBuffer>>,
}

impl DecodeCompletion {
    pub(crate) fn new(tx: Sender<Result<SampleBuffer>>) -> Self {
        Self { tx }
    }

    /// Deliver the decode outcome
    pub fn complete(self, result: Result<SampleBuffer>) {
        if self.tx.send(result).is_err() {
            tracing::warn!("Decode finished after the player stopped waiting for it");
        }
    }
}

/// Turns encoded bytes into a [`SampleBuffer`]
///
/// Decoding may happen on any thread; the outcome is delivered exactly once
/// through the completion.
pub trait SampleDecoder: Send + Sync {
    fn decode(&self, bytes: Vec<u8>, completion: DecodeCompletion);
}

/// Engine-wide bookkeeping of live players
pub trait InstanceRegistry: Send + Sync {
    fn register(&self, id: PlayerId);
    fn deregister(&self, id: PlayerId);
}


/// In-memory graph for unit tests
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Everything a fake voice was asked to do
    #[derive(Debug, Clone)]
    pub struct VoiceLog {
        pub params: VoiceParams,
        pub started: Option<(f64, Option<f64>)>,
        pub stops: usize,
        pub amplitude: f32,
        pub looping: bool,
    }

    struct FakeVoice {
        log: Arc<Mutex<VoiceLog>>,
    }

    impl Voice for FakeVoice {
        fn start(&mut self, offset: f64, duration: Option<f64>) {
            self.log.lock().started = Some((offset, duration));
        }

        fn stop(&mut self) {
            self.log.lock().stops += 1;
        }

        fn set_amplitude(&mut self, amplitude: f32) {
            self.log.lock().amplitude = amplitude;
        }

        fn set_loop(&mut self, looping: bool) {
            self.log.lock().looping = looping;
        }
    }

    #[derive(Default)]
    pub struct FakeGraph {
        now: Mutex<f64>,
        voices: Mutex<Vec<Arc<Mutex<VoiceLog>>>>,
        notifiers: Mutex<Vec<VoiceEndNotifier>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeGraph {
        pub fn advance(&self, seconds: f64) {
            *self.now.lock() += seconds;
        }

        /// Fire the end notification of voice `id`, if it has not fired yet
        pub fn end_voice(&self, id: VoiceId) -> bool {
            let mut notifiers = self.notifiers.lock();
            match notifiers.iter().position(|n| n.voice_id() == id) {
                Some(index) => {
                    notifiers.remove(index).notify();
                    true
                }
                None => false,
            }
        }

        pub fn log(&self, id: VoiceId) -> VoiceLog {
            self.voices
                .lock()
                .iter()
                .map(|log| log.lock().clone())
                .find(|log| log.params.id == id)
                .expect("voice was never created")
        }

        pub fn created(&self) -> usize {
            self.voices.lock().len()
        }
    }

    impl AudioGraph for FakeGraph {
        fn current_time(&self) -> f64 {
            *self.now.lock()
        }

        fn create_voice(
            &self,
            _buffer: Arc<SampleBuffer>,
            params: VoiceParams,
            on_ended: VoiceEndNotifier,
        ) -> Box<dyn Voice> {
            let log = Arc::new(Mutex::new(VoiceLog {
                params,
                started: None,
                stops: 0,
                amplitude: 1.0,
                looping: params.looping,
            }));
            self.voices.lock().push(Arc::clone(&log));
            self.notifiers.lock().push(on_ended);
            Box::new(FakeVoice { log })
        }

        fn connect(&self, sink: Option<&SinkId>) {
            self.calls.lock().push(format!("connect {sink:?}"));
        }

        fn disconnect(&self, sink: Option<&SinkId>) {
            self.calls.lock().push(format!("disconnect {sink:?}"));
        }

        fn set_panner_position(&self, x: f32, y: f32, z: f32) {
            self.calls.lock().push(format!("pan {x:.3} {y:.3} {z:.3}"));
        }

        fn cancel_gain_ramps(&self, at: f64) {
            self.calls.lock().push(format!("cancel {at}"));
        }

        fn set_gain_at(&self, value: f32, at: f64) {
            self.calls.lock().push(format!("set {value} @ {at}"));
        }

        fn linear_ramp_gain_to(&self, value: f32, at: f64) {
            self.calls.lock().push(format!("ramp {value} @ {at}"));
        }
    }
}
