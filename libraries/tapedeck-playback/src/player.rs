//! Player - public surface
//!
//! Wraps a [`Transport`] behind a single mutex so commands from any thread
//! are serialized over state and voice registry together. Voice-end
//! notifications never take this lock; they queue on a channel the
//! transport drains at the start of each call.

use crate::{
    buffer::SampleBuffer,
    error::{PlaybackError, Result},
    events::PlaybackEvent,
    graph::{AudioGraph, DecodeCompletion, InstanceRegistry, SampleDecoder},
    transport::{PlayOptions, Transport},
    types::{PlayMode, PlaybackState, PlaybackWindow, PlayerConfig, PlayerId, SinkId, VoiceId},
    volume::OutputVolume,
};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

struct PlayerInner {
    transport: Transport,
    volume: OutputVolume,
    pan: f32,
    pending_load: Option<Receiver<Result<SampleBuffer>>>,
    disposed: bool,
}

/// Single-asset audio player
///
/// Thread-safe: every method takes `&self`. See [`Transport`] for the
/// playback semantics.
pub struct Player {
    id: PlayerId,
    graph: Arc<dyn AudioGraph>,
    registry: Option<Arc<dyn InstanceRegistry>>,
    default_peak_resolution: usize,
    inner: Mutex<PlayerInner>,
}

impl Player {
    /// Create a player routed to the master output
    ///
    /// Fails with `InvalidArgument` when `config` does not validate; the
    /// graph is left untouched in that case.
    pub fn new(graph: Arc<dyn AudioGraph>, config: PlayerConfig) -> Result<Self> {
        let transport = Transport::new(Arc::clone(&graph), &config)?;
        let id = PlayerId::new();

        graph.connect(None);
        let (x, z) = equal_power_position(config.pan);
        graph.set_panner_position(x, 0.0, z);
        graph.set_gain_at(config.volume, graph.current_time());

        Ok(Self {
            id,
            registry: None,
            default_peak_resolution: config.default_peak_resolution,
            inner: Mutex::new(PlayerInner {
                transport,
                volume: OutputVolume::new(config.volume),
                pan: config.pan,
                pending_load: None,
                disposed: false,
            }),
            graph,
        })
    }

    /// Create a player and register it with `registry` until disposed
    pub fn with_registry(
        graph: Arc<dyn AudioGraph>,
        config: PlayerConfig,
        registry: Arc<dyn InstanceRegistry>,
    ) -> Result<Self> {
        let mut player = Self::new(graph, config)?;
        registry.register(player.id);
        player.registry = Some(registry);
        Ok(player)
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    // ===== Loading =====

    /// Start decoding `bytes`
    ///
    /// Returns `false` without decoding when a buffer is attached, a decode
    /// is already pending, or the player was disposed. The outcome is picked
    /// up by [`poll_load`](Self::poll_load).
    pub fn load(&self, bytes: Vec<u8>, decoder: &dyn SampleDecoder) -> bool {
        let (tx, rx) = bounded(1);
        {
            let mut inner = self.inner.lock();
            if inner.disposed || inner.transport.is_loaded() || inner.pending_load.is_some() {
                warn!(player = %self.id, "Load ignored");
                return false;
            }
            inner.pending_load = Some(rx);
        }

        // Decoder runs without the lock held so it may complete inline.
        decoder.decode(bytes, DecodeCompletion::new(tx));
        true
    }

    /// Consume the decode outcome if it has arrived
    ///
    /// `Ok(true)` once the buffer is attached, `Ok(false)` while still
    /// waiting or when nothing is pending. A failed decode leaves the player
    /// unloaded.
    pub fn poll_load(&self) -> Result<bool> {
        let mut inner = self.inner.lock();
        let Some(rx) = inner.pending_load.as_ref() else {
            return Ok(false);
        };

        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return Ok(false),
            Err(TryRecvError::Disconnected) => Err(PlaybackError::Decode(
                "decoder dropped its completion".to_string(),
            )),
        };
        inner.pending_load = None;

        match outcome {
            Ok(buffer) => Ok(inner.transport.attach_buffer(buffer)),
            Err(err) => {
                warn!(player = %self.id, error = %err, "Decode failed");
                inner.transport.record(PlaybackEvent::LoadFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Attach an already decoded buffer; no-op if one is attached
    pub fn attach_buffer(&self, buffer: SampleBuffer) -> bool {
        let mut inner = self.inner.lock();
        if inner.disposed {
            return false;
        }
        inner.transport.attach_buffer(buffer)
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().transport.is_loaded()
    }

    // ===== Transport =====

    pub fn play(&self, options: PlayOptions) -> Result<VoiceId> {
        self.inner.lock().transport.play(options)
    }

    pub fn loop_play(&self, options: PlayOptions) -> Result<VoiceId> {
        self.inner.lock().transport.loop_play(options)
    }

    /// Pause when playing, resume otherwise
    pub fn pause(&self) -> Result<()> {
        self.inner.lock().transport.pause()
    }

    pub fn stop(&self) {
        self.inner.lock().transport.stop();
    }

    pub fn stop_all(&self) {
        self.inner.lock().transport.stop_all();
    }

    pub fn set_loop(&self, looping: bool) {
        self.inner.lock().transport.set_loop(looping);
    }

    pub fn set_rate(&self, rate: f64) -> Result<()> {
        self.inner.lock().transport.set_rate(rate)
    }

    /// Signed playback rate
    pub fn rate(&self) -> f64 {
        self.inner.lock().transport.playback_rate()
    }

    /// Set the re-trigger policy from `"sustain"` or `"restart"`, any case
    pub fn set_play_mode(&self, mode: &str) -> Result<()> {
        let mode: PlayMode = mode.parse()?;
        self.inner.lock().transport.set_play_mode(mode);
        Ok(())
    }

    pub fn play_mode(&self) -> PlayMode {
        self.inner.lock().transport.mode()
    }

    pub fn jump(&self, cue: f64, end: Option<f64>) -> Result<()> {
        self.inner.lock().transport.jump(cue, end)
    }

    pub fn reverse_buffer(&self) -> Result<()> {
        self.inner.lock().transport.reverse_buffer()
    }

    // ===== Queries =====

    /// Playhead position in seconds
    pub fn current_time(&self) -> f64 {
        let mut inner = self.inner.lock();
        inner.transport.reconcile();
        inner.transport.current_time()
    }

    pub fn state(&self) -> PlaybackState {
        let mut inner = self.inner.lock();
        inner.transport.reconcile();
        inner.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlaybackState::Paused
    }

    pub fn is_looping(&self) -> bool {
        self.inner.lock().transport.is_looping()
    }

    pub fn is_reversed(&self) -> bool {
        self.inner.lock().transport.is_reversed()
    }

    pub fn window(&self) -> PlaybackWindow {
        self.inner.lock().transport.window()
    }

    /// Number of live voices
    pub fn voice_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.transport.reconcile();
        inner.transport.voice_count()
    }

    /// Buffer length in seconds, 0 when nothing is loaded
    pub fn duration(&self) -> f64 {
        self.inner.lock().transport.duration()
    }

    pub fn channels(&self) -> Result<usize> {
        self.inner.lock().transport.channels()
    }

    pub fn sample_rate(&self) -> Result<u32> {
        self.inner.lock().transport.sample_rate()
    }

    pub fn frame_count(&self) -> Result<usize> {
        self.inner.lock().transport.frame_count()
    }

    /// Peak envelope with `resolution` columns (default: configured hint)
    pub fn get_peaks(&self, resolution: Option<usize>) -> Result<Vec<f32>> {
        let resolution = resolution.unwrap_or(self.default_peak_resolution);
        self.inner.lock().transport.peaks(resolution)
    }

    /// Take every pending event
    pub fn drain_events(&self) -> Vec<PlaybackEvent> {
        let mut inner = self.inner.lock();
        inner.transport.reconcile();
        inner.transport.drain_events()
    }

    // ===== Output =====

    /// Pan between -1.0 (left) and 1.0 (right) with equal power
    pub fn pan(&self, value: f32) -> Result<()> {
        if !(-1.0..=1.0).contains(&value) {
            return Err(PlaybackError::InvalidArgument(format!(
                "pan must be within -1.0..=1.0, got {value}"
            )));
        }

        let mut inner = self.inner.lock();
        let (x, z) = equal_power_position(value);
        self.graph.set_panner_position(x, 0.0, z);
        inner.pan = value;
        Ok(())
    }

    pub fn get_pan(&self) -> f32 {
        self.inner.lock().pan
    }

    /// Ramp output gain to `level` over `ramp` seconds, starting after
    /// `delay` seconds; replaces any ramp still scheduled
    pub fn set_volume(&self, level: f32, ramp: Option<f64>, delay: Option<f64>) -> Result<()> {
        let mut inner = self.inner.lock();
        let now = self.graph.current_time();
        let scheduled =
            inner
                .volume
                .schedule(level, ramp.unwrap_or(0.0), delay.unwrap_or(0.0), now)?;

        self.graph.cancel_gain_ramps(now);
        self.graph.set_gain_at(scheduled.from, scheduled.start_at);
        self.graph.linear_ramp_gain_to(scheduled.to, scheduled.end_at);
        Ok(())
    }

    /// Target output gain
    pub fn get_volume(&self) -> f32 {
        self.inner.lock().volume.level()
    }

    pub fn connect(&self, sink: Option<&SinkId>) {
        self.graph.connect(sink);
    }

    pub fn disconnect(&self, sink: Option<&SinkId>) {
        self.graph.disconnect(sink);
    }

    /// Stop every voice, release the buffer and leave the graph
    ///
    /// Safe to call more than once.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        if inner.disposed {
            return;
        }

        inner.transport.release_buffer();
        inner.pending_load = None;
        inner.disposed = true;
        self.graph.disconnect(None);

        if let Some(registry) = &self.registry {
            registry.deregister(self.id);
        }
        debug!(player = %self.id, "Disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Panner `(x, z)` for a pan value in -1.0..=1.0
///
/// `x = sin(pan * 90°)`; `z` uses `pan * 90° + 90°` folded back below 90°.
pub fn equal_power_position(value: f32) -> (f32, f32) {
    let x_deg = value * 90.0;
    let mut z_deg = x_deg + 90.0;
    if z_deg > 90.0 {
        z_deg = 180.0 - z_deg;
    }
    (x_deg.to_radians().sin(), z_deg.to_radians().sin())
}
