//! Transport - core state machine
//!
//! Owns the attached buffer, the transport flags, the playback window and the
//! registry of live voices. Every command first drains pending voice-end
//! notifications so that state reflects whatever the host already reported.

use crate::{
    buffer::SampleBuffer,
    error::{PlaybackError, Result},
    events::{EventQueue, PlaybackEvent},
    graph::{AudioGraph, VoiceEndNotifier, VoiceParams},
    peaks::extract_peaks,
    timeline::{resolve_jump_window, resolve_play_window, Anchor, AnchorOrigin, Timeline},
    types::{PlayMode, PlaybackState, PlaybackWindow, PlayerConfig, VoiceId},
    voice::{VoiceHandle, VoiceRegistry},
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, trace};

/// Optional arguments to [`Transport::play`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayOptions {
    /// Rate for the new voice; its sign is ignored (default: current rate)
    pub rate: Option<f64>,

    /// Amplitude of the new voice (default: 1.0)
    pub amplitude: Option<f32>,

    /// New window start, in `[0, duration)`
    pub start: Option<f64>,

    /// New window end, in `[0, duration]` (default: duration)
    pub end: Option<f64>,
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = Some(amplitude);
        self
    }

    pub fn start(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: f64) -> Self {
        self.end = Some(end);
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(rate) = self.rate {
            if !rate.is_finite() {
                return Err(PlaybackError::InvalidArgument(format!(
                    "rate must be finite, got {rate}"
                )));
            }
        }
        if let Some(amplitude) = self.amplitude {
            if !amplitude.is_finite() || amplitude < 0.0 {
                return Err(PlaybackError::InvalidArgument(format!(
                    "amplitude must be a non-negative number, got {amplitude}"
                )));
            }
        }
        Ok(())
    }
}

/// Single-asset transport
///
/// - Play / pause (toggle) / stop / stop-all
/// - Looping over a playback window
/// - Signed playback rate with buffer reversal for negative rates
/// - Sustain or restart re-trigger policy
/// - Clock-anchored playhead position
pub struct Transport {
    graph: Arc<dyn AudioGraph>,
    buffer: Option<Arc<SampleBuffer>>,

    // Flags
    state: PlaybackState,
    mode: PlayMode,
    looping: bool,
    playback_rate: f64,
    reversed: bool,

    // Timing
    window: PlaybackWindow,
    anchor: Option<Anchor>,
    pause_time: f64,

    // Voices
    voices: VoiceRegistry,
    next_voice_id: u64,
    ended_tx: Sender<VoiceId>,
    ended_rx: Receiver<VoiceId>,

    events: EventQueue,
}

impl Transport {
    /// Create an idle transport with no buffer
    ///
    /// Fails with `InvalidArgument` when `config` does not validate.
    pub fn new(graph: Arc<dyn AudioGraph>, config: &PlayerConfig) -> Result<Self> {
        config.validate()?;
        let (ended_tx, ended_rx) = unbounded();

        Ok(Self {
            graph,
            buffer: None,
            state: PlaybackState::Idle,
            mode: config.mode,
            looping: config.looping,
            playback_rate: config.playback_rate,
            reversed: false,
            window: PlaybackWindow::default(),
            anchor: None,
            pause_time: 0.0,
            voices: VoiceRegistry::new(),
            next_voice_id: 0,
            ended_tx,
            ended_rx,
            events: EventQueue::default(),
        })
    }

    // ===== Buffer =====

    /// Attach a decoded buffer
    ///
    /// Returns `false` (and changes nothing) when a buffer is already
    /// attached. A transport whose rate is already negative stores the new
    /// data reversed.
    pub fn attach_buffer(&mut self, buffer: SampleBuffer) -> bool {
        if self.buffer.is_some() {
            debug!("Buffer already attached, ignoring new one");
            return false;
        }

        let mut buffer = buffer;
        self.reversed = self.playback_rate < 0.0;
        if self.reversed {
            buffer.reverse();
        }

        let duration = buffer.duration_seconds();
        self.window = PlaybackWindow::full(duration);
        self.pause_time = 0.0;
        self.events.push(PlaybackEvent::BufferLoaded {
            duration,
            channels: buffer.channel_count(),
            sample_rate: buffer.sample_rate(),
        });
        debug!(
            duration,
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate(),
            "Buffer attached"
        );

        self.buffer = Some(Arc::new(buffer));
        true
    }

    /// Stop every voice and drop the buffer
    pub fn release_buffer(&mut self) {
        self.stop_all();
        self.set_state(PlaybackState::Idle);
        self.buffer = None;
        self.reversed = false;
        self.window = PlaybackWindow::default();
        self.pause_time = 0.0;
    }

    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_deref()
    }

    fn loaded(&self) -> Result<&Arc<SampleBuffer>> {
        self.buffer.as_ref().ok_or(PlaybackError::NotReady)
    }

    /// Reverse the stored sample data and toggle the reversed flag
    ///
    /// Voices already playing keep the data they were started with.
    pub fn reverse_buffer(&mut self) -> Result<()> {
        let buffer = self.buffer.as_mut().ok_or(PlaybackError::NotReady)?;
        Arc::make_mut(buffer).reverse();
        self.reversed = !self.reversed;
        self.events.push(PlaybackEvent::BufferReversed {
            reversed: self.reversed,
        });
        debug!(reversed = self.reversed, "Buffer reversed");
        Ok(())
    }

    // ===== Notifications =====

    /// Apply every voice-end notification received so far
    pub fn reconcile(&mut self) {
        while let Ok(id) = self.ended_rx.try_recv() {
            self.on_voice_ended(id);
        }
    }

    /// Handle the natural end of voice `id`
    ///
    /// Returns `false` for voices that already left the registry (stopped by
    /// the application or reported twice); those are ignored.
    pub fn on_voice_ended(&mut self, id: VoiceId) -> bool {
        let Some(handle) = self.voices.remove(id) else {
            trace!(voice = %id, "Ignoring end of voice no longer registered");
            return false;
        };

        let window = handle.window();
        self.events.push(PlaybackEvent::VoiceEnded { id, natural: true });
        debug!(
            voice = %id,
            start = window.start,
            end = window.end,
            remaining = self.voices.len(),
            "Voice ended"
        );

        if self.voices.is_empty() && self.state == PlaybackState::Playing {
            self.set_state(PlaybackState::Idle);
        }
        true
    }

    // ===== Transport =====

    /// Start a new voice
    ///
    /// Resumes from the pause position when paused, otherwise starts at the
    /// window start. In restart mode the active voice is stopped first; in
    /// sustain mode the new voice overlaps the existing ones.
    pub fn play(&mut self, options: PlayOptions) -> Result<VoiceId> {
        self.reconcile();

        let buffer = Arc::clone(self.loaded()?);
        options.validate()?;
        let window = resolve_play_window(
            self.window,
            options.start,
            options.end,
            buffer.duration_seconds(),
        )?;

        self.window = window;
        Ok(self.trigger(buffer, options.rate, options.amplitude))
    }

    /// Set looping, then [`play`](Self::play) with the same options
    pub fn loop_play(&mut self, options: PlayOptions) -> Result<VoiceId> {
        let was_looping = self.looping;
        self.looping = true;

        let result = self.play(options);
        if result.is_err() {
            self.looping = was_looping;
        }
        result
    }

    /// Pause when playing, otherwise resume
    ///
    /// A paused transport resumes from its pause position with the window
    /// and loop flag unchanged; an idle one starts at the window start.
    pub fn pause(&mut self) -> Result<()> {
        self.reconcile();

        if self.state == PlaybackState::Playing {
            self.pause_time = self.current_time();
            self.stop_active_voice();
            self.set_state(PlaybackState::Paused);
            debug!(at = self.pause_time, "Paused");
            return Ok(());
        }

        let buffer = Arc::clone(self.loaded()?);
        self.trigger(buffer, None, None);
        debug!(at = self.pause_time, "Resumed");
        Ok(())
    }

    /// Stop the active voice and rewind the pause position
    ///
    /// Stopping while paused discards the pause position. No-op when idle.
    pub fn stop(&mut self) {
        self.reconcile();

        if self.stop_active_voice().is_some() || self.state == PlaybackState::Paused {
            self.pause_time = 0.0;
            self.set_state(PlaybackState::Idle);
        }
    }

    /// Stop every registered voice
    pub fn stop_all(&mut self) {
        self.reconcile();

        let ids = self.voices.ids();
        self.voices.stop_all();
        for id in ids {
            self.events.push(PlaybackEvent::VoiceEnded { id, natural: false });
        }

        if self.state == PlaybackState::Playing {
            self.set_state(PlaybackState::Idle);
        }
    }

    /// Change the loop flag, updating the active voice in place
    pub fn set_loop(&mut self, looping: bool) {
        self.reconcile();

        self.looping = looping;
        if let Some(voice) = self.voices.active_mut() {
            voice.set_loop(looping);
        }
    }

    /// Change the signed playback rate
    ///
    /// A rate of zero pauses. Crossing zero reverses the stored buffer. If
    /// still playing afterwards, the active voice is replaced by one started
    /// at the window start with the new rate.
    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() {
            return Err(PlaybackError::InvalidArgument(format!(
                "rate must be finite, got {rate}"
            )));
        }

        self.reconcile();

        if rate == self.playback_rate {
            return Ok(());
        }

        self.playback_rate = rate;
        self.events.push(PlaybackEvent::RateChanged { rate });
        debug!(rate, "Rate changed");

        if rate == 0.0 && self.state == PlaybackState::Playing {
            self.pause()?;
        }

        let crosses_zero = (rate < 0.0 && !self.reversed) || (rate > 0.0 && self.reversed);
        if crosses_zero && self.is_loaded() {
            self.reverse_buffer()?;
        }

        if self.state == PlaybackState::Playing {
            let buffer = Arc::clone(self.loaded()?);
            self.stop_active_voice();
            self.trigger(buffer, None, None);
        }
        Ok(())
    }

    /// Change the re-trigger policy
    ///
    /// Switching to restart stops every voice but the most recent.
    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.reconcile();

        if mode == PlayMode::Restart {
            let keep = self.voices.active().map(VoiceHandle::id);
            for id in self.voices.ids() {
                if Some(id) != keep {
                    self.events.push(PlaybackEvent::VoiceEnded { id, natural: false });
                }
            }
            self.voices.stop_all_but_latest();
        }

        if mode != self.mode {
            self.mode = mode;
            self.events.push(PlaybackEvent::PlayModeChanged { mode });
        }
    }

    /// Move the window to start at `cue`, restarting there if playing
    pub fn jump(&mut self, cue: f64, end: Option<f64>) -> Result<()> {
        self.reconcile();

        let buffer = Arc::clone(self.loaded()?);
        let window = resolve_jump_window(cue, end, buffer.duration_seconds())?;
        self.window = window;
        debug!(cue, end = window.end, "Jump");

        if self.state == PlaybackState::Playing {
            self.stop();
            self.trigger(buffer, None, None);
        }
        Ok(())
    }

    // ===== Queries =====

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Signed playback rate
    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn window(&self) -> PlaybackWindow {
        self.window
    }

    pub fn pause_time(&self) -> f64 {
        self.pause_time
    }

    /// Whether the active anchor was taken on resume rather than fresh start
    pub fn resumed_from_pause(&self) -> bool {
        self.anchor
            .is_some_and(|anchor| anchor.origin == AnchorOrigin::Resumed)
    }

    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    /// Buffer length in seconds, 0 when nothing is attached
    pub fn duration(&self) -> f64 {
        self.buffer
            .as_ref()
            .map_or(0.0, |buffer| buffer.duration_seconds())
    }

    pub fn channels(&self) -> Result<usize> {
        Ok(self.loaded()?.channel_count())
    }

    pub fn sample_rate(&self) -> Result<u32> {
        Ok(self.loaded()?.sample_rate())
    }

    pub fn frame_count(&self) -> Result<usize> {
        Ok(self.loaded()?.frame_count())
    }

    /// Snapshot of the timing inputs
    pub fn timeline(&self) -> Timeline {
        Timeline {
            state: self.state,
            window: self.window,
            pause_time: self.pause_time,
            anchor: self.anchor,
            duration: self.duration(),
        }
    }

    /// Playhead position in seconds, read from the graph clock
    pub fn current_time(&self) -> f64 {
        self.timeline().position_at(self.graph.current_time())
    }

    /// Peak envelope of the attached buffer
    pub fn peaks(&self, resolution: usize) -> Result<Vec<f32>> {
        extract_peaks(self.loaded()?, resolution)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Ids of live voices, oldest first
    pub fn voice_ids(&self) -> Vec<VoiceId> {
        self.voices.ids()
    }

    /// Take every pending event
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain()
    }

    pub(crate) fn record(&mut self, event: PlaybackEvent) {
        self.events.push(event);
    }

    // ===== Internals =====

    /// Create, start and register a voice over the current window
    ///
    /// The window has already been validated against `buffer`.
    fn trigger(
        &mut self,
        buffer: Arc<SampleBuffer>,
        rate: Option<f64>,
        amplitude: Option<f32>,
    ) -> VoiceId {
        if self.mode == PlayMode::Restart {
            self.stop_active_voice();
        }

        let id = VoiceId(self.next_voice_id);
        self.next_voice_id += 1;

        let rate = rate.unwrap_or(self.playback_rate).abs();
        let window = self.window;
        let (origin, offset) = if self.state == PlaybackState::Paused {
            (
                AnchorOrigin::Resumed,
                resume_offset(self.pause_time, window, self.looping),
            )
        } else {
            (AnchorOrigin::Fresh, window.start)
        };
        let length = (!self.looping).then(|| (window.end - offset).max(0.0));

        let params = VoiceParams {
            id,
            window,
            rate,
            looping: self.looping,
        };
        let notifier = VoiceEndNotifier::new(id, self.ended_tx.clone());
        let mut handle = VoiceHandle::new(
            id,
            self.graph.create_voice(buffer, params, notifier),
            window,
        );
        handle.set_amplitude(amplitude.unwrap_or(1.0));
        handle.start(offset, length);

        self.set_state(PlaybackState::Playing);
        self.anchor = Some(Anchor {
            wall_clock: self.graph.current_time(),
            playhead: offset,
            rate,
            origin,
        });
        self.voices.push(handle);

        self.events.push(PlaybackEvent::VoiceStarted { id, offset });
        debug!(voice = %id, offset, rate, looping = self.looping, voices = self.voices.len(), "Voice started");
        id
    }

    fn stop_active_voice(&mut self) -> Option<VoiceId> {
        let id = self.voices.stop_active()?;
        self.events.push(PlaybackEvent::VoiceEnded { id, natural: false });
        Some(id)
    }

    fn set_state(&mut self, state: PlaybackState) {
        if state != PlaybackState::Playing {
            self.anchor = None;
        }
        if state != self.state {
            self.state = state;
            self.events.push(PlaybackEvent::StateChanged { state });
        }
    }
}

/// Where a resumed voice starts inside `window`
///
/// The playhead wraps at the buffer duration, so a pause position can lie
/// outside the window. Looping voices fold it back into the loop, others
/// clamp to the window bounds.
fn resume_offset(pause_time: f64, window: PlaybackWindow, looping: bool) -> f64 {
    let length = window.length();
    if looping && length > 0.0 {
        window.start + (pause_time - window.start).rem_euclid(length)
    } else {
        pause_time.clamp(window.start, window.end)
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.voices.stop_all();
    }
}
