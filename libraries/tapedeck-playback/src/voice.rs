//! Voice handles and the registry that owns them
//!
//! Every `play` creates one [`VoiceHandle`]. Handles live in a
//! [`VoiceRegistry`] in creation order until they are stopped or the host
//! reports their end. Stopping consumes the handle, so a voice that has left
//! the registry can never be stopped twice.

use crate::graph::Voice;
use crate::types::{PlaybackWindow, VoiceId};
use std::fmt;

/// Owned representation of one live hardware voice
pub struct VoiceHandle {
    id: VoiceId,
    voice: Box<dyn Voice>,
    window: PlaybackWindow,
}

impl VoiceHandle {
    pub fn new(id: VoiceId, voice: Box<dyn Voice>, window: PlaybackWindow) -> Self {
        Self { id, voice, window }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Window snapshot taken when the voice was created
    pub fn window(&self) -> PlaybackWindow {
        self.window
    }

    /// Whether amplitude goes through a dedicated gain node
    pub fn owns_gain(&self) -> bool {
        self.voice.owns_gain()
    }

    pub fn start(&mut self, offset: f64, duration: Option<f64>) {
        self.voice.start(offset, duration);
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.voice.set_amplitude(amplitude);
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.voice.set_loop(looping);
    }

    /// Stop the hardware voice and release the handle
    pub fn stop(mut self) {
        self.voice.stop();
    }
}

impl fmt::Debug for VoiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceHandle")
            .field("id", &self.id)
            .field("window", &self.window)
            .field("owns_gain", &self.owns_gain())
            .finish_non_exhaustive()
    }
}

/// Live voices in creation order (most recent = back)
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: Vec<VoiceHandle>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly started voice
    pub fn push(&mut self, handle: VoiceHandle) {
        self.voices.push(handle);
    }

    /// The most recently created voice
    pub fn active(&self) -> Option<&VoiceHandle> {
        self.voices.last()
    }

    pub fn active_mut(&mut self) -> Option<&mut VoiceHandle> {
        self.voices.last_mut()
    }

    /// Remove a voice without stopping it
    ///
    /// Returns `None` if the voice already left the registry.
    pub fn remove(&mut self, id: VoiceId) -> Option<VoiceHandle> {
        let index = self.voices.iter().position(|handle| handle.id == id)?;
        Some(self.voices.remove(index))
    }

    /// Stop and release the most recent voice
    pub fn stop_active(&mut self) -> Option<VoiceId> {
        let handle = self.voices.pop()?;
        let id = handle.id;
        handle.stop();
        Some(id)
    }

    /// Stop and release every voice, returning how many were stopped
    pub fn stop_all(&mut self) -> usize {
        let count = self.voices.len();
        for handle in self.voices.drain(..) {
            handle.stop();
        }
        count
    }

    /// Stop every voice except the most recent one
    pub fn stop_all_but_latest(&mut self) -> usize {
        let Some(keep) = self.voices.pop() else {
            return 0;
        };
        let stopped = self.stop_all();
        self.voices.push(keep);
        stopped
    }

    /// Ids of live voices, oldest first
    pub fn ids(&self) -> Vec<VoiceId> {
        self.voices.iter().map(|handle| handle.id).collect()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}
