//! Per-voice modulation state and active voice tracking.

use crate::utils::smoothed::ExponentialSmoothedValue;

// -------------------------------------------------------------------------------------------------

/// Handle of a voice which got registered in a [`ModMatrix`](crate::ModMatrix).
///
/// The matrix owns the voice's modulation state (poly source values and parameter smoothers), so
/// a handle never dangles: voices can be reused freely after [`ModMatrix::stop_voice`](crate::ModMatrix::stop_voice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub(crate) usize);

impl VoiceId {
    /// Index of the voice in registration order.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

// -------------------------------------------------------------------------------------------------

/// Implemented by synth voices which support modulation.
///
/// A voice registers itself once via [`ModMatrix::add_voice`](crate::ModMatrix::add_voice) and
/// memorizes the returned handle. Voice activity is tracked by the voice itself (its note-on/off
/// state): the matrix only tracks voice ages, to elect the voice which feeds poly sources into
/// mono contexts.
pub trait ModVoice {
    /// The handle which got assigned by the modulation matrix.
    fn mod_voice_id(&self) -> VoiceId;

    /// True while the voice is playing a note.
    fn is_voice_active(&self) -> bool;
}

// -------------------------------------------------------------------------------------------------

/// Voice local modulation state, owned by the matrix and indexed by [`VoiceId`].
#[derive(Debug, Clone, Default)]
pub(crate) struct VoiceState {
    /// Raw poly source values, indexed by source handle.
    pub values: Vec<[f32; 2]>,
    /// Parameter smoothers, indexed by parameter handle.
    pub smoothers: Vec<[ExponentialSmoothedValue; 2]>,
    /// Start order of the voice, 0 when never started.
    pub age: u64,
    pub smoothing_enabled: bool,
}

impl VoiceState {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            smoothers: Vec::new(),
            age: 0,
            smoothing_enabled: true,
        }
    }

    pub fn finish_block(&mut self, num_samples: usize) {
        for [left, right] in &mut self.smoothers {
            left.process(num_samples);
            right.process(num_samples);
        }
    }

    pub fn snap_params(&mut self) {
        for [left, right] in &mut self.smoothers {
            left.snap_to_target();
            right.snap_to_target();
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Elects the most recently started, still active voice.
#[derive(Debug, Clone, Default)]
pub(crate) struct VoiceTracker {
    next_age: u64,
    active_voice: Option<VoiceId>,
}

impl VoiceTracker {
    pub fn active_voice(&self) -> Option<VoiceId> {
        self.active_voice
    }

    /// Make the given voice the active one and return its new, strictly increasing age.
    pub fn voice_started(&mut self, voice: VoiceId) -> u64 {
        self.active_voice = Some(voice);
        self.next_age += 1;
        self.next_age
    }

    /// When the stopped voice was the active one, re-elect the youngest still active voice.
    pub fn voice_stopped<V: ModVoice>(
        &mut self,
        stopped: VoiceId,
        voices: &[V],
        states: &[VoiceState],
    ) {
        if self.active_voice != Some(stopped) {
            return;
        }
        self.active_voice = voices
            .iter()
            .filter(|voice| voice.mod_voice_id() != stopped && voice.is_voice_active())
            .map(|voice| {
                let id = voice.mod_voice_id();
                (id, states[id.0].age)
            })
            .filter(|(_, age)| *age > 0)
            .max_by_key(|(_, age)| *age)
            .map(|(id, _)| id);
    }
}

// -------------------------------------------------------------------------------------------------
