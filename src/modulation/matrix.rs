use std::sync::Arc;

use four_cc::FourCC;

use crate::{
    parameter::Parameter,
    utils::smoothed::ExponentialSmoothedValue,
    Error,
};

use super::{
    function::{shape, ModFunction},
    listener::{ListenerList, ModMatrixListener},
    routing::{ParamInfo, Routing},
    source::SourceInfo,
    voice::{ModVoice, VoiceId, VoiceState, VoiceTracker},
    id_matches, ModDstId, ModSrcId, PolarityMode,
};

// -------------------------------------------------------------------------------------------------

/// Default smoothing time constant for modulated parameters in seconds.
pub const DEFAULT_SMOOTHING_TIME: f32 = 0.02;

/// Default sample rate, until the host sets a real one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

// -------------------------------------------------------------------------------------------------

/// Routes mono and poly modulation sources to parameters and computes modulated, smoothed
/// parameter values.
///
/// # Setup
///
/// Add all mod sources, parameters and voices, then call [`Self::build`] once. The registries
/// can not grow after the matrix got built, so the audio hot path never allocates.
///
/// # Processing
///
/// For each audio block, update source values via [`Self::set_mono_value`] and
/// [`Self::set_poly_value`], fetch modulated values via [`Self::value`] or [`Self::voice_value`],
/// then advance smoothing via [`Self::finish_block`] and [`Self::finish_voice_block`] once all
/// values for the block got fetched.
///
/// # Threading
///
/// The matrix is `Send` but not internally synchronized. Routing edits and state reloads
/// allocate and must never race with hot path reads of the same matrix: the host is responsible
/// for applying them in the audio thread (e.g. via a message queue) or under a lock which the
/// audio thread also takes.
#[derive(Debug)]
pub struct ModMatrix {
    pub(super) sources: Vec<SourceInfo>,
    pub(super) parameters: Vec<ParamInfo>,
    voices: Vec<VoiceState>,
    smoothers: Vec<[ExponentialSmoothedValue; 2]>,
    tracker: VoiceTracker,
    learn_source: Option<ModSrcId>,
    pub(super) default_polarity_mode: PolarityMode,
    only_show_mod_when_voice_active: bool,
    sample_rate: u32,
    built: bool,
    pub(super) listeners: ListenerList,
}

impl Default for ModMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl ModMatrix {
    /// Create a new, empty matrix.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            parameters: Vec::new(),
            voices: Vec::new(),
            smoothers: Vec::new(),
            tracker: VoiceTracker::default(),
            learn_source: None,
            default_polarity_mode: PolarityMode::default(),
            only_show_mod_when_voice_active: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
            built: false,
            listeners: ListenerList::default(),
        }
    }

    /// Set the polarity mode which is applied to newly created routings.
    pub fn with_default_polarity_mode(mut self, mode: PolarityMode) -> Self {
        self.default_polarity_mode = mode;
        self
    }

    /// Set the initial sample rate for all smoothers.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.set_sample_rate(sample_rate);
        self
    }

    /// Only show live modulation values while a voice is playing.
    pub fn with_only_show_mod_when_voice_active(mut self, only_when_active: bool) -> Self {
        self.only_show_mod_when_voice_active = only_when_active;
        self
    }

    pub fn default_polarity_mode(&self) -> PolarityMode {
        self.default_polarity_mode
    }

    /// Change the polarity mode for new routings. Existing routings are not affected.
    pub fn set_default_polarity_mode(&mut self, mode: PolarityMode) {
        self.default_polarity_mode = mode;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    // ---------------------------------------------------------------------------------------------

    /// Register a monophonic modulation source. Must be called before [`Self::build`].
    pub fn add_mono_mod_source(
        &mut self,
        id: FourCC,
        name: &'static str,
        bipolar: bool,
    ) -> Result<ModSrcId, Error> {
        self.add_mod_source(id, name, false, bipolar)
    }

    /// Register a polyphonic (per voice) modulation source. Must be called before [`Self::build`].
    pub fn add_poly_mod_source(
        &mut self,
        id: FourCC,
        name: &'static str,
        bipolar: bool,
    ) -> Result<ModSrcId, Error> {
        self.add_mod_source(id, name, true, bipolar)
    }

    fn add_mod_source(
        &mut self,
        id: FourCC,
        name: &'static str,
        poly: bool,
        bipolar: bool,
    ) -> Result<ModSrcId, Error> {
        if self.built {
            return Err(Error::MatrixAlreadyBuilt);
        }
        let index = ModSrcId(self.sources.len());
        self.sources.push(SourceInfo::new(id, name, poly, bipolar));
        Ok(index)
    }

    /// Register a modulation destination parameter. Must be called before [`Self::build`].
    ///
    /// Assigns the returned handle as the parameter's mod index. Poly parameters can read per
    /// voice source values via [`Self::voice_value`]. Internal parameters must only be read
    /// per voice, never via the mono [`Self::value`].
    pub fn add_parameter(
        &mut self,
        parameter: Arc<dyn Parameter>,
        poly: bool,
        smoothing_time: f32,
    ) -> Result<ModDstId, Error> {
        if self.built {
            return Err(Error::MatrixAlreadyBuilt);
        }
        if !(smoothing_time.is_finite() && smoothing_time >= 0.0) {
            return Err(Error::InvalidSmoothingTime(smoothing_time));
        }
        let index = ModDstId(self.parameters.len());
        parameter.set_mod_index(index);
        self.parameters
            .push(ParamInfo::new(parameter, poly, smoothing_time));
        Ok(index)
    }

    /// Register a voice. Voices which get added after the matrix got built are initialized
    /// immediately, else in [`Self::build`].
    pub fn add_voice(&mut self) -> VoiceId {
        let id = VoiceId(self.voices.len());
        let mut state = VoiceState::new();
        if self.built {
            self.init_voice_state(&mut state);
        }
        self.voices.push(state);
        id
    }

    /// Allocate smoothers and voice states for all registered sources and parameters.
    pub fn build(&mut self) -> Result<(), Error> {
        if self.built {
            return Err(Error::MatrixAlreadyBuilt);
        }
        self.smoothers = self
            .parameters
            .iter()
            .map(|info| self.new_smoothers(info))
            .collect();
        let mut voices = std::mem::take(&mut self.voices);
        for state in &mut voices {
            self.init_voice_state(state);
        }
        self.voices = voices;
        self.built = true;
        log::info!(
            "Built modulation matrix with {} sources, {} parameters and {} voices",
            self.sources.len(),
            self.parameters.len(),
            self.voices.len()
        );
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Retune all smoothers to the given sample rate. The current smoothed values are kept.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        assert!(sample_rate > 0, "Invalid sample rate");
        self.sample_rate = sample_rate;
        let smoothers = self
            .voices
            .iter_mut()
            .flat_map(|voice| voice.smoothers.iter_mut())
            .chain(self.smoothers.iter_mut());
        for smoother_pair in smoothers {
            for smoother in smoother_pair {
                smoother.set_sample_rate(sample_rate);
            }
        }
    }

    fn new_smoothers(&self, info: &ParamInfo) -> [ExponentialSmoothedValue; 2] {
        let default_value = info.parameter.default_normalized_value();
        let smoother =
            ExponentialSmoothedValue::with_time(default_value, info.smoothing_time, self.sample_rate);
        [smoother.clone(), smoother]
    }

    fn init_voice_state(&self, state: &mut VoiceState) {
        state.values = vec![[0.0; 2]; self.sources.len()];
        state.smoothers = self
            .parameters
            .iter()
            .map(|info| self.new_smoothers(info))
            .collect();
    }

    // ---------------------------------------------------------------------------------------------

    /// Get the modulated value of a parameter in the mono context, converted to the
    /// parameter's user range.
    ///
    /// Poly sources are read from the most recently started, still active voice. Routings from
    /// poly sources contribute nothing while no voice is active.
    pub fn value(&mut self, parameter: ModDstId, channel: usize, smoothed: bool) -> f32 {
        Self::assert_no_alloc(|| {
            debug_assert!(self.built, "Call 'build' before fetching modulated values");
            debug_assert!(channel < 2, "Invalid channel: {channel}");
            let info = &self.parameters[parameter.0];
            debug_assert!(
                !info.parameter.is_internal(),
                "Internal parameters should not be modulated"
            );
            let active_voice = self.tracker.active_voice().map(|voice| &self.voices[voice.0]);
            let (base, _) = Self::accumulate(&self.sources, info, channel, active_voice);

            let smoother = &mut self.smoothers[parameter.0][channel];
            smoother.set_target(base);
            let value = if smoothed { smoother.current() } else { base };
            Self::user_value(info.parameter.as_ref(), value)
        })
    }

    /// Get the modulated value of a parameter for the given voice, converted to the
    /// parameter's user range.
    ///
    /// Poly sources are read from the given voice. Uses the voice's own smoothers, unless
    /// smoothing got disabled for the voice.
    pub fn voice_value(
        &mut self,
        voice: VoiceId,
        parameter: ModDstId,
        channel: usize,
        smoothed: bool,
    ) -> f32 {
        Self::assert_no_alloc(|| {
            debug_assert!(self.built, "Call 'build' before fetching modulated values");
            debug_assert!(channel < 2, "Invalid channel: {channel}");
            let info = &self.parameters[parameter.0];
            let state = &mut self.voices[voice.0];
            let (base, _) = Self::accumulate(&self.sources, info, channel, Some(&*state));

            let smoothed = smoothed && state.smoothing_enabled;
            let smoother = &mut state.smoothers[parameter.0][channel];
            smoother.set_target(base);
            let value = if smoothed { smoother.current() } else { base };
            Self::user_value(info.parameter.as_ref(), value)
        })
    }

    /// Compute unsmoothed, normalized live values of a parameter, e.g. to display modulation
    /// in UI meters. Does not touch any smoother.
    ///
    /// Poly parameters return one value per active voice with enabled routings, or a single mono
    /// value when no voice qualifies. Mono parameters return at most one value, using the
    /// currently active voice for poly sources.
    pub fn live_values<V: ModVoice>(
        &self,
        parameter: ModDstId,
        channel: usize,
        voices: &[V],
    ) -> Vec<f32> {
        debug_assert!(channel < 2, "Invalid channel: {channel}");
        let info = &self.parameters[parameter.0];
        let mut live_values = Vec::new();
        if info.poly {
            for voice in voices.iter().filter(|voice| voice.is_voice_active()) {
                let state = &self.voices[voice.mod_voice_id().0];
                let (value, contributed) =
                    Self::accumulate(&self.sources, info, channel, Some(state));
                if contributed {
                    live_values.push(value);
                }
            }
            if live_values.is_empty() {
                let (value, contributed) = Self::accumulate(&self.sources, info, channel, None);
                if contributed {
                    live_values.push(value);
                }
            }
        } else {
            let active_voice = self.tracker.active_voice().map(|voice| &self.voices[voice.0]);
            let (value, contributed) =
                Self::accumulate(&self.sources, info, channel, active_voice);
            if contributed {
                live_values.push(value);
            }
        }
        live_values
    }

    /// Sum up the parameter's base value and all enabled routings. Returns the value clamped to
    /// \[0,1\] and whether any routing contributed to it.
    #[inline]
    fn accumulate(
        sources: &[SourceInfo],
        info: &ParamInfo,
        channel: usize,
        voice: Option<&VoiceState>,
    ) -> (f32, bool) {
        let mut value = info.parameter.normalized_value();
        let mut contributed = false;
        for routing in info.routings.iter().filter(|routing| routing.enabled) {
            let source = &sources[routing.source.0];
            let raw_value = if routing.poly {
                match voice {
                    Some(voice) => voice.values[routing.source.0][channel],
                    None => continue,
                }
            } else {
                source.mono_values[channel]
            };
            value += shape(
                raw_value,
                routing.function,
                source.bipolar,
                routing.bipolar_mapping,
            ) * routing.depth;
            contributed = true;
        }
        (value.clamp(0.0, 1.0), contributed)
    }

    #[inline]
    fn user_value(parameter: &dyn Parameter, normalized: f32) -> f32 {
        let value = parameter.denormalize_value(normalized);
        match parameter.conversion_function() {
            Some(conversion) => conversion(value),
            None => value,
        }
    }

    // ---------------------------------------------------------------------------------------------

    /// Set the current value of a mono source for the given channel (0 or 1).
    pub fn set_mono_value(&mut self, source: ModSrcId, value: f32, channel: usize) {
        debug_assert!(channel < 2, "Invalid channel: {channel}");
        let info = &mut self.sources[source.0];
        debug_assert!(!info.poly, "Expecting a mono source here");
        info.mono_values[channel] = value;
    }

    /// Set the current value of a poly source in the given voice for the given channel (0 or 1).
    pub fn set_poly_value(&mut self, voice: VoiceId, source: ModSrcId, value: f32, channel: usize) {
        debug_assert!(channel < 2, "Invalid channel: {channel}");
        debug_assert!(self.sources[source.0].poly, "Expecting a poly source here");
        self.voices[voice.0].values[source.0][channel] = value;
    }

    /// Set the current value of a poly source in the given voice for both channels.
    pub fn set_poly_value_stereo(&mut self, voice: VoiceId, source: ModSrcId, value: f32) {
        self.set_poly_value(voice, source, value, 0);
        self.set_poly_value(voice, source, value, 1);
    }

    /// Advance the mono context smoothers by the given block length. Call once per processed
    /// block, after all values for the block got fetched.
    pub fn finish_block(&mut self, num_samples: usize) {
        Self::assert_no_alloc(|| {
            for [left, right] in &mut self.smoothers {
                left.process(num_samples);
                right.process(num_samples);
            }
        })
    }

    /// Move all mono context smoothers instantly to their targets.
    pub fn snap_params(&mut self) {
        for [left, right] in &mut self.smoothers {
            left.snap_to_target();
            right.snap_to_target();
        }
    }

    /// Advance the given voice's smoothers by the given block length. Call once per processed
    /// block, after all values for the block got fetched.
    pub fn finish_voice_block(&mut self, voice: VoiceId, num_samples: usize) {
        Self::assert_no_alloc(|| self.voices[voice.0].finish_block(num_samples))
    }

    /// Move all smoothers of the given voice instantly to their targets, e.g. on voice steals.
    pub fn snap_voice_params(&mut self, voice: VoiceId) {
        self.voices[voice.0].snap_params();
    }

    /// Enable or disable parameter smoothing for the given voice.
    pub fn set_voice_smoothing_enabled(&mut self, voice: VoiceId, enabled: bool) {
        self.voices[voice.0].smoothing_enabled = enabled;
    }

    // ---------------------------------------------------------------------------------------------

    /// Mark a voice as started: it becomes the active voice for mono contexts. Returns the
    /// voice's new, strictly increasing age.
    pub fn start_voice(&mut self, voice: VoiceId) -> u64 {
        let age = self.tracker.voice_started(voice);
        self.voices[voice.0].age = age;
        age
    }

    /// Mark a voice as stopped. When it was the active voice, the youngest still active voice
    /// of the given voices becomes the new active voice.
    pub fn stop_voice<V: ModVoice>(&mut self, voice: VoiceId, voices: &[V]) {
        self.tracker.voice_stopped(voice, voices, &self.voices);
    }

    /// Age of the given voice: 0 when the voice was never started.
    pub fn voice_age(&self, voice: VoiceId) -> u64 {
        self.voices[voice.0].age
    }

    /// The voice which feeds poly sources into mono contexts.
    pub fn active_voice(&self) -> Option<VoiceId> {
        self.tracker.active_voice()
    }

    pub fn num_voices(&self) -> usize {
        self.voices.len()
    }

    // ---------------------------------------------------------------------------------------------

    /// Memorize a source which should be routed with the next learn gesture in the UI.
    pub fn enable_learn(&mut self, source: ModSrcId) {
        self.learn_source = Some(source);
        self.listeners
            .call(|l| l.learn_source_changed(self.learn_source));
    }

    pub fn disable_learn(&mut self) {
        self.learn_source = None;
        self.listeners
            .call(|l| l.learn_source_changed(self.learn_source));
    }

    pub fn learn_source(&self) -> Option<ModSrcId> {
        self.learn_source
    }

    // ---------------------------------------------------------------------------------------------

    pub fn num_mod_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn mod_src_id(&self, source: ModSrcId) -> FourCC {
        self.sources[source.0].id
    }

    pub fn mod_src_name(&self, source: ModSrcId) -> &'static str {
        self.sources[source.0].name
    }

    pub fn mod_src_poly(&self, source: ModSrcId) -> bool {
        self.sources[source.0].poly
    }

    pub fn mod_src_bipolar(&self, source: ModSrcId) -> bool {
        self.sources[source.0].bipolar
    }

    /// Find a source by its identifier string.
    pub fn find_mod_source(&self, id: &str) -> Result<ModSrcId, Error> {
        self.sources
            .iter()
            .position(|source| id_matches(source.id, id))
            .map(ModSrcId)
            .ok_or_else(|| Error::SourceNotFound(id.to_string()))
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter(&self, parameter: ModDstId) -> &Arc<dyn Parameter> {
        &self.parameters[parameter.0].parameter
    }

    pub fn mod_dst_name(&self, parameter: ModDstId) -> &'static str {
        self.parameters[parameter.0].parameter.name()
    }

    pub fn mod_dst_poly(&self, parameter: ModDstId) -> bool {
        self.parameters[parameter.0].poly
    }

    /// Find a parameter by its unique identifier string.
    pub fn find_parameter(&self, id: &str) -> Result<ModDstId, Error> {
        self.parameters
            .iter()
            .position(|info| id_matches(info.parameter.id(), id))
            .map(ModDstId)
            .ok_or_else(|| Error::ParameterNotFound(id.to_string()))
    }

    // ---------------------------------------------------------------------------------------------

    /// All sources which are routed to the given parameter, in creation order.
    pub fn mod_sources(&self, parameter: ModDstId) -> Vec<ModSrcId> {
        self.parameters[parameter.0]
            .routings
            .iter()
            .map(|routing| routing.source)
            .collect()
    }

    /// True when at least one routing targets the given parameter.
    pub fn is_modulated(&self, parameter: ModDstId) -> bool {
        !self.parameters[parameter.0].routings.is_empty()
    }

    /// Depth of the given routing, or 0 when there is no such routing.
    pub fn mod_depth(&self, source: ModSrcId, parameter: ModDstId) -> f32 {
        self.parameters[parameter.0]
            .routing(source)
            .map_or(0.0, |routing| routing.depth)
    }

    /// All parameters the given source is routed to, with their depths.
    pub fn mod_depths_for_source(&self, source: ModSrcId) -> Vec<(ModDstId, f32)> {
        self.parameters
            .iter()
            .enumerate()
            .filter_map(|(index, info)| {
                info.routing(source)
                    .map(|routing| (ModDstId(index), routing.depth))
            })
            .collect()
    }

    /// All sources routed to the given parameter, with their depths.
    pub fn mod_depths_for_parameter(&self, parameter: ModDstId) -> Vec<(ModSrcId, f32)> {
        self.parameters[parameter.0]
            .routings
            .iter()
            .map(|routing| (routing.source, routing.depth))
            .collect()
    }

    /// Set the depth of a routing, creating the routing if necessary.
    ///
    /// New routings use a linear function and get their destination polarity resolved by the
    /// default polarity mode.
    pub fn set_mod_depth(&mut self, source: ModSrcId, parameter: ModDstId, depth: f32) {
        debug_assert!((-1.0..=1.0).contains(&depth), "Invalid depth: {depth}");
        if let Some(routing) = self.parameters[parameter.0].routing_mut(source) {
            routing.depth = depth;
        } else {
            self.create_routing(source, parameter, depth, ModFunction::Linear);
        }
        self.notify_changed();
    }

    /// Remove a routing, if it exists.
    pub fn clear_mod_depth(&mut self, source: ModSrcId, parameter: ModDstId) {
        if self.parameters[parameter.0].remove_routing(source) {
            log::debug!(
                "Removed modulation routing '{}' -> '{}'",
                self.mod_src_name(source),
                self.mod_dst_name(parameter)
            );
        }
        self.notify_changed();
    }

    /// Shaping function of the given routing, or linear when there is no such routing.
    pub fn mod_function(&self, source: ModSrcId, parameter: ModDstId) -> ModFunction {
        self.parameters[parameter.0]
            .routing(source)
            .map_or(ModFunction::Linear, |routing| routing.function)
    }

    /// Set the shaping function of a routing, creating the routing with full depth if necessary.
    pub fn set_mod_function(
        &mut self,
        source: ModSrcId,
        parameter: ModDstId,
        function: ModFunction,
    ) {
        if let Some(routing) = self.parameters[parameter.0].routing_mut(source) {
            routing.function = function;
        } else {
            self.create_routing(source, parameter, 1.0, function);
        }
        self.notify_changed();
    }

    /// Enabled state of the given routing, or false when there is no such routing.
    pub fn mod_enable(&self, source: ModSrcId, parameter: ModDstId) -> bool {
        self.parameters[parameter.0]
            .routing(source)
            .is_some_and(|routing| routing.enabled)
    }

    /// Enable or disable an existing routing. Does nothing when there is no such routing.
    pub fn set_mod_enable(&mut self, source: ModSrcId, parameter: ModDstId, enabled: bool) {
        if let Some(routing) = self.parameters[parameter.0].routing_mut(source) {
            routing.enabled = enabled;
        }
        self.notify_changed();
    }

    /// Destination polarity of the given routing, or false when there is no such routing.
    pub fn mod_bipolar_mapping(&self, source: ModSrcId, parameter: ModDstId) -> bool {
        self.parameters[parameter.0]
            .routing(source)
            .is_some_and(|routing| routing.bipolar_mapping)
    }

    /// Set the destination polarity of an existing routing. Does nothing when there is no such
    /// routing.
    pub fn set_mod_bipolar_mapping(&mut self, source: ModSrcId, parameter: ModDstId, bipolar: bool) {
        if let Some(routing) = self.parameters[parameter.0].routing_mut(source) {
            routing.bipolar_mapping = bipolar;
        }
        self.notify_changed();
    }

    fn create_routing(
        &mut self,
        source: ModSrcId,
        parameter: ModDstId,
        depth: f32,
        function: ModFunction,
    ) {
        let source_info = &self.sources[source.0];
        let bipolar_mapping = self.default_polarity_mode.resolve(source_info.bipolar);
        let mut routing = Routing::new(source, source_info.poly, depth, bipolar_mapping);
        routing.function = function;

        let info = &mut self.parameters[parameter.0];
        info.routings.push(routing);

        let parameter = &info.parameter;
        log::debug!(
            "Modulation routing created: '{}' -> '{}', depth: {}, bipolar: {}, base value: {}",
            source_info.name,
            parameter.name(),
            depth,
            bipolar_mapping,
            parameter.normalized_value_to_string(parameter.normalized_value(), true)
        );
    }

    // ---------------------------------------------------------------------------------------------

    /// True when UI meters should display live modulation values.
    pub fn should_show_live_mod_values<V: ModVoice>(&self, voices: &[V]) -> bool {
        if self.only_show_mod_when_voice_active {
            voices.iter().any(|voice| voice.is_voice_active())
        } else {
            true
        }
    }

    pub fn set_only_show_mod_when_voice_active(&mut self, only_when_active: bool) {
        self.only_show_mod_when_voice_active = only_when_active;
    }

    // ---------------------------------------------------------------------------------------------

    /// Register a listener for topology and learn source changes.
    pub fn add_listener(&mut self, listener: Arc<dyn ModMatrixListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&mut self, listener: &Arc<dyn ModMatrixListener>) {
        self.listeners.remove(listener);
    }

    pub fn num_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub(super) fn notify_changed(&self) {
        self.listeners.call(|l| l.mod_matrix_changed());
    }

    // ---------------------------------------------------------------------------------------------

    #[inline]
    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::parameter::FloatParameter;

    const EPSILON: f32 = 1e-5;

    struct TestVoice {
        id: VoiceId,
        active: bool,
    }

    impl ModVoice for TestVoice {
        fn mod_voice_id(&self) -> VoiceId {
            self.id
        }
        fn is_voice_active(&self) -> bool {
            self.active
        }
    }

    #[derive(Default)]
    struct CountingListener {
        changes: AtomicUsize,
        learns: AtomicUsize,
    }

    impl ModMatrixListener for CountingListener {
        fn mod_matrix_changed(&self) {
            self.changes.fetch_add(1, Ordering::Relaxed);
        }
        fn learn_source_changed(&self, _source: Option<ModSrcId>) {
            self.learns.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct Setup {
        matrix: ModMatrix,
        lfo: ModSrcId,
        macro_: ModSrcId,
        env: ModSrcId,
        cutoff: Arc<FloatParameter>,
        cutoff_id: ModDstId,
        gain_id: ModDstId,
        voices: Vec<TestVoice>,
    }

    fn setup() -> Setup {
        let mut matrix = ModMatrix::new();
        let lfo = matrix
            .add_mono_mod_source(FourCC(*b"LFO1"), "LFO 1", true)
            .unwrap();
        let macro_ = matrix
            .add_mono_mod_source(FourCC(*b"MAC1"), "Macro 1", false)
            .unwrap();
        let env = matrix
            .add_poly_mod_source(FourCC(*b"ENV1"), "Env 1", false)
            .unwrap();
        let cutoff = Arc::new(FloatParameter::new(
            FourCC(*b"CUTO"),
            "Cutoff",
            0.0..=100.0,
            0.0,
        ));
        let gain = Arc::new(FloatParameter::new(FourCC(*b"GAIN"), "Gain", 0.0..=1.0, 0.5));
        let cutoff_id = matrix
            .add_parameter(cutoff.clone(), true, DEFAULT_SMOOTHING_TIME)
            .unwrap();
        let gain_id = matrix
            .add_parameter(gain, false, DEFAULT_SMOOTHING_TIME)
            .unwrap();
        let voices = (0..3)
            .map(|_| TestVoice {
                id: matrix.add_voice(),
                active: false,
            })
            .collect();
        matrix.build().unwrap();
        Setup {
            matrix,
            lfo,
            macro_,
            env,
            cutoff,
            cutoff_id,
            gain_id,
            voices,
        }
    }

    #[test]
    fn registration() {
        let Setup {
            mut matrix,
            lfo,
            env,
            cutoff,
            cutoff_id,
            ..
        } = setup();
        assert_eq!(matrix.num_mod_sources(), 3);
        assert_eq!(matrix.num_parameters(), 2);
        assert_eq!(matrix.num_voices(), 3);
        assert_eq!(matrix.mod_src_name(lfo), "LFO 1");
        assert!(matrix.mod_src_bipolar(lfo));
        assert!(matrix.mod_src_poly(env));
        assert_eq!(cutoff.mod_index(), Some(cutoff_id));
        assert_eq!(matrix.mod_dst_name(cutoff_id), "Cutoff");
        assert_eq!(matrix.find_mod_source("ENV1"), Ok(env));
        assert_eq!(matrix.find_parameter("CUTO"), Ok(cutoff_id));
        assert_eq!(
            matrix.find_parameter("NOPE"),
            Err(Error::ParameterNotFound("NOPE".to_string()))
        );

        // registries are frozen after build
        assert_eq!(
            matrix.add_mono_mod_source(FourCC(*b"LATE"), "Late", false),
            Err(Error::MatrixAlreadyBuilt)
        );
        assert_eq!(matrix.build(), Err(Error::MatrixAlreadyBuilt));

        let mut unbuilt = ModMatrix::new();
        let param = || Arc::new(FloatParameter::new(FourCC(*b"MIX_"), "Mix", 0.0..=1.0, 0.0));
        assert_eq!(
            unbuilt.add_parameter(param(), false, -0.1),
            Err(Error::InvalidSmoothingTime(-0.1))
        );
        assert!(matches!(
            unbuilt.add_parameter(param(), false, f32::NAN),
            Err(Error::InvalidSmoothingTime(time)) if time.is_nan()
        ));
        assert_eq!(unbuilt.add_parameter(param(), false, 0.0), Ok(ModDstId(0)));

        // late voices get initialized immediately
        let late = matrix.add_voice();
        matrix.set_poly_value(late, env, 0.5, 0);
        assert_eq!(matrix.voice_value(late, cutoff_id, 0, false), 0.0);
    }

    #[test]
    fn routing_edits() {
        let Setup {
            mut matrix,
            lfo,
            macro_,
            cutoff_id,
            gain_id,
            ..
        } = setup();
        let listener = Arc::new(CountingListener::default());
        matrix.add_listener(listener.clone());

        assert!(!matrix.is_modulated(cutoff_id));
        matrix.set_mod_depth(lfo, cutoff_id, 0.5);
        matrix.set_mod_depth(macro_, cutoff_id, -0.25);
        assert!(matrix.is_modulated(cutoff_id));
        assert_eq!(matrix.mod_depth(lfo, cutoff_id), 0.5);
        assert_eq!(matrix.mod_depth(macro_, cutoff_id), -0.25);
        assert_eq!(matrix.mod_sources(cutoff_id), vec![lfo, macro_]);

        // update in place
        matrix.set_mod_depth(lfo, cutoff_id, 0.75);
        assert_eq!(matrix.mod_sources(cutoff_id).len(), 2);
        assert_eq!(matrix.mod_depth(lfo, cutoff_id), 0.75);

        matrix.set_mod_depth(lfo, gain_id, 1.0);
        assert_eq!(
            matrix.mod_depths_for_source(lfo),
            vec![(cutoff_id, 0.75), (gain_id, 1.0)]
        );
        assert_eq!(
            matrix.mod_depths_for_parameter(cutoff_id),
            vec![(lfo, 0.75), (macro_, -0.25)]
        );

        // polarity follows the source by default
        assert!(matrix.mod_bipolar_mapping(lfo, cutoff_id));
        assert!(!matrix.mod_bipolar_mapping(macro_, cutoff_id));
        matrix.set_mod_bipolar_mapping(lfo, cutoff_id, false);
        assert!(!matrix.mod_bipolar_mapping(lfo, cutoff_id));

        assert!(matrix.mod_enable(lfo, cutoff_id));
        matrix.set_mod_enable(lfo, cutoff_id, false);
        assert!(!matrix.mod_enable(lfo, cutoff_id));

        assert_eq!(matrix.mod_function(lfo, cutoff_id), ModFunction::Linear);
        matrix.set_mod_function(lfo, cutoff_id, ModFunction::SineIn);
        assert_eq!(matrix.mod_function(lfo, cutoff_id), ModFunction::SineIn);

        // enable and polarity edits do not create routings
        matrix.set_mod_enable(macro_, gain_id, true);
        matrix.set_mod_bipolar_mapping(macro_, gain_id, true);
        assert_eq!(matrix.mod_sources(gain_id), vec![lfo]);

        // function edits do, with full depth
        matrix.set_mod_function(macro_, gain_id, ModFunction::InvLinear);
        assert_eq!(matrix.mod_depth(macro_, gain_id), 1.0);

        matrix.clear_mod_depth(lfo, cutoff_id);
        matrix.clear_mod_depth(macro_, cutoff_id);
        assert_eq!(matrix.mod_depth(lfo, cutoff_id), 0.0);
        assert!(!matrix.is_modulated(cutoff_id));
        // clearing missing routings is a no-op
        matrix.clear_mod_depth(macro_, cutoff_id);

        assert_eq!(listener.changes.load(Ordering::Relaxed), 13);

        let listener: Arc<dyn ModMatrixListener> = listener;
        matrix.remove_listener(&listener);
        assert_eq!(matrix.num_listeners(), 0);
    }

    #[test]
    fn polarity_mode_applies_on_creation_only() {
        let Setup {
            mut matrix,
            lfo,
            macro_,
            cutoff_id,
            ..
        } = setup();
        matrix.set_default_polarity_mode(PolarityMode::Bipolar);
        matrix.set_mod_depth(macro_, cutoff_id, 0.5);
        assert!(matrix.mod_bipolar_mapping(macro_, cutoff_id));

        matrix.set_default_polarity_mode(PolarityMode::Unipolar);
        matrix.set_mod_depth(lfo, cutoff_id, 0.5);
        assert!(!matrix.mod_bipolar_mapping(lfo, cutoff_id));
        assert!(matrix.mod_bipolar_mapping(macro_, cutoff_id));
    }

    #[test]
    fn learn_source() {
        let Setup {
            mut matrix, lfo, ..
        } = setup();
        let listener = Arc::new(CountingListener::default());
        matrix.add_listener(listener.clone());
        // adding twice registers once
        matrix.add_listener(listener.clone());

        assert_eq!(matrix.learn_source(), None);
        matrix.enable_learn(lfo);
        assert_eq!(matrix.learn_source(), Some(lfo));
        matrix.disable_learn();
        assert_eq!(matrix.learn_source(), None);
        assert_eq!(listener.learns.load(Ordering::Relaxed), 2);
        assert_eq!(listener.changes.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn mono_value() {
        let Setup {
            mut matrix,
            macro_,
            cutoff_id,
            ..
        } = setup();
        matrix.set_mono_value(macro_, 0.5, 0);
        matrix.set_mod_depth(macro_, cutoff_id, 1.0);
        assert!((matrix.value(cutoff_id, 0, false) - 50.0).abs() < 0.001);
        // channel 1 has its own value
        assert!((matrix.value(cutoff_id, 1, false) - 0.0).abs() < 0.001);

        // disabled routings do not contribute
        matrix.set_mod_enable(macro_, cutoff_id, false);
        assert!((matrix.value(cutoff_id, 0, false) - 0.0).abs() < 0.001);
    }

    #[test]
    fn internal_parameters_read_per_voice() {
        let mut matrix = ModMatrix::new();
        let env = matrix
            .add_poly_mod_source(FourCC(*b"ENV1"), "Env 1", false)
            .unwrap();
        let pitch = Arc::new(
            FloatParameter::new(FourCC(*b"PTCH"), "Pitch", 0.0..=1.0, 0.0).internal(),
        );
        let pitch_id = matrix.add_parameter(pitch.clone(), true, 0.0).unwrap();
        assert_eq!(pitch.mod_index(), Some(pitch_id));
        let voice = matrix.add_voice();
        matrix.build().unwrap();

        matrix.set_mod_depth(env, pitch_id, 1.0);
        matrix.set_poly_value(voice, env, 0.6, 0);
        assert!((matrix.voice_value(voice, pitch_id, 0, false) - 0.6).abs() < EPSILON);
    }

    #[test]
    fn stepped_parameters_are_not_quantized() {
        let mut matrix = ModMatrix::new();
        let macro_ = matrix
            .add_mono_mod_source(FourCC(*b"MAC1"), "Macro 1", false)
            .unwrap();
        let octave = Arc::new(
            FloatParameter::new(FourCC(*b"OCTV"), "Octave", 0.0..=12.0, 0.0).with_step(1.0),
        );
        let octave_id = matrix.add_parameter(octave.clone(), false, 0.0).unwrap();
        matrix.build().unwrap();

        matrix.set_mono_value(macro_, 0.3, 0);
        matrix.set_mod_depth(macro_, octave_id, 1.0);
        assert!((matrix.value(octave_id, 0, false) - 3.6).abs() < 0.001);

        // the host value itself stays on legal steps
        octave.set_value(3.6);
        assert_eq!(octave.value(), 4.0);
    }

    #[test]
    fn routing_order_does_not_matter() {
        let mut forward = setup();
        let mut backward = setup();
        let routings = [
            (forward.lfo, 0.3),
            (forward.macro_, -0.4),
            (forward.env, 0.2),
        ];
        for (source, depth) in routings {
            forward.matrix.set_mod_depth(source, forward.cutoff_id, depth);
        }
        for (source, depth) in routings.into_iter().rev() {
            backward.matrix.set_mod_depth(source, backward.cutoff_id, depth);
        }
        for Setup {
            matrix,
            lfo,
            macro_,
            env,
            cutoff,
            voices,
            ..
        } in [&mut forward, &mut backward]
        {
            cutoff.set_value(50.0);
            matrix.set_mono_value(*lfo, 0.5, 0);
            matrix.set_mono_value(*macro_, 0.25, 0);
            matrix.set_poly_value(voices[0].id, *env, 0.75, 0);
            matrix.start_voice(voices[0].id);
        }

        let id = forward.cutoff_id;
        assert!(
            (forward.matrix.value(id, 0, false) - backward.matrix.value(id, 0, false)).abs()
                < 0.001
        );
        let voice = forward.voices[0].id;
        assert!(
            (forward.matrix.voice_value(voice, id, 0, false)
                - backward.matrix.voice_value(voice, id, 0, false))
            .abs()
                < 0.001
        );
    }

    #[test]
    fn routings_accumulate_and_clamp() {
        let Setup {
            mut matrix,
            lfo,
            macro_,
            cutoff_id,
            cutoff,
            ..
        } = setup();
        cutoff.set_value(20.0);
        matrix.set_mono_value(lfo, 0.0, 0); // bipolar center: 0.5
        matrix.set_mono_value(macro_, 0.4, 0);
        matrix.set_mod_depth(lfo, cutoff_id, 0.5);
        matrix.set_mod_bipolar_mapping(lfo, cutoff_id, false);
        matrix.set_mod_depth(macro_, cutoff_id, 0.5);
        // 0.2 + 0.5 * 0.5 + 0.4 * 0.5
        assert!((matrix.value(cutoff_id, 0, false) - 65.0).abs() < 0.001);

        matrix.set_mod_depth(macro_, cutoff_id, 1.0);
        matrix.set_mono_value(macro_, 1.0, 0);
        assert!((matrix.value(cutoff_id, 0, false) - 100.0).abs() < EPSILON);

        matrix.set_mod_depth(lfo, cutoff_id, -1.0);
        matrix.set_mod_depth(macro_, cutoff_id, -1.0);
        assert!((matrix.value(cutoff_id, 0, false) - 0.0).abs() < EPSILON);
    }

    #[test]
    fn poly_sources_in_mono_context() {
        let Setup {
            mut matrix,
            env,
            macro_,
            gain_id,
            mut voices,
            ..
        } = setup();
        matrix.set_mod_depth(env, gain_id, 0.25);
        matrix.set_mod_depth(macro_, gain_id, 0.25);
        matrix.set_mono_value(macro_, 1.0, 0);

        // no active voice: only the mono source contributes
        assert!((matrix.value(gain_id, 0, false) - 0.75).abs() < EPSILON);

        voices[0].active = true;
        matrix.start_voice(voices[0].id);
        matrix.set_poly_value_stereo(voices[0].id, env, 1.0);
        voices[1].active = true;
        matrix.start_voice(voices[1].id);
        matrix.set_poly_value_stereo(voices[1].id, env, -1.0);

        // active voice is the last started one
        assert_eq!(matrix.active_voice(), Some(voices[1].id));
        assert!((matrix.value(gain_id, 0, false) - 0.5).abs() < EPSILON);

        voices[1].active = false;
        matrix.stop_voice(voices[1].id, &voices);
        assert_eq!(matrix.active_voice(), Some(voices[0].id));
        assert!((matrix.value(gain_id, 0, false) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn voice_values() {
        let Setup {
            mut matrix,
            env,
            macro_,
            cutoff_id,
            voices,
            ..
        } = setup();
        matrix.set_mod_depth(env, cutoff_id, 0.5);
        matrix.set_mod_depth(macro_, cutoff_id, 0.5);
        matrix.set_mono_value(macro_, 0.5, 0);
        matrix.set_poly_value(voices[0].id, env, 1.0, 0);
        matrix.set_poly_value(voices[1].id, env, 0.5, 0);

        // voices read their own poly values, no matter which voice is active
        assert!((matrix.voice_value(voices[0].id, cutoff_id, 0, false) - 75.0).abs() < 0.001);
        assert!((matrix.voice_value(voices[1].id, cutoff_id, 0, false) - 50.0).abs() < 0.001);

        // smoothed values start at the default and move towards the target
        let smoothed = matrix.voice_value(voices[0].id, cutoff_id, 0, true);
        assert!(smoothed.abs() < 0.001);
        matrix.finish_voice_block(voices[0].id, 256);
        let smoothed = matrix.voice_value(voices[0].id, cutoff_id, 0, true);
        assert!(smoothed > 0.0 && smoothed < 75.0);

        // other voices are not advanced
        assert!(matrix.voice_value(voices[1].id, cutoff_id, 0, true).abs() < 0.001);

        matrix.snap_voice_params(voices[0].id);
        assert!((matrix.voice_value(voices[0].id, cutoff_id, 0, true) - 75.0).abs() < 0.001);

        // disabled smoothing returns unsmoothed values
        matrix.set_voice_smoothing_enabled(voices[1].id, false);
        assert!((matrix.voice_value(voices[1].id, cutoff_id, 0, true) - 50.0).abs() < 0.001);
    }

    #[test]
    fn smoothing() {
        let Setup {
            mut matrix,
            macro_,
            gain_id,
            ..
        } = setup();
        matrix.set_mod_depth(macro_, gain_id, 0.5);
        matrix.set_mono_value(macro_, 1.0, 0);

        // starts at the default value
        assert!((matrix.value(gain_id, 0, true) - 0.5).abs() < EPSILON);
        matrix.finish_block(64);
        let first = matrix.value(gain_id, 0, true);
        assert!(first > 0.5 && first < 1.0);

        // changing the sample rate keeps the current value
        matrix.set_sample_rate(96000);
        assert!((matrix.value(gain_id, 0, true) - first).abs() < EPSILON);
        matrix.finish_block(64);
        let second = matrix.value(gain_id, 0, true);
        assert!(second > first && second < 1.0);

        matrix.snap_params();
        assert!((matrix.value(gain_id, 0, true) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn live_values() {
        let Setup {
            mut matrix,
            env,
            macro_,
            cutoff_id,
            gain_id,
            mut voices,
            ..
        } = setup();

        // nothing routed: no live values
        assert!(matrix.live_values(cutoff_id, 0, &voices).is_empty());

        matrix.set_mod_depth(env, cutoff_id, 1.0);
        matrix.set_mod_depth(macro_, cutoff_id, 0.25);
        matrix.set_mono_value(macro_, 1.0, 0);

        // poly parameter without active voices: mono routings only
        assert_eq!(matrix.live_values(cutoff_id, 0, &voices), vec![0.25]);

        for (index, voice) in voices.iter_mut().enumerate().take(2) {
            voice.active = true;
            matrix.start_voice(voice.id);
            matrix.set_poly_value(voice.id, env, 0.25 * index as f32, 0);
        }
        assert_eq!(matrix.live_values(cutoff_id, 0, &voices), vec![0.25, 0.5]);

        // mono parameter with poly routings only and no active voice: nothing to show
        let Setup {
            matrix: mut idle,
            voices: idle_voices,
            ..
        } = setup();
        idle.set_mod_depth(env, gain_id, 0.5);
        assert!(idle.live_values(gain_id, 0, &idle_voices).is_empty());

        // mono parameter: one value from the active voice
        matrix.set_mod_depth(env, gain_id, 0.5);
        assert_eq!(matrix.live_values(gain_id, 0, &voices), vec![0.625]);

        // live values never touch smoothers
        assert!((matrix.value(gain_id, 0, true) - 0.5).abs() < EPSILON);

        assert!(matrix.should_show_live_mod_values(&voices));
        matrix.set_only_show_mod_when_voice_active(true);
        assert!(matrix.should_show_live_mod_values(&voices));
        voices.iter_mut().for_each(|voice| voice.active = false);
        assert!(!matrix.should_show_live_mod_values(&voices));
    }
}
