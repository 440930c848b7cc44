use std::{
    fmt::{Debug, Display},
    ops::RangeInclusive,
    sync::{
        atomic::{AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
};

use four_cc::FourCC;

use super::{ConversionFunction, Parameter, ParameterRange, ParameterScaling};
use crate::modulation::ModDstId;

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter, holding its description and its current host value.
///
/// The current value is stored as normalized value in an atomic, so the parameter can be shared
/// via `Arc` between the host/UI thread, which sets values, and the audio thread, which reads
/// them through the [`ModMatrix`](crate::ModMatrix).
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: ParameterRange,
    default: f32,
    unit: &'static str,
    internal: bool,
    conversion: Option<ConversionFunction>,
    normalized: AtomicU32,
    mod_index: AtomicUsize,
}

impl Debug for FloatParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatParameter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("range", &self.range)
            .field("default", &self.default)
            .field("value", &self.value())
            .field("internal", &self.internal)
            .field("conversion", &self.conversion.is_some())
            .finish()
    }
}

impl FloatParameter {
    const NO_MOD_INDEX: usize = usize::MAX;

    /// Create a new float parameter, initialized to its default value.
    pub fn new(id: FourCC, name: &'static str, range: RangeInclusive<f32>, default: f32) -> Self {
        assert!(
            default >= *range.start() && default <= *range.end(),
            "Invalid parameter default value"
        );
        let range = ParameterRange::new(range);
        let normalized = range.convert_to_normalized(default);
        Self {
            id,
            name,
            range,
            default,
            unit: "",
            internal: false,
            conversion: None,
            normalized: AtomicU32::new(normalized.to_bits()),
            mod_index: AtomicUsize::new(Self::NO_MOD_INDEX),
        }
    }

    /// Optional unit for string displays.
    pub fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Skew the normalized value with the given scaling. Keeps the current plain value intact.
    pub fn with_scaling(mut self, scaling: ParameterScaling) -> Self {
        let value = self.value();
        self.range = self.range.clone().with_scaling(scaling);
        self.set_value(value);
        self
    }

    /// Quantize plain values to the given step size.
    pub fn with_step(mut self, step: f32) -> Self {
        self.range = self.range.clone().with_step(step);
        self
    }

    /// Optional custom conversion, applied to plain values after modulation.
    pub fn with_conversion<F: Fn(f32) -> f32 + Send + Sync + 'static>(
        mut self,
        conversion: F,
    ) -> Self {
        self.conversion = Some(Arc::new(conversion));
        self
    }

    /// Mark the parameter as internal: internal parameters are only modulated per voice.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// The parameter's user value range.
    pub fn range(&self) -> &ParameterRange {
        &self.range
    }

    /// The parameter's plain default value.
    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// Current plain value, snapped to a legal value.
    pub fn value(&self) -> f32 {
        self.range
            .snap_to_legal_value(self.range.convert_from_normalized(self.normalized_value()))
    }

    /// Set a new plain value, snapping it to a legal value within the parameter's range.
    pub fn set_value(&self, value: f32) {
        let value = self.range.snap_to_legal_value(value);
        self.set_normalized_value(self.range.convert_to_normalized(value));
    }

    /// Set a new normalized value, clamping it into range \[0,1\] if necessary.
    pub fn set_normalized_value(&self, normalized: f32) {
        self.normalized
            .store(normalized.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// Convert the given plain value to a string.
    pub fn value_to_string(&self, value: f32, include_unit: bool) -> String {
        if include_unit && !self.unit.is_empty() {
            format!("{:.2} {}", value, self.unit)
        } else {
            format!("{:.2}", value)
        }
    }
}

impl Parameter for FloatParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    fn normalized_value(&self) -> f32 {
        f32::from_bits(self.normalized.load(Ordering::Relaxed))
    }

    fn default_normalized_value(&self) -> f32 {
        self.range.convert_to_normalized(self.default)
    }

    fn denormalize_value(&self, normalized: f32) -> f32 {
        self.range.convert_from_normalized(normalized)
    }

    fn normalize_value(&self, value: f32) -> f32 {
        self.range.convert_to_normalized(value)
    }

    fn snap_to_legal_value(&self, value: f32) -> f32 {
        self.range.snap_to_legal_value(value)
    }

    fn conversion_function(&self) -> Option<&ConversionFunction> {
        self.conversion.as_ref()
    }

    fn is_internal(&self) -> bool {
        self.internal
    }

    fn mod_index(&self) -> Option<ModDstId> {
        match self.mod_index.load(Ordering::Relaxed) {
            Self::NO_MOD_INDEX => None,
            index => Some(ModDstId(index)),
        }
    }

    fn set_mod_index(&self, index: ModDstId) {
        self.mod_index.store(index.0, Ordering::Relaxed);
    }

    fn normalized_value_to_string(&self, normalized: f32, include_unit: bool) -> String {
        self.value_to_string(self.denormalize_value(normalized), include_unit)
    }
}

impl Display for FloatParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let include_unit = true;
        f.write_str(&self.value_to_string(self.value(), include_unit))
    }
}

// -------------------------------------------------------------------------------------------------
