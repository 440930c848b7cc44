use std::ops::RangeInclusive;

// -------------------------------------------------------------------------------------------------

/// Skew applied to normalized values before they get mapped into a [`ParameterRange`].
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum ParameterScaling {
    #[default]
    /// Linear scaling: `y = x` (no transformation applied)
    Linear,

    /// Exponential scaling: `y = x^factor`
    /// Factor must be > 0.0.
    ///
    /// Values > 1.0 spend more of the normalized range on the lower end of the user range.
    /// Factors between 2.0 - 3.0 are typically used for Hz (e.g. filter cutoffs).
    Exponential(f32),
}

impl ParameterScaling {
    /// Apply scaling to a normalized f32 value.
    pub fn scale(&self, value: f32) -> f32 {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "Expecting a normalized value here"
        );
        match self {
            ParameterScaling::Linear => value,
            ParameterScaling::Exponential(factor) => value.powf(*factor),
        }
    }

    /// Apply inverse scaling to a normalized f32 value.
    pub fn unscale(&self, value: f32) -> f32 {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "Expecting a normalized value here"
        );
        match self {
            ParameterScaling::Linear => value,
            ParameterScaling::Exponential(factor) => value.powf(1.0 / factor.max(0.001)),
        }
    }

    pub(crate) const fn validate(&self) {
        match self {
            ParameterScaling::Linear => {}
            ParameterScaling::Exponential(factor) => {
                assert!(
                    *factor > 0.0,
                    "Invalid exponential parameter scaling factor (must be > 0)"
                );
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// User facing value range of a parameter: converts normalized \[0,1\] values from and to the
/// user range and quantizes values to legal steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRange {
    range: RangeInclusive<f32>,
    step: Option<f32>,
    scaling: ParameterScaling,
}

impl ParameterRange {
    /// Create a new continuous, linear range.
    pub const fn new(range: RangeInclusive<f32>) -> Self {
        assert!(*range.start() < *range.end(), "Invalid parameter range");
        Self {
            range,
            step: None,
            scaling: ParameterScaling::Linear,
        }
    }

    /// Quantize values to the given step size.
    pub const fn with_step(mut self, step: f32) -> Self {
        assert!(step > 0.0, "Invalid parameter step size");
        self.step = Some(step);
        self
    }

    /// Skew normalized values with the given scaling.
    pub const fn with_scaling(mut self, scaling: ParameterScaling) -> Self {
        scaling.validate();
        self.scaling = scaling;
        self
    }

    pub fn start(&self) -> f32 {
        *self.range.start()
    }

    pub fn end(&self) -> f32 {
        *self.range.end()
    }

    pub fn step(&self) -> Option<f32> {
        self.step
    }

    pub fn scaling(&self) -> ParameterScaling {
        self.scaling
    }

    /// Clamp the given user value into the range.
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.start(), self.end())
    }

    /// Map a normalized \[0,1\] value into the user range. Does not apply steps: use
    /// [`Self::snap_to_legal_value`] to get legal values.
    pub fn convert_from_normalized(&self, normalized: f32) -> f32 {
        let scaled = self.scaling.scale(normalized.clamp(0.0, 1.0));
        self.start() + scaled * (self.end() - self.start())
    }

    /// Map a user range value into a normalized \[0,1\] value.
    pub fn convert_to_normalized(&self, value: f32) -> f32 {
        let linear = (self.clamp(value) - self.start()) / (self.end() - self.start());
        self.scaling.unscale(linear)
    }

    /// Clamp and, when a step is set, quantize the user value to the nearest legal value.
    pub fn snap_to_legal_value(&self, value: f32) -> f32 {
        let value = self.clamp(value);
        match self.step {
            Some(step) => {
                let steps = ((value - self.start()) / step).round();
                self.clamp(self.start() + steps * step)
            }
            None => value,
        }
    }
}

// -------------------------------------------------------------------------------------------------
