//! Shaping functions applied to modulation source samples.

use std::str::FromStr;

// -------------------------------------------------------------------------------------------------

/// Easing curve which shapes a modulation source sample before it gets weighted by a routing's
/// depth.
///
/// Each `Inv` variant complements the source value (`1 - v`) before applying the easing curve of
/// its base variant. Variant names, as used in persisted routing states, are camel case: e.g.
/// `"linear"` or `"invSineInOut"`.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::EnumCount,
    strum::VariantNames,
)]
#[strum(serialize_all = "camelCase")]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum ModFunction {
    #[default]
    Linear,

    QuadraticIn,
    QuadraticInOut,
    QuadraticOut,

    SineIn,
    SineInOut,
    SineOut,

    ExponentialIn,
    ExponentialInOut,
    ExponentialOut,

    InvLinear,

    InvQuadraticIn,
    InvQuadraticInOut,
    InvQuadraticOut,

    InvSineIn,
    InvSineInOut,
    InvSineOut,

    InvExponentialIn,
    InvExponentialInOut,
    InvExponentialOut,
}

impl ModFunction {
    /// Resolve a function from its persisted name. Unknown names fall back to `Linear`.
    pub fn from_name(name: &str) -> Self {
        Self::from_str(name).unwrap_or_else(|_| {
            log::warn!("Unknown modulation function '{name}', falling back to linear");
            Self::Linear
        })
    }

    /// True for the variants which complement the source value before easing.
    pub fn is_inverted(&self) -> bool {
        matches!(
            self,
            Self::InvLinear
                | Self::InvQuadraticIn
                | Self::InvQuadraticInOut
                | Self::InvQuadraticOut
                | Self::InvSineIn
                | Self::InvSineInOut
                | Self::InvSineOut
                | Self::InvExponentialIn
                | Self::InvExponentialInOut
                | Self::InvExponentialOut
        )
    }

    /// Apply the easing curve to a unipolar \[0,1\] value, without any complement.
    #[inline]
    fn ease(&self, v: f32) -> f32 {
        match self {
            Self::Linear | Self::InvLinear => v,
            Self::QuadraticIn | Self::InvQuadraticIn => simple_easing::quad_in(v),
            Self::QuadraticInOut | Self::InvQuadraticInOut => simple_easing::quad_in_out(v),
            Self::QuadraticOut | Self::InvQuadraticOut => simple_easing::quad_out(v),
            Self::SineIn | Self::InvSineIn => simple_easing::sine_in(v),
            Self::SineInOut | Self::InvSineInOut => simple_easing::sine_in_out(v),
            Self::SineOut | Self::InvSineOut => simple_easing::sine_out(v),
            Self::ExponentialIn | Self::InvExponentialIn => simple_easing::expo_in(v),
            Self::ExponentialInOut | Self::InvExponentialInOut => simple_easing::expo_in_out(v),
            Self::ExponentialOut | Self::InvExponentialOut => simple_easing::expo_out(v),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Shape a raw modulation source sample with the given function and polarities.
///
/// Bipolar source values get mapped from \[-1,1\] to \[0,1\] first, then the value is optionally
/// complemented and eased. With a bipolar destination mapping, the shaped \[0,1\] value is mapped
/// back to \[-1,1\].
#[inline]
pub fn shape(value: f32, function: ModFunction, bipolar_source: bool, bipolar_dest: bool) -> f32 {
    let mut v = value;
    if bipolar_source {
        v = (v + 1.0) * 0.5;
    }
    if function.is_inverted() {
        v = 1.0 - v;
    }
    v = function.ease(v);
    if bipolar_dest {
        v = v * 2.0 - 1.0;
    }
    v
}

// -------------------------------------------------------------------------------------------------
