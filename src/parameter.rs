//! Parameter descriptors and the host parameter contract used by the modulation matrix.

use std::{fmt::Debug, sync::Arc};

use four_cc::FourCC;

use crate::modulation::ModDstId;

// -------------------------------------------------------------------------------------------------

/// Optional custom conversion, applied to user range values after modulation got applied,
/// e.g. to convert a note number to a frequency in Hz.
pub type ConversionFunction = Arc<dyn Fn(f32) -> f32 + Send + Sync>;

// -------------------------------------------------------------------------------------------------

/// Describes a host-controlled, automatable parameter which can receive modulation from a
/// [`ModMatrix`](crate::ModMatrix).
///
/// Parameters are shared between the host, UI and audio threads, so implementations must be
/// `Send` and `Sync` and should store their values lock-free.
pub trait Parameter: Debug + Send + Sync {
    /// The stable, unique id of the parameter. Used to identify modulation destinations in
    /// persisted routing states.
    fn id(&self) -> FourCC;

    /// The name of the parameter.
    fn name(&self) -> &'static str;

    /// Current raw value of the parameter, expressed as normalized value in range \[0,1\].
    fn normalized_value(&self) -> f32;

    /// Default value of parameter, expressed as normalized value in range \[0,1\].
    fn default_normalized_value(&self) -> f32;

    /// Convert a normalized value to the parameter's user facing value range.
    fn denormalize_value(&self, normalized: f32) -> f32;

    /// Convert a user range value to a normalized value.
    fn normalize_value(&self, value: f32) -> f32;

    /// Quantize the given user range value to a legal value, e.g. to apply step sizes.
    fn snap_to_legal_value(&self, value: f32) -> f32;

    /// Optional custom conversion for user values.
    fn conversion_function(&self) -> Option<&ConversionFunction> {
        None
    }

    /// Internal parameters are not exposed to the host and must not be read via the mono
    /// [`ModMatrix::value`](crate::ModMatrix::value).
    fn is_internal(&self) -> bool {
        false
    }

    /// The modulation index which got assigned by the matrix, if any.
    fn mod_index(&self) -> Option<ModDstId>;

    /// Called by the matrix when the parameter gets registered as modulation destination.
    fn set_mod_index(&self, index: ModDstId);

    /// Convert the given normalized value to a string value.
    fn normalized_value_to_string(&self, normalized: f32, include_unit: bool) -> String;
}

// -------------------------------------------------------------------------------------------------

mod float;
pub use float::FloatParameter;

mod range;
pub use range::{ParameterRange, ParameterScaling};
