//! Modulation routing between modulation sources and parameters.
//!
//! Provides a modulation matrix architecture where mono or per-voice sources (LFOs, envelopes,
//! MIDI, macros) can route to any number of target parameters with configurable depth, shaping
//! function and polarity.

use std::fmt::{self, Display};

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

pub(crate) mod function;
pub(crate) mod listener;
pub(crate) mod matrix;
pub(crate) mod routing;
pub(crate) mod source;
pub(crate) mod state;
pub(crate) mod voice;

// -------------------------------------------------------------------------------------------------

/// Handle of a modulation source within a [`ModMatrix`](crate::ModMatrix).
///
/// Handles are dense indices into the matrix's source table and stay stable for the lifetime of
/// the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModSrcId(pub(crate) usize);

impl ModSrcId {
    /// Index of the source in registration order.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl Display for ModSrcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source #{}", self.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// Handle of a modulation destination parameter within a [`ModMatrix`](crate::ModMatrix).
///
/// Handles are dense indices into the matrix's parameter table and stay stable for the lifetime
/// of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModDstId(pub(crate) usize);

impl ModDstId {
    /// Index of the parameter in registration order.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl Display for ModDstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "destination #{}", self.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// Defines how the destination polarity of newly created routings gets resolved.
///
/// The mode is only applied when a routing gets created: changing the mode does not alter the
/// polarity of existing routings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PolarityMode {
    /// New routings map to a unipolar \[0,1\] destination range.
    Unipolar,
    /// New routings map to a bipolar \[-1,1\] destination range.
    Bipolar,
    /// New routings use the source's native polarity.
    #[default]
    SameAsSource,
}

impl PolarityMode {
    /// Resolve the destination polarity for a source with the given native polarity.
    pub fn resolve(&self, source_bipolar: bool) -> bool {
        match self {
            PolarityMode::Unipolar => false,
            PolarityMode::Bipolar => true,
            PolarityMode::SameAsSource => source_bipolar,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// String representation of a source or parameter id, as used in persisted states.
pub(crate) fn id_string(id: FourCC) -> String {
    String::from_utf8_lossy(&id.0).into_owned()
}

/// True when the given id string refers to the given source or parameter id.
pub(crate) fn id_matches(id: FourCC, id_string: &str) -> bool {
    id.0.as_slice() == id_string.as_bytes()
}

// -------------------------------------------------------------------------------------------------
