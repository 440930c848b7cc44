//! Common DSP helpers used by the modulation matrix.

pub mod smoothed;
