#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod error;
mod modulation;
mod parameter;

// public, flat re-exports
pub use error::Error;

pub use parameter::{
    ConversionFunction, FloatParameter, Parameter, ParameterRange, ParameterScaling,
};

pub use modulation::{
    function::{shape, ModFunction},
    listener::ModMatrixListener,
    matrix::{ModMatrix, DEFAULT_SAMPLE_RATE, DEFAULT_SMOOTHING_TIME},
    state::{ModMatrixState, ModulationRecord, MOD_MATRIX_CONTAINER},
    voice::{ModVoice, VoiceId},
    ModDstId, ModSrcId, PolarityMode,
};

// public mods
pub mod utils;
