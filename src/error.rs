use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by the modulation matrix.
///
/// Only setup and persistence related misuse is reported as error. Contract violations in the
/// audio hot path (unregistered handles, reading values before building the matrix) are debug
/// assertions instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    MatrixAlreadyBuilt,
    SourceNotFound(String),
    ParameterNotFound(String),
    InvalidSmoothingTime(f32),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatrixAlreadyBuilt => write!(f, "Modulation matrix already got built"),
            Self::SourceNotFound(id) => write!(f, "Modulation source '{id}' not found"),
            Self::ParameterNotFound(id) => write!(f, "Parameter '{id}' not found"),
            Self::InvalidSmoothingTime(time) => {
                write!(f, "Invalid parameter smoothing time: {time}")
            }
        }
    }
}
