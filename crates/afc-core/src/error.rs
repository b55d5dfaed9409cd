//! AFC error types
//!
//! Programming errors only: misuse of the numerical primitives or an invalid
//! parameter set. Protocol-level failures never appear here — the spectrum
//! inquiry handler always produces a structured response instead.

use thiserror::Error;

/// Result type for AFC computations
pub type AfcResult<T> = Result<T, AfcError>;

/// Errors raised by the incumbent-protection engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AfcError {
    /// Bandwidth fed to a noise or PSD computation was not positive
    #[error("bandwidth must be positive, got {0} Hz")]
    NonPositiveBandwidth(f64),

    /// Distance fed to a path-loss model was not positive
    #[error("distance must be positive, got {0} m")]
    NonPositiveDistance(f64),

    /// Frequency fed to a path-loss model was not positive
    #[error("frequency must be positive, got {0} Hz")]
    NonPositiveFrequency(f64),

    /// ACIR lookup against an empty mask table
    #[error("mask table '{0}' is empty")]
    EmptyMaskTable(&'static str),

    /// Parameter-set construction violated a contract
    #[error("invalid parameter set: {0}")]
    InvalidParameterSet(String),
}

impl AfcError {
    /// All engine errors are invalid-parameter programming errors; none is
    /// retryable. Upstream callers must fix the inputs, not loop.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
