//! Error type for the projection engine.
//!
//! Only one condition is surfaced to the caller as a recoverable error:
//! a divisibility, mod, or div atom with modulus zero. Everything else the
//! engine could complain about is a caller contract violation and is checked
//! with `debug_assert!` instead (the caller is trusted in release builds).

use thiserror::Error;

/// Error type for engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MbpError {
    /// A divisibility, mod, or div constraint was given modulus zero.
    #[error("modulo 0 is not defined")]
    ZeroModulus,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MbpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MbpError::ZeroModulus.to_string(), "modulo 0 is not defined");
    }
}
