//! CouplerError: Unified error type for spectral-coupler public APIs
//!
//! Every public operation returns `Result<_, CouplerError>`. Configuration
//! errors are fatal for a coupled run: every process must hold consistent
//! state, so callers abort the whole run when [`CouplerError::is_fatal`]
//! reports true.

use thiserror::Error;

/// Unified error type for coupler operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CouplerError {
    /// Inconsistent descriptors or construction parameters.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A requested mode combination is not supported.
    #[error("Unsupported configuration: {0}")]
    Unsupported(&'static str),
    /// Halo coordinates or values required at an open boundary were not supplied.
    #[error("Missing halo data at {edge} edge of outer index {outer}")]
    MissingHalo { edge: &'static str, outer: usize },
    /// An open line end was reached with no edge filler to supply halo values.
    #[error("No edge filler for the open {edge} end of the field lines")]
    MissingEdgeFill { edge: &'static str },
    /// Caller supplied data that violates a documented precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A buffer did not have the length implied by its layout.
    #[error("Length mismatch in {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Interpolation was requested while preprocessing is disabled.
    #[error("Interpolation requested but preprocessing is disabled")]
    PreprocessingDisabled,
    /// A channel operation was issued in the wrong communication phase.
    #[error("Phase violation: {0}")]
    PhaseViolation(&'static str),
    /// A field with this name is already registered on the channel.
    #[error("Field `{0}` already exists")]
    DuplicateField(String),
    /// No field with this name is registered on the channel.
    #[error("Unknown field `{0}`")]
    UnknownField(String),
    /// Failure reported by the transport collaborator.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl CouplerError {
    /// True for errors that leave the coupled run without a consistent state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CouplerError::Config(_)
                | CouplerError::Unsupported(_)
                | CouplerError::MissingHalo { .. }
                | CouplerError::MissingEdgeFill { .. }
                | CouplerError::Transport(_)
        )
    }

    pub(crate) fn expect_len(
        what: &'static str,
        expected: usize,
        found: usize,
    ) -> Result<(), CouplerError> {
        if expected == found {
            Ok(())
        } else {
            Err(CouplerError::LengthMismatch {
                what,
                expected,
                found,
            })
        }
    }
}
