//! Error taxonomy and the collective-abort reporting path.

use thiserror::Error;

/// Numeric error code reported alongside every diagnostic, and used as the
/// process's abort exit status.
pub type ErrorCode = u32;

/// All failure modes a public operation on this crate's types can raise.
///
/// Every variant is fatal at the point of detection (see `spec.md` §7):
/// argument-domain and numerical-precondition violations invoke
/// [`report_and_abort`] immediately; there is no recoverable path on the
/// public API. Callers needing a recoverable path must validate before
/// calling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QDistError {
    /// A qubit index, control index, or amplitude index fell outside the
    /// valid range for the current `MultiQubit`.
    #[error("qubit index {index} out of range for {num_qubits} qubits")]
    QubitOutOfRange {
        /// The offending index.
        index: usize,
        /// The number of qubits in the state.
        num_qubits: usize,
    },

    /// A control qubit coincided with the target qubit.
    #[error("control qubit {qubit} must differ from target qubit")]
    ControlEqualsTarget {
        /// The shared qubit index.
        qubit: usize,
    },

    /// A control-qubit bitmask was empty, intersected the target bit, or
    /// exceeded the documented exclusive bound of `2^n - 1`.
    #[error("control mask {mask:#x} is invalid: {reason}")]
    InvalidControlMask {
        /// The rejected mask.
        mask: u64,
        /// Why it was rejected.
        reason: String,
    },

    /// `findProbabilityOfOutcome` / `collapseToOutcome` received an outcome
    /// that was neither 0 nor 1.
    #[error("measurement outcome {outcome} is not 0 or 1")]
    InvalidOutcome {
        /// The offending outcome value.
        outcome: u8,
    },

    /// A supplied 2x2 matrix was not unitary within tolerance.
    #[error("supplied matrix is not unitary within tolerance {tolerance:e} (deviation {deviation:e})")]
    NotUnitary {
        /// The tolerance the check was run against.
        tolerance: f64,
        /// The observed deviation from unitarity.
        deviation: f64,
    },

    /// A supplied compact `(alpha, beta)` pair did not satisfy
    /// `|alpha|^2 + |beta|^2 = 1` within tolerance.
    #[error("compact unitary pair is not normalized within tolerance {tolerance:e} (|a|^2+|b|^2={norm:e})")]
    NotNormalized {
        /// The tolerance the check was run against.
        tolerance: f64,
        /// The observed `|alpha|^2 + |beta|^2`.
        norm: f64,
    },

    /// `collapseToOutcome` was attempted on an outcome whose probability is
    /// below the floating epsilon.
    #[error("collapse probability {probability:e} is below epsilon {epsilon:e}")]
    NegligibleProbability {
        /// The computed probability of the requested outcome.
        probability: f64,
        /// The epsilon threshold it fell below.
        epsilon: f64,
    },

    /// The rank/group partitioning constraints in `spec.md` §3 were
    /// violated: `R` not a power of two, `R` not dividing `2^n`, or
    /// `n < log2(R)`.
    #[error("{num_qubits} qubits cannot be partitioned across {num_ranks} ranks: {reason}")]
    InvalidPartitioning {
        /// The requested qubit count.
        num_qubits: usize,
        /// The requested rank count.
        num_ranks: usize,
        /// Why the partitioning is invalid.
        reason: String,
    },

    /// The environment was initialized more than once. Reported, not fatal;
    /// never constructed by [`report_and_abort`].
    #[error("environment already initialized")]
    AlreadyInitialized,

    /// The environment was finalized more than once. Reported, not fatal.
    #[error("environment already finalized")]
    AlreadyFinalized,

    /// An operation was attempted before `initialize` or after `finalize`.
    #[error("environment is not active: {context}")]
    EnvironmentInactive {
        /// Where the misuse was detected.
        context: String,
    },

    /// The underlying message-passing transport failed. Always fatal.
    #[error("transport failure exchanging with rank {peer}: {message}")]
    Transport {
        /// The peer rank the exchange was with.
        peer: usize,
        /// The transport-reported failure.
        message: String,
    },

    /// The process group was collectively aborted by some rank.
    #[error("collective abort with code {code}: {message}")]
    Aborted {
        /// The numeric code the aborting rank reported.
        code: ErrorCode,
        /// The diagnostic message the aborting rank printed.
        message: String,
    },
}

impl QDistError {
    /// The stable numeric code for this error, used as the abort exit
    /// status and for machine-readable diagnostics.
    pub fn code(&self) -> ErrorCode {
        match self {
            QDistError::QubitOutOfRange { .. } => 1,
            QDistError::ControlEqualsTarget { .. } => 2,
            QDistError::InvalidControlMask { .. } => 3,
            QDistError::InvalidOutcome { .. } => 4,
            QDistError::NotUnitary { .. } => 5,
            QDistError::NotNormalized { .. } => 6,
            QDistError::NegligibleProbability { .. } => 7,
            QDistError::InvalidPartitioning { .. } => 8,
            QDistError::AlreadyInitialized => 9,
            QDistError::AlreadyFinalized => 10,
            QDistError::EnvironmentInactive { .. } => 11,
            QDistError::Transport { .. } => 12,
            QDistError::Aborted { code, .. } => *code,
        }
    }

    /// `true` for the two environment-misuse variants the spec marks
    /// "reported, not fatal".
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            QDistError::AlreadyInitialized | QDistError::AlreadyFinalized
        )
    }
}

/// Prints the `function_name: message` diagnostic on the calling rank and
/// returns a [`QDistError::Aborted`] carrying the same code, for the caller
/// to fold into the collective abort path (see
/// [`crate::env::Environment::abort`]).
///
/// Recoverable variants ([`QDistError::is_recoverable`]) are logged as
/// warnings and returned unchanged, without wrapping into `Aborted`.
pub fn report_and_abort(function_name: &str, rank: usize, err: QDistError) -> QDistError {
    if err.is_recoverable() {
        tracing::warn!(rank, function_name, %err, "non-fatal environment misuse");
        return err;
    }
    let code = err.code();
    let message = format!("{function_name}: {err}");
    tracing::error!(rank, function_name, code, "{message}");
    QDistError::Aborted { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_distinct() {
        let errs = [
            QDistError::QubitOutOfRange { index: 0, num_qubits: 1 },
            QDistError::ControlEqualsTarget { qubit: 0 },
            QDistError::InvalidControlMask { mask: 0, reason: String::new() },
            QDistError::InvalidOutcome { outcome: 2 },
            QDistError::NotUnitary { tolerance: 1e-9, deviation: 1.0 },
            QDistError::NotNormalized { tolerance: 1e-9, norm: 2.0 },
            QDistError::NegligibleProbability { probability: 0.0, epsilon: 1e-12 },
            QDistError::InvalidPartitioning { num_qubits: 1, num_ranks: 3, reason: String::new() },
            QDistError::AlreadyInitialized,
            QDistError::AlreadyFinalized,
            QDistError::EnvironmentInactive { context: String::new() },
            QDistError::Transport { peer: 0, message: String::new() },
        ];
        let mut codes: Vec<u32> = errs.iter().map(QDistError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
    }

    #[test]
    fn report_and_abort_wraps_fatal_errors() {
        let err = QDistError::QubitOutOfRange { index: 5, num_qubits: 2 };
        let code = err.code();
        let wrapped = report_and_abort("sigmaX", 0, err);
        match wrapped {
            QDistError::Aborted { code: c, message } => {
                assert_eq!(c, code);
                assert!(message.starts_with("sigmaX: "));
            }
            other => panic!("expected Aborted, got {other:?}"),
        }
    }

    #[test]
    fn report_and_abort_passes_through_recoverable_errors() {
        let err = QDistError::AlreadyInitialized;
        let returned = report_and_abort("initialize", 0, err.clone());
        assert_eq!(returned, err);
    }
}
