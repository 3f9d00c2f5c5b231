// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types reported by the state vector simulator.

use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors surfaced by the simulator. Every operation that returns one of these has left the
/// state vector and the qubit map untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// The qubit identifier is already allocated.
    #[error("Qubit id {0} is already allocated. Qubit ids should be unique.")]
    DuplicateQubit(usize),

    /// The qubit identifier does not correspond to an allocated qubit.
    #[error("Unable to find qubit with id {0}.")]
    UnknownQubit(usize),

    /// The same qubit appears more than once among the targets and controls of one operation.
    #[error("Duplicate qubit id '{0}' found in application.")]
    DuplicateQubitInApplication(usize),

    /// An index map update would no longer be a permutation of the bit positions.
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    /// The qubit is still in superposition or entangled and cannot be released.
    #[error("Qubit {0} has not been measured / uncomputed and is not in a classical state.")]
    QubitNotClassical(usize),

    /// A matrix or amplitude buffer does not have the size implied by the qubits it acts on.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension encountered.
        actual: usize,
    },

    /// The gate acts on more target qubits than the kernel supports.
    #[error("Gates on {0} target qubits are not supported, at most 5 targets are allowed.")]
    UnsupportedGateSize(usize),

    /// Negative controls must be rewritten into positive controls before reaching the simulator.
    #[error("Negative controls are not supported by the simulator.")]
    NegativeControl,

    /// Measurements cannot be controlled.
    #[error("Cannot have control qubits with a measurement.")]
    ControlledMeasurement,

    /// The requested classical outcome has (numerically) zero probability.
    #[error("Invalid collapse, outcome has probability {probability:e}.")]
    ImpossibleOutcome {
        /// Total probability of the requested outcome.
        probability: f64,
    },

    /// A qubit ordering does not cover exactly the allocated qubits.
    #[error("Ordering must be a permutation of all {expected} allocated qubits, got {actual} entries.")]
    IncompleteOrdering {
        /// Number of allocated qubits.
        expected: usize,
        /// Number of entries in the supplied ordering.
        actual: usize,
    },

    /// A list of bits or values does not match the length of the qubit list.
    #[error("Length mismatch: expected {expected} entries, got {actual}")]
    LengthMismatch {
        /// Expected number of entries.
        expected: usize,
        /// Actual number of entries.
        actual: usize,
    },

    /// A Pauli term refers to a qubit index beyond the supplied register.
    #[error("Pauli term acts on index {index} but only {len} qubits were supplied.")]
    TermOutOfRange {
        /// Index used by the term.
        index: usize,
        /// Number of qubits supplied.
        len: usize,
    },

    /// An argument outside the accepted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A classical function mapped two basis states onto the same basis state.
    #[error("Classical function is not a permutation of the basis states.")]
    NotAPermutation,

    /// A configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::DimensionMismatch {
            expected: 4,
            actual: 8,
        };
        assert!(err.to_string().contains('4'));
        assert!(err.to_string().contains('8'));

        assert_eq!(
            SimError::DuplicateQubitInApplication(3).to_string(),
            "Duplicate qubit id '3' found in application."
        );
        assert!(SimError::UnsupportedGateSize(6).to_string().contains('6'));
    }
}
