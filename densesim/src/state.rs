// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dense storage for the `2^n` complex amplitudes of the simulated register.

use num_complex::Complex64;
use num_traits::{One, Zero};

use crate::{error::Result, nearly_zero::NearlyZero, SimError};

/// Amplitudes ordered so that bit `k` of an index is the basis value of the qubit at position `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    amplitudes: Vec<Complex64>,
}

impl Default for StateVector {
    fn default() -> Self {
        Self {
            amplitudes: vec![Complex64::one()],
        }
    }
}

impl StateVector {
    #[must_use]
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    #[must_use]
    pub fn num_qubits(&self) -> usize {
        self.amplitudes.len().trailing_zeros() as usize
    }

    #[must_use]
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub(crate) fn amplitudes_mut(&mut self) -> &mut [Complex64] {
        &mut self.amplitudes
    }

    /// Swaps in a freshly computed buffer of the same length.
    pub(crate) fn replace(&mut self, amplitudes: Vec<Complex64>) {
        debug_assert_eq!(amplitudes.len(), self.amplitudes.len());
        self.amplitudes = amplitudes;
    }

    /// Back to the zero-qubit state, dropping any accumulated global phase.
    pub fn reset(&mut self) {
        self.amplitudes = vec![Complex64::one()];
    }

    /// Adds a qubit in `|0⟩` at the highest bit position.
    pub fn grow(&mut self) {
        self.insert_bit(self.num_qubits());
    }

    /// Adds a qubit in `|0⟩` at bit `position`: every index gets a zero bit inserted there. The
    /// old amplitudes move as contiguous runs of `2^position`, one copy per run.
    pub fn insert_bit(&mut self, position: usize) {
        debug_assert!(position <= self.num_qubits());
        let run = 1_usize << position;
        let mut grown = vec![Complex64::zero(); self.amplitudes.len() * 2];
        if run >= self.amplitudes.len() {
            grown[..self.amplitudes.len()].copy_from_slice(&self.amplitudes);
        } else {
            for (src, dst) in self
                .amplitudes
                .chunks_exact(run)
                .zip(grown.chunks_exact_mut(2 * run))
            {
                dst[..run].copy_from_slice(src);
            }
        }
        self.amplitudes = grown;
    }

    /// Total probability of the halves where bit `position` is 0 and 1 respectively.
    #[must_use]
    pub fn half_probabilities(&self, position: usize) -> (f64, f64) {
        let run = 1_usize << position;
        self.amplitudes
            .chunks_exact(2 * run)
            .fold((0.0, 0.0), |(zero, one), chunk| {
                (
                    zero + chunk[..run].iter().map(Complex64::norm_sqr).sum::<f64>(),
                    one + chunk[run..].iter().map(Complex64::norm_sqr).sum::<f64>(),
                )
            })
    }

    /// The classical value of the qubit at `position`, or `None` when both halves carry weight.
    #[must_use]
    pub fn classical_value(&self, position: usize) -> Option<bool> {
        let (zero, one) = self.half_probabilities(position);
        if one.is_nearly_zero() {
            Some(false)
        } else if zero.is_nearly_zero() {
            Some(true)
        } else {
            None
        }
    }

    /// Removes the qubit at `position`, keeping the half where it has the given value, and
    /// renormalizes what is left.
    pub(crate) fn remove_bit(&mut self, position: usize, value: bool) {
        let run = 1_usize << position;
        let offset = if value { run } else { 0 };
        let mut shrunk = Vec::with_capacity(self.amplitudes.len() / 2);
        for chunk in self.amplitudes.chunks_exact(2 * run) {
            shrunk.extend_from_slice(&chunk[offset..offset + run]);
        }
        self.amplitudes = shrunk;
        self.renormalize();
    }

    /// Removes the qubit at `position` if it is classical, returning its value.
    /// Returns `None` and leaves the vector untouched otherwise.
    pub fn shrink(&mut self, position: usize) -> Option<bool> {
        let value = self.classical_value(position)?;
        self.remove_bit(position, value);
        Some(value)
    }

    /// Exchanges the roles of bit positions `a` and `b`.
    pub fn swap_bits(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (mask_a, mask_b) = (1_usize << a, 1_usize << b);
        for index in 0..self.amplitudes.len() {
            if index & mask_a != 0 && index & mask_b == 0 {
                self.amplitudes.swap(index, index ^ mask_a ^ mask_b);
            }
        }
    }

    /// Moves the qubit at position `p` to position `permutation[p]`, as a sequence of
    /// transpositions.
    /// # Errors
    /// Returns `SimError::InternalConsistency` if `permutation` is not a permutation of the positions.
    pub fn reorder(&mut self, permutation: &[usize]) -> Result<()> {
        let n = self.num_qubits();
        let mut seen = vec![false; n];
        if permutation.len() != n
            || !permutation
                .iter()
                .all(|&p| p < n && !std::mem::replace(&mut seen[p], true))
        {
            return Err(SimError::InternalConsistency(format!(
                "{permutation:?} is not a permutation of {n} bit positions"
            )));
        }

        let mut pending = permutation.to_vec();
        for position in 0..n {
            while pending[position] != position {
                let destination = pending[position];
                self.swap_bits(position, destination);
                pending.swap(position, destination);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    pub(crate) fn renormalize(&mut self) {
        let norm = self.norm_sqr().sqrt();
        if norm > 0.0 {
            let scale = 1.0 / norm;
            for amplitude in &mut self.amplitudes {
                *amplitude *= scale;
            }
        }
    }
}
