// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Sampling, forced collapse and read-only probability queries.

use num_complex::Complex64;
use num_traits::Zero;
use rand::Rng;
use tracing::debug;

use crate::{
    error::Result,
    fusion::{deposit, extract},
    nearly_zero::{NearlyZero, TOLERANCE},
    QuantumSim, SimError,
};

impl QuantumSim {
    /// Jointly measures the given qubits and collapses the state onto the sampled outcome. A
    /// pending fused gate touching any of them is applied first.
    /// # Errors
    /// Returns `SimError::DuplicateQubitInApplication` or `SimError::UnknownQubit`.
    pub fn measure_qubits(&mut self, ids: &[usize]) -> Result<Vec<bool>> {
        Self::check_for_duplicates(ids)?;
        let positions = self.id_map.positions_of(ids)?;
        if self.fusion.touches(ids) {
            self.run()?;
        }

        let marginals = self.marginal_probabilities(&positions);
        let total: f64 = marginals.iter().sum();
        let draw = self.rng.gen::<f64>() * total;
        let outcome = select_outcome(&marginals, draw);
        self.project(&positions, outcome);

        let values: Vec<bool> = (0..ids.len()).map(|bit| outcome & (1 << bit) != 0).collect();
        debug!(?ids, ?values, "measured qubits");
        Ok(values)
    }

    /// Forces the given qubits into the given classical values and renormalizes.
    /// # Errors
    /// Returns `SimError::LengthMismatch` if the lists differ in length and
    /// `SimError::ImpossibleOutcome` if the requested values have (numerically) zero probability.
    pub fn collapse_wavefunction(&mut self, ids: &[usize], values: &[bool]) -> Result<()> {
        if ids.len() != values.len() {
            return Err(SimError::LengthMismatch {
                expected: ids.len(),
                actual: values.len(),
            });
        }
        Self::check_for_duplicates(ids)?;
        let positions = self.id_map.positions_of(ids)?;
        if self.fusion.touches(ids) {
            self.run()?;
        }

        let outcome = values
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value)
            .fold(0, |accum, (bit, _)| accum | (1 << bit));
        let probability = self.marginal_probabilities(&positions)[outcome];
        if probability < TOLERANCE {
            return Err(SimError::ImpossibleOutcome { probability });
        }
        self.project(&positions, outcome);
        debug!(?ids, ?values, probability, "collapsed wavefunction");
        Ok(())
    }

    /// Probability of the basis state where `ordering[i]` has value `bits[i]`.
    /// # Errors
    /// Returns `SimError::IncompleteOrdering` unless `ordering` lists exactly the allocated qubits
    /// and `SimError::LengthMismatch` if `bits` has a different length.
    pub fn get_probability(&mut self, bits: &[bool], ordering: &[usize]) -> Result<f64> {
        Ok(self.get_amplitude(bits, ordering)?.norm_sqr())
    }

    /// Amplitude of the basis state where `ordering[i]` has value `bits[i]`.
    /// # Errors
    /// Returns `SimError::IncompleteOrdering` unless `ordering` lists exactly the allocated qubits
    /// and `SimError::LengthMismatch` if `bits` has a different length.
    pub fn get_amplitude(&mut self, bits: &[bool], ordering: &[usize]) -> Result<Complex64> {
        self.id_map.check_complete_ordering(ordering)?;
        if bits.len() != ordering.len() {
            return Err(SimError::LengthMismatch {
                expected: ordering.len(),
                actual: bits.len(),
            });
        }
        self.run()?;
        let mut index = 0;
        for (&bit, &id) in bits.iter().zip(ordering) {
            if bit {
                index |= 1 << self.id_map.position_of(id)?;
            }
        }
        Ok(self.state.amplitudes()[index])
    }

    /// Checks the probability of parity measurement in the computational basis for the given set of
    /// qubits, that is the probability of finding an odd number of them in `|1⟩`.
    /// # Errors
    /// Returns `SimError::DuplicateQubitInApplication` or `SimError::UnknownQubit`.
    pub fn joint_probability(&mut self, ids: &[usize]) -> Result<f64> {
        Self::check_for_duplicates(ids)?;
        let mask = self.id_map.mask_of(ids)?;
        if self.fusion.touches(ids) {
            self.run()?;
        }
        Ok(self
            .state
            .amplitudes()
            .iter()
            .enumerate()
            .filter(|(index, _)| (index & mask).count_ones() & 1 != 0)
            .map(|(_, amplitude)| amplitude.norm_sqr())
            .sum())
    }

    /// Whether the qubit is exactly in the `|0⟩` state.
    /// # Errors
    /// Returns `SimError::UnknownQubit` if `id` is not allocated.
    pub fn qubit_is_zero(&mut self, id: usize) -> Result<bool> {
        Ok(self.joint_probability(&[id])?.is_nearly_zero())
    }

    /// Total probability of each assignment of the given positions; entry `k` has bit `i` of `k`
    /// as the value of `positions[i]`.
    fn marginal_probabilities(&self, positions: &[usize]) -> Vec<f64> {
        let mut marginals = vec![0.0; 1 << positions.len()];
        for (index, amplitude) in self.state.amplitudes().iter().enumerate() {
            marginals[extract(index, positions)] += amplitude.norm_sqr();
        }
        marginals
    }

    /// Zeroes every amplitude inconsistent with `outcome` on `positions` and renormalizes.
    fn project(&mut self, positions: &[usize], outcome: usize) {
        let mask = deposit(usize::MAX, positions);
        let wanted = deposit(outcome, positions);
        for (index, amplitude) in self.state.amplitudes_mut().iter_mut().enumerate() {
            if index & mask != wanted {
                *amplitude = Complex64::zero();
            }
        }
        self.state.renormalize();
    }
}

/// First outcome with non-zero probability whose cumulative probability reaches `draw`. Falls back
/// to the last possible outcome when rounding leaves the draw above the final sum.
fn select_outcome(marginals: &[f64], draw: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_possible = 0;
    for (outcome, &probability) in marginals.iter().enumerate() {
        if probability <= 0.0 {
            continue;
        }
        cumulative += probability;
        last_possible = outcome;
        if cumulative >= draw {
            return outcome;
        }
    }
    last_possible
}
