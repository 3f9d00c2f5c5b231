// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # Dense State Vector Quantum Simulator
//! This library keeps the full `2^n` amplitude vector of the allocated register and applies
//! arbitrarily controlled gates on up to five target qubits to it, optionally fusing runs of small
//! gates into one pass over the vector. It also emulates classical arithmetic and Pauli-sum time
//! evolution directly on the amplitudes, without building gate matrices.

pub mod config;
pub mod error;
pub mod exp;
mod fusion;
mod kernel;
pub mod math;
mod measure;
mod nearly_zero;
pub mod operation;
pub mod qubit_map;
pub mod state;

// Reference matrices and full-system checks for the transformations implemented here.
#[cfg(test)]
mod matrix_testing;

pub use crate::config::SimConfig;
pub use crate::error::{Result, SimError};
pub use crate::exp::{Pauli, PauliString};
pub use crate::kernel::matrix_from_entries;
pub use crate::math::MathFunction;
pub use crate::operation::Operation;

use crate::{fusion::Fusion, nearly_zero::NearlyZero, qubit_map::QubitMap, state::StateVector};
use ndarray::Array2;
use num_complex::Complex64;
use rand::{rngs::StdRng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// The `QuantumSim` struct contains the necessary state for tracking the simulation. Each instance of a
/// `QuantumSim` represents an independent simulation.
pub struct QuantumSim {
    /// The amplitudes of the allocated register.
    pub(crate) state: StateVector,

    /// The mapping from qubit identifiers to bit positions of the state vector index.
    pub(crate) id_map: QubitMap,

    /// The random number generator used for measurements.
    rng: StdRng,

    /// Gates waiting to be applied as one fused matrix.
    fusion: Fusion,

    config: SimConfig,
}

impl Default for QuantumSim {
    fn default() -> Self {
        Self::new(None)
    }
}

impl QuantumSim {
    /// Creates a new simulator with no qubits allocated and the default configuration.
    #[must_use]
    pub fn new(rng: Option<StdRng>) -> Self {
        QuantumSim {
            state: StateVector::default(),
            id_map: QubitMap::default(),
            rng: rng.unwrap_or_else(StdRng::from_entropy),
            fusion: Fusion::default(),
            config: SimConfig::default(),
        }
    }

    /// Creates a new simulator with the given configuration, seeding the generator from it.
    /// # Errors
    /// Returns `SimError::InvalidConfig` if the configuration is inconsistent.
    pub fn with_config(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Ok(QuantumSim {
            rng,
            config,
            ..Self::new(None)
        })
    }

    /// Sets the seed for the random number generator used for measurements.
    pub fn set_rng_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn take_rng(&mut self) -> StdRng {
        std::mem::replace(&mut self.rng, StdRng::from_entropy())
    }

    /// Drops every qubit and any buffered gates, keeping the generator and configuration.
    pub fn reset(&mut self) {
        self.state = StateVector::default();
        self.id_map = QubitMap::default();
        self.fusion = Fusion::default();
        debug!("reset simulator");
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn num_qubits(&self) -> usize {
        self.id_map.len()
    }

    /// Adds the qubit `id` in the `|0⟩` state at the highest bit position.
    /// # Errors
    /// Returns `SimError::DuplicateQubit` if `id` is already allocated.
    pub fn allocate_qubit(&mut self, id: usize) -> Result<()> {
        let position = self.id_map.allocate(id)?;
        self.state.grow();
        debug!(id, position, qubits = self.id_map.len(), "allocated qubit");
        Ok(())
    }

    /// Releases the qubit `id`, which must be in a classical state. The remaining positions are
    /// compacted and the vector halves.
    /// # Errors
    /// Returns `SimError::UnknownQubit` if `id` is not allocated and
    /// `SimError::QubitNotClassical` if it is still in superposition or entangled.
    pub fn deallocate_qubit(&mut self, id: usize) -> Result<()> {
        self.run()?;
        let position = self.id_map.position_of(id)?;
        let value = self
            .state
            .shrink(position)
            .ok_or(SimError::QubitNotClassical(id))?;
        self.id_map.deallocate(id)?;
        if self.id_map.is_empty() {
            // With nothing allocated the state goes back to a clean ground, dropping any phase.
            self.state.reset();
        }
        debug_assert!(self.id_map.is_bijective());
        debug!(id, position, value, "deallocated qubit");
        Ok(())
    }

    /// Applies `matrix` to `targets` on the subspace where every qubit in `controls` is `|1⟩`.
    /// Target `i` is bit `i` of the matrix's row and column index. With fusion enabled the gate
    /// may be held back and combined with the gates around it.
    /// # Errors
    /// Returns `SimError::DuplicateQubitInApplication`, `SimError::UnknownQubit`,
    /// `SimError::UnsupportedGateSize` or `SimError::DimensionMismatch`, leaving the state untouched.
    pub fn apply_controlled_gate(
        &mut self,
        matrix: &Array2<Complex64>,
        targets: &[usize],
        controls: &[usize],
    ) -> Result<()> {
        let all: Vec<usize> = targets.iter().chain(controls).copied().collect();
        Self::check_for_duplicates(&all)?;
        self.id_map.positions_of(&all)?;
        kernel::validate(matrix, targets.len())?;

        if !self.config.gate_fusion {
            return self.apply_now(matrix, targets, controls);
        }

        if !self
            .fusion
            .try_insert(matrix, targets, controls, self.config.fusion_max_qubits)
        {
            self.run()?;
            let inserted = self.fusion.try_insert(
                matrix,
                targets,
                controls,
                self.config.fusion_max_qubits,
            );
            debug_assert!(inserted);
        }
        if self.fusion.num_qubits() >= self.config.fusion_min_qubits
            || self.fusion.gate_count() >= self.config.fusion_max_gates
        {
            self.run()?;
        }
        Ok(())
    }

    /// Commits the pending fused gate, if any.
    /// # Errors
    /// Returns `SimError::UnknownQubit` if a buffered qubit is no longer allocated, which the
    /// simulator never allows to happen.
    pub fn run(&mut self) -> Result<()> {
        let Some(gate) = self.fusion.take() else {
            return Ok(());
        };
        debug!(
            qubits = gate.targets.len(),
            controls = gate.controls.len(),
            gates = gate.gate_count,
            "applying fused gate"
        );
        self.apply_now(&gate.matrix, &gate.targets, &gate.controls)
    }

    fn apply_now(
        &mut self,
        matrix: &Array2<Complex64>,
        targets: &[usize],
        controls: &[usize],
    ) -> Result<()> {
        let positions = self.id_map.positions_of(targets)?;
        let ctrl_mask = self.id_map.mask_of(controls)?;
        let parallel = self.use_parallel();
        kernel::apply(
            self.state.amplitudes_mut(),
            matrix,
            &positions,
            ctrl_mask,
            parallel,
        );
        Ok(())
    }

    pub(crate) fn use_parallel(&self) -> bool {
        self.id_map.len() >= self.config.parallel_min_qubits
    }

    /// Whether the qubit `id` has a definite classical value.
    /// # Errors
    /// Returns `SimError::UnknownQubit` if `id` is not allocated.
    pub fn is_classical(&mut self, id: usize) -> Result<bool> {
        self.run()?;
        let position = self.id_map.position_of(id)?;
        Ok(self.state.classical_value(position).is_some())
    }

    /// The classical value of the qubit `id`.
    /// # Errors
    /// Returns `SimError::UnknownQubit` if `id` is not allocated and
    /// `SimError::QubitNotClassical` if it has no definite value.
    pub fn get_classical_value(&mut self, id: usize) -> Result<bool> {
        self.run()?;
        let position = self.id_map.position_of(id)?;
        self.state
            .classical_value(position)
            .ok_or(SimError::QubitNotClassical(id))
    }

    /// Swaps the bit positions of two qubits in the id map, which acts as a SWAP gate without
    /// touching the amplitudes.
    /// # Errors
    /// Returns `SimError::UnknownQubit` if either id is not allocated.
    pub fn swap_qubit_ids(&mut self, a: usize, b: usize) -> Result<()> {
        self.run()?;
        let position = self.id_map.position_of(b)?;
        self.id_map.remap(a, position)?;
        debug_assert!(self.id_map.is_bijective());
        Ok(())
    }

    /// Returns a copy of the amplitudes with bit `k` of every index belonging to the `k`-th smallest
    /// qubit id, along with the number of allocated qubits.
    /// # Errors
    /// Returns `SimError::InternalConsistency` if the id map is not a bijection.
    pub fn get_state(&mut self) -> Result<(Vec<Complex64>, usize)> {
        self.run()?;
        let by_position = self.id_map.ids_by_position();
        let mut sorted = by_position.clone();
        sorted.sort_unstable();
        let permutation: Vec<usize> = by_position
            .iter()
            .map(|&id| sorted.partition_point(|&other| other < id))
            .collect();
        self.state.reorder(&permutation)?;
        self.id_map.assign_ordering(&sorted)?;
        Ok((self.state.amplitudes().to_vec(), sorted.len()))
    }

    /// Renders the non-zero amplitudes, indexed as in [`QuantumSim::get_state`].
    /// # Errors
    /// Returns `SimError::InternalConsistency` if the id map is not a bijection.
    pub fn dump(&mut self) -> Result<String> {
        let (state, _) = self.get_state()?;
        let mut output = String::from("STATE: [ ");
        for (index, amplitude) in state.iter().enumerate() {
            if !amplitude.is_nearly_zero() {
                output.push_str(&format!("|{index}\u{27e9}: {amplitude}, "));
            }
        }
        output.push_str("]\n");
        Ok(output)
    }

    /// Direct access to the id map and the raw amplitudes.
    /// # Errors
    /// Returns an error only if committing pending gates fails.
    pub fn cheat(&mut self) -> Result<(FxHashMap<usize, usize>, &[Complex64])> {
        self.run()?;
        Ok((self.id_map.to_map(), self.state.amplitudes()))
    }

    /// Replaces the whole state: `ordering[i]` becomes bit `i` of the index of `amplitudes`. The
    /// amplitudes are taken as given, without normalization.
    /// # Errors
    /// Returns `SimError::IncompleteOrdering` unless `ordering` lists exactly the allocated qubits
    /// and `SimError::DimensionMismatch` if `amplitudes` does not have `2^n` entries.
    pub fn set_wavefunction(&mut self, amplitudes: Vec<Complex64>, ordering: &[usize]) -> Result<()> {
        self.run()?;
        self.id_map.check_complete_ordering(ordering)?;
        let expected = 1_usize << ordering.len();
        if amplitudes.len() != expected {
            return Err(SimError::DimensionMismatch {
                expected,
                actual: amplitudes.len(),
            });
        }
        self.id_map.assign_ordering(ordering)?;
        self.state.replace(amplitudes);
        debug!(qubits = ordering.len(), "replaced wavefunction");
        Ok(())
    }

    pub(crate) fn check_for_duplicates(ids: &[usize]) -> Result<()> {
        let mut seen = FxHashSet::default();
        match ids.iter().find(|id| !seen.insert(**id)) {
            Some(&duplicate) => Err(SimError::DuplicateQubitInApplication(duplicate)),
            None => Ok(()),
        }
    }
}
