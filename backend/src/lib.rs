// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![deny(clippy::all, clippy::pedantic)]

//! # Execution engine for dense state vector simulation.
//! This library sits between a stream of elementary operations and the `quantum_dense_sim`
//! simulator. It decides which operations the simulator can take directly, forwards them in
//! order, and keeps the outcome of every measurement both per qubit and as an ordered record.

pub mod gates;

use bitvec::prelude::*;
use quantum_dense_sim::{config::MAX_TARGET_QUBITS, Operation, QuantumSim, SimConfig, SimError};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Simulator(#[from] SimError),

    #[error("operation not supported by the simulator: {0}")]
    Unavailable(String),
}

pub struct Engine {
    sim: QuantumSim,

    /// Every measured bit, in the order the measurements were received.
    res: BitVec,

    /// The most recent outcome for each measured qubit id.
    results: FxHashMap<usize, bool>,
}

impl Engine {
    /// Creates an engine over a fresh simulator built from `config`.
    /// # Errors
    /// Returns `EngineError::Simulator` if the configuration is invalid.
    pub fn new(config: SimConfig) -> Result<Self, EngineError> {
        Ok(Self {
            sim: QuantumSim::with_config(config)?,
            res: bitvec![],
            results: FxHashMap::default(),
        })
    }

    /// Releases every qubit and forgets recorded results. The random number generator carries on
    /// from where it was, so consecutive shots draw different outcomes.
    pub fn reset(&mut self) {
        self.sim.reset();
        self.res.clear();
        self.results.clear();
    }

    pub fn set_rng_seed(&mut self, seed: u64) {
        self.sim.set_rng_seed(seed);
    }

    /// Whether the simulator can execute `operation` as it stands.
    #[must_use]
    pub fn is_available(operation: &Operation) -> bool {
        match operation {
            Operation::Unitary {
                matrix,
                targets,
                negative_controls,
                ..
            } => {
                let k = targets.len();
                k <= MAX_TARGET_QUBITS
                    && matrix.dim() == (1 << k, 1 << k)
                    && negative_controls.is_empty()
            }
            Operation::Measure { controls, .. } => controls.is_empty(),
            Operation::Allocate(_)
            | Operation::Deallocate(_)
            | Operation::Math { .. }
            | Operation::TimeEvolution { .. }
            | Operation::Flush => true,
        }
    }

    /// Executes `operations` in order. The whole batch is checked for availability before the
    /// first one runs.
    /// # Errors
    /// Returns `EngineError::Unavailable` for the first operation the simulator cannot take and
    /// `EngineError::Simulator` if the simulator rejects one; operations before it stay applied.
    pub fn receive(&mut self, operations: &[Operation]) -> Result<(), EngineError> {
        if let Some(operation) = operations.iter().find(|op| !Self::is_available(op)) {
            warn!(operation = operation.name(), "rejected unavailable operation");
            return Err(EngineError::Unavailable(operation.name().to_string()));
        }
        for operation in operations {
            let Some(outcomes) = self.sim.execute(operation)? else {
                continue;
            };
            if let Operation::Measure { ids, .. } = operation {
                for (&id, &outcome) in ids.iter().zip(&outcomes) {
                    self.results.insert(id, outcome);
                    self.res.push(outcome);
                }
                debug!(?ids, ?outcomes, "recorded measurement");
            }
        }
        Ok(())
    }

    /// The last recorded outcome of measuring `id`, if it has been measured since the last reset.
    #[must_use]
    pub fn measurement_result(&self, id: usize) -> Option<bool> {
        self.results.get(&id).copied()
    }

    #[must_use]
    pub fn results(&self) -> &BitVec {
        &self.res
    }

    #[must_use]
    pub fn sim(&self) -> &QuantumSim {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut QuantumSim {
        &mut self.sim
    }
}
