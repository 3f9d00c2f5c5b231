// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use ndarray::Array2;
use num_complex::Complex64;

use crate::{error::Result, MathFunction, PauliString, QuantumSim, SimError};

/// One elementary operation for the simulator, resolved once when it enters the core.
#[derive(Debug, Clone)]
pub enum Operation {
    Allocate(usize),
    Deallocate(usize),
    Unitary {
        matrix: Array2<Complex64>,
        targets: Vec<usize>,
        controls: Vec<usize>,
        /// Must be empty: negative controls are rewritten into positive ones before dispatch.
        negative_controls: Vec<usize>,
    },
    Measure {
        ids: Vec<usize>,
        /// Must be empty.
        controls: Vec<usize>,
    },
    Math {
        function: MathFunction,
        registers: Vec<Vec<usize>>,
        controls: Vec<usize>,
    },
    TimeEvolution {
        hamiltonian: Vec<(PauliString, f64)>,
        time: f64,
        targets: Vec<usize>,
        controls: Vec<usize>,
    },
    /// Commits any buffered gates.
    Flush,
}

impl Operation {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Allocate(_) => "allocate",
            Operation::Deallocate(_) => "deallocate",
            Operation::Unitary { .. } => "unitary",
            Operation::Measure { .. } => "measure",
            Operation::Math { .. } => "math",
            Operation::TimeEvolution { .. } => "time evolution",
            Operation::Flush => "flush",
        }
    }

    /// Builds an uncontrolled gate.
    #[must_use]
    pub fn gate(matrix: Array2<Complex64>, targets: Vec<usize>) -> Self {
        Operation::controlled_gate(matrix, targets, Vec::new())
    }

    #[must_use]
    pub fn controlled_gate(
        matrix: Array2<Complex64>,
        targets: Vec<usize>,
        controls: Vec<usize>,
    ) -> Self {
        Operation::Unitary {
            matrix,
            targets,
            controls,
            negative_controls: Vec::new(),
        }
    }

    #[must_use]
    pub fn measure(ids: Vec<usize>) -> Self {
        Operation::Measure {
            ids,
            controls: Vec::new(),
        }
    }
}

impl QuantumSim {
    /// Executes one operation, returning the outcomes for a measurement.
    /// # Errors
    /// Returns `SimError::NegativeControl` or `SimError::ControlledMeasurement` for operations the
    /// core does not support, and otherwise whatever the corresponding method reports.
    pub fn execute(&mut self, operation: &Operation) -> Result<Option<Vec<bool>>> {
        match operation {
            Operation::Allocate(id) => self.allocate_qubit(*id)?,
            Operation::Deallocate(id) => self.deallocate_qubit(*id)?,
            Operation::Unitary {
                matrix,
                targets,
                controls,
                negative_controls,
            } => {
                if !negative_controls.is_empty() {
                    return Err(SimError::NegativeControl);
                }
                self.apply_controlled_gate(matrix, targets, controls)?;
            }
            Operation::Measure { ids, controls } => {
                if !controls.is_empty() {
                    return Err(SimError::ControlledMeasurement);
                }
                return self.measure_qubits(ids).map(Some);
            }
            Operation::Math {
                function,
                registers,
                controls,
            } => self.emulate_math(function, registers, controls)?,
            Operation::TimeEvolution {
                hamiltonian,
                time,
                targets,
                controls,
            } => self.emulate_time_evolution(hamiltonian, *time, targets, controls)?,
            Operation::Flush => self.run()?,
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        matrix_testing::{h, x},
        Pauli,
    };
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn executes_operation_stream() {
        let mut sim = QuantumSim::new(Some(StdRng::seed_from_u64(7)));
        let ops = [
            Operation::Allocate(0),
            Operation::Allocate(1),
            Operation::gate(h(), vec![0]),
            Operation::controlled_gate(x(), vec![1], vec![0]),
            Operation::TimeEvolution {
                hamiltonian: vec![(vec![(0, Pauli::Z), (1, Pauli::Z)], 0.3)],
                time: 1.0,
                targets: vec![0, 1],
                controls: vec![],
            },
            Operation::Flush,
        ];
        for op in &ops {
            assert_eq!(sim.execute(op).unwrap(), None);
        }
        let outcome = sim.execute(&Operation::measure(vec![0, 1])).unwrap().unwrap();
        assert_eq!(outcome[0], outcome[1]);

        if outcome[0] {
            sim.execute(&Operation::Math {
                function: MathFunction::AddConstant(1),
                registers: vec![vec![0, 1]],
                controls: vec![],
            })
            .unwrap();
        }
        assert_eq!(sim.execute(&Operation::Deallocate(0)).unwrap(), None);
        assert_eq!(sim.execute(&Operation::Deallocate(1)).unwrap(), None);
        assert_eq!(sim.num_qubits(), 0);
    }

    #[test]
    fn unsupported_operations_are_rejected() {
        let mut sim = QuantumSim::default();
        sim.execute(&Operation::Allocate(0)).unwrap();
        sim.execute(&Operation::Allocate(1)).unwrap();
        let negative = Operation::Unitary {
            matrix: x(),
            targets: vec![0],
            controls: vec![],
            negative_controls: vec![1],
        };
        assert_eq!(sim.execute(&negative), Err(SimError::NegativeControl));
        let controlled = Operation::Measure {
            ids: vec![0],
            controls: vec![1],
        };
        assert_eq!(sim.execute(&controlled), Err(SimError::ControlledMeasurement));
        assert!(sim.qubit_is_zero(0).unwrap());
        assert_eq!(negative.name(), "unitary");
    }
}
