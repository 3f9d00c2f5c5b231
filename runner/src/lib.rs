// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![deny(clippy::all, clippy::pedantic)]

mod cli;
pub use cli::main;

use qsim_backend::{gates, Engine};
use quantum_dense_sim::{MathFunction, Operation, SimConfig};
use std::{collections::BTreeMap, f64::consts::PI, io::Write, str::FromStr};
use tracing::{debug, info};

/// Largest register the runner will simulate.
pub const MAX_QUBITS: u32 = 30;

/// The built-in circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Hadamard on the first qubit followed by a CNOT chain.
    Ghz,

    /// Prepares the Fourier state of an alternating bit pattern and inverts it with the inverse
    /// quantum Fourier transform, so every shot reads back the pattern.
    Qft,

    /// Adds 3 modulo `2^n - 1` to the basis state `2^n - 2`.
    ModAdd,
}

impl FromStr for Workload {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "ghz" => Ok(Self::Ghz),
            "qft" => Ok(Self::Qft),
            "modadd" => Ok(Self::ModAdd),
            _ => Err(format!("Unknown workload '{name}'.")),
        }
    }
}

impl Workload {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ghz => "ghz",
            Self::Qft => "qft",
            Self::ModAdd => "modadd",
        }
    }

    /// The operations for one shot on `n` qubits with ids `0..n`, ending in a measurement of every
    /// qubit and their release.
    #[must_use]
    pub fn operations(self, n: usize) -> Vec<Operation> {
        let qubits: Vec<usize> = (0..n).collect();
        let mut ops: Vec<Operation> = qubits.iter().map(|&q| Operation::Allocate(q)).collect();
        match self {
            Self::Ghz => {
                ops.push(Operation::gate(gates::h(), vec![0]));
                for q in 1..n {
                    ops.push(Operation::controlled_gate(gates::x(), vec![q], vec![q - 1]));
                }
            }
            Self::Qft => {
                let pattern = alternating_pattern(n);
                #[allow(clippy::cast_precision_loss)]
                let size = (1_u64 << n) as f64;
                for q in 0..n {
                    ops.push(Operation::gate(gates::h(), vec![q]));
                    #[allow(clippy::cast_precision_loss)]
                    let turns = (pattern << q) as f64 / size;
                    ops.push(Operation::gate(gates::phase(2.0 * PI * turns), vec![q]));
                }
                ops.extend(inverse_qft(n));
            }
            Self::ModAdd => {
                let modulus = (1_u64 << n) - 1;
                let start = modulus.saturating_sub(1);
                for q in 0..n {
                    if start & (1 << q) != 0 {
                        ops.push(Operation::gate(gates::x(), vec![q]));
                    }
                }
                ops.push(Operation::Math {
                    function: MathFunction::AddConstantModN(3, modulus),
                    registers: vec![qubits.clone()],
                    controls: vec![],
                });
            }
        }
        ops.push(Operation::Flush);
        ops.push(Operation::measure(qubits.clone()));
        ops.extend(qubits.iter().map(|&q| Operation::Deallocate(q)));
        ops
    }
}

/// `0b...0101` on `n` bits.
fn alternating_pattern(n: usize) -> u64 {
    (0..n).step_by(2).fold(0, |value, bit| value | (1 << bit))
}

/// Maps the Fourier state of `v` on qubits `0..n` back to the basis state `v`. Qubit `q` of the
/// input carries the phase `e^{2πi·v·2^q/2^n}`.
fn inverse_qft(n: usize) -> Vec<Operation> {
    let mut ops = Vec::new();
    for target in (0..n).rev() {
        // Bit `m` of `v` has already been recovered on qubit `n - 1 - m`.
        for m in 0..n - 1 - target {
            let control = n - 1 - m;
            #[allow(clippy::cast_precision_loss)]
            let angle = -2.0 * PI / (1_u64 << (n - target - m)) as f64;
            ops.push(Operation::controlled_gate(
                gates::phase(angle),
                vec![target],
                vec![control],
            ));
        }
        ops.push(Operation::gate(gates::h(), vec![target]));
    }
    for q in 0..n / 2 {
        ops.push(Operation::gate(gates::swap(), vec![q, n - 1 - q]));
    }
    ops
}

/// Runs `workload` on `qubits` qubits for `shots` shots and writes how often each outcome was
/// measured. Outcomes are bit-strings with the highest qubit first.
/// # Errors
///
/// Will return `Err` if
/// - `qubits` is zero or larger than [`MAX_QUBITS`]
/// - the simulator rejects an operation
/// - writing to `output_writer` fails
pub fn run_workload(
    workload: Workload,
    qubits: u32,
    shots: u32,
    rng_seed: Option<u64>,
    fusion: bool,
    output_writer: &mut impl Write,
) -> Result<(), String> {
    if qubits == 0 || qubits > MAX_QUBITS {
        return Err(format!(
            "Number of qubits must be between 1 and {MAX_QUBITS}, got {qubits}."
        ));
    }
    let mut config = SimConfig::default().with_gate_fusion(fusion);
    if let Some(seed) = rng_seed {
        config = config.with_seed(seed);
    }
    let mut engine = Engine::new(config).map_err(|e| e.to_string())?;
    let n = qubits as usize;
    let ops = workload.operations(n);
    info!(?workload, qubits, shots, fusion, "running workload");

    let mut histogram = BTreeMap::<String, u32>::new();
    for shot in 1..=shots {
        engine.reset();
        engine.receive(&ops).map_err(|e| e.to_string())?;
        let outcome: String = (0..n)
            .rev()
            .map(|q| match engine.measurement_result(q) {
                Some(true) => '1',
                _ => '0',
            })
            .collect();
        debug!(shot, %outcome, "completed shot");
        *histogram.entry(outcome).or_default() += 1;
    }

    write_line(output_writer, &format!("METADATA\tworkload\t{}", workload.name()))?;
    write_line(output_writer, &format!("METADATA\tqubits\t{qubits}"))?;
    write_line(output_writer, &format!("METADATA\tshots\t{shots}"))?;
    for (outcome, count) in histogram {
        write_line(output_writer, &format!("RESULT\t{outcome}\t{count}"))?;
    }
    Ok(())
}

fn write_line(output_writer: &mut impl Write, line: &str) -> Result<(), String> {
    writeln!(output_writer, "{line}").map_err(|e| format!("Failed to write output: {e}"))
}
