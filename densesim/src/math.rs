// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Emulation of classical reversible functions as permutations of the basis states.

use bitvec::prelude::*;
use num_complex::Complex64;
use num_traits::Zero;
use std::{fmt, sync::Arc};
use tracing::debug;

use crate::{
    error::Result,
    fusion::{deposit, extract},
    QuantumSim, SimError,
};

/// A classical function over register values. The built-ins act on the first register.
#[derive(Clone)]
pub enum MathFunction {
    /// `x -> x + a` modulo `2^width`.
    AddConstant(i64),

    /// `x -> (x + a) mod N` for `x < N`; values `x >= N` are left alone.
    AddConstantModN(u64, u64),

    /// `x -> (a * x) mod N` for `x < N`, with `a` coprime to `N`; values `x >= N` are left alone.
    MultiplyByConstantModN(u64, u64),

    /// Arbitrary function updating every register value in place. Results are truncated to the
    /// register widths and must form a permutation.
    Custom(Arc<dyn Fn(&mut [u64]) + Send + Sync>),
}

impl fmt::Debug for MathFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddConstant(a) => f.debug_tuple("AddConstant").field(a).finish(),
            Self::AddConstantModN(a, n) => {
                f.debug_tuple("AddConstantModN").field(a).field(n).finish()
            }
            Self::MultiplyByConstantModN(a, n) => f
                .debug_tuple("MultiplyByConstantModN")
                .field(a)
                .field(n)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl MathFunction {
    fn validate(&self, widths: &[usize]) -> Result<()> {
        let (Self::AddConstantModN(a, n) | Self::MultiplyByConstantModN(a, n)) = self else {
            return Ok(());
        };
        if *n == 0 {
            return Err(SimError::InvalidArgument("modulus must be positive".to_string()));
        }
        if u128::from(*n) > 1_u128 << widths[0] {
            return Err(SimError::InvalidArgument(format!(
                "modulus {n} does not fit in a register of {} qubits",
                widths[0]
            )));
        }
        if matches!(self, Self::MultiplyByConstantModN(..)) && gcd(*a % *n, *n) != 1 {
            return Err(SimError::InvalidArgument(format!(
                "multiplier {a} is not invertible modulo {n}"
            )));
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn apply(&self, values: &mut [u64], widths: &[usize]) {
        match self {
            Self::AddConstant(a) => {
                let modulus = 1_i128 << widths[0];
                values[0] = (i128::from(values[0]) + i128::from(*a)).rem_euclid(modulus) as u64;
            }
            Self::AddConstantModN(a, n) => {
                if values[0] < *n {
                    values[0] = ((u128::from(values[0]) + u128::from(*a)) % u128::from(*n)) as u64;
                }
            }
            Self::MultiplyByConstantModN(a, n) => {
                if values[0] < *n {
                    values[0] = ((u128::from(values[0]) * u128::from(*a)) % u128::from(*n)) as u64;
                }
            }
            Self::Custom(function) => function(values),
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl QuantumSim {
    /// Applies `function` to the integer values of `registers` on the subspace where every qubit in
    /// `controls` is `|1⟩`. Qubit `registers[r][i]` is bit `i` of register value `r`.
    /// # Errors
    /// Returns `SimError::InvalidArgument` for an empty register list, a register wider than 64
    /// qubits or invalid built-in parameters, and `SimError::NotAPermutation` if the function maps
    /// two basis states onto one. The state is untouched on error.
    #[allow(clippy::cast_possible_truncation)]
    pub fn emulate_math(
        &mut self,
        function: &MathFunction,
        registers: &[Vec<usize>],
        controls: &[usize],
    ) -> Result<()> {
        if registers.is_empty() {
            return Err(SimError::InvalidArgument(
                "at least one register is required".to_string(),
            ));
        }
        let all: Vec<usize> = registers.iter().flatten().chain(controls).copied().collect();
        Self::check_for_duplicates(&all)?;
        let positions: Vec<Vec<usize>> = registers
            .iter()
            .map(|register| self.id_map.positions_of(register))
            .collect::<Result<_>>()?;
        let ctrl_mask = self.id_map.mask_of(controls)?;
        let widths: Vec<usize> = registers.iter().map(Vec::len).collect();
        if let Some(&width) = widths.iter().find(|&&width| width > 64) {
            return Err(SimError::InvalidArgument(format!(
                "registers of {width} qubits are not supported"
            )));
        }
        function.validate(&widths)?;
        self.run()?;

        let register_mask = positions
            .iter()
            .fold(0, |mask, register| mask | deposit(usize::MAX, register));
        let amplitudes = self.state.amplitudes();
        let mut permuted = vec![Complex64::zero(); amplitudes.len()];
        let mut seen = bitvec![0; amplitudes.len()];
        let mut values = vec![0_u64; registers.len()];
        for (index, &amplitude) in amplitudes.iter().enumerate() {
            let target = if index & ctrl_mask == ctrl_mask {
                for (value, register) in values.iter_mut().zip(&positions) {
                    *value = extract(index, register) as u64;
                }
                function.apply(&mut values, &widths);
                values
                    .iter()
                    .zip(&positions)
                    .fold(index & !register_mask, |accum, (&value, register)| {
                        // Bits beyond the register width are dropped by `deposit`.
                        accum | deposit(value as usize, register)
                    })
            } else {
                index
            };
            if seen.replace(target, true) {
                return Err(SimError::NotAPermutation);
            }
            permuted[target] = amplitude;
        }
        self.state.replace(permuted);
        debug!(?function, ?registers, ?controls, "emulated classical function");
        Ok(())
    }
}
