// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pauli-string operators: the multi-qubit Exp rotation, time evolution under a weighted sum of
//! Pauli strings, expectation values, and the (non-unitary) application of such a sum.

use num_complex::Complex64;
use num_traits::Zero;
use tracing::debug;

use crate::{error::Result, QuantumSim, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pauli {
    I,
    X,
    Z,
    Y,
}

/// A product of single-qubit Paulis, each paired with the index of the qubit it acts on within
/// the register the term is applied to. Indices not listed act as identity.
pub type PauliString = Vec<(usize, Pauli)>;

/// Taylor terms smaller than this (in 2-norm) end a time-evolution step.
const TAYLOR_TOLERANCE: f64 = 1e-12;

/// Bit masks for one Pauli product. `P|i⟩ = i^y_count (-1)^popcount(i & z_mask) |i ^ x_mask⟩`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PauliMasks {
    /// Positions carrying X or Y.
    x_mask: usize,
    /// Positions carrying Z or Y.
    z_mask: usize,
    y_count: u32,
}

impl PauliMasks {
    fn new(paulis: impl IntoIterator<Item = (usize, Pauli)>) -> Self {
        paulis
            .into_iter()
            .fold(Self::default(), |mut masks, (position, pauli)| {
                match pauli {
                    Pauli::I => (),
                    Pauli::X => masks.x_mask |= 1 << position,
                    Pauli::Z => masks.z_mask |= 1 << position,
                    Pauli::Y => {
                        masks.x_mask |= 1 << position;
                        masks.z_mask |= 1 << position;
                        masks.y_count += 1;
                    }
                }
                masks
            })
    }

    fn is_identity(self) -> bool {
        self.x_mask == 0 && self.z_mask == 0
    }

    fn commutes_with(self, other: Self) -> bool {
        ((self.x_mask & other.z_mask) ^ (self.z_mask & other.x_mask)).count_ones() % 2 == 0
    }

    /// The amplitude `(Pψ)[index]` expressed through `ψ[index ^ x_mask]`.
    fn phase_into(self, index: usize) -> Complex64 {
        let source = index ^ self.x_mask;
        let sign = if (source & self.z_mask).count_ones() % 2 == 0 {
            1.0
        } else {
            -1.0
        };
        let base = match self.y_count % 4 {
            0 => Complex64::new(1.0, 0.0),
            1 => Complex64::new(0.0, 1.0),
            2 => Complex64::new(-1.0, 0.0),
            _ => Complex64::new(0.0, -1.0),
        };
        base * sign
    }
}

/// Builds a vector whose entry `j` is `f(j)`, spreading the work over threads when asked to.
fn map_amplitudes<F>(len: usize, parallel: bool, f: F) -> Vec<Complex64>
where
    F: Fn(usize) -> Complex64 + Sync + Send,
{
    let mut out = vec![Complex64::zero(); len];
    #[cfg(feature = "parallel")]
    if parallel {
        use rayon::prelude::*;
        out.par_iter_mut()
            .enumerate()
            .for_each(|(j, value)| *value = f(j));
        return out;
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    for (j, value) in out.iter_mut().enumerate() {
        *value = f(j);
    }
    out
}

/// `Σ c_k P_k ψ`, evaluated only on the subspace selected by `ctrl_mask` and zero elsewhere.
fn apply_sum(
    state: &[Complex64],
    terms: &[(PauliMasks, Complex64)],
    ctrl_mask: usize,
    parallel: bool,
) -> Vec<Complex64> {
    map_amplitudes(state.len(), parallel, |j| {
        if j & ctrl_mask != ctrl_mask {
            return Complex64::zero();
        }
        terms.iter().fold(Complex64::zero(), |accum, (masks, coeff)| {
            accum + coeff * masks.phase_into(j) * state[j ^ masks.x_mask]
        })
    })
}

fn norm(state: &[Complex64]) -> f64 {
    state.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt()
}

impl QuantumSim {
    /// Exp multi-qubit rotation gate, `exp(i θ P)` with `paulis[k]` acting on `targets[k]`.
    /// # Errors
    /// See [`QuantumSim::mcexp`].
    pub fn exp(&mut self, paulis: &[Pauli], theta: f64, targets: &[usize]) -> Result<()> {
        self.mcexp(&[], paulis, theta, targets)
    }

    /// Multi-controlled Exp multi-qubit rotation gate.
    /// # Errors
    /// Returns `SimError::LengthMismatch` if `paulis` and `targets` differ in length,
    /// `SimError::DuplicateQubitInApplication` or `SimError::UnknownQubit`.
    pub fn mcexp(
        &mut self,
        ctls: &[usize],
        paulis: &[Pauli],
        theta: f64,
        targets: &[usize],
    ) -> Result<()> {
        if paulis.len() != targets.len() {
            return Err(SimError::LengthMismatch {
                expected: targets.len(),
                actual: paulis.len(),
            });
        }
        let all: Vec<usize> = ctls.iter().chain(targets).copied().collect();
        Self::check_for_duplicates(&all)?;
        let positions = self.id_map.positions_of(targets)?;
        let ctrl_mask = self.id_map.mask_of(ctls)?;
        self.run()?;

        let masks = PauliMasks::new(positions.into_iter().zip(paulis.iter().copied()));
        self.rotate(masks, theta, ctrl_mask);
        Ok(())
    }

    /// `ψ -> cos θ ψ + i sin θ Pψ` on the controlled subspace.
    fn rotate(&mut self, masks: PauliMasks, theta: f64, ctrl_mask: usize) {
        let (sin, cos) = theta.sin_cos();
        let id_coeff = Complex64::new(cos, 0.0);
        let pauli_coeff = Complex64::new(0.0, sin);
        let parallel = self.use_parallel();
        let state = self.state.amplitudes();
        let rotated = map_amplitudes(state.len(), parallel, |j| {
            if j & ctrl_mask == ctrl_mask {
                id_coeff * state[j] + pauli_coeff * masks.phase_into(j) * state[j ^ masks.x_mask]
            } else {
                state[j]
            }
        });
        self.state.replace(rotated);
    }

    /// Multiplies the controlled subspace by `phase`.
    fn controlled_phase(&mut self, phase: Complex64, ctrl_mask: usize) {
        for (j, amplitude) in self.state.amplitudes_mut().iter_mut().enumerate() {
            if j & ctrl_mask == ctrl_mask {
                *amplitude *= phase;
            }
        }
    }

    /// Applies `exp(-i t H)` for `H = Σ c_k P_k`, where the Pauli indices of each term refer to
    /// `targets`, on the subspace where every qubit in `controls` is `|1⟩`.
    ///
    /// Identity terms contribute a phase on the controlled subspace. When the remaining terms
    /// commute pairwise each one is exponentiated in closed form, which is exact. Otherwise the
    /// evolution is split into `s = ⌊|t| Σ|c_k|⌋ + 1` steps, each a Taylor series cut once a term
    /// drops below `1e-12` in norm, so the total error stays below `s · 1e-12`.
    /// # Errors
    /// Returns `SimError::TermOutOfRange` or `SimError::InvalidArgument` for malformed terms, a
    /// non-finite time or coefficient, or a duration needing more Taylor steps than fit in a
    /// `usize`. Also `SimError::DuplicateQubitInApplication` or `SimError::UnknownQubit`.
    pub fn emulate_time_evolution(
        &mut self,
        terms: &[(PauliString, f64)],
        time: f64,
        targets: &[usize],
        controls: &[usize],
    ) -> Result<()> {
        let all: Vec<usize> = targets.iter().chain(controls).copied().collect();
        Self::check_for_duplicates(&all)?;
        let positions = self.id_map.positions_of(targets)?;
        let ctrl_mask = self.id_map.mask_of(controls)?;
        if !time.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "evolution time {time} is not finite"
            )));
        }
        if let Some((_, coeff)) = terms.iter().find(|(_, coeff)| !coeff.is_finite()) {
            return Err(SimError::InvalidArgument(format!(
                "Hamiltonian coefficient {coeff} is not finite"
            )));
        }
        let terms = resolve_terms(terms, &positions)?;

        let trace: f64 = terms
            .iter()
            .filter(|(masks, _)| masks.is_identity())
            .map(|(_, coeff)| coeff)
            .sum();
        let terms: Vec<(PauliMasks, f64)> = terms
            .into_iter()
            .filter(|(masks, coeff)| !masks.is_identity() && *coeff != 0.0)
            .collect();

        let commuting = terms.iter().enumerate().all(|(k, (a, _))| {
            terms[k + 1..].iter().all(|(b, _)| a.commutes_with(*b))
        });
        let steps = if commuting {
            None
        } else {
            Some(taylor_steps(&terms, time)?)
        };
        self.run()?;
        match steps {
            None => {
                for &(masks, coeff) in &terms {
                    self.rotate(masks, -coeff * time, ctrl_mask);
                }
            }
            Some(steps) => self.taylor_evolution(&terms, time, steps, ctrl_mask),
        }
        if trace != 0.0 {
            self.controlled_phase(Complex64::from_polar(1.0, -trace * time), ctrl_mask);
        }
        debug!(terms = terms.len(), time, commuting, "emulated time evolution");
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn taylor_evolution(
        &mut self,
        terms: &[(PauliMasks, f64)],
        time: f64,
        steps: usize,
        ctrl_mask: usize,
    ) {
        let terms: Vec<(PauliMasks, Complex64)> = terms
            .iter()
            .map(|&(masks, coeff)| (masks, Complex64::new(coeff, 0.0)))
            .collect();
        let parallel = self.use_parallel();

        let mut output = self.state.amplitudes().to_vec();
        for _ in 0..steps {
            let mut current = output.clone();
            let mut order = 1.0;
            loop {
                let coeff = Complex64::new(0.0, -time / (steps as f64 * order));
                current = apply_sum(&current, &terms, ctrl_mask, parallel);
                for value in &mut current {
                    *value *= coeff;
                }
                for (out, value) in output.iter_mut().zip(&current) {
                    *out += value;
                }
                if norm(&current) <= TAYLOR_TOLERANCE {
                    break;
                }
                order += 1.0;
            }
        }
        self.state.replace(output);
    }

    /// `Σ c_k Re⟨ψ|P_k|ψ⟩` with the Pauli indices of each term referring to `ids`.
    /// # Errors
    /// Returns `SimError::TermOutOfRange` or `SimError::InvalidArgument` for malformed terms,
    /// `SimError::DuplicateQubitInApplication` or `SimError::UnknownQubit`.
    pub fn get_expectation_value(
        &mut self,
        terms: &[(PauliString, f64)],
        ids: &[usize],
    ) -> Result<f64> {
        Self::check_for_duplicates(ids)?;
        let positions = self.id_map.positions_of(ids)?;
        let terms = resolve_terms(terms, &positions)?;
        self.run()?;

        let state = self.state.amplitudes();
        Ok(terms
            .iter()
            .map(|&(masks, coeff)| {
                let overlap = state
                    .iter()
                    .enumerate()
                    .fold(Complex64::zero(), |accum, (j, amplitude)| {
                        accum + amplitude.conj() * masks.phase_into(j) * state[j ^ masks.x_mask]
                    });
                coeff * overlap.re
            })
            .sum())
    }

    /// Replaces the state with `Σ c_k P_k ψ`. The result is not renormalized.
    /// # Errors
    /// Returns `SimError::TermOutOfRange` or `SimError::InvalidArgument` for malformed terms,
    /// `SimError::DuplicateQubitInApplication` or `SimError::UnknownQubit`.
    pub fn apply_qubit_operator(
        &mut self,
        terms: &[(PauliString, Complex64)],
        ids: &[usize],
    ) -> Result<()> {
        Self::check_for_duplicates(ids)?;
        let positions = self.id_map.positions_of(ids)?;
        let terms = resolve_terms(terms, &positions)?;
        self.run()?;

        let parallel = self.use_parallel();
        let result = apply_sum(self.state.amplitudes(), &terms, 0, parallel);
        self.state.replace(result);
        Ok(())
    }
}

/// `⌊|t| Σ|c_k|⌋ + 1`, the number of Taylor steps for evolving under `terms` for `time`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn taylor_steps(terms: &[(PauliMasks, f64)], time: f64) -> Result<usize> {
    let total: f64 = terms.iter().map(|(_, coeff)| coeff.abs()).sum();
    // Saturates at `usize::MAX` for huge products.
    ((time.abs() * total) as usize)
        .checked_add(1)
        .ok_or_else(|| {
            SimError::InvalidArgument(format!(
                "evolution over time {time} needs too many Taylor steps"
            ))
        })
}

/// Turns register-relative Pauli strings into position masks.
fn resolve_terms<C: Copy>(
    terms: &[(PauliString, C)],
    positions: &[usize],
) -> Result<Vec<(PauliMasks, C)>> {
    terms
        .iter()
        .map(|(paulis, coeff)| {
            let mut used = 0_usize;
            let mut resolved = Vec::with_capacity(paulis.len());
            for &(index, pauli) in paulis {
                let position = *positions.get(index).ok_or(SimError::TermOutOfRange {
                    index,
                    len: positions.len(),
                })?;
                if used & (1 << position) != 0 {
                    return Err(SimError::InvalidArgument(format!(
                        "Pauli term names qubit index {index} more than once"
                    )));
                }
                used |= 1 << position;
                resolved.push((position, pauli));
            }
            Ok((PauliMasks::new(resolved), *coeff))
        })
        .collect()
}

impl TryFrom<char> for Pauli {
    type Error = SimError;

    fn try_from(value: char) -> Result<Self> {
        match value.to_ascii_uppercase() {
            'I' => Ok(Pauli::I),
            'X' => Ok(Pauli::X),
            'Y' => Ok(Pauli::Y),
            'Z' => Ok(Pauli::Z),
            _ => Err(SimError::InvalidArgument(format!(
                "'{value}' is not a Pauli operator"
            ))),
        }
    }
}
