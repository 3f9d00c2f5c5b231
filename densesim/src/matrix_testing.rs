// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Reference gate matrices and full-system matrix helpers. The tests here check the simulator
//! against plain matrix-vector products over the whole register.

use core::f64::consts::FRAC_1_SQRT_2;
use ndarray::{array, linalg::kron, Array1, Array2};
use num_complex::Complex64;
use num_traits::{One, Zero};

use crate::{fusion::embed, QuantumSim};

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

pub fn x() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]]
}

pub fn y() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]]
}

pub fn z() -> Array2<Complex64> {
    array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]]
}

pub fn h() -> Array2<Complex64> {
    array![[c(1.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(-1.0, 0.0)]] * FRAC_1_SQRT_2
}

pub fn s() -> Array2<Complex64> {
    array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, 1.0)]]
}

pub fn t() -> Array2<Complex64> {
    array![
        [c(1.0, 0.0), c(0.0, 0.0)],
        [c(0.0, 0.0), c(FRAC_1_SQRT_2, FRAC_1_SQRT_2)]
    ]
}

/// `exp(-i θ X / 2)`
pub fn rx(theta: f64) -> Array2<Complex64> {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![[c(cos, 0.0), c(0.0, -sin)], [c(0.0, -sin), c(cos, 0.0)]]
}

/// `exp(-i θ Y / 2)`
pub fn ry(theta: f64) -> Array2<Complex64> {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![[c(cos, 0.0), c(-sin, 0.0)], [c(sin, 0.0), c(cos, 0.0)]]
}

/// `exp(-i θ Z / 2)`
pub fn rz(theta: f64) -> Array2<Complex64> {
    array![
        [Complex64::from_polar(1.0, -theta / 2.0), c(0.0, 0.0)],
        [c(0.0, 0.0), Complex64::from_polar(1.0, theta / 2.0)]
    ]
}

pub fn swap() -> Array2<Complex64> {
    let mut m = Array2::<Complex64>::zeros((4, 4));
    for (row, col) in [(0, 0), (1, 2), (2, 1), (3, 3)] {
        m[[row, col]] = Complex64::one();
    }
    m
}

/// Conjugate transpose.
pub fn adjoint(u: &Array2<Complex64>) -> Array2<Complex64> {
    u.t().map(Complex64::conj)
}

/// Block-diagonal extension of `u` with `n` controls on the most significant bits.
pub fn controlled(u: &Array2<Complex64>, n: usize) -> Array2<Complex64> {
    (0..n).fold(u.clone(), |inner, _| {
        let dim = inner.nrows();
        let mut outer = Array2::<Complex64>::eye(2 * dim);
        outer.slice_mut(ndarray::s![dim.., dim..]).assign(&inner);
        outer
    })
}

/// Tensor product where `factors[i]` acts on bit `i` of the index, so the last factor is the most
/// significant one.
pub fn kron_targets(factors: &[Array2<Complex64>]) -> Array2<Complex64> {
    factors
        .iter()
        .fold(Array2::eye(1), |accum, factor| kron(factor, &accum))
}

pub fn are_equal_to_precision(actual: Array2<Complex64>, expected: Array2<Complex64>) -> bool {
    // Summed element-wise distance; exact comparison fails on rounding.
    (actual - expected).map(|x| x.norm()).sum() <= 1e-10
}

pub fn vectors_equal_to_precision(actual: &[Complex64], expected: &Array1<Complex64>) -> bool {
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .map(|(a, e)| (a - e).norm())
            .sum::<f64>()
            <= 1e-10
}

/// Applies `matrix` (with `controls`) to the full register where qubit id `i` sits at bit `i`.
pub fn reference_apply(
    state: &Array1<Complex64>,
    matrix: &Array2<Complex64>,
    targets: &[usize],
    controls: &[usize],
) -> Array1<Complex64> {
    let width = state.len().trailing_zeros() as usize;
    embed(matrix, targets, controls, width).dot(state)
}

fn amplitudes(sim: &mut QuantumSim) -> Vec<Complex64> {
    sim.cheat().unwrap().1.to_vec()
}

mod tests {
    use super::*;
    use core::f64::consts::PI;

    use crate::exp::Pauli;

    #[test]
    fn gate_identities() {
        assert_eq!(s().dot(&s()), z());
        assert!(are_equal_to_precision(t().dot(&t()), s()));
        assert!(are_equal_to_precision(Complex64::i() * rx(PI), x()));
        assert!(are_equal_to_precision(Complex64::i() * ry(PI), y()));
        assert!(are_equal_to_precision(Complex64::i() * rz(PI), z()));
        assert!(are_equal_to_precision(x().dot(&y()), Complex64::i() * z()));
        assert_eq!(adjoint(&swap()), swap());
    }

    #[test]
    fn controlled_extension() {
        let cnot = controlled(&x(), 1);
        assert_eq!(cnot[[2, 3]], Complex64::one());
        assert_eq!(cnot[[1, 1]], Complex64::one());
        assert_eq!(cnot[[2, 2]], Complex64::zero());
        assert!(are_equal_to_precision(
            controlled(&x(), 2),
            controlled(&cnot, 1)
        ));
        assert_eq!(controlled(&x(), 3).nrows(), 16);
    }

    fn gate_sequence() -> Vec<(Array2<Complex64>, Vec<usize>, Vec<usize>)> {
        vec![
            (h(), vec![0], vec![]),
            (h(), vec![2], vec![]),
            (x(), vec![1], vec![0]),
            (ry(0.3), vec![3], vec![1, 2]),
            (swap(), vec![0, 3], vec![]),
            (t(), vec![2], vec![]),
            (kron_targets(&[h(), t()]), vec![3, 1], vec![0]),
            (rz(1.7), vec![1], vec![]),
            (rx(0.4), vec![0], vec![3]),
            (s(), vec![3], vec![]),
            (controlled(&y(), 1), vec![2, 0], vec![]),
        ]
    }

    fn check_against_reference(mut sim: QuantumSim) {
        let n = 4;
        for id in 0..n {
            sim.allocate_qubit(id).unwrap();
        }
        let mut expected = Array1::from_elem(1 << n, Complex64::zero());
        expected[0] = Complex64::one();

        for (matrix, targets, controls) in gate_sequence() {
            sim.apply_controlled_gate(&matrix, &targets, &controls)
                .unwrap();
            expected = reference_apply(&expected, &matrix, &targets, &controls);
        }
        assert!(vectors_equal_to_precision(&amplitudes(&mut sim), &expected));
    }

    #[test]
    fn kernel_matches_full_matrices() {
        check_against_reference(QuantumSim::default());
    }

    #[test]
    fn fused_kernel_matches_full_matrices() {
        let config = crate::SimConfig::default()
            .with_gate_fusion(true)
            .with_fusion_qubits(3, 4);
        check_against_reference(QuantumSim::with_config(config).unwrap());
    }

    #[test]
    fn parallel_kernel_matches_full_matrices() {
        let config = crate::SimConfig::default().with_parallel_min_qubits(0);
        check_against_reference(QuantumSim::with_config(config).unwrap());
    }

    /// Runs `op` then `reference` on targets entangled with fresh control qubits. The two must be
    /// mutually inverse, including global phase, for the register to return to `|0...0⟩`.
    fn assert_operation_equal_referenced<F1, F2>(mut op: F1, mut reference: F2, count: usize)
    where
        F1: FnMut(&mut QuantumSim, &[usize]),
        F2: FnMut(&mut QuantumSim, &[usize]),
    {
        let mut sim = QuantumSim::default();
        let mut ctls = vec![];
        let mut qs = vec![];
        for i in 0..count {
            let (ctl, q) = (2 * i, 2 * i + 1);
            sim.allocate_qubit(ctl).unwrap();
            sim.allocate_qubit(q).unwrap();
            sim.apply_controlled_gate(&h(), &[ctl], &[]).unwrap();
            sim.apply_controlled_gate(&x(), &[q], &[ctl]).unwrap();
            ctls.push(ctl);
            qs.push(q);
        }

        op(&mut sim, &qs);
        reference(&mut sim, &qs);

        for (&q, &ctl) in qs.iter().zip(&ctls) {
            sim.apply_controlled_gate(&x(), &[q], &[ctl]).unwrap();
            sim.apply_controlled_gate(&h(), &[ctl], &[]).unwrap();
        }

        for &id in qs.iter().chain(&ctls) {
            assert!(sim.qubit_is_zero(id).unwrap(), "{}", sim.dump().unwrap());
        }
        let state = amplitudes(&mut sim);
        assert!((state[0] - Complex64::one()).norm() < 1e-10);
    }

    #[test]
    fn exp_x_is_rx() {
        assert_operation_equal_referenced(
            |sim, qs| sim.exp(&[Pauli::X], 0.7, &qs[..1]).unwrap(),
            |sim, qs| sim.apply_controlled_gate(&rx(1.4), &qs[..1], &[]).unwrap(),
            1,
        );
    }

    #[test]
    fn exp_y_is_ry() {
        assert_operation_equal_referenced(
            |sim, qs| sim.exp(&[Pauli::Y], -1.1, &qs[..1]).unwrap(),
            |sim, qs| sim.apply_controlled_gate(&ry(-2.2), &qs[..1], &[]).unwrap(),
            1,
        );
    }

    #[test]
    fn exp_z_is_rz() {
        assert_operation_equal_referenced(
            |sim, qs| sim.exp(&[Pauli::Z], PI / 5.0, &qs[..1]).unwrap(),
            |sim, qs| {
                sim.apply_controlled_gate(&rz(2.0 * PI / 5.0), &qs[..1], &[])
                    .unwrap();
            },
            1,
        );
    }

    #[test]
    fn exp_multi_qubit_matches_matrix() {
        let theta: f64 = 0.9;
        let pauli = kron_targets(&[x(), z(), y()]);
        let forward = Array2::<Complex64>::eye(8) * Complex64::new(theta.cos(), 0.0)
            + pauli * Complex64::new(0.0, theta.sin());
        assert_operation_equal_referenced(
            |sim, qs| {
                sim.exp(&[Pauli::X, Pauli::Z, Pauli::Y], theta, qs)
                    .unwrap();
            },
            |sim, qs| {
                sim.apply_controlled_gate(&adjoint(&forward), qs, &[])
                    .unwrap();
            },
            3,
        );
    }

    #[test]
    fn mcexp_matches_controlled_rotation() {
        assert_operation_equal_referenced(
            |sim, qs| {
                sim.mcexp(&qs[2..3], &[Pauli::Y, Pauli::I], 0.35, &qs[..2])
                    .unwrap();
            },
            |sim, qs| {
                sim.apply_controlled_gate(&ry(0.7), &qs[..1], &qs[2..3])
                    .unwrap();
            },
            3,
        );
    }

    #[test]
    fn single_term_time_evolution_is_exact() {
        // exp(-i c t X) = rx(2 c t)
        let (coefficient, time) = (0.6, 1.3);
        assert_operation_equal_referenced(
            |sim, qs| {
                sim.emulate_time_evolution(&[(vec![(0, Pauli::X)], coefficient)], time, qs, &[])
                    .unwrap();
            },
            |sim, qs| {
                sim.apply_controlled_gate(&rx(-2.0 * coefficient * time), qs, &[])
                    .unwrap();
            },
            1,
        );
    }
}
