// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Matrices for the common single- and two-qubit gates, indexed so that target `i` is bit `i` of
//! the row and column index.

use ndarray::{array, Array2};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

#[must_use]
pub fn x() -> Array2<Complex64> {
    array![[ZERO, ONE], [ONE, ZERO]]
}

#[must_use]
pub fn y() -> Array2<Complex64> {
    array![[ZERO, -I], [I, ZERO]]
}

#[must_use]
pub fn z() -> Array2<Complex64> {
    phase(std::f64::consts::PI)
}

#[must_use]
pub fn h() -> Array2<Complex64> {
    let a = Complex64::new(FRAC_1_SQRT_2, 0.0);
    array![[a, a], [a, -a]]
}

#[must_use]
pub fn s() -> Array2<Complex64> {
    array![[ONE, ZERO], [ZERO, I]]
}

#[must_use]
pub fn t() -> Array2<Complex64> {
    phase(std::f64::consts::FRAC_PI_4)
}

/// `diag(1, e^{iθ})`.
#[must_use]
pub fn phase(theta: f64) -> Array2<Complex64> {
    array![[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, theta)]]
}

#[must_use]
pub fn rx(theta: f64) -> Array2<Complex64> {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new(0.0, -(theta / 2.0).sin());
    array![[c, s], [s, c]]
}

#[must_use]
pub fn ry(theta: f64) -> Array2<Complex64> {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new((theta / 2.0).sin(), 0.0);
    array![[c, -s], [s, c]]
}

#[must_use]
pub fn rz(theta: f64) -> Array2<Complex64> {
    array![
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)]
    ]
}

#[must_use]
pub fn swap() -> Array2<Complex64> {
    array![
        [ONE, ZERO, ZERO, ZERO],
        [ZERO, ZERO, ONE, ZERO],
        [ZERO, ONE, ZERO, ZERO],
        [ZERO, ZERO, ZERO, ONE]
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Array2<Complex64>, b: &Array2<Complex64>) -> bool {
        a.dim() == b.dim() && a.iter().zip(b).all(|(x, y)| (x - y).norm() < 1e-12)
    }

    #[test]
    fn gates_are_unitary() {
        for gate in [x(), y(), z(), h(), s(), t(), phase(0.4), rx(0.3), ry(1.2), rz(2.5), swap()] {
            let dagger = gate.t().mapv(|c| c.conj());
            let identity = Array2::<Complex64>::eye(gate.nrows());
            assert!(close(&gate.dot(&dagger), &identity));
        }
    }

    #[test]
    fn rotations_match_named_gates_at_pi() {
        assert!(close(&rx(std::f64::consts::PI), &x().mapv(|c| c * -I)));
        assert!(close(&ry(std::f64::consts::PI), &y().mapv(|c| c * -I)));
        assert!(close(&t().dot(&t()), &s()));
        assert!(close(&s().dot(&s()), &z()));
    }
}
