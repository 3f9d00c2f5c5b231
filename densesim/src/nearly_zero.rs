// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use num_complex::Complex64;

/// Tolerance below which a probability is treated as zero. Shared by deallocation, forced
/// collapse and the classical-state probes.
pub(crate) const TOLERANCE: f64 = 1e-10;

/// Comparison against zero that is robust to accumulated floating point error.
pub(crate) trait NearlyZero {
    fn is_nearly_zero(&self) -> bool;
}

impl NearlyZero for f64 {
    fn is_nearly_zero(&self) -> bool {
        self.abs() <= TOLERANCE
    }
}

impl NearlyZero for Complex64 {
    fn is_nearly_zero(&self) -> bool {
        self.re.is_nearly_zero() && self.im.is_nearly_zero()
    }
}
