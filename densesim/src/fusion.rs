// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Buffer that multiplies consecutive gates into one matrix over the union of their qubits, so a
//! run of small gates costs a single pass over the state vector.

use ndarray::Array2;
use num_complex::Complex64;
use num_traits::{One, Zero};

/// A gate ready to be handed to the kernel. Targets and controls are qubit ids.
#[derive(Debug, Clone)]
pub(crate) struct FusedGate {
    pub matrix: Array2<Complex64>,
    pub targets: Vec<usize>,
    pub controls: Vec<usize>,
    pub gate_count: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Fusion {
    pending: Option<FusedGate>,
}

impl Fusion {
    pub fn num_qubits(&self) -> usize {
        self.pending.as_ref().map_or(0, |gate| gate.targets.len())
    }

    pub fn gate_count(&self) -> usize {
        self.pending.as_ref().map_or(0, |gate| gate.gate_count)
    }

    /// Whether the pending gate acts on or is controlled by any of `ids`.
    pub fn touches(&self, ids: &[usize]) -> bool {
        self.pending.as_ref().is_some_and(|gate| {
            ids.iter()
                .any(|id| gate.targets.contains(id) || gate.controls.contains(id))
        })
    }

    pub fn take(&mut self) -> Option<FusedGate> {
        self.pending.take()
    }

    /// Folds a gate into the buffer. Returns `false`, leaving the buffer unchanged, when the gate
    /// uses a buffered control as a target (or the reverse) or when the fused gate would act on
    /// more than `max_qubits` qubits; the caller then flushes and retries on the empty buffer.
    ///
    /// Controls shared by every buffered gate stay controls of the fused gate. Any other control
    /// becomes one of its targets, with the owning gate embedded as a controlled block.
    pub fn try_insert(
        &mut self,
        matrix: &Array2<Complex64>,
        targets: &[usize],
        controls: &[usize],
        max_qubits: usize,
    ) -> bool {
        let Some(pending) = &self.pending else {
            let mut controls = controls.to_vec();
            controls.sort_unstable();
            self.pending = Some(FusedGate {
                matrix: matrix.clone(),
                targets: targets.to_vec(),
                controls,
                gate_count: 1,
            });
            return true;
        };

        if targets.iter().any(|t| pending.controls.contains(t))
            || controls.iter().any(|c| pending.targets.contains(c))
        {
            return false;
        }

        let (common, old_extra): (Vec<usize>, Vec<usize>) = pending
            .controls
            .iter()
            .copied()
            .partition(|c| controls.contains(c));
        let new_extra: Vec<usize> = controls
            .iter()
            .copied()
            .filter(|c| !common.contains(c))
            .collect();

        let mut fused_targets = pending.targets.clone();
        fused_targets.extend(&old_extra);
        for &q in targets.iter().chain(&new_extra) {
            if !fused_targets.contains(&q) {
                fused_targets.push(q);
            }
        }
        if fused_targets.len() > max_qubits {
            return false;
        }

        let slot_of = |ids: &[usize]| -> Vec<usize> {
            ids.iter()
                .map(|id| {
                    fused_targets
                        .iter()
                        .position(|q| q == id)
                        .unwrap_or_default()
                })
                .collect()
        };
        let width = fused_targets.len();
        let old_full = embed(
            &pending.matrix,
            &slot_of(&pending.targets),
            &slot_of(&old_extra),
            width,
        );
        let new_full = embed(matrix, &slot_of(targets), &slot_of(&new_extra), width);

        let gate_count = pending.gate_count + 1;
        self.pending = Some(FusedGate {
            matrix: new_full.dot(&old_full),
            targets: fused_targets,
            controls: common,
            gate_count,
        });
        true
    }
}

/// Deposits the low bits of `value` at the given bit positions.
pub(crate) fn deposit(value: usize, positions: &[usize]) -> usize {
    positions
        .iter()
        .enumerate()
        .filter(|(bit, _)| value & (1 << bit) != 0)
        .fold(0, |accum, (_, &position)| accum | (1 << position))
}

/// Gathers the bits at the given positions into the low bits of the result.
pub(crate) fn extract(value: usize, positions: &[usize]) -> usize {
    positions
        .iter()
        .enumerate()
        .filter(|&(_, &position)| value & (1 << position) != 0)
        .fold(0, |accum, (bit, _)| accum | (1 << bit))
}

/// Extends `matrix` (acting on `slots`, sub-index bit `i` on `slots[i]`) to a `2^width` matrix that
/// applies it when every bit in `ctrl_slots` is set and acts as identity elsewhere.
pub(crate) fn embed(
    matrix: &Array2<Complex64>,
    slots: &[usize],
    ctrl_slots: &[usize],
    width: usize,
) -> Array2<Complex64> {
    let dim = 1_usize << width;
    let gate_mask = deposit(usize::MAX, slots);
    let ctrl_mask = deposit(usize::MAX, ctrl_slots);
    let mut full = Array2::from_elem((dim, dim), Complex64::zero());
    for col in 0..dim {
        if col & ctrl_mask != ctrl_mask {
            full[[col, col]] = Complex64::one();
            continue;
        }
        let sub_col = extract(col, slots);
        let rest = col & !gate_mask;
        for sub_row in 0..(1_usize << slots.len()) {
            full[[rest | deposit(sub_row, slots), col]] = matrix[[sub_row, sub_col]];
        }
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix_testing::{controlled, h, kron_targets, are_equal_to_precision, t, x, z};

    #[test]
    fn embed_pads_with_identity() {
        // Target bit 0 of the fused index is the least significant factor of the Kronecker product.
        let embedded = embed(&h(), &[1], &[], 2);
        assert!(are_equal_to_precision(
            embedded,
            kron_targets(&[Array2::eye(2), h()])
        ));
    }

    #[test]
    fn embed_with_control_matches_controlled() {
        // Control on the high bit, as in the block-diagonal controlled matrix.
        let embedded = embed(&x(), &[0], &[1], 2);
        assert!(are_equal_to_precision(embedded, controlled(&x(), 1)));
    }

    #[test]
    fn fuses_disjoint_single_qubit_gates() {
        let mut fusion = Fusion::default();
        assert!(fusion.try_insert(&h(), &[3], &[], 5));
        assert!(fusion.try_insert(&t(), &[8], &[], 5));
        assert!(fusion.try_insert(&z(), &[3], &[], 5));
        assert_eq!(fusion.num_qubits(), 2);
        assert_eq!(fusion.gate_count(), 3);

        let gate = fusion.take().unwrap();
        assert_eq!(gate.targets, vec![3, 8]);
        let expected = kron_targets(&[z().dot(&h()), t()]);
        assert!(are_equal_to_precision(gate.matrix, expected));
        assert_eq!(fusion.gate_count(), 0);
        assert!(fusion.take().is_none());
    }

    #[test]
    fn rejects_role_conflicts() {
        let mut fusion = Fusion::default();
        assert!(fusion.try_insert(&x(), &[1], &[0], 5));
        // Qubit 0 is a control of the buffer and cannot become a target.
        assert!(!fusion.try_insert(&h(), &[0], &[], 5));
        // Qubit 1 is a target of the buffer and cannot become a control.
        assert!(!fusion.try_insert(&x(), &[2], &[1], 5));
        assert_eq!(fusion.gate_count(), 1);
        assert!(fusion.touches(&[0]));
        assert!(!fusion.touches(&[2]));
    }

    #[test]
    fn uncommon_controls_become_targets() {
        let mut fusion = Fusion::default();
        assert!(fusion.try_insert(&x(), &[1], &[0], 5));
        assert!(fusion.try_insert(&h(), &[2], &[], 5));
        let gate = fusion.take().unwrap();
        assert!(gate.controls.is_empty());
        assert_eq!(gate.targets, vec![1, 0, 2]);
        // Slots: qubit 1 -> bit 0, qubit 0 -> bit 1, qubit 2 -> bit 2.
        let cnot = embed(&x(), &[0], &[1], 3);
        let had = embed(&h(), &[2], &[], 3);
        assert!(are_equal_to_precision(gate.matrix, had.dot(&cnot)));
    }

    #[test]
    fn respects_footprint_cap() {
        let mut fusion = Fusion::default();
        assert!(fusion.try_insert(&h(), &[0], &[], 2));
        assert!(fusion.try_insert(&h(), &[1], &[], 2));
        assert!(!fusion.try_insert(&h(), &[2], &[], 2));
        assert_eq!(fusion.num_qubits(), 2);
    }
}
