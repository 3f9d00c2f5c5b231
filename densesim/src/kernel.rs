// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The controlled dense gate kernel. A `2^k x 2^k` matrix acting on `k` bit positions is applied
//! by walking the `2^(n-k)` base indices where those bits are zero, gathering the `2^k` amplitudes
//! reachable by varying them, multiplying, and scattering the result back in place.

use ndarray::Array2;
use num_complex::Complex64;
use num_traits::Zero;
use tracing::trace;

use crate::{config::MAX_TARGET_QUBITS, error::Result, SimError};

/// Checks that `matrix` is a square `2^targets` matrix and that the target count is supported.
pub(crate) fn validate(matrix: &Array2<Complex64>, targets: usize) -> Result<()> {
    if targets > MAX_TARGET_QUBITS {
        return Err(SimError::UnsupportedGateSize(targets));
    }
    let expected = 1_usize << targets;
    let (rows, cols) = matrix.dim();
    if rows != expected {
        return Err(SimError::DimensionMismatch {
            expected,
            actual: rows,
        });
    }
    if cols != expected {
        return Err(SimError::DimensionMismatch {
            expected,
            actual: cols,
        });
    }
    Ok(())
}

/// Builds a square matrix from flat row-major entries.
/// # Errors
/// Returns `SimError::DimensionMismatch` when the entry count is not the square of a power of two.
pub fn matrix_from_entries(entries: Vec<Complex64>) -> Result<Array2<Complex64>> {
    let len = entries.len();
    let mut dim = 1_usize;
    while dim * dim < len {
        dim *= 2;
    }
    if dim * dim != len {
        return Err(SimError::DimensionMismatch {
            expected: dim * dim,
            actual: len,
        });
    }
    Array2::from_shape_vec((dim, dim), entries).map_err(|e| {
        SimError::InvalidArgument(format!("unable to shape gate matrix entries: {e}"))
    })
}

/// Offsets of the `2^k` amplitudes of one group relative to its base index. Sub-index bit `i`
/// corresponds to `positions[i]`.
fn group_offsets(positions: &[usize]) -> Vec<usize> {
    (0..1_usize << positions.len())
        .map(|sub| {
            positions
                .iter()
                .enumerate()
                .filter(|(bit, _)| sub & (1 << bit) != 0)
                .fold(0, |offset, (_, &position)| offset | (1 << position))
        })
        .collect()
}

/// Spreads the bits of `base` around zero bits at each of the (ascending) `sorted` positions.
#[inline]
fn insert_zero_bits(mut base: usize, sorted: &[usize]) -> usize {
    for &position in sorted {
        let low = base & ((1 << position) - 1);
        base = ((base >> position) << (position + 1)) | low;
    }
    base
}

fn apply_to_chunk(
    chunk: &mut [Complex64],
    chunk_start: usize,
    matrix: &[Complex64],
    offsets: &[usize],
    sorted: &[usize],
    ctrl_mask: usize,
) {
    let dim = offsets.len();
    let chunk_mask = chunk.len() - 1;
    if chunk_start & ctrl_mask & !chunk_mask != ctrl_mask & !chunk_mask {
        return;
    }
    let local_ctrl_mask = ctrl_mask & chunk_mask;
    let mut gathered = [Complex64::zero(); 1 << MAX_TARGET_QUBITS];
    for base in 0..(chunk.len() >> sorted.len()) {
        let index = insert_zero_bits(base, sorted);
        if index & local_ctrl_mask != local_ctrl_mask {
            continue;
        }
        for (value, offset) in gathered.iter_mut().zip(offsets) {
            *value = chunk[index + offset];
        }
        for (row, offset) in offsets.iter().enumerate() {
            let entries = &matrix[row * dim..(row + 1) * dim];
            chunk[index + offset] = entries
                .iter()
                .zip(&gathered[..dim])
                .fold(Complex64::zero(), |accum, (m, v)| accum + m * v);
        }
    }
}

/// Computes every output amplitude independently from a copy of the input, so work splits over
/// the whole vector whatever the target positions. Each entry sums in the same order as
/// `apply_to_chunk`, giving bit-identical results.
#[cfg(feature = "parallel")]
fn apply_by_output(
    state: &mut [Complex64],
    matrix: &[Complex64],
    offsets: &[usize],
    positions: &[usize],
    ctrl_mask: usize,
) {
    use rayon::prelude::*;
    let dim = offsets.len();
    let target_mask = offsets[dim - 1];
    let input = state.to_vec();
    state.par_iter_mut().enumerate().for_each(|(index, out)| {
        if index & ctrl_mask != ctrl_mask {
            return;
        }
        let base = index & !target_mask;
        let row = positions
            .iter()
            .enumerate()
            .fold(0, |row, (bit, &position)| row | (((index >> position) & 1) << bit));
        *out = matrix[row * dim..(row + 1) * dim]
            .iter()
            .zip(offsets)
            .fold(Complex64::zero(), |accum, (m, &offset)| {
                accum + m * input[base | offset]
            });
    });
}

/// Applies `matrix` to the given bit positions of `state` wherever every bit in `ctrl_mask` is set.
/// The caller has already validated the matrix against the positions. With `parallel` set, the
/// vector is split into chunks spanning the highest target bit, each holding whole amplitude
/// groups. When that leaves fewer chunks than worker threads the gate runs output by output
/// instead. Either way the result does not depend on scheduling.
pub(crate) fn apply(
    state: &mut [Complex64],
    matrix: &Array2<Complex64>,
    positions: &[usize],
    ctrl_mask: usize,
    parallel: bool,
) {
    trace!(?positions, ctrl_mask, "applying dense gate");
    let flat: Vec<Complex64> = matrix.iter().copied().collect();
    let offsets = group_offsets(positions);
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();

    #[cfg(feature = "parallel")]
    if parallel {
        use rayon::prelude::*;
        let chunk_len = sorted.last().map_or(1, |&top| 1_usize << (top + 1));
        if state.len() / chunk_len < rayon::current_num_threads() {
            apply_by_output(state, &flat, &offsets, positions, ctrl_mask);
            return;
        }
        state
            .par_chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(i, chunk)| {
                apply_to_chunk(chunk, i * chunk_len, &flat, &offsets, &sorted, ctrl_mask);
            });
        return;
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    apply_to_chunk(state, 0, &flat, &offsets, &sorted, ctrl_mask);
}
