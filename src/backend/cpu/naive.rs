//! Naive labeled reduction: `y[iy] = Σ x[ix]` over every label assignment.
//!
//! Handles everything a single operand can need: permutation, summation of
//! labels absent from `iy`, diagonal extraction for repeated input labels,
//! diagonal embedding for repeated output labels and broadcasting of output
//! labels absent from `ix`.

use std::collections::HashMap;

use crate::algebra::Scalar;

/// Evaluate `y[iy] = Σ x[ix]` by walking every assignment of the distinct
/// labels in `ix ∪ iy`.
///
/// `src` must be contiguous column-major data of shape `src_shape`.
/// Every label in `ix` and `iy` must be present in `size_dict`.
///
/// Returns the output data and its shape.
pub(crate) fn reduce_labeled<T: Scalar>(
    src: &[T],
    src_shape: &[usize],
    ix: &[usize],
    iy: &[usize],
    size_dict: &HashMap<usize, usize>,
) -> (Vec<T>, Vec<usize>) {
    debug_assert_eq!(src_shape.len(), ix.len());

    let out_shape: Vec<usize> = iy.iter().map(|l| size_dict[l]).collect();
    let out_numel: usize = out_shape.iter().product();
    let mut out = vec![T::zero(); out_numel];

    // Distinct labels in first-appearance order, input first.
    let mut labels: Vec<usize> = Vec::new();
    for &l in ix.iter().chain(iy.iter()) {
        if !labels.contains(&l) {
            labels.push(l);
        }
    }
    let extents: Vec<usize> = labels.iter().map(|l| size_dict[l]).collect();
    if extents.iter().any(|&e| e == 0) {
        return (out, out_shape);
    }

    let src_strides = column_major_strides(src_shape);
    let out_strides = column_major_strides(&out_shape);

    // Per distinct label: stride contribution into source and output.
    let src_step: Vec<usize> = labels
        .iter()
        .map(|l| stride_sum(ix, &src_strides, *l))
        .collect();
    let out_step: Vec<usize> = labels
        .iter()
        .map(|l| stride_sum(iy, &out_strides, *l))
        .collect();

    let mut counter = vec![0usize; labels.len()];
    let mut src_pos = 0usize;
    let mut out_pos = 0usize;
    loop {
        out[out_pos] += src[src_pos];

        // Advance the odometer, keeping both positions incremental.
        let mut dim = 0;
        loop {
            if dim == labels.len() {
                return (out, out_shape);
            }
            counter[dim] += 1;
            src_pos += src_step[dim];
            out_pos += out_step[dim];
            if counter[dim] < extents[dim] {
                break;
            }
            src_pos -= src_step[dim] * extents[dim];
            out_pos -= out_step[dim] * extents[dim];
            counter[dim] = 0;
            dim += 1;
        }
    }
}

fn column_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in 1..shape.len() {
        strides[i] = strides[i - 1] * shape[i - 1];
    }
    strides
}

/// Sum of strides of every axis carrying `label` (repeated labels walk the
/// diagonal).
fn stride_sum(ix: &[usize], strides: &[usize], label: usize) -> usize {
    ix.iter()
        .zip(strides.iter())
        .filter(|(l, _)| **l == label)
        .map(|(_, s)| *s)
        .sum()
}
