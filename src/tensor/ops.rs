//! Binary contraction via reshape→GEMM→reshape.

use std::collections::HashSet;

use super::Tensor;
use crate::algebra::Scalar;
use crate::backend::cpu::gemm_batched;

impl<T: Scalar> Tensor<T> {
    /// Binary tensor contraction using the reshape-to-GEMM strategy.
    ///
    /// `ia`, `ib` and `iy` are integer labels for `self`, `other` and the
    /// result. Labels must be unique within each list, every label of an
    /// operand must appear in the other operand or in `iy`, and shared
    /// labels must have equal extents. The einsum engine establishes these
    /// conditions before calling.
    pub(crate) fn contract_binary(&self, other: &Self, ia: &[usize], ib: &[usize], iy: &[usize]) -> Self {
        debug_assert_eq!(ia.len(), self.ndim());
        debug_assert_eq!(ib.len(), other.ndim());

        let (batch, left, right, contracted) = classify_indices(ia, ib, iy);

        let extent_a = |l: &usize| self.shape[index_of(ia, *l)];
        let extent_b = |l: &usize| other.shape[index_of(ib, *l)];

        let batch_size: usize = batch.iter().map(extent_a).product();
        let left_size: usize = left.iter().map(extent_a).product();
        let right_size: usize = right.iter().map(extent_b).product();
        let contract_size: usize = contracted.iter().map(extent_a).product();

        // Column-major keeps the trailing batch axis outermost, so each batch
        // slab is contiguous after permuting to [left, contracted, batch] and
        // [contracted, right, batch].
        let a_perm = compute_permutation(ia, &left, &contracted, &batch);
        let a_mat = self.permute_unchecked(&a_perm).contiguous();

        let b_perm = compute_permutation(ib, &contracted, &right, &batch);
        let b_mat = other.permute_unchecked(&b_perm).contiguous();

        let c_data = gemm_batched(
            a_mat.storage.as_slice(),
            batch_size,
            left_size,
            contract_size,
            b_mat.storage.as_slice(),
            right_size,
        );

        // Current order is [left..., right..., batch...]
        let current_order: Vec<usize> = left
            .iter()
            .chain(right.iter())
            .chain(batch.iter())
            .copied()
            .collect();
        let current_shape: Vec<usize> = left
            .iter()
            .map(extent_a)
            .chain(right.iter().map(extent_b))
            .chain(batch.iter().map(extent_a))
            .collect();
        let c = Tensor::from_raw(c_data, current_shape);

        if current_order == iy {
            c
        } else {
            let out_perm: Vec<usize> = iy.iter().map(|&l| index_of(&current_order, l)).collect();
            c.permute_unchecked(&out_perm).contiguous()
        }
    }
}

/// Classify labels into batch, left-only, right-only, and contracted.
///
/// - batch: in both operands and in the output
/// - left: only in the first operand
/// - right: only in the second operand
/// - contracted: in both operands, but not in the output
pub(crate) fn classify_indices(
    ia: &[usize],
    ib: &[usize],
    iy: &[usize],
) -> (Vec<usize>, Vec<usize>, Vec<usize>, Vec<usize>) {
    let ia_set: HashSet<_> = ia.iter().copied().collect();
    let ib_set: HashSet<_> = ib.iter().copied().collect();
    let iy_set: HashSet<_> = iy.iter().copied().collect();

    let mut batch = Vec::new();
    let mut left = Vec::new();
    let mut contracted = Vec::new();

    for &i in ia {
        if ib_set.contains(&i) && iy_set.contains(&i) {
            batch.push(i);
        } else if ib_set.contains(&i) {
            contracted.push(i);
        } else {
            left.push(i);
        }
    }

    let right: Vec<usize> = ib.iter().filter(|i| !ia_set.contains(i)).copied().collect();

    (batch, left, right, contracted)
}

/// Find index of value in slice.
fn index_of(slice: &[usize], value: usize) -> usize {
    slice
        .iter()
        .position(|&x| x == value)
        .unwrap_or_else(|| panic!("label {} not found in {:?}", value, slice))
}

/// Compute permutation to reorder labels to [first..., second..., third...].
fn compute_permutation(current: &[usize], first: &[usize], second: &[usize], third: &[usize]) -> Vec<usize> {
    first
        .iter()
        .chain(second.iter())
        .chain(third.iter())
        .map(|&i| index_of(current, i))
        .collect()
}
