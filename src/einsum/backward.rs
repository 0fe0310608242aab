//! Vector-Jacobian product of [`einsum2`](super::einsum2).
//!
//! For `C = einsum(A₀, ix₀, A₁, ix₁, ..., iy)` the cotangent of `A_k` is the
//! same contraction with `A_k` replaced by the upstream gradient and `ix_k`
//! swapped with `iy`:
//!
//! ```text
//! ∂L/∂A_k = einsum(A₀, ix₀, ..., G, iy, ..., ix_k)
//! ```
//!
//! Labels that only `A_k` carried are broadcast with `A_k`'s extents, and
//! labels repeated in `ix_k` embed the gradient on the diagonal.

use super::{contract_labeled, split_args, EinArg, Label};
use crate::algebra::Scalar;
use crate::error::{KernelError, Result};
use crate::tensor::Tensor;

/// Gradient of an [`einsum2`](super::einsum2) call with respect to the
/// tensor at argument `position`.
///
/// `args` is the forward argument list and `grad` the upstream gradient,
/// shaped like the forward result. The returned tensor is shaped like the
/// operand at `position`.
///
/// # Errors
///
/// [`KernelError::ArgumentOutOfRange`] when `position` is past the end of
/// `args`, [`KernelError::NonDifferentiableArgument`] when it names a label
/// list.
pub fn einsum2_vjp<T: Scalar, L: Label>(
    args: &[EinArg<'_, T, L>],
    position: usize,
    grad: &Tensor<T>,
) -> Result<Tensor<T>> {
    if position >= args.len() {
        return Err(KernelError::ArgumentOutOfRange {
            position,
            arity: args.len(),
        });
    }
    let (tensors, ixs, iy) = split_args(args)?;
    if position % 2 == 1 || position == args.len() - 1 {
        return Err(KernelError::NonDifferentiableArgument { position });
    }

    let k = position / 2;
    let target = tensors[k];
    let target_ix = ixs[k];

    let swapped_tensors: Vec<&Tensor<T>> = tensors
        .iter()
        .enumerate()
        .map(|(i, &t)| if i == k { grad } else { t })
        .collect();
    let swapped_ixs: Vec<&[L]> = ixs
        .iter()
        .enumerate()
        .map(|(i, &ix)| if i == k { iy } else { ix })
        .collect();

    log::trace!("einsum2 vjp for operand {}", k);
    let result = contract_labeled(
        &swapped_tensors,
        &swapped_ixs,
        target_ix,
        Some((target_ix, target.shape())),
    )?;
    debug_assert_eq!(result.shape(), target.shape());
    Ok(result)
}
