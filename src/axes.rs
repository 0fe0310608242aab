//! Axis permutation and diagonal sums.

use crate::algebra::Scalar;
use crate::einsum::{einsum2, EinArg, Label};
use crate::error::{KernelError, Result};
use crate::tensor::Tensor;

/// Exchange two axes (zero-copy).
///
/// Its own gradient rule: the cotangent is `swapaxes(g, axis1, axis2)`.
pub fn swapaxes<T: Scalar>(tensor: &Tensor<T>, axis1: usize, axis2: usize) -> Result<Tensor<T>> {
    let ndim = tensor.ndim();
    for axis in [axis1, axis2] {
        if axis >= ndim {
            return Err(KernelError::AxisOutOfRange { axis, ndim });
        }
    }
    let mut perm: Vec<usize> = (0..ndim).collect();
    perm.swap(axis1, axis2);
    tensor.permute(&perm)
}

/// Sum `a[i, i + offset, ...]` over the two leading axes.
///
/// The result has shape `shape[2..]`; a matrix gives a rank-0 tensor.
/// Offsets that miss the matrix entirely give zeros.
pub fn trace<T: Scalar>(tensor: &Tensor<T>, offset: isize) -> Result<Tensor<T>> {
    if tensor.ndim() < 2 {
        return Err(KernelError::InvalidShape {
            message: format!("trace needs rank >= 2, got shape {:?}", tensor.shape()),
        });
    }
    let (d0, d1) = (tensor.shape()[0], tensor.shape()[1]);
    let diagonal = diagonal_positions(d0, d1, offset);

    let mut index = vec![0usize; tensor.ndim()];
    Ok(Tensor::from_fn(&tensor.shape()[2..], |rest| {
        index[2..].copy_from_slice(rest);
        let mut acc = T::zero();
        for &(i, j) in &diagonal {
            index[0] = i;
            index[1] = j;
            acc += tensor.get(&index);
        }
        acc
    }))
}

/// Cotangent of [`trace`] for an operand of shape `shape`.
///
/// Contracts `eye(d0, d1, offset)` over labels `[0, 1]` with `g` over
/// `2..rank` into `0..rank`.
pub fn trace_vjp<T: Scalar>(grad: &Tensor<T>, shape: &[usize], offset: isize) -> Result<Tensor<T>> {
    if shape.len() < 2 {
        return Err(KernelError::InvalidShape {
            message: format!("trace needs rank >= 2, got shape {:?}", shape),
        });
    }
    if grad.shape() != &shape[2..] {
        return Err(KernelError::ShapeMismatch {
            expected: shape[2..].to_vec(),
            actual: grad.shape().to_vec(),
        });
    }
    let rank = shape.len();
    let eye = eye::<T>(shape[0], shape[1], offset);
    let grad_labels: Vec<usize> = (2..rank).collect();
    let out_labels: Vec<usize> = (0..rank).collect();
    einsum2(&[
        EinArg::Tensor(&eye),
        EinArg::Labels(&[0, 1]),
        EinArg::Tensor(grad),
        EinArg::Labels(&grad_labels),
        EinArg::Labels(&out_labels),
    ])
}

/// `d0 × d1` matrix with ones on the diagonal `j == i + offset`.
pub fn eye<T: Scalar>(d0: usize, d1: usize, offset: isize) -> Tensor<T> {
    Tensor::from_fn(&[d0, d1], |ix| {
        if ix[1] as isize - ix[0] as isize == offset {
            T::one()
        } else {
            T::zero()
        }
    })
}

fn diagonal_positions(d0: usize, d1: usize, offset: isize) -> Vec<(usize, usize)> {
    (0..d0)
        .filter_map(|i| {
            let j = i as isize + offset;
            (j >= 0 && (j as usize) < d1).then_some((i, j as usize))
        })
        .collect()
}

/// Collapse the axes labeled `axis0` and `axis1` into one axis of length
/// `n0 + n1 - 1` whose entry `s` sums every element with `i0 + i1 == s`.
///
/// Returns the new tensor and its labels: `new_axis` first, then the
/// untouched labels in their original order.
///
/// # Example
///
/// ```rust
/// use sfs_tensor::{sum_antidiagonals, Tensor};
///
/// // [[1, 2], [3, 4]] row-wise
/// let a = Tensor::<f64>::from_data(&[1.0, 3.0, 2.0, 4.0], &[2, 2]).unwrap();
/// let (sums, labels) = sum_antidiagonals(&a, &["a", "b"], &"a", &"b", "ab").unwrap();
/// assert_eq!(sums.to_vec(), vec![1.0, 5.0, 4.0]);
/// assert_eq!(labels, vec!["ab"]);
/// ```
pub fn sum_antidiagonals<T: Scalar, L: Label>(
    tensor: &Tensor<T>,
    labels: &[L],
    axis0: &L,
    axis1: &L,
    new_axis: L,
) -> Result<(Tensor<T>, Vec<L>)> {
    if labels.len() != tensor.ndim() {
        return Err(KernelError::RankMismatch {
            expected: tensor.ndim(),
            actual: labels.len(),
        });
    }
    if axis0 == axis1 {
        return Err(KernelError::InvalidShape {
            message: format!("cannot sum antidiagonals of axis {:?} with itself", axis0),
        });
    }
    let find = |label: &L| {
        labels.iter().position(|l| l == label).ok_or_else(|| KernelError::InvalidShape {
            message: format!("label {:?} not in {:?}", label, labels),
        })
    };
    let (p0, p1) = (find(axis0)?, find(axis1)?);

    let rest: Vec<usize> = (0..tensor.ndim()).filter(|&d| d != p0 && d != p1).collect();
    let (n0, n1) = (tensor.shape()[p0], tensor.shape()[p1]);

    let mut out_shape = vec![(n0 + n1).saturating_sub(1)];
    out_shape.extend(rest.iter().map(|&d| tensor.shape()[d]));

    let mut index = vec![0usize; tensor.ndim()];
    let result = Tensor::from_fn(&out_shape, |ix| {
        for (k, &d) in rest.iter().enumerate() {
            index[d] = ix[k + 1];
        }
        let s = ix[0];
        let mut acc = T::zero();
        if n0 == 0 || n1 == 0 {
            return acc;
        }
        for i0 in s.saturating_sub(n1 - 1)..=s.min(n0 - 1) {
            index[p0] = i0;
            index[p1] = s - i0;
            acc += tensor.get(&index);
        }
        acc
    });

    let mut new_labels = Vec::with_capacity(rest.len() + 1);
    new_labels.push(new_axis);
    new_labels.extend(rest.iter().map(|&d| labels[d].clone()));
    Ok((result, new_labels))
}
