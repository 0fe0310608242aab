//! N-dimensional DFTs over selected axes via `rustfft`.

use std::sync::Arc;

use rustfft::{Fft, FftPlanner};

use crate::algebra::{Complex64, Scalar};
use crate::error::{KernelError, Result};
use crate::tensor::Tensor;

/// Unnormalized forward DFT over `axes`.
///
/// Each listed axis is zero-padded or truncated to the matching entry of
/// `shape` before transforming. Real inputs are lifted to complex first.
///
/// ```rust
/// use sfs_tensor::{fftn, Tensor};
///
/// let x = Tensor::<f64>::from_data(&[1.0, 1.0], &[2]).unwrap();
/// let y = fftn(&x, &[4], &[0]).unwrap();
/// assert_eq!(y.shape(), &[4]);
/// assert!((y.get(&[0]).re - 2.0).abs() < 1e-12);
/// ```
pub fn fftn<T: Scalar>(x: &Tensor<T>, shape: &[usize], axes: &[usize]) -> Result<Tensor<Complex64>> {
    check_axes(x.ndim(), shape.len(), axes)?;

    let mut data = x.to_complex().to_vec();
    let mut dims = x.shape().to_vec();
    let mut planner = FftPlanner::<f64>::new();
    for (&axis, &len) in axes.iter().zip(shape) {
        data = resize_axis(&data, &mut dims, axis, len);
        if len == 0 {
            continue;
        }
        let plan = planner.plan_fft_forward(len);
        transform_axis(&mut data, &dims, axis, &plan);
    }
    Ok(Tensor::from_raw(data, dims))
}

/// Inverse DFT over `axes`, normalized by `1/n` per axis.
pub fn ifftn(x: &Tensor<Complex64>, axes: &[usize]) -> Result<Tensor<Complex64>> {
    check_axes(x.ndim(), axes.len(), axes)?;

    let mut data = x.to_vec();
    let dims = x.shape().to_vec();
    let mut planner = FftPlanner::<f64>::new();
    let mut scale = 1.0;
    for &axis in axes {
        let len = dims[axis];
        if len == 0 {
            continue;
        }
        let plan = planner.plan_fft_inverse(len);
        transform_axis(&mut data, &dims, axis, &plan);
        scale /= len as f64;
    }
    for z in data.iter_mut() {
        *z *= scale;
    }
    Ok(Tensor::from_raw(data, dims))
}

/// Cotangent of [`fftn`] for an input of shape `input_shape`.
///
/// The DFT matrix is symmetric, so the adjoint transforms `g` again at the
/// output lengths and then truncates or zero-pads each axis back to the
/// input extent. This satisfies `Σ fftn(x)·y == Σ x·fftn_vjp(y)`.
pub fn fftn_vjp(g: &Tensor<Complex64>, input_shape: &[usize], axes: &[usize]) -> Result<Tensor<Complex64>> {
    if g.ndim() != input_shape.len() {
        return Err(KernelError::ShapeMismatch {
            expected: input_shape.to_vec(),
            actual: g.shape().to_vec(),
        });
    }
    let lengths: Vec<usize> = axes
        .iter()
        .map(|&a| g.shape().get(a).copied().unwrap_or(0))
        .collect();
    let transformed = fftn(g, &lengths, axes)?;

    let mut data = transformed.to_vec();
    let mut dims = transformed.shape().to_vec();
    for &axis in axes {
        data = resize_axis(&data, &mut dims, axis, input_shape[axis]);
    }
    if dims != input_shape {
        return Err(KernelError::ShapeMismatch {
            expected: input_shape.to_vec(),
            actual: dims,
        });
    }
    Ok(Tensor::from_raw(data, dims))
}

fn check_axes(ndim: usize, n_lengths: usize, axes: &[usize]) -> Result<()> {
    if n_lengths != axes.len() {
        return Err(KernelError::ShapeMismatch {
            expected: vec![axes.len()],
            actual: vec![n_lengths],
        });
    }
    for (i, &axis) in axes.iter().enumerate() {
        if axis >= ndim {
            return Err(KernelError::AxisOutOfRange { axis, ndim });
        }
        if axes[..i].contains(&axis) {
            return Err(KernelError::InvalidShape {
                message: format!("axis {} transformed twice in {:?}", axis, axes),
            });
        }
    }
    Ok(())
}

/// Column-major lane geometry of `axis`: (stride, extent, number of outer blocks).
fn lanes(dims: &[usize], axis: usize) -> (usize, usize, usize) {
    let stride: usize = dims[..axis].iter().product();
    let outer: usize = dims[axis + 1..].iter().product();
    (stride, dims[axis], outer)
}

/// Zero-pad or truncate `axis` to `len`, updating `dims`.
fn resize_axis(data: &[Complex64], dims: &mut [usize], axis: usize, len: usize) -> Vec<Complex64> {
    let (stride, old_len, outer) = lanes(dims, axis);
    if old_len == len {
        return data.to_vec();
    }
    let keep = old_len.min(len);
    let mut out = vec![Complex64::new(0.0, 0.0); stride * len * outer];
    for o in 0..outer {
        let src = o * stride * old_len;
        let dst = o * stride * len;
        let n = keep * stride;
        out[dst..dst + n].copy_from_slice(&data[src..src + n]);
    }
    dims[axis] = len;
    out
}

fn transform_axis(data: &mut [Complex64], dims: &[usize], axis: usize, plan: &Arc<dyn Fft<f64>>) {
    let (stride, len, outer) = lanes(dims, axis);
    let mut buffer = vec![Complex64::new(0.0, 0.0); len];
    for o in 0..outer {
        for i in 0..stride {
            let base = o * stride * len + i;
            for (k, slot) in buffer.iter_mut().enumerate() {
                *slot = data[base + k * stride];
            }
            plan.process(&mut buffer);
            for (k, value) in buffer.iter().enumerate() {
                data[base + k * stride] = *value;
            }
        }
    }
}
