//! Contractions that convolve along selected labels.
//!
//! [`fft_einsum`] behaves like [`einsum2`](crate::einsum2) except that the
//! spectral labels are combined by linear convolution. Both operands are
//! transformed to a common 5-smooth length, multiplied in the frequency
//! domain and transformed back.

mod fft;
mod regular;

pub use fft::{fftn, fftn_vjp, ifftn};
pub use regular::next_regular;

use crate::algebra::Complex64;
use crate::einsum::{einsum2, EinArg, Label};
use crate::error::{KernelError, Result};
use crate::tensor::Tensor;

/// Contract two real tensors, convolving along `fft_labels`.
///
/// Every spectral label must occur in both operands; along it the result has
/// the linear-convolution length `n1 + n2 - 1`. Spectral labels missing from
/// `out_labels` are summed after the convolution. All other labels follow
/// [`einsum2`](crate::einsum2).
///
/// # Example
///
/// ```rust
/// use sfs_tensor::{fft_einsum, Tensor};
///
/// let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0], &[3]).unwrap();
/// let b = Tensor::<f64>::from_data(&[0.0, 1.0, 0.5], &[3]).unwrap();
/// let c = fft_einsum(&a, &['t'], &b, &['t'], &['t'], &['t']).unwrap();
///
/// let expected = [0.0, 1.0, 2.5, 4.0, 1.5];
/// for (x, y) in c.to_vec().iter().zip(expected) {
///     assert!((x - y).abs() < 1e-12);
/// }
/// ```
pub fn fft_einsum<L: Label>(
    in1: &Tensor<f64>,
    labels1: &[L],
    in2: &Tensor<f64>,
    labels2: &[L],
    out_labels: &[L],
    fft_labels: &[L],
) -> Result<Tensor<f64>> {
    for (tensor, labels) in [(in1, labels1), (in2, labels2)] {
        if tensor.ndim() != labels.len() {
            return Err(KernelError::RankMismatch {
                expected: tensor.ndim(),
                actual: labels.len(),
            });
        }
    }

    let mut axes1 = Vec::with_capacity(fft_labels.len());
    let mut axes2 = Vec::with_capacity(fft_labels.len());
    let mut linear = Vec::with_capacity(fft_labels.len());
    let mut padded = Vec::with_capacity(fft_labels.len());
    for label in fft_labels {
        let missing = || KernelError::MissingSpectralLabel {
            label: format!("{:?}", label),
        };
        let a1 = labels1.iter().position(|l| l == label).ok_or_else(missing)?;
        let a2 = labels2.iter().position(|l| l == label).ok_or_else(missing)?;

        let n = (in1.shape()[a1] + in2.shape()[a2]).saturating_sub(1);
        let m = if n == 0 { 0 } else { next_regular(n)? };
        log::debug!("fft_einsum: label {:?} linear length {} -> transform length {}", label, n, m);

        axes1.push(a1);
        axes2.push(a2);
        linear.push(n);
        padded.push(m);
    }

    let f1 = fftn(in1, &padded, &axes1)?;
    let f2 = fftn(in2, &padded, &axes2)?;

    // Spectral labels the caller sums over stay as trailing axes until the
    // inverse transform is done.
    let mut full_out: Vec<L> = out_labels.to_vec();
    for label in fft_labels {
        if !out_labels.contains(label) {
            full_out.push(label.clone());
        }
    }

    let spectrum: Tensor<Complex64> = einsum2(&[
        EinArg::Tensor(&f1),
        EinArg::Labels(labels1),
        EinArg::Tensor(&f2),
        EinArg::Labels(labels2),
        EinArg::Labels(&full_out),
    ])?;

    let out_axes: Vec<usize> = fft_labels
        .iter()
        .map(|label| full_out.iter().position(|l| l == label).unwrap_or_default())
        .collect();
    let mut result = ifftn(&spectrum, &out_axes)?.re();
    for (&axis, &n) in out_axes.iter().zip(&linear) {
        result = result.narrow(axis, 0, n)?;
    }

    if full_out.len() == out_labels.len() {
        return Ok(result.contiguous());
    }
    einsum2(&[
        EinArg::Tensor(&result),
        EinArg::Labels(&full_out),
        EinArg::Labels(out_labels),
    ])
}
