//! # sfs-tensor
//!
//! Differentiable tensor kernels for site-frequency-spectrum likelihoods.
//!
//! ## Features
//!
//! - **Labeled einsum**: [`einsum2`] contracts tensors whose axes carry any
//!   hashable label, with an explicit vector-Jacobian product
//!   ([`einsum::einsum2_vjp`])
//! - **Spectral contraction**: [`fft_einsum`] convolves along chosen labels
//!   through 5-smooth FFTs
//! - **Stable special functions**: [`expm1d`], [`expi`] and
//!   [`transformed_expi`] switch formulas where the naive ones lose precision
//! - **Gradient registry**: every differentiable operation is a [`Primitive`]
//!   with a gradient rule, ready for an external reverse-mode driver
//!
//! ## Quick Start
//!
//! ```rust
//! use sfs_tensor::{einsum2, Tensor};
//!
//! let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
//! let b = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
//!
//! // C[i,k] = Σ_j A[i,j] × B[j,k]
//! let c = einsum2!(a, ["i", "j"], b, ["j", "k"], ["i", "k"]).unwrap();
//! assert_eq!(c.to_vec(), vec![7.0, 10.0, 15.0, 22.0]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         User API                            │
//! │   einsum2(args) / fft_einsum(..) / swapaxes / trace         │
//! │   Primitive::gradient_of(position, inputs, output)          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Einsum Engine                          │
//! │   LabelTable: labels → dense usize ids                      │
//! │   omeco::optimize_code() → NestedEinsum (contraction tree)  │
//! │   Einsum::execute: unary reduce, tree GEMM, reorder         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CPU kernels                          │
//! │   f64/f32: faer GEMM      complex: generic loop             │
//! │   rustfft for fftn/ifftn                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod algebra;
pub mod autodiff;
pub mod axes;
pub mod backend;
pub mod einsum;
pub mod error;
pub mod special;
pub mod spectral;
pub mod tensor;

// Re-exports
pub use algebra::{Complex64, Scalar};
pub use autodiff::{Primitive, Record, Value};
pub use axes::{eye, sum_antidiagonals, swapaxes, trace};
pub use einsum::{einsum2, ContractionOrder, EinArg, Einsum, LabelTable};
pub use error::{KernelError, Result};
pub use special::{expi, expm1d, transformed_expi, transformed_expi_scalar};
pub use spectral::{fft_einsum, fftn, ifftn, next_regular};
pub use tensor::Tensor;
