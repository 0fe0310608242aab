//! Scalar types admitted as tensor elements.
//!
//! Real pipelines run on `f64`. The spectral path lifts operands into
//! [`Complex64`] for the frequency-domain contraction and drops back to real
//! exactly once, after the inverse transform.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use num_traits::{One, Zero};

pub use num_complex::Complex64;

use crate::backend::cpu::{faer_gemm_f32, faer_gemm_f64};

/// Marker trait for scalar types that can be used in tensors.
///
/// Arithmetic is ordinary `(+, ×)`. Implementors may supply a fast GEMM
/// path; the default falls back to the generic loop kernel.
pub trait Scalar:
    Copy
    + Clone
    + Send
    + Sync
    + Default
    + Debug
    + PartialEq
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
{
    /// Short type name used in log records.
    const NAME: &'static str;

    /// Column-major `C = A @ B` through an optimized library, if one exists
    /// for this type.
    fn gemm_fast_path(_a: &[Self], _m: usize, _k: usize, _b: &[Self], _n: usize) -> Option<Vec<Self>> {
        None
    }

    /// Lift into the complex plane for spectral transforms.
    fn to_complex(self) -> Complex64;
}

impl Scalar for f64 {
    const NAME: &'static str = "f64";

    fn gemm_fast_path(a: &[f64], m: usize, k: usize, b: &[f64], n: usize) -> Option<Vec<f64>> {
        Some(faer_gemm_f64(a, m, k, b, n))
    }

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
}

impl Scalar for f32 {
    const NAME: &'static str = "f32";

    fn gemm_fast_path(a: &[f32], m: usize, k: usize, b: &[f32], n: usize) -> Option<Vec<f32>> {
        Some(faer_gemm_f32(a, m, k, b, n))
    }

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self as f64, 0.0)
    }
}

impl Scalar for Complex64 {
    const NAME: &'static str = "c64";

    #[inline]
    fn to_complex(self) -> Complex64 {
        self
    }
}
