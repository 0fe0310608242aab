//! Stride-based tensor type with zero-copy views.
//!
//! The [`Tensor`] type supports:
//! - Zero-copy `permute`, `narrow` and (for contiguous data) `reshape`
//! - Automatic contiguous copy when needed for GEMM
//! - Rank-0 tensors for fully contracted results

mod ops;

use std::sync::Arc;

use crate::algebra::{Complex64, Scalar};
use crate::backend::cpu::copy_strided;
use crate::error::{KernelError, Result};

/// A multi-dimensional tensor with stride-based layout.
///
/// Storage is immutable and reference counted: cloning a tensor or taking a
/// view never copies data, and no operation mutates its operands.
///
/// Data is stored in column-major (Fortran) order: the first axis is
/// contiguous.
///
/// # Example
///
/// ```rust
/// use sfs_tensor::Tensor;
///
/// let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// let b = a.permute(&[1, 0]).unwrap(); // Zero-copy transpose
/// assert_eq!(b.get(&[2, 1]), 6.0);
/// ```
#[derive(Clone)]
pub struct Tensor<T: Scalar> {
    /// Shared storage (reference counted)
    storage: Arc<Vec<T>>,

    /// Shape of this view
    shape: Vec<usize>,

    /// Strides for each dimension (in elements)
    strides: Vec<usize>,

    /// Offset into storage
    offset: usize,
}

impl<T: Scalar> Tensor<T> {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create a tensor from column-major data with the given shape.
    pub fn from_data(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// Create a tensor taking ownership of column-major data.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(KernelError::InvalidShape {
                message: format!(
                    "data length {} doesn't match shape {:?} (expected {})",
                    data.len(),
                    shape,
                    numel
                ),
            });
        }
        Ok(Self::from_raw(data, shape.to_vec()))
    }

    /// Create a tensor by evaluating `f` at every multi-index.
    pub fn from_fn(shape: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let numel: usize = shape.iter().product();
        let mut data = Vec::with_capacity(numel);
        let mut index = vec![0usize; shape.len()];
        for _ in 0..numel {
            data.push(f(&index));
            for dim in 0..shape.len() {
                index[dim] += 1;
                if index[dim] < shape[dim] {
                    break;
                }
                index[dim] = 0;
            }
        }
        Self::from_raw(data, shape.to_vec())
    }

    /// Create a zero-filled tensor.
    pub fn zeros(shape: &[usize]) -> Self {
        let numel: usize = shape.iter().product();
        Self::from_raw(vec![T::zero(); numel], shape.to_vec())
    }

    /// Create a rank-0 tensor holding one value.
    pub fn scalar(value: T) -> Self {
        Self::from_raw(vec![value], Vec::new())
    }

    /// Create from contiguous storage whose length is already known to match.
    pub(crate) fn from_raw(data: Vec<T>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        let strides = compute_contiguous_strides(&shape);
        Self {
            storage: Arc::new(data),
            shape,
            strides,
            offset: 0,
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Get the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides of the tensor.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Get the number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check if the tensor is contiguous in memory (column-major, no offset).
    pub fn is_contiguous(&self) -> bool {
        self.offset == 0
            && self.storage.len() == self.numel()
            && self.strides == compute_contiguous_strides(&self.shape)
    }

    // ========================================================================
    // Data Access
    // ========================================================================

    /// Copy all data to a Vec in column-major order.
    pub fn to_vec(&self) -> Vec<T> {
        if self.is_contiguous() {
            self.storage.as_ref().clone()
        } else {
            copy_strided(&self.storage, &self.shape, &self.strides, self.offset)
        }
    }

    /// Borrow the underlying data (only if contiguous).
    pub fn as_slice(&self) -> Option<&[T]> {
        if self.is_contiguous() {
            Some(self.storage.as_slice())
        } else {
            None
        }
    }

    /// Read one element.
    ///
    /// # Panics
    ///
    /// Panics if `index` has the wrong length or is out of bounds.
    pub fn get(&self, index: &[usize]) -> T {
        assert_eq!(
            index.len(),
            self.ndim(),
            "index {:?} has wrong rank for shape {:?}",
            index,
            self.shape
        );
        let mut pos = self.offset;
        for (d, &i) in index.iter().enumerate() {
            assert!(i < self.shape[d], "index {:?} out of bounds for shape {:?}", index, self.shape);
            pos += i * self.strides[d];
        }
        self.storage[pos]
    }

    /// The single value of a one-element tensor (rank 0, or any shape of
    /// size 1).
    pub fn item(&self) -> Result<T> {
        if self.numel() != 1 {
            return Err(KernelError::ShapeMismatch {
                expected: Vec::new(),
                actual: self.shape.clone(),
            });
        }
        Ok(self.storage[self.offset])
    }

    // ========================================================================
    // View Operations (zero-copy)
    // ========================================================================

    /// Permute dimensions (zero-copy).
    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        if axes.len() != self.ndim() {
            return Err(KernelError::InvalidShape {
                message: format!(
                    "permutation {:?} has length {} but tensor has rank {}",
                    axes,
                    axes.len(),
                    self.ndim()
                ),
            });
        }

        let mut seen = vec![false; self.ndim()];
        for &ax in axes {
            if ax >= self.ndim() {
                return Err(KernelError::AxisOutOfRange {
                    axis: ax,
                    ndim: self.ndim(),
                });
            }
            if seen[ax] {
                return Err(KernelError::InvalidShape {
                    message: format!("duplicate axis {} in permutation {:?}", ax, axes),
                });
            }
            seen[ax] = true;
        }

        Ok(self.permute_unchecked(axes))
    }

    pub(crate) fn permute_unchecked(&self, axes: &[usize]) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            shape: axes.iter().map(|&i| self.shape[i]).collect(),
            strides: axes.iter().map(|&i| self.strides[i]).collect(),
            offset: self.offset,
        }
    }

    /// Restrict `axis` to `start..start + len` (zero-copy).
    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> Result<Self> {
        if axis >= self.ndim() {
            return Err(KernelError::AxisOutOfRange {
                axis,
                ndim: self.ndim(),
            });
        }
        if start + len > self.shape[axis] {
            return Err(KernelError::InvalidShape {
                message: format!(
                    "range {}..{} exceeds extent {} of axis {}",
                    start,
                    start + len,
                    self.shape[axis],
                    axis
                ),
            });
        }

        let mut shape = self.shape.clone();
        shape[axis] = len;
        Ok(Self {
            storage: Arc::clone(&self.storage),
            shape,
            strides: self.strides.clone(),
            offset: self.offset + start * self.strides[axis],
        })
    }

    /// Reshape to a new shape (zero-copy if contiguous).
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self> {
        let new_numel: usize = new_shape.iter().product();
        if new_numel != self.numel() {
            return Err(KernelError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: new_shape.to_vec(),
            });
        }
        Ok(self.reshape_unchecked(new_shape))
    }

    pub(crate) fn reshape_unchecked(&self, new_shape: &[usize]) -> Self {
        if self.is_contiguous() {
            Self {
                storage: Arc::clone(&self.storage),
                shape: new_shape.to_vec(),
                strides: compute_contiguous_strides(new_shape),
                offset: 0,
            }
        } else {
            self.contiguous().reshape_unchecked(new_shape)
        }
    }

    /// Make tensor contiguous in memory.
    ///
    /// If already contiguous, returns a clone (shared storage).
    pub fn contiguous(&self) -> Self {
        if self.is_contiguous() {
            self.clone()
        } else {
            Self::from_raw(self.to_vec(), self.shape.clone())
        }
    }

    // ========================================================================
    // Elementwise
    // ========================================================================

    /// Apply `f` to every element.
    pub fn map<U: Scalar>(&self, f: impl FnMut(T) -> U) -> Tensor<U> {
        let data: Vec<U> = self.to_vec().into_iter().map(f).collect();
        Tensor::from_raw(data, self.shape.clone())
    }

    /// Combine two tensors of identical shape elementwise.
    pub fn zip_with(&self, other: &Self, mut f: impl FnMut(T, T) -> T) -> Result<Self> {
        if self.shape != other.shape {
            return Err(KernelError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: other.shape.clone(),
            });
        }
        let data: Vec<T> = self
            .to_vec()
            .into_iter()
            .zip(other.to_vec())
            .map(|(a, b)| f(a, b))
            .collect();
        Ok(Self::from_raw(data, self.shape.clone()))
    }

    /// Elementwise sum, as used when accumulating gradient contributions.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Multiply every element by `factor`.
    pub fn scale(&self, factor: T) -> Self {
        self.map(|x| x * factor)
    }

    /// Sum all elements.
    pub fn sum(&self) -> T {
        let mut acc = T::zero();
        for v in self.to_vec() {
            acc += v;
        }
        acc
    }

    /// Lift every element into the complex plane.
    pub fn to_complex(&self) -> Tensor<Complex64> {
        self.map(|x| x.to_complex())
    }
}

impl Tensor<Complex64> {
    /// Real part of every element.
    pub fn re(&self) -> Tensor<f64> {
        self.map(|z| z.re)
    }
}

/// Compute contiguous strides for column-major (Fortran) layout.
///
/// For shape [m, n], returns strides [1, m] (first dimension is contiguous).
pub fn compute_contiguous_strides(shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return vec![];
    }

    let mut strides = vec![1; shape.len()];
    for i in 1..shape.len() {
        strides[i] = strides[i - 1] * shape[i - 1];
    }
    strides
}

impl<T: Scalar> std::fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("dtype", &T::NAME)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("contiguous", &self.is_contiguous())
            .finish()
    }
}

impl<T: Scalar> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.to_vec() == other.to_vec()
    }
}
