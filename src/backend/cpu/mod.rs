//! CPU kernels operating on column-major `Vec` storage.

mod naive;

pub(crate) use naive::reduce_labeled;

use crate::algebra::Scalar;

/// Copy strided data to a contiguous column-major buffer.
///
/// This is the core operation for making non-contiguous tensors contiguous.
pub(crate) fn copy_strided<T: Scalar>(
    src: &[T],
    shape: &[usize],
    strides: &[usize],
    offset: usize,
) -> Vec<T> {
    let numel: usize = shape.iter().product();
    let mut dst = vec![T::zero(); numel];
    if numel == 0 {
        return dst;
    }

    let mut indices = vec![0usize; shape.len()];
    for dst_elem in dst.iter_mut() {
        let src_offset: usize = offset
            + indices
                .iter()
                .zip(strides.iter())
                .map(|(i, s)| i * s)
                .sum::<usize>();

        *dst_elem = src[src_offset];

        // Increment indices (column-major order: first dimension first)
        for dim in 0..shape.len() {
            indices[dim] += 1;
            if indices[dim] < shape[dim] {
                break;
            }
            indices[dim] = 0;
        }
    }

    dst
}

/// Column-major `C[m, n] = A[m, k] @ B[k, n]`.
pub(crate) fn gemm<T: Scalar>(a: &[T], m: usize, k: usize, b: &[T], n: usize) -> Vec<T> {
    if m == 0 || n == 0 || k == 0 {
        return vec![T::zero(); m * n];
    }

    if let Some(c) = T::gemm_fast_path(a, m, k, b, n) {
        log::trace!("gemm {}x{}x{} ({}) via faer", m, k, n, T::NAME);
        return c;
    }

    log::trace!("gemm {}x{}x{} ({}) via generic loop", m, k, n, T::NAME);
    generic_gemm(a, m, k, b, n)
}

/// Batched GEMM over an outermost batch axis.
///
/// `a` holds `batch_size` contiguous column-major `[m, k]` slabs and `b`
/// as many `[k, n]` slabs; the result stacks the `[m, n]` products the same
/// way, i.e. shape `[m, n, batch]`.
pub(crate) fn gemm_batched<T: Scalar>(
    a: &[T],
    batch_size: usize,
    m: usize,
    k: usize,
    b: &[T],
    n: usize,
) -> Vec<T> {
    let a_batch_stride = m * k;
    let b_batch_stride = k * n;
    let c_batch_stride = m * n;

    let mut c = vec![T::zero(); batch_size * c_batch_stride];

    for batch in 0..batch_size {
        let a_offset = batch * a_batch_stride;
        let b_offset = batch * b_batch_stride;
        let c_offset = batch * c_batch_stride;

        let a_slice = &a[a_offset..a_offset + a_batch_stride];
        let b_slice = &b[b_offset..b_offset + b_batch_stride];

        let c_batch = gemm(a_slice, m, k, b_slice, n);
        c[c_offset..c_offset + c_batch_stride].copy_from_slice(&c_batch);
    }

    c
}

/// GEMM using faer for f32 (column-major layout).
pub(crate) fn faer_gemm_f32(a: &[f32], m: usize, k: usize, b: &[f32], n: usize) -> Vec<f32> {
    use faer::Mat;

    // Column-major: element (i, j) is at index j * nrows + i
    let a_mat = Mat::from_fn(m, k, |i, j| a[j * m + i]);
    let b_mat = Mat::from_fn(k, n, |i, j| b[j * k + i]);

    let c_mat = &a_mat * &b_mat;

    let mut c = vec![0.0f32; m * n];
    for j in 0..n {
        for i in 0..m {
            c[j * m + i] = c_mat[(i, j)];
        }
    }
    c
}

/// GEMM using faer for f64 (column-major layout).
pub(crate) fn faer_gemm_f64(a: &[f64], m: usize, k: usize, b: &[f64], n: usize) -> Vec<f64> {
    use faer::Mat;

    let a_mat = Mat::from_fn(m, k, |i, j| a[j * m + i]);
    let b_mat = Mat::from_fn(k, n, |i, j| b[j * k + i]);

    let c_mat = &a_mat * &b_mat;

    let mut c = vec![0.0f64; m * n];
    for j in 0..n {
        for i in 0..m {
            c[j * m + i] = c_mat[(i, j)];
        }
    }
    c
}

/// Generic GEMM loop (column-major layout).
fn generic_gemm<T: Scalar>(a: &[T], m: usize, k: usize, b: &[T], n: usize) -> Vec<T> {
    let mut c = vec![T::zero(); m * n];

    for j in 0..n {
        for i in 0..m {
            let mut acc = T::zero();
            for kk in 0..k {
                acc += a[kk * m + i] * b[j * k + kk];
            }
            c[j * m + i] = acc;
        }
    }

    c
}
