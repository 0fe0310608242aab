//! Dense CPU kernels backing the tensor type.
//!
//! - [`cpu`]: strided copies, GEMM (with a `faer` fast path for real types)
//!   and the naive labeled-reduction kernel used for unary einsum steps.

pub mod cpu;
