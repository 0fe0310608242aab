//! Numerically stable special functions.
//!
//! Each function switches formulas where the textbook expression loses
//! precision, so no input in the supported domain reports instability.

use crate::error::{KernelError, Result};
use crate::tensor::Tensor;

/// `|x|` below which [`transformed_expi`] uses its asymptotic series.
pub const SERIES_CUTOFF: f64 = 1.0 / 45.0;

/// Highest power kept in the [`transformed_expi`] series.
pub const SERIES_TERMS: usize = 10;

/// Highest factorial denominator kept in the [`expm1d`] Taylor series.
pub const TAYLOR_TERMS: usize = 10;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
const MAX_ITERATIONS: usize = 500;

// ============================================================================
// expm1d
// ============================================================================

/// `(e^x - 1) / x`, continuous at `x = 0` where it equals 1.
///
/// ```rust
/// use sfs_tensor::expm1d;
///
/// assert_eq!(expm1d(0.0), 1.0);
/// assert_eq!(expm1d(f64::INFINITY), f64::INFINITY);
/// ```
pub fn expm1d(x: f64) -> f64 {
    if x == 0.0 {
        expm1d_taylor(x)
    } else if x == f64::INFINITY {
        f64::INFINITY
    } else {
        x.exp_m1() / x
    }
}

/// Derivative of [`expm1d`].
pub fn expm1d_grad(x: f64) -> f64 {
    if x == 0.0 {
        expm1d_taylor_grad(x)
    } else if x == f64::INFINITY {
        f64::INFINITY
    } else {
        (x.exp() - expm1d(x)) / x
    }
}

/// `1 + x/2! + x²/3! + ...` through `x^(TAYLOR_TERMS-1)/TAYLOR_TERMS!`.
fn expm1d_taylor(x: f64) -> f64 {
    let mut c_n = 1.0;
    let mut sum = 1.0;
    for n in 2..=TAYLOR_TERMS {
        c_n *= x / n as f64;
        sum += c_n;
    }
    sum
}

fn expm1d_taylor_grad(x: f64) -> f64 {
    // d/dx x^(n-1)/n! = (n-1) x^(n-2)/n!
    let mut sum = 0.0;
    let mut power = 1.0;
    let mut factorial = 1.0;
    for n in 2..=TAYLOR_TERMS {
        factorial *= n as f64;
        sum += (n - 1) as f64 * power / factorial;
        power *= x;
    }
    sum
}

// ============================================================================
// Exponential integral
// ============================================================================

/// Exponential integral `Ei(x) = -PV ∫_{-x}^∞ e^{-t}/t dt`.
///
/// Defined for every real `x ≠ 0`; zero and NaN give
/// [`KernelError::Domain`].
///
/// ```rust
/// use sfs_tensor::expi;
///
/// assert!((expi(1.0).unwrap() - 1.895_117_816_355_937).abs() < 1e-14);
/// assert!(expi(0.0).is_err());
/// ```
pub fn expi(x: f64) -> Result<f64> {
    if x == 0.0 || x.is_nan() {
        return Err(KernelError::Domain {
            function: "Ei",
            argument: x,
        });
    }
    if x == f64::INFINITY {
        return Ok(f64::INFINITY);
    }
    if x == f64::NEG_INFINITY {
        return Ok(0.0);
    }

    if x < -1.0 {
        Ok(-e1_continued_fraction(-x))
    } else if x < -f64::EPSILON.ln() {
        Ok(ei_power_series(x))
    } else {
        Ok(ei_asymptotic(x))
    }
}

/// Cotangent of [`expi`]: `g · e^x / x`.
pub fn expi_grad(x: f64, g: f64) -> f64 {
    g * x.exp() / x
}

/// `γ + ln|x| + Σ x^k / (k·k!)`, convergent for all `x ≠ 0`.
fn ei_power_series(x: f64) -> f64 {
    let mut sum = 0.0;
    let mut term = 1.0;
    for k in 1..MAX_ITERATIONS {
        term *= x / k as f64;
        let contribution = term / k as f64;
        sum += contribution;
        if contribution.abs() < f64::EPSILON * sum.abs() {
            break;
        }
    }
    sum + x.abs().ln() + EULER_GAMMA
}

/// `e^x/x · Σ k!/x^k`, truncated before the terms start to grow.
fn ei_asymptotic(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..MAX_ITERATIONS {
        let previous = term;
        term *= k as f64 / x;
        if term < f64::EPSILON {
            break;
        }
        if term >= previous {
            sum -= previous;
            break;
        }
        sum += term;
    }
    x.exp() * sum / x
}

/// `E1(y)` for `y > 1` by the modified Lentz continued fraction.
fn e1_continued_fraction(y: f64) -> f64 {
    let tiny = f64::MIN_POSITIVE / f64::EPSILON;
    let mut b = y + 1.0;
    let mut c = 1.0 / tiny;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..MAX_ITERATIONS {
        let an = -((i * i) as f64);
        b += 2.0;
        d = 1.0 / (an * d + b);
        c = b + an / c;
        let delta = c * d;
        h *= delta;
        if (delta - 1.0).abs() < f64::EPSILON {
            break;
        }
    }
    h * (-y).exp()
}

// ============================================================================
// Transformed exponential integral
// ============================================================================

/// `-Ei(-1/x) · e^(1/x) / x` for a vector sorted by non-increasing `|x|`.
///
/// Entries with `|x| >= SERIES_CUTOFF` use the closed form; the rest use
/// the asymptotic series `Σ (-1)^n n! x^n` through `n = SERIES_TERMS`, where
/// the closed form would overflow. Sortedness makes the closed-form group a
/// prefix, so results come back in input order.
pub fn transformed_expi(x: &Tensor<f64>) -> Result<Tensor<f64>> {
    let values = sorted_values(x)?;
    let split = series_split(&values);
    log::debug!(
        "transformed_expi: {} closed-form, {} series",
        split,
        values.len() - split
    );

    let mut out = Vec::with_capacity(values.len());
    for &v in &values[..split] {
        out.push(transformed_expi_naive(v)?);
    }
    out.extend(values[split..].iter().map(|&v| transformed_expi_series(v)));
    Tensor::from_vec(out, &[values.len()])
}

/// [`transformed_expi`] for one value.
pub fn transformed_expi_scalar(x: f64) -> Result<f64> {
    if x.abs() < SERIES_CUTOFF {
        Ok(transformed_expi_series(x))
    } else {
        transformed_expi_naive(x)
    }
}

/// Cotangent of [`transformed_expi`] for upstream gradient `g`.
///
/// The closed-form group uses `(1 - f(x)(1 + x)) / x²`; the series group
/// differentiates the truncated series term by term.
pub fn transformed_expi_vjp(x: &Tensor<f64>, g: &Tensor<f64>) -> Result<Tensor<f64>> {
    let values = sorted_values(x)?;
    if g.shape() != x.shape() {
        return Err(KernelError::ShapeMismatch {
            expected: x.shape().to_vec(),
            actual: g.shape().to_vec(),
        });
    }
    let split = series_split(&values);
    let upstream = g.to_vec();

    let mut out = Vec::with_capacity(values.len());
    for (i, &v) in values.iter().enumerate() {
        let slope = if i < split {
            let f = transformed_expi_naive(v)?;
            (1.0 - f * (1.0 + v)) / (v * v)
        } else {
            transformed_expi_series_grad(v)
        };
        out.push(upstream[i] * slope);
    }
    Tensor::from_vec(out, &[values.len()])
}

fn sorted_values(x: &Tensor<f64>) -> Result<Vec<f64>> {
    if x.ndim() != 1 {
        return Err(KernelError::InvalidShape {
            message: format!("transformed_expi expects a vector, got shape {:?}", x.shape()),
        });
    }
    let values = x.to_vec();
    debug_assert!(
        values.windows(2).all(|w| w[0].abs() >= w[1].abs()),
        "transformed_expi input must be sorted by decreasing magnitude"
    );
    Ok(values)
}

/// Index of the first entry handled by the series.
fn series_split(values: &[f64]) -> usize {
    values.iter().position(|v| v.abs() < SERIES_CUTOFF).unwrap_or(values.len())
}

fn transformed_expi_naive(x: f64) -> Result<f64> {
    let inv = 1.0 / x;
    Ok(-expi(-inv)? * inv.exp() / x)
}

fn transformed_expi_series(x: f64) -> f64 {
    let mut c_n = 1.0;
    let mut sum = 1.0;
    for n in 1..=SERIES_TERMS {
        c_n = -c_n * x * n as f64;
        sum += c_n;
    }
    sum
}

fn transformed_expi_series_grad(x: f64) -> f64 {
    // c_n = (-1)^n n! x^n, so d c_n/dx = n · c_{n-1} · (-n)
    let mut c_prev = 1.0;
    let mut sum = 0.0;
    for n in 1..=SERIES_TERMS {
        let n = n as f64;
        sum += -n * n * c_prev;
        c_prev = -c_prev * x * n;
    }
    sum
}
