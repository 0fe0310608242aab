//! Gradient rules for every differentiable primitive.
//!
//! A reverse-mode driver records each evaluated [`Primitive`] together with
//! its inputs and output (see [`Record`]) and later asks for the
//! vector-Jacobian product of one argument position. Summing contributions
//! from several consumers is left to the driver.
//!
//! ```rust
//! use sfs_tensor::{Primitive, Record, Tensor, Value};
//!
//! let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
//! let record = Record::unary(Primitive::Trace { offset: 0 }, Value::Real(a.clone())).unwrap();
//!
//! let grad = record.vjp(0, &Value::Real(Tensor::scalar(1.0))).unwrap();
//! assert_eq!(grad.as_real().unwrap().to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
//!
//! // Only `Einsum2` mentions labels, so `Record::new` on any other variant
//! // cannot infer the label type. Name it with a turbofish.
//! let same = Record::<char>::new(Primitive::Trace { offset: 0 }, vec![Value::Real(a)]).unwrap();
//! assert_eq!(same.output, record.output);
//! ```

use crate::algebra::{Complex64, Scalar};
use crate::axes::{swapaxes, trace, trace_vjp};
use crate::einsum::{einsum2, einsum2_vjp, EinArg, Label};
use crate::error::{KernelError, Result};
use crate::spectral::{fftn, fftn_vjp};
use crate::special::{expi, expi_grad, expm1d, expm1d_grad, transformed_expi, transformed_expi_vjp};
use crate::tensor::Tensor;

/// A real or complex tensor flowing through a primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Real(Tensor<f64>),
    Complex(Tensor<Complex64>),
}

impl Value {
    /// Shape of the underlying tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            Value::Real(t) => t.shape(),
            Value::Complex(t) => t.shape(),
        }
    }

    /// The real tensor, or [`KernelError::ValueKind`].
    pub fn as_real(&self) -> Result<&Tensor<f64>> {
        match self {
            Value::Real(t) => Ok(t),
            Value::Complex(_) => Err(KernelError::ValueKind { expected: "real" }),
        }
    }

    /// The complex tensor, or [`KernelError::ValueKind`].
    pub fn as_complex(&self) -> Result<&Tensor<Complex64>> {
        match self {
            Value::Complex(t) => Ok(t),
            Value::Real(_) => Err(KernelError::ValueKind { expected: "complex" }),
        }
    }

    /// Lift to complex, sharing storage when already complex.
    pub fn to_complex(&self) -> Tensor<Complex64> {
        match self {
            Value::Real(t) => t.to_complex(),
            Value::Complex(t) => t.clone(),
        }
    }

    fn is_complex(&self) -> bool {
        matches!(self, Value::Complex(_))
    }
}

impl From<Tensor<f64>> for Value {
    fn from(t: Tensor<f64>) -> Self {
        Value::Real(t)
    }
}

impl From<Tensor<Complex64>> for Value {
    fn from(t: Tensor<Complex64>) -> Self {
        Value::Complex(t)
    }
}

/// Apply the same generic expression to either kind of [`Value`].
macro_rules! map_value {
    ($value:expr, |$t:ident| $body:expr) => {
        match $value {
            Value::Real($t) => Value::Real($body),
            Value::Complex($t) => Value::Complex($body),
        }
    };
}

/// Vector-Jacobian product closure for one argument position.
pub type Vjp<'a> = Box<dyn Fn(&Value) -> Result<Value> + 'a>;

/// A differentiable operation and its non-tensor parameters.
///
/// `L` is the einsum label type. It defaults to `usize` for the variants
/// that carry no labels.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive<L: Label = usize> {
    /// [`einsum2`] with the label list of each operand and the output labels.
    Einsum2 { labels: Vec<Vec<L>>, output: Vec<L> },
    /// [`swapaxes`](crate::swapaxes).
    SwapAxes { axis1: usize, axis2: usize },
    /// [`trace`](crate::trace).
    Trace { offset: isize },
    /// [`fftn`] to the given lengths along `axes`.
    Fftn { shape: Vec<usize>, axes: Vec<usize> },
    /// Elementwise [`expi`](crate::expi).
    Expi,
    /// Elementwise [`expm1d`](crate::expm1d).
    Expm1d,
    /// [`transformed_expi`](crate::transformed_expi) on a sorted vector.
    TransformedExpi,
}

impl<L: Label> Primitive<L> {
    /// Number of argument positions.
    ///
    /// For `Einsum2` this counts the label lists too: `2·operands + 1`.
    pub fn arity(&self) -> usize {
        match self {
            Primitive::Einsum2 { labels, .. } => 2 * labels.len() + 1,
            _ => 1,
        }
    }

    /// Number of tensor inputs.
    fn operand_count(&self) -> usize {
        match self {
            Primitive::Einsum2 { labels, .. } => labels.len(),
            _ => 1,
        }
    }

    /// Evaluate forward.
    pub fn apply(&self, inputs: &[Value]) -> Result<Value> {
        self.check_inputs(inputs)?;
        match self {
            Primitive::Einsum2 { labels, output } => {
                if inputs.iter().any(Value::is_complex) {
                    let tensors: Vec<Tensor<Complex64>> = inputs.iter().map(Value::to_complex).collect();
                    Ok(Value::Complex(einsum2(&ein_args(&tensors, labels, output))?))
                } else {
                    let tensors = real_tensors(inputs)?;
                    Ok(Value::Real(einsum2(&ein_args(&tensors, labels, output))?))
                }
            }
            Primitive::SwapAxes { axis1, axis2 } => Ok(map_value!(&inputs[0], |t| swapaxes(t, *axis1, *axis2)?)),
            Primitive::Trace { offset } => Ok(map_value!(&inputs[0], |t| trace(t, *offset)?)),
            Primitive::Fftn { shape, axes } => match &inputs[0] {
                Value::Real(t) => Ok(Value::Complex(fftn(t, shape, axes)?)),
                Value::Complex(t) => Ok(Value::Complex(fftn(t, shape, axes)?)),
            },
            Primitive::Expi => {
                let x = inputs[0].as_real()?;
                let data = x.to_vec().into_iter().map(expi).collect::<Result<Vec<f64>>>()?;
                Ok(Value::Real(Tensor::from_vec(data, x.shape())?))
            }
            Primitive::Expm1d => Ok(Value::Real(inputs[0].as_real()?.map(expm1d))),
            Primitive::TransformedExpi => Ok(Value::Real(transformed_expi(inputs[0].as_real()?)?)),
        }
    }

    /// Gradient rule for argument `position`.
    ///
    /// `inputs` are the tensor inputs of the forward call and `output` its
    /// result; the returned closure maps an upstream gradient shaped like
    /// `output` to one shaped like the input at `position`.
    pub fn gradient_of<'a>(&'a self, position: usize, inputs: &[Value], output: &Value) -> Result<Vjp<'a>> {
        if position >= self.arity() {
            return Err(KernelError::ArgumentOutOfRange {
                position,
                arity: self.arity(),
            });
        }
        if let Primitive::Einsum2 { .. } = self {
            if position % 2 == 1 || position == self.arity() - 1 {
                return Err(KernelError::NonDifferentiableArgument { position });
            }
        }
        self.check_inputs(inputs)?;

        let out_shape = output.shape().to_vec();
        let check_grad = move |g: &Value| -> Result<()> {
            if g.shape() != out_shape.as_slice() {
                return Err(KernelError::ShapeMismatch {
                    expected: out_shape.clone(),
                    actual: g.shape().to_vec(),
                });
            }
            Ok(())
        };

        let vjp: Vjp<'a> = match self {
            Primitive::Einsum2 { labels, output } => {
                let target_is_real = !inputs[position / 2].is_complex();
                if inputs.iter().any(Value::is_complex) {
                    let tensors: Vec<Tensor<Complex64>> = inputs.iter().map(Value::to_complex).collect();
                    Box::new(move |g| {
                        check_grad(g)?;
                        let d = einsum2_vjp(&ein_args(&tensors, labels, output), position, &g.to_complex())?;
                        Ok(if target_is_real { Value::Real(d.re()) } else { Value::Complex(d) })
                    })
                } else {
                    let tensors = real_tensors(inputs)?;
                    Box::new(move |g| {
                        check_grad(g)?;
                        let d = einsum2_vjp(&ein_args(&tensors, labels, output), position, g.as_real()?)?;
                        Ok(Value::Real(d))
                    })
                }
            }
            Primitive::SwapAxes { axis1, axis2 } => {
                let (axis1, axis2) = (*axis1, *axis2);
                Box::new(move |g| {
                    check_grad(g)?;
                    Ok(map_value!(g, |t| swapaxes(t, axis1, axis2)?))
                })
            }
            Primitive::Trace { offset } => {
                let offset = *offset;
                let shape = inputs[0].shape().to_vec();
                Box::new(move |g| {
                    check_grad(g)?;
                    Ok(map_value!(g, |t| trace_vjp(t, &shape, offset)?))
                })
            }
            Primitive::Fftn { axes, .. } => {
                let input_is_real = !inputs[0].is_complex();
                let shape = inputs[0].shape().to_vec();
                Box::new(move |g| {
                    check_grad(g)?;
                    let d = fftn_vjp(g.as_complex()?, &shape, axes)?;
                    Ok(if input_is_real { Value::Real(d.re()) } else { Value::Complex(d) })
                })
            }
            Primitive::Expi => {
                let x = inputs[0].as_real()?.clone();
                Box::new(move |g| {
                    check_grad(g)?;
                    Ok(Value::Real(x.zip_with(g.as_real()?, expi_grad)?))
                })
            }
            Primitive::Expm1d => {
                let x = inputs[0].as_real()?.clone();
                Box::new(move |g| {
                    check_grad(g)?;
                    Ok(Value::Real(x.zip_with(g.as_real()?, |x, g| g * expm1d_grad(x))?))
                })
            }
            Primitive::TransformedExpi => {
                let x = inputs[0].as_real()?.clone();
                Box::new(move |g| {
                    check_grad(g)?;
                    Ok(Value::Real(transformed_expi_vjp(&x, g.as_real()?)?))
                })
            }
        };
        Ok(vjp)
    }

    fn check_inputs(&self, inputs: &[Value]) -> Result<()> {
        if inputs.len() != self.operand_count() {
            return Err(KernelError::InvalidShape {
                message: format!(
                    "primitive takes {} tensor inputs, got {}",
                    self.operand_count(),
                    inputs.len()
                ),
            });
        }
        Ok(())
    }
}

/// One evaluated primitive, kept for the backward pass.
#[derive(Debug, Clone)]
pub struct Record<L: Label = usize> {
    pub primitive: Primitive<L>,
    pub inputs: Vec<Value>,
    pub output: Value,
}

impl<L: Label> Record<L> {
    /// Evaluate `primitive` on `inputs` and keep everything.
    pub fn new(primitive: Primitive<L>, inputs: Vec<Value>) -> Result<Self> {
        let output = primitive.apply(&inputs)?;
        Ok(Self {
            primitive,
            inputs,
            output,
        })
    }

    /// Cotangent of the argument at `position` given the output cotangent.
    pub fn vjp(&self, position: usize, grad: &Value) -> Result<Value> {
        let rule = self.primitive.gradient_of(position, &self.inputs, &self.output)?;
        rule(grad)
    }
}

impl Record<usize> {
    /// Evaluate a single-input primitive.
    ///
    /// The label type is fixed, so `Record::unary(Primitive::Expm1d, x)`
    /// needs no turbofish.
    pub fn unary(primitive: Primitive, input: Value) -> Result<Self> {
        Self::new(primitive, vec![input])
    }
}

fn real_tensors(inputs: &[Value]) -> Result<Vec<Tensor<f64>>> {
    inputs.iter().map(|v| v.as_real().cloned()).collect()
}

fn ein_args<'a, T: Scalar, L: Label>(
    tensors: &'a [Tensor<T>],
    labels: &'a [Vec<L>],
    output: &'a [L],
) -> Vec<EinArg<'a, T, L>> {
    let mut args = Vec::with_capacity(2 * tensors.len() + 1);
    for (tensor, ix) in tensors.iter().zip(labels) {
        args.push(EinArg::Tensor(tensor));
        args.push(EinArg::Labels(ix.as_slice()));
    }
    args.push(EinArg::Labels(output));
    args
}
