//! Labeled Einstein summation.
//!
//! [`einsum2`] takes an alternating `(tensor, labels)` argument list followed
//! by the output labels. Labels can be any hashable value; a per-call
//! [`LabelTable`] numbers them densely before the integer-indexed [`Einsum`]
//! evaluator runs.

mod backward;
mod engine;
mod labels;

pub use backward::einsum2_vjp;
pub use engine::{ContractionOrder, Einsum};
pub use labels::{Label, LabelTable};

use std::collections::HashMap;

use crate::algebra::Scalar;
use crate::error::{KernelError, Result};
use crate::tensor::Tensor;

/// One element of an [`einsum2`] argument list.
#[derive(Debug)]
pub enum EinArg<'a, T: Scalar, L: Label> {
    /// An operand tensor; must sit at an even position.
    Tensor(&'a Tensor<T>),
    /// A label list; follows each tensor and closes the list as the output.
    Labels(&'a [L]),
}

impl<T: Scalar, L: Label> Clone for EinArg<'_, T, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Scalar, L: Label> Copy for EinArg<'_, T, L> {}

/// Contract labeled tensors.
///
/// `args` is `tensor, labels, tensor, labels, ..., output_labels`. Labels
/// occurring in several operands are contracted (or batched when they also
/// occur in the output), repeated labels within an operand take a diagonal,
/// and labels missing from the output are summed.
///
/// # Example
///
/// ```rust
/// use sfs_tensor::{einsum2, EinArg, Tensor};
///
/// let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let b = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
///
/// let c = einsum2(&[
///     EinArg::Tensor(&a),
///     EinArg::Labels(&['i', 'j']),
///     EinArg::Tensor(&b),
///     EinArg::Labels(&['j', 'k']),
///     EinArg::Labels(&['i', 'k']),
/// ])
/// .unwrap();
/// assert_eq!(c.to_vec(), vec![7.0, 10.0, 15.0, 22.0]);
/// ```
pub fn einsum2<T: Scalar, L: Label>(args: &[EinArg<'_, T, L>]) -> Result<Tensor<T>> {
    let (tensors, ixs, iy) = split_args(args)?;
    contract_labeled(&tensors, &ixs, iy, None)
}

/// Build an [`einsum2`] call from `tensor, [labels]` pairs and a trailing
/// `[output]` list.
///
/// ```rust
/// use sfs_tensor::{einsum2, Tensor};
///
/// let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let tr = einsum2!(a, ['i', 'i'], []).unwrap();
/// assert_eq!(tr.item().unwrap(), 5.0);
/// ```
#[macro_export]
macro_rules! einsum2 {
    (@acc [$($acc:tt)*] [$($out:expr),* $(,)?] $(,)?) => {
        $crate::einsum::einsum2(&[
            $($acc)*
            $crate::einsum::EinArg::Labels(&[$($out),*]),
        ])
    };
    (@acc [$($acc:tt)*] $t:expr, [$($l:expr),* $(,)?], $($rest:tt)+) => {
        $crate::einsum2!(@acc [
            $($acc)*
            $crate::einsum::EinArg::Tensor(&$t),
            $crate::einsum::EinArg::Labels(&[$($l),*]),
        ] $($rest)+)
    };
    ($($args:tt)+) => {
        $crate::einsum2!(@acc [] $($args)+)
    };
}

type SplitArgs<'a, T, L> = (Vec<&'a Tensor<T>>, Vec<&'a [L]>, &'a [L]);

/// Check alternation and separate operands, their labels and the output.
pub(crate) fn split_args<'a, T: Scalar, L: Label>(args: &[EinArg<'a, T, L>]) -> Result<SplitArgs<'a, T, L>> {
    if args.len() % 2 == 0 {
        return Err(KernelError::OddArgumentCount { count: args.len() });
    }

    let n = args.len() / 2;
    let mut tensors = Vec::with_capacity(n);
    let mut ixs = Vec::with_capacity(n);
    for i in 0..n {
        match args[2 * i] {
            EinArg::Tensor(t) => tensors.push(t),
            EinArg::Labels(_) => {
                return Err(KernelError::MalformedArguments {
                    position: 2 * i,
                    expected: "tensor",
                })
            }
        }
        match args[2 * i + 1] {
            EinArg::Labels(ix) => ixs.push(ix),
            EinArg::Tensor(_) => {
                return Err(KernelError::MalformedArguments {
                    position: 2 * i + 1,
                    expected: "label list",
                })
            }
        }
    }

    match args[2 * n] {
        EinArg::Labels(iy) => Ok((tensors, ixs, iy)),
        EinArg::Tensor(_) => Err(KernelError::MalformedArguments {
            position: 2 * n,
            expected: "output label list",
        }),
    }
}

/// Shared contraction entry for the forward op and its gradient.
///
/// With `seed == None` the output must be a duplicate-free subset of the
/// operand labels. With a seed, output labels may repeat and may be absent
/// from every operand as long as the seed supplies their extents.
pub(crate) fn contract_labeled<T: Scalar, L: Label>(
    tensors: &[&Tensor<T>],
    ixs: &[&[L]],
    iy: &[L],
    seed: Option<(&[L], &[usize])>,
) -> Result<Tensor<T>> {
    if tensors.is_empty() {
        return Err(KernelError::InvalidShape {
            message: "einsum needs at least one operand".to_string(),
        });
    }

    let mut table = LabelTable::new();
    let int_ixs: Vec<Vec<usize>> = ixs.iter().map(|ix| table.encode(ix)).collect();
    let int_iy = table.encode(iy);

    let mut size_dict: HashMap<usize, usize> = HashMap::new();
    for (tensor, ix) in tensors.iter().zip(int_ixs.iter()) {
        if tensor.ndim() != ix.len() {
            return Err(KernelError::RankMismatch {
                expected: tensor.ndim(),
                actual: ix.len(),
            });
        }
        for (&id, &extent) in ix.iter().zip(tensor.shape()) {
            record_extent(&mut size_dict, &table, id, extent)?;
        }
    }

    match seed {
        None => {
            for (pos, &id) in int_iy.iter().enumerate() {
                if !size_dict.contains_key(&id) {
                    return Err(KernelError::UnknownOutputLabel {
                        label: table.describe(id),
                    });
                }
                if int_iy[..pos].contains(&id) {
                    return Err(KernelError::DuplicateOutputLabel {
                        label: table.describe(id),
                    });
                }
            }
        }
        Some((labels, shape)) => {
            for (label, &extent) in labels.iter().zip(shape) {
                let id = table.intern(label);
                record_extent(&mut size_dict, &table, id, extent)?;
            }
        }
    }

    log::debug!(
        "einsum2: {} operands, {} labels, output rank {}",
        tensors.len(),
        table.len(),
        int_iy.len()
    );

    Einsum::new(int_ixs, int_iy, size_dict).execute(tensors)
}

fn record_extent<L: Label>(
    size_dict: &mut HashMap<usize, usize>,
    table: &LabelTable<L>,
    id: usize,
    extent: usize,
) -> Result<()> {
    match size_dict.get(&id) {
        Some(&first) if first != extent => Err(KernelError::InconsistentExtent {
            label: table.describe(id),
            first,
            second: extent,
        }),
        Some(_) => Ok(()),
        None => {
            size_dict.insert(id, extent);
            Ok(())
        }
    }
}
