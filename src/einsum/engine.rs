//! Integer-indexed einsum execution with omeco contraction trees.

use std::collections::{HashMap, HashSet};

use omeco::{optimize_code, EinCode, GreedyMethod, NestedEinsum};

use crate::algebra::Scalar;
use crate::backend::cpu::reduce_labeled;
use crate::error::{KernelError, Result};
use crate::tensor::Tensor;

/// Order in which operands are folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractionOrder {
    /// Contract left to right.
    Pairwise,
    /// Follow the contraction tree found by omeco's greedy optimizer.
    #[default]
    Greedy,
}

/// Einsum specification over integer labels.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use sfs_tensor::{Einsum, Tensor};
///
/// // A[i,j] × B[j,k] → C[i,k]
/// let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let sizes: HashMap<usize, usize> = [(0, 2), (1, 2), (2, 2)].into();
/// let ein = Einsum::new(vec![vec![0, 1], vec![1, 2]], vec![0, 2], sizes);
/// let c = ein.execute(&[&a, &a]).unwrap();
/// assert_eq!(c.to_vec(), vec![7.0, 10.0, 15.0, 22.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Einsum {
    /// Input index labels for each tensor
    pub ixs: Vec<Vec<usize>>,

    /// Output index labels
    pub iy: Vec<usize>,

    /// Dimension sizes for each index
    pub size_dict: HashMap<usize, usize>,

    order: ContractionOrder,
}

impl Einsum {
    /// Create a new einsum specification.
    ///
    /// `size_dict` must cover every label. Output labels absent from all
    /// inputs are broadcast; repeated output labels embed a diagonal.
    pub fn new(ixs: Vec<Vec<usize>>, iy: Vec<usize>, size_dict: HashMap<usize, usize>) -> Self {
        Self {
            ixs,
            iy,
            size_dict,
            order: ContractionOrder::default(),
        }
    }

    /// Choose the contraction order.
    pub fn with_order(mut self, order: ContractionOrder) -> Self {
        self.order = order;
        self
    }

    /// The configured contraction order.
    pub fn order(&self) -> ContractionOrder {
        self.order
    }

    /// Execute the einsum contraction.
    pub fn execute<T: Scalar>(&self, tensors: &[&Tensor<T>]) -> Result<Tensor<T>> {
        self.validate(tensors)?;

        // Reduce each operand on its own first: collapse repeated labels and
        // sum labels that nothing else refers to.
        let mut operands: Vec<(Tensor<T>, Vec<usize>)> = Vec::with_capacity(tensors.len());
        for (i, (tensor, ix)) in tensors.iter().zip(self.ixs.iter()).enumerate() {
            let keep = self.needed_labels(i, ix);
            if &keep == ix {
                operands.push(((*tensor).clone(), keep));
            } else {
                operands.push((self.reduce(tensor, ix, &keep), keep));
            }
        }

        let tree = match self.order {
            ContractionOrder::Greedy if operands.len() > 2 => self.optimize(&operands),
            _ => None,
        };
        let (result, ix) = match tree {
            Some(tree) => self.execute_tree(&tree, &operands)?,
            None => self.execute_pairwise(operands)?,
        };

        if ix == self.iy {
            Ok(result)
        } else {
            Ok(self.reduce(&result, &ix, &self.iy))
        }
    }

    fn validate<T: Scalar>(&self, tensors: &[&Tensor<T>]) -> Result<()> {
        if tensors.is_empty() {
            return Err(KernelError::InvalidShape {
                message: "einsum needs at least one operand".to_string(),
            });
        }
        if tensors.len() != self.ixs.len() {
            return Err(KernelError::InvalidShape {
                message: format!(
                    "number of tensors {} doesn't match number of index specs {}",
                    tensors.len(),
                    self.ixs.len()
                ),
            });
        }

        for (tensor, ix) in tensors.iter().zip(self.ixs.iter()) {
            if tensor.ndim() != ix.len() {
                return Err(KernelError::RankMismatch {
                    expected: tensor.ndim(),
                    actual: ix.len(),
                });
            }
            for (&label, &extent) in ix.iter().zip(tensor.shape()) {
                match self.size_dict.get(&label) {
                    Some(&expected) if expected == extent => {}
                    Some(&expected) => {
                        return Err(KernelError::InconsistentExtent {
                            label: label.to_string(),
                            first: expected,
                            second: extent,
                        })
                    }
                    None => {
                        return Err(KernelError::InvalidShape {
                            message: format!("no size recorded for label {}", label),
                        })
                    }
                }
            }
        }

        for label in &self.iy {
            if !self.size_dict.contains_key(label) {
                return Err(KernelError::UnknownOutputLabel {
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Distinct labels of operand `i` that the output or another operand
    /// refers to, in first-appearance order.
    fn needed_labels(&self, i: usize, ix: &[usize]) -> Vec<usize> {
        let mut keep = Vec::with_capacity(ix.len());
        for &label in ix {
            if keep.contains(&label) {
                continue;
            }
            let elsewhere = self.iy.contains(&label)
                || self
                    .ixs
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.contains(&label));
            if elsewhere {
                keep.push(label);
            }
        }
        keep
    }

    /// Labels of `a ∪ b` still needed by the output or remaining operands.
    fn intermediate_output(&self, ia: &[usize], ib: &[usize], others: &HashSet<usize>) -> Vec<usize> {
        let mut output = Vec::new();
        for &l in ia.iter().chain(ib.iter()) {
            if (self.iy.contains(&l) || others.contains(&l)) && !output.contains(&l) {
                output.push(l);
            }
        }
        output
    }

    /// Greedy contraction tree over the reduced operands.
    ///
    /// The tree's root produces the distinct output labels that some operand
    /// carries; broadcasting and diagonal embedding happen afterwards.
    fn optimize<T: Scalar>(&self, operands: &[(Tensor<T>, Vec<usize>)]) -> Option<NestedEinsum<usize>> {
        let ixs: Vec<Vec<usize>> = operands.iter().map(|(_, ix)| ix.clone()).collect();
        let present: HashSet<usize> = ixs.iter().flatten().copied().collect();
        let mut iy = Vec::new();
        for &l in &self.iy {
            if present.contains(&l) && !iy.contains(&l) {
                iy.push(l);
            }
        }

        let code = EinCode::new(ixs, iy);
        let tree = optimize_code(&code, &self.size_dict, &GreedyMethod::new(0.0, 0.0));
        if tree.is_none() {
            log::debug!("omeco found no contraction tree, contracting left to right");
        }
        tree
    }

    /// Walk a binary contraction tree, returning the result and its labels.
    fn execute_tree<T: Scalar>(
        &self,
        tree: &NestedEinsum<usize>,
        operands: &[(Tensor<T>, Vec<usize>)],
    ) -> Result<(Tensor<T>, Vec<usize>)> {
        match tree {
            NestedEinsum::Leaf { tensor_index } => {
                operands.get(*tensor_index).cloned().ok_or_else(|| KernelError::InvalidShape {
                    message: format!("contraction tree refers to missing operand {}", tensor_index),
                })
            }
            NestedEinsum::Node { args, eins } => {
                if args.len() != 2 {
                    return Err(KernelError::InvalidShape {
                        message: format!("expected a binary contraction tree, got {} children", args.len()),
                    });
                }
                let (a, ia) = self.execute_tree(&args[0], operands)?;
                let (b, ib) = self.execute_tree(&args[1], operands)?;
                let iy = binary_output(&ia, &ib, &eins.iy);
                log::trace!("contract {:?} x {:?} -> {:?}", ia, ib, iy);
                Ok((a.contract_binary(&b, &ia, &ib, &iy), iy))
            }
        }
    }

    /// Contract left to right, keeping labels later operands or the output
    /// still need.
    fn execute_pairwise<T: Scalar>(
        &self,
        mut operands: Vec<(Tensor<T>, Vec<usize>)>,
    ) -> Result<(Tensor<T>, Vec<usize>)> {
        while operands.len() > 1 {
            let (b, ib) = operands.remove(1);
            let (a, ia) = operands.remove(0);

            let others: HashSet<usize> = operands.iter().flat_map(|(_, ix)| ix.iter().copied()).collect();
            let iy = self.intermediate_output(&ia, &ib, &others);
            log::trace!("contract {:?} x {:?} -> {:?}", ia, ib, iy);

            let c = a.contract_binary(&b, &ia, &ib, &iy);
            operands.insert(0, (c, iy));
        }

        operands.pop().ok_or_else(|| KernelError::InvalidShape {
            message: "einsum needs at least one operand".to_string(),
        })
    }

    fn reduce<T: Scalar>(&self, tensor: &Tensor<T>, ix: &[usize], iy: &[usize]) -> Tensor<T> {
        let data = tensor.to_vec();
        let (out, shape) = reduce_labeled(&data, tensor.shape(), ix, iy, &self.size_dict);
        Tensor::from_raw(out, shape)
    }
}

/// Output labels for one tree node.
///
/// `contract_binary` cannot sum a label carried by only one side, so such
/// labels stay even if the node's code drops them.
fn binary_output(ia: &[usize], ib: &[usize], node_iy: &[usize]) -> Vec<usize> {
    let mut iy: Vec<usize> = Vec::with_capacity(node_iy.len());
    for &l in node_iy {
        if (ia.contains(&l) || ib.contains(&l)) && !iy.contains(&l) {
            iy.push(l);
        }
    }
    for &l in ia.iter().chain(ib) {
        let one_sided = ia.contains(&l) != ib.contains(&l);
        if one_sided && !iy.contains(&l) {
            iy.push(l);
        }
    }
    iy
}
