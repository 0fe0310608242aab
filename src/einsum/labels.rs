//! Per-call symbol table mapping arbitrary labels to dense integers.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Anything usable as an einsum index label.
///
/// Blanket-implemented for every `Clone + Eq + Hash + Debug` type, so
/// `char`, `&str`, `String`, integers and tuples all work.
pub trait Label: Clone + Eq + Hash + Debug {}

impl<L: Clone + Eq + Hash + Debug> Label for L {}

/// Dense numbering of the labels seen in one contraction call.
///
/// Ids are assigned in first-appearance order and are meaningless outside
/// the table that issued them.
///
/// # Example
///
/// ```rust
/// use sfs_tensor::LabelTable;
///
/// let mut table = LabelTable::new();
/// assert_eq!(table.encode(&["pop1", "pop2"]), vec![0, 1]);
/// assert_eq!(table.encode(&["pop2", "time"]), vec![1, 2]);
/// assert_eq!(table.label(2), &"time");
/// ```
#[derive(Debug, Clone)]
pub struct LabelTable<L: Label> {
    ids: HashMap<L, usize>,
    labels: Vec<L>,
}

impl<L: Label> Default for LabelTable<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Label> LabelTable<L> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            labels: Vec::new(),
        }
    }

    /// Id of `label`, assigning the next free id if it is new.
    pub fn intern(&mut self, label: &L) -> usize {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = self.labels.len();
        self.ids.insert(label.clone(), id);
        self.labels.push(label.clone());
        id
    }

    /// Intern every label of a list.
    pub fn encode(&mut self, labels: &[L]) -> Vec<usize> {
        labels.iter().map(|l| self.intern(l)).collect()
    }

    /// Id of `label` if it has been seen.
    pub fn get(&self, label: &L) -> Option<usize> {
        self.ids.get(label).copied()
    }

    /// Label behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    pub fn label(&self, id: usize) -> &L {
        &self.labels[id]
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label has been interned.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Render the label behind `id` for error messages.
    pub(crate) fn describe(&self, id: usize) -> String {
        format!("{:?}", self.labels[id])
    }
}
