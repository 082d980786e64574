//! Array element storage
//!
//! Elements below [`DENSE_LIMIT`] past the current dense end live in a
//! vector; writes far beyond it go to a sparse map so `a[1e9] = 1` does not
//! allocate a billion slots. Holes are `None` in the dense part and missing
//! keys in the sparse part.

use std::collections::BTreeMap;

use crate::value::Value;

/// How far past the dense end a write may land and still grow the vector
const DENSE_LIMIT: u32 = 1024;

/// Storage for the indexed elements of an array
#[derive(Debug, Clone, Default)]
pub struct ArrayStorage {
    dense: Vec<Option<Value>>,
    sparse: BTreeMap<u32, Value>,
    length: u32,
    /// Set by `Object.freeze`; elements and length become read-only
    pub(crate) frozen: bool,
}

impl ArrayStorage {
    /// Create an empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an array holding `values` with no holes
    pub fn from_values(values: Vec<Value>) -> Self {
        let length = values.len() as u32;
        Self {
            dense: values.into_iter().map(Some).collect(),
            sparse: BTreeMap::new(),
            length,
            frozen: false,
        }
    }

    /// The `length` property
    pub fn len(&self) -> u32 {
        self.length
    }

    /// Whether the length is zero
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Element at `index`, `None` for holes and out-of-range indices
    pub fn get(&self, index: u32) -> Option<&Value> {
        match self.dense.get(index as usize) {
            Some(slot) => slot.as_ref(),
            None => self.sparse.get(&index),
        }
    }

    /// Whether an element exists at `index`
    pub fn has(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    /// Store `value` at `index`, growing the length to `index + 1` when the
    /// index is at or past the end
    pub fn set(&mut self, index: u32, value: Value) {
        let dense_len = self.dense.len() as u32;
        if index < dense_len {
            self.dense[index as usize] = Some(value);
        } else if index - dense_len < DENSE_LIMIT && self.sparse.is_empty() {
            self.dense.resize(index as usize, None);
            self.dense.push(Some(value));
        } else {
            self.sparse.insert(index, value);
        }
        if index >= self.length {
            self.length = index + 1;
        }
    }

    /// Append at the current length
    pub fn push(&mut self, value: Value) {
        let index = self.length;
        self.set(index, value);
    }

    /// Extend the length by one without storing an element
    pub fn push_hole(&mut self) {
        self.length += 1;
    }

    /// Remove the element at `index`, leaving a hole
    pub fn remove(&mut self, index: u32) -> Option<Value> {
        match self.dense.get_mut(index as usize) {
            Some(slot) => slot.take(),
            None => self.sparse.remove(&index),
        }
    }

    /// Set the length, deleting every element at or above the new length
    pub fn set_len(&mut self, length: u32) {
        if length < self.length {
            self.dense.truncate(length as usize);
            self.sparse.retain(|&index, _| index < length);
        }
        self.length = length;
    }

    /// Indices that hold an element, ascending
    pub fn indices(&self) -> Vec<u32> {
        let dense = self
            .dense
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| i as u32);
        dense.chain(self.sparse.keys().copied()).collect()
    }

    /// Elements in index order with holes read as undefined
    pub fn to_vec(&self) -> Vec<Value> {
        (0..self.length)
            .map(|i| self.get(i).cloned().unwrap_or_default())
            .collect()
    }
}
