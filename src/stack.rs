//! Index-addressable evaluation stack

use thiserror::Error;

/// Out-of-range access on a [`ContextStack`]. Never clamped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    #[error("stack index {index} out of range for {count} items")]
    OutOfRange { index: isize, count: usize },
    #[error("stack range {from}..{to} out of range for {count} items")]
    BadRange { from: isize, to: isize, count: usize },
}

/// Vector-backed stack addressed from the top with negative indices:
/// `top(-1)` is the topmost item, `top(-count)` the bottom one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStack<T> {
    items: Vec<T>,
}

impl<T> Default for ContextStack<T> {
    fn default() -> Self {
        ContextStack { items: Vec::new() }
    }
}

impl<T> ContextStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ContextStack { items: Vec::with_capacity(capacity) }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Result<T, StackError> {
        self.items.pop().ok_or(StackError::OutOfRange { index: -1, count: 0 })
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Translate a negative top-relative index into a vector position
    fn position(&self, index: isize) -> Result<usize, StackError> {
        let count = self.items.len();
        if index >= 0 || index.unsigned_abs() > count {
            return Err(StackError::OutOfRange { index, count });
        }
        Ok(count - index.unsigned_abs())
    }

    pub fn top(&self, index: isize) -> Result<&T, StackError> {
        let pos = self.position(index)?;
        Ok(&self.items[pos])
    }

    pub fn top_mut(&mut self, index: isize) -> Result<&mut T, StackError> {
        let pos = self.position(index)?;
        Ok(&mut self.items[pos])
    }

    pub fn swap(&mut self, a: isize, b: isize) -> Result<(), StackError> {
        let a = self.position(a)?;
        let b = self.position(b)?;
        self.items.swap(a, b);
        Ok(())
    }

    /// Insert so that the new item ends up at top-relative `index`.
    /// `-1` is the same as a push; `-(count + 1)` puts it at the bottom.
    pub fn insert(&mut self, index: isize, item: T) -> Result<(), StackError> {
        let count = self.items.len();
        if index >= 0 || index.unsigned_abs() > count + 1 {
            return Err(StackError::OutOfRange { index, count });
        }
        self.items.insert(count + 1 - index.unsigned_abs(), item);
        Ok(())
    }

    /// Remove and return the item at top-relative `index`
    pub fn remove(&mut self, index: isize) -> Result<T, StackError> {
        let pos = self.position(index)?;
        Ok(self.items.remove(pos))
    }

    /// Remove the items from top-relative `from` up to but excluding `to`,
    /// e.g. `remove_range(-3, -1)` drops the second and third items.
    pub fn remove_range(&mut self, from: isize, to: isize) -> Result<(), StackError> {
        let count = self.items.len();
        let bad = StackError::BadRange { from, to, count };
        if from > to || to > 0 {
            return Err(bad);
        }
        let start = self.position(from).map_err(|_| bad)?;
        let end = if to == 0 { count } else { self.position(to).map_err(|_| bad)? };
        self.items.drain(start..end);
        Ok(())
    }

    /// Top to bottom
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter().rev()
    }

    /// Bottom to top, as stored
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<Vec<T>> for ContextStack<T> {
    fn from(items: Vec<T>) -> Self {
        ContextStack { items }
    }
}
