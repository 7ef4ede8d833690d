//! Persistent stack shared between parser states
//!
//! Every beam hypothesis holds its own stack, but hypotheses that descend
//! from the same ancestor share the cells below the point where they
//! diverged. `push` and `pop` never copy.

use std::fmt;
use std::sync::Arc;

struct Cell<T> {
    value: T,
    next: Option<Arc<Cell<T>>>,
}

/// Immutable singly linked stack with structural sharing
pub struct Stack<T> {
    head: Option<Arc<Cell<T>>>,
    len: usize,
}

impl<T> Stack<T> {
    /// Creates an empty stack
    pub fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Returns a new stack with `value` on top
    pub fn push(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Cell {
                value,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Returns the stack below the top element; popping an empty stack
    /// yields an empty stack
    pub fn pop(&self) -> Self {
        match &self.head {
            Some(cell) => Self {
                head: cell.next.clone(),
                len: self.len - 1,
            },
            None => Self::new(),
        }
    }

    /// Top element
    pub fn peek(&self) -> Option<&T> {
        self.head.as_deref().map(|cell| &cell.value)
    }

    /// Element `depth` positions below the top
    pub fn get(&self, depth: usize) -> Option<&T> {
        self.iter().nth(depth)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the stack holds nothing
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates from the top down
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Stack<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

// Long chains would otherwise drop recursively.
impl<T> Drop for Stack<T> {
    fn drop(&mut self) {
        let mut head = self.head.take();
        while let Some(cell) = head {
            match Arc::try_unwrap(cell) {
                Ok(mut cell) => head = cell.next.take(),
                Err(_) => break,
            }
        }
    }
}

impl<T: PartialEq> PartialEq for Stack<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let mut left = self.head.as_ref();
        let mut right = other.head.as_ref();
        loop {
            match (left, right) {
                (Some(a), Some(b)) => {
                    if Arc::ptr_eq(a, b) {
                        return true;
                    }
                    if a.value != b.value {
                        return false;
                    }
                    left = a.next.as_ref();
                    right = b.next.as_ref();
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Top-down iterator over a [`Stack`]
pub struct Iter<'a, T> {
    next: Option<&'a Cell<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|cell| {
            self.next = cell.next.as_deref();
            &cell.value
        })
    }
}

impl<'a, T> IntoIterator for &'a Stack<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_peek() {
        let empty: Stack<i32> = Stack::new();
        assert!(empty.is_empty());
        assert_eq!(empty.peek(), None);

        let one = empty.push(1);
        let two = one.push(2);
        assert_eq!(two.len(), 2);
        assert_eq!(two.peek(), Some(&2));
        assert_eq!(two.get(1), Some(&1));
        assert_eq!(two.get(2), None);
        assert_eq!(two.pop(), one);
        assert!(empty.pop().is_empty());
    }

    #[test]
    fn test_branches_share_tail() {
        let base = Stack::new().push("a").push("b");
        let left = base.push("c");
        let right = base.push("d");

        assert_eq!(left.iter().copied().collect::<Vec<_>>(), vec!["c", "b", "a"]);
        assert_eq!(right.iter().copied().collect::<Vec<_>>(), vec!["d", "b", "a"]);
        assert_eq!(left.pop(), right.pop());
        assert_ne!(left, right);
        // The original is untouched by either branch
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_equality_by_value() {
        let a = Stack::new().push(1).push(2);
        let b = Stack::new().push(1).push(2);
        let c = Stack::new().push(2).push(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deep_stack_drops() {
        let mut stack = Stack::new();
        for i in 0..200_000 {
            stack = stack.push(i);
        }
        assert_eq!(stack.len(), 200_000);
        drop(stack);
    }
}
