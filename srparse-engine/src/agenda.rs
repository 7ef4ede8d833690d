//! Capacity-bounded priority agenda
//!
//! Keeps the `capacity` highest-scoring items seen so far. Among equal
//! scores the item pushed first wins, so a full agenda evicts the newest of
//! its worst entries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry<T> {
    score: f64,
    sequence: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// The heap top is the entry to evict: lowest score, then latest push
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Bounded max-agenda over scored items
#[derive(Debug)]
pub struct Agenda<T> {
    capacity: usize,
    heap: BinaryHeap<Entry<T>>,
    next_sequence: u64,
}

impl<T> Agenda<T> {
    /// Creates an agenda holding at most `capacity` items (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity + 1),
            next_sequence: 0,
        }
    }

    /// Maximum number of items kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts an item, evicting the worst one when over capacity
    pub fn push(&mut self, score: f64, item: T) {
        self.heap.push(Entry {
            score,
            sequence: self.next_sequence,
            item,
        });
        self.next_sequence += 1;
        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    /// Number of items held
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is held
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Lowest score currently held
    pub fn worst_score(&self) -> Option<f64> {
        self.heap.peek().map(|entry| entry.score)
    }

    /// Items in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.heap.iter().map(|entry| &entry.item)
    }

    /// Items with their scores, best first
    pub fn into_scored_vec(self) -> Vec<(f64, T)> {
        // Ascending in the heap order is best first
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| (entry.score, entry.item))
            .collect()
    }

    /// Items, best first
    pub fn into_sorted_vec(self) -> Vec<T> {
        self.into_scored_vec()
            .into_iter()
            .map(|(_, item)| item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_best_items() {
        let mut agenda = Agenda::new(3);
        for (score, item) in [(1.0, "a"), (5.0, "b"), (3.0, "c"), (4.0, "d"), (0.5, "e")] {
            agenda.push(score, item);
        }
        assert_eq!(agenda.len(), 3);
        assert_eq!(agenda.worst_score(), Some(3.0));
        assert_eq!(agenda.into_sorted_vec(), vec!["b", "d", "c"]);
    }

    #[test]
    fn test_ties_prefer_earlier_push() {
        let mut agenda = Agenda::new(2);
        agenda.push(1.0, 0);
        agenda.push(1.0, 1);
        agenda.push(1.0, 2);
        assert_eq!(agenda.into_sorted_vec(), vec![0, 1]);
    }

    #[test]
    fn test_capacity_one_keeps_first_maximum() {
        let mut agenda = Agenda::new(1);
        agenda.push(2.0, "first");
        agenda.push(2.0, "second");
        agenda.push(1.0, "third");
        assert_eq!(agenda.into_sorted_vec(), vec!["first"]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut agenda = Agenda::new(0);
        assert_eq!(agenda.capacity(), 1);
        agenda.push(1.0, ());
        assert!(!agenda.is_empty());
    }
}
