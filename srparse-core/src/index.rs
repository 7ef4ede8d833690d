//! Dense numbering of transitions

use rustc_hash::FxHashMap;

use crate::transition::Transition;

/// Bidirectional map between transitions and dense indices
#[derive(Debug, Clone, Default)]
pub struct TransitionIndex {
    transitions: Vec<Transition>,
    lookup: FxHashMap<Transition, usize>,
}

impl TransitionIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transition if missing and returns its index
    pub fn add(&mut self, transition: Transition) -> usize {
        if let Some(&index) = self.lookup.get(&transition) {
            return index;
        }
        let index = self.transitions.len();
        self.lookup.insert(transition.clone(), index);
        self.transitions.push(transition);
        index
    }

    /// Index of a known transition
    pub fn index_of(&self, transition: &Transition) -> Option<usize> {
        self.lookup.get(transition).copied()
    }

    /// Transition at `index`
    pub fn get(&self, index: usize) -> Option<&Transition> {
        self.transitions.get(index)
    }

    /// True if the transition has an index
    pub fn contains(&self, transition: &Transition) -> bool {
        self.lookup.contains_key(transition)
    }

    /// Number of transitions
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// True if nothing has been indexed
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Transitions in index order
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }
}

impl Extend<Transition> for TransitionIndex {
    fn extend<I: IntoIterator<Item = Transition>>(&mut self, iter: I) {
        for transition in iter {
            self.add(transition);
        }
    }
}

impl FromIterator<Transition> for TransitionIndex {
    fn from_iter<I: IntoIterator<Item = Transition>>(iter: I) -> Self {
        let mut index = TransitionIndex::new();
        index.extend(iter);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Side;

    #[test]
    fn test_indices_are_dense_and_stable() {
        let mut index = TransitionIndex::new();
        assert_eq!(index.add(Transition::Shift), 0);
        assert_eq!(index.add(Transition::binary("NP", Side::Left, false)), 1);
        assert_eq!(index.add(Transition::Shift), 0);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.index_of(&Transition::binary("NP", Side::Left, false)),
            Some(1)
        );
        assert_eq!(index.index_of(&Transition::binary("NP", Side::Right, false)), None);
        assert_eq!(index.get(0), Some(&Transition::Shift));
    }

    #[test]
    fn test_collect() {
        let index: TransitionIndex = vec![Transition::Shift, Transition::Idle, Transition::Shift]
            .into_iter()
            .collect();
        assert_eq!(index.len(), 2);
        assert!(index.contains(&Transition::Idle));
    }
}
