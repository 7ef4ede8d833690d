//! Label sets discovered from a treebank

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::tree::{Label, Tree};

/// Ordered, cheaply clonable set of labels
///
/// Iteration order is lexicographic, which keeps every consumer
/// (emergency transitions in particular) deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet(Arc<BTreeSet<Label>>);

impl LabelSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership test
    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the set holds no labels
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Labels in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }

    /// First label in lexicographic order
    pub fn first(&self) -> Option<&Label> {
        self.0.first()
    }
}

impl<S: AsRef<str>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        LabelSet(Arc::new(
            iter.into_iter().map(|label| Label::from(label.as_ref())).collect(),
        ))
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}")?;
        }
        write!(f, "}}")
    }
}

/// Non-temporary labels of every internal (non-preterminal) node
pub fn find_known_states(trees: &[Tree]) -> LabelSet {
    trees
        .iter()
        .flat_map(|tree| tree.nodes())
        .filter(|node| !node.is_preterminal() && !node.is_temporary())
        .map(|node| node.label().clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Labels found at the root of some tree
pub fn find_root_states(trees: &[Tree]) -> LabelSet {
    trees.iter().map(|tree| tree.label().clone()).collect()
}

/// Root labels that never occur below the root of any tree
pub fn find_root_only_states(trees: &[Tree]) -> LabelSet {
    let below_root: BTreeSet<Label> = trees
        .iter()
        .flat_map(|tree| tree.nodes().into_iter().skip(1))
        .map(|node| node.label().clone())
        .collect();
    trees
        .iter()
        .map(|tree| tree.label().clone())
        .filter(|label| !below_root.contains(label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn treebank() -> Vec<Tree> {
        [
            "(ROOT (S (NP (DT the) (NN cat)) (VP (VBD sat))))",
            "(ROOT (NP (DT a) (@NP (JJ big) (NN dog))))",
            "(NP (NN fish))",
        ]
        .iter()
        .map(|text| Tree::from_bracketed(text).unwrap())
        .collect()
    }

    #[test]
    fn test_known_states_skip_temporaries_and_tags() {
        let known = find_known_states(&treebank());
        let labels: Vec<_> = known.iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["NP", "ROOT", "S", "VP"]);
    }

    #[test]
    fn test_root_states() {
        let roots = find_root_states(&treebank());
        assert!(roots.contains("ROOT"));
        assert!(roots.contains("NP"));
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn test_root_only_states() {
        let root_only = find_root_only_states(&treebank());
        assert!(root_only.contains("ROOT"));
        // NP also appears inside S
        assert!(!root_only.contains("NP"));
    }

    #[test]
    fn test_display() {
        let set: LabelSet = ["S", "NP"].into_iter().collect();
        assert_eq!(set.to_string(), "{NP, S}");
        assert_eq!(&**set.first().unwrap(), "NP");
    }
}
