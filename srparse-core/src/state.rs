//! Immutable parser state

use std::fmt;
use std::sync::Arc;

use crate::stack::Stack;
use crate::transition::Transition;
use crate::tree::{TaggedWord, Tree};

/// Snapshot of a parse in progress
///
/// States are never mutated. Applying a transition builds a new state that
/// shares its stacks and sentence with the old one.
#[derive(Debug, Clone)]
pub struct State {
    stack: Stack<Tree>,
    transitions: Stack<Transition>,
    sentence: Arc<[TaggedWord]>,
    token_position: usize,
    score: f64,
    finished: bool,
}

impl State {
    /// Initial state for a tagged sentence
    pub fn new(sentence: impl Into<Arc<[TaggedWord]>>) -> Self {
        Self {
            stack: Stack::new(),
            transitions: Stack::new(),
            sentence: sentence.into(),
            token_position: 0,
            score: 0.0,
            finished: false,
        }
    }

    /// Initial state over the yield of a gold tree
    pub fn from_tree(tree: &Tree) -> Self {
        Self::new(tree.tagged_yield())
    }

    /// Partial trees, top first
    pub fn stack(&self) -> &Stack<Tree> {
        &self.stack
    }

    /// Applied transitions, most recent first
    pub fn transitions(&self) -> &Stack<Transition> {
        &self.transitions
    }

    /// The sentence being parsed
    pub fn sentence(&self) -> &Arc<[TaggedWord]> {
        &self.sentence
    }

    /// Index of the next token to shift
    pub fn token_position(&self) -> usize {
        self.token_position
    }

    /// Sum of every applied score delta
    pub fn score(&self) -> f64 {
        self.score
    }

    /// True once Finalize has been applied
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True once every token has been shifted
    pub fn end_of_queue(&self) -> bool {
        self.token_position >= self.sentence.len()
    }

    /// Tagged word `offset` positions into the queue
    pub fn queue_word(&self, offset: usize) -> Option<&TaggedWord> {
        self.sentence.get(self.token_position + offset)
    }

    /// The finished tree, if there is exactly one
    pub fn tree(&self) -> Option<&Tree> {
        match self.stack.len() {
            1 => self.stack.peek(),
            _ => None,
        }
    }

    /// Applied transitions in application order
    pub fn transition_history(&self) -> Vec<Transition> {
        let mut history: Vec<_> = self.transitions.iter().cloned().collect();
        history.reverse();
        history
    }

    /// True if both states were reached through the same transitions
    pub fn are_transitions_equal(&self, other: &State) -> bool {
        self.transitions == other.transitions
    }

    pub(crate) fn next_preterminal(&self) -> Option<Tree> {
        self.sentence
            .get(self.token_position)
            .map(|word| Tree::preterminal(word, self.token_position))
    }

    pub(crate) fn successor(
        &self,
        stack: Stack<Tree>,
        token_position: usize,
        finished: bool,
        transition: &Transition,
        score_delta: f64,
    ) -> State {
        State {
            stack,
            transitions: self.transitions.push(transition.clone()),
            sentence: self.sentence.clone(),
            token_position,
            score: self.score + score_delta,
            finished,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State(stack=[")?;
        for (i, tree) in self.stack.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{tree}")?;
        }
        write!(
            f,
            "], position={}/{}, score={}, finished={})",
            self.token_position,
            self.sentence.len(),
            self.score,
            self.finished
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = State::new(vec![TaggedWord::new("the", "DT"), TaggedWord::new("cat", "NN")]);
        assert!(state.stack().is_empty());
        assert_eq!(state.token_position(), 0);
        assert!(!state.end_of_queue());
        assert!(!state.is_finished());
        assert_eq!(state.score(), 0.0);
        assert_eq!(state.queue_word(1).map(|w| &*w.word), Some("cat"));
        assert!(state.tree().is_none());
    }

    #[test]
    fn test_from_tree_uses_yield() {
        let tree = Tree::from_bracketed("(S (NN cat) (VB ran))").unwrap();
        let state = State::from_tree(&tree);
        assert_eq!(state.sentence().len(), 2);
        assert_eq!(&*state.sentence()[1].tag, "VB");
    }

    #[test]
    fn test_empty_sentence_is_at_end() {
        let state = State::new(Vec::<TaggedWord>::new());
        assert!(state.end_of_queue());
    }
}
