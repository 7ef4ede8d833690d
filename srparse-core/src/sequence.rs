//! Gold transition sequences and training examples

use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::labels::LabelSet;
use crate::state::State;
use crate::transition::Transition;
use crate::tree::{Label, Tree};

/// Builds the transition sequence that reproduces a binarized tree
///
/// Unary chains become one Unary per layer, or a single CompoundUnary
/// when `compound_unaries` is set. The sequence always ends with
/// Finalize and Idle.
pub fn create_transition_sequence(
    tree: &Tree,
    compound_unaries: bool,
    root_states: &LabelSet,
    root_only_states: &LabelSet,
) -> Vec<Transition> {
    let mut transitions = Vec::new();
    append_transitions(&mut transitions, tree, compound_unaries, root_only_states);
    transitions.push(Transition::finalize(root_states.clone()));
    transitions.push(Transition::Idle);
    transitions
}

fn append_transitions(
    transitions: &mut Vec<Transition>,
    tree: &Tree,
    compound_unaries: bool,
    root_only_states: &LabelSet,
) {
    if tree.is_preterminal() {
        transitions.push(Transition::Shift);
    } else if let Some(child) = tree.unary_child() {
        let is_root = root_only_states.contains(tree.label());
        if compound_unaries {
            let labels: Vec<Label> = tree
                .unary_chain()
                .take_while(|node| node.unary_child().is_some())
                .map(|node| node.label().clone())
                .collect();
            let bottom = tree
                .unary_chain()
                .find(|node| node.unary_child().is_none())
                .unwrap_or(child);
            append_transitions(transitions, bottom, compound_unaries, root_only_states);
            transitions.push(Transition::CompoundUnary {
                labels: Arc::from(labels),
                is_root,
            });
        } else {
            append_transitions(transitions, child, compound_unaries, root_only_states);
            transitions.push(Transition::Unary {
                label: tree.label().clone(),
                is_root,
            });
        }
    } else if let Some((left, right, side)) = tree.binary_children() {
        append_transitions(transitions, left, compound_unaries, root_only_states);
        append_transitions(transitions, right, compound_unaries, root_only_states);
        transitions.push(Transition::binary(
            tree.label(),
            side,
            root_only_states.contains(tree.label()),
        ));
    }
}

/// Replays `transitions` from the initial state of `tree`, reporting the
/// first illegal step
pub fn verify_transitions(tree: &Tree, transitions: &[Transition]) -> Result<State> {
    replay(State::from_tree(tree), transitions)
}

/// Applies `transitions` in order, failing at the first illegal one
pub fn replay(initial: State, transitions: &[Transition]) -> Result<State> {
    transitions
        .iter()
        .enumerate()
        .try_fold(initial, |state, (position, transition)| {
            if !transition.is_legal(&state, &[]) {
                return Err(CoreError::InvalidSequence {
                    position,
                    transition: transition.to_string(),
                });
            }
            transition.try_apply(&state, 0.0)
        })
}

/// A gold tree, its gold transitions and how many of them to replay
/// before training starts
#[derive(Debug, Clone)]
pub struct TrainingExample {
    tree: Tree,
    transitions: Arc<[Transition]>,
    skip: usize,
}

impl TrainingExample {
    /// Example that starts from the initial state
    pub fn new(tree: Tree, transitions: Vec<Transition>) -> Self {
        Self {
            tree,
            transitions: Arc::from(transitions),
            skip: 0,
        }
    }

    /// Copy of this example that starts after `skip` gold transitions
    pub fn with_skip(&self, skip: usize) -> Self {
        Self {
            tree: self.tree.clone(),
            transitions: self.transitions.clone(),
            skip: skip.min(self.transitions.len()),
        }
    }

    /// Gold tree
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Complete gold sequence
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Number of gold transitions replayed before training
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// Gold transitions still to be predicted
    pub fn remaining(&self) -> &[Transition] {
        &self.transitions[self.skip..]
    }

    /// State after the skipped gold prefix
    pub fn initial_state(&self) -> Result<State> {
        replay(State::from_tree(&self.tree), &self.transitions[..self.skip])
    }
}

/// Builds examples for every tree whose gold sequence replays cleanly;
/// the rest are returned with their errors
pub fn create_training_examples(
    trees: &[Tree],
    compound_unaries: bool,
    root_states: &LabelSet,
    root_only_states: &LabelSet,
) -> (Vec<TrainingExample>, Vec<(usize, CoreError)>) {
    let mut examples = Vec::with_capacity(trees.len());
    let mut rejected = Vec::new();
    for (index, tree) in trees.iter().enumerate() {
        let transitions =
            create_transition_sequence(tree, compound_unaries, root_states, root_only_states);
        match verify_transitions(tree, &transitions) {
            Ok(_) => examples.push(TrainingExample::new(tree.clone(), transitions)),
            Err(err) => rejected.push((index, err)),
        }
    }
    (examples, rejected)
}
