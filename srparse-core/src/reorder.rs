//! Repair of gold sequences after a model mistake
//!
//! When training follows a prediction that differs from the next gold
//! transition, [`ReorderingOracle::reorder`] tries to rewrite the rest of
//! the gold sequence so that it still leads to a finished parse from the
//! predicted state. A `false` answer means the example should be
//! abandoned.

use crate::index::TransitionIndex;
use crate::labels::LabelSet;
use crate::state::State;
use crate::transition::{BinaryTransition, Transition};
use crate::tree::{base_label, temporary_label, Side};

/// Gold sequence repair
#[derive(Debug, Clone)]
pub struct ReorderingOracle<'a> {
    index: &'a TransitionIndex,
    root_only_states: &'a LabelSet,
    shift_to_binary: bool,
    binary_to_shift: bool,
}

impl<'a> ReorderingOracle<'a> {
    /// Oracle with both optional repair directions disabled
    pub fn new(index: &'a TransitionIndex, root_only_states: &'a LabelSet) -> Self {
        Self {
            index,
            root_only_states,
            shift_to_binary: false,
            binary_to_shift: false,
        }
    }

    /// Enables rebuilding binaries after a premature Shift
    pub fn with_shift_to_binary(mut self, enabled: bool) -> Self {
        self.shift_to_binary = enabled;
        self
    }

    /// Enables dropping the subtree a premature Binary already built
    pub fn with_binary_to_shift(mut self, enabled: bool) -> Self {
        self.binary_to_shift = enabled;
        self
    }

    /// Rewrites `transitions` (the remaining gold sequence) so that it
    /// continues from `chosen` applied to `state`
    ///
    /// On success the caller applies `chosen` and keeps following the
    /// rewritten sequence.
    pub fn reorder(&self, state: &State, chosen: &Transition, transitions: &mut Vec<Transition>) -> bool {
        let Some(gold) = transitions.first().cloned() else {
            return false;
        };
        if !chosen.is_legal(state, &[]) {
            return false;
        }
        if *chosen == gold {
            transitions.remove(0);
            return true;
        }
        if gold.is_unary() {
            // Missing a unary is a bracket error but not fatal
            transitions.remove(0);
            return self.reorder(state, chosen, transitions);
        }
        if matches!(gold, Transition::RemoveUnary { .. }) {
            return self.reorder_remove_unary(state, chosen, gold, transitions);
        }

        if chosen.is_unary() {
            if state.stack().is_empty() || previous_is_unary(state) {
                return false;
            }
            return self.add_remove_unary(transitions, chosen);
        }

        if let Transition::Binary(chosen_binary) = chosen {
            if state.stack().len() < 2 {
                return false;
            }
            return match &gold {
                Transition::Shift => self.binary_to_shift && reorder_incorrect_binary(transitions),
                Transition::Binary(gold_binary) => {
                    // A temporary only survives with the right label
                    if chosen_binary.is_binarized()
                        && !(gold_binary.is_binarized() && chosen_binary.label == gold_binary.label)
                    {
                        return false;
                    }
                    transitions.remove(0);
                    true
                }
                _ => false,
            };
        }

        if let (Transition::Shift, Transition::Binary(gold_binary)) = (chosen, &gold) {
            if state.end_of_queue() {
                return false;
            }
            if !gold_binary.is_binarized() {
                return self.shift_to_binary && self.reorder_incorrect_shift(transitions);
            }
        }
        false
    }

    fn reorder_remove_unary(
        &self,
        state: &State,
        chosen: &Transition,
        gold: Transition,
        transitions: &mut Vec<Transition>,
    ) -> bool {
        match chosen {
            Transition::RemoveUnary { .. } => {
                transitions.remove(0);
                true
            }
            unary if unary.is_unary() => {
                if previous_is_unary(state) {
                    return false;
                }
                match transitions.get(1) {
                    Some(next) if next.is_unary() => {
                        if next != chosen {
                            return false;
                        }
                        // The unary happened early; the removal still applies
                        transitions.remove(1);
                        true
                    }
                    Some(_) => true,
                    None => false,
                }
            }
            Transition::Binary(_) => {
                transitions.remove(0);
                self.reorder(state, chosen, transitions)
            }
            Transition::Shift => {
                // Only repairable if a Shift was due right after the removal
                transitions.remove(0);
                if transitions.first() != Some(&Transition::Shift) {
                    return false;
                }
                transitions.remove(0);
                let mut shift_count = 1;
                let mut position = transitions.len().saturating_sub(1);
                for (i, transition) in transitions.iter().enumerate() {
                    match transition {
                        Transition::Shift => shift_count += 1,
                        Transition::Binary(_) => {
                            shift_count -= 1;
                            if shift_count < 1 {
                                position = i;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                transitions.insert(position, gold);
                true
            }
            _ => false,
        }
    }

    /// Schedules a RemoveUnary for a wrongly chosen unary once the node it
    /// wrapped becomes the second node on the stack
    fn add_remove_unary(&self, transitions: &mut Vec<Transition>, chosen: &Transition) -> bool {
        if transitions.first() != Some(&Transition::Shift) {
            return true;
        }
        let Some(remove) = chosen.remove_unary_for() else {
            return false;
        };
        if !self.index.contains(&remove) {
            return true;
        }

        let mut shift_count = 0;
        let mut closing = None;
        for (i, transition) in transitions.iter().enumerate() {
            match transition {
                Transition::Shift => shift_count += 1,
                Transition::Binary(_) => {
                    shift_count -= 1;
                    if shift_count <= 1 {
                        closing = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(closing) = closing.filter(|&i| i + 1 < transitions.len()) else {
            return false;
        };
        // With nothing shifted since, the removal must precede the Binary
        let position = if shift_count == 0 { closing } else { closing + 1 };
        transitions.insert(position, remove);
        true
    }

    /// Rebuilds the Binary transitions skipped by a premature Shift
    fn reorder_incorrect_shift(&self, transitions: &mut Vec<Transition>) -> bool {
        let mut leftover: Vec<BinaryTransition> = Vec::new();
        while !transitions.is_empty() {
            match transitions.remove(0) {
                Transition::Shift => break,
                Transition::Binary(binary) => leftover.push(binary),
                _ => {}
            }
        }
        let Some(last_leftover) = leftover.last() else {
            return false;
        };
        if transitions.is_empty() {
            return false;
        }

        let mut shift_count = 0;
        let mut position = 0;
        let mut last_binary = None;
        while position < transitions.len() && shift_count >= 0 {
            shift_count += transitions[position].stack_size_change();
            if shift_count < 0 {
                match transitions.remove(position) {
                    Transition::Binary(binary) => last_binary = Some(binary),
                    _ => return false,
                }
            } else {
                position += 1;
            }
        }
        let Some(last_binary) = last_binary else {
            return false;
        };
        if position >= transitions.len() {
            return false;
        }

        let label = base_label(&last_binary.label);
        let temporary = temporary_label(label);
        let is_root = self.root_only_states.contains(label);
        let temporary_binary = |side: Side| {
            Transition::Binary(BinaryTransition {
                label: temporary.clone(),
                side,
                is_root: false,
            })
        };

        let mut rebuilt = Vec::with_capacity(leftover.len() + 1);
        if last_binary.side == Side::Right {
            // The new node ends up as the right head
            rebuilt.extend(leftover.iter().map(|_| temporary_binary(Side::Right)));
            rebuilt.push(Transition::Binary(BinaryTransition {
                label: last_binary.label.clone(),
                side: Side::Right,
                is_root,
            }));
        } else {
            rebuilt.push(temporary_binary(Side::Left));
            rebuilt.extend(
                leftover[..leftover.len() - 1]
                    .iter()
                    .map(|binary| temporary_binary(binary.side)),
            );
            rebuilt.push(Transition::Binary(BinaryTransition {
                label: last_binary.label.clone(),
                side: last_leftover.side,
                is_root: self.root_only_states.contains(&last_binary.label),
            }));
        }
        transitions.splice(position..position, rebuilt);
        true
    }
}

fn previous_is_unary(state: &State) -> bool {
    state.transitions().peek().is_some_and(Transition::is_unary)
}

/// Drops the Binary that would have closed the subtree a premature Binary
/// already built, along with any unary directly above it
fn reorder_incorrect_binary(transitions: &mut Vec<Transition>) -> bool {
    let mut shift_count = 0;
    let mut position = 0;
    loop {
        let Some(transition) = transitions.get(position) else {
            return false;
        };
        match transition {
            Transition::Shift => {
                shift_count += 1;
                position += 1;
            }
            Transition::Binary(_) => {
                shift_count -= 1;
                if shift_count <= 0 {
                    transitions.remove(position);
                } else {
                    position += 1;
                }
            }
            _ => position += 1,
        }
        if shift_count <= 0 {
            break;
        }
    }
    while transitions.get(position).is_some_and(Transition::is_unary) {
        transitions.remove(position);
    }
    position < transitions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{find_root_only_states, find_root_states};
    use crate::sequence::{create_transition_sequence, replay};
    use crate::tree::Tree;

    struct Fixture {
        tree: Tree,
        gold: Vec<Transition>,
        index: TransitionIndex,
        root_only: LabelSet,
    }

    fn fixture(text: &str) -> Fixture {
        let tree = Tree::from_bracketed(text).unwrap();
        let trees = vec![tree.clone()];
        let root_only = find_root_only_states(&trees);
        let gold = create_transition_sequence(&tree, false, &find_root_states(&trees), &root_only);
        let index = gold.iter().cloned().collect();
        Fixture {
            tree,
            gold,
            index,
            root_only,
        }
    }

    fn run_prefix(fixture: &Fixture, steps: usize) -> State {
        replay(State::from_tree(&fixture.tree), &fixture.gold[..steps]).unwrap()
    }

    #[test]
    fn test_premature_binary_with_one_node_is_rejected() {
        let fixture = fixture("(NP^L (DT the) (NN cat))");
        let state = run_prefix(&fixture, 1);
        let mut remaining = fixture.gold[1..].to_vec();
        let before = remaining.clone();
        let oracle = ReorderingOracle::new(&fixture.index, &fixture.root_only).with_binary_to_shift(true);

        let chosen = Transition::binary("NP", Side::Left, true);
        assert!(!oracle.reorder(&state, &chosen, &mut remaining));
        assert!(!oracle.reorder(&state, &chosen, &mut remaining));
        assert_eq!(remaining, before);
    }

    #[test]
    fn test_matching_prediction_consumes_gold() {
        let fixture = fixture("(NP^L (DT the) (NN cat))");
        let state = run_prefix(&fixture, 1);
        let mut remaining = fixture.gold[1..].to_vec();
        let oracle = ReorderingOracle::new(&fixture.index, &fixture.root_only);
        assert!(oracle.reorder(&state, &Transition::Shift, &mut remaining));
        assert_eq!(remaining, fixture.gold[2..].to_vec());
    }

    #[test]
    fn test_premature_binary_is_spliced_when_enabled() {
        let fixture = fixture("(S^L (NN a) (VP^L (VB b) (NN c)))");
        let state = run_prefix(&fixture, 2);
        let chosen = Transition::binary("S", Side::Left, true);
        let chosen = if chosen.is_legal(&state, &[]) {
            chosen
        } else {
            Transition::binary("S", Side::Left, false)
        };

        let mut disabled = fixture.gold[2..].to_vec();
        let oracle = ReorderingOracle::new(&fixture.index, &fixture.root_only);
        assert!(!oracle.reorder(&state, &chosen, &mut disabled));

        let mut remaining = fixture.gold[2..].to_vec();
        let oracle = oracle.with_binary_to_shift(true);
        assert!(oracle.reorder(&state, &chosen, &mut remaining));
        assert_eq!(remaining.len(), fixture.gold.len() - 3);

        let after = chosen.apply(&state, 0.0);
        let finished = replay(after, &remaining).unwrap();
        assert!(finished.is_finished());
    }

    #[test]
    fn test_premature_shift_rebuilds_binaries() {
        let fixture = fixture("(S^R (VP^R (NN a) (VB b)) (NN c))");
        let state = run_prefix(&fixture, 2);
        let mut remaining = fixture.gold[2..].to_vec();
        let oracle = ReorderingOracle::new(&fixture.index, &fixture.root_only).with_shift_to_binary(true);
        assert!(oracle.reorder(&state, &Transition::Shift, &mut remaining));
        assert_eq!(
            &remaining[..2],
            &[
                Transition::binary("@S", Side::Right, false),
                Transition::binary("S", Side::Right, true),
            ]
        );

        let after = Transition::Shift.apply(&state, 0.0);
        let finished = replay(after, &remaining).unwrap();
        assert!(finished.is_finished());
    }

    #[test]
    fn test_skips_missed_unary() {
        let fixture = fixture("(S^L (NP (NN cats)) (VB sleep))");
        let state = run_prefix(&fixture, 1);
        let mut remaining = fixture.gold[1..].to_vec();
        assert_eq!(remaining[0], Transition::unary("NP", false));
        let oracle = ReorderingOracle::new(&fixture.index, &fixture.root_only);
        assert!(oracle.reorder(&state, &Transition::Shift, &mut remaining));
        let finished = replay(Transition::Shift.apply(&state, 0.0), &remaining).unwrap();
        assert!(finished.is_finished());
    }

    #[test]
    fn test_wrong_unary_schedules_removal_when_known() {
        let fixture = fixture("(S^L (NN cats) (VB sleep))");
        let state = run_prefix(&fixture, 1);
        let chosen = Transition::unary("NP", false);

        let mut remaining = fixture.gold[1..].to_vec();
        let oracle = ReorderingOracle::new(&fixture.index, &fixture.root_only);
        assert!(oracle.reorder(&state, &chosen, &mut remaining));
        assert_eq!(remaining, fixture.gold[1..].to_vec());

        let mut index = fixture.index.clone();
        index.add(Transition::remove_unary(&["NP"]));
        let mut remaining = fixture.gold[1..].to_vec();
        let oracle = ReorderingOracle::new(&index, &fixture.root_only);
        assert!(oracle.reorder(&state, &chosen, &mut remaining));
        assert_eq!(remaining[0], Transition::Shift);
        assert_eq!(remaining[1], Transition::remove_unary(&["NP"]));

        let after = chosen.apply(&state, 0.0);
        let finished = replay(after, &remaining).unwrap();
        assert!(finished.is_finished());
        assert_eq!(finished.tree(), Some(&fixture.tree));
    }

    #[test]
    fn test_repeated_unary_is_rejected() {
        let fixture = fixture("(S^L (NN cats) (VB sleep))");
        let state = run_prefix(&fixture, 1);
        let state = Transition::unary("NP", false).apply(&state, 0.0);
        let mut remaining = fixture.gold[1..].to_vec();
        let oracle = ReorderingOracle::new(&fixture.index, &fixture.root_only);
        assert!(!oracle.reorder(&state, &Transition::unary("X", false), &mut remaining));
    }
}
