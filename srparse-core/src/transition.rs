//! Closed set of parser transitions
//!
//! Every transition is a pure function from one [`State`] to the next.
//! `is_legal` is the single legality implementation shared by the
//! decoder, the trainer and the emergency fallback.

use std::fmt;
use std::sync::Arc;

use crate::constraint::ParserConstraint;
use crate::error::{CoreError, Result};
use crate::labels::LabelSet;
use crate::stack::Stack;
use crate::state::State;
use crate::tree::{base_label, is_temporary_label, Label, Side, Tree};

/// Unary layers allowed on top of one node before further unaries are
/// rejected
pub const MAX_UNARY_DEPTH: usize = 3;

/// Combination of the top two stack nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryTransition {
    /// Label of the combined node
    pub label: Label,
    /// Child the head is taken from
    pub side: Side,
    /// Only legal as the final combination of the sentence
    pub is_root: bool,
}

impl BinaryTransition {
    /// Creates a binary transition
    pub fn new(label: &str, side: Side, is_root: bool) -> Self {
        Self {
            label: Label::from(label),
            side,
            is_root,
        }
    }

    /// True if the combined node is a temporary binarization node
    pub fn is_binarized(&self) -> bool {
        is_temporary_label(&self.label)
    }

    /// Legality on the top two nodes of `state`
    pub fn is_legal(&self, state: &State, constraints: &[ParserConstraint]) -> bool {
        if state.is_finished() {
            return false;
        }
        let stack = state.stack();
        let (Some(right), Some(left)) = (stack.get(0), stack.get(1)) else {
            return false;
        };
        self.combination_is_legal(
            left,
            right,
            stack.get(2),
            stack.len(),
            state.end_of_queue(),
            constraints,
        )
    }

    fn combination_is_legal(
        &self,
        left: &Tree,
        right: &Tree,
        below: Option<&Tree>,
        stack_len: usize,
        end_of_queue: bool,
        constraints: &[ParserConstraint],
    ) -> bool {
        if left.is_temporary() && right.is_temporary() {
            return false;
        }
        let base = base_label(&self.label);
        if right.is_temporary() && (self.side != Side::Right || right.base_label() != base) {
            return false;
        }
        if left.is_temporary() && (self.side != Side::Left || left.base_label() != base) {
            return false;
        }
        if self.is_binarized() {
            // A temporary node at the bottom of the stack can never be completed
            if stack_len == 2 && (end_of_queue || self.side == Side::Right) {
                return false;
            }
            if end_of_queue && below.is_some_and(Tree::is_temporary) {
                return false;
            }
        }
        if self.is_root && !(stack_len == 2 && end_of_queue) {
            return false;
        }

        let left_span = left.span();
        let right_span = right.span();
        let combined = crate::tree::Span::new(left_span.left, right_span.right);
        constraints.iter().all(|constraint| {
            !constraint.crosses(combined)
                && (!constraint.covers_exactly(left_span) || constraint.is_satisfied_by(left))
                && (!constraint.covers_exactly(right_span) || constraint.is_satisfied_by(right))
        })
    }

    fn combine(&self, stack: &Stack<Tree>) -> Option<Stack<Tree>> {
        let right = stack.peek()?.clone();
        let rest = stack.pop();
        let left = rest.peek()?.clone();
        Some(
            rest.pop()
                .push(Tree::binary(self.label.clone(), self.side, left, right)),
        )
    }
}

impl fmt::Display for BinaryTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binary({}, {}", self.label, self.side)?;
        if self.is_root {
            write!(f, ", root")?;
        }
        write!(f, ")")
    }
}

/// Parser transition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Push the next preterminal
    Shift,
    /// Wrap the top node in one unary layer
    Unary {
        /// New label
        label: Label,
        /// Only legal over the complete sentence
        is_root: bool,
    },
    /// Wrap the top node in a whole unary chain at once
    CompoundUnary {
        /// Chain labels, topmost first
        labels: Arc<[Label]>,
        /// Only legal over the complete sentence
        is_root: bool,
    },
    /// Combine the top two nodes
    Binary(BinaryTransition),
    /// Strip a unary chain from the second node on the stack
    RemoveUnary {
        /// Chain labels to strip, topmost first
        labels: Arc<[Label]>,
    },
    /// Combine the second and third nodes, leaving the top in place
    LookbehindBinary(BinaryTransition),
    /// Accept a complete tree
    Finalize {
        /// Labels accepted at the root
        root_states: LabelSet,
    },
    /// No-op after Finalize
    Idle,
}

impl Transition {
    /// Single unary layer
    pub fn unary(label: &str, is_root: bool) -> Self {
        Transition::Unary {
            label: Label::from(label),
            is_root,
        }
    }

    /// Unary chain, topmost label first
    pub fn compound_unary<S: AsRef<str>>(labels: &[S], is_root: bool) -> Self {
        Transition::CompoundUnary {
            labels: labels.iter().map(|l| Label::from(l.as_ref())).collect(),
            is_root,
        }
    }

    /// Binary combination
    pub fn binary(label: &str, side: Side, is_root: bool) -> Self {
        Transition::Binary(BinaryTransition::new(label, side, is_root))
    }

    /// Unary chain removal, topmost label first
    pub fn remove_unary<S: AsRef<str>>(labels: &[S]) -> Self {
        Transition::RemoveUnary {
            labels: labels.iter().map(|l| Label::from(l.as_ref())).collect(),
        }
    }

    /// Finalize against a root label set
    pub fn finalize(root_states: LabelSet) -> Self {
        Transition::Finalize { root_states }
    }

    /// The RemoveUnary that undoes this unary transition
    pub fn remove_unary_for(&self) -> Option<Transition> {
        match self {
            Transition::Unary { label, .. } => Some(Transition::RemoveUnary {
                labels: Arc::from(vec![label.clone()]),
            }),
            Transition::CompoundUnary { labels, .. } => Some(Transition::RemoveUnary {
                labels: labels.clone(),
            }),
            _ => None,
        }
    }

    /// Unary or CompoundUnary
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Transition::Unary { .. } | Transition::CompoundUnary { .. }
        )
    }

    /// Plain Binary (not lookbehind)
    pub fn is_binary(&self) -> bool {
        matches!(self, Transition::Binary(_))
    }

    /// Net change in stack size when applied
    pub fn stack_size_change(&self) -> i32 {
        match self {
            Transition::Shift => 1,
            Transition::Binary(_) | Transition::LookbehindBinary(_) => -1,
            Transition::Unary { .. }
            | Transition::CompoundUnary { .. }
            | Transition::RemoveUnary { .. }
            | Transition::Finalize { .. }
            | Transition::Idle => 0,
        }
    }

    /// Pure legality predicate
    pub fn is_legal(&self, state: &State, constraints: &[ParserConstraint]) -> bool {
        match self {
            Transition::Idle => state.is_finished(),
            _ if state.is_finished() => false,
            Transition::Shift => shift_is_legal(state, constraints),
            Transition::Unary { label, is_root } => {
                unary_is_legal(state, std::slice::from_ref(label), *is_root, false)
            }
            Transition::CompoundUnary { labels, is_root } => {
                unary_is_legal(state, labels, *is_root, true)
            }
            Transition::Binary(binary) => binary.is_legal(state, constraints),
            Transition::RemoveUnary { labels } => state.stack().len() >= 2
                && state
                    .stack()
                    .get(1)
                    .and_then(|node| strip_unary_chain(node, labels))
                    .is_some(),
            Transition::LookbehindBinary(binary) => {
                let stack = state.stack();
                if stack.len() <= 2 {
                    return false;
                }
                match (stack.get(1), stack.get(2)) {
                    (Some(right), Some(left)) => binary.combination_is_legal(
                        left,
                        right,
                        stack.get(3),
                        stack.len() - 1,
                        false,
                        constraints,
                    ),
                    _ => false,
                }
            }
            Transition::Finalize { root_states } => {
                finalize_is_legal(state, root_states, constraints)
            }
        }
    }

    /// Applies a transition already known to be legal
    ///
    /// # Panics
    ///
    /// Panics if the transition is illegal at `state`. Gate calls behind
    /// [`Transition::is_legal`] or use [`Transition::try_apply`].
    pub fn apply(&self, state: &State, score_delta: f64) -> State {
        match self.try_apply(state, score_delta) {
            Ok(next) => next,
            Err(err) => panic!("{err}"),
        }
    }

    /// Applies the transition, failing if it is illegal at `state`
    pub fn try_apply(&self, state: &State, score_delta: f64) -> Result<State> {
        if !self.is_legal(state, &[]) {
            return Err(self.illegal_at(state));
        }
        self.successor(state, score_delta)
            .ok_or_else(|| self.illegal_at(state))
    }

    fn illegal_at(&self, state: &State) -> CoreError {
        CoreError::IllegalTransition {
            transition: self.to_string(),
            state: state.to_string(),
        }
    }

    fn successor(&self, state: &State, score_delta: f64) -> Option<State> {
        let stack = state.stack();
        let position = state.token_position();
        let next = match self {
            Transition::Shift => {
                let preterminal = state.next_preterminal()?;
                state.successor(stack.push(preterminal), position + 1, false, self, score_delta)
            }
            Transition::Unary { label, .. } => {
                let top = stack.peek()?.clone();
                let wrapped = Tree::unary(label.clone(), top);
                state.successor(stack.pop().push(wrapped), position, false, self, score_delta)
            }
            Transition::CompoundUnary { labels, .. } => {
                let mut node = stack.peek()?.clone();
                for label in labels.iter().rev() {
                    node = Tree::unary(label.clone(), node);
                }
                state.successor(stack.pop().push(node), position, false, self, score_delta)
            }
            Transition::Binary(binary) => {
                state.successor(binary.combine(stack)?, position, false, self, score_delta)
            }
            Transition::RemoveUnary { labels } => {
                let top = stack.peek()?.clone();
                let rest = stack.pop();
                let stripped = strip_unary_chain(rest.peek()?, labels)?;
                let stack = rest.pop().push(stripped).push(top);
                state.successor(stack, position, false, self, score_delta)
            }
            Transition::LookbehindBinary(binary) => {
                let top = stack.peek()?.clone();
                let combined = binary.combine(&stack.pop())?.push(top);
                state.successor(combined, position, false, self, score_delta)
            }
            Transition::Finalize { .. } | Transition::Idle => {
                state.successor(stack.clone(), position, true, self, score_delta)
            }
        };
        Some(next)
    }
}

impl From<BinaryTransition> for Transition {
    fn from(binary: BinaryTransition) -> Self {
        Transition::Binary(binary)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Shift => write!(f, "Shift"),
            Transition::Unary { label, is_root } => {
                write!(f, "Unary({label}{})", if *is_root { ", root" } else { "" })
            }
            Transition::CompoundUnary { labels, is_root } => write!(
                f,
                "CompoundUnary({}{})",
                labels.join(" "),
                if *is_root { ", root" } else { "" }
            ),
            Transition::Binary(binary) => write!(f, "{binary}"),
            Transition::RemoveUnary { labels } => write!(f, "RemoveUnary({})", labels.join(" ")),
            Transition::LookbehindBinary(binary) => write!(f, "Lookbehind{binary}"),
            Transition::Finalize { .. } => write!(f, "Finalize"),
            Transition::Idle => write!(f, "Idle"),
        }
    }
}

fn shift_is_legal(state: &State, constraints: &[ParserConstraint]) -> bool {
    if state.end_of_queue() {
        return false;
    }
    let Some(top) = state.stack().peek() else {
        return true;
    };
    let span = top.span();
    for constraint in constraints {
        if span.right != constraint.last() || span.left < constraint.start() {
            continue;
        }
        // The top ends where the constraint ends: shifting would leave the
        // constrained span unbuilt
        if span.left > constraint.start() || !constraint.is_satisfied_by(top) {
            return false;
        }
    }
    true
}

fn unary_is_legal(state: &State, labels: &[Label], is_root: bool, compound: bool) -> bool {
    let Some(top) = state.stack().peek() else {
        return false;
    };
    let Some(bottom) = labels.last() else {
        return false;
    };
    let depth = top.unary_depth();
    if compound && depth > 0 {
        return false;
    }
    if depth >= MAX_UNARY_DEPTH {
        return false;
    }
    if top.label() == bottom {
        return false;
    }
    if top.is_temporary() && top.base_label() != &**bottom {
        return false;
    }
    if is_root && !(state.end_of_queue() && state.stack().len() == 1) {
        return false;
    }
    true
}

fn finalize_is_legal(state: &State, root_states: &LabelSet, constraints: &[ParserConstraint]) -> bool {
    if !state.end_of_queue() || state.stack().len() != 1 {
        return false;
    }
    let Some(top) = state.stack().peek() else {
        return false;
    };
    if !root_states.contains(top.label()) {
        return false;
    }
    let length = state.sentence().len();
    constraints
        .iter()
        .filter(|constraint| constraint.start() == 0 && constraint.end() == length)
        .all(|constraint| constraint.is_satisfied_by(top))
}

fn strip_unary_chain(node: &Tree, labels: &[Label]) -> Option<Tree> {
    if labels.is_empty() {
        return None;
    }
    let mut current = node;
    for label in labels {
        if current.label() != label {
            return None;
        }
        current = current.unary_child()?;
    }
    Some(current.clone())
}

/// Deterministic, non-learned transition for a state where nothing the
/// model proposes is legal
///
/// In priority order: a unary that satisfies an exactly spanned
/// constraint, resolving a dangling temporary top with a unary, a
/// Finalize or unary to a root label over the complete sentence, then a
/// forced binary reduce of a temporary node. Only legal transitions are
/// returned.
pub fn find_emergency_transition(
    state: &State,
    constraints: &[ParserConstraint],
    known_states: &LabelSet,
    root_states: &LabelSet,
) -> Option<Transition> {
    if state.is_finished() {
        return Some(Transition::Idle);
    }
    let stack = state.stack();
    let top = stack.peek()?;
    let legal = |transition: Transition| transition.is_legal(state, constraints).then_some(transition);

    for constraint in constraints
        .iter()
        .filter(|c| c.covers_exactly(top.span()) && !c.is_satisfied_by(top))
    {
        let candidate = known_states
            .iter()
            .filter(|label| constraint.matches_label(label))
            .find_map(|label| {
                legal(Transition::Unary {
                    label: label.clone(),
                    is_root: false,
                })
            });
        if candidate.is_some() {
            return candidate;
        }
    }

    let second = stack.get(1);
    if top.is_temporary() && second.map_or(true, Tree::is_temporary) {
        if let Some(transition) = legal(Transition::unary(top.base_label(), false)) {
            return Some(transition);
        }
    }

    if stack.len() == 1 {
        if !state.end_of_queue() {
            return None;
        }
        if root_states.contains(top.label()) {
            return legal(Transition::finalize(root_states.clone()));
        }
        return root_states.iter().find_map(|root| {
            legal(Transition::Unary {
                label: root.clone(),
                is_root: true,
            })
        });
    }

    if top.is_temporary() {
        if let Some(transition) = legal(Transition::binary(top.base_label(), Side::Right, false)) {
            return Some(transition);
        }
    }
    if let Some(second) = second.filter(|node| node.is_temporary()) {
        if let Some(transition) = legal(Transition::binary(second.base_label(), Side::Left, false)) {
            return Some(transition);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TaggedWord;

    fn sentence(words: &[(&str, &str)]) -> State {
        State::new(
            words
                .iter()
                .map(|(tag, word)| TaggedWord::new(word, tag))
                .collect::<Vec<_>>(),
        )
    }

    fn roots(labels: &[&str]) -> LabelSet {
        labels.iter().collect()
    }

    #[test]
    fn test_one_leaf_sentence() {
        let state = sentence(&[("DET", "the")]);
        let root_states = roots(&["DET"]);
        assert!(Transition::Shift.is_legal(&state, &[]));
        assert!(!Transition::finalize(root_states.clone()).is_legal(&state, &[]));
        assert!(!Transition::Idle.is_legal(&state, &[]));
        assert!(!Transition::unary("NP", false).is_legal(&state, &[]));

        let shifted = Transition::Shift.apply(&state, 0.0);
        assert!(!Transition::Shift.is_legal(&shifted, &[]));
        assert!(Transition::finalize(root_states.clone()).is_legal(&shifted, &[]));
        assert!(!Transition::finalize(roots(&["ROOT"])).is_legal(&shifted, &[]));
        assert!(!Transition::Idle.is_legal(&shifted, &[]));

        let finished = Transition::finalize(root_states).apply(&shifted, 0.0);
        assert!(finished.is_finished());
        assert!(Transition::Idle.is_legal(&finished, &[]));
        assert!(!Transition::Shift.is_legal(&finished, &[]));
        assert!(!Transition::unary("NP", false).is_legal(&finished, &[]));
    }

    #[test]
    fn test_two_leaf_sentence() {
        let state = sentence(&[("NN", "cat"), ("VB", "ran")]);
        let shifted = Transition::Shift.apply(&Transition::Shift.apply(&state, 0.0), 0.0);
        assert_eq!(shifted.stack().len(), 2);
        let left = Transition::binary("S", Side::Left, false);
        let right = Transition::binary("S", Side::Right, false);
        assert!(left.is_legal(&shifted, &[]));
        assert!(right.is_legal(&shifted, &[]));

        let combined = right.apply(&shifted, 0.0);
        assert_eq!(combined.stack().len(), 1);
        assert_eq!(&**combined.stack().peek().unwrap().head_word(), "ran");
        assert!(Transition::finalize(roots(&["S"])).is_legal(&combined, &[]));
        assert!(!Transition::finalize(roots(&["ROOT"])).is_legal(&combined, &[]));
    }

    #[test]
    fn test_stack_size_changes() {
        let state = sentence(&[("DT", "the"), ("NN", "cat"), ("VBD", "sat")]);
        let steps = [
            Transition::Shift,
            Transition::Shift,
            Transition::Shift,
            Transition::unary("VP", false),
            Transition::LookbehindBinary(BinaryTransition::new("NP", Side::Right, false)),
            Transition::remove_unary(&["VP"]).clone(),
        ];
        let mut current = state;
        for step in &steps[..5] {
            let before = current.stack().len() as i32;
            current = step.apply(&current, 0.0);
            assert_eq!(current.stack().len() as i32 - before, step.stack_size_change());
        }
        // RemoveUnary needs the unary on the second node
        assert!(!steps[5].is_legal(&current, &[]));
        assert_eq!(current.stack().len(), 2);
        assert_eq!(&**current.stack().get(1).unwrap().label(), "NP");
        assert_eq!(&**current.stack().peek().unwrap().label(), "VP");
    }

    #[test]
    fn test_remove_unary_strips_second_node() {
        let state = sentence(&[("NN", "cats"), ("VBP", "sleep")]);
        let state = Transition::Shift.apply(&state, 0.0);
        let state = Transition::compound_unary(&["S", "NP"], false).apply(&state, 0.0);
        let state = Transition::Shift.apply(&state, 0.0);

        assert!(!Transition::remove_unary(&["NP"]).is_legal(&state, &[]));
        let remove = Transition::remove_unary(&["S", "NP"]);
        assert!(remove.is_legal(&state, &[]));
        let stripped = remove.apply(&state, 0.0);
        assert_eq!(&**stripped.stack().get(1).unwrap().label(), "NN");
        assert_eq!(&**stripped.stack().peek().unwrap().label(), "VBP");
    }

    #[test]
    fn test_unary_depth_limit_and_loops() {
        let state = Transition::Shift.apply(&sentence(&[("NN", "cat"), ("VB", "ran")]), 0.0);
        assert!(!Transition::unary("NN", false).is_legal(&state, &[]));
        let state = Transition::unary("A", false).apply(&state, 0.0);
        let state = Transition::unary("B", false).apply(&state, 0.0);
        let state = Transition::unary("C", false).apply(&state, 0.0);
        assert!(!Transition::unary("D", false).is_legal(&state, &[]));
        assert!(!Transition::compound_unary(&["D"], false).is_legal(&state, &[]));
    }

    #[test]
    fn test_root_unary_requires_complete_sentence() {
        let state = Transition::Shift.apply(&sentence(&[("NN", "cat"), ("VB", "ran")]), 0.0);
        assert!(!Transition::unary("ROOT", true).is_legal(&state, &[]));
        assert!(Transition::unary("ROOT", false).is_legal(&state, &[]));
    }

    #[test]
    fn test_temporary_rules() {
        let state = sentence(&[("DT", "a"), ("JJ", "big"), ("NN", "dog")]);
        let two = Transition::Shift.apply(&Transition::Shift.apply(&state, 0.0), 0.0);
        // Right-headed temporary at the bottom of the stack is a dead end
        assert!(!Transition::binary("@NP", Side::Right, false).is_legal(&two, &[]));
        assert!(Transition::binary("@NP", Side::Left, false).is_legal(&two, &[]));

        let three = Transition::Shift.apply(&two, 0.0);
        let temp = Transition::binary("@NP", Side::Right, false).apply(&three, 0.0);
        assert!(temp.stack().peek().unwrap().is_temporary());
        assert!(!Transition::binary("NP", Side::Left, false).is_legal(&temp, &[]));
        assert!(!Transition::binary("VP", Side::Right, false).is_legal(&temp, &[]));
        assert!(Transition::binary("NP", Side::Right, false).is_legal(&temp, &[]));
        assert!(Transition::unary("NP", false).is_legal(&temp, &[]));
        assert!(!Transition::unary("VP", false).is_legal(&temp, &[]));
    }

    #[test]
    fn test_binarized_at_end_with_two_nodes_is_illegal() {
        let state = sentence(&[("NN", "cat"), ("VB", "ran")]);
        let two = Transition::Shift.apply(&Transition::Shift.apply(&state, 0.0), 0.0);
        assert!(!Transition::binary("@S", Side::Left, false).is_legal(&two, &[]));
    }

    #[test]
    fn test_root_binary() {
        let state = sentence(&[("DT", "a"), ("NN", "dog"), ("VB", "ran")]);
        let two = Transition::Shift.apply(&Transition::Shift.apply(&state, 0.0), 0.0);
        assert!(!Transition::binary("ROOT", Side::Left, true).is_legal(&two, &[]));
        let np = Transition::binary("NP", Side::Right, false).apply(&two, 0.0);
        let full = Transition::Shift.apply(&np, 0.0);
        assert!(Transition::binary("ROOT", Side::Left, true).is_legal(&full, &[]));
    }

    #[test]
    fn test_shift_blocked_by_unsatisfied_constraint() {
        let state = sentence(&[("DT", "the"), ("NN", "cat"), ("VBD", "sat")]);
        let constraints = vec![ParserConstraint::new(0, 2, "NP").unwrap()];
        let two = Transition::Shift.apply(&Transition::Shift.apply(&state, 0.0), 0.0);
        assert!(!Transition::Shift.is_legal(&two, &constraints));
        assert!(Transition::Shift.is_legal(&two, &[]));

        let wrong = Transition::binary("VP", Side::Left, false).apply(&two, 0.0);
        assert!(!Transition::Shift.is_legal(&wrong, &constraints));
        let fixed = Transition::unary("NP", false).apply(&wrong, 0.0);
        assert!(Transition::Shift.is_legal(&fixed, &constraints));

        let right = Transition::binary("NP", Side::Right, false).apply(&two, 0.0);
        assert!(Transition::Shift.is_legal(&right, &constraints));
    }

    #[test]
    fn test_binary_cannot_cross_constraint() {
        let state = sentence(&[("VB", "saw"), ("DT", "the"), ("NN", "cat")]);
        let constraints = vec![ParserConstraint::new(1, 3, "NP").unwrap()];
        let two = Transition::Shift.apply(&Transition::Shift.apply(&state, 0.0), 0.0);
        assert!(!Transition::binary("VP", Side::Left, false).is_legal(&two, &constraints));
        assert!(Transition::Shift.is_legal(&two, &constraints));
    }

    #[test]
    fn test_finalize_checks_whole_sentence_constraint() {
        let state = sentence(&[("NN", "cat"), ("VB", "ran")]);
        let two = Transition::Shift.apply(&Transition::Shift.apply(&state, 0.0), 0.0);
        let s = Transition::binary("S", Side::Right, false).apply(&two, 0.0);
        let root = Transition::unary("ROOT", true).apply(&s, 0.0);
        let finalize = Transition::finalize(roots(&["ROOT"]));
        let matching = vec![ParserConstraint::new(0, 2, "S").unwrap()];
        let other = vec![ParserConstraint::new(0, 2, "FRAG").unwrap()];
        assert!(finalize.is_legal(&root, &matching));
        assert!(!finalize.is_legal(&root, &other));
    }

    #[test]
    fn test_try_apply_reports_illegal_transition() {
        let state = sentence(&[("NN", "cat")]);
        let err = Transition::binary("S", Side::Left, false)
            .try_apply(&state, 0.0)
            .unwrap_err();
        assert!(matches!(err, CoreError::IllegalTransition { .. }));
    }

    #[test]
    #[should_panic(expected = "illegal transition")]
    fn test_apply_illegal_panics() {
        let state = sentence(&[("NN", "cat")]);
        Transition::Idle.apply(&state, 0.0);
    }

    #[test]
    fn test_scores_accumulate() {
        let state = sentence(&[("NN", "cat"), ("VB", "ran")]);
        let state = Transition::Shift.apply(&state, 1.5);
        let state = Transition::Shift.apply(&state, -0.5);
        let state = Transition::binary("S", Side::Left, false).apply(&state, 2.0);
        assert_eq!(state.score(), 3.0);
        assert_eq!(state.transitions().len(), 3);
    }

    #[test]
    fn test_emergency_finalizes_or_adds_root() {
        let root_states = roots(&["ROOT"]);
        let known = roots(&["NP", "ROOT", "S"]);
        let state = Transition::Shift.apply(&sentence(&[("NN", "cat")]), 0.0);
        assert_eq!(
            find_emergency_transition(&state, &[], &known, &root_states),
            Some(Transition::unary("ROOT", true))
        );
        let rooted = Transition::unary("ROOT", true).apply(&state, 0.0);
        assert_eq!(
            find_emergency_transition(&rooted, &[], &known, &root_states),
            Some(Transition::finalize(root_states.clone()))
        );
    }

    #[test]
    fn test_emergency_satisfies_constraint_first() {
        let known = roots(&["NP", "S", "VP"]);
        let constraints = vec![ParserConstraint::new(0, 2, "NP|VP").unwrap()];
        let state = sentence(&[("DT", "the"), ("NN", "cat"), ("VBD", "sat")]);
        let two = Transition::Shift.apply(&Transition::Shift.apply(&state, 0.0), 0.0);
        let wrong = Transition::binary("S", Side::Left, false).apply(&two, 0.0);
        assert_eq!(
            find_emergency_transition(&wrong, &constraints, &known, &roots(&["ROOT"])),
            Some(Transition::unary("NP", false))
        );
    }

    #[test]
    fn test_emergency_reduces_dangling_temporary() {
        let state = sentence(&[("DT", "a"), ("JJ", "big"), ("NN", "dog")]);
        let mut current = state;
        for _ in 0..3 {
            current = Transition::Shift.apply(&current, 0.0);
        }
        let temp = Transition::binary("@NP", Side::Right, false).apply(&current, 0.0);
        let known = roots(&["NP"]);
        assert_eq!(
            find_emergency_transition(&temp, &[], &known, &roots(&["NP"])),
            Some(Transition::binary("NP", Side::Right, false))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Transition::Shift.to_string(), "Shift");
        assert_eq!(Transition::unary("ROOT", true).to_string(), "Unary(ROOT, root)");
        assert_eq!(
            Transition::binary("NP", Side::Left, false).to_string(),
            "Binary(NP, LEFT)"
        );
        assert_eq!(
            Transition::compound_unary(&["S", "VP"], false).to_string(),
            "CompoundUnary(S VP)"
        );
    }
}
