//! Property tests over randomly shaped gold trees

use proptest::prelude::*;
use srparse_core::{
    create_transition_sequence, find_emergency_transition, find_known_states,
    find_root_only_states, find_root_states, verify_transitions, Label, Oracle, Side, State,
    TaggedWord, Transition, Tree,
};

const PHRASES: [&str; 3] = ["NP", "VP", "PP"];
const TAGS: [&str; 3] = ["DT", "NN", "VB"];

/// Builds a binarized tree over `length` tokens, consuming `choices` for
/// split points, labels, sides and optional unary layers
fn build_tree(length: usize, choices: &[u8]) -> Tree {
    let mut choices = choices.iter().copied().cycle();
    let inner = build_span(0, length, &mut choices);
    Tree::unary(Label::from("ROOT"), inner)
}

fn build_span(lo: usize, hi: usize, choices: &mut impl Iterator<Item = u8>) -> Tree {
    let choice = choices.next().unwrap_or(0) as usize;
    if hi - lo == 1 {
        let tag = TAGS[choice % TAGS.len()];
        let word = TaggedWord::new(&format!("w{lo}"), tag);
        let leaf = Tree::preterminal(&word, lo);
        return if choice % 5 == 0 {
            Tree::unary(Label::from("NP"), leaf)
        } else {
            leaf
        };
    }
    let split = lo + 1 + choice % (hi - lo - 1);
    let left = build_span(lo, split, choices);
    let right = build_span(split, hi, choices);
    let side = if choice & 1 == 0 { Side::Left } else { Side::Right };
    let label = PHRASES[(choice / 2) % PHRASES.len()];
    let node = Tree::binary(Label::from(label), side, left, right);
    if choice % 4 == 3 {
        Tree::unary(Label::from("S"), node)
    } else {
        node
    }
}

fn gold_sequence(tree: &Tree, compound: bool) -> Vec<Transition> {
    let trees = vec![tree.clone()];
    create_transition_sequence(
        tree,
        compound,
        &find_root_states(&trees),
        &find_root_only_states(&trees),
    )
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    (1usize..9, prop::collection::vec(any::<u8>(), 1..24))
        .prop_map(|(length, choices)| build_tree(length, &choices))
}

proptest! {
    #[test]
    fn gold_sequence_rebuilds_tree(tree in tree_strategy(), compound in any::<bool>()) {
        let transitions = gold_sequence(&tree, compound);
        let state = verify_transitions(&tree, &transitions).unwrap();
        prop_assert!(state.is_finished());
        prop_assert_eq!(state.tree(), Some(&tree));
    }

    #[test]
    fn stack_size_tracks_transition_deltas(tree in tree_strategy()) {
        let transitions = gold_sequence(&tree, false);
        let mut state = State::from_tree(&tree);
        let mut expected: i32 = 0;
        for transition in &transitions {
            state = transition.apply(&state, 0.0);
            expected += transition.stack_size_change();
            prop_assert_eq!(state.stack().len() as i32, expected);
        }
    }

    #[test]
    fn scores_accumulate_additively(tree in tree_strategy()) {
        let transitions = gold_sequence(&tree, false);
        let mut state = State::from_tree(&tree);
        for (step, transition) in transitions.iter().enumerate() {
            state = transition.apply(&state, 0.5);
            prop_assert!((state.score() - 0.5 * (step + 1) as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn oracle_accepts_every_gold_step(tree in tree_strategy(), compound in any::<bool>()) {
        let trees = vec![tree.clone()];
        let oracle = Oracle::new(
            &trees,
            compound,
            find_root_states(&trees),
            find_root_only_states(&trees),
        );
        let mut state = State::from_tree(&tree);
        for transition in gold_sequence(&tree, compound) {
            let answer = oracle.gold_transition(0, &state).unwrap();
            prop_assert!(answer.is_correct(&transition), "{} rejected at {}", transition, state);
            state = transition.apply(&state, 0.0);
        }
    }

    #[test]
    fn emergency_transitions_are_legal(
        tree in tree_strategy(),
        picks in prop::collection::vec(any::<u16>(), 0..24),
    ) {
        let trees = vec![tree.clone()];
        let known = find_known_states(&trees);
        let roots = find_root_states(&trees);
        let mut candidates: Vec<Transition> = vec![Transition::Shift];
        for label in known.iter() {
            candidates.push(Transition::unary(label, false));
            candidates.push(Transition::binary(label, Side::Left, false));
            candidates.push(Transition::binary(label, Side::Right, false));
            candidates.push(Transition::binary(&format!("@{label}"), Side::Left, false));
            candidates.push(Transition::binary(&format!("@{label}"), Side::Right, false));
        }

        let mut state = State::from_tree(&tree);
        for pick in picks {
            let legal: Vec<&Transition> = candidates
                .iter()
                .filter(|transition| transition.is_legal(&state, &[]))
                .collect();
            if legal.is_empty() {
                break;
            }
            state = legal[pick as usize % legal.len()].apply(&state, 0.0);
        }
        if let Some(emergency) = find_emergency_transition(&state, &[], &known, &roots) {
            prop_assert!(emergency.is_legal(&state, &[]));
        }
    }
}
