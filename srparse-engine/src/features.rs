//! Feature extraction contract and stock feature sets
//!
//! A feature factory turns a parser state into opaque feature strings.
//! The perceptron only ever looks features up by name, so any factory that
//! is a pure function of the state can be plugged in.

use std::fmt;
use std::sync::Arc;

use srparse_core::{State, Tree};

const NULL: &str = "*NULL*";

/// Turns a state into the names of the features active in it
pub trait FeatureFactory: Send + Sync + fmt::Debug {
    /// Active features of `state`; must be a pure function of the state
    fn featurize(&self, state: &State) -> Vec<String>;
}

/// Stack and queue templates over labels, head words and head tags
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFeatureFactory;

impl BasicFeatureFactory {
    /// Creates the factory
    pub fn new() -> Self {
        Self
    }
}

/// One step down from a stack node
#[derive(Debug, Clone, Copy)]
enum Child {
    Left,
    Right,
    Unary,
}

fn child(node: Option<&Tree>, which: Child) -> Option<&Tree> {
    let node = node?;
    match which {
        Child::Unary => node.unary_child(),
        Child::Left => node.binary_children().map(|(left, _, _)| left),
        Child::Right => node.binary_children().map(|(_, right, _)| right),
    }
}

fn constituent(node: Option<&Tree>) -> &str {
    node.map_or(NULL, |node| &**node.label())
}

fn head_word(node: Option<&Tree>) -> &str {
    node.map_or(NULL, |node| &**node.head_word())
}

fn head_tag(node: Option<&Tree>) -> &str {
    node.map_or(NULL, |node| &**node.head_tag())
}

fn add_stack_features(features: &mut Vec<String>, prefix: &str, node: Option<&Tree>) {
    let Some(node) = node else {
        features.push(format!("{prefix}C-{NULL}"));
        return;
    };
    let label = node.label();
    let word = node.head_word();
    let tag = node.head_tag();
    features.push(format!("{prefix}C-{label}"));
    features.push(format!("{prefix}WT-{word}-{tag}"));
    features.push(format!("{prefix}T-{tag}"));
    features.push(format!("{prefix}WC-{word}-{label}"));
    features.push(format!("{prefix}TC-{tag}-{label}"));
}

fn add_queue_features(features: &mut Vec<String>, prefix: &str, state: &State, offset: isize) {
    let position = state.token_position() as isize + offset;
    let word = usize::try_from(position)
        .ok()
        .and_then(|position| state.sentence().get(position));
    match word {
        Some(word) => features.push(format!("{prefix}WT-{}-{}", word.tag, word.word)),
        None => features.push(format!("{prefix}WT-{NULL}")),
    }
}

impl FeatureFactory for BasicFeatureFactory {
    fn featurize(&self, state: &State) -> Vec<String> {
        let mut features = Vec::with_capacity(96);
        let stack = state.stack();
        let s0 = stack.get(0);
        let s1 = stack.get(1);
        let s2 = stack.get(2);
        let s3 = stack.get(3);

        add_stack_features(&mut features, "S0", s0);
        add_stack_features(&mut features, "S1", s1);
        add_stack_features(&mut features, "S2", s2);
        add_stack_features(&mut features, "S3", s3);

        for (prefix, which) in [("S0L", Child::Left), ("S0R", Child::Right), ("S0U", Child::Unary)] {
            add_stack_features(&mut features, prefix, child(s0, which));
        }
        for (prefix, which) in [("S1L", Child::Left), ("S1R", Child::Right), ("S1U", Child::Unary)] {
            add_stack_features(&mut features, prefix, child(s1, which));
        }

        let q0 = state.queue_word(0);
        for (prefix, offset) in [("Q0", 0), ("Q1", 1), ("Q2", 2), ("Q3", 3), ("QP1", -1), ("QP2", -2)] {
            add_queue_features(&mut features, prefix, state, offset);
        }

        if s1.is_some() {
            features.push(format!("S0WS1W-{}-{}", head_word(s0), head_word(s1)));
            features.push(format!("S0WS1C-{}-{}", head_word(s0), constituent(s1)));
            features.push(format!("S0CS1W-{}-{}", constituent(s0), head_word(s1)));
            features.push(format!("S0CS1C-{}-{}", constituent(s0), constituent(s1)));
        } else {
            features.push(format!("S0WS1n-{}", head_word(s0)));
            features.push(format!("S0CS1n-{}", constituent(s0)));
        }

        let q0_word = q0.map_or(NULL, |word| &*word.word);
        let q0_tag = q0.map_or(NULL, |word| &*word.tag);
        let q1 = state.queue_word(1);
        let q1_word = q1.map_or(NULL, |word| &*word.word);
        let q1_tag = q1.map_or(NULL, |word| &*word.tag);

        features.push(format!("S0WQ0W-{}-{q0_word}", head_word(s0)));
        features.push(format!("S0WQ0T-{}-{q0_tag}", head_word(s0)));
        features.push(format!("S0CQ0W-{}-{q0_word}", constituent(s0)));
        features.push(format!("S0CQ0T-{}-{q0_tag}", constituent(s0)));

        features.push(format!("Q0WQ1W-{q0_word}-{q1_word}"));
        features.push(format!("Q0WQ1T-{q0_word}-{q1_tag}"));
        features.push(format!("Q0TQ1W-{q0_tag}-{q1_word}"));
        features.push(format!("Q0TQ1T-{q0_tag}-{q1_tag}"));

        features.push(format!("S1WQ0W-{}-{q0_word}", head_word(s1)));
        features.push(format!("S1WQ0T-{}-{q0_tag}", head_word(s1)));
        features.push(format!("S1CQ0W-{}-{q0_word}", constituent(s1)));
        features.push(format!("S1CQ0T-{}-{q0_tag}", constituent(s1)));

        let (c0, c1, c2) = (constituent(s0), constituent(s1), constituent(s2));
        features.push(format!("S0cS1cS2c-{c0}-{c1}-{c2}"));
        features.push(format!("S0wS1cS2c-{}-{c1}-{c2}", head_word(s0)));
        features.push(format!("S0cS1wS2c-{c0}-{}-{c2}", head_word(s1)));
        features.push(format!("S0cS1cS2w-{c0}-{c1}-{}", head_word(s2)));
        features.push(format!("S0cS1cQ0t-{c0}-{c1}-{q0_tag}"));
        features.push(format!("S0wS1cQ0t-{}-{c1}-{q0_tag}", head_word(s0)));
        features.push(format!("S0cS1wQ0t-{c0}-{}-{q0_tag}", head_word(s1)));
        features.push(format!("S0cS1cQ0w-{c0}-{c1}-{q0_word}"));
        features.push(format!("S0tS1t-{}-{}", head_tag(s0), head_tag(s1)));

        if state.end_of_queue() {
            features.push("QUEUE_FINISHED".to_string());
            if stack.len() == 1 {
                features.push("QUEUE_FINISHED_STACK_SINGLETON".to_string());
            }
        }
        features
    }
}

/// Concatenates the features of several factories
#[derive(Debug, Clone, Default)]
pub struct CombinationFeatureFactory {
    factories: Vec<Arc<dyn FeatureFactory>>,
}

impl CombinationFeatureFactory {
    /// Combines the given factories, in order
    pub fn new(factories: Vec<Arc<dyn FeatureFactory>>) -> Self {
        Self { factories }
    }

    /// Number of combined factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True if no factories are combined
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl FeatureFactory for CombinationFeatureFactory {
    fn featurize(&self, state: &State) -> Vec<String> {
        self.factories
            .iter()
            .flat_map(|factory| factory.featurize(state))
            .collect()
    }
}
