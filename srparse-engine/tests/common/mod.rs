//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use srparse_engine::{BasicFeatureFactory, ParserOptions, ShiftReduceParser, TrainingMethod, Tree};

pub const TREEBANK: [&str; 5] = [
    "(ROOT (S^L (NP (NN cats)) (VP (VB sleep))))",
    "(ROOT (S^R (NP^R (DT the) (NN dog)) (VP (VB barks))))",
    "(ROOT (S^L (NP (NN birds)) (VP^L (VB sing) (ADVP (RB loudly)))))",
    "(ROOT (S^R (NP^R (DT a) (NN cat)) (VP^L (VB sees) (NP^R (DT the) (NN dog)))))",
    "(ROOT (S^L (NP (NN dogs)) (VP (VB run))))",
];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn treebank() -> Vec<Tree> {
    TREEBANK
        .iter()
        .map(|text| Tree::from_bracketed(text).expect("fixture tree parses"))
        .collect()
}

pub fn options(method: TrainingMethod, iterations: usize) -> ParserOptions {
    ParserOptions::builder()
        .training_method(method)
        .training_iterations(iterations)
        .build()
        .expect("fixture options are valid")
}

pub fn train(options: ParserOptions) -> ShiftReduceParser {
    init_logging();
    let (parser, _) =
        ShiftReduceParser::train(options, &treebank(), Arc::new(BasicFeatureFactory), None)
            .expect("training succeeds");
    parser
}

/// Weights as a sorted list, for comparing models
pub fn weight_snapshot(parser: &ShiftReduceParser) -> Vec<(String, Vec<(usize, f32)>)> {
    let mut weights: Vec<_> = parser
        .model()
        .weights()
        .iter()
        .map(|(feature, weight)| (feature.clone(), weight.iter().collect::<Vec<_>>()))
        .collect();
    weights.sort_by(|a, b| a.0.cmp(&b.0));
    weights
}
