//! Parser facade tying discovery, training and decoding together

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{info, warn};
use srparse_core::{
    create_training_examples, find_known_states, find_root_only_states, find_root_states,
    ParserConstraint, State, TaggedWord, TransitionIndex, Tree,
};

use crate::config::ParserOptions;
use crate::decoder::{BeamDecoder, ParseOutcome};
use crate::error::{EngineError, Result};
use crate::evaluator::Evaluator;
use crate::features::FeatureFactory;
use crate::model::PerceptronModel;
use crate::training::{Trainer, TrainingSummary};

/// A trained shift-reduce parser
#[derive(Debug, Clone)]
pub struct ShiftReduceParser {
    options: ParserOptions,
    model: PerceptronModel,
}

impl ShiftReduceParser {
    /// Wraps an existing model
    pub fn new(options: ParserOptions, model: PerceptronModel) -> Result<Self> {
        options.validate()?;
        Ok(Self { options, model })
    }

    /// Trains a parser on binarized gold trees
    ///
    /// Trees whose gold sequence does not replay are skipped with a warning.
    pub fn train(
        options: ParserOptions,
        trees: &[Tree],
        feature_factory: Arc<dyn FeatureFactory>,
        evaluator: Option<&dyn Evaluator>,
    ) -> Result<(Self, TrainingSummary)> {
        options.validate()?;

        let known_states = find_known_states(trees);
        let root_states = find_root_states(trees);
        let root_only_states = find_root_only_states(trees);
        info!(
            "Found {} known states, {} root states, {} root-only states",
            known_states.len(),
            root_states.len(),
            root_only_states.len()
        );

        let (examples, rejected) = create_training_examples(
            trees,
            options.compound_unaries,
            &root_states,
            &root_only_states,
        );
        for (index, err) in &rejected {
            warn!("Skipping training tree {}: {}", index, err);
        }
        if examples.is_empty() {
            return Err(EngineError::InvalidConfig {
                reason: "no usable training trees".to_string(),
            });
        }

        let transition_index: TransitionIndex = examples
            .iter()
            .flat_map(|example| example.transitions().iter().cloned())
            .collect();
        info!("Number of transitions: {}", transition_index.len());

        let mut model = PerceptronModel::new(
            transition_index,
            known_states,
            root_states,
            root_only_states,
            feature_factory,
        );
        let trainer =
            Trainer::new(options.train.clone())?.with_compound_unaries(options.compound_unaries);
        let summary = trainer.train(&mut model, &examples, evaluator)?;
        Ok((Self { options, model }, summary))
    }

    /// Options the parser was built with
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Underlying model
    pub fn model(&self) -> &PerceptronModel {
        &self.model
    }

    /// Decoder using the configured beam width
    pub fn decoder(&self) -> BeamDecoder<'_> {
        BeamDecoder::new(&self.model, self.options.beam_size)
    }

    /// Parses a tagged sentence
    pub fn parse(&self, sentence: &[TaggedWord]) -> Result<ParseOutcome> {
        self.parse_with_constraints(sentence, &[])
    }

    /// Parses a tagged sentence so that every constraint is honored
    pub fn parse_with_constraints(
        &self,
        sentence: &[TaggedWord],
        constraints: &[ParserConstraint],
    ) -> Result<ParseOutcome> {
        self.decoder()
            .parse_state(State::new(sentence.to_vec()), constraints, None)
    }

    /// Parses a tagged sentence, giving up once `interrupt` is set
    pub fn parse_with_interrupt(
        &self,
        sentence: &[TaggedWord],
        constraints: &[ParserConstraint],
        interrupt: &AtomicBool,
    ) -> Result<ParseOutcome> {
        self.decoder()
            .parse_state(State::new(sentence.to_vec()), constraints, Some(interrupt))
    }

    /// Parses the tagged yield of `tree`
    pub fn parse_tree(&self, tree: &Tree) -> Result<ParseOutcome> {
        self.parse(&tree.tagged_yield())
    }
}
