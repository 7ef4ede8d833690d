//! Perceptron scoring model

use std::sync::Arc;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};
use srparse_core::{LabelSet, ParserConstraint, State, Transition, TransitionIndex, WeightMap};

use crate::agenda::Agenda;
use crate::error::{EngineError, Result};
use crate::features::FeatureFactory;
use crate::training::Update;

/// A transition index with its perceptron score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredTransition {
    /// Position in the model's transition index
    pub index: usize,
    /// Summed feature weights
    pub score: f32,
}

/// Size summary of a model's weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelStats {
    /// Features with at least one stored weight
    pub features: usize,
    /// Stored (feature, transition) weights
    pub weights: usize,
    /// Largest absolute weight
    pub max_weight: f32,
    /// Transitions the model can score
    pub transitions: usize,
}

/// Linear model scoring every transition from the features of a state
#[derive(Debug, Clone)]
pub struct PerceptronModel {
    transition_index: TransitionIndex,
    known_states: LabelSet,
    root_states: LabelSet,
    root_only_states: LabelSet,
    weights: WeightMap,
    feature_factory: Arc<dyn FeatureFactory>,
    learning_rate: f32,
}

impl PerceptronModel {
    /// Creates a model with no weights
    pub fn new(
        transition_index: TransitionIndex,
        known_states: LabelSet,
        root_states: LabelSet,
        root_only_states: LabelSet,
        feature_factory: Arc<dyn FeatureFactory>,
    ) -> Self {
        Self {
            transition_index,
            known_states,
            root_states,
            root_only_states,
            weights: WeightMap::new(),
            feature_factory,
            learning_rate: 1.0,
        }
    }

    /// Transitions the model scores, by index
    pub fn transition_index(&self) -> &TransitionIndex {
        &self.transition_index
    }

    /// Transition at `index`
    pub fn transition(&self, index: usize) -> Result<&Transition> {
        self.transition_index
            .get(index)
            .ok_or(EngineError::UnknownTransition {
                index,
                len: self.transition_index.len(),
            })
    }

    /// Non-temporary labels seen in training
    pub fn known_states(&self) -> &LabelSet {
        &self.known_states
    }

    /// Labels seen at the root of a training tree
    pub fn root_states(&self) -> &LabelSet {
        &self.root_states
    }

    /// Labels seen only at the root
    pub fn root_only_states(&self) -> &LabelSet {
        &self.root_only_states
    }

    /// Feature weights
    pub fn weights(&self) -> &WeightMap {
        &self.weights
    }

    /// Replaces the feature weights
    pub fn set_weights(&mut self, weights: WeightMap) {
        self.weights = weights;
    }

    /// Drops all weights
    pub fn reset_weights(&mut self) {
        self.weights = WeightMap::new();
    }

    /// Feature factory used to featurize states
    pub fn feature_factory(&self) -> &Arc<dyn FeatureFactory> {
        &self.feature_factory
    }

    /// Current update step size
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Sets the update step size
    pub fn set_learning_rate(&mut self, rate: f32) {
        self.learning_rate = rate;
    }

    /// Multiplies the learning rate by `factor`
    pub fn decay_learning_rate(&mut self, factor: f32) {
        self.learning_rate *= factor;
        info!("Learning rate decayed to {}", self.learning_rate);
    }

    /// Active features of `state`
    pub fn featurize(&self, state: &State) -> Vec<String> {
        self.feature_factory.featurize(state)
    }

    /// Score of every transition given the active features
    pub fn score_transitions<S: AsRef<str>>(&self, features: &[S]) -> Vec<f32> {
        let mut scores = vec![0.0; self.transition_index.len()];
        self.weights.score(features, &mut scores);
        scores
    }

    /// Up to `count` best transitions, best first
    ///
    /// With `require_legal`, only transitions legal at `state` under
    /// `constraints` are considered. Ties go to the lower index.
    pub fn top_transitions<S: AsRef<str>>(
        &self,
        state: &State,
        features: &[S],
        require_legal: bool,
        count: usize,
        constraints: &[ParserConstraint],
    ) -> Vec<ScoredTransition> {
        let scores = self.score_transitions(features);
        let mut agenda = Agenda::new(count);
        for (index, (transition, &score)) in self.transition_index.iter().zip(&scores).enumerate() {
            if !require_legal || transition.is_legal(state, constraints) {
                agenda.push(f64::from(score), ScoredTransition { index, score });
            }
        }
        agenda.into_sorted_vec()
    }

    /// Single best transition
    pub fn best_transition<S: AsRef<str>>(
        &self,
        state: &State,
        features: &[S],
        require_legal: bool,
    ) -> Option<ScoredTransition> {
        self.top_transitions(state, features, require_legal, 1, &[])
            .into_iter()
            .next()
    }

    /// Applies updates in order
    ///
    /// Features outside `allowed` are skipped. When `frequencies` is given,
    /// every touched feature is credited two for a gold-and-predicted
    /// update and one otherwise.
    pub fn apply_updates(
        &mut self,
        updates: &[Update],
        allowed: Option<&FxHashSet<String>>,
        mut frequencies: Option<&mut FxHashMap<String, u32>>,
    ) {
        for update in updates {
            for feature in update.features.iter() {
                if allowed.is_some_and(|allowed| !allowed.contains(feature)) {
                    continue;
                }
                if let Some(gold) = update.gold {
                    self.weights.update(feature, gold, update.delta);
                }
                if let Some(predicted) = update.predicted {
                    self.weights.update(feature, predicted, -update.delta);
                }
                if let Some(frequencies) = frequencies.as_deref_mut() {
                    *frequencies.entry(feature.clone()).or_insert(0) += update.frequency_weight();
                }
            }
        }
    }

    /// Shrinks every weight by `1 - reg`
    pub fn regularize(&mut self, reg: f32) {
        self.weights.l2_reg(reg);
    }

    /// Drops zero weights and empty features
    pub fn condense(&mut self) {
        self.weights.condense();
    }

    /// Keeps only the features in `keep`
    pub fn filter_features(&mut self, keep: &FxHashSet<String>) {
        self.weights.retain_features(keep);
    }

    /// Replaces the weights with the mean of `models`' weights
    pub fn average_models(&mut self, models: &[&PerceptronModel]) -> Result<()> {
        if models.is_empty() {
            return Err(EngineError::EmptyModelSet);
        }
        let maps: Vec<&WeightMap> = models.iter().map(|model| &model.weights).collect();
        self.weights = WeightMap::average(&maps);
        Ok(())
    }

    /// Size summary of the weights
    pub fn stats(&self) -> ModelStats {
        ModelStats {
            features: self.weights.len(),
            weights: self.weights.num_weights(),
            max_weight: self.weights.max_abs(),
            transitions: self.transition_index.len(),
        }
    }

    /// Logs [`PerceptronModel::stats`]
    pub fn output_stats(&self) {
        let stats = self.stats();
        debug!(
            "Model has {} features, {} weights (max |w| = {}), {} transitions",
            stats.features, stats.weights, stats.max_weight, stats.transitions
        );
    }
}
