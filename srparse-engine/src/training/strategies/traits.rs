//! Strategy trait for learning from one training example

use srparse_core::{Oracle, ReorderingOracle, TrainingExample};

use crate::config::TrainOptions;
use crate::error::Result;
use crate::model::PerceptronModel;
use crate::training::TrainingResult;

/// Read-only view shared by every worker of a batch
#[derive(Debug, Clone, Copy)]
pub struct TrainingContext<'a> {
    /// Weights as of the start of the batch
    pub model: &'a PerceptronModel,
    /// Dynamic oracle over the training trees, when the method needs one
    pub oracle: Option<&'a Oracle>,
    /// Training options
    pub options: &'a TrainOptions,
}

impl<'a> TrainingContext<'a> {
    /// Creates a context
    pub fn new(
        model: &'a PerceptronModel,
        oracle: Option<&'a Oracle>,
        options: &'a TrainOptions,
    ) -> Self {
        Self {
            model,
            oracle,
            options,
        }
    }

    /// Reordering oracle configured from the options
    pub fn reordering_oracle(&self) -> ReorderingOracle<'a> {
        ReorderingOracle::new(
            self.model.transition_index(),
            self.model.root_only_states(),
        )
        .with_shift_to_binary(self.options.oracle_shift_to_binary)
        .with_binary_to_shift(self.options.oracle_binary_to_shift)
    }
}

/// One training method
///
/// Implementations never touch the model's weights; they return the updates
/// they want applied.
pub trait TrainingStrategy: Send + Sync {
    /// Learns from `example`; `tree_index` is its position in the oracle
    fn train_example(
        &self,
        context: &TrainingContext<'_>,
        tree_index: usize,
        example: &TrainingExample,
    ) -> Result<TrainingResult>;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}

/// Upper bound on steps for one sentence when following predictions
pub fn step_limit(sentence_length: usize) -> usize {
    10 * sentence_length + 10
}
