//! REORDER_ORACLE: follow the model's mistakes when the gold sequence can
//! be repaired

use log::debug;
use srparse_core::TrainingExample;

use super::greedy::follow_gold_sequence;
use super::traits::{TrainingContext, TrainingStrategy};
use crate::error::Result;
use crate::training::TrainingResult;

/// Applies the model's prediction after a mistake if the reordering oracle
/// can rewrite the remaining gold sequence to continue from it
#[derive(Debug, Clone, Copy, Default)]
pub struct ReorderOracleStrategy;

impl TrainingStrategy for ReorderOracleStrategy {
    fn train_example(
        &self,
        context: &TrainingContext<'_>,
        _tree_index: usize,
        example: &TrainingExample,
    ) -> Result<TrainingResult> {
        let reorderer = context.reordering_oracle();
        follow_gold_sequence(context, example, |state, predicted, transitions| {
            if !reorderer.reorder(state, predicted, transitions) {
                return Ok(None);
            }
            match predicted.try_apply(state, 0.0) {
                Ok(next) => Ok(Some(next)),
                Err(err) => {
                    debug!("Dropping the rest of an example: {err}");
                    Ok(None)
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "reorder_oracle"
    }
}
