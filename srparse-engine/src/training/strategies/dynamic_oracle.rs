//! ORACLE: follow the model's own legal predictions, scored against the
//! dynamic oracle

use std::sync::Arc;

use log::debug;
use srparse_core::TrainingExample;

use super::traits::{step_limit, TrainingContext, TrainingStrategy};
use crate::error::{EngineError, Result};
use crate::training::{TrainingResult, Update};

/// Learns from every state the model itself reaches
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicOracleStrategy;

impl TrainingStrategy for DynamicOracleStrategy {
    fn train_example(
        &self,
        context: &TrainingContext<'_>,
        tree_index: usize,
        example: &TrainingExample,
    ) -> Result<TrainingResult> {
        let oracle = context.oracle.ok_or_else(|| EngineError::InvalidConfig {
            reason: "ORACLE training needs a dynamic oracle".to_string(),
        })?;
        let model = context.model;
        let index = model.transition_index();
        let mut state = example.initial_state()?;
        let mut result = TrainingResult::new();

        for _ in 0..step_limit(state.sentence().len()) {
            if state.is_finished() {
                return Ok(result);
            }
            let features: Arc<[String]> = model.featurize(&state).into();
            let Some(scored) = model.best_transition(&state, &features[..], true) else {
                debug!("No legal transition while following predictions");
                return Ok(result);
            };
            let predicted = model.transition(scored.index)?;
            let gold = match oracle.gold_transition(tree_index, &state) {
                Ok(gold) => gold,
                Err(err) => {
                    debug!("Dropping the rest of an example: {err}");
                    return Ok(result);
                }
            };
            let gold_index = gold
                .transition
                .as_ref()
                .and_then(|transition| index.index_of(transition));

            if gold.is_correct(predicted) {
                result.correct += 1;
                // A class answer was met, but an exact answer still earns
                // its transition a reward
                if let Some(gold_index) = gold_index.filter(|&gold| gold != scored.index) {
                    result.updates.push(Update::new(
                        features,
                        Some(gold_index),
                        None,
                        model.learning_rate(),
                    ));
                }
            } else {
                result.wrong += 1;
                result.updates.push(Update::new(
                    features,
                    gold_index,
                    Some(scored.index),
                    model.learning_rate(),
                ));
            }
            state = predicted.try_apply(&state, 0.0)?;
        }
        debug!("Step limit reached while following predictions");
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "oracle"
    }
}
