//! Strategies that walk the gold sequence one greedy prediction at a time

use std::sync::Arc;

use log::debug;
use srparse_core::{State, TrainingExample, Transition};

use super::traits::{step_limit, TrainingContext, TrainingStrategy};
use crate::error::Result;
use crate::training::{TrainingResult, Update};

/// Walks the remaining gold sequence, updating whenever the model's best
/// transition (legal or not) differs from the next gold one
///
/// `on_mistake` receives the state, the predicted transition and the gold
/// list, and returns the state to continue from or `None` to stop.
pub(super) fn follow_gold_sequence<F>(
    context: &TrainingContext<'_>,
    example: &TrainingExample,
    mut on_mistake: F,
) -> Result<TrainingResult>
where
    F: FnMut(&State, &Transition, &mut Vec<Transition>) -> Result<Option<State>>,
{
    let model = context.model;
    let mut state = example.initial_state()?;
    let mut transitions = example.remaining().to_vec();
    let mut result = TrainingResult::new();
    let limit = step_limit(state.sentence().len()) + transitions.len();

    for _ in 0..limit {
        let Some(gold) = transitions.first().cloned() else {
            return Ok(result);
        };
        let gold_index = model.transition_index().index_of(&gold);
        let features: Arc<[String]> = model.featurize(&state).into();
        let Some(predicted) = model.best_transition(&state, &features[..], false) else {
            return Ok(result);
        };

        if Some(predicted.index) == gold_index {
            result.correct += 1;
            transitions.remove(0);
            match gold.try_apply(&state, 0.0) {
                Ok(next) => state = next,
                Err(err) => {
                    debug!("Dropping the rest of an example: {err}");
                    return Ok(result);
                }
            }
            continue;
        }

        result.wrong += 1;
        result.updates.push(Update::new(
            features,
            gold_index,
            Some(predicted.index),
            model.learning_rate(),
        ));
        let predicted = model.transition(predicted.index)?;
        match on_mistake(&state, predicted, &mut transitions)? {
            Some(next) => state = next,
            None => return Ok(result),
        }
    }
    debug!("Step limit reached after {limit} steps");
    Ok(result)
}

/// GOLD: update on every mistake but always continue along the gold path
#[derive(Debug, Clone, Copy, Default)]
pub struct GoldStrategy;

impl TrainingStrategy for GoldStrategy {
    fn train_example(
        &self,
        context: &TrainingContext<'_>,
        _tree_index: usize,
        example: &TrainingExample,
    ) -> Result<TrainingResult> {
        follow_gold_sequence(context, example, |state, _, transitions| {
            let gold = transitions.remove(0);
            Ok(Some(gold.try_apply(state, 0.0)?))
        })
    }

    fn name(&self) -> &'static str {
        "gold"
    }
}

/// EARLY_TERMINATION: stop the example at the first mistake
#[derive(Debug, Clone, Copy, Default)]
pub struct EarlyTerminationStrategy;

impl TrainingStrategy for EarlyTerminationStrategy {
    fn train_example(
        &self,
        context: &TrainingContext<'_>,
        _tree_index: usize,
        example: &TrainingExample,
    ) -> Result<TrainingResult> {
        follow_gold_sequence(context, example, |_, _, _| Ok(None))
    }

    fn name(&self) -> &'static str {
        "early_termination"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::strategies::test_support::{context_parts, example};

    #[test]
    fn test_untrained_model_stops_at_first_mistake() {
        let (model, options) = context_parts("(S^L (NN cats) (VB sleep))");
        let context = TrainingContext::new(&model, None, &options);
        let example = example(&model, "(S^L (NN cats) (VB sleep))");
        let result = EarlyTerminationStrategy
            .train_example(&context, 0, &example)
            .unwrap();
        // All scores tie at zero and Shift has index 0, so the first step is
        // right and the second Shift is right too; the Binary is missed
        assert_eq!(result.correct, 2);
        assert_eq!(result.wrong, 1);
        assert_eq!(result.updates.len(), 1);
        assert_eq!(result.updates[0].predicted, Some(0));
    }

    #[test]
    fn test_gold_strategy_walks_whole_sequence() {
        let (model, options) = context_parts("(S^L (NN cats) (VB sleep))");
        let context = TrainingContext::new(&model, None, &options);
        let example = example(&model, "(S^L (NN cats) (VB sleep))");
        let result = GoldStrategy.train_example(&context, 0, &example).unwrap();
        assert_eq!(result.correct + result.wrong, example.transitions().len());
        assert_eq!(result.wrong, result.updates.len());
    }

    #[test]
    fn test_skipped_prefix_is_not_trained() {
        let (model, options) = context_parts("(S^L (NN cats) (VB sleep))");
        let context = TrainingContext::new(&model, None, &options);
        let example = example(&model, "(S^L (NN cats) (VB sleep))").with_skip(2);
        let result = GoldStrategy.train_example(&context, 0, &example).unwrap();
        assert_eq!(result.correct + result.wrong, example.remaining().len());
    }
}
