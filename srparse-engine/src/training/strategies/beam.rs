//! BEAM and REORDER_BEAM: early-update beam training

use std::sync::Arc;

use log::debug;
use srparse_core::{State, TrainingExample, Transition};

use super::traits::{step_limit, TrainingContext, TrainingStrategy};
use crate::agenda::Agenda;
use crate::error::Result;
use crate::training::{TrainingResult, Update};

/// Keeps a beam in lock-step with the gold state and updates whenever the
/// best beam entry is not the gold one
///
/// Plain beam training stops as soon as the gold state falls off the beam.
/// With `reorder`, it first asks the reordering oracle to continue from the
/// best transition out of the gold state.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeamStrategy {
    reorder: bool,
}

impl BeamStrategy {
    /// BEAM
    pub fn new() -> Self {
        Self { reorder: false }
    }

    /// REORDER_BEAM
    pub fn reordering() -> Self {
        Self { reorder: true }
    }
}

fn on_agenda(agenda: &Agenda<State>, state: &State) -> bool {
    agenda.iter().any(|entry| entry.are_transitions_equal(state))
}

impl TrainingStrategy for BeamStrategy {
    fn train_example(
        &self,
        context: &TrainingContext<'_>,
        _tree_index: usize,
        example: &TrainingExample,
    ) -> Result<TrainingResult> {
        let model = context.model;
        let index = model.transition_index();
        let beam_size = context.options.beam_size;
        let reorderer = context.reordering_oracle();

        let mut transitions = example.remaining().to_vec();
        let mut gold_state = example.initial_state()?;
        let mut beam = vec![gold_state.clone()];
        let mut result = TrainingResult::new();
        let limit = step_limit(gold_state.sentence().len()) + transitions.len();

        for _ in 0..limit {
            let Some(gold_transition) = transitions.first().cloned() else {
                return Ok(result);
            };

            let mut agenda = Agenda::new(beam_size);
            // Best successor overall, with the position of its parent
            let mut best: Option<(State, usize)> = None;
            // Best transition out of the gold state
            let mut best_from_gold: Option<(Transition, f32)> = None;

            for (position, current) in beam.iter().enumerate() {
                let is_gold = self.reorder && gold_state.are_transitions_equal(current);
                let features = model.featurize(current);
                for scored in model.top_transitions(current, &features, true, beam_size, &[]) {
                    let transition = model.transition(scored.index)?;
                    let next = transition.apply(current, f64::from(scored.score));
                    if best.as_ref().map_or(true, |(state, _)| state.score() < next.score()) {
                        best = Some((next.clone(), position));
                    }
                    if is_gold
                        && best_from_gold
                            .as_ref()
                            .map_or(true, |(_, score)| scored.score > *score)
                    {
                        best_from_gold = Some((transition.clone(), scored.score));
                    }
                    agenda.push(next.score(), next);
                }
            }

            if self.reorder && best_from_gold.is_none() {
                return Ok(result);
            }
            let Some((best_state, parent)) = best else {
                return Ok(result);
            };

            let mut new_gold = match gold_transition.try_apply(&gold_state, 0.0) {
                Ok(state) => state,
                Err(err) => {
                    debug!("Dropping the rest of an example: {err}");
                    return Ok(result);
                }
            };
            if new_gold.are_transitions_equal(&best_state) {
                result.correct += 1;
                transitions.remove(0);
            } else {
                result.wrong += 1;
                let last = best_state
                    .transitions()
                    .peek()
                    .and_then(|transition| index.index_of(transition));
                let parent_features: Arc<[String]> = model.featurize(&beam[parent]).into();
                let gold_features: Arc<[String]> = model.featurize(&gold_state).into();
                let rate = model.learning_rate();
                result.updates.push(Update::new(parent_features, None, last, rate));
                result.updates.push(Update::new(
                    gold_features,
                    index.index_of(&gold_transition),
                    None,
                    rate,
                ));

                if on_agenda(&agenda, &new_gold) {
                    transitions.remove(0);
                } else if !self.reorder {
                    return Ok(result);
                } else {
                    let Some((chosen, _)) = best_from_gold.take() else {
                        return Ok(result);
                    };
                    if !reorderer.reorder(&gold_state, &chosen, &mut transitions) {
                        return Ok(result);
                    }
                    new_gold = match chosen.try_apply(&gold_state, 0.0) {
                        Ok(state) => state,
                        Err(err) => {
                            debug!("Dropping the rest of an example: {err}");
                            return Ok(result);
                        }
                    };
                    if !on_agenda(&agenda, &new_gold) {
                        return Ok(result);
                    }
                }
            }

            gold_state = new_gold;
            beam = agenda.into_sorted_vec();
        }
        debug!("Step limit reached in beam training");
        Ok(result)
    }

    fn name(&self) -> &'static str {
        if self.reorder {
            "reorder_beam"
        } else {
            "beam"
        }
    }
}
