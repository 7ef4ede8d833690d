//! Beam-search decoding
//!
//! Each step expands every state on the beam with the model's best legal
//! transitions and keeps the `beam_size` highest-scoring successors. When
//! constraints leave no legal move for any state, the emergency fallback
//! is tried once per state before the sentence is given up on.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use srparse_core::{find_emergency_transition, ParserConstraint, State, TaggedWord, Tree};

use crate::agenda::Agenda;
use crate::error::{EngineError, Result};
use crate::model::PerceptronModel;
use crate::training::strategies::step_limit;

/// Result of decoding one sentence
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// The best state reached Finalize
    Parsed(State),
    /// Decoding stopped without a finished state
    Unparsable {
        /// Best state reached before giving up, if any
        partial: Option<State>,
    },
}

impl ParseOutcome {
    /// True if a complete parse was found
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }

    /// Finished state, if any
    pub fn state(&self) -> Option<&State> {
        match self {
            ParseOutcome::Parsed(state) => Some(state),
            ParseOutcome::Unparsable { .. } => None,
        }
    }

    /// Finished tree, if any
    pub fn tree(&self) -> Option<&Tree> {
        self.state().and_then(State::tree)
    }
}

/// Beam decoder over a trained model
#[derive(Debug, Clone, Copy)]
pub struct BeamDecoder<'m> {
    model: &'m PerceptronModel,
    beam_size: usize,
}

impl<'m> BeamDecoder<'m> {
    /// Creates a decoder; a beam size of zero is treated as one
    pub fn new(model: &'m PerceptronModel, beam_size: usize) -> Self {
        Self {
            model,
            beam_size: beam_size.max(1),
        }
    }

    /// Beam width
    pub fn beam_size(&self) -> usize {
        self.beam_size
    }

    /// Decodes a tagged sentence without constraints
    pub fn parse(&self, sentence: &[TaggedWord]) -> Result<ParseOutcome> {
        self.parse_state(State::new(sentence.to_vec()), &[], None)
    }

    /// Decodes from `initial`
    ///
    /// `interrupt` is checked once per step; when it is set the decode stops
    /// with [`EngineError::Interrupted`].
    pub fn parse_state(
        &self,
        initial: State,
        constraints: &[ParserConstraint],
        interrupt: Option<&AtomicBool>,
    ) -> Result<ParseOutcome> {
        let model = self.model;
        let limit = step_limit(initial.sentence().len());
        let mut beam = vec![initial];

        for _ in 0..limit {
            if interrupt.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(EngineError::Interrupted);
            }

            let mut agenda = Agenda::new(self.beam_size);
            let mut best: Option<State> = None;
            for state in &beam {
                let features = model.featurize(state);
                for candidate in
                    model.top_transitions(state, &features, true, self.beam_size, constraints)
                {
                    let transition = model.transition(candidate.index)?;
                    let next = transition.apply(state, f64::from(candidate.score));
                    track_best(&mut best, &next);
                    agenda.push(next.score(), next);
                }
            }

            if agenda.is_empty() {
                debug!("Beam collapsed, trying emergency transitions");
                for state in &beam {
                    let Some(transition) = find_emergency_transition(
                        state,
                        constraints,
                        model.known_states(),
                        model.root_states(),
                    ) else {
                        continue;
                    };
                    let next = transition.try_apply(state, 0.0)?;
                    track_best(&mut best, &next);
                    agenda.push(next.score(), next);
                }
            }

            let Some(best) = best else {
                return Ok(ParseOutcome::Unparsable {
                    partial: beam.into_iter().next(),
                });
            };
            if best.is_finished() {
                return Ok(ParseOutcome::Parsed(best));
            }
            beam = agenda.into_sorted_vec();
        }

        warn!(
            "Decoding stopped after {} steps without finishing a {}-word sentence",
            limit,
            beam.first().map_or(0, |state| state.sentence().len())
        );
        Ok(ParseOutcome::Unparsable {
            partial: beam.into_iter().next(),
        })
    }
}

fn track_best(best: &mut Option<State>, candidate: &State) {
    if best.as_ref().map_or(true, |best| best.score() < candidate.score()) {
        *best = Some(candidate.clone());
    }
}
