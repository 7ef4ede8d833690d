//! Perceptron training
//!
//! The [`Trainer`] owns the epoch loop: it shuffles the examples, hands
//! batches to a [`BatchExecutor`], applies the returned updates on the
//! calling thread and keeps the best dev-scoring weights for averaging.
//! The per-example learning rule lives in [`strategies`].

pub mod executor;
pub mod strategies;
mod update;

pub use executor::{executor_for, BatchExecutor, BatchItem, ExecutionMode, SequentialExecutor};
#[cfg(feature = "parallel")]
pub use executor::ParallelExecutor;
pub use strategies::{strategy_for, TrainingContext, TrainingStrategy};
pub use update::{TrainingResult, Update};

use std::fmt;
use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use srparse_core::{Oracle, TrainingExample, Tree, WeightMap};

use crate::agenda::Agenda;
use crate::config::{TrainOptions, TrainingMethod};
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::model::PerceptronModel;

/// What a training run did
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Iterations completed in the last pass
    pub iterations_run: usize,
    /// Best dev score seen in the last pass
    pub best_score: Option<f64>,
    /// Iteration that reached `best_score`
    pub best_iteration: Option<usize>,
    /// Correct steps in the last iteration
    pub correct: usize,
    /// Wrong steps in the last iteration
    pub wrong: usize,
    /// Models averaged into the final weights (0 = none)
    pub averaged_models: usize,
    /// Features in the final model
    pub features: usize,
}

/// Outcome of one pass over the iterations
#[derive(Debug, Clone, Default)]
struct PassOutcome {
    iterations_run: usize,
    best_score: Option<f64>,
    best_iteration: Option<usize>,
    correct: usize,
    wrong: usize,
    averaged_models: usize,
}

/// Epoch-level training driver
pub struct Trainer {
    options: TrainOptions,
    compound_unaries: bool,
    executor: Box<dyn BatchExecutor>,
    strategy: Box<dyn TrainingStrategy>,
}

impl fmt::Debug for Trainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trainer")
            .field("strategy", &self.strategy.name())
            .field("mode", &self.executor.mode())
            .finish_non_exhaustive()
    }
}

impl Trainer {
    /// Validates the options and sets up the executor and strategy
    pub fn new(options: TrainOptions) -> Result<Self> {
        options.validate()?;
        let executor = executor_for(options.thread_count())?;
        let strategy = strategy_for(options.training_method);
        Ok(Self {
            options,
            compound_unaries: true,
            executor,
            strategy,
        })
    }

    /// Whether the gold sequences collapse unary chains; the dynamic oracle
    /// must answer with the same kind of unary transition
    pub fn with_compound_unaries(mut self, compound_unaries: bool) -> Self {
        self.compound_unaries = compound_unaries;
        self
    }

    /// Training options
    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    /// How batches are executed
    pub fn execution_mode(&self) -> ExecutionMode {
        self.executor.mode()
    }

    /// Trains `model` in place on `examples`
    ///
    /// `evaluator` scores the model after every iteration; without one
    /// there is no early stopping and no model averaging.
    pub fn train(
        &self,
        model: &mut PerceptronModel,
        examples: &[TrainingExample],
        evaluator: Option<&dyn Evaluator>,
    ) -> Result<TrainingSummary> {
        let options = &self.options;
        info!(
            "Training on {} examples with {} ({:?} execution)",
            examples.len(),
            self.strategy.name(),
            self.executor.mode()
        );

        let oracle = (options.training_method == TrainingMethod::Oracle).then(|| {
            let trees: Vec<Tree> = examples.iter().map(|example| example.tree().clone()).collect();
            Oracle::new(
                &trees,
                self.compound_unaries,
                model.root_states().clone(),
                model.root_only_states().clone(),
            )
        });
        let mut rng = StdRng::seed_from_u64(options.random_seed);
        let initial_rate = model.learning_rate();

        let mut outcome = self.run_pass(model, examples, oracle.as_ref(), evaluator, None, &mut rng)?;

        if options.retrains() {
            let mut surviving: Vec<String> = model.weights().features().cloned().collect();
            surviving.sort_unstable();
            info!("Retraining on {} surviving features", surviving.len());

            if options.retrain_shards > 1 {
                let mut shards = Vec::with_capacity(options.retrain_shards);
                for shard in 0..options.retrain_shards {
                    let allowed: FxHashSet<String> = surviving
                        .iter()
                        .filter(|_| rng.gen::<f32>() >= options.retrain_shard_feature_drop)
                        .cloned()
                        .collect();
                    info!(
                        "Shard {} of {} keeps {} features",
                        shard + 1,
                        options.retrain_shards,
                        allowed.len()
                    );
                    let mut shard_model = model.clone();
                    shard_model.reset_weights();
                    shard_model.set_learning_rate(initial_rate);
                    outcome = self.run_pass(
                        &mut shard_model,
                        examples,
                        oracle.as_ref(),
                        evaluator,
                        Some(&allowed),
                        &mut rng,
                    )?;
                    shards.push(shard_model);
                }
                let shard_refs: Vec<&PerceptronModel> = shards.iter().collect();
                model.average_models(&shard_refs)?;
                model.condense();
                outcome.averaged_models = shards.len();
                info!("Averaged {} shard models", shards.len());
            } else {
                let allowed: FxHashSet<String> = surviving.into_iter().collect();
                model.reset_weights();
                model.set_learning_rate(initial_rate);
                outcome =
                    self.run_pass(model, examples, oracle.as_ref(), evaluator, Some(&allowed), &mut rng)?;
            }
        }

        Ok(TrainingSummary {
            iterations_run: outcome.iterations_run,
            best_score: outcome.best_score,
            best_iteration: outcome.best_iteration,
            correct: outcome.correct,
            wrong: outcome.wrong,
            averaged_models: outcome.averaged_models,
            features: model.weights().len(),
        })
    }

    fn run_pass(
        &self,
        model: &mut PerceptronModel,
        examples: &[TrainingExample],
        oracle: Option<&Oracle>,
        evaluator: Option<&dyn Evaluator>,
        allowed: Option<&FxHashSet<String>>,
        rng: &mut StdRng,
    ) -> Result<PassOutcome> {
        let options = &self.options;
        let mut outcome = PassOutcome::default();
        let mut best_score = 0.0;
        let mut best_iteration = 0;
        let mut best_models: Option<Agenda<WeightMap>> = (options.averaged_models > 0 && evaluator.is_some())
            .then(|| Agenda::new(options.averaged_models));
        let mut frequencies: Option<FxHashMap<String, u32>> =
            (options.feature_frequency_cutoff > 1).then(FxHashMap::default);

        for iteration in 1..=options.training_iterations {
            let started = Instant::now();
            let items = self.epoch_items(examples, rng);
            let mut correct = 0;
            let mut wrong = 0;

            for batch in items.chunks(options.batch_size) {
                let context = TrainingContext::new(model, oracle, options);
                let result = TrainingResult::merge_all(self.executor.run(
                    self.strategy.as_ref(),
                    &context,
                    batch,
                )?);
                correct += result.correct;
                wrong += result.wrong;
                model.apply_updates(&result.updates, allowed, frequencies.as_mut());
                if options.l2_reg > 0.0 {
                    model.regularize(options.l2_reg);
                }
            }

            outcome.iterations_run = iteration;
            outcome.correct = correct;
            outcome.wrong = wrong;
            info!(
                "Iteration {} took {:.2?}: {} transitions correct, {} wrong",
                iteration,
                started.elapsed(),
                correct,
                wrong
            );
            model.output_stats();

            if let Some(evaluator) = evaluator {
                let score = evaluator.evaluate(model)?;
                info!("Dev score after {} iterations: {}", iteration, score);
                if score > best_score {
                    info!("New best dev score (previous best {})", best_score);
                    best_score = score;
                    best_iteration = iteration;
                    outcome.best_score = Some(score);
                    outcome.best_iteration = Some(iteration);
                } else {
                    let stalled = iteration - best_iteration;
                    info!(
                        "Failed to improve for {} iteration(s) on previous best score of {}",
                        stalled, best_score
                    );
                    if options.stalled_iteration_limit > 0 && stalled >= options.stalled_iteration_limit {
                        info!("Failed to improve for too long, stopping training");
                        break;
                    }
                }
                if let Some(best_models) = best_models.as_mut() {
                    best_models.push(score, model.weights().clone());
                }
            }

            if iteration % 10 == 0 && options.decay_learning_rate > 0.0 {
                model.decay_learning_rate(options.decay_learning_rate);
            }
        }

        if let Some(best_models) = best_models {
            outcome.averaged_models = self.average_best(model, best_models.into_sorted_vec(), evaluator)?;
        }

        if let Some(frequencies) = frequencies {
            let cutoff = options.feature_frequency_cutoff;
            let keep: FxHashSet<String> = frequencies
                .into_iter()
                .filter(|(_, count)| *count >= cutoff)
                .map(|(feature, _)| feature)
                .collect();
            let before = model.weights().len();
            model.filter_features(&keep);
            info!(
                "Feature cutoff {} kept {} of {} features",
                cutoff,
                model.weights().len(),
                before
            );
        }

        model.condense();
        Ok(outcome)
    }

    /// Shuffled work list for one iteration, augmented copies included
    fn epoch_items(&self, examples: &[TrainingExample], rng: &mut StdRng) -> Vec<BatchItem> {
        let probability = self.options.augment_subsentences;
        let mut items: Vec<BatchItem> = Vec::with_capacity(examples.len());
        for (index, example) in examples.iter().enumerate() {
            items.push((index, example.clone()));
            let len = example.transitions().len();
            if probability > 0.0 && len > 3 && rng.gen::<f32>() < probability {
                let skip = rng.gen_range(1..len - 2);
                items.push((index, example.with_skip(skip)));
            }
        }
        items.shuffle(rng);
        items
    }

    /// Averages a best-first list of weights into `model`, returning how
    /// many were used
    fn average_best(
        &self,
        model: &mut PerceptronModel,
        best: Vec<WeightMap>,
        evaluator: Option<&dyn Evaluator>,
    ) -> Result<usize> {
        if best.is_empty() {
            return Ok(0);
        }
        let size = match evaluator {
            Some(evaluator) if self.options.cv_averaged_models => {
                let mut best_f1 = 0.0;
                let mut best_size = 0;
                for size in 1..=best.len() {
                    model.set_weights(average_prefix(&best, size));
                    let score = evaluator.evaluate(model)?;
                    info!("Dev score for {} models averaged: {}", size, score);
                    if score > best_f1 {
                        best_f1 = score;
                        best_size = size;
                    }
                }
                best_size.max(1)
            }
            _ => best.len(),
        };
        model.set_weights(average_prefix(&best, size));
        info!("Averaged the {} best models", size);
        debug!("Averaged model has {} features", model.weights().len());
        Ok(size)
    }
}

fn average_prefix(best: &[WeightMap], size: usize) -> WeightMap {
    let maps: Vec<&WeightMap> = best[..size].iter().collect();
    WeightMap::average(&maps)
}
