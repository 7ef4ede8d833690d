//! Pending weight updates produced by training workers

use std::sync::Arc;

/// One perceptron update: every feature moves towards `gold` and away from
/// `predicted` by `delta`
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Features active at the point of the update
    pub features: Arc<[String]>,
    /// Transition index rewarded, if any
    pub gold: Option<usize>,
    /// Transition index penalised, if any
    pub predicted: Option<usize>,
    /// Step size
    pub delta: f32,
}

impl Update {
    /// Creates an update
    pub fn new(
        features: Arc<[String]>,
        gold: Option<usize>,
        predicted: Option<usize>,
        delta: f32,
    ) -> Self {
        Self {
            features,
            gold,
            predicted,
            delta,
        }
    }

    /// Frequency credit per feature: two when both sides move
    pub fn frequency_weight(&self) -> u32 {
        if self.gold.is_some() && self.predicted.is_some() {
            2
        } else {
            1
        }
    }
}

/// Outcome of training on one example, or the merge of several
///
/// Workers only read the model; the coordinator applies `updates` after the
/// whole batch has been scored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingResult {
    /// Updates in the order they were found
    pub updates: Vec<Update>,
    /// Steps where the model agreed with the oracle
    pub correct: usize,
    /// Steps where it did not
    pub wrong: usize,
}

impl TrainingResult {
    /// Empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `other` after this result
    pub fn merge(&mut self, other: TrainingResult) {
        self.updates.extend(other.updates);
        self.correct += other.correct;
        self.wrong += other.wrong;
    }

    /// Merges results in order
    pub fn merge_all(results: impl IntoIterator<Item = TrainingResult>) -> TrainingResult {
        results
            .into_iter()
            .fold(TrainingResult::new(), |mut merged, result| {
                merged.merge(result);
                merged
            })
    }
}
