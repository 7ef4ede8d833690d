//! Parser and training options
//!
//! Options are plain data with serde support so they can be kept in TOML
//! files next to a treebank. Every entry point that consumes options calls
//! [`ParserOptions::validate`] first.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// How the perceptron learns from each training example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TrainingMethod {
    /// Always follow the gold sequence, updating on every mistake
    Gold,
    /// Stop the example at the first mistake
    #[default]
    EarlyTermination,
    /// Follow the model's own predictions, scored by the dynamic oracle
    Oracle,
    /// Repair the gold sequence after a mistake, or stop if it cannot be repaired
    ReorderOracle,
    /// Beam search with early update when gold falls off the beam
    Beam,
    /// Beam search that tries to repair the gold sequence before stopping
    ReorderBeam,
}

impl TrainingMethod {
    /// All methods, in declaration order
    pub const ALL: [TrainingMethod; 6] = [
        TrainingMethod::Gold,
        TrainingMethod::EarlyTermination,
        TrainingMethod::Oracle,
        TrainingMethod::ReorderOracle,
        TrainingMethod::Beam,
        TrainingMethod::ReorderBeam,
    ];

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingMethod::Gold => "GOLD",
            TrainingMethod::EarlyTermination => "EARLY_TERMINATION",
            TrainingMethod::Oracle => "ORACLE",
            TrainingMethod::ReorderOracle => "REORDER_ORACLE",
            TrainingMethod::Beam => "BEAM",
            TrainingMethod::ReorderBeam => "REORDER_BEAM",
        }
    }

    /// True for the methods that keep a beam during training
    pub fn uses_beam(&self) -> bool {
        matches!(self, TrainingMethod::Beam | TrainingMethod::ReorderBeam)
    }

    /// True for the methods that consult the reordering oracle
    pub fn uses_reordering(&self) -> bool {
        matches!(self, TrainingMethod::ReorderOracle | TrainingMethod::ReorderBeam)
    }
}

impl fmt::Display for TrainingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| EngineError::InvalidConfig {
                reason: format!("unknown training method '{s}'"),
            })
    }
}

impl TryFrom<String> for TrainingMethod {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TrainingMethod> for String {
    fn from(method: TrainingMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Options that only matter while training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Learning strategy
    pub training_method: TrainingMethod,
    /// Passes over the training data
    pub training_iterations: usize,
    /// Examples scored against the same weights before updates are applied
    pub batch_size: usize,
    /// Beam width for the beam training methods
    pub beam_size: usize,
    /// Worker threads (None = all available cores)
    pub training_threads: Option<usize>,
    /// Seed for shuffling, augmentation and shard feature dropping
    pub random_seed: u64,
    /// Stop after this many iterations without a better dev score (0 = never)
    pub stalled_iteration_limit: usize,
    /// Number of best dev-scoring models to average at the end (0 = none)
    pub averaged_models: usize,
    /// Pick how many of the best models to average by dev score
    pub cv_averaged_models: bool,
    /// Drop features updated fewer than this many times (0 or 1 = keep all)
    pub feature_frequency_cutoff: u32,
    /// Retrain from scratch on the features that survive the cutoff
    pub retrain_after_cutoff: bool,
    /// Multiply the learning rate by this every 10 iterations (0 = off)
    pub decay_learning_rate: f32,
    /// L2 shrinkage applied after every batch (0 = off)
    pub l2_reg: f32,
    /// Let the reordering oracle rebuild binaries after a premature shift
    pub oracle_shift_to_binary: bool,
    /// Let the reordering oracle splice out binaries after a premature binary
    pub oracle_binary_to_shift: bool,
    /// Probability of adding a random gold-prefix copy of each example per iteration
    pub augment_subsentences: f32,
    /// Models retrained on random feature subsets and then averaged (1 = off)
    pub retrain_shards: usize,
    /// Fraction of features each shard drops
    pub retrain_shard_feature_drop: f32,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            training_method: TrainingMethod::default(),
            training_iterations: 40,
            batch_size: 1,
            beam_size: 4,
            training_threads: Some(1),
            random_seed: 0,
            stalled_iteration_limit: 20,
            averaged_models: 8,
            cv_averaged_models: true,
            feature_frequency_cutoff: 0,
            retrain_after_cutoff: true,
            decay_learning_rate: 0.0,
            l2_reg: 0.0,
            oracle_shift_to_binary: false,
            oracle_binary_to_shift: false,
            augment_subsentences: 0.0,
            retrain_shards: 1,
            retrain_shard_feature_drop: 0.25,
        }
    }
}

impl TrainOptions {
    /// Validates the training options
    pub fn validate(&self) -> Result<()> {
        if self.training_iterations == 0 {
            return Err(invalid("training iterations must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch size must be greater than 0"));
        }
        if self.beam_size == 0 {
            return Err(invalid("training beam size must be greater than 0"));
        }
        if self.training_threads == Some(0) {
            return Err(invalid("training threads must be greater than 0"));
        }
        if !(0.0..1.0).contains(&self.decay_learning_rate) {
            return Err(invalid("learning rate decay must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.l2_reg) {
            return Err(invalid("l2 regularization must be in [0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.augment_subsentences) {
            return Err(invalid("subsentence augmentation probability must be in [0, 1]"));
        }
        if self.retrain_shards == 0 {
            return Err(invalid("retrain shards must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.retrain_shard_feature_drop) {
            return Err(invalid("shard feature drop must be in [0, 1)"));
        }
        Ok(())
    }

    /// Worker thread count after resolving the "all cores" default
    pub fn thread_count(&self) -> usize {
        self.training_threads.unwrap_or_else(available_threads)
    }

    /// True if training runs a second pass on a reduced feature set
    pub fn retrains(&self) -> bool {
        (self.retrain_after_cutoff && self.feature_frequency_cutoff > 1) || self.retrain_shards > 1
    }
}

/// Options shared by training and decoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Build unary chains with one CompoundUnary instead of one Unary per layer
    pub compound_unaries: bool,
    /// Beam width used when parsing
    pub beam_size: usize,
    /// Training-only options
    pub train: TrainOptions,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            compound_unaries: true,
            beam_size: 1,
            train: TrainOptions::default(),
        }
    }
}

impl ParserOptions {
    /// Creates a new builder for ParserOptions
    pub fn builder() -> ParserOptionsBuilder {
        ParserOptionsBuilder::new()
    }

    /// Validates the options
    pub fn validate(&self) -> Result<()> {
        if self.beam_size == 0 {
            return Err(invalid("beam size must be greater than 0"));
        }
        self.train.validate()
    }

    /// Parses and validates options from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let options: ParserOptions = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads, parses and validates options from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Writes the options as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(feature = "parallel")]
fn available_threads() -> usize {
    num_cpus::get()
}

#[cfg(not(feature = "parallel"))]
fn available_threads() -> usize {
    1
}

fn invalid(reason: &str) -> EngineError {
    EngineError::InvalidConfig {
        reason: reason.to_string(),
    }
}

/// Builder for ParserOptions with fluent API
#[derive(Debug, Clone, Default)]
pub struct ParserOptionsBuilder {
    options: ParserOptions,
}

impl ParserOptionsBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether unary chains are built in one step
    pub fn compound_unaries(mut self, enabled: bool) -> Self {
        self.options.compound_unaries = enabled;
        self
    }

    /// Sets the decoding beam width
    pub fn beam_size(mut self, size: usize) -> Self {
        self.options.beam_size = size;
        self
    }

    /// Replaces all training options
    pub fn train_options(mut self, train: TrainOptions) -> Self {
        self.options.train = train;
        self
    }

    /// Sets the training method
    pub fn training_method(mut self, method: TrainingMethod) -> Self {
        self.options.train.training_method = method;
        self
    }

    /// Sets the number of training iterations
    pub fn training_iterations(mut self, iterations: usize) -> Self {
        self.options.train.training_iterations = iterations;
        self
    }

    /// Sets the training batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.options.train.batch_size = size;
        self
    }

    /// Sets the training beam width
    pub fn training_beam_size(mut self, size: usize) -> Self {
        self.options.train.beam_size = size;
        self
    }

    /// Sets the number of training threads
    pub fn training_threads(mut self, threads: Option<usize>) -> Self {
        self.options.train.training_threads = threads;
        self
    }

    /// Sets the random seed
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.options.train.random_seed = seed;
        self
    }

    /// Sets how many best models are averaged
    pub fn averaged_models(mut self, count: usize) -> Self {
        self.options.train.averaged_models = count;
        self
    }

    /// Sets the feature frequency cutoff
    pub fn feature_frequency_cutoff(mut self, cutoff: u32) -> Self {
        self.options.train.feature_frequency_cutoff = cutoff;
        self
    }

    /// Enables both reordering oracle repairs at once
    pub fn oracle_repairs(mut self, shift_to_binary: bool, binary_to_shift: bool) -> Self {
        self.options.train.oracle_shift_to_binary = shift_to_binary;
        self.options.train.oracle_binary_to_shift = binary_to_shift;
        self
    }

    /// Builds and validates the options
    pub fn build(self) -> Result<ParserOptions> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Builds the options without validation
    pub fn build_unchecked(self) -> ParserOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let options = ParserOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.train.training_method, TrainingMethod::EarlyTermination);
    }

    #[test]
    fn test_training_method_parsing() {
        assert_eq!("beam".parse::<TrainingMethod>().unwrap(), TrainingMethod::Beam);
        assert_eq!(
            "Reorder_Oracle".parse::<TrainingMethod>().unwrap(),
            TrainingMethod::ReorderOracle
        );
        assert_eq!(
            "early-termination".parse::<TrainingMethod>().unwrap(),
            TrainingMethod::EarlyTermination
        );
        assert!("perceptron".parse::<TrainingMethod>().is_err());
        assert_eq!(TrainingMethod::ReorderBeam.to_string(), "REORDER_BEAM");
    }

    #[test]
    fn test_builder_validation() {
        let options = ParserOptions::builder()
            .beam_size(4)
            .training_method(TrainingMethod::Beam)
            .training_iterations(5)
            .build()
            .unwrap();
        assert_eq!(options.beam_size, 4);
        assert_eq!(options.train.training_iterations, 5);

        let result = ParserOptions::builder().batch_size(0).build();
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));

        let result = ParserOptions::builder().training_threads(Some(0)).build();
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));

        let unchecked = ParserOptions::builder().beam_size(0).build_unchecked();
        assert!(unchecked.validate().is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let options = ParserOptions::from_toml_str(
            r#"
            compound_unaries = false
            beam_size = 8

            [train]
            training_method = "reorder_beam"
            training_iterations = 12
            l2_reg = 0.001
            "#,
        )
        .unwrap();
        assert!(!options.compound_unaries);
        assert_eq!(options.beam_size, 8);
        assert_eq!(options.train.training_method, TrainingMethod::ReorderBeam);
        assert_eq!(options.train.training_iterations, 12);
        assert_eq!(options.train.batch_size, 1);
    }

    #[test]
    fn test_from_toml_rejects_bad_values() {
        let result = ParserOptions::from_toml_str("beam_size = 0");
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));

        let result = ParserOptions::from_toml_str("[train]\ntraining_method = \"SGD\"");
        assert!(matches!(result, Err(EngineError::ConfigParse(_))));
    }

    #[test]
    fn test_toml_roundtrip_keeps_method_name() {
        let options = ParserOptions::builder()
            .training_method(TrainingMethod::ReorderOracle)
            .build()
            .unwrap();
        let text = options.to_toml_string().unwrap();
        assert!(text.contains("REORDER_ORACLE"));
        assert_eq!(ParserOptions::from_toml_str(&text).unwrap(), options);
    }

    #[test]
    fn test_retrains() {
        let mut train = TrainOptions::default();
        assert!(!train.retrains());
        train.feature_frequency_cutoff = 3;
        assert!(train.retrains());
        train.retrain_after_cutoff = false;
        assert!(!train.retrains());
        train.retrain_shards = 2;
        assert!(train.retrains());
    }
}
