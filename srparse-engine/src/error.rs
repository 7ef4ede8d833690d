//! Engine error types

use srparse_core::CoreError;
use thiserror::Error;

/// Engine-level errors (application layer)
#[derive(Error, Debug)]
pub enum EngineError {
    /// Error raised by the transition system
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Options failed validation
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the options
        reason: String,
    },

    /// Options text is not valid TOML for the expected layout
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Options could not be written as TOML
    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// I/O error while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The training worker pool could not be built
    #[error("failed to build worker pool")]
    ThreadPool {
        /// Underlying pool error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Model averaging was asked to average nothing
    #[error("cannot average an empty set of models")]
    EmptyModelSet,

    /// A transition index outside the model's transition set
    #[error("unknown transition index {index} (model has {len})")]
    UnknownTransition {
        /// Requested index
        index: usize,
        /// Number of transitions in the model
        len: usize,
    },

    /// The dev-set evaluator failed
    #[error("evaluation failed: {reason}")]
    Evaluation {
        /// Evaluator message
        reason: String,
    },

    /// Decoding was cancelled through the interrupt flag
    #[error("decoding interrupted")]
    Interrupted,
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
