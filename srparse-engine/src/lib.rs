//! Perceptron training and beam decoding for shift-reduce parsing
//!
//! This crate provides the application layer on top of `srparse-core`:
//! options, feature extraction, the perceptron model, the training loop
//! with its strategies and executors, and the beam decoder.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use srparse_engine::{BasicFeatureFactory, ParserOptions, ShiftReduceParser, TrainingMethod};
//! use srparse_core::Tree;
//!
//! let trees = vec![Tree::from_bracketed("(S^L (NN cats) (VB sleep))").unwrap()];
//! let options = ParserOptions::builder()
//!     .training_method(TrainingMethod::Gold)
//!     .training_iterations(3)
//!     .build()
//!     .unwrap();
//!
//! let (parser, _) =
//!     ShiftReduceParser::train(options, &trees, Arc::new(BasicFeatureFactory), None).unwrap();
//! let outcome = parser.parse_tree(&trees[0]).unwrap();
//! assert!(outcome.is_parsed());
//! ```

#![warn(missing_docs)]

pub mod agenda;
pub mod config;
pub mod decoder;
pub mod error;
pub mod evaluator;
pub mod features;
pub mod model;
pub mod parser;
pub mod training;

// Re-export key types
pub use agenda::Agenda;
pub use config::{ParserOptions, ParserOptionsBuilder, TrainOptions, TrainingMethod};
pub use decoder::{BeamDecoder, ParseOutcome};
pub use error::{EngineError, Result};
pub use evaluator::{BracketCounts, Evaluator, LabeledBracketEvaluator};
pub use features::{BasicFeatureFactory, CombinationFeatureFactory, FeatureFactory};
pub use model::{ModelStats, PerceptronModel, ScoredTransition};
pub use parser::ShiftReduceParser;
pub use training::{ExecutionMode, Trainer, TrainingResult, TrainingSummary, Update};

// Re-export from core for convenience
pub use srparse_core::{ParserConstraint, State, TaggedWord, Transition, Tree};
