//! Transition system for shift-reduce constituency parsing
//!
//! This crate holds the domain layer of the parser: immutable parse states,
//! the closed set of transitions over them, the oracles that say which
//! transition leads back towards a gold tree, and the sparse weights a
//! perceptron scores transitions with.
//!
//! # Architecture
//!
//! - **Trees and states**: [`Tree`] and [`State`] are immutable and share
//!   structure through reference counting, so a beam can hold many states
//!   over one sentence cheaply.
//! - **Transitions**: [`Transition`] decides its own legality and builds
//!   the successor state.
//! - **Oracles**: [`Oracle`] answers "what is correct from here" for any
//!   state, while [`ReorderingOracle`] repairs a gold sequence after a
//!   mistake.
//! - **Weights**: [`WeightMap`] maps feature names to per-transition
//!   weights.
//!
//! Training and decoding live in the `srparse-engine` crate.
//!
//! # Example
//!
//! ```rust
//! use srparse_core::{create_transition_sequence, find_root_only_states, find_root_states};
//! use srparse_core::{verify_transitions, Tree};
//!
//! let tree = Tree::from_bracketed("(S^L (NN cats) (VB sleep))").unwrap();
//! let trees = vec![tree.clone()];
//! let transitions = create_transition_sequence(
//!     &tree,
//!     false,
//!     &find_root_states(&trees),
//!     &find_root_only_states(&trees),
//! );
//!
//! let state = verify_transitions(&tree, &transitions).unwrap();
//! assert!(state.is_finished());
//! assert_eq!(state.tree(), Some(&tree));
//! ```

#![warn(missing_docs)]

pub mod constraint;
pub mod error;
pub mod index;
pub mod labels;
pub mod oracle;
pub mod reorder;
pub mod sequence;
pub mod stack;
pub mod state;
pub mod transition;
pub mod tree;
pub mod weight;

pub use constraint::ParserConstraint;
pub use error::{CoreError, Result};
pub use index::TransitionIndex;
pub use labels::{find_known_states, find_root_only_states, find_root_states, LabelSet};
pub use oracle::{Oracle, OracleTransition};
pub use reorder::ReorderingOracle;
pub use sequence::{
    create_training_examples, create_transition_sequence, replay, verify_transitions,
    TrainingExample,
};
pub use stack::Stack;
pub use state::State;
pub use transition::{find_emergency_transition, BinaryTransition, Transition, MAX_UNARY_DEPTH};
pub use tree::{Label, Side, Span, TaggedWord, Tree};
pub use weight::{Weight, WeightMap};
