//! Error types for the parser domain layer

use thiserror::Error;

/// Errors raised by tree construction, transition replay and oracles
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Bracketed tree text could not be read
    #[error("malformed tree at offset {offset}: {reason}")]
    MalformedTree {
        /// Byte offset of the offending token
        offset: usize,
        /// What was wrong
        reason: String,
    },

    /// A node with more than two children was found
    #[error("tree is not binarized: node {label} has {children} children")]
    NotBinarized {
        /// Label of the offending node
        label: String,
        /// Number of children found
        children: usize,
    },

    /// A transition was applied to a state where it is not legal
    #[error("illegal transition {transition} at {state}")]
    IllegalTransition {
        /// Display form of the transition
        transition: String,
        /// Display form of the state
        state: String,
    },

    /// A gold sequence could not be replayed
    #[error("gold transition {transition} at position {position} is illegal")]
    InvalidSequence {
        /// Index of the first illegal transition
        position: usize,
        /// Display form of the transition
        transition: String,
    },

    /// Constraint span or pattern is unusable
    #[error("invalid constraint [{start}, {end}): {reason}")]
    InvalidConstraint {
        /// Inclusive start token
        start: usize,
        /// Exclusive end token
        end: usize,
        /// What was wrong
        reason: String,
    },

    /// Oracle was asked about a tree it does not hold
    #[error("no gold tree at index {index} (oracle holds {len})")]
    UnknownTree {
        /// Requested index
        index: usize,
        /// Number of trees held
        len: usize,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
