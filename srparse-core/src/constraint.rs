//! Bracketing constraints honoured by every legality check

use std::fmt;

use regex::Regex;

use crate::error::{CoreError, Result};
use crate::tree::{Span, Tree};

/// Requires a constituent over tokens `[start, end)` whose label matches
/// `pattern` in full
#[derive(Debug, Clone)]
pub struct ParserConstraint {
    start: usize,
    end: usize,
    pattern: Regex,
    source: String,
}

impl ParserConstraint {
    /// Creates a constraint; `end` is exclusive
    pub fn new(start: usize, end: usize, pattern: &str) -> Result<Self> {
        if start >= end {
            return Err(CoreError::InvalidConstraint {
                start,
                end,
                reason: "span is empty".to_string(),
            });
        }
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
            CoreError::InvalidConstraint {
                start,
                end,
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            start,
            end,
            pattern: anchored,
            source: pattern.to_string(),
        })
    }

    /// First covered token
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last covered token
    pub fn end(&self) -> usize {
        self.end
    }

    /// Last covered token
    pub fn last(&self) -> usize {
        self.end - 1
    }

    /// Pattern as given
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Full-match test against a label
    pub fn matches_label(&self, label: &str) -> bool {
        self.pattern.is_match(label)
    }

    /// True if `span` is exactly the constrained span
    pub fn covers_exactly(&self, span: Span) -> bool {
        span.left == self.start && span.right == self.last()
    }

    /// True if `span` partially overlaps the constrained span
    pub fn crosses(&self, span: Span) -> bool {
        let last = self.last();
        (span.left < self.start && self.start <= span.right && span.right < last)
            || (self.start < span.left && span.left <= last && last < span.right)
    }

    /// True if `tree` spans the constraint and some node of its unary
    /// chain carries a matching, non-temporary label
    pub fn is_satisfied_by(&self, tree: &Tree) -> bool {
        self.covers_exactly(tree.span())
            && tree
                .unary_chain()
                .any(|node| !node.is_temporary() && self.matches_label(node.label()))
    }
}

impl fmt::Display for ParserConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) ~ {}", self.start, self.end, self.source)
    }
}
