//! Dev-set scoring used for early stopping and model selection

use rustc_hash::FxHashMap;
use srparse_core::{Span, Tree};

use crate::decoder::BeamDecoder;
use crate::error::{EngineError, Result};
use crate::model::PerceptronModel;

/// Scores a candidate model; higher is better
pub trait Evaluator: Send + Sync {
    /// Scalar score for `model`
    fn evaluate(&self, model: &PerceptronModel) -> Result<f64>;
}

impl<F> Evaluator for F
where
    F: Fn(&PerceptronModel) -> Result<f64> + Send + Sync,
{
    fn evaluate(&self, model: &PerceptronModel) -> Result<f64> {
        self(model)
    }
}

/// Labeled bracket counts for one or more sentences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketCounts {
    /// Brackets in both gold and guess
    pub matched: usize,
    /// Brackets in the gold trees
    pub gold: usize,
    /// Brackets in the guessed trees
    pub guessed: usize,
}

impl BracketCounts {
    /// Compares one guess against its gold tree; `None` counts as an empty guess
    pub fn compare(gold: &Tree, guess: Option<&Tree>) -> Self {
        let gold_brackets = brackets(gold);
        let mut remaining = gold_brackets.clone();
        let mut counts = BracketCounts {
            gold: gold_brackets.values().sum(),
            ..BracketCounts::default()
        };
        if let Some(guess) = guess {
            for (bracket, count) in brackets(guess) {
                counts.guessed += count;
                if let Some(available) = remaining.get_mut(&bracket) {
                    let matched = count.min(*available);
                    *available -= matched;
                    counts.matched += matched;
                }
            }
        }
        counts
    }

    /// Adds `other` into these counts
    pub fn add(&mut self, other: BracketCounts) {
        self.matched += other.matched;
        self.gold += other.gold;
        self.guessed += other.guessed;
    }

    /// Labeled precision
    pub fn precision(&self) -> f64 {
        ratio(self.matched, self.guessed)
    }

    /// Labeled recall
    pub fn recall(&self) -> f64 {
        ratio(self.matched, self.gold)
    }

    /// Harmonic mean of precision and recall
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// Temporary nodes and preterminals are not constituents of the original tree
fn brackets(tree: &Tree) -> FxHashMap<(String, Span), usize> {
    let mut brackets = FxHashMap::default();
    for node in tree.nodes() {
        if node.is_preterminal() || node.is_temporary() {
            continue;
        }
        *brackets
            .entry((node.label().to_string(), node.span()))
            .or_insert(0) += 1;
    }
    brackets
}

/// Labeled bracket F1 of beam decoding over held-out gold trees
#[derive(Debug, Clone)]
pub struct LabeledBracketEvaluator {
    trees: Vec<Tree>,
    beam_size: usize,
}

impl LabeledBracketEvaluator {
    /// Evaluates against `trees` with the given beam width
    pub fn new(trees: Vec<Tree>, beam_size: usize) -> Self {
        Self { trees, beam_size }
    }

    /// Bracket counts summed over every dev tree
    pub fn counts(&self, model: &PerceptronModel) -> Result<BracketCounts> {
        let decoder = BeamDecoder::new(model, self.beam_size);
        let mut total = BracketCounts::default();
        for tree in &self.trees {
            let outcome = decoder.parse(&tree.tagged_yield())?;
            total.add(BracketCounts::compare(tree, outcome.tree()));
        }
        Ok(total)
    }
}

impl Evaluator for LabeledBracketEvaluator {
    fn evaluate(&self, model: &PerceptronModel) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(EngineError::Evaluation {
                reason: "no dev trees to evaluate on".to_string(),
            });
        }
        Ok(self.counts(model)?.f1())
    }
}
