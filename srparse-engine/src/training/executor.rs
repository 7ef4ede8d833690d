//! Batch executors
//!
//! An executor scores one batch of examples against fixed weights and
//! returns the per-example results in batch order. Weight updates are
//! applied afterwards by the trainer, so the outcome never depends on the
//! number of threads.

use srparse_core::TrainingExample;

use super::strategies::{TrainingContext, TrainingStrategy};
use super::TrainingResult;
use crate::error::Result;

#[cfg(feature = "parallel")]
use crate::error::EngineError;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One unit of training work: an example and its tree's position in the
/// oracle
pub type BatchItem = (usize, TrainingExample);

/// Execution mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Single-threaded
    Sequential,
    /// Rayon worker pool
    Parallel,
}

/// Scores a batch of examples
pub trait BatchExecutor: Send + Sync {
    /// Runs `strategy` on every item, returning results in item order
    fn run(
        &self,
        strategy: &dyn TrainingStrategy,
        context: &TrainingContext<'_>,
        batch: &[BatchItem],
    ) -> Result<Vec<TrainingResult>>;

    /// Get the execution mode
    fn mode(&self) -> ExecutionMode;
}

/// Runs examples one after another on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl BatchExecutor for SequentialExecutor {
    fn run(
        &self,
        strategy: &dyn TrainingStrategy,
        context: &TrainingContext<'_>,
        batch: &[BatchItem],
    ) -> Result<Vec<TrainingResult>> {
        batch
            .iter()
            .map(|(tree_index, example)| strategy.train_example(context, *tree_index, example))
            .collect()
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Sequential
    }
}

/// Runs examples on a dedicated rayon pool
#[cfg(feature = "parallel")]
#[derive(Debug)]
pub struct ParallelExecutor {
    pool: rayon::ThreadPool,
}

#[cfg(feature = "parallel")]
impl ParallelExecutor {
    /// Builds a pool with `threads` workers
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| EngineError::ThreadPool {
                source: Box::new(e),
            })?;
        Ok(Self { pool })
    }

    /// Number of workers
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(feature = "parallel")]
impl BatchExecutor for ParallelExecutor {
    fn run(
        &self,
        strategy: &dyn TrainingStrategy,
        context: &TrainingContext<'_>,
        batch: &[BatchItem],
    ) -> Result<Vec<TrainingResult>> {
        self.pool.install(|| {
            batch
                .par_iter()
                .map(|(tree_index, example)| strategy.train_example(context, *tree_index, example))
                .collect::<Result<Vec<_>>>()
        })
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Parallel
    }
}

/// Executor for `threads` workers: sequential for one thread
#[cfg(feature = "parallel")]
pub fn executor_for(threads: usize) -> Result<Box<dyn BatchExecutor>> {
    if threads > 1 {
        Ok(Box::new(ParallelExecutor::new(threads)?))
    } else {
        Ok(Box::new(SequentialExecutor))
    }
}

/// Executor for `threads` workers: always sequential without the
/// `parallel` feature
#[cfg(not(feature = "parallel"))]
pub fn executor_for(_threads: usize) -> Result<Box<dyn BatchExecutor>> {
    Ok(Box::new(SequentialExecutor))
}
