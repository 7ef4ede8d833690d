//! Training strategies, one per training method

pub mod beam;
pub mod dynamic_oracle;
pub mod greedy;
pub mod reorder_oracle;
pub mod traits;

pub use beam::BeamStrategy;
pub use dynamic_oracle::DynamicOracleStrategy;
pub use greedy::{EarlyTerminationStrategy, GoldStrategy};
pub use reorder_oracle::ReorderOracleStrategy;
pub use traits::{step_limit, TrainingContext, TrainingStrategy};

use crate::config::TrainingMethod;

/// Strategy implementing `method`
pub fn strategy_for(method: TrainingMethod) -> Box<dyn TrainingStrategy> {
    match method {
        TrainingMethod::Gold => Box::new(GoldStrategy),
        TrainingMethod::EarlyTermination => Box::new(EarlyTerminationStrategy),
        TrainingMethod::Oracle => Box::new(DynamicOracleStrategy),
        TrainingMethod::ReorderOracle => Box::new(ReorderOracleStrategy),
        TrainingMethod::Beam => Box::new(BeamStrategy::new()),
        TrainingMethod::ReorderBeam => Box::new(BeamStrategy::reordering()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_method_has_a_strategy() {
        for method in TrainingMethod::ALL {
            let strategy = strategy_for(method);
            assert_eq!(strategy.name().to_uppercase(), method.as_str());
        }
    }
}
