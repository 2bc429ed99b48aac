//! Training module for MEMM taggers
//!
//! This module contains the cached training context, the regularized
//! objective and the L-BFGS driver that turns a tagged corpus into a
//! [`Model`](crate::Model).

mod context;
mod trainer;

pub(crate) use self::context::logsumexp;

// Re-export public types
pub use self::context::TrainingContext;
pub use self::trainer::{
    IterationRecord, LbfgsParams, LineSearchAlgorithm, Trainer, TrainerConfig, TrainingReport,
    WeightInit,
};
