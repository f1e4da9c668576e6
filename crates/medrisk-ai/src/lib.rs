//! Learning layer: per-label logistic classifiers, the offline trainer that
//! produces the matched (ensemble, schema) artifact pair, and the load-once
//! inference engine.

mod engine;
mod ensemble;
mod logistic;
mod trainer;

pub use engine::RiskEngine;
pub use ensemble::RiskEnsemble;
pub use logistic::LogisticModel;
pub use trainer::{TrainError, TrainReport, train, train_records};
