pub mod encoding;
pub mod types;

pub use encoding::{FeatureSchema, TokenKind, indicator_column};
pub use types::{RiskInput, RiskLabel, RiskPrediction, TrainingRecord};
