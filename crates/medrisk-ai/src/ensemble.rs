//! The four-model risk ensemble.

use serde::{Deserialize, Serialize};

use medrisk_core::RiskLabel;

use crate::LogisticModel;

/// Four independently trained binary classifiers, one per risk label, stored
/// in [`RiskLabel::ALL`] order.
///
/// The label tags are persisted with the models so a reloaded artifact can be
/// checked against the fixed label order instead of trusted blindly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEnsemble {
    models: Vec<LabelledModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LabelledModel {
    label: RiskLabel,
    model: LogisticModel,
}

impl RiskEnsemble {
    /// Assemble from per-label models given in [`RiskLabel::ALL`] order.
    ///
    /// Returns `None` if the order is wrong or the models disagree on
    /// feature width.
    pub fn new(models: Vec<(RiskLabel, LogisticModel)>) -> Option<Self> {
        let ensemble = Self {
            models: models
                .into_iter()
                .map(|(label, model)| LabelledModel { label, model })
                .collect(),
        };
        ensemble.is_valid().then_some(ensemble)
    }

    /// Label order and width consistency. Checked on assembly and again on
    /// every artifact reload.
    pub fn is_valid(&self) -> bool {
        if self.models.len() != RiskLabel::ALL.len() {
            return false;
        }
        let ordered = self
            .models
            .iter()
            .zip(RiskLabel::ALL)
            .all(|(m, expected)| m.label == expected);
        let width = self.n_features();
        ordered && self.models.iter().all(|m| m.model.n_features() == width)
    }

    /// Feature width the ensemble was fitted against.
    pub fn n_features(&self) -> usize {
        self.models.first().map(|m| m.model.n_features()).unwrap_or(0)
    }

    /// Per-label probability of class-positive, in [`RiskLabel::ALL`] order.
    pub fn predict_proba(&self, vector: &[f64]) -> [f64; 4] {
        let mut probs = [0.0; 4];
        for (slot, m) in probs.iter_mut().zip(&self.models) {
            *slot = m.model.predict_proba(vector);
        }
        probs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(weights: Vec<f64>) -> LogisticModel {
        LogisticModel { weights, bias: 0.0 }
    }

    fn full_set(width: usize) -> Vec<(RiskLabel, LogisticModel)> {
        RiskLabel::ALL
            .into_iter()
            .map(|label| (label, model(vec![0.0; width])))
            .collect()
    }

    #[test]
    fn assembles_in_label_order() {
        let ensemble = RiskEnsemble::new(full_set(3)).unwrap();
        assert!(ensemble.is_valid());
        assert_eq!(ensemble.n_features(), 3);
    }

    #[test]
    fn rejects_wrong_order() {
        let mut models = full_set(2);
        models.swap(0, 1);
        assert!(RiskEnsemble::new(models).is_none());
    }

    #[test]
    fn rejects_mismatched_widths() {
        let mut models = full_set(2);
        models[3].1 = model(vec![0.0; 5]);
        assert!(RiskEnsemble::new(models).is_none());
    }

    #[test]
    fn rejects_missing_labels() {
        let mut models = full_set(2);
        models.pop();
        assert!(RiskEnsemble::new(models).is_none());
    }

    #[test]
    fn predict_proba_follows_label_order() {
        let mut models = full_set(1);
        // Give the high_claim model a strongly positive weight; x=1 pushes
        // only that label's probability above one half.
        models[2].1 = LogisticModel {
            weights: vec![10.0],
            bias: 0.0,
        };
        let ensemble = RiskEnsemble::new(models).unwrap();

        let probs = ensemble.predict_proba(&[1.0]);
        assert!(probs[2] > 0.99);
        assert_eq!(probs[0], 0.5);
        assert_eq!(probs[1], 0.5);
        assert_eq!(probs[3], 0.5);
    }

    #[test]
    fn round_trips_through_json() {
        let ensemble = RiskEnsemble::new(full_set(2)).unwrap();
        let json = serde_json::to_string(&ensemble).unwrap();
        let back: RiskEnsemble = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ensemble);
        assert!(back.is_valid());
    }
}
