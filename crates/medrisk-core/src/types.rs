//! Domain types shared between the trainer, the inference engine, and callers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One employee's clinical/administrative attributes, as handed over by the
/// transport layer for a single prediction.
///
/// Token fields are sets: duplicates collapse and iteration order is
/// deterministic. Constructed per request, immutable, discarded after
/// encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskInput {
    pub employee_id: String,
    pub visit_frequency: u32,
    /// Medical-leave days.
    pub mc_days: u32,
    pub conditions: BTreeSet<String>,
    pub drug_pattern: BTreeSet<String>,
    pub lab_flags: BTreeSet<String>,
}

/// The four independent binary outcomes scored by the ensemble.
///
/// [`RiskLabel::ALL`] fixes the order used everywhere: ensemble layout,
/// training label columns, and prediction fields. Never reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    Diabetes,
    Hypertension,
    HighClaim,
    HighAbsenteeism,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; 4] = [
        RiskLabel::Diabetes,
        RiskLabel::Hypertension,
        RiskLabel::HighClaim,
        RiskLabel::HighAbsenteeism,
    ];

    /// Ground-truth column name in the historical training table.
    pub fn label_column(&self) -> &'static str {
        match self {
            Self::Diabetes => "diabetes_risk_label",
            Self::Hypertension => "hypertension_risk_label",
            Self::HighClaim => "high_claim_risk_label",
            Self::HighAbsenteeism => "high_absenteeism_risk_label",
        }
    }

    /// Score field name in the prediction handed to callers.
    pub fn score_field(&self) -> &'static str {
        match self {
            Self::Diabetes => "diabetes_risk",
            Self::Hypertension => "hypertension_risk",
            Self::HighClaim => "high_claim_risk",
            Self::HighAbsenteeism => "high_absenteeism_risk",
        }
    }
}

/// Four risk scores in [0, 100], rounded to 2 decimal places.
///
/// Produced per request by the inference engine; persistence of the
/// (input, prediction) pair is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub diabetes_risk: f64,
    pub hypertension_risk: f64,
    pub high_claim_risk: f64,
    pub high_absenteeism_risk: f64,
}

impl RiskPrediction {
    /// The degraded-mode prediction: all four scores zero.
    pub const ZERO: RiskPrediction = RiskPrediction {
        diabetes_risk: 0.0,
        hypertension_risk: 0.0,
        high_claim_risk: 0.0,
        high_absenteeism_risk: 0.0,
    };

    /// Build a prediction from scores given in [`RiskLabel::ALL`] order.
    pub fn from_scores(scores: [f64; 4]) -> Self {
        Self {
            diabetes_risk: scores[0],
            hypertension_risk: scores[1],
            high_claim_risk: scores[2],
            high_absenteeism_risk: scores[3],
        }
    }

    pub fn score(&self, label: RiskLabel) -> f64 {
        match label {
            RiskLabel::Diabetes => self.diabetes_risk,
            RiskLabel::Hypertension => self.hypertension_risk,
            RiskLabel::HighClaim => self.high_claim_risk,
            RiskLabel::HighAbsenteeism => self.high_absenteeism_risk,
        }
    }

    /// Scores in [`RiskLabel::ALL`] order.
    pub fn scores(&self) -> [f64; 4] {
        [
            self.diabetes_risk,
            self.hypertension_risk,
            self.high_claim_risk,
            self.high_absenteeism_risk,
        ]
    }
}

/// One historical row: input attributes plus four binary ground-truth labels
/// in [`RiskLabel::ALL`] order.
#[derive(Debug, Clone)]
pub struct TrainingRecord {
    pub input: RiskInput,
    pub labels: [bool; 4],
}

impl TrainingRecord {
    pub fn label(&self, label: RiskLabel) -> bool {
        let idx = match label {
            RiskLabel::Diabetes => 0,
            RiskLabel::Hypertension => 1,
            RiskLabel::HighClaim => 2,
            RiskLabel::HighAbsenteeism => 3,
        };
        self.labels[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_order_is_fixed() {
        let names: Vec<&str> = RiskLabel::ALL.iter().map(|l| l.score_field()).collect();
        assert_eq!(
            names,
            vec![
                "diabetes_risk",
                "hypertension_risk",
                "high_claim_risk",
                "high_absenteeism_risk"
            ]
        );
    }

    #[test]
    fn zero_prediction_is_all_zero() {
        for label in RiskLabel::ALL {
            assert_eq!(RiskPrediction::ZERO.score(label), 0.0);
        }
    }

    #[test]
    fn from_scores_round_trips_order() {
        let pred = RiskPrediction::from_scores([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(pred.scores(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(pred.score(RiskLabel::HighClaim), 3.0);
    }

    #[test]
    fn input_token_sets_collapse_duplicates() {
        let input: RiskInput = serde_json::from_str(
            r#"{
                "employee_id": "E-1",
                "visit_frequency": 2,
                "mc_days": 0,
                "conditions": ["asthma", "asthma"],
                "drug_pattern": [],
                "lab_flags": []
            }"#,
        )
        .unwrap();
        assert_eq!(input.conditions.len(), 1);
    }
}
