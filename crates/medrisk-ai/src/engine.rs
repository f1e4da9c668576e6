//! The load-once inference engine.
//!
//! Artifacts are read exactly once, at construction; after that `predict` is
//! a pure function over immutable state: no locking, no I/O, and safe to
//! call from any number of threads.
//!
//! # Fail-open degraded mode
//!
//! If either artifact is missing, unreadable, or the pair is inconsistent,
//! the engine enters a terminal degraded state in which every prediction is
//! all-zero and no error is raised. This is an availability-over-correctness
//! tradeoff: zero scores can mask a genuinely broken deployment, so
//! operators must watch the load-time warning, because the request path
//! will not tell them.

use tracing::{info, warn};

use medrisk_core::{FeatureSchema, RiskInput, RiskPrediction};
use medrisk_store::ArtifactSet;

use crate::RiskEnsemble;

/// Risk scoring engine over one loaded (ensemble, schema) pair.
pub struct RiskEngine {
    state: EngineState,
}

enum EngineState {
    Ready(Box<LoadedPair>),
    Degraded,
}

struct LoadedPair {
    ensemble: RiskEnsemble,
    schema: FeatureSchema,
}

impl RiskEngine {
    /// Load the artifact pair. Infallible: any load failure yields a
    /// degraded engine, never an error.
    ///
    /// Degradation is terminal for this instance. Adopting a retrained pair
    /// means constructing a fresh engine and swapping the handle wholesale,
    /// so the ensemble and schema are always replaced together.
    pub fn load(artifacts: &ArtifactSet) -> Self {
        match Self::try_load(artifacts) {
            Ok(pair) => {
                info!(
                    features = pair.schema.len(),
                    dir = %artifacts.dir().display(),
                    "loaded risk model artifacts"
                );
                Self {
                    state: EngineState::Ready(Box::new(pair)),
                }
            }
            Err(error) => {
                warn!(
                    %error,
                    dir = %artifacts.dir().display(),
                    "risk model artifacts unavailable, serving zero scores"
                );
                Self::degraded()
            }
        }
    }

    /// Build an engine directly from an in-memory pair, applying the same
    /// consistency checks as [`load`](Self::load).
    pub fn from_pair(ensemble: RiskEnsemble, schema: FeatureSchema) -> Self {
        match checked_pair(ensemble, schema) {
            Ok(pair) => Self {
                state: EngineState::Ready(Box::new(pair)),
            },
            Err(error) => {
                warn!(%error, "inconsistent model pair, serving zero scores");
                Self::degraded()
            }
        }
    }

    /// An engine with no model: every prediction is all-zero.
    pub fn degraded() -> Self {
        Self {
            state: EngineState::Degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.state, EngineState::Degraded)
    }

    /// The loaded column schema, if any.
    pub fn schema(&self) -> Option<&FeatureSchema> {
        match &self.state {
            EngineState::Ready(pair) => Some(&pair.schema),
            EngineState::Degraded => None,
        }
    }

    /// Score one input. Never fails and never panics.
    ///
    /// The input's token sets are expanded through the shared encoding rule,
    /// reindexed strictly against the loaded schema (zero for absent
    /// columns, unknown tokens silently dropped), and passed through the
    /// ensemble. Scores are probabilities × 100, rounded to 2 decimals, in
    /// fixed label order.
    pub fn predict(&self, input: &RiskInput) -> RiskPrediction {
        let EngineState::Ready(pair) = &self.state else {
            return RiskPrediction::ZERO;
        };

        let vector = pair.schema.encode(&input.feature_map());
        let probs = pair.ensemble.predict_proba(&vector);
        RiskPrediction::from_scores(probs.map(|p| round2(p * 100.0)))
    }
}

impl RiskEngine {
    fn try_load(artifacts: &ArtifactSet) -> anyhow::Result<LoadedPair> {
        let schema = artifacts.read_schema()?;
        let ensemble: RiskEnsemble = artifacts.read_ensemble()?;
        checked_pair(ensemble, schema)
    }
}

/// The matched-pair invariant: a valid ensemble whose feature width equals
/// the schema length. A stale or torn pair must never be consulted.
fn checked_pair(ensemble: RiskEnsemble, schema: FeatureSchema) -> anyhow::Result<LoadedPair> {
    anyhow::ensure!(ensemble.is_valid(), "ensemble labels or widths inconsistent");
    anyhow::ensure!(
        ensemble.n_features() == schema.len(),
        "ensemble expects {} features but schema has {} columns",
        ensemble.n_features(),
        schema.len()
    );
    Ok(LoadedPair { ensemble, schema })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use medrisk_core::{RiskLabel, TrainingRecord};
    use medrisk_store::ArtifactSet;

    use crate::{LogisticModel, train_records};

    fn tokens(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn input(visit: u32, mc: u32, cond: &[&str], drug: &[&str], lab: &[&str]) -> RiskInput {
        RiskInput {
            employee_id: "E-1".to_string(),
            visit_frequency: visit,
            mc_days: mc,
            conditions: tokens(cond),
            drug_pattern: tokens(drug),
            lab_flags: tokens(lab),
        }
    }

    fn trained_dataset() -> Vec<TrainingRecord> {
        (0..20)
            .map(|i| {
                let diabetic = i % 2 == 0;
                TrainingRecord {
                    input: RiskInput {
                        employee_id: format!("E-{i}"),
                        visit_frequency: if diabetic { 8 } else { 1 },
                        mc_days: if i % 4 == 0 { 12 } else { 1 },
                        conditions: tokens(if diabetic {
                            &["diabetes_type2"]
                        } else {
                            &["hypertension"]
                        }),
                        drug_pattern: tokens(if diabetic { &["metformin"][..] } else { &[][..] }),
                        lab_flags: tokens(if diabetic { &["hba1c_high"][..] } else { &[][..] }),
                    },
                    labels: [diabetic, !diabetic, diabetic, i % 4 == 0],
                }
            })
            .collect()
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RiskEngine>();
    }

    #[test]
    fn missing_artifacts_degrade_without_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = RiskEngine::load(&ArtifactSet::new(tmp.path()));

        assert!(engine.is_degraded());
        let pred = engine.predict(&input(9, 9, &["anything"], &["anything"], &["anything"]));
        assert_eq!(pred, RiskPrediction::ZERO);
    }

    #[test]
    fn torn_pair_degrades() {
        let tmp = tempfile::TempDir::new().unwrap();
        let artifacts = ArtifactSet::new(tmp.path());
        artifacts
            .write_schema(&FeatureSchema::new(vec!["visit_frequency".to_string()]))
            .unwrap();

        // Schema present, ensemble missing.
        assert!(RiskEngine::load(&artifacts).is_degraded());
    }

    #[test]
    fn width_mismatched_pair_degrades() {
        let models: Vec<_> = RiskLabel::ALL
            .into_iter()
            .map(|label| {
                (
                    label,
                    LogisticModel {
                        weights: vec![0.0; 3],
                        bias: 0.0,
                    },
                )
            })
            .collect();
        let ensemble = RiskEnsemble::new(models).unwrap();
        let schema = FeatureSchema::new(vec![
            "visit_frequency".to_string(),
            "mc_days".to_string(),
        ]);

        let engine = RiskEngine::from_pair(ensemble, schema);
        assert!(engine.is_degraded());
        assert_eq!(engine.predict(&input(1, 1, &[], &[], &[])), RiskPrediction::ZERO);
    }

    #[test]
    fn trained_pair_loads_and_scores_in_range() {
        let tmp = tempfile::TempDir::new().unwrap();
        let artifacts = ArtifactSet::new(tmp.path());
        train_records(&trained_dataset(), &artifacts).unwrap();

        let engine = RiskEngine::load(&artifacts);
        assert!(!engine.is_degraded());

        for record in trained_dataset() {
            let pred = engine.predict(&record.input);
            for label in RiskLabel::ALL {
                let score = pred.score(label);
                assert!((0.0..=100.0).contains(&score), "{label:?} -> {score}");
                // Rounded to 2 decimal places.
                assert!((score * 100.0 - (score * 100.0).round()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn diabetic_profile_scores_higher_than_clean_profile() {
        let tmp = tempfile::TempDir::new().unwrap();
        let artifacts = ArtifactSet::new(tmp.path());
        train_records(&trained_dataset(), &artifacts).unwrap();
        let engine = RiskEngine::load(&artifacts);

        let diabetic = engine.predict(&input(
            8,
            1,
            &["diabetes_type2"],
            &["metformin"],
            &["hba1c_high"],
        ));
        let clean = engine.predict(&input(1, 1, &["hypertension"], &[], &[]));

        assert!(diabetic.diabetes_risk > clean.diabetes_risk);
        assert!(clean.hypertension_risk > diabetic.hypertension_risk);
    }

    #[test]
    fn unknown_tokens_do_not_change_the_prediction() {
        let tmp = tempfile::TempDir::new().unwrap();
        let artifacts = ArtifactSet::new(tmp.path());
        train_records(&trained_dataset(), &artifacts).unwrap();
        let engine = RiskEngine::load(&artifacts);

        let base = input(8, 1, &["diabetes_type2"], &["metformin"], &[]);
        let mut noisy = base.clone();
        noisy.conditions.insert("never_seen_condition".to_string());
        noisy.drug_pattern.insert("novel_drug".to_string());
        noisy.lab_flags.insert("novel_flag".to_string());

        assert_eq!(engine.predict(&base), engine.predict(&noisy));
    }

    #[test]
    fn empty_categorical_sets_still_score() {
        let tmp = tempfile::TempDir::new().unwrap();
        let artifacts = ArtifactSet::new(tmp.path());
        train_records(&trained_dataset(), &artifacts).unwrap();
        let engine = RiskEngine::load(&artifacts);

        let pred = engine.predict(&input(3, 2, &[], &[], &[]));
        for label in RiskLabel::ALL {
            assert!((0.0..=100.0).contains(&pred.score(label)));
        }
    }

    #[test]
    fn reloaded_pair_reproduces_trainer_probabilities() {
        let tmp = tempfile::TempDir::new().unwrap();
        let artifacts = ArtifactSet::new(tmp.path());
        let data = trained_dataset();
        train_records(&data, &artifacts).unwrap();

        // Recompute what the trainer's own ensemble would say...
        let ensemble: RiskEnsemble = artifacts.read_ensemble().unwrap();
        let schema = artifacts.read_schema().unwrap();
        let engine = RiskEngine::load(&artifacts);

        // ...and check the engine agrees to the 2-decimal contract.
        for record in &data {
            let vector = schema.encode(&record.input.feature_map());
            let expected = ensemble.predict_proba(&vector);
            let pred = engine.predict(&record.input);
            for (label, raw) in RiskLabel::ALL.into_iter().zip(expected) {
                let rounded = (raw * 100.0 * 100.0).round() / 100.0;
                assert!((pred.score(label) - rounded).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn prediction_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let artifacts = ArtifactSet::new(tmp.path());
        train_records(&trained_dataset(), &artifacts).unwrap();
        let engine = RiskEngine::load(&artifacts);

        let probe = input(5, 3, &["diabetes_type2"], &["metformin"], &[]);
        assert_eq!(engine.predict(&probe), engine.predict(&probe));
    }
}
