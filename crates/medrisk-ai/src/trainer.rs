//! Offline training pipeline: historical records in, matched artifact pair
//! out.
//!
//! The canonical feature-column list is fixed here, once, from the full
//! historical token universe, and persisted verbatim next to the ensemble it
//! was used to fit. Inference never re-derives it.

use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use medrisk_core::{FeatureSchema, RiskLabel, TrainingRecord};
use medrisk_store::{ArtifactManifest, ArtifactSet, StoreError, read_training_csv};

use crate::{LogisticModel, RiskEnsemble};

const LEARNING_RATE: f64 = 0.05;
const EPOCHS: usize = 400;
/// Every fifth row goes to validation, a fixed and reproducible partition.
const VALIDATION_STRIDE: usize = 5;
const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("historical table missing required column: {0}")]
    Data(String),

    #[error("no usable rows remain after expansion")]
    EmptyDataset,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Training outcome, reported to the operator. Informational only; accuracy
/// is not a correctness gate.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub rows: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub feature_count: usize,
    /// Per-label validation accuracy, in [`RiskLabel::ALL`] order.
    pub label_accuracy: [f64; 4],
    /// Subset accuracy: fraction of validation rows where all four
    /// thresholded labels match the ground truth.
    pub validation_score: f64,
}

/// Train from a historical CSV and persist the artifact pair.
pub fn train(data_path: &Path, artifacts: &ArtifactSet) -> Result<TrainReport, TrainError> {
    let records = read_training_csv(data_path).map_err(|e| match e {
        StoreError::MissingColumn(column) => TrainError::Data(column),
        other => TrainError::Store(other),
    })?;
    train_records(&records, artifacts)
}

/// Train from already-ingested records and persist the artifact pair.
pub fn train_records(
    records: &[TrainingRecord],
    artifacts: &ArtifactSet,
) -> Result<TrainReport, TrainError> {
    if records.is_empty() {
        return Err(TrainError::EmptyDataset);
    }

    let schema = derive_schema(records);
    let encoded: Vec<Vec<f64>> = records
        .iter()
        .map(|r| schema.encode(&r.input.feature_map()))
        .collect();
    info!(
        rows = records.len(),
        features = schema.len(),
        "built feature table"
    );

    let (train_idx, validation_idx) = split_indices(records.len());

    let ensemble = fit_ensemble(records, &encoded, &train_idx)?;

    // Small datasets can leave the validation partition empty; score the
    // training rows instead so the report always carries a number.
    let score_idx: &[usize] = if validation_idx.is_empty() {
        &train_idx
    } else {
        &validation_idx
    };
    let (label_accuracy, validation_score) = score(&ensemble, records, &encoded, score_idx);

    artifacts.write_schema(&schema)?;
    artifacts.write_ensemble(&ensemble)?;
    artifacts.write_manifest(&ArtifactManifest::new(
        records.len(),
        schema.len(),
        validation_score,
    ))?;

    info!(
        rows = records.len(),
        features = schema.len(),
        validation_score,
        "trained risk ensemble"
    );

    Ok(TrainReport {
        rows: records.len(),
        train_rows: train_idx.len(),
        validation_rows: validation_idx.len(),
        feature_count: schema.len(),
        label_accuracy,
        validation_score,
    })
}

/// Canonical schema from the full token universe across all records.
fn derive_schema(records: &[TrainingRecord]) -> FeatureSchema {
    let mut conditions = BTreeSet::new();
    let mut drugs = BTreeSet::new();
    let mut labs = BTreeSet::new();
    for record in records {
        conditions.extend(record.input.conditions.iter().cloned());
        drugs.extend(record.input.drug_pattern.iter().cloned());
        labs.extend(record.input.lab_flags.iter().cloned());
    }
    FeatureSchema::from_token_universe(&conditions, &drugs, &labs)
}

fn split_indices(n: usize) -> (Vec<usize>, Vec<usize>) {
    (0..n).partition(|i| (i + 1) % VALIDATION_STRIDE != 0)
}

fn fit_ensemble(
    records: &[TrainingRecord],
    encoded: &[Vec<f64>],
    train_idx: &[usize],
) -> Result<RiskEnsemble, TrainError> {
    let rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| encoded[i].clone()).collect();

    let mut models = Vec::with_capacity(RiskLabel::ALL.len());
    for label in RiskLabel::ALL {
        let ys: Vec<bool> = train_idx.iter().map(|&i| records[i].label(label)).collect();
        let model = LogisticModel::fit(&rows, &ys, LEARNING_RATE, EPOCHS)
            .ok_or(TrainError::EmptyDataset)?;
        models.push((label, model));
    }

    // Models were just built in ALL order with one shared width.
    RiskEnsemble::new(models).ok_or(TrainError::EmptyDataset)
}

fn score(
    ensemble: &RiskEnsemble,
    records: &[TrainingRecord],
    encoded: &[Vec<f64>],
    idx: &[usize],
) -> ([f64; 4], f64) {
    let mut label_hits = [0usize; 4];
    let mut subset_hits = 0usize;

    for &i in idx {
        let probs = ensemble.predict_proba(&encoded[i]);
        let mut all_match = true;
        for (pos, &p) in probs.iter().enumerate() {
            let predicted = p >= DECISION_THRESHOLD;
            if predicted == records[i].labels[pos] {
                label_hits[pos] += 1;
            } else {
                all_match = false;
            }
        }
        if all_match {
            subset_hits += 1;
        }
    }

    let n = idx.len().max(1) as f64;
    let label_accuracy = label_hits.map(|hits| hits as f64 / n);
    (label_accuracy, subset_hits as f64 / n)
}
