//! Operator-facing output for training reports, predictions, and schemas.

use medrisk_ai::TrainReport;
use medrisk_core::{FeatureSchema, RiskInput, RiskLabel, RiskPrediction};

/// Training summary, one line per fact.
pub fn print_report(report: &TrainReport) {
    println!("Trained risk ensemble");
    println!("  rows:             {}", report.rows);
    println!("  train rows:       {}", report.train_rows);
    println!("  validation rows:  {}", report.validation_rows);
    println!("  feature columns:  {}", report.feature_count);
    for (label, accuracy) in RiskLabel::ALL.into_iter().zip(report.label_accuracy) {
        println!("  {:<17} {:.4}", format!("{}:", label.score_field()), accuracy);
    }
    println!("  validation score: {:.4}", report.validation_score);
}

/// Prediction in the caller-facing wire shape: employee id echoed back plus
/// the four scores.
pub fn print_prediction(
    input: &RiskInput,
    prediction: &RiskPrediction,
) -> anyhow::Result<()> {
    let doc = serde_json::json!({
        "employee_id": input.employee_id,
        "diabetes_risk": prediction.diabetes_risk,
        "hypertension_risk": prediction.hypertension_risk,
        "high_claim_risk": prediction.high_claim_risk,
        "high_absenteeism_risk": prediction.high_absenteeism_risk,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

/// The persisted column list with positions.
pub fn print_schema(schema: &FeatureSchema) {
    println!("Feature schema ({} columns)", schema.len());
    for (position, column) in schema.columns().iter().enumerate() {
        println!("  {position:>4}  {column}");
    }
}
