//! The feature-encoding contract shared by training and inference.
//!
//! Raw inputs carry variable-length categorical token sets; models consume a
//! fixed-width numeric vector. The bridge is a canonical ordered column list
//! fixed at training time: two numeric columns first, then one indicator
//! column `<kind>::<token>` per categorical token seen in the historical
//! data. Both the trainer and the engine expand tokens through the one
//! routine in this module and reindex against the same persisted
//! [`FeatureSchema`]. There must never be a second implementation of the
//! expansion.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::RiskInput;

/// Numeric feature columns, always first in the schema, in this order.
pub const NUMERIC_COLUMNS: [&str; 2] = ["visit_frequency", "mc_days"];

/// Categorical field kinds, in canonical schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Condition,
    Drug,
    Lab,
}

impl TokenKind {
    pub const ALL: [TokenKind; 3] = [TokenKind::Condition, TokenKind::Drug, TokenKind::Lab];

    /// Column-name prefix for indicator columns of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Condition => "condition",
            Self::Drug => "drug",
            Self::Lab => "lab",
        }
    }
}

/// Indicator column name for one categorical token: `<kind>::<token>`.
pub fn indicator_column(kind: TokenKind, token: &str) -> String {
    format!("{}::{}", kind.prefix(), token)
}

impl RiskInput {
    /// Expand this input into a sparse column→value mapping.
    ///
    /// Numeric fields appear under their own names; each present token
    /// contributes a `1.0` entry under its indicator column. Absent tokens
    /// contribute nothing. No filtering happens here; restricting to the
    /// canonical column list is [`FeatureSchema::encode`]'s job.
    pub fn feature_map(&self) -> BTreeMap<String, f64> {
        let mut features = BTreeMap::new();
        features.insert(NUMERIC_COLUMNS[0].to_string(), f64::from(self.visit_frequency));
        features.insert(NUMERIC_COLUMNS[1].to_string(), f64::from(self.mc_days));

        for (kind, tokens) in [
            (TokenKind::Condition, &self.conditions),
            (TokenKind::Drug, &self.drug_pattern),
            (TokenKind::Lab, &self.lab_flags),
        ] {
            for token in tokens {
                features.insert(indicator_column(kind, token), 1.0);
            }
        }

        features
    }
}

/// The canonical ordered feature-column list a trained ensemble expects.
///
/// Fixed at training time, persisted verbatim, never re-sorted at inference
/// time. Column positions are precomputed so per-request reindexing is a
/// lookup, not a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from an explicit ordered column list.
    pub fn new(columns: Vec<String>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self { columns, index }
    }

    /// Derive the canonical schema from the full historical token universe:
    /// numeric columns first, then indicator columns grouped by kind in
    /// [`TokenKind::ALL`] order, lexicographic within each kind.
    pub fn from_token_universe(
        conditions: &BTreeSet<String>,
        drugs: &BTreeSet<String>,
        labs: &BTreeSet<String>,
    ) -> Self {
        let mut columns: Vec<String> =
            NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        for (kind, tokens) in [
            (TokenKind::Condition, conditions),
            (TokenKind::Drug, drugs),
            (TokenKind::Lab, labs),
        ] {
            columns.extend(tokens.iter().map(|t| indicator_column(kind, t)));
        }
        Self::new(columns)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Reindex a sparse feature mapping into a dense schema-order vector.
    ///
    /// For each schema column the mapping's value is taken if present, else
    /// 0.0. Mapping keys not in the schema are silently discarded: a token
    /// never seen at training time contributes no signal, not an error.
    pub fn encode(&self, features: &BTreeMap<String, f64>) -> Vec<f64> {
        self.columns
            .iter()
            .map(|col| features.get(col).copied().unwrap_or(0.0))
            .collect()
    }
}

impl From<Vec<String>> for FeatureSchema {
    fn from(columns: Vec<String>) -> Self {
        Self::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Vec<String> {
        schema.columns
    }
}
