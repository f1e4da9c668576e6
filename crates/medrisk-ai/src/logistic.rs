//! Multivariate logistic regression trained by batch gradient descent.
//!
//! Training is fully deterministic: zero-initialised weights, fixed learning
//! rate and epoch count, no sampling. The same rows always produce the same
//! model, which keeps retraining runs comparable.

use serde::{Deserialize, Serialize};

/// A fitted binary classifier: one weight per feature column plus a bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticModel {
    /// Fit by batch gradient descent on the cross-entropy loss.
    ///
    /// Returns `None` when the inputs cannot be fitted: empty data,
    /// mismatched row/label counts, ragged rows, a non-positive learning
    /// rate, or zero epochs.
    pub fn fit(rows: &[Vec<f64>], ys: &[bool], lr: f64, epochs: usize) -> Option<Self> {
        if rows.len() != ys.len() || rows.is_empty() {
            return None;
        }
        if !(lr > 0.0) || epochs == 0 {
            return None;
        }
        let dim = rows[0].len();
        if rows.iter().any(|row| row.len() != dim) {
            return None;
        }

        let n = rows.len() as f64;
        let mut weights = vec![0.0; dim];
        let mut bias = 0.0;

        for _ in 0..epochs {
            let mut grad_w = vec![0.0; dim];
            let mut grad_b = 0.0;

            for (row, &y) in rows.iter().zip(ys.iter()) {
                let y_num = if y { 1.0 } else { 0.0 };
                let p = sigmoid(dot(&weights, row) + bias);
                let diff = p - y_num;
                for (g, &x) in grad_w.iter_mut().zip(row.iter()) {
                    *g += diff * x;
                }
                grad_b += diff;
            }

            for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
                *w -= lr * g / n;
            }
            bias -= lr * grad_b / n;
        }

        Some(Self { weights, bias })
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(dot(&self.weights, x) + self.bias)
    }

    pub fn predict(&self, x: &[f64], threshold: f64) -> bool {
        self.predict_proba(x) >= threshold
    }

    /// Number of feature columns this model was fitted against.
    pub fn n_features(&self) -> usize {
        self.weights.len()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
