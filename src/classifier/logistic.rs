// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Binary logistic regression trained by full-batch gradient descent

use super::{check_dimension, sort_contributions, validate_training, Classifier, Prediction};
use crate::datasets::Label;
use crate::error::{DetectorError, Result};
use crate::vectorizer::FeatureVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gradient descent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on the weights (the bias is not penalized)
    pub l2: f64,
    /// Stop once the loss improves by less than this
    pub tolerance: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 300,
            l2: 1e-4,
            tolerance: 1e-7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticParams,
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            weights: Vec::new(),
            bias: 0.0,
        }
    }

    pub fn params(&self) -> &LogisticParams {
        &self.params
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            return Err(DetectorError::corrupt("logistic model has no weights"));
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(DetectorError::corrupt("logistic model has non-finite parameters"));
        }
        Ok(())
    }

    fn decision(&self, vector: &FeatureVector) -> f64 {
        vector.dot_dense(&self.weights) + self.bias
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^z) without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

impl Classifier for LogisticRegression {
    fn train(&mut self, vectors: &[FeatureVector], labels: &[Label]) -> Result<()> {
        let dimension = validate_training(vectors, labels)?;
        let params = &self.params;
        if !(params.learning_rate > 0.0) || params.l2 < 0.0 || params.epochs == 0 {
            return Err(DetectorError::invalid_training(
                "learning_rate must be positive, l2 non-negative and epochs non-zero",
            ));
        }

        let n = vectors.len() as f64;
        let targets: Vec<f64> = labels.iter().map(|l| f64::from(l.to_binary())).collect();

        let mut weights = vec![0.0; dimension];
        let mut bias = 0.0;
        let mut previous_loss = f64::INFINITY;

        for epoch in 0..params.epochs {
            let mut grad_w = vec![0.0; dimension];
            let mut grad_b = 0.0;
            let mut loss = 0.0;

            for (vector, &y) in vectors.iter().zip(&targets) {
                let z = vector.dot_dense(&weights) + bias;
                loss += softplus(z) - y * z;

                let error = sigmoid(z) - y;
                for (idx, value) in vector.iter() {
                    grad_w[idx] += error * value;
                }
                grad_b += error;
            }

            let penalty: f64 = weights.iter().map(|w| w * w).sum();
            loss = loss / n + 0.5 * params.l2 * penalty;

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= params.learning_rate * (g / n + params.l2 * *w);
            }
            bias -= params.learning_rate * grad_b / n;

            if (previous_loss - loss).abs() < params.tolerance {
                debug!(epoch, loss, "Logistic regression converged");
                break;
            }
            previous_loss = loss;
        }

        debug!(dimension, loss = previous_loss, "Logistic regression trained");
        self.weights = weights;
        self.bias = bias;
        Ok(())
    }

    fn predict(&self, vector: &FeatureVector) -> Result<Prediction> {
        check_dimension(self.weights.len(), vector)?;
        Ok(Prediction::from_fake_probability(sigmoid(self.decision(vector))))
    }

    fn term_contributions(&self, vector: &FeatureVector) -> Result<Vec<(usize, f64)>> {
        check_dimension(self.weights.len(), vector)?;
        let mut contributions: Vec<(usize, f64)> = vector
            .iter()
            .map(|(idx, value)| (idx, self.weights[idx] * value))
            .collect();
        sort_contributions(&mut contributions);
        Ok(contributions)
    }

    fn dimension(&self) -> usize {
        self.weights.len()
    }

    fn name(&self) -> &str {
        "Logistic Regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<FeatureVector>, Vec<Label>) {
        let vectors = vec![
            FeatureVector::from_entries(3, vec![(0, 1.0)]).unwrap(),
            FeatureVector::from_entries(3, vec![(0, 0.9), (2, 0.1)]).unwrap(),
            FeatureVector::from_entries(3, vec![(1, 1.0)]).unwrap(),
            FeatureVector::from_entries(3, vec![(1, 0.9), (2, 0.1)]).unwrap(),
        ];
        let labels = vec![Label::Real, Label::Real, Label::Fake, Label::Fake];
        (vectors, labels)
    }

    #[test]
    fn test_sigmoid_and_softplus() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-12);
        assert!(softplus(1000.0).is_finite());
    }

    #[test]
    fn test_learns_separable_data() {
        let (vectors, labels) = separable();
        let mut model = LogisticRegression::default();
        model.train(&vectors, &labels).unwrap();

        assert!(model.weights()[1] > 0.0);
        assert!(model.weights()[0] < 0.0);

        for (vector, label) in vectors.iter().zip(&labels) {
            let prediction = model.predict(vector).unwrap();
            assert_eq!(prediction.label, *label);
            assert!(prediction.confidence > 0.5 && prediction.confidence <= 1.0);
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let (vectors, labels) = separable();
        let mut a = LogisticRegression::default();
        let mut b = LogisticRegression::default();
        a.train(&vectors, &labels).unwrap();
        b.train(&vectors, &labels).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predict_errors() {
        let (vectors, labels) = separable();
        let mut model = LogisticRegression::default();
        assert!(matches!(model.predict(&vectors[0]), Err(DetectorError::NotInitialized)));

        model.train(&vectors, &labels).unwrap();
        assert!(matches!(
            model.predict(&FeatureVector::zeros(5)),
            Err(DetectorError::DimensionMismatch { expected: 3, actual: 5 })
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let (vectors, labels) = separable();
        let mut model = LogisticRegression::new(LogisticParams {
            learning_rate: 0.0,
            ..LogisticParams::default()
        });
        assert!(matches!(
            model.train(&vectors, &labels),
            Err(DetectorError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_term_contributions_sign() {
        let (vectors, labels) = separable();
        let mut model = LogisticRegression::default();
        model.train(&vectors, &labels).unwrap();

        let contributions = model.term_contributions(&vectors[2]).unwrap();
        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions[0].0, 1);
        assert!(contributions[0].1 > 0.0);
    }
}
