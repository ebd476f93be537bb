// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Linear classifiers over TF-IDF feature vectors
//!
//! Implements:
//! - Logistic regression (full-batch gradient descent, L2 penalty)
//! - Multinomial naive Bayes (Lidstone smoothing)
//!
//! Both decide `fake` iff P(fake) >= 0.5 and report the probability of the
//! predicted label as confidence.

pub mod logistic;
pub mod naive_bayes;

pub use logistic::{LogisticParams, LogisticRegression};
pub use naive_bayes::{MultinomialNaiveBayes, NaiveBayesParams};

use crate::datasets::Label;
use crate::error::{DetectorError, Result};
use crate::vectorizer::FeatureVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output of a single classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the predicted label
    pub confidence: f64,
    /// P(fake)
    pub fake_probability: f64,
}

impl Prediction {
    pub fn from_fake_probability(fake_probability: f64) -> Self {
        let label = if fake_probability >= 0.5 {
            Label::Fake
        } else {
            Label::Real
        };
        Self {
            label,
            confidence: fake_probability.max(1.0 - fake_probability),
            fake_probability,
        }
    }
}

/// Capability to learn a decision rule over feature vectors
pub trait Classifier {
    /// Fit decision parameters on labeled vectors
    fn train(&mut self, vectors: &[FeatureVector], labels: &[Label]) -> Result<()>;

    /// Classify one vector
    fn predict(&self, vector: &FeatureVector) -> Result<Prediction>;

    /// Signed per-feature contribution toward `fake`, largest magnitude first
    fn term_contributions(&self, vector: &FeatureVector) -> Result<Vec<(usize, f64)>>;

    /// Number of features the model was trained on; 0 before training
    fn dimension(&self) -> usize;

    fn name(&self) -> &str;

    fn predict_batch(&self, vectors: &[FeatureVector]) -> Result<Vec<Prediction>> {
        vectors.iter().map(|v| self.predict(v)).collect()
    }
}

/// Selects the classifier algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    #[default]
    Logistic,
    NaiveBayes,
}

impl ClassifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::Logistic => "logistic",
            ClassifierKind::NaiveBayes => "naive-bayes",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logistic" | "logreg" | "logistic-regression" => Ok(ClassifierKind::Logistic),
            "naive-bayes" | "nb" | "bayes" => Ok(ClassifierKind::NaiveBayes),
            other => Err(format!("unknown classifier '{}'", other)),
        }
    }
}

/// A trained (or trainable) model of either kind; this is what gets persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TrainedModel {
    Logistic(LogisticRegression),
    NaiveBayes(MultinomialNaiveBayes),
}

impl TrainedModel {
    /// Untrained model of the given kind with default parameters
    pub fn new(kind: ClassifierKind) -> Self {
        match kind {
            ClassifierKind::Logistic => TrainedModel::Logistic(LogisticRegression::default()),
            ClassifierKind::NaiveBayes => {
                TrainedModel::NaiveBayes(MultinomialNaiveBayes::default())
            }
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            TrainedModel::Logistic(_) => ClassifierKind::Logistic,
            TrainedModel::NaiveBayes(_) => ClassifierKind::NaiveBayes,
        }
    }

    /// Check that a deserialized model is trained and numerically sane
    pub fn validate(&self) -> Result<()> {
        match self {
            TrainedModel::Logistic(model) => model.validate(),
            TrainedModel::NaiveBayes(model) => model.validate(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::Logistic(model) => model,
            TrainedModel::NaiveBayes(model) => model,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::Logistic(model) => model,
            TrainedModel::NaiveBayes(model) => model,
        }
    }
}

impl From<LogisticRegression> for TrainedModel {
    fn from(model: LogisticRegression) -> Self {
        TrainedModel::Logistic(model)
    }
}

impl From<MultinomialNaiveBayes> for TrainedModel {
    fn from(model: MultinomialNaiveBayes) -> Self {
        TrainedModel::NaiveBayes(model)
    }
}

impl Classifier for TrainedModel {
    fn train(&mut self, vectors: &[FeatureVector], labels: &[Label]) -> Result<()> {
        self.inner_mut().train(vectors, labels)
    }

    fn predict(&self, vector: &FeatureVector) -> Result<Prediction> {
        self.inner().predict(vector)
    }

    fn term_contributions(&self, vector: &FeatureVector) -> Result<Vec<(usize, f64)>> {
        self.inner().term_contributions(vector)
    }

    fn dimension(&self) -> usize {
        self.inner().dimension()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Shared training input checks; returns the common vector dimension
pub(crate) fn validate_training(vectors: &[FeatureVector], labels: &[Label]) -> Result<usize> {
    if vectors.is_empty() {
        return Err(DetectorError::EmptyCorpus);
    }
    if vectors.len() != labels.len() {
        return Err(DetectorError::invalid_training(format!(
            "{} vectors but {} labels",
            vectors.len(),
            labels.len()
        )));
    }

    let dimension = vectors[0].dimension();
    if dimension == 0 {
        return Err(DetectorError::invalid_training("feature vectors have zero dimension"));
    }
    if let Some(v) = vectors.iter().find(|v| v.dimension() != dimension) {
        return Err(DetectorError::invalid_training(format!(
            "inconsistent vector dimensions: {} and {}",
            dimension,
            v.dimension()
        )));
    }

    let n_fake = labels.iter().filter(|l| **l == Label::Fake).count();
    if n_fake == 0 || n_fake == labels.len() {
        return Err(DetectorError::invalid_training(
            "both real and fake examples are required",
        ));
    }

    Ok(dimension)
}

pub(crate) fn check_dimension(expected: usize, vector: &FeatureVector) -> Result<()> {
    if expected == 0 {
        return Err(DetectorError::NotInitialized);
    }
    if vector.dimension() != expected {
        return Err(DetectorError::DimensionMismatch {
            expected,
            actual: vector.dimension(),
        });
    }
    Ok(())
}

/// Sort contributions by descending magnitude, ties by feature index
pub(crate) fn sort_contributions(contributions: &mut [(usize, f64)]) {
    contributions.sort_by(|a, b| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors() -> (Vec<FeatureVector>, Vec<Label>) {
        let vectors = vec![
            FeatureVector::from_entries(4, vec![(0, 0.8), (1, 0.6)]).unwrap(),
            FeatureVector::from_entries(4, vec![(2, 0.6), (3, 0.8)]).unwrap(),
            FeatureVector::from_entries(4, vec![(0, 1.0)]).unwrap(),
            FeatureVector::from_entries(4, vec![(3, 1.0)]).unwrap(),
        ];
        let labels = vec![Label::Real, Label::Fake, Label::Real, Label::Fake];
        (vectors, labels)
    }

    #[test]
    fn test_prediction_decision_rule() {
        let p = Prediction::from_fake_probability(0.5);
        assert_eq!(p.label, Label::Fake);
        assert!((p.confidence - 0.5).abs() < 1e-12);

        let p = Prediction::from_fake_probability(0.2);
        assert_eq!(p.label, Label::Real);
        assert!((p.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_classifier_kind_parsing() {
        assert_eq!("logistic".parse::<ClassifierKind>().unwrap(), ClassifierKind::Logistic);
        assert_eq!("Naive-Bayes".parse::<ClassifierKind>().unwrap(), ClassifierKind::NaiveBayes);
        assert!("svm".parse::<ClassifierKind>().is_err());
        assert_eq!(ClassifierKind::NaiveBayes.to_string(), "naive-bayes");
    }

    #[test]
    fn test_validate_training_errors() {
        let (vectors, labels) = vectors();

        assert!(matches!(validate_training(&[], &[]), Err(DetectorError::EmptyCorpus)));
        assert!(matches!(
            validate_training(&vectors, &labels[..3]),
            Err(DetectorError::InvalidTrainingData(_))
        ));
        assert!(matches!(
            validate_training(&vectors, &[Label::Fake; 4]),
            Err(DetectorError::InvalidTrainingData(_))
        ));

        let mut mixed = vectors.clone();
        mixed.push(FeatureVector::zeros(7));
        let mut mixed_labels = labels.clone();
        mixed_labels.push(Label::Real);
        assert!(validate_training(&mixed, &mixed_labels).is_err());

        assert_eq!(validate_training(&vectors, &labels).unwrap(), 4);
    }

    #[test]
    fn test_trained_model_delegates() {
        let (vectors, labels) = vectors();

        for kind in [ClassifierKind::Logistic, ClassifierKind::NaiveBayes] {
            let mut model = TrainedModel::new(kind);
            assert_eq!(model.kind(), kind);
            assert!(matches!(
                model.predict(&vectors[0]),
                Err(DetectorError::NotInitialized)
            ));

            model.train(&vectors, &labels).unwrap();
            assert_eq!(model.dimension(), 4);
            model.validate().unwrap();

            let predictions = model.predict_batch(&vectors).unwrap();
            let predicted: Vec<Label> = predictions.iter().map(|p| p.label).collect();
            assert_eq!(predicted, labels, "{}", model.name());
        }
    }

    #[test]
    fn test_trained_model_serde_tag() {
        let (vectors, labels) = vectors();
        let mut model = TrainedModel::new(ClassifierKind::NaiveBayes);
        model.train(&vectors, &labels).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"kind\":\"naive-bayes\""));
        let restored: TrainedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);
    }

    #[test]
    fn test_sort_contributions() {
        let mut c = vec![(0, 0.1), (1, -0.5), (2, 0.3), (3, 0.5)];
        sort_contributions(&mut c);
        assert_eq!(c, vec![(1, -0.5), (3, 0.5), (2, 0.3), (0, 0.1)]);
    }
}
