// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for real/fake classification
//!
//! `fake` is the positive class. Implements:
//! - Confusion Matrix
//! - Accuracy, Precision, Recall, F1-Score
//! - AUC-ROC, average precision and Brier score (for probabilistic predictions)
//! - Matthews Correlation Coefficient (MCC)

use crate::classifier::Prediction;
use crate::datasets::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// True Positives (fake predicted as fake)
    pub tp: usize,
    /// True Negatives (real predicted as real)
    pub tn: usize,
    /// False Positives (real predicted as fake)
    pub fp: usize,
    /// False Negatives (fake predicted as real)
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Create from predictions and ground truth labels
    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        assert_eq!(predictions.len(), ground_truth.len(), "Prediction and ground truth lengths must match");

        let mut matrix = Self::default();

        for (pred, truth) in predictions.iter().zip(ground_truth.iter()) {
            match (pred, truth) {
                (Label::Fake, Label::Fake) => matrix.tp += 1,
                (Label::Real, Label::Real) => matrix.tn += 1,
                (Label::Fake, Label::Real) => matrix.fp += 1,
                (Label::Real, Label::Fake) => matrix.fn_ += 1,
            }
        }

        matrix
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Accuracy: (TP + TN) / Total
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Recall (Sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// Negative predictive value: TN / (TN + FN), i.e. precision of `real`
    pub fn negative_predictive_value(&self) -> f64 {
        ratio(self.tn, self.tn + self.fn_)
    }

    /// F1 Score: 2 * (Precision * Recall) / (Precision + Recall)
    pub fn f1_score(&self) -> f64 {
        self.f_beta_score(1.0)
    }

    /// F-beta Score: (1 + beta^2) * (Precision * Recall) / (beta^2 * Precision + Recall)
    pub fn f_beta_score(&self, beta: f64) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        let beta_sq = beta * beta;
        let denom = beta_sq * precision + recall;
        if denom == 0.0 {
            return 0.0;
        }
        (1.0 + beta_sq) * precision * recall / denom
    }

    /// Matthews Correlation Coefficient, in [-1, 1]
    pub fn mcc(&self) -> f64 {
        let tp = self.tp as f64;
        let tn = self.tn as f64;
        let fp = self.fp as f64;
        let fn_ = self.fn_ as f64;

        let numerator = tp * tn - fp * fn_;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();

        if denominator == 0.0 {
            return 0.0;
        }
        numerator / denominator
    }

    /// Balanced Accuracy: (Sensitivity + Specificity) / 2
    pub fn balanced_accuracy(&self) -> f64 {
        (self.recall() + self.specificity()) / 2.0
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

/// Full classification report with all metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub balanced_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub f2_score: f64,
    pub mcc: f64,
    pub specificity: f64,
    pub support: usize,
}

impl ClassificationReport {
    /// Generate full report from confusion matrix
    pub fn from_confusion_matrix(cm: ConfusionMatrix) -> Self {
        Self {
            accuracy: cm.accuracy(),
            balanced_accuracy: cm.balanced_accuracy(),
            precision: cm.precision(),
            recall: cm.recall(),
            f1_score: cm.f1_score(),
            f2_score: cm.f_beta_score(2.0),
            mcc: cm.mcc(),
            specificity: cm.specificity(),
            support: cm.total(),
            confusion_matrix: cm,
        }
    }

    /// Generate report from predictions and ground truth
    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        let cm = ConfusionMatrix::from_predictions(predictions, ground_truth);
        Self::from_confusion_matrix(cm)
    }

    /// Format as a human-readable string
    pub fn format(&self) -> String {
        format!(
            r#"Classification Report
=====================
Accuracy:          {:.4} ({:.2}%)
Balanced Accuracy: {:.4} ({:.2}%)
Precision:         {:.4}
Recall:            {:.4}
F1 Score:          {:.4}
F2 Score:          {:.4}
MCC:               {:.4}
Specificity:       {:.4}
Support:           {}

Confusion Matrix:
                  Predicted
                  Fake      Real
Actual Fake      {:>6}    {:>6}
       Real      {:>6}    {:>6}
"#,
            self.accuracy, self.accuracy * 100.0,
            self.balanced_accuracy, self.balanced_accuracy * 100.0,
            self.precision,
            self.recall,
            self.f1_score,
            self.f2_score,
            self.mcc,
            self.specificity,
            self.support,
            self.confusion_matrix.tp, self.confusion_matrix.fn_,
            self.confusion_matrix.fp, self.confusion_matrix.tn,
        )
    }
}

/// Complete evaluation metrics including probabilistic metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub classification: ClassificationReport,
    /// AUC-ROC score (if probabilities available)
    pub auc_roc: Option<f64>,
    /// Average precision (area under PR curve)
    pub average_precision: Option<f64>,
    /// Brier score (calibration metric)
    pub brier_score: Option<f64>,
    /// Per-class metrics, keyed by label name
    pub per_class: BTreeMap<String, ClassMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl EvaluationMetrics {
    /// Create from predictions without probabilities
    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        let classification = ClassificationReport::from_predictions(predictions, ground_truth);
        let cm = &classification.confusion_matrix;

        let mut per_class = BTreeMap::new();
        per_class.insert(
            Label::Fake.to_string(),
            ClassMetrics {
                precision: classification.precision,
                recall: classification.recall,
                f1_score: classification.f1_score,
                support: cm.tp + cm.fn_,
            },
        );

        // Real class: swap the TP/TN, FP/FN perspective
        let real_precision = cm.negative_predictive_value();
        let real_recall = classification.specificity;
        per_class.insert(
            Label::Real.to_string(),
            ClassMetrics {
                precision: real_precision,
                recall: real_recall,
                f1_score: f1(real_precision, real_recall),
                support: cm.tn + cm.fp,
            },
        );

        Self {
            classification,
            auc_roc: None,
            average_precision: None,
            brier_score: None,
            per_class,
        }
    }

    /// Create from predictions with P(fake) scores
    pub fn from_predictions_with_probs(
        predictions: &[Label],
        ground_truth: &[Label],
        probabilities: &[f64],
    ) -> Self {
        let mut metrics = Self::from_predictions(predictions, ground_truth);

        metrics.auc_roc = Some(Self::calculate_auc_roc(ground_truth, probabilities));
        metrics.brier_score = Some(Self::calculate_brier_score(ground_truth, probabilities));
        metrics.average_precision = Some(Self::calculate_average_precision(ground_truth, probabilities));

        metrics
    }

    /// Evaluate classifier outputs against gold labels
    pub fn from_classifier_output(predictions: &[Prediction], ground_truth: &[Label]) -> Self {
        let labels: Vec<Label> = predictions.iter().map(|p| p.label).collect();
        let probabilities: Vec<f64> = predictions.iter().map(|p| p.fake_probability).collect();
        Self::from_predictions_with_probs(&labels, ground_truth, &probabilities)
    }

    /// (label, probability) pairs sorted by probability, highest first
    fn ranked(ground_truth: &[Label], probabilities: &[f64]) -> Vec<(Label, f64)> {
        let mut pairs: Vec<(Label, f64)> = ground_truth
            .iter()
            .zip(probabilities.iter())
            .map(|(l, p)| (*l, *p))
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        pairs
    }

    /// Calculate AUC-ROC using the trapezoidal rule; tied scores form one step
    fn calculate_auc_roc(ground_truth: &[Label], probabilities: &[f64]) -> f64 {
        let pairs = Self::ranked(ground_truth, probabilities);

        let n_pos = pairs.iter().filter(|(l, _)| *l == Label::Fake).count() as f64;
        let n_neg = pairs.len() as f64 - n_pos;

        if n_pos == 0.0 || n_neg == 0.0 {
            return 0.5;
        }

        let mut tpr_prev = 0.0;
        let mut fpr_prev = 0.0;
        let mut tp = 0.0;
        let mut fp = 0.0;
        let mut auc = 0.0;

        for (i, (label, prob)) in pairs.iter().enumerate() {
            if *label == Label::Fake {
                tp += 1.0;
            } else {
                fp += 1.0;
            }

            if pairs.get(i + 1).is_some_and(|(_, next)| next == prob) {
                continue;
            }

            let tpr = tp / n_pos;
            let fpr = fp / n_neg;
            auc += (fpr - fpr_prev) * (tpr + tpr_prev) / 2.0;

            tpr_prev = tpr;
            fpr_prev = fpr;
        }

        auc
    }

    /// Calculate Brier score (lower is better)
    fn calculate_brier_score(ground_truth: &[Label], probabilities: &[f64]) -> f64 {
        let n = ground_truth.len().min(probabilities.len());
        if n == 0 {
            return 0.0;
        }

        let sum: f64 = ground_truth
            .iter()
            .zip(probabilities.iter())
            .map(|(label, prob)| (prob - f64::from(label.to_binary())).powi(2))
            .sum();

        sum / n as f64
    }

    /// Calculate average precision (area under precision-recall curve)
    fn calculate_average_precision(ground_truth: &[Label], probabilities: &[f64]) -> f64 {
        let pairs = Self::ranked(ground_truth, probabilities);

        let n_pos = pairs.iter().filter(|(l, _)| *l == Label::Fake).count() as f64;
        if n_pos == 0.0 {
            return 0.0;
        }

        let mut tp = 0.0;
        let mut fp = 0.0;
        let mut ap = 0.0;
        let mut prev_recall = 0.0;

        for (label, _) in &pairs {
            if *label == Label::Fake {
                tp += 1.0;
            } else {
                fp += 1.0;
            }

            let precision = tp / (tp + fp);
            let recall = tp / n_pos;

            if *label == Label::Fake {
                ap += precision * (recall - prev_recall);
            }

            prev_recall = recall;
        }

        ap
    }

    /// Format as human-readable string
    pub fn format(&self) -> String {
        let mut output = self.classification.format();

        if let Some(auc) = self.auc_roc {
            output.push_str(&format!("\nAUC-ROC:           {:.4}\n", auc));
        }
        if let Some(ap) = self.average_precision {
            output.push_str(&format!("Average Precision: {:.4}\n", ap));
        }
        if let Some(brier) = self.brier_score {
            output.push_str(&format!("Brier Score:       {:.4}\n", brier));
        }

        output.push_str("\nPer-Class Metrics:\n");
        for (class, metrics) in &self.per_class {
            output.push_str(&format!(
                "  {}: P={:.4} R={:.4} F1={:.4} (n={})\n",
                class, metrics.precision, metrics.recall, metrics.f1_score, metrics.support
            ));
        }

        output
    }
}
